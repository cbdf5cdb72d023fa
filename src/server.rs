use crate::annotate::Annotator;
use crate::config::Config;
use crate::detector::{DetectorRegistry, EngineInfo};
use crate::enhance::{EnhancementConfig, Preset};
use crate::error::ValidatorError;
use crate::pipeline::{Pipeline, RunPlan};
use crate::policy::AggregatePolicy;
use crate::report::{OutputFormat, ValidationReport};
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Room for multipart boundaries and form fields on top of the file itself
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub detectors: Arc<DetectorRegistry>,
    pub annotator: Arc<Annotator>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(detectors: DetectorRegistry, annotator: Annotator, config: Config) -> Self {
        Self {
            detectors: Arc::new(detectors),
            annotator: Arc::new(annotator),
            config: Arc::new(config),
        }
    }
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Server info response
#[derive(Serialize)]
pub struct InfoResponse {
    pub version: String,
    pub default_engine: String,
    pub available_engines: Vec<EngineInfo>,
    pub max_file_size_bytes: usize,
    pub confidence_threshold: f32,
    pub policy: String,
    pub preset: String,
    pub enhancement: EnhancementConfig,
    pub output_format: String,
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    let body_limit = state.config.max_file_size + MULTIPART_OVERHEAD;

    Router::new()
        .route("/validate", post(handle_validate))
        .route("/validate/:engine", post(handle_validate_with_engine))
        .route("/health", get(handle_health))
        .route("/info", get(handle_info))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the HTTP server
pub async fn run(config: Config) -> anyhow::Result<()> {
    let detectors = DetectorRegistry::new(&config)?;
    let annotator = config.annotator()?;
    let addr = format!("{}:{}", config.host, config.port);

    tracing::info!(
        "Available detectors: {:?} (default: {})",
        detectors.list(),
        detectors.default_name()
    );

    let app = router(AppState::new(detectors, annotator, config));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Form fields of a validation request
#[derive(Default)]
struct ValidationForm {
    file: Option<Bytes>,
    threshold: Option<String>,
    policy: Option<String>,
    preset: Option<String>,
    format: Option<String>,
    drop_noise: Option<String>,
}

impl ValidationForm {
    async fn parse(mut multipart: Multipart) -> Result<Self, ValidatorError> {
        let mut form = Self::default();

        while let Some(field) = multipart.next_field().await.map_err(|e| {
            ValidatorError::InvalidRequest(format!("Failed to parse multipart: {}", e))
        })? {
            let name = field.name().unwrap_or_default().to_string();

            if name == "file" || name == "image" {
                form.file = Some(field.bytes().await.map_err(|e| {
                    ValidatorError::InvalidRequest(format!("Failed to read file data: {}", e))
                })?);
                continue;
            }

            let slot = match name.as_str() {
                "threshold" => &mut form.threshold,
                "policy" => &mut form.policy,
                "preset" => &mut form.preset,
                "format" => &mut form.format,
                "drop_noise" => &mut form.drop_noise,
                // Ignore unknown fields
                _ => continue,
            };
            let value = field.text().await.map_err(|e| {
                ValidatorError::InvalidRequest(format!("Invalid value for '{}': {}", name, e))
            })?;
            *slot = Some(value.trim().to_string());
        }

        Ok(form)
    }

    /// Apply request overrides on top of the server defaults
    ///
    /// A requested preset replaces both enhancement and detector settings;
    /// values given explicitly at startup still win over it.
    fn run_plan(&self, config: &Config) -> Result<RunPlan, ValidatorError> {
        let mut run = config.run.clone();

        if let Some(threshold) = &self.threshold {
            run.threshold = threshold.parse().map_err(|_| {
                ValidatorError::InvalidThreshold(format!("'{}' is not a number", threshold))
            })?;
        }
        if let Some(policy) = &self.policy {
            run.policy = AggregatePolicy::from_name(policy).ok_or_else(|| {
                ValidatorError::InvalidRequest(format!(
                    "Unknown policy '{}'. Use 'any' or 'all'",
                    policy
                ))
            })?;
        }
        let preset = match &self.preset {
            Some(name) => Preset::from_name(name).ok_or_else(|| {
                ValidatorError::InvalidRequest(format!(
                    "Unknown preset '{}'. Use 'none', 'standard', 'aggressive' or 'auto'",
                    name
                ))
            })?,
            None => config.preset,
        };
        if let Some(drop_noise) = &self.drop_noise {
            run.drop_noise = match drop_noise.to_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => true,
                "false" | "0" | "no" | "off" | "" => false,
                other => {
                    return Err(ValidatorError::InvalidRequest(format!(
                        "Invalid drop_noise value '{}'",
                        other
                    )))
                }
            };
        }

        let plan = config.plan(preset, &run);
        plan.validate()?;
        Ok(plan)
    }

    fn output_format(&self, default: OutputFormat) -> Result<OutputFormat, ValidatorError> {
        match &self.format {
            Some(format) => OutputFormat::from_name(format).ok_or_else(|| {
                ValidatorError::InvalidRequest(format!(
                    "Unknown format '{}'. Use 'png' or 'jpeg'",
                    format
                ))
            }),
            None => Ok(default),
        }
    }
}

/// Validate with the default detector
async fn handle_validate(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ValidationReport>, ValidatorError> {
    validate(state, None, multipart).await
}

/// Validate with a named detector
async fn handle_validate_with_engine(
    State(state): State<AppState>,
    Path(engine): Path<String>,
    multipart: Multipart,
) -> Result<Json<ValidationReport>, ValidatorError> {
    validate(state, Some(engine), multipart).await
}

async fn validate(
    state: AppState,
    engine: Option<String>,
    multipart: Multipart,
) -> Result<Json<ValidationReport>, ValidatorError> {
    let form = ValidationForm::parse(multipart).await?;

    let detector = match &engine {
        Some(name) => state.detectors.get(name).ok_or_else(|| {
            ValidatorError::InvalidRequest(format!(
                "Unknown engine '{}'. Available: {}",
                name,
                state.detectors.list().join(", ")
            ))
        })?,
        None => state.detectors.default_detector().ok_or_else(|| {
            ValidatorError::DetectionUnavailable("No default detector configured".to_string())
        })?,
    };

    // Reject bad parameters before touching the image
    let plan = form.run_plan(&state.config)?;
    let format = form.output_format(state.config.output_format)?;

    let data = form.file.ok_or(ValidatorError::MissingFile)?;
    if data.len() > state.config.max_file_size {
        return Err(ValidatorError::ImageTooLarge {
            size: data.len(),
            max: state.config.max_file_size,
        });
    }

    let cancel = CancellationToken::new();
    // Dropping the handler (client gone, timeout) stops the detector
    let _guard = cancel.clone().drop_guard();

    let annotator = state.annotator.clone();
    let token = cancel.clone();
    let task = tokio::task::spawn_blocking(move || {
        let pipeline = Pipeline::new(detector.as_ref(), annotator.as_ref());
        let result = pipeline.run_plan(&data, &plan, &token)?;
        ValidationReport::from_result(&result, Some(format))
    });

    let timeout = state.config.detection_timeout;
    let report = match tokio::time::timeout(timeout, task).await {
        Ok(joined) => joined
            .map_err(|e| ValidatorError::Internal(format!("Validation task failed: {}", e)))??,
        Err(_) => {
            cancel.cancel();
            tracing::warn!("Validation timed out after {:?}", timeout);
            return Err(ValidatorError::DetectionUnavailable(format!(
                "detection timed out after {}s",
                timeout.as_secs_f32()
            )));
        }
    };

    tracing::info!(
        "Validation completed in {}ms ({}): {}/{} passed, overall_pass={}",
        report.processing_time_ms,
        report.method.as_str(),
        report.passed_count,
        report.total_count,
        report.overall_pass
    );

    Ok(Json(report))
}

/// Handle health check requests
async fn handle_health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Handle info requests
async fn handle_info(State(state): State<AppState>) -> impl IntoResponse {
    let run = &state.config.run;
    Json(InfoResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        default_engine: state.detectors.default_name().to_string(),
        available_engines: state.detectors.info(),
        max_file_size_bytes: state.config.max_file_size,
        confidence_threshold: run.threshold,
        policy: run.policy.as_str().to_string(),
        preset: state.config.preset.as_str().to_string(),
        enhancement: run.enhancement,
        output_format: state.config.output_format.as_str().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Args;
    use crate::detector::DetectorConfig;
    use crate::pipeline::RunConfig;
    use clap::Parser;

    fn form() -> ValidationForm {
        ValidationForm::default()
    }

    fn config(args: &[&str]) -> Config {
        let argv = std::iter::once("plate-ocr-validator").chain(args.iter().copied());
        Config::from(Args::parse_from(argv))
    }

    fn single(plan: RunPlan) -> RunConfig {
        match plan {
            RunPlan::Single(run) => run,
            other => panic!("expected a single run, got {:?}", other),
        }
    }

    #[test]
    fn test_no_overrides_keeps_defaults() {
        let config = config(&[]);
        assert_eq!(single(form().run_plan(&config).unwrap()), config.run);
        assert_eq!(
            form().output_format(OutputFormat::Png).unwrap(),
            OutputFormat::Png
        );
    }

    #[test]
    fn test_threshold_override() {
        let config = config(&[]);
        let mut form = form();
        form.threshold = Some("0.75".to_string());
        assert_eq!(single(form.run_plan(&config).unwrap()).threshold, 0.75);

        form.threshold = Some("high".to_string());
        assert!(matches!(
            form.run_plan(&config),
            Err(ValidatorError::InvalidThreshold(_))
        ));

        form.threshold = Some("-0.1".to_string());
        assert!(matches!(
            form.run_plan(&config),
            Err(ValidatorError::InvalidThreshold(_))
        ));
    }

    #[test]
    fn test_aggressive_preset_override() {
        let mut form = form();
        form.preset = Some("aggressive".to_string());
        form.drop_noise = Some("true".to_string());
        let run = single(form.run_plan(&config(&[])).unwrap());

        assert_eq!(run.enhancement, Preset::Aggressive.config());
        assert_eq!(run.detector, DetectorConfig::aggressive());
        assert!(run.drop_noise);
    }

    #[test]
    fn test_standard_preset_on_aggressive_server() {
        let config = config(&["--preset", "aggressive"]);
        assert_eq!(config.run.detector, DetectorConfig::aggressive());

        let mut form = form();
        form.preset = Some("standard".to_string());
        let run = single(form.run_plan(&config).unwrap());

        assert_eq!(run.enhancement, Preset::Standard.config());
        assert_eq!(run.detector, DetectorConfig::default());
    }

    #[test]
    fn test_startup_overrides_beat_request_preset() {
        let config = config(&["--text-threshold", "0.45", "--contrast-multiplier", "1.1"]);

        let mut form = form();
        form.preset = Some("aggressive".to_string());
        let run = single(form.run_plan(&config).unwrap());

        assert_eq!(run.detector.text_threshold, 0.45);
        assert_eq!(run.detector.contrast_threshold, 0.02);
        assert_eq!(run.enhancement.contrast_multiplier, 1.1);
        assert_eq!(run.enhancement.sharpen_percent, 200);
    }

    #[test]
    fn test_auto_preset_plans_two_runs() {
        let mut form = form();
        form.preset = Some("auto".to_string());
        form.threshold = Some("0.6".to_string());

        match form.run_plan(&config(&[])).unwrap() {
            RunPlan::Auto { improved, standard } => {
                assert_eq!(improved.detector, DetectorConfig::aggressive());
                assert_eq!(standard.detector, DetectorConfig::default());
                assert_eq!(improved.threshold, 0.6);
                assert_eq!(standard.threshold, 0.6);
            }
            other => panic!("expected an auto plan, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_values_rejected() {
        let config = config(&[]);
        let mut form = form();
        form.policy = Some("most".to_string());
        assert!(matches!(
            form.run_plan(&config),
            Err(ValidatorError::InvalidRequest(_))
        ));

        let mut form = ValidationForm::default();
        form.preset = Some("extreme".to_string());
        assert!(matches!(
            form.run_plan(&config),
            Err(ValidatorError::InvalidRequest(_))
        ));

        let mut form = ValidationForm::default();
        form.format = Some("gif".to_string());
        assert!(form.output_format(OutputFormat::Jpeg).is_err());
    }
}
