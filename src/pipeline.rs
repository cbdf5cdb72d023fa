//! Single-image validation pipeline
//!
//! Runs LOADED -> ENHANCED -> DETECTED -> CLASSIFIED -> ANNOTATED -> DONE.
//! Any error ends the run at the stage it occurred in; no partial result is
//! returned. An auto [`RunPlan`] decodes once and may run the stages twice.

use crate::annotate::Annotator;
use crate::detection::ClassifiedDetection;
use crate::detector::{DetectorConfig, TextDetector};
use crate::enhance::{enhance, EnhancementConfig, StepTiming};
use crate::error::ValidatorError;
use crate::plate::{is_noise, normalize_text};
use crate::policy::{self, AggregatePolicy, DEFAULT_CONFIDENCE_THRESHOLD};
use image::RgbImage;
use serde::Serialize;
use std::fmt;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Stages of one pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Loaded,
    Enhanced,
    Detected,
    Classified,
    Annotated,
    Done,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Loaded => "loaded",
            Self::Enhanced => "enhanced",
            Self::Detected => "detected",
            Self::Classified => "classified",
            Self::Annotated => "annotated",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything that parameterizes one run
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub enhancement: EnhancementConfig,
    pub detector: DetectorConfig,
    /// Detections pass when confidence is strictly greater than this
    pub threshold: f32,
    pub policy: AggregatePolicy,
    /// Remove noise detections before classification
    pub drop_noise: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            enhancement: EnhancementConfig::default(),
            detector: DetectorConfig::default(),
            threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            policy: AggregatePolicy::default(),
            drop_noise: false,
        }
    }
}

impl RunConfig {
    /// Checked before the image is decoded so a bad run costs nothing
    pub fn validate(&self) -> Result<(), ValidatorError> {
        policy::validate_threshold(self.threshold)?;
        self.enhancement.validate()
    }
}

/// Confidence a non-noise detection needs to count towards an auto run
pub const AUTO_MIN_CONFIDENCE: f32 = 0.3;

/// Which settings produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    /// The run used exactly the configured settings
    Single,
    /// Auto run kept the aggressive settings
    Improved,
    /// Auto run fell back to the standard settings
    Standard,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Improved => "improved",
            Self::Standard => "standard",
        }
    }
}

/// One or two runs over the same image
#[derive(Debug, Clone, PartialEq)]
pub enum RunPlan {
    Single(RunConfig),
    /// Run `improved` first; if it finds no strong detection, run `standard`
    /// and keep whichever found more
    Auto {
        improved: RunConfig,
        standard: RunConfig,
    },
}

impl RunPlan {
    pub fn validate(&self) -> Result<(), ValidatorError> {
        match self {
            Self::Single(run) => run.validate(),
            Self::Auto { improved, standard } => {
                improved.validate()?;
                standard.validate()
            }
        }
    }
}

/// Outcome of a successful run
#[derive(Debug, Clone)]
pub struct PipelineResult {
    /// Every surviving detection, in detector order
    pub detections: Vec<ClassifiedDetection>,
    /// Enhanced image with outlines and labels drawn on it
    pub annotated_image: RgbImage,
    pub overall_pass: bool,
    pub policy: AggregatePolicy,
    pub threshold: f32,
    /// Detections removed by the noise filter
    pub dropped_noise: usize,
    pub enhancement_steps: Vec<StepTiming>,
    pub method: Method,
    pub processing_time_ms: u64,
}

impl PipelineResult {
    pub fn passed_count(&self) -> usize {
        self.detections
            .iter()
            .filter(|d| d.verdict.is_pass())
            .count()
    }

    /// Non-noise detections at or above [`AUTO_MIN_CONFIDENCE`]
    pub fn strong_count(&self) -> usize {
        self.detections
            .iter()
            .filter(|d| d.confidence() >= AUTO_MIN_CONFIDENCE && !is_noise(d.text(), d.confidence()))
            .count()
    }
}

/// Pipeline over a shared detector and annotator
///
/// Holds no per-run state, so one instance may serve many runs.
pub struct Pipeline<'a> {
    detector: &'a dyn TextDetector,
    annotator: &'a Annotator,
}

impl<'a> Pipeline<'a> {
    pub fn new(detector: &'a dyn TextDetector, annotator: &'a Annotator) -> Self {
        Self {
            detector,
            annotator,
        }
    }

    /// Validate encoded image bytes (PNG, JPEG, ...)
    pub fn run(&self, image_bytes: &[u8], config: &RunConfig) -> Result<PipelineResult, ValidatorError> {
        self.run_with_cancel(image_bytes, config, &CancellationToken::new())
    }

    /// Like [`Pipeline::run`], giving up with `DetectionUnavailable` once `cancel` fires
    pub fn run_with_cancel(
        &self,
        image_bytes: &[u8],
        config: &RunConfig,
        cancel: &CancellationToken,
    ) -> Result<PipelineResult, ValidatorError> {
        config.validate()?;
        let image = decode_image(image_bytes)?;
        self.execute(image, config, cancel)
    }

    /// Validate an already decoded image
    pub fn run_image(
        &self,
        image: RgbImage,
        config: &RunConfig,
        cancel: &CancellationToken,
    ) -> Result<PipelineResult, ValidatorError> {
        config.validate()?;
        self.execute(image, config, cancel)
    }

    /// Validate encoded image bytes under a [`RunPlan`], decoding once
    pub fn run_plan(
        &self,
        image_bytes: &[u8],
        plan: &RunPlan,
        cancel: &CancellationToken,
    ) -> Result<PipelineResult, ValidatorError> {
        plan.validate()?;
        let image = decode_image(image_bytes)?;

        let (improved, standard) = match plan {
            RunPlan::Single(run) => return self.execute(image, run, cancel),
            RunPlan::Auto { improved, standard } => (improved, standard),
        };

        let first = self.execute(image.clone(), improved, cancel)?;
        let first_strong = first.strong_count();
        if first_strong > 0 {
            tracing::info!("Auto run kept improved settings: {} strong detections", first_strong);
            return Ok(PipelineResult {
                method: Method::Improved,
                ..first
            });
        }

        let second = self.execute(image, standard, cancel)?;
        let second_strong = second.strong_count();
        let (chosen, method) = if first_strong >= second_strong {
            (first, Method::Improved)
        } else {
            (second, Method::Standard)
        };
        tracing::info!(
            "Auto run chose {} settings: {} vs {} strong detections",
            method.as_str(),
            first_strong,
            second_strong
        );

        Ok(PipelineResult { method, ..chosen })
    }

    fn execute(
        &self,
        image: RgbImage,
        config: &RunConfig,
        cancel: &CancellationToken,
    ) -> Result<PipelineResult, ValidatorError> {
        let mut stage = Stage::Loaded;
        let result = self.advance(image, config, cancel, &mut stage);
        if let Err(e) = &result {
            tracing::warn!(
                "Pipeline failed after stage {} ({:?}): {}",
                stage,
                e.kind(),
                e
            );
        }
        result
    }

    fn advance(
        &self,
        image: RgbImage,
        config: &RunConfig,
        cancel: &CancellationToken,
        stage: &mut Stage,
    ) -> Result<PipelineResult, ValidatorError> {
        let start = Instant::now();
        let (width, height) = image.dimensions();
        tracing::debug!("Pipeline {}: {}x{} image", stage, width, height);

        let enhanced = enhance(&image, &config.enhancement)?;
        drop(image);
        *stage = Stage::Enhanced;

        check_cancelled(cancel)?;
        let raw = self
            .detector
            .detect(&enhanced.image, &config.detector, cancel)?;
        check_cancelled(cancel)?;
        *stage = Stage::Detected;
        tracing::debug!(
            "Pipeline {}: {} regions from {}",
            stage,
            raw.len(),
            self.detector.name()
        );

        let total = raw.len();
        let kept: Vec<_> = if config.drop_noise {
            raw.into_iter()
                .filter(|d| {
                    let noise = is_noise(d.text(), d.confidence());
                    if noise {
                        tracing::warn!(
                            "Dropping noise detection {:?} ({:.2})",
                            d.text(),
                            d.confidence()
                        );
                    }
                    !noise
                })
                .map(|d| {
                    let clean = normalize_text(d.text());
                    d.with_text(clean)
                })
                .collect()
        } else {
            raw
        };
        let dropped_noise = total - kept.len();

        let detections = policy::classify(kept, config.threshold)?;
        let overall_pass = config.policy.overall_pass(&detections);
        for d in &detections {
            tracing::debug!("{:?} ({:.2}): {}", d.text(), d.confidence(), d.verdict);
        }
        *stage = Stage::Classified;

        let annotated_image = self.annotator.annotate(&enhanced.image, &detections);
        *stage = Stage::Annotated;

        let result = PipelineResult {
            detections,
            annotated_image,
            overall_pass,
            policy: config.policy,
            threshold: config.threshold,
            dropped_noise,
            enhancement_steps: enhanced.steps,
            method: Method::Single,
            processing_time_ms: start.elapsed().as_millis() as u64,
        };
        *stage = Stage::Done;

        tracing::info!(
            "Validated {}x{} image: {}/{} detections passed, overall {} ({}, threshold {})",
            width,
            height,
            result.passed_count(),
            result.detections.len(),
            if overall_pass { "PASS" } else { "FAIL" },
            config.policy.as_str(),
            config.threshold
        );

        Ok(result)
    }
}

/// Decode any supported image format into 8-bit RGB
pub fn decode_image(bytes: &[u8]) -> Result<RgbImage, ValidatorError> {
    if bytes.is_empty() {
        return Err(ValidatorError::InvalidImage("image data is empty".to_string()));
    }
    let image = image::load_from_memory(bytes)
        .map_err(|e| ValidatorError::InvalidImage(format!("Failed to decode image: {}", e)))?;
    Ok(image.into_rgb8())
}

fn check_cancelled(cancel: &CancellationToken) -> Result<(), ValidatorError> {
    if cancel.is_cancelled() {
        return Err(ValidatorError::DetectionUnavailable(
            "detection cancelled".to_string(),
        ));
    }
    Ok(())
}
