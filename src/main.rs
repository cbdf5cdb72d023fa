use anyhow::Context;
use clap::Parser;
use plate_ocr_validator::config::{Args, Command, Config};
use plate_ocr_validator::{server, DetectorRegistry, Pipeline, ValidationReport};
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let command = args.command.take().unwrap_or(Command::Serve);
    let config = Config::from(args);

    // Fail at startup rather than on the first request
    config.default_plan().validate()?;

    match command {
        Command::Serve => {
            tracing::info!(
                "Starting plate-ocr-validator v{}",
                env!("CARGO_PKG_VERSION")
            );
            tracing::info!("Binding to {}:{}", config.host, config.port);

            server::run(config).await
        }
        Command::Check { input, output } => {
            tokio::task::spawn_blocking(move || check(&config, &input, output.as_deref()))
                .await?
        }
    }
}

/// Validate one file and print the report
fn check(config: &Config, input: &Path, output: Option<&Path>) -> anyhow::Result<()> {
    let detectors = DetectorRegistry::new(config)?;
    let detector = detectors
        .default_detector()
        .context("no default detector available")?;
    let annotator = config.annotator()?;

    let bytes =
        std::fs::read(input).with_context(|| format!("Failed to read {}", input.display()))?;
    let result = Pipeline::new(detector.as_ref(), &annotator).run_plan(
        &bytes,
        &config.default_plan(),
        &CancellationToken::new(),
    )?;

    if let Some(path) = output {
        result
            .annotated_image
            .save(path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::info!("Annotated image written to {}", path.display());
    }

    let report = ValidationReport::from_result(&result, None)?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
