use crate::annotate::Annotator;
use crate::detector::DetectorConfig;
use crate::enhance::{EnhancementConfig, Preset};
use crate::error::ValidatorError;
use crate::pipeline::{RunConfig, RunPlan};
use crate::policy::AggregatePolicy;
use crate::report::OutputFormat;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "plate-ocr-validator")]
#[command(about = "License plate OCR validation with confidence verdicts")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Host address to bind to
    #[arg(long, env = "PLATE_HOST", default_value = "127.0.0.1", global = true)]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "PLATE_PORT", default_value = "5000", global = true)]
    pub port: u16,

    /// Maximum upload size in bytes (default: 10MB)
    #[arg(long, env = "PLATE_MAX_FILE_SIZE", default_value = "10485760", global = true)]
    pub max_file_size: usize,

    /// Detector used when a request does not name one
    #[arg(long, env = "PLATE_ENGINE", global = true)]
    pub engine: Option<String>,

    /// Enhancement preset (none, standard, aggressive, auto)
    #[arg(long, env = "PLATE_PRESET", default_value = "standard", value_parser = parse_preset, global = true)]
    pub preset: Preset,

    /// Contrast multiplier (overrides the preset)
    #[arg(long, env = "PLATE_CONTRAST_MULTIPLIER", global = true)]
    pub contrast_multiplier: Option<f32>,

    /// Unsharp mask radius (overrides the preset)
    #[arg(long, env = "PLATE_SHARPEN_RADIUS", global = true)]
    pub sharpen_radius: Option<f32>,

    /// Unsharp mask strength in percent (overrides the preset)
    #[arg(long, env = "PLATE_SHARPEN_PERCENT", global = true)]
    pub sharpen_percent: Option<u32>,

    /// Unsharp mask threshold (overrides the preset)
    #[arg(long, env = "PLATE_SHARPEN_THRESHOLD", global = true)]
    pub sharpen_threshold: Option<u32>,

    /// Detector contrast threshold (default: 0.05, aggressive preset: 0.02)
    #[arg(long, env = "PLATE_CONTRAST_THRESHOLD", global = true)]
    pub contrast_threshold: Option<f32>,

    /// Detector text threshold (default: 0.6, aggressive preset: 0.4)
    #[arg(long, env = "PLATE_TEXT_THRESHOLD", global = true)]
    pub text_threshold: Option<f32>,

    /// Detector low-text threshold (default: 0.3, aggressive preset: 0.15)
    #[arg(long, env = "PLATE_LOW_TEXT_THRESHOLD", global = true)]
    pub low_text_threshold: Option<f32>,

    /// Detections must score strictly above this to pass
    #[arg(long, env = "PLATE_CONFIDENCE_THRESHOLD", default_value = "0.5", global = true)]
    pub confidence_threshold: f32,

    /// Overall verdict policy (any, all)
    #[arg(long, env = "PLATE_POLICY", default_value = "any", value_parser = parse_policy, global = true)]
    pub policy: AggregatePolicy,

    /// Drop noise detections (long numbers, weak single characters) before classification
    #[arg(long, env = "PLATE_DROP_NOISE", global = true)]
    pub drop_noise: bool,

    /// Annotated image format (png, jpeg)
    #[arg(long, env = "PLATE_OUTPUT_FORMAT", default_value = "jpeg", value_parser = parse_format, global = true)]
    pub output_format: OutputFormat,

    /// Font used for annotation labels (system fonts are tried if unset)
    #[arg(long, env = "PLATE_FONT_PATH", global = true)]
    pub font_path: Option<PathBuf>,

    /// Seconds a request may spend in the pipeline before detection is cancelled
    #[arg(long, env = "PLATE_DETECTION_TIMEOUT", default_value = "30", global = true)]
    pub detection_timeout_secs: u64,

    /// Tesseract language for the leptess engine
    #[arg(long, env = "PLATE_LANGUAGE", default_value = "tha", global = true)]
    pub language: String,

    /// Path to tessdata directory (downloaded to the cache dir if not set)
    #[arg(long, env = "TESSDATA_PREFIX", global = true)]
    pub tessdata_path: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info", global = true)]
    pub log_level: String,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Validate one image file and print the report as JSON
    Check {
        /// Image file to validate
        input: PathBuf,

        /// Write the annotated image to this path
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn parse_preset(s: &str) -> Result<Preset, String> {
    Preset::from_name(s).ok_or_else(|| format!("unknown preset '{}'", s))
}

fn parse_policy(s: &str) -> Result<AggregatePolicy, String> {
    AggregatePolicy::from_name(s).ok_or_else(|| format!("unknown policy '{}'", s))
}

fn parse_format(s: &str) -> Result<OutputFormat, String> {
    OutputFormat::from_name(s).ok_or_else(|| format!("unknown output format '{}'", s))
}

/// Enhancement and detector values given explicitly on the command line
///
/// These win over whatever preset a run ends up using.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ParamOverrides {
    pub contrast_multiplier: Option<f32>,
    pub sharpen_radius: Option<f32>,
    pub sharpen_percent: Option<u32>,
    pub sharpen_threshold: Option<u32>,
    pub contrast_threshold: Option<f32>,
    pub text_threshold: Option<f32>,
    pub low_text_threshold: Option<f32>,
}

impl ParamOverrides {
    pub fn enhancement(&self, preset: Preset) -> EnhancementConfig {
        self.enhancement_from(preset.config())
    }

    pub fn detector(&self, preset: Preset) -> DetectorConfig {
        self.detector_from(DetectorConfig::for_preset(preset))
    }

    fn enhancement_from(&self, base: EnhancementConfig) -> EnhancementConfig {
        EnhancementConfig {
            contrast_multiplier: self.contrast_multiplier.unwrap_or(base.contrast_multiplier),
            sharpen_radius: self.sharpen_radius.unwrap_or(base.sharpen_radius),
            sharpen_percent: self.sharpen_percent.unwrap_or(base.sharpen_percent),
            sharpen_threshold: self.sharpen_threshold.unwrap_or(base.sharpen_threshold),
        }
    }

    fn detector_from(&self, base: DetectorConfig) -> DetectorConfig {
        DetectorConfig {
            contrast_threshold: self.contrast_threshold.unwrap_or(base.contrast_threshold),
            text_threshold: self.text_threshold.unwrap_or(base.text_threshold),
            low_text_threshold: self.low_text_threshold.unwrap_or(base.low_text_threshold),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub max_file_size: usize,
    pub default_engine: Option<String>,
    /// Preset used when a request does not name one
    pub preset: Preset,
    pub overrides: ParamOverrides,
    /// Defaults for every pipeline run, resolved from `preset` and `overrides`.
    /// For `auto` these are the settings of the first attempt
    pub run: RunConfig,
    pub output_format: OutputFormat,
    pub font_path: Option<PathBuf>,
    pub detection_timeout: Duration,
    pub language: String,
    pub tessdata_path: Option<String>,
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        let overrides = ParamOverrides {
            contrast_multiplier: args.contrast_multiplier,
            sharpen_radius: args.sharpen_radius,
            sharpen_percent: args.sharpen_percent,
            sharpen_threshold: args.sharpen_threshold,
            contrast_threshold: args.contrast_threshold,
            text_threshold: args.text_threshold,
            low_text_threshold: args.low_text_threshold,
        };

        Self {
            host: args.host,
            port: args.port,
            max_file_size: args.max_file_size,
            default_engine: args.engine,
            preset: args.preset,
            overrides,
            run: RunConfig {
                enhancement: overrides.enhancement(args.preset),
                detector: overrides.detector(args.preset),
                threshold: args.confidence_threshold,
                policy: args.policy,
                drop_noise: args.drop_noise,
            },
            output_format: args.output_format,
            font_path: args.font_path,
            detection_timeout: Duration::from_secs(args.detection_timeout_secs),
            language: args.language,
            tessdata_path: args.tessdata_path,
        }
    }
}

impl Config {
    /// Annotator with the configured font, or the first system font found
    pub fn annotator(&self) -> Result<Annotator, ValidatorError> {
        match &self.font_path {
            Some(path) => Annotator::with_font_path(path),
            None => Ok(Annotator::with_system_font()),
        }
    }

    /// Runs for `preset`, keeping threshold, policy and noise handling from `base`
    pub fn plan(&self, preset: Preset, base: &RunConfig) -> RunPlan {
        let with_preset = |preset: Preset| RunConfig {
            enhancement: self.overrides.enhancement(preset),
            detector: self.overrides.detector(preset),
            ..base.clone()
        };

        match preset {
            Preset::Auto => RunPlan::Auto {
                improved: with_preset(Preset::Aggressive),
                standard: with_preset(Preset::Standard),
            },
            other => RunPlan::Single(with_preset(other)),
        }
    }

    /// Plan for the configured defaults
    pub fn default_plan(&self) -> RunPlan {
        self.plan(self.preset, &self.run)
    }
}
