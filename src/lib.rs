//! License plate OCR validation
//!
//! Enhances a plate photo (contrast plus unsharp mask), hands it to a
//! [`detector::TextDetector`], classifies every detection as Pass or Fail
//! against a confidence threshold and draws the verdicts onto the image.
//! [`pipeline::Pipeline`] ties the stages together; [`server`] exposes it
//! over HTTP.

pub mod annotate;
pub mod config;
pub mod detection;
pub mod detector;
pub mod enhance;
pub mod error;
pub mod pipeline;
pub mod plate;
pub mod policy;
pub mod province;
pub mod report;
pub mod server;

pub use annotate::Annotator;
pub use detection::{ClassifiedDetection, Point, Quad, RawDetection, Verdict};
pub use detector::{DetectorConfig, DetectorRegistry, TextDetector};
pub use enhance::{enhance, EnhancementConfig, Preset};
pub use error::ValidatorError;
pub use pipeline::{Method, Pipeline, PipelineResult, RunConfig, RunPlan};
pub use policy::AggregatePolicy;
pub use province::ProvinceMatch;
pub use report::{OutputFormat, ValidationReport};
