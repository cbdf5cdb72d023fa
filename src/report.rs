//! JSON report and annotated image encoding

use crate::detection::{Quad, Verdict};
use crate::enhance::StepTiming;
use crate::error::ValidatorError;
use crate::pipeline::{Method, PipelineResult};
use crate::plate::PlateComponents;
use crate::province::{self, ProvinceMatch};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::{ImageFormat, RgbImage};
use serde::Serialize;
use std::io::Cursor;

/// JPEG quality of annotated output
pub const JPEG_QUALITY: u8 = 90;

/// Encoding of the annotated image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    Png,
    #[default]
    Jpeg,
}

impl OutputFormat {
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpeg" | "jpg" => Some(Self::Jpeg),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }
}

/// Encode an image in the requested format
pub fn encode_image(image: &RgbImage, format: OutputFormat) -> Result<Vec<u8>, ValidatorError> {
    let mut buffer = Vec::new();

    let written = match format {
        OutputFormat::Png => image.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png),
        OutputFormat::Jpeg => {
            let mut encoder = JpegEncoder::new_with_quality(&mut buffer, JPEG_QUALITY);
            encoder.encode_image(image)
        }
    };
    written.map_err(|e| {
        ValidatorError::EncodingError(format!(
            "Failed to encode {} image: {}",
            format.as_str(),
            e
        ))
    })?;

    Ok(buffer)
}

/// Round to two decimals, the precision confidences are reported at
pub fn round_confidence(confidence: f32) -> f32 {
    (confidence * 100.0).round() / 100.0
}

/// One detection as reported to clients
#[derive(Debug, Clone, Serialize)]
pub struct DetectionReport {
    pub region: Quad,
    pub text: String,
    pub confidence: f32,
    pub verdict: Verdict,
    /// Text with whitespace runs collapsed
    pub full_text: String,
    pub thai_letters: Vec<String>,
    pub numbers: Vec<String>,
    /// Informational; never affects the verdict
    pub province_match: Option<ProvinceMatch>,
    /// Human-readable description of what the text looks like
    pub reason: String,
}

/// Base64-encoded annotated image
#[derive(Debug, Clone, Serialize)]
pub struct EncodedImage {
    pub format: &'static str,
    pub mime_type: &'static str,
    pub data: String,
}

/// Validation result returned by the HTTP API and the `check` command
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub overall_pass: bool,
    pub policy: &'static str,
    pub threshold: f32,
    pub passed_count: usize,
    pub total_count: usize,
    pub dropped_noise: usize,
    /// Which settings produced the detections
    pub method: Method,
    pub detections: Vec<DetectionReport>,
    pub enhancement_steps: Vec<StepTiming>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotated_image: Option<EncodedImage>,
    pub processing_time_ms: u64,
}

impl ValidationReport {
    /// Build the report, embedding the annotated image when `format` is set
    pub fn from_result(
        result: &PipelineResult,
        format: Option<OutputFormat>,
    ) -> Result<Self, ValidatorError> {
        let annotated_image = match format {
            Some(format) => {
                let bytes = encode_image(&result.annotated_image, format)?;
                Some(EncodedImage {
                    format: format.as_str(),
                    mime_type: format.mime_type(),
                    data: STANDARD.encode(bytes),
                })
            }
            None => None,
        };

        let detections = result
            .detections
            .iter()
            .map(|d| {
                let components = PlateComponents::parse(d.text());
                let province_match = province::match_plate(&components);
                let reason = components.reason(province_match.as_ref());
                DetectionReport {
                    region: *d.region(),
                    text: d.text().to_string(),
                    confidence: round_confidence(d.confidence()),
                    verdict: d.verdict,
                    full_text: components.full_text,
                    thai_letters: components.thai_letters,
                    numbers: components.numbers,
                    province_match,
                    reason,
                }
            })
            .collect();

        Ok(Self {
            overall_pass: result.overall_pass,
            policy: result.policy.as_str(),
            threshold: result.threshold,
            passed_count: result.passed_count(),
            total_count: result.detections.len(),
            dropped_noise: result.dropped_noise,
            method: result.method,
            detections,
            enhancement_steps: result.enhancement_steps.clone(),
            annotated_image,
            processing_time_ms: result.processing_time_ms,
        })
    }
}
