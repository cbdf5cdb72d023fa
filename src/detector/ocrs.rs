//! OCRS detector implementation
//!
//! Pure Rust detection and recognition using the ocrs library. No system
//! dependencies required. Downloads neural network models on first use.
//! ocrs recognizes the Latin alphabet and digits only.

use crate::detection::{Point, RawDetection};
use crate::detector::{models, DetectorConfig, TextDetector};
use crate::error::ValidatorError;
use image::RgbImage;
use ocrs::{DecodeMethod, ImageSource, OcrEngine as OcrsOcrEngine, OcrEngineParams, TextItem};
use rten::Model;
use tokio_util::sync::CancellationToken;

/// Default model URLs from the ocrs project
const DETECTION_MODEL_URL: &str =
    "https://ocrs-models.s3-accelerate.amazonaws.com/text-detection.rten";
const RECOGNITION_MODEL_URL: &str =
    "https://ocrs-models.s3-accelerate.amazonaws.com/text-recognition.rten";

/// Text detector wrapping the ocrs library
pub struct OcrsDetector {
    engine: OcrsOcrEngine,
}

impl OcrsDetector {
    /// Load the models, downloading them if needed
    pub fn new() -> Result<Self, ValidatorError> {
        let cache_dir = models::cache_dir();
        let detection_model_path =
            models::ensure_downloaded(DETECTION_MODEL_URL, &cache_dir, "text-detection.rten")?;
        let recognition_model_path =
            models::ensure_downloaded(RECOGNITION_MODEL_URL, &cache_dir, "text-recognition.rten")?;

        let detection_model = Model::load_file(&detection_model_path).map_err(|e| {
            ValidatorError::DetectionUnavailable(format!("Failed to load detection model: {}", e))
        })?;
        let recognition_model = Model::load_file(&recognition_model_path).map_err(|e| {
            ValidatorError::DetectionUnavailable(format!(
                "Failed to load recognition model: {}",
                e
            ))
        })?;

        let engine = OcrsOcrEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            decode_method: DecodeMethod::Greedy,
            ..Default::default()
        })
        .map_err(|e| {
            ValidatorError::DetectionUnavailable(format!("Failed to create OCR engine: {}", e))
        })?;

        tracing::info!("ocrs detector initialized successfully");

        Ok(Self { engine })
    }
}

impl TextDetector for OcrsDetector {
    fn name(&self) -> &'static str {
        "ocrs"
    }

    fn description(&self) -> &'static str {
        "Pure Rust OCR engine - fast, no system dependencies, Latin script only"
    }

    fn detect(
        &self,
        image: &RgbImage,
        config: &DetectorConfig,
        cancel: &CancellationToken,
    ) -> Result<Vec<RawDetection>, ValidatorError> {
        // ocrs exposes no detection thresholds; the config is accepted as-is
        tracing::debug!(
            "ocrs detect {}x{} (contrast {}, text {}, low text {})",
            image.width(),
            image.height(),
            config.contrast_threshold,
            config.text_threshold,
            config.low_text_threshold
        );

        let img_source = ImageSource::from_bytes(image.as_raw(), image.dimensions()).map_err(|e| {
            ValidatorError::DetectionUnavailable(format!("Failed to create image source: {}", e))
        })?;

        let ocr_input = self.engine.prepare_input(img_source).map_err(|e| {
            ValidatorError::DetectionUnavailable(format!("Failed to prepare input: {}", e))
        })?;

        let word_rects = self.engine.detect_words(&ocr_input).map_err(|e| {
            ValidatorError::DetectionUnavailable(format!("Failed to detect words: {}", e))
        })?;

        if cancel.is_cancelled() {
            return Err(ValidatorError::DetectionUnavailable(
                "detection cancelled".to_string(),
            ));
        }

        let line_rects = self.engine.find_text_lines(&ocr_input, &word_rects);

        let line_texts = self
            .engine
            .recognize_text(&ocr_input, &line_rects)
            .map_err(|e| {
                ValidatorError::DetectionUnavailable(format!("Failed to recognize text: {}", e))
            })?;

        let mut detections = Vec::new();
        for line in line_texts.iter().flatten() {
            let text = line
                .words()
                .map(|word| word.to_string())
                .collect::<Vec<_>>()
                .join(" ");
            if text.trim().is_empty() {
                continue;
            }

            let region = line.rotated_rect().corners().map(|p| Point::new(p.x, p.y));
            let confidence = text_confidence(&text);
            detections.push(RawDetection::new(region, text, confidence)?);
        }

        Ok(detections)
    }

    fn supported_languages(&self) -> Vec<String> {
        vec!["eng".to_string()]
    }
}

// ============================================================================
// Confidence scoring heuristics
// ============================================================================

/// Score recognized plate text in [0, 1].
///
/// ocrs doesn't provide per-line confidence scores, so the recognized text is
/// judged on patterns that indicate a clean plate read.
fn text_confidence(text: &str) -> f32 {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return 0.0;
    }

    let char_score = analyze_char_frequency(trimmed);
    let length_score = analyze_length(trimmed);
    let repetition_score = repeated_run_score(trimmed);

    // Character quality gates the shape scores
    let confidence = char_score * (0.6 * length_score + 0.4 * repetition_score);

    confidence.clamp(0.0, 1.0)
}

/// Penalize special characters; plates are letters, digits and spaces.
fn analyze_char_frequency(text: &str) -> f32 {
    let total = text.chars().count();
    if total == 0 {
        return 0.0;
    }

    let plate_chars = text
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == ' ' || *c == '-')
        .count();
    let special = total - plate_chars;

    let special_ratio = special as f32 / total as f32;
    let special_penalty = 1.0 - (special_ratio * 5.0).min(1.0);

    let digit_ratio = text.chars().filter(|c| c.is_ascii_digit()).count() as f32 / total as f32;
    // Plates almost always carry a registration number
    let digit_score = if digit_ratio > 0.0 { 1.0 } else { 0.6 };

    special_penalty * 0.7 + digit_score * 0.3
}

/// Plate strings are short: a prefix, a number and maybe a province
fn analyze_length(text: &str) -> f32 {
    match text.chars().count() {
        0 => 0.0,
        1 => 0.2,
        2..=3 => 0.6,
        4..=12 => 1.0,
        13..=24 => 0.7,
        _ => 0.3,
    }
}

/// Score the longest run of one repeated character.
///
/// Registration numbers have at most four digits, so a run like "8888" is a
/// valid plate; anything longer is a recognizer stutter.
fn repeated_run_score(text: &str) -> f32 {
    let longest = text
        .split_whitespace()
        .flat_map(|token| {
            let chars: Vec<char> = token.chars().collect();
            chars
                .chunk_by(|a, b| a == b)
                .map(|run| run.len())
                .collect::<Vec<_>>()
        })
        .max()
        .unwrap_or(0);

    match longest {
        0..=4 => 1.0,
        5..=6 => 0.6,
        _ => 0.2,
    }
}
