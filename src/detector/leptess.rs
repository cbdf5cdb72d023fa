//! Leptess/Tesseract detector implementation
//!
//! Tesseract-based detection with Thai language support. Uses the
//! tesseract-static crate for static linking (no system dependencies).
//! Downloads tessdata (training data) automatically on first use.

use crate::detection::RawDetection;
use crate::detector::{models, tsv, DetectorConfig, TextDetector};
use crate::error::ValidatorError;
use image::RgbImage;
use std::path::PathBuf;
use tesseract_static::tesseract::Tesseract;
use tokio_util::sync::CancellationToken;

/// Thai consonants, vowels and tone marks (U+0E01-U+0E3A) plus ASCII digits
fn thai_plate_allowlist() -> String {
    ('\u{0E01}'..='\u{0E3A}').chain('0'..='9').collect()
}

/// Tesseract text detector
pub struct LeptessDetector {
    /// Path to tessdata directory
    tessdata_path: String,
    /// Tesseract language code (e.g. "tha")
    language: String,
}

impl LeptessDetector {
    pub fn new(language: &str, tessdata_path: Option<&str>) -> Result<Self, ValidatorError> {
        let tessdata_path = match tessdata_path {
            Some(path) => path.to_string(),
            None => ensure_tessdata_available(language)?,
        };

        // Validate that tessdata is accessible by doing a test initialization
        let test_tess = Tesseract::new(Some(&tessdata_path), Some(language)).map_err(|e| {
            ValidatorError::DetectionUnavailable(format!("Failed to initialize Tesseract: {}", e))
        })?;
        drop(test_tess);

        tracing::info!(
            "Leptess detector initialized (tessdata: {}, language: {})",
            tessdata_path,
            language
        );

        Ok(Self {
            tessdata_path,
            language: language.to_string(),
        })
    }
}

impl TextDetector for LeptessDetector {
    fn name(&self) -> &'static str {
        "leptess"
    }

    fn description(&self) -> &'static str {
        "Tesseract OCR engine - Thai script support, per-word confidence"
    }

    fn detect(
        &self,
        image: &RgbImage,
        config: &DetectorConfig,
        cancel: &CancellationToken,
    ) -> Result<Vec<RawDetection>, ValidatorError> {
        let (width, height) = image.dimensions();

        // Tesseract has no equivalent thresholds; the config is accepted as-is
        tracing::debug!(
            "leptess detect {}x{} (contrast {}, text {}, low text {})",
            width,
            height,
            config.contrast_threshold,
            config.text_threshold,
            config.low_text_threshold
        );

        // BMP is always supported by leptonica
        let mut bmp_data = Vec::new();
        image
            .write_to(&mut std::io::Cursor::new(&mut bmp_data), image::ImageFormat::Bmp)
            .map_err(|e| {
                ValidatorError::DetectionUnavailable(format!("Failed to convert to BMP: {}", e))
            })?;

        let mut tess = Tesseract::new(Some(&self.tessdata_path), Some(&self.language))
            .map_err(|e| {
                ValidatorError::DetectionUnavailable(format!("Failed to create Tesseract: {}", e))
            })?;

        if self.language == "tha" {
            tess = tess
                .set_variable("tessedit_char_whitelist", &thai_plate_allowlist())
                .map_err(|e| {
                    ValidatorError::DetectionUnavailable(format!(
                        "Failed to set allow-list: {}",
                        e
                    ))
                })?;
        }

        tess = tess.set_image_from_mem(&bmp_data).map_err(|e| {
            ValidatorError::DetectionUnavailable(format!(
                "Failed to set image ({}x{}, {} bytes): {}",
                width,
                height,
                bmp_data.len(),
                e
            ))
        })?;

        if cancel.is_cancelled() {
            return Err(ValidatorError::DetectionUnavailable(
                "detection cancelled".to_string(),
            ));
        }

        tess = tess.recognize().map_err(|e| {
            ValidatorError::DetectionUnavailable(format!("Failed to recognize text: {}", e))
        })?;

        let tsv_text = tess.get_tsv_text(0).map_err(|e| {
            ValidatorError::DetectionUnavailable(format!("Failed to get TSV output: {}", e))
        })?;

        tsv::parse_lines(&tsv_text)
            .into_iter()
            .map(|line| RawDetection::new(line.region(), line.text(), line.confidence()))
            .collect()
    }

    fn supported_languages(&self) -> Vec<String> {
        vec![self.language.clone()]
    }
}

// ============================================================================
// Tessdata download helpers
// ============================================================================

/// Ensure tessdata is available, downloading if needed
fn ensure_tessdata_available(language: &str) -> Result<String, ValidatorError> {
    let cache_dir: PathBuf = models::cache_dir().join("tessdata");
    let traineddata_file = format!("{}.traineddata", language);

    models::ensure_downloaded(&tessdata_url(language), &cache_dir, &traineddata_file)?;

    // Tesseract expects the directory, not the file
    cache_dir
        .to_str()
        .map(|s| s.to_string())
        .ok_or_else(|| ValidatorError::DetectionUnavailable("Invalid tessdata path".to_string()))
}

/// Get tessdata download URL for a language
fn tessdata_url(language: &str) -> String {
    // tessdata_fast for smaller, faster downloads
    format!(
        "https://github.com/tesseract-ocr/tessdata_fast/raw/main/{}.traineddata",
        language
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowlist_covers_thai_and_digits() {
        let allowlist = thai_plate_allowlist();
        assert!(allowlist.contains('ก'));
        assert!(allowlist.contains('ฮ'));
        assert!(allowlist.contains('7'));
        assert!(!allowlist.contains('A'));
    }

    #[test]
    fn test_tessdata_url() {
        assert!(tessdata_url("tha").ends_with("/tha.traineddata"));
    }
}
