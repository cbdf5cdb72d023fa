#![allow(dead_code)]

use image::{ImageFormat, Rgb, RgbImage};
use plate_ocr_validator::detection::quad_from_box;
use plate_ocr_validator::{DetectorConfig, RawDetection, TextDetector, ValidatorError};
use std::io::Cursor;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Detector returning canned `(text, confidence)` pairs, one row each
pub struct StubDetector {
    pub name: &'static str,
    pub results: Vec<(&'static str, f32)>,
}

impl StubDetector {
    pub fn new(name: &'static str, results: Vec<(&'static str, f32)>) -> Self {
        Self { name, results }
    }
}

impl TextDetector for StubDetector {
    fn name(&self) -> &'static str {
        self.name
    }

    fn description(&self) -> &'static str {
        "canned detections for tests"
    }

    fn detect(
        &self,
        image: &RgbImage,
        _config: &DetectorConfig,
        _cancel: &CancellationToken,
    ) -> Result<Vec<RawDetection>, ValidatorError> {
        let width = image.width() as f32;
        self.results
            .iter()
            .enumerate()
            .map(|(i, (text, confidence))| {
                RawDetection::new(quad_from_box(0.0, i as f32, width, 1.0), *text, *confidence)
            })
            .collect()
    }

    fn supported_languages(&self) -> Vec<String> {
        vec!["tha".to_string()]
    }
}

/// Detector whose output depends on how sensitive the requested settings are
///
/// Settings with a lower text threshold than the default get `sensitive`,
/// everything else gets `normal`.
pub struct TunedDetector {
    pub sensitive: Vec<(&'static str, f32)>,
    pub normal: Vec<(&'static str, f32)>,
}

impl TunedDetector {
    pub fn new(sensitive: Vec<(&'static str, f32)>, normal: Vec<(&'static str, f32)>) -> Self {
        Self { sensitive, normal }
    }
}

impl TextDetector for TunedDetector {
    fn name(&self) -> &'static str {
        "tuned"
    }

    fn description(&self) -> &'static str {
        "answers according to the detector thresholds"
    }

    fn detect(
        &self,
        image: &RgbImage,
        config: &DetectorConfig,
        _cancel: &CancellationToken,
    ) -> Result<Vec<RawDetection>, ValidatorError> {
        let results = if config.text_threshold < DetectorConfig::default().text_threshold {
            &self.sensitive
        } else {
            &self.normal
        };
        let width = image.width() as f32;
        results
            .iter()
            .enumerate()
            .map(|(i, (text, confidence))| {
                RawDetection::new(quad_from_box(0.0, i as f32, width, 1.0), *text, *confidence)
            })
            .collect()
    }

    fn supported_languages(&self) -> Vec<String> {
        vec!["tha".to_string()]
    }
}

/// Detector whose engine is down
pub struct BrokenDetector;

impl TextDetector for BrokenDetector {
    fn name(&self) -> &'static str {
        "broken"
    }

    fn description(&self) -> &'static str {
        "always fails"
    }

    fn detect(
        &self,
        _image: &RgbImage,
        _config: &DetectorConfig,
        _cancel: &CancellationToken,
    ) -> Result<Vec<RawDetection>, ValidatorError> {
        Err(ValidatorError::DetectionUnavailable(
            "model not loaded".to_string(),
        ))
    }

    fn supported_languages(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Detector that blocks until cancelled
pub struct SlowDetector;

impl TextDetector for SlowDetector {
    fn name(&self) -> &'static str {
        "slow"
    }

    fn description(&self) -> &'static str {
        "waits for cancellation"
    }

    fn detect(
        &self,
        _image: &RgbImage,
        _config: &DetectorConfig,
        cancel: &CancellationToken,
    ) -> Result<Vec<RawDetection>, ValidatorError> {
        while !cancel.is_cancelled() {
            std::thread::sleep(Duration::from_millis(10));
        }
        Err(ValidatorError::DetectionUnavailable(
            "detection cancelled".to_string(),
        ))
    }

    fn supported_languages(&self) -> Vec<String> {
        Vec::new()
    }
}

/// A 2x2 PNG
pub fn png_2x2() -> Vec<u8> {
    let image = RgbImage::from_fn(2, 2, |x, y| Rgb([(x * 100) as u8, (y * 100) as u8, 50]));
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .expect("encode test png");
    bytes
}
