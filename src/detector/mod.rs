//! Text detector adapters
//!
//! The detection/recognition engine is an external collaborator behind the
//! [`TextDetector`] trait. Engines are conditionally compiled based on
//! feature flags; callers may also inject their own implementation.

#[cfg(feature = "engine-ocrs")]
pub mod ocrs;

#[cfg(feature = "engine-leptess")]
pub mod leptess;

#[cfg(any(feature = "engine-ocrs", feature = "engine-leptess"))]
mod models;

pub mod tsv;

use crate::config::Config;
use crate::detection::RawDetection;
use crate::enhance::Preset;
use crate::error::ValidatorError;
use image::RgbImage;
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Detection parameters forwarded untouched to the engine
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DetectorConfig {
    pub contrast_threshold: f32,
    pub text_threshold: f32,
    pub low_text_threshold: f32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            contrast_threshold: 0.05,
            text_threshold: 0.6,
            low_text_threshold: 0.3,
        }
    }
}

impl DetectorConfig {
    /// More sensitive parameters for faint plates
    pub fn aggressive() -> Self {
        Self {
            contrast_threshold: 0.02,
            text_threshold: 0.4,
            low_text_threshold: 0.15,
        }
    }

    /// Detector parameters that go with an enhancement preset
    pub fn for_preset(preset: Preset) -> Self {
        match preset {
            Preset::Aggressive | Preset::Auto => Self::aggressive(),
            Preset::None | Preset::Standard => Self::default(),
        }
    }
}

/// Trait that all text detectors must implement
///
/// One detector instance is shared across concurrent pipeline runs, so
/// implementations must either be stateless per call or synchronize access
/// to their model internally. Failures of any kind (model loading,
/// unsupported input, cancellation) are reported as
/// [`ValidatorError::DetectionUnavailable`]; callers do not retry.
pub trait TextDetector: Send + Sync {
    /// Returns the engine identifier (e.g., "ocrs", "leptess")
    fn name(&self) -> &'static str;

    /// Returns a human-readable description of the engine
    fn description(&self) -> &'static str;

    /// Find text regions in an RGB image, in engine order
    ///
    /// Long-running engines should give up once `cancel` is triggered.
    fn detect(
        &self,
        image: &RgbImage,
        config: &DetectorConfig,
        cancel: &CancellationToken,
    ) -> Result<Vec<RawDetection>, ValidatorError>;

    /// Get supported languages
    fn supported_languages(&self) -> Vec<String>;
}

/// Information about an available engine
#[derive(Debug, Clone, Serialize)]
pub struct EngineInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub supported_languages: Vec<String>,
}

/// Registry of available text detectors
pub struct DetectorRegistry {
    detectors: Vec<Arc<dyn TextDetector>>,
    default_detector: String,
}

impl DetectorRegistry {
    /// Create a registry with all compiled-in engines initialized
    pub fn new(config: &Config) -> Result<Self, ValidatorError> {
        #[allow(unused_mut)]
        let mut detectors: Vec<Arc<dyn TextDetector>> = Vec::new();

        #[cfg(feature = "engine-ocrs")]
        {
            tracing::info!("Initializing ocrs detector...");
            detectors.push(Arc::new(ocrs::OcrsDetector::new()?));
        }

        #[cfg(feature = "engine-leptess")]
        {
            tracing::info!("Initializing leptess detector...");
            detectors.push(Arc::new(leptess::LeptessDetector::new(
                &config.language,
                config.tessdata_path.as_deref(),
            )?));
        }

        let mut registry = Self::from_detectors(detectors)?;
        if let Some(name) = &config.default_engine {
            registry.set_default(name)?;
        }
        Ok(registry)
    }

    /// Build a registry from caller-owned detectors; the first becomes the default
    pub fn from_detectors(detectors: Vec<Arc<dyn TextDetector>>) -> Result<Self, ValidatorError> {
        let default_detector = detectors
            .first()
            .map(|d| d.name().to_string())
            .ok_or_else(|| {
                ValidatorError::DetectionUnavailable(
                    "No text detectors available. Build with --features engine-ocrs or --features engine-leptess".to_string(),
                )
            })?;

        Ok(Self {
            detectors,
            default_detector,
        })
    }

    pub fn set_default(&mut self, name: &str) -> Result<(), ValidatorError> {
        if self.get(name).is_none() {
            return Err(ValidatorError::Configuration(format!(
                "Unknown detector '{}'. Available: {}",
                name,
                self.list().join(", ")
            )));
        }
        self.default_detector = name.to_string();
        Ok(())
    }

    /// Get a detector by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn TextDetector>> {
        self.detectors.iter().find(|d| d.name() == name).cloned()
    }

    /// Get the default detector
    pub fn default_detector(&self) -> Option<Arc<dyn TextDetector>> {
        self.get(&self.default_detector)
    }

    pub fn default_name(&self) -> &str {
        &self.default_detector
    }

    /// List all available detector names
    pub fn list(&self) -> Vec<&str> {
        self.detectors.iter().map(|d| d.name()).collect()
    }

    /// Get info about all available detectors
    pub fn info(&self) -> Vec<EngineInfo> {
        self.detectors
            .iter()
            .map(|d| EngineInfo {
                name: d.name(),
                description: d.description(),
                supported_languages: d.supported_languages(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NamedDetector(&'static str);

    impl TextDetector for NamedDetector {
        fn name(&self) -> &'static str {
            self.0
        }

        fn description(&self) -> &'static str {
            "test detector"
        }

        fn detect(
            &self,
            _image: &RgbImage,
            _config: &DetectorConfig,
            _cancel: &CancellationToken,
        ) -> Result<Vec<RawDetection>, ValidatorError> {
            Ok(Vec::new())
        }

        fn supported_languages(&self) -> Vec<String> {
            vec!["tha".to_string()]
        }
    }

    fn registry() -> DetectorRegistry {
        DetectorRegistry::from_detectors(vec![
            Arc::new(NamedDetector("first")),
            Arc::new(NamedDetector("second")),
        ])
        .unwrap()
    }

    #[test]
    fn test_first_detector_is_default() {
        let registry = registry();
        assert_eq!(registry.default_name(), "first");
        assert_eq!(registry.default_detector().unwrap().name(), "first");
        assert_eq!(registry.list(), vec!["first", "second"]);
    }

    #[test]
    fn test_set_default_by_name() {
        let mut registry = registry();
        registry.set_default("second").unwrap();
        assert_eq!(registry.default_name(), "second");
        assert!(registry.set_default("missing").is_err());
    }

    #[test]
    fn test_empty_registry_is_unavailable() {
        let err = DetectorRegistry::from_detectors(Vec::new()).err().unwrap();
        assert!(matches!(err, ValidatorError::DetectionUnavailable(_)));
    }

    #[test]
    fn test_info_lists_languages() {
        let info = registry().info();
        assert_eq!(info.len(), 2);
        assert_eq!(info[1].supported_languages, vec!["tha".to_string()]);
    }

    #[test]
    fn test_default_detector_config() {
        let config = DetectorConfig::default();
        assert_eq!(config.contrast_threshold, 0.05);
        assert_eq!(config.text_threshold, 0.6);
        assert_eq!(config.low_text_threshold, 0.3);
    }

    #[test]
    fn test_preset_detector_config() {
        assert_eq!(DetectorConfig::for_preset(Preset::None), DetectorConfig::default());
        assert_eq!(DetectorConfig::for_preset(Preset::Standard), DetectorConfig::default());
        assert_eq!(DetectorConfig::for_preset(Preset::Aggressive), DetectorConfig::aggressive());
        assert_eq!(DetectorConfig::for_preset(Preset::Auto), DetectorConfig::aggressive());
    }
}
