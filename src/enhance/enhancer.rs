use crate::error::ValidatorError;
use image::RgbImage;
use serde::Serialize;
use std::time::Instant;

use super::steps;

/// Enhancement preset names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Preset {
    /// Identity transform
    None,
    /// Contrast 1.25x, unsharp mask radius 1.0 / 120% / threshold 3
    #[default]
    Standard,
    /// Contrast 1.8x, unsharp mask radius 2.0 / 200% / threshold 1.
    /// Suited to dim or blurry plates
    Aggressive,
    /// Aggressive first, falling back to Standard when it finds nothing usable
    Auto,
}

impl Preset {
    /// Parse from a configuration or form value
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "none" => Some(Self::None),
            "standard" | "default" => Some(Self::Standard),
            "aggressive" => Some(Self::Aggressive),
            "auto" => Some(Self::Auto),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Standard => "standard",
            Self::Aggressive => "aggressive",
            Self::Auto => "auto",
        }
    }

    /// Enhancement settings; for `Auto` those of its first attempt
    pub fn config(&self) -> EnhancementConfig {
        match self {
            Self::None => EnhancementConfig {
                contrast_multiplier: 1.0,
                sharpen_radius: 0.0,
                sharpen_percent: 0,
                sharpen_threshold: 0,
            },
            Self::Standard => EnhancementConfig {
                contrast_multiplier: 1.25,
                sharpen_radius: 1.0,
                sharpen_percent: 120,
                sharpen_threshold: 3,
            },
            Self::Aggressive | Self::Auto => EnhancementConfig {
                contrast_multiplier: 1.8,
                sharpen_radius: 2.0,
                sharpen_percent: 200,
                sharpen_threshold: 1,
            },
        }
    }
}

/// Parameters of the contrast + unsharp mask transform
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EnhancementConfig {
    pub contrast_multiplier: f32,
    pub sharpen_radius: f32,
    pub sharpen_percent: u32,
    pub sharpen_threshold: u32,
}

impl Default for EnhancementConfig {
    fn default() -> Self {
        Preset::Standard.config()
    }
}

impl EnhancementConfig {
    pub fn validate(&self) -> Result<(), ValidatorError> {
        if !self.contrast_multiplier.is_finite() || self.contrast_multiplier <= 0.0 {
            return Err(ValidatorError::InvalidImage(format!(
                "contrast multiplier must be positive, got {}",
                self.contrast_multiplier
            )));
        }
        if !self.sharpen_radius.is_finite() || self.sharpen_radius < 0.0 {
            return Err(ValidatorError::InvalidImage(format!(
                "sharpen radius must be non-negative, got {}",
                self.sharpen_radius
            )));
        }
        Ok(())
    }
}

/// Timing information for a single enhancement step
#[derive(Debug, Clone, Serialize)]
pub struct StepTiming {
    pub name: String,
    pub time_ms: u64,
}

/// Enhanced image plus per-step timings
#[derive(Debug, Clone)]
pub struct Enhanced {
    pub image: RgbImage,
    pub steps: Vec<StepTiming>,
}

/// Produce a contrast-adjusted, sharpened copy of `image`
///
/// Dimensions are preserved and the input is left untouched.
pub fn enhance(image: &RgbImage, config: &EnhancementConfig) -> Result<Enhanced, ValidatorError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(ValidatorError::InvalidImage(format!(
            "image has zero area ({}x{})",
            width, height
        )));
    }
    config.validate()?;

    let mut timings = Vec::new();

    let contrasted = run_step("contrast", &mut timings, || {
        steps::contrast::apply(image, config.contrast_multiplier)
    });
    let sharpened = run_step("unsharp", &mut timings, || {
        steps::unsharp::apply(
            &contrasted,
            config.sharpen_radius,
            config.sharpen_percent,
            config.sharpen_threshold,
        )
    });

    tracing::debug!(
        "Enhanced {}x{} image (contrast {}, unsharp {}/{}%/{})",
        width,
        height,
        config.contrast_multiplier,
        config.sharpen_radius,
        config.sharpen_percent,
        config.sharpen_threshold
    );

    Ok(Enhanced {
        image: sharpened,
        steps: timings,
    })
}

fn run_step<F>(name: &str, timings: &mut Vec<StepTiming>, step_fn: F) -> RgbImage
where
    F: FnOnce() -> RgbImage,
{
    let step_start = Instant::now();
    let result = step_fn();
    timings.push(StepTiming {
        name: name.to_string(),
        time_ms: step_start.elapsed().as_millis() as u64,
    });
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn sample_image() -> RgbImage {
        RgbImage::from_fn(24, 12, |x, y| {
            Rgb([(x * 10) as u8, (y * 20) as u8, ((x + y) * 5) as u8])
        })
    }

    #[test]
    fn test_defaults_match_standard_preset() {
        let config = EnhancementConfig::default();
        assert_eq!(config.contrast_multiplier, 1.25);
        assert_eq!(config.sharpen_radius, 1.0);
        assert_eq!(config.sharpen_percent, 120);
        assert_eq!(config.sharpen_threshold, 3);
    }

    #[test]
    fn test_identity_config_returns_input() {
        let img = sample_image();
        let config = EnhancementConfig {
            contrast_multiplier: 1.0,
            sharpen_radius: 1.0,
            sharpen_percent: 0,
            sharpen_threshold: 3,
        };
        let result = enhance(&img, &config).unwrap();
        assert_eq!(result.image, img);
    }

    #[test]
    fn test_preserves_dimensions() {
        let img = sample_image();
        for preset in [Preset::None, Preset::Standard, Preset::Aggressive] {
            let result = enhance(&img, &preset.config()).unwrap();
            assert_eq!(result.image.dimensions(), img.dimensions());
        }
    }

    #[test]
    fn test_auto_starts_aggressive() {
        assert_eq!(Preset::from_name("AUTO"), Some(Preset::Auto));
        assert_eq!(Preset::Auto.as_str(), "auto");
        assert_eq!(Preset::Auto.config(), Preset::Aggressive.config());
    }

    #[test]
    fn test_records_step_timings() {
        let result = enhance(&sample_image(), &EnhancementConfig::default()).unwrap();
        let names: Vec<&str> = result.steps.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["contrast", "unsharp"]);
    }

    #[test]
    fn test_rejects_empty_image() {
        let img = RgbImage::new(0, 5);
        let err = enhance(&img, &EnhancementConfig::default()).unwrap_err();
        assert!(matches!(err, ValidatorError::InvalidImage(_)));
    }

    #[test]
    fn test_rejects_non_positive_contrast() {
        let img = sample_image();
        for multiplier in [0.0, -1.0, f32::NAN] {
            let config = EnhancementConfig {
                contrast_multiplier: multiplier,
                ..EnhancementConfig::default()
            };
            let err = enhance(&img, &config).unwrap_err();
            assert!(matches!(err, ValidatorError::InvalidImage(_)));
        }
    }

    #[test]
    fn test_is_deterministic() {
        let img = sample_image();
        let config = Preset::Aggressive.config();
        let first = enhance(&img, &config).unwrap();
        let second = enhance(&img, &config).unwrap();
        assert_eq!(first.image, second.image);
    }

    #[test]
    fn test_preset_from_name() {
        assert_eq!(Preset::from_name("Aggressive"), Some(Preset::Aggressive));
        assert_eq!(Preset::from_name("default"), Some(Preset::Standard));
        assert_eq!(Preset::from_name("none"), Some(Preset::None));
        assert_eq!(Preset::from_name("extreme"), None);
    }
}
