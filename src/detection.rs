//! Detection data model shared by detectors, the confidence policy and the annotator.

use crate::error::ValidatorError;
use serde::Serialize;
use std::fmt;

/// A point in image pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Quadrilateral region, points in drawing order
pub type Quad = [Point; 4];

/// Builds the quadrilateral of an axis-aligned box (clockwise from top-left)
pub fn quad_from_box(left: f32, top: f32, width: f32, height: f32) -> Quad {
    [
        Point::new(left, top),
        Point::new(left + width, top),
        Point::new(left + width, top + height),
        Point::new(left, top + height),
    ]
}

/// One text region as reported by a [`TextDetector`](crate::detector::TextDetector)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawDetection {
    region: Quad,
    text: String,
    confidence: f32,
}

impl RawDetection {
    /// Checks the detector contract: finite region points and a confidence in [0, 1].
    ///
    /// A detector that violates the contract is treated as unavailable.
    pub fn new(
        region: Quad,
        text: impl Into<String>,
        confidence: f32,
    ) -> Result<Self, ValidatorError> {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(ValidatorError::DetectionUnavailable(format!(
                "detector returned confidence {} outside [0, 1]",
                confidence
            )));
        }
        if region.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
            return Err(ValidatorError::DetectionUnavailable(
                "detector returned a region with non-finite coordinates".to_string(),
            ));
        }

        Ok(Self {
            region,
            text: text.into(),
            confidence,
        })
    }

    pub fn region(&self) -> &Quad {
        &self.region
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    /// The same region and confidence with different text
    pub fn with_text(self, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..self
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Verdict {
    Pass,
    Fail,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pass => "Pass",
            Self::Fail => "Fail",
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A [`RawDetection`] with its verdict against the confidence threshold
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedDetection {
    pub detection: RawDetection,
    pub verdict: Verdict,
}

impl ClassifiedDetection {
    pub fn region(&self) -> &Quad {
        self.detection.region()
    }

    pub fn text(&self) -> &str {
        self.detection.text()
    }

    pub fn confidence(&self) -> f32 {
        self.detection.confidence()
    }
}
