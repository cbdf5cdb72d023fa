//! Confidence policy: per-detection verdicts and the overall verdict.

use crate::detection::{ClassifiedDetection, RawDetection, Verdict};
use crate::error::ValidatorError;

/// Confidence threshold used when none is configured
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;

/// How individual verdicts combine into the overall pass/fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregatePolicy {
    /// At least one detection passes
    AnyPass,
    /// Every detection passes (and there is at least one)
    AllPass,
}

/// Overall-pass policy applied unless a run selects another one
pub const OVERALL_PASS_POLICY: AggregatePolicy = AggregatePolicy::AnyPass;

impl Default for AggregatePolicy {
    fn default() -> Self {
        OVERALL_PASS_POLICY
    }
}

impl AggregatePolicy {
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "any" | "any-pass" | "any_pass" => Some(Self::AnyPass),
            "all" | "all-pass" | "all_pass" => Some(Self::AllPass),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AnyPass => "any-pass",
            Self::AllPass => "all-pass",
        }
    }

    /// An empty detection list never passes.
    pub fn overall_pass(&self, detections: &[ClassifiedDetection]) -> bool {
        if detections.is_empty() {
            return false;
        }
        match self {
            Self::AnyPass => detections.iter().any(|d| d.verdict.is_pass()),
            Self::AllPass => detections.iter().all(|d| d.verdict.is_pass()),
        }
    }
}

pub fn validate_threshold(threshold: f32) -> Result<f32, ValidatorError> {
    if (0.0..=1.0).contains(&threshold) {
        Ok(threshold)
    } else {
        Err(ValidatorError::InvalidThreshold(format!(
            "confidence threshold must be within [0, 1], got {}",
            threshold
        )))
    }
}

/// Verdict for a single confidence. Strictly greater than the threshold passes.
pub fn verdict_for(confidence: f32, threshold: f32) -> Verdict {
    if confidence > threshold {
        Verdict::Pass
    } else {
        Verdict::Fail
    }
}

/// Classify every detection in input order
///
/// Nothing is dropped: low-confidence detections come back as `Fail`.
pub fn classify<I>(detections: I, threshold: f32) -> Result<Vec<ClassifiedDetection>, ValidatorError>
where
    I: IntoIterator<Item = RawDetection>,
{
    let threshold = validate_threshold(threshold)?;

    Ok(detections
        .into_iter()
        .map(|detection| {
            let verdict = verdict_for(detection.confidence(), threshold);
            ClassifiedDetection { detection, verdict }
        })
        .collect())
}
