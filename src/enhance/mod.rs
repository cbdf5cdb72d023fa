//! Image enhancement applied before text detection
//!
//! Contrast scaling followed by an unsharp mask, both configurable per run.

pub mod enhancer;
pub mod steps;

pub use enhancer::{enhance, EnhancementConfig, Enhanced, Preset, StepTiming};
