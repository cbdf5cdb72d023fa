//! Visual audit of classified detections.
//!
//! Each region outline is drawn in the verdict color (Pass = green,
//! Fail = red) together with a `"{text} ({confidence}) - PASS|FAIL"` label.
//! Detections are drawn in input order, so later ones may cover earlier ones.

use crate::detection::{ClassifiedDetection, Point, Verdict};
use crate::error::ValidatorError;
use ab_glyph::FontVec;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_line_segment_mut, draw_text_mut};
use std::path::Path;
use tracing::{debug, info};

pub const PASS_COLOR: Rgb<u8> = Rgb([0, 255, 0]);

pub const FAIL_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

/// Vertical distance of the label above the first region point
const LABEL_OFFSET: f32 = 30.0;

/// Fonts tried by [`Annotator::with_system_font`], Thai-capable ones first
const SYSTEM_FONT_PATHS: [&str; 7] = [
    "/usr/share/fonts/truetype/tlwg/Garuda.ttf",
    "/usr/share/fonts/truetype/noto/NotoSansThai-Regular.ttf",
    "/usr/share/fonts/opentype/noto/NotoSansThai-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Ayuthaya.ttf",
    "C:\\Windows\\Fonts\\tahoma.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
];

pub fn verdict_color(verdict: Verdict) -> Rgb<u8> {
    match verdict {
        Verdict::Pass => PASS_COLOR,
        Verdict::Fail => FAIL_COLOR,
    }
}

/// Label text drawn next to a region
pub fn label_for(detection: &ClassifiedDetection) -> String {
    format!(
        "{} ({:.2}) - {}",
        detection.text(),
        detection.confidence(),
        detection.verdict.as_str().to_uppercase()
    )
}

/// Draws detection outlines and labels onto copies of images.
pub struct Annotator {
    /// Label font. Without one only outlines are drawn.
    pub font: Option<FontVec>,
    pub font_scale: f32,
    pub stroke_width: u32,
}

impl Default for Annotator {
    fn default() -> Self {
        Self {
            font: None,
            font_scale: 22.0,
            stroke_width: 3,
        }
    }
}

impl Annotator {
    pub fn with_font_path(font_path: &Path) -> Result<Self, ValidatorError> {
        let font_data = std::fs::read(font_path).map_err(|e| {
            ValidatorError::Configuration(format!(
                "Failed to read font {}: {}",
                font_path.display(),
                e
            ))
        })?;
        let font = FontVec::try_from_vec(font_data).map_err(|_| {
            ValidatorError::Configuration(format!(
                "Failed to parse font file: {}",
                font_path.display()
            ))
        })?;

        Ok(Self {
            font: Some(font),
            ..Self::default()
        })
    }

    /// Load the first usable system font, or fall back to outline-only drawing
    pub fn with_system_font() -> Self {
        for path in SYSTEM_FONT_PATHS {
            if let Ok(font_data) = std::fs::read(path) {
                if let Ok(font) = FontVec::try_from_vec(font_data) {
                    info!("Loaded annotation font: {}", path);
                    return Self {
                        font: Some(font),
                        ..Self::default()
                    };
                }
            }
        }

        debug!("No system font found, labels will be skipped");
        Self::default()
    }

    /// Returns an annotated copy of `image` with the same dimensions
    pub fn annotate(&self, image: &RgbImage, detections: &[ClassifiedDetection]) -> RgbImage {
        let mut canvas = image.clone();

        for detection in detections {
            let color = verdict_color(detection.verdict);
            self.draw_outline(&mut canvas, detection.region(), color);
            self.draw_label(&mut canvas, detection, color);
        }

        canvas
    }

    fn draw_outline(&self, canvas: &mut RgbImage, region: &[Point; 4], color: Rgb<u8>) {
        // Strokes wider than one pixel are drawn as parallel offset lines
        let half = (self.stroke_width.max(1) as i32 - 1) / 2;
        let extra = (self.stroke_width.max(1) as i32 - 1) % 2;

        for i in 0..region.len() {
            let start = region[i];
            let end = region[(i + 1) % region.len()];

            for dy in -half..=half + extra {
                for dx in -half..=half + extra {
                    draw_line_segment_mut(
                        canvas,
                        (start.x + dx as f32, start.y + dy as f32),
                        (end.x + dx as f32, end.y + dy as f32),
                        color,
                    );
                }
            }
        }
    }

    fn draw_label(&self, canvas: &mut RgbImage, detection: &ClassifiedDetection, color: Rgb<u8>) {
        let Some(ref font) = self.font else { return };

        let anchor = detection.region()[0];
        let x = anchor.x.round() as i32;
        let y = (anchor.y - LABEL_OFFSET).max(0.0).round() as i32;

        draw_text_mut(
            canvas,
            color,
            x,
            y,
            self.font_scale,
            font,
            &label_for(detection),
        );
    }
}
