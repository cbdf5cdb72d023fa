use image::RgbImage;

/// Channel value representing neutral gray (half of 255)
pub const NEUTRAL_GRAY: f32 = 127.5;

/// Scale every channel's distance from neutral gray by `multiplier`
///
/// Channels are processed independently and clamped to 0-255.
pub fn apply(image: &RgbImage, multiplier: f32) -> RgbImage {
    let mut adjusted = image.clone();
    for pixel in adjusted.pixels_mut() {
        for channel in pixel.0.iter_mut() {
            *channel = scale_channel(*channel, multiplier);
        }
    }
    adjusted
}

fn scale_channel(value: u8, multiplier: f32) -> u8 {
    let scaled = NEUTRAL_GRAY + (value as f32 - NEUTRAL_GRAY) * multiplier;
    scaled.round().clamp(0.0, 255.0) as u8
}
