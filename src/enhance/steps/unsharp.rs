use image::RgbImage;
use imageproc::filter::gaussian_blur_f32;

/// Apply an unsharp mask to each RGB channel
///
/// The blurred copy comes from `imageproc`'s separable Gaussian kernel with
/// standard deviation `radius`. For every channel the difference to the blur is
/// scaled by `percent / 100`; where its magnitude exceeds `threshold` the scaled
/// difference is added back, otherwise the value is kept.
pub fn apply(image: &RgbImage, radius: f32, percent: u32, threshold: u32) -> RgbImage {
    // Zero radius means no blur, so every difference is zero
    if radius <= 0.0 || percent == 0 {
        return image.clone();
    }

    let blurred = gaussian_blur_f32(image, radius);
    let amount = percent as f32 / 100.0;
    let threshold = threshold as f32;

    let mut sharpened = image.clone();
    for (pixel, blur) in sharpened.pixels_mut().zip(blurred.pixels()) {
        for (channel, blur_channel) in pixel.0.iter_mut().zip(blur.0.iter()) {
            let difference = (*channel as f32 - *blur_channel as f32) * amount;
            if difference.abs() > threshold {
                *channel = (*channel as f32 + difference).round().clamp(0.0, 255.0) as u8;
            }
        }
    }

    sharpened
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn edge_image() -> RgbImage {
        // Left half dark, right half light
        RgbImage::from_fn(20, 10, |x, _| {
            if x < 10 {
                Rgb([50, 50, 50])
            } else {
                Rgb([200, 200, 200])
            }
        })
    }

    #[test]
    fn test_unsharp_enhances_edges() {
        let img = edge_image();
        let result = apply(&img, 1.0, 120, 3);

        let edge_left = result.get_pixel(9, 5).0[0];
        let edge_right = result.get_pixel(10, 5).0[0];

        let input_diff = 200i32 - 50;
        let result_diff = (edge_right as i32 - edge_left as i32).abs();

        assert!(
            result_diff > input_diff,
            "Edge should be enhanced: {} > {}",
            result_diff,
            input_diff
        );
    }

    #[test]
    fn test_unsharp_leaves_flat_regions_alone() {
        let img = edge_image();
        let result = apply(&img, 1.0, 120, 3);

        // Far from the edge the blur equals the input
        assert_eq!(result.get_pixel(0, 5), img.get_pixel(0, 5));
        assert_eq!(result.get_pixel(19, 5), img.get_pixel(19, 5));
    }

    #[test]
    fn test_zero_percent_is_identity() {
        let img = edge_image();
        assert_eq!(apply(&img, 2.0, 0, 0), img);
    }

    #[test]
    fn test_zero_radius_is_identity() {
        let img = edge_image();
        assert_eq!(apply(&img, 0.0, 200, 0), img);
    }

    #[test]
    fn test_high_threshold_suppresses_sharpening() {
        let img = edge_image();
        assert_eq!(apply(&img, 1.0, 120, 255), img);
    }

    /// Pixel with the largest difference to its blurred value, and that difference
    fn strongest_edge(img: &RgbImage, radius: f32) -> ((u32, u32), i32) {
        let blurred = gaussian_blur_f32(img, radius);
        img.enumerate_pixels()
            .map(|(x, y, p)| ((x, y), p.0[0] as i32 - blurred.get_pixel(x, y).0[0] as i32))
            .max_by_key(|(_, d)| d.abs())
            .unwrap()
    }

    fn soft_edge_image() -> RgbImage {
        RgbImage::from_fn(16, 8, |x, _| {
            if x < 8 {
                Rgb([60, 60, 60])
            } else {
                Rgb([70, 70, 70])
            }
        })
    }

    #[test]
    fn test_threshold_applies_to_scaled_difference() {
        let img = soft_edge_image();
        let ((x, y), diff) = strongest_edge(&img, 1.0);
        assert!(diff != 0);

        // Raw difference equals the threshold, doubled difference exceeds it
        let result = apply(&img, 1.0, 200, diff.unsigned_abs());
        let expected = (img.get_pixel(x, y).0[0] as i32 + 2 * diff).clamp(0, 255) as u8;
        assert_eq!(result.get_pixel(x, y).0, [expected; 3]);
    }

    #[test]
    fn test_difference_equal_to_threshold_is_kept() {
        let img = soft_edge_image();
        let ((x, y), diff) = strongest_edge(&img, 1.0);
        assert!(diff != 0);

        let result = apply(&img, 1.0, 100, diff.unsigned_abs());
        assert_eq!(result.get_pixel(x, y), img.get_pixel(x, y));
    }
}
