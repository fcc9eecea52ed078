use image::imageops::{self, FilterType};
use image::{GrayImage, RgbImage};

/// Comparison thumbnail width in pixels.
pub const THUMBNAIL_WIDTH: u32 = 128;
/// Comparison thumbnail height in pixels.
pub const THUMBNAIL_HEIGHT: u32 = 72;

/// Sliding window side length for the local SSIM statistics.
const WINDOW: u32 = 7;
const K1: f64 = 0.01;
const K2: f64 = 0.03;

/// Reduce a full-resolution frame to the fixed-size grayscale thumbnail all
/// similarity comparisons operate on.
pub fn thumbnail(image: &RgbImage) -> GrayImage {
    let gray = imageops::grayscale(image);
    imageops::resize(&gray, THUMBNAIL_WIDTH, THUMBNAIL_HEIGHT, FilterType::Triangle)
}

/// Mean structural similarity between two equally-sized thumbnails, in
/// [-1, 1] with higher meaning more similar.
///
/// Local statistics are taken over a uniform square window with sample
/// normalization. The dynamic range is derived from the candidate's own
/// min/max; a flat candidate carries no structure to compare, so it scores
/// the maximal 1.0 rather than dividing by a zero range.
pub fn ssim(candidate: &GrayImage, reference: &GrayImage) -> f64 {
    assert_eq!(
        candidate.dimensions(),
        reference.dimensions(),
        "thumbnail dimensions must match"
    );
    let (width, height) = candidate.dimensions();
    assert!(
        width >= WINDOW && height >= WINDOW,
        "thumbnails must be at least {WINDOW}x{WINDOW}"
    );

    let mut min = u8::MAX;
    let mut max = u8::MIN;
    for pixel in candidate.pixels() {
        min = min.min(pixel.0[0]);
        max = max.max(pixel.0[0]);
    }
    let data_range = (max - min) as f64;
    if data_range == 0.0 {
        return 1.0;
    }

    let c1 = (K1 * data_range).powi(2);
    let c2 = (K2 * data_range).powi(2);

    let n = (WINDOW * WINDOW) as f64;
    let cov_norm = n / (n - 1.0);

    let mut total = 0.0;
    let mut windows = 0u32;

    for y0 in 0..=(height - WINDOW) {
        for x0 in 0..=(width - WINDOW) {
            let mut sum_x = 0.0;
            let mut sum_y = 0.0;
            let mut sum_xx = 0.0;
            let mut sum_yy = 0.0;
            let mut sum_xy = 0.0;

            for dy in 0..WINDOW {
                for dx in 0..WINDOW {
                    let x = candidate.get_pixel(x0 + dx, y0 + dy).0[0] as f64;
                    let y = reference.get_pixel(x0 + dx, y0 + dy).0[0] as f64;
                    sum_x += x;
                    sum_y += y;
                    sum_xx += x * x;
                    sum_yy += y * y;
                    sum_xy += x * y;
                }
            }

            let mean_x = sum_x / n;
            let mean_y = sum_y / n;
            let var_x = cov_norm * (sum_xx / n - mean_x * mean_x);
            let var_y = cov_norm * (sum_yy / n - mean_y * mean_y);
            let cov_xy = cov_norm * (sum_xy / n - mean_x * mean_y);

            let luminance = (2.0 * mean_x * mean_y + c1) / (mean_x * mean_x + mean_y * mean_y + c1);
            let contrast_structure = (2.0 * cov_xy + c2) / (var_x + var_y + c2);

            total += luminance * contrast_structure;
            windows += 1;
        }
    }

    total / windows as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb};

    /// 8-pixel checkerboard, optionally phase-inverted.
    fn checker(inverted: bool) -> GrayImage {
        GrayImage::from_fn(THUMBNAIL_WIDTH, THUMBNAIL_HEIGHT, |x, y| {
            let on = (x / 8 + y / 8) % 2 == 0;
            if on != inverted {
                Luma([255u8])
            } else {
                Luma([0u8])
            }
        })
    }

    #[test]
    fn thumbnail_output_is_fixed_size() {
        let frame = RgbImage::from_pixel(640, 360, Rgb([10, 200, 30]));
        let thumb = thumbnail(&frame);
        assert_eq!(thumb.dimensions(), (THUMBNAIL_WIDTH, THUMBNAIL_HEIGHT));
    }

    #[test]
    fn identical_thumbnails_score_one() {
        let a = checker(false);
        let score = ssim(&a, &a);
        assert!((score - 1.0).abs() < 1e-9, "score was {score}");
    }

    #[test]
    fn flat_candidate_scores_maximal() {
        let flat = GrayImage::from_pixel(THUMBNAIL_WIDTH, THUMBNAIL_HEIGHT, Luma([77]));
        let textured = checker(false);
        assert_eq!(ssim(&flat, &textured), 1.0);
    }

    #[test]
    fn flat_reference_does_not_trigger_range_guard() {
        let textured = checker(false);
        let flat = GrayImage::from_pixel(THUMBNAIL_WIDTH, THUMBNAIL_HEIGHT, Luma([127]));
        let score = ssim(&textured, &flat);
        assert!(score < 0.5, "score was {score}");
    }

    #[test]
    fn inverted_pattern_scores_low() {
        let score = ssim(&checker(false), &checker(true));
        assert!(score < 0.0, "score was {score}");
    }

    #[test]
    fn small_change_scores_high_but_below_one() {
        let reference = checker(false);
        let mut candidate = checker(false);
        for y in 0..8 {
            for x in 0..8 {
                let value = candidate.get_pixel(x, y).0[0];
                candidate.put_pixel(x, y, Luma([255 - value]));
            }
        }
        let score = ssim(&candidate, &reference);
        assert!(score > 0.9, "score was {score}");
        assert!(score < 1.0, "score was {score}");
    }
}
