//! Saturation check that tells an active ability icon from a greyed-out one

use image::RgbImage;

/// Mean saturation (0.0-1.0) below which an icon is treated as disabled
pub const DEFAULT_MIN_SATURATION: f32 = 0.08;

/// HSV saturation of one pixel, 0.0-1.0
#[inline]
fn saturation(rgb: [u8; 3]) -> f32 {
    let max = rgb[0].max(rgb[1]).max(rgb[2]);
    let min = rgb[0].min(rgb[1]).min(rgb[2]);
    if max == 0 {
        0.0
    } else {
        (max - min) as f32 / max as f32
    }
}

/// Mean saturation of the image, `None` for an empty image
pub fn mean_saturation(image: &RgbImage) -> Option<f32> {
    let count = image.width() as u64 * image.height() as u64;
    if count == 0 {
        return None;
    }
    let sum: f64 = image.pixels().map(|p| saturation(p.0) as f64).sum();
    let mean = sum / count as f64;
    mean.is_finite().then_some(mean as f32)
}

/// Returns false only when the window is near-grayscale.
///
/// Degenerate input never blocks a cast: empty images and any value that
/// cannot be computed count as castable.
pub fn is_castable(window: &RgbImage, min_saturation: f32) -> bool {
    match mean_saturation(window) {
        Some(mean) => {
            let castable = mean >= min_saturation;
            if !castable {
                log::debug!("🩶 Window looks disabled (mean saturation {:.3} < {:.3})", mean, min_saturation);
            }
            castable
        }
        None => true,
    }
}
