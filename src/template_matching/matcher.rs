/// Region matching implementation
///
/// Finds one template inside a freshly captured region, either by hashing every
/// template-sized window or by a single correlation pass over the region.
use super::castability::{DEFAULT_MIN_SATURATION, is_castable};
use super::hash::{PerceptualHasher, similarity};
use super::types::{CorrelationMethod, HashMatrix, MatchResult, MatchThreshold, SearchStrategy};
use crate::error::{SkillError, SkillResult};
use image::imageops::{self, FilterType};
use image::{GrayImage, RgbImage};
use imageproc::template_matching::{MatchTemplateMethod, find_extremes, match_template};

/// Canny thresholds used by the edge strategy
const CANNY_LOW: f32 = 50.0;
const CANNY_HIGH: f32 = 150.0;

/// Everything the matcher needs to know about one template
#[derive(Clone, Copy, Debug)]
pub struct MatchTarget<'a> {
    pub image: &'a RgbImage,
    pub hash: &'a HashMatrix,
    pub threshold: MatchThreshold,
}

/// Searches captured regions for templates
#[derive(Clone, Debug)]
pub struct RegionMatcher {
    strategy: SearchStrategy,
    scale_factors: Vec<f32>,
    min_saturation: f32,
}

impl RegionMatcher {
    /// Create a matcher for the given strategy with default tuning
    pub fn new(strategy: SearchStrategy) -> Self {
        Self {
            strategy,
            scale_factors: vec![1.0, 0.95, 1.05],
            min_saturation: DEFAULT_MIN_SATURATION,
        }
    }

    /// Scale factors tried, in order, by the multi-scale strategy
    pub fn with_scale_factors(mut self, scales: Vec<f32>) -> Self {
        self.scale_factors = scales;
        self
    }

    /// Mean saturation below which a hashed hit is treated as disabled
    pub fn with_min_saturation(mut self, min_saturation: f32) -> Self {
        self.min_saturation = min_saturation.clamp(0.0, 1.0);
        self
    }

    pub fn strategy(&self) -> SearchStrategy {
        self.strategy
    }

    /// Find `target` in `region` with the configured strategy
    pub fn find(&self, region: &RgbImage, target: &MatchTarget<'_>) -> SkillResult<MatchResult> {
        if target.image.width() == 0 || target.image.height() == 0 {
            return Err(SkillError::invalid_input("template image is empty"));
        }
        match self.strategy {
            SearchStrategy::HashedWindow => self.find_hashed(region, target),
            SearchStrategy::Direct(method) => {
                Ok(find_direct(region, target.image, target.threshold, method))
            }
            SearchStrategy::MultiScale => Ok(self.find_multi_scale(region, target)),
            SearchStrategy::EdgeCorrelation => Ok(find_edges(region, target.image, target.threshold)),
        }
    }

    /// Slide a template-sized window over every offset and compare hashes.
    ///
    /// Returns at the first window that clears the threshold and looks
    /// castable. Windows that clear the threshold but look disabled do not stop
    /// the scan. Otherwise reports the best similarity seen, first offset in
    /// row-major order winning ties.
    pub fn find_hashed(&self, region: &RgbImage, target: &MatchTarget<'_>) -> SkillResult<MatchResult> {
        let (tw, th) = target.image.dimensions();
        let (rw, rh) = region.dimensions();
        if tw == 0 || th == 0 {
            return Err(SkillError::invalid_input("template image is empty"));
        }
        if rw < tw || rh < th {
            return Ok(MatchResult::not_found());
        }

        let hasher = PerceptualHasher::new(target.hash.size());
        let region_gray = to_gray(region);

        let mut best_similarity = 0.0f32;
        let mut best_location: Option<(u32, u32)> = None;
        let mut suppressed = 0usize;

        for y in 0..=(rh - th) {
            for x in 0..=(rw - tw) {
                let window = imageops::crop_imm(&region_gray, x, y, tw, th).to_image();
                let window_hash = hasher.hash_gray(&window)?;
                let (sim, _) = similarity(target.hash, &window_hash)?;

                if best_location.is_none() || sim > best_similarity {
                    best_similarity = sim;
                    best_location = Some((x, y));
                }

                if target.threshold.accepts(sim) {
                    let color_window = imageops::crop_imm(region, x, y, tw, th).to_image();
                    if is_castable(&color_window, self.min_saturation) {
                        return Ok(MatchResult::found(sim, x, y));
                    }
                    suppressed += 1;
                }
            }
        }

        if suppressed > 0 {
            log::debug!(
                "⏳ {} window(s) cleared the threshold but looked disabled (best {:.3})",
                suppressed,
                best_similarity
            );
        }
        Ok(MatchResult::missed(best_similarity, best_location))
    }

    /// Direct cross-correlation at each scale factor; stops at the first scale
    /// that clears the threshold, otherwise keeps the most confident scale.
    fn find_multi_scale(&self, region: &RgbImage, target: &MatchTarget<'_>) -> MatchResult {
        let mut best = MatchResult::not_found();
        let (tw, th) = target.image.dimensions();

        for &scale in &self.scale_factors {
            let scaled;
            let template = if (scale - 1.0).abs() > 0.01 {
                let new_width = ((tw as f32 * scale).round() as u32).max(1);
                let new_height = ((th as f32 * scale).round() as u32).max(1);
                scaled = if scale < 1.0 {
                    imageops::thumbnail(target.image, new_width, new_height)
                } else {
                    imageops::resize(target.image, new_width, new_height, FilterType::Triangle)
                };
                &scaled
            } else {
                target.image
            };

            if template.width() > region.width() || template.height() > region.height() {
                log::debug!("Skipping scale {:.2}: template larger than region", scale);
                continue;
            }

            let result = find_direct(region, template, target.threshold, CorrelationMethod::CrossCorrelation);
            if result.confidence > best.confidence {
                best = result;
            }
            if best.found {
                break;
            }
        }

        best
    }
}

impl Default for RegionMatcher {
    fn default() -> Self {
        Self::new(SearchStrategy::HashedWindow)
    }
}

fn to_gray(image: &RgbImage) -> GrayImage {
    imageops::grayscale(image)
}

/// One correlation pass of `template` over `region`.
///
/// A region smaller than the template in either dimension yields
/// `found=false, confidence=0.0`.
pub fn find_direct(
    region: &RgbImage,
    template: &RgbImage,
    threshold: MatchThreshold,
    method: CorrelationMethod,
) -> MatchResult {
    if template.width() == 0
        || template.height() == 0
        || region.width() < template.width()
        || region.height() < template.height()
    {
        return MatchResult::not_found();
    }
    correlate(&to_gray(region), &to_gray(template), threshold, method)
}

/// Cross-correlation of the Canny edge maps of `region` and `template`
pub fn find_edges(region: &RgbImage, template: &RgbImage, threshold: MatchThreshold) -> MatchResult {
    if template.width() == 0
        || template.height() == 0
        || region.width() < template.width()
        || region.height() < template.height()
    {
        return MatchResult::not_found();
    }
    let region_edges = imageproc::edges::canny(&to_gray(region), CANNY_LOW, CANNY_HIGH);
    let template_edges = imageproc::edges::canny(&to_gray(template), CANNY_LOW, CANNY_HIGH);
    correlate(&region_edges, &template_edges, threshold, CorrelationMethod::CrossCorrelation)
}

fn correlate(
    region: &GrayImage,
    template: &GrayImage,
    threshold: MatchThreshold,
    method: CorrelationMethod,
) -> MatchResult {
    let imageproc_method = match method {
        CorrelationMethod::CrossCorrelation => MatchTemplateMethod::CrossCorrelationNormalized,
        CorrelationMethod::SquaredDifference => MatchTemplateMethod::SumOfSquaredErrorsNormalized,
    };
    let scores = match_template(region, template, imageproc_method);
    let extremes = find_extremes(&scores);

    let (raw, location) = match method {
        CorrelationMethod::CrossCorrelation => (extremes.max_value, extremes.max_value_location),
        CorrelationMethod::SquaredDifference => (1.0 - extremes.min_value, extremes.min_value_location),
    };
    // Flat images make the normalization degenerate
    let confidence = if raw.is_finite() { raw.clamp(0.0, 1.0) } else { 0.0 };

    if threshold.accepts(confidence) {
        MatchResult::found(confidence, location.0, location.1)
    } else {
        MatchResult::missed(confidence, Some(location))
    }
}
