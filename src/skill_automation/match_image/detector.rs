//! Per-cycle icon detection: evaluate bound templates against one capture

use super::{config::MatchConfig, template::Template};
use crate::error::SkillResult;
use crate::template_matching::{MatchResult, RegionMatcher};
use image::{RgbImage, imageops};
use std::sync::Arc;

/// Finds one template inside a captured region
pub trait IconLocator: Send + Sync {
    fn locate(&self, region: &RgbImage, template: &Template) -> SkillResult<MatchResult>;
}

impl IconLocator for RegionMatcher {
    fn locate(&self, region: &RgbImage, template: &Template) -> SkillResult<MatchResult> {
        self.find(region, &template.target())
    }
}

/// What one detection cycle concluded
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// First template in store order that cleared its threshold
    Matched {
        template_id: String,
        similarity: f32,
        location: Option<(u32, u32)>,
    },
    /// Nothing matched but the region does not look empty
    CandidateNewIcon { foreground_ratio: f32 },
    /// Nothing matched; best similarity across all templates
    NoMatch { best_similarity: f32 },
}

#[derive(Debug, Clone)]
pub struct TemplateEvaluation {
    pub template_id: String,
    pub result: MatchResult,
}

#[derive(Debug, Clone)]
pub struct DetectionResult {
    pub outcome: CycleOutcome,
    /// Templates actually evaluated, in order; stops at the first match
    pub evaluations: Vec<TemplateEvaluation>,
    pub processing_time_ms: u128,
}

impl DetectionResult {
    pub fn is_match(&self) -> bool {
        matches!(self.outcome, CycleOutcome::Matched { .. })
    }

    pub fn best_similarity(&self) -> f32 {
        self.evaluations
            .iter()
            .map(|e| e.result.confidence)
            .fold(0.0, f32::max)
    }
}

/// Share of pixels brighter than `background_luma`
pub fn foreground_ratio(region: &RgbImage, background_luma: u8) -> f32 {
    let total = region.width() as u64 * region.height() as u64;
    if total == 0 {
        return 0.0;
    }
    let bright = imageops::grayscale(region).pixels().filter(|p| p[0] > background_luma).count() as u64;
    bright as f32 / total as f32
}

/// Evaluates a template list against a captured region
pub struct IconDetector {
    locator: Arc<dyn IconLocator>,
    config: MatchConfig,
}

impl IconDetector {
    pub fn new(config: MatchConfig) -> Self {
        Self {
            locator: Arc::new(config.region_matcher()),
            config,
        }
    }

    /// Use a custom locator instead of the configured region matcher
    pub fn with_locator(locator: Arc<dyn IconLocator>, config: MatchConfig) -> Self {
        Self { locator, config }
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Run one detection pass.
    ///
    /// Templates are tried in slice order and the first accepted match ends
    /// the pass. When none is accepted the region is reported as a candidate
    /// new icon if no template came within `new_skill_threshold` and enough of
    /// the region is foreground.
    pub fn evaluate(
        &self,
        region: &RgbImage,
        templates: &[Template],
        new_skill_threshold: f32,
    ) -> SkillResult<DetectionResult> {
        let start_time = std::time::Instant::now();
        let mut evaluations = Vec::with_capacity(templates.len());

        for (i, template) in templates.iter().enumerate() {
            log::debug!(
                "🔍 Evaluating template {}/{}: {}",
                i + 1,
                templates.len(),
                template.id
            );
            let result = self.locator.locate(region, template)?;
            let accepted = result.found;
            let similarity = result.confidence;
            let location = result.location;
            evaluations.push(TemplateEvaluation {
                template_id: template.id.clone(),
                result,
            });

            if accepted {
                log::debug!("✅ '{}' matched at {:?} ({:.3})", template.id, location, similarity);
                return Ok(DetectionResult {
                    outcome: CycleOutcome::Matched {
                        template_id: template.id.clone(),
                        similarity,
                        location,
                    },
                    evaluations,
                    processing_time_ms: start_time.elapsed().as_millis(),
                });
            }
        }

        let best_similarity = evaluations
            .iter()
            .map(|e| e.result.confidence)
            .fold(0.0, f32::max);

        let outcome = if templates.is_empty() || best_similarity < new_skill_threshold {
            let ratio = foreground_ratio(region, self.config.background_luma);
            if ratio > self.config.min_foreground_ratio {
                CycleOutcome::CandidateNewIcon {
                    foreground_ratio: ratio,
                }
            } else {
                CycleOutcome::NoMatch { best_similarity }
            }
        } else {
            CycleOutcome::NoMatch { best_similarity }
        };

        Ok(DetectionResult {
            outcome,
            evaluations,
            processing_time_ms: start_time.elapsed().as_millis(),
        })
    }
}
