//! Template store and per-binding bookkeeping

use crate::error::{SkillError, SkillResult};
use crate::template_matching::{HashMatrix, MatchTarget, MatchThreshold, PerceptualHasher};
use image::RgbImage;
use std::sync::Arc;
use std::time::Duration;

/// Minimum time between two triggers of the same binding
pub const DEFAULT_COOLDOWN: Duration = Duration::from_millis(500);

/// Hotkey given to icons bound automatically
pub const DEFAULT_HOTKEY: &str = "1";

/// A bound reference icon plus the metadata needed to act on it
#[derive(Debug, Clone)]
pub struct Template {
    pub id: String,
    pub image: Arc<RgbImage>,
    pub hash: HashMatrix,
    pub threshold: MatchThreshold,
    pub hotkey: String,
    pub display_text: String,
    pub cooldown: Duration,
}

impl Template {
    /// Borrowed view handed to the region matcher
    pub fn target(&self) -> MatchTarget<'_> {
        MatchTarget {
            image: &self.image,
            hash: &self.hash,
            threshold: self.threshold,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

/// Metadata supplied when binding a new icon
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateMeta {
    pub hotkey: String,
    /// Label shown to the user; derived from the id when `None`
    pub display_text: Option<String>,
    pub threshold: MatchThreshold,
    pub cooldown: Duration,
}

impl Default for TemplateMeta {
    fn default() -> Self {
        Self {
            hotkey: DEFAULT_HOTKEY.to_string(),
            display_text: None,
            threshold: MatchThreshold::default(),
            cooldown: DEFAULT_COOLDOWN,
        }
    }
}

impl TemplateMeta {
    pub fn with_hotkey(mut self, hotkey: impl Into<String>) -> Self {
        self.hotkey = hotkey.into();
        self
    }

    pub fn with_threshold(mut self, threshold: MatchThreshold) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_display_text(mut self, text: impl Into<String>) -> Self {
        self.display_text = Some(text.into());
        self
    }
}

/// `S-<first number in id>`, or the id itself when it has no digits
pub fn default_display_text(id: &str) -> String {
    let digits: String = id
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if digits.is_empty() {
        id.to_string()
    } else {
        format!("S-{digits}")
    }
}

/// Ordered collection of bound templates.
///
/// Order is insertion order and decides which binding wins when several
/// match in the same cycle.
#[derive(Debug, Clone)]
pub struct TemplateStore {
    templates: Vec<Template>,
    hasher: PerceptualHasher,
}

impl TemplateStore {
    pub fn new(hash_size: usize) -> Self {
        Self {
            templates: Vec::new(),
            hasher: PerceptualHasher::new(hash_size),
        }
    }

    pub fn hash_size(&self) -> usize {
        self.hasher.hash_size()
    }

    /// Bind `image` under `id`, hashing it once up front
    pub fn add(&mut self, id: &str, image: RgbImage, meta: TemplateMeta) -> SkillResult<&Template> {
        if self.get(id).is_some() {
            return Err(SkillError::DuplicateTemplate { id: id.to_string() });
        }
        let hash = self.hasher.hash(&image)?;
        let display_text = meta
            .display_text
            .unwrap_or_else(|| default_display_text(id));

        log::info!(
            "➕ Bound template '{}' ({}x{}) to '{}' at threshold {:.2}",
            id,
            image.width(),
            image.height(),
            meta.hotkey,
            meta.threshold.value()
        );
        self.templates.push(Template {
            id: id.to_string(),
            image: Arc::new(image),
            hash,
            threshold: meta.threshold,
            hotkey: meta.hotkey,
            display_text,
            cooldown: meta.cooldown,
        });
        let index = self.templates.len() - 1;
        Ok(&self.templates[index])
    }

    /// `base`, or `base_1`, `base_2`, ... whichever is free first
    pub fn unique_id(&self, base: &str) -> String {
        if self.get(base).is_none() {
            return base.to_string();
        }
        (1..)
            .map(|n| format!("{base}_{n}"))
            .find(|candidate| self.get(candidate).is_none())
            .unwrap_or_else(|| base.to_string())
    }

    /// First free `S-<n>` id, starting from `len + 1`
    pub fn next_auto_id(&self) -> String {
        (self.templates.len() + 1..)
            .map(|n| format!("S-{n}"))
            .find(|candidate| self.get(candidate).is_none())
            .unwrap_or_else(|| format!("S-{}", self.templates.len() + 1))
    }

    /// Remove a binding; false if it was not present
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.templates.len();
        self.templates.retain(|t| t.id != id);
        let removed = self.templates.len() != before;
        if removed {
            log::info!("➖ Removed template '{}'", id);
        }
        removed
    }

    /// Replace a template's image and recompute its hash; false if absent
    pub fn reload(&mut self, id: &str, image: RgbImage) -> SkillResult<bool> {
        let hash = self.hasher.hash(&image)?;
        match self.templates.iter_mut().find(|t| t.id == id) {
            Some(template) => {
                template.image = Arc::new(image);
                template.hash = hash;
                log::debug!("🔄 Reloaded template '{}'", id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Change a binding's acceptance threshold; false if absent
    pub fn set_threshold(&mut self, id: &str, threshold: MatchThreshold) -> bool {
        match self.templates.iter_mut().find(|t| t.id == id) {
            Some(template) => {
                template.threshold = threshold;
                true
            }
            None => false,
        }
    }

    /// All templates in evaluation order
    pub fn get_all(&self) -> &[Template] {
        &self.templates
    }

    pub fn get(&self, id: &str) -> Option<&Template> {
        self.templates.iter().find(|t| t.id == id)
    }

    pub fn ids(&self) -> Vec<String> {
        self.templates.iter().map(|t| t.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl Default for TemplateStore {
    fn default() -> Self {
        Self::new(crate::template_matching::DEFAULT_HASH_SIZE)
    }
}

/// Trigger statistics for one binding
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateStats {
    pub trigger_count: u64,
    total_similarity: f64,
    pub min_similarity: Option<f32>,
    pub max_similarity: Option<f32>,
}

impl TemplateStats {
    pub fn record(&mut self, similarity: f32) {
        self.trigger_count += 1;
        self.total_similarity += f64::from(similarity);
        self.min_similarity = Some(self.min_similarity.map_or(similarity, |m| m.min(similarity)));
        self.max_similarity = Some(self.max_similarity.map_or(similarity, |m| m.max(similarity)));
    }

    pub fn average(&self) -> Option<f32> {
        (self.trigger_count > 0).then(|| (self.total_similarity / self.trigger_count as f64) as f32)
    }

    pub fn summary(&self) -> String {
        match (self.average(), self.min_similarity, self.max_similarity) {
            (Some(avg), Some(min), Some(max)) => format!(
                "{} triggers, avg {:.3}, min {:.3}, max {:.3}",
                self.trigger_count, avg, min, max
            ),
            _ => "no triggers yet".to_string(),
        }
    }
}
