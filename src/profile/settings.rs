//! User-facing settings persisted with every profile

use crate::error::{SkillError, SkillResult};
use crate::template_matching::MatchThreshold;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Hotkey that toggles monitoring in interactive front ends
    pub monitor_hotkey: String,
    /// Default match threshold for new bindings
    pub threshold: f32,
    /// Sleep between detection cycles, seconds
    pub scan_interval: f32,
    /// How long a triggered key is held, seconds
    pub key_press_delay: f32,
    /// Bind unrecognized icons automatically
    pub auto_add_skills: bool,
    /// Best similarity below which a present icon counts as new
    pub new_skill_threshold: f32,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            monitor_hotkey: "`".to_string(),
            threshold: 0.90,
            scan_interval: 0.33,
            key_press_delay: 0.19,
            auto_add_skills: true,
            new_skill_threshold: 0.72,
        }
    }
}

impl AppSettings {
    pub fn validate(&self) -> SkillResult<()> {
        let invalid = |description: &str| {
            Err(SkillError::InvalidSettings {
                description: description.to_string(),
            })
        };
        if !(self.scan_interval > 0.0 && self.scan_interval <= 1.0) {
            return invalid("scan interval must be within (0, 1] seconds");
        }
        if !(self.threshold > 0.0 && self.threshold <= 1.0) {
            return invalid("match threshold must be within (0, 1]");
        }
        if !(self.key_press_delay > 0.0 && self.key_press_delay <= 1.0) {
            return invalid("key press delay must be within (0, 1] seconds");
        }
        if !(self.new_skill_threshold > 0.0 && self.new_skill_threshold < 1.0) {
            return invalid("new skill threshold must be within (0, 1)");
        }
        if self.monitor_hotkey.trim().is_empty() {
            return invalid("monitor hotkey cannot be empty");
        }
        Ok(())
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs_f32(self.scan_interval.max(0.0))
    }

    pub fn key_press_delay(&self) -> Duration {
        Duration::from_secs_f32(self.key_press_delay.max(0.0))
    }

    pub fn match_threshold(&self) -> SkillResult<MatchThreshold> {
        MatchThreshold::new(self.threshold)
    }
}
