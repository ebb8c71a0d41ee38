//! Icon matching for the skill automation loop
//!
//! This module owns the template store, the monitor region and the per-cycle
//! detector that decides which bound icon is on screen.

pub mod config;
pub mod detector;
pub mod region;
pub mod template;

#[cfg(test)]
mod tests;

// Re-export main types and functions
pub use config::{
    MatchConfig, create_default_config, create_fixed_position_config, create_scaled_icon_config,
};
pub use detector::{
    CycleOutcome, DetectionResult, IconDetector, IconLocator, TemplateEvaluation, foreground_ratio,
};
pub use region::{DisplayBounds, MonitorRegion};
pub use template::{
    DEFAULT_COOLDOWN, DEFAULT_HOTKEY, Template, TemplateMeta, TemplateStats, TemplateStore,
    default_display_text,
};
