// Skill automation module
// A detection loop that watches one screen region, recognizes bound skill
// icons and presses the key bound to the first one found.

pub mod channels;
pub mod fsm;
pub mod match_image;
pub mod types;

// Re-export the main types and functions for easy access
pub use channels::{AutomationLink, create_automation_channels};
pub use fsm::{SharedState, SkillAutomation};
pub use match_image::{
    DetectionResult, IconDetector, MatchConfig, MonitorRegion, Template, TemplateMeta, TemplateStore,
};
pub use types::{AutomationCommand, AutomationEvent, DetectionState};
