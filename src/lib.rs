pub mod device;
pub mod error;
pub mod profile;
pub mod skill_automation;
pub mod template_matching;

pub use error::{SkillError, SkillResult};
pub use skill_automation::{SkillAutomation, TemplateStore};
pub use template_matching::{PerceptualHasher, RegionMatcher};
