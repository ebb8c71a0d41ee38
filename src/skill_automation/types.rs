// Types and enums for skill automation
use crate::profile::AppSettings;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionState {
    Idle,
    Scanning,
}

#[derive(Debug, Clone)]
pub enum AutomationCommand {
    Start,
    Stop,
    UpdateSettings(AppSettings),
    SetAutoAdd(bool),
    Shutdown,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AutomationEvent {
    StateChanged(DetectionState),
    Matched {
        template_id: String,
        similarity: f32,
        location: Option<(u32, u32)>,
    },
    Triggered {
        template_id: String,
        key: String,
    },
    NoMatch {
        best_similarity: f32,
    },
    CandidateNewIcon {
        foreground_ratio: f32,
    },
    TemplateAdded {
        template_id: String,
    },
    /// Key press failed; does not count towards halting
    InputFailed {
        template_id: String,
        error: String,
    },
    CycleFailed {
        error: String,
        consecutive: u32,
    },
    Halted {
        reason: String,
    },
}

impl fmt::Display for AutomationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AutomationEvent::StateChanged(DetectionState::Idle) => write!(f, "Monitoring stopped"),
            AutomationEvent::StateChanged(DetectionState::Scanning) => write!(f, "Monitoring started"),
            AutomationEvent::Matched {
                template_id,
                similarity,
                ..
            } => write!(f, "Matched {template_id} (similarity {similarity:.2})"),
            AutomationEvent::Triggered { template_id, key } => {
                write!(f, "Pressed {key} for {template_id}")
            }
            AutomationEvent::NoMatch { best_similarity } => {
                write!(f, "No match (best similarity {best_similarity:.2})")
            }
            AutomationEvent::CandidateNewIcon { foreground_ratio } => write!(
                f,
                "Unrecognized icon in region ({:.0}% foreground)",
                foreground_ratio * 100.0
            ),
            AutomationEvent::TemplateAdded { template_id } => write!(f, "Added new skill {template_id}"),
            AutomationEvent::InputFailed { template_id, error } => {
                write!(f, "Key press for {template_id} failed: {error}")
            }
            AutomationEvent::CycleFailed { error, consecutive } => {
                write!(f, "Detection cycle failed ({consecutive} in a row): {error}")
            }
            AutomationEvent::Halted { reason } => write!(f, "Monitoring halted: {reason}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_strings() {
        let matched = AutomationEvent::Matched {
            template_id: "S-1".to_string(),
            similarity: 0.934,
            location: Some((3, 4)),
        };
        assert_eq!(matched.to_string(), "Matched S-1 (similarity 0.93)");

        let candidate = AutomationEvent::CandidateNewIcon { foreground_ratio: 0.42 };
        assert_eq!(candidate.to_string(), "Unrecognized icon in region (42% foreground)");

        let failed = AutomationEvent::CycleFailed {
            error: "no frames".to_string(),
            consecutive: 2,
        };
        assert_eq!(failed.to_string(), "Detection cycle failed (2 in a row): no frames");
    }
}
