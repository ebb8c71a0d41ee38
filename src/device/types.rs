//! Capture and input collaborator interfaces

use crate::error::{SkillError, SkillResult};
use crate::skill_automation::match_image::{DisplayBounds, MonitorRegion};
use image::RgbImage;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Pause between pressing the modifiers and the main key
pub const MODIFIER_SETTLE: Duration = Duration::from_millis(10);

/// Produces an image of an arbitrary screen rectangle
pub trait ScreenCapture: Send + Sync {
    fn capture(&self, region: &MonitorRegion) -> SkillResult<RgbImage>;

    /// Bounds of the active display, when known
    fn display_bounds(&self) -> Option<DisplayBounds> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modifier {
    Alt,
    Ctrl,
    Shift,
    Meta,
}

impl Modifier {
    pub fn as_str(self) -> &'static str {
        match self {
            Modifier::Alt => "alt",
            Modifier::Ctrl => "ctrl",
            Modifier::Shift => "shift",
            Modifier::Meta => "meta",
        }
    }

    fn parse(name: &str) -> Option<Self> {
        match name {
            "alt" => Some(Modifier::Alt),
            "ctrl" | "control" => Some(Modifier::Ctrl),
            "shift" => Some(Modifier::Shift),
            "meta" | "win" | "super" | "cmd" => Some(Modifier::Meta),
            _ => None,
        }
    }
}

/// Hotkey such as `"1"`, `"alt+1"` or `"ctrl+shift+f"`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySpec {
    pub modifiers: Vec<Modifier>,
    pub key: String,
}

impl KeySpec {
    pub fn key(key: impl Into<String>) -> Self {
        Self {
            modifiers: Vec::new(),
            key: key.into(),
        }
    }
}

impl FromStr for KeySpec {
    type Err = SkillError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || SkillError::InvalidKeySpec { spec: s.to_string() };
        let lowered = s.trim().to_lowercase();
        // A lone "+" is the plus key itself
        if lowered == "+" {
            return Ok(KeySpec::key("+"));
        }
        let mut parts: Vec<&str> = lowered.split('+').map(str::trim).collect();
        let key = parts.pop().filter(|k| !k.is_empty()).ok_or_else(invalid)?;

        let mut modifiers = Vec::with_capacity(parts.len());
        for part in parts {
            let modifier = Modifier::parse(part).ok_or_else(invalid)?;
            if !modifiers.contains(&modifier) {
                modifiers.push(modifier);
            }
        }
        Ok(KeySpec {
            modifiers,
            key: key.to_string(),
        })
    }
}

impl fmt::Display for KeySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for modifier in &self.modifiers {
            write!(f, "{}+", modifier.as_str())?;
        }
        write!(f, "{}", self.key)
    }
}

/// Simulated keyboard.
///
/// Implementors provide raw key down/up; `press` and `press_combo` build the
/// hold-and-release sequence on top.
pub trait KeyInput: Send + Sync {
    fn key_down(&self, key: &str) -> SkillResult<()>;
    fn key_up(&self, key: &str) -> SkillResult<()>;

    /// Press modifiers, then the key, hold, and release in reverse order
    fn press(&self, spec: &KeySpec, hold: Duration) -> SkillResult<()> {
        let mut held: Vec<&str> = Vec::with_capacity(spec.modifiers.len());
        let mut result = Ok(());

        for modifier in &spec.modifiers {
            match self.key_down(modifier.as_str()) {
                Ok(()) => held.push(modifier.as_str()),
                Err(e) => {
                    result = Err(e);
                    break;
                }
            }
        }

        if result.is_ok() {
            if !held.is_empty() {
                std::thread::sleep(MODIFIER_SETTLE);
            }
            result = self.key_down(&spec.key).and_then(|()| {
                std::thread::sleep(hold);
                self.key_up(&spec.key)
            });
        }

        // Never leave a modifier stuck down
        for key in held.iter().rev() {
            if let Err(e) = self.key_up(key) {
                log::warn!("⚠️ Failed to release '{}': {}", key, e);
            }
        }
        result
    }

    fn press_key(&self, key: &str, hold: Duration) -> SkillResult<()> {
        self.press(&KeySpec::key(key), hold)
    }

    fn press_combo(&self, modifier: Modifier, key: &str, hold: Duration) -> SkillResult<()> {
        self.press(
            &KeySpec {
                modifiers: vec![modifier],
                key: key.to_string(),
            },
            hold,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_key() {
        let spec: KeySpec = "1".parse().unwrap();
        assert_eq!(spec, KeySpec::key("1"));
        assert_eq!(spec.to_string(), "1");
    }

    #[test]
    fn test_parse_combo() {
        let spec: KeySpec = "Ctrl + Shift+F".parse().unwrap();
        assert_eq!(spec.modifiers, vec![Modifier::Ctrl, Modifier::Shift]);
        assert_eq!(spec.key, "f");
        assert_eq!(spec.to_string(), "ctrl+shift+f");

        let alt: KeySpec = "alt+1".parse().unwrap();
        assert_eq!(alt.modifiers, vec![Modifier::Alt]);
    }

    #[test]
    fn test_parse_rejects_bad_specs() {
        for bad in ["", "alt+", "hyper+1", "ctrl++"] {
            assert!(
                matches!(bad.parse::<KeySpec>(), Err(SkillError::InvalidKeySpec { .. })),
                "'{bad}' should be rejected"
            );
        }
        assert_eq!("+".parse::<KeySpec>().unwrap().key, "+");
    }
}
