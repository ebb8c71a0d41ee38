//! Key input that only logs

use super::types::KeyInput;
use crate::error::{SkillError, SkillResult};
use std::sync::Mutex;

/// Records and logs key transitions instead of injecting them.
///
/// Used by replay runs and tests. Keys listed with `failing_on` report an
/// injection failure.
#[derive(Debug, Default)]
pub struct DryRunKeyInput {
    log: Mutex<Vec<String>>,
    failing: Vec<String>,
}

impl DryRunKeyInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make presses of `key` fail
    pub fn failing_on(mut self, key: impl Into<String>) -> Self {
        self.failing.push(key.into());
        self
    }

    /// Transitions so far, as `down:<key>` / `up:<key>`
    pub fn history(&self) -> Vec<String> {
        self.log.lock().map(|log| log.clone()).unwrap_or_default()
    }

    /// Keys that were pressed and released, in order
    pub fn presses(&self) -> Vec<String> {
        self.history()
            .iter()
            .filter_map(|entry| entry.strip_prefix("up:").map(str::to_string))
            .collect()
    }

    fn record(&self, entry: String) -> SkillResult<()> {
        let mut log = self.log.lock().map_err(|_| SkillError::InputInjectionFailed {
            key: entry.clone(),
            description: "key log poisoned".to_string(),
        })?;
        log.push(entry);
        Ok(())
    }
}

impl KeyInput for DryRunKeyInput {
    fn key_down(&self, key: &str) -> SkillResult<()> {
        if self.failing.iter().any(|k| k == key) {
            return Err(SkillError::InputInjectionFailed {
                key: key.to_string(),
                description: "dry-run failure".to_string(),
            });
        }
        log::debug!("⌨️ [dry-run] key down '{}'", key);
        self.record(format!("down:{key}"))
    }

    fn key_up(&self, key: &str) -> SkillResult<()> {
        log::debug!("⌨️ [dry-run] key up '{}'", key);
        self.record(format!("up:{key}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::types::{KeySpec, Modifier};
    use std::time::Duration;

    #[test]
    fn test_combo_releases_in_reverse() {
        let input = DryRunKeyInput::new();
        let spec: KeySpec = "ctrl+shift+f".parse().unwrap();
        input.press(&spec, Duration::from_millis(1)).unwrap();
        assert_eq!(
            input.history(),
            vec!["down:ctrl", "down:shift", "down:f", "up:f", "up:shift", "up:ctrl"]
        );
        assert_eq!(input.presses(), vec!["f", "shift", "ctrl"]);
    }

    #[test]
    fn test_press_combo_and_plain_key() {
        let input = DryRunKeyInput::new();
        input.press_combo(Modifier::Alt, "1", Duration::ZERO).unwrap();
        input.press_key("2", Duration::ZERO).unwrap();
        assert_eq!(
            input.history(),
            vec!["down:alt", "down:1", "up:1", "up:alt", "down:2", "up:2"]
        );
    }

    #[test]
    fn test_failed_key_still_releases_modifiers() {
        let input = DryRunKeyInput::new().failing_on("q");
        let err = input.press_combo(Modifier::Alt, "q", Duration::ZERO).unwrap_err();
        assert!(matches!(err, SkillError::InputInjectionFailed { ref key, .. } if key == "q"));
        assert_eq!(input.history(), vec!["down:alt", "up:alt"]);
    }
}
