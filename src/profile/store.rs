//! Named profiles on disk: a JSON record per profile plus one PNG per binding

use super::settings::AppSettings;
use crate::error::{SkillError, SkillResult};
use crate::skill_automation::match_image::{
    DEFAULT_COOLDOWN, MonitorRegion, TemplateMeta, TemplateStore,
};
use crate::template_matching::MatchThreshold;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const HISTORY_STEM: &str = "last_config";

/// Sidecar record for one binding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BindingRecord {
    pub id: String,
    #[serde(default)]
    pub hotkey: String,
    #[serde(default)]
    pub display_text: String,
    #[serde(default)]
    pub threshold: MatchThreshold,
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,
    /// File name of the binding's PNG inside the template directory
    pub image_file: String,
}

fn default_cooldown_ms() -> u64 {
    DEFAULT_COOLDOWN.as_millis() as u64
}

/// On-disk layout of `<config_dir>/<name>.json`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileRecord {
    pub monitor_region: Option<MonitorRegion>,
    pub settings: AppSettings,
    /// In evaluation order
    pub bindings: Vec<BindingRecord>,
}

/// Contents of `last_config.json`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct History {
    pub last_profile: Option<String>,
    pub settings: Option<AppSettings>,
    pub monitor_region: Option<MonitorRegion>,
}

/// A profile read back into memory
#[derive(Debug, Clone)]
pub struct LoadedProfile {
    pub name: String,
    pub store: TemplateStore,
    pub region: Option<MonitorRegion>,
    pub settings: AppSettings,
}

/// Keep only characters that are safe in a file name
pub fn sanitize_file_stem(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}

/// `<profile>.<index>.<stem>.png`. Profile names never contain '.', and the
/// index is unique within a profile, so two bindings never share a file.
fn image_file_name(profile: &str, index: usize, template_id: &str) -> String {
    format!("{}.{}.{}.png", profile, index, sanitize_file_stem(template_id))
}

pub struct ProfileStore {
    config_dir: PathBuf,
    template_dir: PathBuf,
}

impl ProfileStore {
    /// Open (creating if needed) the given directories
    pub fn new(config_dir: impl Into<PathBuf>, template_dir: impl Into<PathBuf>) -> SkillResult<Self> {
        let store = Self {
            config_dir: config_dir.into(),
            template_dir: template_dir.into(),
        };
        for dir in [&store.config_dir, &store.template_dir] {
            fs::create_dir_all(dir).map_err(|source| SkillError::Io {
                path: dir.clone(),
                source,
            })?;
        }
        Ok(store)
    }

    /// `<base>/configs` and `<base>/templates`
    pub fn with_base_dir(base: impl AsRef<Path>) -> SkillResult<Self> {
        let base = base.as_ref();
        Self::new(base.join("configs"), base.join("templates"))
    }

    /// `~/.skill-trigger`, when a home directory can be found
    pub fn default_base_dir() -> Option<PathBuf> {
        homedir::my_home()
            .ok()
            .flatten()
            .map(|home| home.join(".skill-trigger"))
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn template_dir(&self) -> &Path {
        &self.template_dir
    }

    fn profile_path(&self, name: &str) -> PathBuf {
        self.config_dir.join(format!("{name}.json"))
    }

    fn history_path(&self) -> PathBuf {
        self.config_dir.join(format!("{HISTORY_STEM}.json"))
    }

    /// Where `save_profile` writes the binding at `index`
    pub fn template_path(&self, profile: &str, index: usize, template_id: &str) -> PathBuf {
        self.template_dir.join(image_file_name(profile, index, template_id))
    }

    /// Image recorded for a binding; `None` when the record names no plain file
    fn binding_image_path(&self, binding: &BindingRecord) -> Option<PathBuf> {
        Path::new(&binding.image_file)
            .file_name()
            .map(|file| self.template_dir.join(file))
    }

    /// Record currently on disk, if any. A malformed one is only logged.
    fn existing_record(&self, name: &str) -> Option<ProfileRecord> {
        let path = self.profile_path(name);
        if !path.is_file() {
            return None;
        }
        match read_json(&path) {
            Ok(record) => Some(record),
            Err(e) => {
                log::warn!("⚠️ Ignoring unreadable profile record: {}", e);
                None
            }
        }
    }

    fn check_name(name: &str) -> SkillResult<()> {
        if name.is_empty() || name == HISTORY_STEM || sanitize_file_stem(name) != name {
            return Err(SkillError::InvalidSettings {
                description: format!("'{name}' is not a usable profile name"),
            });
        }
        Ok(())
    }

    /// Profile names, sorted
    pub fn list_profiles(&self) -> SkillResult<Vec<String>> {
        let entries = fs::read_dir(&self.config_dir).map_err(|source| SkillError::Io {
            path: self.config_dir.clone(),
            source,
        })?;
        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().and_then(|e| e.to_str()) == Some("json"))
            .filter_map(|path| path.file_stem().and_then(|s| s.to_str()).map(str::to_string))
            .filter(|stem| stem != HISTORY_STEM)
            .collect();
        names.sort();
        Ok(names)
    }

    pub fn profile_exists(&self, name: &str) -> bool {
        Self::check_name(name).is_ok() && self.profile_path(name).is_file()
    }

    /// Write every binding's image and the profile record
    pub fn save_profile(
        &self,
        name: &str,
        templates: &TemplateStore,
        region: Option<MonitorRegion>,
        settings: &AppSettings,
    ) -> SkillResult<PathBuf> {
        Self::check_name(name)?;
        let previous = self.existing_record(name);

        let mut bindings = Vec::with_capacity(templates.len());
        for (index, template) in templates.get_all().iter().enumerate() {
            let image_file = image_file_name(name, index, &template.id);
            let image_path = self.template_dir.join(&image_file);
            template
                .image
                .save(&image_path)
                .map_err(|source| SkillError::ImageCodec {
                    path: image_path.clone(),
                    source,
                })?;
            bindings.push(BindingRecord {
                id: template.id.clone(),
                hotkey: template.hotkey.clone(),
                display_text: template.display_text.clone(),
                threshold: template.threshold,
                cooldown_ms: template.cooldown.as_millis() as u64,
                image_file,
            });
        }

        let record = ProfileRecord {
            monitor_region: region,
            settings: settings.clone(),
            bindings,
        };
        let path = self.profile_path(name);
        write_json(&path, &record)?;

        // Drop images the previous save wrote that this record no longer uses
        for stale in previous.iter().flat_map(|old| &old.bindings) {
            if record.bindings.iter().any(|b| b.image_file == stale.image_file) {
                continue;
            }
            if let Some(stale_path) = self.binding_image_path(stale)
                && stale_path.is_file()
                && let Err(e) = fs::remove_file(&stale_path)
            {
                log::warn!("⚠️ Could not remove stale template {}: {}", stale_path.display(), e);
            }
        }
        log::info!("💾 Saved profile '{}' ({} bindings) to {}", name, templates.len(), path.display());
        Ok(path)
    }

    /// Read a profile back, re-hashing every template image
    pub fn load_profile(&self, name: &str, hash_size: usize) -> SkillResult<LoadedProfile> {
        Self::check_name(name)?;
        let path = self.profile_path(name);
        if !path.is_file() {
            return Err(SkillError::ProfileNotFound {
                name: name.to_string(),
            });
        }
        let record: ProfileRecord = read_json(&path)?;

        let mut store = TemplateStore::new(hash_size);
        for binding in &record.bindings {
            let Some(image_path) = self.binding_image_path(binding).filter(|p| p.is_file()) else {
                log::warn!(
                    "⚠️ Template image '{}' for '{}' missing, skipping",
                    binding.image_file,
                    binding.id
                );
                continue;
            };
            let image = image::open(&image_path)
                .map_err(|source| SkillError::ImageCodec {
                    path: image_path.clone(),
                    source,
                })?
                .to_rgb8();

            let id = store.unique_id(&binding.id);
            if id != binding.id {
                log::warn!("⚠️ Duplicate binding '{}' in profile '{}', loaded as '{}'", binding.id, name, id);
            }
            let mut meta = TemplateMeta {
                hotkey: binding.hotkey.clone(),
                display_text: None,
                threshold: binding.threshold,
                cooldown: Duration::from_millis(binding.cooldown_ms),
            };
            if !binding.display_text.is_empty() {
                meta.display_text = Some(binding.display_text.clone());
            }
            store.add(&id, image, meta)?;
        }

        log::info!("📂 Loaded profile '{}' with {} bindings", name, store.len());
        Ok(LoadedProfile {
            name: name.to_string(),
            store,
            region: record.monitor_region,
            settings: record.settings,
        })
    }

    /// Delete the profile record and the template images it lists.
    ///
    /// Returns false when the profile does not exist.
    pub fn delete_profile(&self, name: &str) -> SkillResult<bool> {
        Self::check_name(name)?;
        let path = self.profile_path(name);
        if !path.is_file() {
            return Ok(false);
        }
        let record = self.existing_record(name);

        fs::remove_file(&path).map_err(|source| SkillError::Io { path: path.clone(), source })?;
        for binding in record.iter().flat_map(|r| &r.bindings) {
            let Some(image_path) = self.binding_image_path(binding) else {
                continue;
            };
            if image_path.is_file() {
                fs::remove_file(&image_path).map_err(|source| SkillError::Io {
                    path: image_path.clone(),
                    source,
                })?;
            }
        }

        log::info!("🗑️ Deleted profile '{}'", name);
        Ok(true)
    }

    /// `None` when no history has been written yet
    pub fn load_history(&self) -> SkillResult<Option<History>> {
        let path = self.history_path();
        if !path.is_file() {
            return Ok(None);
        }
        read_json(&path).map(Some)
    }

    pub fn save_history(&self, history: &History) -> SkillResult<()> {
        write_json(&self.history_path(), history)
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> SkillResult<T> {
    let json = fs::read_to_string(path).map_err(|source| SkillError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&json).map_err(|source| SkillError::ProfileFormat {
        path: path.to_path_buf(),
        source,
    })
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> SkillResult<()> {
    let json = serde_json::to_string_pretty(value).map_err(|source| SkillError::ProfileFormat {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, json).map_err(|source| SkillError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn temp_base(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("skill-trigger-profile-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    fn icon(seed: u8) -> RgbImage {
        RgbImage::from_fn(18, 18, |x, y| {
            Rgb([
                (x as u8).wrapping_mul(seed).wrapping_add(y as u8),
                (y as u8).wrapping_mul(29),
                seed.wrapping_mul(x as u8 ^ y as u8),
            ])
        })
    }

    #[test]
    fn test_template_round_trip_is_pixel_identical() {
        let base = temp_base("round-trip");
        let profiles = ProfileStore::with_base_dir(&base).unwrap();

        let mut store = TemplateStore::default();
        store
            .add("S-1", icon(7), TemplateMeta::default().with_hotkey("alt+1"))
            .unwrap();
        store
            .add(
                "big heal!",
                icon(11),
                TemplateMeta::default()
                    .with_hotkey("2")
                    .with_threshold(MatchThreshold::new(0.8).unwrap())
                    .with_display_text("Heal"),
            )
            .unwrap();
        let region = MonitorRegion::new(100, 200, 64, 64).unwrap();
        let settings = AppSettings {
            scan_interval: 0.5,
            ..Default::default()
        };

        profiles.save_profile("mage", &store, Some(region), &settings).unwrap();
        assert!(profiles.template_path("mage", 1, "big heal!").ends_with("mage.1.bigheal.png"));

        let loaded = profiles.load_profile("mage", store.hash_size()).unwrap();
        assert_eq!(loaded.region, Some(region));
        assert_eq!(loaded.settings, settings);
        assert_eq!(loaded.store.ids(), store.ids());
        for (original, reloaded) in store.get_all().iter().zip(loaded.store.get_all()) {
            assert_eq!(*original.image, *reloaded.image);
            assert_eq!(original.hash, reloaded.hash);
            assert_eq!(original.hotkey, reloaded.hotkey);
            assert_eq!(original.display_text, reloaded.display_text);
            assert_eq!(original.threshold, reloaded.threshold);
            assert_eq!(original.cooldown, reloaded.cooldown);
        }

        fs::remove_dir_all(&base).unwrap();
    }

    #[test]
    fn test_list_exists_and_delete() {
        let base = temp_base("list");
        let profiles = ProfileStore::with_base_dir(&base).unwrap();
        let mut store = TemplateStore::default();
        store.add("S-1", icon(3), TemplateMeta::default()).unwrap();

        profiles.save_profile("warrior", &store, None, &AppSettings::default()).unwrap();
        profiles.save_profile("archer", &TemplateStore::default(), None, &AppSettings::default()).unwrap();
        profiles.save_history(&History::default()).unwrap();

        assert_eq!(profiles.list_profiles().unwrap(), vec!["archer", "warrior"]);
        assert!(profiles.profile_exists("warrior"));
        assert!(!profiles.profile_exists("rogue"));

        let template = profiles.template_path("warrior", 0, "S-1");
        assert!(template.is_file());
        assert!(profiles.delete_profile("warrior").unwrap());
        assert!(!template.exists());
        assert!(!profiles.profile_exists("warrior"));
        assert!(!profiles.delete_profile("warrior").unwrap());
        assert_eq!(profiles.list_profiles().unwrap(), vec!["archer"]);

        fs::remove_dir_all(&base).unwrap();
    }

    #[test]
    fn test_delete_leaves_profiles_sharing_a_prefix() {
        let base = temp_base("prefix");
        let profiles = ProfileStore::with_base_dir(&base).unwrap();
        let mut short = TemplateStore::default();
        short.add("pvp", icon(3), TemplateMeta::default()).unwrap();
        let mut long = TemplateStore::default();
        long.add("S-1", icon(5), TemplateMeta::default()).unwrap();

        profiles.save_profile("x", &short, None, &AppSettings::default()).unwrap();
        profiles.save_profile("x_y", &long, None, &AppSettings::default()).unwrap();
        assert!(profiles.delete_profile("x").unwrap());

        assert!(profiles.template_path("x_y", 0, "S-1").is_file());
        let loaded = profiles.load_profile("x_y", 16).unwrap();
        assert_eq!(loaded.store.len(), 1);
        assert_eq!(*loaded.store.get_all()[0].image, icon(5));
        assert!(!profiles.template_path("x", 0, "pvp").exists());

        fs::remove_dir_all(&base).unwrap();
    }

    #[test]
    fn test_ids_equal_after_sanitizing_keep_their_own_images() {
        let base = temp_base("collide");
        let profiles = ProfileStore::with_base_dir(&base).unwrap();
        let red = RgbImage::from_fn(16, 16, |x, _| Rgb([255 - (x * 15) as u8, 0, 0]));
        let green = RgbImage::from_fn(16, 16, |_, y| Rgb([0, (y * 15) as u8, 0]));

        let mut store = TemplateStore::default();
        store.add("fire ball", red.clone(), TemplateMeta::default()).unwrap();
        store.add("fireball", green.clone(), TemplateMeta::default()).unwrap();
        profiles.save_profile("mage", &store, None, &AppSettings::default()).unwrap();

        let loaded = profiles.load_profile("mage", 16).unwrap();
        assert_eq!(*loaded.store.get("fire ball").unwrap().image, red);
        assert_eq!(*loaded.store.get("fireball").unwrap().image, green);
        assert_eq!(loaded.store.get("fire ball").unwrap().hash, store.get("fire ball").unwrap().hash);
        assert_ne!(loaded.store.get("fire ball").unwrap().hash, loaded.store.get("fireball").unwrap().hash);

        fs::remove_dir_all(&base).unwrap();
    }

    #[test]
    fn test_resave_removes_unused_images() {
        let base = temp_base("resave");
        let profiles = ProfileStore::with_base_dir(&base).unwrap();
        let mut store = TemplateStore::default();
        store.add("S-1", icon(3), TemplateMeta::default()).unwrap();
        store.add("S-2", icon(5), TemplateMeta::default()).unwrap();
        profiles.save_profile("rogue", &store, None, &AppSettings::default()).unwrap();
        let second = profiles.template_path("rogue", 1, "S-2");
        assert!(second.is_file());

        store.remove("S-2");
        profiles.save_profile("rogue", &store, None, &AppSettings::default()).unwrap();
        assert!(!second.exists());
        assert!(profiles.template_path("rogue", 0, "S-1").is_file());

        fs::remove_dir_all(&base).unwrap();
    }

    #[test]
    fn test_missing_and_malformed_profiles() {
        let base = temp_base("errors");
        let profiles = ProfileStore::with_base_dir(&base).unwrap();

        assert!(matches!(
            profiles.load_profile("ghost", 16),
            Err(SkillError::ProfileNotFound { .. })
        ));

        fs::write(profiles.config_dir().join("broken.json"), "{not json").unwrap();
        let err = profiles.load_profile("broken", 16).unwrap_err();
        assert!(matches!(err, SkillError::ProfileFormat { .. }));
        assert!(err.is_persistence());

        assert!(matches!(
            profiles.save_profile("../escape", &TemplateStore::default(), None, &AppSettings::default()),
            Err(SkillError::InvalidSettings { .. })
        ));

        fs::remove_dir_all(&base).unwrap();
    }

    #[test]
    fn test_history_round_trip() {
        let base = temp_base("history");
        let profiles = ProfileStore::with_base_dir(&base).unwrap();
        assert_eq!(profiles.load_history().unwrap(), None);

        let history = History {
            last_profile: Some("mage".to_string()),
            settings: Some(AppSettings::default()),
            monitor_region: Some(MonitorRegion::new(1, 2, 3, 4).unwrap()),
        };
        profiles.save_history(&history).unwrap();
        assert_eq!(profiles.load_history().unwrap(), Some(history));

        fs::remove_dir_all(&base).unwrap();
    }
}
