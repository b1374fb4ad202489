use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::errors::HuddleError;
use crate::tiles::DEFAULT_MAX_VISIBLE_TILE_COUNT;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Settings {
    #[serde(default = "default_max_visible_tile_count")]
    pub max_visible_tile_count: usize,
    #[serde(default)]
    pub local_placeholder: bool,
    /// `tracing` filter directive applied by the host's logging setup.
    #[serde(default)]
    pub log_filter: Option<String>,
}

fn default_max_visible_tile_count() -> usize {
    DEFAULT_MAX_VISIBLE_TILE_COUNT
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_visible_tile_count: DEFAULT_MAX_VISIBLE_TILE_COUNT,
            local_placeholder: false,
            log_filter: None,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), HuddleError> {
        if self.max_visible_tile_count == 0 {
            return Err(HuddleError::Config(
                "max_visible_tile_count must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// JSON-backed settings persisted under `<data_dir>/settings.json`.
pub struct SettingsStore {
    settings: Mutex<Settings>,
    file_path: PathBuf,
}

impl SettingsStore {
    pub fn new(data_dir: &str) -> Self {
        let file_path = PathBuf::from(data_dir).join("settings.json");
        let settings = Self::load(&file_path);
        Self {
            settings: Mutex::new(settings),
            file_path,
        }
    }

    pub fn get(&self) -> Settings {
        self.lock().clone()
    }

    pub fn set_max_visible_tile_count(&self, count: usize) -> Result<(), HuddleError> {
        self.update(|s| s.max_visible_tile_count = count)
    }

    pub fn set_local_placeholder(&self, enabled: bool) -> Result<(), HuddleError> {
        self.update(|s| s.local_placeholder = enabled)
    }

    pub fn set_log_filter(&self, filter: Option<String>) -> Result<(), HuddleError> {
        self.update(|s| s.log_filter = filter)
    }

    /// Apply `change` to a copy, validate and persist it, then publish it.
    /// The guard is held throughout so concurrent setters cannot interleave,
    /// and memory keeps the old value if the write fails.
    fn update(&self, change: impl FnOnce(&mut Settings)) -> Result<(), HuddleError> {
        let mut current = self.lock();
        let mut next = current.clone();
        change(&mut next);
        next.validate()?;
        self.save(&next)?;
        *current = next;
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Settings> {
        self.settings.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn save(&self, settings: &Settings) -> Result<(), HuddleError> {
        if let Some(parent) = self.file_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(settings)
            .map_err(|e| HuddleError::Config(format!("serialize settings: {e}")))?;
        std::fs::write(&self.file_path, json)?;
        Ok(())
    }

    fn load(path: &Path) -> Settings {
        let settings: Settings = match std::fs::read_to_string(path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("settings file {} unreadable, using defaults: {e}", path.display());
                Settings::default()
            }),
            Err(_) => Settings::default(),
        };
        match settings.validate() {
            Ok(()) => settings,
            Err(e) => {
                tracing::warn!("{e}; using defaults");
                Settings::default()
            }
        }
    }
}
