use anyhow::{bail, Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::detection::DetectionConfig;
use crate::vitals::VitalsThresholds;

pub const SETTINGS_ENV: &str = "CAREWATCH_SETTINGS";
pub const DATABASE_ENV: &str = "CAREWATCH_DB";

const DEFAULT_ADVISORY_PROMPT: &str = "fall prevention tips for elderly";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MonitorSettings {
    /// SQLite file backing the record store. `None` uses the data directory.
    pub database_path: Option<PathBuf>,
    pub detection: DetectionConfig,
    pub vitals: VitalsThresholds,
    pub advisory_prompt: String,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            database_path: None,
            detection: DetectionConfig::default(),
            vitals: VitalsThresholds::default(),
            advisory_prompt: DEFAULT_ADVISORY_PROMPT.into(),
        }
    }
}

impl MonitorSettings {
    pub fn validate(&self) -> Result<()> {
        let detection = &self.detection;
        if !(detection.contamination > 0.0 && detection.contamination <= 0.5) {
            bail!(
                "contamination must be in (0, 0.5], got {}",
                detection.contamination
            );
        }
        if detection.min_samples < 2 {
            bail!("minSamples must be at least 2");
        }
        if detection.n_trees == 0 {
            bail!("nTrees must be at least 1");
        }
        if detection.max_samples < 2 {
            bail!("maxSamples must be at least 2");
        }
        self.vitals.validate()?;
        if self.advisory_prompt.trim().is_empty() {
            bail!("advisoryPrompt must not be empty");
        }
        Ok(())
    }

    /// Database location: `CAREWATCH_DB`, then the settings file, then the data dir.
    pub fn resolve_database_path(&self) -> PathBuf {
        if let Some(path) = std::env::var_os(DATABASE_ENV) {
            return PathBuf::from(path);
        }
        self.database_path
            .clone()
            .unwrap_or_else(|| default_data_dir().join("carewatch.sqlite3"))
    }
}

/// Per-user application data directory, falling back to the working directory.
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("carewatch"))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Settings file location: `CAREWATCH_SETTINGS` or `<data dir>/settings.json`.
pub fn default_settings_path() -> PathBuf {
    std::env::var_os(SETTINGS_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| default_data_dir().join("settings.json"))
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<MonitorSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            match serde_json::from_str::<MonitorSettings>(&contents) {
                Ok(settings) => settings,
                Err(err) => {
                    warn!(
                        "Ignoring malformed settings at {}: {err}; using defaults",
                        path.display()
                    );
                    MonitorSettings::default()
                }
            }
        } else {
            MonitorSettings::default()
        };

        data.validate()
            .with_context(|| format!("Invalid settings in {}", path.display()))?;

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(&self) -> MonitorSettings {
        self.read().clone()
    }

    pub fn update(&self, settings: MonitorSettings) -> Result<()> {
        settings.validate()?;
        let mut guard = self.write();
        self.persist(&settings)?;
        *guard = settings;
        Ok(())
    }

    fn persist(&self, data: &MonitorSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create settings directory {}", parent.display())
            })?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    fn read(&self) -> RwLockReadGuard<'_, MonitorSettings> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, MonitorSettings> {
        self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
