use anyhow::{bail, Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::inference::InferenceConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub inference: InferenceConfig,
    /// Length of a timeline when the caller doesn't give one.
    pub timeline_hours: u32,
    /// How far back validation replays captures.
    pub validation_lookback_hours: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            inference: InferenceConfig::default(),
            timeline_hours: 1,
            validation_lookback_hours: 24,
        }
    }
}

impl Settings {
    /// Overwrite the fields the patch carries.
    pub fn apply(&mut self, patch: SettingsPatch) {
        if let Some(hours) = patch.timeline_hours {
            self.timeline_hours = hours;
        }
        if let Some(hours) = patch.validation_lookback_hours {
            self.validation_lookback_hours = hours;
        }
        if let Some(value) = patch.consistent_max_variation {
            self.inference.consistent_max_variation = value;
        }
        if let Some(value) = patch.variable_max_variation {
            self.inference.variable_max_variation = value;
        }
        if let Some(value) = patch.validation_match_threshold {
            self.inference.validation_match_threshold = value;
        }
        if let Some(hours) = patch.max_window_hours {
            self.inference.max_window_hours = hours;
        }
    }

    pub fn validate(&self) -> Result<()> {
        let inference = &self.inference;
        if self.timeline_hours == 0 || self.validation_lookback_hours == 0 {
            bail!("timeline_hours and validation_lookback_hours must be at least 1");
        }
        if inference.max_window_hours < self.timeline_hours {
            bail!(
                "max_window_hours ({}) is below timeline_hours ({})",
                inference.max_window_hours,
                self.timeline_hours
            );
        }
        if !(inference.consistent_max_variation > 0.0
            && inference.consistent_max_variation <= inference.variable_max_variation)
        {
            bail!(
                "variation thresholds must satisfy 0 < consistent ({}) <= variable ({})",
                inference.consistent_max_variation,
                inference.variable_max_variation
            );
        }
        if !(0.0..=1.0).contains(&inference.validation_match_threshold) {
            bail!(
                "validation_match_threshold must be within 0..=1, got {}",
                inference.validation_match_threshold
            );
        }
        Ok(())
    }
}

/// Partial update for [`Settings`]; `None` leaves a field as it is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsPatch {
    pub timeline_hours: Option<u32>,
    pub validation_lookback_hours: Option<u32>,
    pub consistent_max_variation: Option<f64>,
    pub variable_max_variation: Option<f64>,
    pub validation_match_threshold: Option<f64>,
    pub max_window_hours: Option<u32>,
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<Settings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!(
                    "Ignoring unreadable settings file {}: {err}",
                    path.display()
                );
                Settings::default()
            })
        } else {
            Settings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    fn read(&self) -> RwLockReadGuard<'_, Settings> {
        match self.data.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, Settings> {
        match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn current(&self) -> Settings {
        self.read().clone()
    }

    pub fn inference(&self) -> InferenceConfig {
        self.read().inference.clone()
    }

    /// Apply `patch` to the current settings and persist the result.
    pub fn patch(&self, patch: SettingsPatch) -> Result<Settings> {
        let mut settings = self.current();
        settings.apply(patch);
        self.update(settings.clone())?;
        Ok(settings)
    }

    /// Validate, persist and swap in `settings`. Invalid settings leave both
    /// the file and the in-memory copy untouched.
    pub fn update(&self, settings: Settings) -> Result<()> {
        settings.validate()?;
        let mut guard = self.write();
        self.persist(&settings)?;
        *guard = settings;
        Ok(())
    }

    fn persist(&self, data: &Settings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create settings directory {}", parent.display())
                })?;
            }
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
