use std::{fs, path::PathBuf, sync::RwLock, time::Duration};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const DEBUG_SAMPLE_INTERVAL_SECS: u64 = 5;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LocationOptions {
    pub enable_high_accuracy: bool,
    pub timeout_ms: u64,
    /// A cached fix younger than this may be returned instead of a fresh one.
    pub maximum_age_ms: u64,
}

impl Default for LocationOptions {
    fn default() -> Self {
        Self {
            enable_high_accuracy: true,
            timeout_ms: 10_000,
            maximum_age_ms: 60_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimulationSettings {
    pub origin_latitude: f64,
    pub origin_longitude: f64,
    pub walk_step_degrees: f64,
    pub aqi_latency_ms: u64,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            origin_latitude: 37.7749,
            origin_longitude: -122.4194,
            walk_step_degrees: 0.0005,
            aqi_latency_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TrackerSettings {
    pub sample_interval_secs: u64,
    pub tick_interval_ms: u64,
    pub error_display_secs: u64,
    pub history_capacity: usize,
    pub history_display_limit: usize,
    pub location: LocationOptions,
    pub simulation: SimulationSettings,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            sample_interval_secs: 30,
            tick_interval_ms: 1_000,
            error_display_secs: 10,
            history_capacity: 100,
            history_display_limit: 50,
            location: LocationOptions::default(),
            simulation: SimulationSettings::default(),
        }
    }
}

impl TrackerSettings {
    pub fn sample_interval(&self) -> Duration {
        Duration::from_secs(self.sample_interval_secs.max(1))
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub fn error_display(&self) -> Duration {
        Duration::from_secs(self.error_display_secs)
    }

    pub fn location_timeout(&self) -> Duration {
        Duration::from_millis(self.location.timeout_ms)
    }

    /// `HEALTHY_AIR_DEBUG=1` samples every few seconds instead of every 30.
    pub fn with_env_overrides(mut self) -> Self {
        let debug_mode = std::env::var("HEALTHY_AIR_DEBUG")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        if debug_mode {
            self.sample_interval_secs = DEBUG_SAMPLE_INTERVAL_SECS;
        }
        self
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<TrackerSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            match serde_json::from_str(&contents) {
                Ok(settings) => settings,
                Err(err) => {
                    log::warn!(
                        "Ignoring malformed settings at {}: {err}",
                        path.display()
                    );
                    TrackerSettings::default()
                }
            }
        } else {
            TrackerSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn tracker(&self) -> TrackerSettings {
        self.data
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn update_tracker(&self, settings: TrackerSettings) -> Result<()> {
        let mut guard = self
            .data
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = settings;
        self.persist(&guard)
    }

    fn persist(&self, data: &TrackerSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json")).unwrap();
        let settings = store.tracker();
        assert_eq!(settings.sample_interval(), Duration::from_secs(30));
        assert_eq!(settings.tick_interval(), Duration::from_secs(1));
        assert_eq!(settings.error_display(), Duration::from_secs(10));
        assert_eq!(settings.history_capacity, 100);
        assert_eq!(settings.location_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn update_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let store = SettingsStore::new(path.clone()).unwrap();

        let mut settings = store.tracker();
        settings.sample_interval_secs = 60;
        settings.location.enable_high_accuracy = false;
        store.update_tracker(settings.clone()).unwrap();

        let reopened = SettingsStore::new(path).unwrap();
        assert_eq!(reopened.tracker(), settings);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "error_display_secs": 3 }"#).unwrap();

        let settings = SettingsStore::new(path).unwrap().tracker();
        assert_eq!(settings.error_display_secs, 3);
        assert_eq!(settings.sample_interval_secs, 30);
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "not json").unwrap();

        let settings = SettingsStore::new(path).unwrap().tracker();
        assert_eq!(settings, TrackerSettings::default());
    }
}
