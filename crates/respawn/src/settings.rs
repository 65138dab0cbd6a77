use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::DEFAULT_FLOAT_TOLERANCE;
use crate::detector::DEFAULT_DEBOUNCE_WINDOW;
use crate::enumerator::DEFAULT_MAX_CONTAINERS_PER_CYCLE;
use crate::guard::{SafeZonePolicy, DEFAULT_SAFE_ZONE_MARKERS};
use crate::json::parse_json;

pub const DEFAULT_CONTAINERS_PER_TICK: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RespawnSettings {
    pub max_containers_per_cycle: usize,
    pub containers_per_tick: usize,
    pub debounce_ms: u64,
    pub float_tolerance: f32,
    pub safe_zone_markers: Vec<String>,
}

impl Default for RespawnSettings {
    fn default() -> Self {
        Self {
            max_containers_per_cycle: DEFAULT_MAX_CONTAINERS_PER_CYCLE,
            containers_per_tick: DEFAULT_CONTAINERS_PER_TICK,
            debounce_ms: DEFAULT_DEBOUNCE_WINDOW.as_millis() as u64,
            float_tolerance: DEFAULT_FLOAT_TOLERANCE,
            safe_zone_markers: DEFAULT_SAFE_ZONE_MARKERS
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

impl RespawnSettings {
    pub fn max_containers_per_cycle(&self) -> usize {
        self.max_containers_per_cycle.max(1)
    }

    pub fn containers_per_tick(&self) -> usize {
        self.containers_per_tick.max(1)
    }

    pub fn debounce_window(&self) -> Duration {
        if self.debounce_ms == 0 {
            DEFAULT_DEBOUNCE_WINDOW
        } else {
            Duration::from_millis(self.debounce_ms)
        }
    }

    pub fn float_tolerance(&self) -> f32 {
        if self.float_tolerance.is_finite() {
            self.float_tolerance.abs()
        } else {
            DEFAULT_FLOAT_TOLERANCE
        }
    }

    pub fn safe_zones(&self) -> SafeZonePolicy {
        SafeZonePolicy::new(self.safe_zone_markers.iter().cloned())
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse settings file {path} at {at}: {message}")]
    Parse {
        path: PathBuf,
        at: String,
        message: String,
    },
}

pub fn load_settings(path: &Path) -> Result<RespawnSettings, SettingsError> {
    if !path.exists() {
        return Ok(RespawnSettings::default());
    }
    let raw = fs::read_to_string(path).map_err(|source| SettingsError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_json::<RespawnSettings>(&raw).map_err(|error| SettingsError::Parse {
        path: path.to_path_buf(),
        at: error.at,
        message: error.message,
    })
}
