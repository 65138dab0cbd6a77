use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::atomic_io::write_text_atomic;
use crate::json::parse_json;

pub const DEFAULT_FLOAT_TOLERANCE: f32 = 0.001;

static CONFIG_LOCK_POISON_WARNED: AtomicBool = AtomicBool::new(false);

fn warn_config_lock_poison_once(operation: &'static str) {
    if CONFIG_LOCK_POISON_WARNED
        .compare_exchange(false, true, Ordering::Relaxed, Ordering::Relaxed)
        .is_ok()
    {
        warn!(operation, "config lock poisoned; recovered inner value");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigSnapshot {
    pub drop_multiplier: f32,
    pub count_multiplier: f32,
    pub enabled: bool,
    pub manual_refresh: bool,
}

impl Default for ConfigSnapshot {
    fn default() -> Self {
        Self {
            drop_multiplier: 1.0,
            count_multiplier: 1.0,
            enabled: true,
            manual_refresh: false,
        }
    }
}

impl ConfigSnapshot {
    pub fn sanitized(self) -> Self {
        Self {
            drop_multiplier: finite_or_neutral(self.drop_multiplier),
            count_multiplier: finite_or_neutral(self.count_multiplier),
            ..self
        }
    }

    pub fn approx_eq(&self, other: &Self, tolerance: f32) -> bool {
        self.enabled == other.enabled
            && self.manual_refresh == other.manual_refresh
            && (self.drop_multiplier - other.drop_multiplier).abs() <= tolerance
            && (self.count_multiplier - other.count_multiplier).abs() <= tolerance
    }
}

fn finite_or_neutral(value: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        1.0
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RespawnContext {
    snapshot: ConfigSnapshot,
    revision: u64,
}

impl RespawnContext {
    pub fn new(snapshot: ConfigSnapshot) -> Self {
        Self {
            snapshot,
            revision: 0,
        }
    }

    pub fn snapshot(&self) -> ConfigSnapshot {
        self.snapshot
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn set_baseline(&mut self, snapshot: ConfigSnapshot) {
        self.snapshot = snapshot;
    }

    pub fn record_change(&mut self, snapshot: ConfigSnapshot) -> u64 {
        self.snapshot = snapshot;
        self.revision = self.revision.saturating_add(1);
        self.revision
    }
}

pub trait ConfigProvider {
    fn load(&self) -> Option<ConfigSnapshot>;
}

#[derive(Clone, Debug, Default)]
pub struct ConfigHandle {
    snapshot: Arc<RwLock<Option<ConfigSnapshot>>>,
}

impl ConfigHandle {
    pub fn available(snapshot: ConfigSnapshot) -> Self {
        let handle = Self::default();
        handle.set(snapshot);
        handle
    }

    pub fn get(&self) -> Option<ConfigSnapshot> {
        match self.snapshot.read() {
            Ok(guard) => *guard,
            Err(poisoned) => {
                warn_config_lock_poison_once("read");
                *poisoned.into_inner()
            }
        }
    }

    pub fn set(&self, snapshot: ConfigSnapshot) {
        self.replace(Some(snapshot));
    }

    pub fn set_unavailable(&self) {
        self.replace(None);
    }

    pub fn update(&self, edit: impl FnOnce(&mut ConfigSnapshot)) {
        let mut snapshot = self.get().unwrap_or_default();
        edit(&mut snapshot);
        self.set(snapshot);
    }

    fn replace(&self, value: Option<ConfigSnapshot>) {
        match self.snapshot.write() {
            Ok(mut guard) => *guard = value,
            Err(poisoned) => {
                warn_config_lock_poison_once("write");
                let mut guard = poisoned.into_inner();
                *guard = value;
            }
        }
    }
}

impl ConfigProvider for ConfigHandle {
    fn load(&self) -> Option<ConfigSnapshot> {
        self.get()
    }
}

#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path} at {at}: {message}")]
    Parse {
        path: PathBuf,
        at: String,
        message: String,
    },
    #[error("failed to encode config snapshot: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct LocalConfigFile {
    path: PathBuf,
}

impl LocalConfigFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<ConfigSnapshot>, ConfigFileError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&self.path).map_err(|source| ConfigFileError::Read {
            path: self.path.clone(),
            source,
        })?;
        let snapshot = parse_json::<ConfigSnapshot>(&raw).map_err(|error| {
            ConfigFileError::Parse {
                path: self.path.clone(),
                at: error.at,
                message: error.message,
            }
        })?;
        Ok(Some(snapshot.sanitized()))
    }

    pub fn save(&self, snapshot: &ConfigSnapshot) -> Result<(), ConfigFileError> {
        let text = serde_json::to_string_pretty(snapshot).map_err(ConfigFileError::Encode)?;
        write_text_atomic(&self.path, &text).map_err(|source| ConfigFileError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

pub struct ConfigFeed {
    provider: Box<dyn ConfigProvider>,
    local: Option<LocalConfigFile>,
    last_persisted: Option<ConfigSnapshot>,
    fallback: Option<ConfigSnapshot>,
    fallback_loaded: bool,
    provider_online: Option<bool>,
}

impl ConfigFeed {
    pub fn new(provider: Box<dyn ConfigProvider>) -> Self {
        Self {
            provider,
            local: None,
            last_persisted: None,
            fallback: None,
            fallback_loaded: false,
            provider_online: None,
        }
    }

    pub fn with_local_file(mut self, file: LocalConfigFile) -> Self {
        self.local = Some(file);
        self
    }

    pub fn current(&mut self) -> Option<ConfigSnapshot> {
        match self.provider.load() {
            Some(snapshot) => {
                let snapshot = snapshot.sanitized();
                self.note_provider_state(true);
                self.persist(snapshot);
                Some(snapshot)
            }
            None => {
                self.note_provider_state(false);
                self.load_fallback()
            }
        }
    }

    fn persist(&mut self, snapshot: ConfigSnapshot) {
        if self.last_persisted == Some(snapshot) {
            return;
        }
        // Recorded even on failure so a broken disk is reported once per change, not per tick.
        self.last_persisted = Some(snapshot);
        self.fallback = Some(snapshot);
        let Some(file) = self.local.as_ref() else {
            return;
        };
        if let Err(error) = file.save(&snapshot) {
            warn!(error = %error, "config_persist_failed");
        }
    }

    fn load_fallback(&mut self) -> Option<ConfigSnapshot> {
        if !self.fallback_loaded {
            self.fallback_loaded = true;
            if self.fallback.is_none() {
                if let Some(file) = self.local.as_ref() {
                    match file.load() {
                        Ok(Some(snapshot)) => {
                            info!(
                                path = %file.path().display(),
                                drop_multiplier = snapshot.drop_multiplier,
                                count_multiplier = snapshot.count_multiplier,
                                "config_fallback_loaded"
                            );
                            self.fallback = Some(snapshot);
                        }
                        Ok(None) => {}
                        Err(error) => warn!(error = %error, "config_fallback_unreadable"),
                    }
                }
            }
        }
        self.fallback
    }

    fn note_provider_state(&mut self, online: bool) {
        if self.provider_online == Some(online) {
            return;
        }
        if online {
            info!("config_provider_online");
        } else {
            warn!("config_provider_unavailable");
        }
        self.provider_online = Some(online);
    }
}
