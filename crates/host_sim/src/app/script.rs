use std::fs;
use std::path::{Path, PathBuf};

use respawn::{parse_json, JsonParseError};
use serde::Deserialize;
use thiserror::Error;

use super::sim_world::{ContainerSetup, SetupKind};

const DEFAULT_TICK_MS: u64 = 16;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct SimScript {
    #[serde(default = "default_tick_ms")]
    pub(crate) tick_ms: u64,
    pub(crate) total_ticks: u64,
    #[serde(default)]
    pub(crate) session_seed: u64,
    pub(crate) scene: String,
    pub(crate) containers: Vec<ContainerSetup>,
    #[serde(default)]
    pub(crate) steps: Vec<ScriptStep>,
}

fn default_tick_ms() -> u64 {
    DEFAULT_TICK_MS
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub(crate) struct ScriptStep {
    pub(crate) at_tick: u64,
    #[serde(flatten)]
    pub(crate) action: StepAction,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub(crate) enum StepAction {
    SetConfig {
        #[serde(default)]
        drop_multiplier: Option<f32>,
        #[serde(default)]
        count_multiplier: Option<f32>,
        #[serde(default)]
        enabled: Option<bool>,
        #[serde(default)]
        manual_refresh: Option<bool>,
    },
    ProviderOffline,
    OpenContainer {
        placement: String,
    },
    UnloadScene,
    LoadScene {
        scene: String,
        containers: Vec<ContainerSetup>,
    },
    LoadComplete,
    RequestRespawn,
}

impl StepAction {
    pub(crate) fn label(&self) -> &'static str {
        match self {
            Self::SetConfig { .. } => "set_config",
            Self::ProviderOffline => "provider_offline",
            Self::OpenContainer { .. } => "open_container",
            Self::UnloadScene => "unload_scene",
            Self::LoadScene { .. } => "load_scene",
            Self::LoadComplete => "load_complete",
            Self::RequestRespawn => "request_respawn",
        }
    }
}

impl SimScript {
    pub(crate) fn steps_at(&self, tick: u64) -> impl Iterator<Item = &StepAction> {
        self.steps
            .iter()
            .filter(move |step| step.at_tick == tick)
            .map(|step| &step.action)
    }
}

#[derive(Debug, Error)]
pub(crate) enum ScriptError {
    #[error("failed to read script {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse script {path} at {at}: {message}")]
    Parse {
        path: PathBuf,
        at: String,
        message: String,
    },
    #[error("script step at tick {at_tick} is past total_ticks {total_ticks}")]
    StepOutOfRange { at_tick: u64, total_ticks: u64 },
}

pub(crate) fn load_script(path: &Path) -> Result<SimScript, ScriptError> {
    let raw = fs::read_to_string(path).map_err(|source| ScriptError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let script = parse_script(&raw).map_err(|error| ScriptError::Parse {
        path: path.to_path_buf(),
        at: error.at,
        message: error.message,
    })?;
    validate(&script)?;
    Ok(script)
}

fn parse_script(raw: &str) -> Result<SimScript, JsonParseError> {
    parse_json(raw)
}

fn validate(script: &SimScript) -> Result<(), ScriptError> {
    if let Some(step) = script
        .steps
        .iter()
        .find(|step| step.at_tick >= script.total_ticks)
    {
        return Err(ScriptError::StepOutOfRange {
            at_tick: step.at_tick,
            total_ticks: script.total_ticks,
        });
    }
    Ok(())
}

/// Farm run: a slider drag, a player opening crates, a mid-cycle scene reload
/// and a hub visit where nothing may respawn.
pub(crate) fn demo_script() -> SimScript {
    let farm = (1..=12)
        .map(|index| {
            let setup = match index % 3 {
                0 => SetupKind::ToggleOnly,
                1 => SetupKind::Direct,
                _ => SetupKind::Loader,
            };
            ContainerSetup::new(&format!("Farm/Crate_{index:02}"), setup)
        })
        .collect::<Vec<_>>();
    let hub = vec![
        ContainerSetup::new("Hub/Stash_01", SetupKind::Direct),
        ContainerSetup::new("Hub/Stash_02", SetupKind::Direct),
    ];

    let steps = vec![
        step(10, open("Farm/Crate_03")),
        step(10, open("Farm/Crate_07")),
        step(20, set_drop(1.5)),
        step(21, set_drop(2.5)),
        step(22, set_drop(5.0)),
        step(
            60,
            StepAction::SetConfig {
                drop_multiplier: None,
                count_multiplier: Some(2.0),
                enabled: None,
                manual_refresh: None,
            },
        ),
        step(68, StepAction::UnloadScene),
        step(
            70,
            StepAction::LoadScene {
                scene: "Level_Farm".to_string(),
                containers: farm.clone(),
            },
        ),
        step(74, StepAction::LoadComplete),
        step(80, StepAction::RequestRespawn),
        step(90, StepAction::ProviderOffline),
        step(100, StepAction::UnloadScene),
        step(
            101,
            StepAction::LoadScene {
                scene: "Level_HubCity".to_string(),
                containers: hub,
            },
        ),
        step(103, StepAction::LoadComplete),
        step(110, set_drop(3.0)),
        step(130, StepAction::RequestRespawn),
    ];

    SimScript {
        tick_ms: DEFAULT_TICK_MS,
        total_ticks: 150,
        session_seed: 0x5eed,
        scene: "Level_Farm".to_string(),
        containers: farm,
        steps,
    }
}

fn step(at_tick: u64, action: StepAction) -> ScriptStep {
    ScriptStep { at_tick, action }
}

fn open(placement: &str) -> StepAction {
    StepAction::OpenContainer {
        placement: placement.to_string(),
    }
}

fn set_drop(drop_multiplier: f32) -> StepAction {
    StepAction::SetConfig {
        drop_multiplier: Some(drop_multiplier),
        count_multiplier: None,
        enabled: None,
        manual_refresh: None,
    }
}
