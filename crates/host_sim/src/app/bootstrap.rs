use std::env;
use std::path::PathBuf;

use respawn::{
    load_settings, ConfigFeed, ConfigHandle, ConfigSnapshot, LocalConfigFile, RespawnRuntime,
    RespawnSettings, SettingsError,
};
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::loop_runner::{LoopConfig, Simulation};
use super::script::{demo_script, load_script, ScriptError, SimScript};
use super::sim_world::SimWorld;

pub(crate) const SETTINGS_ENV_VAR: &str = "HOST_SIM_SETTINGS";
pub(crate) const SCRIPT_ENV_VAR: &str = "HOST_SIM_SCRIPT";
pub(crate) const CONFIG_CACHE_ENV_VAR: &str = "HOST_SIM_CONFIG_CACHE";

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Script(#[from] ScriptError),
}

pub(crate) struct AppWiring {
    pub(crate) loop_config: LoopConfig,
    pub(crate) script: SimScript,
    pub(crate) simulation: Simulation,
}

pub(crate) fn build_app() -> Result<AppWiring, AppError> {
    init_tracing();
    info!("=== Loot Respawn Host Sim ===");

    let settings = match env_path(SETTINGS_ENV_VAR) {
        Some(path) => load_settings(&path)?,
        None => RespawnSettings::default(),
    };
    let script = match env_path(SCRIPT_ENV_VAR) {
        Some(path) => load_script(&path)?,
        None => demo_script(),
    };
    info!(
        max_containers_per_cycle = settings.max_containers_per_cycle(),
        containers_per_tick = settings.containers_per_tick(),
        debounce_ms = settings.debounce_window().as_millis() as u64,
        scene = %script.scene,
        containers = script.containers.len(),
        "host_sim_configured"
    );

    let config = ConfigHandle::available(ConfigSnapshot::default());
    let mut feed = ConfigFeed::new(Box::new(config.clone()));
    if let Some(path) = env_path(CONFIG_CACHE_ENV_VAR) {
        feed = feed.with_local_file(LocalConfigFile::new(path));
    }

    let mut world = SimWorld::new(script.session_seed);
    world.load_initial(&script.scene, &script.containers);

    Ok(AppWiring {
        loop_config: LoopConfig::from_script(&script),
        simulation: Simulation {
            world,
            config,
            runtime: RespawnRuntime::new(&settings, feed),
        },
        script,
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

fn env_path(var: &str) -> Option<PathBuf> {
    env::var_os(var)
        .filter(|raw| !raw.is_empty())
        .map(PathBuf::from)
}
