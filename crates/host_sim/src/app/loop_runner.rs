use std::process::ExitCode;
use std::time::Duration;

use respawn::{
    ConfigHandle, GuardEvent, RequestOutcome, RespawnRuntime, RespawnStats, TickReport,
};
use tracing::{debug, info, warn};

use super::bootstrap::AppWiring;
use super::script::{SimScript, StepAction};
use super::sim_world::SimWorld;

const DEFAULT_TICK: Duration = Duration::from_millis(16);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LoopConfig {
    pub(crate) tick: Duration,
    pub(crate) total_ticks: u64,
}

impl LoopConfig {
    pub(crate) fn from_script(script: &SimScript) -> Self {
        Self {
            tick: normalize_non_zero_duration(Duration::from_millis(script.tick_ms), DEFAULT_TICK),
            total_ticks: script.total_ticks,
        }
    }
}

pub(crate) struct Simulation {
    pub(crate) world: SimWorld,
    pub(crate) config: ConfigHandle,
    pub(crate) runtime: RespawnRuntime,
}

impl Simulation {
    pub(crate) fn apply(&mut self, action: &StepAction) {
        debug!(step = action.label(), "script_step");
        match action {
            StepAction::SetConfig {
                drop_multiplier,
                count_multiplier,
                enabled,
                manual_refresh,
            } => self.config.update(|config| {
                if let Some(value) = drop_multiplier {
                    config.drop_multiplier = *value;
                }
                if let Some(value) = count_multiplier {
                    config.count_multiplier = *value;
                }
                if let Some(value) = enabled {
                    config.enabled = *value;
                }
                if let Some(value) = manual_refresh {
                    config.manual_refresh = *value;
                }
            }),
            StepAction::ProviderOffline => self.config.set_unavailable(),
            StepAction::OpenContainer { placement } => {
                if let Err(error) = self.world.open_container(placement) {
                    warn!(placement = %placement, error = %error, "script_step_failed");
                }
            }
            StepAction::UnloadScene => match self.world.begin_unload() {
                Ok(scene) => log_guard(self.runtime.on_scene_unload_started(&scene)),
                Err(error) => warn!(error = %error, "script_step_failed"),
            },
            StepAction::LoadScene { scene, containers } => {
                self.world.begin_load(scene, containers.clone());
                log_guard(self.runtime.on_scene_load_started(scene));
            }
            StepAction::LoadComplete => match self.world.complete_load() {
                Ok(scene) => log_guard(self.runtime.on_scene_load_completed(&scene)),
                Err(error) => warn!(error = %error, "script_step_failed"),
            },
            StepAction::RequestRespawn => {
                let outcome = self.runtime.request_respawn(&self.world);
                log_request(outcome);
            }
        }
    }

    pub(crate) fn step(&mut self, dt: Duration) -> TickReport {
        let multipliers = self.runtime.context().snapshot();
        self.world.advance(&multipliers);
        let report = self.runtime.tick(dt, &mut self.world);
        if let Some(outcome) = report.request {
            log_request(outcome);
        }
        report
    }

    pub(crate) fn run_script(&mut self, script: &SimScript, config: LoopConfig) -> RespawnStats {
        for tick in 0..config.total_ticks {
            for action in script.steps_at(tick) {
                self.apply(action);
            }
            self.step(config.tick);
        }
        self.runtime.stats().snapshot()
    }
}

pub(crate) fn run(app: AppWiring) -> ExitCode {
    let AppWiring {
        loop_config,
        script,
        mut simulation,
    } = app;

    info!(
        ticks = loop_config.total_ticks,
        tick_ms = loop_config.tick.as_millis() as u64,
        steps = script.steps.len(),
        "host_sim_started"
    );
    let stats = simulation.run_script(&script, loop_config);

    if let Some(report) = stats.last_report.as_ref() {
        info!(
            cycle = report.cycle_id,
            scene = %report.scene,
            processed = report.processed(),
            skipped = report.skipped(),
            direct = report.dispatched.direct,
            loader_delegate = report.dispatched.loader_delegate,
            toggle_active = report.dispatched.toggle_active,
            "last_cycle_report"
        );
    }
    let stocked = simulation
        .world
        .containers()
        .filter(|container| container.item_count().unwrap_or(0) > 0)
        .count();
    let fills = simulation
        .world
        .containers()
        .map(|container| container.fills())
        .sum::<u32>();
    let scene = simulation
        .world
        .scene()
        .map(ToString::to_string)
        .unwrap_or_else(|| "none".to_string());
    info!(
        scene = %scene,
        ledger_entries = simulation.world.ledger().map_or(0, |ledger| ledger.len()),
        stocked_containers = stocked,
        container_fills = fills,
        cycles_started = stats.cycles_started,
        cycles_completed = stats.cycles_completed,
        cycles_abandoned = stats.cycles_abandoned,
        requests_rejected = stats.requests_rejected,
        busy_force_resets = stats.busy_force_resets,
        "host_sim_finished"
    );

    ExitCode::SUCCESS
}

fn log_guard(event: GuardEvent) {
    debug!(event = ?event, "scene_signal");
}

fn log_request(outcome: RequestOutcome) {
    match outcome {
        RequestOutcome::Started {
            cycle_id,
            candidates,
        } => info!(cycle = cycle_id, candidates, "respawn_requested"),
        RequestOutcome::Rejected(reason) => {
            info!(reason = reason.label(), "respawn_request_rejected")
        }
    }
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}
