use std::time::Duration;

use tracing::{debug, info};

use crate::config::{ConfigFeed, RespawnContext};
use crate::coordinator::{RequestOutcome, RespawnCoordinator};
use crate::detector::{ConfigChangeDetector, DetectorTick};
use crate::guard::{GuardEvent, TransitionState};
use crate::settings::RespawnSettings;
use crate::stats::StatsHandle;
use crate::world::{LootWorld, SceneRef};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub detector: Option<DetectorTick>,
    pub request: Option<RequestOutcome>,
    pub processed: usize,
}

pub struct RespawnRuntime {
    coordinator: RespawnCoordinator,
    detector: ConfigChangeDetector,
    feed: ConfigFeed,
}

impl RespawnRuntime {
    pub fn new(settings: &RespawnSettings, feed: ConfigFeed) -> Self {
        Self {
            coordinator: RespawnCoordinator::new(settings, RespawnContext::default()),
            detector: ConfigChangeDetector::new(
                settings.debounce_window(),
                settings.float_tolerance(),
            ),
            feed,
        }
    }

    pub fn tick<W>(&mut self, dt: Duration, world: &mut W) -> TickReport
    where
        W: LootWorld + ?Sized,
    {
        let mut report = TickReport::default();

        if let Some(snapshot) = self.feed.current() {
            let blocked = !self.coordinator.accepts_requests();
            let observed = self.detector.observe(snapshot, dt, blocked);
            match observed {
                DetectorTick::Baseline => {
                    self.coordinator.context_mut().set_baseline(snapshot);
                    info!(
                        drop_multiplier = snapshot.drop_multiplier,
                        count_multiplier = snapshot.count_multiplier,
                        enabled = snapshot.enabled,
                        "config_baseline"
                    );
                }
                DetectorTick::Changed => {
                    let revision = self.coordinator.context_mut().record_change(snapshot);
                    debug!(
                        revision,
                        drop_multiplier = snapshot.drop_multiplier,
                        count_multiplier = snapshot.count_multiplier,
                        enabled = snapshot.enabled,
                        manual_refresh = snapshot.manual_refresh,
                        "config_changed"
                    );
                }
                DetectorTick::Fire => {
                    let outcome = self.coordinator.request_respawn(&*world);
                    if let RequestOutcome::Rejected(reason) = outcome {
                        if reason.is_transient() {
                            debug!(reason = reason.label(), "config_change_retry_scheduled");
                            self.detector.rearm();
                        }
                    }
                    report.request = Some(outcome);
                }
                DetectorTick::Idle | DetectorTick::Waiting | DetectorTick::Deferred => {}
            }
            report.detector = Some(observed);
        }

        report.processed = self.coordinator.pump(world);
        report
    }

    pub fn request_respawn<W>(&mut self, world: &W) -> RequestOutcome
    where
        W: LootWorld + ?Sized,
    {
        self.coordinator.request_respawn(world)
    }

    pub fn is_busy(&self) -> bool {
        self.coordinator.is_busy()
    }

    pub fn has_pending_work(&self) -> bool {
        self.coordinator.has_pending_work() || self.detector.is_armed()
    }

    pub fn transition_state(&self) -> TransitionState {
        self.coordinator.transition_state()
    }

    pub fn context(&self) -> &RespawnContext {
        self.coordinator.context()
    }

    pub fn stats(&self) -> StatsHandle {
        self.coordinator.stats()
    }

    pub fn on_scene_unload_started(&mut self, scene: &SceneRef) -> GuardEvent {
        self.coordinator.on_scene_unload_started(scene)
    }

    pub fn on_scene_load_started(&mut self, target: &str) -> GuardEvent {
        self.coordinator.on_scene_load_started(target)
    }

    pub fn on_scene_load_completed(&mut self, scene: &SceneRef) -> GuardEvent {
        self.coordinator.on_scene_load_completed(scene)
    }
}
