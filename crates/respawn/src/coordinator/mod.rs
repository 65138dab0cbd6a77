use std::collections::VecDeque;

use tracing::{debug, info, warn};

use crate::config::RespawnContext;
use crate::enumerator::{Candidate, ContainerEnumerator};
use crate::error::ContainerError;
use crate::guard::{GuardEvent, SafeZonePolicy, TransitionGuard, TransitionState};
use crate::ledger::MarkOutcome;
use crate::settings::RespawnSettings;
use crate::stats::{CycleEnd, CycleReport, StatsHandle};
use crate::trigger::{process_container, TriggerOutcome};
use crate::world::{LootWorld, SceneRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    Busy,
    Transition(TransitionState),
    Disabled,
    NoActiveScene,
    SafeZone,
    LedgerUnavailable,
}

impl RejectReason {
    pub fn label(self) -> &'static str {
        match self {
            Self::Busy => "busy",
            Self::Transition(TransitionState::Unloading) => "unloading",
            Self::Transition(TransitionState::Loading) => "loading",
            Self::Transition(TransitionState::Stable) => "transition",
            Self::Disabled => "disabled",
            Self::NoActiveScene => "no_active_scene",
            Self::SafeZone => "safe_zone",
            Self::LedgerUnavailable => "ledger_unavailable",
        }
    }

    pub fn is_transient(self) -> bool {
        matches!(
            self,
            Self::Busy | Self::Transition(_) | Self::NoActiveScene | Self::LedgerUnavailable
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    Started { cycle_id: u64, candidates: usize },
    Rejected(RejectReason),
}

impl RequestOutcome {
    pub fn is_started(&self) -> bool {
        matches!(self, Self::Started { .. })
    }
}

#[derive(Debug)]
pub struct RespawnCoordinator {
    enumerator: ContainerEnumerator,
    safe_zones: SafeZonePolicy,
    guard: TransitionGuard,
    context: RespawnContext,
    containers_per_tick: usize,
    queue: VecDeque<Candidate>,
    pending: usize,
    report: Option<CycleReport>,
    next_cycle_id: u64,
    stats: StatsHandle,
}

impl RespawnCoordinator {
    pub fn new(settings: &RespawnSettings, context: RespawnContext) -> Self {
        Self {
            enumerator: ContainerEnumerator::new(settings.max_containers_per_cycle()),
            safe_zones: settings.safe_zones(),
            guard: TransitionGuard::default(),
            context,
            containers_per_tick: settings.containers_per_tick(),
            queue: VecDeque::new(),
            pending: 0,
            report: None,
            next_cycle_id: 1,
            stats: StatsHandle::default(),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.pending > 0
    }

    pub fn pending_count(&self) -> usize {
        self.pending
    }

    pub fn has_pending_work(&self) -> bool {
        !self.queue.is_empty()
    }

    pub fn accepts_requests(&self) -> bool {
        !self.is_busy() && self.guard.is_stable()
    }

    pub fn transition_state(&self) -> TransitionState {
        self.guard.state()
    }

    pub fn context(&self) -> &RespawnContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut RespawnContext {
        &mut self.context
    }

    pub fn stats(&self) -> StatsHandle {
        self.stats.clone()
    }

    /// Starts a cycle when every gate is open; otherwise a no-op.
    pub fn request_respawn<W>(&mut self, world: &W) -> RequestOutcome
    where
        W: LootWorld + ?Sized,
    {
        if self.is_busy() {
            return self.reject(RejectReason::Busy);
        }
        if !self.guard.is_stable() {
            return self.reject(RejectReason::Transition(self.guard.state()));
        }
        if !self.context.snapshot().enabled {
            return self.reject(RejectReason::Disabled);
        }
        let Some(scene) = world.active_scene() else {
            return self.reject(RejectReason::NoActiveScene);
        };
        // Hubs, home bases and menus are never enumerated.
        if self.safe_zones.is_safe_zone(&scene) {
            return self.reject(RejectReason::SafeZone);
        }
        let Some(ledger) = world.level_ledger() else {
            return self.reject(RejectReason::LedgerUnavailable);
        };

        let revision = self.context.revision();
        let enumeration = self.enumerator.enumerate(world, &scene, ledger, revision);
        let cycle_id = self.next_cycle_id;
        self.next_cycle_id += 1;

        let report = CycleReport::start(cycle_id, scene, revision, &enumeration);
        let candidates = enumeration.candidates.len();
        info!(
            cycle = cycle_id,
            scene = %report.scene,
            revision,
            discovered = report.discovered,
            candidates,
            looted = report.looted,
            already_current = report.already_current,
            truncated = report.truncated,
            generated = report.ledger_before.generated,
            not_generated = report.ledger_before.not_generated,
            "respawn_cycle_started"
        );
        self.stats.update(|stats| stats.cycles_started += 1);

        self.queue = enumeration.candidates.into();
        self.pending = candidates;
        self.report = Some(report);
        if self.pending == 0 {
            self.finish_cycle(CycleEnd::Completed);
        }

        RequestOutcome::Started {
            cycle_id,
            candidates,
        }
    }

    pub fn pump<W>(&mut self, world: &mut W) -> usize
    where
        W: LootWorld + ?Sized,
    {
        if !self.guard.is_stable() {
            return 0;
        }
        let Some(revision) = self.report.as_ref().map(|report| report.revision) else {
            return 0;
        };

        let mut processed = 0;
        while processed < self.containers_per_tick {
            let Some(candidate) = self.queue.pop_front() else {
                break;
            };
            processed += 1;
            let result = process_container(world, candidate, revision);
            self.record(candidate, result);
            self.pending = self.pending.saturating_sub(1);
        }

        if self.pending == 0 {
            self.finish_cycle(CycleEnd::Completed);
        }
        processed
    }

    pub fn on_scene_unload_started(&mut self, scene: &SceneRef) -> GuardEvent {
        let event = self.guard.on_unload_started(scene);
        if event == GuardEvent::TransitionStarted {
            self.abandon_cycle();
        }
        event
    }

    pub fn on_scene_load_started(&mut self, target: &str) -> GuardEvent {
        let event = self.guard.on_load_started(target);
        if event == GuardEvent::TransitionStarted {
            self.abandon_cycle();
        }
        event
    }

    pub fn on_scene_load_completed(&mut self, scene: &SceneRef) -> GuardEvent {
        let event = self.guard.on_load_completed(scene);
        if event == GuardEvent::Resolved && self.pending > 0 {
            warn!(scene = %scene, pending = self.pending, "busy_force_reset");
            self.pending = 0;
            self.queue.clear();
            self.stats.update(|stats| stats.busy_force_resets += 1);
        }
        event
    }

    fn reject(&self, reason: RejectReason) -> RequestOutcome {
        debug!(reason = reason.label(), "respawn_request_rejected");
        self.stats.update(|stats| stats.requests_rejected += 1);
        RequestOutcome::Rejected(reason)
    }

    fn record(&mut self, candidate: Candidate, result: Result<TriggerOutcome, ContainerError>) {
        let Some(report) = self.report.as_mut() else {
            return;
        };
        match result {
            Ok(TriggerOutcome::SkippedLooted) => report.looted_at_dispatch += 1,
            Ok(TriggerOutcome::Dispatched(dispatch)) => {
                report.dispatched.record(dispatch.strategy);
                report.cleared_items += dispatch.cleared_items;
                if dispatch.ledger == Some(MarkOutcome::Created) {
                    report.ledger_entries_created += 1;
                }
            }
            Err(error) => {
                warn!(
                    key = %candidate.key,
                    kind = error.kind_label(),
                    error = %error,
                    "container_skipped"
                );
                match error {
                    ContainerError::MissingCapability { .. } => report.missing_capability += 1,
                    ContainerError::TransientUnavailable { .. } => {
                        report.transient_unavailable += 1
                    }
                    ContainerError::RegenerationFailure { .. } => {
                        report.regeneration_failures += 1
                    }
                }
            }
        }
    }

    fn abandon_cycle(&mut self) {
        if self.report.is_none() {
            return;
        }
        let abandoned = self.queue.len();
        // `pending` stays put so the coordinator is busy until the transition resolves.
        self.queue.clear();
        if let Some(report) = self.report.as_mut() {
            report.abandoned = abandoned;
        }
        self.finish_cycle(CycleEnd::Abandoned);
    }

    fn finish_cycle(&mut self, end: CycleEnd) {
        let Some(mut report) = self.report.take() else {
            return;
        };
        report.end = Some(end);
        match end {
            CycleEnd::Completed => info!(
                cycle = report.cycle_id,
                scene = %report.scene,
                processed = report.processed(),
                skipped = report.skipped(),
                ledger_entries_created = report.ledger_entries_created,
                regeneration_failures = report.regeneration_failures,
                cleared_items = report.cleared_items,
                "respawn_cycle_completed"
            ),
            CycleEnd::Abandoned => warn!(
                cycle = report.cycle_id,
                scene = %report.scene,
                processed = report.processed(),
                abandoned = report.abandoned,
                "respawn_cycle_abandoned"
            ),
        }
        self.stats.update(|stats| {
            match end {
                CycleEnd::Completed => stats.cycles_completed += 1,
                CycleEnd::Abandoned => stats.cycles_abandoned += 1,
            }
            stats.last_report = Some(report);
        });
    }
}

#[cfg(test)]
mod tests {
    include!("tests.rs");
}
