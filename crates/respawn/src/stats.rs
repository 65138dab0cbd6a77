use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use tracing::warn;

use crate::enumerator::Enumeration;
use crate::ledger::LedgerTally;
use crate::trigger::RegenerationStrategy;
use crate::world::SceneRef;

static STATS_LOCK_POISON_WARNED: AtomicBool = AtomicBool::new(false);

fn warn_stats_lock_poison_once(operation: &'static str) {
    if STATS_LOCK_POISON_WARNED
        .compare_exchange(false, true, Ordering::Relaxed, Ordering::Relaxed)
        .is_ok()
    {
        warn!(operation, "stats lock poisoned; recovered inner value");
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StrategyCounts {
    pub direct: usize,
    pub loader_delegate: usize,
    pub toggle_active: usize,
}

impl StrategyCounts {
    pub fn record(&mut self, strategy: RegenerationStrategy) {
        match strategy {
            RegenerationStrategy::Direct => self.direct += 1,
            RegenerationStrategy::LoaderDelegate => self.loader_delegate += 1,
            RegenerationStrategy::ToggleActive => self.toggle_active += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.direct + self.loader_delegate + self.toggle_active
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleEnd {
    Completed,
    Abandoned,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub cycle_id: u64,
    pub scene: SceneRef,
    pub revision: u64,
    pub discovered: usize,
    pub other_scene: usize,
    pub inactive: usize,
    pub looted: usize,
    pub uninitialized: usize,
    pub missing_key: usize,
    pub duplicate_key: usize,
    pub already_current: usize,
    pub truncated: usize,
    pub ledger_before: LedgerTally,
    pub candidates: usize,
    pub dispatched: StrategyCounts,
    pub looted_at_dispatch: usize,
    pub regeneration_failures: usize,
    pub transient_unavailable: usize,
    pub missing_capability: usize,
    pub ledger_entries_created: usize,
    pub cleared_items: usize,
    pub abandoned: usize,
    pub end: Option<CycleEnd>,
}

impl CycleReport {
    pub fn start(cycle_id: u64, scene: SceneRef, revision: u64, enumeration: &Enumeration) -> Self {
        Self {
            cycle_id,
            scene,
            revision,
            discovered: enumeration.discovered,
            other_scene: enumeration.other_scene,
            inactive: enumeration.inactive,
            looted: enumeration.looted,
            uninitialized: enumeration.uninitialized,
            missing_key: enumeration.missing_key,
            duplicate_key: enumeration.duplicate_key,
            already_current: enumeration.already_current,
            truncated: enumeration.truncated,
            ledger_before: enumeration.ledger,
            candidates: enumeration.candidates.len(),
            dispatched: StrategyCounts::default(),
            looted_at_dispatch: 0,
            regeneration_failures: 0,
            transient_unavailable: 0,
            missing_capability: 0,
            ledger_entries_created: 0,
            cleared_items: 0,
            abandoned: 0,
            end: None,
        }
    }

    pub fn processed(&self) -> usize {
        self.dispatched.total() + self.regeneration_failures
    }

    pub fn skipped(&self) -> usize {
        self.discovered.saturating_sub(self.processed())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RespawnStats {
    pub cycles_started: u64,
    pub cycles_completed: u64,
    pub cycles_abandoned: u64,
    pub requests_rejected: u64,
    pub busy_force_resets: u64,
    pub last_report: Option<CycleReport>,
}

#[derive(Clone, Debug, Default)]
pub struct StatsHandle {
    stats: Arc<RwLock<RespawnStats>>,
}

impl StatsHandle {
    pub fn snapshot(&self) -> RespawnStats {
        match self.stats.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => {
                warn_stats_lock_poison_once("read");
                poisoned.into_inner().clone()
            }
        }
    }

    pub(crate) fn update(&self, edit: impl FnOnce(&mut RespawnStats)) {
        match self.stats.write() {
            Ok(mut guard) => edit(&mut guard),
            Err(poisoned) => {
                warn_stats_lock_poison_once("write");
                let mut guard = poisoned.into_inner();
                edit(&mut guard);
            }
        }
    }
}
