use std::collections::HashSet;

use tracing::debug;

use crate::keys::ContainerKey;
use crate::ledger::{GenerationLedger, LedgerTally};
use crate::world::{ContainerId, LootWorld, SceneRef};

pub const DEFAULT_MAX_CONTAINERS_PER_CYCLE: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub id: ContainerId,
    pub key: ContainerKey,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Enumeration {
    pub candidates: Vec<Candidate>,
    pub discovered: usize,
    pub other_scene: usize,
    pub inactive: usize,
    pub looted: usize,
    pub uninitialized: usize,
    pub missing_key: usize,
    pub duplicate_key: usize,
    pub already_current: usize,
    pub truncated: usize,
    pub ledger: LedgerTally,
}

#[derive(Debug, Clone, Copy)]
pub struct ContainerEnumerator {
    max_per_cycle: usize,
}

impl Default for ContainerEnumerator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONTAINERS_PER_CYCLE)
    }
}

impl ContainerEnumerator {
    pub fn new(max_per_cycle: usize) -> Self {
        Self {
            max_per_cycle: max_per_cycle.max(1),
        }
    }

    pub fn max_per_cycle(&self) -> usize {
        self.max_per_cycle
    }

    pub fn enumerate<W>(
        &self,
        world: &W,
        scene: &SceneRef,
        ledger: &GenerationLedger,
        revision: u64,
    ) -> Enumeration
    where
        W: LootWorld + ?Sized,
    {
        let mut result = Enumeration::default();
        let mut seen_keys = HashSet::new();
        let mut eligible_keys = Vec::new();

        for id in world.container_instances() {
            let Some(container) = world.container(id) else {
                continue;
            };
            result.discovered += 1;

            if container.scene() != scene {
                result.other_scene += 1;
                continue;
            }
            if !container.is_active() {
                result.inactive += 1;
                continue;
            }
            if container.is_looted() {
                result.looted += 1;
                continue;
            }
            if container.inventory().is_none() {
                result.uninitialized += 1;
                continue;
            }
            let key = match container.key() {
                Ok(key) => key,
                Err(error) => {
                    debug!(container = id.0, error = %error, "container_key_unavailable");
                    result.missing_key += 1;
                    continue;
                }
            };
            if !seen_keys.insert(key) {
                result.duplicate_key += 1;
                continue;
            }

            eligible_keys.push(key);
            if ledger.is_current(key, revision) {
                result.already_current += 1;
                continue;
            }
            result.candidates.push(Candidate { id, key });
        }

        result.ledger = ledger.tally(eligible_keys);
        if result.candidates.len() > self.max_per_cycle {
            result.truncated = result.candidates.len() - self.max_per_cycle;
            result.candidates.truncate(self.max_per_cycle);
        }
        result
    }
}
