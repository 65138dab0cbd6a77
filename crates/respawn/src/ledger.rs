use std::collections::HashMap;

use crate::keys::ContainerKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkOutcome {
    Created,
    Refreshed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerTally {
    pub generated: usize,
    pub not_generated: usize,
}

/// Idempotency map from container key to the config revision it was last generated for.
#[derive(Debug, Default, Clone)]
pub struct GenerationLedger {
    revisions: HashMap<ContainerKey, u64>,
}

impl GenerationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: ContainerKey) -> bool {
        self.revisions.contains_key(&key)
    }

    pub fn revision_of(&self, key: ContainerKey) -> Option<u64> {
        self.revisions.get(&key).copied()
    }

    pub fn is_current(&self, key: ContainerKey, revision: u64) -> bool {
        self.revision_of(key)
            .is_some_and(|generated_for| generated_for >= revision)
    }

    pub fn mark_generated(&mut self, key: ContainerKey, revision: u64) -> MarkOutcome {
        match self.revisions.get_mut(&key) {
            Some(generated_for) => {
                *generated_for = (*generated_for).max(revision);
                MarkOutcome::Refreshed
            }
            None => {
                self.revisions.insert(key, revision);
                MarkOutcome::Created
            }
        }
    }

    pub fn len(&self) -> usize {
        self.revisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.revisions.is_empty()
    }

    pub fn tally<I>(&self, keys: I) -> LedgerTally
    where
        I: IntoIterator<Item = ContainerKey>,
    {
        let mut tally = LedgerTally::default();
        for key in keys {
            if self.contains(key) {
                tally.generated += 1;
            } else {
                tally.not_generated += 1;
            }
        }
        tally
    }
}
