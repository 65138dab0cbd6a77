use tracing::{debug, warn};

use crate::enumerator::Candidate;
use crate::error::ContainerError;
use crate::keys::ContainerKey;
use crate::ledger::MarkOutcome;
use crate::world::{DispatchedTask, LootContainer, LootWorld, StrategyError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegenerationStrategy {
    Direct,
    LoaderDelegate,
    ToggleActive,
}

pub const REGENERATION_CHAIN: [RegenerationStrategy; 3] = [
    RegenerationStrategy::Direct,
    RegenerationStrategy::LoaderDelegate,
    RegenerationStrategy::ToggleActive,
];

impl RegenerationStrategy {
    pub fn name(self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::LoaderDelegate => "loader_delegate",
            Self::ToggleActive => "toggle_active",
        }
    }

    fn attempt(
        self,
        container: &mut dyn LootContainer,
    ) -> Result<Option<DispatchedTask>, StrategyError> {
        match self {
            Self::Direct => container.regenerate().map(Some),
            Self::LoaderDelegate => match container.attached_loader() {
                Some(loader) => loader.start_setup().map(Some),
                None => Err(StrategyError::Unavailable),
            },
            Self::ToggleActive => {
                container.set_active(false)?;
                if let Err(error) = container.set_active(true) {
                    // A container left inactive is never enumerated again.
                    if let Err(restore) = container.set_active(true) {
                        warn!(error = %restore, "container_reactivation_failed");
                    }
                    return Err(error);
                }
                Ok(None)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    pub strategy: RegenerationStrategy,
    pub task: Option<DispatchedTask>,
    pub cleared_items: usize,
    pub ledger: Option<MarkOutcome>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    SkippedLooted,
    Dispatched(Dispatch),
}

/// Discards the candidate's contents and asks the host to regenerate them.
pub fn process_container<W>(
    world: &mut W,
    candidate: Candidate,
    revision: u64,
) -> Result<TriggerOutcome, ContainerError>
where
    W: LootWorld + ?Sized,
{
    if world.level_ledger().is_none() {
        return Err(ContainerError::TransientUnavailable {
            service: "level ledger",
        });
    }
    let Some(container) = world.container_mut(candidate.id) else {
        return Err(ContainerError::TransientUnavailable {
            service: "container instance",
        });
    };

    // Opened containers hold played content and must survive untouched.
    if container.is_looted() {
        debug!(key = %candidate.key, "container_looted_skipped");
        return Ok(TriggerOutcome::SkippedLooted);
    }
    if container.inventory().is_none() {
        return Err(ContainerError::MissingCapability {
            container: candidate.id,
            capability: "inventory",
        });
    }

    let cleared_items = clear_inventory(container);
    let attempt = run_chain(container, candidate.key);
    let ledger = mark_generated(world, candidate.key, revision);

    match attempt {
        Ok((strategy, task)) => Ok(TriggerOutcome::Dispatched(Dispatch {
            strategy,
            task,
            cleared_items,
            ledger,
        })),
        Err(0) => Err(ContainerError::MissingCapability {
            container: candidate.id,
            capability: "regeneration",
        }),
        Err(attempts) => Err(ContainerError::RegenerationFailure {
            key: candidate.key,
            attempts,
        }),
    }
}

fn clear_inventory(container: &mut dyn LootContainer) -> usize {
    let Some(inventory) = container.inventory_mut() else {
        return 0;
    };
    let item_count = inventory.item_count();
    if item_count > 0 {
        inventory.clear();
    }
    item_count
}

fn run_chain(
    container: &mut dyn LootContainer,
    key: ContainerKey,
) -> Result<(RegenerationStrategy, Option<DispatchedTask>), usize> {
    let mut attempts = 0;
    for strategy in REGENERATION_CHAIN {
        match strategy.attempt(container) {
            Ok(task) => {
                debug!(key = %key, strategy = strategy.name(), "regeneration_dispatched");
                return Ok((strategy, task));
            }
            Err(StrategyError::Unavailable) => {}
            Err(error) => {
                attempts += 1;
                debug!(
                    key = %key,
                    strategy = strategy.name(),
                    error = %error,
                    "regeneration_strategy_failed"
                );
            }
        }
    }
    Err(attempts)
}

fn mark_generated<W>(world: &mut W, key: ContainerKey, revision: u64) -> Option<MarkOutcome>
where
    W: LootWorld + ?Sized,
{
    match world.level_ledger_mut() {
        Some(ledger) => Some(ledger.mark_generated(key, revision)),
        None => {
            warn!(key = %key, "ledger_mark_skipped");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Behavior, FakeContainer, FakeWorld};
    use crate::world::ContainerId;

    fn world_with(container: FakeContainer) -> (FakeWorld, Candidate) {
        let mut world = FakeWorld::in_scene("Level_Farm");
        let key = container.key.expect("key");
        let id = world.add(container);
        (world, Candidate { id, key })
    }

    fn unopened() -> FakeContainer {
        FakeContainer::unopened(&crate::world::SceneRef::new("Level_Farm", 1), 11)
    }

    #[test]
    fn looted_container_is_left_untouched() {
        let (mut world, candidate) = world_with(unopened().looted());

        let outcome = process_container(&mut world, candidate, 0).expect("outcome");

        assert_eq!(outcome, TriggerOutcome::SkippedLooted);
        let container = world.get(candidate.id);
        assert_eq!(container.clear_calls(), 0);
        assert_eq!(container.regeneration_attempts(), 0);
        assert_eq!(world.ledger_len(), 0);
    }

    #[test]
    fn direct_regeneration_clears_and_marks() {
        let (mut world, candidate) = world_with(unopened());

        let outcome = process_container(&mut world, candidate, 3).expect("outcome");

        let TriggerOutcome::Dispatched(dispatch) = outcome else {
            panic!("expected dispatch");
        };
        assert_eq!(dispatch.strategy, RegenerationStrategy::Direct);
        assert_eq!(dispatch.cleared_items, 3);
        assert_eq!(dispatch.ledger, Some(MarkOutcome::Created));
        assert!(dispatch.task.is_some());
        assert_eq!(world.get(candidate.id).clear_calls(), 1);
        assert!(world
            .ledger
            .as_ref()
            .expect("ledger")
            .is_current(candidate.key, 3));
    }

    #[test]
    fn empty_inventory_is_not_cleared() {
        let (mut world, candidate) = world_with(unopened().with_items(Vec::new()));

        process_container(&mut world, candidate, 0).expect("outcome");

        assert_eq!(world.get(candidate.id).clear_calls(), 0);
    }

    #[test]
    fn failing_direct_falls_back_to_loader() {
        let (mut world, candidate) =
            world_with(unopened().direct(Behavior::Fail).with_loader(Behavior::Succeed));

        let outcome = process_container(&mut world, candidate, 0).expect("outcome");

        let TriggerOutcome::Dispatched(dispatch) = outcome else {
            panic!("expected dispatch");
        };
        assert_eq!(dispatch.strategy, RegenerationStrategy::LoaderDelegate);
        let container = world.get(candidate.id);
        assert_eq!(container.direct_calls, 1);
        assert_eq!(container.loader_calls(), 1);
        assert_eq!(container.toggle_calls, 0);
    }

    #[test]
    fn missing_loader_falls_back_to_toggle() {
        let (mut world, candidate) =
            world_with(unopened().direct(Behavior::Unavailable).toggle(Behavior::Succeed));

        let outcome = process_container(&mut world, candidate, 0).expect("outcome");

        let TriggerOutcome::Dispatched(dispatch) = outcome else {
            panic!("expected dispatch");
        };
        assert_eq!(dispatch.strategy, RegenerationStrategy::ToggleActive);
        assert_eq!(dispatch.task, None);
        let container = world.get(candidate.id);
        assert!(container.active);
        assert_eq!(container.toggle_calls, 2);
    }

    #[test]
    fn exhausted_chain_still_marks_generated() {
        let (mut world, candidate) = world_with(
            unopened()
                .direct(Behavior::Fail)
                .with_loader(Behavior::Fail)
                .toggle(Behavior::Fail),
        );

        let error = process_container(&mut world, candidate, 0).expect_err("failure");

        assert_eq!(
            error,
            ContainerError::RegenerationFailure {
                key: candidate.key,
                attempts: 3
            }
        );
        let container = world.get(candidate.id);
        assert_eq!(container.direct_calls, 1);
        assert_eq!(container.loader_calls(), 1);
        assert_eq!(container.toggle_calls, 1);
        assert!(world
            .ledger
            .as_ref()
            .expect("ledger")
            .contains(candidate.key));
    }

    #[test]
    fn refused_reenable_restores_the_container() {
        let (mut world, candidate) =
            world_with(unopened().direct(Behavior::Unavailable).refuse_reenable_once());

        let error = process_container(&mut world, candidate, 0).expect_err("failure");

        assert_eq!(
            error,
            ContainerError::RegenerationFailure {
                key: candidate.key,
                attempts: 1
            }
        );
        let container = world.get(candidate.id);
        assert!(container.active);
        assert_eq!(container.toggle_calls, 3);
        assert_eq!(world.ledger_len(), 1);
    }

    #[test]
    fn container_without_any_strategy_is_missing_capability() {
        let (mut world, candidate) = world_with(unopened().direct(Behavior::Unavailable));

        let error = process_container(&mut world, candidate, 0).expect_err("no strategy");

        assert_eq!(
            error,
            ContainerError::MissingCapability {
                container: candidate.id,
                capability: "regeneration"
            }
        );
        assert!(world
            .ledger
            .as_ref()
            .expect("ledger")
            .contains(candidate.key));
    }

    #[test]
    fn inventory_torn_down_after_enumeration_is_missing_capability() {
        let (mut world, candidate) = world_with(unopened());
        world.get_mut(candidate.id).inventory = None;

        let error = process_container(&mut world, candidate, 0).expect_err("missing");

        assert_eq!(
            error,
            ContainerError::MissingCapability {
                container: candidate.id,
                capability: "inventory"
            }
        );
        assert_eq!(world.total_attempts(), 0);
        assert_eq!(world.ledger_len(), 0);
    }

    #[test]
    fn missing_ledger_aborts_before_touching_container() {
        let (mut world, candidate) = world_with(unopened());
        world.ledger = None;

        let error = process_container(&mut world, candidate, 0).expect_err("unavailable");

        assert_eq!(error.kind_label(), "transient_unavailable");
        assert_eq!(world.get(candidate.id).clear_calls(), 0);
        assert_eq!(world.total_attempts(), 0);
    }

    #[test]
    fn vanished_container_is_transient() {
        let mut world = FakeWorld::in_scene("Level_Farm");
        let candidate = Candidate {
            id: ContainerId(99),
            key: ContainerKey(99),
        };

        let error = process_container(&mut world, candidate, 0).expect_err("unavailable");

        assert!(matches!(
            error,
            ContainerError::TransientUnavailable {
                service: "container instance"
            }
        ));
        assert_eq!(world.ledger_len(), 0);
    }
}
