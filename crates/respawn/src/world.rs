use std::fmt;

use thiserror::Error;

use crate::keys::ContainerKey;
use crate::ledger::GenerationLedger;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SceneRef {
    pub name: String,
    pub instance: u64,
}

impl SceneRef {
    pub fn new(name: impl Into<String>, instance: u64) -> Self {
        Self {
            name: name.into(),
            instance,
        }
    }
}

impl fmt::Display for SceneRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.name, self.instance)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContainerId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DispatchedTask(pub u64);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapabilityError {
    #[error("container does not expose {capability}")]
    Missing { capability: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StrategyError {
    #[error("strategy is not available on this container")]
    Unavailable,
    #[error("strategy failed: {0}")]
    Failed(String),
}

pub trait Inventory {
    fn item_count(&self) -> usize;
    fn clear(&mut self);
}

pub trait AttachedLoader {
    fn start_setup(&mut self) -> Result<DispatchedTask, StrategyError>;
}

pub trait LootContainer {
    fn scene(&self) -> &SceneRef;
    fn is_active(&self) -> bool;
    /// Monotonic: once a player has opened the container this never returns `false` again.
    fn is_looted(&self) -> bool;
    fn key(&self) -> Result<ContainerKey, CapabilityError>;
    fn inventory(&self) -> Option<&dyn Inventory>;
    fn inventory_mut(&mut self) -> Option<&mut dyn Inventory>;

    fn regenerate(&mut self) -> Result<DispatchedTask, StrategyError> {
        Err(StrategyError::Unavailable)
    }

    fn attached_loader(&mut self) -> Option<&mut dyn AttachedLoader> {
        None
    }

    fn set_active(&mut self, _active: bool) -> Result<(), StrategyError> {
        Err(StrategyError::Unavailable)
    }
}

pub trait LootWorld {
    fn active_scene(&self) -> Option<SceneRef>;
    fn container_instances(&self) -> Vec<ContainerId>;
    fn container(&self, id: ContainerId) -> Option<&dyn LootContainer>;
    fn container_mut(&mut self, id: ContainerId) -> Option<&mut dyn LootContainer>;
    /// Scene-scoped ledger. `None` while the owning scene service is torn down.
    fn level_ledger(&self) -> Option<&GenerationLedger>;
    fn level_ledger_mut(&mut self) -> Option<&mut GenerationLedger>;
}
