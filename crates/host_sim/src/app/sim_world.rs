use std::cell::Cell;
use std::rc::Rc;

use respawn::{
    AttachedLoader, CapabilityError, ConfigSnapshot, ContainerId, ContainerKey, DispatchedTask,
    GenerationLedger, Inventory, LootContainer, LootWorld, SceneRef, StrategyError,
};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

/// Ticks between a setup request and the inventory actually being filled.
pub(crate) const SETUP_DELAY_TICKS: u32 = 2;
const DEFAULT_BASE_ITEMS: u32 = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum SetupKind {
    #[default]
    Direct,
    Loader,
    ToggleOnly,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ContainerSetup {
    pub(crate) placement: String,
    #[serde(default = "default_base_items")]
    pub(crate) base_items: u32,
    #[serde(default)]
    pub(crate) setup: SetupKind,
    #[serde(default)]
    pub(crate) opened: bool,
}

fn default_base_items() -> u32 {
    DEFAULT_BASE_ITEMS
}

impl ContainerSetup {
    pub(crate) fn new(placement: &str, setup: SetupKind) -> Self {
        Self {
            placement: placement.to_string(),
            base_items: DEFAULT_BASE_ITEMS,
            setup,
            opened: false,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct TaskIssuer(Rc<Cell<u64>>);

impl TaskIssuer {
    fn issue(&self) -> DispatchedTask {
        let next = self.0.get() + 1;
        self.0.set(next);
        DispatchedTask(next)
    }
}

#[derive(Debug, Default)]
pub(crate) struct SimInventory {
    items: Vec<u32>,
}

impl Inventory for SimInventory {
    fn item_count(&self) -> usize {
        self.items.len()
    }

    fn clear(&mut self) {
        self.items.clear();
    }
}

#[derive(Debug)]
struct SimLoader {
    tasks: TaskIssuer,
    scheduled: Option<u32>,
}

impl AttachedLoader for SimLoader {
    fn start_setup(&mut self) -> Result<DispatchedTask, StrategyError> {
        self.scheduled = Some(SETUP_DELAY_TICKS);
        Ok(self.tasks.issue())
    }
}

#[derive(Debug)]
pub(crate) struct SimContainer {
    placement: String,
    scene: SceneRef,
    key: ContainerKey,
    active: bool,
    looted: bool,
    base_items: u32,
    setup: SetupKind,
    inventory: Option<SimInventory>,
    fill_in: Option<u32>,
    loader: Option<SimLoader>,
    tasks: TaskIssuer,
    fills: u32,
}

impl SimContainer {
    fn spawn(scene: &SceneRef, session_seed: u64, setup: &ContainerSetup, tasks: TaskIssuer) -> Self {
        let loader = (setup.setup == SetupKind::Loader).then(|| SimLoader {
            tasks: tasks.clone(),
            scheduled: None,
        });
        Self {
            placement: setup.placement.clone(),
            scene: scene.clone(),
            key: ContainerKey::from_placement(&scene.name, &setup.placement, session_seed),
            active: true,
            looted: setup.opened,
            base_items: setup.base_items,
            setup: setup.setup,
            inventory: None,
            // Freshly spawned containers initialize their inventory on a later tick.
            fill_in: Some(SETUP_DELAY_TICKS),
            loader,
            tasks,
            fills: 0,
        }
    }

    pub(crate) fn placement(&self) -> &str {
        &self.placement
    }

    pub(crate) fn fills(&self) -> u32 {
        self.fills
    }

    pub(crate) fn item_count(&self) -> Option<usize> {
        self.inventory.as_ref().map(Inventory::item_count)
    }

    fn advance(&mut self, config: &ConfigSnapshot) {
        if let Some(scheduled) = self.loader.as_mut().and_then(|loader| loader.scheduled.take()) {
            self.fill_in = Some(scheduled);
        }
        let Some(remaining) = self.fill_in else {
            return;
        };
        if remaining > 0 {
            self.fill_in = Some(remaining - 1);
            return;
        }
        self.fill_in = None;
        self.fill(config);
    }

    fn fill(&mut self, config: &ConfigSnapshot) {
        let scaled = self.base_items as f32 * config.count_multiplier * config.drop_multiplier;
        let count = scaled.round().max(0.0) as u32;
        let inventory = self.inventory.get_or_insert_with(SimInventory::default);
        inventory.items = (0..count).collect();
        self.fills += 1;
        debug!(placement = %self.placement, items = count, "sim_container_filled");
    }
}

impl LootContainer for SimContainer {
    fn scene(&self) -> &SceneRef {
        &self.scene
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn is_looted(&self) -> bool {
        self.looted
    }

    fn key(&self) -> Result<ContainerKey, CapabilityError> {
        Ok(self.key)
    }

    fn inventory(&self) -> Option<&dyn Inventory> {
        self.inventory
            .as_ref()
            .map(|inventory| inventory as &dyn Inventory)
    }

    fn inventory_mut(&mut self) -> Option<&mut dyn Inventory> {
        self.inventory
            .as_mut()
            .map(|inventory| inventory as &mut dyn Inventory)
    }

    fn regenerate(&mut self) -> Result<DispatchedTask, StrategyError> {
        if self.setup != SetupKind::Direct {
            return Err(StrategyError::Unavailable);
        }
        self.fill_in = Some(SETUP_DELAY_TICKS);
        Ok(self.tasks.issue())
    }

    fn attached_loader(&mut self) -> Option<&mut dyn AttachedLoader> {
        self.loader
            .as_mut()
            .map(|loader| loader as &mut dyn AttachedLoader)
    }

    fn set_active(&mut self, active: bool) -> Result<(), StrategyError> {
        // Re-enabling runs the container's own initialization.
        if active && !self.active {
            self.fill_in = Some(0);
        }
        self.active = active;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub(crate) enum SimError {
    #[error("no container at that placement")]
    UnknownPlacement,
    #[error("no scene load is in progress")]
    NotLoading,
    #[error("no scene is active")]
    NoActiveScene,
}

#[derive(Debug)]
pub(crate) struct SimWorld {
    session_seed: u64,
    scene: Option<SceneRef>,
    ledger: Option<GenerationLedger>,
    containers: Vec<(ContainerId, SimContainer)>,
    loading: Option<(String, Vec<ContainerSetup>)>,
    next_instance: u64,
    next_container_id: u64,
    tasks: TaskIssuer,
}

impl SimWorld {
    pub(crate) fn new(session_seed: u64) -> Self {
        Self {
            session_seed,
            scene: None,
            ledger: None,
            containers: Vec::new(),
            loading: None,
            next_instance: 1,
            next_container_id: 1,
            tasks: TaskIssuer::default(),
        }
    }

    pub(crate) fn scene(&self) -> Option<&SceneRef> {
        self.scene.as_ref()
    }

    pub(crate) fn ledger(&self) -> Option<&GenerationLedger> {
        self.ledger.as_ref()
    }

    pub(crate) fn containers(&self) -> impl Iterator<Item = &SimContainer> {
        self.containers.iter().map(|(_, container)| container)
    }

    #[cfg(test)]
    pub(crate) fn container_by_placement(&self, placement: &str) -> Option<&SimContainer> {
        self.containers()
            .find(|container| container.placement() == placement)
    }

    pub(crate) fn load_initial(&mut self, name: &str, containers: &[ContainerSetup]) -> SceneRef {
        self.begin_load(name, containers.to_vec());
        self.finish_load()
    }

    /// Starts tearing down the active scene. The level ledger goes with it.
    pub(crate) fn begin_unload(&mut self) -> Result<SceneRef, SimError> {
        let scene = self.scene.take().ok_or(SimError::NoActiveScene)?;
        self.ledger = None;
        self.containers.clear();
        info!(scene = %scene, "sim_scene_unloading");
        Ok(scene)
    }

    pub(crate) fn begin_load(&mut self, name: &str, containers: Vec<ContainerSetup>) {
        self.loading = Some((name.to_string(), containers));
        info!(scene = name, "sim_scene_loading");
    }

    pub(crate) fn complete_load(&mut self) -> Result<SceneRef, SimError> {
        if self.loading.is_none() {
            return Err(SimError::NotLoading);
        }
        Ok(self.finish_load())
    }

    fn finish_load(&mut self) -> SceneRef {
        let (name, setups) = self.loading.take().unwrap_or_default();
        let scene = SceneRef::new(name, self.next_instance);
        self.next_instance += 1;
        self.containers.clear();
        for setup in &setups {
            let id = ContainerId(self.next_container_id);
            self.next_container_id += 1;
            let container = SimContainer::spawn(&scene, self.session_seed, setup, self.tasks.clone());
            self.containers.push((id, container));
        }
        self.ledger = Some(GenerationLedger::new());
        self.scene = Some(scene.clone());
        info!(scene = %scene, containers = setups.len(), "sim_scene_loaded");
        scene
    }

    pub(crate) fn open_container(&mut self, placement: &str) -> Result<(), SimError> {
        let container = self
            .containers
            .iter_mut()
            .map(|(_, container)| container)
            .find(|container| container.placement() == placement)
            .ok_or(SimError::UnknownPlacement)?;
        container.looted = true;
        if let Some(inventory) = container.inventory.as_mut() {
            inventory.clear();
        }
        Ok(())
    }

    pub(crate) fn advance(&mut self, config: &ConfigSnapshot) {
        for (_, container) in &mut self.containers {
            container.advance(config);
        }
    }
}

impl LootWorld for SimWorld {
    fn active_scene(&self) -> Option<SceneRef> {
        self.scene.clone()
    }

    fn container_instances(&self) -> Vec<ContainerId> {
        self.containers.iter().map(|(id, _)| *id).collect()
    }

    fn container(&self, id: ContainerId) -> Option<&dyn LootContainer> {
        self.containers
            .iter()
            .find(|(candidate, _)| *candidate == id)
            .map(|(_, container)| container as &dyn LootContainer)
    }

    fn container_mut(&mut self, id: ContainerId) -> Option<&mut dyn LootContainer> {
        self.containers
            .iter_mut()
            .find(|(candidate, _)| *candidate == id)
            .map(|(_, container)| container as &mut dyn LootContainer)
    }

    fn level_ledger(&self) -> Option<&GenerationLedger> {
        self.ledger.as_ref()
    }

    fn level_ledger_mut(&mut self) -> Option<&mut GenerationLedger> {
        self.ledger.as_mut()
    }
}
