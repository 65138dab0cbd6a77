use std::cell::Cell;

use crate::keys::ContainerKey;
use crate::ledger::GenerationLedger;
use crate::world::{
    AttachedLoader, CapabilityError, ContainerId, DispatchedTask, Inventory, LootContainer,
    LootWorld, SceneRef, StrategyError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Behavior {
    Succeed,
    Unavailable,
    Fail,
}

impl Behavior {
    fn run(self, what: &str) -> Result<(), StrategyError> {
        match self {
            Self::Succeed => Ok(()),
            Self::Unavailable => Err(StrategyError::Unavailable),
            Self::Fail => Err(StrategyError::Failed(format!("{what} threw"))),
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct FakeInventory {
    pub items: Vec<u32>,
    pub clear_calls: usize,
}

impl Inventory for FakeInventory {
    fn item_count(&self) -> usize {
        self.items.len()
    }

    fn clear(&mut self) {
        self.clear_calls += 1;
        self.items.clear();
    }
}

#[derive(Debug)]
pub(crate) struct FakeLoader {
    pub behavior: Behavior,
    pub calls: usize,
}

impl AttachedLoader for FakeLoader {
    fn start_setup(&mut self) -> Result<DispatchedTask, StrategyError> {
        self.calls += 1;
        self.behavior.run("loader")?;
        Ok(DispatchedTask(1_000 + self.calls as u64))
    }
}

#[derive(Debug)]
pub(crate) struct FakeContainer {
    pub scene: SceneRef,
    pub active: bool,
    pub looted: bool,
    pub key: Option<ContainerKey>,
    pub inventory: Option<FakeInventory>,
    pub direct: Behavior,
    pub direct_calls: usize,
    pub loader: Option<FakeLoader>,
    pub toggle: Behavior,
    pub toggle_calls: usize,
    pub reenable_refusals: usize,
}

impl FakeContainer {
    pub(crate) fn unopened(scene: &SceneRef, key: u64) -> Self {
        Self {
            scene: scene.clone(),
            active: true,
            looted: false,
            key: Some(ContainerKey(key)),
            inventory: Some(FakeInventory {
                items: vec![1, 2, 3],
                clear_calls: 0,
            }),
            direct: Behavior::Succeed,
            direct_calls: 0,
            loader: None,
            toggle: Behavior::Unavailable,
            toggle_calls: 0,
            reenable_refusals: 0,
        }
    }

    pub(crate) fn looted(mut self) -> Self {
        self.looted = true;
        self
    }

    pub(crate) fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    pub(crate) fn without_key(mut self) -> Self {
        self.key = None;
        self
    }

    pub(crate) fn uninitialized(mut self) -> Self {
        self.inventory = None;
        self
    }

    pub(crate) fn with_items(mut self, items: Vec<u32>) -> Self {
        if let Some(inventory) = self.inventory.as_mut() {
            inventory.items = items;
        }
        self
    }

    pub(crate) fn direct(mut self, behavior: Behavior) -> Self {
        self.direct = behavior;
        self
    }

    pub(crate) fn with_loader(mut self, behavior: Behavior) -> Self {
        self.loader = Some(FakeLoader { behavior, calls: 0 });
        self
    }

    pub(crate) fn toggle(mut self, behavior: Behavior) -> Self {
        self.toggle = behavior;
        self
    }

    pub(crate) fn refuse_reenable_once(mut self) -> Self {
        self.toggle = Behavior::Succeed;
        self.reenable_refusals = 1;
        self
    }

    pub(crate) fn clear_calls(&self) -> usize {
        self.inventory
            .as_ref()
            .map(|inventory| inventory.clear_calls)
            .unwrap_or(0)
    }

    pub(crate) fn loader_calls(&self) -> usize {
        self.loader.as_ref().map(|loader| loader.calls).unwrap_or(0)
    }

    pub(crate) fn regeneration_attempts(&self) -> usize {
        self.direct_calls + self.loader_calls() + self.toggle_calls
    }
}

impl LootContainer for FakeContainer {
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
        self.key
            .ok_or(CapabilityError::Missing { capability: "key" })
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
        self.direct_calls += 1;
        self.direct.run("setup")?;
        Ok(DispatchedTask(self.direct_calls as u64))
    }

    fn attached_loader(&mut self) -> Option<&mut dyn AttachedLoader> {
        self.loader
            .as_mut()
            .map(|loader| loader as &mut dyn AttachedLoader)
    }

    fn set_active(&mut self, active: bool) -> Result<(), StrategyError> {
        self.toggle_calls += 1;
        self.toggle.run("enable toggle")?;
        if active && self.reenable_refusals > 0 {
            self.reenable_refusals -= 1;
            return Err(StrategyError::Failed("re-enable refused".to_string()));
        }
        self.active = active;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub(crate) struct FakeWorld {
    pub scene: Option<SceneRef>,
    pub containers: Vec<(ContainerId, FakeContainer)>,
    pub ledger: Option<GenerationLedger>,
    pub enumerations: Cell<usize>,
    next_id: u64,
}

impl FakeWorld {
    pub(crate) fn in_scene(name: &str) -> Self {
        Self {
            scene: Some(SceneRef::new(name, 1)),
            ledger: Some(GenerationLedger::new()),
            ..Self::default()
        }
    }

    pub(crate) fn scene_ref(&self) -> SceneRef {
        self.scene.clone().expect("fake world has an active scene")
    }

    pub(crate) fn add(&mut self, container: FakeContainer) -> ContainerId {
        let id = ContainerId(self.next_id);
        self.next_id += 1;
        self.containers.push((id, container));
        id
    }

    pub(crate) fn add_unopened(&mut self, first_key: u64, count: u64) -> Vec<ContainerId> {
        let scene = self.scene_ref();
        (first_key..first_key + count)
            .map(|key| self.add(FakeContainer::unopened(&scene, key)))
            .collect()
    }

    pub(crate) fn get(&self, id: ContainerId) -> &FakeContainer {
        self.containers
            .iter()
            .find(|(candidate, _)| *candidate == id)
            .map(|(_, container)| container)
            .expect("fake container exists")
    }

    pub(crate) fn get_mut(&mut self, id: ContainerId) -> &mut FakeContainer {
        self.containers
            .iter_mut()
            .find(|(candidate, _)| *candidate == id)
            .map(|(_, container)| container)
            .expect("fake container exists")
    }

    pub(crate) fn ledger_len(&self) -> usize {
        self.ledger.as_ref().map(GenerationLedger::len).unwrap_or(0)
    }

    pub(crate) fn total_attempts(&self) -> usize {
        self.containers
            .iter()
            .map(|(_, container)| container.regeneration_attempts())
            .sum()
    }
}

impl LootWorld for FakeWorld {
    fn active_scene(&self) -> Option<SceneRef> {
        self.scene.clone()
    }

    fn container_instances(&self) -> Vec<ContainerId> {
        self.enumerations.set(self.enumerations.get() + 1);
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
