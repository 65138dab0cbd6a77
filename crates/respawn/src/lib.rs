mod atomic_io;
pub mod config;
pub mod coordinator;
pub mod detector;
pub mod enumerator;
pub mod error;
pub mod guard;
pub mod json;
pub mod keys;
pub mod ledger;
pub mod runtime;
pub mod settings;
pub mod stats;
pub mod trigger;
pub mod world;

#[cfg(test)]
mod testing;

pub use config::{
    ConfigFeed, ConfigFileError, ConfigHandle, ConfigProvider, ConfigSnapshot, LocalConfigFile,
    RespawnContext, DEFAULT_FLOAT_TOLERANCE,
};
pub use coordinator::{RejectReason, RequestOutcome, RespawnCoordinator};
pub use detector::{ConfigChangeDetector, DetectorTick, DEFAULT_DEBOUNCE_WINDOW};
pub use enumerator::{
    Candidate, ContainerEnumerator, Enumeration, DEFAULT_MAX_CONTAINERS_PER_CYCLE,
};
pub use error::ContainerError;
pub use guard::{
    GuardEvent, SafeZonePolicy, TransitionGuard, TransitionState, DEFAULT_SAFE_ZONE_MARKERS,
};
pub use json::{parse_json, JsonParseError};
pub use keys::ContainerKey;
pub use ledger::{GenerationLedger, LedgerTally, MarkOutcome};
pub use runtime::{RespawnRuntime, TickReport};
pub use settings::{load_settings, RespawnSettings, SettingsError, DEFAULT_CONTAINERS_PER_TICK};
pub use stats::{CycleEnd, CycleReport, RespawnStats, StatsHandle, StrategyCounts};
pub use trigger::{
    process_container, Dispatch, RegenerationStrategy, TriggerOutcome, REGENERATION_CHAIN,
};
pub use world::{
    AttachedLoader, CapabilityError, ContainerId, DispatchedTask, Inventory, LootContainer,
    LootWorld, SceneRef, StrategyError,
};
