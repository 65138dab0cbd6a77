use tracing::debug;

use crate::world::SceneRef;

pub const DEFAULT_SAFE_ZONE_MARKERS: [&str; 4] = ["Base", "Hub", "Home", "Menu"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TransitionState {
    #[default]
    Stable,
    Unloading,
    Loading,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardEvent {
    TransitionStarted,
    Advanced,
    Resolved,
    Ignored,
}

#[derive(Debug, Clone, Default)]
pub struct TransitionGuard {
    state: TransitionState,
    loading_target: Option<String>,
}

impl TransitionGuard {
    pub fn state(&self) -> TransitionState {
        self.state
    }

    pub fn is_stable(&self) -> bool {
        self.state == TransitionState::Stable
    }

    pub fn loading_target(&self) -> Option<&str> {
        self.loading_target.as_deref()
    }

    pub fn on_unload_started(&mut self, scene: &SceneRef) -> GuardEvent {
        match self.state {
            TransitionState::Stable => {
                self.state = TransitionState::Unloading;
                debug!(scene = %scene, "guard_unloading");
                GuardEvent::TransitionStarted
            }
            TransitionState::Unloading | TransitionState::Loading => GuardEvent::Ignored,
        }
    }

    pub fn on_load_started(&mut self, target: &str) -> GuardEvent {
        let event = match self.state {
            TransitionState::Stable => GuardEvent::TransitionStarted,
            TransitionState::Unloading | TransitionState::Loading => GuardEvent::Advanced,
        };
        self.state = TransitionState::Loading;
        self.loading_target = Some(target.to_string());
        debug!(scene = target, "guard_loading");
        event
    }

    /// Only the scene named by the last load start resolves a `Loading` state.
    /// From `Unloading` any completed load resolves, since no target is known yet.
    pub fn on_load_completed(&mut self, scene: &SceneRef) -> GuardEvent {
        let resolves = match self.state {
            TransitionState::Stable => false,
            TransitionState::Unloading => true,
            TransitionState::Loading => self
                .loading_target
                .as_deref()
                .map_or(true, |target| target == scene.name),
        };
        if !resolves {
            return GuardEvent::Ignored;
        }
        self.state = TransitionState::Stable;
        self.loading_target = None;
        debug!(scene = %scene, "guard_stable");
        GuardEvent::Resolved
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafeZonePolicy {
    markers: Vec<String>,
}

impl Default for SafeZonePolicy {
    fn default() -> Self {
        Self::new(DEFAULT_SAFE_ZONE_MARKERS.iter().map(ToString::to_string))
    }
}

impl SafeZonePolicy {
    pub fn new<I>(markers: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        Self {
            markers: markers
                .into_iter()
                .map(|marker| marker.trim().to_string())
                .filter(|marker| !marker.is_empty())
                .collect(),
        }
    }

    pub fn is_safe_zone(&self, scene: &SceneRef) -> bool {
        self.markers
            .iter()
            .any(|marker| scene.name.contains(marker.as_str()))
    }
}
