use thiserror::Error;

use crate::keys::ContainerKey;
use crate::world::ContainerId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContainerError {
    #[error("container {container:?} is missing capability {capability}")]
    MissingCapability {
        container: ContainerId,
        capability: &'static str,
    },
    #[error("{service} is unavailable")]
    TransientUnavailable { service: &'static str },
    #[error("every regeneration strategy failed for container {key} ({attempts} attempted)")]
    RegenerationFailure { key: ContainerKey, attempts: usize },
}

impl ContainerError {
    pub fn kind_label(&self) -> &'static str {
        match self {
            Self::MissingCapability { .. } => "missing_capability",
            Self::TransientUnavailable { .. } => "transient_unavailable",
            Self::RegenerationFailure { .. } => "regeneration_failure",
        }
    }
}
