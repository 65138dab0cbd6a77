use std::fmt;

use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContainerKey(pub u64);

impl ContainerKey {
    pub fn from_placement(scene_name: &str, placement_path: &str, session_seed: u64) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(scene_name.as_bytes());
        hasher.update([0u8]);
        hasher.update(placement_path.as_bytes());
        hasher.update([0u8]);
        hasher.update(session_seed.to_le_bytes());
        let digest = hasher.finalize();

        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&digest[..8]);
        Self(u64::from_le_bytes(prefix))
    }
}

impl fmt::Display for ContainerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}
