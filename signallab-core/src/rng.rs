//! Deterministic RNG hierarchy.
//!
//! A master seed expands into sub-seeds per `(data_version, stage)` via
//! BLAKE3, so every randomised dataset step is reproducible from the
//! configuration alone and independent of the order stages run in.

use rand::rngs::StdRng;
use rand::SeedableRng;

#[derive(Debug, Clone)]
pub struct RngHierarchy {
    master_seed: u64,
}

impl RngHierarchy {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    /// Sub-seed for one stage (e.g. "oversample", "shuffle") of one dataset
    /// version.
    pub fn sub_seed(&self, data_version: &str, stage: &str) -> u64 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.master_seed.to_le_bytes());
        hasher.update(data_version.as_bytes());
        hasher.update(&[0]);
        hasher.update(stage.as_bytes());
        let hash = hasher.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&hash.as_bytes()[..8]);
        u64::from_le_bytes(bytes)
    }

    pub fn rng_for(&self, data_version: &str, stage: &str) -> StdRng {
        StdRng::seed_from_u64(self.sub_seed(data_version, stage))
    }
}
