//! Deterministic per-series seeding
//!
//! Each (host, resource) series gets its own RNG, seeded from a SHA-256 digest
//! of `"{host_id}_{resource}"`. The digest is identical on every platform and
//! in every process, so a re-run with the same inventory reproduces the same
//! bits. No generator state is shared between series.

use std::fmt;

use horizon_core::Resource;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use sha2::{Digest, Sha256};

/// Seeds are reduced into `[0, SEED_MODULO)`
pub const SEED_MODULO: u64 = (1 << 32) - 1;

/// RNG owned by exactly one (host, resource) series
pub type SeriesRng = ChaCha8Rng;

/// 32-bit seed derived from a (host, resource) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GenerationSeed(u32);

impl GenerationSeed {
    /// Derive the seed for one series
    pub fn derive(host_id: &str, resource: Resource) -> Self {
        let digest = Sha256::digest(format!("{host_id}_{resource}").as_bytes());
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest[..8]);
        let reduced = u64::from_be_bytes(head) % SEED_MODULO;
        // reduced < 2^32 - 1
        GenerationSeed(reduced as u32)
    }

    /// Wrap a raw seed (diagnostics and tests)
    pub fn from_raw(seed: u64) -> Self {
        GenerationSeed((seed % SEED_MODULO) as u32)
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    /// Fresh generator for this series
    pub fn rng(&self) -> SeriesRng {
        ChaCha8Rng::seed_from_u64(u64::from(self.0))
    }
}

impl fmt::Display for GenerationSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
