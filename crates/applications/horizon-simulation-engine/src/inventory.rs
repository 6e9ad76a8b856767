//! Host inventory sources
//!
//! - [`SyntheticInventory`]: seeded fleet synthesis for demos and benchmarks
//! - [`JsonInventory`]: host list read from a JSON file

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use horizon_core::{HostInventory, HostProfile, Result, Scenario};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

/// Default synthetic fleet size
pub const DEFAULT_NUM_HOSTS: usize = 2000;

/// Share of hosts that get their scenario's common variant
const COMMON_VARIANT_PROBABILITY: f64 = 0.8;

const CPU_CORES: (u32, u32) = (4, 64);
const MEMORY_GB: (f64, f64) = (16.0, 512.0);
const STORAGE_MB: (f64, f64) = (1000.0, 100_000.0);

/// Deterministic fleet: same `(num_hosts, seed)` gives the same hosts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyntheticInventory {
    pub num_hosts: usize,
    pub seed: u64,
}

impl Default for SyntheticInventory {
    fn default() -> Self {
        Self {
            num_hosts: DEFAULT_NUM_HOSTS,
            seed: 0,
        }
    }
}

impl SyntheticInventory {
    pub fn new(num_hosts: usize, seed: u64) -> Self {
        Self { num_hosts, seed }
    }
}

impl HostInventory for SyntheticInventory {
    fn load_hosts(&self) -> Result<Vec<HostProfile>> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let hosts: Vec<HostProfile> = (0..self.num_hosts)
            .map(|_| synthesize_host(&mut rng))
            .collect();
        info!(hosts = hosts.len(), seed = self.seed, "Synthesized host inventory");
        Ok(hosts)
    }

    fn describe(&self) -> String {
        format!("synthetic ({} hosts, seed {})", self.num_hosts, self.seed)
    }
}

fn synthesize_host<R: Rng + ?Sized>(rng: &mut R) -> HostProfile {
    let mut bytes = [0u8; 16];
    rng.fill(&mut bytes);
    let host_id = uuid::Builder::from_random_bytes(bytes).into_uuid().to_string();

    let scenario = Scenario::ALL[rng.gen_range(0..Scenario::ALL.len())];
    let variant = if rng.gen_bool(COMMON_VARIANT_PROBABILITY) {
        scenario.common_variant()
    } else {
        scenario.rare_variant()
    };

    let cpu_cores = f64::from(rng.gen_range(CPU_CORES.0..=CPU_CORES.1));
    let memory_gb = rng.gen_range(MEMORY_GB.0..=MEMORY_GB.1);
    let storage_capacity_mb = rng.gen_range(STORAGE_MB.0..=STORAGE_MB.1);

    HostProfile::new(
        host_id,
        scenario,
        variant,
        cpu_cores,
        memory_gb,
        storage_capacity_mb,
    )
}

/// JSON array of host profiles
#[derive(Debug, Clone)]
pub struct JsonInventory {
    pub path: PathBuf,
}

impl JsonInventory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl HostInventory for JsonInventory {
    fn load_hosts(&self) -> Result<Vec<HostProfile>> {
        let reader = BufReader::new(File::open(&self.path)?);
        let hosts: Vec<HostProfile> = serde_json::from_reader(reader)?;
        debug!(path = %self.path.display(), hosts = hosts.len(), "Loaded host inventory");
        Ok(hosts)
    }

    fn describe(&self) -> String {
        format!("json ({})", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::io::Write;

    use horizon_core::Variant;

    use super::*;

    #[test]
    fn test_synthetic_is_deterministic() {
        let a = SyntheticInventory::new(50, 7).load_hosts().unwrap();
        let b = SyntheticInventory::new(50, 7).load_hosts().unwrap();
        let c = SyntheticInventory::new(50, 8).load_hosts().unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_synthetic_hosts_are_well_formed() {
        let hosts = SyntheticInventory::new(500, 1).load_hosts().unwrap();

        let ids: HashSet<&str> = hosts.iter().map(|h| h.host_id.as_str()).collect();
        assert_eq!(ids.len(), 500);

        for host in &hosts {
            assert!(uuid::Uuid::parse_str(&host.host_id).is_ok());
            assert_eq!(host.cpu_cores.fract(), 0.0);
            assert!((4.0..=64.0).contains(&host.cpu_cores));
            assert!((16.0..=512.0).contains(&host.memory_gb));
            assert!((1000.0..=100_000.0).contains(&host.storage_capacity_mb));
            assert!(
                host.variant == host.scenario.common_variant()
                    || host.variant == host.scenario.rare_variant()
            );
        }

        let common = hosts
            .iter()
            .filter(|h| h.variant == h.scenario.common_variant())
            .count();
        assert!((320..=480).contains(&common), "common share off: {common}/500");
    }

    #[test]
    fn test_json_inventory_parses_loose_labels() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"host_id":"db-01","scenario":"capacity-breach","variant":"critical",
                "cpu_cores":16,"memory_gb":128,"storage_capacity_mb":50000}}]"#
        )
        .unwrap();

        let hosts = JsonInventory::new(file.path()).load_hosts().unwrap();
        assert_eq!(hosts.len(), 1);
        assert_eq!(hosts[0].scenario, Scenario::CapacityBreach);
        assert_eq!(hosts[0].variant, Variant::Critical);
        assert_eq!(hosts[0].cpu_cores, 16.0);
    }

    #[test]
    fn test_json_inventory_rejects_unknown_scenario() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"host_id":"x","scenario":"chaotic","variant":"normal",
                "cpu_cores":1,"memory_gb":1,"storage_capacity_mb":1}}]"#
        )
        .unwrap();

        assert!(JsonInventory::new(file.path()).load_hosts().is_err());
    }
}
