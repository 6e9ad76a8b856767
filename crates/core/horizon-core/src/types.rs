//! Core types shared across HorizonScale components
//!
//! Scenario, variant and resource labels have exactly one string form each.
//! [`std::str::FromStr`] is the only place free-form text is accepted; it is
//! lenient about casing and separators, and everything downstream works on
//! the enums.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{HorizonError, Result};

/// Uppercase a free-form label and unify `-`/space separators to `_`
fn canonical_label(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|c| match c {
            '-' | ' ' => '_',
            c => c.to_ascii_uppercase(),
        })
        .collect()
}

/// Deserialize any `FromStr` label through the canonical boundary
fn deserialize_label<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr<Err = HorizonError>,
{
    let raw = String::deserialize(deserializer)?;
    raw.parse().map_err(serde::de::Error::custom)
}

/// Behavioral archetype driving a host's utilization trajectory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Scenario {
    SteadyGrowth,
    Seasonal,
    Burst,
    LowIdle,
    CapacityBreach,
}

impl Scenario {
    /// Every scenario, in declaration order
    pub const ALL: [Scenario; 5] = [
        Scenario::SteadyGrowth,
        Scenario::Seasonal,
        Scenario::Burst,
        Scenario::LowIdle,
        Scenario::CapacityBreach,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Scenario::SteadyGrowth => "STEADY_GROWTH",
            Scenario::Seasonal => "SEASONAL",
            Scenario::Burst => "BURST",
            Scenario::LowIdle => "LOW_IDLE",
            Scenario::CapacityBreach => "CAPACITY_BREACH",
        }
    }

    /// Variant assigned to most hosts of this scenario
    pub fn common_variant(&self) -> Variant {
        match self {
            Scenario::SteadyGrowth => Variant::Normal,
            Scenario::Seasonal => Variant::Balanced,
            Scenario::Burst => Variant::Moderate,
            Scenario::LowIdle => Variant::Stable,
            Scenario::CapacityBreach => Variant::Imminent,
        }
    }

    /// Higher-risk variant assigned to the minority of hosts
    pub fn rare_variant(&self) -> Variant {
        match self {
            Scenario::SteadyGrowth => Variant::Aggressive,
            Scenario::Seasonal => Variant::Extreme,
            Scenario::Burst => Variant::Extreme,
            Scenario::LowIdle => Variant::Drifting,
            Scenario::CapacityBreach => Variant::Critical,
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scenario {
    type Err = HorizonError;

    fn from_str(s: &str) -> Result<Self> {
        let label = canonical_label(s);
        Scenario::ALL
            .into_iter()
            .find(|scenario| scenario.as_str() == label)
            .ok_or_else(|| HorizonError::unknown_label("scenario", s))
    }
}

impl<'de> Deserialize<'de> for Scenario {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserialize_label(deserializer)
    }
}

/// Risk/rarity profile within a scenario, selecting a DNA row
///
/// Which variants are valid for which scenario is decided by the DNA table,
/// not by this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Variant {
    Normal,
    Aggressive,
    Balanced,
    Extreme,
    Moderate,
    Stable,
    Drifting,
    Imminent,
    Critical,
}

impl Variant {
    pub const ALL: [Variant; 9] = [
        Variant::Normal,
        Variant::Aggressive,
        Variant::Balanced,
        Variant::Extreme,
        Variant::Moderate,
        Variant::Stable,
        Variant::Drifting,
        Variant::Imminent,
        Variant::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::Normal => "NORMAL",
            Variant::Aggressive => "AGGRESSIVE",
            Variant::Balanced => "BALANCED",
            Variant::Extreme => "EXTREME",
            Variant::Moderate => "MODERATE",
            Variant::Stable => "STABLE",
            Variant::Drifting => "DRIFTING",
            Variant::Imminent => "IMMINENT",
            Variant::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Variant {
    type Err = HorizonError;

    fn from_str(s: &str) -> Result<Self> {
        let label = canonical_label(s);
        Variant::ALL
            .into_iter()
            .find(|variant| variant.as_str() == label)
            .ok_or_else(|| HorizonError::unknown_label("variant", s))
    }
}

impl<'de> Deserialize<'de> for Variant {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserialize_label(deserializer)
    }
}

/// Host field that carries a resource's capacity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapacityField {
    CpuCores,
    MemoryGb,
    StorageCapacityMb,
}

impl CapacityField {
    /// Column name in the host inventory
    pub fn column_name(&self) -> &'static str {
        match self {
            CapacityField::CpuCores => "cpu_cores",
            CapacityField::MemoryGb => "memory_gb",
            CapacityField::StorageCapacityMb => "storage_capacity_mb",
        }
    }
}

/// Resource -> capacity field, indexed by `Resource as usize`
const CAPACITY_FIELDS: [Option<CapacityField>; 4] = [
    Some(CapacityField::CpuCores),
    Some(CapacityField::MemoryGb),
    Some(CapacityField::StorageCapacityMb),
    None,
];

/// Monitored resource of a host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    Cpu = 0,
    Memory = 1,
    Disk = 2,
    Network = 3,
}

impl Resource {
    /// The fixed resource set, in generation order
    pub const ALL: [Resource; 4] = [
        Resource::Cpu,
        Resource::Memory,
        Resource::Disk,
        Resource::Network,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Cpu => "cpu",
            Resource::Memory => "memory",
            Resource::Disk => "disk",
            Resource::Network => "network",
        }
    }

    /// Host field holding this resource's capacity; `None` for network
    pub fn capacity_field(&self) -> Option<CapacityField> {
        CAPACITY_FIELDS[*self as usize]
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resource {
    type Err = HorizonError;

    fn from_str(s: &str) -> Result<Self> {
        let label = canonical_label(s);
        Resource::ALL
            .into_iter()
            .find(|resource| resource.as_str().eq_ignore_ascii_case(&label))
            .ok_or_else(|| HorizonError::unknown_label("resource", s))
    }
}

impl<'de> Deserialize<'de> for Resource {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserialize_label(deserializer)
    }
}

/// Immutable host metadata owned by the inventory collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostProfile {
    pub host_id: String,
    pub scenario: Scenario,
    pub variant: Variant,
    pub cpu_cores: f64,
    pub memory_gb: f64,
    pub storage_capacity_mb: f64,
}

impl HostProfile {
    pub fn new(
        host_id: impl Into<String>,
        scenario: Scenario,
        variant: Variant,
        cpu_cores: f64,
        memory_gb: f64,
        storage_capacity_mb: f64,
    ) -> Self {
        HostProfile {
            host_id: host_id.into(),
            scenario,
            variant,
            cpu_cores,
            memory_gb,
            storage_capacity_mb,
        }
    }

    pub fn field(&self, field: CapacityField) -> f64 {
        match field {
            CapacityField::CpuCores => self.cpu_cores,
            CapacityField::MemoryGb => self.memory_gb,
            CapacityField::StorageCapacityMb => self.storage_capacity_mb,
        }
    }

    /// Capacity attached to rows of `resource`
    pub fn capacity_for(&self, resource: Resource) -> Option<f64> {
        resource.capacity_field().map(|field| self.field(field))
    }
}

/// One generated day of one resource on one host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    pub date: NaiveDate,
    pub host_id: Arc<str>,
    pub resource: Resource,
    /// Simulated daily p95 utilization, always within [0, 100]
    pub utilization: f32,
    /// `None` exactly when `resource` is network
    pub capacity: Option<f64>,
}

/// Full output of one generation run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetryTable {
    records: Vec<TelemetryRecord>,
}

impl TelemetryTable {
    pub fn new(records: Vec<TelemetryRecord>) -> Self {
        TelemetryTable { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[TelemetryRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TelemetryRecord> {
        self.records.iter()
    }

    pub fn into_records(self) -> Vec<TelemetryRecord> {
        self.records
    }
}
