//! Error types for HorizonScale

use std::fmt;

use thiserror::Error;

use crate::types::{Resource, Scenario, Variant};

/// Result type for generation operations
pub type Result<T> = std::result::Result<T, HorizonError>;

/// Exit-validation invariant that a generated table violated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrityCheck {
    /// rows != hosts x resources x days
    RowCount,
    /// Empty key field or non-finite utilization
    MissingValue,
    /// Utilization outside [0, 100]
    UtilizationRange,
    /// Duplicate or out-of-calendar (host, resource, date) key
    UniqueKey,
    /// Capacity present for network, absent elsewhere, or not the host's value
    CapacityMapping,
    /// A (scenario, variant) present among input hosts vanished from the output
    ScenarioCoverage,
    /// Rows written by a sink differ from rows handed to it
    ExportParity,
}

impl fmt::Display for IntegrityCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IntegrityCheck::RowCount => "row-count",
            IntegrityCheck::MissingValue => "missing-value",
            IntegrityCheck::UtilizationRange => "utilization-range",
            IntegrityCheck::UniqueKey => "unique-key",
            IntegrityCheck::CapacityMapping => "capacity-mapping",
            IntegrityCheck::ScenarioCoverage => "scenario-coverage",
            IntegrityCheck::ExportParity => "export-parity",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while generating or publishing telemetry
#[derive(Error, Debug)]
pub enum HorizonError {
    /// A (scenario, variant) pair has no row in the DNA table
    #[error("no DNA row for {scenario}/{variant}{}", host_suffix(.host_id))]
    ConfigMismatch {
        scenario: Scenario,
        variant: Variant,
        host_id: Option<String>,
    },

    /// Generator configuration is malformed
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A scenario, variant or resource label outside the canonical set
    #[error("Unknown {kind} label: {label:?}")]
    UnknownLabel { kind: &'static str, label: String },

    /// Inputs rejected before generation started
    #[error("Entrance check failed: {0}")]
    EntranceCheck(String),

    /// Generated output violated an exit invariant
    #[error("Integrity check '{check}' failed: {detail}")]
    Integrity { check: IntegrityCheck, detail: String },

    /// A whole scenario has DNA rows but no hosts
    #[error("Coverage gap: scenario {scenario} has no hosts in the inventory")]
    CoverageGap { scenario: Scenario },

    /// Calendar could not be built
    #[error("Calendar error: {0}")]
    Calendar(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV read/write error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    /// TOML render error
    #[error("TOML render error: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

fn host_suffix(host_id: &Option<String>) -> String {
    match host_id {
        Some(id) => format!(" (host {id})"),
        None => String::new(),
    }
}

impl HorizonError {
    /// Create an entrance check error
    pub fn entrance(msg: impl Into<String>) -> Self {
        Self::EntranceCheck(msg.into())
    }

    /// Create an integrity error for the given check
    pub fn integrity(check: IntegrityCheck, detail: impl Into<String>) -> Self {
        Self::Integrity {
            check,
            detail: detail.into(),
        }
    }

    /// Create a configuration error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a missing DNA row error, optionally attributed to a host
    pub fn config_mismatch(scenario: Scenario, variant: Variant, host_id: Option<&str>) -> Self {
        Self::ConfigMismatch {
            scenario,
            variant,
            host_id: host_id.map(str::to_string),
        }
    }

    /// Create an unknown label error
    pub fn unknown_label(kind: &'static str, label: impl Into<String>) -> Self {
        Self::UnknownLabel {
            kind,
            label: label.into(),
        }
    }

    /// Missing resource profile, reported as a configuration error
    pub fn missing_resource(resource: Resource) -> Self {
        Self::InvalidConfig(format!("no profile for resource {resource}"))
    }
}
