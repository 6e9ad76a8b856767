//! # HorizonScale Simulation Engine
//!
//! Deterministic synthetic telemetry for a fleet of hosts: one daily p95
//! utilization series per (host, resource), driven by the host's behavioral
//! scenario.
//!
//! ## Architecture
//!
//! ```text
//! HostInventory ─┐
//!                ├─► FleetGenerator ─► TelemetryTable ─► TelemetrySink
//! Calendar ──────┘        │
//!                         └── per (host, resource):
//!                             GenerationSeed ─► ParameterSampler (DNA row)
//!                                           ─► ScenarioKernel
//!                                           ─► ResourcePostProcessor
//! ```
//!
//! - Seeds come from SHA-256 of `"{host_id}_{resource}"`, so every series is
//!   reproducible on any machine and independent of worker scheduling
//! - All kernel parameters live in the DNA table ([`ScenarioDna`]); no kernel
//!   carries a hidden constant
//! - Entrance and exit checks bracket every run; a table that fails them never
//!   reaches a sink
//!
//! See [`fleet`] for the run lifecycle and [`kernels`] for the scenario shapes.

pub mod calendar;
pub mod config;
pub mod dna;
pub mod fleet;
pub mod inventory;
pub mod kernels;
pub mod lab;
pub mod postprocess;
pub mod sampler;
pub mod seed;
pub mod sink;
pub mod stats;
pub mod validation;

// Generation
pub use fleet::{
    publish_all, FleetConfig, FleetGenerator, GenerationOutcome, GenerationPhase, GenerationReport,
    SeriesBlock,
};
pub use kernels::{generate, ScenarioKernel, UTIL_MAX, UTIL_MIN};
pub use sampler::{ParameterSampler, SampledParams};
pub use seed::{GenerationSeed, SeriesRng};
pub use postprocess::{ResourcePostProcessor, ResourceProfile, ResourceProfiles};

// Configuration
pub use config::GeneratorConfig;
pub use dna::{DnaProfile, Param, ParamRange, ScenarioDna};

// Collaborators
pub use calendar::DateRangeCalendar;
pub use inventory::{JsonInventory, SyntheticInventory, DEFAULT_NUM_HOSTS};
pub use sink::{check_export_parity, count_feed_rows, JsonLinesSink, MonthlyCsvSink};

// Diagnostics
pub use lab::{DiagnosticLab, LabComparison, LabSeries};
pub use stats::{RunningStats, SeriesStats};
pub use validation::{CoverageReport, VariantCount};

pub use horizon_core::{HorizonError, Result};
