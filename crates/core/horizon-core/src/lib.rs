//! HorizonScale Core - Shared types and traits
//!
//! This crate defines the core abstractions used across:
//! - horizon-simulation-engine (generation library + `horizon-sim` binary)
//! - any host inventory, calendar or persistence collaborator plugged into it
//!
//! Key types:
//! - Scenario / Variant / Resource (canonical labels, parsed once at ingestion)
//! - HostProfile and TelemetryRecord
//! - HostInventory, CalendarProvider and TelemetrySink traits
//! - Error types

pub mod types;
pub mod traits;
pub mod error;

pub use types::*;
pub use traits::*;
pub use error::*;
