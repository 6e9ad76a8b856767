//! Collaborator traits for HorizonScale
//!
//! The generation engine reads hosts and dates and hands its output to a sink
//! through these interfaces ONLY - never through concrete storage types.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{HostProfile, TelemetryTable};

/// Source of the host population for one generation run
pub trait HostInventory {
    /// Return the full host population
    fn load_hosts(&self) -> Result<Vec<HostProfile>>;

    /// Short description for logs
    fn describe(&self) -> String;
}

/// Source of the generation calendar
pub trait CalendarProvider {
    /// Return an ordered, contiguous list of daily dates
    fn dates(&self) -> Result<Vec<NaiveDate>>;
}

/// What a sink wrote
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkReceipt {
    /// Data rows written
    pub rows: usize,
    /// Files created
    pub files: usize,
    /// Bytes written across all files
    pub bytes: u64,
}

/// Durable destination for a validated telemetry table
///
/// Publishing is two-phase: [`stage`](TelemetrySink::stage) writes the whole
/// dataset aside and checks it, [`commit`](TelemetrySink::commit) swaps it in
/// for whatever the previous run left. A failed stage leaves the live dataset
/// untouched.
pub trait TelemetrySink {
    /// Write the table to a staging location next to the live dataset
    fn stage(&mut self, table: &TelemetryTable) -> Result<SinkReceipt>;

    /// Replace the live dataset with the staged one
    fn commit(&mut self) -> Result<()>;

    /// Discard anything staged
    fn abort(&mut self);

    /// Stage and commit in one call
    fn publish(&mut self, table: &TelemetryTable) -> Result<SinkReceipt> {
        match self.stage(table) {
            Ok(receipt) => {
                self.commit()?;
                Ok(receipt)
            }
            Err(e) => {
                self.abort();
                Err(e)
            }
        }
    }

    /// Sink name for logs
    fn name(&self) -> &str;
}

impl HostInventory for Vec<HostProfile> {
    fn load_hosts(&self) -> Result<Vec<HostProfile>> {
        Ok(self.clone())
    }

    fn describe(&self) -> String {
        format!("in-memory inventory ({} hosts)", self.len())
    }
}

impl CalendarProvider for Vec<NaiveDate> {
    fn dates(&self) -> Result<Vec<NaiveDate>> {
        Ok(self.clone())
    }
}
