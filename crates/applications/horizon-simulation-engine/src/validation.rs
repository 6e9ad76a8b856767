//! Entrance and exit checks around a generation run
//!
//! Entrance checks reject bad inputs before any series is produced. Exit
//! checks re-verify the assembled table so a broken run never reaches a sink.
//! Both stop at the first failure, in a fixed order.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use chrono::NaiveDate;
use horizon_core::{
    HorizonError, HostProfile, IntegrityCheck, Resource, Result, Scenario, TelemetryTable,
    Variant,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::dna::ScenarioDna;
use crate::kernels::{UTIL_MAX, UTIL_MIN};
use crate::stats::{RunningStats, SeriesStats};

/// Hosts assigned to one DNA row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantCount {
    pub scenario: Scenario,
    pub variant: Variant,
    pub hosts: usize,
}

/// Host distribution over the DNA table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageReport {
    /// One entry per DNA row, in table order, including empty rows
    pub variants: Vec<VariantCount>,
    /// Human-readable notes for rows without hosts
    pub gaps: Vec<String>,
}

/// Inventory is non-empty, ids are unique and non-empty, capacities are usable
pub fn check_inventory(hosts: &[HostProfile]) -> Result<()> {
    if hosts.is_empty() {
        return Err(HorizonError::entrance("host inventory is empty"));
    }

    let mut seen = HashSet::with_capacity(hosts.len());
    for (index, host) in hosts.iter().enumerate() {
        if host.host_id.trim().is_empty() {
            return Err(HorizonError::entrance(format!(
                "host at position {index} has an empty host_id"
            )));
        }
        if !seen.insert(host.host_id.as_str()) {
            return Err(HorizonError::entrance(format!(
                "duplicate host_id {}",
                host.host_id
            )));
        }
    }

    for host in hosts {
        for resource in Resource::ALL {
            let Some(field) = resource.capacity_field() else {
                continue;
            };
            let value = host.field(field);
            if !value.is_finite() || value <= 0.0 {
                return Err(HorizonError::entrance(format!(
                    "host {} has invalid {} ({value})",
                    host.host_id,
                    field.column_name()
                )));
            }
        }
    }
    Ok(())
}

/// Calendar is non-empty and strictly contiguous daily
pub fn check_calendar(dates: &[NaiveDate]) -> Result<()> {
    let Some(first) = dates.first() else {
        return Err(HorizonError::entrance("calendar is empty"));
    };
    let mut expected = *first;
    for date in &dates[1..] {
        expected = expected
            .succ_opt()
            .ok_or_else(|| {
                HorizonError::entrance("calendar runs past the last representable date")
            })?;
        if *date != expected {
            return Err(HorizonError::entrance(format!(
                "calendar is not contiguous: expected {expected}, found {date}"
            )));
        }
    }
    Ok(())
}

/// Every host's (scenario, variant) has a DNA row; reports the first host in
/// inventory order that does not
pub fn check_dna_coverage(dna: &ScenarioDna, hosts: &[HostProfile]) -> Result<()> {
    for host in hosts {
        dna.lookup(host.scenario, host.variant, Some(&host.host_id))?;
    }
    Ok(())
}

/// Count hosts per DNA row, warn about empty rows, and in strict mode fail
/// on scenarios that have rows but no hosts at all
pub fn analyze_coverage(
    dna: &ScenarioDna,
    hosts: &[HostProfile],
    strict: bool,
) -> Result<CoverageReport> {
    let mut counts: BTreeMap<(Scenario, Variant), usize> =
        dna.keys().map(|key| (key, 0)).collect();
    for host in hosts {
        if let Some(count) = counts.get_mut(&(host.scenario, host.variant)) {
            *count += 1;
        }
    }

    let mut report = CoverageReport::default();
    for ((scenario, variant), count) in &counts {
        if *count == 0 {
            warn!(%scenario, %variant, "DNA row has no hosts in the inventory");
            report
                .gaps
                .push(format!("{scenario}/{variant} has no hosts"));
        }
        report.variants.push(VariantCount {
            scenario: *scenario,
            variant: *variant,
            hosts: *count,
        });
    }

    for scenario in dna.scenarios() {
        let hosts_in_scenario: usize = counts
            .iter()
            .filter(|((s, _), _)| *s == scenario)
            .map(|(_, count)| *count)
            .sum();
        if hosts_in_scenario == 0 {
            if strict {
                return Err(HorizonError::CoverageGap { scenario });
            }
            warn!(%scenario, "Scenario has no hosts in the inventory");
        }
    }

    Ok(report)
}

/// Re-verify an assembled table against its inputs and summarize utilization
pub fn validate_table(
    table: &TelemetryTable,
    hosts: &[HostProfile],
    dates: &[NaiveDate],
) -> Result<SeriesStats> {
    let resources = Resource::ALL.len();
    let days = dates.len();

    // row count
    let expected = hosts.len() * resources * days;
    if table.len() != expected {
        return Err(HorizonError::integrity(
            IntegrityCheck::RowCount,
            format!(
                "expected {expected} rows ({} hosts x {resources} resources x {days} days), got {}",
                hosts.len(),
                table.len()
            ),
        ));
    }

    for record in table.iter() {
        if record.host_id.is_empty() {
            return Err(HorizonError::integrity(
                IntegrityCheck::MissingValue,
                format!("row on {} has an empty host_id", record.date),
            ));
        }
        if !record.utilization.is_finite() {
            return Err(HorizonError::integrity(
                IntegrityCheck::MissingValue,
                format!(
                    "{}/{} on {} has utilization {}",
                    record.host_id, record.resource, record.date, record.utilization
                ),
            ));
        }
    }

    let mut stats = RunningStats::new();
    for record in table.iter() {
        let value = f64::from(record.utilization);
        if !(UTIL_MIN..=UTIL_MAX).contains(&value) {
            return Err(HorizonError::integrity(
                IntegrityCheck::UtilizationRange,
                format!(
                    "{}/{} on {} is {value}",
                    record.host_id, record.resource, record.date
                ),
            ));
        }
        stats.push(value);
    }

    let index: HashMap<&str, usize> = hosts
        .iter()
        .enumerate()
        .map(|(i, host)| (host.host_id.as_str(), i))
        .collect();
    let first = dates.first().copied();
    let mut seen = vec![false; expected];
    for record in table.iter() {
        let Some(&h) = index.get(record.host_id.as_ref()) else {
            return Err(HorizonError::integrity(
                IntegrityCheck::UniqueKey,
                format!("row for unknown host {}", record.host_id),
            ));
        };
        let offset = first
            .map(|first| (record.date - first).num_days())
            .filter(|offset| (0..days as i64).contains(offset))
            .ok_or_else(|| {
                HorizonError::integrity(
                    IntegrityCheck::UniqueKey,
                    format!("{} is outside the calendar", record.date),
                )
            })?;
        let slot = (h * resources + record.resource as usize) * days + offset as usize;
        if std::mem::replace(&mut seen[slot], true) {
            return Err(HorizonError::integrity(
                IntegrityCheck::UniqueKey,
                format!(
                    "duplicate row for {}/{} on {}",
                    record.host_id, record.resource, record.date
                ),
            ));
        }
    }

    for record in table.iter() {
        let host = index
            .get(record.host_id.as_ref())
            .map(|&h| &hosts[h])
            .ok_or_else(|| {
                HorizonError::integrity(
                    IntegrityCheck::CapacityMapping,
                    format!("row for unknown host {}", record.host_id),
                )
            })?;
        let expected = host.capacity_for(record.resource);
        if record.capacity != expected {
            return Err(HorizonError::integrity(
                IntegrityCheck::CapacityMapping,
                format!(
                    "{}/{} on {}: capacity {:?}, expected {:?}",
                    record.host_id, record.resource, record.date, record.capacity, expected
                ),
            ));
        }
    }

    let mut represented = BTreeSet::new();
    for record in table.iter() {
        if let Some(&h) = index.get(record.host_id.as_ref()) {
            represented.insert((hosts[h].scenario, hosts[h].variant));
        }
    }
    for host in hosts {
        if !represented.contains(&(host.scenario, host.variant)) {
            return Err(HorizonError::integrity(
                IntegrityCheck::ScenarioCoverage,
                format!("no rows for {}/{}", host.scenario, host.variant),
            ));
        }
    }

    Ok(stats.finish())
}
