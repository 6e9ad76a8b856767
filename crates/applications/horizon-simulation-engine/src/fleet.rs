//! Fleet-wide generation run
//!
//! One run turns an inventory and a calendar into a validated telemetry table:
//!
//! ```text
//! EntranceCheck
//!     │  inventory, calendar, DNA rows, scenario coverage
//!     ▼
//! Generating
//!     │  one unit per (host, resource) on the worker pool
//!     │  seed ── sample DNA ── kernel ── resource post-process ── capacity
//!     ▼
//! ExitValidation
//!     │  row count, missing values, range, unique keys, capacity, coverage
//!     ▼
//! Success ──► sink            (any failure ──► Fatal, nothing is published)
//! ```
//!
//! Units share nothing mutable: each owns an RNG seeded from its
//! (host, resource) pair, so the table is identical for any worker count.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use chrono::NaiveDate;
use horizon_core::{
    CalendarProvider, HorizonError, HostInventory, HostProfile, IntegrityCheck, Resource, Result,
    SinkReceipt, TelemetryRecord, TelemetrySink, TelemetryTable,
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::config::GeneratorConfig;
use crate::kernels::ScenarioKernel;
use crate::postprocess::ResourcePostProcessor;
use crate::sampler::ParameterSampler;
use crate::seed::GenerationSeed;
use crate::stats::SeriesStats;
use crate::validation::{self, CoverageReport};

/// Configuration for the fleet generator
#[derive(Debug, Clone)]
pub struct FleetConfig {
    /// DNA table and resource profiles
    pub generator: GeneratorConfig,

    /// Worker threads for generation (0 = rayon default)
    pub worker_threads: usize,

    /// Fail when a scenario in the DNA table has no hosts
    pub strict_coverage: bool,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            generator: GeneratorConfig::builtin(),
            worker_threads: 0,
            strict_coverage: true,
        }
    }
}

impl FleetConfig {
    pub fn with_generator(mut self, generator: GeneratorConfig) -> Self {
        self.generator = generator;
        self
    }

    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = threads;
        self
    }

    /// Only warn about scenarios without hosts
    pub fn lenient_coverage(mut self) -> Self {
        self.strict_coverage = false;
        self
    }
}

/// Lifecycle of one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenerationPhase {
    EntranceCheck,
    Generating,
    ExitValidation,
    Success,
    Fatal,
}

impl fmt::Display for GenerationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GenerationPhase::EntranceCheck => "entrance-check",
            GenerationPhase::Generating => "generating",
            GenerationPhase::ExitValidation => "exit-validation",
            GenerationPhase::Success => "success",
            GenerationPhase::Fatal => "fatal",
        };
        f.write_str(name)
    }
}

/// Output of one (host, resource) unit
#[derive(Debug, Clone)]
pub struct SeriesBlock {
    /// Position of the host in the inventory
    pub host_index: usize,
    pub resource: Resource,
    pub seed: GenerationSeed,
    /// One value per calendar day
    pub values: Vec<f32>,
}

/// Summary of a successful run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationReport {
    pub hosts: usize,
    pub days: usize,
    pub resources: usize,
    pub rows: usize,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    pub utilization: SeriesStats,
    pub coverage: CoverageReport,
    pub elapsed_secs: f64,
}

/// Validated table plus its report
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub table: TelemetryTable,
    pub report: GenerationReport,
}

/// Generates telemetry for a whole fleet
pub struct FleetGenerator {
    config: FleetConfig,
}

impl FleetGenerator {
    pub fn new(config: FleetConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FleetConfig {
        &self.config
    }

    /// Run the full pipeline; the table is only returned if every check passed
    pub fn run(
        &self,
        inventory: &dyn HostInventory,
        calendar: &dyn CalendarProvider,
    ) -> Result<GenerationOutcome> {
        let started = Instant::now();
        info!(
            inventory = %inventory.describe(),
            worker_threads = self.config.worker_threads,
            strict_coverage = self.config.strict_coverage,
            "Starting fleet generation"
        );

        match self.run_phases(inventory, calendar, started) {
            Ok(outcome) => {
                enter(GenerationPhase::Success);
                let report = &outcome.report;
                info!(
                    hosts = report.hosts,
                    days = report.days,
                    rows = report.rows,
                    mean = report.utilization.mean,
                    std = report.utilization.std,
                    min = report.utilization.min,
                    max = report.utilization.max,
                    elapsed_secs = report.elapsed_secs,
                    "Fleet generation complete"
                );
                Ok(outcome)
            }
            Err(e) => {
                enter(GenerationPhase::Fatal);
                error!(error = %e, "Fleet generation failed");
                Err(e)
            }
        }
    }

    /// Run and hand the validated table to every sink, in order
    ///
    /// All sinks stage first; only when every one staged cleanly are they
    /// committed. A failed stage aborts the lot, so no sink publishes a table
    /// another sink rejected.
    pub fn run_and_publish(
        &self,
        inventory: &dyn HostInventory,
        calendar: &dyn CalendarProvider,
        sinks: &mut [&mut dyn TelemetrySink],
    ) -> Result<(GenerationReport, Vec<SinkReceipt>)> {
        let outcome = self.run(inventory, calendar)?;
        let receipts = publish_all(&outcome.table, sinks)?;
        Ok((outcome.report, receipts))
    }

    /// Generate the series for one (host, resource) pair
    pub fn generate_unit(
        &self,
        host_index: usize,
        host: &HostProfile,
        resource: Resource,
        days: usize,
    ) -> Result<SeriesBlock> {
        let generator = &self.config.generator;
        let seed = GenerationSeed::derive(&host.host_id, resource);
        let mut rng = seed.rng();

        let params = ParameterSampler::new(&generator.dna).sample(
            host.scenario,
            host.variant,
            Some(&host.host_id),
            &mut rng,
        )?;
        let raw = host.scenario.synthesize(days, &params, &mut rng)?;
        let values =
            ResourcePostProcessor::new(&generator.resources).apply(resource, raw, &mut rng)?;

        debug!(
            host_id = %host.host_id,
            scenario = %host.scenario,
            variant = %host.variant,
            %resource,
            %seed,
            "Series generated"
        );

        Ok(SeriesBlock {
            host_index,
            resource,
            seed,
            values,
        })
    }

    fn run_phases(
        &self,
        inventory: &dyn HostInventory,
        calendar: &dyn CalendarProvider,
        started: Instant,
    ) -> Result<GenerationOutcome> {
        enter(GenerationPhase::EntranceCheck);
        let hosts = inventory.load_hosts()?;
        let dates = calendar.dates()?;
        validation::check_inventory(&hosts)?;
        validation::check_calendar(&dates)?;
        validation::check_dna_coverage(&self.config.generator.dna, &hosts)?;
        let coverage = validation::analyze_coverage(
            &self.config.generator.dna,
            &hosts,
            self.config.strict_coverage,
        )?;

        enter(GenerationPhase::Generating);
        let blocks = self.generate_blocks(&hosts, dates.len())?;
        let table = assemble(&hosts, &dates, blocks)?;

        enter(GenerationPhase::ExitValidation);
        let utilization = validation::validate_table(&table, &hosts, &dates)?;

        let (first_date, last_date) = match (dates.first(), dates.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => return Err(HorizonError::entrance("calendar is empty")),
        };
        let report = GenerationReport {
            hosts: hosts.len(),
            days: dates.len(),
            resources: Resource::ALL.len(),
            rows: table.len(),
            first_date,
            last_date,
            utilization,
            coverage,
            elapsed_secs: started.elapsed().as_secs_f64(),
        };
        Ok(GenerationOutcome { table, report })
    }

    /// All units on the worker pool, collected in inventory order
    fn generate_blocks(&self, hosts: &[HostProfile], days: usize) -> Result<Vec<SeriesBlock>> {
        let units: Vec<(usize, Resource)> = (0..hosts.len())
            .flat_map(|h| Resource::ALL.into_iter().map(move |resource| (h, resource)))
            .collect();
        debug!(units = units.len(), days, "Dispatching generation units");

        let work = || {
            units
                .par_iter()
                .map(|&(h, resource)| self.generate_unit(h, &hosts[h], resource, days))
                .collect::<Result<Vec<_>>>()
        };

        if self.config.worker_threads == 0 {
            return work();
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.worker_threads)
            .build()
            .map_err(|e| HorizonError::invalid_config(format!("worker pool: {e}")))?;
        pool.install(work)
    }
}

/// Stage `table` on every sink, then commit them in order
pub fn publish_all(
    table: &TelemetryTable,
    sinks: &mut [&mut dyn TelemetrySink],
) -> Result<Vec<SinkReceipt>> {
    let mut receipts = Vec::with_capacity(sinks.len());
    for index in 0..sinks.len() {
        info!(sink = sinks[index].name(), rows = table.len(), "Staging table");
        match sinks[index].stage(table) {
            Ok(receipt) => receipts.push(receipt),
            Err(e) => {
                error!(sink = sinks[index].name(), error = %e, "Staging failed, nothing published");
                for sink in sinks.iter_mut() {
                    sink.abort();
                }
                return Err(e);
            }
        }
    }

    for index in 0..sinks.len() {
        if let Err(e) = sinks[index].commit() {
            error!(sink = sinks[index].name(), error = %e, "Commit failed");
            for sink in sinks[index + 1..].iter_mut() {
                sink.abort();
            }
            return Err(e);
        }
        let receipt = &receipts[index];
        info!(
            sink = sinks[index].name(),
            rows = receipt.rows,
            files = receipt.files,
            bytes = receipt.bytes,
            "Table published"
        );
    }
    Ok(receipts)
}

fn enter(phase: GenerationPhase) {
    info!(%phase, "Generation phase");
}

/// Flatten blocks into rows, attaching dates and capacities
fn assemble(
    hosts: &[HostProfile],
    dates: &[NaiveDate],
    blocks: Vec<SeriesBlock>,
) -> Result<TelemetryTable> {
    let ids: Vec<Arc<str>> = hosts
        .iter()
        .map(|host| Arc::from(host.host_id.as_str()))
        .collect();

    let mut records = Vec::with_capacity(blocks.len() * dates.len());
    for block in blocks {
        let host = &hosts[block.host_index];
        if block.values.len() != dates.len() {
            return Err(HorizonError::integrity(
                IntegrityCheck::RowCount,
                format!(
                    "{}/{} produced {} values for {} days",
                    host.host_id,
                    block.resource,
                    block.values.len(),
                    dates.len()
                ),
            ));
        }
        let capacity = host.capacity_for(block.resource);
        records.extend(
            dates
                .iter()
                .zip(block.values)
                .map(|(date, utilization)| TelemetryRecord {
                    date: *date,
                    host_id: Arc::clone(&ids[block.host_index]),
                    resource: block.resource,
                    utilization,
                    capacity,
                }),
        );
    }
    Ok(TelemetryTable::new(records))
}

#[cfg(test)]
mod tests {
    use horizon_core::{Scenario, Variant};

    use super::*;
    use crate::dna::ScenarioDna;

    fn dates(n: u64) -> Vec<NaiveDate> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        (0..n).map(|i| start + chrono::Days::new(i)).collect()
    }

    fn hosts() -> Vec<HostProfile> {
        vec![
            HostProfile::new("h1", Scenario::Burst, Variant::Moderate, 8.0, 32.0, 5000.0),
            HostProfile::new("h2", Scenario::Burst, Variant::Extreme, 16.0, 64.0, 8000.0),
            HostProfile::new("h3", Scenario::LowIdle, Variant::Stable, 4.0, 16.0, 1000.0),
        ]
    }

    fn generator() -> FleetGenerator {
        let dna = ScenarioDna::builtin().retain_scenarios(&[Scenario::Burst, Scenario::LowIdle]);
        let config = FleetConfig::default()
            .with_generator(GeneratorConfig::builtin().with_dna(dna))
            .with_worker_threads(2);
        FleetGenerator::new(config)
    }

    #[test]
    fn test_rows_follow_inventory_order() {
        let outcome = generator().run(&hosts(), &dates(7)).unwrap();
        let records = outcome.table.records();

        assert_eq!(records.len(), 3 * 4 * 7);
        assert_eq!(&*records[0].host_id, "h1");
        assert_eq!(records[0].resource, Resource::Cpu);
        assert_eq!(records[7].resource, Resource::Memory);
        assert_eq!(&*records[28].host_id, "h2");
        assert_eq!(records[6].date, dates(7)[6]);
    }

    #[test]
    fn test_worker_count_does_not_change_output() {
        let hosts = hosts();
        let calendar = dates(30);
        let two = generator();
        let four = FleetGenerator::new(two.config().clone().with_worker_threads(4));
        let default = FleetGenerator::new(two.config().clone().with_worker_threads(0));

        let a = two.run(&hosts, &calendar).unwrap();
        let b = four.run(&hosts, &calendar).unwrap();
        let c = default.run(&hosts, &calendar).unwrap();
        assert_eq!(a.table, b.table);
        assert_eq!(a.table, c.table);
    }

    #[test]
    fn test_unit_is_reproducible() {
        let generator = generator();
        let host = &hosts()[2];

        let a = generator.generate_unit(0, host, Resource::Disk, 40).unwrap();
        let b = generator.generate_unit(0, host, Resource::Disk, 40).unwrap();
        assert_eq!(a.values, b.values);
        assert_eq!(a.seed, GenerationSeed::derive("h3", Resource::Disk));
    }

    #[test]
    fn test_report_summarizes_run() {
        let report = generator().run(&hosts(), &dates(10)).unwrap().report;

        assert_eq!(report.hosts, 3);
        assert_eq!(report.days, 10);
        assert_eq!(report.resources, 4);
        assert_eq!(report.rows, 120);
        assert_eq!(report.first_date, dates(10)[0]);
        assert!(report.utilization.min >= 0.0);
        assert!(report.utilization.max <= 100.0);
        // low_idle/drifting has no hosts
        assert_eq!(report.coverage.gaps.len(), 1);
    }

    #[test]
    fn test_entrance_failure_is_fatal() {
        let err = generator().run(&hosts(), &Vec::<NaiveDate>::new()).unwrap_err();
        assert!(matches!(err, HorizonError::EntranceCheck(_)));
    }

    #[test]
    fn test_phase_names() {
        assert_eq!(GenerationPhase::ExitValidation.to_string(), "exit-validation");
        assert_eq!(GenerationPhase::Fatal.to_string(), "fatal");
    }
}
