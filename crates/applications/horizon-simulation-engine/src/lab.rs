//! Diagnostic lab: common vs. rare variant of one scenario side by side

use horizon_core::{Result, Scenario, Variant};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::dna::ScenarioDna;
use crate::kernels;
use crate::seed::GenerationSeed;
use crate::stats::SeriesStats;

/// One generated series with its summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabSeries {
    pub variant: Variant,
    pub seed: u32,
    pub stats: SeriesStats,
    pub values: Vec<f32>,
}

/// Result of [`DiagnosticLab::compare`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabComparison {
    pub scenario: Scenario,
    pub days: usize,
    pub common: LabSeries,
    pub rare: LabSeries,
}

pub struct DiagnosticLab<'a> {
    dna: &'a ScenarioDna,
}

impl<'a> DiagnosticLab<'a> {
    pub fn new(dna: &'a ScenarioDna) -> Self {
        Self { dna }
    }

    /// Generate both variants of `scenario` on independent seeds
    pub fn compare(
        &self,
        scenario: Scenario,
        days: usize,
        seed_common: u64,
        seed_rare: u64,
    ) -> Result<LabComparison> {
        let common = self.series(scenario, scenario.common_variant(), days, seed_common)?;
        let rare = self.series(scenario, scenario.rare_variant(), days, seed_rare)?;
        info!(
            %scenario,
            common_mean = common.stats.mean,
            common_max = common.stats.max,
            rare_mean = rare.stats.mean,
            rare_max = rare.stats.max,
            "Lab comparison complete"
        );
        Ok(LabComparison {
            scenario,
            days,
            common,
            rare,
        })
    }

    fn series(
        &self,
        scenario: Scenario,
        variant: Variant,
        days: usize,
        raw: u64,
    ) -> Result<LabSeries> {
        let seed = GenerationSeed::from_raw(raw);
        let values = kernels::generate(scenario, days, variant, seed, self.dna)?;
        Ok(LabSeries {
            variant,
            seed: seed.value(),
            stats: SeriesStats::of(&values),
            values,
        })
    }
}
