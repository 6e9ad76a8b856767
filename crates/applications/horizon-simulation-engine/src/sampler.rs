//! Parameter sampler
//!
//! Draws one concrete value per DNA range, giving each series its own
//! trajectory shape on top of its own day-to-day noise.

use std::collections::BTreeMap;

use horizon_core::{HorizonError, Result, Scenario, Variant};
use rand::Rng;

use crate::dna::{DnaProfile, Param, ScenarioDna};

/// One realization of a DNA row
#[derive(Debug, Clone, PartialEq)]
pub struct SampledParams {
    pub scenario: Scenario,
    pub variant: Variant,
    values: BTreeMap<Param, f64>,
}

impl SampledParams {
    /// Build directly from fixed values (tests, diagnostics)
    pub fn from_values(
        scenario: Scenario,
        variant: Variant,
        values: impl IntoIterator<Item = (Param, f64)>,
    ) -> Self {
        SampledParams {
            scenario,
            variant,
            values: values.into_iter().collect(),
        }
    }

    /// Value of `param`; absent parameters are a configuration error
    pub fn get(&self, param: Param) -> Result<f64> {
        self.values.get(&param).copied().ok_or_else(|| {
            HorizonError::invalid_config(format!(
                "{}/{} has no sampled value for {param}",
                self.scenario, self.variant
            ))
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (Param, f64)> + '_ {
        self.values.iter().map(|(param, value)| (*param, *value))
    }
}

/// Draws parameter sets from a DNA table
pub struct ParameterSampler<'a> {
    dna: &'a ScenarioDna,
}

impl<'a> ParameterSampler<'a> {
    pub fn new(dna: &'a ScenarioDna) -> Self {
        ParameterSampler { dna }
    }

    /// Sample the row for (scenario, variant)
    ///
    /// Fails with `ConfigMismatch` when the table has no such row.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        scenario: Scenario,
        variant: Variant,
        host_id: Option<&str>,
        rng: &mut R,
    ) -> Result<SampledParams> {
        let profile = self.dna.lookup(scenario, variant, host_id)?;
        Ok(SampledParams {
            scenario,
            variant,
            values: draw(profile, rng),
        })
    }
}

/// One uniform draw per range, in `Param` order
fn draw<R: Rng + ?Sized>(profile: &DnaProfile, rng: &mut R) -> BTreeMap<Param, f64> {
    profile
        .iter()
        .map(|(param, range)| (param, rng.gen_range(range.lo..=range.hi)))
        .collect()
}
