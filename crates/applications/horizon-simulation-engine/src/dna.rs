//! ScenarioDNA: per-(scenario, variant) parameter ranges
//!
//! Every kernel reads all of its parameters from one DNA row. Variant-specific
//! behaviour (doubled seasonal amplitude, denser bursts, higher idle floor,
//! faster breach) lives entirely in the rows below, never in kernel code.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use horizon_core::{HorizonError, Result, Scenario, Variant};
use serde::{Deserialize, Serialize};

/// Named kernel parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Param {
    BaseLevel,
    GrowthTotal,
    GrowthRate,
    DriftMean,
    DriftVolatility,
    SeasonAmp,
    WeeklyAmp,
    NoiseStd,
    NoiseFloor,
    NoisePeakGain,
    SpikeCount,
    FloorMean,
    FloorNoise,
}

impl Param {
    pub const ALL: [Param; 13] = [
        Param::BaseLevel,
        Param::GrowthTotal,
        Param::GrowthRate,
        Param::DriftMean,
        Param::DriftVolatility,
        Param::SeasonAmp,
        Param::WeeklyAmp,
        Param::NoiseStd,
        Param::NoiseFloor,
        Param::NoisePeakGain,
        Param::SpikeCount,
        Param::FloorMean,
        Param::FloorNoise,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Param::BaseLevel => "base_level",
            Param::GrowthTotal => "growth_total",
            Param::GrowthRate => "growth_rate",
            Param::DriftMean => "drift_mean",
            Param::DriftVolatility => "drift_volatility",
            Param::SeasonAmp => "season_amp",
            Param::WeeklyAmp => "weekly_amp",
            Param::NoiseStd => "noise_std",
            Param::NoiseFloor => "noise_floor",
            Param::NoisePeakGain => "noise_peak_gain",
            Param::SpikeCount => "spike_count",
            Param::FloorMean => "floor_mean",
            Param::FloorNoise => "floor_noise",
        }
    }

    /// Levels, drifts and rates may be negative; spreads, amplitudes and counts may not
    pub fn allows_negative(&self) -> bool {
        matches!(
            self,
            Param::BaseLevel | Param::GrowthTotal | Param::GrowthRate | Param::DriftMean
        )
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Param {
    type Err = HorizonError;

    fn from_str(s: &str) -> Result<Self> {
        let label = s.trim().to_ascii_lowercase().replace('-', "_");
        Param::ALL
            .into_iter()
            .find(|param| param.as_str() == label)
            .ok_or_else(|| HorizonError::unknown_label("parameter", s))
    }
}

/// Parameters each kernel draws before it starts
pub fn required_params(scenario: Scenario) -> &'static [Param] {
    match scenario {
        Scenario::SteadyGrowth => &[
            Param::BaseLevel,
            Param::GrowthTotal,
            Param::DriftVolatility,
            Param::NoiseStd,
            Param::SeasonAmp,
        ],
        Scenario::Seasonal => &[
            Param::BaseLevel,
            Param::DriftMean,
            Param::DriftVolatility,
            Param::SeasonAmp,
            Param::WeeklyAmp,
            Param::NoiseFloor,
            Param::NoisePeakGain,
        ],
        Scenario::Burst => &[
            Param::BaseLevel,
            Param::DriftMean,
            Param::DriftVolatility,
            Param::SeasonAmp,
            Param::WeeklyAmp,
            Param::SpikeCount,
            Param::NoiseStd,
        ],
        Scenario::LowIdle => &[
            Param::FloorMean,
            Param::FloorNoise,
            Param::DriftVolatility,
            Param::SeasonAmp,
        ],
        Scenario::CapacityBreach => &[
            Param::BaseLevel,
            Param::GrowthRate,
            Param::SeasonAmp,
            Param::WeeklyAmp,
            Param::NoiseStd,
        ],
    }
}

/// Closed interval `[lo, hi]`; `lo == hi` pins a constant
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct ParamRange {
    pub lo: f64,
    pub hi: f64,
}

impl ParamRange {
    pub const fn new(lo: f64, hi: f64) -> Self {
        ParamRange { lo, hi }
    }

    pub const fn fixed(value: f64) -> Self {
        ParamRange { lo: value, hi: value }
    }

    pub fn contains(&self, value: f64) -> bool {
        self.lo <= value && value <= self.hi
    }

    /// Finite bounds with `lo <= hi`
    pub fn check(&self, what: &str) -> Result<()> {
        if !self.lo.is_finite() || !self.hi.is_finite() {
            return Err(HorizonError::invalid_config(format!(
                "{what}: range bounds must be finite, got [{}, {}]",
                self.lo, self.hi
            )));
        }
        if self.lo > self.hi {
            return Err(HorizonError::invalid_config(format!(
                "{what}: lower bound {} exceeds upper bound {}",
                self.lo, self.hi
            )));
        }
        Ok(())
    }
}

impl From<[f64; 2]> for ParamRange {
    fn from([lo, hi]: [f64; 2]) -> Self {
        ParamRange { lo, hi }
    }
}

impl From<ParamRange> for [f64; 2] {
    fn from(range: ParamRange) -> Self {
        [range.lo, range.hi]
    }
}

/// Parameter ranges of one (scenario, variant) row
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DnaProfile {
    ranges: BTreeMap<Param, ParamRange>,
}

impl DnaProfile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style range insertion
    pub fn with(mut self, param: Param, lo: f64, hi: f64) -> Self {
        self.ranges.insert(param, ParamRange::new(lo, hi));
        self
    }

    pub fn set(&mut self, param: Param, range: ParamRange) {
        self.ranges.insert(param, range);
    }

    pub fn get(&self, param: Param) -> Option<ParamRange> {
        self.ranges.get(&param).copied()
    }

    /// Ranges in sampling order
    pub fn iter(&self) -> impl Iterator<Item = (Param, ParamRange)> + '_ {
        self.ranges.iter().map(|(param, range)| (*param, *range))
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Check every range and that the row carries what its kernel needs
    pub fn validate(&self, scenario: Scenario, variant: Variant) -> Result<()> {
        for (param, range) in self.iter() {
            range.check(&format!("{scenario}/{variant} {param}"))?;
            if !param.allows_negative() && range.lo < 0.0 {
                return Err(HorizonError::invalid_config(format!(
                    "{scenario}/{variant} {param}: range must be non-negative, got [{}, {}]",
                    range.lo, range.hi
                )));
            }
        }
        for param in required_params(scenario) {
            if !self.ranges.contains_key(param) {
                return Err(HorizonError::invalid_config(format!(
                    "{scenario}/{variant} is missing parameter {param}"
                )));
            }
        }
        Ok(())
    }
}

/// Static table of DNA rows keyed by (scenario, variant)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScenarioDna {
    rows: BTreeMap<(Scenario, Variant), DnaProfile>,
}

impl ScenarioDna {
    /// Empty table; rows are added with [`ScenarioDna::insert`]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Table shipped with the engine
    pub fn builtin() -> Self {
        use Param::*;

        let mut rows = BTreeMap::new();

        rows.insert(
            (Scenario::SteadyGrowth, Variant::Normal),
            DnaProfile::new()
                .with(BaseLevel, 20.0, 40.0)
                .with(GrowthTotal, 10.0, 30.0)
                .with(DriftVolatility, 0.05, 0.15)
                .with(NoiseStd, 1.0, 2.5)
                .with(SeasonAmp, 2.0, 6.0),
        );
        rows.insert(
            (Scenario::SteadyGrowth, Variant::Aggressive),
            DnaProfile::new()
                .with(BaseLevel, 30.0, 50.0)
                .with(GrowthTotal, 30.0, 55.0)
                .with(DriftVolatility, 0.10, 0.25)
                .with(NoiseStd, 1.5, 3.5)
                .with(SeasonAmp, 4.0, 9.0),
        );

        let seasonal = |amp_lo: f64, amp_hi: f64| {
            DnaProfile::new()
                .with(BaseLevel, 28.0, 32.0)
                .with(DriftMean, 0.006, 0.010)
                .with(DriftVolatility, 0.015, 0.025)
                .with(SeasonAmp, amp_lo, amp_hi)
                .with(WeeklyAmp, 4.0, 6.0)
                .with(NoiseFloor, 1.5, 2.5)
                .with(NoisePeakGain, 2.5, 3.5)
        };
        rows.insert((Scenario::Seasonal, Variant::Balanced), seasonal(13.0, 17.0));
        rows.insert((Scenario::Seasonal, Variant::Extreme), seasonal(26.0, 34.0));

        let burst = |spikes: f64| {
            DnaProfile::new()
                .with(BaseLevel, 13.0, 17.0)
                .with(DriftMean, 0.004, 0.006)
                .with(DriftVolatility, 0.008, 0.012)
                .with(SeasonAmp, 1.0, 4.0)
                .with(WeeklyAmp, 0.5, 2.0)
                .with(SpikeCount, spikes, spikes)
                .with(NoiseStd, 1.2, 1.8)
        };
        rows.insert((Scenario::Burst, Variant::Moderate), burst(15.0));
        rows.insert((Scenario::Burst, Variant::Extreme), burst(35.0));

        let idle = |floor: f64| {
            DnaProfile::new()
                .with(FloorMean, floor, floor)
                .with(FloorNoise, 0.4, 0.6)
                .with(DriftVolatility, 0.005, 0.02)
                .with(SeasonAmp, 0.3, 1.0)
        };
        rows.insert((Scenario::LowIdle, Variant::Stable), idle(5.0));
        rows.insert((Scenario::LowIdle, Variant::Drifting), idle(10.0));

        let breach = |rate_lo: f64, rate_hi: f64| {
            DnaProfile::new()
                .with(BaseLevel, 23.0, 27.0)
                .with(GrowthRate, rate_lo, rate_hi)
                .with(SeasonAmp, 4.0, 6.0)
                .with(WeeklyAmp, 0.5, 1.5)
                .with(NoiseStd, 2.0, 3.0)
        };
        rows.insert((Scenario::CapacityBreach, Variant::Imminent), breach(0.0055, 0.0065));
        rows.insert((Scenario::CapacityBreach, Variant::Critical), breach(0.0085, 0.0095));

        ScenarioDna { rows }
    }

    /// Add or replace a row after validating it
    pub fn insert(
        &mut self,
        scenario: Scenario,
        variant: Variant,
        profile: DnaProfile,
    ) -> Result<()> {
        profile.validate(scenario, variant)?;
        self.rows.insert((scenario, variant), profile);
        Ok(())
    }

    pub fn get(&self, scenario: Scenario, variant: Variant) -> Option<&DnaProfile> {
        self.rows.get(&(scenario, variant))
    }

    /// Row lookup that never substitutes a default
    pub fn lookup(
        &self,
        scenario: Scenario,
        variant: Variant,
        host_id: Option<&str>,
    ) -> Result<&DnaProfile> {
        self.get(scenario, variant)
            .ok_or_else(|| HorizonError::config_mismatch(scenario, variant, host_id))
    }

    pub fn contains(&self, scenario: Scenario, variant: Variant) -> bool {
        self.rows.contains_key(&(scenario, variant))
    }

    /// All (scenario, variant) keys, ordered
    pub fn keys(&self) -> impl Iterator<Item = (Scenario, Variant)> + '_ {
        self.rows.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = ((Scenario, Variant), &DnaProfile)> + '_ {
        self.rows.iter().map(|(key, profile)| (*key, profile))
    }

    /// Scenarios with at least one row
    pub fn scenarios(&self) -> BTreeSet<Scenario> {
        self.rows.keys().map(|(scenario, _)| *scenario).collect()
    }

    /// Variants defined for `scenario`
    pub fn variants_of(&self, scenario: Scenario) -> Vec<Variant> {
        self.rows
            .keys()
            .filter(|(s, _)| *s == scenario)
            .map(|(_, variant)| *variant)
            .collect()
    }

    /// Copy of the table restricted to `scenarios`
    pub fn retain_scenarios(&self, scenarios: &[Scenario]) -> Self {
        ScenarioDna {
            rows: self
                .rows
                .iter()
                .filter(|((scenario, _), _)| scenarios.contains(scenario))
                .map(|(key, profile)| (*key, profile.clone()))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Re-check every row
    pub fn validate(&self) -> Result<()> {
        if self.rows.is_empty() {
            return Err(HorizonError::invalid_config("DNA table has no rows"));
        }
        for ((scenario, variant), profile) in &self.rows {
            profile.validate(*scenario, *variant)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_table_is_complete() {
        let dna = ScenarioDna::builtin();
        dna.validate().unwrap();

        assert_eq!(dna.len(), 10);
        for scenario in Scenario::ALL {
            assert!(dna.contains(scenario, scenario.common_variant()));
            assert!(dna.contains(scenario, scenario.rare_variant()));
        }
    }

    #[test]
    fn test_variant_rows_encode_severity() {
        let dna = ScenarioDna::builtin();

        let balanced = dna.get(Scenario::Seasonal, Variant::Balanced).unwrap();
        let extreme = dna.get(Scenario::Seasonal, Variant::Extreme).unwrap();
        let b = balanced.get(Param::SeasonAmp).unwrap();
        let e = extreme.get(Param::SeasonAmp).unwrap();
        assert_eq!(e.lo, b.lo * 2.0);
        assert_eq!(e.hi, b.hi * 2.0);

        let stable = dna.get(Scenario::LowIdle, Variant::Stable).unwrap();
        assert_eq!(stable.get(Param::FloorMean), Some(ParamRange::fixed(5.0)));

        let moderate = dna.get(Scenario::Burst, Variant::Moderate).unwrap();
        let dense = dna.get(Scenario::Burst, Variant::Extreme).unwrap();
        let dense_count = dense.get(Param::SpikeCount).unwrap();
        let moderate_count = moderate.get(Param::SpikeCount).unwrap();
        assert!(dense_count.lo > moderate_count.hi);
    }

    #[test]
    fn test_lookup_missing_row_is_mismatch() {
        let dna = ScenarioDna::builtin();
        let err = dna
            .lookup(Scenario::Burst, Variant::Stable, Some("host-9"))
            .unwrap_err();

        match err {
            HorizonError::ConfigMismatch { scenario, variant, host_id } => {
                assert_eq!(scenario, Scenario::Burst);
                assert_eq!(variant, Variant::Stable);
                assert_eq!(host_id.as_deref(), Some("host-9"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_insert_rejects_inverted_range() {
        let mut dna = ScenarioDna::empty();
        let profile = DnaProfile::new()
            .with(Param::FloorMean, 6.0, 4.0)
            .with(Param::FloorNoise, 0.4, 0.6)
            .with(Param::DriftVolatility, 0.005, 0.02)
            .with(Param::SeasonAmp, 0.3, 1.0);

        let err = dna.insert(Scenario::LowIdle, Variant::Stable, profile).unwrap_err();
        assert!(matches!(err, HorizonError::InvalidConfig(_)));
        assert!(dna.is_empty());
    }

    #[test]
    fn test_insert_rejects_missing_parameter() {
        let mut dna = ScenarioDna::empty();
        let profile = DnaProfile::new().with(Param::FloorMean, 5.0, 5.0);

        let err = dna.insert(Scenario::LowIdle, Variant::Stable, profile).unwrap_err();
        assert!(err.to_string().contains("floor_noise"));
    }

    #[test]
    fn test_insert_rejects_negative_spread() {
        let mut dna = ScenarioDna::empty();
        let profile = DnaProfile::new()
            .with(Param::FloorMean, 5.0, 5.0)
            .with(Param::FloorNoise, -0.5, 0.5)
            .with(Param::DriftVolatility, 0.005, 0.02)
            .with(Param::SeasonAmp, 0.3, 1.0);

        assert!(dna.insert(Scenario::LowIdle, Variant::Stable, profile).is_err());
    }

    #[test]
    fn test_retain_scenarios() {
        let dna = ScenarioDna::builtin().retain_scenarios(&[Scenario::Burst, Scenario::LowIdle]);

        assert_eq!(dna.len(), 4);
        assert_eq!(
            dna.scenarios().into_iter().collect::<Vec<_>>(),
            vec![Scenario::Burst, Scenario::LowIdle]
        );
        assert_eq!(dna.variants_of(Scenario::Burst), vec![Variant::Extreme, Variant::Moderate]);
    }
}
