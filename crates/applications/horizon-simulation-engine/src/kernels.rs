//! Scenario kernels ("behavioral DNA")
//!
//! Each kernel composes independent layers over a day index `t`:
//!
//! ```text
//! level ── random-walk drift ── annual cosine ── weekly sine ── noise ── clip [0, 100]
//! ```
//!
//! - **Steady Growth**: drifted random walk with seasonal ripple
//! - **Seasonal**: strong annual cycle, noise variance peaks with the season
//! - **Burst**: quiet background plus rectangular spike plateaus
//! - **Low-Idle**: flat low floor with a very slow drift
//! - **Capacity-Breach**: exponential curve towards exhaustion
//!
//! Kernels are pure given their inputs: all parameters are sampled before the
//! first layer is built and the RNG is passed in by the caller.

use std::f64::consts::PI;

use horizon_core::{HorizonError, Result, Scenario, Variant};
use rand::Rng;
use rand_distr::{Distribution, Normal, StandardNormal};

use crate::dna::{Param, ScenarioDna};
use crate::sampler::{ParameterSampler, SampledParams};
use crate::seed::GenerationSeed;

/// Utilization bounds every kernel clips to
pub const UTIL_MIN: f64 = 0.0;
pub const UTIL_MAX: f64 = 100.0;

const DAYS_PER_YEAR: f64 = 365.0;
const DAYS_PER_WEEK: f64 = 7.0;

/// Burst spike duration in days, inclusive
const SPIKE_DURATION_DAYS: (usize, usize) = (1, 3);
/// Burst spike plateau height, inclusive
const SPIKE_MAGNITUDE: (f64, f64) = (40.0, 75.0);

/// Closed set of stochastic generators, one per scenario
pub trait ScenarioKernel {
    /// Compose the kernel's layers for `days` days from pre-sampled parameters
    fn synthesize<R: Rng + ?Sized>(
        &self,
        days: usize,
        params: &SampledParams,
        rng: &mut R,
    ) -> Result<Vec<f32>>;
}

impl ScenarioKernel for Scenario {
    fn synthesize<R: Rng + ?Sized>(
        &self,
        days: usize,
        params: &SampledParams,
        rng: &mut R,
    ) -> Result<Vec<f32>> {
        if params.scenario != *self {
            return Err(HorizonError::invalid_config(format!(
                "{self} kernel was handed parameters sampled for {}",
                params.scenario
            )));
        }
        let raw = match self {
            Scenario::SteadyGrowth => steady_growth(days, params, rng)?,
            Scenario::Seasonal => seasonal(days, params, rng)?,
            Scenario::Burst => burst(days, params, rng)?,
            Scenario::LowIdle => low_idle(days, params, rng)?,
            Scenario::CapacityBreach => capacity_breach(days, params, rng)?,
        };
        Ok(clip(raw))
    }
}

/// Generate one series from a raw seed
///
/// Builds a fresh RNG from `seed`, samples the (scenario, variant) DNA row and
/// runs the kernel. Identical arguments always give identical output.
pub fn generate(
    scenario: Scenario,
    days: usize,
    variant: Variant,
    seed: GenerationSeed,
    dna: &ScenarioDna,
) -> Result<Vec<f32>> {
    let mut rng = seed.rng();
    let params = ParameterSampler::new(dna).sample(scenario, variant, None, &mut rng)?;
    scenario.synthesize(days, &params, &mut rng)
}

/// Hard clip to [0, 100] and narrow to storage precision
pub fn clip(values: Vec<f64>) -> Vec<f32> {
    values
        .into_iter()
        .map(|v| v.clamp(UTIL_MIN, UTIL_MAX) as f32)
        .collect()
}

fn normal(mean: f64, std_dev: f64) -> Result<Normal<f64>> {
    Normal::new(mean, std_dev).map_err(|e| {
        HorizonError::invalid_config(format!("normal(mean={mean}, sd={std_dev}): {e}"))
    })
}

/// Cumulative sum of i.i.d. normal steps
fn random_walk<R: Rng + ?Sized>(
    days: usize,
    step_mean: f64,
    step_sd: f64,
    rng: &mut R,
) -> Result<Vec<f64>> {
    let steps = normal(step_mean, step_sd)?;
    let mut level = 0.0;
    Ok((0..days)
        .map(|_| {
            level += steps.sample(&mut *rng);
            level
        })
        .collect())
}

/// I.i.d. normal draws with a fixed spread
fn white_noise<R: Rng + ?Sized>(days: usize, std_dev: f64, rng: &mut R) -> Result<Vec<f64>> {
    let noise = normal(0.0, std_dev)?;
    Ok((0..days).map(|_| noise.sample(&mut *rng)).collect())
}

fn annual(t: usize) -> f64 {
    (2.0 * PI * t as f64 / DAYS_PER_YEAR).cos()
}

fn weekly(t: usize) -> f64 {
    (2.0 * PI * t as f64 / DAYS_PER_WEEK).sin()
}

fn steady_growth<R: Rng + ?Sized>(days: usize, p: &SampledParams, rng: &mut R) -> Result<Vec<f64>> {
    let base = p.get(Param::BaseLevel)?;
    let season_amp = p.get(Param::SeasonAmp)?;
    // Total growth is spread evenly over the horizon
    let mean_daily_growth = if days == 0 {
        0.0
    } else {
        p.get(Param::GrowthTotal)? / days as f64
    };

    let trend = random_walk(days, mean_daily_growth, p.get(Param::DriftVolatility)?, rng)?;
    let noise = white_noise(days, p.get(Param::NoiseStd)?, rng)?;

    Ok((0..days)
        .map(|t| {
            base + trend[t]
                + season_amp * annual(t)
                + (season_amp / 4.0) * weekly(t)
                + noise[t]
        })
        .collect())
}

fn seasonal<R: Rng + ?Sized>(days: usize, p: &SampledParams, rng: &mut R) -> Result<Vec<f64>> {
    let base = p.get(Param::BaseLevel)?;
    let season_amp = p.get(Param::SeasonAmp)?;
    let weekly_amp = p.get(Param::WeeklyAmp)?;
    let noise_floor = p.get(Param::NoiseFloor)?;
    let noise_gain = p.get(Param::NoisePeakGain)?;

    let trend = random_walk(days, p.get(Param::DriftMean)?, p.get(Param::DriftVolatility)?, rng)?;

    Ok((0..days)
        .map(|t| {
            let phase = annual(t);
            // Heteroskedastic: spread grows towards the seasonal peak
            let envelope = (phase + 1.0) / 2.0;
            let z: f64 = rng.sample(StandardNormal);
            let noise = z * (noise_floor + noise_gain * envelope);
            base + trend[t] + season_amp * phase + weekly_amp * weekly(t) + noise
        })
        .collect())
}

fn burst<R: Rng + ?Sized>(days: usize, p: &SampledParams, rng: &mut R) -> Result<Vec<f64>> {
    let base = p.get(Param::BaseLevel)?;
    let season_amp = p.get(Param::SeasonAmp)?;
    let weekly_amp = p.get(Param::WeeklyAmp)?;
    let spike_count = (p.get(Param::SpikeCount)?.round().max(0.0) as usize).min(days);

    let trend = random_walk(days, p.get(Param::DriftMean)?, p.get(Param::DriftVolatility)?, rng)?;

    // Distinct start days; later plateaus overwrite earlier ones where they overlap
    let mut spikes = vec![0.0; days];
    for start in rand::seq::index::sample(&mut *rng, days, spike_count).into_iter() {
        let duration = rng.gen_range(SPIKE_DURATION_DAYS.0..=SPIKE_DURATION_DAYS.1);
        let magnitude = rng.gen_range(SPIKE_MAGNITUDE.0..=SPIKE_MAGNITUDE.1);
        let end = (start + duration).min(days);
        spikes[start..end].fill(magnitude);
    }

    let noise = white_noise(days, p.get(Param::NoiseStd)?, rng)?;

    Ok((0..days)
        .map(|t| {
            base + trend[t] + season_amp * annual(t) + weekly_amp * weekly(t) + spikes[t] + noise[t]
        })
        .collect())
}

fn low_idle<R: Rng + ?Sized>(days: usize, p: &SampledParams, rng: &mut R) -> Result<Vec<f64>> {
    let floor = normal(p.get(Param::FloorMean)?, p.get(Param::FloorNoise)?)?;
    let season_amp = p.get(Param::SeasonAmp)?;

    let idle: Vec<f64> = (0..days).map(|_| floor.sample(&mut *rng)).collect();
    let drift = random_walk(days, 0.0, p.get(Param::DriftVolatility)?, rng)?;

    Ok((0..days)
        .map(|t| idle[t] + drift[t] + season_amp * annual(t))
        .collect())
}

fn capacity_breach<R: Rng + ?Sized>(
    days: usize,
    p: &SampledParams,
    rng: &mut R,
) -> Result<Vec<f64>> {
    let base = p.get(Param::BaseLevel)?;
    let rate = p.get(Param::GrowthRate)?;
    let season_amp = p.get(Param::SeasonAmp)?;
    let weekly_amp = p.get(Param::WeeklyAmp)?;

    let noise = white_noise(days, p.get(Param::NoiseStd)?, rng)?;

    Ok((0..days)
        .map(|t| {
            let curve = base * (rate * t as f64 / 10.0).exp();
            curve + season_amp * annual(t) + weekly_amp * weekly(t) + noise[t]
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn every_row() -> Vec<(Scenario, Variant)> {
        ScenarioDna::builtin().keys().collect()
    }

    fn seeded(scenario: Scenario, days: usize, variant: Variant, seed: u64) -> Vec<f32> {
        let dna = ScenarioDna::builtin();
        generate(scenario, days, variant, GenerationSeed::from_raw(seed), &dna).unwrap()
    }

    fn mean(values: &[f32]) -> f64 {
        values.iter().map(|v| *v as f64).sum::<f64>() / values.len() as f64
    }

    #[test]
    fn test_steady_growth_reference_example() {
        let a = seeded(Scenario::SteadyGrowth, 10, Variant::Normal, 42);
        let again = seeded(Scenario::SteadyGrowth, 10, Variant::Normal, 42);
        let b = seeded(Scenario::SteadyGrowth, 10, Variant::Normal, 43);

        assert_eq!(a, again);
        assert_ne!(a, b);
        assert_eq!(b.len(), 10);
        assert!(b.iter().all(|v| (0.0..=100.0).contains(v)));
    }

    #[test]
    fn test_zero_days_is_empty() {
        let dna = ScenarioDna::builtin();
        for (scenario, variant) in every_row() {
            let series = generate(scenario, 0, variant, GenerationSeed::from_raw(1), &dna).unwrap();
            assert!(series.is_empty());
        }
    }

    #[test]
    fn test_missing_variant_is_mismatch() {
        let dna = ScenarioDna::builtin();
        let err =
            generate(Scenario::LowIdle, 30, Variant::Extreme, GenerationSeed::from_raw(1), &dna)
                .unwrap_err();
        assert!(matches!(err, HorizonError::ConfigMismatch { .. }));
    }

    #[test]
    fn test_kernel_rejects_foreign_params() {
        let dna = ScenarioDna::builtin();
        let mut rng = GenerationSeed::from_raw(5).rng();
        let params = ParameterSampler::new(&dna)
            .sample(Scenario::LowIdle, Variant::Stable, None, &mut rng)
            .unwrap();

        assert!(Scenario::Burst.synthesize(10, &params, &mut rng).is_err());
    }

    #[test]
    fn test_extreme_seasonal_swings_wider() {
        let dna = ScenarioDna::builtin();
        let seed = GenerationSeed::from_raw(2024);
        let balanced = generate(Scenario::Seasonal, 730, Variant::Balanced, seed, &dna).unwrap();
        let extreme = generate(Scenario::Seasonal, 730, Variant::Extreme, seed, &dna).unwrap();

        let spread = |s: &[f32]| {
            let max = s.iter().cloned().fold(f32::MIN, f32::max);
            let min = s.iter().cloned().fold(f32::MAX, f32::min);
            max - min
        };
        assert!(spread(&extreme) > spread(&balanced));
    }

    #[test]
    fn test_seasonal_noise_peaks_with_season() {
        // Pure noise layer: no drift, no seasonal mean, large gain
        let params = SampledParams::from_values(
            Scenario::Seasonal,
            Variant::Balanced,
            [
                (Param::BaseLevel, 50.0),
                (Param::DriftMean, 0.0),
                (Param::DriftVolatility, 0.0),
                (Param::SeasonAmp, 0.0),
                (Param::WeeklyAmp, 0.0),
                (Param::NoiseFloor, 0.5),
                (Param::NoisePeakGain, 6.0),
            ],
        );
        let mut rng = GenerationSeed::from_raw(11).rng();
        let series = Scenario::Seasonal.synthesize(365 * 4, &params, &mut rng).unwrap();

        // Days near t = 0 (mod 365) sit at the peak, near 182 at the trough
        let mut peak = Vec::new();
        let mut trough = Vec::new();
        for (t, v) in series.iter().enumerate() {
            let day = t % 365;
            let deviation = (*v as f64 - 50.0).abs();
            if day < 30 || day > 335 {
                peak.push(deviation);
            } else if (152..213).contains(&day) {
                trough.push(deviation);
            }
        }
        let avg = |xs: &[f64]| xs.iter().sum::<f64>() / xs.len() as f64;
        assert!(avg(&peak) > 2.0 * avg(&trough));
    }

    #[test]
    fn test_burst_spikes_form_plateaus() {
        let params = SampledParams::from_values(
            Scenario::Burst,
            Variant::Moderate,
            [
                (Param::BaseLevel, 10.0),
                (Param::DriftMean, 0.0),
                (Param::DriftVolatility, 0.0),
                (Param::SeasonAmp, 0.0),
                (Param::WeeklyAmp, 0.0),
                (Param::SpikeCount, 5.0),
                (Param::NoiseStd, 0.0),
            ],
        );
        let mut rng = GenerationSeed::from_raw(99).rng();
        let series = Scenario::Burst.synthesize(200, &params, &mut rng).unwrap();

        let spiked: Vec<f32> = series.iter().cloned().filter(|v| *v > 10.0).collect();
        assert!(!spiked.is_empty());
        assert!(spiked.len() <= 15);
        for v in spiked {
            assert!((50.0..=85.0).contains(&v), "plateau {v} outside base + [40, 75]");
        }
        assert!(series.iter().filter(|v| **v == 10.0).count() >= 185);
    }

    #[test]
    fn test_burst_spike_count_clamped_to_horizon() {
        // 35 spikes requested, only 10 days available
        let series = seeded(Scenario::Burst, 10, Variant::Extreme, 3);
        assert_eq!(series.len(), 10);
        assert!(series.iter().all(|v| *v >= 40.0));
    }

    #[test]
    fn test_low_idle_floor_by_variant() {
        let stable = seeded(Scenario::LowIdle, 365, Variant::Stable, 8);
        let drifting = seeded(Scenario::LowIdle, 365, Variant::Drifting, 8);

        assert!((mean(&stable) - 5.0).abs() < 2.0);
        assert!((mean(&drifting) - 10.0).abs() < 2.0);
    }

    #[test]
    fn test_capacity_breach_grows() {
        let dna = ScenarioDna::builtin();
        let series = generate(
            Scenario::CapacityBreach,
            1095,
            Variant::Critical,
            GenerationSeed::from_raw(17),
            &dna,
        )
        .unwrap();

        let first_year = mean(&series[..365]);
        let last_year = mean(&series[730..]);
        assert!(last_year > first_year + 20.0);
    }

    proptest! {
        #[test]
        fn prop_length_and_bounds(days in 0usize..800, seed in any::<u64>(), row in 0usize..10) {
            let (scenario, variant) = every_row()[row];
            let series = seeded(scenario, days, variant, seed);

            prop_assert_eq!(series.len(), days);
            prop_assert!(series.iter().all(|v| (0.0..=100.0).contains(v)));
        }

        #[test]
        fn prop_deterministic(days in 1usize..400, seed in any::<u64>(), row in 0usize..10) {
            let dna = ScenarioDna::builtin();
            let (scenario, variant) = every_row()[row];
            let seed = GenerationSeed::from_raw(seed);

            let a = generate(scenario, days, variant, seed, &dna).unwrap();
            let b = generate(scenario, days, variant, seed, &dna).unwrap();
            prop_assert_eq!(a, b);
        }

        #[test]
        fn prop_seeds_diverge(days in 30usize..400, seed in 0u64..1_000_000, row in 0usize..10) {
            let (scenario, variant) = every_row()[row];

            let a = seeded(scenario, days, variant, seed);
            let b = seeded(scenario, days, variant, seed + 1);
            prop_assert_ne!(a, b);
        }
    }
}
