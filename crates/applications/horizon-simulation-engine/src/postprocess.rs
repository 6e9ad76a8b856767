//! Resource post-processing
//!
//! Kernels produce scenario-shaped load; this stage makes it resource-shaped.
//! Per series it draws one multiplicative factor and one noise intensity from
//! the resource's profile, applies both, and clips again. It never looks at
//! the scenario.

use std::collections::BTreeMap;

use horizon_core::{HorizonError, Resource, Result};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use tracing::trace;

use crate::dna::ParamRange;
use crate::kernels::{UTIL_MAX, UTIL_MIN};

/// Perturbation ranges for one resource
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResourceProfile {
    /// Multiplier applied to the kernel output
    pub adjust_factor: ParamRange,
    /// Spread of additive daily noise
    pub noise_std: ParamRange,
}

impl ResourceProfile {
    pub const fn new(adjust_factor: ParamRange, noise_std: ParamRange) -> Self {
        ResourceProfile {
            adjust_factor,
            noise_std,
        }
    }

    pub fn validate(&self, resource: Resource) -> Result<()> {
        self.adjust_factor.check(&format!("{resource} adjust_factor"))?;
        self.noise_std.check(&format!("{resource} noise_std"))?;
        if self.adjust_factor.lo < 0.0 || self.noise_std.lo < 0.0 {
            return Err(HorizonError::invalid_config(format!(
                "{resource}: adjust_factor and noise_std must be non-negative"
            )));
        }
        Ok(())
    }
}

/// Profiles for the whole resource set
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceProfiles {
    profiles: BTreeMap<Resource, ResourceProfile>,
}

impl ResourceProfiles {
    /// Disks run systematically lower than CPUs; network is the noisiest
    pub fn builtin() -> Self {
        let profiles = BTreeMap::from([
            (
                Resource::Cpu,
                ResourceProfile::new(ParamRange::new(0.90, 1.10), ParamRange::new(0.5, 1.5)),
            ),
            (
                Resource::Memory,
                ResourceProfile::new(ParamRange::new(0.85, 1.05), ParamRange::new(0.3, 1.0)),
            ),
            (
                Resource::Disk,
                ResourceProfile::new(ParamRange::new(0.50, 0.80), ParamRange::new(0.2, 0.6)),
            ),
            (
                Resource::Network,
                ResourceProfile::new(ParamRange::new(0.60, 1.20), ParamRange::new(1.0, 2.5)),
            ),
        ]);
        ResourceProfiles { profiles }
    }

    /// Build from explicit profiles; every resource must be covered
    pub fn from_profiles(profiles: BTreeMap<Resource, ResourceProfile>) -> Result<Self> {
        let table = ResourceProfiles { profiles };
        table.validate()?;
        Ok(table)
    }

    pub fn get(&self, resource: Resource) -> Result<&ResourceProfile> {
        self.profiles
            .get(&resource)
            .ok_or_else(|| HorizonError::missing_resource(resource))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Resource, &ResourceProfile)> + '_ {
        self.profiles.iter().map(|(resource, profile)| (*resource, profile))
    }

    pub fn validate(&self) -> Result<()> {
        for resource in Resource::ALL {
            self.get(resource)?.validate(resource)?;
        }
        Ok(())
    }
}

/// Applies resource-specific perturbation to kernel output
pub struct ResourcePostProcessor<'a> {
    profiles: &'a ResourceProfiles,
}

impl<'a> ResourcePostProcessor<'a> {
    pub fn new(profiles: &'a ResourceProfiles) -> Self {
        ResourcePostProcessor { profiles }
    }

    /// Scale, add noise and re-clip one series
    pub fn apply<R: Rng + ?Sized>(
        &self,
        resource: Resource,
        series: Vec<f32>,
        rng: &mut R,
    ) -> Result<Vec<f32>> {
        let profile = self.profiles.get(resource)?;

        let factor = rng.gen_range(profile.adjust_factor.lo..=profile.adjust_factor.hi);
        let noise_std = rng.gen_range(profile.noise_std.lo..=profile.noise_std.hi);
        let noise = Normal::new(0.0, noise_std).map_err(|e| {
            HorizonError::invalid_config(format!("{resource} noise (sd={noise_std}): {e}"))
        })?;
        trace!(%resource, factor, noise_std, "Resource adjustment drawn");

        Ok(series
            .into_iter()
            .map(|v| {
                let adjusted = f64::from(v) * factor + noise.sample(&mut *rng);
                adjusted.clamp(UTIL_MIN, UTIL_MAX) as f32
            })
            .collect())
    }
}
