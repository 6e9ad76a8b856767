//! Generator configuration: DNA rows plus resource profiles
//!
//! The built-in tables ship with the binary; a TOML document with the same
//! shape replaces them wholesale:
//!
//! ```toml
//! [[scenario]]
//! scenario = "STEADY_GROWTH"
//! variant = "NORMAL"
//!
//! [scenario.params]
//! base_level = [20.0, 40.0]
//! growth_total = [10.0, 30.0]
//!
//! [[resource]]
//! resource = "cpu"
//! adjust_factor = [0.9, 1.1]
//! noise_std = [0.5, 1.5]
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use horizon_core::{HorizonError, Resource, Result, Scenario, Variant};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::dna::{DnaProfile, Param, ParamRange, ScenarioDna};
use crate::postprocess::{ResourceProfile, ResourceProfiles};

/// Static configuration read once per run
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorConfig {
    pub dna: ScenarioDna,
    pub resources: ResourceProfiles,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self::builtin()
    }
}

impl GeneratorConfig {
    pub fn builtin() -> Self {
        GeneratorConfig {
            dna: ScenarioDna::builtin(),
            resources: ResourceProfiles::builtin(),
        }
    }

    /// Replace the DNA table, keeping resource profiles
    pub fn with_dna(mut self, dna: ScenarioDna) -> Self {
        self.dna = dna;
        self
    }

    /// Load and validate a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        info!(
            path = %path.display(),
            rows = config.dna.len(),
            "Loaded generator config"
        );
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let document: ConfigDocument = toml::from_str(content)?;
        document.try_into()
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(&ConfigDocument::from(self))?)
    }

    pub fn validate(&self) -> Result<()> {
        self.dna.validate()?;
        self.resources.validate()
    }
}

/// On-disk shape of [`GeneratorConfig`]
#[derive(Debug, Serialize, Deserialize)]
struct ConfigDocument {
    #[serde(rename = "scenario", default)]
    scenarios: Vec<ScenarioEntry>,
    #[serde(rename = "resource", default)]
    resources: Vec<ResourceEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ScenarioEntry {
    scenario: Scenario,
    variant: Variant,
    params: BTreeMap<String, ParamRange>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ResourceEntry {
    resource: Resource,
    adjust_factor: ParamRange,
    noise_std: ParamRange,
}

impl TryFrom<ConfigDocument> for GeneratorConfig {
    type Error = HorizonError;

    fn try_from(document: ConfigDocument) -> Result<Self> {
        let mut dna = ScenarioDna::empty();
        for entry in document.scenarios {
            if dna.contains(entry.scenario, entry.variant) {
                return Err(HorizonError::invalid_config(format!(
                    "duplicate DNA row {}/{}",
                    entry.scenario, entry.variant
                )));
            }
            let mut profile = DnaProfile::new();
            for (name, range) in entry.params {
                profile.set(name.parse::<Param>()?, range);
            }
            dna.insert(entry.scenario, entry.variant, profile)?;
        }
        dna.validate()?;

        let mut profiles = BTreeMap::new();
        for entry in document.resources {
            let profile = ResourceProfile::new(entry.adjust_factor, entry.noise_std);
            if profiles.insert(entry.resource, profile).is_some() {
                return Err(HorizonError::invalid_config(format!(
                    "duplicate resource profile {}",
                    entry.resource
                )));
            }
        }
        let resources = ResourceProfiles::from_profiles(profiles)?;

        Ok(GeneratorConfig { dna, resources })
    }
}

impl From<&GeneratorConfig> for ConfigDocument {
    fn from(config: &GeneratorConfig) -> Self {
        let scenarios = config
            .dna
            .iter()
            .map(|((scenario, variant), profile)| ScenarioEntry {
                scenario,
                variant,
                params: profile
                    .iter()
                    .map(|(param, range)| (param.as_str().to_string(), range))
                    .collect(),
            })
            .collect();
        let resources = config
            .resources
            .iter()
            .map(|(resource, profile)| ResourceEntry {
                resource,
                adjust_factor: profile.adjust_factor,
                noise_std: profile.noise_std,
            })
            .collect();
        ConfigDocument {
            scenarios,
            resources,
        }
    }
}
