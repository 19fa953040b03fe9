//! Configuration system for the island simulation.
//!
//! Species and landscape parameters are plain structs owned by the island and
//! passed by reference into cells and animals. Updates go through the
//! validated `update` setters, never through ad hoc field mutation. The whole
//! configuration can be loaded from and saved to YAML.

use crate::animal::Species;
use crate::error::{ConfigError, Result, SimError};
use crate::landscape::Terrain;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Per-species constants shared by every individual of that species
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpeciesParams {
    /// Mean birth weight
    pub w_birth: f64,
    /// Standard deviation of birth weight
    pub sigma_birth: f64,
    /// Fraction of eaten food converted to weight
    pub beta: f64,
    /// Yearly relative weight loss
    pub eta: f64,
    /// Age at which the age factor of fitness is one half
    pub a_half: f64,
    /// Steepness of the age factor
    pub phi_age: f64,
    /// Weight at which the weight factor of fitness is one half
    pub w_half: f64,
    /// Steepness of the weight factor
    pub phi_weight: f64,
    /// Migration propensity
    pub mu: f64,
    /// Birth propensity
    pub gamma: f64,
    /// Birth weight threshold factor
    pub zeta: f64,
    /// Weight lost by the mother per unit of newborn weight
    pub xi: f64,
    /// Death propensity
    pub omega: f64,
    /// Appetite: food eaten per year at most
    #[serde(rename = "F")]
    pub appetite: f64,
    /// Fitness difference above which a kill is certain (carnivores only)
    #[serde(rename = "DeltaPhiMax", default)]
    pub delta_phi_max: Option<f64>,
}

impl SpeciesParams {
    /// Default herbivore parameters
    pub fn herbivore() -> Self {
        Self {
            w_birth: 8.0,
            sigma_birth: 1.5,
            beta: 0.9,
            eta: 0.05,
            a_half: 40.0,
            phi_age: 0.6,
            w_half: 10.0,
            phi_weight: 0.1,
            mu: 0.25,
            gamma: 0.2,
            zeta: 3.5,
            xi: 1.2,
            omega: 0.4,
            appetite: 10.0,
            delta_phi_max: None,
        }
    }

    /// Default carnivore parameters
    pub fn carnivore() -> Self {
        Self {
            w_birth: 6.0,
            sigma_birth: 1.0,
            beta: 0.75,
            eta: 0.125,
            a_half: 40.0,
            phi_age: 0.3,
            w_half: 4.0,
            phi_weight: 0.4,
            mu: 0.4,
            gamma: 0.8,
            zeta: 3.5,
            xi: 1.1,
            omega: 0.8,
            appetite: 50.0,
            delta_phi_max: Some(10.0),
        }
    }

    /// Apply a set of named parameter changes.
    ///
    /// The update is all-or-nothing: unknown keys or invalid values leave the
    /// parameters untouched.
    pub fn update<'a, I>(&mut self, changes: I) -> Result<()>
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let mut next = self.clone();
        for (key, value) in changes {
            let slot = match key {
                "w_birth" => &mut next.w_birth,
                "sigma_birth" => &mut next.sigma_birth,
                "beta" => &mut next.beta,
                "eta" => &mut next.eta,
                "a_half" => &mut next.a_half,
                "phi_age" => &mut next.phi_age,
                "w_half" => &mut next.w_half,
                "phi_weight" => &mut next.phi_weight,
                "mu" => &mut next.mu,
                "gamma" => &mut next.gamma,
                "zeta" => &mut next.zeta,
                "xi" => &mut next.xi,
                "omega" => &mut next.omega,
                "F" => &mut next.appetite,
                "DeltaPhiMax" => match next.delta_phi_max.as_mut() {
                    Some(slot) => slot,
                    None => {
                        return Err(SimError::domain(
                            "DeltaPhiMax only applies to species that hunt",
                        ))
                    }
                },
                other => {
                    return Err(SimError::domain(format!("unknown parameter '{}'", other)));
                }
            };
            *slot = value;
        }
        next.validate()?;
        *self = next;
        Ok(())
    }

    /// Validate parameter values
    pub fn validate(&self) -> Result<()> {
        let named = [
            ("w_birth", self.w_birth),
            ("sigma_birth", self.sigma_birth),
            ("beta", self.beta),
            ("eta", self.eta),
            ("a_half", self.a_half),
            ("phi_age", self.phi_age),
            ("w_half", self.w_half),
            ("phi_weight", self.phi_weight),
            ("mu", self.mu),
            ("gamma", self.gamma),
            ("zeta", self.zeta),
            ("xi", self.xi),
            ("omega", self.omega),
            ("F", self.appetite),
        ];
        for (name, value) in named {
            if !value.is_finite() || value < 0.0 {
                return Err(SimError::validation(format!(
                    "{} must be a finite non-negative number, got {}",
                    name, value
                )));
            }
        }
        if self.eta > 1.0 {
            return Err(SimError::validation("eta must not exceed 1"));
        }
        if let Some(dpm) = self.delta_phi_max {
            if !dpm.is_finite() || dpm <= 0.0 {
                return Err(SimError::validation(format!(
                    "DeltaPhiMax must be strictly positive, got {}",
                    dpm
                )));
            }
        }
        Ok(())
    }
}

/// Fodder limits for the terrain kinds that grow fodder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LandscapeParams {
    pub highland_f_max: f64,
    pub lowland_f_max: f64,
}

impl Default for LandscapeParams {
    fn default() -> Self {
        Self {
            highland_f_max: 300.0,
            lowland_f_max: 800.0,
        }
    }
}

impl LandscapeParams {
    /// Fodder restored each year for the given terrain (zero for desert and sea)
    #[inline]
    pub fn f_max(&self, terrain: Terrain) -> f64 {
        match terrain {
            Terrain::Highland => self.highland_f_max,
            Terrain::Lowland => self.lowland_f_max,
            Terrain::Desert | Terrain::Sea => 0.0,
        }
    }

    /// Update parameters of one terrain kind. Only `f_max` exists, and only
    /// for highland and lowland.
    pub fn update<'a, I>(&mut self, terrain: Terrain, changes: I) -> Result<()>
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let mut next = self.clone();
        for (key, value) in changes {
            let slot = match (terrain, key) {
                (Terrain::Highland, "f_max") => &mut next.highland_f_max,
                (Terrain::Lowland, "f_max") => &mut next.lowland_f_max,
                (_, other) => {
                    return Err(SimError::domain(format!(
                        "unknown parameter '{}' for {:?}",
                        other, terrain
                    )));
                }
            };
            *slot = value;
        }
        next.validate()?;
        *self = next;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("highland f_max", self.highland_f_max),
            ("lowland f_max", self.lowland_f_max),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(SimError::validation(format!(
                    "{} must be a finite non-negative number, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// Every constant the simulation rules read
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Parameters {
    pub herbivore: SpeciesParams,
    pub carnivore: SpeciesParams,
    #[serde(default)]
    pub landscape: LandscapeParams,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            herbivore: SpeciesParams::herbivore(),
            carnivore: SpeciesParams::carnivore(),
            landscape: LandscapeParams::default(),
        }
    }
}

impl Parameters {
    /// Parameter set for a species
    #[inline]
    pub fn species(&self, species: Species) -> &SpeciesParams {
        match species {
            Species::Herbivore => &self.herbivore,
            Species::Carnivore => &self.carnivore,
        }
    }

    #[inline]
    pub fn species_mut(&mut self, species: Species) -> &mut SpeciesParams {
        match species {
            Species::Herbivore => &mut self.herbivore,
            Species::Carnivore => &mut self.carnivore,
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.herbivore.validate()?;
        self.carnivore.validate()?;
        if self.carnivore.delta_phi_max.is_none() {
            return Err(SimError::validation("carnivores require DeltaPhiMax"));
        }
        if self.herbivore.delta_phi_max.is_some() {
            return Err(SimError::domain("DeltaPhiMax only applies to species that hunt"));
        }
        self.landscape.validate()
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub parameters: Parameters,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Run settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationConfig {
    /// Seed for the random number generator
    pub seed: u64,
    /// Years to simulate
    pub years: u32,
    /// Years between stats snapshots
    pub stats_interval: u32,
}

/// Logging and checkpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Years between checkpoints
    pub checkpoint_interval: u32,
    /// Log level (error, warn, info, debug, trace)
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            parameters: Parameters::default(),
            simulation: SimulationConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 12345,
            years: 100,
            stats_interval: 1,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            checkpoint_interval: 50,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> std::result::Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a YAML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> std::result::Result<(), ConfigError> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        self.parameters.validate()?;
        if self.simulation.stats_interval == 0 {
            return Err(SimError::validation("stats_interval must be > 0"));
        }
        if self.logging.checkpoint_interval == 0 {
            return Err(SimError::validation("checkpoint_interval must be > 0"));
        }
        Ok(())
    }
}
