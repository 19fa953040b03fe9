//! Initial population records.
//!
//! A population is an ordered list of `{loc, pop}` entries, where `pop` lists
//! `{species, age, weight}` records. Records can be read from JSON or YAML.

use crate::animal::{Animal, Species};
use crate::config::Parameters;
use crate::error::{Result, SimError};
use crate::island::Loc;
use serde::{Deserialize, Serialize};

/// One animal to be placed on the island
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimalSpec {
    pub species: Species,
    pub age: u32,
    pub weight: f64,
}

impl AnimalSpec {
    pub fn new(species: Species, age: u32, weight: f64) -> Self {
        Self {
            species,
            age,
            weight,
        }
    }

    /// Check the record without creating an animal
    pub fn validate(&self) -> Result<()> {
        if !self.weight.is_finite() || self.weight < 0.0 {
            return Err(SimError::validation(format!(
                "{} weight must be a finite non-negative number, got {}",
                self.species, self.weight
            )));
        }
        Ok(())
    }

    /// Build the animal, validating its weight
    pub fn build(&self, params: &Parameters) -> Result<Animal> {
        Animal::new(self.species, self.age, self.weight, params.species(self.species))
    }
}

/// Animals placed together at one location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationEntry {
    pub loc: Loc,
    pub pop: Vec<AnimalSpec>,
}

impl PopulationEntry {
    /// `count` identical animals at `loc`
    pub fn uniform(loc: Loc, species: Species, count: usize, age: u32, weight: f64) -> Self {
        Self {
            loc,
            pop: vec![AnimalSpec::new(species, age, weight); count],
        }
    }
}

/// Parse population entries from JSON
pub fn parse_json(text: &str) -> Result<Vec<PopulationEntry>> {
    serde_json::from_str(text)
        .map_err(|e| SimError::validation(format!("malformed population: {}", e)))
}

/// Parse population entries from YAML
pub fn parse_yaml(text: &str) -> Result<Vec<PopulationEntry>> {
    serde_yaml::from_str(text)
        .map_err(|e| SimError::validation(format!("malformed population: {}", e)))
}

/// The classic start: 150 herbivores and 40 carnivores, all aged 5 and weighing 20, at (10, 10)
pub fn default_population() -> Vec<PopulationEntry> {
    vec![
        PopulationEntry::uniform((10, 10), Species::Herbivore, 150, 5, 20.0),
        PopulationEntry::uniform((10, 10), Species::Carnivore, 40, 5, 20.0),
    ]
}
