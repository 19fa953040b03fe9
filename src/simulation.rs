//! High-level simulation driver.
//!
//! [`BioSim`] owns an [`Island`], runs it year by year and keeps the
//! statistics of the run.

use crate::animal::Species;
use crate::checkpoint::Checkpoint;
use crate::config::{Config, Parameters};
use crate::error::Result;
use crate::island::Island;
use crate::landscape::Terrain;
use crate::population::PopulationEntry;
use crate::stats::{CellCount, Stats, StatsHistory};
use std::collections::BTreeMap;

/// A complete simulation run
pub struct BioSim {
    island: Island,
    stats: Stats,
    history: StatsHistory,
    stop_on_extinction: bool,
}

impl BioSim {
    /// Create a simulation with default parameters
    pub fn new(map: &str, population: &[PopulationEntry], seed: u64) -> Result<Self> {
        Self::with_parameters(map, population, Parameters::default(), seed, 1)
    }

    /// Create a simulation from a loaded configuration
    pub fn from_config(map: &str, population: &[PopulationEntry], config: &Config) -> Result<Self> {
        config.validate()?;
        Self::with_parameters(
            map,
            population,
            config.parameters.clone(),
            config.simulation.seed,
            config.simulation.stats_interval,
        )
    }

    pub fn with_parameters(
        map: &str,
        population: &[PopulationEntry],
        params: Parameters,
        seed: u64,
        stats_interval: u32,
    ) -> Result<Self> {
        let mut island = Island::build_from_map(map, params, seed)?;
        island.place_population(population)?;

        let stats = Stats::from_island(&island);
        let mut history = StatsHistory::new(stats_interval);
        history.record(stats.clone());

        Ok(Self {
            island,
            stats,
            history,
            stop_on_extinction: false,
        })
    }

    /// Resume from checkpoint
    pub fn from_checkpoint(checkpoint: Checkpoint) -> Self {
        let stats = checkpoint
            .history
            .latest()
            .filter(|s| s.year == checkpoint.island.year())
            .cloned()
            .unwrap_or_else(|| Stats::from_island(&checkpoint.island));

        Self {
            island: checkpoint.island,
            stats,
            history: checkpoint.history,
            stop_on_extinction: false,
        }
    }

    /// Create checkpoint of current state
    pub fn create_checkpoint(&self) -> Checkpoint {
        Checkpoint::new(self.island.clone(), self.history.clone())
    }

    /// Stop `simulate` early once every animal has died
    pub fn set_stop_on_extinction(&mut self, stop: bool) {
        self.stop_on_extinction = stop;
    }

    /// Update parameters of the species called `species` ("Herbivore" or "Carnivore")
    pub fn set_animal_parameters(&mut self, species: &str, changes: &BTreeMap<String, f64>) -> Result<()> {
        let species: Species = species.parse()?;
        self.island
            .set_animal_parameters(species, changes.iter().map(|(k, v)| (k.as_str(), *v)))
    }

    /// Update parameters of the terrain with map code `code`
    pub fn set_landscape_parameters(&mut self, code: char, changes: &BTreeMap<String, f64>) -> Result<()> {
        let terrain = Terrain::from_code(code)?;
        self.island
            .set_landscape_parameters(terrain, changes.iter().map(|(k, v)| (k.as_str(), *v)))
    }

    /// Place more animals on the island
    pub fn add_population(&mut self, population: &[PopulationEntry]) -> Result<()> {
        self.island.place_population(population)?;
        self.stats = Stats::from_island(&self.island);
        Ok(())
    }

    /// Run for `years` more years
    pub fn simulate(&mut self, years: u32) -> Result<()> {
        self.simulate_with_callback(years, |_, _| {})
    }

    /// Run for `years` more years, calling `callback` after each one
    pub fn simulate_with_callback<F>(&mut self, years: u32, mut callback: F) -> Result<()>
    where
        F: FnMut(&BioSim, &Stats),
    {
        log::info!(
            "Simulating {} years from year {} ({} animals)",
            years,
            self.year(),
            self.num_animals()
        );

        for _ in 0..years {
            let report = self.island.run_one_cycle()?;
            self.stats.update(&self.island, &report);
            if self.history.should_record(self.island.year()) {
                self.history.record(self.stats.clone());
            }
            callback(self, &self.stats);

            if self.stop_on_extinction && self.island.is_extinct() {
                log::warn!("All animals died out in year {}", self.year());
                break;
            }
        }

        log::info!(
            "Reached year {}: {} herbivores, {} carnivores",
            self.year(),
            self.stats.herbivores.count,
            self.stats.carnivores.count
        );
        Ok(())
    }

    /// Last year simulated
    #[inline]
    pub fn year(&self) -> u32 {
        self.island.year()
    }

    pub fn num_animals(&self) -> usize {
        self.island.num_animals()
    }

    /// Animal count keyed by species name
    pub fn num_animals_per_species(&self) -> BTreeMap<String, usize> {
        self.island
            .num_animals_per_species()
            .into_iter()
            .map(|(species, count)| (species.name().to_string(), count))
            .collect()
    }

    /// Per-cell animal counts, row-major
    pub fn animal_distribution(&self) -> Vec<CellCount> {
        self.island.animal_distribution()
    }

    /// Statistics of the last simulated year
    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn stats_history(&self) -> &StatsHistory {
        &self.history
    }

    pub fn island(&self) -> &Island {
        &self.island
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SimError;
    use crate::island::DEFAULT_MAP;
    use crate::population::default_population;

    fn small_sim(seed: u64) -> BioSim {
        let map = "WWWWW\nWLLHW\nWLDLW\nWWWWW";
        let population = vec![
            PopulationEntry::uniform((2, 2), Species::Herbivore, 40, 5, 20.0),
            PopulationEntry::uniform((2, 2), Species::Carnivore, 5, 5, 20.0),
        ];
        BioSim::new(map, &population, seed).unwrap()
    }

    #[test]
    fn test_simulate_advances_year() {
        let mut sim = small_sim(1);
        assert_eq!(sim.year(), 0);

        sim.simulate(3).unwrap();
        assert_eq!(sim.year(), 3);
        sim.simulate(2).unwrap();
        assert_eq!(sim.year(), 5);
        assert_eq!(sim.stats().year, 5);
        assert_eq!(sim.stats_history().snapshots.len(), 6);
    }

    #[test]
    fn test_callback_sees_every_year() {
        let mut sim = small_sim(2);
        let mut years = Vec::new();
        sim.simulate_with_callback(4, |sim, stats| {
            assert_eq!(sim.year(), stats.year);
            years.push(stats.year);
        })
        .unwrap();
        assert_eq!(years, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_counts() {
        let sim = small_sim(3);
        let counts = sim.num_animals_per_species();
        assert_eq!(counts["Herbivore"], 40);
        assert_eq!(counts["Carnivore"], 5);
        assert_eq!(sim.num_animals(), 45);

        let distribution = sim.animal_distribution();
        assert_eq!(distribution.iter().map(CellCount::total).sum::<usize>(), 45);
    }

    #[test]
    fn test_parameter_setters() {
        let mut sim = small_sim(4);
        let changes = BTreeMap::from([("omega".to_string(), 0.5)]);
        sim.set_animal_parameters("Carnivore", &changes).unwrap();
        assert_eq!(sim.island().params().carnivore.omega, 0.5);

        assert!(matches!(
            sim.set_animal_parameters("Dragon", &changes),
            Err(SimError::Validation(_))
        ));

        let fodder = BTreeMap::from([("f_max".to_string(), 500.0)]);
        sim.set_landscape_parameters('L', &fodder).unwrap();
        assert_eq!(sim.island().params().landscape.lowland_f_max, 500.0);
        assert!(matches!(
            sim.set_landscape_parameters('W', &fodder),
            Err(SimError::Domain(_))
        ));
    }

    #[test]
    fn test_stop_on_extinction() {
        let map = "WWW\nWDW\nWWW";
        let population = vec![PopulationEntry::uniform((2, 2), Species::Herbivore, 3, 1, 0.0)];
        let mut sim = BioSim::new(map, &population, 5).unwrap();
        sim.set_stop_on_extinction(true);

        sim.simulate(10).unwrap();
        assert_eq!(sim.num_animals(), 0);
        assert_eq!(sim.year(), 1);
    }

    #[test]
    fn test_add_population_after_start() {
        let mut sim = BioSim::new(DEFAULT_MAP, &[], 6).unwrap();
        assert_eq!(sim.num_animals(), 0);
        sim.add_population(&default_population()).unwrap();
        assert_eq!(sim.num_animals(), 190);
        assert_eq!(sim.stats().population(), 190);
    }

    #[test]
    fn test_checkpoint_resume_matches_uninterrupted_run() {
        let mut straight = small_sim(9);
        straight.simulate(6).unwrap();

        let mut first = small_sim(9);
        first.simulate(3).unwrap();
        let mut resumed = BioSim::from_checkpoint(first.create_checkpoint());
        resumed.simulate(3).unwrap();

        assert_eq!(resumed.year(), 6);
        assert_eq!(resumed.num_animals_per_species(), straight.num_animals_per_species());
        assert_eq!(
            resumed.island().weights(Species::Herbivore),
            straight.island().weights(Species::Herbivore)
        );
    }
}
