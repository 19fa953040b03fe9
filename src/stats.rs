//! Statistics tracking for the simulation.

use crate::animal::Species;
use crate::island::{CycleReport, Island, Loc};
use serde::{Deserialize, Serialize};

/// Animal counts in one cell
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellCount {
    pub loc: Loc,
    pub herbivores: usize,
    pub carnivores: usize,
}

impl CellCount {
    #[inline]
    pub fn total(&self) -> usize {
        self.herbivores + self.carnivores
    }
}

/// Summary of one species at a point in time
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SpeciesStats {
    pub count: usize,
    pub fitness_mean: f64,
    pub age_mean: f64,
    pub weight_mean: f64,
}

impl SpeciesStats {
    fn from_island(island: &Island, species: Species) -> Self {
        let fitness = island.fitness_values(species);
        let ages: Vec<f64> = island.ages(species).into_iter().map(f64::from).collect();
        let weights = island.weights(species);
        Self {
            count: fitness.len(),
            fitness_mean: mean(&fitness),
            age_mean: mean(&ages),
            weight_mean: mean(&weights),
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Statistics snapshot for a simulated year
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    /// Years simulated so far
    pub year: u32,
    pub herbivores: SpeciesStats,
    pub carnivores: SpeciesStats,
    /// Births in the last cycle
    pub births: usize,
    /// Herbivores eaten in the last cycle
    pub kills: usize,
    /// Animals that changed cell in the last cycle
    pub migrations: usize,
    /// Deaths in the last cycle (predation excluded)
    pub deaths: usize,
    /// Total fodder left in the cells after the last cycle
    pub total_fodder: f64,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update stats from the island and the report of its last cycle
    pub fn update(&mut self, island: &Island, report: &CycleReport) {
        self.year = island.year();
        self.herbivores = SpeciesStats::from_island(island, Species::Herbivore);
        self.carnivores = SpeciesStats::from_island(island, Species::Carnivore);
        self.births = report.births;
        self.kills = report.kills;
        self.migrations = report.migrations;
        self.deaths = report.deaths;
        self.total_fodder = island.cells().map(|(_, cell)| cell.fodder()).sum();
    }

    /// Snapshot of an island without cycle counters
    pub fn from_island(island: &Island) -> Self {
        let mut stats = Self::new();
        stats.update(island, &CycleReport::default());
        stats
    }

    pub fn species(&self, species: Species) -> &SpeciesStats {
        match species {
            Species::Herbivore => &self.herbivores,
            Species::Carnivore => &self.carnivores,
        }
    }

    /// Total number of animals
    pub fn population(&self) -> usize {
        self.herbivores.count + self.carnivores.count
    }

    /// Save stats to JSON file
    pub fn save_json(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
    }

    /// Load stats from JSON file
    pub fn load_json(path: &str) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Format stats as a one-line summary
    pub fn summary(&self) -> String {
        format!(
            "Y:{:5} | Herb:{:5} (fit {:.2}, w {:.1}) | Carn:{:5} (fit {:.2}, w {:.1}) | B:{} K:{} M:{} D:{}",
            self.year,
            self.herbivores.count,
            self.herbivores.fitness_mean,
            self.herbivores.weight_mean,
            self.carnivores.count,
            self.carnivores.fitness_mean,
            self.carnivores.weight_mean,
            self.births,
            self.kills,
            self.migrations,
            self.deaths,
        )
    }
}

/// Historical statistics tracker
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StatsHistory {
    /// All recorded stats snapshots
    pub snapshots: Vec<Stats>,
    /// Recording interval in years
    pub interval: u32,
}

impl StatsHistory {
    /// Create new history with recording interval
    pub fn new(interval: u32) -> Self {
        Self {
            snapshots: Vec::new(),
            interval: interval.max(1),
        }
    }

    /// Does a snapshot belong to this history at `year`?
    pub fn should_record(&self, year: u32) -> bool {
        year % self.interval.max(1) == 0
    }

    /// Record a stats snapshot
    pub fn record(&mut self, stats: Stats) {
        self.snapshots.push(stats);
    }

    /// Latest snapshot recorded at or before `year`
    pub fn get_at(&self, year: u32) -> Option<&Stats> {
        self.snapshots.iter().rev().find(|s| s.year <= year)
    }

    pub fn latest(&self) -> Option<&Stats> {
        self.snapshots.last()
    }

    /// `(year, herbivores, carnivores)` over time
    pub fn population_series(&self) -> Vec<(u32, usize, usize)> {
        self.snapshots
            .iter()
            .map(|s| (s.year, s.herbivores.count, s.carnivores.count))
            .collect()
    }

    /// Mean fitness of one species over time
    pub fn fitness_series(&self, species: Species) -> Vec<(u32, f64)> {
        self.snapshots
            .iter()
            .map(|s| (s.year, s.species(species).fitness_mean))
            .collect()
    }

    /// Mean weight of one species over time
    pub fn weight_series(&self, species: Species) -> Vec<(u32, f64)> {
        self.snapshots
            .iter()
            .map(|s| (s.year, s.species(species).weight_mean))
            .collect()
    }

    /// Save history to file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string(self)?;
        std::fs::write(path, json)
    }

    /// Load history from file
    pub fn load(path: &str) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Parameters;
    use crate::population::PopulationEntry;

    fn island() -> Island {
        let mut island =
            Island::build_from_map("WWWW\nWLHW\nWWWW", Parameters::default(), 5).unwrap();
        island
            .place_population(&[
                PopulationEntry::uniform((2, 2), Species::Herbivore, 4, 2, 10.0),
                PopulationEntry::uniform((2, 3), Species::Carnivore, 2, 6, 30.0),
            ])
            .unwrap();
        island
    }

    #[test]
    fn test_stats_from_island() {
        let stats = Stats::from_island(&island());

        assert_eq!(stats.year, 0);
        assert_eq!(stats.population(), 6);
        assert_eq!(stats.herbivores.count, 4);
        assert_eq!(stats.herbivores.age_mean, 2.0);
        assert_eq!(stats.carnivores.weight_mean, 30.0);
        assert!(stats.carnivores.fitness_mean > 0.0);
        assert!(stats.summary().contains("Herb:    4"));
    }

    #[test]
    fn test_stats_after_cycle() {
        let mut island = island();
        let report = island.run_one_cycle().unwrap();
        let mut stats = Stats::new();
        stats.update(&island, &report);

        assert_eq!(stats.year, 1);
        assert_eq!(stats.births, report.births);
        assert_eq!(stats.population(), island.num_animals());
    }

    #[test]
    fn test_empty_species_means_are_zero() {
        let island = Island::build_from_map("WWW\nWLW\nWWW", Parameters::default(), 1).unwrap();
        let stats = Stats::from_island(&island);
        assert_eq!(stats.herbivores, SpeciesStats::default());
    }

    #[test]
    fn test_stats_history() {
        let mut history = StatsHistory::new(10);

        for i in 0..5u32 {
            let mut stats = Stats::new();
            stats.year = i * 10;
            stats.herbivores.count = (i as usize + 1) * 100;
            history.record(stats);
        }

        let series = history.population_series();
        assert_eq!(series.len(), 5);
        assert_eq!(series[0], (0, 100, 0));
        assert_eq!(series[4], (40, 500, 0));
        assert_eq!(history.get_at(25).unwrap().year, 20);
        assert!(history.should_record(30));
        assert!(!history.should_record(31));
    }

    #[test]
    fn test_stats_json_roundtrip() {
        let stats = Stats::from_island(&island());
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.json").to_string_lossy().to_string();

        stats.save_json(&path).unwrap();
        let loaded = Stats::load_json(&path).unwrap();
        assert_eq!(loaded.herbivores.count, stats.herbivores.count);
        assert_eq!(loaded.carnivores.age_mean, stats.carnivores.age_mean);
    }

    #[test]
    fn test_history_save_load() {
        let mut island = island();
        let mut history = StatsHistory::new(2);
        history.record(Stats::from_island(&island));
        let report = island.run_one_cycle().unwrap();
        let mut stats = Stats::new();
        stats.update(&island, &report);
        history.record(stats);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json").to_string_lossy().to_string();
        history.save(&path).unwrap();
        let loaded = StatsHistory::load(&path).unwrap();

        assert_eq!(loaded.interval, 2);
        assert_eq!(loaded.snapshots.len(), 2);
        assert_eq!(loaded.latest().unwrap().births, report.births);
        assert_eq!(loaded.population_series(), history.population_series());

        std::fs::write(&path, "not json").unwrap();
        let err = StatsHistory::load(&path).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_species_series() {
        let mut island = island();
        let mut history = StatsHistory::new(1);
        history.record(Stats::from_island(&island));
        for _ in 0..3 {
            let report = island.run_one_cycle().unwrap();
            let mut stats = Stats::new();
            stats.update(&island, &report);
            history.record(stats);
        }

        let weights = history.weight_series(Species::Carnivore);
        assert_eq!(weights.len(), 4);
        assert_eq!(weights[0], (0, 30.0));
        let years: Vec<u32> = history.fitness_series(Species::Herbivore).iter().map(|p| p.0).collect();
        assert_eq!(years, vec![0, 1, 2, 3]);
        assert_eq!(history.latest().unwrap().year, 3);
    }

    #[test]
    fn test_cell_count_total() {
        let count = CellCount {
            loc: (2, 2),
            herbivores: 3,
            carnivores: 4,
        };
        assert_eq!(count.total(), 7);
    }
}
