//! # BIOSIM
//!
//! Population dynamics of herbivores and carnivores on a grid island.
//!
//! ## Features
//!
//! - **Yearly cycle**: feeding, birth, migration, aging, weight loss, death
//! - **Predation**: carnivores hunt the weakest herbivores first
//! - **Configurable**: species and landscape parameters from YAML
//! - **Reproducible**: a single seeded generator drives every random draw
//! - **Resumable**: binary checkpoints carry the generator state
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use biosim::{default_population, BioSim, DEFAULT_MAP};
//!
//! let mut sim = BioSim::new(DEFAULT_MAP, &default_population(), 12345).unwrap();
//! sim.simulate(50).unwrap();
//!
//! println!("Year {}: {:?}", sim.year(), sim.num_animals_per_species());
//! ```
//!
//! ## Parameters
//!
//! ```rust
//! use biosim::Config;
//!
//! let mut config = Config::default();
//! config.parameters.herbivore.update([("F", 15.0), ("mu", 0.3)]).unwrap();
//! config.simulation.years = 200;
//! ```
//!
//! ## Checkpoints
//!
//! ```rust,no_run
//! use biosim::{default_population, BioSim, DEFAULT_MAP};
//! use biosim::checkpoint::Checkpoint;
//!
//! let mut sim = BioSim::new(DEFAULT_MAP, &default_population(), 1).unwrap();
//! sim.simulate(100).unwrap();
//!
//! sim.create_checkpoint().save("checkpoint.bin").unwrap();
//!
//! let loaded = Checkpoint::load("checkpoint.bin").unwrap();
//! let resumed = BioSim::from_checkpoint(loaded);
//! ```

pub mod animal;
pub mod cell;
pub mod checkpoint;
pub mod config;
pub mod error;
pub mod fitness;
pub mod island;
pub mod landscape;
pub mod population;
pub mod simulation;
pub mod stats;

// Re-export main types
pub use animal::{Animal, Species};
pub use cell::Cell;
pub use config::{Config, Parameters, SpeciesParams};
pub use error::{Result, SimError};
pub use island::{Island, Loc, DEFAULT_MAP};
pub use landscape::Terrain;
pub use population::{default_population, AnimalSpec, PopulationEntry};
pub use simulation::BioSim;
pub use stats::{CellCount, Stats};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Run a quick benchmark on the default island
pub fn benchmark(years: u32, seed: u64) -> Result<BenchmarkResult> {
    use std::time::Instant;

    let mut island = Island::build_from_map(DEFAULT_MAP, Parameters::default(), seed)?;
    island.place_population(&default_population())?;
    let initial_population = island.num_animals();

    let start = Instant::now();
    for _ in 0..years {
        island.run_one_cycle()?;
    }
    let elapsed = start.elapsed();

    Ok(BenchmarkResult {
        years,
        initial_population,
        final_population: island.num_animals(),
        elapsed_secs: elapsed.as_secs_f64(),
        years_per_second: years as f64 / elapsed.as_secs_f64().max(f64::EPSILON),
    })
}

/// Benchmark result
#[derive(Debug, Clone)]
pub struct BenchmarkResult {
    pub years: u32,
    pub initial_population: usize,
    pub final_population: usize,
    pub elapsed_secs: f64,
    pub years_per_second: f64,
}

impl std::fmt::Display for BenchmarkResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Benchmark Results ===")?;
        writeln!(f, "Years: {}", self.years)?;
        writeln!(f, "Population: {} -> {}", self.initial_population, self.final_population)?;
        writeln!(f, "Time: {:.3}s", self.elapsed_secs)?;
        writeln!(f, "Speed: {:.1} years/s", self.years_per_second)?;
        Ok(())
    }
}
