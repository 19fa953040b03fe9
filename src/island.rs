//! The island: a grid of cells and the yearly cycle driving them.
//!
//! A year runs in a fixed sequence of phases, each finishing on every cell
//! before the next begins:
//!
//! 1. Feeding (fodder regrows, herbivores graze, carnivores hunt)
//! 2. Birth
//! 3. Migration to the four neighbouring cells
//! 4. Aging
//! 5. Weight loss
//! 6. Death
//! 7. Reset of migration flags, and the year counter advances
//!
//! All randomness comes from one seeded generator owned by the island, so a
//! run is fully determined by its map, population, parameters and seed.

use crate::animal::{reserve_ids_through, Animal, Species};
use crate::cell::Cell;
use crate::config::Parameters;
use crate::error::{Result, SimError};
use crate::landscape::Terrain;
use crate::population::PopulationEntry;
use crate::stats::CellCount;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 1-indexed `(row, column)` position on the island
pub type Loc = (usize, usize);

/// The classic island used by the default simulation
pub const DEFAULT_MAP: &str = "\
WWWWWWWWWWWWWWWWWWWWW
WWWWWWWWHWWWWLLLLLLLW
WHHHHHLLLLWWLLLLLLLWW
WHHHHHHHHHWWLLLLLLWWW
WHHHHHLLLLLLLLLLLLWWW
WHHHHHLLLDDLLLHLLLWWW
WHHLLLLLDDDLLLHHHHWWW
WWHHHHLLLDDLLLHWWWWWW
WHHHLLLLLDDLLLLLLLWWW
WHHHHLLLLDDLLLLWWWWWW
WWHHHHLLLLLLLLWWWWWWW
WWWHHHHLLLLLLLWWWWWWW
WWWWWWWWWWWWWWWWWWWWW";

/// What happened during one yearly cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleReport {
    /// Year just completed (the island's year counter after the cycle)
    pub year: u32,
    pub births: usize,
    /// Herbivores killed by carnivores
    pub kills: usize,
    pub migrations: usize,
    pub deaths: usize,
}

/// Parse a textual map into rows of terrain.
///
/// Every row must have the same length, every character must be a known
/// terrain code, and the outer border must be sea.
pub fn parse_map(map: &str) -> Result<Vec<Vec<Terrain>>> {
    let lines: Vec<&str> = map.trim().lines().map(str::trim).collect();
    if lines.is_empty() || lines[0].is_empty() {
        return Err(SimError::validation("map is empty"));
    }

    let width = lines[0].chars().count();
    if let Some((row, line)) = lines
        .iter()
        .enumerate()
        .find(|(_, line)| line.chars().count() != width)
    {
        return Err(SimError::validation(format!(
            "every map row must have length {}, row {} has length {}",
            width,
            row + 1,
            line.chars().count()
        )));
    }

    let rows = lines
        .iter()
        .map(|line| line.chars().map(Terrain::from_code).collect::<Result<Vec<_>>>())
        .collect::<Result<Vec<_>>>()?;

    let last_row = rows.len() - 1;
    let last_col = width - 1;
    for (r, row) in rows.iter().enumerate() {
        for (c, terrain) in row.iter().enumerate() {
            let on_border = r == 0 || r == last_row || c == 0 || c == last_col;
            if on_border && *terrain != Terrain::Sea {
                return Err(SimError::validation(format!(
                    "island must be surrounded by water, found {:?} at ({}, {})",
                    terrain,
                    r + 1,
                    c + 1
                )));
            }
        }
    }

    Ok(rows)
}

/// The four cells sharing an edge with `loc`
fn neighbours((row, col): Loc) -> Option<[Loc; 4]> {
    Some([
        (row.checked_sub(1)?, col),
        (row + 1, col),
        (row, col.checked_sub(1)?),
        (row, col + 1),
    ])
}

/// The simulated island
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Island {
    cells: BTreeMap<Loc, Cell>,
    n_rows: usize,
    n_cols: usize,
    params: Parameters,
    rng: ChaCha8Rng,
    seed: u64,
    year: u32,
}

impl Island {
    /// Build an island from its textual map.
    ///
    /// The random generator is seeded here, once, for the whole run.
    pub fn build_from_map(map: &str, params: Parameters, seed: u64) -> Result<Self> {
        params.validate()?;
        let rows = parse_map(map)?;
        let n_rows = rows.len();
        let n_cols = rows[0].len();

        let cells = rows
            .into_iter()
            .enumerate()
            .flat_map(|(r, row)| {
                row.into_iter()
                    .enumerate()
                    .map(move |(c, terrain)| ((r + 1, c + 1), Cell::new(terrain)))
            })
            .collect();

        log::debug!("Island built: {}x{} cells, seed {}", n_rows, n_cols, seed);

        Ok(Self {
            cells,
            n_rows,
            n_cols,
            params,
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
            year: 0,
        })
    }

    /// Place animals on the island.
    ///
    /// Every entry is checked before anything is placed, so a failure leaves
    /// the island unchanged: an unknown location is a lookup error, a sea
    /// location a domain error and a malformed record a validation error.
    pub fn place_population(&mut self, entries: &[PopulationEntry]) -> Result<()> {
        for entry in entries {
            let cell = self.cells.get(&entry.loc).ok_or_else(|| {
                SimError::lookup(format!("{:?} is not on the island", entry.loc))
            })?;
            if !cell.is_habitable() {
                return Err(SimError::domain(format!(
                    "cannot place animals in the sea at {:?}",
                    entry.loc
                )));
            }
            for spec in &entry.pop {
                spec.validate()?;
            }
        }

        for entry in entries {
            if let Some(cell) = self.cells.get_mut(&entry.loc) {
                cell.place_animals(&entry.pop, &self.params)?;
            }
        }
        Ok(())
    }

    /// Run one full year
    pub fn run_one_cycle(&mut self) -> Result<CycleReport> {
        let herbivores_before = self.num_herbivores();
        self.feed()?;
        let kills = herbivores_before - self.num_herbivores();

        let births = self.procreate();
        let migrations = self.migrate()?;
        self.age();
        self.lose_weight();
        let deaths = self.die();
        self.reset_migration();
        self.year += 1;

        let report = CycleReport {
            year: self.year,
            births,
            kills,
            migrations,
            deaths,
        };
        log::debug!(
            "Year {}: herbivores={} carnivores={} births={} kills={} migrations={} deaths={}",
            self.year,
            self.num_herbivores(),
            self.num_carnivores(),
            births,
            kills,
            migrations,
            deaths
        );
        Ok(report)
    }

    fn feed(&mut self) -> Result<()> {
        for cell in self.cells.values_mut().filter(|c| c.is_habitable()) {
            cell.feed_all(&self.params, &mut self.rng)?;
        }
        Ok(())
    }

    fn procreate(&mut self) -> usize {
        self.cells
            .values_mut()
            .filter(|c| c.is_habitable())
            .map(|cell| cell.birth_cycle(&self.params, &mut self.rng))
            .sum()
    }

    /// Move animals between neighbouring cells. Animals heading for the sea
    /// or off the grid stay where they are. Returns the number of animals moved.
    fn migrate(&mut self) -> Result<usize> {
        let locs: Vec<Loc> = self
            .cells
            .iter()
            .filter(|(_, cell)| cell.is_habitable())
            .map(|(loc, _)| *loc)
            .collect();

        let mut moved = 0;
        for loc in locs {
            let Some(around) = neighbours(loc) else {
                continue;
            };
            let departures = match self.cells.get_mut(&loc) {
                Some(cell) if !cell.is_empty() => {
                    cell.emigration(&around, &self.params, &mut self.rng)?
                }
                _ => continue,
            };

            for (destination, ids) in departures {
                let accepts = self
                    .cells
                    .get(&destination)
                    .is_some_and(Cell::is_habitable);
                if !accepts {
                    continue;
                }
                let movers = match self.cells.get_mut(&loc) {
                    Some(source) => source.remove_emigrants(&ids),
                    None => continue,
                };
                moved += movers.len();
                if let Some(target) = self.cells.get_mut(&destination) {
                    target.add_immigrants(movers)?;
                }
            }
        }
        Ok(moved)
    }

    fn age(&mut self) {
        for cell in self.cells.values_mut() {
            cell.age_animals(&self.params);
        }
    }

    fn lose_weight(&mut self) {
        for cell in self.cells.values_mut() {
            cell.weight_loss_cell(&self.params);
        }
    }

    fn die(&mut self) -> usize {
        self.cells
            .values_mut()
            .map(|cell| cell.death_in_cell(&self.params, &mut self.rng))
            .sum()
    }

    fn reset_migration(&mut self) {
        for cell in self.cells.values_mut() {
            cell.reset_migration();
        }
    }

    /// Update the parameters of one species for every animal on the island
    pub fn set_animal_parameters<'a, I>(&mut self, species: Species, changes: I) -> Result<()>
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        self.params.species_mut(species).update(changes)?;
        log::info!("Updated {} parameters", species);
        Ok(())
    }

    /// Update the parameters of one terrain kind
    pub fn set_landscape_parameters<'a, I>(&mut self, terrain: Terrain, changes: I) -> Result<()>
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        self.params.landscape.update(terrain, changes)?;
        log::info!("Updated {:?} parameters", terrain);
        Ok(())
    }

    /// Make sure animals born after a restore get fresh ids
    pub(crate) fn reserve_animal_ids(&self) {
        if let Some(max) = self.cells.values().filter_map(Cell::max_animal_id).max() {
            reserve_ids_through(max);
        }
    }

    #[inline]
    pub fn year(&self) -> u32 {
        self.year
    }

    #[inline]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    #[inline]
    pub fn params(&self) -> &Parameters {
        &self.params
    }

    /// Map dimensions as `(rows, columns)`
    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.n_rows, self.n_cols)
    }

    pub fn cell(&self, loc: Loc) -> Option<&Cell> {
        self.cells.get(&loc)
    }

    /// Cells in row-major order
    pub fn cells(&self) -> impl Iterator<Item = (&Loc, &Cell)> {
        self.cells.iter()
    }

    pub fn num_herbivores(&self) -> usize {
        self.cells.par_iter().map(|(_, c)| c.n_herbivores()).sum()
    }

    pub fn num_carnivores(&self) -> usize {
        self.cells.par_iter().map(|(_, c)| c.n_carnivores()).sum()
    }

    pub fn num_animals(&self) -> usize {
        self.cells.par_iter().map(|(_, c)| c.n_animals()).sum()
    }

    pub fn num_animals_per_species(&self) -> BTreeMap<Species, usize> {
        BTreeMap::from([
            (Species::Herbivore, self.num_herbivores()),
            (Species::Carnivore, self.num_carnivores()),
        ])
    }

    pub fn is_extinct(&self) -> bool {
        self.num_animals() == 0
    }

    /// Per-cell animal counts, row-major
    pub fn animal_distribution(&self) -> Vec<CellCount> {
        self.cells
            .par_iter()
            .map(|(loc, cell)| CellCount {
                loc: *loc,
                herbivores: cell.n_herbivores(),
                carnivores: cell.n_carnivores(),
            })
            .collect()
    }

    /// Per-species counts laid out as a `rows x columns` grid
    pub fn density_grid(&self, species: Species) -> Vec<Vec<usize>> {
        let mut grid = vec![vec![0; self.n_cols]; self.n_rows];
        for ((row, col), cell) in &self.cells {
            grid[row - 1][col - 1] = cell.animals(species).len();
        }
        grid
    }

    fn collect<T, F>(&self, species: Species, value: F) -> Vec<T>
    where
        T: Send,
        F: Fn(&Animal) -> T + Sync,
    {
        self.cells
            .par_iter()
            .flat_map_iter(|(_, cell)| cell.animals(species).iter().map(&value))
            .collect()
    }

    /// Fitness of every animal of a species
    pub fn fitness_values(&self, species: Species) -> Vec<f64> {
        self.collect(species, Animal::fitness)
    }

    /// Age of every animal of a species
    pub fn ages(&self, species: Species) -> Vec<u32> {
        self.collect(species, Animal::age)
    }

    /// Weight of every animal of a species
    pub fn weights(&self, species: Species) -> Vec<f64> {
        self.collect(species, Animal::weight)
    }
}
