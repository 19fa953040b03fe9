//! A single grid cell: its terrain, its fodder and the animals living on it.
//!
//! Every per-cell phase of the yearly cycle lives here. Phases that remove or
//! add animals first decide the full set of changes, then apply them in one
//! pass, so no collection is mutated while it is being walked.

use crate::animal::{Animal, AnimalId, Species};
use crate::config::{LandscapeParams, Parameters, SpeciesParams};
use crate::error::{Result, SimError};
use crate::island::Loc;
use crate::landscape::Terrain;
use crate::population::AnimalSpec;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Animals leaving a cell, grouped by destination
pub type Departures = BTreeMap<Loc, Vec<AnimalId>>;

/// One landscape unit of the island
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Cell {
    terrain: Terrain,
    fodder: f64,
    herbivores: Vec<Animal>,
    carnivores: Vec<Animal>,
}

impl Cell {
    /// Create an empty cell. Fodder starts at zero and is grown before each feeding.
    pub fn new(terrain: Terrain) -> Self {
        Self {
            terrain,
            fodder: 0.0,
            herbivores: Vec::new(),
            carnivores: Vec::new(),
        }
    }

    #[inline]
    pub fn terrain(&self) -> Terrain {
        self.terrain
    }

    #[inline]
    pub fn fodder(&self) -> f64 {
        self.fodder
    }

    #[inline]
    pub fn is_habitable(&self) -> bool {
        self.terrain.is_habitable()
    }

    #[inline]
    pub fn herbivores(&self) -> &[Animal] {
        &self.herbivores
    }

    #[inline]
    pub fn carnivores(&self) -> &[Animal] {
        &self.carnivores
    }

    /// Animals of one species
    #[inline]
    pub fn animals(&self, species: Species) -> &[Animal] {
        match species {
            Species::Herbivore => &self.herbivores,
            Species::Carnivore => &self.carnivores,
        }
    }

    fn animals_mut(&mut self, species: Species) -> &mut Vec<Animal> {
        match species {
            Species::Herbivore => &mut self.herbivores,
            Species::Carnivore => &mut self.carnivores,
        }
    }

    /// All animals, herbivores first
    pub fn iter_animals(&self) -> impl Iterator<Item = &Animal> {
        self.herbivores.iter().chain(self.carnivores.iter())
    }

    #[inline]
    pub fn n_herbivores(&self) -> usize {
        self.herbivores.len()
    }

    #[inline]
    pub fn n_carnivores(&self) -> usize {
        self.carnivores.len()
    }

    #[inline]
    pub fn n_animals(&self) -> usize {
        self.herbivores.len() + self.carnivores.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.n_animals() == 0
    }

    /// Place new animals in the cell.
    ///
    /// Either every record is placed or none is: a malformed record fails with
    /// a validation error, and any placement on sea fails with a domain error.
    pub fn place_animals(&mut self, records: &[AnimalSpec], params: &Parameters) -> Result<()> {
        if !self.is_habitable() {
            return Err(SimError::domain("animals cannot be placed in the sea"));
        }
        let animals = records
            .iter()
            .map(|spec| spec.build(params))
            .collect::<Result<Vec<_>>>()?;
        for animal in animals {
            self.animals_mut(animal.species()).push(animal);
        }
        Ok(())
    }

    /// Reset fodder to the terrain's yearly maximum
    pub fn grow_fodder(&mut self, landscape: &LandscapeParams) {
        if self.terrain.grows_fodder() {
            self.fodder = landscape.f_max(self.terrain);
        }
    }

    /// Yearly feeding: grow fodder, then herbivores graze, then carnivores hunt
    pub fn feed_all<R: Rng + ?Sized>(&mut self, params: &Parameters, rng: &mut R) -> Result<()> {
        self.grow_fodder(&params.landscape);
        self.feed_herbivores(&params.herbivore, rng)?;
        self.feed_carnivores(&params.carnivore, rng)
    }

    /// Herbivores graze in random order until the fodder runs out
    pub fn feed_herbivores<R: Rng + ?Sized>(
        &mut self,
        params: &SpeciesParams,
        rng: &mut R,
    ) -> Result<()> {
        self.herbivores.shuffle(rng);
        for herbivore in self.herbivores.iter_mut() {
            if self.fodder <= 0.0 {
                break;
            }
            let eaten = herbivore.eat(self.fodder, params)?;
            self.fodder -= eaten;
        }
        Ok(())
    }

    /// Carnivores hunt, fittest first, each preferring the weakest herbivores.
    ///
    /// A herbivore killed by one carnivore is out of reach for every carnivore
    /// hunting after it.
    pub fn feed_carnivores<R: Rng + ?Sized>(
        &mut self,
        params: &SpeciesParams,
        rng: &mut R,
    ) -> Result<()> {
        if self.carnivores.is_empty() || self.herbivores.is_empty() {
            return Ok(());
        }

        self.herbivores
            .sort_by(|a, b| a.fitness().total_cmp(&b.fitness()));
        self.carnivores
            .sort_by(|a, b| b.fitness().total_cmp(&a.fitness()));

        let mut killed = vec![false; self.herbivores.len()];
        for hunter in self.carnivores.iter_mut() {
            let live: Vec<usize> = (0..killed.len()).filter(|&i| !killed[i]).collect();
            if live.is_empty() {
                break;
            }
            let prey: Vec<&Animal> = live.iter().map(|&i| &self.herbivores[i]).collect();
            let hunt = hunter.hunt(&prey, params, rng)?;
            for pos in hunt.killed {
                killed[live[pos]] = true;
            }
        }

        let mut flags = killed.into_iter();
        self.herbivores.retain(|_| !flags.next().unwrap_or(false));
        Ok(())
    }

    /// Every animal of a species with at least two members tries to give birth.
    /// Newborns join only after all members have tried.
    pub fn birth_cycle<R: Rng + ?Sized>(&mut self, params: &Parameters, rng: &mut R) -> usize {
        let mut born = 0;
        for species in Species::ALL {
            let species_params = params.species(species);
            let animals = self.animals_mut(species);
            let n = animals.len();
            if n < 2 {
                continue;
            }
            let newborns: Vec<Animal> = animals
                .iter_mut()
                .filter_map(|parent| parent.attempt_birth(n, species_params, rng))
                .collect();
            born += newborns.len();
            animals.extend(newborns);
        }
        born
    }

    /// Every animal ages one year
    pub fn age_animals(&mut self, params: &Parameters) {
        for animal in self.herbivores.iter_mut() {
            animal.age_one_year(&params.herbivore);
        }
        for animal in self.carnivores.iter_mut() {
            animal.age_one_year(&params.carnivore);
        }
    }

    /// Every animal loses its yearly share of weight
    pub fn weight_loss_cell(&mut self, params: &Parameters) {
        for animal in self.herbivores.iter_mut() {
            animal.lose_weight(&params.herbivore);
        }
        for animal in self.carnivores.iter_mut() {
            animal.lose_weight(&params.carnivore);
        }
    }

    /// Decide who dies, then remove them all at once. Returns the number of deaths.
    pub fn death_in_cell<R: Rng + ?Sized>(&mut self, params: &Parameters, rng: &mut R) -> usize {
        let mut deaths = 0;
        for species in Species::ALL {
            let species_params = params.species(species);
            let animals = self.animals_mut(species);
            let dies: Vec<bool> = animals
                .iter()
                .map(|animal| animal.attempt_death(species_params, rng))
                .collect();
            let before = animals.len();
            let mut flags = dies.into_iter();
            animals.retain(|_| !flags.next().unwrap_or(false));
            deaths += before - animals.len();
        }
        deaths
    }

    /// Decide which animals leave this year and where they go.
    ///
    /// Each animal not yet considered this year moves with its migration
    /// probability to one of the four `neighbours`, picked uniformly. All
    /// animals present are then marked as considered. The cell itself is not
    /// changed otherwise: departures are applied by the caller through
    /// [`Cell::remove_emigrants`] and [`Cell::add_immigrants`].
    pub fn emigration<R: Rng + ?Sized>(
        &mut self,
        neighbours: &[Loc],
        params: &Parameters,
        rng: &mut R,
    ) -> Result<Departures> {
        if neighbours.len() != 4 {
            return Err(SimError::validation(format!(
                "expected 4 neighbouring cells, got {}",
                neighbours.len()
            )));
        }
        for (i, a) in neighbours.iter().enumerate() {
            if neighbours[i + 1..].contains(a) {
                return Err(SimError::validation(format!(
                    "neighbour {:?} listed twice",
                    a
                )));
            }
        }

        let mut departures = Departures::new();
        for animal in self.herbivores.iter_mut().chain(self.carnivores.iter_mut()) {
            if animal.has_migrated() {
                continue;
            }
            if animal.attempt_migrate(params.species(animal.species()), rng) {
                let destination = neighbours[rng.gen_range(0..neighbours.len())];
                departures.entry(destination).or_default().push(animal.id());
            }
            animal.set_migrated(true);
        }
        Ok(departures)
    }

    /// Take the animals with the given ids out of the cell
    pub fn remove_emigrants(&mut self, ids: &[AnimalId]) -> Vec<Animal> {
        let ids: HashSet<AnimalId> = ids.iter().copied().collect();
        let mut leaving = Vec::with_capacity(ids.len());
        for species in Species::ALL {
            let animals = self.animals_mut(species);
            let (gone, stay): (Vec<Animal>, Vec<Animal>) = std::mem::take(animals)
                .into_iter()
                .partition(|animal| ids.contains(&animal.id()));
            *animals = stay;
            leaving.extend(gone);
        }
        leaving
    }

    /// Welcome animals arriving from a neighbouring cell
    pub fn add_immigrants(&mut self, animals: Vec<Animal>) -> Result<()> {
        if !self.is_habitable() {
            return Err(SimError::domain("animals cannot migrate into the sea"));
        }
        for animal in animals {
            self.animals_mut(animal.species()).push(animal);
        }
        Ok(())
    }

    /// Make every animal eligible for migration again
    pub fn reset_migration(&mut self) {
        for animal in self.herbivores.iter_mut().chain(self.carnivores.iter_mut()) {
            animal.set_migrated(false);
        }
    }

    /// Largest animal id in the cell, if any
    pub(crate) fn max_animal_id(&self) -> Option<AnimalId> {
        self.iter_animals().map(Animal::id).max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn always() -> StepRng {
        StepRng::new(0, 0)
    }

    fn specs(species: Species, n: usize, age: u32, weight: f64) -> Vec<AnimalSpec> {
        (0..n)
            .map(|_| AnimalSpec {
                species,
                age,
                weight,
            })
            .collect()
    }

    fn populated(terrain: Terrain, herbs: usize, carns: usize, weight: f64) -> Cell {
        let params = Parameters::default();
        let mut cell = Cell::new(terrain);
        cell.place_animals(&specs(Species::Herbivore, herbs, 5, weight), &params)
            .unwrap();
        cell.place_animals(&specs(Species::Carnivore, carns, 5, weight), &params)
            .unwrap();
        cell
    }

    const NEIGHBOURS: [Loc; 4] = [(1, 2), (3, 2), (2, 1), (2, 3)];

    #[test]
    fn test_place_animals() {
        let cell = populated(Terrain::Lowland, 40, 10, 20.0);
        assert_eq!(cell.n_herbivores(), 40);
        assert_eq!(cell.n_carnivores(), 10);
        assert_eq!(cell.n_animals(), 50);
    }

    #[test]
    fn test_place_in_sea_fails() {
        let params = Parameters::default();
        let mut sea = Cell::new(Terrain::Sea);
        let err = sea
            .place_animals(&specs(Species::Herbivore, 3, 5, 20.0), &params)
            .unwrap_err();
        assert!(matches!(err, SimError::Domain(_)));
        assert!(sea.is_empty());
    }

    #[test]
    fn test_place_malformed_is_atomic() {
        let params = Parameters::default();
        let mut cell = Cell::new(Terrain::Highland);
        let mut records = specs(Species::Herbivore, 3, 5, 20.0);
        records.push(AnimalSpec {
            species: Species::Herbivore,
            age: 1,
            weight: -4.0,
        });

        let err = cell.place_animals(&records, &params).unwrap_err();
        assert!(matches!(err, SimError::Validation(_)));
        assert!(cell.is_empty());
    }

    #[test]
    fn test_grow_fodder_idempotent() {
        let landscape = LandscapeParams::default();
        let mut cell = Cell::new(Terrain::Lowland);
        cell.grow_fodder(&landscape);
        cell.grow_fodder(&landscape);
        assert_eq!(cell.fodder(), landscape.lowland_f_max);

        let mut desert = Cell::new(Terrain::Desert);
        desert.grow_fodder(&landscape);
        assert_eq!(desert.fodder(), 0.0);
    }

    #[test]
    fn test_herbivores_eat_until_fodder_gone() {
        let mut params = Parameters::default();
        params.landscape.highland_f_max = 25.0;
        let mut cell = populated(Terrain::Highland, 5, 0, 20.0);
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        cell.feed_all(&params, &mut rng).unwrap();

        assert_eq!(cell.fodder(), 0.0);
        let full = cell
            .herbivores()
            .iter()
            .filter(|h| (h.weight() - (20.0 + 0.9 * 10.0)).abs() < 1e-9)
            .count();
        let partial = cell
            .herbivores()
            .iter()
            .filter(|h| (h.weight() - (20.0 + 0.9 * 5.0)).abs() < 1e-9)
            .count();
        let hungry = cell.herbivores().iter().filter(|h| h.weight() == 20.0).count();
        assert_eq!((full, partial, hungry), (2, 1, 2));
    }

    #[test]
    fn test_no_grazing_in_desert() {
        let params = Parameters::default();
        let mut cell = populated(Terrain::Desert, 5, 0, 20.0);
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        cell.feed_all(&params, &mut rng).unwrap();
        assert!(cell.herbivores().iter().all(|h| h.weight() == 20.0));
    }

    #[test]
    fn test_carnivores_hunt_weakest_first() {
        let mut params = Parameters::default();
        params.carnivore.delta_phi_max = Some(1e-6);
        params.carnivore.appetite = 5.0;
        let mut cell = Cell::new(Terrain::Desert);
        cell.place_animals(
            &[
                AnimalSpec {
                    species: Species::Herbivore,
                    age: 5,
                    weight: 8.0,
                },
                AnimalSpec {
                    species: Species::Herbivore,
                    age: 5,
                    weight: 2.0,
                },
                AnimalSpec {
                    species: Species::Carnivore,
                    age: 5,
                    weight: 30.0,
                },
            ],
            &params,
        )
        .unwrap();

        cell.feed_all(&params, &mut always()).unwrap();

        // The appetite of 5 is filled by the 2 kg herbivore and 3 kg of the other
        assert_eq!(cell.n_herbivores(), 0);
        let hunter = &cell.carnivores()[0];
        assert!((hunter.weight() - (30.0 + 0.75 * 5.0)).abs() < 1e-9);
    }

    #[test]
    fn test_killed_herbivores_unavailable_to_later_hunters() {
        let mut params = Parameters::default();
        params.carnivore.delta_phi_max = Some(1e-6);
        let mut cell = populated(Terrain::Desert, 1, 3, 30.0);
        // One feeble herbivore, three strong hunters
        cell.herbivores = vec![Animal::new(Species::Herbivore, 80, 1.0, &params.herbivore).unwrap()];

        cell.feed_all(&params, &mut always()).unwrap();

        assert_eq!(cell.n_herbivores(), 0);
        let fed = cell
            .carnivores()
            .iter()
            .filter(|c| c.weight() > 30.0)
            .count();
        assert_eq!(fed, 1);
    }

    #[test]
    fn test_carnivores_sorted_fittest_first() {
        let mut params = Parameters::default();
        params.carnivore.delta_phi_max = Some(1e-6);
        let mut cell = Cell::new(Terrain::Desert);
        cell.place_animals(
            &[
                AnimalSpec {
                    species: Species::Carnivore,
                    age: 5,
                    weight: 6.0,
                },
                AnimalSpec {
                    species: Species::Carnivore,
                    age: 5,
                    weight: 40.0,
                },
                AnimalSpec {
                    species: Species::Herbivore,
                    age: 90,
                    weight: 1.0,
                },
            ],
            &params,
        )
        .unwrap();

        cell.feed_all(&params, &mut always()).unwrap();

        // Only the heavier, fitter carnivore got the single prey
        let fitness: Vec<f64> = cell.carnivores().iter().map(Animal::fitness).collect();
        assert!(fitness[0] >= fitness[1]);
        assert!(cell.carnivores()[0].weight() > 40.0);
        assert_eq!(cell.carnivores()[1].weight(), 6.0);
    }

    #[test]
    fn test_birth_cycle_adds_newborns() {
        let params = Parameters::default();
        let mut cell = populated(Terrain::Lowland, 2, 2, 100.0);

        let born = cell.birth_cycle(&params, &mut always());

        assert_eq!(born, 4);
        assert_eq!(cell.n_herbivores(), 4);
        assert_eq!(cell.n_carnivores(), 4);
        let newborn_ages: Vec<u32> = cell
            .iter_animals()
            .filter(|a| a.age() == 0)
            .map(Animal::age)
            .collect();
        assert_eq!(newborn_ages.len(), 4);
    }

    #[test]
    fn test_single_animal_never_breeds() {
        let params = Parameters::default();
        let mut cell = populated(Terrain::Lowland, 1, 1, 100.0);

        assert_eq!(cell.birth_cycle(&params, &mut always()), 0);
        assert_eq!(cell.n_animals(), 2);
    }

    #[test]
    fn test_age_and_weight_loss() {
        let params = Parameters::default();
        let mut cell = populated(Terrain::Lowland, 10, 10, 10.0);

        cell.age_animals(&params);
        cell.weight_loss_cell(&params);

        assert!(cell.iter_animals().all(|a| a.age() == 6));
        assert!(cell.herbivores().iter().all(|h| h.weight() < 10.0));
        assert!(cell.carnivores().iter().all(|c| c.weight() < 10.0));
    }

    #[test]
    fn test_death_removes_weightless() {
        let params = Parameters::default();
        let mut cell = Cell::new(Terrain::Lowland);
        cell.place_animals(
            &[
                AnimalSpec {
                    species: Species::Herbivore,
                    age: 5,
                    weight: 0.0,
                },
                AnimalSpec {
                    species: Species::Herbivore,
                    age: 5,
                    weight: 100.0,
                },
                AnimalSpec {
                    species: Species::Herbivore,
                    age: 3,
                    weight: 0.0,
                },
                AnimalSpec {
                    species: Species::Carnivore,
                    age: 2,
                    weight: 0.0,
                },
            ],
            &params,
        )
        .unwrap();

        // Draws just below 1.0: only certain deaths happen
        let deaths = cell.death_in_cell(&params, &mut StepRng::new(u64::MAX, 0));

        assert_eq!(deaths, 3);
        assert_eq!(cell.n_herbivores(), 1);
        assert_eq!(cell.n_carnivores(), 0);
        assert_eq!(cell.herbivores()[0].weight(), 100.0);
    }

    #[test]
    fn test_emigration_rejects_bad_neighbours() {
        let params = Parameters::default();
        let mut cell = populated(Terrain::Lowland, 3, 0, 20.0);
        let mut rng = ChaCha8Rng::seed_from_u64(5);

        let err = cell
            .emigration(&NEIGHBOURS[..3], &params, &mut rng)
            .unwrap_err();
        assert!(matches!(err, SimError::Validation(_)));

        let twice = [(1, 2), (1, 2), (2, 1), (2, 3)];
        assert!(matches!(
            cell.emigration(&twice, &params, &mut rng),
            Err(SimError::Validation(_))
        ));
    }

    #[test]
    fn test_emigration_marks_everyone_once() {
        let params = Parameters::default();
        let mut cell = populated(Terrain::Lowland, 20, 5, 20.0);

        let departures = cell.emigration(&NEIGHBOURS, &params, &mut always()).unwrap();
        let leaving: usize = departures.values().map(Vec::len).sum();
        assert_eq!(leaving, 25);
        assert!(departures.keys().all(|loc| NEIGHBOURS.contains(loc)));
        assert!(cell.iter_animals().all(Animal::has_migrated));

        // Already considered this year: nobody is picked again
        let again = cell.emigration(&NEIGHBOURS, &params, &mut always()).unwrap();
        assert!(again.is_empty());

        cell.reset_migration();
        assert!(cell.iter_animals().all(|a| !a.has_migrated()));
    }

    #[test]
    fn test_emigration_leaves_cell_untouched() {
        let params = Parameters::default();
        let mut cell = populated(Terrain::Lowland, 10, 0, 20.0);

        let departures = cell.emigration(&NEIGHBOURS, &params, &mut always()).unwrap();
        assert!(!departures.is_empty());
        assert_eq!(cell.n_herbivores(), 10);
    }

    #[test]
    fn test_move_between_cells_by_identity() {
        let mut source = populated(Terrain::Lowland, 4, 2, 20.0);
        let mut destination = Cell::new(Terrain::Desert);

        let ids: Vec<AnimalId> = vec![source.herbivores()[1].id(), source.carnivores()[0].id()];
        let movers = source.remove_emigrants(&ids);
        assert_eq!(movers.len(), 2);
        destination.add_immigrants(movers).unwrap();

        assert_eq!(source.n_herbivores(), 3);
        assert_eq!(source.n_carnivores(), 1);
        assert_eq!(destination.n_herbivores(), 1);
        assert_eq!(destination.n_carnivores(), 1);
        assert!(source.iter_animals().all(|a| !ids.contains(&a.id())));

        let mut sea = Cell::new(Terrain::Sea);
        let err = sea.add_immigrants(source.remove_emigrants(&ids)).unwrap_err();
        assert!(matches!(err, SimError::Domain(_)));
    }
}
