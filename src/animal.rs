//! Animals and their yearly lifecycle rules.
//!
//! An animal owns its age, weight and fitness. Fitness is recomputed whenever
//! age or weight change, so it is always consistent with the fitness formula.
//! Species-specific constants are not stored per animal; every operation takes
//! the species' [`SpeciesParams`] by reference.

use crate::config::SpeciesParams;
use crate::error::{Result, SimError};
use crate::fitness::fitness;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

/// Unique animal identifier
pub type AnimalId = u64;

static NEXT_ANIMAL_ID: AtomicU64 = AtomicU64::new(0);

fn next_animal_id() -> AnimalId {
    NEXT_ANIMAL_ID.fetch_add(1, Ordering::Relaxed)
}

/// Make sure freshly created animals never reuse an id up to `id`.
/// Needed after restoring animals from a checkpoint.
pub(crate) fn reserve_ids_through(id: AnimalId) {
    NEXT_ANIMAL_ID.fetch_max(id.saturating_add(1), Ordering::Relaxed);
}

/// The two species living on the island
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Species {
    Herbivore,
    Carnivore,
}

impl Species {
    pub const ALL: [Species; 2] = [Species::Herbivore, Species::Carnivore];

    pub fn name(&self) -> &'static str {
        match self {
            Species::Herbivore => "Herbivore",
            Species::Carnivore => "Carnivore",
        }
    }

    /// Whether this species preys on herbivores
    #[inline]
    pub fn can_hunt(&self) -> bool {
        matches!(self, Species::Carnivore)
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Species {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Herbivore" => Ok(Species::Herbivore),
            "Carnivore" => Ok(Species::Carnivore),
            other => Err(SimError::validation(format!("unknown species '{}'", other))),
        }
    }
}

/// Outcome of one carnivore's hunt
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Hunt {
    /// Positions, in the prey slice handed to [`Animal::hunt`], of the herbivores killed
    pub killed: Vec<usize>,
    /// Total weight the hunter put on
    pub weight_gained: f64,
}

/// An animal in the simulation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Animal {
    id: AnimalId,
    species: Species,
    age: u32,
    weight: f64,
    fitness: f64,
    has_migrated: bool,
}

impl Animal {
    /// Create an animal with the given age and weight.
    ///
    /// Fails with a validation error if the weight is negative or not finite.
    pub fn new(species: Species, age: u32, weight: f64, params: &SpeciesParams) -> Result<Self> {
        if !weight.is_finite() || weight < 0.0 {
            return Err(SimError::validation(format!(
                "{} weight must be a finite non-negative number, got {}",
                species, weight
            )));
        }
        Ok(Self::with_weight(species, age, weight, params))
    }

    /// Create a newborn (age 0) with a weight drawn from the species' birth distribution
    pub fn newborn<R: Rng + ?Sized>(species: Species, params: &SpeciesParams, rng: &mut R) -> Self {
        let weight = birth_weight(params, rng);
        Self::with_weight(species, 0, weight, params)
    }

    fn with_weight(species: Species, age: u32, weight: f64, params: &SpeciesParams) -> Self {
        Self {
            id: next_animal_id(),
            species,
            age,
            weight,
            fitness: fitness(age, weight, params),
            has_migrated: false,
        }
    }

    #[inline]
    pub fn id(&self) -> AnimalId {
        self.id
    }

    #[inline]
    pub fn species(&self) -> Species {
        self.species
    }

    #[inline]
    pub fn age(&self) -> u32 {
        self.age
    }

    #[inline]
    pub fn weight(&self) -> f64 {
        self.weight
    }

    #[inline]
    pub fn fitness(&self) -> f64 {
        self.fitness
    }

    /// Whether the animal has already been considered for migration this year
    #[inline]
    pub fn has_migrated(&self) -> bool {
        self.has_migrated
    }

    #[inline]
    pub(crate) fn set_migrated(&mut self, migrated: bool) {
        self.has_migrated = migrated;
    }

    #[inline]
    fn update_fitness(&mut self, params: &SpeciesParams) {
        self.fitness = fitness(self.age, self.weight, params);
    }

    /// Eat from `available` food; returns the amount actually eaten.
    ///
    /// At most the appetite `F` is eaten, and weight grows by `beta` per unit eaten.
    pub fn eat(&mut self, available: f64, params: &SpeciesParams) -> Result<f64> {
        if available.is_nan() || available < 0.0 {
            return Err(SimError::validation(format!(
                "available food must be non-negative, got {}",
                available
            )));
        }
        let eaten = available.min(params.appetite);
        self.weight += params.beta * eaten;
        self.update_fitness(params);
        Ok(eaten)
    }

    /// One year older
    pub fn age_one_year(&mut self, params: &SpeciesParams) {
        self.age += 1;
        self.update_fitness(params);
    }

    /// Yearly weight loss of `eta * weight`
    pub fn lose_weight(&mut self, params: &SpeciesParams) {
        self.weight -= params.eta * self.weight;
        self.update_fitness(params);
    }

    /// Try to give birth, given `n` animals of the same species in the cell.
    ///
    /// The mother must weigh at least `zeta * (w_birth + sigma_birth)`. Birth
    /// happens with probability `min(1, gamma * fitness * (n - 1))`, and only
    /// if the mother can afford losing `xi` times the newborn's weight.
    pub fn attempt_birth<R: Rng + ?Sized>(
        &mut self,
        n: usize,
        params: &SpeciesParams,
        rng: &mut R,
    ) -> Option<Animal> {
        if self.weight < params.zeta * (params.w_birth + params.sigma_birth) {
            return None;
        }

        let p = (params.gamma * self.fitness * (n as f64 - 1.0)).min(1.0);
        if rng.gen::<f64>() >= p {
            return None;
        }

        let newborn = Self::newborn(self.species, params, rng);
        let loss = params.xi * newborn.weight;
        if loss >= self.weight {
            return None;
        }

        self.weight -= loss;
        self.update_fitness(params);
        Some(newborn)
    }

    /// Whether the animal dies this year. Certain when weight is zero,
    /// otherwise with probability `omega * (1 - fitness)`.
    pub fn attempt_death<R: Rng + ?Sized>(&self, params: &SpeciesParams, rng: &mut R) -> bool {
        if self.weight <= 0.0 {
            return true;
        }
        rng.gen::<f64>() < params.omega * (1.0 - self.fitness)
    }

    /// Whether the animal wants to move this year, with probability `mu * fitness`
    pub fn attempt_migrate<R: Rng + ?Sized>(&self, params: &SpeciesParams, rng: &mut R) -> bool {
        rng.gen::<f64>() < params.mu * self.fitness
    }

    /// Hunt through `prey`, which must be ordered weakest first.
    ///
    /// The hunt stops at the first herbivore at least as fit as the hunter, or
    /// once the appetite is filled. A fitness advantage of `DeltaPhiMax` or more
    /// kills for certain; smaller advantages kill with probability
    /// `advantage / DeltaPhiMax`. Each kill feeds the hunter
    /// `beta * min(prey weight, remaining appetite)`.
    pub fn hunt<R: Rng + ?Sized>(
        &mut self,
        prey: &[&Animal],
        params: &SpeciesParams,
        rng: &mut R,
    ) -> Result<Hunt> {
        if !self.species.can_hunt() {
            return Err(SimError::domain(format!("{} does not hunt", self.species)));
        }
        let delta_phi_max = params
            .delta_phi_max
            .ok_or_else(|| SimError::domain("hunting requires DeltaPhiMax"))?;

        let mut hunt = Hunt::default();
        let mut appetite = params.appetite;

        for (idx, herbivore) in prey.iter().enumerate() {
            if appetite <= 0.0 {
                break;
            }
            let advantage = self.fitness - herbivore.fitness;
            if advantage <= 0.0 {
                break;
            }
            let kills = advantage >= delta_phi_max || rng.gen::<f64>() < advantage / delta_phi_max;
            if !kills {
                continue;
            }

            let eaten = herbivore.weight.min(appetite);
            appetite -= eaten;
            let gained = params.beta * eaten;
            self.weight += gained;
            self.update_fitness(params);

            hunt.killed.push(idx);
            hunt.weight_gained += gained;
        }

        Ok(hunt)
    }
}

/// Birth weight drawn from `Normal(w_birth, sigma_birth)`, clamped at zero
fn birth_weight<R: Rng + ?Sized>(params: &SpeciesParams, rng: &mut R) -> f64 {
    sample_normal(rng, params.w_birth, params.sigma_birth).max(0.0)
}

/// Draw from a normal distribution using the Box-Muller transform
pub fn sample_normal<R: Rng + ?Sized>(rng: &mut R, mean: f64, std_dev: f64) -> f64 {
    let u1: f64 = rng.gen::<f64>().max(f64::EPSILON);
    let u2: f64 = rng.gen();
    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    mean + std_dev * z
}
