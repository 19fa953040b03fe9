//! Fitness model: a logistic product of an age factor and a weight factor.

use crate::config::SpeciesParams;

/// Logistic factor `1 / (1 + exp(sign * phi * (x - x_half)))`
#[inline]
fn q(sign: f64, x: f64, x_half: f64, phi: f64) -> f64 {
    1.0 / (1.0 + (sign * phi * (x - x_half)).exp())
}

/// Fitness of an animal with the given age and weight, always in `[0, 1]`.
///
/// Zero for any non-positive weight. Decreases with age and increases with
/// weight, with `a_half`/`w_half` marking the half-way points.
#[inline]
pub fn fitness(age: u32, weight: f64, params: &SpeciesParams) -> f64 {
    if weight <= 0.0 {
        return 0.0;
    }
    let q_age = q(1.0, age as f64, params.a_half, params.phi_age);
    let q_weight = q(-1.0, weight, params.w_half, params.phi_weight);
    (q_age * q_weight).clamp(0.0, 1.0)
}
