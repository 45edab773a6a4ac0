//! Normalization of perturbation deltas.
//!
//! All functions are pure. Division by a zero reference is not an error:
//! the resulting `inf`/`NaN` values flow through to the metrics layer, which
//! excludes them.

use serde::{Deserialize, Serialize};

/// How an output delta is scaled before metrics are computed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Normalization {
    /// Divide by the population standard deviation of the unperturbed values
    #[default]
    ByStd,
    /// Divide elementwise by the unperturbed value
    ByUnperturbed,
    /// Divide `|delta|` elementwise by `|unperturbed|`
    AbsoluteByUnperturbed,
}

impl Normalization {
    pub fn apply(self, delta: &[f64], unperturbed: &[f64]) -> Vec<f64> {
        match self {
            Normalization::ByStd => divide_by_std(delta, unperturbed),
            Normalization::ByUnperturbed => divide_by_unperturbed(delta, unperturbed),
            Normalization::AbsoluteByUnperturbed => {
                divide_absolute_by_unperturbed(delta, unperturbed)
            }
        }
    }
}

/// Population standard deviation (divisor `len`), ignoring `NaN` entries.
///
/// Returns `NaN` when no values remain.
pub fn population_std(values: &[f64]) -> f64 {
    let (sum, count) = values
        .iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        return f64::NAN;
    }
    let mean = sum / count as f64;
    let ss: f64 = values
        .iter()
        .filter(|v| !v.is_nan())
        .map(|v| (v - mean).powi(2))
        .sum();
    (ss / count as f64).sqrt()
}

pub fn divide_by_std(delta: &[f64], reference: &[f64]) -> Vec<f64> {
    let std = population_std(reference);
    delta.iter().map(|d| d / std).collect()
}

pub fn divide_by_unperturbed(delta: &[f64], unperturbed: &[f64]) -> Vec<f64> {
    delta.iter().zip(unperturbed).map(|(d, u)| d / u).collect()
}

pub fn divide_absolute_by_unperturbed(delta: &[f64], unperturbed: &[f64]) -> Vec<f64> {
    delta
        .iter()
        .zip(unperturbed)
        .map(|(d, u)| d.abs() / u.abs())
        .collect()
}
