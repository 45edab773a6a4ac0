//! Perturbation draws.
//!
//! Independent draws come from a univariate [`PerturbationDistribution`].
//! Correlated draws use a [`Covariance`] over named variables, factored once
//! with Cholesky so each draw is `mean + L z` for iid standard normal `z`.

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal, StandardNormal, Uniform};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SensitivityError};

/// Shape of the univariate perturbation distribution
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PerturbationDistribution {
    #[default]
    Normal,
    /// Symmetric uniform with the same variance as the normal of equal `std`
    Uniform,
}

impl PerturbationDistribution {
    /// Draw `count` values with the given mean and standard deviation.
    pub fn sample_n<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        mean: f64,
        std_dev: f64,
        count: usize,
    ) -> Result<Vec<f64>> {
        let invalid = |reason: &str| {
            SensitivityError::invalid(format!(
                "invalid {self:?} perturbation (mean={mean}, std_dev={std_dev}): {reason}"
            ))
        };
        if !(std_dev.is_finite() && std_dev >= 0.0) {
            return Err(invalid("std_dev must be finite and non-negative"));
        }
        if !mean.is_finite() {
            return Err(invalid("mean must be finite"));
        }
        match self {
            PerturbationDistribution::Normal => {
                let dist =
                    Normal::new(mean, std_dev).map_err(|e| invalid(&e.to_string()))?;
                Ok(dist.sample_iter(rng).take(count).collect())
            }
            PerturbationDistribution::Uniform => {
                let half_width = std_dev * 3f64.sqrt();
                let dist = Uniform::new_inclusive(mean - half_width, mean + half_width)
                    .map_err(|e| invalid(&e.to_string()))?;
                Ok(dist.sample_iter(rng).take(count).collect())
            }
        }
    }
}

/// Covariance matrix over a set of named variables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Covariance {
    pub variables: Vec<String>,
    /// Row-major `k x k` matrix, `k = variables.len()`
    pub matrix: Vec<Vec<f64>>,
}

impl Covariance {
    pub fn new(variables: Vec<String>, matrix: Vec<Vec<f64>>) -> Self {
        Self { variables, matrix }
    }

    /// Independent variables with the given standard deviations.
    pub fn diagonal(variables: Vec<String>, std_devs: &[f64]) -> Result<Self> {
        if std_devs.len() != variables.len() {
            return Err(SensitivityError::invalid(format!(
                "{} standard deviations given for {} covariance variables",
                std_devs.len(),
                variables.len()
            )));
        }
        let matrix = std_devs
            .iter()
            .enumerate()
            .map(|(i, sd)| {
                let mut row = vec![0.0; std_devs.len()];
                row[i] = sd * sd;
                row
            })
            .collect();
        let cov = Self { variables, matrix };
        cov.validate()?;
        Ok(cov)
    }

    /// Check that the matrix is square over its variables, finite and symmetric
    /// with a non-negative diagonal.
    pub fn validate(&self) -> Result<()> {
        let k = self.variables.len();
        if k == 0 {
            return Err(SensitivityError::invalid("covariance has no variables"));
        }
        if self.matrix.len() != k || self.matrix.iter().any(|row| row.len() != k) {
            return Err(SensitivityError::invalid(format!(
                "covariance must be {k}x{k} to match its variables"
            )));
        }
        for (i, v) in self.variables.iter().enumerate() {
            if self.variables[..i].contains(v) {
                return Err(SensitivityError::invalid(format!(
                    "covariance variable '{v}' listed twice"
                )));
            }
        }
        for i in 0..k {
            for j in 0..k {
                let a = self.matrix[i][j];
                if !a.is_finite() {
                    return Err(SensitivityError::invalid(format!(
                        "covariance entry ({i}, {j}) is not finite"
                    )));
                }
                let b = self.matrix[j][i];
                if j < i && (a - b).abs() > 1e-9 * a.abs().max(b.abs()).max(1.0) {
                    return Err(SensitivityError::invalid(format!(
                        "covariance is not symmetric at ({i}, {j})"
                    )));
                }
            }
            if self.matrix[i][i] < 0.0 {
                return Err(SensitivityError::invalid(format!(
                    "covariance has a negative variance for '{}'",
                    self.variables[i]
                )));
            }
        }
        Ok(())
    }

    /// Position of `variable` in the matrix
    pub fn position(&self, variable: &str) -> Option<usize> {
        self.variables.iter().position(|v| v == variable)
    }

    /// Diagonal entry for `variable`.
    pub fn variance(&self, variable: &str) -> Result<f64> {
        self.validate()?;
        let i = self.position(variable).ok_or_else(|| {
            SensitivityError::invalid(format!("covariance has no entry for '{variable}'"))
        })?;
        Ok(self.matrix[i][i])
    }

    /// Validate and factor the matrix.
    pub fn factor(&self) -> Result<CholeskyFactor> {
        self.validate()?;
        cholesky(&self.matrix).map(|lower| CholeskyFactor { lower })
    }

    /// Restrict the matrix to `variables`, in that order.
    pub fn select(&self, variables: &[&str]) -> Result<Covariance> {
        self.validate()?;
        let idx = variables
            .iter()
            .map(|v| {
                self.position(v).ok_or_else(|| {
                    SensitivityError::invalid(format!("covariance has no entry for '{v}'"))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Covariance {
            variables: variables.iter().map(|v| v.to_string()).collect(),
            matrix: idx
                .iter()
                .map(|&i| idx.iter().map(|&j| self.matrix[i][j]).collect())
                .collect(),
        })
    }
}

/// Lower-triangular factor `L` with `L L^T = Σ`
#[derive(Debug, Clone)]
pub struct CholeskyFactor {
    lower: Vec<Vec<f64>>,
}

impl CholeskyFactor {
    pub fn dim(&self) -> usize {
        self.lower.len()
    }

    /// Draw one correlated vector centred on `mean`.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R, mean: f64) -> Vec<f64> {
        let z: Vec<f64> = (0..self.dim())
            .map(|_| {
                let z: f64 = StandardNormal.sample(rng);
                z
            })
            .collect();
        self.lower
            .iter()
            .map(|row| mean + row.iter().zip(&z).map(|(l, z)| l * z).sum::<f64>())
            .collect()
    }
}

/// Cholesky decomposition for positive semidefinite matrices.
///
/// Pivots within rounding of zero are clamped to zero so that singular
/// (e.g. perfectly correlated) covariances still factor.
fn cholesky(a: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
    let n = a.len();
    let mut l = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in 0..=i {
            let sum: f64 = (0..j).map(|k| l[i][k] * l[j][k]).sum();
            if i == j {
                let pivot = a[i][i] - sum;
                let tol = 1e-12 * a[i][i].abs().max(1.0);
                if pivot < -tol || pivot.is_nan() {
                    return Err(SensitivityError::invalid(
                        "covariance is not positive semidefinite",
                    ));
                }
                l[i][i] = pivot.max(0.0).sqrt();
            } else if l[j][j] > 0.0 {
                l[i][j] = (a[i][j] - sum) / l[j][j];
            }
        }
    }
    Ok(l)
}

/// Seed for a run: the caller's, or a fresh one that is logged for replay.
pub fn resolve_seed(seed: Option<u64>) -> u64 {
    seed.unwrap_or_else(|| {
        let seed = rand::random::<u64>();
        tracing::debug!(seed, "no seed supplied, drew one");
        seed
    })
}

pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}
