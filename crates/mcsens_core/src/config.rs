//! Run configuration shared by the runners and the orchestrator.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SensitivityError};
use crate::normalize::Normalization;
use crate::sampling::{Covariance, PerturbationDistribution};

/// How the orchestrator schedules forward-process calls
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// All perturbation blocks stacked into one forward call
    #[default]
    Batched,
    /// Two forward calls for every (input, output) pair
    PerPair,
}

impl std::str::FromStr for ExecutionMode {
    type Err = SensitivityError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "batched" => Ok(ExecutionMode::Batched),
            "per_pair" | "per-pair" => Ok(ExecutionMode::PerPair),
            other => Err(SensitivityError::invalid(format!(
                "unknown execution mode '{other}'"
            ))),
        }
    }
}

/// Parameters of a sensitivity run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensitivityConfig {
    /// Perturbations drawn per input row
    pub n: usize,
    /// Fixed perturbation standard deviation. When unset, each input uses
    /// the population std of its own (missing-dropped) column.
    pub perturbation_std: Option<f64>,
    /// Centre of the perturbation distribution
    pub perturbation_mean: f64,
    pub distribution: PerturbationDistribution,
    pub seed: Option<u64>,
    pub mode: ExecutionMode,
    /// Scaling applied to output deltas
    pub normalization: Normalization,
    /// Drop records with a `NaN` in any computed column
    pub drop_missing: bool,
    /// Joint normal perturbations over the input variables
    pub covariance: Option<Covariance>,
}

impl Default for SensitivityConfig {
    fn default() -> Self {
        Self {
            n: 100,
            perturbation_std: None,
            perturbation_mean: 0.0,
            distribution: PerturbationDistribution::Normal,
            seed: None,
            mode: ExecutionMode::Batched,
            normalization: Normalization::ByStd,
            drop_missing: true,
            covariance: None,
        }
    }
}

impl SensitivityConfig {
    #[must_use]
    pub fn with_n(mut self, n: usize) -> Self {
        self.n = n;
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    #[must_use]
    pub fn with_std(mut self, std: f64) -> Self {
        self.perturbation_std = Some(std);
        self
    }

    #[must_use]
    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn with_normalization(mut self, normalization: Normalization) -> Self {
        self.normalization = normalization;
        self
    }

    #[must_use]
    pub fn with_covariance(mut self, covariance: Covariance) -> Self {
        self.covariance = Some(covariance);
        self
    }

    #[must_use]
    pub fn keep_missing(mut self) -> Self {
        self.drop_missing = false;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.n < 1 {
            return Err(SensitivityError::invalid(
                "perturbation count n must be at least 1",
            ));
        }
        if let Some(std) = self.perturbation_std
            && !(std.is_finite() && std >= 0.0)
        {
            return Err(SensitivityError::invalid(format!(
                "perturbation_std must be finite and non-negative, got {std}"
            )));
        }
        if !self.perturbation_mean.is_finite() {
            return Err(SensitivityError::invalid("perturbation_mean must be finite"));
        }
        if self.covariance.is_some() && self.perturbation_std.is_some() {
            return Err(SensitivityError::invalid(
                "perturbation_std and covariance cannot both be set",
            ));
        }
        if let Some(cov) = &self.covariance {
            cov.validate()?;
        }
        Ok(())
    }
}
