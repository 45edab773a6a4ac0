//! Monte Carlo sensitivity analysis library
//!
//! This crate measures how strongly each input variable of an opaque model
//! drives each of its output variables. Input rows are replicated, the
//! chosen inputs are perturbed with random draws, and the model is run on
//! both the original and the perturbed rows. It supports:
//! - A pluggable model: anything implementing [`ForwardProcess`], including closures
//! - Single-variable, batched (one stacked forward call) and simultaneous runners
//! - Normal or uniform perturbations, optionally correlated through a covariance
//! - Per-variable missing-value handling
//! - Correlation, r2 and mean normalized change per (input, output) pair
//!
//! # Example
//!
//! ```ignore
//! use mcsens_core::{SensitivityConfig, Table, sensitivity_analysis};
//!
//! let table = Table::from_columns([("x", vec![1.0, 2.0, 3.0, 4.0])])?;
//! let mut model = |t: &Table| -> Result<Table, mcsens_core::ForwardError> {
//!     let y = t.require("x")?.iter().map(|x| 2.0 * x + 1.0).collect();
//!     Ok(t.clone().with_column("y", y)?)
//! };
//! let results = sensitivity_analysis(
//!     &table,
//!     &["x"],
//!     &["y"],
//!     &mut model,
//!     &SensitivityConfig::default().with_seed(42),
//! )?;
//! ```

#![warn(clippy::all)]

// ============================================================================
// Core modules
// ============================================================================

pub mod analysis;
pub mod error;
pub mod forward;
pub mod metrics;
pub mod normalize;
pub mod replicate;
pub mod runner;
pub mod sampling;

// ============================================================================
// Type definition modules
// ============================================================================

pub mod config;
pub mod record;
pub mod table;

// ============================================================================
// Test modules
// ============================================================================

#[cfg(test)]
mod tests;

// ============================================================================
// Public re-exports for convenience
// ============================================================================

pub use analysis::{SensitivityResults, sensitivity_analysis, summarize};
pub use config::{ExecutionMode, SensitivityConfig};
pub use error::{ForwardError, ForwardStage, Result, SensitivityError};
pub use forward::{CountingProcess, ForwardProcess};
pub use metrics::{
    MetricRecord, MetricTable, PairMetrics, SensitivityMetric, compute_metrics, pearson,
    r_squared,
};
pub use normalize::{
    Normalization, divide_absolute_by_unperturbed, divide_by_std, divide_by_unperturbed,
    population_std,
};
pub use record::{PerturbationRecord, PerturbationTable};
pub use replicate::{Replicated, replicate_rows};
pub use runner::{perturb_batched, perturb_simultaneously, perturb_single};
pub use sampling::{Covariance, PerturbationDistribution};
pub use table::Table;
