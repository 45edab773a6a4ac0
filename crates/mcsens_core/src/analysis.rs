//! Sensitivity orchestration: runs a runner over every requested
//! (input, output) pair and summarizes each pair's records.
//!
//! # Failure policy
//!
//! Fail-fast. Variable, table and config problems are reported before the
//! first forward call. A failure while running any pair aborts the whole
//! analysis; in per-pair mode the error is wrapped in
//! [`SensitivityError::Pair`] naming the pair. Partial results are never
//! returned.

use rand::RngCore;
#[cfg(feature = "parallel")]
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use serde::{Deserialize, Serialize};

use crate::config::{ExecutionMode, SensitivityConfig};
use crate::error::Result;
use crate::forward::ForwardProcess;
use crate::metrics::{MetricTable, PairMetrics, SensitivityMetric, compute_metrics};
use crate::record::PerturbationTable;
use crate::runner::{check_variables, perturb_batched, perturb_single, usable_rows};
use crate::sampling::{resolve_seed, seeded_rng};
use crate::table::Table;

/// Output of [`sensitivity_analysis`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityResults {
    pub input_variables: Vec<String>,
    pub output_variables: Vec<String>,
    /// Wide table, one row per simulated perturbation instance
    pub perturbations: PerturbationTable,
    /// Long table, one row per metric per pair
    pub metrics: MetricTable,
}

impl SensitivityResults {
    /// One metric as an outputs x inputs grid, in request order.
    pub fn metric_matrix(&self, metric: SensitivityMetric) -> Vec<Vec<f64>> {
        let inputs: Vec<&str> = self.input_variables.iter().map(String::as_str).collect();
        let outputs: Vec<&str> = self.output_variables.iter().map(String::as_str).collect();
        self.metrics.matrix(metric, &inputs, &outputs)
    }
}

/// Run a Monte Carlo sensitivity analysis of `process`.
///
/// In [`ExecutionMode::Batched`] the forward process is invoked exactly
/// twice regardless of the number of pairs. In [`ExecutionMode::PerPair`]
/// it is invoked twice per pair, each pair seeded from one master RNG.
pub fn sensitivity_analysis<P>(
    input: &Table,
    input_variables: &[&str],
    output_variables: &[&str],
    process: &mut P,
    config: &SensitivityConfig,
) -> Result<SensitivityResults>
where
    P: ForwardProcess + ?Sized,
{
    config.validate()?;
    check_variables(input, input_variables, output_variables)?;
    for v in input_variables {
        usable_rows(input, v)?;
    }
    if let Some(cov) = &config.covariance {
        cov.select(input_variables)?.factor()?;
    }

    let pairs = input_variables.len() * output_variables.len();
    let forward_calls = match config.mode {
        ExecutionMode::Batched => 2,
        ExecutionMode::PerPair => 2 * pairs,
    };
    tracing::info!(
        pairs,
        n = config.n,
        mode = ?config.mode,
        forward_calls,
        "starting sensitivity analysis"
    );

    let perturbations = match config.mode {
        ExecutionMode::Batched => {
            perturb_batched(input, input_variables, output_variables, process, config)?
        }
        ExecutionMode::PerPair => {
            let mut rng = seeded_rng(resolve_seed(config.seed));
            let mut table = PerturbationTable::default();
            for &inp in input_variables {
                for &out in output_variables {
                    let pair_config = SensitivityConfig {
                        seed: Some(rng.next_u64()),
                        ..config.clone()
                    };
                    let records = perturb_single(input, inp, out, process, &pair_config)
                        .map_err(|e| e.in_pair(inp, out))?;
                    table.extend(records);
                }
            }
            table
        }
    };

    let metrics = summarize(&perturbations, input_variables, output_variables);

    tracing::info!(
        records = perturbations.len(),
        metrics = metrics.len(),
        "sensitivity analysis complete"
    );
    Ok(SensitivityResults {
        input_variables: input_variables.iter().map(|s| s.to_string()).collect(),
        output_variables: output_variables.iter().map(|s| s.to_string()).collect(),
        perturbations,
        metrics,
    })
}

/// Compute the metric table for every pair of a perturbation table.
pub fn summarize(
    perturbations: &PerturbationTable,
    input_variables: &[&str],
    output_variables: &[&str],
) -> MetricTable {
    let pairs: Vec<(&str, &str)> = input_variables
        .iter()
        .flat_map(|&i| output_variables.iter().map(move |&o| (i, o)))
        .collect();
    let pair_metrics = |&(input, output): &(&str, &str)| -> PairMetrics {
        let (xs, ys) = perturbations.normalized_pair(input, output);
        let metrics = compute_metrics(&xs, &ys);
        if !metrics.is_defined() {
            tracing::warn!(
                input,
                output,
                usable_rows = metrics.usable_rows,
                "insufficient variation; correlation and r2 are undefined"
            );
        }
        metrics
    };

    #[cfg(feature = "parallel")]
    let computed: Vec<PairMetrics> = pairs.par_iter().map(pair_metrics).collect();
    #[cfg(not(feature = "parallel"))]
    let computed: Vec<PairMetrics> = pairs.iter().map(pair_metrics).collect();

    let mut table = MetricTable::default();
    for ((input, output), metrics) in pairs.iter().zip(&computed) {
        table.push_pair(input, output, metrics);
    }
    table
}
