use std::ops::Range;

#[cfg(feature = "parallel")]
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

use crate::config::SensitivityConfig;
use crate::error::{ForwardStage, Result, SensitivityError};
use crate::forward::{ForwardProcess, evaluate, output_column};
use crate::record::{PairColumns, PerturbationRecord, PerturbationTable};
use crate::replicate::{origin_index, replicate_rows};
use crate::sampling::{CholeskyFactor, resolve_seed, seeded_rng};
use crate::table::Table;

use super::{check_variables, perturbation_scale, usable_rows};

/// One input variable's slice of the stacked table
#[derive(Debug, Clone)]
struct Block<'a> {
    variable: &'a str,
    /// Rows of the stacked table (and its forward output) owned by this block
    rows: Range<usize>,
    /// Caller-table row of each block row
    source_rows: Vec<usize>,
    input_unperturbed: Vec<f64>,
    input_perturbed: Vec<f64>,
}

/// Per-variable draw source for a run
enum Draws {
    Independent,
    Correlated(CholeskyFactor),
}

impl Draws {
    fn for_config(config: &SensitivityConfig, variables: &[&str]) -> Result<Self> {
        match &config.covariance {
            Some(cov) => {
                if config.distribution != Default::default() {
                    tracing::warn!(
                        distribution = ?config.distribution,
                        "covariance given; drawing from a multivariate normal instead"
                    );
                }
                Ok(Draws::Correlated(cov.select(variables)?.factor()?))
            }
            None => Ok(Draws::Independent),
        }
    }
}

/// Correlated draws for `rows` source rows times `n` copies.
///
/// Entry `[v][r * n + k]` is variable `v`'s offset for copy `k` of row `r`.
fn correlated_draws(
    factor: &CholeskyFactor,
    rng: &mut impl rand::Rng,
    mean: f64,
    count: usize,
) -> Vec<Vec<f64>> {
    let mut by_variable = vec![Vec::with_capacity(count); factor.dim()];
    for _ in 0..count {
        for (v, x) in factor.sample(rng, mean).into_iter().enumerate() {
            by_variable[v].push(x);
        }
    }
    by_variable
}

/// Baseline and perturbed columns of one requested output
fn output_pair<'a>(
    baseline: &'a Table,
    perturbed: &'a Table,
    name: &'a str,
) -> Result<(&'a str, &'a [f64], &'a [f64])> {
    Ok((
        name,
        output_column(baseline, name)?,
        output_column(perturbed, name)?,
    ))
}

/// Perturb each input variable in its own block and evaluate all blocks at once.
///
/// Missing values are dropped per variable: block `v` contains only rows
/// where `v` is present. The baseline call sees the union of those rows,
/// the second call sees every block stacked vertically. Records are
/// produced for every (input, output) pair, input-major.
///
/// With a covariance, one correlated vector is drawn per (source row,
/// copy) and block `v` uses component `v`, so the same copy of a row is
/// offset coherently across blocks.
pub fn perturb_batched<P>(
    input: &Table,
    input_variables: &[&str],
    output_variables: &[&str],
    process: &mut P,
    config: &SensitivityConfig,
) -> Result<PerturbationTable>
where
    P: ForwardProcess + ?Sized,
{
    config.validate()?;
    check_variables(input, input_variables, output_variables)?;
    let kept = input_variables
        .iter()
        .map(|v| usable_rows(input, v))
        .collect::<Result<Vec<_>>>()?;

    let n = config.n;
    let draws = Draws::for_config(config, input_variables)?;
    let mut rng = seeded_rng(resolve_seed(config.seed));
    let correlated = match &draws {
        Draws::Correlated(factor) => Some(correlated_draws(
            factor,
            &mut rng,
            config.perturbation_mean,
            input.nrows() * n,
        )),
        Draws::Independent => None,
    };

    let mut blocks = Vec::with_capacity(input_variables.len());
    let mut stacked_parts = Vec::with_capacity(input_variables.len());
    let mut offset = 0;
    for (v, (&variable, rows)) in input_variables.iter().zip(&kept).enumerate() {
        let origin: Vec<usize> = origin_index(rows.len(), n)
            .into_iter()
            .map(|o| rows[o])
            .collect();
        let mut part = input.take_rows(&origin);
        let column = input.require(variable)?;
        let input_unperturbed: Vec<f64> = origin.iter().map(|&r| column[r]).collect();

        let offsets: Vec<f64> = match &correlated {
            Some(all) => origin
                .iter()
                .enumerate()
                .map(|(k, &r)| all[v][r * n + k % n])
                .collect(),
            None => {
                let values: Vec<f64> = rows.iter().map(|&r| column[r]).collect();
                let std = perturbation_scale(config, variable, &values)?;
                config
                    .distribution
                    .sample_n(&mut rng, config.perturbation_mean, std, origin.len())?
            }
        };
        let input_perturbed: Vec<f64> = input_unperturbed
            .iter()
            .zip(&offsets)
            .map(|(u, d)| u + d)
            .collect();
        part = part.with_column(variable, input_perturbed.clone())?;

        blocks.push(Block {
            variable,
            rows: offset..offset + origin.len(),
            source_rows: origin,
            input_unperturbed,
            input_perturbed,
        });
        offset += part.nrows();
        stacked_parts.push(part);
    }

    let mut baseline_rows: Vec<usize> = kept.iter().flatten().copied().collect();
    baseline_rows.sort_unstable();
    baseline_rows.dedup();
    let mut baseline_position = vec![usize::MAX; input.nrows()];
    for (pos, &r) in baseline_rows.iter().enumerate() {
        baseline_position[r] = pos;
    }

    let baseline = evaluate(
        process,
        &input.take_rows(&baseline_rows),
        ForwardStage::Baseline,
    )?;
    let stacked = Table::vstack(&stacked_parts)?;
    drop(stacked_parts);
    let perturbed = evaluate(process, &stacked, ForwardStage::Perturbed)?;

    // Every output is looked up by name on the full output table, so a
    // single requested output is still read as a column of a table.
    let outputs = output_variables
        .iter()
        .map(|&name| output_pair(&baseline, &perturbed, name))
        .collect::<Result<Vec<_>>>()?;

    let jobs: Vec<(&Block, &(&str, &[f64], &[f64]))> = blocks
        .iter()
        .flat_map(|b| outputs.iter().map(move |o| (b, o)))
        .collect();
    let build = |&(block, &(output, base, pert)): &(&Block, &(&str, &[f64], &[f64]))| {
        let output_unperturbed: Vec<f64> = block
            .source_rows
            .iter()
            .map(|&r| base[baseline_position[r]])
            .collect();
        PairColumns {
            input_variable: block.variable,
            output_variable: output,
            source_rows: &block.source_rows,
            input_unperturbed: &block.input_unperturbed,
            input_perturbed: &block.input_perturbed,
            output_unperturbed: &output_unperturbed,
            output_perturbed: &pert[block.rows.clone()],
        }
        .into_records(config.normalization, config.drop_missing)
    };

    #[cfg(feature = "parallel")]
    let per_pair: Vec<Vec<PerturbationRecord>> = jobs.par_iter().map(build).collect();
    #[cfg(not(feature = "parallel"))]
    let per_pair: Vec<Vec<PerturbationRecord>> = jobs.iter().map(build).collect();

    tracing::debug!(
        blocks = blocks.len(),
        outputs = output_variables.len(),
        stacked_rows = stacked.nrows(),
        "batched perturbation complete"
    );
    Ok(per_pair.into_iter().flatten().collect())
}

/// Perturb all input variables together in the same replicated rows.
///
/// Rows missing any selected input are dropped. Each (input, output) pair's
/// records share the same perturbed rows, so an output delta reflects the
/// combined effect of every input's offset.
pub fn perturb_simultaneously<P>(
    input: &Table,
    input_variables: &[&str],
    output_variables: &[&str],
    process: &mut P,
    config: &SensitivityConfig,
) -> Result<PerturbationTable>
where
    P: ForwardProcess + ?Sized,
{
    config.validate()?;
    check_variables(input, input_variables, output_variables)?;
    for v in input_variables {
        usable_rows(input, v)?;
    }
    let (clean, kept) = input.drop_missing(input_variables)?;
    if clean.is_empty() {
        return Err(SensitivityError::InsufficientData {
            variable: input_variables.join(", "),
        });
    }

    let n = config.n;
    let count = clean.nrows() * n;
    let draws = Draws::for_config(config, input_variables)?;
    let mut rng = seeded_rng(resolve_seed(config.seed));
    let offsets: Vec<Vec<f64>> = match &draws {
        Draws::Correlated(factor) => {
            correlated_draws(factor, &mut rng, config.perturbation_mean, count)
        }
        Draws::Independent => input_variables
            .iter()
            .map(|v| {
                let std = perturbation_scale(config, v, clean.require(v)?)?;
                config
                    .distribution
                    .sample_n(&mut rng, config.perturbation_mean, std, count)
            })
            .collect::<Result<_>>()?,
    };

    let baseline = evaluate(process, &clean, ForwardStage::Baseline)?;
    let mut replicated = replicate_rows(&clean, n)?;
    for (variable, offsets) in input_variables.iter().zip(&offsets) {
        if let Some(column) = replicated.table.column_mut(variable) {
            for (value, d) in column.iter_mut().zip(offsets) {
                *value += d;
            }
        }
    }
    let perturbed = evaluate(process, &replicated.table, ForwardStage::Perturbed)?;

    let origin = &replicated.origin;
    let source_rows: Vec<usize> = origin.iter().map(|&o| kept[o]).collect();
    let mut records = Vec::new();
    for &variable in input_variables {
        let column = clean.require(variable)?;
        let input_unperturbed: Vec<f64> = origin.iter().map(|&o| column[o]).collect();
        let input_perturbed = replicated.table.require(variable)?;
        for &output in output_variables {
            let base = output_column(&baseline, output)?;
            let output_unperturbed: Vec<f64> = origin.iter().map(|&o| base[o]).collect();
            records.extend(
                PairColumns {
                    input_variable: variable,
                    output_variable: output,
                    source_rows: &source_rows,
                    input_unperturbed: &input_unperturbed,
                    input_perturbed,
                    output_unperturbed: &output_unperturbed,
                    output_perturbed: output_column(&perturbed, output)?,
                }
                .into_records(config.normalization, config.drop_missing),
            );
        }
    }
    Ok(PerturbationTable::new(records))
}
