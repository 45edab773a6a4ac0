use crate::config::SensitivityConfig;
use crate::error::{ForwardStage, Result};
use crate::forward::{ForwardProcess, evaluate, output_column};
use crate::record::{PairColumns, PerturbationTable};
use crate::replicate::replicate_rows;
use crate::sampling::{resolve_seed, seeded_rng};
use crate::table::Table;

use super::{check_variables, perturbation_scale, usable_rows};

/// Perturb one input variable and observe one output variable.
///
/// Rows missing `input_variable` are dropped first. The forward process is
/// called once on the remaining rows and once on those rows replicated
/// `config.n` times with the input column offset by random draws.
///
/// A zero-variance input yields zero-width perturbations; the resulting
/// `NaN`/`inf` normalized values are returned as data.
pub fn perturb_single<P>(
    input: &Table,
    input_variable: &str,
    output_variable: &str,
    process: &mut P,
    config: &SensitivityConfig,
) -> Result<PerturbationTable>
where
    P: ForwardProcess + ?Sized,
{
    config.validate()?;
    check_variables(input, &[input_variable], &[output_variable])?;
    let kept = usable_rows(input, input_variable)?;
    let clean = input.take_rows(&kept);
    let unperturbed = clean.require(input_variable)?.to_vec();

    let std = perturbation_scale(config, input_variable, &unperturbed)?;
    let mut rng = seeded_rng(resolve_seed(config.seed));
    let draws = config.distribution.sample_n(
        &mut rng,
        config.perturbation_mean,
        std,
        clean.nrows() * config.n,
    )?;

    let baseline = evaluate(process, &clean, ForwardStage::Baseline)?;
    let baseline_output = output_column(&baseline, output_variable)?;

    let mut replicated = replicate_rows(&clean, config.n)?;
    if let Some(column) = replicated.table.column_mut(input_variable) {
        for (value, draw) in column.iter_mut().zip(&draws) {
            *value += draw;
        }
    }

    let perturbed = evaluate(process, &replicated.table, ForwardStage::Perturbed)?;
    let perturbed_output = output_column(&perturbed, output_variable)?;

    let origin = &replicated.origin;
    let source_rows: Vec<usize> = origin.iter().map(|&o| kept[o]).collect();
    let input_unperturbed: Vec<f64> = origin.iter().map(|&o| unperturbed[o]).collect();
    let output_unperturbed: Vec<f64> = origin.iter().map(|&o| baseline_output[o]).collect();

    let records = PairColumns {
        input_variable,
        output_variable,
        source_rows: &source_rows,
        input_unperturbed: &input_unperturbed,
        input_perturbed: replicated.table.require(input_variable)?,
        output_unperturbed: &output_unperturbed,
        output_perturbed: perturbed_output,
    }
    .into_records(config.normalization, config.drop_missing);

    tracing::debug!(
        input = input_variable,
        output = output_variable,
        records = records.len(),
        "single-variable perturbation complete"
    );
    Ok(PerturbationTable::new(records))
}
