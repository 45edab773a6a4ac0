//! Perturbation runners.
//!
//! Each runner invokes the forward process exactly twice: once on
//! unperturbed rows and once on replicated, perturbed rows.
//!
//! - [`perturb_single`]: one input variable, one output variable.
//! - [`perturb_batched`]: one stacked block per input variable, all outputs.
//! - [`perturb_simultaneously`]: all input variables offset in the same rows.

mod joint;
mod single;

pub use joint::*;
pub use single::*;

use crate::config::SensitivityConfig;
use crate::error::{Result, SensitivityError};
use crate::normalize::population_std;
use crate::table::Table;

/// Rows of `table` usable for `variable`, failing if none are left.
pub(crate) fn usable_rows(table: &Table, variable: &str) -> Result<Vec<usize>> {
    let (_, kept) = table.drop_missing(&[variable])?;
    if kept.is_empty() {
        return Err(SensitivityError::InsufficientData {
            variable: variable.to_string(),
        });
    }
    Ok(kept)
}

/// Standard deviation of the perturbations applied to `variable`.
///
/// Precedence: explicit override, covariance diagonal, population std of
/// the variable's usable values.
pub(crate) fn perturbation_scale(
    config: &SensitivityConfig,
    variable: &str,
    values: &[f64],
) -> Result<f64> {
    if let Some(std) = config.perturbation_std {
        return Ok(std);
    }
    if let Some(cov) = &config.covariance {
        return Ok(cov.variance(variable)?.sqrt());
    }
    Ok(population_std(values))
}

/// Reject empty or repeated variable lists and inputs absent from the table.
pub(crate) fn check_variables(
    table: &Table,
    input_variables: &[&str],
    output_variables: &[&str],
) -> Result<()> {
    if table.is_empty() {
        return Err(SensitivityError::invalid("input table has no rows"));
    }
    for (kind, vars) in [("input", input_variables), ("output", output_variables)] {
        if vars.is_empty() {
            return Err(SensitivityError::invalid(format!(
                "at least one {kind} variable is required"
            )));
        }
        for (i, v) in vars.iter().enumerate() {
            if vars[..i].contains(v) {
                return Err(SensitivityError::invalid(format!(
                    "{kind} variable '{v}' listed twice"
                )));
            }
        }
    }
    for v in input_variables {
        table.require(v)?;
    }
    Ok(())
}
