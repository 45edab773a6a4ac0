//! Scenario tests for the sensitivity pipeline
//!
//! Tests are organized by topic:
//! - `single` - Single-variable runner on known models
//! - `batched` - Stacked runner, missing values and output shapes
//! - `orchestrator` - End-to-end analysis, invocation counts and failures
//! - `joint` - Simultaneous and covariance-correlated perturbation

mod batched;
mod joint;

use crate::error::ForwardError;
use crate::table::Table;

/// `y = 2x + 1`, returned alongside the input columns
pub(crate) fn linear(t: &Table) -> Result<Table, ForwardError> {
    let y = t.require("x")?.iter().map(|x| 2.0 * x + 1.0).collect();
    Ok(t.clone().with_column("y", y)?)
}

/// `y = x^2`
pub(crate) fn quadratic(t: &Table) -> Result<Table, ForwardError> {
    let y = t.require("x")?.iter().map(|x| x * x).collect();
    Ok(t.clone().with_column("y", y)?)
}

/// Three inputs `a`, `b`, `c` and three outputs; returns only the outputs.
///
/// - `o1 = 2a + b`
/// - `o2 = b - c`
/// - `o3 = a * c`
pub(crate) fn plant(t: &Table) -> Result<Table, ForwardError> {
    let (a, b, c) = (t.require("a")?, t.require("b")?, t.require("c")?);
    let o1 = a.iter().zip(b).map(|(a, b)| 2.0 * a + b).collect();
    let o2 = b.iter().zip(c).map(|(b, c)| b - c).collect();
    let o3 = a.iter().zip(c).map(|(a, c)| a * c).collect();
    Ok(Table::from_columns([("o1", o1), ("o2", o2), ("o3", o3)])?)
}

/// Deterministic 20-row table over `a`, `b`, `c` with `c` in `[1, 3)`.
pub(crate) fn plant_table() -> Table {
    let rows = 20;
    let a = (0..rows).map(|i| i as f64).collect();
    let b = (0..rows).map(|i| ((i * 7) % 11) as f64 - 5.0).collect();
    let c = (0..rows).map(|i| 1.0 + 0.1 * i as f64).collect();
    Table::from_columns([("a", a), ("b", b), ("c", c)]).unwrap()
}

pub(crate) fn xs(values: &[f64]) -> Table {
    Table::from_columns([("x", values.to_vec())]).unwrap()
}

pub(crate) const INPUTS: [&str; 3] = ["a", "b", "c"];
pub(crate) const OUTPUTS: [&str; 3] = ["o1", "o2", "o3"];

pub(crate) fn std_dev(values: &[f64]) -> f64 {
    crate::normalize::population_std(values)
}
