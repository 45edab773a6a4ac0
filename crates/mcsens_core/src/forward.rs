//! The model under analysis.
//!
//! A forward process maps a table of input rows to a table of output rows,
//! aligned row for row. It may return the input columns alongside its
//! outputs; only the requested output columns are read.

use crate::error::{ForwardError, ForwardStage, Result, SensitivityError};
use crate::table::Table;

pub trait ForwardProcess {
    fn forward(&mut self, input: &Table) -> std::result::Result<Table, ForwardError>;
}

impl<F, E> ForwardProcess for F
where
    F: FnMut(&Table) -> std::result::Result<Table, E>,
    E: Into<ForwardError>,
{
    fn forward(&mut self, input: &Table) -> std::result::Result<Table, ForwardError> {
        self(input).map_err(Into::into)
    }
}

/// Wraps a forward process and counts its invocations.
#[derive(Debug, Clone)]
pub struct CountingProcess<P> {
    inner: P,
    calls: usize,
    rows: usize,
}

impl<P> CountingProcess<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            calls: 0,
            rows: 0,
        }
    }

    /// Number of times the wrapped process has been invoked
    pub fn calls(&self) -> usize {
        self.calls
    }

    /// Total input rows passed to the wrapped process
    pub fn rows_evaluated(&self) -> usize {
        self.rows
    }

    pub fn reset(&mut self) {
        self.calls = 0;
        self.rows = 0;
    }

    pub fn into_inner(self) -> P {
        self.inner
    }
}

impl<P: ForwardProcess> ForwardProcess for CountingProcess<P> {
    fn forward(&mut self, input: &Table) -> std::result::Result<Table, ForwardError> {
        self.calls += 1;
        self.rows += input.nrows();
        self.inner.forward(input)
    }
}

/// Invoke `process` and check that its output is row-aligned with `input`.
pub(crate) fn evaluate<P>(process: &mut P, input: &Table, stage: ForwardStage) -> Result<Table>
where
    P: ForwardProcess + ?Sized,
{
    tracing::debug!(%stage, rows = input.nrows(), "invoking forward process");
    let output = process
        .forward(input)
        .map_err(|source| SensitivityError::ForwardProcess { stage, source })?;
    if output.nrows() != input.nrows() {
        return Err(SensitivityError::ForwardShape {
            stage,
            expected: input.nrows(),
            actual: output.nrows(),
        });
    }
    Ok(output)
}

/// Fetch a requested output column from a forward-process result.
pub(crate) fn output_column<'a>(output: &'a Table, variable: &str) -> Result<&'a [f64]> {
    output
        .column(variable)
        .ok_or_else(|| SensitivityError::MissingOutput {
            variable: variable.to_string(),
        })
}
