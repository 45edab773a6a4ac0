//! Plain-text rendering of analysis results.

use mcsens_core::{ExecutionMode, SensitivityMetric, SensitivityResults};

/// One metric as a table with a row per output and a column per input.
pub fn metric_matrix(results: &SensitivityResults, metric: SensitivityMetric) -> String {
    let grid = results.metric_matrix(metric);
    let label_width = results
        .output_variables
        .iter()
        .map(String::len)
        .max()
        .unwrap_or(0)
        .max(metric.as_str().len());
    let col_width = results
        .input_variables
        .iter()
        .map(String::len)
        .max()
        .unwrap_or(0)
        .max(8);

    let mut out = format!("{:<label_width$}", metric.as_str());
    for input in &results.input_variables {
        out.push_str(&format!("  {input:>col_width$}"));
    }
    out.push('\n');
    for (output, row) in results.output_variables.iter().zip(&grid) {
        out.push_str(&format!("{output:<label_width$}"));
        for value in row {
            let cell = if value.is_nan() {
                format!("  {:>col_width$}", "-")
            } else {
                format!("  {value:>col_width$.4}")
            };
            out.push_str(&cell);
        }
        out.push('\n');
    }
    out
}

/// Forward-call counts of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallSummary {
    pub mode: ExecutionMode,
    pub calls: usize,
    pub rows: usize,
}

impl std::fmt::Display for CallSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:?}: {} forward calls, {} rows evaluated",
            self.mode, self.calls, self.rows
        )
    }
}

/// Side-by-side call counts of a batched and a per-pair run.
pub fn comparison(batched: &CallSummary, per_pair: &CallSummary) -> String {
    let reduction = if per_pair.calls > 0 {
        100.0 * (1.0 - batched.calls as f64 / per_pair.calls as f64)
    } else {
        0.0
    };
    format!(
        "{batched}\n{per_pair}\nForward call reduction: {} -> {} ({reduction:.1}%)\n",
        per_pair.calls, batched.calls
    )
}
