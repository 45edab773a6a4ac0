//! Sensitivity metrics computed from normalized perturbation sequences.
//!
//! Only rows where both the normalized input and normalized output are
//! finite take part. Correlation and r2 are `NaN` when fewer than two such
//! rows remain or either sequence is (numerically) constant.

use serde::{Deserialize, Serialize};

/// Variance below which a sequence is treated as constant
pub const MIN_VARIANCE: f64 = 1e-10;

/// The closed set of metric kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensitivityMetric {
    Correlation,
    R2,
    MeanNormalizedChange,
}

impl SensitivityMetric {
    pub const ALL: [SensitivityMetric; 3] = [
        SensitivityMetric::Correlation,
        SensitivityMetric::R2,
        SensitivityMetric::MeanNormalizedChange,
    ];

    /// Stable name used in the metric table
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Correlation => "correlation",
            Self::R2 => "r2",
            Self::MeanNormalizedChange => "mean_normalized_change",
        }
    }
}

impl std::fmt::Display for SensitivityMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metric values for a single (input, output) pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PairMetrics {
    pub correlation: f64,
    pub r2: f64,
    pub mean_normalized_change: f64,
    /// Rows that passed the finiteness filter
    pub usable_rows: usize,
}

impl PairMetrics {
    #[must_use]
    pub fn get(&self, metric: SensitivityMetric) -> f64 {
        match metric {
            SensitivityMetric::Correlation => self.correlation,
            SensitivityMetric::R2 => self.r2,
            SensitivityMetric::MeanNormalizedChange => self.mean_normalized_change,
        }
    }

    /// Whether correlation and r2 could be computed
    #[must_use]
    pub fn is_defined(&self) -> bool {
        self.correlation.is_finite()
    }
}

/// Compute all metrics for aligned normalized sequences.
pub fn compute_metrics(normalized_input: &[f64], normalized_output: &[f64]) -> PairMetrics {
    let (xs, ys): (Vec<f64>, Vec<f64>) = normalized_input
        .iter()
        .zip(normalized_output)
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .map(|(x, y)| (*x, *y))
        .unzip();

    let mean_normalized_change = mean(&ys);
    let correlation = pearson(&xs, &ys);
    PairMetrics {
        correlation,
        // For a simple linear regression, R² is the squared Pearson r
        r2: correlation * correlation,
        mean_normalized_change,
        usable_rows: xs.len(),
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Pearson correlation of two equal-length, already-filtered sequences.
pub fn pearson(xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len();
    if n < 2 || ys.len() != n {
        return f64::NAN;
    }
    let (mx, my) = (mean(xs), mean(ys));
    let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
    for (x, y) in xs.iter().zip(ys) {
        let (dx, dy) = (x - mx, y - my);
        sxx += dx * dx;
        syy += dy * dy;
        sxy += dx * dy;
    }
    let nf = n as f64;
    if sxx / nf < MIN_VARIANCE || syy / nf < MIN_VARIANCE {
        return f64::NAN;
    }
    (sxy / (sxx.sqrt() * syy.sqrt())).clamp(-1.0, 1.0)
}

/// Coefficient of determination of the least-squares fit `y = a + b x`.
pub fn r_squared(xs: &[f64], ys: &[f64]) -> f64 {
    let r = pearson(xs, ys);
    r * r
}

/// One row of the long-format metric table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    pub input_variable: String,
    pub output_variable: String,
    pub metric: SensitivityMetric,
    pub value: f64,
}

/// Long-format metric table: one row per metric per pair
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricTable {
    pub records: Vec<MetricRecord>,
}

impl MetricTable {
    /// Append the three metric rows for a pair.
    pub fn push_pair(&mut self, input: &str, output: &str, metrics: &PairMetrics) {
        for metric in SensitivityMetric::ALL {
            self.records.push(MetricRecord {
                input_variable: input.to_string(),
                output_variable: output.to_string(),
                metric,
                value: metrics.get(metric),
            });
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, input: &str, output: &str, metric: SensitivityMetric) -> Option<f64> {
        self.records
            .iter()
            .find(|r| {
                r.input_variable == input && r.output_variable == output && r.metric == metric
            })
            .map(|r| r.value)
    }

    /// Grid of one metric with a row per output and a column per input.
    ///
    /// Pairs absent from the table are `NaN`.
    pub fn matrix(
        &self,
        metric: SensitivityMetric,
        inputs: &[&str],
        outputs: &[&str],
    ) -> Vec<Vec<f64>> {
        outputs
            .iter()
            .map(|out| {
                inputs
                    .iter()
                    .map(|inp| self.get(inp, out, metric).unwrap_or(f64::NAN))
                    .collect()
            })
            .collect()
    }
}
