//! YAML scenario files.
//!
//! ```yaml
//! model: plant
//! rows: 50
//! data_seed: 42
//! columns:
//!   - name: temperature
//!     uniform: { low: 20.0, high: 30.0 }
//!   - name: pressure
//!     values: [1.2, 2.5, .nan, ...]
//! inputs: [temperature, pressure, humidity]
//! outputs: [efficiency, cost, quality]
//! config:
//!   n: 50
//!   mode: batched
//! ```

use std::path::Path;

use color_eyre::eyre::{WrapErr, bail, eyre};
use mcsens_core::{SensitivityConfig, Table};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal, Uniform};
use serde::{Deserialize, Serialize};

use crate::models::DemoModel;

fn default_rows() -> usize {
    50
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub model: DemoModel,
    /// Row count for generated columns
    #[serde(default = "default_rows")]
    pub rows: usize,
    /// Seed for generated columns, independent of the perturbation seed
    #[serde(default)]
    pub data_seed: u64,
    /// Artificial cost of each forward call, in milliseconds
    #[serde(default)]
    pub model_delay_ms: u64,
    pub columns: Vec<ColumnSpec>,
    /// Defaults to the model's own inputs
    #[serde(default)]
    pub inputs: Vec<String>,
    /// Defaults to the model's own outputs
    #[serde(default)]
    pub outputs: Vec<String>,
    #[serde(default)]
    pub config: SensitivityConfig,
}

/// One input column: explicit values or a generator.
///
/// Exactly one of `values`, `uniform` and `normal` must be set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uniform: Option<UniformRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normal: Option<NormalParams>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UniformRange {
    pub low: f64,
    pub high: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalParams {
    #[serde(default)]
    pub mean: f64,
    pub std_dev: f64,
}

impl ColumnSpec {
    fn generate(&self, rows: usize, rng: &mut StdRng) -> color_eyre::Result<Vec<f64>> {
        match (&self.values, &self.uniform, &self.normal) {
            (Some(values), None, None) => Ok(values.clone()),
            (None, Some(range), None) => {
                let dist = Uniform::new(range.low, range.high).map_err(|e| {
                    eyre!(
                        "column '{}': invalid uniform range [{}, {}): {e}",
                        self.name,
                        range.low,
                        range.high
                    )
                })?;
                Ok(dist.sample_iter(rng).take(rows).collect())
            }
            (None, None, Some(params)) => {
                let dist = Normal::new(params.mean, params.std_dev)
                    .map_err(|e| eyre!("column '{}': {e}", self.name))?;
                Ok(dist.sample_iter(rng).take(rows).collect())
            }
            _ => bail!(
                "column '{}' must set exactly one of values, uniform, normal",
                self.name
            ),
        }
    }
}

impl Scenario {
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_saphyr::Error> {
        serde_saphyr::from_str(yaml)
    }

    pub fn load(path: &Path) -> color_eyre::Result<Self> {
        let content = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("reading scenario {}", path.display()))?;
        Self::from_yaml(&content)
            .wrap_err_with(|| format!("parsing scenario {}", path.display()))
    }

    /// The process-plant demo: three uniform inputs, three outputs.
    pub fn plant_demo() -> Self {
        let uniform = |name: &str, low, high| ColumnSpec {
            name: name.to_string(),
            values: None,
            uniform: Some(UniformRange { low, high }),
            normal: None,
        };
        Self {
            name: Some("plant".to_string()),
            model: DemoModel::Plant,
            rows: 50,
            data_seed: 42,
            model_delay_ms: 0,
            columns: vec![
                uniform("temperature", 20.0, 30.0),
                uniform("pressure", 1.0, 3.0),
                uniform("humidity", 30.0, 70.0),
            ],
            inputs: Vec::new(),
            outputs: Vec::new(),
            config: SensitivityConfig::default().with_n(50),
        }
    }

    pub fn input_variables(&self) -> Vec<&str> {
        if self.inputs.is_empty() {
            self.model.inputs().to_vec()
        } else {
            self.inputs.iter().map(String::as_str).collect()
        }
    }

    pub fn output_variables(&self) -> Vec<&str> {
        if self.outputs.is_empty() {
            self.model.outputs().to_vec()
        } else {
            self.outputs.iter().map(String::as_str).collect()
        }
    }

    /// Build the input table, generating columns from `data_seed`.
    pub fn build_table(&self) -> color_eyre::Result<Table> {
        let mut rng = StdRng::seed_from_u64(self.data_seed);
        let columns = self
            .columns
            .iter()
            .map(|spec| Ok((spec.name.clone(), spec.generate(self.rows, &mut rng)?)))
            .collect::<color_eyre::Result<Vec<_>>>()?;
        let table = Table::from_columns(columns).wrap_err("building input table")?;
        tracing::debug!(
            rows = table.nrows(),
            columns = table.ncols(),
            "scenario table built"
        );
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
name: small
model: benchmark
rows: 8
data_seed: 7
columns:
  - name: input1
    normal: { std_dev: 1.0 }
  - name: input2
    uniform: { low: -1.0, high: 1.0 }
  - name: input3
    values: [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]
outputs: [output1, output3]
config:
  n: 12
  mode: per_pair
  seed: 3
"#;

    #[test]
    fn test_parse_scenario() {
        let scenario = Scenario::from_yaml(YAML).unwrap();
        assert_eq!(scenario.model, DemoModel::Benchmark);
        assert_eq!(scenario.config.n, 12);
        assert_eq!(scenario.config.mode, mcsens_core::ExecutionMode::PerPair);
        assert_eq!(scenario.config.seed, Some(3));
        assert!(scenario.config.drop_missing);
        assert_eq!(scenario.input_variables(), vec!["input1", "input2", "input3"]);
        assert_eq!(scenario.output_variables(), vec!["output1", "output3"]);
    }

    #[test]
    fn test_build_table_is_seeded() {
        let scenario = Scenario::from_yaml(YAML).unwrap();
        let a = scenario.build_table().unwrap();
        let b = scenario.build_table().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.nrows(), 8);
        assert!(a.column("input2").unwrap().iter().all(|v| (-1.0..1.0).contains(v)));
        assert_eq!(a.column("input3").unwrap()[7], 8.0);
    }

    #[test]
    fn test_column_needs_exactly_one_source() {
        let mut scenario = Scenario::plant_demo();
        scenario.columns[0].values = Some(vec![1.0; 50]);
        assert!(scenario.build_table().is_err());

        scenario.columns[0].uniform = None;
        scenario.columns[0].values = Some(vec![1.0; 3]);
        // ragged against the generated columns
        assert!(scenario.build_table().is_err());
    }
}
