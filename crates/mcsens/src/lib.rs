//! Command-line front end for Monte Carlo sensitivity analysis
//!
//! Loads a YAML scenario, builds its input table, runs the analysis against
//! a built-in demo model and reports the correlation matrix and how many
//! times the model was invoked.

pub mod logging;
pub mod models;
pub mod report;
pub mod scenario;

use std::time::Duration;

use color_eyre::eyre::WrapErr;
use mcsens_core::{
    CountingProcess, ExecutionMode, SensitivityResults, Table, sensitivity_analysis,
};

pub use logging::init_logging;
pub use models::{DemoModel, DemoProcess};
pub use report::CallSummary;
pub use scenario::Scenario;

/// Results of one scenario run together with its forward-call counts
#[derive(Debug, Clone)]
pub struct ScenarioRun {
    pub results: SensitivityResults,
    pub calls: CallSummary,
}

/// Run `scenario` over `table` in the given mode.
pub fn run_scenario(
    scenario: &Scenario,
    table: &Table,
    mode: ExecutionMode,
) -> color_eyre::Result<ScenarioRun> {
    let config = scenario.config.clone().with_mode(mode);
    let mut process = CountingProcess::new(
        DemoProcess::new(scenario.model)
            .with_delay(Duration::from_millis(scenario.model_delay_ms)),
    );

    let results = sensitivity_analysis(
        table,
        &scenario.input_variables(),
        &scenario.output_variables(),
        &mut process,
        &config,
    )
    .wrap_err_with(|| format!("running {mode:?} analysis"))?;

    Ok(ScenarioRun {
        results,
        calls: CallSummary {
            mode,
            calls: process.calls(),
            rows: process.rows_evaluated(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcsens_core::SensitivityMetric;
    use std::io::Write;

    const SCENARIO: &str = r#"
model: plant
rows: 20
data_seed: 1
columns:
  - name: temperature
    uniform: { low: 20.0, high: 30.0 }
  - name: pressure
    uniform: { low: 1.0, high: 3.0 }
  - name: humidity
    values: [30.0, 35.0, .nan, 45.0, 50.0, 55.0, 60.0, 65.0, 70.0, 40.0,
             31.0, 36.0, 41.0, 46.0, 51.0, 56.0, 61.0, 66.0, 69.0, 42.0]
config:
  n: 15
  seed: 5
"#;

    fn load_from_tempfile() -> Scenario {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SCENARIO.as_bytes()).unwrap();
        Scenario::load(file.path()).unwrap()
    }

    #[test]
    fn test_scenario_file_runs_batched() {
        let scenario = load_from_tempfile();
        let table = scenario.build_table().unwrap();
        let run = run_scenario(&scenario, &table, ExecutionMode::Batched).unwrap();

        assert_eq!(run.calls.calls, 2);
        assert_eq!(run.results.metrics.len(), 27);
        // efficiency is linear in temperature
        let corr = run
            .results
            .metrics
            .get("temperature", "efficiency", SensitivityMetric::Correlation)
            .unwrap();
        assert!((corr - 1.0).abs() < 1e-9);
        // the NaN humidity row is dropped only for humidity's block
        assert!(
            run.results
                .perturbations
                .iter()
                .filter(|r| r.input_variable == "humidity")
                .all(|r| r.source_row != 2)
        );
        assert!(
            run.results
                .perturbations
                .pair("temperature", "cost")
                .any(|r| r.source_row == 2)
        );
    }

    #[test]
    fn test_per_pair_call_count() {
        let scenario = load_from_tempfile();
        let table = scenario.build_table().unwrap();
        let run = run_scenario(&scenario, &table, ExecutionMode::PerPair).unwrap();
        assert_eq!(run.calls.calls, 18);
    }

    #[test]
    fn test_missing_scenario_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Scenario::load(&dir.path().join("absent.yaml")).unwrap_err();
        assert!(format!("{err:#}").contains("absent.yaml"));
    }

    #[test]
    fn test_unknown_output_is_reported() {
        let mut scenario = Scenario::plant_demo();
        scenario.outputs = vec!["throughput".to_string()];
        let table = scenario.build_table().unwrap();
        let err = run_scenario(&scenario, &table, ExecutionMode::Batched).unwrap_err();
        assert!(format!("{err:#}").contains("throughput"));
    }
}
