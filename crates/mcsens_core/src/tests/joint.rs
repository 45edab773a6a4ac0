//! Tests for simultaneous and covariance-correlated perturbation
//!
//! These tests verify that:
//! - Simultaneous perturbation uses two forward calls for all pairs
//! - A perfectly correlated covariance moves inputs together
//! - Covariance diagonals set the perturbation scale in every runner
//! - Malformed covariances are rejected before any forward call

use super::{INPUTS, OUTPUTS, linear, plant, plant_table, std_dev, xs};
use crate::analysis::sensitivity_analysis;
use crate::config::{ExecutionMode, SensitivityConfig};
use crate::error::{ForwardError, SensitivityError};
use crate::forward::CountingProcess;
use crate::metrics::{SensitivityMetric, compute_metrics};
use crate::runner::{perturb_batched, perturb_simultaneously, perturb_single};
use crate::sampling::Covariance;
use crate::table::Table;

/// `s = a + b`
fn sum(t: &Table) -> Result<Table, ForwardError> {
    let s = t
        .require("a")?
        .iter()
        .zip(t.require("b")?)
        .map(|(a, b)| a + b)
        .collect();
    Ok(Table::from_columns([("s", s)])?)
}

fn ab_table() -> Table {
    Table::from_columns([
        ("a", vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]),
        ("b", vec![2.0, 1.0, 4.0, 3.0, 6.0, 5.0]),
    ])
    .unwrap()
}

#[test]
fn test_simultaneous_two_calls_all_pairs() {
    let table = plant_table();
    let config = SensitivityConfig::default().with_n(10).with_seed(42);
    let mut process = CountingProcess::new(plant);

    let records =
        perturb_simultaneously(&table, &INPUTS, &OUTPUTS, &mut process, &config).unwrap();

    assert_eq!(process.calls(), 2);
    assert_eq!(process.rows_evaluated(), 20 + 20 * 10);
    for input in INPUTS {
        for output in OUTPUTS {
            assert_eq!(records.pair(input, output).count(), 200);
        }
    }
}

#[test]
fn test_simultaneous_independent_inputs_share_output() {
    let table = ab_table();
    let config = SensitivityConfig::default().with_n(500).with_std(1.0).with_seed(7);
    let records = perturb_simultaneously(&table, &["a", "b"], &["s"], &mut sum, &config).unwrap();

    // both inputs move the same output rows
    let a: Vec<f64> = records.pair("a", "s").map(|r| r.output_perturbed).collect();
    let b: Vec<f64> = records.pair("b", "s").map(|r| r.output_perturbed).collect();
    assert_eq!(a, b);

    // independent unit perturbations: each explains about half the variance
    let (x, y) = records.normalized_pair("a", "s");
    let m = compute_metrics(&x, &y);
    assert!((m.r2 - 0.5).abs() < 0.05, "r2 {}", m.r2);
}

#[test]
fn test_simultaneous_drops_rows_missing_any_input() {
    let table = Table::from_columns([
        ("a", vec![1.0, f64::NAN, 3.0, 4.0]),
        ("b", vec![2.0, 1.0, f64::NAN, 3.0]),
    ])
    .unwrap();
    let config = SensitivityConfig::default().with_n(3).with_seed(1);
    let mut process = CountingProcess::new(sum);

    let records =
        perturb_simultaneously(&table, &["a", "b"], &["s"], &mut process, &config).unwrap();

    assert_eq!(process.rows_evaluated(), 2 + 2 * 3);
    assert!(records.iter().all(|r| r.source_row == 0 || r.source_row == 3));
}

#[test]
fn test_perfectly_correlated_covariance_moves_inputs_together() {
    let table = ab_table();
    let cov = Covariance::new(
        vec!["a".into(), "b".into()],
        vec![vec![1.0, 1.0], vec![1.0, 1.0]],
    );
    let config = SensitivityConfig::default()
        .with_n(50)
        .with_seed(3)
        .with_covariance(cov);

    let records = perturb_simultaneously(&table, &["a", "b"], &["s"], &mut sum, &config).unwrap();

    let da: Vec<f64> = records.pair("a", "s").map(|r| r.input_perturbation).collect();
    let db: Vec<f64> = records.pair("b", "s").map(|r| r.input_perturbation).collect();
    for (x, y) in da.iter().zip(&db) {
        assert!((x - y).abs() < 1e-9);
    }
    let (x, y) = records.normalized_pair("a", "s");
    assert!((compute_metrics(&x, &y).correlation - 1.0).abs() < 1e-9);
}

#[test]
fn test_covariance_diagonal_sets_scale() {
    let table = plant_table();
    let names = INPUTS.iter().map(|s| s.to_string()).collect();
    let cov = Covariance::diagonal(names, &[0.5, 2.0, 1.0]).unwrap();
    let config = SensitivityConfig::default()
        .with_n(500)
        .with_seed(21)
        .with_covariance(cov);

    let batched = perturb_batched(&table, &INPUTS, &["o1"], &mut plant, &config).unwrap();
    let per_pair = sensitivity_analysis(
        &table,
        &INPUTS,
        &["o1"],
        &mut plant,
        &config.clone().with_mode(ExecutionMode::PerPair),
    )
    .unwrap()
    .perturbations;

    for (input, expected) in INPUTS.iter().zip([0.5, 2.0, 1.0]) {
        for records in [&batched, &per_pair] {
            let deltas: Vec<f64> =
                records.pair(input, "o1").map(|r| r.input_perturbation).collect();
            let std = std_dev(&deltas);
            assert!((std - expected).abs() < 0.05 * expected, "{input}: std {std}");
        }
    }
}

#[test]
fn test_covariance_must_cover_inputs() {
    let table = plant_table();
    let cov = Covariance::diagonal(vec!["a".into(), "b".into()], &[1.0, 1.0]).unwrap();
    let mut process = CountingProcess::new(plant);
    let config = SensitivityConfig::default().with_covariance(cov);

    let err = sensitivity_analysis(&table, &INPUTS, &OUTPUTS, &mut process, &config).unwrap_err();
    assert!(matches!(err, SensitivityError::InvalidArgument(_)));
    assert_eq!(process.calls(), 0);
}

#[test]
fn test_covariance_with_orchestrator_batched() {
    let table = ab_table();
    let cov = Covariance::new(
        vec!["a".into(), "b".into()],
        vec![vec![1.0, 0.5], vec![0.5, 1.0]],
    );
    let config = SensitivityConfig::default()
        .with_n(100)
        .with_seed(8)
        .with_covariance(cov);
    let results = sensitivity_analysis(&table, &["a", "b"], &["s"], &mut sum, &config).unwrap();

    // batched blocks perturb one input at a time, so s tracks it exactly
    for input in ["a", "b"] {
        let corr = results
            .metrics
            .get(input, "s", SensitivityMetric::Correlation)
            .unwrap();
        assert!((corr - 1.0).abs() < 1e-9);
    }
}

#[test]
fn test_misshapen_covariance_is_invalid_argument() {
    let table = plant_table();
    let names: Vec<String> = INPUTS.iter().map(|s| s.to_string()).collect();
    let two_by_two = Covariance::new(names, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    let config = SensitivityConfig::default().with_covariance(two_by_two);

    for mode in [ExecutionMode::Batched, ExecutionMode::PerPair] {
        let mut process = CountingProcess::new(plant);
        let config = config.clone().with_mode(mode);
        let err =
            sensitivity_analysis(&table, &INPUTS, &OUTPUTS, &mut process, &config).unwrap_err();
        assert!(matches!(err, SensitivityError::InvalidArgument(_)), "{mode:?}: {err}");
        assert_eq!(process.calls(), 0);
    }
}

#[test]
fn test_empty_covariance_matrix_rejected_by_single_runner() {
    let table = xs(&[1.0, 2.0, 3.0]);
    let empty = Covariance::new(vec!["x".into()], vec![]);
    let config = SensitivityConfig::default().with_covariance(empty);
    let mut process = CountingProcess::new(linear);

    let err = perturb_single(&table, "x", "y", &mut process, &config).unwrap_err();
    assert!(matches!(err, SensitivityError::InvalidArgument(_)));
    assert_eq!(process.calls(), 0);
}

#[test]
fn test_nan_above_diagonal_rejected() {
    let table = ab_table();
    let cov = Covariance::new(
        vec!["a".into(), "b".into()],
        vec![vec![1.0, f64::NAN], vec![0.5, 1.0]],
    );
    let config = SensitivityConfig::default().with_covariance(cov);
    let mut process = CountingProcess::new(sum);

    let err = perturb_simultaneously(&table, &["a", "b"], &["s"], &mut process, &config)
        .unwrap_err();
    assert!(matches!(err, SensitivityError::InvalidArgument(_)));
    assert_eq!(process.calls(), 0);
}
