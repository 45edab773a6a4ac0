//! Tests for the batched runner
//!
//! These tests verify that:
//! - All blocks are evaluated in exactly two forward calls
//! - A single requested output is still handled as a table column
//! - Missing values are dropped per input variable, not across inputs
//! - Block bookkeeping maps every record back to its source row
//! - Uniform draws stay inside the band matching the requested std

use rustc_hash::FxHashSet;

use super::{INPUTS, OUTPUTS, plant, plant_table, std_dev};
use crate::config::SensitivityConfig;
use crate::error::ForwardError;
use crate::forward::CountingProcess;
use crate::metrics::compute_metrics;
use crate::runner::perturb_batched;
use crate::sampling::PerturbationDistribution;
use crate::table::Table;

/// `oa = 2a`, `ob = 3b`: each output depends on one input only
fn separable(t: &Table) -> Result<Table, ForwardError> {
    let oa = t.require("a")?.iter().map(|a| 2.0 * a).collect();
    let ob = t.require("b")?.iter().map(|b| 3.0 * b).collect();
    Ok(Table::from_columns([("oa", oa), ("ob", ob)])?)
}

#[test]
fn test_two_forward_calls_for_all_pairs() {
    let table = plant_table();
    let config = SensitivityConfig::default().with_n(25).with_seed(42);
    let mut process = CountingProcess::new(plant);

    let records = perturb_batched(&table, &INPUTS, &OUTPUTS, &mut process, &config).unwrap();

    assert_eq!(process.calls(), 2);
    // baseline rows + one block of rows * n per input
    assert_eq!(process.rows_evaluated(), 20 + 3 * 20 * 25);
    for input in INPUTS {
        for output in OUTPUTS {
            assert_eq!(records.pair(input, output).count(), 20 * 25);
        }
    }
}

#[test]
fn test_records_are_input_major() {
    let table = plant_table();
    let config = SensitivityConfig::default().with_n(2).with_seed(1);
    let records = perturb_batched(&table, &INPUTS, &OUTPUTS, &mut plant, &config).unwrap();

    let mut order: Vec<(&str, &str)> = Vec::new();
    for r in records.iter() {
        let pair = (r.input_variable.as_str(), r.output_variable.as_str());
        if order.last() != Some(&pair) {
            order.push(pair);
        }
    }
    let expected: Vec<(&str, &str)> = INPUTS
        .iter()
        .flat_map(|&i| OUTPUTS.iter().map(move |&o| (i, o)))
        .collect();
    assert_eq!(order, expected);
}

#[test]
fn test_only_perturbed_input_moves_the_output() {
    let table = plant_table();
    let config = SensitivityConfig::default().with_n(40).with_seed(3);
    let records = perturb_batched(&table, &INPUTS, &OUTPUTS, &mut plant, &config).unwrap();

    // o1 = 2a + b, unaffected by c
    let (x, y) = records.normalized_pair("a", "o1");
    assert!((compute_metrics(&x, &y).correlation - 1.0).abs() < 1e-9);
    assert!(records.pair("c", "o1").all(|r| r.output_perturbation == 0.0));
    let (x, y) = records.normalized_pair("c", "o1");
    assert!(compute_metrics(&x, &y).correlation.is_nan());

    // o2 = b - c
    let (x, y) = records.normalized_pair("c", "o2");
    assert!((compute_metrics(&x, &y).correlation + 1.0).abs() < 1e-9);
}

#[test]
fn test_single_output_is_a_column() {
    let table = plant_table();
    let config = SensitivityConfig::default().with_n(10).with_seed(4);
    let mut process = CountingProcess::new(plant);

    let records = perturb_batched(&table, &INPUTS, &["o3"], &mut process, &config).unwrap();

    assert_eq!(process.calls(), 2);
    assert_eq!(records.len(), 3 * 20 * 10);
    assert!(records.iter().all(|r| r.output_variable == "o3"));
    for input in INPUTS {
        assert_eq!(records.pair(input, "o3").count(), 200);
    }
}

#[test]
fn test_single_input() {
    let table = plant_table();
    let config = SensitivityConfig::default().with_n(10).with_seed(4);
    let records = perturb_batched(&table, &["b"], &OUTPUTS, &mut plant, &config).unwrap();

    assert_eq!(records.len(), 3 * 20 * 10);
    assert!(records.iter().all(|r| r.input_variable == "b"));
}

#[test]
fn test_missing_values_dropped_per_variable() {
    let table = Table::from_columns([
        ("a", vec![f64::NAN, 1.0, 2.0, 3.0, 4.0]),
        ("b", vec![5.0, f64::NAN, 7.0, 6.0, 9.0]),
    ])
    .unwrap();
    let config = SensitivityConfig::default().with_n(4).with_seed(11);
    let mut process = CountingProcess::new(separable);

    let records =
        perturb_batched(&table, &["a", "b"], &["oa", "ob"], &mut process, &config).unwrap();

    // baseline sees the union of usable rows, each block only its own rows
    assert_eq!(process.rows_evaluated(), 5 + 4 * 4 + 4 * 4);

    let rows = |input: &str, output: &str| -> FxHashSet<usize> {
        records.pair(input, output).map(|r| r.source_row).collect()
    };
    assert_eq!(rows("a", "oa"), FxHashSet::from_iter([1, 2, 3, 4]));
    assert_eq!(rows("b", "ob"), FxHashSet::from_iter([0, 2, 3, 4]));
    // ob is NaN wherever b is, so those records are dropped
    assert_eq!(rows("a", "ob"), FxHashSet::from_iter([2, 3, 4]));
}

#[test]
fn test_block_records_map_to_source_values() {
    let table = plant_table();
    let config = SensitivityConfig::default().with_n(3).with_seed(8);
    let records = perturb_batched(&table, &INPUTS, &["o1"], &mut plant, &config).unwrap();

    let a = table.column("a").unwrap();
    let b = table.column("b").unwrap();
    for r in records.pair("a", "o1") {
        assert_eq!(r.input_unperturbed, a[r.source_row]);
        assert_eq!(r.output_unperturbed, 2.0 * a[r.source_row] + b[r.source_row]);
        assert!((r.output_perturbed - (2.0 * r.input_perturbed + b[r.source_row])).abs() < 1e-9);
    }
}

#[test]
fn test_missing_output_column_is_reported() {
    let table = plant_table();
    let err = perturb_batched(
        &table,
        &INPUTS,
        &["o9"],
        &mut plant,
        &SensitivityConfig::default().with_n(2),
    )
    .unwrap_err();
    assert!(err.to_string().contains("o9"));
}

#[test]
fn test_uniform_draws_in_batched_blocks() {
    let table = plant_table();
    let config = SensitivityConfig {
        distribution: PerturbationDistribution::Uniform,
        ..SensitivityConfig::default().with_n(200).with_std(1.0).with_seed(12)
    };
    let mut process = CountingProcess::new(plant);

    let records = perturb_batched(&table, &INPUTS, &OUTPUTS, &mut process, &config).unwrap();

    assert_eq!(process.calls(), 2);
    let half_width = 3f64.sqrt();
    assert!(
        records
            .iter()
            .all(|r| r.input_perturbation.abs() <= half_width + 1e-9)
    );
    let deltas: Vec<f64> = records.pair("a", "o1").map(|r| r.input_perturbation).collect();
    assert!((std_dev(&deltas) - 1.0).abs() < 0.05);
    let (x, y) = records.normalized_pair("a", "o1");
    assert!((compute_metrics(&x, &y).correlation - 1.0).abs() < 1e-9);
}
