//! Perturbation records: one row per simulated perturbation instance.

use serde::{Deserialize, Serialize};

use crate::normalize::{Normalization, divide_by_std};

/// One perturbed row for one (input, output) pair.
///
/// Field names are the stable column names of the perturbation table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerturbationRecord {
    pub input_variable: String,
    pub output_variable: String,
    /// Row in the caller's input table this record was replicated from
    pub source_row: usize,
    pub input_unperturbed: f64,
    pub input_perturbation: f64,
    /// Input perturbation divided by the population std of the unperturbed input
    pub input_perturbation_std: f64,
    pub input_perturbed: f64,
    pub output_unperturbed: f64,
    pub output_perturbation: f64,
    /// Output perturbation scaled by the configured [`Normalization`]
    pub output_perturbation_std: f64,
    pub output_perturbed: f64,
}

impl PerturbationRecord {
    /// Whether any computed column is `NaN`
    pub fn has_missing(&self) -> bool {
        [
            self.input_unperturbed,
            self.input_perturbation,
            self.input_perturbation_std,
            self.input_perturbed,
            self.output_unperturbed,
            self.output_perturbation,
            self.output_perturbation_std,
            self.output_perturbed,
        ]
        .iter()
        .any(|v| v.is_nan())
    }
}

/// Row-aligned raw values for one pair, before normalization
pub(crate) struct PairColumns<'a> {
    pub input_variable: &'a str,
    pub output_variable: &'a str,
    pub source_rows: &'a [usize],
    pub input_unperturbed: &'a [f64],
    pub input_perturbed: &'a [f64],
    pub output_unperturbed: &'a [f64],
    pub output_perturbed: &'a [f64],
}

impl PairColumns<'_> {
    /// Compute deltas and normalized deltas and assemble the records.
    pub(crate) fn into_records(
        self,
        normalization: Normalization,
        drop_missing: bool,
    ) -> Vec<PerturbationRecord> {
        let delta = |perturbed: &[f64], unperturbed: &[f64]| -> Vec<f64> {
            perturbed
                .iter()
                .zip(unperturbed)
                .map(|(p, u)| p - u)
                .collect()
        };
        let input_delta = delta(self.input_perturbed, self.input_unperturbed);
        let output_delta = delta(self.output_perturbed, self.output_unperturbed);
        let input_std = divide_by_std(&input_delta, self.input_unperturbed);
        let output_std = normalization.apply(&output_delta, self.output_unperturbed);

        (0..self.source_rows.len())
            .map(|k| PerturbationRecord {
                input_variable: self.input_variable.to_string(),
                output_variable: self.output_variable.to_string(),
                source_row: self.source_rows[k],
                input_unperturbed: self.input_unperturbed[k],
                input_perturbation: input_delta[k],
                input_perturbation_std: input_std[k],
                input_perturbed: self.input_perturbed[k],
                output_unperturbed: self.output_unperturbed[k],
                output_perturbation: output_delta[k],
                output_perturbation_std: output_std[k],
                output_perturbed: self.output_perturbed[k],
            })
            .filter(|r| !(drop_missing && r.has_missing()))
            .collect()
    }
}

/// All perturbation records of a run, tagged by pair
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerturbationTable {
    pub records: Vec<PerturbationRecord>,
}

impl PerturbationTable {
    pub fn new(records: Vec<PerturbationRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PerturbationRecord> {
        self.records.iter()
    }

    /// Records belonging to one (input, output) pair, in generation order
    pub fn pair<'a>(
        &'a self,
        input: &'a str,
        output: &'a str,
    ) -> impl Iterator<Item = &'a PerturbationRecord> + 'a {
        self.records
            .iter()
            .filter(move |r| r.input_variable == input && r.output_variable == output)
    }

    /// Normalized input and output sequences for one pair
    pub fn normalized_pair(&self, input: &str, output: &str) -> (Vec<f64>, Vec<f64>) {
        self.pair(input, output)
            .map(|r| (r.input_perturbation_std, r.output_perturbation_std))
            .unzip()
    }

    pub fn extend(&mut self, other: PerturbationTable) {
        self.records.extend(other.records);
    }
}

impl FromIterator<PerturbationRecord> for PerturbationTable {
    fn from_iter<I: IntoIterator<Item = PerturbationRecord>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}
