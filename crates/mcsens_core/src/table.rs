//! Column-oriented numeric table.
//!
//! Rows are observations, columns are named `f64` variables. Missing values
//! are stored as `NaN`. Every operation that reshapes a table returns a fresh
//! copy; a caller's table is never mutated by the analysis.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SensitivityError};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "TableData", into = "TableData")]
pub struct Table {
    names: Vec<String>,
    columns: Vec<Vec<f64>>,
    index: FxHashMap<String, usize>,
    nrows: usize,
}

/// Serialized form: an ordered list of named columns
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TableData {
    columns: Vec<(String, Vec<f64>)>,
}

impl TryFrom<TableData> for Table {
    type Error = SensitivityError;

    fn try_from(data: TableData) -> Result<Self> {
        Table::from_columns(data.columns)
    }
}

impl From<Table> for TableData {
    fn from(table: Table) -> Self {
        TableData {
            columns: table.names.into_iter().zip(table.columns).collect(),
        }
    }
}

impl PartialEq for Table {
    fn eq(&self, other: &Self) -> bool {
        self.names == other.names
            && self.columns.len() == other.columns.len()
            && self.columns.iter().zip(&other.columns).all(|(a, b)| {
                a.len() == b.len()
                    && a.iter()
                        .zip(b)
                        .all(|(x, y)| x.to_bits() == y.to_bits() || (x.is_nan() && y.is_nan()))
            })
    }
}

impl Table {
    /// Build a table from `(name, values)` pairs.
    ///
    /// Fails if two columns share a name or the columns differ in length.
    pub fn from_columns<S, I>(columns: I) -> Result<Self>
    where
        S: Into<String>,
        I: IntoIterator<Item = (S, Vec<f64>)>,
    {
        let mut table = Table::default();
        for (i, (name, values)) in columns.into_iter().enumerate() {
            let name = name.into();
            if i == 0 {
                table.nrows = values.len();
            } else if values.len() != table.nrows {
                return Err(SensitivityError::invalid(format!(
                    "column '{name}' has {} rows, expected {}",
                    values.len(),
                    table.nrows
                )));
            }
            if table.index.contains_key(&name) {
                return Err(SensitivityError::invalid(format!(
                    "duplicate column '{name}'"
                )));
            }
            table.index.insert(name.clone(), i);
            table.names.push(name);
            table.columns.push(values);
        }
        Ok(table)
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn ncols(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nrows == 0
    }

    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.index.get(name).map(|&i| self.columns[i].as_slice())
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut [f64]> {
        let i = *self.index.get(name)?;
        Some(self.columns[i].as_mut_slice())
    }

    /// Like [`Table::column`] but reports an absent column as an error.
    pub fn require(&self, name: &str) -> Result<&[f64]> {
        self.column(name)
            .ok_or_else(|| SensitivityError::invalid(format!("unknown variable '{name}'")))
    }

    /// Replace a column's values, or append it if the name is new.
    pub fn with_column(mut self, name: &str, values: Vec<f64>) -> Result<Self> {
        if self.ncols() > 0 && values.len() != self.nrows {
            return Err(SensitivityError::invalid(format!(
                "column '{name}' has {} rows, expected {}",
                values.len(),
                self.nrows
            )));
        }
        match self.index.get(name) {
            Some(&i) => self.columns[i] = values,
            None => {
                if self.ncols() == 0 {
                    self.nrows = values.len();
                }
                self.index.insert(name.to_string(), self.columns.len());
                self.names.push(name.to_string());
                self.columns.push(values);
            }
        }
        Ok(self)
    }

    /// Copy the given rows (in the given order, repeats allowed) into a new table.
    pub fn take_rows(&self, rows: &[usize]) -> Table {
        Table {
            names: self.names.clone(),
            columns: self
                .columns
                .iter()
                .map(|col| rows.iter().map(|&r| col[r]).collect())
                .collect(),
            index: self.index.clone(),
            nrows: rows.len(),
        }
    }

    /// Drop rows that are missing a value in any of `columns`.
    ///
    /// Returns the kept rows as a new table together with their row indices
    /// in `self`.
    pub fn drop_missing(&self, columns: &[&str]) -> Result<(Table, Vec<usize>)> {
        let selected = columns
            .iter()
            .map(|name| self.require(name))
            .collect::<Result<Vec<_>>>()?;
        let kept: Vec<usize> = (0..self.nrows)
            .filter(|&r| selected.iter().all(|col| !col[r].is_nan()))
            .collect();
        Ok((self.take_rows(&kept), kept))
    }

    /// Stack tables with identical column order on top of each other.
    pub fn vstack(tables: &[Table]) -> Result<Table> {
        let Some(first) = tables.first() else {
            return Ok(Table::default());
        };
        let mut stacked = first.clone();
        for table in &tables[1..] {
            if table.names != stacked.names {
                return Err(SensitivityError::invalid(
                    "cannot stack tables with different columns",
                ));
            }
            for (dst, src) in stacked.columns.iter_mut().zip(&table.columns) {
                dst.extend_from_slice(src);
            }
            stacked.nrows += table.nrows;
        }
        Ok(stacked)
    }
}
