//! Row replication.
//!
//! Each source row is copied `n` times into a contiguous run, so replicated
//! row `k` originates from source row `k / n`.

use crate::error::{Result, SensitivityError};
use crate::table::Table;

/// A replicated table and the source row of each of its rows
#[derive(Debug, Clone)]
pub struct Replicated {
    pub table: Table,
    /// `origin[k]` is the row index in the source table that row `k` was copied from
    pub origin: Vec<usize>,
}

/// Origin index for `rows` source rows each repeated `n` times.
pub fn origin_index(rows: usize, n: usize) -> Vec<usize> {
    (0..rows).flat_map(|r| std::iter::repeat_n(r, n)).collect()
}

/// Repeat every row of `table` `n` times.
pub fn replicate_rows(table: &Table, n: usize) -> Result<Replicated> {
    if n < 1 {
        return Err(SensitivityError::invalid(
            "replication count must be at least 1",
        ));
    }
    if table.is_empty() {
        return Err(SensitivityError::invalid("cannot replicate an empty table"));
    }
    let origin = origin_index(table.nrows(), n);
    Ok(Replicated {
        table: table.take_rows(&origin),
        origin,
    })
}
