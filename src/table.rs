use std::collections::BTreeMap;

use itertools::izip;
use log::debug;
use na::DMatrix;
use ordered_float::OrderedFloat;

use crate::{
    error::{Result, StorageError},
    source::StorageSource,
    types::Float,
};

/// Name of the synthetic column holding the row timestamps.
pub const TIME_COLUMN: &str = "time";

/// An immutable, time-indexed table with named columns.
///
/// Columns are `["time"] + labels`; every row starts with its timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    index: Vec<Float>,
    rows: Vec<Vec<Float>>,
    lookup: BTreeMap<OrderedFloat<Float>, usize>,
}

impl Table {
    pub fn column_names(&self) -> &[String] {
        &self.columns
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row index, i.e. the time column's values.
    pub fn index(&self) -> &[Float] {
        &self.index
    }

    /// Row `i`, starting with its timestamp.
    pub fn row(&self, i: usize) -> Option<&[Float]> {
        self.rows.get(i).map(Vec::as_slice)
    }

    pub fn rows(&self) -> &[Vec<Float>] {
        &self.rows
    }

    /// Look up a row by its exact time value. When several rows share a
    /// timestamp the first one is returned.
    pub fn row_at_time(&self, time: Float) -> Option<&[Float]> {
        self.lookup
            .get(&OrderedFloat(time))
            .and_then(|&i| self.row(i))
    }

    /// Position of a column by name. Data labels are searched before the
    /// synthetic time column, so a label that is literally `time` stays
    /// reachable; the timestamps are always available through [`Table::index`].
    pub fn column_position(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .skip(1)
            .position(|c| c == name)
            .map(|j| j + 1)
            .or_else(|| (name == TIME_COLUMN).then_some(0))
    }

    /// Copy out every value of column `j`, in row order.
    pub fn column_at(&self, j: usize) -> Option<Vec<Float>> {
        if j >= self.column_count() {
            return None;
        }
        Some(self.rows.iter().map(|row| row[j]).collect())
    }

    /// Copy out every value of the named column, in row order.
    pub fn column(&self, name: &str) -> Result<Vec<Float>> {
        self.column_position(name)
            .and_then(|j| self.column_at(j))
            .ok_or_else(|| StorageError::UnknownColumn(name.to_string()))
    }

    /// Dense `rows x columns` matrix of the table, time column included.
    pub fn to_matrix(&self) -> DMatrix<Float> {
        DMatrix::from_fn(self.row_count(), self.column_count(), |i, j| {
            self.rows[i][j]
        })
    }
}

/// Read a storage source into a time-indexed table.
///
/// The time column length must equal the row count, and every row must
/// carry exactly one value per label. Any disagreement is reported as
/// [`StorageError::InconsistentLength`] and no table is produced. A row whose
/// own timestamp differs from the time column is
/// [`StorageError::InconsistentTime`].
pub fn read_table<S: StorageSource + ?Sized>(source: &S) -> Result<Table> {
    let labels = source.labels();
    let time = source.time_column();
    let row_count = source.row_count();

    if time.len() != row_count {
        return Err(StorageError::inconsistent_length(
            "time column",
            row_count,
            time.len(),
        ));
    }

    let rows = izip!(0..row_count, time.iter())
        .map(|(i, &t)| -> Result<Vec<Float>> {
            let missing_row = || StorageError::inconsistent_length("row count", row_count, i);
            let row_time = source.row_time(i).ok_or_else(missing_row)?;
            if OrderedFloat(row_time) != OrderedFloat(t) {
                return Err(StorageError::inconsistent_time(i, row_time, t));
            }
            let values = source.row_values(i).ok_or_else(missing_row)?;
            if values.len() != labels.len() {
                return Err(StorageError::inconsistent_length(
                    format!("row {}", i),
                    labels.len(),
                    values.len(),
                ));
            }
            Ok(std::iter::once(t).chain(values.iter().copied()).collect())
        })
        .collect::<Result<Vec<Vec<Float>>>>()?;

    let columns = std::iter::once(TIME_COLUMN.to_string())
        .chain(labels.iter().cloned())
        .collect();

    let mut lookup = BTreeMap::new();
    for (i, &t) in time.iter().enumerate() {
        lookup.entry(OrderedFloat(t)).or_insert(i);
    }

    debug!("read table: {} rows, {} labels", rows.len(), labels.len());
    Ok(Table {
        columns,
        index: time,
        rows,
        lookup,
    })
}
