//! Shaping a frame into a bounded, flat table ready for encoding.
//!
//! Preprocessing truncates to a strict prefix of rows and data columns,
//! optionally flattens the index into leading columns, and switches column
//! lookup to positions when labels repeat. The input frame is never
//! modified; every column of the result is a zero-copy slice.

use std::collections::HashSet;

use arrow::array::{Array, ArrayRef};
use tracing::debug;

use crate::{
    error::{Error, Result},
    frame::{Frame, IndexLevel},
};

/// Lookup key for a prepared column, for callers that address columns
/// after preprocessing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnKey {
    /// By label; only used when all labels are unique.
    Name(String),
    /// By position; used when any label repeats.
    Position(usize),
}

/// A column of a [`PreparedTable`].
#[derive(Debug, Clone)]
pub struct PreparedColumn {
    /// Caller-visible header.
    pub label: String,
    /// Lookup key for the values.
    pub key: ColumnKey,
    /// Values, already truncated.
    pub values: ArrayRef,
}

/// The bounded, flat view of a frame the encoder walks.
#[derive(Debug, Clone)]
pub struct PreparedTable {
    columns: Vec<PreparedColumn>,
    num_rows: usize,
    index_columns: usize,
}

impl PreparedTable {
    /// Returns the columns, flattened index levels first.
    pub fn columns(&self) -> &[PreparedColumn] {
        &self.columns
    }

    /// Returns the number of rows.
    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    /// Returns the number of columns.
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Returns how many leading columns came from the index.
    pub fn index_columns(&self) -> usize {
        self.index_columns
    }

    /// Returns true if column lookup is positional.
    pub fn is_positional(&self) -> bool {
        matches!(
            self.columns.first().map(|c| &c.key),
            Some(ColumnKey::Position(_))
        )
    }

    /// Looks up a column's values by key.
    pub fn resolve(&self, key: &ColumnKey) -> Option<&ArrayRef> {
        match key {
            ColumnKey::Position(position) => self.columns.get(*position).map(|c| &c.values),
            ColumnKey::Name(name) => self
                .columns
                .iter()
                .find(|c| &c.label == name)
                .map(|c| &c.values),
        }
    }
}

/// Preprocessing parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreprocessOptions {
    /// Row ceiling.
    pub max_rows: usize,
    /// Data column ceiling.
    pub max_columns: usize,
    /// Whether to flatten the index.
    pub include_index: bool,
}

/// Bounds and flattens `frame`.
///
/// The index is flattened when `include_index` is set or when no data
/// column survives truncation, so an empty table still shows its labels.
///
/// # Errors
///
/// Returns [`Error::StructuralIncompatibility`] for a hierarchical index or
/// hierarchical column labels. Repeated column labels are not an error.
pub fn preprocess(frame: &Frame, options: PreprocessOptions) -> Result<PreparedTable> {
    if frame.index().is_multi_level() {
        return Err(Error::structural(format!(
            "index has {} levels",
            frame.index().nlevels()
        )));
    }
    if frame.column_labels().is_multi_level() {
        return Err(Error::structural(format!(
            "column labels have {} levels",
            frame.column_labels().nlevels()
        )));
    }

    let num_rows = frame.num_rows().min(options.max_rows);
    let num_data_columns = frame.num_columns().min(options.max_columns);
    let names = frame.column_names();

    let mut labelled: Vec<(String, ArrayRef)> = Vec::with_capacity(num_data_columns + 1);
    let flatten = options.include_index || num_data_columns == 0;
    let index_columns = if flatten {
        let levels = frame.index().levels();
        let shown = &names[..num_data_columns];
        for (position, level) in levels.iter().enumerate() {
            let label = index_label(level, position, levels.len(), shown);
            labelled.push((label, level.values().slice(0, num_rows)));
        }
        levels.len()
    } else {
        0
    };

    for (position, name) in names.iter().take(num_data_columns).enumerate() {
        let values = frame.batch().column(position).slice(0, num_rows);
        labelled.push(((*name).to_string(), values));
    }

    let mut seen = HashSet::with_capacity(labelled.len());
    let unique = labelled.iter().all(|(label, _)| seen.insert(label.as_str()));
    if !unique {
        debug!(
            columns = labelled.len(),
            "Column labels repeat, switching to positional lookup"
        );
    }

    let columns = labelled
        .into_iter()
        .enumerate()
        .map(|(position, (label, values))| PreparedColumn {
            key: if unique {
                ColumnKey::Name(label.clone())
            } else {
                ColumnKey::Position(position)
            },
            label,
            values,
        })
        .collect();

    Ok(PreparedTable {
        columns,
        num_rows,
        index_columns,
    })
}

/// Label for a flattened index level: its own name, else `index` for a
/// single level (`level_0` if a shown column already uses `index`), else
/// `level_<n>`.
fn index_label(level: &IndexLevel, position: usize, nlevels: usize, columns: &[&str]) -> String {
    if let Some(name) = level.name() {
        return name.to_string();
    }
    if nlevels == 1 && !columns.contains(&"index") {
        "index".to_string()
    } else {
        format!("level_{position}")
    }
}
