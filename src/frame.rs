//! Frame types for datatable.
//!
//! A [`Frame`] is the tabular input to the pipeline: an Arrow
//! [`RecordBatch`] of data columns, a row [`Index`] and a [`ColumnLabels`]
//! structure. Column names are not required to be unique.
//!
//! Cloning a frame never copies column data; Arrow arrays are reference
//! counted, so a clone is the cheap shallow snapshot the handoff cache keeps.

use std::sync::Arc;

use arrow::{
    array::{ArrayRef, Int64Array, RecordBatch, RecordBatchOptions},
    datatypes::{Field, Schema},
};

use crate::error::{Error, Result};

/// One level of a row index: an optional name and one label per row.
#[derive(Debug, Clone)]
pub struct IndexLevel {
    name: Option<String>,
    values: ArrayRef,
}

impl IndexLevel {
    /// Creates an unnamed index level.
    pub fn new(values: ArrayRef) -> Self {
        Self { name: None, values }
    }

    /// Creates a named index level.
    pub fn named(name: impl Into<String>, values: ArrayRef) -> Self {
        Self {
            name: Some(name.into()),
            values,
        }
    }

    /// Returns the level name, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the row labels of this level.
    pub fn values(&self) -> &ArrayRef {
        &self.values
    }

    /// Returns the number of labels.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the level has no labels.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Row index of a frame, made of one or more levels of equal length.
#[derive(Debug, Clone)]
pub struct Index {
    levels: Vec<IndexLevel>,
}

impl Index {
    /// Creates the default `0..len` index.
    #[allow(clippy::cast_possible_wrap)]
    pub fn range(len: usize) -> Self {
        let values = Int64Array::from_iter_values(0..len as i64);
        Self::single(IndexLevel::new(Arc::new(values)))
    }

    /// Creates a single-level index.
    pub fn single(level: IndexLevel) -> Self {
        Self {
            levels: vec![level],
        }
    }

    /// Creates a hierarchical index from several levels.
    ///
    /// # Errors
    ///
    /// Returns an error if no levels are given or the levels differ in
    /// length.
    pub fn multi(levels: Vec<IndexLevel>) -> Result<Self> {
        let Some(first) = levels.first() else {
            return Err(Error::structural("an index needs at least one level"));
        };
        let expected = first.len();
        if let Some(level) = levels.iter().find(|l| l.len() != expected) {
            return Err(Error::IndexLengthMismatch {
                index_len: level.len(),
                rows: expected,
            });
        }
        Ok(Self { levels })
    }

    /// Returns the index levels, outermost first.
    pub fn levels(&self) -> &[IndexLevel] {
        &self.levels
    }

    /// Returns the number of levels.
    pub fn nlevels(&self) -> usize {
        self.levels.len()
    }

    /// Returns true for a hierarchical index.
    pub fn is_multi_level(&self) -> bool {
        self.levels.len() > 1
    }

    /// Returns the number of row labels.
    pub fn len(&self) -> usize {
        self.levels.first().map_or(0, IndexLevel::len)
    }

    /// Returns true if the index has no labels.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Column label structure of a frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ColumnLabels {
    /// One label per column, taken from the schema field names.
    #[default]
    Flat,
    /// Hierarchical labels: one row of labels per level, each with one entry
    /// per column.
    MultiLevel(Vec<Vec<String>>),
}

impl ColumnLabels {
    /// Returns the number of label levels.
    pub fn nlevels(&self) -> usize {
        match self {
            Self::Flat => 1,
            Self::MultiLevel(levels) => levels.len(),
        }
    }

    /// Returns true for hierarchical column labels.
    pub fn is_multi_level(&self) -> bool {
        self.nlevels() > 1
    }
}

/// An immutable table: data columns, a row index and column labels.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
///
/// use arrow::array::{Int32Array, StringArray};
/// use datatable::Frame;
///
/// let frame = Frame::from_columns(vec![
///     ("id", Arc::new(Int32Array::from(vec![1, 2, 3])) as _),
///     ("name", Arc::new(StringArray::from(vec!["a", "b", "c"])) as _),
/// ])
/// .unwrap();
/// assert_eq!(frame.num_rows(), 3);
/// assert_eq!(frame.index().nlevels(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct Frame {
    batch: RecordBatch,
    index: Index,
    column_labels: ColumnLabels,
}

impl Frame {
    /// Creates a frame over a record batch with the default range index.
    pub fn new(batch: RecordBatch) -> Self {
        let index = Index::range(batch.num_rows());
        Self {
            batch,
            index,
            column_labels: ColumnLabels::Flat,
        }
    }

    /// Creates a frame from named columns. Names may repeat.
    ///
    /// # Errors
    ///
    /// Returns an error if the columns differ in length.
    pub fn from_columns<S: Into<String>>(columns: Vec<(S, ArrayRef)>) -> Result<Self> {
        let (fields, arrays): (Vec<Field>, Vec<ArrayRef>) = columns
            .into_iter()
            .map(|(name, array)| (Field::new(name, array.data_type().clone(), true), array))
            .unzip();
        let batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?;
        Ok(Self::new(batch))
    }

    /// Creates a frame with no data columns, only an index.
    ///
    /// # Errors
    ///
    /// Returns an error if the empty batch cannot be built.
    pub fn from_index(index: Index) -> Result<Self> {
        let options = RecordBatchOptions::new().with_row_count(Some(index.len()));
        let batch = RecordBatch::try_new_with_options(Arc::new(Schema::empty()), vec![], &options)?;
        Ok(Self {
            batch,
            index,
            column_labels: ColumnLabels::Flat,
        })
    }

    /// Replaces the row index.
    ///
    /// # Errors
    ///
    /// Returns an error if the index length differs from the row count.
    pub fn with_index(mut self, index: Index) -> Result<Self> {
        if index.len() != self.num_rows() {
            return Err(Error::IndexLengthMismatch {
                index_len: index.len(),
                rows: self.num_rows(),
            });
        }
        self.index = index;
        Ok(self)
    }

    /// Replaces the column label structure.
    ///
    /// # Errors
    ///
    /// Returns an error if a label level does not have one entry per column.
    pub fn with_column_labels(mut self, labels: ColumnLabels) -> Result<Self> {
        if let ColumnLabels::MultiLevel(levels) = &labels {
            if let Some(level) = levels.iter().find(|l| l.len() != self.num_columns()) {
                return Err(Error::column_labels(format!(
                    "expected {} labels per level, got {}",
                    self.num_columns(),
                    level.len()
                )));
            }
        }
        self.column_labels = labels;
        Ok(self)
    }

    /// Returns the underlying record batch.
    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    /// Returns the row index.
    pub fn index(&self) -> &Index {
        &self.index
    }

    /// Returns the column label structure.
    pub fn column_labels(&self) -> &ColumnLabels {
        &self.column_labels
    }

    /// Returns the number of rows.
    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    /// Returns the number of data columns (index levels excluded).
    pub fn num_columns(&self) -> usize {
        self.batch.num_columns()
    }

    /// Returns the data column names in position order.
    pub fn column_names(&self) -> Vec<&str> {
        self.batch
            .schema_ref()
            .fields()
            .iter()
            .map(|f| f.name().as_str())
            .collect()
    }

    /// Returns the data column at `position`.
    pub fn column(&self, position: usize) -> Option<&ArrayRef> {
        (position < self.num_columns()).then(|| self.batch.column(position))
    }

    /// Returns true if the index or the column labels are hierarchical.
    pub fn is_multi_level(&self) -> bool {
        self.index.is_multi_level() || self.column_labels.is_multi_level()
    }

    /// Returns a copy that shares all column storage with `self`.
    #[must_use]
    pub fn shallow_copy(&self) -> Self {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use arrow::array::{Array, Int32Array, StringArray};

    use super::*;

    fn create_test_frame(rows: usize) -> Frame {
        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        let ids: Vec<i32> = (0..rows as i32).collect();
        let names: Vec<String> = ids.iter().map(|i| format!("item_{i}")).collect();
        Frame::from_columns(vec![
            ("id", Arc::new(Int32Array::from(ids)) as ArrayRef),
            ("name", Arc::new(StringArray::from(names)) as ArrayRef),
        ])
        .unwrap()
    }

    #[test]
    fn test_default_range_index() {
        let frame = create_test_frame(4);
        assert_eq!(frame.index().nlevels(), 1);
        assert_eq!(frame.index().len(), 4);
        assert!(frame.index().levels()[0].name().is_none());
        let labels = frame.index().levels()[0]
            .values()
            .as_any()
            .downcast_ref::<Int64Array>()
            .unwrap();
        assert_eq!(labels.values().to_vec(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_duplicate_column_names_allowed() {
        let frame = Frame::from_columns(vec![
            ("x", Arc::new(Int32Array::from(vec![1, 2])) as ArrayRef),
            ("x", Arc::new(Int32Array::from(vec![3, 4])) as ArrayRef),
        ])
        .unwrap();
        assert_eq!(frame.column_names(), vec!["x", "x"]);
    }

    #[test]
    fn test_mismatched_column_lengths() {
        let result = Frame::from_columns(vec![
            ("a", Arc::new(Int32Array::from(vec![1, 2])) as ArrayRef),
            ("b", Arc::new(Int32Array::from(vec![1])) as ArrayRef),
        ]);
        assert!(matches!(result, Err(Error::Arrow(_))));
    }

    #[test]
    fn test_with_index_length_mismatch() {
        let frame = create_test_frame(3);
        let index = Index::range(5);
        let result = frame.with_index(index);
        assert!(matches!(
            result,
            Err(Error::IndexLengthMismatch {
                index_len: 5,
                rows: 3
            })
        ));
    }

    #[test]
    fn test_multi_level_index() {
        let outer = IndexLevel::named("a", Arc::new(StringArray::from(vec!["x", "y"])));
        let inner = IndexLevel::named("b", Arc::new(Int32Array::from(vec![1, 2])));
        let index = Index::multi(vec![outer, inner]).unwrap();
        let frame = create_test_frame(2).with_index(index).unwrap();
        assert!(frame.is_multi_level());
        assert_eq!(frame.index().nlevels(), 2);
    }

    #[test]
    fn test_multi_index_rejects_ragged_levels() {
        let outer = IndexLevel::new(Arc::new(Int32Array::from(vec![1, 2, 3])));
        let inner = IndexLevel::new(Arc::new(Int32Array::from(vec![1])));
        assert!(Index::multi(vec![outer, inner]).is_err());
        assert!(Index::multi(vec![]).is_err());
    }

    #[test]
    fn test_multi_level_columns() {
        let labels = ColumnLabels::MultiLevel(vec![
            vec!["g".to_string(), "g".to_string()],
            vec!["id".to_string(), "name".to_string()],
        ]);
        let frame = create_test_frame(2).with_column_labels(labels).unwrap();
        assert!(frame.is_multi_level());
        assert_eq!(frame.column_labels().nlevels(), 2);
    }

    #[test]
    fn test_multi_level_columns_wrong_width() {
        let labels = ColumnLabels::MultiLevel(vec![vec!["only".to_string()]]);
        assert!(create_test_frame(2).with_column_labels(labels).is_err());
    }

    #[test]
    fn test_from_index_has_rows_without_columns() {
        let frame = Frame::from_index(Index::range(3)).unwrap();
        assert_eq!(frame.num_rows(), 3);
        assert_eq!(frame.num_columns(), 0);
    }

    #[test]
    fn test_shallow_copy_shares_storage() {
        let frame = create_test_frame(10);
        let copy = frame.shallow_copy();
        let original = frame.column(0).unwrap().to_data();
        let copied = copy.column(0).unwrap().to_data();
        assert!(original.ptr_eq(&copied));
    }

    #[test]
    fn test_column_out_of_range() {
        let frame = create_test_frame(2);
        assert!(frame.column(2).is_none());
    }
}
