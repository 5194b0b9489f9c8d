//! Encoding a prepared table into the widget payload.

use arrow::array::Array;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    error::{Error, Result},
    formatter::{is_null_cell, ColumnKind, FormatterRegistry},
    preprocess::PreparedTable,
};

/// URL of the interactive table widget module.
pub const WIDGET_MODULE_URL: &str =
    "https://ssl.gstatic.com/colaboratory/data_table/6adb00bb049ef96e/data_table.js";

/// Help page linked from the widget.
pub const HELP_URL: &str = "https://colab.research.google.com/notebooks/data_table.ipynb";

/// Width hint for flattened index columns; the widget expands it as needed.
pub const INDEX_COLUMN_WIDTH: &str = "1px";

/// Style class for flattened index columns.
pub const INDEX_COLUMN_CLASS: &str = "index_column";

/// `[type tag, header]` pair describing one column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnHeader(pub ColumnKind, pub String);

impl ColumnHeader {
    /// Returns the column kind.
    pub fn kind(&self) -> ColumnKind {
        self.0
    }

    /// Returns the formatted header.
    pub fn label(&self) -> &str {
        &self.1
    }
}

/// Rendering hint for one column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnOption {
    /// CSS width.
    pub width: String,
    /// CSS class.
    pub class_name: String,
}

impl ColumnOption {
    /// The minimal-width hint used for flattened index columns.
    pub fn index_column() -> Self {
        Self {
            width: INDEX_COLUMN_WIDTH.to_string(),
            class_name: INDEX_COLUMN_CLASS.to_string(),
        }
    }
}

/// The structured, JSON-safe payload handed to the remote widget.
///
/// Every row has exactly one cell per entry of `columns`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TablePayload {
    /// Row-major cell values.
    pub rows: Vec<Vec<Value>>,
    /// Column descriptors.
    pub columns: Vec<ColumnHeader>,
    /// Per-column hints; one per flattened index level.
    pub column_options: Vec<ColumnOption>,
    /// Initial page size.
    pub rows_per_page: usize,
    /// Help link shown by the widget.
    pub help_url: String,
}

impl TablePayload {
    /// Returns the number of rows.
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Returns the number of columns.
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Serializes the payload to JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Renders the module snippet that loads the widget and hands it this
    /// payload.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_javascript_module(&self) -> Result<String> {
        Ok(format!(
            r#"
      import "{url}";

      window.createDataTable({{
        data: {data},
        columns: {columns},
        columnOptions: {options},
        rowsPerPage: {rows_per_page},
        helpUrl: "{help_url}",
      }});
    "#,
            url = WIDGET_MODULE_URL,
            data = serde_json::to_string(&self.rows)?,
            columns = serde_json::to_string(&self.columns)?,
            options = serde_json::to_string(&self.column_options)?,
            rows_per_page = self.rows_per_page,
            help_url = self.help_url,
        ))
    }
}

/// Encodes `table` with the formatters in `registry`.
///
/// Each column gets its formatter once, from its declared type, and is
/// formatted in one pass. Null cells encode as `null`; cells the formatter
/// rejects go through the fallback.
///
/// # Errors
///
/// Returns [`Error::EncodingFailure`] if a column is shorter than the table
/// or a row ends up with the wrong number of cells.
pub fn encode(
    table: &PreparedTable,
    registry: &FormatterRegistry,
    rows_per_page: usize,
) -> Result<TablePayload> {
    let num_rows = table.num_rows();
    let mut rows: Vec<Vec<Value>> = (0..num_rows)
        .map(|_| Vec::with_capacity(table.num_columns()))
        .collect();
    let mut columns = Vec::with_capacity(table.num_columns());
    let fallback = registry.fallback_formatter();

    for column in table.columns() {
        let values = &column.values;
        if values.len() < num_rows {
            return Err(Error::encoding(format!(
                "column '{}' has {} values, expected {}",
                column.label,
                values.len(),
                num_rows
            )));
        }

        let kind = ColumnKind::from_data_type(values.data_type());
        let formatter = registry.formatter_for(values.data_type());
        let cells = formatter.format_column(values.as_ref(), num_rows);
        for (row, (row_cells, cell)) in rows.iter_mut().zip(cells).enumerate() {
            let cell = if is_null_cell(values.as_ref(), row) {
                Value::Null
            } else {
                cell.unwrap_or_else(|_| fallback.format_value(values.as_ref(), row))
            };
            row_cells.push(cell);
        }
        columns.push(ColumnHeader(kind, formatter.format_header(&column.label)));
    }

    if let Some((row, cells)) = rows
        .iter()
        .enumerate()
        .find(|(_, cells)| cells.len() != columns.len())
    {
        return Err(Error::encoding(format!(
            "row {row} has {} cells, expected {}",
            cells.len(),
            columns.len()
        )));
    }

    let column_options = vec![ColumnOption::index_column(); table.index_columns()];

    Ok(TablePayload {
        rows,
        columns,
        column_options,
        rows_per_page,
        help_url: HELP_URL.to_string(),
    })
}
