//! Cell formatting for table payloads.
//!
//! Formatting is dispatched once per column from the column's declared Arrow
//! [`DataType`], never per value. Every data type maps to a [`ColumnKind`];
//! the [`FormatterRegistry`] maps each kind to a [`CellFormatter`]. Cells a
//! formatter cannot represent are handed to the [`FallbackFormatter`], which
//! never fails.

use std::{collections::HashMap, fmt, sync::Arc};

use arrow::{
    array::{
        Array, BinaryArray, BinaryViewArray, BooleanArray, Float16Array, Float32Array,
        Float64Array, Int16Array, Int32Array, Int64Array, Int8Array, LargeBinaryArray, LargeStringArray,
        StringArray, StringViewArray, UInt16Array, UInt32Array, UInt64Array, UInt8Array,
    },
    datatypes::DataType,
    util::display::{ArrayFormatter, FormatOptions},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::html::escape_html;

/// Number of bytes of an undecodable value kept by the fallback formatter.
pub const NONUNICODE_PREVIEW_BYTES: usize = 100;

/// Prefix marking values the fallback formatter could not decode as text.
pub const NONUNICODE_MARKER: &str = "nonunicode data:";

/// Semantic type of a column; its tag drives client-side rendering and
/// sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnKind {
    /// Strings.
    #[serde(rename = "string")]
    Textual,
    /// Integers and floating point numbers.
    #[serde(rename = "number")]
    Numeric,
    /// Booleans.
    #[serde(rename = "boolean")]
    Boolean,
    /// Dates, times and timestamps.
    #[serde(rename = "datetime")]
    Datetime,
    /// Raw bytes.
    #[serde(rename = "binary")]
    Binary,
    /// Everything else (nested, decimal, duration, null...).
    #[serde(rename = "object")]
    Other,
}

impl ColumnKind {
    /// Maps a declared Arrow type to its kind.
    pub fn from_data_type(data_type: &DataType) -> Self {
        match data_type {
            DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => Self::Textual,
            DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float16
            | DataType::Float32
            | DataType::Float64 => Self::Numeric,
            DataType::Boolean => Self::Boolean,
            DataType::Date32
            | DataType::Date64
            | DataType::Timestamp(_, _)
            | DataType::Time32(_)
            | DataType::Time64(_) => Self::Datetime,
            DataType::Binary | DataType::LargeBinary | DataType::BinaryView => Self::Binary,
            _ => Self::Other,
        }
    }

    /// Returns the tag sent to the renderer.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Textual => "string",
            Self::Numeric => "number",
            Self::Boolean => "boolean",
            Self::Datetime => "datetime",
            Self::Binary => "binary",
            Self::Other => "object",
        }
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a formatter declined a cell.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    /// The array is not of the type the formatter handles.
    #[error("expected {expected} array, got {actual}")]
    TypeMismatch {
        /// Type the formatter handles.
        expected: &'static str,
        /// Declared type of the array.
        actual: String,
    },
    /// Bytes are not valid UTF-8.
    #[error("value is not valid UTF-8")]
    Undecodable,
    /// The value has no JSON representation (NaN, infinity).
    #[error("value {0} has no JSON representation")]
    Unrepresentable(String),
    /// Arrow could not display the value.
    #[error("display failed: {0}")]
    Display(String),
}

/// Result of formatting a single cell.
pub type FormatResult<T> = std::result::Result<T, FormatError>;

/// Turns one cell of an Arrow array into a JSON-safe scalar.
pub trait CellFormatter: Send + Sync {
    /// Formats the non-null value at `row`.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be represented; the encoder then
    /// uses the fallback formatter for that cell.
    fn format_cell(&self, array: &dyn Array, row: usize) -> FormatResult<Value>;

    /// Formats the first `rows` cells of a column. Null cells yield
    /// `Value::Null`.
    ///
    /// Formatters with per-column setup override this to do it once.
    fn format_column(&self, array: &dyn Array, rows: usize) -> Vec<FormatResult<Value>> {
        (0..rows)
            .map(|row| {
                if is_null_cell(array, row) {
                    Ok(Value::Null)
                } else {
                    self.format_cell(array, row)
                }
            })
            .collect()
    }

    /// Formats a column header.
    fn format_header(&self, label: &str) -> String {
        label.to_string()
    }
}

fn mismatch(expected: &'static str, array: &dyn Array) -> FormatError {
    FormatError::TypeMismatch {
        expected,
        actual: array.data_type().to_string(),
    }
}

fn downcast<'a, T: 'static>(
    array: &'a dyn Array,
    expected: &'static str,
) -> FormatResult<&'a T> {
    array
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| mismatch(expected, array))
}

/// Passes strings through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextFormatter;

impl CellFormatter for TextFormatter {
    fn format_cell(&self, array: &dyn Array, row: usize) -> FormatResult<Value> {
        let text = match array.data_type() {
            DataType::Utf8 => downcast::<StringArray>(array, "utf8")?.value(row),
            DataType::LargeUtf8 => downcast::<LargeStringArray>(array, "large_utf8")?.value(row),
            DataType::Utf8View => downcast::<StringViewArray>(array, "utf8_view")?.value(row),
            _ => return Err(mismatch("string", array)),
        };
        Ok(Value::String(text.to_string()))
    }
}

/// Encodes integers and finite floats as JSON numbers.
#[derive(Debug, Clone, Copy, Default)]
pub struct NumberFormatter;

fn float_value(value: f64) -> FormatResult<Value> {
    serde_json::Number::from_f64(value)
        .map(Value::Number)
        .ok_or_else(|| FormatError::Unrepresentable(value.to_string()))
}

impl CellFormatter for NumberFormatter {
    fn format_cell(&self, array: &dyn Array, row: usize) -> FormatResult<Value> {
        match array.data_type() {
            DataType::Int8 => Ok(downcast::<Int8Array>(array, "i8")?.value(row).into()),
            DataType::Int16 => Ok(downcast::<Int16Array>(array, "i16")?.value(row).into()),
            DataType::Int32 => Ok(downcast::<Int32Array>(array, "i32")?.value(row).into()),
            DataType::Int64 => Ok(downcast::<Int64Array>(array, "i64")?.value(row).into()),
            DataType::UInt8 => Ok(downcast::<UInt8Array>(array, "u8")?.value(row).into()),
            DataType::UInt16 => Ok(downcast::<UInt16Array>(array, "u16")?.value(row).into()),
            DataType::UInt32 => Ok(downcast::<UInt32Array>(array, "u32")?.value(row).into()),
            DataType::UInt64 => Ok(downcast::<UInt64Array>(array, "u64")?.value(row).into()),
            DataType::Float16 => {
                float_value(downcast::<Float16Array>(array, "f16")?.value(row).to_f64())
            }
            DataType::Float32 => {
                float_value(f64::from(downcast::<Float32Array>(array, "f32")?.value(row)))
            }
            DataType::Float64 => float_value(downcast::<Float64Array>(array, "f64")?.value(row)),
            _ => Err(mismatch("number", array)),
        }
    }
}

/// Encodes booleans as JSON booleans.
#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanFormatter;

impl CellFormatter for BooleanFormatter {
    fn format_cell(&self, array: &dyn Array, row: usize) -> FormatResult<Value> {
        Ok(Value::Bool(
            downcast::<BooleanArray>(array, "bool")?.value(row),
        ))
    }
}

/// Formats any value with Arrow's display rules (ISO-8601 for temporal
/// types).
#[derive(Debug, Clone, Copy, Default)]
pub struct DisplayFormatter;

fn array_formatter<'a>(
    array: &'a dyn Array,
    options: &'a FormatOptions<'a>,
) -> FormatResult<ArrayFormatter<'a>> {
    ArrayFormatter::try_new(array, options).map_err(|e| FormatError::Display(e.to_string()))
}

fn formatted(formatter: &ArrayFormatter<'_>, row: usize) -> FormatResult<String> {
    formatter
        .value(row)
        .try_to_string()
        .map_err(|e| FormatError::Display(e.to_string()))
}

fn display_string(array: &dyn Array, row: usize) -> FormatResult<String> {
    let options = FormatOptions::default().with_display_error(false);
    let formatter = array_formatter(array, &options)?;
    formatted(&formatter, row)
}

impl CellFormatter for DisplayFormatter {
    fn format_cell(&self, array: &dyn Array, row: usize) -> FormatResult<Value> {
        display_string(array, row).map(Value::String)
    }

    fn format_column(&self, array: &dyn Array, rows: usize) -> Vec<FormatResult<Value>> {
        let options = FormatOptions::default().with_display_error(false);
        let formatter = match array_formatter(array, &options) {
            Ok(formatter) => formatter,
            Err(err) => return vec![Err(err); rows],
        };
        (0..rows)
            .map(|row| {
                if is_null_cell(array, row) {
                    Ok(Value::Null)
                } else {
                    formatted(&formatter, row).map(Value::String)
                }
            })
            .collect()
    }
}

fn binary_value(array: &dyn Array, row: usize) -> FormatResult<&[u8]> {
    match array.data_type() {
        DataType::Binary => Ok(downcast::<BinaryArray>(array, "binary")?.value(row)),
        DataType::LargeBinary => {
            Ok(downcast::<LargeBinaryArray>(array, "large_binary")?.value(row))
        }
        DataType::BinaryView => Ok(downcast::<BinaryViewArray>(array, "binary_view")?.value(row)),
        _ => Err(mismatch("binary", array)),
    }
}

/// Decodes bytes as strict UTF-8.
#[derive(Debug, Clone, Copy, Default)]
pub struct Utf8BytesFormatter;

impl CellFormatter for Utf8BytesFormatter {
    fn format_cell(&self, array: &dyn Array, row: usize) -> FormatResult<Value> {
        let bytes = binary_value(array, row)?;
        std::str::from_utf8(bytes)
            .map(|s| Value::String(s.to_string()))
            .map_err(|_| FormatError::Undecodable)
    }
}

/// Last-resort formatter; never fails.
///
/// Bytes that are not valid UTF-8 are read one byte per code point
/// (latin-1), cut to [`NONUNICODE_PREVIEW_BYTES`], HTML-escaped and marked
/// with [`NONUNICODE_MARKER`]. Other values use Arrow's display rules, or a
/// `<type>` placeholder when even that fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackFormatter;

impl FallbackFormatter {
    /// Formats the value at `row`.
    pub fn format_value(&self, array: &dyn Array, row: usize) -> Value {
        if is_null_cell(array, row) {
            return Value::Null;
        }
        if let Ok(bytes) = binary_value(array, row) {
            return match std::str::from_utf8(bytes) {
                Ok(text) => Value::String(text.to_string()),
                Err(_) => Value::String(force_to_latin1(bytes)),
            };
        }
        match display_string(array, row) {
            Ok(text) => Value::String(text),
            Err(_) => Value::String(format!("<{}>", array.data_type())),
        }
    }
}

impl CellFormatter for FallbackFormatter {
    fn format_cell(&self, array: &dyn Array, row: usize) -> FormatResult<Value> {
        Ok(self.format_value(array, row))
    }
}

/// Returns true if the cell at `row` is null, including every cell of a
/// `Null`-typed array.
pub fn is_null_cell(array: &dyn Array, row: usize) -> bool {
    matches!(array.data_type(), DataType::Null) || array.is_null(row)
}

/// Renders undecodable bytes as an escaped latin-1 preview.
pub fn force_to_latin1(bytes: &[u8]) -> String {
    let preview = &bytes[..bytes.len().min(NONUNICODE_PREVIEW_BYTES)];
    let text: String = preview.iter().map(|&b| char::from(b)).collect();
    format!("{NONUNICODE_MARKER} {}...", escape_html(&text))
}

/// Maps column kinds to formatters.
///
/// A fresh registry covers every [`ColumnKind`]; entries can be replaced or
/// removed, and kinds without an entry are formatted by the fallback.
///
/// # Example
///
/// ```
/// use arrow::datatypes::DataType;
/// use datatable::formatter::{ColumnKind, FormatterRegistry};
///
/// let registry = FormatterRegistry::new();
/// assert!(registry.has(ColumnKind::Textual));
/// let _formatter = registry.formatter_for(&DataType::Utf8);
/// ```
#[derive(Clone)]
pub struct FormatterRegistry {
    formatters: HashMap<ColumnKind, Arc<dyn CellFormatter>>,
    fallback: FallbackFormatter,
}

impl FormatterRegistry {
    /// Creates a registry with the built-in formatters.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register(ColumnKind::Textual, Arc::new(TextFormatter));
        registry.register(ColumnKind::Numeric, Arc::new(NumberFormatter));
        registry.register(ColumnKind::Boolean, Arc::new(BooleanFormatter));
        registry.register(ColumnKind::Datetime, Arc::new(DisplayFormatter));
        registry.register(ColumnKind::Binary, Arc::new(Utf8BytesFormatter));
        registry.register(ColumnKind::Other, Arc::new(DisplayFormatter));
        registry
    }

    /// Creates a registry where everything goes through the fallback.
    pub fn empty() -> Self {
        Self {
            formatters: HashMap::new(),
            fallback: FallbackFormatter,
        }
    }

    /// Registers (or replaces) the formatter for a kind.
    pub fn register(&mut self, kind: ColumnKind, formatter: Arc<dyn CellFormatter>) {
        self.formatters.insert(kind, formatter);
    }

    /// Removes the formatter for a kind.
    pub fn unregister(&mut self, kind: ColumnKind) -> Option<Arc<dyn CellFormatter>> {
        self.formatters.remove(&kind)
    }

    /// Check if a kind has a formatter.
    pub fn has(&self, kind: ColumnKind) -> bool {
        self.formatters.contains_key(&kind)
    }

    /// Returns the formatter for a declared type, or the fallback.
    pub fn formatter_for(&self, data_type: &DataType) -> Arc<dyn CellFormatter> {
        let kind = ColumnKind::from_data_type(data_type);
        match self.formatters.get(&kind) {
            Some(formatter) => Arc::clone(formatter),
            None => Arc::new(self.fallback) as Arc<dyn CellFormatter>,
        }
    }

    /// Returns the fallback formatter.
    pub fn fallback_formatter(&self) -> &FallbackFormatter {
        &self.fallback
    }
}

impl Default for FormatterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FormatterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<&str> = self.formatters.keys().map(|k| k.as_str()).collect();
        kinds.sort_unstable();
        f.debug_struct("FormatterRegistry")
            .field("kinds", &kinds)
            .finish()
    }
}
