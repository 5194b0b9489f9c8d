//! Table rendering configuration.
//!
//! [`TableConfig`] holds the defaults a [`crate::TableRenderer`] applies to
//! every frame; [`TableOptions`] overrides them for a single call.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default for [`TableConfig::include_index`].
pub const DEFAULT_INCLUDE_INDEX: bool = true;
/// Default for [`TableConfig::num_rows_per_page`].
pub const DEFAULT_ROWS_PER_PAGE: usize = 25;
/// Default for [`TableConfig::max_rows`].
pub const DEFAULT_MAX_ROWS: usize = 20_000;
/// Default for [`TableConfig::max_columns`].
pub const DEFAULT_MAX_COLUMNS: usize = 20;

/// Resolved rendering configuration.
///
/// # Example
///
/// ```
/// use datatable::TableConfig;
///
/// let config = TableConfig::default().with_max_rows(500);
/// assert_eq!(config.max_rows, 500);
/// assert_eq!(config.num_rows_per_page, 25);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TableConfig {
    /// Whether the row index is flattened into leading columns.
    pub include_index: bool,
    /// Initial page size hint for the widget.
    pub num_rows_per_page: usize,
    /// Row ceiling.
    pub max_rows: usize,
    /// Data column ceiling, counted before the index is flattened.
    pub max_columns: usize,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            include_index: DEFAULT_INCLUDE_INDEX,
            num_rows_per_page: DEFAULT_ROWS_PER_PAGE,
            max_rows: DEFAULT_MAX_ROWS,
            max_columns: DEFAULT_MAX_COLUMNS,
        }
    }
}

impl TableConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a configuration from JSON; missing keys take defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or the result is invalid.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Sets whether the index is included.
    #[must_use]
    pub fn with_include_index(mut self, include_index: bool) -> Self {
        self.include_index = include_index;
        self
    }

    /// Sets the page size hint.
    #[must_use]
    pub fn with_rows_per_page(mut self, rows: usize) -> Self {
        self.num_rows_per_page = rows;
        self
    }

    /// Sets the row ceiling.
    #[must_use]
    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = max_rows;
        self
    }

    /// Sets the column ceiling.
    #[must_use]
    pub fn with_max_columns(mut self, max_columns: usize) -> Self {
        self.max_columns = max_columns;
        self
    }

    /// Checks the configuration for values the widget cannot use.
    ///
    /// # Errors
    ///
    /// Returns an error if the page size is zero.
    pub fn validate(&self) -> Result<()> {
        if self.num_rows_per_page == 0 {
            return Err(Error::invalid_config("num_rows_per_page must be positive"));
        }
        Ok(())
    }
}

/// Per-call overrides; unset fields fall back to the renderer defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TableOptions {
    /// Overrides [`TableConfig::include_index`].
    pub include_index: Option<bool>,
    /// Overrides [`TableConfig::num_rows_per_page`].
    pub num_rows_per_page: Option<usize>,
    /// Overrides [`TableConfig::max_rows`].
    pub max_rows: Option<usize>,
    /// Overrides [`TableConfig::max_columns`].
    pub max_columns: Option<usize>,
}

impl TableOptions {
    /// Creates options with nothing overridden.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides whether the index is included.
    #[must_use]
    pub fn include_index(mut self, include_index: bool) -> Self {
        self.include_index = Some(include_index);
        self
    }

    /// Overrides the page size hint.
    #[must_use]
    pub fn rows_per_page(mut self, rows: usize) -> Self {
        self.num_rows_per_page = Some(rows);
        self
    }

    /// Overrides the row ceiling.
    #[must_use]
    pub fn max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = Some(max_rows);
        self
    }

    /// Overrides the column ceiling.
    #[must_use]
    pub fn max_columns(mut self, max_columns: usize) -> Self {
        self.max_columns = Some(max_columns);
        self
    }

    /// Fills unset fields from `defaults`.
    pub fn resolve(&self, defaults: &TableConfig) -> TableConfig {
        TableConfig {
            include_index: self.include_index.unwrap_or(defaults.include_index),
            num_rows_per_page: self.num_rows_per_page.unwrap_or(defaults.num_rows_per_page),
            max_rows: self.max_rows.unwrap_or(defaults.max_rows),
            max_columns: self.max_columns.unwrap_or(defaults.max_columns),
        }
    }
}
