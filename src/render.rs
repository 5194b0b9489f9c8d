//! The payload-generation boundary.
//!
//! [`TableRenderer`] ties preprocessing and encoding together and decides
//! what a host gets back:
//!
//! - [`TableRenderer::display_formatter`] is the automatic path used for
//!   every displayed frame. It declines (returns `None`) for hierarchical
//!   frames and for frames over the row or column ceiling, so a viewer is
//!   never shown a silently truncated table.
//! - [`TableRenderer::render`] is the explicit path. It truncates to the
//!   ceilings instead of declining.
//! - [`TableRenderer::mime_bundle`] always carries the plain HTML rendering
//!   and adds the payload when encoding succeeds.
//!
//! Encoding faults, panics included, are caught here, logged, and turned
//! into a degraded result; they never reach the host.

use std::{
    panic::{catch_unwind, AssertUnwindSafe},
    sync::Arc,
};

use serde::Serialize;
use tracing::{debug, error};

use crate::{
    config::{TableConfig, TableOptions},
    encode::{encode, TablePayload},
    error::{Error, Result},
    formatter::FormatterRegistry,
    frame::Frame,
    html::render_frame,
    preprocess::{preprocess, PreprocessOptions},
};

/// Output for a host display call: plain HTML plus, when available, the
/// structured payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MimeBundle {
    /// Plain HTML table.
    pub html: String,
    /// Structured payload; `None` when encoding failed.
    pub table: Option<TablePayload>,
}

impl MimeBundle {
    /// Returns true if only the HTML rendering is available.
    pub fn is_degraded(&self) -> bool {
        self.table.is_none()
    }
}

/// Renders frames into table payloads.
///
/// A renderer is built once and reused; it owns the formatter registry and
/// the defaults that per-call [`TableOptions`] fall back to.
#[derive(Debug, Clone, Default)]
pub struct TableRenderer {
    registry: FormatterRegistry,
    defaults: TableConfig,
}

impl TableRenderer {
    /// Creates a renderer with the built-in formatters and default config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the formatter registry.
    #[must_use]
    pub fn with_registry(mut self, registry: FormatterRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Replaces the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the config is invalid.
    pub fn with_defaults(mut self, defaults: TableConfig) -> Result<Self> {
        defaults.validate()?;
        self.defaults = defaults;
        Ok(self)
    }

    /// Returns the defaults.
    pub fn defaults(&self) -> &TableConfig {
        &self.defaults
    }

    /// Returns the formatter registry.
    pub fn registry(&self) -> &FormatterRegistry {
        &self.registry
    }

    /// Resolves per-call options against the defaults.
    pub fn resolve(&self, options: &TableOptions) -> TableConfig {
        options.resolve(&self.defaults)
    }

    /// Checks whether `frame` may be shown as an interactive table under
    /// `config`.
    ///
    /// Ceilings apply to the frame as given: data columns are counted before
    /// the index is flattened.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StructuralIncompatibility`] for hierarchical frames
    /// and [`Error::SizeExceeded`] when a ceiling is exceeded.
    pub fn check_displayable(frame: &Frame, config: &TableConfig) -> Result<()> {
        if frame.column_labels().is_multi_level() {
            return Err(Error::structural("hierarchical column labels"));
        }
        if frame.index().is_multi_level() {
            return Err(Error::structural("hierarchical index"));
        }
        if frame.num_rows() > config.max_rows {
            return Err(Error::SizeExceeded {
                dimension: "rows",
                actual: frame.num_rows(),
                limit: config.max_rows,
            });
        }
        if frame.num_columns() > config.max_columns {
            return Err(Error::SizeExceeded {
                dimension: "columns",
                actual: frame.num_columns(),
                limit: config.max_columns,
            });
        }
        Ok(())
    }

    /// Renders `frame`, truncating to the configured ceilings.
    ///
    /// # Errors
    ///
    /// Returns an error for hierarchical frames, for options that resolve to
    /// an invalid config, or if encoding fails.
    pub fn render(&self, frame: &Frame, options: &TableOptions) -> Result<TablePayload> {
        self.render_with(frame, &self.resolve(options))
    }

    /// Like [`render`](Self::render), but failures are logged and yield
    /// `None`.
    pub fn try_render(&self, frame: &Frame, options: &TableOptions) -> Option<TablePayload> {
        self.render_guarded(frame, &self.resolve(options))
    }

    fn render_with(&self, frame: &Frame, config: &TableConfig) -> Result<TablePayload> {
        config.validate()?;
        let table = preprocess(
            frame,
            PreprocessOptions {
                max_rows: config.max_rows,
                max_columns: config.max_columns,
                include_index: config.include_index,
            },
        )?;
        debug!(
            rows = table.num_rows(),
            columns = table.num_columns(),
            index_columns = table.index_columns(),
            "Encoding table payload"
        );
        encode(&table, &self.registry, config.num_rows_per_page)
    }

    /// Renders `frame`, logging and swallowing any failure or panic.
    fn render_guarded(&self, frame: &Frame, config: &TableConfig) -> Option<TablePayload> {
        match catch_unwind(AssertUnwindSafe(|| self.render_with(frame, config))) {
            Ok(Ok(payload)) => Some(payload),
            Ok(Err(err)) => {
                error!(error = %err, "Failed to encode table payload");
                None
            }
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                error!(error = %Error::encoding(message), "Panic while encoding table payload");
                None
            }
        }
    }

    /// The automatic display path: a payload, or `None` when the frame
    /// should be shown with the plain rendering instead.
    pub fn display_formatter(&self, frame: &Frame, options: &TableOptions) -> Option<TablePayload> {
        let config = self.resolve(options);
        if let Err(err) = Self::check_displayable(frame, &config) {
            debug!(reason = %err, "Declining interactive table");
            return None;
        }
        self.render_guarded(frame, &config)
    }

    /// Renders both the plain HTML and, unless encoding fails, the payload.
    pub fn mime_bundle(&self, frame: &Frame, options: &TableOptions) -> MimeBundle {
        let config = self.resolve(options);
        MimeBundle {
            html: render_frame(frame),
            table: self.render_guarded(frame, &config),
        }
    }

    /// Wraps this renderer as the auto-display function a host registers.
    pub fn into_display_fn(self: Arc<Self>) -> crate::host::TableRendererFn {
        Arc::new(move |frame: &Frame| self.display_formatter(frame, &TableOptions::default()))
    }
}

#[cfg(test)]
mod tests {
    use arrow::array::{Array, ArrayRef, Int32Array, StringArray};
    use serde_json::Value;

    use super::*;
    use crate::{
        formatter::{CellFormatter, ColumnKind, FormatResult},
        frame::{ColumnLabels, Index, IndexLevel},
    };

    fn create_test_frame(rows: usize, columns: usize) -> Frame {
        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        let values: Vec<i32> = (0..rows as i32).collect();
        let columns: Vec<(String, ArrayRef)> = (0..columns)
            .map(|c| {
                (
                    format!("c{c}"),
                    Arc::new(Int32Array::from(values.clone())) as ArrayRef,
                )
            })
            .collect();
        Frame::from_columns(columns).unwrap()
    }

    #[test]
    fn test_display_formatter_accepts_small_frame() {
        let renderer = TableRenderer::new();
        let payload = renderer
            .display_formatter(&create_test_frame(5, 3), &TableOptions::default())
            .unwrap();
        assert_eq!(payload.num_rows(), 5);
        assert_eq!(payload.num_columns(), 4);
        assert_eq!(payload.rows_per_page, 25);
    }

    #[test]
    fn test_display_formatter_declines_too_many_columns() {
        let renderer = TableRenderer::new();
        let options = TableOptions::new().max_columns(2);
        assert!(renderer
            .display_formatter(&create_test_frame(5, 3), &options)
            .is_none());
    }

    #[test]
    fn test_display_formatter_declines_too_many_rows() {
        let renderer = TableRenderer::new();
        let options = TableOptions::new().max_rows(4);
        assert!(renderer
            .display_formatter(&create_test_frame(5, 1), &options)
            .is_none());
    }

    #[test]
    fn test_column_ceiling_counts_data_columns_only() {
        let renderer = TableRenderer::new();
        let options = TableOptions::new().max_columns(3);
        let payload = renderer
            .display_formatter(&create_test_frame(2, 3), &options)
            .unwrap();
        assert_eq!(payload.num_columns(), 4);
    }

    #[test]
    fn test_check_displayable_reports_reason() {
        let config = TableConfig::default().with_max_columns(2);
        let err = TableRenderer::check_displayable(&create_test_frame(5, 3), &config).unwrap_err();
        assert!(matches!(
            err,
            Error::SizeExceeded {
                dimension: "columns",
                actual: 3,
                limit: 2
            }
        ));
        assert!(err.is_fallback());
    }

    #[test]
    fn test_display_formatter_declines_multi_level() {
        let frame = create_test_frame(2, 2)
            .with_column_labels(ColumnLabels::MultiLevel(vec![
                vec!["g".into(), "g".into()],
                vec!["a".into(), "b".into()],
            ]))
            .unwrap();
        let renderer = TableRenderer::new();
        assert!(renderer
            .display_formatter(&frame, &TableOptions::default())
            .is_none());

        let index = Index::multi(vec![
            IndexLevel::new(Arc::new(StringArray::from(vec!["x", "y"]))),
            IndexLevel::new(Arc::new(Int32Array::from(vec![1, 2]))),
        ])
        .unwrap();
        let frame = create_test_frame(2, 2).with_index(index).unwrap();
        let err = renderer.render(&frame, &TableOptions::default()).unwrap_err();
        assert!(matches!(err, Error::StructuralIncompatibility { .. }));
    }

    #[test]
    fn test_render_truncates() {
        let renderer = TableRenderer::new();
        let options = TableOptions::new().max_rows(3).max_columns(1).include_index(false);
        let payload = renderer.render(&create_test_frame(10, 4), &options).unwrap();
        assert_eq!(payload.num_rows(), 3);
        assert_eq!(payload.num_columns(), 1);
    }

    #[test]
    fn test_defaults_apply_when_options_unset() {
        let renderer = TableRenderer::new()
            .with_defaults(TableConfig::default().with_include_index(false).with_rows_per_page(7))
            .unwrap();
        let payload = renderer
            .render(&create_test_frame(2, 2), &TableOptions::default())
            .unwrap();
        assert_eq!(payload.num_columns(), 2);
        assert_eq!(payload.rows_per_page, 7);
        assert!(payload.column_options.is_empty());

        let payload = renderer
            .render(&create_test_frame(2, 2), &TableOptions::new().include_index(true))
            .unwrap();
        assert_eq!(payload.num_columns(), 3);
    }

    #[test]
    fn test_invalid_defaults_rejected() {
        let result = TableRenderer::new().with_defaults(TableConfig::default().with_rows_per_page(0));
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_page_size_override_rejected() {
        let renderer = TableRenderer::new();
        let options = TableOptions::new().rows_per_page(0);
        let frame = create_test_frame(2, 1);
        assert!(matches!(
            renderer.render(&frame, &options),
            Err(Error::InvalidConfig { .. })
        ));
        assert!(renderer.display_formatter(&frame, &options).is_none());
        assert!(renderer.mime_bundle(&frame, &options).is_degraded());
    }

    #[test]
    fn test_mime_bundle_has_both() {
        let bundle = TableRenderer::new().mime_bundle(&create_test_frame(2, 1), &TableOptions::default());
        assert!(bundle.html.contains("<table"));
        assert!(!bundle.is_degraded());
    }

    struct Exploding;

    impl CellFormatter for Exploding {
        fn format_cell(&self, _array: &dyn Array, _row: usize) -> FormatResult<Value> {
            panic!("formatter bug")
        }
    }

    #[test]
    fn test_mime_bundle_degrades_on_panic() {
        let mut registry = FormatterRegistry::new();
        registry.register(ColumnKind::Numeric, Arc::new(Exploding));
        let renderer = TableRenderer::new().with_registry(registry);
        let frame = create_test_frame(2, 1);

        let bundle = renderer.mime_bundle(&frame, &TableOptions::default());
        assert!(bundle.is_degraded());
        assert!(bundle.html.contains("<td>1</td>"));
        assert!(renderer
            .display_formatter(&frame, &TableOptions::default())
            .is_none());
    }

    #[test]
    fn test_into_display_fn() {
        let display = Arc::new(TableRenderer::new()).into_display_fn();
        assert!(display(&create_test_frame(2, 2)).is_some());
        assert!(display(&create_test_frame(2, 21)).is_none());
    }
}
