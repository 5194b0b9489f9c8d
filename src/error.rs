//! Error types for datatable.

/// Result type alias for datatable operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while turning a frame into a table payload.
///
/// [`Error::StructuralIncompatibility`] and [`Error::SizeExceeded`] are
/// pre-flight conditions: callers are expected to degrade to the plain HTML
/// rendering rather than surface them as failures (see
/// [`Error::is_fallback`]).
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The frame has a hierarchical index or hierarchical column labels.
    #[error("Structurally incompatible frame: {message}")]
    StructuralIncompatibility {
        /// Which part of the frame is hierarchical.
        message: String,
    },

    /// The frame exceeds a row or column ceiling.
    #[error("Frame has {actual} {dimension}, exceeding the limit of {limit}")]
    SizeExceeded {
        /// `"rows"` or `"columns"`.
        dimension: &'static str,
        /// The frame's actual extent along the dimension.
        actual: usize,
        /// The configured ceiling.
        limit: usize,
    },

    /// Unexpected fault while preprocessing or encoding.
    #[error("Encoding failed: {message}")]
    EncodingFailure {
        /// Description of the fault.
        message: String,
    },

    /// Index length does not match the number of rows.
    #[error("Index has {index_len} labels but the frame has {rows} rows")]
    IndexLengthMismatch {
        /// Number of labels in the index level.
        index_len: usize,
        /// Number of rows in the frame.
        rows: usize,
    },

    /// Column labels do not match the columns of the frame.
    #[error("Column labels mismatch: {message}")]
    ColumnLabelsMismatch {
        /// Description of the mismatch.
        message: String,
    },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the configuration error.
        message: String,
    },

    /// Arrow error during data processing.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a structural incompatibility error.
    pub fn structural(message: impl Into<String>) -> Self {
        Self::StructuralIncompatibility {
            message: message.into(),
        }
    }

    /// Create an encoding failure error.
    pub fn encoding(message: impl Into<String>) -> Self {
        Self::EncodingFailure {
            message: message.into(),
        }
    }

    /// Create a column labels mismatch error.
    pub fn column_labels(message: impl Into<String>) -> Self {
        Self::ColumnLabelsMismatch {
            message: message.into(),
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Returns true when the caller should fall back to plain rendering
    /// instead of treating the error as a failure.
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        matches!(
            self,
            Self::StructuralIncompatibility { .. } | Self::SizeExceeded { .. }
        )
    }
}
