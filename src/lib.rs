//! datatable - Interactive table payloads for dataframe display
//!
//! Turns an in-memory table into a bounded, type-annotated, JSON-safe
//! payload for a remote table widget, and keeps recently shown tables
//! reachable for a later "convert to interactive" request.
//!
//! # Design Principles
//!
//! 1. **Bounded** - Row and column ceilings; oversize tables are declined
//!    on the automatic path rather than silently truncated
//! 2. **Never fails the host** - Encoding faults degrade to plain HTML
//! 3. **Zero-copy** - Arrow `RecordBatch` throughout; cached snapshots
//!    share buffers with the caller's frame
//! 4. **Deterministic** - The same frame always encodes to the same payload
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//!
//! use arrow::array::{ArrayRef, Int32Array, StringArray};
//! use datatable::{Frame, TableOptions, TableRenderer};
//!
//! let frame = Frame::from_columns(vec![
//!     ("id", Arc::new(Int32Array::from(vec![1, 2])) as ArrayRef),
//!     ("name", Arc::new(StringArray::from(vec!["a", "b"])) as ArrayRef),
//! ])
//! .unwrap();
//!
//! let renderer = TableRenderer::new();
//! let payload = renderer.display_formatter(&frame, &TableOptions::new()).unwrap();
//! assert_eq!(payload.num_rows(), 2);
//! assert_eq!(payload.num_columns(), 3); // flattened index + 2 columns
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
// Allow common test patterns
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::cast_possible_truncation,
        clippy::cast_possible_wrap,
        clippy::float_cmp,
        clippy::unreadable_literal
    )
)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::uninlined_format_args)]

pub mod callback;
pub mod config;
pub mod encode;
pub mod error;
pub mod formatter;
pub mod frame;
pub mod handoff;
pub mod hint;
pub mod host;
pub mod html;
pub mod preprocess;
pub mod render;

// Re-exports for convenience
pub use arrow::array::{ArrayRef, RecordBatch};
pub use callback::{CallbackFn, CallbackHandle, CallbackRegistry};
pub use config::{TableConfig, TableOptions};
pub use encode::{ColumnHeader, ColumnOption, TablePayload};
pub use error::{Error, Result};
pub use formatter::{CellFormatter, ColumnKind, FallbackFormatter, FormatterRegistry};
pub use frame::{ColumnLabels, Frame, Index, IndexLevel};
pub use handoff::{CacheKey, HandoffCache};
pub use hint::{HintDisplay, InteractiveHint, CONVERT_CALLBACK_NAME, HANDOFF_MISS_MESSAGE};
pub use host::{DisplayHost, FormatterToggle, TableRendererFn};
pub use preprocess::{preprocess, PreparedTable, PreprocessOptions};
pub use render::{MimeBundle, TableRenderer};
