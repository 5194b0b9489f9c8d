//! Boundary with the host's display-hook mechanism.
//!
//! Hosts (notebook kernels, REPLs) own the hook that decides how a frame is
//! displayed. They implement [`DisplayHost`]; [`FormatterToggle`] switches
//! the interactive renderer on and off while remembering what the host had
//! before. Nothing in the rendering pipeline calls into the host.

use std::{fmt, sync::Arc};

use tracing::debug;

use crate::{encode::TablePayload, frame::Frame};

/// An auto-display renderer: a payload, or `None` to let the host fall back
/// to its own rendering.
pub type TableRendererFn = Arc<dyn Fn(&Frame) -> Option<TablePayload> + Send + Sync>;

/// Capability a host exposes for installing a frame renderer.
pub trait DisplayHost {
    /// Installs `renderer`, returning the one it replaces.
    fn register_table_renderer(&mut self, renderer: TableRendererFn) -> Option<TableRendererFn>;

    /// Removes the current renderer, returning it.
    fn unregister_table_renderer(&mut self) -> Option<TableRendererFn>;
}

/// Enables and disables the interactive renderer on a host, restoring the
/// host's previous renderer on disable.
///
/// Enabling twice is a no-op, so the renderer that was in place before the
/// first enable is the one restored.
#[derive(Default)]
pub struct FormatterToggle {
    saved: Option<Option<TableRendererFn>>,
}

impl FormatterToggle {
    /// Creates a toggle in the disabled state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true between `enable` and `disable`.
    pub fn is_enabled(&self) -> bool {
        self.saved.is_some()
    }

    /// Installs `renderer` on `host`. Returns false if already enabled.
    pub fn enable(&mut self, host: &mut dyn DisplayHost, renderer: TableRendererFn) -> bool {
        if self.is_enabled() {
            return false;
        }
        let previous = host.register_table_renderer(renderer);
        debug!(had_previous = previous.is_some(), "Interactive table renderer enabled");
        self.saved = Some(previous);
        true
    }

    /// Restores the renderer `host` had before `enable`. Returns false if
    /// not enabled.
    pub fn disable(&mut self, host: &mut dyn DisplayHost) -> bool {
        let Some(previous) = self.saved.take() else {
            return false;
        };
        host.unregister_table_renderer();
        if let Some(previous) = previous {
            host.register_table_renderer(previous);
        }
        debug!("Interactive table renderer disabled");
        true
    }
}

impl fmt::Debug for FormatterToggle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormatterToggle")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}
