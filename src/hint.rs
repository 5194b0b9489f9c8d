//! Plain display with a deferred "convert to interactive" upgrade.
//!
//! [`InteractiveHint::display`] shows a frame as plain HTML and stashes it
//! in the handoff cache. When the viewer asks for the interactive table,
//! the host calls the [`CONVERT_CALLBACK_NAME`] entry point with the key
//! embedded in that HTML.

use std::sync::Arc;

use tracing::info;

use crate::{
    callback::{CallbackHandle, CallbackRegistry},
    config::TableOptions,
    encode::TablePayload,
    frame::Frame,
    handoff::{CacheKey, HandoffCache},
    html::{escape_html, render_frame},
    render::TableRenderer,
};

/// Name of the conversion entry point.
pub const CONVERT_CALLBACK_NAME: &str = "convertToInteractive";

/// Shown when a conversion request's frame is no longer available.
pub const HANDOFF_MISS_MESSAGE: &str =
    "Error: Runtime no longer has a reference to this dataframe, please re-run this cell and try again.";

/// Result of a hint display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HintDisplay {
    /// Key the frame was stored under.
    pub key: CacheKey,
    /// Plain HTML, wrapped in a container identified by `key`.
    pub html: String,
}

/// Ties the handoff cache, the callback registry and a renderer together.
#[derive(Debug, Clone)]
pub struct InteractiveHint {
    cache: Arc<HandoffCache>,
    callbacks: Arc<CallbackRegistry>,
    renderer: Arc<TableRenderer>,
}

impl InteractiveHint {
    /// Creates a hint formatter over shared state.
    pub fn new(
        cache: Arc<HandoffCache>,
        callbacks: Arc<CallbackRegistry>,
        renderer: Arc<TableRenderer>,
    ) -> Self {
        Self {
            cache,
            callbacks,
            renderer,
        }
    }

    /// Returns the handoff cache.
    pub fn cache(&self) -> &Arc<HandoffCache> {
        &self.cache
    }

    /// Returns the callback registry.
    pub fn callbacks(&self) -> &Arc<CallbackRegistry> {
        &self.callbacks
    }

    /// Stores `frame` for a later upgrade, makes sure the conversion entry
    /// point exists, and returns the plain rendering.
    pub fn display(&self, frame: &Arc<Frame>) -> HintDisplay {
        let key = self.cache.put(frame);
        self.ensure_callback();
        let html = format!(
            "<div id=\"{id}\" class=\"colab-df-container\">\n{table}<button class=\"colab-df-convert\" data-key=\"{id}\" title=\"Convert this dataframe to an interactive table.\"></button>\n</div>\n",
            id = escape_html(key.as_str()),
            table = render_frame(frame),
        );
        HintDisplay { key, html }
    }

    /// Registers the conversion entry point if it is not already bound.
    pub fn ensure_callback(&self) -> CallbackHandle {
        let cache = Arc::clone(&self.cache);
        let renderer = Arc::clone(&self.renderer);
        self.callbacks.ensure_registered(CONVERT_CALLBACK_NAME, move |key| {
            convert(&cache, &renderer, &CacheKey::from(key))
        })
    }

    /// Resolves `key` and renders the frame it names.
    ///
    /// A miss is an expected outcome: it is reported with
    /// [`HANDOFF_MISS_MESSAGE`] and yields `None`.
    pub fn convert_to_interactive(&self, key: &CacheKey) -> Option<TablePayload> {
        convert(&self.cache, &self.renderer, key)
    }
}

fn convert(cache: &HandoffCache, renderer: &TableRenderer, key: &CacheKey) -> Option<TablePayload> {
    let Some(frame) = cache.resolve(key) else {
        info!(key = %key, "{}", HANDOFF_MISS_MESSAGE);
        return None;
    };
    renderer.try_render(&frame, &TableOptions::default())
}
