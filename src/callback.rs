//! Named, externally invocable entry points.
//!
//! The remote widget reaches back into the process by name. A
//! [`CallbackRegistry`] holds at most one binding per name; registering a
//! name again hands back the binding already in place.

use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, PoisonError, RwLock},
};

use tracing::{debug, warn};

use crate::encode::TablePayload;

/// Conversion handler: takes a handoff key, returns a payload or `None`.
pub type CallbackFn = Arc<dyn Fn(&str) -> Option<TablePayload> + Send + Sync>;

/// A registered binding.
#[derive(Clone)]
pub struct CallbackHandle {
    name: String,
    callback: CallbackFn,
}

impl CallbackHandle {
    /// Returns the name the handler is bound under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invokes the handler.
    pub fn call(&self, key: &str) -> Option<TablePayload> {
        (self.callback)(key)
    }

    /// Returns true if both handles share the same handler.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.callback, &other.callback)
    }
}

impl fmt::Debug for CallbackHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackHandle")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Process-wide table of named handlers.
#[derive(Default)]
pub struct CallbackRegistry {
    callbacks: RwLock<HashMap<String, CallbackHandle>>,
}

impl CallbackRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `handler` under `name` unless something is already bound
    /// there. Either way, returns the binding now in place.
    pub fn ensure_registered<F>(&self, name: &str, handler: F) -> CallbackHandle
    where
        F: Fn(&str) -> Option<TablePayload> + Send + Sync + 'static,
    {
        let mut callbacks = self.callbacks.write().unwrap_or_else(PoisonError::into_inner);
        callbacks
            .entry(name.to_string())
            .or_insert_with(|| {
                debug!(name, "Registered callback");
                CallbackHandle {
                    name: name.to_string(),
                    callback: Arc::new(handler),
                }
            })
            .clone()
    }

    /// Calls the handler bound under `name`. Returns `None` if nothing is
    /// bound or the handler itself returns nothing.
    pub fn invoke(&self, name: &str, key: &str) -> Option<TablePayload> {
        let Some(handle) = self.get(name) else {
            warn!(name, "No callback registered");
            return None;
        };
        handle.call(key)
    }

    /// Returns the binding under `name`.
    pub fn get(&self, name: &str) -> Option<CallbackHandle> {
        self.callbacks
            .read()
            .ok()
            .and_then(|callbacks| callbacks.get(name).cloned())
    }

    /// Returns true if a handler is bound under `name`.
    pub fn is_registered(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Returns the number of bindings.
    pub fn len(&self) -> usize {
        self.callbacks.read().map(|c| c.len()).unwrap_or(0)
    }

    /// Returns true if nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the bound names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .callbacks
            .read()
            .map(|c| c.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }
}

impl fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("names", &self.names())
            .finish()
    }
}
