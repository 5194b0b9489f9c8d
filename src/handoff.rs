//! Deferred handoff of displayed frames.
//!
//! When a frame is shown with the plain rendering, the host may later ask
//! (from the browser, with no bound on delay) to upgrade it to an
//! interactive table. [`HandoffCache`] lets that request find the frame
//! again from a short key without keeping every frame alive:
//!
//! - The weak tier maps every key to a [`Weak`] reference. It costs nothing
//!   and succeeds as long as someone else still owns the frame.
//! - The strong tier holds one slot: a shallow copy of the most recently
//!   stored frame, owned by the cache. Storing a new frame evicts it.
//!
//! Lookups are single-use: a hit removes the key from both tiers.

use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex, PoisonError, RwLock, Weak},
};

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::frame::Frame;

/// Opaque handoff key, `df-<uuid>`. Valid only within the process that
/// minted it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Mints a fresh key.
    pub fn generate() -> Self {
        Self(format!("df-{}", Uuid::new_v4()))
    }

    /// Returns the key as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CacheKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for CacheKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

/// Two-tier cache of displayed frames.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
///
/// use arrow::array::Int32Array;
/// use datatable::{Frame, HandoffCache};
///
/// let cache = HandoffCache::new();
/// let frame = Arc::new(
///     Frame::from_columns(vec![("a", Arc::new(Int32Array::from(vec![1])) as _)]).unwrap(),
/// );
/// let key = cache.put(&frame);
/// assert!(cache.resolve(&key).is_some());
/// assert!(cache.resolve(&key).is_none());
/// ```
#[derive(Default)]
pub struct HandoffCache {
    weak_refs: RwLock<HashMap<CacheKey, Weak<Frame>>>,
    last_shown: Mutex<Option<(CacheKey, Frame)>>,
}

impl HandoffCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `frame` under a fresh key.
    ///
    /// The weak tier records a non-owning reference; the strong slot is
    /// replaced by a shallow copy of `frame`, whatever it held before.
    /// Entries whose frame has been dropped are pruned.
    pub fn put(&self, frame: &Arc<Frame>) -> CacheKey {
        let key = CacheKey::generate();
        {
            let mut weak_refs = self.weak_refs.write().unwrap_or_else(PoisonError::into_inner);
            weak_refs.retain(|_, frame| frame.strong_count() > 0);
            weak_refs.insert(key.clone(), Arc::downgrade(frame));
        }

        let mut last_shown = self.last_shown.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((evicted, _)) = last_shown.replace((key.clone(), frame.shallow_copy())) {
            debug!(key = %evicted, "Evicted last-shown frame");
        }
        key
    }

    /// Returns the frame stored under `key`, removing it from the cache.
    ///
    /// The strong slot is tried first, then the weak tier. `None` means the
    /// key is unknown, was already used, or its frame is gone; the data
    /// cannot be recovered in that case.
    pub fn resolve(&self, key: &CacheKey) -> Option<Arc<Frame>> {
        let from_slot = {
            let mut last_shown = self.last_shown.lock().unwrap_or_else(PoisonError::into_inner);
            match last_shown.take() {
                Some((slot_key, frame)) if &slot_key == key => Some(Arc::new(frame)),
                other => {
                    *last_shown = other;
                    None
                }
            }
        };

        let from_weak = self
            .weak_refs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
            .and_then(|frame| frame.upgrade());

        let resolved = from_slot.or(from_weak);
        debug!(key = %key, hit = resolved.is_some(), "Resolved handoff key");
        resolved
    }

    /// Returns the key in the strong slot, if any.
    pub fn last_key(&self) -> Option<CacheKey> {
        self.last_shown
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|(key, _)| key.clone())
    }

    /// Returns the number of weak entries whose frame is still alive.
    pub fn live_weak_entries(&self) -> usize {
        self.weak_refs
            .read()
            .map(|refs| refs.values().filter(|f| f.strong_count() > 0).count())
            .unwrap_or(0)
    }

    /// Drops every entry in both tiers.
    pub fn clear(&self) {
        self.weak_refs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        *self.last_shown.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl fmt::Debug for HandoffCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandoffCache")
            .field("live_weak_entries", &self.live_weak_entries())
            .field("last_key", &self.last_key())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use arrow::array::{Array, ArrayRef, Int32Array};

    use super::*;

    fn frame(values: Vec<i32>) -> Arc<Frame> {
        Arc::new(
            Frame::from_columns(vec![("v", Arc::new(Int32Array::from(values)) as ArrayRef)])
                .unwrap(),
        )
    }

    fn first_column(frame: &Frame) -> Vec<i32> {
        frame
            .column(0)
            .unwrap()
            .as_any()
            .downcast_ref::<Int32Array>()
            .unwrap()
            .values()
            .to_vec()
    }

    #[test]
    fn test_key_format() {
        let key = CacheKey::generate();
        assert!(key.as_str().starts_with("df-"));
        assert_eq!(key.as_str().len(), 3 + 36);
        assert_ne!(key, CacheKey::generate());
    }

    #[test]
    fn test_round_trip_is_single_use() {
        let cache = HandoffCache::new();
        let ds = frame(vec![1, 2, 3]);
        let key = cache.put(&ds);

        let resolved = cache.resolve(&key).unwrap();
        assert_eq!(first_column(&resolved), vec![1, 2, 3]);
        assert!(cache.resolve(&key).is_none());
    }

    #[test]
    fn test_strong_slot_survives_release() {
        let cache = HandoffCache::new();
        let key = {
            let ds = frame(vec![4, 5]);
            cache.put(&ds)
        };
        let resolved = cache.resolve(&key).unwrap();
        assert_eq!(first_column(&resolved), vec![4, 5]);
    }

    #[test]
    fn test_strong_slot_shares_storage() {
        let cache = HandoffCache::new();
        let ds = frame(vec![1, 2]);
        let key = cache.put(&ds);
        let resolved = cache.resolve(&key).unwrap();
        assert!(!Arc::ptr_eq(&resolved, &ds));
        assert!(resolved
            .column(0)
            .unwrap()
            .to_data()
            .ptr_eq(&ds.column(0).unwrap().to_data()));
    }

    #[test]
    fn test_weak_tier_serves_older_live_frame() {
        let cache = HandoffCache::new();
        let ds1 = frame(vec![1]);
        let ds2 = frame(vec![2]);
        let key1 = cache.put(&ds1);
        let key2 = cache.put(&ds2);

        let resolved = cache.resolve(&key1).unwrap();
        assert!(Arc::ptr_eq(&resolved, &ds1));
        assert!(cache.resolve(&key1).is_none());
        assert_eq!(cache.last_key(), Some(key2));
    }

    #[test]
    fn test_evicted_and_released_is_not_found() {
        let cache = HandoffCache::new();
        let ds1 = frame(vec![1]);
        let key1 = cache.put(&ds1);
        let ds2 = frame(vec![2]);
        let _key2 = cache.put(&ds2);
        drop(ds1);

        assert!(cache.resolve(&key1).is_none());
    }

    #[test]
    fn test_unknown_key_is_not_found() {
        let cache = HandoffCache::new();
        let _ = cache.put(&frame(vec![1]));
        assert!(cache.resolve(&CacheKey::from("df-stale")).is_none());
        assert!(cache.last_key().is_some());
    }

    #[test]
    fn test_dead_weak_entries_pruned() {
        let cache = HandoffCache::new();
        for i in 0..5 {
            let ds = frame(vec![i]);
            let _ = cache.put(&ds);
        }
        let live = frame(vec![9]);
        let _ = cache.put(&live);
        assert_eq!(cache.live_weak_entries(), 1);
        assert_eq!(cache.weak_refs.read().unwrap().len(), 1);
    }

    #[test]
    fn test_clear() {
        let cache = HandoffCache::new();
        let ds = frame(vec![1]);
        let key = cache.put(&ds);
        cache.clear();
        assert!(cache.last_key().is_none());
        assert!(cache.resolve(&key).is_none());
    }

    #[test]
    fn test_concurrent_puts_keep_one_slot() {
        let cache = Arc::new(HandoffCache::new());
        let frames: Vec<Arc<Frame>> = (0..8).map(|i| frame(vec![i])).collect();
        let handles: Vec<_> = frames
            .iter()
            .map(|ds| {
                let cache = Arc::clone(&cache);
                let ds = Arc::clone(ds);
                std::thread::spawn(move || cache.put(&ds))
            })
            .collect();
        let keys: Vec<CacheKey> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let last = cache.last_key().unwrap();
        assert!(keys.contains(&last));
        for key in &keys {
            assert!(cache.resolve(key).is_some());
        }
    }

    #[test]
    fn test_key_serializes_as_string() {
        let key = CacheKey::from("df-abc");
        assert_eq!(serde_json::to_string(&key).unwrap(), "\"df-abc\"");
        assert_eq!(key.to_string(), "df-abc");
    }
}
