//! The identity cache: memoized views keyed by (collection, path).
//!
//! The consuming host re-evaluates expressions whenever a dependency it
//! read changes identity. Handing back a fresh wrapper on every access
//! would therefore re-trigger evaluation forever; this cache guarantees
//! that, for an unchanged raw reference, repeated resolution returns the
//! *identical* view object.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::view::View;

/// Cache key: one logical view of a collection.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) struct ViewKey {
    pub collection: String,
    pub path: Vec<String>,
}

impl ViewKey {
    pub fn top(collection: &str) -> Self {
        Self {
            collection: collection.to_string(),
            path: Vec::new(),
        }
    }

    pub fn at(collection: &str, path: Vec<String>) -> Self {
        Self {
            collection: collection.to_string(),
            path,
        }
    }
}

struct Entry {
    /// The top-level raw reference the view was built from. Holding the
    /// `Arc` keeps the pointer valid, so pointer equality is a sound
    /// staleness check.
    built_from: Arc<Value>,
    view: View,
}

/// Memoizes built views per (collection, path).
#[derive(Default)]
pub(crate) struct IdentityCache {
    entries: Mutex<HashMap<ViewKey, Entry>>,
}

impl IdentityCache {
    /// Return the cached view for `key` if it was built from `current`.
    ///
    /// A stale hit (raw reference replaced) evicts every entry of that
    /// collection: nested views all borrow from the same top-level raw, so
    /// one replacement invalidates the whole family.
    pub fn lookup(&self, key: &ViewKey, current: &Arc<Value>) -> Option<View> {
        let mut entries = self.entries.lock().unwrap();
        match entries.get(key) {
            Some(entry) if Arc::ptr_eq(&entry.built_from, current) => Some(entry.view.clone()),
            Some(_) => {
                log::debug!(
                    "collection '{}' raw reference changed, dropping cached views",
                    key.collection
                );
                entries.retain(|k, _| k.collection != key.collection);
                None
            }
            None => None,
        }
    }

    /// Memoize a freshly built view.
    pub fn store(&self, key: ViewKey, built_from: Arc<Value>, view: View) {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(key, Entry { built_from, view });
    }

    /// Drop all views of one collection.
    pub fn invalidate(&self, collection: &str) {
        let mut entries = self.entries.lock().unwrap();
        entries.retain(|k, _| k.collection != collection);
    }

    /// Drop everything.
    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}
