//! The shared-store boundary.
//!
//! The host owns the reactive store; the accessor only needs get/put on
//! raw, unwrapped collection data. Data is held as `Arc<Value>` so that
//! replacement is observable as a pointer change.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde_json::Value;

/// Callback invoked after a raw read completes, with the collection name.
///
/// This models the host framework's dependency tracking: reading a value
/// registers the current computation as a dependent. The callback is
/// allowed to re-enter the accessor synchronously.
pub type ReadObserver = Box<dyn Fn(&str) + Send + Sync>;

/// Read/write access to the host's shared reactive store.
///
/// # Identity
///
/// `put` always replaces the stored `Arc` wholesale. Two reads returning
/// pointer-equal `Arc`s are therefore guaranteed to see the same data, and
/// a pointer change means the collection was rewritten. Consumers key
/// their caches on that pointer.
///
/// # Read ordering
///
/// Implementations must capture the raw reference **before** running any
/// dependency-tracking hook for the read. Hooks may synchronously re-enter
/// the accessor; resolving from a reference captured before the hook fires
/// is what keeps that re-entry harmless.
pub trait SharedStore: Send + Sync {
    /// Get the raw data for a collection, if present.
    fn raw(&self, name: &str) -> Option<Arc<Value>>;

    /// Replace the raw data for a collection, returning the new reference.
    fn put(&self, name: &str, value: Value) -> Arc<Value>;

    /// Monotonic per-collection version, bumped on every `put`.
    ///
    /// Returns 0 for collections that were never written.
    fn version(&self, name: &str) -> u64;
}

struct Slot {
    data: Arc<Value>,
    version: u64,
    // Removed collections keep their slot so the version sequence survives.
    absent: bool,
}

/// An in-memory shared store.
///
/// Intended as the reference implementation and as the store behind
/// single-process hosts. Supports an optional read observer so tests and
/// embedders can model reactive dependency tracking, including observers
/// that re-enter the accessor during a read.
///
/// # Example
///
/// ```rust
/// use facet_store::{MemoryStore, SharedStore};
/// use serde_json::json;
///
/// let store = MemoryStore::new();
/// let first = store.put("cfg", json!({"theme": "dark"}));
/// let again = store.raw("cfg").unwrap();
/// assert!(std::sync::Arc::ptr_eq(&first, &again));
///
/// store.put("cfg", json!({"theme": "light"}));
/// let replaced = store.raw("cfg").unwrap();
/// assert!(!std::sync::Arc::ptr_eq(&first, &replaced));
/// ```
#[derive(Default)]
pub struct MemoryStore {
    slots: RwLock<HashMap<String, Slot>>,
    // Arc so an invocation can outlive the lock; observers may replace
    // or remove themselves re-entrantly.
    observer: RwLock<Option<Arc<dyn Fn(&str) + Send + Sync>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with named collections.
    pub fn with_collections<I, S>(collections: I) -> Self
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        let store = Self::new();
        {
            let mut slots = store.slots.write().unwrap();
            for (name, value) in collections {
                slots.insert(
                    name.into(),
                    Slot {
                        data: Arc::new(value),
                        version: 1,
                        absent: false,
                    },
                );
            }
        }
        store
    }

    /// Register a read observer, replacing any previous one.
    ///
    /// The observer runs after each raw read, outside any internal lock,
    /// so it may freely read or write this store, and may replace or
    /// remove itself.
    pub fn set_read_observer(&self, observer: ReadObserver) {
        *self.observer.write().unwrap() = Some(Arc::from(observer));
    }

    /// Remove the read observer.
    pub fn clear_read_observer(&self) {
        *self.observer.write().unwrap() = None;
    }

    /// Remove a collection entirely.
    ///
    /// Returns the removed data, if any. Versions are not reset: a later
    /// `put` continues the old sequence so stale readers still observe a
    /// change.
    pub fn remove(&self, name: &str) -> Option<Arc<Value>> {
        let mut slots = self.slots.write().unwrap();
        let slot = slots.get_mut(name).filter(|slot| !slot.absent)?;
        let data = std::mem::replace(&mut slot.data, Arc::new(Value::Null));
        slot.version += 1;
        slot.absent = true;
        Some(data)
    }

    /// Names of all collections currently present.
    pub fn names(&self) -> Vec<String> {
        let slots = self.slots.read().unwrap();
        slots
            .iter()
            .filter(|(_, slot)| !slot.absent)
            .map(|(name, _)| name.clone())
            .collect()
    }
}

impl SharedStore for MemoryStore {
    fn raw(&self, name: &str) -> Option<Arc<Value>> {
        // Capture the data first, then notify: resolve-then-subscribe.
        let data = {
            let slots = self.slots.read().unwrap();
            slots
                .get(name)
                .filter(|slot| !slot.absent)
                .map(|slot| Arc::clone(&slot.data))
        };

        // Clone the handle out so the observer runs with no lock held.
        let observer = self.observer.read().unwrap().clone();
        if let Some(observer) = observer {
            observer(name);
        }

        data
    }

    fn put(&self, name: &str, value: Value) -> Arc<Value> {
        let data = Arc::new(value);
        let mut slots = self.slots.write().unwrap();
        let slot = slots.entry(name.to_string()).or_insert(Slot {
            data: Arc::new(Value::Null),
            version: 0,
            absent: true,
        });
        slot.data = Arc::clone(&data);
        slot.version += 1;
        slot.absent = false;
        data
    }

    fn version(&self, name: &str) -> u64 {
        let slots = self.slots.read().unwrap();
        slots.get(name).map(|slot| slot.version).unwrap_or(0)
    }
}
