//! Chain-safe stand-ins for unresolved collections.
//!
//! While a collection is loading (or failed to load), consumers still read
//! `collection.field.sub.deeper` freely. A placeholder answers every such
//! access with another placeholder — cached per key, so repeated reads of
//! the same property return the identical child — and answers the load
//! state keys (`loading`/`ready`/`load_error`) with live values so UI can
//! reflect progress without waiting for data.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use facet_store::LoadState;

use crate::context::ContextInner;

/// A view-shaped stand-in with no backing data.
///
/// Never panics on property access, iteration, or capability calls; it
/// degrades to more placeholders or benign defaults. Discarded
/// transparently: once real data exists, resolution returns a genuine
/// view and the placeholder simply stops being handed out.
pub struct Placeholder {
    collection: String,
    path: Vec<String>,
    ctx: Weak<ContextInner>,
    children: Mutex<HashMap<String, Arc<Placeholder>>>,
}

impl Placeholder {
    pub(crate) fn new(collection: &str, path: Vec<String>, ctx: Weak<ContextInner>) -> Arc<Self> {
        Arc::new(Self {
            collection: collection.to_string(),
            path,
            ctx,
            children: Mutex::new(HashMap::new()),
        })
    }

    /// The collection this placeholder stands in for.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// The nested path below the collection root.
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// The child placeholder for one more path component.
    ///
    /// Chain-stable: repeated calls with the same key return the identical
    /// child, so arbitrarily deep chains never mint fresh identities.
    pub fn child(&self, key: &str) -> Arc<Placeholder> {
        let mut children = self.children.lock().unwrap();
        if let Some(existing) = children.get(key) {
            return Arc::clone(existing);
        }
        let mut path = self.path.clone();
        path.push(key.to_string());
        let child = Placeholder::new(&self.collection, path, self.ctx.clone());
        children.insert(key.to_string(), Arc::clone(&child));
        child
    }

    /// Live load state of the backing collection.
    fn state(&self) -> LoadState {
        match self.ctx.upgrade() {
            Some(ctx) => ctx.state(&self.collection),
            None => LoadState::default(),
        }
    }

    /// Whether a load is currently in flight.
    pub fn loading(&self) -> bool {
        self.state().loading
    }

    /// Always effectively `false`: a placeholder exists precisely because
    /// the data this path needs has not resolved yet.
    pub fn ready(&self) -> bool {
        false
    }

    /// The most recent load failure, if the last attempt failed.
    pub fn load_error(&self) -> Option<String> {
        self.state().error_message().map(str::to_string)
    }
}

impl std::fmt::Debug for Placeholder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Placeholder")
            .field("collection", &self.collection)
            .field("path", &self.path)
            .finish()
    }
}
