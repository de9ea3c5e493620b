//! The accessor context: explicit owner of every cache and the entry
//! point of the resolution pipeline.
//!
//! All state — views, placeholders, pending loads, load states, resolved
//! capability sets — lives on the context, constructed once per
//! application session and dropped on teardown. Nothing here is a
//! module-level global, so contexts are independently testable and
//! nothing leaks across sessions.
//!
//! The resolution pipeline, per access:
//!
//! ```text
//! depth guard -> read raw -> present? identity cache / build+cache
//!                         -> absent?  single-flight load + placeholder
//! ```
//!
//! The guard depth is restored on every exit path.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;

use facet_store::{walk, LoadState, SharedStore};

use crate::array_view::ArrayView;
use crate::cache::{IdentityCache, ViewKey};
use crate::capability::CapabilitySet;
use crate::classify::{classify, Shape};
use crate::error::Error;
use crate::guard::DepthCounter;
use crate::host::{
    CollectionClass, CollectionClassifier, CollectionLoader, MutationHandler, PageHandler,
    StaticData,
};
use crate::loader::{self, PendingLoad};
use crate::placeholder::Placeholder;
use crate::view::{ObjectView, View};

/// Default cooldown after a failed load before retries are allowed.
pub const DEFAULT_ERROR_COOLDOWN: Duration = Duration::from_secs(30);

/// Default time a settled load lingers to absorb duplicate triggers.
pub const DEFAULT_PENDING_GRACE: Duration = Duration::from_millis(250);

/// Thin adapter over the host's shared store plus the per-collection load
/// records. Raw data is always read before any other step of resolution
/// so host-side read hooks re-enter against a captured reference.
pub(crate) struct CollectionStore {
    shared: Arc<dyn SharedStore>,
    states: Mutex<HashMap<String, LoadState>>,
}

impl CollectionStore {
    fn new(shared: Arc<dyn SharedStore>) -> Self {
        Self {
            shared,
            states: Mutex::new(HashMap::new()),
        }
    }

    /// Raw data, straight from the host store. Called with no internal
    /// locks held: the host may re-enter the accessor during this read.
    pub fn raw(&self, name: &str) -> Option<Arc<Value>> {
        self.shared.raw(name)
    }

    /// The load record for a collection, created on first access and
    /// reused across reloads (never deleted).
    pub fn state(&self, name: &str) -> LoadState {
        let mut states = self.states.lock().unwrap();
        states.entry(name.to_string()).or_default().clone()
    }

    pub fn update_state<R>(&self, name: &str, f: impl FnOnce(&mut LoadState) -> R) -> R {
        let mut states = self.states.lock().unwrap();
        f(states.entry(name.to_string()).or_default())
    }
}

pub(crate) struct ContextInner {
    pub(crate) store: CollectionStore,
    pub(crate) loader: Arc<dyn CollectionLoader>,
    pub(crate) classifier: Arc<dyn CollectionClassifier>,
    pub(crate) mutation: Option<Arc<dyn MutationHandler>>,
    pub(crate) pagination: Option<Arc<dyn PageHandler>>,
    pub(crate) locale: String,
    pub(crate) error_cooldown: Duration,
    pub(crate) pending_grace: Duration,
    pub(crate) depth: DepthCounter,
    pub(crate) views: IdentityCache,
    caps: Mutex<HashMap<String, Arc<CapabilitySet>>>,
    placeholders: Mutex<HashMap<String, Arc<Placeholder>>>,
    pub(crate) pending: Mutex<HashMap<String, PendingLoad>>,
}

impl ContextInner {
    /// Current load record of a collection.
    pub(crate) fn state(&self, name: &str) -> LoadState {
        self.store.state(name)
    }

    /// The capability set for a collection, resolved from the classifier
    /// once and cached. The classifier (a host call) runs with no locks
    /// held, so it may itself re-enter the accessor.
    pub(crate) fn capabilities(&self, name: &str) -> Arc<CapabilitySet> {
        if let Some(caps) = self.caps.lock().unwrap().get(name) {
            return Arc::clone(caps);
        }
        let class = self.classifier.classify(name);
        let caps = Arc::new(CapabilitySet::new(
            class,
            self.mutation.clone(),
            self.pagination.clone(),
        ));
        let mut map = self.caps.lock().unwrap();
        Arc::clone(map.entry(name.to_string()).or_insert(caps))
    }

    /// The memoized top-level placeholder for a collection: repeated
    /// accesses of an unresolved collection see the identical stand-in.
    pub(crate) fn placeholder_for(self: &Arc<Self>, name: &str) -> Arc<Placeholder> {
        let mut placeholders = self.placeholders.lock().unwrap();
        if let Some(existing) = placeholders.get(name) {
            return Arc::clone(existing);
        }
        let placeholder = Placeholder::new(name, Vec::new(), Arc::downgrade(self));
        placeholders.insert(name.to_string(), Arc::clone(&placeholder));
        placeholder
    }
}

/// Capability set for derived views that outlived their context.
pub(crate) fn detached_capabilities() -> Arc<CapabilitySet> {
    Arc::new(CapabilitySet::new(CollectionClass::local(), None, None))
}

/// Resolve `(collection, path)` to a view.
///
/// This is the whole pipeline; `AccessorContext::resolve`, object
/// descent, and array indexing all funnel through here.
pub(crate) fn resolve_segments(inner: &Arc<ContextInner>, name: &str, path: Vec<String>) -> View {
    let guard = inner.depth.enter();
    if guard.exceeded() {
        // Host-driven re-entry ran away; degrade instead of recursing.
        log::debug!("resolution depth ceiling hit on '{name}', returning placeholder");
        return pending_at(inner, name, &path);
    }

    // Raw data first; everything after works on this captured reference.
    let raw = match inner.store.raw(name) {
        Some(raw) => raw,
        None => {
            loader::ensure_loading(inner, name, false);
            return pending_at(inner, name, &path);
        }
    };

    // Data may arrive without a load (seeded or host-written).
    if !inner.store.state(name).ready {
        inner.store.update_state(name, |state| state.ready = true);
    }

    let key = ViewKey::at(name, path);
    if let Some(view) = inner.views.lookup(&key, &raw) {
        return view;
    }
    let view = build_view(inner, &key, &raw);
    inner.views.store(key, raw, view.clone());
    view
}

fn pending_at(inner: &Arc<ContextInner>, name: &str, path: &[String]) -> View {
    let mut placeholder = inner.placeholder_for(name);
    for key in path {
        placeholder = placeholder.child(key);
    }
    View::Pending(placeholder)
}

fn build_view(inner: &Arc<ContextInner>, key: &ViewKey, raw: &Arc<Value>) -> View {
    let node = match walk::descend(raw, &key.path) {
        Some(node) => node,
        // Present collection, missing sub-path: resolved nothing.
        None => return View::null(),
    };
    match classify(node) {
        Shape::Scalar => {
            if key.path.is_empty() {
                View::Scalar(Arc::clone(raw))
            } else {
                View::Scalar(Arc::new(node.clone()))
            }
        }
        Shape::Array => View::Array(Arc::new(ArrayView::shared(
            &key.collection,
            Arc::clone(raw),
            key.path.clone(),
            inner.capabilities(&key.collection),
            Arc::downgrade(inner),
        ))),
        Shape::Object => View::Object(Arc::new(ObjectView::stored(
            &key.collection,
            Arc::clone(raw),
            key.path.clone(),
            Arc::downgrade(inner),
        ))),
    }
}

/// Handle to one accessor session.
///
/// Cheap to clone; all clones share the same caches and guard.
///
/// # Example
///
/// ```ignore
/// let ctx = AccessorContext::builder(store, loader)
///     .with_classifier(classifier)
///     .with_locale("en")
///     .build();
///
/// let items = ctx.resolve("items");
/// if items.ready() {
///     for row in items.items() { /* ... */ }
/// }
/// ```
#[derive(Clone)]
pub struct AccessorContext {
    inner: Arc<ContextInner>,
}

impl AccessorContext {
    /// Start building a context over a store and a loader.
    pub fn builder(
        store: Arc<dyn SharedStore>,
        loader: Arc<dyn CollectionLoader>,
    ) -> AccessorContextBuilder {
        AccessorContextBuilder {
            store,
            loader,
            classifier: Arc::new(StaticData),
            mutation: None,
            pagination: None,
            locale: "en".to_string(),
            error_cooldown: DEFAULT_ERROR_COOLDOWN,
            pending_grace: DEFAULT_PENDING_GRACE,
        }
    }

    /// Resolve a collection by name.
    ///
    /// Never blocks and never fails: unresolved collections yield a
    /// placeholder (and start a single-flight load); resolved ones yield
    /// the memoized view for the current raw reference.
    pub fn resolve(&self, name: &str) -> View {
        resolve_segments(&self.inner, name, Vec::new())
    }

    /// Resolve a nested path within a collection.
    pub fn resolve_path(&self, name: &str, path: &[&str]) -> View {
        let path = path.iter().map(|s| s.to_string()).collect();
        resolve_segments(&self.inner, name, path)
    }

    /// The load record of a collection.
    pub fn load_state(&self, name: &str) -> LoadState {
        self.inner.store.state(name)
    }

    /// The most recent load failure as a typed error, if the last attempt
    /// failed. Load failures are recorded rather than thrown at whoever
    /// touched the collection first; this is where callers pick them up.
    pub fn load_failure(&self, name: &str) -> Option<Error> {
        self.inner
            .store
            .state(name)
            .error_message()
            .map(|message| Error::LoadFailure {
                collection: name.to_string(),
                message: message.to_string(),
            })
    }

    /// Whether a load for `name` is in flight (or within its settle
    /// grace period).
    pub fn is_load_pending(&self, name: &str) -> bool {
        self.inner.pending.lock().unwrap().contains_key(name)
    }

    /// Explicitly reload a collection: drop its cached views and start a
    /// fresh load, bypassing any error cooldown.
    pub fn reload(&self, name: &str) {
        self.inner.views.invalidate(name);
        self.inner.store.update_state(name, |state| state.error = None);
        loader::ensure_loading(&self.inner, name, true);
    }

    /// Current resolution depth; 0 whenever no resolution is on the
    /// stack.
    pub fn resolution_depth(&self) -> usize {
        self.inner.depth.current()
    }

    /// Drop all cached views, placeholders, and capability sets. Load
    /// records survive: they are lifecycle state, not cache.
    pub fn reset(&self) {
        self.inner.views.clear();
        self.inner.placeholders.lock().unwrap().clear();
        self.inner.caps.lock().unwrap().clear();
    }
}

/// Builder for [`AccessorContext`].
pub struct AccessorContextBuilder {
    store: Arc<dyn SharedStore>,
    loader: Arc<dyn CollectionLoader>,
    classifier: Arc<dyn CollectionClassifier>,
    mutation: Option<Arc<dyn MutationHandler>>,
    pagination: Option<Arc<dyn PageHandler>>,
    locale: String,
    error_cooldown: Duration,
    pending_grace: Duration,
}

impl AccessorContextBuilder {
    /// Classifier distinguishing externally-backed collections.
    pub fn with_classifier(mut self, classifier: Arc<dyn CollectionClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Handler for create/update/delete delegation.
    pub fn with_mutation_handler(mut self, handler: Arc<dyn MutationHandler>) -> Self {
        self.mutation = Some(handler);
        self
    }

    /// Handler for external cursor-based pagination.
    pub fn with_page_handler(mut self, handler: Arc<dyn PageHandler>) -> Self {
        self.pagination = Some(handler);
        self
    }

    /// Locale passed to the loader.
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    /// Cooldown after a failed load before retries are allowed.
    pub fn with_error_cooldown(mut self, cooldown: Duration) -> Self {
        self.error_cooldown = cooldown;
        self
    }

    /// How long a settled load lingers to absorb duplicate triggers.
    pub fn with_pending_grace(mut self, grace: Duration) -> Self {
        self.pending_grace = grace;
        self
    }

    pub fn build(self) -> AccessorContext {
        AccessorContext {
            inner: Arc::new(ContextInner {
                store: CollectionStore::new(self.store),
                loader: self.loader,
                classifier: self.classifier,
                mutation: self.mutation,
                pagination: self.pagination,
                locale: self.locale,
                error_cooldown: self.error_cooldown,
                pending_grace: self.pending_grace,
                depth: DepthCounter::default(),
                views: IdentityCache::default(),
                caps: Mutex::new(HashMap::new()),
                placeholders: Mutex::new(HashMap::new()),
                pending: Mutex::new(HashMap::new()),
            }),
        }
    }
}
