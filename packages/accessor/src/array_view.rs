//! Array-shaped views.
//!
//! An array view either borrows the shared raw reference (store-backed
//! data, element access memoized through the identity cache) or owns its
//! items (derived results from search/query/pagination). Both carry the
//! collection's capability set, so chained results keep every operation.

use std::sync::{Arc, Weak};

use serde_json::Value;

use facet_store::walk;

use crate::capability::{CapabilitySet, Paginator};
use crate::classify::array_like_len;
use crate::context::{self, ContextInner};
use crate::error::Error;
use crate::host::Mutation;
use crate::query::{self, QueryOp};
use crate::view::View;

enum Backing {
    /// Borrow of the shared raw reference, addressed by nested path.
    Shared { raw: Arc<Value>, path: Vec<String> },
    /// Derived items (query/search/pagination results).
    Owned(Vec<Value>),
}

/// A resolved, array-shaped view of (part of) a collection.
///
/// Supports plain sequence access plus the attached capability set. An
/// empty array view is fully resolved data — `ready()` is `true` — and is
/// never conflated with a placeholder.
pub struct ArrayView {
    collection: String,
    backing: Backing,
    caps: Arc<CapabilitySet>,
    ctx: Weak<ContextInner>,
}

impl ArrayView {
    pub(crate) fn shared(
        collection: &str,
        raw: Arc<Value>,
        path: Vec<String>,
        caps: Arc<CapabilitySet>,
        ctx: Weak<ContextInner>,
    ) -> Self {
        Self {
            collection: collection.to_string(),
            backing: Backing::Shared { raw, path },
            caps,
            ctx,
        }
    }

    pub(crate) fn owned(
        collection: &str,
        items: Vec<Value>,
        caps: Arc<CapabilitySet>,
        ctx: Weak<ContextInner>,
    ) -> Self {
        Self {
            collection: collection.to_string(),
            backing: Backing::Owned(items),
            caps,
            ctx,
        }
    }

    /// The collection this view belongs to.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Resolved views always report ready; only placeholders do not.
    pub fn ready(&self) -> bool {
        true
    }

    /// Whether this view borrows live store data (as opposed to owning a
    /// derived result set).
    pub fn is_store_backed(&self) -> bool {
        matches!(self.backing, Backing::Shared { .. })
    }

    /// The array node this view wraps, for store-backed views.
    fn node(&self) -> Option<&Value> {
        match &self.backing {
            Backing::Shared { raw, path } => walk::descend(raw, path),
            Backing::Owned(_) => None,
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        match &self.backing {
            Backing::Owned(items) => items.len(),
            Backing::Shared { .. } => match self.node() {
                Some(Value::Array(items)) => items.len(),
                Some(Value::Object(map)) => array_like_len(map).unwrap_or(0),
                _ => 0,
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Borrow one element.
    pub fn value(&self, index: usize) -> Option<&Value> {
        match &self.backing {
            Backing::Owned(items) => items.get(index),
            Backing::Shared { .. } => match self.node()? {
                Value::Array(items) => items.get(index),
                Value::Object(map) => map.get(index.to_string().as_str()),
                _ => None,
            },
        }
    }

    /// Iterate the elements in order.
    pub fn iter(&self) -> impl Iterator<Item = &Value> + '_ {
        (0..self.len()).filter_map(|i| self.value(i))
    }

    /// Clone the elements out, e.g. as query input.
    pub fn values(&self) -> Vec<Value> {
        self.iter().cloned().collect()
    }

    /// Resolve one element as a view.
    ///
    /// Store-backed elements go through the identity cache keyed by the
    /// extended path; derived elements wrap directly.
    pub fn get(&self, index: usize) -> View {
        match &self.backing {
            Backing::Shared { path, .. } => match self.ctx.upgrade() {
                Some(ctx) => context::resolve_segments(
                    &ctx,
                    &self.collection,
                    walk::child_path(path, &index.to_string()),
                ),
                None => View::null(),
            },
            Backing::Owned(items) => match items.get(index) {
                Some(item) => View::wrap_detached(&self.collection, item, &self.ctx),
                None => View::null(),
            },
        }
    }

    /// The attached capability set.
    pub fn capabilities(&self) -> &Arc<CapabilitySet> {
        &self.caps
    }

    fn derived(&self, items: Vec<Value>) -> ArrayView {
        ArrayView::owned(
            &self.collection,
            items,
            Arc::clone(&self.caps),
            self.ctx.clone(),
        )
    }

    /// Apply a query op list left-to-right; the result carries the same
    /// capability set, so chaining keeps working.
    pub fn query(&self, ops: &[QueryOp]) -> ArrayView {
        self.derived(query::apply(ops, self.values()))
    }

    /// Like [`query`](Self::query), from the JSON list form
    /// (`[["equal", "id", 1], ...]`).
    pub fn query_json(&self, ops: &Value) -> Result<ArrayView, Error> {
        Ok(self.query(&QueryOp::parse_list(ops)?))
    }

    /// Local case-insensitive substring search over `fields` (or all
    /// string-valued fields); the result carries the capability set.
    pub fn search(&self, needle: &str, fields: Option<&[&str]>) -> ArrayView {
        let items = self.values();
        self.derived(query::search(&items, needle, fields))
    }

    /// Start external pagination with the given page size.
    ///
    /// Fails with `UnsupportedOperation` when the collection is not
    /// classified paginable, `CapabilityUnavailable` when no page handler
    /// is registered.
    pub fn paginate(&self, limit: usize) -> Result<Paginator, Error> {
        self.caps.paginate(
            &self.collection,
            limit,
            Arc::clone(&self.caps),
            self.ctx.clone(),
        )
    }

    /// Create a record through the host's mutation handler.
    pub async fn create(&self, payload: Value) -> Result<Value, Error> {
        self.caps
            .mutate(&self.collection, Mutation::Create, payload)
            .await
    }

    /// Update a record through the host's mutation handler.
    pub async fn update(&self, payload: Value) -> Result<Value, Error> {
        self.caps
            .mutate(&self.collection, Mutation::Update, payload)
            .await
    }

    /// Delete a record through the host's mutation handler.
    pub async fn delete(&self, payload: Value) -> Result<Value, Error> {
        self.caps
            .mutate(&self.collection, Mutation::Delete, payload)
            .await
    }
}

impl std::fmt::Debug for ArrayView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArrayView")
            .field("collection", &self.collection)
            .field("len", &self.len())
            .field("store_backed", &self.is_store_backed())
            .finish()
    }
}
