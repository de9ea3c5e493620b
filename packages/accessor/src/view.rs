//! Views: the wrappers handed to consumers.
//!
//! A `View` is cheap to clone (it is a handle) and identity-stable: for an
//! unchanged raw reference, resolving the same (collection, path) twice
//! yields handles to the identical underlying view object. Chained access
//! never panics on any variant — unresolved data chains through
//! placeholders, scalars chain to nulls.

use std::sync::{Arc, Weak};

use serde_json::Value;

use facet_store::walk;

use crate::array_view::ArrayView;
use crate::classify::{classify, Shape};
use crate::context::{self, ContextInner};
use crate::placeholder::Placeholder;
use crate::query::QueryOp;

/// A read wrapper over a collection or a nested path within one.
///
/// - `Scalar`: raw value passthrough, unwrapped.
/// - `Array`: sequence access plus the capability set.
/// - `Object`: key access with memoized recursive descent.
/// - `Pending`: chain-safe stand-in while the collection is unresolved.
#[derive(Clone)]
pub enum View {
    Scalar(Arc<Value>),
    Array(Arc<ArrayView>),
    Object(Arc<ObjectView>),
    Pending(Arc<Placeholder>),
}

impl View {
    /// A benign null scalar, the terminal chain value.
    pub fn null() -> View {
        View::Scalar(Arc::new(Value::Null))
    }

    /// Identity comparison: do both handles point at the same view object?
    pub fn ptr_eq(a: &View, b: &View) -> bool {
        match (a, b) {
            (View::Scalar(x), View::Scalar(y)) => Arc::ptr_eq(x, y),
            (View::Array(x), View::Array(y)) => Arc::ptr_eq(x, y),
            (View::Object(x), View::Object(y)) => Arc::ptr_eq(x, y),
            (View::Pending(x), View::Pending(y)) => Arc::ptr_eq(x, y),
            _ => false,
        }
    }

    /// Property access. Safe on every variant: objects resolve the key,
    /// arrays accept numeric keys, placeholders chain, scalars yield null.
    pub fn get(&self, key: &str) -> View {
        match self {
            View::Object(object) => object.get(key),
            View::Array(array) => match key.parse::<usize>() {
                Ok(index) => array.get(index),
                Err(_) => View::null(),
            },
            View::Pending(placeholder) => View::Pending(placeholder.child(key)),
            View::Scalar(_) => View::null(),
        }
    }

    /// Numeric index access.
    pub fn index(&self, index: usize) -> View {
        match self {
            View::Array(array) => array.get(index),
            _ => self.get(&index.to_string()),
        }
    }

    /// Element/key count; 0 for scalars and placeholders.
    pub fn len(&self) -> usize {
        match self {
            View::Array(array) => array.len(),
            View::Object(object) => object.len(),
            View::Scalar(_) | View::Pending(_) => 0,
        }
    }

    /// Placeholders and scalars iterate as empty; so do empty arrays —
    /// the state flags, not emptiness, distinguish the two.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The elements of an array view; empty for everything else.
    pub fn items(&self) -> Vec<View> {
        match self {
            View::Array(array) => (0..array.len()).map(|i| array.get(i)).collect(),
            _ => Vec::new(),
        }
    }

    /// Whether backing data has resolved. `false` only for placeholders.
    pub fn ready(&self) -> bool {
        match self {
            View::Pending(placeholder) => placeholder.ready(),
            _ => true,
        }
    }

    /// Whether a load for the backing collection is in flight.
    pub fn loading(&self) -> bool {
        match self {
            View::Pending(placeholder) => placeholder.loading(),
            _ => false,
        }
    }

    /// The most recent load failure for an unresolved collection.
    pub fn load_error(&self) -> Option<String> {
        match self {
            View::Pending(placeholder) => placeholder.load_error(),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, View::Pending(_))
    }

    pub fn as_array(&self) -> Option<&Arc<ArrayView>> {
        match self {
            View::Array(array) => Some(array),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Arc<ObjectView>> {
        match self {
            View::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_pending(&self) -> Option<&Arc<Placeholder>> {
        match self {
            View::Pending(placeholder) => Some(placeholder),
            _ => None,
        }
    }

    /// The raw scalar value, for scalar views.
    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            View::Scalar(value) => Some(value),
            _ => None,
        }
    }

    /// Clone the backing data out as plain JSON. Placeholders materialize
    /// as null; array views materialize as true arrays regardless of
    /// array-like backing.
    pub fn materialize(&self) -> Value {
        match self {
            View::Scalar(value) => (**value).clone(),
            View::Array(array) => Value::Array(array.values()),
            View::Object(object) => object.value().cloned().unwrap_or(Value::Null),
            View::Pending(_) => Value::Null,
        }
    }

    /// Query passthrough: applies on arrays, chains through placeholders
    /// (still flagged unready), degrades to null elsewhere.
    pub fn query(&self, ops: &[QueryOp]) -> View {
        match self {
            View::Array(array) => View::Array(Arc::new(array.query(ops))),
            View::Pending(_) => self.clone(),
            _ => View::null(),
        }
    }

    /// Search passthrough, same degradation rules as [`query`](Self::query).
    pub fn search(&self, needle: &str, fields: Option<&[&str]>) -> View {
        match self {
            View::Array(array) => View::Array(Arc::new(array.search(needle, fields))),
            View::Pending(_) => self.clone(),
            _ => View::null(),
        }
    }

    /// Wrap a derived (non-store-backed) value as a view.
    pub(crate) fn wrap_detached(collection: &str, value: &Value, ctx: &Weak<ContextInner>) -> View {
        match classify(value) {
            Shape::Scalar => View::Scalar(Arc::new(value.clone())),
            Shape::Array => {
                let caps = match ctx.upgrade() {
                    Some(ctx) => ctx.capabilities(collection),
                    None => context::detached_capabilities(),
                };
                let items = match value {
                    Value::Array(items) => items.clone(),
                    Value::Object(map) => {
                        let len = crate::classify::array_like_len(map).unwrap_or(0);
                        (0..len)
                            .filter_map(|i| map.get(i.to_string().as_str()).cloned())
                            .collect()
                    }
                    _ => Vec::new(),
                };
                View::Array(Arc::new(ArrayView::owned(
                    collection,
                    items,
                    caps,
                    ctx.clone(),
                )))
            }
            Shape::Object => View::Object(Arc::new(ObjectView::detached(
                collection,
                Arc::new(value.clone()),
                ctx.clone(),
            ))),
        }
    }
}

impl std::fmt::Debug for View {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            View::Scalar(value) => f.debug_tuple("Scalar").field(value).finish(),
            View::Array(array) => array.fmt(f),
            View::Object(object) => object.fmt(f),
            View::Pending(placeholder) => placeholder.fmt(f),
        }
    }
}

enum Origin {
    /// Borrow of the shared raw reference, addressed by nested path.
    Stored(Vec<String>),
    /// Derived subtree owned by this view.
    Detached,
}

/// An object-shaped view navigated by key.
///
/// Stored-mode key access resolves through the context pipeline keyed by
/// the extended path, so nested structures are memoized at every level.
pub struct ObjectView {
    collection: String,
    origin: Origin,
    raw: Arc<Value>,
    ctx: Weak<ContextInner>,
}

impl ObjectView {
    pub(crate) fn stored(
        collection: &str,
        raw: Arc<Value>,
        path: Vec<String>,
        ctx: Weak<ContextInner>,
    ) -> Self {
        Self {
            collection: collection.to_string(),
            origin: Origin::Stored(path),
            raw,
            ctx,
        }
    }

    pub(crate) fn detached(collection: &str, value: Arc<Value>, ctx: Weak<ContextInner>) -> Self {
        Self {
            collection: collection.to_string(),
            origin: Origin::Detached,
            raw: value,
            ctx,
        }
    }

    /// The collection this view belongs to.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// The object node this view wraps.
    pub fn value(&self) -> Option<&Value> {
        match &self.origin {
            Origin::Stored(path) => walk::descend(&self.raw, path),
            Origin::Detached => Some(&self.raw),
        }
    }

    /// Keys of the wrapped object.
    pub fn keys(&self) -> Vec<String> {
        match self.value() {
            Some(Value::Object(map)) => map.keys().cloned().collect(),
            _ => Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        match self.value() {
            Some(Value::Object(map)) => map.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains_key(&self, key: &str) -> bool {
        matches!(self.value(), Some(Value::Object(map)) if map.contains_key(key))
    }

    /// Resolve one key as a view.
    pub fn get(&self, key: &str) -> View {
        match &self.origin {
            Origin::Stored(path) => match self.ctx.upgrade() {
                Some(ctx) => context::resolve_segments(
                    &ctx,
                    &self.collection,
                    walk::child_path(path, key),
                ),
                None => View::null(),
            },
            Origin::Detached => match self.value().and_then(|v| v.get(key)) {
                Some(child) => View::wrap_detached(&self.collection, child, &self.ctx),
                None => View::null(),
            },
        }
    }
}

impl std::fmt::Debug for ObjectView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectView")
            .field("collection", &self.collection)
            .field("keys", &self.keys())
            .finish()
    }
}
