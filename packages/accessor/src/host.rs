//! Host-facing interfaces.
//!
//! The accessor stays agnostic to how the host fetches, classifies, or
//! mutates collections; it only consumes these traits. Every handler
//! except the loader is optional — absence degrades the dependent
//! capability to a descriptive error, never the read path.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Error;

/// Fetches a collection and writes it into the shared store.
///
/// Errors are reported as strings; the accessor records them into the
/// collection's `LoadState` (with a retry cooldown) instead of propagating
/// them to whoever happened to touch the collection first.
#[async_trait]
pub trait CollectionLoader: Send + Sync {
    /// Fetch `name` for `locale`. On success the loader must have written
    /// the raw data into the shared store before returning.
    async fn load(&self, name: &str, locale: &str) -> Result<(), String>;
}

/// Host-supplied metadata for one collection.
///
/// Distinguishes externally-backed collections (which support
/// create/update/delete and server-side pagination) from purely
/// local/static data.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CollectionClass {
    /// Create/update/delete may be delegated to a mutation handler.
    pub mutable: bool,
    /// first/next/previous/page may be delegated to a page handler.
    pub paginable: bool,
}

impl CollectionClass {
    /// A fully externally-backed collection.
    pub fn backed() -> Self {
        Self {
            mutable: true,
            paginable: true,
        }
    }

    /// Local or static data: nothing beyond the pure local capabilities.
    pub fn local() -> Self {
        Self::default()
    }
}

/// Classifies collections by name.
pub trait CollectionClassifier: Send + Sync {
    fn classify(&self, name: &str) -> CollectionClass;
}

/// Default classifier: everything is local/static data.
pub struct StaticData;

impl CollectionClassifier for StaticData {
    fn classify(&self, _name: &str) -> CollectionClass {
        CollectionClass::local()
    }
}

/// A write operation delegated to the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mutation {
    Create,
    Update,
    Delete,
}

impl Mutation {
    /// Lowercase verb for error messages and logs.
    pub fn verb(&self) -> &'static str {
        match self {
            Mutation::Create => "create",
            Mutation::Update => "update",
            Mutation::Delete => "delete",
        }
    }
}

/// Applies create/update/delete against the external backing of a
/// collection. Results propagate to the caller, who is expected to react.
#[async_trait]
pub trait MutationHandler: Send + Sync {
    async fn apply(&self, op: Mutation, name: &str, payload: Value) -> Result<Value, Error>;
}

/// Which page to fetch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PageRequest {
    First,
    Next,
    Prev,
    Number(u64),
}

/// One page of an externally-paginated collection.
#[derive(Clone, Debug, Default)]
pub struct Page {
    /// The rows of this page.
    pub items: Vec<Value>,
    /// Opaque cursor for fetching the following page, if any.
    pub cursor: Option<String>,
    /// Whether more pages exist after this one.
    pub has_more: bool,
}

/// Cursor-based page fetching against the external backing.
#[async_trait]
pub trait PageHandler: Send + Sync {
    async fn fetch(
        &self,
        request: PageRequest,
        name: &str,
        cursor: Option<&str>,
        limit: usize,
    ) -> Result<Page, Error>;
}
