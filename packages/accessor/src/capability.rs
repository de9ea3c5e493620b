//! The capability set attached to array-shaped views.
//!
//! Filter/sort/search are pure and always available. Create/update/delete
//! and external pagination delegate to host handlers and depend on the
//! collection's classification. The set is resolved once per collection
//! from the classifier and cached on the context, so access never repeats
//! configuration lookups.

use std::sync::{Arc, Mutex, Weak};

use serde_json::Value;

use crate::array_view::ArrayView;
use crate::context::ContextInner;
use crate::error::Error;
use crate::host::{CollectionClass, Mutation, MutationHandler, PageHandler, PageRequest};

/// The resolved operation bundle for one collection.
///
/// Always present on array views; unavailable operations fail with a
/// descriptive error instead of being absent.
pub struct CapabilitySet {
    class: CollectionClass,
    mutation: Option<Arc<dyn MutationHandler>>,
    pagination: Option<Arc<dyn PageHandler>>,
}

impl CapabilitySet {
    pub(crate) fn new(
        class: CollectionClass,
        mutation: Option<Arc<dyn MutationHandler>>,
        pagination: Option<Arc<dyn PageHandler>>,
    ) -> Self {
        Self {
            class,
            mutation,
            pagination,
        }
    }

    /// Classification of the backing collection.
    pub fn class(&self) -> CollectionClass {
        self.class
    }

    /// Delegate a create/update/delete to the mutation handler.
    ///
    /// Errors propagate to the caller: unlike the read path, the caller of
    /// a mutation is expected to react.
    pub(crate) async fn mutate(
        &self,
        collection: &str,
        op: Mutation,
        payload: Value,
    ) -> Result<Value, Error> {
        if !self.class.mutable {
            return Err(Error::UnsupportedOperation {
                collection: collection.to_string(),
                operation: format!("{} (not an externally backed collection)", op.verb()),
            });
        }
        let handler = self
            .mutation
            .as_ref()
            .ok_or_else(|| Error::CapabilityUnavailable {
                collection: collection.to_string(),
                capability: "mutation",
            })?;
        handler.apply(op, collection, payload).await
    }

    /// Start external pagination over the collection.
    pub(crate) fn paginate(
        &self,
        collection: &str,
        limit: usize,
        caps: Arc<CapabilitySet>,
        ctx: Weak<ContextInner>,
    ) -> Result<Paginator, Error> {
        if !self.class.paginable {
            return Err(Error::UnsupportedOperation {
                collection: collection.to_string(),
                operation: "paginate".to_string(),
            });
        }
        let handler = self
            .pagination
            .as_ref()
            .ok_or_else(|| Error::CapabilityUnavailable {
                collection: collection.to_string(),
                capability: "pagination",
            })?;
        Ok(Paginator {
            collection: collection.to_string(),
            limit,
            handler: Arc::clone(handler),
            caps,
            ctx,
            trail: Mutex::new(Trail::default()),
        })
    }
}

#[derive(Default)]
struct Trail {
    /// Cursor used to fetch each visited page; `None` for the first.
    cursors: Vec<Option<String>>,
    /// Cursor for the page after the current one.
    next: Option<String>,
    has_more: bool,
}

/// Cursor-based pagination over an externally backed collection.
///
/// Tracks the trail of visited pages locally so `previous` can re-fetch
/// without handler-side history. Jumping with `page(n)` resets the trail.
pub struct Paginator {
    collection: String,
    limit: usize,
    handler: Arc<dyn PageHandler>,
    caps: Arc<CapabilitySet>,
    ctx: Weak<ContextInner>,
    trail: Mutex<Trail>,
}

impl Paginator {
    /// Page size requested from the handler.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Whether the most recently fetched page reported more after it.
    pub fn has_more(&self) -> bool {
        self.trail.lock().unwrap().has_more
    }

    fn view_of(&self, items: Vec<Value>) -> ArrayView {
        ArrayView::owned(
            &self.collection,
            items,
            Arc::clone(&self.caps),
            self.ctx.clone(),
        )
    }

    /// Fetch the first page, resetting the trail.
    pub async fn first(&self) -> Result<ArrayView, Error> {
        let page = self
            .handler
            .fetch(PageRequest::First, &self.collection, None, self.limit)
            .await?;
        let mut trail = self.trail.lock().unwrap();
        trail.cursors = vec![None];
        trail.next = page.cursor;
        trail.has_more = page.has_more;
        Ok(self.view_of(page.items))
    }

    /// Fetch the page after the current one.
    pub async fn next(&self) -> Result<ArrayView, Error> {
        let cursor = self.trail.lock().unwrap().next.clone();
        let page = self
            .handler
            .fetch(
                PageRequest::Next,
                &self.collection,
                cursor.as_deref(),
                self.limit,
            )
            .await?;
        let mut trail = self.trail.lock().unwrap();
        trail.cursors.push(cursor);
        trail.next = page.cursor;
        trail.has_more = page.has_more;
        Ok(self.view_of(page.items))
    }

    /// Re-fetch the page before the current one.
    pub async fn previous(&self) -> Result<ArrayView, Error> {
        let cursor = {
            let mut trail = self.trail.lock().unwrap();
            if trail.cursors.len() <= 1 {
                return Err(Error::UnsupportedOperation {
                    collection: self.collection.clone(),
                    operation: "previous (already at the first page)".to_string(),
                });
            }
            trail.cursors.pop();
            trail.cursors.last().cloned().flatten()
        };
        let page = self
            .handler
            .fetch(
                PageRequest::Prev,
                &self.collection,
                cursor.as_deref(),
                self.limit,
            )
            .await?;
        let mut trail = self.trail.lock().unwrap();
        trail.next = page.cursor;
        trail.has_more = page.has_more;
        Ok(self.view_of(page.items))
    }

    /// Jump straight to a page number. Resets the local trail: `previous`
    /// afterwards behaves as if this were the first page.
    pub async fn page(&self, number: u64) -> Result<ArrayView, Error> {
        let page = self
            .handler
            .fetch(
                PageRequest::Number(number),
                &self.collection,
                None,
                self.limit,
            )
            .await?;
        let mut trail = self.trail.lock().unwrap();
        trail.cursors = vec![None];
        trail.next = page.cursor;
        trail.has_more = page.has_more;
        Ok(self.view_of(page.items))
    }
}

impl std::fmt::Debug for Paginator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Paginator")
            .field("collection", &self.collection)
            .field("limit", &self.limit)
            .field("has_more", &self.has_more())
            .finish()
    }
}
