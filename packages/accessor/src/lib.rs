//! Lazy, identity-stable access to named data collections.
//!
//! The accessor sits between a host application and its data: collections
//! are fetched on first touch, shaped into cheap view handles, and
//! memoized so that repeated access to unchanged data returns the
//! *identical* view object. Hosts that track dependencies by identity can
//! therefore read through the accessor without spurious re-evaluation.
//!
//! The core promises:
//!
//! - **Lazy loading.** Touching an unresolved collection starts exactly
//!   one fetch (single-flight) and immediately returns a chain-safe
//!   placeholder; nothing blocks, nothing throws.
//! - **Identity stability.** For an unchanged raw reference, resolving the
//!   same `(collection, path)` twice yields handles to the same view.
//! - **Chain safety.** `view.get("a").get("b").index(0)` never panics on
//!   any variant: placeholders chain to placeholders, scalars to nulls.
//! - **Bounded re-entry.** Host frameworks that re-enter the resolver from
//!   read hooks are cut off at a fixed depth and degrade to placeholders
//!   instead of recursing without bound.
//!
//! # Example
//!
//! ```ignore
//! use facet_accessor::AccessorContext;
//!
//! let ctx = AccessorContext::builder(store, loader).build();
//!
//! let items = ctx.resolve("items");   // starts a load, returns a placeholder
//! assert!(!items.ready());
//!
//! // ... once the loader has written the store ...
//! let items = ctx.resolve("items");
//! let first = items.index(0).get("name");
//! ```

mod array_view;
mod cache;
mod capability;
mod classify;
mod context;
mod error;
mod guard;
mod host;
mod loader;
mod placeholder;
mod query;
mod view;

pub use array_view::ArrayView;
pub use capability::{CapabilitySet, Paginator};
pub use classify::{classify, Shape};
pub use context::{
    AccessorContext, AccessorContextBuilder, DEFAULT_ERROR_COOLDOWN, DEFAULT_PENDING_GRACE,
};
pub use error::Error;
pub use guard::MAX_RESOLVE_DEPTH;
pub use host::{
    CollectionClass, CollectionClassifier, CollectionLoader, Mutation, MutationHandler, Page,
    PageHandler, PageRequest, StaticData,
};
pub use placeholder::Placeholder;
pub use query::QueryOp;
pub use view::{ObjectView, View};
