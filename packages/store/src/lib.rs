//! Facet store layer: the boundary between the accessor core and the
//! host's shared reactive store.
//!
//! This layer owns no resolution logic. It defines:
//! - `SharedStore`: read/write access to raw collection data, held as
//!   `Arc<serde_json::Value>` so identity changes are observable
//! - `MemoryStore`: an in-memory reference implementation with optional
//!   read observation (models the host's dependency tracking)
//! - `LoadState`: the per-collection load lifecycle record
//! - `walk`: path descent through a value tree
//!
//! # Example
//!
//! ```rust
//! use facet_store::{MemoryStore, SharedStore};
//! use serde_json::json;
//!
//! let store = MemoryStore::new();
//! store.put("users", json!([{"id": 1}]));
//!
//! let raw = store.raw("users").unwrap();
//! assert!(raw.is_array());
//! ```

mod load_state;
mod shared;
pub mod walk;

pub use load_state::{LoadError, LoadState};
pub use shared::{MemoryStore, ReadObserver, SharedStore};

// Raw collection data is plain JSON.
pub use serde_json::Value;
