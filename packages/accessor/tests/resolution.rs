//! End-to-end resolution behavior: lazy loading, identity stability,
//! chain safety, and bounded re-entry, driven through a real store and a
//! mock loader.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Notify;

use facet_accessor::{AccessorContext, CollectionLoader, Error, View, MAX_RESOLVE_DEPTH};
use facet_store::{MemoryStore, SharedStore};

/// Loader serving canned collections into the shared store, with a call
/// counter and an optional gate to hold loads open.
struct StubLoader {
    store: Arc<MemoryStore>,
    data: Mutex<HashMap<String, Value>>,
    calls: AtomicUsize,
    gate: Option<Arc<Notify>>,
}

impl StubLoader {
    fn new(store: Arc<MemoryStore>, data: Vec<(&str, Value)>) -> Self {
        Self {
            store,
            data: Mutex::new(
                data.into_iter()
                    .map(|(name, value)| (name.to_string(), value))
                    .collect(),
            ),
            calls: AtomicUsize::new(0),
            gate: None,
        }
    }

    fn gated(store: Arc<MemoryStore>, data: Vec<(&str, Value)>, gate: Arc<Notify>) -> Self {
        let mut loader = Self::new(store, data);
        loader.gate = Some(gate);
        loader
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CollectionLoader for StubLoader {
    async fn load(&self, name: &str, _locale: &str) -> Result<(), String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        let value = self.data.lock().unwrap().get(name).cloned();
        match value {
            Some(value) => {
                self.store.put(name, value);
                Ok(())
            }
            None => Err(format!("no such collection '{name}'")),
        }
    }
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..400 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not met within the wait budget");
}

#[tokio::test]
async fn first_touch_returns_a_placeholder_then_data() {
    let store = Arc::new(MemoryStore::new());
    let loader = Arc::new(StubLoader::new(
        Arc::clone(&store),
        vec![("items", json!([{"id": 1, "name": "one"}]))],
    ));
    let ctx = AccessorContext::builder(store, Arc::clone(&loader) as Arc<dyn CollectionLoader>)
        .build();

    let first = ctx.resolve("items");
    assert!(first.is_pending());
    assert!(!first.ready());

    wait_until(|| ctx.load_state("items").ready).await;

    let resolved = ctx.resolve("items");
    assert!(resolved.ready());
    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved.index(0).get("name").materialize(), json!("one"));
    assert_eq!(loader.calls(), 1);
}

#[tokio::test]
async fn repeat_triggers_attach_to_one_flight() {
    let store = Arc::new(MemoryStore::new());
    let gate = Arc::new(Notify::new());
    let loader = Arc::new(StubLoader::gated(
        Arc::clone(&store),
        vec![("items", json!([1, 2, 3]))],
        Arc::clone(&gate),
    ));
    let ctx = AccessorContext::builder(store, Arc::clone(&loader) as Arc<dyn CollectionLoader>)
        .build();

    for _ in 0..50 {
        let view = ctx.resolve("items");
        assert!(view.is_pending());
    }
    // Let the spawned load reach the gate before opening it.
    tokio::time::sleep(Duration::from_millis(10)).await;
    gate.notify_one();

    wait_until(|| ctx.load_state("items").ready).await;
    assert_eq!(loader.calls(), 1);
    assert_eq!(ctx.resolve("items").len(), 3);
}

#[tokio::test]
async fn placeholder_identity_is_stable_while_loading() {
    let store = Arc::new(MemoryStore::new());
    let gate = Arc::new(Notify::new());
    let loader = Arc::new(StubLoader::gated(
        Arc::clone(&store),
        vec![("items", json!([]))],
        Arc::clone(&gate),
    ));
    let ctx = AccessorContext::builder(store, loader as Arc<dyn CollectionLoader>).build();

    let a = ctx.resolve("items");
    let b = ctx.resolve("items");
    assert!(View::ptr_eq(&a, &b));

    // Deep chains stay stable too.
    assert!(View::ptr_eq(&a.get("x").get("y"), &b.get("x").get("y")));
    assert!(a.loading());

    gate.notify_one();
}

#[tokio::test]
async fn resolved_views_are_identity_stable_until_the_store_changes() {
    let store = Arc::new(MemoryStore::with_collections(vec![(
        "cfg",
        json!({"theme": {"name": "dark"}}),
    )]));
    let loader = Arc::new(StubLoader::new(Arc::clone(&store), vec![]));
    let ctx = AccessorContext::builder(
        Arc::clone(&store) as Arc<dyn SharedStore>,
        loader as Arc<dyn CollectionLoader>,
    )
    .build();

    let a = ctx.resolve("cfg");
    let b = ctx.resolve("cfg");
    assert!(View::ptr_eq(&a, &b));
    assert!(View::ptr_eq(&a.get("theme"), &b.get("theme")));

    // Rewriting the collection replaces the raw reference; identity breaks
    // exactly then.
    store.put("cfg", json!({"theme": {"name": "light"}}));
    let c = ctx.resolve("cfg");
    assert!(!View::ptr_eq(&a, &c));
    assert_eq!(c.get("theme").get("name").materialize(), json!("light"));
}

#[tokio::test]
async fn empty_array_is_data_not_a_placeholder() {
    let store = Arc::new(MemoryStore::new());
    let loader = Arc::new(StubLoader::new(
        Arc::clone(&store),
        vec![("empty", json!([]))],
    ));
    let ctx = AccessorContext::builder(store, loader as Arc<dyn CollectionLoader>).build();

    let pending = ctx.resolve("empty");
    assert!(pending.is_empty());
    assert!(!pending.ready());

    wait_until(|| ctx.load_state("empty").ready).await;

    let loaded = ctx.resolve("empty");
    assert!(loaded.is_empty());
    assert!(loaded.ready());
    assert!(!loaded.is_pending());
}

#[tokio::test]
async fn failed_loads_record_an_error_and_respect_the_cooldown() {
    let store = Arc::new(MemoryStore::new());
    let loader = Arc::new(StubLoader::new(Arc::clone(&store), vec![]));
    let ctx = AccessorContext::builder(store, Arc::clone(&loader) as Arc<dyn CollectionLoader>)
        .with_error_cooldown(Duration::from_secs(300))
        .with_pending_grace(Duration::ZERO)
        .build();

    let view = ctx.resolve("missing");
    assert!(view.is_pending());

    wait_until(|| ctx.load_state("missing").error.is_some()).await;
    wait_until(|| !ctx.is_load_pending("missing")).await;
    assert_eq!(loader.calls(), 1);

    let again = ctx.resolve("missing");
    assert!(again.is_pending());
    assert_eq!(
        again.load_error().as_deref(),
        Some("no such collection 'missing'")
    );

    // The same failure is available as a typed error.
    let failure = ctx.load_failure("missing").unwrap();
    assert!(matches!(failure, Error::LoadFailure { .. }));
    assert!(failure.to_string().contains("missing"));
    assert!(failure.to_string().contains("no such collection"));
    assert!(ctx.load_failure("nonexistent-but-untouched").is_none());

    // Inside the cooldown: no new flight was started.
    assert_eq!(loader.calls(), 1);
}

#[tokio::test]
async fn reload_bypasses_the_cooldown() {
    let store = Arc::new(MemoryStore::new());
    let loader = Arc::new(StubLoader::new(Arc::clone(&store), vec![]));
    let ctx = AccessorContext::builder(store, Arc::clone(&loader) as Arc<dyn CollectionLoader>)
        .with_error_cooldown(Duration::from_secs(300))
        .with_pending_grace(Duration::ZERO)
        .build();

    let _ = ctx.resolve("missing");
    wait_until(|| ctx.load_state("missing").error.is_some()).await;
    wait_until(|| !ctx.is_load_pending("missing")).await;

    ctx.reload("missing");
    wait_until(|| !ctx.is_load_pending("missing")).await;
    assert_eq!(loader.calls(), 2);
}

#[tokio::test]
async fn reload_refetches_and_breaks_identity() {
    let store = Arc::new(MemoryStore::new());
    let loader = Arc::new(StubLoader::new(
        Arc::clone(&store),
        vec![("items", json!([10]))],
    ));
    let ctx = AccessorContext::builder(
        Arc::clone(&store) as Arc<dyn SharedStore>,
        Arc::clone(&loader) as Arc<dyn CollectionLoader>,
    )
    .with_pending_grace(Duration::ZERO)
    .build();

    let _ = ctx.resolve("items");
    wait_until(|| ctx.load_state("items").ready).await;
    wait_until(|| !ctx.is_load_pending("items")).await;
    let before = ctx.resolve("items");

    ctx.reload("items");
    wait_until(|| !ctx.is_load_pending("items")).await;
    assert_eq!(loader.calls(), 2);

    let after = ctx.resolve("items");
    assert!(!View::ptr_eq(&before, &after));
    assert_eq!(after.index(0).materialize(), json!(10));
}

#[tokio::test]
async fn scalar_and_deep_chains_never_panic() {
    let store = Arc::new(MemoryStore::with_collections(vec![
        ("motd", json!("hello")),
        ("cfg", json!({"a": {"b": [{"c": 1}]}})),
    ]));
    let loader = Arc::new(StubLoader::new(Arc::clone(&store), vec![]));
    let ctx = AccessorContext::builder(store, loader as Arc<dyn CollectionLoader>).build();

    // Scalars chain to nulls, never panic.
    let off_the_end = ctx.resolve("motd").get("no").get("such").index(7).get("path");
    assert!(off_the_end.materialize().is_null());
    assert!(off_the_end.ready());

    // Mixed object/array descent.
    let c = ctx.resolve("cfg").get("a").get("b").index(0).get("c");
    assert_eq!(c.materialize(), json!(1));

    // 20 levels past the data, still no panic.
    let mut view = ctx.resolve("cfg");
    for _ in 0..20 {
        view = view.get("deeper");
    }
    assert!(view.materialize().is_null());
}

#[tokio::test]
async fn reentrant_read_hooks_are_depth_bounded() {
    let store = Arc::new(MemoryStore::with_collections(vec![("cfg", json!({"a": 1}))]));
    let loader = Arc::new(StubLoader::new(Arc::clone(&store), vec![]));
    let ctx = AccessorContext::builder(
        Arc::clone(&store) as Arc<dyn SharedStore>,
        loader as Arc<dyn CollectionLoader>,
    )
    .build();

    // Model a dependency tracker that re-resolves on every raw read:
    // without the depth ceiling this recurses forever.
    let reads = Arc::new(AtomicUsize::new(0));
    let reads_inner = Arc::clone(&reads);
    let ctx_inner = ctx.clone();
    store.set_read_observer(Box::new(move |name| {
        reads_inner.fetch_add(1, Ordering::SeqCst);
        let _ = ctx_inner.resolve(name);
    }));

    let view = ctx.resolve("cfg");
    store.clear_read_observer();

    // The outermost call still resolved real data.
    assert!(view.ready());
    assert_eq!(view.get("a").materialize(), json!(1));
    // Re-entry was cut at the ceiling, not unbounded.
    assert!(reads.load(Ordering::SeqCst) <= MAX_RESOLVE_DEPTH + 1);
    assert_eq!(ctx.resolution_depth(), 0);
}

#[tokio::test]
async fn array_like_objects_read_as_sequences() {
    let store = Arc::new(MemoryStore::with_collections(vec![(
        "wrapped",
        json!({"length": 2, "0": {"id": 1}, "1": {"id": 2}}),
    )]));
    let loader = Arc::new(StubLoader::new(Arc::clone(&store), vec![]));
    let ctx = AccessorContext::builder(store, loader as Arc<dyn CollectionLoader>).build();

    let view = ctx.resolve("wrapped");
    assert_eq!(view.len(), 2);
    assert_eq!(view.index(1).get("id").materialize(), json!(2));

    // Identity holds through the array-like indirection too.
    assert!(View::ptr_eq(&view.index(0), &ctx.resolve("wrapped").index(0)));
}

#[tokio::test]
async fn reset_clears_caches_but_keeps_lifecycle_state() {
    let store = Arc::new(MemoryStore::new());
    let loader = Arc::new(StubLoader::new(
        Arc::clone(&store),
        vec![("items", json!([1]))],
    ));
    let ctx = AccessorContext::builder(store, Arc::clone(&loader) as Arc<dyn CollectionLoader>)
        .build();

    let _ = ctx.resolve("items");
    wait_until(|| ctx.load_state("items").ready).await;
    let before = ctx.resolve("items");

    ctx.reset();

    // Fresh identities, but no second fetch: the data is already there.
    let after = ctx.resolve("items");
    assert!(!View::ptr_eq(&before, &after));
    assert_eq!(after.index(0).materialize(), json!(1));
    assert_eq!(loader.calls(), 1);
}
