//! Single-flight collection loading.
//!
//! At most one fetch per collection name is in flight; later triggers
//! attach to the existing flight instead of starting another. Settled
//! flights linger for a short grace period so near-simultaneous repeat
//! triggers don't immediately restart a fetch that just finished.

use std::sync::Arc;
use std::time::Instant;

use crate::context::ContextInner;

/// An in-flight (or just-settled, within the grace period) load.
pub(crate) struct PendingLoad {
    pub started: Instant,
}

/// Start loading `name` unless a flight already exists.
///
/// Honors the error cooldown unless `force` is set (explicit reloads
/// bypass it). The spawned load always runs to completion and records its
/// outcome into `LoadState`, even if every interested consumer is gone by
/// then — in-flight loads are never cancelled; the warmed store serves
/// the next access.
pub(crate) fn ensure_loading(ctx: &Arc<ContextInner>, name: &str, force: bool) {
    {
        let pending = ctx.pending.lock().unwrap();
        if pending.contains_key(name) {
            // Attach to the existing flight.
            return;
        }
    }

    if !force && ctx.store.state(name).in_cooldown(ctx.error_cooldown) {
        return;
    }

    {
        let mut pending = ctx.pending.lock().unwrap();
        // Re-check: the state read above ran unlocked.
        if pending.contains_key(name) {
            return;
        }
        pending.insert(
            name.to_string(),
            PendingLoad {
                started: Instant::now(),
            },
        );
    }

    ctx.store.update_state(name, |state| state.begin_attempt());

    let handle = match tokio::runtime::Handle::try_current() {
        Ok(handle) => handle,
        Err(_) => {
            log::warn!("cannot load collection '{name}': no async runtime");
            ctx.store
                .update_state(name, |state| state.fail("no async runtime available"));
            ctx.pending.lock().unwrap().remove(name);
            return;
        }
    };

    log::debug!("loading collection '{name}'");
    let ctx = Arc::clone(ctx);
    let name = name.to_string();
    handle.spawn(async move {
        let outcome = ctx.loader.load(&name, &ctx.locale).await;
        let elapsed = ctx
            .pending
            .lock()
            .unwrap()
            .get(&name)
            .map(|load| load.started.elapsed())
            .unwrap_or_default();
        match outcome {
            Ok(()) => {
                log::debug!("collection '{name}' loaded in {elapsed:?}");
                ctx.store.update_state(&name, |state| state.succeed());
            }
            Err(message) => {
                log::debug!("collection '{name}' failed to load after {elapsed:?}: {message}");
                ctx.store.update_state(&name, |state| state.fail(message));
            }
        }
        // Absorb duplicate triggers arriving right after settlement.
        tokio::time::sleep(ctx.pending_grace).await;
        ctx.pending.lock().unwrap().remove(&name);
    });
}
