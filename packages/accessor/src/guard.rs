//! Bounded-depth protection against synchronous re-entry.
//!
//! Reading the shared store can cause the host framework to re-invoke the
//! resolution path before the first call returns: dependency tracking may
//! re-run a dependent computation as a side effect of being read. That
//! re-entry can arrive through *any* collection, so a single shared depth
//! counter wraps the whole resolution path rather than one counter per
//! collection. Past the ceiling the resolver does no work and hands back a
//! chain-safe fallback, turning unbounded recursion into bounded
//! degradation.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Re-entry ceiling. Resolution deeper than this returns the fallback.
pub const MAX_RESOLVE_DEPTH: usize = 12;

/// Shared resolution depth for one accessor context.
#[derive(Default)]
pub(crate) struct DepthCounter {
    depth: AtomicUsize,
}

impl DepthCounter {
    /// Enter the resolution path. The returned guard restores the depth
    /// when dropped, on every exit path.
    pub fn enter(&self) -> DepthGuard<'_> {
        let depth = self.depth.fetch_add(1, Ordering::SeqCst) + 1;
        DepthGuard {
            counter: self,
            depth,
        }
    }

    /// Current depth; 0 outside the resolution path.
    pub fn current(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }
}

/// RAII handle for one level of the resolution path.
pub(crate) struct DepthGuard<'a> {
    counter: &'a DepthCounter,
    depth: usize,
}

impl DepthGuard<'_> {
    /// True when this entry crossed the ceiling and must short-circuit.
    pub fn exceeded(&self) -> bool {
        self.depth > MAX_RESOLVE_DEPTH
    }
}

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.counter.depth.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_tracks_nesting() {
        let counter = DepthCounter::default();
        assert_eq!(counter.current(), 0);

        let outer = counter.enter();
        assert_eq!(counter.current(), 1);
        assert!(!outer.exceeded());

        {
            let inner = counter.enter();
            assert_eq!(counter.current(), 2);
            assert!(!inner.exceeded());
        }
        assert_eq!(counter.current(), 1);

        drop(outer);
        assert_eq!(counter.current(), 0);
    }

    #[test]
    fn ceiling_trips_past_max_depth() {
        let counter = DepthCounter::default();
        let mut guards = Vec::new();
        for _ in 0..MAX_RESOLVE_DEPTH {
            let guard = counter.enter();
            assert!(!guard.exceeded());
            guards.push(guard);
        }

        let over = counter.enter();
        assert!(over.exceeded());
        drop(over);

        guards.clear();
        assert_eq!(counter.current(), 0);
    }

    #[test]
    fn depth_restored_on_panic() {
        let counter = DepthCounter::default();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = counter.enter();
            panic!("mid-resolution failure");
        }));
        assert!(result.is_err());
        assert_eq!(counter.current(), 0);
    }
}
