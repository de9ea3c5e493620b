//! Per-collection load lifecycle records.

use std::time::{Duration, Instant};

/// A recorded load failure.
#[derive(Clone, Debug)]
pub struct LoadError {
    /// Human-readable failure description from the loader.
    pub message: String,
    /// When the failure was recorded.
    pub at: Instant,
}

/// Load lifecycle of one collection.
///
/// Created on the first access attempt and reused across reloads; records
/// are never deleted. The state machine:
///
/// ```text
/// absent -> loading -> ready
///                  \-> error (retry suppressed while in cooldown)
/// ```
///
/// A new attempt clears the previous error, so stale failures never mask a
/// successful reload.
#[derive(Clone, Debug, Default)]
pub struct LoadState {
    /// A load is currently in flight.
    pub loading: bool,
    /// Data has been resolved into the shared store at least once.
    pub ready: bool,
    /// The most recent failure, if the last attempt failed.
    pub error: Option<LoadError>,
}

impl LoadState {
    /// Start a new load attempt: clear any previous error, set loading.
    pub fn begin_attempt(&mut self) {
        self.error = None;
        self.loading = true;
    }

    /// Settle successfully.
    pub fn succeed(&mut self) {
        self.loading = false;
        self.ready = true;
        self.error = None;
    }

    /// Settle with a failure, stamped now.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.loading = false;
        self.error = Some(LoadError {
            message: message.into(),
            at: Instant::now(),
        });
    }

    /// True while the most recent failure is younger than `window`.
    ///
    /// Used to suppress immediate retries: every synchronous access to an
    /// unresolved collection would otherwise restart the fetch the instant
    /// it failed.
    pub fn in_cooldown(&self, window: Duration) -> bool {
        match &self.error {
            Some(err) => err.at.elapsed() < window,
            None => false,
        }
    }

    /// The failure message, if the last attempt failed.
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_ref().map(|err| err.message.as_str())
    }
}
