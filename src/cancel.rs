//! Cooperative cancellation shared by the scanner, shell and player.

use core::sync::atomic::{AtomicBool, Ordering};

/// Process-wide "stop what you are playing" request.
///
/// Set by new input events and by the shell; observed by the playback loop
/// once per frame boundary; cleared when a new playback session starts.
#[derive(Debug, Default)]
pub struct CancelToken {
    requested: AtomicBool,
}

impl CancelToken {
    pub const fn new() -> Self {
        Self {
            requested: AtomicBool::new(false),
        }
    }

    /// Request cancellation of the current session.
    #[inline]
    pub fn cancel(&self) {
        self.requested.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }

    /// Clear a stale request (start of a session).
    #[inline]
    pub fn reset(&self) {
        self.requested.store(false, Ordering::Release);
    }
}
