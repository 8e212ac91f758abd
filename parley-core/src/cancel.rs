//! Cooperative cancellation for in-flight generations
//!
//! A [`CancelToken`] is cloned into whoever may want to stop a generation
//! (a Ctrl-C handler, a UI stop button). The stream consumption loop polls it
//! between chunks. Cancellation is advisory: the chunk currently being read
//! is not interrupted.
//!
//! A stop only applies to the generation running when it was requested. With
//! nothing running, [`CancelToken::cancel`] is a no-op and reports `false`, so
//! a late stop can never leak into the next turn.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

const IDLE: u8 = 0;
const GENERATING: u8 = 1;
const CANCELLED: u8 = 2;

/// Shared generation state: idle, generating, or generating with a stop
/// requested.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    state: Arc<AtomicU8>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request that the current generation stop at the next chunk boundary.
    ///
    /// Returns `true` if a generation was running and is now marked
    /// cancelled, `false` if there was nothing to stop.
    pub fn cancel(&self) -> bool {
        match self.state.compare_exchange(
            GENERATING,
            CANCELLED,
            Ordering::SeqCst,
            Ordering::SeqCst,
        ) {
            Ok(_) => true,
            Err(current) => current == CANCELLED,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.load(Ordering::SeqCst) == CANCELLED
    }

    /// Whether a generation currently holds a [`GenerationGuard`].
    pub fn is_generating(&self) -> bool {
        self.state.load(Ordering::SeqCst) != IDLE
    }

    /// Mark a generation as started. The token returns to idle when the
    /// returned guard is dropped.
    pub fn begin(&self) -> GenerationGuard {
        self.state.store(GENERATING, Ordering::SeqCst);
        GenerationGuard {
            token: self.clone(),
        }
    }
}

/// Returns the token to idle when the generation ends, however it ends.
#[derive(Debug)]
pub struct GenerationGuard {
    token: CancelToken,
}

impl Drop for GenerationGuard {
    fn drop(&mut self) {
        self.token.state.store(IDLE, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_state() {
        let token = CancelToken::new();
        let other = token.clone();
        let _guard = token.begin();
        assert!(other.cancel());
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_guard_clears_flags_on_drop() {
        let token = CancelToken::new();
        {
            let _guard = token.begin();
            assert!(token.is_generating());
            assert!(token.cancel());
            assert!(token.is_cancelled());
            assert!(token.is_generating());
        }
        assert!(!token.is_generating());
        assert!(!token.is_cancelled());
    }

    #[test]
    fn test_guard_clears_flags_on_panic() {
        let token = CancelToken::new();
        let inner = token.clone();
        let result = std::panic::catch_unwind(move || {
            let _guard = inner.begin();
            inner.cancel();
            panic!("generation blew up");
        });
        assert!(result.is_err());
        assert!(!token.is_generating());
        assert!(!token.is_cancelled());
    }

    #[test]
    fn test_cancel_while_idle_is_ignored() {
        let token = CancelToken::new();
        assert!(!token.cancel());
        assert!(!token.is_cancelled());

        let _guard = token.begin();
        assert!(!token.is_cancelled());
    }

    #[test]
    fn test_cancel_after_generation_ends_is_ignored() {
        let token = CancelToken::new();
        drop(token.begin());
        assert!(!token.cancel());

        let _guard = token.begin();
        assert!(!token.is_cancelled());
    }

    #[test]
    fn test_repeated_cancel_reports_running_generation() {
        let token = CancelToken::new();
        let _guard = token.begin();
        assert!(token.cancel());
        assert!(token.cancel());
        assert!(token.is_cancelled());
    }
}
