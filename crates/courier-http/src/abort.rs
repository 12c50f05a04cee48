//! Client-wide abort control
//!
//! Every request snapshots the controller's current [`AbortSignal`] when it
//! starts. [`AbortController::abort`] cancels that signal, failing all
//! requests bound to it, and then re-arms the controller with a fresh signal
//! so later requests are unaffected. Each re-arm bumps the generation counter.

use std::sync::{Arc, Mutex, OnceLock};

use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

/// Cancellation signal shared by the requests of one abort generation
#[derive(Debug, Clone)]
pub struct AbortSignal {
    token: CancellationToken,
    reason: Arc<OnceLock<String>>,
    generation: u64,
}

impl AbortSignal {
    fn new(generation: u64) -> Self {
        Self {
            token: CancellationToken::new(),
            reason: Arc::new(OnceLock::new()),
            generation,
        }
    }

    pub fn is_aborted(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Reason passed to `abort`, if any
    pub fn reason(&self) -> Option<String> {
        self.reason.get().cloned()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Resolves once the signal is aborted
    pub async fn aborted(&self) {
        self.token.cancelled().await
    }

    fn trigger(&self, reason: Option<&str>) {
        if let Some(reason) = reason {
            let _ = self.reason.set(reason.to_string());
        }
        self.token.cancel();
    }
}

/// Owner of the current abort signal
#[derive(Debug)]
pub struct AbortController {
    current: Mutex<AbortSignal>,
}

impl Default for AbortController {
    fn default() -> Self {
        Self::new()
    }
}

impl AbortController {
    pub fn new() -> Self {
        Self {
            current: Mutex::new(AbortSignal::new(0)),
        }
    }

    /// Signal that new requests bind to
    pub fn signal(&self) -> AbortSignal {
        match self.current.lock() {
            Ok(signal) => signal.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Number of times the controller has been aborted
    pub fn generation(&self) -> u64 {
        self.signal().generation()
    }

    /// Abort every request bound to the current signal and re-arm.
    ///
    /// Returns `false` only when the controller state is unusable.
    pub fn abort(&self, reason: Option<&str>) -> bool {
        let mut current = match self.current.lock() {
            Ok(guard) => guard,
            Err(e) => {
                error!("abort controller unavailable: {e}");
                return false;
            }
        };

        current.trigger(reason);
        let next = AbortSignal::new(current.generation + 1);
        debug!(generation = next.generation, reason = ?reason, "abort signal fired");
        *current = next;
        true
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_abort_cancels_outstanding_signal() {
        let controller = AbortController::new();
        let signal = controller.signal();
        assert!(!signal.is_aborted());

        assert!(controller.abort(Some("cancelled")));
        assert!(signal.is_aborted());
        assert_eq!(signal.reason().as_deref(), Some("cancelled"));
    }

    #[test]
    fn test_abort_rearms_with_new_generation() {
        let controller = AbortController::new();
        assert_eq!(controller.generation(), 0);

        assert!(controller.abort(None));
        let fresh = controller.signal();
        assert!(!fresh.is_aborted());
        assert_eq!(fresh.generation(), 1);
        assert_eq!(fresh.reason(), None);
    }

    #[test]
    fn test_repeated_abort_is_safe() {
        let controller = AbortController::new();
        assert!(controller.abort(None));
        assert!(controller.abort(Some("again")));
        assert_eq!(controller.generation(), 2);
    }

    #[tokio::test]
    async fn test_aborted_future_resolves() {
        let controller = Arc::new(AbortController::new());
        let signal = controller.signal();

        let aborter = controller.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            aborter.abort(None);
        });

        tokio::time::timeout(Duration::from_secs(1), signal.aborted())
            .await
            .expect("signal should fire");
    }
}
