//! Cancellable execution context
//!
//! A phase waits on its process under an [`ExecutionContext`]. Cancelling the
//! context unblocks that wait. Cleanup never consults the context, so a cancelled
//! run can still be torn down.

use std::sync::Arc;
use tokio::sync::watch;

/// Shared cancellation handle; clones observe the same state
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    sender: Arc<watch::Sender<bool>>,
    receiver: watch::Receiver<bool>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        let (sender, receiver) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
            receiver,
        }
    }

    /// Cancel every operation waiting on this context
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolve once the context is cancelled
    pub async fn cancelled(&self) {
        let mut receiver = self.receiver.clone();
        // The sender lives as long as any clone of the context, so `changed` only
        // errors once nobody can cancel anymore.
        while !*receiver.borrow_and_update() {
            if receiver.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}
