//! Workspace volume coordination
//!
//! Phases that hand artifacts to each other through the workspace volume must
//! not run at the same time. A [`Phase`] never locks; the pipeline that
//! sequences phases holds a [`WorkspaceGuard`] for the duration of each
//! run-and-cleanup.

use crate::errors::Result;
use crate::phase::Phase;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, warn};

// Entries are never evicted: one mutex per volume name seen by the process.
static VOLUME_LOCKS: Lazy<Mutex<HashMap<String, WorkspaceLock>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Single-writer token for one workspace volume
#[derive(Debug, Clone)]
pub struct WorkspaceLock {
    volume: String,
    inner: Arc<tokio::sync::Mutex<()>>,
}

/// Exclusive access to a workspace volume while held
#[derive(Debug)]
pub struct WorkspaceGuard {
    volume: String,
    _guard: OwnedMutexGuard<()>,
}

impl WorkspaceGuard {
    pub fn volume(&self) -> &str {
        &self.volume
    }
}

impl WorkspaceLock {
    /// A lock private to the caller, not shared through the process registry
    pub fn new(volume: impl Into<String>) -> Self {
        Self {
            volume: volume.into(),
            inner: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    /// The process-wide lock for `volume`; every caller gets the same token
    ///
    /// The registry keeps every volume it has seen. Callers that create a fresh
    /// volume per build and never reuse it can use [`WorkspaceLock::new`] and
    /// share the token themselves.
    pub fn for_volume(volume: &str) -> Self {
        let mut locks = VOLUME_LOCKS.lock().unwrap_or_else(|e| e.into_inner());
        locks
            .entry(volume.to_string())
            .or_insert_with(|| Self::new(volume))
            .clone()
    }

    pub fn volume(&self) -> &str {
        &self.volume
    }

    /// Wait for exclusive access
    pub async fn acquire(&self) -> WorkspaceGuard {
        debug!("Waiting for workspace volume {}", self.volume);
        let guard = Arc::clone(&self.inner).lock_owned().await;
        debug!("Acquired workspace volume {}", self.volume);
        WorkspaceGuard {
            volume: self.volume.clone(),
            _guard: guard,
        }
    }

    /// Exclusive access if nobody else holds it
    pub fn try_acquire(&self) -> Option<WorkspaceGuard> {
        Arc::clone(&self.inner)
            .try_lock_owned()
            .ok()
            .map(|guard| WorkspaceGuard {
                volume: self.volume.clone(),
                _guard: guard,
            })
    }
}

/// Run `phase` under `lock`, then always clean it up
///
/// The run result is returned unchanged. A cleanup failure is logged as a
/// warning and does not fail the step.
pub async fn run_phase(phase: &mut Phase, lock: &WorkspaceLock) -> Result<()> {
    let _guard = lock.acquire().await;
    let result = phase.run().await;
    if let Err(e) = phase.cleanup().await {
        warn!("Leaving container behind: {}", e);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_volume_shares_one_lock() {
        let a = WorkspaceLock::for_volume("shared-volume-test");
        let b = WorkspaceLock::for_volume("shared-volume-test");
        let other = WorkspaceLock::for_volume("other-volume-test");

        let guard = a.try_acquire().expect("free");
        assert_eq!(guard.volume(), "shared-volume-test");
        assert!(b.try_acquire().is_none());
        assert!(other.try_acquire().is_some());

        drop(guard);
        assert!(b.try_acquire().is_some());
    }

    #[test]
    fn test_new_lock_is_private() {
        let registered = WorkspaceLock::for_volume("private-volume-test");
        let private = WorkspaceLock::new("private-volume-test");

        let _held = registered.try_acquire().expect("free");
        assert!(private.try_acquire().is_some());
    }

    #[tokio::test]
    async fn test_acquire_waits_for_release() {
        let lock = WorkspaceLock::new("wait-volume");
        let guard = lock.acquire().await;

        let waiter = lock.clone();
        let handle = tokio::spawn(async move { waiter.acquire().await.volume().to_string() });

        tokio::task::yield_now().await;
        assert!(!handle.is_finished());

        drop(guard);
        assert_eq!(handle.await.unwrap(), "wait-volume");
    }
}
