//! Subscription handles for store and channel watches.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;

/// Handle to an active watch.
///
/// [`unsubscribe`](Self::unsubscribe) is idempotent and also runs on drop.
/// The shared active flag is checked by the delivery task immediately
/// before every callback invocation, so no callback runs after
/// `unsubscribe` returns.
pub struct WatchGuard {
    active: Arc<AtomicBool>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl WatchGuard {
    /// Create a guard around the shared active flag.
    pub fn new(active: Arc<AtomicBool>) -> Self {
        Self {
            active,
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Create the shared flag a delivery task should check before invoking
    /// its callback.
    pub fn active_flag() -> Arc<AtomicBool> {
        Arc::new(AtomicBool::new(true))
    }

    /// Attach a background task to be aborted on unsubscribe.
    pub fn with_task(self, handle: JoinHandle<()>) -> Self {
        if let Ok(mut handles) = self.handles.lock() {
            handles.push(handle);
        }
        self
    }

    /// Whether callbacks may still fire.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Stop all further callbacks and abort the backing tasks. Safe to
    /// call any number of times.
    pub fn unsubscribe(&self) {
        self.active.store(false, Ordering::SeqCst);
        if let Ok(mut handles) = self.handles.lock() {
            for handle in handles.drain(..) {
                handle.abort();
            }
        }
    }
}

impl Drop for WatchGuard {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unsubscribe_clears_active_flag_and_is_idempotent() {
        let flag = WatchGuard::active_flag();
        let guard = WatchGuard::new(Arc::clone(&flag));

        assert!(guard.is_active());
        guard.unsubscribe();
        assert!(!guard.is_active());
        assert!(!flag.load(Ordering::SeqCst));

        // Second call is a no-op, not a panic.
        guard.unsubscribe();
        assert!(!guard.is_active());
    }

    #[tokio::test]
    async fn drop_aborts_attached_task() {
        let flag = WatchGuard::active_flag();
        let task = tokio::spawn(async {
            std::future::pending::<()>().await;
        });
        let guard = WatchGuard::new(flag).with_task(task);

        drop(guard);
        // The aborted task must terminate rather than hang.
    }
}
