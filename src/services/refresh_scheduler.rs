//! Trailing-edge debounce for background refreshes.
//!
//! Every `trigger()` re-arms the timer; the action runs once, `window` after
//! the last trigger. Re-arming aborts the superseded timer. The action runs
//! as its own task, so a refresh that is already executing is never
//! interrupted by a new trigger or by `cancel()`.

use futures::future::BoxFuture;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

pub type DebouncedAction = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

pub const DEFAULT_REFRESH_WINDOW: Duration = Duration::from_millis(2000);

pub struct Debouncer {
    window: Duration,
    action: DebouncedAction,
    seq: Arc<AtomicU64>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    pub fn new(window: Duration, action: DebouncedAction) -> Self {
        Self {
            window,
            action,
            seq: Arc::new(AtomicU64::new(0)),
            pending: Mutex::new(None),
        }
    }

    /// Re-arm the timer. Must be called from within a tokio runtime.
    pub fn trigger(&self) {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        let current = self.seq.clone();
        let action = self.action.clone();
        let window = self.window;

        let handle = tokio::spawn(async move {
            tokio::time::sleep(window).await;
            // Lost the race with a re-arm that had not aborted us yet.
            if current.load(Ordering::SeqCst) != seq {
                return;
            }
            tokio::spawn(action());
        });

        let superseded = self
            .pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .replace(handle);
        if let Some(superseded) = superseded {
            superseded.abort();
        }
    }

    /// Drop any armed timer. Safe to call repeatedly or before any trigger.
    pub fn cancel(&self) {
        self.seq.fetch_add(1, Ordering::SeqCst);
        let handle = self
            .pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(handle) = handle {
            log::debug!("Cancelling pending debounced refresh");
            handle.abort();
        }
    }

    /// Whether a timer is armed and has not yet fired.
    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
