//! Foreground state of the host application
//!
//! The host's lifecycle callbacks write this cell from the UI thread while a
//! dispatch may be reading it from the worker thread. Reads and writes go
//! through a `tokio::sync::watch` cell so no read is ever torn, and
//! interested parties (e.g. whoever drains the pending queue) can await
//! transitions.

use std::sync::Arc;
use tokio::sync::watch;

/// Shared handle to the process-wide foreground flag
///
/// Cloning yields another handle to the same cell. The dispatcher holds one
/// of these; the host application keeps another to report transitions.
#[derive(Debug, Clone)]
pub struct ForegroundState {
    cell: Arc<watch::Sender<bool>>,
}

impl ForegroundState {
    /// Create a new cell with the given initial state
    pub fn new(foreground: bool) -> Self {
        let (tx, _rx) = watch::channel(foreground);
        Self { cell: Arc::new(tx) }
    }

    /// Record a lifecycle transition. Subscribers are only woken on change.
    pub fn set_foreground(&self, foreground: bool) {
        let changed = self.cell.send_if_modified(|current| {
            if *current == foreground {
                false
            } else {
                *current = foreground;
                true
            }
        });
        if changed {
            tracing::debug!(foreground, "Foreground state changed");
        }
    }

    /// Read the current state
    pub fn is_foreground(&self) -> bool {
        *self.cell.borrow()
    }

    /// Subscribe to foreground transitions
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.cell.subscribe()
    }
}

impl Default for ForegroundState {
    /// Applications start out in the foreground
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_foreground() {
        assert!(ForegroundState::default().is_foreground());
    }

    #[test]
    fn test_clones_share_state() {
        let host = ForegroundState::new(true);
        let dispatcher_view = host.clone();

        host.set_foreground(false);
        assert!(!dispatcher_view.is_foreground());

        dispatcher_view.set_foreground(true);
        assert!(host.is_foreground());
    }

    #[tokio::test]
    async fn test_subscribers_see_transitions_only() {
        let state = ForegroundState::new(false);
        let mut rx = state.subscribe();

        state.set_foreground(false);
        assert!(!rx.has_changed().unwrap());

        state.set_foreground(true);
        rx.changed().await.unwrap();
        assert!(*rx.borrow_and_update());
    }

    #[test]
    fn test_concurrent_writes_never_tear() {
        let state = ForegroundState::new(true);
        let writer = state.clone();
        let handle = std::thread::spawn(move || {
            for i in 0..1000 {
                writer.set_foreground(i % 2 == 0);
            }
        });
        let mut reads = 0;
        for _ in 0..1000 {
            let _ = state.is_foreground();
            reads += 1;
        }
        handle.join().unwrap();

        assert_eq!(reads, 1000);
        // Last write was i = 999
        assert!(!state.is_foreground());
    }
}
