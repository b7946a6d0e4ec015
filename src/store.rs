//! Reactive store holding the current [`AppState`] snapshot.
//!
//! [`Store::dispatch`] runs the reducer and publishes the resulting snapshot
//! on a `tokio::sync::broadcast` channel. Renderers, loggers and tests
//! subscribe independently; every snapshot is a new `Arc`, so subscribers
//! can detect change by pointer.

use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::broadcast;
use tracing::trace;

use crate::state::{reduce, AppState, Event};

/// Default buffer capacity for the broadcast channel
const DEFAULT_CAPACITY: usize = 256;

pub struct Store {
    state: RwLock<Arc<AppState>>,
    sender: broadcast::Sender<Arc<AppState>>,
}

impl Store {
    pub fn new(initial: AppState) -> Self {
        Self::with_capacity(initial, DEFAULT_CAPACITY)
    }

    /// When the buffer is full, slow subscribers observe
    /// `RecvError::Lagged` and skip to newer snapshots.
    pub fn with_capacity(initial: AppState, capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            state: RwLock::new(Arc::new(initial)),
            sender,
        }
    }

    /// Current snapshot
    pub fn snapshot(&self) -> Arc<AppState> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Apply one event and publish the new snapshot
    pub fn dispatch(&self, event: Event) -> Arc<AppState> {
        trace!(?event, "dispatch");

        let next = {
            let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
            let next = Arc::new(reduce(&guard, event));
            *guard = next.clone();
            next
        };

        // zero receivers is not an error
        let _ = self.sender.send(next.clone());
        next
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<AppState>> {
        self.sender.subscribe()
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new(AppState::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Page;

    #[test]
    fn test_dispatch_publishes_snapshot() {
        let store = Store::default();
        let mut rx = store.subscribe();

        let before = store.snapshot();
        let after = store.dispatch(Event::Navigate(Page::Settings));

        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(store.snapshot().page, Page::Settings);

        let published = rx.try_recv().unwrap();
        assert!(Arc::ptr_eq(&published, &after));
    }

    #[test]
    fn test_multiple_subscribers() {
        let store = Store::default();
        let mut render = store.subscribe();
        let mut audit = store.subscribe();

        store.dispatch(Event::ToggleSidebar);

        assert!(render.try_recv().unwrap().sidebar_collapsed);
        assert!(audit.try_recv().unwrap().sidebar_collapsed);
    }

    #[test]
    fn test_dispatch_without_subscribers() {
        let store = Store::default();
        store.dispatch(Event::DragOver);
        assert!(store.snapshot().drag_over);
    }
}
