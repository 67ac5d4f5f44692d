//! Publish-subscribe for session changes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::CacheError;
use crate::render::RenderTier;

/// What changed in an [`EditSession`](super::EditSession).
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    ImageLoaded { width: u32, height: u32 },
    PresetChanged { has_modifications: bool },
    TierUpdated(RenderTier),
    ViewChanged,
    /// The bitmap pool failed; the session accepts no further edits.
    Aborted(CacheError),
}

/// Handle returned by [`ObserverList::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

type Callback = Arc<dyn Fn(&SessionEvent) + Send + Sync>;

#[derive(Default)]
pub struct ObserverList {
    next_id: AtomicU64,
    observers: Mutex<Vec<(ObserverId, Callback)>>,
}

impl std::fmt::Debug for ObserverList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverList")
            .field("len", &self.len())
            .finish()
    }
}

impl ObserverList {
    pub fn subscribe<F>(&self, callback: F) -> ObserverId
    where
        F: Fn(&SessionEvent) + Send + Sync + 'static,
    {
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().push((id, Arc::new(callback)));
        id
    }

    /// Returns whether the observer was registered.
    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        let mut observers = self.lock();
        let before = observers.len();
        observers.retain(|(other, _)| *other != id);
        observers.len() != before
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Call every observer. The list is not locked while callbacks run, so a
    /// callback may subscribe or unsubscribe.
    pub fn notify(&self, event: &SessionEvent) {
        let callbacks: Vec<Callback> = self.lock().iter().map(|(_, cb)| Arc::clone(cb)).collect();
        for callback in callbacks {
            callback(event);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(ObserverId, Callback)>> {
        self.observers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
