//! Single-flight registry for logical actions.
//!
//! A store refuses to re-trigger the *same* logical action (keyed by a
//! string like `add:42`) while one is outstanding; different actions may
//! overlap. The guard releases its key on drop, including on early return
//! and panic unwinds in tests.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Clone, Default)]
pub(crate) struct InFlight {
    keys: Arc<Mutex<HashSet<String>>>,
}

impl InFlight {
    /// Try to claim a key; `None` means the same action is already running.
    pub fn try_begin(&self, key: impl Into<String>) -> Option<InFlightGuard> {
        let key = key.into();
        let mut keys = self.keys.lock().unwrap_or_else(PoisonError::into_inner);
        if keys.insert(key.clone()) {
            Some(InFlightGuard {
                keys: Arc::clone(&self.keys),
                key,
            })
        } else {
            None
        }
    }

    /// Whether any action is currently in flight.
    pub fn any_active(&self) -> bool {
        !self
            .keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }
}

#[derive(Debug)]
pub(crate) struct InFlightGuard {
    keys: Arc<Mutex<HashSet<String>>>,
    key: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_key_is_refused_while_held() {
        let inflight = InFlight::default();

        let guard = inflight.try_begin("add:42");
        assert!(guard.is_some());
        assert!(inflight.try_begin("add:42").is_none());

        // A different action may overlap.
        assert!(inflight.try_begin("remove:42").is_some());
    }

    #[test]
    fn test_key_released_on_drop() {
        let inflight = InFlight::default();

        drop(inflight.try_begin("reload"));
        assert!(inflight.try_begin("reload").is_some());
    }

    #[test]
    fn test_any_active_tracks_outstanding_guards() {
        let inflight = InFlight::default();
        assert!(!inflight.any_active());

        let guard = inflight.try_begin("clear");
        assert!(inflight.any_active());
        drop(guard);
        assert!(!inflight.any_active());
    }
}
