use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, warn};

use shared_models::error::AppError;

/// Tracks actions that are currently awaiting the backend, keyed by
/// `(action, target)`. A second trigger of the same action on the same target
/// is refused until the first one finishes.
#[derive(Debug, Clone, Default)]
pub struct InFlightActions {
    active: Arc<Mutex<HashSet<String>>>,
}

impl InFlightActions {
    fn lock(active: &Mutex<HashSet<String>>) -> MutexGuard<'_, HashSet<String>> {
        active.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns `None` when the same action is already running for `target`.
    pub fn try_begin(&self, action: &str, target: &str) -> Option<InFlightGuard> {
        let key = format!("{}:{}", action, target);
        let mut active = Self::lock(&self.active);

        if !active.insert(key.clone()) {
            warn!("Action {} already in flight", key);
            return None;
        }

        debug!("Action {} started", key);
        Some(InFlightGuard {
            key,
            active: Arc::clone(&self.active),
        })
    }

    /// Like `try_begin`, but reports a duplicate as a 409 for handlers.
    pub fn begin(&self, action: &str, target: &str) -> Result<InFlightGuard, AppError> {
        self.try_begin(action, target).ok_or_else(|| {
            AppError::Conflict(format!("A {} request for {} is already in progress", action, target))
        })
    }

    pub fn is_in_flight(&self, action: &str, target: &str) -> bool {
        Self::lock(&self.active).contains(&format!("{}:{}", action, target))
    }
}

/// Releases its key when dropped, whatever the outcome of the call.
#[derive(Debug)]
pub struct InFlightGuard {
    key: String,
    active: Arc<Mutex<HashSet<String>>>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        InFlightActions::lock(&self.active).remove(&self.key);
        debug!("Action {} finished", self.key);
    }
}
