use std::sync::{Arc, Mutex, MutexGuard};

/// Append-only, thread-safe sink for human-readable failure descriptions.
///
/// Cloning yields another handle to the same list, so every download task can
/// hold one. Messages keep the order in which the internal lock was taken.
#[derive(Debug, Clone, Default)]
pub struct ErrorCollector {
    errors: Arc<Mutex<Vec<String>>>,
}

impl ErrorCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, message: impl Into<String>) {
        self.lock().push(message.into());
    }

    pub fn has_errors(&self) -> bool {
        !self.lock().is_empty()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Snapshot of every message so far; later `add` calls do not affect it.
    pub fn get_all(&self) -> Vec<String> {
        self.lock().clone()
    }

    // A panic while holding the lock cannot leave a Vec half-pushed, so a
    // poisoned lock still holds a valid list.
    fn lock(&self) -> MutexGuard<'_, Vec<String>> {
        self.errors.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
