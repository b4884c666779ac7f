use std::sync::{Mutex, PoisonError};

/// Page navigation as seen by the auth coordinator.
pub trait Navigator: Send + Sync + std::fmt::Debug {
    /// Navigate to `location` (a path or an absolute URL).
    fn push(&self, location: &str);

    /// Re-render the current page with fresh server data.
    fn refresh(&self);
}

#[derive(Debug, Default)]
struct History {
    visited: Vec<String>,
    pending: Option<String>,
    refreshes: usize,
}

/// Navigator backing a browser context: the pending location is handed to
/// the next HTTP response as a redirect.
#[derive(Debug, Default)]
pub struct PageNavigator {
    history: Mutex<History>,
}

impl PageNavigator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the location requested since the last call.
    pub fn take_location(&self) -> Option<String> {
        self.lock().pending.take()
    }

    /// Every location pushed so far, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.lock().visited.clone()
    }

    #[must_use]
    pub fn refresh_count(&self) -> usize {
        self.lock().refreshes
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, History> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Navigator for PageNavigator {
    fn push(&self, location: &str) {
        let mut history = self.lock();
        history.visited.push(location.to_string());
        history.pending = Some(location.to_string());
    }

    fn refresh(&self) {
        self.lock().refreshes += 1;
    }
}
