//! Transient user-facing notifications ("toasts").

use serde::Serialize;
use std::sync::{Mutex, PoisonError};
use tracing::{info, warn};
use utoipa::ToSchema;

#[derive(ToSchema, Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Error,
}

#[derive(ToSchema, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// Notices queued for the next page render or API response.
#[derive(Debug, Default)]
pub struct Notices {
    queue: Mutex<Vec<Notice>>,
}

impl Notices {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn success(&self, message: impl Into<String>) {
        let message = message.into();
        info!(notice = %message);
        self.push(NoticeLevel::Success, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        let message = message.into();
        warn!(notice = %message);
        self.push(NoticeLevel::Error, message);
    }

    fn push(&self, level: NoticeLevel, message: String) {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Notice { level, message });
    }

    /// Take every queued notice, oldest first.
    pub fn drain(&self) -> Vec<Notice> {
        std::mem::take(&mut *self.queue.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_empties_queue() {
        let notices = Notices::new();
        notices.success("Welcome back!");
        notices.error("Invalid login credentials");

        let drained = notices.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].level, NoticeLevel::Success);
        assert_eq!(drained[1].message, "Invalid login credentials");
        assert!(notices.drain().is_empty());
    }
}
