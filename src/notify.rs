//! User-visible notifications.
//!
//! Every classified failure and every destructive-operation outcome is
//! reported through a [`Notifier`]. The terminal front-end prints them;
//! embedders can forward them to any UI. `MemoryNotifier` records them
//! for inspection. Destructive operations also ask a [`Confirm`] first.

use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;

/// How prominently a notification should be shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    /// 401 outside the danger-zone check. Modal, cannot be dismissed.
    SessionExpired,
    /// 429 from any endpoint.
    RateLimited,
    /// No response, connection failure or timeout.
    NetworkError,
    /// A search finished with zero matches.
    NoSearchResults { query: String },
    Success { title: String, message: String },
    Warning { title: String, message: String },
    Error { title: String, message: String },
}

impl Notification {
    pub fn success(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Success {
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn warning(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Warning {
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error {
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::SessionExpired | Self::NetworkError | Self::Error { .. } => Severity::Error,
            Self::RateLimited | Self::Warning { .. } => Severity::Warning,
            Self::NoSearchResults { .. } => Severity::Info,
            Self::Success { .. } => Severity::Success,
        }
    }

    /// Blocking notifications hold the user until acknowledged.
    pub fn is_blocking(&self) -> bool {
        matches!(self, Self::SessionExpired | Self::NetworkError)
    }

    /// Outside click / escape may close the notification.
    pub fn is_dismissable(&self) -> bool {
        !matches!(self, Self::SessionExpired)
    }

    pub fn title(&self) -> &str {
        match self {
            Self::SessionExpired => "Session Expired",
            Self::RateLimited => "Rate Limit Exceeded",
            Self::NetworkError => "Network Error",
            Self::NoSearchResults { .. } => "No Results Found",
            Self::Success { title, .. } | Self::Warning { title, .. } | Self::Error { title, .. } => {
                title
            }
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::SessionExpired => {
                "Your session has expired. Please log in again to continue.".to_string()
            }
            Self::RateLimited => {
                "You are making requests too quickly. Please wait a moment and try again."
                    .to_string()
            }
            Self::NetworkError => {
                "Unable to reach the server. Please check your connection and try again."
                    .to_string()
            }
            Self::NoSearchResults { query } => format!("No records match \"{query}\"."),
            Self::Success { message, .. }
            | Self::Warning { message, .. }
            | Self::Error { message, .. } => message.clone(),
        }
    }
}

/// Sink for user-visible notifications.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Writes notifications to the tracing log only.
#[derive(Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        let title = notification.title().to_string();
        let message = notification.message();
        match notification.severity() {
            Severity::Error => tracing::error!(%title, %message, "notification"),
            Severity::Warning => tracing::warn!(%title, %message, "notification"),
            Severity::Info | Severity::Success => {
                tracing::info!(%title, %message, "notification")
            }
        }
    }
}

/// Keeps every notification in memory, in order.
#[derive(Debug, Default, Clone)]
pub struct MemoryNotifier {
    seen: Arc<Mutex<Vec<Notification>>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<Notification> {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Remove and return everything recorded so far.
    pub fn drain(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.seen.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn contains(&self, wanted: &Notification) -> bool {
        self.all().iter().any(|n| n == wanted)
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, notification: Notification) {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notification);
    }
}

// ── Confirmation ────────────────────────────────────────

/// Asked before every destructive operation. `false` aborts it.
pub trait Confirm: Send + Sync {
    fn confirm(&self, title: &str, message: &str) -> bool;
}

/// Answers every question the same way (`--yes`, scripted runs).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoConfirm(pub bool);

impl Confirm for AutoConfirm {
    fn confirm(&self, title: &str, _message: &str) -> bool {
        tracing::debug!(%title, answer = self.0, "Auto-confirmed");
        self.0
    }
}

/// Standard delete prompt for `item` (a name, or a quoted record code).
pub fn confirm_delete(confirm: &dyn Confirm, item: &str) -> bool {
    confirm.confirm(
        "Are you sure?",
        &format!("You are about to delete {item}. This action cannot be undone!"),
    )
}
