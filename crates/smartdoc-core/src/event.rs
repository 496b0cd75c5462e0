//! Notification bus for smartdoc using tokio::broadcast
//!
//! The core emits `(message, severity)` events; presentation is up to subscribers.

use crate::error::CoreError;
use tokio::sync::broadcast;

/// How prominently a notification should be shown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Success => "success",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

/// User-facing event emitted by the orchestrator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    pub severity: Severity,
    /// Actionable suggestion for user (optional)
    pub suggestion: Option<String>,
}

impl Notification {
    pub fn new(message: impl Into<String>, severity: Severity) -> Self {
        Self {
            message: message.into(),
            severity,
            suggestion: None,
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(message, Severity::Success)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(message, Severity::Warning)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(message, Severity::Error)
    }

    /// Add an actionable suggestion to this notification
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Build the notification shown for a core error
    ///
    /// Rejected uploads and guard violations are warnings; everything else is an error.
    pub fn from_core_error(error: &CoreError) -> Self {
        let severity = match error {
            CoreError::Intake(_)
            | CoreError::AnalysisInProgress
            | CoreError::DocumentCount { .. }
            | CoreError::NoResult => Severity::Warning,
            _ => Severity::Error,
        };

        Self {
            message: error.to_string(),
            severity,
            suggestion: error.suggestion(),
        }
    }
}

/// Event bus for broadcasting notifications
///
/// Uses tokio::broadcast for multi-consumer support.
pub struct NotificationBus {
    sender: broadcast::Sender<Notification>,
}

impl NotificationBus {
    /// Create a new bus with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Create with default capacity (64 notifications)
    pub fn default_capacity() -> Self {
        Self::new(64)
    }

    /// Publish a notification to all subscribers
    pub fn publish(&self, notification: Notification) {
        // Ignore send errors (no subscribers)
        let _ = self.sender.send(notification);
    }

    /// Subscribe to receive notifications
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }

    /// Get current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::default_capacity()
    }
}

impl Clone for NotificationBus {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}
