//! Notifications - what the engine tells the user, not how it is shown.
//!
//! The session decides *that* and *what* to notify and hands a
//! [`Notification`] to a [`NotificationSink`]. Sinks are called outside the
//! session's state lock, so a sink may read the session back.

#[cfg(feature = "emitter")]
mod emitter;
mod messages;

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::model::CardKey;

#[cfg(feature = "emitter")]
pub use emitter::EmitterNotifier;
pub(crate) use messages::Label;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Success,
    Error,
    Info,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Success => "success",
            Level::Error => "error",
            Level::Info => "info",
        }
    }
}

/// A short-lived, dismissible message for the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub level: Level,
    pub message: String,
    /// The mutation key the message is about, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<CardKey>,
    /// Repeating the same action may succeed.
    #[serde(default)]
    pub retryable: bool,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self::new(Level::Success, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Level::Error, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Level::Info, message)
    }

    fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            key: None,
            retryable: false,
        }
    }

    pub fn for_key(mut self, key: CardKey) -> Self {
        self.key = Some(key);
        self
    }

    pub fn retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }
}

/// Receives notifications from the session.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);
}

impl<F> NotificationSink for F
where
    F: Fn(Notification) + Send + Sync,
{
    fn notify(&self, notification: Notification) {
        self(notification)
    }
}

/// Writes notifications to the `tracing` log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl NotificationSink for TracingNotifier {
    fn notify(&self, notification: Notification) {
        let key = notification.key.as_ref().map(ToString::to_string);
        match notification.level {
            Level::Error => tracing::warn!(
                key = key.as_deref(),
                retryable = notification.retryable,
                "{}",
                notification.message
            ),
            Level::Success | Level::Info => {
                tracing::info!(key = key.as_deref(), "{}", notification.message)
            }
        }
    }
}

/// Collects notifications into a shared buffer.
///
/// Clones share the buffer, so a test can keep one handle and give the other
/// to the session.
#[derive(Debug, Default, Clone)]
pub struct BufferedNotifier {
    buffer: Arc<Mutex<Vec<Notification>>>,
}

impl BufferedNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything received so far, oldest first.
    pub fn notifications(&self) -> Vec<Notification> {
        self.buffer
            .lock()
            .map(|buffer| buffer.clone())
            .unwrap_or_default()
    }

    /// Take everything received so far, leaving the buffer empty.
    pub fn drain(&self) -> Vec<Notification> {
        self.buffer
            .lock()
            .map(|mut buffer| std::mem::take(&mut *buffer))
            .unwrap_or_default()
    }

    pub fn count(&self, level: Level) -> usize {
        self.notifications()
            .iter()
            .filter(|n| n.level == level)
            .count()
    }
}

impl NotificationSink for BufferedNotifier {
    fn notify(&self, notification: Notification) {
        if let Ok(mut buffer) = self.buffer.lock() {
            buffer.push(notification);
        }
    }
}
