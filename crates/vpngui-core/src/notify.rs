// ── User-facing notifications ──
//
// Transient, dismissible messages fanned out over a broadcast channel.
// Nothing here is fatal; a lagging or absent subscriber just misses
// messages.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    pub fn new(level: NotificationLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

/// Sending half shared by every orchestrator component.
#[derive(Debug, Clone)]
pub(crate) struct Notifier {
    tx: broadcast::Sender<Arc<Notification>>,
}

impl Notifier {
    pub(crate) fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<Arc<Notification>> {
        self.tx.subscribe()
    }

    pub(crate) fn send(&self, level: NotificationLevel, message: impl Into<String>) {
        let notification = Notification::new(level, message);
        debug!(level = %notification.level, message = %notification.message, "notification");
        // No receivers is fine: nobody is looking.
        let _ = self.tx.send(Arc::new(notification));
    }

    /// Log and surface a failure, choosing the level from its kind.
    pub(crate) fn report(&self, err: &CoreError) {
        let level = if err.is_backend() {
            NotificationLevel::Error
        } else {
            NotificationLevel::Warning
        };
        warn!(error = %err, "operation reported failure");
        self.send(level, err.to_string());
    }
}
