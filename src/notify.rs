//! User-facing notifications.

use std::sync::Mutex;

use serde::Serialize;

use crate::engine::EventKind;

/// Something worth telling the user about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "notification", rename_all = "snake_case")]
pub enum Notification {
    /// A call or message was blocked.
    Blocked {
        /// Call or SMS.
        kind: EventKind,
        /// Caller display name.
        name: String,
    },
    /// An allowed message reached the inbox.
    Received {
        /// Contact name, or the sender's number.
        name: String,
    },
}

/// Sink for notifications.
pub trait Notifier: Send + Sync {
    /// Deliver `notification`.
    fn notify(&self, notification: Notification);
}

/// Keeps notifications in memory so a caller can report them.
#[derive(Debug, Default)]
pub struct CollectingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl CollectingNotifier {
    /// Empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take every notification collected so far.
    pub fn drain(&self) -> Vec<Notification> {
        match self.sent.lock() {
            Ok(mut sent) => std::mem::take(&mut *sent),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

impl Notifier for CollectingNotifier {
    fn notify(&self, notification: Notification) {
        match self.sent.lock() {
            Ok(mut sent) => sent.push(notification),
            Err(poisoned) => poisoned.into_inner().push(notification),
        }
    }
}
