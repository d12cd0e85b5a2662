use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
    time::Duration,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The queue never holds more than this many entries.
pub const MAX_QUEUED: usize = 5;
/// Entries this old or older are dropped when the queue is read.
pub const MAX_AGE: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionNotification {
    pub message: String,
    pub severity: Severity,
    pub created_at: DateTime<Utc>,
}

impl SessionNotification {
    pub fn new<S: Into<String>>(message: S, severity: Severity, created_at: DateTime<Utc>) -> Self {
        Self { message: message.into(), severity, created_at }
    }
}

/// A bounded, time-decaying queue of notifications, oldest first.
#[derive(Debug, Clone, Default)]
pub struct NotificationQueue {
    entries: VecDeque<SessionNotification>,
}

impl NotificationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the notification, dropping the oldest entries beyond [`MAX_QUEUED`].
    pub fn push(&mut self, notification: SessionNotification) {
        self.entries.push_back(notification);
        while self.entries.len() > MAX_QUEUED {
            self.entries.pop_front();
        }
    }

    /// Drops every entry that is at least [`MAX_AGE`] old at `now`.
    pub fn prune(&mut self, now: DateTime<Utc>) {
        let max_age = chrono::Duration::from_std(MAX_AGE).unwrap_or_else(|_| chrono::Duration::seconds(10));
        self.entries.retain(|n| now - n.created_at < max_age);
    }

    /// Prunes the queue and returns what is left, oldest first.
    pub fn current(&mut self, now: DateTime<Utc>) -> Vec<SessionNotification> {
        self.prune(now);
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A shared handle on a session's queue. The reconciler writes to it; the session reads from it.
#[derive(Debug, Clone, Default)]
pub struct NotificationFeed {
    queue: Arc<Mutex<NotificationQueue>>,
}

impl NotificationFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, notification: SessionNotification) {
        let mut queue = self.queue.lock().unwrap_or_else(|e| e.into_inner());
        queue.push(notification);
    }

    /// The live notifications at `now`, oldest first.
    pub fn current_at(&self, now: DateTime<Utc>) -> Vec<SessionNotification> {
        let mut queue = self.queue.lock().unwrap_or_else(|e| e.into_inner());
        queue.current(now)
    }

    pub fn current(&self) -> Vec<SessionNotification> {
        self.current_at(Utc::now())
    }
}
