use chrono::{DateTime, Utc};
use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    cache::{keys, CacheBackend, CacheError},
    db_types::OrderStatus,
    notifications::{order_status_message, Severity},
};

/// Each user's inbox keeps at most this many notifications, newest first.
pub const INBOX_CAPACITY: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboxNotification {
    pub id: String,
    pub user_id: i64,
    pub message: String,
    pub severity: Severity,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub read: bool,
}

/// The persistent per-user notification list, stored in the cache under `notifications:{user_id}`.
#[derive(Debug, Clone)]
pub struct NotificationInbox<C> {
    cache: C,
}

fn new_notification_id(now: DateTime<Utc>) -> String {
    format!("notif_{}_{:08x}", now.timestamp_millis(), rand::random::<u32>())
}

impl<C: CacheBackend> NotificationInbox<C> {
    pub fn new(cache: C) -> Self {
        Self { cache }
    }

    /// Adds a notification to the head of the user's inbox and returns it.
    pub async fn notify<S: Into<String>>(
        &self,
        user_id: i64,
        message: S,
        severity: Severity,
    ) -> Result<InboxNotification, CacheError> {
        let created_at = Utc::now();
        let notification = InboxNotification {
            id: new_notification_id(created_at),
            user_id,
            message: message.into(),
            severity,
            created_at,
            read: false,
        };
        let raw = serde_json::to_string(&notification)?;
        self.cache.lpush_capped(&keys::notifications(user_id), &raw, INBOX_CAPACITY).await?;
        debug!("🔔 Notification {} added to the inbox of user {user_id}", notification.id);
        Ok(notification)
    }

    /// Up to `limit` notifications, newest first. Entries that fail to decode are skipped.
    pub async fn list(&self, user_id: i64, limit: usize) -> Result<Vec<InboxNotification>, CacheError> {
        let raw = self.cache.lrange(&keys::notifications(user_id), limit).await?;
        let notifications = raw
            .iter()
            .filter_map(|r| match serde_json::from_str::<InboxNotification>(r) {
                Ok(n) => Some(n),
                Err(e) => {
                    warn!("🔔 Skipping a corrupt inbox entry for user {user_id}: {e}");
                    None
                },
            })
            .collect();
        Ok(notifications)
    }

    /// Marks the notification as read. Returns false if the inbox does not hold it.
    pub async fn mark_read(&self, user_id: i64, notification_id: &str) -> Result<bool, CacheError> {
        let key = keys::notifications(user_id);
        let raw = self.cache.lrange(&key, INBOX_CAPACITY).await?;
        for (index, entry) in raw.iter().enumerate() {
            let Ok(mut notification) = serde_json::from_str::<InboxNotification>(entry) else {
                continue;
            };
            if notification.id != notification_id {
                continue;
            }
            if !notification.read {
                notification.read = true;
                let updated = serde_json::to_string(&notification)?;
                self.cache.lset(&key, index, &updated).await?;
            }
            return Ok(true);
        }
        Ok(false)
    }

    pub async fn unread_count(&self, user_id: i64) -> Result<usize, CacheError> {
        let all = self.list(user_id, INBOX_CAPACITY).await?;
        Ok(all.iter().filter(|n| !n.read).count())
    }

    pub async fn notify_new_order(&self, user_id: i64, order_id: i64) -> Result<InboxNotification, CacheError> {
        self.notify(user_id, format!("Создан новый заказ #{order_id}"), Severity::Success).await
    }

    pub async fn notify_order_status_change(
        &self,
        user_id: i64,
        order_id: i64,
        status: OrderStatus,
    ) -> Result<InboxNotification, CacheError> {
        self.notify(user_id, order_status_message(order_id, status), Severity::Info).await
    }
}
