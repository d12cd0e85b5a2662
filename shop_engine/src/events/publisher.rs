use log::*;

use crate::{
    cache::{CacheBackend, CacheError},
    events::NotificationEvent,
};

/// Publishes [`NotificationEvent`]s on the cache layer's bus.
#[derive(Clone)]
pub struct EventPublisher<C> {
    cache: C,
}

impl<C: CacheBackend> EventPublisher<C> {
    pub fn new(cache: C) -> Self {
        Self { cache }
    }

    /// Publishes the event, returning the number of subscribers that received it.
    pub async fn try_publish(&self, event: &NotificationEvent) -> Result<usize, CacheError> {
        let payload = serde_json::to_string(event)?;
        let receivers = self.cache.publish(event.channel(), &payload).await?;
        trace!("📬️ Published {payload} to {} receivers", receivers);
        Ok(receivers)
    }

    /// Publishes the event. Failures are logged and otherwise ignored, since delivery is best-effort.
    pub async fn publish_event(&self, event: &NotificationEvent) {
        if let Err(e) = self.try_publish(event).await {
            error!("📬️ Failed to publish event on {}: {e}", event.channel());
        }
    }
}
