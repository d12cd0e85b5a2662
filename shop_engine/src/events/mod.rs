//! Storefront events and the channels they travel on.
//!
//! Events are published through the cache layer's pub/sub bus with at-most-once, best-effort semantics. Nothing
//! persists them, and a subscriber that is not connected when an event is published never sees it.
mod event_types;
mod publisher;

pub use event_types::{LowStockEvent, NotificationEvent, OrderStatusChangedEvent};
pub use publisher::EventPublisher;

/// The channel carrying [`OrderStatusChangedEvent`]s.
pub const ORDER_STATUS_CHANNEL: &str = "order_status_changed";
/// The channel carrying admin-only events such as [`LowStockEvent`].
pub const ADMIN_CHANNEL: &str = "admin_notifications";
