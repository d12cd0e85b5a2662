//! Session notifications.
//!
//! * [`NotificationQueue`] is the small, short-lived queue a session renders from.
//! * [`NotificationReconciler`] polls the event bus on behalf of one session and turns matching events into queue
//!   entries. [`spawn_reconciler`] runs one as a background task.
//! * [`NotificationInbox`] is the persistent, per-user notification list kept in the cache.
mod inbox;
mod queue;
mod reconciler;

pub use inbox::{InboxNotification, NotificationInbox, INBOX_CAPACITY};
pub use queue::{NotificationFeed, NotificationQueue, SessionNotification, Severity, MAX_AGE, MAX_QUEUED};
pub use reconciler::{
    spawn_reconciler,
    NotificationReconciler,
    Principal,
    ReconcilerHandle,
    MAX_MESSAGES_PER_TICK,
    MIN_POLL_INTERVAL,
};

pub(crate) fn order_status_message(order_id: i64, status: crate::db_types::OrderStatus) -> String {
    format!("Статус заказа #{order_id} изменен на: {}", status.label())
}

pub(crate) fn low_stock_message(product_name: &str, current_stock: i64) -> String {
    format!("Низкий запас товара: {product_name} (осталось {current_stock} шт.)")
}
