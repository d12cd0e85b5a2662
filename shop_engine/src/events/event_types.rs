use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{db_types::OrderStatus, events::{ADMIN_CHANNEL, ORDER_STATUS_CHANNEL}};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStatusChangedEvent {
    pub order_id: i64,
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LowStockEvent {
    pub product_id: i64,
    pub product_name: String,
    pub current_stock: i64,
    pub threshold: i64,
    pub timestamp: DateTime<Utc>,
}

/// An event as it appears on the bus: a JSON object with a `type` discriminator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationEvent {
    OrderStatusChanged(OrderStatusChangedEvent),
    LowStock(LowStockEvent),
}

impl NotificationEvent {
    pub fn order_status_changed(order_id: i64, status: OrderStatus, user_id: Option<i64>) -> Self {
        Self::OrderStatusChanged(OrderStatusChangedEvent { order_id, status, user_id, timestamp: Utc::now() })
    }

    pub fn low_stock<S: Into<String>>(product_id: i64, product_name: S, current_stock: i64, threshold: i64) -> Self {
        Self::LowStock(LowStockEvent {
            product_id,
            product_name: product_name.into(),
            current_stock,
            threshold,
            timestamp: Utc::now(),
        })
    }

    /// The bus channel this event is published on.
    pub fn channel(&self) -> &'static str {
        match self {
            NotificationEvent::OrderStatusChanged(_) => ORDER_STATUS_CHANNEL,
            NotificationEvent::LowStock(_) => ADMIN_CHANNEL,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn wire_format() {
        let ev = NotificationEvent::order_status_changed(7, OrderStatus::Shipped, Some(3));
        let json: serde_json::Value = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["type"], "order_status_changed");
        assert_eq!(json["order_id"], 7);
        assert_eq!(json["status"], "Shipped");
        assert_eq!(json["user_id"], 3);
        assert!(json["timestamp"].is_string());

        let ev = NotificationEvent::low_stock(2, "Чайник", 1, 5);
        let json: serde_json::Value = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["type"], "low_stock");
        assert_eq!(json["product_name"], "Чайник");
        assert_eq!(ev.channel(), ADMIN_CHANNEL);
    }

    #[test]
    fn user_id_is_optional() {
        let raw = r#"{"type":"order_status_changed","order_id":4,"status":"Pending","timestamp":"2024-10-01T10:00:00Z"}"#;
        let ev: NotificationEvent = serde_json::from_str(raw).unwrap();
        match ev {
            NotificationEvent::OrderStatusChanged(e) => {
                assert_eq!(e.order_id, 4);
                assert_eq!(e.user_id, None);
                assert_eq!(e.status, OrderStatus::Pending);
            },
            _ => panic!("Expected an order status event"),
        }
        assert!(serde_json::from_str::<NotificationEvent>(r#"{"type":"price_changed"}"#).is_err());
    }
}
