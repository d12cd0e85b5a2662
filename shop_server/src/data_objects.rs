use std::fmt::Display;

use serde::{Deserialize, Serialize};
use shop_common::Money;
use shop_engine::notifications::{InboxNotification, SessionNotification};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AddToCartParams {
    pub product_id: i64,
    #[serde(default = "one")]
    pub quantity: i64,
}

fn one() -> i64 {
    1
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct QuantityParams {
    pub quantity: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TopUpParams {
    pub amount: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdateParams {
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManufacturerParams {
    pub name: String,
    pub country: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub balance: Money,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CreatedResponse {
    pub id: i64,
}

/// What `/api/notifications` returns: the persistent inbox plus whatever the session's live feed currently holds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsResponse {
    pub unread: usize,
    pub inbox: Vec<InboxNotification>,
    pub live: Vec<SessionNotification>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }
}
