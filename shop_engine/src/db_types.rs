use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
pub use shop_common::Money;
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Conversion error: {0}")]
pub struct ConversionError(String);

//--------------------------------------        Role         ---------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
pub enum Role {
    #[default]
    Customer,
    Admin,
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Customer => write!(f, "Customer"),
            Role::Admin => write!(f, "Admin"),
        }
    }
}

impl FromStr for Role {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Customer" => Ok(Self::Customer),
            "Admin" => Ok(Self::Admin),
            s => Err(ConversionError(format!("Invalid role: {s}"))),
        }
    }
}

//--------------------------------------    OrderStatus      ---------------------------------------------------------
/// The lifecycle status of an order. The variant name is the canonical form used in storage and on the event bus.
/// Labels and glyphs are for display only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Newly placed by checkout.
    #[default]
    Pending,
    Processing,
    Confirmed,
    Shipped,
    Delivered,
    Cancelled,
    Completed,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 7] = [
        OrderStatus::Pending,
        OrderStatus::Processing,
        OrderStatus::Confirmed,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
        OrderStatus::Completed,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            OrderStatus::Pending | OrderStatus::Processing => "В обработке",
            OrderStatus::Confirmed => "Подтвержден",
            OrderStatus::Shipped => "Отправлен",
            OrderStatus::Delivered => "Доставлен",
            OrderStatus::Cancelled => "Отменен",
            OrderStatus::Completed => "Завершен",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            OrderStatus::Pending | OrderStatus::Processing => "🟡",
            OrderStatus::Confirmed => "🔵",
            OrderStatus::Shipped => "🟢",
            OrderStatus::Delivered | OrderStatus::Completed => "✅",
            OrderStatus::Cancelled => "❌",
        }
    }
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Processing => "Processing",
            OrderStatus::Confirmed => "Confirmed",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
            OrderStatus::Completed => "Completed",
        };
        write!(f, "{s}")
    }
}

impl FromStr for OrderStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|status| status.to_string() == s)
            .copied()
            .ok_or_else(|| ConversionError(format!("Invalid order status: {s}")))
    }
}

//--------------------------------------        User         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct User {
    pub user_id: i64,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub balance: Money,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

/// The admin listing of a user. Credentials are never part of it.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct UserSummary {
    pub user_id: i64,
    pub email: String,
    pub role: Role,
    pub balance: Money,
}

/// The session record behind an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionData {
    pub user_id: i64,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl SessionData {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

//--------------------------------------      Products       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct ProductBrief {
    pub product_id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct ProductStock {
    pub product_id: i64,
    pub name: String,
    pub stock_quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Product {
    pub product_id: i64,
    pub name: String,
    pub price: Money,
    pub description: String,
    pub warranty_period: i64,
    pub manufacturer_id: Option<i64>,
    pub stock_quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub price: Money,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub warranty_period: i64,
    #[serde(default)]
    pub manufacturer_id: Option<i64>,
    #[serde(default)]
    pub stock_quantity: i64,
}

impl NewProduct {
    pub fn new<S: Into<String>>(name: S, price: Money, stock_quantity: i64) -> Self {
        Self {
            name: name.into(),
            price,
            description: String::default(),
            warranty_period: 0,
            manufacturer_id: None,
            stock_quantity,
        }
    }

    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_warranty(mut self, months: i64) -> Self {
        self.warranty_period = months;
        self
    }

    pub fn with_manufacturer(mut self, manufacturer_id: i64) -> Self {
        self.manufacturer_id = Some(manufacturer_id);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Manufacturer {
    pub manufacturer_id: i64,
    pub name: String,
    pub country: String,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Review {
    pub review_id: i64,
    pub product_id: i64,
    pub user_id: i64,
    pub rating: i64,
    pub review_text: String,
    pub review_date: DateTime<Utc>,
}

/// A product together with its manufacturer and reviews.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDetails {
    #[serde(flatten)]
    pub product: Product,
    pub manufacturer: Option<Manufacturer>,
    pub reviews: Vec<Review>,
}

impl ProductDetails {
    pub fn average_rating(&self) -> Option<f64> {
        if self.reviews.is_empty() {
            return None;
        }
        let sum: i64 = self.reviews.iter().map(|r| r.rating).sum();
        #[allow(clippy::cast_precision_loss)]
        Some(sum as f64 / self.reviews.len() as f64)
    }
}

//--------------------------------------        Cart         ---------------------------------------------------------
/// A cart line enriched with the current product data.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct CartItem {
    pub user_id: i64,
    pub product_id: i64,
    pub quantity: i64,
    pub added_date: DateTime<Utc>,
    pub name: String,
    pub price: Money,
    pub description: String,
    pub stock_quantity: i64,
    pub warranty_period: i64,
}

impl CartItem {
    /// `None` if the line total does not fit in [`Money`].
    pub fn line_total(&self) -> Option<Money> {
        self.price.checked_mul(self.quantity)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartTotal {
    pub total_price: Money,
    pub total_quantity: i64,
}

impl CartTotal {
    /// Totals the lines with a positive quantity. `None` if either total overflows.
    pub fn from_items(items: &[CartItem]) -> Option<Self> {
        items.iter().filter(|i| i.quantity > 0).try_fold(Self::default(), |acc, item| {
            Some(Self {
                total_price: acc.total_price.checked_add(item.line_total()?)?,
                total_quantity: acc.total_quantity.checked_add(item.quantity)?,
            })
        })
    }
}

//--------------------------------------       Orders        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub order_id: i64,
    pub user_id: i64,
    pub order_date: DateTime<Utc>,
    pub status: OrderStatus,
    pub total_price: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct OrderItem {
    pub order_id: i64,
    pub product_id: i64,
    pub quantity: i64,
    pub unit_price: Money,
}

/// An order as listed in the admin panel.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct OrderWithEmail {
    pub order_id: i64,
    pub user_id: i64,
    pub email: String,
    pub order_date: DateTime<Utc>,
    pub status: OrderStatus,
    pub total_price: Money,
}

/// Everything the store needs to place an order atomically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub user_id: i64,
    /// Quantities the shopper changed at confirmation time, as `(product_id, quantity)`.
    pub changed_quantities: Vec<(i64, i64)>,
    /// The total the shopper confirmed. The order is rejected if the cart no longer adds up to it.
    pub total_price: Money,
}

/// The result of a committed order placement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedOrder {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub new_balance: Money,
    /// New stock level of every product touched by the order, as `(product_id, product_name, stock)`.
    pub stock_levels: Vec<(i64, String, i64)>,
}
