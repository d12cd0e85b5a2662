//! Balances, order history and admin bootstrap.

use std::fmt::Debug;

use log::*;
use serde::{Deserialize, Serialize};
use shop_common::Money;

use crate::{
    db_types::{NewUser, Order, OrderItem, Role, User},
    shop_api::{
        auth_api::{normalize_email, Argon2Hasher, PasswordHasher},
        errors::ShopError,
    },
    traits::{AccountManagement, OrderManagement},
};

/// An order along with its line items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDetails {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// The `AccountApi` provides a unified API for a user's money and order history.
pub struct AccountApi<B, H = Argon2Hasher> {
    db: B,
    hasher: H,
}

impl<B: Debug, H> Debug for AccountApi<B, H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AccountApi ({:?})", self.db)
    }
}

impl<B> AccountApi<B, Argon2Hasher>
where B: AccountManagement + OrderManagement
{
    pub fn new(db: B) -> Self {
        Self { db, hasher: Argon2Hasher }
    }
}

impl<B, H> AccountApi<B, H>
where
    B: AccountManagement + OrderManagement,
    H: PasswordHasher,
{
    pub fn with_hasher<H2: PasswordHasher>(self, hasher: H2) -> AccountApi<B, H2> {
        AccountApi { db: self.db, hasher }
    }

    pub async fn user(&self, user_id: i64) -> Result<User, ShopError> {
        self.db.fetch_user(user_id).await?.ok_or_else(|| ShopError::NotFound(format!("User {user_id}")))
    }

    pub async fn balance(&self, user_id: i64) -> Result<Money, ShopError> {
        Ok(self.db.balance(user_id).await?)
    }

    /// Credits the user's balance and returns the new balance. The amount must be positive.
    pub async fn top_up(&self, user_id: i64, amount: Money) -> Result<Money, ShopError> {
        if !amount.is_positive() {
            return Err(ShopError::InvalidInput(format!("The top-up amount must be positive, got {amount}")));
        }
        let balance = self.db.top_up(user_id, amount).await?;
        info!("💰️ User {user_id} topped up {amount}. Balance is now {balance}");
        Ok(balance)
    }

    /// The user's orders, newest first.
    pub async fn orders(&self, user_id: i64) -> Result<Vec<Order>, ShopError> {
        Ok(self.db.orders_for_user(user_id).await?)
    }

    /// One of the user's orders. Orders belonging to someone else are reported as not found.
    pub async fn order(&self, user_id: i64, order_id: i64) -> Result<OrderDetails, ShopError> {
        let order = self
            .db
            .fetch_order(order_id)
            .await?
            .filter(|o| o.user_id == user_id)
            .ok_or_else(|| ShopError::NotFound(format!("Order {order_id}")))?;
        let items = self.db.fetch_order_items(order_id).await?;
        Ok(OrderDetails { order, items })
    }

    /// Creates an admin account with a zero balance.
    pub async fn create_admin(&self, email: &str, password: &str) -> Result<User, ShopError> {
        let email = normalize_email(email)?;
        if password.is_empty() {
            return Err(ShopError::InvalidInput("The password must not be empty".to_string()));
        }
        let password_hash = self.hasher.hash(password)?;
        let user = self.db.create_user(NewUser { email, password_hash, role: Role::Admin }).await?;
        info!("💰️ Admin account {} created with id {}", user.email, user.user_id);
        Ok(user)
    }

    /// Promotes (or demotes) an existing user.
    pub async fn set_role(&self, user_id: i64, role: Role) -> Result<(), ShopError> {
        self.db.set_role(user_id, role).await?;
        info!("💰️ User {user_id} now has the {role} role");
        Ok(())
    }
}
