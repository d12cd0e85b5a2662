//! The shopper's cart.
//!
//! Cart reads go through the `cart:{user_id}` cache entry. Every write goes to the store first and then drops the
//! cache entry, so the next read sees the new state.

use std::fmt::Debug;

use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    cache::{CacheBackend, ShopCache},
    db_types::{CartItem, CartTotal},
    shop_api::{best_effort, errors::ShopError},
    traits::{CartManagement, CatalogManagement},
};

/// A cart together with its totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartView {
    pub items: Vec<CartItem>,
    pub total: CartTotal,
}

pub struct CartApi<B, C> {
    db: B,
    cache: ShopCache<C>,
}

impl<B: Debug, C> Debug for CartApi<B, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CartApi ({:?})", self.db)
    }
}

impl<B, C> CartApi<B, C>
where
    B: CartManagement + CatalogManagement,
    C: CacheBackend,
{
    pub fn new(db: B, cache: C) -> Self {
        Self { db, cache: ShopCache::new(cache) }
    }

    pub async fn cart(&self, user_id: i64) -> Result<Vec<CartItem>, ShopError> {
        if let Some(Some(items)) = best_effort("read the cart cache", self.cache.cached_cart(user_id)).await {
            trace!("🛒 Cart of user {user_id} served from the cache");
            return Ok(items);
        }
        let items = self.db.cart_for_user(user_id).await?;
        if !items.is_empty() {
            best_effort("cache a cart", self.cache.cache_cart(user_id, &items)).await;
        }
        Ok(items)
    }

    pub async fn cart_view(&self, user_id: i64) -> Result<CartView, ShopError> {
        let items = self.cart(user_id).await?;
        let total = CartTotal::from_items(&items)
            .ok_or_else(|| ShopError::InvalidInput(format!("The cart total of user {user_id} is too large")))?;
        Ok(CartView { items, total })
    }

    /// Adds `quantity` units of the product, after checking them against the current stock level. The stock check
    /// is advisory; checkout enforces stock levels for real.
    pub async fn add_to_cart(&self, user_id: i64, product_id: i64, quantity: i64) -> Result<(), ShopError> {
        if quantity <= 0 {
            return Err(ShopError::InvalidInput(format!("Quantity must be positive, got {quantity}")));
        }
        let available = self.db.peek_stock(product_id).await?;
        if quantity > available {
            debug!("🛒 User {user_id} asked for {quantity} of product {product_id}, but only {available} are in stock");
            return Err(ShopError::InsufficientStock { product_id, requested: quantity, available });
        }
        self.db.add_to_cart(user_id, product_id, quantity).await?;
        self.invalidate(user_id).await;
        debug!("🛒 User {user_id} added {quantity} of product {product_id} to their cart");
        Ok(())
    }

    /// Sets the line quantity. Zero removes the line. Like [`Self::add_to_cart`], the new quantity may not exceed the
    /// current stock level.
    pub async fn set_quantity(&self, user_id: i64, product_id: i64, quantity: i64) -> Result<(), ShopError> {
        if quantity < 0 {
            return Err(ShopError::InvalidInput(format!("Quantity must not be negative, got {quantity}")));
        }
        if quantity > 0 {
            let available = self.db.peek_stock(product_id).await?;
            if quantity > available {
                debug!("🛒 User {user_id} asked for {quantity} of product {product_id}, but only {available} are left");
                return Err(ShopError::InsufficientStock { product_id, requested: quantity, available });
            }
        }
        self.db.set_line_quantity(user_id, product_id, quantity).await?;
        self.invalidate(user_id).await;
        debug!("🛒 User {user_id} set product {product_id} to {quantity} in their cart");
        Ok(())
    }

    pub async fn clear(&self, user_id: i64) -> Result<(), ShopError> {
        self.db.clear_cart(user_id).await?;
        self.invalidate(user_id).await;
        debug!("🛒 Cart of user {user_id} cleared");
        Ok(())
    }

    async fn invalidate(&self, user_id: i64) {
        best_effort("invalidate a cart", self.cache.invalidate_cart(user_id)).await;
    }
}
