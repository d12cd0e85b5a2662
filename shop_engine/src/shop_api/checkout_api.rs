//! Checkout: turning the shopper's cart into an order.
//!
//! Validation happens up front against the cart as currently stored. The store then places the order in a single
//! transaction (see [`OrderManagement::place_order`]). Once that has committed, the cache is brought in line and the
//! order events go out. None of the follow-up work can undo or fail a committed order.

use std::fmt::Debug;

use log::*;
use serde::{Deserialize, Serialize};
use shop_common::Money;

use crate::{
    cache::{CacheBackend, ShopCache},
    db_types::{CartTotal, NewOrder, Order, OrderItem, OrderStatus, PlacedOrder},
    events::{EventPublisher, NotificationEvent},
    notifications::NotificationInbox,
    shop_api::{best_effort, errors::ShopError, DEFAULT_LOW_STOCK_THRESHOLD},
    traits::{AccountManagement, CartManagement, OrderManagement},
};

/// A quantity the shopper changed while confirming the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantityOverride {
    pub product_id: i64,
    pub quantity: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    #[serde(default)]
    pub overrides: Vec<QuantityOverride>,
}

impl CheckoutRequest {
    pub fn with_quantity(mut self, product_id: i64, quantity: i64) -> Self {
        self.overrides.push(QuantityOverride { product_id, quantity });
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutReceipt {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub total: Money,
    pub new_balance: Money,
}

pub struct CheckoutApi<B, C> {
    db: B,
    cache: ShopCache<C>,
    publisher: EventPublisher<C>,
    inbox: NotificationInbox<C>,
    low_stock_threshold: i64,
}

impl<B: Debug, C> Debug for CheckoutApi<B, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CheckoutApi ({:?})", self.db)
    }
}

impl<B, C> CheckoutApi<B, C>
where
    B: CartManagement + OrderManagement + AccountManagement,
    C: CacheBackend,
{
    pub fn new(db: B, cache: C) -> Self {
        Self {
            db,
            cache: ShopCache::new(cache.clone()),
            publisher: EventPublisher::new(cache.clone()),
            inbox: NotificationInbox::new(cache),
            low_stock_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
        }
    }

    pub fn with_low_stock_threshold(mut self, threshold: i64) -> Self {
        self.low_stock_threshold = threshold;
        self
    }

    pub fn low_stock_threshold(&self) -> i64 {
        self.low_stock_threshold
    }

    /// Places an order for everything in the user's cart.
    ///
    /// Errors are terminal. If the order fails, nothing has changed: the balance, stock levels and cart are exactly
    /// as they were.
    pub async fn checkout(&self, user_id: i64, request: CheckoutRequest) -> Result<CheckoutReceipt, ShopError> {
        let mut lines = self.db.cart_for_user(user_id).await?;
        let mut changed_quantities = Vec::new();
        for QuantityOverride { product_id, quantity } in request.overrides {
            if quantity < 0 {
                return Err(ShopError::InvalidInput(format!("Quantity must not be negative, got {quantity}")));
            }
            let line = lines
                .iter_mut()
                .find(|l| l.product_id == product_id)
                .ok_or_else(|| ShopError::InvalidInput(format!("Product {product_id} is not in the cart")))?;
            if quantity > line.stock_quantity {
                let available = line.stock_quantity;
                debug!("💳 User {user_id} wants {quantity} of product {product_id}, but only {available} are left");
                return Err(ShopError::InsufficientStock { product_id, requested: quantity, available });
            }
            if line.quantity != quantity {
                line.quantity = quantity;
                changed_quantities.push((product_id, quantity));
            }
        }
        let total = CartTotal::from_items(&lines)
            .ok_or_else(|| ShopError::InvalidInput(format!("The cart total of user {user_id} is too large")))?;
        if total.total_quantity == 0 {
            debug!("💳 User {user_id} tried to check out an empty cart");
            return Err(ShopError::EmptyCart);
        }
        let available = self.db.balance(user_id).await?;
        if available < total.total_price {
            debug!("💳 User {user_id} cannot afford {}. Balance is {available}", total.total_price);
            return Err(ShopError::InsufficientFunds { required: total.total_price, available });
        }
        let order = NewOrder { user_id, changed_quantities, total_price: total.total_price };
        let placed = self.db.place_order(order).await.map_err(|e| {
            warn!("💳 Checkout for user {user_id} failed: {e}");
            ShopError::from(e)
        })?;
        info!("💳 User {user_id} placed order #{} for {}", placed.order.order_id, total.total_price);
        self.after_commit(&placed).await;
        let PlacedOrder { order, items, new_balance, .. } = placed;
        Ok(CheckoutReceipt { order, items, total: total.total_price, new_balance })
    }

    async fn after_commit(&self, placed: &PlacedOrder) {
        let user_id = placed.order.user_id;
        let order_id = placed.order.order_id;
        best_effort("invalidate a cart", self.cache.invalidate_cart(user_id)).await;
        for (product_id, _, _) in &placed.stock_levels {
            best_effort("invalidate a product", self.cache.invalidate_product(*product_id)).await;
        }
        best_effort("record an order status", self.cache.record_order_status(order_id, OrderStatus::Pending)).await;
        best_effort("record a user order", self.cache.record_user_order(user_id, order_id)).await;
        let event = NotificationEvent::order_status_changed(order_id, OrderStatus::Pending, Some(user_id));
        self.publisher.publish_event(&event).await;
        for (product_id, name, stock) in &placed.stock_levels {
            if *stock <= self.low_stock_threshold {
                info!("💳 Product {product_id} ({name}) is down to {stock} units");
                let event = NotificationEvent::low_stock(*product_id, name.clone(), *stock, self.low_stock_threshold);
                self.publisher.publish_event(&event).await;
            }
        }
        best_effort("notify a new order", self.inbox.notify_new_order(user_id, order_id)).await;
    }
}
