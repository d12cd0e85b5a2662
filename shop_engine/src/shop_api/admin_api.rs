//! Admin panel operations: orders, inventory and users.
//!
//! These methods do not check the caller's role. That is the job of whatever exposes them.

use std::fmt::Debug;

use log::*;

use crate::{
    cache::{CacheBackend, ShopCache},
    db_types::{NewProduct, Order, OrderStatus, OrderWithEmail, ProductStock, UserSummary},
    events::{EventPublisher, NotificationEvent},
    notifications::NotificationInbox,
    shop_api::{best_effort, errors::ShopError, DEFAULT_LOW_STOCK_THRESHOLD},
    traits::{AccountManagement, CatalogManagement, OrderManagement},
};

pub struct AdminApi<B, C> {
    db: B,
    cache: ShopCache<C>,
    publisher: EventPublisher<C>,
    inbox: NotificationInbox<C>,
    low_stock_threshold: i64,
}

impl<B: Debug, C> Debug for AdminApi<B, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AdminApi ({:?})", self.db)
    }
}

impl<B, C> AdminApi<B, C>
where
    B: OrderManagement + CatalogManagement + AccountManagement,
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

    /// Every order, newest first.
    pub async fn list_all_orders(&self) -> Result<Vec<OrderWithEmail>, ShopError> {
        Ok(self.db.list_all_orders().await?)
    }

    /// Sets the order status. `status` must be one of the canonical status names. Any status may follow any other.
    ///
    /// The owner is notified through the event bus and their inbox.
    pub async fn set_order_status(&self, order_id: i64, status: &str) -> Result<Order, ShopError> {
        let status = status.parse::<OrderStatus>().map_err(|_| ShopError::InvalidStatus(status.to_string()))?;
        let order = self.db.update_order_status(order_id, status).await?;
        info!("🛠️ Order #{order_id} is now {status}");
        best_effort("record an order status", self.cache.record_order_status(order_id, status)).await;
        let event = NotificationEvent::order_status_changed(order_id, status, Some(order.user_id));
        self.publisher.publish_event(&event).await;
        best_effort(
            "notify a status change",
            self.inbox.notify_order_status_change(order.user_id, order_id, status),
        )
        .await;
        Ok(order)
    }

    /// Sets the stock level of a product to `quantity`.
    pub async fn adjust_stock(&self, product_id: i64, quantity: i64) -> Result<(), ShopError> {
        self.db.set_stock(product_id, quantity).await?;
        info!("🛠️ Stock of product {product_id} set to {quantity}");
        best_effort("invalidate a product", self.cache.invalidate_product(product_id)).await;
        if quantity <= self.low_stock_threshold {
            let name = match self.db.fetch_product(product_id).await {
                Ok(Some(p)) => p.name,
                Ok(None) => return Ok(()),
                Err(e) => {
                    warn!("🛠️ Could not look up product {product_id} for a low stock alert: {e}");
                    format!("#{product_id}")
                },
            };
            let event = NotificationEvent::low_stock(product_id, name, quantity, self.low_stock_threshold);
            self.publisher.publish_event(&event).await;
        }
        Ok(())
    }

    pub async fn inventory(&self) -> Result<Vec<ProductStock>, ShopError> {
        Ok(self.db.list_products_with_stock().await?)
    }

    /// Adds a product to the catalog and returns its id.
    pub async fn create_product(&self, product: NewProduct) -> Result<i64, ShopError> {
        let name = product.name.clone();
        let product_id = self.db.create_product(product).await?;
        info!("🛠️ Product {product_id} ({name}) created");
        best_effort("index a product", self.cache.index_product(product_id)).await;
        Ok(product_id)
    }

    pub async fn create_manufacturer(&self, name: &str, country: &str) -> Result<i64, ShopError> {
        Ok(self.db.create_manufacturer(name, country).await?)
    }

    pub async fn list_users(&self) -> Result<Vec<UserSummary>, ShopError> {
        Ok(self.db.list_users().await?)
    }
}
