//! `SqliteDatabase` is a concrete implementation of a storefront storage backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`crate::traits`]
//! module.
//!
//! Every write runs in an explicit transaction. A `RETURNING` row fetched on a bare pool connection leaves SQLite's
//! implicit transaction open, and the write stays invisible to the rest of the pool until that connection is reused.
use std::fmt::Debug;

use log::*;
use shop_common::Money;
use sqlx::SqlitePool;

use super::{
    db::{carts, db_url, new_pool, orders, products, run_migrations, users},
    SqliteDatabaseError,
};
use crate::{
    db_types::{
        CartItem,
        CartTotal,
        NewOrder,
        NewProduct,
        NewUser,
        Order,
        OrderItem,
        OrderStatus,
        OrderWithEmail,
        PlacedOrder,
        Product,
        ProductBrief,
        ProductDetails,
        ProductStock,
        Role,
        User,
        UserSummary,
    },
    traits::{AccountManagement, CartManagement, CatalogManagement, OrderManagement, StoreError},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Connects to the database named by `SHOP_DATABASE_URL`.
    pub async fn new(max_connections: u32) -> Result<Self, SqliteDatabaseError> {
        let url = db_url();
        Self::new_with_url(&url, max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, SqliteDatabaseError> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Brings the schema up to date.
    pub async fn migrate(&self) -> Result<(), SqliteDatabaseError> {
        run_migrations(&self.pool).await
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

impl CatalogManagement for SqliteDatabase {
    async fn list_products_brief(&self) -> Result<Vec<ProductBrief>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        products::list_products_brief(&mut conn).await
    }

    async fn list_products_with_stock(&self) -> Result<Vec<ProductStock>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        products::list_products_with_stock(&mut conn).await
    }

    async fn fetch_product(&self, product_id: i64) -> Result<Option<Product>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        products::fetch_product(product_id, &mut conn).await
    }

    async fn product_details(&self, product_id: i64) -> Result<Option<ProductDetails>, StoreError> {
        let mut tx = self.pool.begin().await?;
        let details = products::product_details(product_id, &mut tx).await?;
        tx.commit().await?;
        Ok(details)
    }

    async fn decrement_stock(&self, product_id: i64, quantity: i64) -> Result<i64, StoreError> {
        let mut tx = self.pool.begin().await?;
        let stock = products::decrement_stock(product_id, quantity, &mut tx).await?;
        tx.commit().await?;
        Ok(stock)
    }

    async fn peek_stock(&self, product_id: i64) -> Result<i64, StoreError> {
        let mut conn = self.pool.acquire().await?;
        products::peek_stock(product_id, &mut conn).await
    }

    async fn create_product(&self, product: NewProduct) -> Result<i64, StoreError> {
        let mut tx = self.pool.begin().await?;
        let product_id = products::insert_product(product, &mut tx).await?;
        tx.commit().await?;
        Ok(product_id)
    }

    async fn set_stock(&self, product_id: i64, quantity: i64) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        products::set_stock(product_id, quantity, &mut tx).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn create_manufacturer(&self, name: &str, country: &str) -> Result<i64, StoreError> {
        let mut tx = self.pool.begin().await?;
        let manufacturer_id = products::insert_manufacturer(name, country, &mut tx).await?;
        tx.commit().await?;
        Ok(manufacturer_id)
    }

    async fn add_review(&self, product_id: i64, user_id: i64, rating: i64, text: &str) -> Result<i64, StoreError> {
        let mut tx = self.pool.begin().await?;
        let review_id = products::insert_review(product_id, user_id, rating, text, &mut tx).await?;
        tx.commit().await?;
        Ok(review_id)
    }
}

impl CartManagement for SqliteDatabase {
    async fn cart_for_user(&self, user_id: i64) -> Result<Vec<CartItem>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        carts::cart_for_user(user_id, &mut conn).await
    }

    async fn add_to_cart(&self, user_id: i64, product_id: i64, quantity: i64) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        carts::add_to_cart(user_id, product_id, quantity, &mut tx).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn set_line_quantity(&self, user_id: i64, product_id: i64, quantity: i64) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        carts::set_line_quantity(user_id, product_id, quantity, &mut tx).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn clear_cart(&self, user_id: i64) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        let removed = carts::clear_cart(user_id, &mut tx).await?;
        tx.commit().await?;
        trace!("🗃️ Removed {removed} lines from the cart of user {user_id}");
        Ok(())
    }

    async fn cart_total(&self, user_id: i64) -> Result<CartTotal, StoreError> {
        let mut conn = self.pool.acquire().await?;
        carts::cart_total(user_id, &mut conn).await
    }
}

impl OrderManagement for SqliteDatabase {
    /// The balance debit is the first statement in the transaction. It takes the SQLite write lock straight away, so
    /// that concurrent checkouts queue on the busy handler rather than failing on a lock upgrade later on.
    async fn place_order(&self, order: NewOrder) -> Result<PlacedOrder, StoreError> {
        let NewOrder { user_id, changed_quantities, total_price } = order;
        let mut tx = self.pool.begin().await?;
        let new_balance = users::debit_balance(user_id, total_price, &mut tx).await?;
        for (product_id, quantity) in changed_quantities {
            carts::set_line_quantity(user_id, product_id, quantity, &mut tx).await?;
        }
        let lines: Vec<CartItem> =
            carts::cart_for_user(user_id, &mut tx).await?.into_iter().filter(|l| l.quantity > 0).collect();
        let actual = CartTotal::from_items(&lines).ok_or_else(|| carts::total_overflow(user_id))?.total_price;
        if lines.is_empty() || actual != total_price {
            warn!("🗃️ Cart of user {user_id} changed during checkout. Expected {total_price}, found {actual}");
            return Err(StoreError::CartChanged { expected: total_price, actual });
        }
        let mut stock_levels = Vec::with_capacity(lines.len());
        for line in &lines {
            let stock = products::decrement_stock(line.product_id, line.quantity, &mut tx).await?;
            stock_levels.push((line.product_id, line.name.clone(), stock));
        }
        let new_order = orders::insert_order(user_id, total_price, &mut tx).await?;
        let items = orders::insert_order_items(new_order.order_id, &lines, &mut tx).await?;
        carts::clear_cart(user_id, &mut tx).await?;
        tx.commit().await?;
        info!(
            "🗃️ Order #{} placed for user {user_id}: {} lines, total {total_price}",
            new_order.order_id,
            items.len()
        );
        Ok(PlacedOrder { order: new_order, items, new_balance, stock_levels })
    }

    async fn fetch_order(&self, order_id: i64) -> Result<Option<Order>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order(order_id, &mut conn).await
    }

    async fn fetch_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order_items(order_id, &mut conn).await
    }

    async fn orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::orders_for_user(user_id, &mut conn).await
    }

    async fn list_all_orders(&self) -> Result<Vec<OrderWithEmail>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::list_all_orders(&mut conn).await
    }

    async fn update_order_status(&self, order_id: i64, status: OrderStatus) -> Result<Order, StoreError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::update_order_status(order_id, status, &mut tx).await?;
        tx.commit().await?;
        Ok(order)
    }
}

impl AccountManagement for SqliteDatabase {
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut tx = self.pool.begin().await?;
        let user = users::insert_user(user, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ User {} created with id {}", user.email, user.user_id);
        Ok(user)
    }

    async fn fetch_user(&self, user_id: i64) -> Result<Option<User>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        users::fetch_user(user_id, &mut conn).await
    }

    async fn fetch_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        users::fetch_user_by_email(email, &mut conn).await
    }

    async fn balance(&self, user_id: i64) -> Result<Money, StoreError> {
        let mut conn = self.pool.acquire().await?;
        users::balance(user_id, &mut conn).await
    }

    async fn top_up(&self, user_id: i64, amount: Money) -> Result<Money, StoreError> {
        if !amount.is_positive() {
            return Err(StoreError::InvalidInput(format!("Top-up amount must be positive, got {amount}")));
        }
        let mut tx = self.pool.begin().await?;
        let balance = users::credit_balance(user_id, amount, &mut tx).await?;
        tx.commit().await?;
        Ok(balance)
    }

    async fn set_role(&self, user_id: i64, role: Role) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        users::set_role(user_id, role, &mut tx).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<UserSummary>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        users::list_users(&mut conn).await
    }
}
