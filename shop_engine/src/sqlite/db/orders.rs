use chrono::Utc;
use log::debug;
use shop_common::Money;
use sqlx::SqliteConnection;

use crate::{
    db_types::{CartItem, Order, OrderItem, OrderStatus, OrderWithEmail},
    traits::StoreError,
};

/// Inserts a new order with `Pending` status. This is not atomic. You can embed this call inside a transaction if you
/// need to ensure atomicity, and pass `&mut *tx` as the connection argument.
pub async fn insert_order(user_id: i64, total_price: Money, conn: &mut SqliteConnection) -> Result<Order, StoreError> {
    let order: Order = sqlx::query_as(
        r#"
        INSERT INTO orders (user_id, order_date, status, total_price)
        VALUES ($1, $2, $3, $4)
        RETURNING order_id, user_id, order_date, status, total_price"#,
    )
    .bind(user_id)
    .bind(Utc::now())
    .bind(OrderStatus::Pending)
    .bind(total_price)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Order #{} for user {user_id} inserted", order.order_id);
    Ok(order)
}

/// Stores one order item per cart line, snapshotting the unit price.
pub async fn insert_order_items(
    order_id: i64,
    lines: &[CartItem],
    conn: &mut SqliteConnection,
) -> Result<Vec<OrderItem>, StoreError> {
    let mut items = Vec::with_capacity(lines.len());
    for line in lines {
        let item: OrderItem = sqlx::query_as(
            r#"
            INSERT INTO order_items (order_id, product_id, quantity, unit_price)
            VALUES ($1, $2, $3, $4)
            RETURNING order_id, product_id, quantity, unit_price"#,
        )
        .bind(order_id)
        .bind(line.product_id)
        .bind(line.quantity)
        .bind(line.price)
        .fetch_one(&mut *conn)
        .await?;
        items.push(item);
    }
    Ok(items)
}

pub async fn fetch_order(order_id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, StoreError> {
    let order =
        sqlx::query_as("SELECT order_id, user_id, order_date, status, total_price FROM orders WHERE order_id = $1")
            .bind(order_id)
            .fetch_optional(conn)
            .await?;
    Ok(order)
}

pub async fn fetch_order_items(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<OrderItem>, StoreError> {
    let items = sqlx::query_as(
        "SELECT order_id, product_id, quantity, unit_price FROM order_items WHERE order_id = $1 ORDER BY order_item_id",
    )
    .bind(order_id)
    .fetch_all(conn)
    .await?;
    Ok(items)
}

pub async fn orders_for_user(user_id: i64, conn: &mut SqliteConnection) -> Result<Vec<Order>, StoreError> {
    let orders = sqlx::query_as(
        r#"
        SELECT order_id, user_id, order_date, status, total_price
        FROM orders
        WHERE user_id = $1
        ORDER BY order_date DESC, order_id DESC"#,
    )
    .bind(user_id)
    .fetch_all(conn)
    .await?;
    Ok(orders)
}

pub async fn list_all_orders(conn: &mut SqliteConnection) -> Result<Vec<OrderWithEmail>, StoreError> {
    let orders = sqlx::query_as(
        r#"
        SELECT orders.order_id, orders.user_id, users.email, orders.order_date, orders.status, orders.total_price
        FROM orders INNER JOIN users ON orders.user_id = users.user_id
        ORDER BY orders.order_date DESC, orders.order_id DESC"#,
    )
    .fetch_all(conn)
    .await?;
    Ok(orders)
}

pub async fn update_order_status(
    order_id: i64,
    status: OrderStatus,
    conn: &mut SqliteConnection,
) -> Result<Order, StoreError> {
    let order: Option<Order> = sqlx::query_as(
        r#"
        UPDATE orders SET status = $1
        WHERE order_id = $2
        RETURNING order_id, user_id, order_date, status, total_price"#,
    )
    .bind(status)
    .bind(order_id)
    .fetch_optional(conn)
    .await?;
    let order = order.ok_or(StoreError::OrderNotFound(order_id))?;
    debug!("🗃️ Order #{order_id} status set to {status}");
    Ok(order)
}
