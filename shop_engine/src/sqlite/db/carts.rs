use chrono::Utc;
use log::trace;
use sqlx::SqliteConnection;

use crate::{
    db_types::{CartItem, CartTotal},
    sqlite::db::products,
    traits::StoreError,
};

pub async fn cart_for_user(user_id: i64, conn: &mut SqliteConnection) -> Result<Vec<CartItem>, StoreError> {
    let items = sqlx::query_as(
        r#"
        SELECT
            carts.user_id,
            carts.product_id,
            carts.quantity,
            carts.added_date,
            products.name,
            products.price,
            products.description,
            products.stock_quantity,
            products.warranty_period
        FROM carts INNER JOIN products ON carts.product_id = products.product_id
        WHERE carts.user_id = $1
        ORDER BY carts.added_date, carts.product_id"#,
    )
    .bind(user_id)
    .fetch_all(conn)
    .await?;
    Ok(items)
}

pub async fn cart_total(user_id: i64, conn: &mut SqliteConnection) -> Result<CartTotal, StoreError> {
    let items = cart_for_user(user_id, conn).await?;
    CartTotal::from_items(&items).ok_or_else(|| total_overflow(user_id))
}

pub fn total_overflow(user_id: i64) -> StoreError {
    StoreError::InvalidInput(format!("The cart total of user {user_id} is too large"))
}

async fn ensure_product_exists(product_id: i64, conn: &mut SqliteConnection) -> Result<(), StoreError> {
    products::peek_stock(product_id, conn).await.map(|_| ())
}

/// Adds `quantity` units of the product to the cart, incrementing the quantity if the line already exists.
pub async fn add_to_cart(
    user_id: i64,
    product_id: i64,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<(), StoreError> {
    if quantity <= 0 {
        return Err(StoreError::InvalidInput(format!("Cannot add {quantity} units to the cart")));
    }
    ensure_product_exists(product_id, conn).await?;
    sqlx::query(
        r#"
        INSERT INTO carts (user_id, product_id, quantity, added_date)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (user_id, product_id) DO UPDATE SET quantity = carts.quantity + excluded.quantity"#,
    )
    .bind(user_id)
    .bind(product_id)
    .bind(quantity)
    .bind(Utc::now())
    .execute(conn)
    .await?;
    trace!("🗃️ Added {quantity} x product {product_id} to the cart of user {user_id}");
    Ok(())
}

/// Sets the quantity of a cart line. A quantity of zero removes the line.
pub async fn set_line_quantity(
    user_id: i64,
    product_id: i64,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<(), StoreError> {
    if quantity < 0 {
        return Err(StoreError::InvalidInput(format!("Cart quantity cannot be negative ({quantity})")));
    }
    if quantity == 0 {
        sqlx::query("DELETE FROM carts WHERE user_id = $1 AND product_id = $2")
            .bind(user_id)
            .bind(product_id)
            .execute(conn)
            .await?;
        trace!("🗃️ Removed product {product_id} from the cart of user {user_id}");
        return Ok(());
    }
    ensure_product_exists(product_id, conn).await?;
    sqlx::query(
        r#"
        INSERT INTO carts (user_id, product_id, quantity, added_date)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (user_id, product_id) DO UPDATE SET quantity = excluded.quantity"#,
    )
    .bind(user_id)
    .bind(product_id)
    .bind(quantity)
    .bind(Utc::now())
    .execute(conn)
    .await?;
    trace!("🗃️ Cart line for product {product_id} of user {user_id} set to {quantity}");
    Ok(())
}

pub async fn clear_cart(user_id: i64, conn: &mut SqliteConnection) -> Result<u64, StoreError> {
    let result = sqlx::query("DELETE FROM carts WHERE user_id = $1").bind(user_id).execute(conn).await?;
    Ok(result.rows_affected())
}
