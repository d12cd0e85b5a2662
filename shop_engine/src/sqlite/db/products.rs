use chrono::Utc;
use log::{debug, trace};
use sqlx::SqliteConnection;

use crate::{
    db_types::{Manufacturer, NewProduct, Product, ProductBrief, ProductDetails, ProductStock, Review},
    traits::StoreError,
};

pub async fn list_products_brief(conn: &mut SqliteConnection) -> Result<Vec<ProductBrief>, StoreError> {
    let products = sqlx::query_as("SELECT product_id, name FROM products ORDER BY product_id").fetch_all(conn).await?;
    Ok(products)
}

pub async fn list_products_with_stock(conn: &mut SqliteConnection) -> Result<Vec<ProductStock>, StoreError> {
    let products = sqlx::query_as("SELECT product_id, name, stock_quantity FROM products ORDER BY product_id")
        .fetch_all(conn)
        .await?;
    Ok(products)
}

pub async fn fetch_product(product_id: i64, conn: &mut SqliteConnection) -> Result<Option<Product>, StoreError> {
    let product = sqlx::query_as(
        r#"
        SELECT product_id, name, price, description, warranty_period, manufacturer_id, stock_quantity
        FROM products
        WHERE product_id = $1"#,
    )
    .bind(product_id)
    .fetch_optional(conn)
    .await?;
    Ok(product)
}

pub async fn fetch_manufacturer(
    manufacturer_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Manufacturer>, StoreError> {
    let manufacturer =
        sqlx::query_as("SELECT manufacturer_id, name, country FROM manufacturers WHERE manufacturer_id = $1")
            .bind(manufacturer_id)
            .fetch_optional(conn)
            .await?;
    Ok(manufacturer)
}

pub async fn fetch_reviews(product_id: i64, conn: &mut SqliteConnection) -> Result<Vec<Review>, StoreError> {
    let reviews = sqlx::query_as(
        r#"
        SELECT review_id, product_id, user_id, rating, review_text, review_date
        FROM reviews
        WHERE product_id = $1
        ORDER BY review_date DESC, review_id DESC"#,
    )
    .bind(product_id)
    .fetch_all(conn)
    .await?;
    Ok(reviews)
}

/// Assembles the product, its manufacturer and its reviews. Call this inside a transaction if the three reads must be
/// consistent with each other.
pub async fn product_details(
    product_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<ProductDetails>, StoreError> {
    let Some(product) = fetch_product(product_id, conn).await? else {
        return Ok(None);
    };
    let manufacturer = match product.manufacturer_id {
        Some(id) => fetch_manufacturer(id, conn).await?,
        None => None,
    };
    let reviews = fetch_reviews(product_id, conn).await?;
    Ok(Some(ProductDetails { product, manufacturer, reviews }))
}

pub async fn peek_stock(product_id: i64, conn: &mut SqliteConnection) -> Result<i64, StoreError> {
    let stock: Option<i64> = sqlx::query_scalar("SELECT stock_quantity FROM products WHERE product_id = $1")
        .bind(product_id)
        .fetch_optional(conn)
        .await?;
    stock.ok_or(StoreError::ProductNotFound(product_id))
}

/// Removes `quantity` units from the product's stock with a single guarded update. If the guard rejects the update,
/// the current stock is read back so that the error can report it.
pub async fn decrement_stock(product_id: i64, quantity: i64, conn: &mut SqliteConnection) -> Result<i64, StoreError> {
    if quantity <= 0 {
        return Err(StoreError::InvalidInput(format!("Cannot remove {quantity} units from stock")));
    }
    let new_stock: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE products
        SET stock_quantity = stock_quantity - $1
        WHERE product_id = $2 AND stock_quantity >= $3
        RETURNING stock_quantity"#,
    )
    .bind(quantity)
    .bind(product_id)
    .bind(quantity)
    .fetch_optional(&mut *conn)
    .await?;
    match new_stock {
        Some(stock) => {
            trace!("🗃️ Stock for product {product_id} reduced by {quantity} to {stock}");
            Ok(stock)
        },
        None => {
            let available = peek_stock(product_id, conn).await?;
            debug!("🗃️ Cannot take {quantity} units of product {product_id}. Only {available} in stock");
            Err(StoreError::InsufficientStock { product_id, requested: quantity, available })
        },
    }
}

pub async fn set_stock(product_id: i64, quantity: i64, conn: &mut SqliteConnection) -> Result<(), StoreError> {
    if quantity < 0 {
        return Err(StoreError::InvalidInput(format!("Stock cannot be negative ({quantity})")));
    }
    let result = sqlx::query("UPDATE products SET stock_quantity = $1 WHERE product_id = $2")
        .bind(quantity)
        .bind(product_id)
        .execute(conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(StoreError::ProductNotFound(product_id));
    }
    debug!("🗃️ Stock for product {product_id} set to {quantity}");
    Ok(())
}

pub async fn insert_product(product: NewProduct, conn: &mut SqliteConnection) -> Result<i64, StoreError> {
    if !product.price.is_positive() {
        return Err(StoreError::InvalidInput(format!("Price must be positive, got {}", product.price)));
    }
    if product.stock_quantity < 0 {
        return Err(StoreError::InvalidInput(format!("Stock cannot be negative ({})", product.stock_quantity)));
    }
    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO products (name, price, description, warranty_period, manufacturer_id, stock_quantity)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING product_id"#,
    )
    .bind(&product.name)
    .bind(product.price)
    .bind(&product.description)
    .bind(product.warranty_period)
    .bind(product.manufacturer_id)
    .bind(product.stock_quantity)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Product '{}' created with id {id}", product.name);
    Ok(id)
}

pub async fn insert_manufacturer(name: &str, country: &str, conn: &mut SqliteConnection) -> Result<i64, StoreError> {
    let id: i64 = sqlx::query_scalar("INSERT INTO manufacturers (name, country) VALUES ($1, $2) RETURNING manufacturer_id")
        .bind(name)
        .bind(country)
        .fetch_one(conn)
        .await?;
    Ok(id)
}

pub async fn insert_review(
    product_id: i64,
    user_id: i64,
    rating: i64,
    text: &str,
    conn: &mut SqliteConnection,
) -> Result<i64, StoreError> {
    if !(1..=5).contains(&rating) {
        return Err(StoreError::InvalidInput(format!("Rating must be between 1 and 5, got {rating}")));
    }
    if fetch_product(product_id, conn).await?.is_none() {
        return Err(StoreError::ProductNotFound(product_id));
    }
    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO reviews (product_id, user_id, rating, review_text, review_date)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING review_id"#,
    )
    .bind(product_id)
    .bind(user_id)
    .bind(rating)
    .bind(text)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    Ok(id)
}
