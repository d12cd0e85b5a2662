use crate::{
    db_types::{NewProduct, Product, ProductBrief, ProductDetails, ProductStock},
    traits::StoreError,
};

/// Products, stock levels and the data that backs a product detail page.
///
/// Stock is never negative. [`decrement_stock`](CatalogManagement::decrement_stock) is a single guarded update, so
/// concurrent callers can never drive a product below zero.
#[allow(async_fn_in_trait)]
pub trait CatalogManagement: Clone {
    /// The id and name of every product.
    async fn list_products_brief(&self) -> Result<Vec<ProductBrief>, StoreError>;

    /// The id, name and stock level of every product, for the admin inventory view.
    async fn list_products_with_stock(&self) -> Result<Vec<ProductStock>, StoreError>;

    async fn fetch_product(&self, product_id: i64) -> Result<Option<Product>, StoreError>;

    /// The product joined with its manufacturer and all of its reviews, or `None` if the product does not exist.
    async fn product_details(&self, product_id: i64) -> Result<Option<ProductDetails>, StoreError>;

    /// Removes `quantity` units from stock, if and only if at least that many are available. Returns the new stock
    /// level.
    ///
    /// Fails with `InvalidInput` for non-positive quantities, `ProductNotFound` for unknown products and
    /// `InsufficientStock` when the guard rejects the update. Nothing is modified on failure.
    async fn decrement_stock(&self, product_id: i64, quantity: i64) -> Result<i64, StoreError>;

    /// The current stock level. This is advisory; it may be stale by the time the caller acts on it.
    async fn peek_stock(&self, product_id: i64) -> Result<i64, StoreError>;

    async fn create_product(&self, product: NewProduct) -> Result<i64, StoreError>;

    /// Sets the stock level to an absolute value.
    async fn set_stock(&self, product_id: i64, quantity: i64) -> Result<(), StoreError>;

    async fn create_manufacturer(&self, name: &str, country: &str) -> Result<i64, StoreError>;

    /// Stores a review. The rating must be between 1 and 5.
    async fn add_review(&self, product_id: i64, user_id: i64, rating: i64, text: &str) -> Result<i64, StoreError>;
}
