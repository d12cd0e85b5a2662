//! # Storefront public API
//!
//! The `shop_api` module exposes the programmatic API of the storefront. Each API is constructed from the store
//! backend(s) it needs and, where it reads or publishes shared state, a [`CacheBackend`].
//!
//! * [`catalog_api`] serves product listings, details and fuzzy search, reading through the product cache.
//! * [`cart_api`] manages the shopper's cart and keeps the cart cache coherent.
//! * [`checkout_api`] turns a cart into an order and fans out the resulting events.
//! * [`admin_api`] covers order status management and inventory.
//! * [`auth_api`] handles registration, login and the session records behind access tokens.
//! * [`accounts_api`] covers balances and admin bootstrap.
//!
//! # API usage
//!
//! ```rust,ignore
//! use shop_engine::{cache::MemoryCache, CatalogApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url("sqlite://data/shop.db", 5).await?;
//! let cache = MemoryCache::new();
//! let api = CatalogApi::new(db, cache);
//! let hits = api.search_products("чайник").await?;
//! ```
use std::future::Future;

use log::*;

use crate::cache::CacheError;

pub mod accounts_api;
pub mod admin_api;
pub mod auth_api;
pub mod cart_api;
pub mod catalog_api;
pub mod checkout_api;
pub mod errors;

/// Default stock level at or below which a `low_stock` event is published.
pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 5;

/// Awaits a cache operation whose failure must not fail the caller. Failures are logged.
pub(crate) async fn best_effort<T, F>(what: &str, fut: F) -> Option<T>
where F: Future<Output = Result<T, CacheError>> {
    match fut.await {
        Ok(v) => Some(v),
        Err(e) => {
            warn!("💾️ Could not {what}: {e}");
            None
        },
    }
}
