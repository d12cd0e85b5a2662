//! Storefront Engine
//!
//! This library contains the core logic of the storefront: the catalog, carts, checkout, the admin panel operations,
//! accounts and sessions, and the notification machinery. It has no opinion about how it is exposed; `shop_server`
//! puts an HTTP surface on top of it.
//!
//! The library is divided into these main sections:
//! 1. Storage contracts ([`mod@traits`]) and the SQLite backend that implements them (`SqliteDatabase`). You should
//!    never need to access the database directly. Instead, use the public API. The exception is the data types used
//!    in the database. These are defined in the [`mod@db_types`] module and are public.
//! 2. The cache and event bus ([`mod@cache`]), which holds non-authoritative shared state and carries
//!    [`events`] between sessions.
//! 3. The storefront public API ([`mod@shop_api`]). This provides the public-facing functionality: catalog, cart,
//!    checkout, admin, auth and accounts.
//! 4. Session [`notifications`], which turn bus events into a short, self-expiring notification queue per session,
//!    and a persistent per-user inbox.
pub mod cache;
pub mod db_types;
pub mod events;
pub mod helpers;
pub mod notifications;
pub mod shop_api;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod traits;

#[cfg(all(feature = "sqlite", any(feature = "test_utils", test)))]
pub mod test_utils {
    pub mod prepare_env;
}

pub use cache::{CacheBackend, CacheError, MemoryCache, ShopCache};
#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteDatabase, SqliteDatabaseError};
pub use shop_api::{
    accounts_api::{AccountApi, OrderDetails},
    admin_api::AdminApi,
    auth_api::{Argon2Hasher, AuthApi, AuthToken, PasswordHasher},
    cart_api::{CartApi, CartView},
    catalog_api::{CatalogApi, SearchHit},
    checkout_api::{CheckoutApi, CheckoutReceipt, CheckoutRequest, QuantityOverride},
    errors::ShopError,
    DEFAULT_LOW_STOCK_THRESHOLD,
};
pub use traits::{AccountManagement, CartManagement, CatalogManagement, OrderManagement, StoreError};
