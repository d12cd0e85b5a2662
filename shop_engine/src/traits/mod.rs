//! # Storage contracts
//!
//! This module defines the behaviour a storage backend must expose to act as the store of record for the storefront.
//!
//! * [`CatalogManagement`] covers products, stock levels, manufacturers and reviews.
//! * [`CartManagement`] covers per-user pending cart lines.
//! * [`OrderManagement`] covers placing orders atomically and the admin order views.
//! * [`AccountManagement`] covers user identity, roles and balances.
//!
//! Every fallible method returns a [`StoreError`]. Backends map their driver errors into
//! [`StoreError::DatabaseError`] and report domain failures (missing rows, guarded updates that matched nothing) with
//! the dedicated variants so that the API layer can tell them apart.
mod account_management;
mod cart_management;
mod catalog_management;
mod order_management;
mod store_error;

pub use account_management::AccountManagement;
pub use cart_management::CartManagement;
pub use catalog_management::CatalogManagement;
pub use order_management::OrderManagement;
pub use store_error::StoreError;
