//! # Storefront server
//! This crate puts an HTTP surface on the storefront engine. It is responsible for:
//! * Resolving access tokens into sessions, and keeping admin routes to admins.
//! * Translating requests into calls on the engine APIs, and engine errors into HTTP status codes.
//! * Running one live notification feed per active session.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The public routes are `/health`, `/register`, `/auth` and the `/products` catalog. Everything under `/api`
//! needs an `Authorization: Bearer <token>` header, and `/api/admin` additionally needs an admin session. See
//! [routes](routes/index.html) for the full list.

pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod session_feeds;

#[cfg(test)]
mod endpoint_tests;
