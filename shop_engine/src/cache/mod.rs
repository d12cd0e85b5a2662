//! # Cache and event bus
//!
//! The storefront keeps two kinds of shared, non-authoritative state: a key-value cache with per-key expiry, and a
//! publish/subscribe bus that carries [`NotificationEvent`](crate::events::NotificationEvent)s between sessions.
//!
//! [`CacheBackend`] is the contract a backend must satisfy. Two backends are provided:
//! * [`MemoryCache`], an in-process backend used by default and in tests,
//! * `RedisCache` (behind the `redis` feature), which talks to a Redis server.
//!
//! Application code does not use the backend directly. [`ShopCache`] wraps a backend with typed accessors and the key
//! naming conventions for every cached value.
//!
//! Everything in the cache is advisory. Readers fall back to the store of record on a miss, and entries that fail to
//! decode are deleted.
use std::{collections::HashMap, future::Future, time::Duration};

use thiserror::Error;

mod memory;
#[cfg(feature = "redis")]
mod redis_cache;
mod shop_cache;

pub mod keys;

#[cfg(feature = "redis")]
pub use redis_cache::{RedisCache, RedisSubscription};
pub use memory::{MemoryCache, MemorySubscription};
pub use shop_cache::ShopCache;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    #[error("The cache transport failed: {0}")]
    TransportFailure(String),
    #[error("Key {0} holds a value of a different type")]
    WrongType(String),
    #[error("Could not (de)serialize a cached value: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for CacheError {
    fn from(e: serde_json::Error) -> Self {
        CacheError::SerializationError(e.to_string())
    }
}

/// A message received from the event bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    pub channel: String,
    pub payload: String,
}

impl BusMessage {
    pub fn new<S1: Into<String>, S2: Into<String>>(channel: S1, payload: S2) -> Self {
        Self { channel: channel.into(), payload: payload.into() }
    }
}

/// A live subscription to one or more bus channels.
pub trait Subscription: Send + 'static {
    /// Returns the next buffered message without waiting, or `None` if nothing is buffered. Returns
    /// `TransportFailure` once the underlying connection is gone; the subscription is useless after that and must be
    /// replaced by subscribing again.
    fn poll_message(&mut self) -> Result<Option<BusMessage>, CacheError>;

    fn channels(&self) -> &[String];
}

/// Key-value storage with expiry, plus publish/subscribe.
///
/// Keys hold exactly one kind of value (string, hash, set or list). Reading a key as the wrong kind is a
/// `WrongType` error. Expired keys behave as if they were absent.
pub trait CacheBackend: Clone + Send + Sync + 'static {
    type Subscription: Subscription;

    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, CacheError>> + Send;

    /// Stores a string value. `None` means the value never expires.
    fn set(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> impl Future<Output = Result<(), CacheError>> + Send;

    /// Removes the key, returning whether it existed.
    fn delete(&self, key: &str) -> impl Future<Output = Result<bool, CacheError>> + Send;

    /// Replaces the hash stored at `key` with the given fields.
    fn hset_all(
        &self,
        key: &str,
        fields: &[(String, String)],
        ttl: Option<Duration>,
    ) -> impl Future<Output = Result<(), CacheError>> + Send;

    /// All fields of the hash at `key`. A missing key yields an empty map.
    fn hget_all(&self, key: &str) -> impl Future<Output = Result<HashMap<String, String>, CacheError>> + Send;

    fn sadd(&self, key: &str, member: &str) -> impl Future<Output = Result<(), CacheError>> + Send;

    fn srem(&self, key: &str, member: &str) -> impl Future<Output = Result<(), CacheError>> + Send;

    fn smembers(&self, key: &str) -> impl Future<Output = Result<Vec<String>, CacheError>> + Send;

    /// Pushes to the head of the list and trims it to at most `cap` entries.
    fn lpush_capped(
        &self,
        key: &str,
        value: &str,
        cap: usize,
    ) -> impl Future<Output = Result<(), CacheError>> + Send;

    /// Up to `count` entries from the head of the list.
    fn lrange(&self, key: &str, count: usize) -> impl Future<Output = Result<Vec<String>, CacheError>> + Send;

    /// Overwrites the list entry at `index`, which must exist.
    fn lset(&self, key: &str, index: usize, value: &str) -> impl Future<Output = Result<(), CacheError>> + Send;

    /// Fire-and-forget. Returns the number of subscribers the message was handed to.
    fn publish(&self, channel: &str, payload: &str) -> impl Future<Output = Result<usize, CacheError>> + Send;

    fn subscribe(
        &self,
        channels: &[String],
    ) -> impl Future<Output = Result<Self::Subscription, CacheError>> + Send;
}

/// Cached values, expressed as time-to-live durations.
pub mod ttl {
    use std::time::Duration;

    pub const PRODUCT: Duration = Duration::from_secs(60 * 60);
    pub const CART: Duration = Duration::from_secs(30 * 60);
    pub const CACHE: Duration = Duration::from_secs(5 * 60);
    pub const TEMP: Duration = Duration::from_secs(10 * 60);
    pub const TOKEN: Duration = Duration::from_secs(60 * 60);
    pub const SESSION: Duration = Duration::from_secs(60 * 60);
}
