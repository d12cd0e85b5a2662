use std::{env, fmt::Display, str::FromStr, time::Duration};

use log::*;
use shop_common::Secret;
use shop_engine::{notifications::MIN_POLL_INTERVAL, DEFAULT_LOW_STOCK_THRESHOLD};

const DEFAULT_SHOP_HOST: &str = "127.0.0.1";
const DEFAULT_SHOP_PORT: u16 = 8360;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/shop.db";
const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(60 * 60);
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// The environment variables the server reads. `SHOP_REDIS_URL` may embed a password, so `shop_server env` never
/// prints it.
pub const DISPLAY_ENVS: [&str; 7] = [
    "RUST_LOG",
    "SHOP_HOST",
    "SHOP_PORT",
    "SHOP_DATABASE_URL",
    "SHOP_SESSION_TTL_SECS",
    "SHOP_LOW_STOCK_THRESHOLD",
    "SHOP_NOTIFICATION_POLL_SECS",
];

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// When set (and the `redis` feature is enabled), the cache and event bus live in Redis. Otherwise they are
    /// in-process.
    pub redis_url: Option<Secret<String>>,
    /// How long an access token stays valid.
    pub session_ttl: Duration,
    /// Stock levels at or below this value raise a low stock alert.
    pub low_stock_threshold: i64,
    /// How often each session's notification reconciler polls the event bus. Never less than 2 seconds.
    pub notification_poll: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_SHOP_HOST.to_string(),
            port: DEFAULT_SHOP_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            redis_url: None,
            session_ttl: DEFAULT_SESSION_TTL,
            low_stock_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
            notification_poll: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("SHOP_HOST").ok().unwrap_or_else(|| DEFAULT_SHOP_HOST.into());
        let port = parse_or_default("SHOP_PORT", env::var("SHOP_PORT").ok(), DEFAULT_SHOP_PORT);
        let database_url = env::var("SHOP_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ SHOP_DATABASE_URL is not set. Using {DEFAULT_DATABASE_URL}");
            DEFAULT_DATABASE_URL.to_string()
        });
        let redis_url = env::var("SHOP_REDIS_URL").ok().filter(|s| !s.trim().is_empty()).map(Secret::new);
        let session_ttl = parse_or_default(
            "SHOP_SESSION_TTL_SECS",
            env::var("SHOP_SESSION_TTL_SECS").ok(),
            DEFAULT_SESSION_TTL.as_secs(),
        );
        let low_stock_threshold = parse_or_default(
            "SHOP_LOW_STOCK_THRESHOLD",
            env::var("SHOP_LOW_STOCK_THRESHOLD").ok(),
            DEFAULT_LOW_STOCK_THRESHOLD,
        );
        let poll_secs = parse_or_default(
            "SHOP_NOTIFICATION_POLL_SECS",
            env::var("SHOP_NOTIFICATION_POLL_SECS").ok(),
            DEFAULT_POLL_INTERVAL.as_secs(),
        );
        Self {
            host,
            port,
            database_url,
            redis_url,
            session_ttl: Duration::from_secs(session_ttl),
            low_stock_threshold,
            notification_poll: poll_interval(poll_secs),
        }
    }
}

//-------------------------------------------------  ServerOptions  ----------------------------------------------------
/// The part of the configuration the request handlers need. Connection strings stay out of it.
#[derive(Clone, Copy, Debug)]
pub struct ServerOptions {
    pub session_ttl: Duration,
    pub low_stock_threshold: i64,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self::from_config(&ServerConfig::default())
    }
}

impl ServerOptions {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self { session_ttl: config.session_ttl, low_stock_threshold: config.low_stock_threshold }
    }
}

/// Parses an optional configuration value. Missing values silently fall back to the default; invalid ones are logged
/// first.
pub fn parse_or_default<T>(name: &str, value: Option<String>, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match value {
        None => default,
        Some(s) => s.trim().parse::<T>().unwrap_or_else(|e| {
            error!("🪛️ {s} is not a valid value for {name}. {e} Using the default, {default}, instead.");
            default
        }),
    }
}

fn poll_interval(secs: u64) -> Duration {
    let interval = Duration::from_secs(secs);
    if interval < MIN_POLL_INTERVAL {
        warn!(
            "🪛️ A notification poll interval of {secs}s is too short. Using {}s instead.",
            MIN_POLL_INTERVAL.as_secs()
        );
        MIN_POLL_INTERVAL
    } else {
        interval
    }
}
