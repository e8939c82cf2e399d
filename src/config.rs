//! Configuration Module
//!
//! Handles loading and managing cache configuration from environment variables.

use std::env;
use std::path::PathBuf;

use crate::cache::NEVER_EXPIRE;
use crate::lock::LockStrategy;

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path of the store file
    pub store_path: PathBuf,
    /// Default TTL in seconds; negative means items never expire
    pub default_ttl: i64,
    /// Which lock guards the store file
    pub lock_strategy: LockStrategy,
    /// Background prune interval in seconds
    pub prune_interval: u64,
    /// HTTP request timeout in seconds
    pub http_timeout: u64,
    /// User-Agent sent with every request
    pub user_agent: String,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_PATH` - Store file path (default: flockcache.db)
    /// - `DEFAULT_TTL` - Default TTL in seconds, negative = never (default: -1)
    /// - `LOCK_STRATEGY` - `process` or `thread` (default: process)
    /// - `PRUNE_INTERVAL` - Prune frequency in seconds (default: 60)
    /// - `HTTP_TIMEOUT` - Request timeout in seconds (default: 30)
    /// - `USER_AGENT` - User-Agent header (default: flockcache/<version>)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            store_path: env::var("CACHE_PATH")
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.store_path),
            default_ttl: env::var("DEFAULT_TTL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.default_ttl),
            lock_strategy: env::var("LOCK_STRATEGY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.lock_strategy),
            prune_interval: env::var("PRUNE_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.prune_interval),
            http_timeout: env::var("HTTP_TIMEOUT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.http_timeout),
            user_agent: env::var("USER_AGENT")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.user_agent),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("flockcache.db"),
            default_ttl: NEVER_EXPIRE,
            lock_strategy: LockStrategy::Process,
            prune_interval: 60,
            http_timeout: 30,
            user_agent: concat!("flockcache/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}
