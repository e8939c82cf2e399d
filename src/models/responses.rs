//! Response DTOs for the command-line interface
//!
//! Defines the JSON documents printed on stdout by each command.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cache::{CacheItem, StoreStats};
use crate::fetch::{FetchOutcome, Headers, HttpResponse};

/// Output of `get`: one stored response with its lifecycle timestamps.
#[derive(Debug, Clone, Serialize)]
pub struct ItemResponse {
    /// The requested key
    pub key: String,
    /// Cached HTTP status
    pub status: u16,
    /// Cached response headers
    pub headers: Headers,
    /// Size of the cached body
    pub body_bytes: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expire_at: Option<DateTime<Utc>>,
    /// Whether the item is stale
    pub expired: bool,
    /// Seconds of freshness left, None if the item never expires
    pub ttl_remaining: Option<i64>,
}

impl ItemResponse {
    /// Creates a new ItemResponse from a stored item
    pub fn new(key: impl Into<String>, item: &CacheItem<HttpResponse>) -> Self {
        Self {
            key: key.into(),
            status: item.data.status,
            headers: item.data.headers.clone(),
            body_bytes: item.data.body.len(),
            created_at: item.created_at,
            updated_at: item.updated_at,
            expire_at: item.expire_at,
            expired: item.is_expired(),
            ttl_remaining: item.ttl_remaining(),
        }
    }
}

/// Output of the commands that change a single key
#[derive(Debug, Clone, Serialize)]
pub struct KeyResponse {
    /// Success message
    pub message: String,
    /// The key that was changed
    pub key: String,
}

impl KeyResponse {
    /// Creates a new KeyResponse, e.g. `KeyResponse::new("k", "deleted")`
    pub fn new(key: impl Into<String>, action: &str) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' {} successfully", key, action),
            key,
        }
    }
}

/// Output of `prune` and `clear`
#[derive(Debug, Clone, Serialize)]
pub struct PruneResponse {
    /// Number of items removed
    pub removed: usize,
}

impl PruneResponse {
    pub fn new(removed: usize) -> Self {
        Self { removed }
    }
}

/// Output of `stats`
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Store file inspected
    pub path: String,
    /// Configured default TTL
    pub default_ttl: i64,
    #[serde(flatten)]
    pub items: StoreStats,
    /// Items still servable without revalidation
    pub fresh_items: usize,
}

impl StatsResponse {
    pub fn new(path: impl Into<String>, default_ttl: i64, items: StoreStats) -> Self {
        Self {
            path: path.into(),
            default_ttl,
            fresh_items: items.fresh_items(),
            items,
        }
    }
}

/// Summary of `fetch` written to stderr alongside the body on stdout
#[derive(Debug, Clone, Serialize)]
pub struct FetchResponse {
    pub url: String,
    pub status: u16,
    pub body_bytes: usize,
    /// How this fetch was answered
    pub outcome: FetchOutcome,
}

impl FetchResponse {
    pub fn new(url: impl Into<String>, response: &HttpResponse, outcome: FetchOutcome) -> Self {
        Self {
            url: url.into(),
            status: response.status,
            body_bytes: response.body.len(),
            outcome,
        }
    }
}
