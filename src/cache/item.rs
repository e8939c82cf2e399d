//! Cache Item Module
//!
//! Defines the stored record and the read-time freshness projection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// == Cache Item ==
/// A stored payload with its lifecycle timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheItem<T> {
    /// The cached payload
    pub data: T,
    /// When the key was first written; never changes afterwards
    pub created_at: DateTime<Utc>,
    /// When the key was last written
    pub updated_at: DateTime<Utc>,
    /// When the item goes stale, None = never expires
    pub expire_at: Option<DateTime<Utc>>,
}

impl<T> CacheItem<T> {
    // == Constructor ==
    /// Creates a fresh item first written at `now`.
    pub fn new(data: T, expire_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Self {
        Self {
            data,
            created_at: now,
            updated_at: now,
            expire_at,
        }
    }

    // == Is Expired ==
    /// Checks whether the item is stale at `now`.
    ///
    /// An item is stale once `expire_at` lies strictly before `now`; an item
    /// without `expire_at` is never stale.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expire_at {
            Some(expire_at) => expire_at < now,
            None => false,
        }
    }

    /// Checks whether the item is stale right now.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    // == Time To Live ==
    /// Returns remaining freshness in whole seconds, or None if the item never
    /// expires.
    ///
    /// # Returns
    /// - `Some(0)` if the item is already stale
    /// - `Some(remaining_seconds)` if it is still fresh
    /// - `None` if it never expires
    pub fn ttl_remaining(&self) -> Option<i64> {
        self.expire_at
            .map(|expire_at| (expire_at - Utc::now()).num_seconds().max(0))
    }

    /// Projects the item into the result handed to readers.
    pub fn into_result(self, now: DateTime<Utc>) -> CacheResult<T> {
        let expired = self.is_expired_at(now);
        CacheResult {
            data: self.data,
            expired,
        }
    }
}

// == Cache Result ==
/// What a read returns: the payload and whether it has gone stale.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheResult<T> {
    pub data: T,
    pub expired: bool,
}
