//! Persistent Store Module
//!
//! File-backed key/value store of [`CacheItem`]s where every operation runs
//! inside one lock scope: load the record map, act on it, and (for writes)
//! persist it before the lock is released.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::{CacheItem, CacheResult, StoreStats};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::lock::{LockMode, StoreLock};

/// Record map as persisted in the store file.
type Items<T> = BTreeMap<String, CacheItem<T>>;

// == Prune Field ==
/// Which timestamp `prune` compares against the cutoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PruneBy {
    /// Remove items that went stale before the cutoff
    #[default]
    ExpireAt,
    /// Remove items last written before the cutoff
    UpdatedAt,
}

impl FromStr for PruneBy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "expire" | "expire_at" | "expired" => Ok(PruneBy::ExpireAt),
            "updated" | "updated_at" => Ok(PruneBy::UpdatedAt),
            other => Err(format!(
                "unknown prune field '{}' (expected 'expire' or 'updated')",
                other
            )),
        }
    }
}

// == Persistent Store ==
/// Durable cache of `T` payloads keyed by string, shared safely between
/// threads and processes through the injected [`StoreLock`].
pub struct PersistentStore<T> {
    /// Path of the store file
    path: PathBuf,
    /// Default TTL in seconds, negative = never expire
    default_ttl: i64,
    /// Lock guarding every access to `path`
    lock: Arc<dyn StoreLock>,
    _payload: PhantomData<fn() -> T>,
}

impl<T> Clone for PersistentStore<T> {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            default_ttl: self.default_ttl,
            lock: Arc::clone(&self.lock),
            _payload: PhantomData,
        }
    }
}

impl<T> fmt::Debug for PersistentStore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistentStore")
            .field("path", &self.path)
            .field("default_ttl", &self.default_ttl)
            .field("lock", &self.lock)
            .finish()
    }
}

impl<T> PersistentStore<T> {
    // == Constructor ==
    /// Creates a store handle. Nothing touches the disk until the first
    /// operation.
    ///
    /// # Arguments
    /// * `path` - Store file, created on the first write
    /// * `default_ttl` - Default TTL in seconds; negative means items never
    ///   expire unless given an explicit expiry
    /// * `lock` - Lock strategy guarding the file
    pub fn new(path: impl Into<PathBuf>, default_ttl: i64, lock: Arc<dyn StoreLock>) -> Self {
        Self {
            path: path.into(),
            default_ttl,
            lock,
            _payload: PhantomData,
        }
    }

    /// Creates a store from configuration, building a fresh lock of the
    /// configured strategy.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.store_path.clone(),
            config.default_ttl,
            config.lock_strategy.build(),
        )
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn default_ttl(&self) -> i64 {
        self.default_ttl
    }
}

impl<T: Serialize + DeserializeOwned> PersistentStore<T> {
    // == Get ==
    /// Reads `key` under a shared lock and reports whether it is stale.
    ///
    /// Returns `Ok(None)` when the store file or the key does not exist.
    pub fn get(&self, key: &str) -> Result<Option<CacheResult<T>>> {
        let now = Utc::now();
        Ok(self
            .get_item(key)?
            .map(|item| item.into_result(now)))
    }

    // == Get Item ==
    /// Reads the full record for `key`, timestamps included.
    pub fn get_item(&self, key: &str) -> Result<Option<CacheItem<T>>> {
        let found = self.read(|mut items| items.remove(key))?.flatten();
        if found.is_none() {
            debug!("No item for key: {}", key);
        }
        Ok(found)
    }

    // == Create Or Update ==
    /// Writes `data` under `key`.
    ///
    /// The expiry comes from `expire_at` when given. Otherwise a
    /// non-negative `ttl_seconds` sets it to now + ttl, and an absent or
    /// negative one leaves the item without expiry. An existing key keeps
    /// its `created_at`.
    ///
    /// # Arguments
    /// * `key` - Key to write
    /// * `data` - Payload to store
    /// * `expire_at` - Explicit expiry, takes precedence over `ttl_seconds`
    /// * `ttl_seconds` - Relative expiry in seconds
    pub fn create_or_update(
        &self,
        key: &str,
        data: T,
        expire_at: Option<DateTime<Utc>>,
        ttl_seconds: Option<i64>,
    ) -> Result<()> {
        self.write(|items, now| {
            let expire_at = expire_at.or_else(|| expiry_from_ttl(now, ttl_seconds));
            let item = match items.get(key) {
                Some(existing) => CacheItem {
                    data,
                    created_at: existing.created_at,
                    updated_at: now.max(existing.created_at),
                    expire_at,
                },
                None => CacheItem::new(data, expire_at, now),
            };
            items.insert(key.to_string(), item);
            info!("Updated item for key: {} (expires: {:?})", key, expire_at);
            Ok(())
        })
    }

    // == Replace Data ==
    /// Overwrites the payload of an existing key, keeping its expiry.
    pub fn replace_data(&self, key: &str, data: T) -> Result<()> {
        self.write(|items, now| {
            let item = items
                .get_mut(key)
                .ok_or_else(|| CacheError::NotFound(key.to_string()))?;
            item.data = data;
            item.updated_at = now.max(item.created_at);
            info!("Replaced data for key: {}", key);
            Ok(())
        })
    }

    // == Update Expires ==
    /// Rewrites only the expiry of an existing key. `None` expires it now.
    pub fn update_expires(&self, key: &str, expire_at: Option<DateTime<Utc>>) -> Result<()> {
        self.write(|items, now| {
            let item = items
                .get_mut(key)
                .ok_or_else(|| CacheError::NotFound(key.to_string()))?;
            item.expire_at = Some(expire_at.unwrap_or(now));
            item.updated_at = now.max(item.created_at);
            info!("Updated expiry for key: {} to {:?}", key, item.expire_at);
            Ok(())
        })
    }

    // == Delete ==
    /// Removes `key`; fails with `NotFound` if it is absent.
    pub fn delete(&self, key: &str) -> Result<()> {
        self.write(|items, _| {
            items
                .remove(key)
                .ok_or_else(|| CacheError::NotFound(key.to_string()))?;
            info!("Deleted item for key: {}", key);
            Ok(())
        })
    }

    // == Prune ==
    /// Removes every item whose `by` timestamp is strictly before `cutoff`
    /// (default now).
    ///
    /// Items without an expiry are never removed when pruning by
    /// [`PruneBy::ExpireAt`].
    ///
    /// Returns the number of items removed.
    pub fn prune(&self, cutoff: Option<DateTime<Utc>>, by: PruneBy) -> Result<usize> {
        self.write(|items, now| {
            let cutoff = cutoff.unwrap_or(now);
            let before = items.len();
            items.retain(|key, item| {
                let remove = match by {
                    PruneBy::ExpireAt => item.expire_at.is_some_and(|at| at < cutoff),
                    PruneBy::UpdatedAt => item.updated_at < cutoff,
                };
                if remove {
                    info!("Pruned item for key: {}", key);
                }
                !remove
            });
            Ok(before - items.len())
        })
    }

    /// Removes every item that is stale now.
    pub fn prune_expired(&self) -> Result<usize> {
        self.prune(None, PruneBy::ExpireAt)
    }

    /// Removes every item not written since `older_than`.
    pub fn prune_old(&self, older_than: DateTime<Utc>) -> Result<usize> {
        self.prune(Some(older_than), PruneBy::UpdatedAt)
    }

    // == Clear ==
    /// Removes all items. Returns how many there were.
    ///
    /// An unreadable store file is discarded and counts as empty, so `clear`
    /// is the way back from a damaged store.
    pub fn clear(&self) -> Result<usize> {
        self.write_with(true, |items, _| {
            let count = items.len();
            items.clear();
            info!("Deleted all {} items in cache", count);
            Ok(count)
        })
    }

    // == Stats ==
    /// Counts items by freshness under a shared lock.
    pub fn stats(&self) -> Result<StoreStats> {
        let now = Utc::now();
        let stats = self.read(|items| {
            let mut stats = StoreStats::new();
            for item in items.values() {
                stats.record(item.expire_at.is_some(), item.is_expired_at(now));
            }
            stats
        })?;
        Ok(stats.unwrap_or_default())
    }

    // == Lock Scopes ==
    /// Runs `f` on the record map under a shared lock. `Ok(None)` when the
    /// store file does not exist.
    fn read<R>(&self, f: impl FnOnce(Items<T>) -> R) -> Result<Option<R>> {
        let Some(_scope) = self.lock.acquire(&self.path, LockMode::Shared)? else {
            info!("Cache db file does not exist at {}", self.path.display());
            return Ok(None);
        };
        match load(&self.path)? {
            Some(items) => Ok(Some(f(items))),
            None => Ok(None),
        }
    }

    /// Runs `f` on the record map under an exclusive lock and persists the
    /// result. Nothing is written when `f` fails.
    fn write<R>(&self, f: impl FnOnce(&mut Items<T>, DateTime<Utc>) -> Result<R>) -> Result<R> {
        self.write_with(false, f)
    }

    /// Like [`Self::write`]. With `discard_unreadable`, a store file that
    /// does not parse is treated as empty instead of failing the scope.
    fn write_with<R>(
        &self,
        discard_unreadable: bool,
        f: impl FnOnce(&mut Items<T>, DateTime<Utc>) -> Result<R>,
    ) -> Result<R> {
        let _scope = self
            .lock
            .acquire(&self.path, LockMode::Exclusive)?
            .ok_or_else(|| {
                CacheError::Io(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("cannot lock {} for writing", self.path.display()),
                ))
            })?;
        let mut items = match load(&self.path) {
            Ok(items) => items.unwrap_or_default(),
            Err(CacheError::Serialization(e)) if discard_unreadable => {
                warn!("Discarding unreadable store {}: {}", self.path.display(), e);
                Items::new()
            }
            Err(e) => return Err(e),
        };
        let now = Utc::now();
        let out = f(&mut items, now)?;
        persist(&self.path, &items)?;
        Ok(out)
    }
}

/// Expiry for a relative TTL; negative or absent TTLs never expire.
fn expiry_from_ttl(now: DateTime<Utc>, ttl_seconds: Option<i64>) -> Option<DateTime<Utc>> {
    let ttl = ttl_seconds.filter(|ttl| *ttl >= 0)?;
    Duration::try_seconds(ttl).and_then(|ttl| now.checked_add_signed(ttl))
}

/// Reads the record map; `None` when the store file does not exist.
fn load<T: DeserializeOwned>(path: &Path) -> Result<Option<Items<T>>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    // Left behind by versions that created the file before writing it
    if file.metadata()?.len() == 0 {
        return Ok(Some(Items::new()));
    }
    let items = serde_json::from_reader(BufReader::new(file))?;
    Ok(Some(items))
}

/// Sibling file a new store version is written to before the rename.
fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Writes the record map to a temporary sibling, syncs it and renames it
/// over the store, so the store file is always a complete document.
fn persist<T: Serialize>(path: &Path, items: &Items<T>) -> Result<()> {
    let tmp = tmp_path(path);
    let written = write_synced(&tmp, items)
        .and_then(|()| fs::rename(&tmp, path).map_err(CacheError::from));
    if written.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    written
}

fn write_synced<T: Serialize>(tmp: &Path, items: &Items<T>) -> Result<()> {
    let file = File::create(tmp)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, items)?;
    writer.flush()?;
    writer.get_ref().sync_all()?;
    Ok(())
}
