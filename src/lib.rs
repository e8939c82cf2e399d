//! flockcache - persistent, lock-guarded HTTP response cache
//!
//! Provides a file-backed key/value store safe across threads and processes,
//! and conditional HTTP fetching on top of it.

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod fetch;
pub mod lock;
pub mod models;
pub mod tasks;

pub use cache::{CacheItem, CacheResult, PersistentStore, PruneBy};
pub use config::Config;
pub use error::{CacheError, Result};
pub use fetch::{ConditionalFetcher, FetchOutcome, Headers, HttpClient, HttpResponse, ResponseStore};
pub use lock::{FileLock, LockMode, LockScope, LockStrategy, StoreLock, ThreadLock};
pub use tasks::spawn_prune_task;
