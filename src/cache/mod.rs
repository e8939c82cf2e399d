//! Cache Module
//!
//! Persistent, lock-scoped key/value storage with expiration bookkeeping.

mod item;
mod stats;
mod store;


// Re-export public types
pub use item::{CacheItem, CacheResult};
pub use stats::{FetchCounters, FetchStats, StoreStats};
pub use store::{PersistentStore, PruneBy};

// == Public Constants ==
/// TTL value meaning "never expire unless an explicit expiry is given"
pub const NEVER_EXPIRE: i64 = -1;
