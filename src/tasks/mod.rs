//! Background Tasks Module
//!
//! Contains background tasks that run periodically while the cache is maintained.
//!
//! # Tasks
//! - Prune: Removes expired store items at configured intervals

mod prune;

pub use prune::spawn_prune_task;
