//! Output models for the command-line interface
//!
//! This module defines the DTOs (Data Transfer Objects) serialized to JSON
//! by the `flockcache` binary.

pub mod responses;

// Re-export commonly used types
pub use responses::{FetchResponse, ItemResponse, KeyResponse, PruneResponse, StatsResponse};
