//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::lock::LockMode;

// == Cache Error Enum ==
/// Unified error type for the store, the locks and the fetch protocol.
///
/// A missing store file or an unknown key on read is not an error: reads
/// return `Ok(None)` in that case.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key not present for an operation that requires it
    #[error("Key not found: {0}")]
    NotFound(String),

    /// The OS refused the lock on the store file
    #[error("Failed to acquire {mode} lock on {}: {source}", path.display())]
    LockAcquisition {
        path: PathBuf,
        mode: LockMode,
        #[source]
        source: io::Error,
    },

    /// Reading or writing the store file failed
    #[error("Store I/O error: {0}")]
    Io(#[from] io::Error),

    /// The store file holds something that is not a valid record map
    #[error("Store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The HTTP transport failed before a response was received
    #[error("Transport error for {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The server answered with a status that must not be cached
    #[error("HTTP error {status} for {url}")]
    HttpStatus { status: u16, url: String },

    /// An explicitly supplied configuration value was rejected
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl CacheError {
    /// Returns the HTTP status carried by an [`CacheError::HttpStatus`].
    pub fn status(&self) -> Option<u16> {
        match self {
            CacheError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
