//! Lock Module
//!
//! Reader/writer locking around the on-disk store.
//!
//! Every store operation runs inside one lock scope: a [`LockScope`] that
//! holds the lock until dropped. The store file itself is replaced by
//! rename on every write, so the lock never lives on it. Two strategies
//! implement [`StoreLock`]:
//!
//! - [`FileLock`]: `flock(2)` on a `<store>.lock` sidecar file. Works across
//!   threads and across unrelated processes.
//! - [`ThreadLock`]: an in-process `RwLock`. Lighter, but invisible to other
//!   processes.

mod file;
mod thread;

use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

use crate::error::Result;

pub use file::FileLock;
pub use thread::ThreadLock;

// == Lock Mode ==
/// Access mode requested for a lock scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// Any number of concurrent holders
    Shared,
    /// A single holder, excluding all others
    Exclusive,
}

impl fmt::Display for LockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockMode::Shared => f.write_str("shared"),
            LockMode::Exclusive => f.write_str("exclusive"),
        }
    }
}

// == Store Lock Trait ==
/// Acquires scoped access to the store at a path.
pub trait StoreLock: Send + Sync + fmt::Debug {
    /// Blocks until the store at `path` is held in `mode`.
    ///
    /// Exclusive acquisition always succeeds once the lock is free; it
    /// creates whatever backing file the lock needs. Shared acquisition of
    /// a store that does not exist yet returns `Ok(None)` and creates
    /// nothing.
    fn acquire(&self, path: &Path, mode: LockMode) -> Result<Option<LockScope<'_>>>;
}

/// Sidecar file carrying the `flock` for the store at `path`.
pub fn lock_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".lock");
    PathBuf::from(name)
}

// == Lock Scope ==
/// A held lock on a store, released when this value is dropped.
pub struct LockScope<'a> {
    mode: LockMode,
    lock_file: Option<File>,
    _shared: Option<RwLockReadGuard<'a, ()>>,
    _exclusive: Option<RwLockWriteGuard<'a, ()>>,
}

impl<'a> LockScope<'a> {
    /// Wraps a lock file whose `flock` is already held.
    pub(crate) fn os(lock_file: File, mode: LockMode) -> Self {
        Self {
            mode,
            lock_file: Some(lock_file),
            _shared: None,
            _exclusive: None,
        }
    }

    /// Wraps an in-process read guard.
    pub(crate) fn shared(guard: RwLockReadGuard<'a, ()>) -> Self {
        Self {
            mode: LockMode::Shared,
            lock_file: None,
            _shared: Some(guard),
            _exclusive: None,
        }
    }

    /// Wraps an in-process write guard.
    pub(crate) fn exclusive(guard: RwLockWriteGuard<'a, ()>) -> Self {
        Self {
            mode: LockMode::Exclusive,
            lock_file: None,
            _shared: None,
            _exclusive: Some(guard),
        }
    }

    /// The mode this scope was acquired in.
    pub fn mode(&self) -> LockMode {
        self.mode
    }
}

impl fmt::Debug for LockScope<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockScope")
            .field("mode", &self.mode)
            .field("os_locked", &self.lock_file.is_some())
            .finish()
    }
}

impl Drop for LockScope<'_> {
    fn drop(&mut self) {
        // Closing the descriptor would also release the flock
        if let Some(lock_file) = &self.lock_file {
            if let Err(e) = file::unlock(lock_file) {
                debug!("flock unlock failed, lock released on close: {}", e);
            }
        }
        debug!("Released {} lock", self.mode);
    }
}

// == Lock Strategy ==
/// Configurable choice between the two lock implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockStrategy {
    /// Cross-process `flock` on the store file
    #[default]
    Process,
    /// In-process reader/writer lock
    Thread,
}

impl LockStrategy {
    /// Builds a fresh lock instance for one store.
    ///
    /// Every call to `build` with [`LockStrategy::Thread`] yields an
    /// independent lock; share the returned `Arc` between stores that must
    /// exclude each other.
    pub fn build(self) -> Arc<dyn StoreLock> {
        match self {
            LockStrategy::Process => Arc::new(FileLock::new()),
            LockStrategy::Thread => Arc::new(ThreadLock::new()),
        }
    }
}

impl FromStr for LockStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "process" | "file" | "flock" => Ok(LockStrategy::Process),
            "thread" | "mutex" => Ok(LockStrategy::Thread),
            other => Err(format!(
                "unknown lock strategy '{}' (expected 'process' or 'thread')",
                other
            )),
        }
    }
}

impl fmt::Display for LockStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockStrategy::Process => f.write_str("process"),
            LockStrategy::Thread => f.write_str("thread"),
        }
    }
}
