//! In-process reader/writer lock.

use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use super::{LockMode, LockScope, StoreLock};
use crate::error::Result;

/// Reader/writer lock shared by every clone of this value.
///
/// Correct for many threads of one process only: other processes opening
/// the same store path do not see this lock.
#[derive(Debug, Clone, Default)]
pub struct ThreadLock {
    inner: Arc<RwLock<()>>,
}

impl ThreadLock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StoreLock for ThreadLock {
    fn acquire(&self, path: &Path, mode: LockMode) -> Result<Option<LockScope<'_>>> {
        // The guarded value is `()`, so a panic in another holder leaves
        // nothing inconsistent behind; recover from poisoning.
        match mode {
            LockMode::Shared => {
                let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
                if !path.exists() {
                    debug!("Store file {} does not exist", path.display());
                    return Ok(None);
                }
                debug!("Acquired shared thread lock for {}", path.display());
                Ok(Some(LockScope::shared(guard)))
            }
            LockMode::Exclusive => {
                let guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
                debug!("Acquired exclusive thread lock for {}", path.display());
                Ok(Some(LockScope::exclusive(guard)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_shared_on_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.db");

        let lock = ThreadLock::new();

        let scope = lock.acquire(&path, LockMode::Shared).unwrap();
        assert!(scope.is_none());
        assert!(!path.exists());
    }

    #[test]
    fn test_exclusive_on_missing_store() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("created.db");
        let lock = ThreadLock::new();

        let scope = lock.acquire(&path, LockMode::Exclusive).unwrap();
        assert_eq!(scope.unwrap().mode(), LockMode::Exclusive);
        assert!(!path.exists(), "The store file is written by the store");
    }

    #[test]
    fn test_clones_share_one_lock() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("shared.db");
        let lock = ThreadLock::new();
        let clone = lock.clone();

        let held = lock.acquire(&path, LockMode::Exclusive).unwrap();
        assert!(clone.inner.try_write().is_err(), "Clone should see the held lock");
        drop(held);
        assert!(clone.inner.try_write().is_ok());
    }

    #[test]
    fn test_recovers_from_poison() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("poison.db");
        let lock = ThreadLock::new();

        let poisoner = lock.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.inner.write().unwrap();
            panic!("poison the lock");
        })
        .join();

        assert!(lock.inner.is_poisoned());
        assert!(lock.acquire(&path, LockMode::Exclusive).unwrap().is_some());
    }
}
