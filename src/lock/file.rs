//! Cross-process lock built on `flock(2)`.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

use tracing::debug;

use super::{lock_path, LockMode, LockScope, StoreLock};
use crate::error::{CacheError, Result};

/// Shared/exclusive advisory lock on the `<store>.lock` sidecar file.
///
/// Each acquisition opens a new file description, so the lock also
/// serializes threads of the same process, not just separate processes.
/// The sidecar is never replaced, unlike the store file it guards.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileLock;

impl FileLock {
    pub fn new() -> Self {
        Self
    }
}

impl StoreLock for FileLock {
    fn acquire(&self, path: &Path, mode: LockMode) -> Result<Option<LockScope<'_>>> {
        if mode == LockMode::Shared && !path.exists() {
            debug!("Store file {} does not exist", path.display());
            return Ok(None);
        }

        let lock_path = lock_path(path);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        lock(&file, mode).map_err(|source| CacheError::LockAcquisition {
            path: lock_path.clone(),
            mode,
            source,
        })?;
        debug!("Acquired {} flock on {}", mode, lock_path.display());

        Ok(Some(LockScope::os(file, mode)))
    }
}

#[cfg(unix)]
fn flock(file: &File, operation: libc::c_int) -> io::Result<()> {
    use std::os::unix::io::AsRawFd;

    loop {
        // SAFETY: the descriptor is owned by `file` and stays open for the call.
        let rc = unsafe { libc::flock(file.as_raw_fd(), operation) };
        if rc == 0 {
            return Ok(());
        }
        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(err);
        }
    }
}

/// Blocks until `file` is locked in `mode`.
#[cfg(unix)]
pub(super) fn lock(file: &File, mode: LockMode) -> io::Result<()> {
    let operation = match mode {
        LockMode::Shared => libc::LOCK_SH,
        LockMode::Exclusive => libc::LOCK_EX,
    };
    flock(file, operation)
}

#[cfg(unix)]
pub(super) fn unlock(file: &File) -> io::Result<()> {
    flock(file, libc::LOCK_UN)
}

#[cfg(not(unix))]
pub(super) fn lock(_file: &File, _mode: LockMode) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "flock is only available on unix targets",
    ))
}

#[cfg(not(unix))]
pub(super) fn unlock(_file: &File) -> io::Result<()> {
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_shared_on_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.db");
        let lock = FileLock::new();

        let scope = lock.acquire(&path, LockMode::Shared).unwrap();
        assert!(scope.is_none());
        assert!(!path.exists(), "Shared acquisition must not create the file");
        assert!(!lock_path(&path).exists());
    }

    #[test]
    fn test_exclusive_creates_lock_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("created.db");
        let lock = FileLock::new();

        let scope = lock.acquire(&path, LockMode::Exclusive).unwrap();
        assert_eq!(scope.unwrap().mode(), LockMode::Exclusive);
        assert!(lock_path(&path).exists());
        assert!(!path.exists(), "The store file is written by the store");
    }

    #[test]
    fn test_shared_on_existing_store() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("existing.db");
        std::fs::write(&path, b"{}").unwrap();
        let lock = FileLock::new();

        let scope = lock.acquire(&path, LockMode::Shared).unwrap();
        assert_eq!(scope.unwrap().mode(), LockMode::Shared);
    }

    #[test]
    fn test_exclusive_released_on_drop() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("released.db");
        let lock = FileLock::new();

        drop(lock.acquire(&path, LockMode::Exclusive).unwrap());

        // Would block forever if the first scope had leaked its lock
        let again = lock.acquire(&path, LockMode::Exclusive).unwrap();
        assert!(again.is_some());
    }

    #[test]
    fn test_lock_survives_store_replacement() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("replaced.db");
        std::fs::write(&path, b"{}").unwrap();
        let lock = FileLock::new();

        let held = lock.acquire(&path, LockMode::Exclusive).unwrap();
        let tmp = dir.path().join("replaced.db.tmp");
        std::fs::write(&tmp, b"{}").unwrap();
        std::fs::rename(&tmp, &path).unwrap();

        // Another descriptor on the sidecar still sees the held lock
        let other = File::open(lock_path(&path)).unwrap();
        let err = flock(&other, libc::LOCK_SH | libc::LOCK_NB).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::WouldBlock);
        drop(held);
    }

    #[test]
    fn test_exclusive_missing_parent_dir_is_io_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("no").join("such").join("dir.db");
        let lock = FileLock::new();

        let result = lock.acquire(&path, LockMode::Exclusive);
        assert!(matches!(result, Err(CacheError::Io(_))));
    }
}
