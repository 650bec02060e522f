//! Advisory file locking for index rebuilds.
//!
//! Holding the lock serializes rebuilds of the same index across
//! processes. Readers never take the lock; generation cutover keeps
//! queries consistent while a rebuild runs.

use std::fs::{self, File, OpenOptions};
use std::path::Path;

use crate::error::{EngineError, EngineResult};

/// Exclusive advisory lock for one named index.
///
/// The lock is released when the guard is dropped.
pub struct IndexLock {
    file: File,
}

impl IndexLock {
    /// Acquire the rebuild lock for `index_name`, blocking until it is free.
    pub fn acquire(index_root: &Path, index_name: &str) -> EngineResult<Self> {
        let lock_path = index_root.join(format!("{index_name}.lock"));

        if let Some(parent) = lock_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .truncate(true)
            .read(true)
            .write(true)
            .open(&lock_path)?;

        file.lock().map_err(EngineError::Io)?;

        Ok(Self { file })
    }
}

impl Drop for IndexLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_acquire_and_release() {
        let temp = TempDir::new().unwrap();

        {
            let _lock = IndexLock::acquire(temp.path(), "nco2015").unwrap();
            assert!(temp.path().join("nco2015.lock").exists());
        }

        // Dropped lock can be re-acquired
        let _lock = IndexLock::acquire(temp.path(), "nco2015").unwrap();
    }
}
