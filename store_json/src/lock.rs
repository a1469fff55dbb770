//! Scoped exclusive access to a store file.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use votekiosk_store::StoreError;

/// Exclusive advisory lock on a sidecar `<file>.lock`, held until drop.
///
/// The lock is taken on a separate file because the data file itself is
/// replaced by rename on every write.
#[derive(Debug)]
pub struct StoreLock {
    file: File,
    path: PathBuf,
}

impl StoreLock {
    /// Block until the lock guarding `data_path` is acquired.
    pub fn acquire(data_path: &Path) -> Result<Self, StoreError> {
        let path = lock_path(data_path);
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|e| StoreError::Lock(format!("open {}: {e}", path.display())))?;
        file.lock()
            .map_err(|e| StoreError::Lock(format!("lock {}: {e}", path.display())))?;
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if let Err(e) = self.file.unlock() {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to release store lock");
        }
    }
}

fn lock_path(data_path: &Path) -> PathBuf {
    let mut name = data_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".lock");
    data_path.with_file_name(name)
}
