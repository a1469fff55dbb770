//! Write-temp-then-rename file replacement.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use votekiosk_store::StoreError;

/// Replace `path` with `bytes` so readers see either the old or the new
/// content, never a partial write.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let dir = parent_dir(path);
    fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)
        .map_err(|e| StoreError::Io(format!("replace {}: {}", path.display(), e.error)))?;
    Ok(())
}

/// Read a file, treating a missing file as empty.
pub fn read_or_empty(path: &Path) -> Result<String, StoreError> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(text),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(StoreError::Io(format!("read {}: {e}", path.display()))),
    }
}

/// Check that a file could be created next to `path` right now.
pub fn probe_writable(path: &Path) -> Result<(), StoreError> {
    let dir = parent_dir(path);
    fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(b"probe")?;
    tmp.as_file().sync_all()?;
    Ok(())
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_content_without_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("commit.json");
        write_atomic(&path, b"{}").unwrap();
        write_atomic(&path, b"{\"a\":1}").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "{\"a\":1}");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(read_or_empty(&dir.path().join("nope.json")).unwrap(), "");
    }

    #[test]
    fn probe_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("votes").join("commit.json");
        probe_writable(&path).unwrap();
        assert!(dir.path().join("votes").is_dir());
    }
}
