//! File system utilities.
//!
//! Provides atomic writes and directory helpers with path-carrying errors.

use crate::error::{ErrorExt, Result};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Writes `contents` to `path` by writing a sibling temp file and renaming it over.
///
/// Readers never observe a partially written file. Parent directories are
/// created as needed.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).fs_context("creating parent directory", parent)?;
    }

    let temp_path = temp_sibling(path);
    {
        let mut file =
            std::fs::File::create(&temp_path).fs_context("creating temp file", &temp_path)?;
        file.write_all(contents)
            .fs_context("writing temp file", &temp_path)?;
        file.sync_all().fs_context("syncing temp file", &temp_path)?;
    }

    std::fs::rename(&temp_path, path).fs_context("replacing file", path)?;
    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Writes a file asynchronously, creating parent directories first.
pub async fn write_file(path: &Path, contents: impl AsRef<[u8]>) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .fs_context("creating parent directory", parent)?;
    }
    tokio::fs::write(path, contents)
        .await
        .fs_context("writing file", path)
}

/// Removes the directory and its contents if it exists.
pub async fn remove_dir_all(path: &Path) -> Result<()> {
    if path.exists() {
        tokio::fs::remove_dir_all(path)
            .await
            .fs_context("removing directory", path)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_atomic_creates_parents_and_leaves_no_temp() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested").join("guids.json");

        write_atomic(&target, b"{}").unwrap();
        write_atomic(&target, b"{\"a\": \"b\"}").unwrap();

        assert_eq!(std::fs::read_to_string(&target).unwrap(), "{\"a\": \"b\"}");
        assert!(!dir.path().join("nested").join("guids.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_write_file_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("build").join("setup.wxs");
        write_file(&target, "<Wix/>").await.unwrap();
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "<Wix/>");

        remove_dir_all(&dir.path().join("build")).await.unwrap();
        assert!(!target.exists());
    }
}
