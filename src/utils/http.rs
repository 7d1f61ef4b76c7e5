//! HTTP utilities for downloading the WiX toolset.
//!
//! Provides downloads with optional SHA-256 verification and in-memory ZIP
//! extraction.

use crate::error::{Error, ErrorExt, Result};
use std::path::Path;

/// Downloads a file from a URL and returns its contents.
pub async fn download(url: &str) -> Result<Vec<u8>> {
    log::info!("Downloading {}", url);

    let response = reqwest::get(url).await?.error_for_status()?;
    let bytes = response.bytes().await?;

    log::info!("Downloaded {} bytes", bytes.len());
    Ok(bytes.to_vec())
}

/// Downloads a file and verifies its SHA-256 hash when one is given.
pub async fn download_and_verify(url: &str, expected_sha256: Option<&str>) -> Result<Vec<u8>> {
    let data = download(url).await?;
    if let Some(expected) = expected_sha256 {
        log::info!("validating hash");
        verify_hash(&data, expected).await?;
    }
    Ok(data)
}

/// Verifies that data matches the expected SHA-256 hash (case-insensitive).
///
/// Hashing runs on the blocking pool.
pub async fn verify_hash(data: &[u8], expected_hash: &str) -> Result<()> {
    use sha2::Digest as _;

    let data = data.to_vec();
    let expected_hash = expected_hash.to_string();

    tokio::task::spawn_blocking(move || {
        let mut hasher = sha2::Sha256::new();
        hasher.update(&data);
        let actual_hash = hex::encode(hasher.finalize());

        if actual_hash.eq_ignore_ascii_case(&expected_hash) {
            Ok(())
        } else {
            Err(Error::HashMismatch {
                expected: expected_hash,
                actual: actual_hash,
            })
        }
    })
    .await
    .map_err(|e| Error::GenericError(format!("Hash verification task failed: {}", e)))?
}

/// Extracts a ZIP archive from memory into a destination directory.
///
/// Every entry name is checked before anything is written: entries with `..`
/// components or absolute paths reject the whole archive.
pub async fn extract_zip(data: &[u8], dest: &Path) -> Result<()> {
    use async_zip::base::read::mem::ZipFileReader;
    use futures_lite::io::AsyncReadExt as _;

    let reader = ZipFileReader::new(data.to_vec())
        .await
        .map_err(|e| Error::GenericError(format!("Failed to read ZIP archive: {}", e)))?;

    let mut entries = Vec::with_capacity(reader.file().entries().len());
    for entry in reader.file().entries() {
        let filename = entry
            .filename()
            .as_str()
            .map_err(|e| Error::GenericError(format!("Invalid filename in ZIP: {}", e)))?
            .to_string();

        if !is_contained(&filename) {
            return Err(Error::GenericError(format!(
                "Invalid ZIP entry path (potential traversal attack): {}",
                filename
            )));
        }

        let is_dir = entry.dir().map_err(|e| {
            Error::GenericError(format!("Failed to check if entry is directory: {}", e))
        })?;
        entries.push((filename, is_dir));
    }

    for (i, (filename, is_dir)) in entries.into_iter().enumerate() {
        let target = dest.join(&filename);
        if is_dir {
            tokio::fs::create_dir_all(&target)
                .await
                .fs_context("creating directory", &target)?;
            continue;
        }

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .fs_context("creating directory", parent)?;
        }

        let mut entry_reader = reader
            .reader_with_entry(i)
            .await
            .map_err(|e| Error::GenericError(format!("Failed to read ZIP entry: {}", e)))?;
        let mut content = Vec::new();
        entry_reader.read_to_end(&mut content).await?;

        tokio::fs::write(&target, content)
            .await
            .fs_context("writing extracted file", &target)?;
    }

    Ok(())
}

/// Whether a ZIP entry name stays inside the extraction directory.
fn is_contained(filename: &str) -> bool {
    use std::path::Component;

    if filename.starts_with('/') || filename.starts_with('\\') {
        return false;
    }
    Path::new(&filename.replace('\\', "/"))
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}
