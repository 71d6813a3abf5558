//! Async I/O helpers for storage operations
//!
//! File operations run on tokio's blocking pool via `spawn_blocking` so a
//! slow disk never stalls the connection tasks sharing a worker thread.

use crate::error::{Result, TablecastError};
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;

/// Distinguishes temp files of concurrent writes within one process
static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Read a file, returning `None` if it does not exist.
pub async fn read_optional_async(path: PathBuf) -> Result<Option<Vec<u8>>> {
    tokio::task::spawn_blocking(move || match fs::read(&path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(TablecastError::storage(
            "read",
            format!("failed to read {:?}: {}", path, e),
        )),
    })
    .await
    .map_err(|e| TablecastError::storage_msg(format!("Task join error: {}", e)))?
}

/// Create directories recursively asynchronously
pub async fn create_dir_all_async(path: PathBuf) -> Result<()> {
    tokio::task::spawn_blocking(move || fs::create_dir_all(&path).map_err(TablecastError::from))
        .await
        .map_err(|e| TablecastError::storage_msg(format!("Task join error: {}", e)))?
}

/// Atomically replace a file's contents (async version)
///
/// The sequence is:
/// 1. Write to a temp file in the same directory
/// 2. fsync the temp file
/// 3. Rename temp file over the target (atomic on POSIX)
/// 4. fsync the parent directory so the rename itself is durable
pub async fn atomic_write_async(path: PathBuf, data: Vec<u8>) -> Result<()> {
    tokio::task::spawn_blocking(move || atomic_write_blocking(&path, &data))
        .await
        .map_err(|e| TablecastError::storage_msg(format!("Task join error: {}", e)))?
}

/// Blocking version of atomic write (used by spawn_blocking)
pub fn atomic_write_blocking(path: &Path, data: &[u8]) -> Result<()> {
    let parent = path.parent().ok_or_else(|| {
        TablecastError::storage_msg(format!("Cannot get parent directory of {:?}", path))
    })?;

    fs::create_dir_all(parent).map_err(|e| {
        TablecastError::storage("mkdir", format!("failed to create {:?}: {}", parent, e))
    })?;

    let temp_name = format!(
        ".{}.tmp.{}.{}",
        path.file_name().and_then(|n| n.to_str()).unwrap_or("document"),
        std::process::id(),
        TEMP_SEQ.fetch_add(1, Ordering::Relaxed)
    );
    let temp_path = parent.join(&temp_name);

    {
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&temp_path)
            .map_err(|e| {
                TablecastError::storage(
                    "write",
                    format!("failed to create temp file {:?}: {}", temp_path, e),
                )
            })?;

        file.write_all(data).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            TablecastError::storage(
                "write",
                format!("failed to write temp file {:?}: {}", temp_path, e),
            )
        })?;

        file.sync_all().map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            TablecastError::storage(
                "fsync",
                format!("failed to sync temp file {:?}: {}", temp_path, e),
            )
        })?;
    }

    #[cfg(unix)]
    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        TablecastError::storage(
            "rename",
            format!("failed to rename {:?} to {:?}: {}", temp_path, path, e),
        )
    })?;

    #[cfg(windows)]
    {
        if fs::rename(&temp_path, path).is_err() {
            if path.exists() {
                fs::remove_file(path)?;
            }
            fs::rename(&temp_path, path)?;
        }
    }

    if let Ok(dir) = File::open(parent) {
        if let Err(e) = dir.sync_all() {
            warn!(
                path = ?parent,
                error = %e,
                "Directory fsync failed - rename durability not guaranteed"
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_read_missing_file_is_none() {
        let tmp = TempDir::new().unwrap();
        let got = read_optional_async(tmp.path().join("nope.json")).await.unwrap();
        assert!(got.is_none());
    }

    #[tokio::test]
    async fn test_atomic_write_creates_parents_and_replaces() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a").join("b").join("doc.json");

        atomic_write_async(path.clone(), b"first".to_vec()).await.unwrap();
        atomic_write_async(path.clone(), b"second".to_vec()).await.unwrap();

        let got = read_optional_async(path.clone()).await.unwrap();
        assert_eq!(got.as_deref(), Some(&b"second"[..]));

        // No temp files left behind
        let leftovers: Vec<_> = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(".tmp."))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_read_directory_is_error() {
        let tmp = TempDir::new().unwrap();
        let err = read_optional_async(tmp.path().to_path_buf()).await.unwrap_err();
        assert!(err.is_storage());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writes_to_one_path_use_distinct_temp_files() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("doc.json");

        let mut handles = Vec::new();
        for i in 0..16 {
            let path = path.clone();
            handles.push(tokio::spawn(atomic_write_async(
                path,
                format!("v{}", i).into_bytes(),
            )));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let got = String::from_utf8(read_optional_async(path).await.unwrap().unwrap()).unwrap();
        assert!(got.starts_with('v'), "unexpected content {}", got);

        let leftovers = std::fs::read_dir(tmp.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }
}
