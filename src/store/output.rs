//! Per-category event files.
//!
//! # Responsibilities
//! - Create the output directory with an explicit permission policy
//! - Write the latest event of each category to `<directory>/<category>.json`
//! - Serialize concurrent writes to the same category
//!
//! # Design Decisions
//! - Only the most recent event per category is kept
//! - Atomic mode writes a hidden temp file and renames it into place
//! - Category names are used as file names, so anything that could leave
//!   the directory is rejected

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::config::OutputConfig;
use crate::observability::metrics;
use crate::store::format::format_json;

/// Errors raised by the output store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("filesystem error at {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("category '{0}' is not usable as a file name")]
    InvalidCategory(String),
}

impl StoreError {
    fn fs(path: &Path, source: std::io::Error) -> Self {
        StoreError::Filesystem {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Destination for decoded callback payloads.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Persist `raw` as the latest event of `category`.
    async fn write(&self, category: &str, raw: &[u8]) -> Result<PathBuf, StoreError>;
}

/// Writes one JSON file per event category.
#[derive(Debug)]
pub struct OutputStore {
    directory: PathBuf,
    file_mode: u32,
    dir_mode: u32,
    atomic_writes: bool,
    /// One lock per category file.
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl OutputStore {
    pub fn new(config: &OutputConfig) -> Self {
        Self {
            directory: PathBuf::from(&config.directory),
            file_mode: config.file_mode,
            dir_mode: config.dir_mode,
            atomic_writes: config.atomic_writes,
            locks: DashMap::new(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Create the output directory (and parents) if it does not exist.
    pub async fn ensure_directory(&self) -> Result<(), StoreError> {
        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        builder.mode(self.dir_mode);

        builder
            .create(&self.directory)
            .await
            .map_err(|e| StoreError::fs(&self.directory, e))?;

        tracing::info!(directory = %self.directory.display(), "Output directory ready");
        Ok(())
    }

    /// File a category is written to.
    pub fn path_for(&self, category: &str) -> Result<PathBuf, StoreError> {
        let usable = !category.is_empty()
            && category != "."
            && category != ".."
            && !category.contains(&['/', '\\', '\0'][..]);
        if !usable {
            return Err(StoreError::InvalidCategory(category.to_string()));
        }
        Ok(self.directory.join(format!("{}.json", category)))
    }

    async fn write_file(&self, path: &Path, data: &[u8]) -> Result<(), StoreError> {
        if !self.atomic_writes {
            return self.write_in_place(path, data).await;
        }

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let tmp = path.with_file_name(format!(".{}.tmp", file_name));

        if let Err(e) = self.write_in_place(&tmp, data).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e);
        }
        if let Err(e) = fs::rename(&tmp, path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(StoreError::fs(path, e));
        }
        Ok(())
    }

    async fn write_in_place(&self, path: &Path, data: &[u8]) -> Result<(), StoreError> {
        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(self.file_mode);

        let mut file = options.open(path).await.map_err(|e| StoreError::fs(path, e))?;
        file.write_all(data).await.map_err(|e| StoreError::fs(path, e))?;
        file.flush().await.map_err(|e| StoreError::fs(path, e))?;
        Ok(())
    }

    fn lock_for(&self, category: &str) -> Arc<Mutex<()>> {
        self.locks.entry(category.to_string()).or_default().clone()
    }
}

#[async_trait]
impl EventSink for OutputStore {
    async fn write(&self, category: &str, raw: &[u8]) -> Result<PathBuf, StoreError> {
        let start = Instant::now();
        let path = self.path_for(category)?;
        let data = format_json(raw);

        let lock = self.lock_for(category);
        let result = {
            let _guard = lock.lock().await;
            self.write_file(&path, &data).await
        };
        drop(lock);
        // The map holds one reference; anything above that is a waiting writer.
        self.locks.remove_if(category, |_, l| Arc::strong_count(l) == 1);

        metrics::record_write(category, result.is_ok(), start);
        result?;

        tracing::debug!(category = %category, path = %path.display(), bytes = data.len(), "Event written");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn store_in(dir: &Path) -> OutputStore {
        OutputStore::new(&OutputConfig {
            directory: dir.join("events").to_string_lossy().into_owned(),
            ..OutputConfig::default()
        })
    }

    #[tokio::test]
    async fn test_ensure_directory_nested() {
        let tmp = tempfile::tempdir().unwrap();
        let store = OutputStore::new(&OutputConfig {
            directory: tmp.path().join("a/b/c").to_string_lossy().into_owned(),
            ..OutputConfig::default()
        });
        store.ensure_directory().await.unwrap();
        assert!(store.directory().is_dir());
        // Existing directory is fine.
        store.ensure_directory().await.unwrap();
    }

    #[tokio::test]
    async fn test_ensure_directory_over_file_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("events");
        std::fs::write(&blocker, b"not a dir").unwrap();

        let store = store_in(tmp.path());
        let err = store.ensure_directory().await.unwrap_err();
        assert!(matches!(err, StoreError::Filesystem { .. }));
    }

    #[tokio::test]
    async fn test_write_formats_json() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(tmp.path());
        store.ensure_directory().await.unwrap();

        let raw = br#"{"streamSource":1,"value":{"ENTRY_REVEAL":{"x":1}}}"#;
        let path = store.write("ENTRY_REVEAL", raw).await.unwrap();
        assert_eq!(path, store.directory().join("ENTRY_REVEAL.json"));

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("\n\t\"streamSource\": 1"));
        assert_eq!(
            serde_json::from_str::<Value>(&written).unwrap(),
            serde_json::from_slice::<Value>(raw).unwrap()
        );
    }

    #[tokio::test]
    async fn test_write_invalid_json_verbatim() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(tmp.path());
        store.ensure_directory().await.unwrap();

        let path = store.write("STATE_CHANGE", b"{oops").await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"{oops");
    }

    #[tokio::test]
    async fn test_overwrite_keeps_latest_only() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(tmp.path());
        store.ensure_directory().await.unwrap();

        store.write("NODE_MESSAGE", br#"{"n":1,"padding":"a long first payload"}"#).await.unwrap();
        store.write("NODE_MESSAGE", br#"{"n":2}"#).await.unwrap();
        store.write("NODE_MESSAGE", br#"{"n":2}"#).await.unwrap();

        let entries: Vec<_> = std::fs::read_dir(store.directory()).unwrap().collect();
        assert_eq!(entries.len(), 1, "temp files must not linger");

        let value: Value =
            serde_json::from_slice(&std::fs::read(store.directory().join("NODE_MESSAGE.json")).unwrap())
                .unwrap();
        assert_eq!(value, serde_json::json!({ "n": 2 }));
    }

    #[tokio::test]
    async fn test_in_place_mode() {
        let tmp = tempfile::tempdir().unwrap();
        let store = OutputStore::new(&OutputConfig {
            directory: tmp.path().to_string_lossy().into_owned(),
            atomic_writes: false,
            ..OutputConfig::default()
        });

        store.write("CHAIN_COMMIT", b"[1, 2, 3, 4, 5, 6]").await.unwrap();
        store.write("CHAIN_COMMIT", b"[]").await.unwrap();
        assert_eq!(std::fs::read(tmp.path().join("CHAIN_COMMIT.json")).unwrap(), b"[]");
    }

    #[tokio::test]
    async fn test_write_without_directory_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(tmp.path());

        let err = store.write("NODE_MESSAGE", b"{}").await.unwrap_err();
        assert!(matches!(err, StoreError::Filesystem { .. }));
    }

    #[tokio::test]
    async fn test_rejects_escaping_categories() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(tmp.path());
        store.ensure_directory().await.unwrap();

        for bad in ["", ".", "..", "../escape", "a/b", "a\\b", "nul\0"] {
            let err = store.write(bad, b"{}").await.unwrap_err();
            assert!(matches!(err, StoreError::InvalidCategory(_)), "{:?} accepted", bad);
        }
        assert!(!tmp.path().join("escape.json").exists());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writes_same_category() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Arc::new(store_in(tmp.path()));
        store.ensure_directory().await.unwrap();

        let mut handles = Vec::new();
        for i in 0..32 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let body = format!(r#"{{"writer":{},"data":"{}"}}"#, i, "x".repeat(i * 64));
                store.write("PROCESS_MESSAGE", body.as_bytes()).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let written = std::fs::read(store.directory().join("PROCESS_MESSAGE.json")).unwrap();
        let value: Value = serde_json::from_slice(&written).unwrap();
        let writer = value["writer"].as_u64().unwrap() as usize;
        assert_eq!(value["data"].as_str().unwrap().len(), writer * 64);
        assert!(store.locks.is_empty());
    }

    #[tokio::test]
    async fn test_locks_released_after_write() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(tmp.path());
        store.ensure_directory().await.unwrap();

        for i in 0..100 {
            store.write(&format!("CATEGORY_{i}"), b"{}").await.unwrap();
        }
        assert!(store.locks.is_empty());

        let _ = store.write("..", b"{}").await.unwrap_err();
        assert!(store.locks.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_permission_policy() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(tmp.path());
        store.ensure_directory().await.unwrap();
        let path = store.write("ENTRY_COMMIT", b"{}").await.unwrap();

        let file_mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        let dir_mode = std::fs::metadata(store.directory()).unwrap().permissions().mode() & 0o777;
        assert_eq!(file_mode & !0o640, 0, "file mode {:o} too permissive", file_mode);
        assert_eq!(dir_mode & !0o750, 0, "dir mode {:o} too permissive", dir_mode);
    }
}
