//! Local filesystem storage implementation.
//!
//! One JSON file per collector, rewritten atomically on every persist.
//!
//! ## Storage Layout
//!
//! ```text
//! {root}/
//! └── {collector}_cached.json
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::Record;
use crate::storage::{HistoryFile, HistoryInfo, HistoryStore};

const CACHE_SUFFIX: &str = "_cached.json";

/// Accepted history layouts: the current wrapped form, or a bare array of
/// records as written by older versions.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredHistory {
    Wrapped(HistoryFile),
    Bare(Vec<Record>),
}

impl StoredHistory {
    fn into_records(self) -> Vec<Record> {
        match self {
            StoredHistory::Wrapped(file) => file.records,
            StoredHistory::Bare(records) => records,
        }
    }
}

/// Local filesystem history store.
#[derive(Debug, Clone)]
pub struct JsonCacheStore {
    root_dir: PathBuf,
}

impl JsonCacheStore {
    /// Create a new store rooted at the given directory.
    ///
    /// The directory is created on first persist.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Path of a collector's history file.
    pub fn path(&self, collector: &str) -> PathBuf {
        self.root_dir.join(format!("{collector}{CACHE_SUFFIX}"))
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.root_dir).await?;

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, path).await
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, path: &Path) -> std::io::Result<Option<Vec<u8>>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// List the collectors that have a stored history.
    pub async fn list(&self) -> Result<Vec<HistoryInfo>> {
        let mut entries = match tokio::fs::read_dir(&self.root_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(AppError::Io(e)),
        };

        let mut infos = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name();
            let Some(collector) = file_name
                .to_str()
                .and_then(|name| name.strip_suffix(CACHE_SUFFIX))
            else {
                continue;
            };
            let count = self.load(collector).await?.len();
            infos.push(HistoryInfo {
                collector: collector.to_string(),
                count,
            });
        }

        infos.sort_by(|a, b| a.collector.cmp(&b.collector));
        Ok(infos)
    }
}

#[async_trait]
impl HistoryStore for JsonCacheStore {
    async fn load(&self, collector: &str) -> Result<Vec<Record>> {
        let path = self.path(collector);
        let bytes = self
            .read_bytes(&path)
            .await
            .map_err(|e| AppError::storage(collector, format!("{}: {e}", path.display())))?;

        match bytes {
            Some(bytes) => {
                let stored: StoredHistory = serde_json::from_slice(&bytes).map_err(|e| {
                    AppError::storage(collector, format!("malformed {}: {e}", path.display()))
                })?;
                Ok(stored.into_records())
            }
            None => {
                log::debug!("No history for {} at {}", collector, path.display());
                Ok(Vec::new())
            }
        }
    }

    async fn persist(&self, collector: &str, records: &[Record]) -> Result<()> {
        let path = self.path(collector);
        let file = HistoryFile::new(records.to_vec());
        let bytes = serde_json::to_vec_pretty(&file)?;

        self.write_bytes(&path, &bytes)
            .await
            .map_err(|e| AppError::storage(collector, format!("{}: {e}", path.display())))?;

        log::info!(
            "History: {} records written to {}",
            file.count,
            path.display()
        );
        Ok(())
    }
}
