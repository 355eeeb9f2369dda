//! Storage abstractions for collector history.
//!
//! Every collector owns one history: the ordered list of records it has
//! already reported. The pipeline loads it before diffing and rewrites it
//! in full after a successful delivery.
//!
//! ## Directory Structure
//!
//! ```text
//! .nc_cache/
//! ├── bolha_cached.json
//! └── avtonet_cached.json
//! ```

pub mod local;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::Record;

// Re-export for convenience
pub use local::JsonCacheStore;

/// On-disk representation of one collector's history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryFile {
    /// ISO 8601 timestamp of last update
    pub updated_at: DateTime<Utc>,
    /// Total record count
    pub count: usize,
    /// The records array, oldest first
    pub records: Vec<Record>,
}

impl HistoryFile {
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            updated_at: Utc::now(),
            count: records.len(),
            records,
        }
    }
}

/// Summary of one stored history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryInfo {
    pub collector: String,
    pub count: usize,
}

/// Trait for history storage backends.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Load the history of a collector.
    ///
    /// Returns an empty list when no history exists yet. Any other failure,
    /// including unreadable or malformed data, is a storage error.
    async fn load(&self, collector: &str) -> Result<Vec<Record>>;

    /// Replace the stored history of a collector.
    async fn persist(&self, collector: &str, records: &[Record]) -> Result<()>;
}
