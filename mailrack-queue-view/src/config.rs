use std::time::Duration;

use serde::Deserialize;

use crate::{
    QueueViewError, Result,
    dao::{QueueViewDaos, memory::MemoryQueueView, sqlite::SqliteQueueView},
};

/// Tuning knobs of the slicing model and delete-path scan.
///
/// `bucket_count` and `slice_window_secs` shape where rows land;
/// changing them on a live store is safe for rows already written
/// because each row carries the coordinates chosen at write time.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct QueueViewConfig {
    /// Number of hash buckets per slice.
    #[serde(default = "default_bucket_count")]
    pub bucket_count: u32,

    /// Width of one time slice, in seconds.
    #[serde(default = "default_slice_window_secs")]
    pub slice_window_secs: u64,

    /// On average, one delete in `update_pace` runs the browse-start
    /// advancement scan. `1` scans on every delete.
    #[serde(default = "default_update_pace")]
    pub update_pace: u32,
}

const fn default_bucket_count() -> u32 {
    8
}

const fn default_slice_window_secs() -> u64 {
    3600
}

const fn default_update_pace() -> u32 {
    100
}

impl Default for QueueViewConfig {
    fn default() -> Self {
        Self {
            bucket_count: default_bucket_count(),
            slice_window_secs: default_slice_window_secs(),
            update_pace: default_update_pace(),
        }
    }
}

impl QueueViewConfig {
    /// Check that every knob is in its valid range.
    ///
    /// # Errors
    /// If any value is zero.
    pub fn validate(&self) -> Result<()> {
        if self.bucket_count == 0 {
            return Err(QueueViewError::InvalidConfiguration(
                "bucket_count must be at least 1".to_string(),
            ));
        }
        if self.slice_window_secs == 0 {
            return Err(QueueViewError::InvalidConfiguration(
                "slice_window_secs must be at least 1".to_string(),
            ));
        }
        if self.update_pace == 0 {
            return Err(QueueViewError::InvalidConfiguration(
                "update_pace must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// The slice window as a duration.
    #[must_use]
    pub const fn slice_window(&self) -> Duration {
        Duration::from_secs(self.slice_window_secs)
    }
}

/// Runtime selection of the backing store.
///
/// SQLite-backed store in RON config:
/// ```ron
/// backend: Sqlite (
///     path: "/var/lib/mailrack/queue-view.db",
/// ),
/// ```
///
/// In-memory store for testing:
/// ```ron
/// backend: Memory,
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum QueueViewBackendConfig {
    /// Durable SQLite-backed store (production).
    Sqlite {
        /// Filesystem path of the database file.
        path: String,
    },
    /// In-memory store (testing/development).
    Memory,
}

impl QueueViewBackendConfig {
    /// Connect the configured backend and hand out its DAO bundle.
    ///
    /// # Errors
    /// If the durable store cannot be opened or initialized.
    pub async fn into_daos(self) -> Result<QueueViewDaos> {
        match self {
            Self::Sqlite { path } => Ok(SqliteQueueView::connect(&path).await?.daos()),
            Self::Memory => Ok(MemoryQueueView::new().daos()),
        }
    }
}
