//! Data access seams of the queue view.
//!
//! Each DAO is a capability over one logical table of the backing
//! column store. Two implementations exist per trait: a durable
//! SQLite-backed one ([`sqlite`]) and an in-memory one ([`memory`]) that
//! doubles as the test harness — both are first-class, selectable
//! through [`crate::config::QueueViewBackendConfig`].

pub mod memory;
pub mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mailrack_common::MailQueueName;

use crate::{
    Result,
    model::{EnqueuedItem, MailKey},
    slicing::{BucketId, Slice, SlicingContext},
};

/// Durable store of one row per enqueued item, keyed by
/// `(queue, bucket, slice start, enqueue id)`.
#[async_trait]
pub trait EnqueuedMailsDao: Send + Sync + std::fmt::Debug {
    /// Write one row at the coordinates captured in `context`.
    ///
    /// Idempotent: inserting the same enqueue id twice leaves exactly
    /// one row, so broker redelivery can retry the whole write path.
    ///
    /// # Errors
    /// If the store rejects the write.
    async fn insert(&self, item: &EnqueuedItem, context: SlicingContext) -> Result<()>;

    /// All rows stored at exactly this partition coordinate, ordered by
    /// enqueue id. Finite; callers re-issue the call to retry.
    ///
    /// # Errors
    /// If the store cannot be read.
    async fn select_enqueued_mails(
        &self,
        queue: &MailQueueName,
        slice: Slice,
        bucket: BucketId,
    ) -> Result<Vec<EnqueuedItem>>;

    /// Bulk-remove every row of one partition coordinate.
    ///
    /// Pure space reclamation for partitions already proven fully
    /// tombstoned and pre-cursor; correctness never depends on it.
    ///
    /// # Errors
    /// If the store rejects the delete.
    async fn delete_bucket(
        &self,
        queue: &MailQueueName,
        slice: Slice,
        bucket: BucketId,
    ) -> Result<()>;
}

/// Tombstone set of `(queue, mail key)` pairs.
#[async_trait]
pub trait DeletedMailsDao: Send + Sync + std::fmt::Debug {
    /// Record a logical deletion. Idempotent; tombstones are permanent.
    ///
    /// # Errors
    /// If the store rejects the write.
    async fn mark_as_deleted(&self, queue: &MailQueueName, mail_key: &MailKey) -> Result<()>;

    /// Whether the pair has been tombstoned. `false` for any key never
    /// marked, including keys of other queues.
    ///
    /// # Errors
    /// If the store cannot be read.
    async fn is_deleted(&self, queue: &MailQueueName, mail_key: &MailKey) -> Result<bool>;
}

/// Per-queue monotonic cursor bounding where browsing must start.
#[async_trait]
pub trait BrowseStartDao: Send + Sync + std::fmt::Debug {
    /// The current cursor, or `None` if the queue was never initialized.
    ///
    /// # Errors
    /// If the store cannot be read.
    async fn find_browse_start(&self, queue: &MailQueueName) -> Result<Option<DateTime<Utc>>>;

    /// Establish the cursor at the earliest known enqueue time.
    ///
    /// Takes effect only if no value exists yet or `instant` predates
    /// the stored value — an atomic conditional write, so concurrent
    /// enqueues converge to the true minimum without coordination.
    ///
    /// # Errors
    /// If the store rejects the write.
    async fn insert_initial_browse_start(
        &self,
        queue: &MailQueueName,
        instant: DateTime<Utc>,
    ) -> Result<()>;

    /// Advance the cursor, once no live content remains before `instant`.
    ///
    /// # Errors
    /// If the store rejects the write.
    async fn update_browse_start(
        &self,
        queue: &MailQueueName,
        instant: DateTime<Utc>,
    ) -> Result<()>;

    /// Every queue's cursor. Feeds queue enumeration and the staleness
    /// health check.
    ///
    /// # Errors
    /// If the store cannot be read.
    async fn list_browse_starts(&self) -> Result<Vec<(MailQueueName, DateTime<Utc>)>>;

    /// Drop the cursor when the whole queue is destroyed.
    ///
    /// # Errors
    /// If the store rejects the delete.
    async fn remove_browse_start(&self, queue: &MailQueueName) -> Result<()>;
}

/// Per-queue monotonic cursor bounding safe blob garbage collection.
#[async_trait]
pub trait ContentStartDao: Send + Sync + std::fmt::Debug {
    /// The current cursor, or `None` if the queue was never initialized.
    ///
    /// # Errors
    /// If the store cannot be read.
    async fn find_content_start(&self, queue: &MailQueueName) -> Result<Option<DateTime<Utc>>>;

    /// Establish the cursor at the earliest known enqueue time; same
    /// conditional-minimum semantics as the browse start.
    ///
    /// # Errors
    /// If the store rejects the write.
    async fn insert_initial_content_start(
        &self,
        queue: &MailQueueName,
        instant: DateTime<Utc>,
    ) -> Result<()>;

    /// Advance the cursor, once no metadata references content before
    /// `instant`.
    ///
    /// # Errors
    /// If the store rejects the write.
    async fn update_content_start(
        &self,
        queue: &MailQueueName,
        instant: DateTime<Utc>,
    ) -> Result<()>;

    /// Drop the cursor when the whole queue is destroyed.
    ///
    /// # Errors
    /// If the store rejects the delete.
    async fn remove_content_start(&self, queue: &MailQueueName) -> Result<()>;
}

/// The four DAOs of one backing store, handed around as a bundle.
#[derive(Debug, Clone)]
pub struct QueueViewDaos {
    /// Index rows.
    pub enqueued_mails: Arc<dyn EnqueuedMailsDao>,
    /// Tombstones.
    pub deleted_mails: Arc<dyn DeletedMailsDao>,
    /// Browse cursor.
    pub browse_start: Arc<dyn BrowseStartDao>,
    /// Content cursor.
    pub content_start: Arc<dyn ContentStartDao>,
}
