//! Write path: indexing a newly enqueued mail.

use std::sync::Arc;

use crate::{
    Result,
    config::QueueViewConfig,
    dao::{BrowseStartDao, ContentStartDao, EnqueuedMailsDao, QueueViewDaos},
    model::EnqueuedItem,
    slicing::{BucketId, Slice, SlicingContext},
};

/// Persists one row per enqueued item and keeps the per-queue cursors
/// seeded at the earliest known enqueue time.
#[derive(Debug, Clone)]
pub struct MailQueueMailStore {
    enqueued_mails: Arc<dyn EnqueuedMailsDao>,
    browse_start: Arc<dyn BrowseStartDao>,
    content_start: Arc<dyn ContentStartDao>,
    config: QueueViewConfig,
}

impl MailQueueMailStore {
    /// Build the write path over a DAO bundle.
    #[must_use]
    pub fn new(daos: &QueueViewDaos, config: QueueViewConfig) -> Self {
        Self {
            enqueued_mails: daos.enqueued_mails.clone(),
            browse_start: daos.browse_start.clone(),
            content_start: daos.content_start.clone(),
            config,
        }
    }

    /// Index `item`.
    ///
    /// Chooses the storage coordinates from the item's enqueue time,
    /// writes the row, then seeds both cursors with the enqueue time.
    /// The cursor writes are minimum-tracking, so concurrent enqueues
    /// across processes converge to the true minimum. After this
    /// returns, the item is visible to any browse starting at or before
    /// its slice.
    ///
    /// # Errors
    /// Any failure propagates to the caller; the broker's redelivery is
    /// expected to retry the whole enqueue, which is safe because the
    /// row insert is idempotent on the enqueue id.
    pub async fn store(&self, item: &EnqueuedItem) -> Result<()> {
        let slice = Slice::of(item.enqueued_time, self.config.slice_window());
        let bucket = BucketId::of(&item.enqueue_id, self.config.bucket_count);
        let context = SlicingContext::of(bucket, slice);

        self.enqueued_mails.insert(item, context).await?;

        self.browse_start
            .insert_initial_browse_start(&item.queue_name, item.enqueued_time)
            .await?;
        self.content_start
            .insert_initial_content_start(&item.queue_name, item.enqueued_time)
            .await?;

        tracing::debug!(
            queue = %item.queue_name,
            enqueue_id = %item.enqueue_id,
            bucket = %context.bucket_id(),
            "Indexed enqueued mail"
        );

        Ok(())
    }
}
