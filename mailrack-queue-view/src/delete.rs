//! Delete path: tombstoning and opportunistic cursor advancement.

use std::sync::Arc;

use chrono::Utc;
use mailrack_common::MailQueueName;
use rand::{Rng, seq::SliceRandom};

use crate::{
    Result,
    config::QueueViewConfig,
    dao::{
        BrowseStartDao, ContentStartDao, DeletedMailsDao, EnqueuedMailsDao, QueueViewDaos,
    },
    model::MailKey,
    slicing::{BucketId, Slice},
};

/// Tombstones items and advances the browse-start cursor once whole
/// slices are proven dead.
///
/// Deletion never rewrites partitions: a tombstone suppresses the item
/// from browse results immediately, and the index rows are only swept
/// later, after an advancement scan has confirmed that every row of a
/// slice is tombstoned. The scan is safe to run concurrently from any
/// number of callers — advancement is gated on observing zero live
/// items, so any interleaving converges to the same or a further cursor,
/// never past a live item.
#[derive(Debug, Clone)]
pub struct MailQueueMailDelete {
    enqueued_mails: Arc<dyn EnqueuedMailsDao>,
    deleted_mails: Arc<dyn DeletedMailsDao>,
    browse_start: Arc<dyn BrowseStartDao>,
    content_start: Arc<dyn ContentStartDao>,
    config: QueueViewConfig,
}

impl MailQueueMailDelete {
    /// Build the delete path over a DAO bundle.
    #[must_use]
    pub fn new(daos: &QueueViewDaos, config: QueueViewConfig) -> Self {
        Self {
            enqueued_mails: daos.enqueued_mails.clone(),
            deleted_mails: daos.deleted_mails.clone(),
            browse_start: daos.browse_start.clone(),
            content_start: daos.content_start.clone(),
            config,
        }
    }

    /// Logically delete `mail_key` from `queue`.
    ///
    /// The tombstone write is idempotent; deleting the same key twice is
    /// a no-op. On roughly one call in `update_pace`, the browse-start
    /// advancement scan runs afterwards — its failure is non-fatal and
    /// only logged, since a later delete will re-attempt the scan and
    /// converge.
    ///
    /// # Errors
    /// If the tombstone write fails.
    pub async fn consider_deleted(&self, queue: &MailQueueName, mail_key: &MailKey) -> Result<()> {
        self.deleted_mails.mark_as_deleted(queue, mail_key).await?;

        if self.should_update_browse_start() {
            if let Err(error) = self.update_browse_start(queue).await {
                tracing::warn!(
                    %queue,
                    %error,
                    "Browse start advancement failed; a later delete will catch up"
                );
            }
        }

        Ok(())
    }

    fn should_update_browse_start(&self) -> bool {
        self.config.update_pace <= 1 || rand::rng().random_ratio(1, self.config.update_pace)
    }

    /// Scan forward from the current browse start and advance it past
    /// every slice proven fully tombstoned.
    ///
    /// Swept slices have their buckets bulk-deleted (best-effort) and
    /// the content-start cursor moved up with the browse start: once a
    /// slice holds no live item, no browse can reach content older than
    /// the new cursor. The scan stops at the first slice still holding a
    /// live item, and never considers the slice containing "now" —
    /// producers may still be writing into it.
    ///
    /// # Errors
    /// If the index cannot be read or a cursor write fails.
    pub async fn update_browse_start(&self, queue: &MailQueueName) -> Result<()> {
        let Some(start) = self.browse_start.find_browse_start(queue).await? else {
            return Ok(());
        };

        let window = self.config.slice_window();
        let mut slice = Slice::of(start, window);
        let current = Slice::of(Utc::now(), window);

        while slice < current {
            if !self.is_slice_fully_tombstoned(queue, slice).await? {
                break;
            }

            let next = slice.next();
            self.browse_start.update_browse_start(queue, next.start()).await?;

            tracing::debug!(
                %queue,
                slice_start = %slice.start(),
                "Advanced browse start past fully tombstoned slice"
            );

            self.sweep_slice(queue, slice).await;
            self.content_start
                .update_content_start(queue, next.start())
                .await?;

            slice = next;
        }

        Ok(())
    }

    /// Whether every row in every bucket of `slice` is tombstoned.
    ///
    /// Buckets are visited in a per-call shuffled order so that
    /// concurrent deleters do not all hammer the same bucket sequence
    /// and heat the same partitions.
    async fn is_slice_fully_tombstoned(&self, queue: &MailQueueName, slice: Slice) -> Result<bool> {
        let mut buckets: Vec<u32> = (0..self.config.bucket_count).collect();
        buckets.shuffle(&mut rand::rng());

        for bucket in buckets {
            let rows = self
                .enqueued_mails
                .select_enqueued_mails(queue, slice, BucketId::new(bucket))
                .await?;

            for row in rows {
                if !self.deleted_mails.is_deleted(queue, &row.mail_key).await? {
                    return Ok(false);
                }
            }
        }

        Ok(true)
    }

    // Pure reclamation; a failed bucket delete leaves tombstoned rows
    // that browse already filters out
    async fn sweep_slice(&self, queue: &MailQueueName, slice: Slice) {
        for bucket in BucketId::all(self.config.bucket_count) {
            if let Err(error) = self.enqueued_mails.delete_bucket(queue, slice, bucket).await {
                tracing::debug!(%queue, %bucket, %error, "Bucket sweep failed");
            }
        }
    }
}
