//! In-memory DAO implementations.
//!
//! Test doubles for the durable store, and usable for transient
//! single-process deployments. Partitions live in concurrent maps; the
//! conditional cursor writes rely on the map's per-entry locking, so
//! they are atomic the same way the durable store's conditional upserts
//! are.

use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use mailrack_common::MailQueueName;

use crate::{
    Result,
    dao::{
        BrowseStartDao, ContentStartDao, DeletedMailsDao, EnqueuedMailsDao, QueueViewDaos,
    },
    model::{EnqueueId, EnqueuedItem, MailKey},
    slicing::{BucketId, Slice, SlicingContext},
};

type PartitionKey = (MailQueueName, i64, u32);

/// In-memory store of enqueued-mail rows.
///
/// One `BTreeMap` per partition coordinate keeps rows ordered by enqueue
/// id, matching the durable store's clustering order.
#[derive(Debug, Clone, Default)]
pub struct MemoryEnqueuedMailsDao {
    partitions: Arc<DashMap<PartitionKey, BTreeMap<EnqueueId, EnqueuedItem>>>,
}

impl MemoryEnqueuedMailsDao {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn partition_key(queue: &MailQueueName, slice_start_ms: i64, bucket: BucketId) -> PartitionKey {
    (queue.clone(), slice_start_ms, bucket.value())
}

#[async_trait]
impl EnqueuedMailsDao for MemoryEnqueuedMailsDao {
    async fn insert(&self, item: &EnqueuedItem, context: SlicingContext) -> Result<()> {
        let key = partition_key(
            &item.queue_name,
            context.time_range_start().timestamp_millis(),
            context.bucket_id(),
        );

        self.partitions
            .entry(key)
            .or_default()
            .entry(item.enqueue_id.clone())
            .or_insert_with(|| item.clone());

        Ok(())
    }

    async fn select_enqueued_mails(
        &self,
        queue: &MailQueueName,
        slice: Slice,
        bucket: BucketId,
    ) -> Result<Vec<EnqueuedItem>> {
        let key = partition_key(queue, slice.start_millis(), bucket);

        Ok(self
            .partitions
            .get(&key)
            .map(|partition| partition.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn delete_bucket(
        &self,
        queue: &MailQueueName,
        slice: Slice,
        bucket: BucketId,
    ) -> Result<()> {
        self.partitions
            .remove(&partition_key(queue, slice.start_millis(), bucket));
        Ok(())
    }
}

/// In-memory tombstone set.
#[derive(Debug, Clone, Default)]
pub struct MemoryDeletedMailsDao {
    tombstones: Arc<DashMap<(MailQueueName, MailKey), ()>>,
}

impl MemoryDeletedMailsDao {
    /// Create a new empty tombstone set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DeletedMailsDao for MemoryDeletedMailsDao {
    async fn mark_as_deleted(&self, queue: &MailQueueName, mail_key: &MailKey) -> Result<()> {
        self.tombstones
            .insert((queue.clone(), mail_key.clone()), ());
        Ok(())
    }

    async fn is_deleted(&self, queue: &MailQueueName, mail_key: &MailKey) -> Result<bool> {
        Ok(self
            .tombstones
            .contains_key(&(queue.clone(), mail_key.clone())))
    }
}

/// Shared cursor map behind both per-queue cursor DAOs.
#[derive(Debug, Clone, Default)]
struct CursorMap {
    cursors: Arc<DashMap<MailQueueName, DateTime<Utc>>>,
}

impl CursorMap {
    fn find(&self, queue: &MailQueueName) -> Option<DateTime<Utc>> {
        self.cursors.get(queue).map(|entry| *entry.value())
    }

    // The entry guard holds the shard lock, so the minimum-tracking
    // update is atomic with respect to concurrent writers.
    fn insert_initial(&self, queue: &MailQueueName, instant: DateTime<Utc>) {
        self.cursors
            .entry(queue.clone())
            .and_modify(|current| {
                if instant < *current {
                    *current = instant;
                }
            })
            .or_insert(instant);
    }

    fn update(&self, queue: &MailQueueName, instant: DateTime<Utc>) {
        self.cursors.insert(queue.clone(), instant);
    }

    fn list(&self) -> Vec<(MailQueueName, DateTime<Utc>)> {
        self.cursors
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect()
    }

    fn remove(&self, queue: &MailQueueName) {
        self.cursors.remove(queue);
    }
}

/// In-memory browse-start cursor store.
#[derive(Debug, Clone, Default)]
pub struct MemoryBrowseStartDao {
    cursors: CursorMap,
}

impl MemoryBrowseStartDao {
    /// Create a new empty cursor store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BrowseStartDao for MemoryBrowseStartDao {
    async fn find_browse_start(&self, queue: &MailQueueName) -> Result<Option<DateTime<Utc>>> {
        Ok(self.cursors.find(queue))
    }

    async fn insert_initial_browse_start(
        &self,
        queue: &MailQueueName,
        instant: DateTime<Utc>,
    ) -> Result<()> {
        self.cursors.insert_initial(queue, instant);
        Ok(())
    }

    async fn update_browse_start(
        &self,
        queue: &MailQueueName,
        instant: DateTime<Utc>,
    ) -> Result<()> {
        self.cursors.update(queue, instant);
        Ok(())
    }

    async fn list_browse_starts(&self) -> Result<Vec<(MailQueueName, DateTime<Utc>)>> {
        Ok(self.cursors.list())
    }

    async fn remove_browse_start(&self, queue: &MailQueueName) -> Result<()> {
        self.cursors.remove(queue);
        Ok(())
    }
}

/// In-memory content-start cursor store.
#[derive(Debug, Clone, Default)]
pub struct MemoryContentStartDao {
    cursors: CursorMap,
}

impl MemoryContentStartDao {
    /// Create a new empty cursor store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ContentStartDao for MemoryContentStartDao {
    async fn find_content_start(&self, queue: &MailQueueName) -> Result<Option<DateTime<Utc>>> {
        Ok(self.cursors.find(queue))
    }

    async fn insert_initial_content_start(
        &self,
        queue: &MailQueueName,
        instant: DateTime<Utc>,
    ) -> Result<()> {
        self.cursors.insert_initial(queue, instant);
        Ok(())
    }

    async fn update_content_start(
        &self,
        queue: &MailQueueName,
        instant: DateTime<Utc>,
    ) -> Result<()> {
        self.cursors.update(queue, instant);
        Ok(())
    }

    async fn remove_content_start(&self, queue: &MailQueueName) -> Result<()> {
        self.cursors.remove(queue);
        Ok(())
    }
}

/// The complete in-memory backend.
#[derive(Debug, Clone, Default)]
pub struct MemoryQueueView {
    enqueued_mails: MemoryEnqueuedMailsDao,
    deleted_mails: MemoryDeletedMailsDao,
    browse_start: MemoryBrowseStartDao,
    content_start: MemoryContentStartDao,
}

impl MemoryQueueView {
    /// Create a fresh, empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand out the DAO bundle for this backend.
    #[must_use]
    pub fn daos(&self) -> QueueViewDaos {
        QueueViewDaos {
            enqueued_mails: Arc::new(self.enqueued_mails.clone()),
            deleted_mails: Arc::new(self.deleted_mails.clone()),
            browse_start: Arc::new(self.browse_start.clone()),
            content_start: Arc::new(self.content_start.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::TimeZone;
    use mailrack_blob::BlobId;
    use mailrack_common::Envelope;

    use super::*;
    use crate::model::MimeMessagePartsId;

    const HOUR: Duration = Duration::from_secs(3600);

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).single().expect("valid timestamp")
    }

    fn item(queue: &MailQueueName, key: &str, enqueued_time: DateTime<Utc>) -> EnqueuedItem {
        EnqueuedItem {
            queue_name: queue.clone(),
            enqueue_id: EnqueueId::generate(),
            mail_key: MailKey::of(key),
            envelope: Envelope::default(),
            parts_id: MimeMessagePartsId {
                header_blob_id: BlobId::generate(),
                body_blob_id: BlobId::generate(),
            },
            enqueued_time,
        }
    }

    #[tokio::test]
    async fn select_returns_only_the_requested_bucket() {
        let dao = MemoryEnqueuedMailsDao::new();
        let queue = MailQueueName::of("outbound");
        let slice = Slice::of(at(7200), HOUR);

        let in_bucket_ten = item(&queue, "mail-1", at(7200));
        dao.insert(
            &in_bucket_ten,
            SlicingContext::of(BucketId::new(10), slice),
        )
        .await
        .expect("insert");
        dao.insert(
            &item(&queue, "mail-2", at(7201)),
            SlicingContext::of(BucketId::new(3), slice),
        )
        .await
        .expect("insert");

        let rows = dao
            .select_enqueued_mails(&queue, slice, BucketId::new(10))
            .await
            .expect("select");
        assert_eq!(rows, vec![in_bucket_ten]);
    }

    #[tokio::test]
    async fn insert_is_idempotent_on_enqueue_id() {
        let dao = MemoryEnqueuedMailsDao::new();
        let queue = MailQueueName::of("outbound");
        let slice = Slice::of(at(7200), HOUR);
        let context = SlicingContext::of(BucketId::new(0), slice);

        let mail = item(&queue, "mail-1", at(7200));
        dao.insert(&mail, context).await.expect("insert");
        dao.insert(&mail, context).await.expect("reinsert");

        let rows = dao
            .select_enqueued_mails(&queue, slice, BucketId::new(0))
            .await
            .expect("select");
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn delete_bucket_removes_all_rows_of_the_coordinate() {
        let dao = MemoryEnqueuedMailsDao::new();
        let queue = MailQueueName::of("outbound");
        let slice = Slice::of(at(7200), HOUR);
        let context = SlicingContext::of(BucketId::new(0), slice);

        dao.insert(&item(&queue, "mail-1", at(7200)), context)
            .await
            .expect("insert");
        dao.insert(&item(&queue, "mail-2", at(7201)), context)
            .await
            .expect("insert");

        dao.delete_bucket(&queue, slice, BucketId::new(0))
            .await
            .expect("delete bucket");

        let rows = dao
            .select_enqueued_mails(&queue, slice, BucketId::new(0))
            .await
            .expect("select");
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn tombstones_are_isolated_by_queue_and_key() {
        let dao = MemoryDeletedMailsDao::new();
        let q1 = MailQueueName::of("q1");
        let q2 = MailQueueName::of("q2");
        let k1 = MailKey::of("k1");
        let k2 = MailKey::of("k2");

        dao.mark_as_deleted(&q1, &k1).await.expect("mark");

        assert!(dao.is_deleted(&q1, &k1).await.expect("lookup"));
        assert!(!dao.is_deleted(&q2, &k1).await.expect("lookup"));
        assert!(!dao.is_deleted(&q1, &k2).await.expect("lookup"));
    }

    #[tokio::test]
    async fn initial_browse_start_keeps_the_minimum() {
        let dao = MemoryBrowseStartDao::new();
        let queue = MailQueueName::of("q1");
        let t0 = at(1000);

        dao.insert_initial_browse_start(&queue, t0)
            .await
            .expect("insert");
        dao.insert_initial_browse_start(&queue, t0 + chrono::TimeDelta::seconds(10))
            .await
            .expect("insert later");

        assert_eq!(dao.find_browse_start(&queue).await.expect("find"), Some(t0));
    }

    #[tokio::test]
    async fn initial_browse_start_moves_back_for_earlier_instants() {
        let dao = MemoryBrowseStartDao::new();
        let queue = MailQueueName::of("q1");

        dao.insert_initial_browse_start(&queue, at(2000))
            .await
            .expect("insert");
        dao.insert_initial_browse_start(&queue, at(1000))
            .await
            .expect("insert earlier");

        assert_eq!(
            dao.find_browse_start(&queue).await.expect("find"),
            Some(at(1000))
        );
    }

    #[tokio::test]
    async fn update_browse_start_overwrites() {
        let dao = MemoryBrowseStartDao::new();
        let queue = MailQueueName::of("q1");

        dao.insert_initial_browse_start(&queue, at(1000))
            .await
            .expect("insert");
        dao.update_browse_start(&queue, at(5000))
            .await
            .expect("update");

        assert_eq!(
            dao.find_browse_start(&queue).await.expect("find"),
            Some(at(5000))
        );
    }

    #[tokio::test]
    async fn concurrent_initial_inserts_converge_to_the_minimum() {
        let dao = MemoryBrowseStartDao::new();
        let queue = MailQueueName::of("q1");

        let mut handles = Vec::new();
        for offset in (0..50).rev() {
            let dao = dao.clone();
            let queue = queue.clone();
            handles.push(tokio::spawn(async move {
                dao.insert_initial_browse_start(&queue, at(1000 + offset))
                    .await
            }));
        }
        for handle in handles {
            handle.await.expect("task").expect("insert");
        }

        assert_eq!(
            dao.find_browse_start(&queue).await.expect("find"),
            Some(at(1000))
        );
    }
}
