//! The mail queue itself: broker, blob store, and queue view combined.

use std::sync::Arc;

use chrono::Utc;
use futures_util::Stream;
use mailrack_blob::{BlobStore, BlobStoreError, BucketName};
use mailrack_broker::{Broker, DeliveryTag};
use mailrack_common::{Envelope, MailQueueName};

use crate::{
    Result,
    model::{EnqueueId, EnqueuedItem, MailKey, MimeMessagePartsId},
    view::MailQueueView,
};

/// Blob bucket holding queued message content.
pub const CONTENT_BUCKET: &str = "mail-queue-content";

/// One mail taken from the queue, awaiting acknowledgement.
///
/// Hand it back to [`MailQueue::ack`] once delivered, or
/// [`MailQueue::nack`] to have the broker redeliver it.
#[derive(Debug, Clone)]
pub struct DequeuedMail {
    /// The index entry.
    pub item: EnqueuedItem,
    /// Message headers.
    pub headers: Arc<[u8]>,
    /// Message body.
    pub body: Arc<[u8]>,
    tag: DeliveryTag,
}

/// A single logical mail queue.
///
/// The broker provides ordering and at-least-once consumption; the blob
/// store holds the message bytes; the queue view keeps the whole thing
/// browsable and selectively deletable. Enqueue writes blobs and the
/// index before publishing, so a browse issued after enqueue returns
/// sees the item. Acknowledging a dequeued mail tombstones it in the
/// view, keeping browse results and broker state convergent.
#[derive(Debug, Clone)]
pub struct MailQueue {
    name: MailQueueName,
    broker: Arc<dyn Broker>,
    blobs: Arc<dyn BlobStore>,
    bucket: BucketName,
    view: Arc<MailQueueView>,
}

impl MailQueue {
    /// Declare the queue on the broker and assemble the facade.
    ///
    /// # Errors
    /// If the broker rejects the queue declaration.
    pub async fn new(
        name: MailQueueName,
        broker: Arc<dyn Broker>,
        blobs: Arc<dyn BlobStore>,
        view: Arc<MailQueueView>,
    ) -> Result<Self> {
        broker.declare_queue(&name).await?;

        Ok(Self {
            name,
            broker,
            blobs,
            bucket: BucketName::of(CONTENT_BUCKET),
            view,
        })
    }

    /// The queue's name.
    #[must_use]
    pub const fn name(&self) -> &MailQueueName {
        &self.name
    }

    /// Enqueue a mail.
    ///
    /// Saves the header and body blobs, indexes the item in the view,
    /// then publishes a reference through the broker. Failures
    /// propagate; retrying the whole call with the same mail is safe —
    /// the retry mints a fresh [`EnqueueId`], and dequeue dedups through
    /// the mail key's tombstone once the mail is acknowledged.
    ///
    /// # Errors
    /// If a blob write, the index write, or the publish fails.
    pub async fn enqueue(
        &self,
        mail_key: MailKey,
        envelope: Envelope,
        headers: &[u8],
        body: &[u8],
    ) -> Result<EnqueueId> {
        let header_blob_id = self.blobs.save(&self.bucket, headers).await?;
        let body_blob_id = self.blobs.save(&self.bucket, body).await?;

        let item = EnqueuedItem {
            queue_name: self.name.clone(),
            enqueue_id: EnqueueId::generate(),
            mail_key,
            envelope,
            parts_id: MimeMessagePartsId {
                header_blob_id,
                body_blob_id,
            },
            enqueued_time: Utc::now(),
        };

        self.view.store_mail(&item).await?;

        let payload = item.to_bytes()?;
        self.broker.publish(&self.name, Arc::from(payload)).await?;

        tracing::debug!(
            queue = %self.name,
            enqueue_id = %item.enqueue_id,
            mail_key = %item.mail_key,
            "Enqueued mail"
        );

        Ok(item.enqueue_id)
    }

    /// Take the next mail off the queue, or `None` when it is drained.
    ///
    /// Payloads whose mail key is already tombstoned (deleted by an
    /// operator, or acknowledged through another enqueue record) are
    /// acked and skipped. A live index entry whose blobs have gone
    /// missing indicates an earlier half-finished cleanup; the entry is
    /// removed and the mail treated as absent rather than surfaced as
    /// an error.
    ///
    /// # Errors
    /// If the broker, index, or blob store fails.
    pub async fn dequeue(&self) -> Result<Option<DequeuedMail>> {
        loop {
            let Some(delivery) = self.broker.consume(&self.name).await? else {
                return Ok(None);
            };

            let item = EnqueuedItem::from_bytes(&delivery.payload)?;

            if !self.view.is_present(&self.name, &item.mail_key).await? {
                self.broker.ack(&self.name, delivery.tag).await?;
                continue;
            }

            let Some(headers) = self
                .read_content(&item, &item.parts_id.header_blob_id, delivery.tag)
                .await?
            else {
                continue;
            };
            let Some(body) = self
                .read_content(&item, &item.parts_id.body_blob_id, delivery.tag)
                .await?
            else {
                continue;
            };

            return Ok(Some(DequeuedMail {
                item,
                headers,
                body,
                tag: delivery.tag,
            }));
        }
    }

    /// Acknowledge a dequeued mail: tombstone it in the view, then ack
    /// the broker delivery.
    ///
    /// Tombstoning first keeps the two stores convergent — if the
    /// broker ack is lost, the redelivered copy is skipped as deleted.
    ///
    /// # Errors
    /// If the tombstone write or the broker ack fails.
    pub async fn ack(&self, mail: DequeuedMail) -> Result<()> {
        self.view
            .consider_deleted(&self.name, &mail.item.mail_key)
            .await?;
        self.broker.ack(&self.name, mail.tag).await?;
        Ok(())
    }

    /// Return a dequeued mail to the broker for redelivery.
    ///
    /// # Errors
    /// If the broker nack fails.
    pub async fn nack(&self, mail: DequeuedMail) -> Result<()> {
        self.broker.nack(&self.name, mail.tag).await?;
        Ok(())
    }

    /// The live items of this queue, lazily.
    pub fn browse(&self) -> impl Stream<Item = Result<EnqueuedItem>> + Send + use<> {
        self.view.browse(&self.name)
    }

    async fn read_content(
        &self,
        item: &EnqueuedItem,
        blob_id: &mailrack_blob::BlobId,
        tag: DeliveryTag,
    ) -> Result<Option<Arc<[u8]>>> {
        match self.blobs.read(&self.bucket, blob_id).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(BlobStoreError::NotFound { .. }) => {
                tracing::warn!(
                    queue = %self.name,
                    mail_key = %item.mail_key,
                    %blob_id,
                    "Missing blob for queued mail; removing the orphaned index entry"
                );
                self.view
                    .consider_deleted(&self.name, &item.mail_key)
                    .await?;
                self.broker.ack(&self.name, tag).await?;
                Ok(None)
            }
            Err(error) => Err(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use futures_util::TryStreamExt;
    use mailrack_blob::MemoryBlobStore;
    use mailrack_broker::MemoryBroker;
    use mailrack_common::MailAddress;

    use super::*;
    use crate::{config::QueueViewConfig, dao::memory::MemoryQueueView};

    fn envelope() -> Envelope {
        Envelope::new(
            Some(MailAddress::parse("alice@example.com").expect("valid address")),
            vec![MailAddress::parse("bob@example.com").expect("valid address")],
        )
    }

    async fn queue() -> (MailQueue, Arc<MemoryBlobStore>) {
        let backend = MemoryQueueView::new();
        let config = QueueViewConfig {
            update_pace: 1,
            ..QueueViewConfig::default()
        };
        let view = Arc::new(MailQueueView::new(&backend.daos(), config).expect("valid config"));
        let blobs = Arc::new(MemoryBlobStore::new());

        let queue = MailQueue::new(
            MailQueueName::of("outbound"),
            Arc::new(MemoryBroker::new()),
            blobs.clone(),
            view,
        )
        .await
        .expect("declare queue");

        (queue, blobs)
    }

    #[tokio::test]
    async fn enqueue_dequeue_ack_round_trip() {
        let (queue, _blobs) = queue().await;

        queue
            .enqueue(MailKey::of("mail-1"), envelope(), b"Subject: hi", b"hello")
            .await
            .expect("enqueue");

        let mail = queue.dequeue().await.expect("dequeue").expect("mail present");
        assert_eq!(mail.item.mail_key, MailKey::of("mail-1"));
        assert_eq!(mail.headers.as_ref(), b"Subject: hi");
        assert_eq!(mail.body.as_ref(), b"hello");

        queue.ack(mail).await.expect("ack");

        // Acknowledged mail is gone from both the broker and the view
        assert!(queue.dequeue().await.expect("dequeue").is_none());
        let browsed: Vec<EnqueuedItem> = queue.browse().try_collect().await.expect("browse");
        assert!(browsed.is_empty());
    }

    #[tokio::test]
    async fn enqueued_mail_is_immediately_browsable() {
        let (queue, _blobs) = queue().await;

        queue
            .enqueue(MailKey::of("mail-1"), envelope(), b"h", b"b")
            .await
            .expect("enqueue");

        let browsed: Vec<EnqueuedItem> = queue.browse().try_collect().await.expect("browse");
        assert_eq!(browsed.len(), 1);
        assert_eq!(browsed[0].envelope, envelope());
    }

    #[tokio::test]
    async fn nacked_mail_is_redelivered() {
        let (queue, _blobs) = queue().await;

        queue
            .enqueue(MailKey::of("mail-1"), envelope(), b"h", b"b")
            .await
            .expect("enqueue");

        let mail = queue.dequeue().await.expect("dequeue").expect("mail present");
        queue.nack(mail).await.expect("nack");

        let redelivered = queue.dequeue().await.expect("dequeue").expect("redelivered");
        assert_eq!(redelivered.item.mail_key, MailKey::of("mail-1"));
    }

    #[tokio::test]
    async fn operator_deleted_mail_is_skipped_on_dequeue() {
        let (queue, _blobs) = queue().await;

        queue
            .enqueue(MailKey::of("mail-1"), envelope(), b"h", b"b")
            .await
            .expect("enqueue");

        // Operator deletes through the view while the broker copy is
        // still pending
        queue
            .view
            .consider_deleted(queue.name(), &MailKey::of("mail-1"))
            .await
            .expect("delete");

        assert!(queue.dequeue().await.expect("dequeue").is_none());
    }

    #[tokio::test]
    async fn missing_blob_self_heals_instead_of_erroring() {
        let (queue, blobs) = queue().await;

        queue
            .enqueue(MailKey::of("mail-1"), envelope(), b"h", b"b")
            .await
            .expect("enqueue");

        // Simulate a half-finished earlier cleanup
        let browsed: Vec<EnqueuedItem> = queue.browse().try_collect().await.expect("browse");
        blobs
            .delete(
                &BucketName::of(CONTENT_BUCKET),
                &browsed[0].parts_id.body_blob_id,
            )
            .await
            .expect("delete blob");

        assert!(queue.dequeue().await.expect("dequeue").is_none());

        // The orphaned index entry was removed
        let browsed: Vec<EnqueuedItem> = queue.browse().try_collect().await.expect("browse");
        assert!(browsed.is_empty());
    }
}
