//! Browse path: lazy enumeration of the live queue contents.

use std::{collections::VecDeque, sync::Arc};

use chrono::Utc;
use futures_util::{Stream, stream};
use mailrack_common::MailQueueName;

use crate::{
    Result,
    config::QueueViewConfig,
    dao::{BrowseStartDao, DeletedMailsDao, EnqueuedMailsDao, QueueViewDaos},
    model::EnqueuedItem,
    slicing::{BucketId, Slice},
};

/// Produces the lazy ordered sequence of live items of a queue.
///
/// Browsing walks partition coordinates from the queue's browse start
/// up to the slice containing the moment the call was made: slice by
/// slice, bucket by bucket, fetching one partition at a time and
/// filtering tombstoned rows. The sequence is pull-driven — nothing is
/// fetched until the caller asks for the next element — finite at call
/// time, and not restartable mid-stream.
///
/// Browsing is not a snapshot: items enqueued while the stream is being
/// consumed may or may not appear, and a tombstone racing the read may
/// let a deleted item through once.
#[derive(Debug, Clone)]
pub struct MailQueueBrowser {
    enqueued_mails: Arc<dyn EnqueuedMailsDao>,
    deleted_mails: Arc<dyn DeletedMailsDao>,
    browse_start: Arc<dyn BrowseStartDao>,
    config: QueueViewConfig,
}

enum BrowseState {
    Init,
    Scan {
        slice: Slice,
        end: Slice,
        bucket: u32,
        pending: VecDeque<EnqueuedItem>,
    },
}

impl MailQueueBrowser {
    /// Build the browse path over a DAO bundle.
    #[must_use]
    pub fn new(daos: &QueueViewDaos, config: QueueViewConfig) -> Self {
        Self {
            enqueued_mails: daos.enqueued_mails.clone(),
            deleted_mails: daos.deleted_mails.clone(),
            browse_start: daos.browse_start.clone(),
            config,
        }
    }

    /// The live items of `queue`, lazily.
    ///
    /// A queue with no browse start has never seen an enqueue and
    /// yields an empty stream. Empty intermediate partitions yield
    /// nothing but never terminate the stream early; the stream ends
    /// once the slice containing "now" has been exhausted.
    pub fn browse(
        &self,
        queue: &MailQueueName,
    ) -> impl Stream<Item = Result<EnqueuedItem>> + Send + use<> {
        let enqueued_mails = Arc::clone(&self.enqueued_mails);
        let deleted_mails = Arc::clone(&self.deleted_mails);
        let browse_start = Arc::clone(&self.browse_start);
        let queue = queue.clone();
        let window = self.config.slice_window();
        let bucket_count = self.config.bucket_count;

        stream::try_unfold(BrowseState::Init, move |mut state| {
            let enqueued_mails = Arc::clone(&enqueued_mails);
            let deleted_mails = Arc::clone(&deleted_mails);
            let browse_start = Arc::clone(&browse_start);
            let queue = queue.clone();

            async move {
                loop {
                    state = match state {
                        BrowseState::Init => {
                            let Some(start) = browse_start.find_browse_start(&queue).await? else {
                                return Ok(None);
                            };

                            let slice = Slice::of(start, window);
                            let end = Slice::of(Utc::now(), window);
                            if slice > end {
                                return Ok(None);
                            }

                            let rows = enqueued_mails
                                .select_enqueued_mails(&queue, slice, BucketId::new(0))
                                .await?;
                            BrowseState::Scan {
                                slice,
                                end,
                                bucket: 0,
                                pending: rows.into(),
                            }
                        }
                        BrowseState::Scan {
                            slice,
                            end,
                            bucket,
                            mut pending,
                        } => {
                            // Drain the current partition, skipping tombstoned rows
                            while let Some(item) = pending.pop_front() {
                                if !deleted_mails.is_deleted(&queue, &item.mail_key).await? {
                                    let resume = BrowseState::Scan {
                                        slice,
                                        end,
                                        bucket,
                                        pending,
                                    };
                                    return Ok(Some((item, resume)));
                                }
                            }

                            let (next_slice, next_bucket) = if bucket + 1 < bucket_count {
                                (slice, bucket + 1)
                            } else if slice < end {
                                (slice.next(), 0)
                            } else {
                                return Ok(None);
                            };

                            let rows = enqueued_mails
                                .select_enqueued_mails(&queue, next_slice, BucketId::new(next_bucket))
                                .await?;
                            BrowseState::Scan {
                                slice: next_slice,
                                end,
                                bucket: next_bucket,
                                pending: rows.into(),
                            }
                        }
                    };
                }
            }
        })
    }
}
