//! The queue view facade.

use std::{sync::Arc, time::Duration};

use futures_util::Stream;
use mailrack_common::MailQueueName;

use crate::{
    Result,
    browser::MailQueueBrowser,
    config::QueueViewConfig,
    dao::{BrowseStartDao, ContentStartDao, DeletedMailsDao, QueueViewDaos},
    delete::MailQueueMailDelete,
    health::BrowseStartHealthCheck,
    model::{EnqueuedItem, MailKey},
    store::MailQueueMailStore,
};

/// The browsable, selectively-deletable secondary index over a set of
/// mail queues: write, browse, and delete paths bundled over one
/// backing store.
#[derive(Debug, Clone)]
pub struct MailQueueView {
    store: MailQueueMailStore,
    browser: MailQueueBrowser,
    deleter: MailQueueMailDelete,
    deleted_mails: Arc<dyn DeletedMailsDao>,
    browse_start: Arc<dyn BrowseStartDao>,
    content_start: Arc<dyn ContentStartDao>,
}

impl MailQueueView {
    /// Assemble the view over a DAO bundle.
    ///
    /// # Errors
    /// If the configuration is invalid.
    pub fn new(daos: &QueueViewDaos, config: QueueViewConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            store: MailQueueMailStore::new(daos, config),
            browser: MailQueueBrowser::new(daos, config),
            deleter: MailQueueMailDelete::new(daos, config),
            deleted_mails: daos.deleted_mails.clone(),
            browse_start: daos.browse_start.clone(),
            content_start: daos.content_start.clone(),
        })
    }

    /// Index a newly enqueued item. See [`MailQueueMailStore::store`].
    ///
    /// # Errors
    /// If any write fails; retrying the whole call is safe.
    pub async fn store_mail(&self, item: &EnqueuedItem) -> Result<()> {
        self.store.store(item).await
    }

    /// The live items of `queue`, lazily. See [`MailQueueBrowser::browse`].
    pub fn browse(
        &self,
        queue: &MailQueueName,
    ) -> impl Stream<Item = Result<EnqueuedItem>> + Send + use<> {
        self.browser.browse(queue)
    }

    /// Logically delete an item. See
    /// [`MailQueueMailDelete::consider_deleted`].
    ///
    /// # Errors
    /// If the tombstone write fails.
    pub async fn consider_deleted(&self, queue: &MailQueueName, mail_key: &MailKey) -> Result<()> {
        self.deleter.consider_deleted(queue, mail_key).await
    }

    /// Force a browse-start advancement scan, independent of delete
    /// traffic. See [`MailQueueMailDelete::update_browse_start`].
    ///
    /// # Errors
    /// If the index cannot be read or a cursor write fails.
    pub async fn update_browse_start(&self, queue: &MailQueueName) -> Result<()> {
        self.deleter.update_browse_start(queue).await
    }

    /// Whether `mail_key` has not been logically deleted from `queue`.
    ///
    /// # Errors
    /// If the tombstone store cannot be read.
    pub async fn is_present(&self, queue: &MailQueueName, mail_key: &MailKey) -> Result<bool> {
        Ok(!self.deleted_mails.is_deleted(queue, mail_key).await?)
    }

    /// Drop the per-queue cursors when `queue` is destroyed.
    ///
    /// # Errors
    /// If a cursor delete fails.
    pub async fn remove_queue(&self, queue: &MailQueueName) -> Result<()> {
        self.browse_start.remove_browse_start(queue).await?;
        self.content_start.remove_content_start(queue).await?;
        Ok(())
    }

    /// A staleness probe over this view's browse-start cursors.
    #[must_use]
    pub fn browse_start_health_check(&self, threshold: Duration) -> BrowseStartHealthCheck {
        BrowseStartHealthCheck::new(self.browse_start.clone(), threshold)
    }
}
