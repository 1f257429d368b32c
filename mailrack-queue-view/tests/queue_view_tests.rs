#![allow(clippy::expect_used, clippy::unwrap_used)]

//! End-to-end exercises of the queue view over both backends.

use std::{sync::Arc, time::Duration};

use chrono::{TimeDelta, Utc};
use futures_util::TryStreamExt;
use mailrack_blob::{BlobId, MemoryBlobStore};
use mailrack_broker::MemoryBroker;
use mailrack_common::{Envelope, MailAddress, MailQueueName};
use mailrack_health::HealthCheck;
use mailrack_queue_view::{
    EnqueueId, EnqueuedItem, MailKey, MailQueue, MailQueueView, MimeMessagePartsId,
    QueueViewBackendConfig, QueueViewConfig,
    dao::{BrowseStartDao, QueueViewDaos, sqlite::SqliteQueueView},
};

fn config() -> QueueViewConfig {
    QueueViewConfig {
        update_pace: 1,
        ..QueueViewConfig::default()
    }
}

fn item(queue: &MailQueueName, key: &str, enqueued_time: chrono::DateTime<Utc>) -> EnqueuedItem {
    EnqueuedItem {
        queue_name: queue.clone(),
        enqueue_id: EnqueueId::generate(),
        mail_key: MailKey::of(key),
        envelope: Envelope::new(
            Some(MailAddress::parse("alice@example.com").expect("valid address")),
            vec![MailAddress::parse("bob@example.com").expect("valid address")],
        ),
        parts_id: MimeMessagePartsId {
            header_blob_id: BlobId::generate(),
            body_blob_id: BlobId::generate(),
        },
        enqueued_time,
    }
}

async fn both_backends() -> Vec<(&'static str, QueueViewDaos)> {
    let memory = QueueViewBackendConfig::Memory
        .into_daos()
        .await
        .expect("memory backend");
    let sqlite = SqliteQueueView::in_memory().await.expect("sqlite backend").daos();
    vec![("memory", memory), ("sqlite", sqlite)]
}

#[tokio::test]
async fn store_browse_delete_round_trip_on_every_backend() {
    for (backend, daos) in both_backends().await {
        let view = MailQueueView::new(&daos, config()).expect("valid config");
        let queue = MailQueueName::of("outbound");
        let now = Utc::now();

        for key in ["mail-1", "mail-2", "mail-3"] {
            view.store_mail(&item(&queue, key, now)).await.expect("store");
        }

        let mut browsed: Vec<String> = view
            .browse(&queue)
            .try_collect::<Vec<_>>()
            .await
            .expect("browse")
            .into_iter()
            .map(|mail| mail.mail_key.to_string())
            .collect();
        browsed.sort();
        assert_eq!(browsed, vec!["mail-1", "mail-2", "mail-3"], "backend: {backend}");

        view.consider_deleted(&queue, &MailKey::of("mail-2"))
            .await
            .expect("delete");

        let mut browsed: Vec<String> = view
            .browse(&queue)
            .try_collect::<Vec<_>>()
            .await
            .expect("browse")
            .into_iter()
            .map(|mail| mail.mail_key.to_string())
            .collect();
        browsed.sort();
        assert_eq!(browsed, vec!["mail-1", "mail-3"], "backend: {backend}");
    }
}

#[tokio::test]
async fn retried_store_is_invisible_to_browse() {
    for (backend, daos) in both_backends().await {
        let view = MailQueueView::new(&daos, config()).expect("valid config");
        let queue = MailQueueName::of("outbound");

        let mail = item(&queue, "mail-1", Utc::now());
        view.store_mail(&mail).await.expect("store");
        view.store_mail(&mail).await.expect("retried store");

        let browsed: Vec<EnqueuedItem> =
            view.browse(&queue).try_collect().await.expect("browse");
        assert_eq!(browsed.len(), 1, "backend: {backend}");
    }
}

#[tokio::test]
async fn deleting_everything_old_advances_the_cursor_and_sweeps() {
    for (backend, daos) in both_backends().await {
        let view = MailQueueView::new(&daos, config()).expect("valid config");
        let queue = MailQueueName::of("outbound");
        let now = Utc::now();

        for (key, hours) in [("a", 8), ("b", 6), ("c", 4)] {
            view.store_mail(&item(&queue, key, now - TimeDelta::hours(hours)))
                .await
                .expect("store");
        }

        for key in ["a", "b", "c"] {
            view.consider_deleted(&queue, &MailKey::of(key))
                .await
                .expect("delete");
        }

        let browsed: Vec<EnqueuedItem> =
            view.browse(&queue).try_collect().await.expect("browse");
        assert!(browsed.is_empty(), "backend: {backend}");

        let browse_start = daos
            .browse_start
            .find_browse_start(&queue)
            .await
            .expect("find")
            .expect("cursor present");
        // Everything before the current slice was swept
        assert!(now - browse_start < TimeDelta::hours(1), "backend: {backend}");
    }
}

#[tokio::test]
async fn live_items_pin_the_cursor_at_or_before_their_slice() {
    for (backend, daos) in both_backends().await {
        let view = MailQueueView::new(&daos, config()).expect("valid config");
        let queue = MailQueueName::of("outbound");
        let now = Utc::now();
        let live_time = now - TimeDelta::hours(3);

        view.store_mail(&item(&queue, "dead", now - TimeDelta::hours(8)))
            .await
            .expect("store");
        view.store_mail(&item(&queue, "live", live_time)).await.expect("store");

        view.consider_deleted(&queue, &MailKey::of("dead"))
            .await
            .expect("delete");
        view.update_browse_start(&queue).await.expect("scan");

        let browse_start = daos
            .browse_start
            .find_browse_start(&queue)
            .await
            .expect("find")
            .expect("cursor present");
        assert!(browse_start <= live_time, "backend: {backend}");

        let browsed: Vec<EnqueuedItem> =
            view.browse(&queue).try_collect().await.expect("browse");
        assert_eq!(browsed.len(), 1, "backend: {backend}");
        assert_eq!(browsed[0].mail_key, MailKey::of("live"), "backend: {backend}");
    }
}

#[tokio::test]
async fn staleness_probe_reflects_the_worst_queue() {
    for (backend, daos) in both_backends().await {
        let view = MailQueueView::new(&daos, config()).expect("valid config");

        let probe = view.browse_start_health_check(Duration::from_secs(7 * 24 * 60 * 60));

        // No queues at all: healthy
        assert!(probe.check().await.is_healthy(), "backend: {backend}");

        daos.browse_start
            .insert_initial_browse_start(&MailQueueName::of("fresh"), Utc::now())
            .await
            .expect("insert");
        assert!(probe.check().await.is_healthy(), "backend: {backend}");

        daos.browse_start
            .insert_initial_browse_start(
                &MailQueueName::of("stalled"),
                Utc::now() - TimeDelta::days(8),
            )
            .await
            .expect("insert");

        let health = probe.check().await;
        assert!(!health.is_healthy(), "backend: {backend}");
        assert!(
            health.message.expect("degraded message").contains("stalled"),
            "backend: {backend}"
        );
    }
}

#[tokio::test]
async fn full_stack_enqueue_consume_cycle() {
    let daos = QueueViewBackendConfig::Memory
        .into_daos()
        .await
        .expect("memory backend");
    let view = Arc::new(MailQueueView::new(&daos, config()).expect("valid config"));
    let queue = MailQueue::new(
        MailQueueName::of("outbound"),
        Arc::new(MemoryBroker::new()),
        Arc::new(MemoryBlobStore::new()),
        view,
    )
    .await
    .expect("declare queue");

    for index in 0..3 {
        queue
            .enqueue(
                MailKey::of(format!("mail-{index}")),
                Envelope::default(),
                b"Subject: test",
                b"body",
            )
            .await
            .expect("enqueue");
    }

    let browsed: Vec<EnqueuedItem> = queue.browse().try_collect().await.expect("browse");
    assert_eq!(browsed.len(), 3);

    let mut delivered = Vec::new();
    while let Some(mail) = queue.dequeue().await.expect("dequeue") {
        delivered.push(mail.item.mail_key.clone());
        queue.ack(mail).await.expect("ack");
    }
    assert_eq!(delivered.len(), 3);

    let browsed: Vec<EnqueuedItem> = queue.browse().try_collect().await.expect("browse");
    assert!(browsed.is_empty());
}
