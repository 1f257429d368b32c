//! SQLite-backed DAO implementations.
//!
//! The durable backend. Tables follow the column-store contract: every
//! access path goes through a composite key, and the conditional cursor
//! writes are single upsert statements the database applies atomically —
//! there is no read-then-write window anywhere in this module.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mailrack_common::MailQueueName;
use sqlx::{
    Row,
    sqlite::{SqlitePool, SqlitePoolOptions},
};

use crate::{
    QueueViewError, Result,
    dao::{
        BrowseStartDao, ContentStartDao, DeletedMailsDao, EnqueuedMailsDao, QueueViewDaos,
    },
    model::{EnqueuedItem, MailKey},
    slicing::{BucketId, Slice, SlicingContext},
};

/// Handle to a SQLite-backed queue view store.
///
/// Owns the connection pool and creates the schema on connect; hand out
/// DAOs through [`Self::daos`].
#[derive(Debug, Clone)]
pub struct SqliteQueueView {
    pool: SqlitePool,
}

impl SqliteQueueView {
    /// Open (or create) the database at `path` and initialize the schema.
    ///
    /// # Errors
    /// If the database cannot be opened or the schema cannot be created.
    pub async fn connect(path: &str) -> Result<Self> {
        let url = format!("sqlite:{path}?mode=rwc");
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        let store = Self { pool };
        store.initialize().await?;
        Ok(store)
    }

    /// Open an in-memory database, used by the test suites.
    ///
    /// A single connection keeps the in-memory database alive for the
    /// lifetime of the pool.
    ///
    /// # Errors
    /// If the database cannot be opened or the schema cannot be created.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let store = Self { pool };
        store.initialize().await?;
        Ok(store)
    }

    async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS enqueued_mails (
                queue_name TEXT NOT NULL,
                bucket INTEGER NOT NULL,
                slice_start INTEGER NOT NULL,
                enqueue_id TEXT NOT NULL,
                mail_key TEXT NOT NULL,
                enqueued_time INTEGER NOT NULL,
                item BLOB NOT NULL,
                PRIMARY KEY (queue_name, bucket, slice_start, enqueue_id)
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS deleted_mails (
                queue_name TEXT NOT NULL,
                mail_key TEXT NOT NULL,
                PRIMARY KEY (queue_name, mail_key)
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS browse_start (
                queue_name TEXT PRIMARY KEY,
                instant INTEGER NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS content_start (
                queue_name TEXT PRIMARY KEY,
                instant INTEGER NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Hand out the DAO bundle for this store.
    #[must_use]
    pub fn daos(&self) -> QueueViewDaos {
        QueueViewDaos {
            enqueued_mails: Arc::new(SqliteEnqueuedMailsDao {
                pool: self.pool.clone(),
            }),
            deleted_mails: Arc::new(SqliteDeletedMailsDao {
                pool: self.pool.clone(),
            }),
            browse_start: Arc::new(SqliteBrowseStartDao {
                cursors: CursorTable {
                    pool: self.pool.clone(),
                    table: "browse_start",
                },
            }),
            content_start: Arc::new(SqliteContentStartDao {
                cursors: CursorTable {
                    pool: self.pool.clone(),
                    table: "content_start",
                },
            }),
        }
    }
}

/// SQLite store of enqueued-mail rows.
#[derive(Debug, Clone)]
pub struct SqliteEnqueuedMailsDao {
    pool: SqlitePool,
}

#[async_trait]
impl EnqueuedMailsDao for SqliteEnqueuedMailsDao {
    async fn insert(&self, item: &EnqueuedItem, context: SlicingContext) -> Result<()> {
        let payload = item.to_bytes()?;

        // DO NOTHING keeps the first write: retried enqueues are no-ops
        sqlx::query(
            r"
            INSERT INTO enqueued_mails
                (queue_name, bucket, slice_start, enqueue_id, mail_key, enqueued_time, item)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(queue_name, bucket, slice_start, enqueue_id) DO NOTHING
            ",
        )
        .bind(item.queue_name.as_str())
        .bind(i64::from(context.bucket_id().value()))
        .bind(context.time_range_start().timestamp_millis())
        .bind(item.enqueue_id.to_string())
        .bind(item.mail_key.as_str())
        .bind(item.enqueued_time.timestamp_millis())
        .bind(payload)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn select_enqueued_mails(
        &self,
        queue: &MailQueueName,
        slice: Slice,
        bucket: BucketId,
    ) -> Result<Vec<EnqueuedItem>> {
        let rows = sqlx::query(
            r"
            SELECT item FROM enqueued_mails
            WHERE queue_name = ? AND bucket = ? AND slice_start = ?
            ORDER BY enqueue_id
            ",
        )
        .bind(queue.as_str())
        .bind(i64::from(bucket.value()))
        .bind(slice.start_millis())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| EnqueuedItem::from_bytes(&row.get::<Vec<u8>, _>("item")))
            .collect()
    }

    async fn delete_bucket(
        &self,
        queue: &MailQueueName,
        slice: Slice,
        bucket: BucketId,
    ) -> Result<()> {
        sqlx::query(
            r"
            DELETE FROM enqueued_mails
            WHERE queue_name = ? AND bucket = ? AND slice_start = ?
            ",
        )
        .bind(queue.as_str())
        .bind(i64::from(bucket.value()))
        .bind(slice.start_millis())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// SQLite tombstone set.
#[derive(Debug, Clone)]
pub struct SqliteDeletedMailsDao {
    pool: SqlitePool,
}

#[async_trait]
impl DeletedMailsDao for SqliteDeletedMailsDao {
    async fn mark_as_deleted(&self, queue: &MailQueueName, mail_key: &MailKey) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO deleted_mails (queue_name, mail_key) VALUES (?, ?)
            ON CONFLICT(queue_name, mail_key) DO NOTHING
            ",
        )
        .bind(queue.as_str())
        .bind(mail_key.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn is_deleted(&self, queue: &MailQueueName, mail_key: &MailKey) -> Result<bool> {
        let row = sqlx::query(
            r"
            SELECT 1 FROM deleted_mails WHERE queue_name = ? AND mail_key = ?
            ",
        )
        .bind(queue.as_str())
        .bind(mail_key.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.is_some())
    }
}

/// Shared queries over one cursor table (`browse_start` or
/// `content_start`); both tables have the same shape.
#[derive(Debug, Clone)]
struct CursorTable {
    pool: SqlitePool,
    table: &'static str,
}

impl CursorTable {
    async fn find(&self, queue: &MailQueueName) -> Result<Option<DateTime<Utc>>> {
        let row = sqlx::query(&format!(
            "SELECT instant FROM {} WHERE queue_name = ?",
            self.table
        ))
        .bind(queue.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| decode_instant(row.get::<i64, _>("instant")))
            .transpose()
    }

    async fn insert_initial(&self, queue: &MailQueueName, instant: DateTime<Utc>) -> Result<()> {
        // Single-statement conditional upsert: the new instant only wins
        // when it predates the stored one
        sqlx::query(&format!(
            "INSERT INTO {table} (queue_name, instant) VALUES (?, ?)
             ON CONFLICT(queue_name) DO UPDATE SET instant = excluded.instant
             WHERE excluded.instant < {table}.instant",
            table = self.table
        ))
        .bind(queue.as_str())
        .bind(instant.timestamp_millis())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update(&self, queue: &MailQueueName, instant: DateTime<Utc>) -> Result<()> {
        sqlx::query(&format!(
            "INSERT INTO {} (queue_name, instant) VALUES (?, ?)
             ON CONFLICT(queue_name) DO UPDATE SET instant = excluded.instant",
            self.table
        ))
        .bind(queue.as_str())
        .bind(instant.timestamp_millis())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list(&self) -> Result<Vec<(MailQueueName, DateTime<Utc>)>> {
        let rows = sqlx::query(&format!("SELECT queue_name, instant FROM {}", self.table))
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| {
                let instant = decode_instant(row.get::<i64, _>("instant"))?;
                Ok((MailQueueName::of(row.get::<String, _>("queue_name")), instant))
            })
            .collect()
    }

    async fn remove(&self, queue: &MailQueueName) -> Result<()> {
        sqlx::query(&format!("DELETE FROM {} WHERE queue_name = ?", self.table))
            .bind(queue.as_str())
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

fn decode_instant(millis: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| QueueViewError::Corrupted(format!("cursor instant out of range: {millis}")))
}

/// SQLite browse-start cursor store.
#[derive(Debug, Clone)]
pub struct SqliteBrowseStartDao {
    cursors: CursorTable,
}

#[async_trait]
impl BrowseStartDao for SqliteBrowseStartDao {
    async fn find_browse_start(&self, queue: &MailQueueName) -> Result<Option<DateTime<Utc>>> {
        self.cursors.find(queue).await
    }

    async fn insert_initial_browse_start(
        &self,
        queue: &MailQueueName,
        instant: DateTime<Utc>,
    ) -> Result<()> {
        self.cursors.insert_initial(queue, instant).await
    }

    async fn update_browse_start(
        &self,
        queue: &MailQueueName,
        instant: DateTime<Utc>,
    ) -> Result<()> {
        self.cursors.update(queue, instant).await
    }

    async fn list_browse_starts(&self) -> Result<Vec<(MailQueueName, DateTime<Utc>)>> {
        self.cursors.list().await
    }

    async fn remove_browse_start(&self, queue: &MailQueueName) -> Result<()> {
        self.cursors.remove(queue).await
    }
}

/// SQLite content-start cursor store.
#[derive(Debug, Clone)]
pub struct SqliteContentStartDao {
    cursors: CursorTable,
}

#[async_trait]
impl ContentStartDao for SqliteContentStartDao {
    async fn find_content_start(&self, queue: &MailQueueName) -> Result<Option<DateTime<Utc>>> {
        self.cursors.find(queue).await
    }

    async fn insert_initial_content_start(
        &self,
        queue: &MailQueueName,
        instant: DateTime<Utc>,
    ) -> Result<()> {
        self.cursors.insert_initial(queue, instant).await
    }

    async fn update_content_start(
        &self,
        queue: &MailQueueName,
        instant: DateTime<Utc>,
    ) -> Result<()> {
        self.cursors.update(queue, instant).await
    }

    async fn remove_content_start(&self, queue: &MailQueueName) -> Result<()> {
        self.cursors.remove(queue).await
    }
}
