//! The mailrack queue view: a browsable, selectively-deletable,
//! boundedly-growing secondary index over an ordered, ack-based broker.
//!
//! Brokers deliver FIFO with consumer acknowledgement — nothing more.
//! Operators also need to list everything currently queued, delete
//! arbitrary entries, and keep the index from growing forever. The
//! queue view provides that:
//!
//! - enqueued items are indexed by `(queue, time slice, hash bucket)`
//!   (the [`slicing`] model), bounding per-partition row counts;
//! - deletion writes a tombstone instead of touching the partition, and
//!   a per-queue browse-start cursor advances only once a whole slice is
//!   proven fully tombstoned, after which its rows are swept;
//! - browsing walks partitions lazily from the browse start to "now",
//!   filtering tombstones — a best-effort enumeration, not a snapshot;
//! - a staleness probe flags queues whose cursor has stalled before the
//!   index can grow without bound.
//!
//! Every storage seam is a DAO trait with a durable SQLite-backed
//! implementation and an in-memory double; [`MailQueue`] ties the view
//! to the broker and blob-store boundaries.

pub mod browser;
pub mod config;
pub mod dao;
pub mod delete;
pub mod error;
pub mod health;
pub mod model;
pub mod queue;
pub mod slicing;
pub mod store;
pub mod view;

pub use browser::MailQueueBrowser;
pub use config::{QueueViewBackendConfig, QueueViewConfig};
pub use delete::MailQueueMailDelete;
pub use error::{QueueViewError, Result, SerializationError};
pub use health::{BrowseStartHealthCheck, DEFAULT_STALENESS_THRESHOLD};
pub use model::{EnqueueId, EnqueuedItem, MailKey, MimeMessagePartsId};
pub use queue::{CONTENT_BUCKET, DequeuedMail, MailQueue};
pub use slicing::{BucketId, Slice, SlicingContext};
pub use store::MailQueueMailStore;
pub use view::MailQueueView;
