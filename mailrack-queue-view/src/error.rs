//! Error types for the queue view.

use thiserror::Error;

/// Top-level queue view error type.
///
/// Write-path and browse-path failures surface through this enum; the
/// delete path additionally downgrades cursor-advancement failures to
/// log lines (see [`crate::delete::MailQueueMailDelete`]).
#[derive(Debug, Error)]
pub enum QueueViewError {
    /// The backing index store failed.
    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    /// Serialization or deserialization of an index row failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] SerializationError),

    /// A stored row holds a value outside the representable range.
    #[error("Corrupted index row: {0}")]
    Corrupted(String),

    /// The blob store holding message content failed.
    #[error("Blob store error: {0}")]
    Blob(#[from] mailrack_blob::BlobStoreError),

    /// The broker failed.
    #[error("Broker error: {0}")]
    Broker(#[from] mailrack_broker::BrokerError),

    /// Configuration validation failed.
    #[error("Invalid queue view configuration: {0}")]
    InvalidConfiguration(String),
}

/// Serialization and deserialization errors.
#[derive(Debug, Error)]
pub enum SerializationError {
    /// Bincode serialization failed.
    #[error("Bincode encode error: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    /// Bincode deserialization failed.
    #[error("Bincode decode error: {0}")]
    Decode(#[from] bincode::error::DecodeError),
}

/// Specialized `Result` type for queue view operations.
pub type Result<T> = std::result::Result<T, QueueViewError>;
