//! The data carried by the queue view index.

use chrono::{DateTime, Utc};
use mailrack_blob::BlobId;
use mailrack_common::{Envelope, MailQueueName};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SerializationError};

/// Identifier minted once per enqueue call.
///
/// A globally unique ULID. Because the identifier — not the mail — keys
/// the index row, re-running the whole enqueue after a failure writes
/// the same row again: the write path is idempotent on it. ULIDs are
/// lexicographically sortable by creation time, which makes them the
/// natural ordering key within a partition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EnqueueId {
    id: ulid::Ulid,
}

impl EnqueueId {
    /// Create an enqueue id from an existing ULID.
    #[must_use]
    pub const fn new(id: ulid::Ulid) -> Self {
        Self { id }
    }

    /// Generate a new unique enqueue id.
    #[must_use]
    pub fn generate() -> Self {
        Self {
            id: ulid::Ulid::new(),
        }
    }

    /// Parse the canonical 26-character ULID representation.
    ///
    /// # Errors
    /// If the string is not a valid ULID.
    pub fn parse(value: &str) -> std::result::Result<Self, ulid::DecodeError> {
        Ok(Self {
            id: ulid::Ulid::from_string(value)?,
        })
    }

    /// The underlying ULID.
    #[must_use]
    pub const fn ulid(&self) -> ulid::Ulid {
        self.id
    }

    /// Milliseconds since the Unix epoch encoded in this id.
    #[must_use]
    pub const fn timestamp_ms(&self) -> u64 {
        self.id.timestamp_ms()
    }
}

impl std::fmt::Display for EnqueueId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl Serialize for EnqueueId {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.id.to_string())
    }
}

impl<'de> Deserialize<'de> for EnqueueId {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let id = ulid::Ulid::from_string(&s).map_err(serde::de::Error::custom)?;
        Ok(Self { id })
    }
}

/// Stable identifier correlating deletion requests to stored items.
///
/// Distinct from [`EnqueueId`]: several enqueue records (e.g. broker
/// redeliveries of the same logical mail) may share one key, and a
/// tombstone on the key suppresses every record carrying it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MailKey(String);

impl MailKey {
    /// Create a mail key from any string-like value.
    pub fn of(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MailKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Blob ids of the two MIME parts of a queued message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MimeMessagePartsId {
    /// Blob holding the message headers.
    pub header_blob_id: BlobId,
    /// Blob holding the message body.
    pub body_blob_id: BlobId,
}

/// One enqueued mail as stored in the index. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnqueuedItem {
    /// Queue the item belongs to.
    pub queue_name: MailQueueName,
    /// Idempotency token of the enqueue call that wrote this row.
    pub enqueue_id: EnqueueId,
    /// Deletion/dedup key.
    pub mail_key: MailKey,
    /// Sender and recipients summary.
    pub envelope: Envelope,
    /// Where the message bytes live.
    pub parts_id: MimeMessagePartsId,
    /// When the item was enqueued.
    pub enqueued_time: DateTime<Utc>,
}

impl EnqueuedItem {
    /// Encode for storage in an index row or a broker payload.
    ///
    /// # Errors
    /// If encoding fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serde::encode_to_vec(self, bincode::config::standard())
            .map_err(SerializationError::Encode)?)
    }

    /// Decode an item previously produced by [`Self::to_bytes`].
    ///
    /// # Errors
    /// If the bytes are not a valid encoding.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (item, _) = bincode::serde::decode_from_slice(bytes, bincode::config::standard())
            .map_err(SerializationError::Decode)?;
        Ok(item)
    }
}
