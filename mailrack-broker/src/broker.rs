use std::sync::Arc;

use async_trait::async_trait;
use mailrack_common::MailQueueName;

use crate::Result;

/// Identifier of one in-flight delivery, scoped to a queue.
///
/// Valid from the moment a payload is handed to a consumer until that
/// consumer acks or nacks it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeliveryTag(u64);

impl DeliveryTag {
    /// Wrap a raw tag value.
    #[must_use]
    pub const fn new(tag: u64) -> Self {
        Self(tag)
    }

    /// The raw tag value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for DeliveryTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One payload handed to a consumer, awaiting manual acknowledgement.
#[derive(Debug, Clone)]
pub struct Delivery {
    /// The published bytes.
    pub payload: Arc<[u8]>,
    /// Tag to pass back to [`Broker::ack`] or [`Broker::nack`].
    pub tag: DeliveryTag,
}

/// Ordered publish plus manual-ack consume.
///
/// Implementations guarantee a live channel for every call — leasing a
/// channel from a pool, reconnecting on failure, and returning it
/// afterwards is internal to the implementation. Callers never manage
/// connections.
///
/// Consumption is pull-driven: each [`Broker::consume`] call yields the
/// next pending delivery (or `None` when the queue is drained), forming
/// the consumer's delivery stream one element at a time. A delivery
/// stays invisible to other consumers until it is nacked back.
#[async_trait]
pub trait Broker: Send + Sync + std::fmt::Debug {
    /// Declare a queue, creating it if it does not exist. Idempotent.
    ///
    /// # Errors
    /// If the broker rejects the declaration.
    async fn declare_queue(&self, queue: &MailQueueName) -> Result<()>;

    /// Append a payload to the tail of the queue.
    ///
    /// # Errors
    /// If the queue is not declared or the connection fails.
    async fn publish(&self, queue: &MailQueueName, payload: Arc<[u8]>) -> Result<()>;

    /// Take the next pending delivery, or `None` if the queue is empty.
    ///
    /// # Errors
    /// If the queue is not declared or the connection fails.
    async fn consume(&self, queue: &MailQueueName) -> Result<Option<Delivery>>;

    /// Acknowledge a delivery, removing it permanently.
    ///
    /// # Errors
    /// If the tag is not an in-flight delivery of this queue.
    async fn ack(&self, queue: &MailQueueName, tag: DeliveryTag) -> Result<()>;

    /// Reject a delivery, requeueing it at the head for redelivery.
    ///
    /// # Errors
    /// If the tag is not an in-flight delivery of this queue.
    async fn nack(&self, queue: &MailQueueName, tag: DeliveryTag) -> Result<()>;
}
