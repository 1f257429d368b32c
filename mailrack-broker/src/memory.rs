use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
};

use async_trait::async_trait;
use dashmap::DashMap;
use mailrack_common::MailQueueName;
use tokio::sync::Notify;

use crate::{
    BrokerError, Result,
    broker::{Broker, Delivery, DeliveryTag},
};

#[derive(Debug, Default)]
struct QueueState {
    ready: VecDeque<Arc<[u8]>>,
    unacked: HashMap<DeliveryTag, Arc<[u8]>>,
    next_tag: u64,
}

/// In-process broker.
///
/// Queues are per-name FIFO buffers with AMQP-style manual
/// acknowledgement: a consumed payload moves to an unacked set, an ack
/// drops it, a nack requeues it at the head. Used as the test double for
/// the production AMQP broker.
#[derive(Debug, Clone, Default)]
pub struct MemoryBroker {
    queues: Arc<DashMap<MailQueueName, QueueState>>,
    published: Arc<Notify>,
}

impl MemoryBroker {
    /// Create a new broker with no queues.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of payloads ready for consumption on `queue`.
    #[must_use]
    pub fn ready_len(&self, queue: &MailQueueName) -> usize {
        self.queues.get(queue).map_or(0, |state| state.ready.len())
    }

    /// Number of consumed-but-unacknowledged payloads on `queue`.
    #[must_use]
    pub fn unacked_len(&self, queue: &MailQueueName) -> usize {
        self.queues
            .get(queue)
            .map_or(0, |state| state.unacked.len())
    }

    /// Wait until the next publish on any queue.
    ///
    /// Useful in tests to synchronize a consumer task with a producer.
    pub async fn wait_for_publish(&self) {
        self.published.notified().await;
    }
}

#[async_trait]
impl Broker for MemoryBroker {
    async fn declare_queue(&self, queue: &MailQueueName) -> Result<()> {
        self.queues.entry(queue.clone()).or_default();
        Ok(())
    }

    async fn publish(&self, queue: &MailQueueName, payload: Arc<[u8]>) -> Result<()> {
        let mut state = self
            .queues
            .get_mut(queue)
            .ok_or_else(|| BrokerError::QueueNotDeclared(queue.to_string()))?;

        state.ready.push_back(payload);
        drop(state);

        // notify_one stores a permit, so a publish that lands between a
        // consumer's empty poll and its wait is not lost
        self.published.notify_one();
        Ok(())
    }

    async fn consume(&self, queue: &MailQueueName) -> Result<Option<Delivery>> {
        let mut state = self
            .queues
            .get_mut(queue)
            .ok_or_else(|| BrokerError::QueueNotDeclared(queue.to_string()))?;

        let Some(payload) = state.ready.pop_front() else {
            return Ok(None);
        };

        let tag = DeliveryTag::new(state.next_tag);
        state.next_tag += 1;
        state.unacked.insert(tag, payload.clone());

        Ok(Some(Delivery { payload, tag }))
    }

    async fn ack(&self, queue: &MailQueueName, tag: DeliveryTag) -> Result<()> {
        let mut state = self
            .queues
            .get_mut(queue)
            .ok_or_else(|| BrokerError::QueueNotDeclared(queue.to_string()))?;

        state
            .unacked
            .remove(&tag)
            .map(|_| ())
            .ok_or(BrokerError::UnknownDeliveryTag(tag))
    }

    async fn nack(&self, queue: &MailQueueName, tag: DeliveryTag) -> Result<()> {
        let mut state = self
            .queues
            .get_mut(queue)
            .ok_or_else(|| BrokerError::QueueNotDeclared(queue.to_string()))?;

        let payload = state
            .unacked
            .remove(&tag)
            .ok_or(BrokerError::UnknownDeliveryTag(tag))?;

        // Requeue at the head so redelivery preserves queue order
        state.ready.push_front(payload);
        Ok(())
    }
}
