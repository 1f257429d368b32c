use thiserror::Error;

use crate::broker::DeliveryTag;

/// Errors surfaced by broker implementations.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// The queue has not been declared on this broker.
    #[error("Queue not declared: {0}")]
    QueueNotDeclared(String),

    /// An ack/nack referenced a delivery this broker is not tracking.
    #[error("Unknown delivery tag: {0}")]
    UnknownDeliveryTag(DeliveryTag),

    /// The underlying connection or channel failed.
    #[error("Broker connection error: {0}")]
    Connection(String),
}

/// Specialized `Result` type for broker operations.
pub type Result<T> = std::result::Result<T, BrokerError>;
