//! Broker boundary.
//!
//! The queueing core needs exactly two things from its broker: ordered
//! publish, and consume with manual acknowledgement. Everything else —
//! connection recovery, channel pooling, redelivery bookkeeping — lives
//! behind the [`Broker`] trait, which the core treats as an opaque,
//! resilient resource.
//!
//! [`MemoryBroker`] is the in-process implementation used by the test
//! suites; a production deployment substitutes an AMQP-backed one.

pub mod broker;
pub mod error;
pub mod memory;

pub use broker::{Broker, Delivery, DeliveryTag};
pub use error::{BrokerError, Result};
pub use memory::MemoryBroker;
