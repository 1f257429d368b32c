use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

/// Name of one logical mail queue.
///
/// Opaque and immutable; every index row, tombstone, and cursor is scoped
/// to exactly one queue name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MailQueueName(String);

impl MailQueueName {
    /// Create a queue name from any string-like value.
    pub fn of(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The queue name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for MailQueueName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MailQueueName {
    fn from(value: &str) -> Self {
        Self::of(value)
    }
}

impl From<String> for MailQueueName {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_names_compare_by_value() {
        assert_eq!(MailQueueName::of("outbound"), MailQueueName::from("outbound"));
        assert_ne!(MailQueueName::of("outbound"), MailQueueName::of("spool"));
    }

    #[test]
    fn queue_name_serializes_as_plain_string() {
        let json = serde_json::to_string(&MailQueueName::of("outbound")).expect("serialize");
        assert_eq!(json, "\"outbound\"");
    }
}
