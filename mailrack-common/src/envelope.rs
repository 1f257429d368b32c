use serde::{Deserialize, Serialize};

use crate::address::MailAddress;

/// Envelope summary for a queued message.
///
/// Carries only the routing information the queue needs: the reverse path
/// and the forward paths. `sender` is `None` for the null reverse path
/// (bounce messages).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    sender: Option<MailAddress>,
    recipients: Vec<MailAddress>,
}

impl Envelope {
    /// Build an envelope from a sender and its recipients.
    #[must_use]
    pub const fn new(sender: Option<MailAddress>, recipients: Vec<MailAddress>) -> Self {
        Self { sender, recipients }
    }

    /// The reverse path, if any.
    #[must_use]
    pub const fn sender(&self) -> Option<&MailAddress> {
        self.sender.as_ref()
    }

    /// The forward paths.
    #[must_use]
    pub fn recipients(&self) -> &[MailAddress] {
        &self.recipients
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_sender_is_representable() {
        let envelope = Envelope::new(
            None,
            vec![MailAddress::parse("postmaster@example.com").expect("valid address")],
        );
        assert!(envelope.sender().is_none());
        assert_eq!(envelope.recipients().len(), 1);
    }
}
