use std::{
    fmt::{self, Display},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced when parsing a mail address.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressParseError {
    /// The address has no `@` separator.
    #[error("Address is missing '@': {0}")]
    MissingSeparator(String),

    /// The local part (before `@`) is empty.
    #[error("Address has an empty local part: {0}")]
    EmptyLocalPart(String),

    /// The domain (after `@`) is empty.
    #[error("Address has an empty domain: {0}")]
    EmptyDomain(String),
}

/// A single envelope address, `local-part@domain`.
///
/// This is the envelope summary representation carried through the queue
/// index; full MIME parsing happens elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MailAddress {
    local_part: String,
    domain: String,
}

impl MailAddress {
    /// Parse an address of the form `local@domain`.
    ///
    /// # Errors
    /// If the string is missing the separator or either side is empty.
    pub fn parse(address: &str) -> Result<Self, AddressParseError> {
        let (local_part, domain) = address
            .rsplit_once('@')
            .ok_or_else(|| AddressParseError::MissingSeparator(address.to_string()))?;

        if local_part.is_empty() {
            return Err(AddressParseError::EmptyLocalPart(address.to_string()));
        }

        if domain.is_empty() {
            return Err(AddressParseError::EmptyDomain(address.to_string()));
        }

        Ok(Self {
            local_part: local_part.to_string(),
            domain: domain.to_string(),
        })
    }

    /// The part before the `@`.
    #[must_use]
    pub fn local_part(&self) -> &str {
        &self.local_part
    }

    /// The part after the `@`.
    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }
}

impl Display for MailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.local_part, self.domain)
    }
}

impl FromStr for MailAddress {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
