//! Mailbox addresses for message headers and the SMTP envelope.

use crate::error::{Error, Result};
use std::fmt;

/// Bare email address, e.g. `user@example.com`.
///
/// The address string is taken as-is; the only structural requirement,
/// checked when a domain is needed, is the presence of an `@`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address(String);

impl Address {
    /// Creates an address from a string.
    #[must_use]
    pub fn new(addr: impl Into<String>) -> Self {
        Self(addr.into())
    }

    /// Returns the address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the domain part after the last `@`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ExpectedEmailDomain`] if the address contains no `@`.
    pub fn domain(&self) -> Result<&str> {
        match self.0.rfind('@') {
            Some(idx) => Ok(&self.0[idx + 1..]),
            None => Err(Error::ExpectedEmailDomain(self.0.clone())),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Address {
    fn from(addr: &str) -> Self {
        Self::new(addr)
    }
}

/// Mailbox (optional display name + address).
///
/// Rendered in headers as `Name <addr>` or `<addr>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mailbox {
    /// Display name (optional).
    pub name: Option<String>,
    /// Email address.
    pub address: Address,
}

impl Mailbox {
    /// Creates a new mailbox with just an address.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            name: None,
            address: Address::new(address),
        }
    }

    /// Creates a new mailbox with a display name and address.
    #[must_use]
    pub fn with_name(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            address: Address::new(address),
        }
    }
}

impl fmt::Display for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{name} <{}>", self.address),
            None => write!(f, "<{}>", self.address),
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_domain() {
        let addr = Address::new("user@example.com");
        assert_eq!(addr.domain().unwrap(), "example.com");
    }

    #[test]
    fn test_domain_after_last_at() {
        let addr = Address::new("odd@local@example.org");
        assert_eq!(addr.domain().unwrap(), "example.org");
    }

    #[test]
    fn test_domain_missing_at() {
        let addr = Address::new("userexample.com");
        assert!(matches!(
            addr.domain(),
            Err(Error::ExpectedEmailDomain(a)) if a == "userexample.com"
        ));
    }

    #[test]
    fn test_mailbox_display_bare() {
        let mailbox = Mailbox::new("user@example.com");
        assert_eq!(mailbox.to_string(), "<user@example.com>");
    }

    #[test]
    fn test_mailbox_display_named() {
        let mailbox = Mailbox::with_name("John Doe", "john@example.com");
        assert_eq!(mailbox.to_string(), "John Doe <john@example.com>");
    }
}
