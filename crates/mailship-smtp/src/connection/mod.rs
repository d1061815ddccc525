//! Connection management: endpoint URLs, streams, and the dialog client.

mod client;
mod stream;

pub use client::{
    Authenticated, Client, Connected, Data, MailTransaction, RecipientAdded,
};
pub use stream::{SmtpStream, connect, connect_tls, tls_connector};

use crate::error::{Error, Result};
use url::Url;

/// Transport protocol selected by the endpoint URL scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    /// Plain SMTP, optionally upgraded in-session via STARTTLS.
    Smtp,
    /// SMTP inside TLS from the first byte.
    Smtps,
}

impl Protocol {
    /// Default port for the protocol.
    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Self::Smtp => 1025,
            Self::Smtps => 465,
        }
    }
}

/// Parsed mail submission endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Server host name.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Selected protocol.
    pub protocol: Protocol,
}

impl Endpoint {
    /// Parses `smtp://host[:port]` or `smtps://host[:port]`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSmtpScheme`] for any other scheme (or an
    /// unparsable URL) and [`Error::UriMissingHost`] when no host is given.
    pub fn parse(input: &str) -> Result<Self> {
        let url = Url::parse(input).map_err(|_| Error::InvalidSmtpScheme(input.to_string()))?;
        let protocol = match url.scheme() {
            "smtp" => Protocol::Smtp,
            "smtps" => Protocol::Smtps,
            other => return Err(Error::InvalidSmtpScheme(other.to_string())),
        };
        let host = url.host_str().ok_or(Error::UriMissingHost)?.to_string();
        let port = url.port().unwrap_or_else(|| protocol.default_port());
        Ok(Self {
            host,
            port,
            protocol,
        })
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
    fn test_smtp_default_port() {
        let endpoint = Endpoint::parse("smtp://mail.example.com").unwrap();
        assert_eq!(endpoint.host, "mail.example.com");
        assert_eq!(endpoint.port, 1025);
        assert_eq!(endpoint.protocol, Protocol::Smtp);
    }

    #[test]
    fn test_smtps_default_port() {
        let endpoint = Endpoint::parse("smtps://mail.example.com").unwrap();
        assert_eq!(endpoint.port, 465);
        assert_eq!(endpoint.protocol, Protocol::Smtps);
    }

    #[test]
    fn test_explicit_port() {
        let endpoint = Endpoint::parse("smtp://mail.example.com:587").unwrap();
        assert_eq!(endpoint.port, 587);
    }

    #[test]
    fn test_missing_host() {
        assert!(matches!(
            Endpoint::parse("smtp://"),
            Err(Error::UriMissingHost)
        ));
    }

    #[test]
    fn test_unknown_scheme() {
        assert!(matches!(
            Endpoint::parse("imap://mail.example.com"),
            Err(Error::InvalidSmtpScheme(scheme)) if scheme == "imap"
        ));
    }

    #[test]
    fn test_not_a_url() {
        assert!(matches!(
            Endpoint::parse("mail.example.com"),
            Err(Error::InvalidSmtpScheme(_))
        ));
    }
}
