//! Error taxonomy for SMTP sessions.
//!
//! One closed set, surfaced unchanged to the caller. Errors are never
//! recovered internally: after any of them the dialog state is undefined
//! and the connection must be discarded.

use std::io;

/// Result type alias for SMTP operations.
pub type Result<T> = std::result::Result<T, Error>;

/// SMTP session error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error on the underlying socket.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// TLS error, passed through opaquely from the TLS layer.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// Host name not usable as a TLS server name.
    #[error("invalid TLS server name: {0}")]
    InvalidDnsName(String),

    /// Endpoint URL has no host.
    #[error("SMTP URL is missing a host")]
    UriMissingHost,

    /// Endpoint URL scheme is neither `smtp` nor `smtps`.
    #[error("invalid SMTP URL scheme: {0}")]
    InvalidSmtpScheme(String),

    /// Initial server greeting was not 220.
    #[error("invalid server greeting: {0}")]
    InvalidServerGreetings(u16),

    /// STARTTLS was not acknowledged with 220.
    #[error("invalid STARTTLS response: {0}")]
    InvalidTlsHandshakeResponse(u16),

    /// EHLO reply exceeded the handshake buffer.
    #[error("EHLO reply exceeded the handshake buffer")]
    HandshakeOversize,

    /// Message has no `to` recipients.
    #[error("message has no `to` recipients")]
    ExpectToAddress,

    /// Credentials were supplied but the transport is not TLS.
    #[error("authentication requires a TLS transport")]
    TlsRequiredForAuth,

    /// Server offered no supported authentication mechanism.
    #[error("server offered no supported authentication mechanism")]
    UnsupportedAuthHandshake,

    /// Reply outside the expected set with a non-error code, a malformed
    /// reply line, or an unexpected SASL challenge.
    #[error("unexpected server response: {0}")]
    UnexpectedServerResponse(String),

    /// Error-class reply code with no named mapping.
    #[error("unknown server response: {0}")]
    UnknownServerResponse(u16),

    /// Message composition failed.
    #[error(transparent)]
    Mime(#[from] mailship_mime::Error),

    /// 403: server rejected the TLS handshake.
    #[error("server rejected the TLS handshake (403)")]
    InvalidTlsHandshake,

    /// 421: service not available, closing channel.
    #[error("service not available (421)")]
    ServiceNotAvailable,

    /// 450: mailbox temporarily not available.
    #[error("mailbox temporarily not available (450)")]
    TemporaryMailboxNotAvailable,

    /// 451: local error in processing.
    #[error("error in processing (451)")]
    ErrorInProcessing,

    /// 452: insufficient system storage.
    #[error("insufficient storage (452)")]
    InsufficientStorage,

    /// 454: temporary authentication failure.
    #[error("temporary authentication failure (454)")]
    TemporaryAuthFailure,

    /// 455: server unable to accommodate a parameter.
    #[error("unable to accommodate parameter (455)")]
    UnableToAccommodateParameter,

    /// 500: syntax error or command not recognized.
    #[error("syntax error or command not found (500)")]
    SyntaxErrorOrCommandNotFound,

    /// 501: syntax error in parameters.
    #[error("invalid parameter (501)")]
    InvalidParameter,

    /// 502: command not implemented.
    #[error("command not implemented (502)")]
    CommandNotImplemented,

    /// 503: bad sequence of commands.
    #[error("invalid command sequence (503)")]
    InvalidCommandSequence,

    /// 504: command parameter not implemented.
    #[error("parameter not implemented (504)")]
    ParameterNotImplemented,

    /// 530: authentication required.
    #[error("authentication required (530)")]
    AuthenticationRequired,

    /// 534: authentication mechanism too weak.
    #[error("authentication method too weak (534)")]
    AuthMethodTooWeak,

    /// 535: invalid credentials.
    #[error("invalid credentials (535)")]
    InvalidCredentials,

    /// 538: encryption required for the requested mechanism.
    #[error("encryption required for authentication method (538)")]
    EncryptionRequiredForAuthMethod,

    /// 550: mailbox not available.
    #[error("mailbox not available (550)")]
    MailboxNotAvailable,

    /// 551: user not local.
    #[error("user not local (551)")]
    UserNotLocal,

    /// 552: exceeded storage allocation.
    #[error("exceeded storage allocation (552)")]
    ExceededStorageAllocation,

    /// 553: mailbox name not allowed.
    #[error("mailbox not allowed (553)")]
    MailboxNotAllowed,

    /// 554: transaction failed.
    #[error("transaction failed (554)")]
    TransactionFailed,

    /// 555: MAIL FROM / RCPT TO parameter not recognized.
    #[error("invalid MAIL FROM or RCPT TO parameter (555)")]
    InvalidFromOrRcptParameter,
}

impl Error {
    /// Maps a reply code to its error variant.
    ///
    /// Total over `u16`; called only when a reply does not match the code
    /// expected at the current dialog step, so success-class codes land in
    /// [`Error::UnexpectedServerResponse`].
    #[must_use]
    pub fn from_code(code: u16) -> Self {
        match code {
            403 => Self::InvalidTlsHandshake,
            421 => Self::ServiceNotAvailable,
            450 => Self::TemporaryMailboxNotAvailable,
            451 => Self::ErrorInProcessing,
            452 => Self::InsufficientStorage,
            454 => Self::TemporaryAuthFailure,
            455 => Self::UnableToAccommodateParameter,
            500 => Self::SyntaxErrorOrCommandNotFound,
            501 => Self::InvalidParameter,
            502 => Self::CommandNotImplemented,
            503 => Self::InvalidCommandSequence,
            504 => Self::ParameterNotImplemented,
            530 => Self::AuthenticationRequired,
            534 => Self::AuthMethodTooWeak,
            535 => Self::InvalidCredentials,
            538 => Self::EncryptionRequiredForAuthMethod,
            550 => Self::MailboxNotAvailable,
            551 => Self::UserNotLocal,
            552 => Self::ExceededStorageAllocation,
            553 => Self::MailboxNotAllowed,
            554 => Self::TransactionFailed,
            555 => Self::InvalidFromOrRcptParameter,
            code if code < 400 => Self::UnexpectedServerResponse(code.to_string()),
            code => Self::UnknownServerResponse(code),
        }
    }

    /// True for errors mapping a transient (4xx) server reply.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::ServiceNotAvailable
                | Self::TemporaryMailboxNotAvailable
                | Self::ErrorInProcessing
                | Self::InsufficientStorage
                | Self::TemporaryAuthFailure
                | Self::UnableToAccommodateParameter
        ) || matches!(self, Self::UnknownServerResponse(code) if *code < 500)
    }

    /// True for errors mapping a permanent (5xx) server reply.
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(
            self,
            Self::SyntaxErrorOrCommandNotFound
                | Self::InvalidParameter
                | Self::CommandNotImplemented
                | Self::InvalidCommandSequence
                | Self::ParameterNotImplemented
                | Self::AuthenticationRequired
                | Self::AuthMethodTooWeak
                | Self::InvalidCredentials
                | Self::EncryptionRequiredForAuthMethod
                | Self::MailboxNotAvailable
                | Self::UserNotLocal
                | Self::ExceededStorageAllocation
                | Self::MailboxNotAllowed
                | Self::TransactionFailed
                | Self::InvalidFromOrRcptParameter
        ) || matches!(self, Self::UnknownServerResponse(code) if *code >= 500)
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
    fn test_named_mappings() {
        assert!(matches!(Error::from_code(403), Error::InvalidTlsHandshake));
        assert!(matches!(Error::from_code(421), Error::ServiceNotAvailable));
        assert!(matches!(
            Error::from_code(450),
            Error::TemporaryMailboxNotAvailable
        ));
        assert!(matches!(Error::from_code(451), Error::ErrorInProcessing));
        assert!(matches!(Error::from_code(452), Error::InsufficientStorage));
        assert!(matches!(Error::from_code(454), Error::TemporaryAuthFailure));
        assert!(matches!(
            Error::from_code(455),
            Error::UnableToAccommodateParameter
        ));
        assert!(matches!(
            Error::from_code(500),
            Error::SyntaxErrorOrCommandNotFound
        ));
        assert!(matches!(Error::from_code(501), Error::InvalidParameter));
        assert!(matches!(Error::from_code(502), Error::CommandNotImplemented));
        assert!(matches!(
            Error::from_code(503),
            Error::InvalidCommandSequence
        ));
        assert!(matches!(
            Error::from_code(504),
            Error::ParameterNotImplemented
        ));
        assert!(matches!(
            Error::from_code(530),
            Error::AuthenticationRequired
        ));
        assert!(matches!(Error::from_code(534), Error::AuthMethodTooWeak));
        assert!(matches!(Error::from_code(535), Error::InvalidCredentials));
        assert!(matches!(
            Error::from_code(538),
            Error::EncryptionRequiredForAuthMethod
        ));
        assert!(matches!(Error::from_code(550), Error::MailboxNotAvailable));
        assert!(matches!(Error::from_code(551), Error::UserNotLocal));
        assert!(matches!(
            Error::from_code(552),
            Error::ExceededStorageAllocation
        ));
        assert!(matches!(Error::from_code(553), Error::MailboxNotAllowed));
        assert!(matches!(Error::from_code(554), Error::TransactionFailed));
        assert!(matches!(
            Error::from_code(555),
            Error::InvalidFromOrRcptParameter
        ));
    }

    #[test]
    fn test_non_error_codes_are_unexpected() {
        assert!(matches!(
            Error::from_code(250),
            Error::UnexpectedServerResponse(code) if code == "250"
        ));
        assert!(matches!(
            Error::from_code(354),
            Error::UnexpectedServerResponse(_)
        ));
    }

    #[test]
    fn test_unnamed_error_codes_are_unknown() {
        assert!(matches!(
            Error::from_code(456),
            Error::UnknownServerResponse(456)
        ));
        assert!(matches!(
            Error::from_code(599),
            Error::UnknownServerResponse(599)
        ));
    }

    #[test]
    fn test_transient_and_permanent() {
        assert!(Error::from_code(450).is_transient());
        assert!(!Error::from_code(450).is_permanent());
        assert!(Error::from_code(550).is_permanent());
        assert!(!Error::from_code(550).is_transient());
        assert!(Error::from_code(456).is_transient());
        assert!(Error::from_code(599).is_permanent());
    }
}
