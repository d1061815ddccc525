//! Error types for message composition.

use std::io;

/// Result type alias for composition operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Composition error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The sender address has no domain part after `@`.
    ///
    /// The domain is needed to mint `Message-ID` and `Content-Id` values,
    /// so composition is rejected before any output is produced.
    #[error("expected a domain after '@' in address: {0}")]
    ExpectedEmailDomain(String),

    /// A builder was finalized without a required field.
    #[error("incomplete message: missing {0}")]
    IncompleteMessage(&'static str),

    /// Writer error while rendering.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
