//! # mailship-mime
//!
//! MIME message model and wire composer for the mailship SMTP client.
//!
//! ## Features
//!
//! - **Message model**: sender, recipient lists, subject, timestamp, and a
//!   typed body tree (single part, alternative, mixed, related)
//! - **Composition**: fixed header order, fresh boundaries per multipart
//!   container, `Message-ID` minted from the sender domain
//! - **Encodings**: quoted-printable bodies with RFC 2045 line wrapping,
//!   base64 attachments, RFC 2047 subject encoding
//! - **Datetime**: RFC 822 `Date:` header formatting
//!
//! ## Quick Start
//!
//! ```
//! use mailship_mime::{Mailbox, Message, compose};
//!
//! let message = Message::builder()
//!     .from(Mailbox::with_name("Alice", "alice@example.com"))
//!     .to(Mailbox::new("bob@example.com"))
//!     .subject("Greetings")
//!     .text("Plain text version")
//!     .html("<h1>HTML version</h1>")
//!     .build()?; // text + html become multipart/alternative
//!
//! let wire_bytes = compose::render(&message)?;
//! # Ok::<(), mailship_mime::Error>(())
//! ```
//!
//! ## Inline images
//!
//! ```
//! use mailship_mime::{ContentId, InlineAttachment, Mailbox, Message};
//!
//! let logo = ContentId::generate("example.com");
//! let message = Message::builder()
//!     .from(Mailbox::new("alice@example.com"))
//!     .to(Mailbox::new("bob@example.com"))
//!     .html(format!("<img src=\"{}\">", logo.url()))
//!     .inline(InlineAttachment::new(logo, "image/png", vec![0u8; 16]).name("logo.png"))
//!     .build()?; // becomes multipart/related
//! # Ok::<(), mailship_mime::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod address;
mod error;
mod message;

pub mod compose;
pub mod datetime;
pub mod encoding;

pub use address::{Address, Mailbox};
pub use error::{Error, Result};
pub use message::{Attachment, Body, ContentId, InlineAttachment, Message, MessageBuilder};
