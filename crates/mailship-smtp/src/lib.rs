//! # mailship-smtp
//!
//! Async SMTP submission client implementing RFC 5321.
//!
//! ## Features
//!
//! - **Type-state dialog**: compile-time enforcement of valid SMTP state
//!   transitions (greeting, envelope, data)
//! - **TLS**: implicit TLS (`smtps://`, port 465) and opportunistic
//!   STARTTLS upgrades over the same socket
//! - **Authentication**: PLAIN, LOGIN, and XOAUTH2, selected by precedence
//!   from the server's `AUTH` capability; TLS is mandatory before
//!   credentials go on the wire
//! - **Extensions**: SMTPUTF8 and 8BITMIME parameters applied to the
//!   envelope when offered
//! - **Composition**: messages rendered by [`mailship_mime`], streamed
//!   with RFC 5321 dot-stuffing
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailship_smtp::{Credentials, Mailer};
//! use mailship_mime::{Mailbox, Message};
//!
//! #[tokio::main]
//! async fn main() -> mailship_smtp::Result<()> {
//!     let message = Message::builder()
//!         .from(Mailbox::with_name("Alice", "alice@example.com"))
//!         .to(Mailbox::new("bob@example.com"))
//!         .subject("Greetings")
//!         .text("Hello from mailship")
//!         .build()?;
//!
//!     Mailer::new("smtp://mail.example.com:587")?
//!         .credentials(Credentials::new("alice@example.com", "app-password"))
//!         .send(&message)
//!         .await
//! }
//! ```
//!
//! ## Dialog states
//!
//! ```text
//! Connected ── auth() ──→ Authenticated
//!     │                        │
//!     └────── mail_from() ─────┘
//!                 │
//!                 ▼
//!         MailTransaction ── rcpt_to() ──→ RecipientAdded ── data() ──→ Data
//! ```
//!
//! ## Modules
//!
//! - [`auth`]: credentials and SASL response encoding
//! - [`command`]: SMTP command builders
//! - [`connection`]: endpoint URLs, streams, and the type-state client
//! - [`parser`]: reply-line parser
//! - [`types`]: replies and negotiated extensions

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod auth;
pub mod command;
pub mod connection;
mod error;
mod mailer;
pub mod parser;
pub mod types;

pub use auth::Credentials;
pub use connection::{
    Authenticated, Client, Connected, Data, Endpoint, MailTransaction, Protocol, RecipientAdded,
    SmtpStream,
};
pub use error::{Error, Result};
pub use mailer::Mailer;
pub use types::{AuthMechanism, Extensions, Reply, ReplyCode};

// The message model this client submits.
pub use mailship_mime::{Address, Body, Mailbox, Message};
