//! Message model: envelope fields and the body tree.

use crate::address::Mailbox;
use crate::error::{Error, Result};
use rand::Rng;
use std::fmt;

/// Content identifier for an inline part: 16 random bytes plus a domain.
///
/// Displayed as `hex16@domain`; the HTML body references the part through
/// [`ContentId::url`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentId {
    bytes: [u8; 16],
    domain: String,
}

impl ContentId {
    /// Generates a fresh identifier under the given domain.
    #[must_use]
    pub fn generate(domain: impl Into<String>) -> Self {
        Self {
            bytes: rand::thread_rng().r#gen(),
            domain: domain.into(),
        }
    }

    /// Returns the `cid:` URL for use inside an HTML body.
    #[must_use]
    pub fn url(&self) -> String {
        format!("cid:{self}")
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.bytes {
            write!(f, "{byte:02x}")?;
        }
        write!(f, "@{}", self.domain)
    }
}

/// File part delivered with `Content-Disposition: attachment`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// File name presented to the recipient.
    pub name: String,
    /// MIME content type, e.g. `application/pdf`.
    pub content_type: String,
    /// Raw content bytes, base64-encoded on the wire.
    pub bytes: Vec<u8>,
}

impl Attachment {
    /// Creates an attachment part.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }
}

/// Part referenced from the HTML body via `cid:`, delivered with
/// `Content-Disposition: inline`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineAttachment {
    /// Identifier matching the `cid:` reference in the HTML.
    pub content_id: ContentId,
    /// Optional file name, also used for `Content-Location`.
    pub name: Option<String>,
    /// MIME content type, e.g. `image/png`.
    pub content_type: String,
    /// Raw content bytes, base64-encoded on the wire.
    pub bytes: Vec<u8>,
}

impl InlineAttachment {
    /// Creates an inline part with a pre-generated identifier.
    #[must_use]
    pub fn new(
        content_id: ContentId,
        content_type: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            content_id,
            name: None,
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Sets the file name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Body tree of a message.
///
/// Attachment kinds are encoded in the types: `Mixed` carries only
/// [`Attachment`] parts and `Related` only [`InlineAttachment`] parts, so
/// the disposition rules cannot be violated by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    /// A single `text/plain` part.
    Text(String),
    /// A single `text/html` part.
    Html(String),
    /// A single attachment part.
    Attachment(Attachment),
    /// `multipart/alternative` with a plain-text and an HTML rendition.
    Alternative {
        /// Plain-text rendition, listed first.
        text: String,
        /// HTML rendition.
        html: String,
    },
    /// `multipart/mixed`: an optional readable part plus attachments.
    Mixed {
        /// Optional plain-text rendition.
        text: Option<String>,
        /// Optional HTML rendition.
        html: Option<String>,
        /// Attachment parts following the readable part.
        attachments: Vec<Attachment>,
    },
    /// `multipart/related`: HTML plus the inline parts it references.
    Related {
        /// Optional plain-text rendition, wrapped in an outer
        /// `multipart/alternative` when present.
        text: Option<String>,
        /// HTML rendition referencing inline parts via `cid:`.
        html: String,
        /// Inline parts referenced from the HTML.
        inlines: Vec<InlineAttachment>,
    },
}

/// An email message ready for composition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Sender, also the source of the `Message-ID` domain.
    pub from: Mailbox,
    /// Primary recipients. At least one is required to send.
    pub to: Vec<Mailbox>,
    /// Carbon-copy recipients.
    pub cc: Vec<Mailbox>,
    /// Blind-carbon-copy recipients.
    pub bcc: Vec<Mailbox>,
    /// Subject line; non-ASCII subjects are RFC 2047 encoded.
    pub subject: Option<String>,
    /// Seconds since the Unix epoch; `None` means the current wall clock.
    pub timestamp: Option<i64>,
    /// Body tree.
    pub body: Body,
}

impl Message {
    /// Starts building a message.
    #[must_use]
    pub fn builder() -> MessageBuilder {
        MessageBuilder::default()
    }
}

/// Fluent builder for [`Message`].
///
/// The body shape is derived from what was supplied: text and HTML together
/// become `multipart/alternative`, attachments force `multipart/mixed`, and
/// inline parts force `multipart/related`.
#[derive(Debug, Default)]
pub struct MessageBuilder {
    from: Option<Mailbox>,
    to: Vec<Mailbox>,
    cc: Vec<Mailbox>,
    bcc: Vec<Mailbox>,
    subject: Option<String>,
    timestamp: Option<i64>,
    text: Option<String>,
    html: Option<String>,
    attachments: Vec<Attachment>,
    inlines: Vec<InlineAttachment>,
    body: Option<Body>,
}

impl MessageBuilder {
    /// Sets the sender.
    #[must_use]
    pub fn from(mut self, from: Mailbox) -> Self {
        self.from = Some(from);
        self
    }

    /// Adds a primary recipient.
    #[must_use]
    pub fn to(mut self, to: Mailbox) -> Self {
        self.to.push(to);
        self
    }

    /// Adds a carbon-copy recipient.
    #[must_use]
    pub fn cc(mut self, cc: Mailbox) -> Self {
        self.cc.push(cc);
        self
    }

    /// Adds a blind-carbon-copy recipient.
    #[must_use]
    pub fn bcc(mut self, bcc: Mailbox) -> Self {
        self.bcc.push(bcc);
        self
    }

    /// Sets the subject line.
    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Pins the `Date:` header to a Unix timestamp.
    #[must_use]
    pub const fn timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Sets the plain-text rendition.
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Sets the HTML rendition.
    #[must_use]
    pub fn html(mut self, html: impl Into<String>) -> Self {
        self.html = Some(html.into());
        self
    }

    /// Adds an attachment part.
    #[must_use]
    pub fn attach(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Adds an inline part referenced from the HTML body.
    #[must_use]
    pub fn inline(mut self, inline: InlineAttachment) -> Self {
        self.inlines.push(inline);
        self
    }

    /// Overrides the derived body with an explicit tree.
    #[must_use]
    pub fn body(mut self, body: Body) -> Self {
        self.body = Some(body);
        self
    }

    /// Finalizes the message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IncompleteMessage`] when the sender or body is
    /// missing, or when inline parts were added without an HTML body to
    /// reference them.
    pub fn build(self) -> Result<Message> {
        let from = self.from.ok_or(Error::IncompleteMessage("from address"))?;
        let body = match self.body {
            Some(body) => body,
            None if !self.inlines.is_empty() => {
                let html = self
                    .html
                    .ok_or(Error::IncompleteMessage("html body for inline parts"))?;
                Body::Related {
                    text: self.text,
                    html,
                    inlines: self.inlines,
                }
            }
            None if !self.attachments.is_empty() => Body::Mixed {
                text: self.text,
                html: self.html,
                attachments: self.attachments,
            },
            None => match (self.text, self.html) {
                (Some(text), Some(html)) => Body::Alternative { text, html },
                (Some(text), None) => Body::Text(text),
                (None, Some(html)) => Body::Html(html),
                (None, None) => return Err(Error::IncompleteMessage("body")),
            },
        };

        Ok(Message {
            from,
            to: self.to,
            cc: self.cc,
            bcc: self.bcc,
            subject: self.subject,
            timestamp: self.timestamp,
            body,
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
    fn test_content_id_display() {
        let id = ContentId::generate("example.com");
        let rendered = id.to_string();
        let (hex, domain) = rendered.split_once('@').unwrap();
        assert_eq!(hex.len(), 32);
        assert!(hex.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase()));
        assert_eq!(domain, "example.com");
        assert_eq!(id.url(), format!("cid:{rendered}"));
    }

    #[test]
    fn test_content_ids_are_unique() {
        let a = ContentId::generate("example.com");
        let b = ContentId::generate("example.com");
        assert_ne!(a, b);
    }

    #[test]
    fn test_builder_text_only() {
        let message = Message::builder()
            .from(Mailbox::new("a@x.test"))
            .to(Mailbox::new("b@x.test"))
            .text("hi")
            .build()
            .unwrap();
        assert_eq!(message.body, Body::Text("hi".to_string()));
    }

    #[test]
    fn test_builder_alternative() {
        let message = Message::builder()
            .from(Mailbox::new("a@x.test"))
            .text("hi")
            .html("<p>hi</p>")
            .build()
            .unwrap();
        assert!(matches!(message.body, Body::Alternative { .. }));
    }

    #[test]
    fn test_builder_mixed() {
        let message = Message::builder()
            .from(Mailbox::new("a@x.test"))
            .text("see attachment")
            .attach(Attachment::new("a.bin", "application/octet-stream", vec![1, 2]))
            .build()
            .unwrap();
        assert!(matches!(message.body, Body::Mixed { .. }));
    }

    #[test]
    fn test_builder_related() {
        let id = ContentId::generate("x.test");
        let message = Message::builder()
            .from(Mailbox::new("a@x.test"))
            .html(format!("<img src=\"{}\">", id.url()))
            .inline(InlineAttachment::new(id, "image/png", vec![1, 2]))
            .build()
            .unwrap();
        assert!(matches!(message.body, Body::Related { .. }));
    }

    #[test]
    fn test_builder_related_requires_html() {
        let id = ContentId::generate("x.test");
        let err = Message::builder()
            .from(Mailbox::new("a@x.test"))
            .text("no html here")
            .inline(InlineAttachment::new(id, "image/png", vec![1, 2]))
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::IncompleteMessage(_)));
    }

    #[test]
    fn test_builder_requires_from() {
        let err = Message::builder().text("hi").build().unwrap_err();
        assert!(matches!(err, Error::IncompleteMessage("from address")));
    }

    #[test]
    fn test_builder_requires_body() {
        let err = Message::builder()
            .from(Mailbox::new("a@x.test"))
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::IncompleteMessage("body")));
    }
}
