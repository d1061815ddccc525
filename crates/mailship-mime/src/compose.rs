//! Renders a [`Message`] into the byte stream that follows `DATA`.
//!
//! The output ends with CRLF and carries no SMTP framing: dot-stuffing and
//! the terminating `.` line belong to the session layer.

use crate::address::Mailbox;
use crate::datetime;
use crate::encoding::{encode_base64, encode_quoted_printable, encode_subject};
use crate::error::Result;
use crate::message::{Attachment, Body, ContentId, InlineAttachment, Message};
use rand::Rng;
use std::fmt;
use std::io::Write;

/// Multipart boundary: 16 random bytes as lowercase hex, generated fresh
/// per container so nested containers never collide.
struct Boundary([u8; 16]);

impl Boundary {
    fn generate() -> Self {
        Self(rand::thread_rng().r#gen())
    }
}

impl fmt::Display for Boundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Renders the full message: headers, then the body tree.
///
/// # Errors
///
/// Returns [`crate::Error::ExpectedEmailDomain`] when the sender address has
/// no domain to mint the `Message-ID` from; in that case no bytes are
/// produced. Writer errors surface as [`crate::Error::Io`].
pub fn render(message: &Message) -> Result<Vec<u8>> {
    let domain = message.from.address.domain()?;
    let mut out = Vec::new();
    write_headers(&mut out, message, domain)?;
    write_body(&mut out, &message.body)?;
    Ok(out)
}

fn write_headers<W: Write>(out: &mut W, message: &Message, domain: &str) -> Result<()> {
    write!(out, "From: {}\r\n", message.from)?;
    write_mailbox_list(out, "To", &message.to)?;
    write_mailbox_list(out, "Cc", &message.cc)?;
    write_mailbox_list(out, "Bcc", &message.bcc)?;
    if let Some(subject) = &message.subject {
        out.write_all(b"Subject: ")?;
        encode_subject(subject, out)?;
        out.write_all(b"\r\n")?;
    }
    let timestamp = message.timestamp.unwrap_or_else(datetime::now);
    write!(out, "Date: {}\r\n", datetime::format_rfc822(timestamp))?;
    out.write_all(b"MIME-Version: 1.0\r\n")?;
    write!(out, "Message-ID: <{}>\r\n", ContentId::generate(domain))?;
    Ok(())
}

fn write_mailbox_list<W: Write>(out: &mut W, header: &str, mailboxes: &[Mailbox]) -> Result<()> {
    if mailboxes.is_empty() {
        return Ok(());
    }
    let rendered = mailboxes
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    write!(out, "{header}: {rendered}\r\n")?;
    Ok(())
}

fn write_body<W: Write>(out: &mut W, body: &Body) -> Result<()> {
    match body {
        Body::Text(text) => write_text_part(out, "text/plain", text)?,
        Body::Html(html) => write_text_part(out, "text/html", html)?,
        Body::Attachment(attachment) => write_attachment(out, attachment)?,
        Body::Alternative { text, html } => write_alternative(out, text, html)?,
        Body::Mixed {
            text,
            html,
            attachments,
        } => write_mixed(out, text.as_deref(), html.as_deref(), attachments)?,
        Body::Related {
            text,
            html,
            inlines,
        } => write_related(out, text.as_deref(), html, inlines)?,
    }
    Ok(())
}

/// One readable part: headers, blank line, quoted-printable content.
fn write_text_part<W: Write>(out: &mut W, content_type: &str, body: &str) -> Result<()> {
    write!(out, "Content-Type: {content_type}; charset=utf-8\r\n")?;
    out.write_all(b"Content-Transfer-Encoding: quoted-printable\r\n\r\n")?;
    encode_quoted_printable(body.as_bytes(), out)?;
    out.write_all(b"\r\n")?;
    Ok(())
}

fn write_attachment<W: Write>(out: &mut W, attachment: &Attachment) -> Result<()> {
    write!(out, "Content-Type: {}\r\n", attachment.content_type)?;
    write!(
        out,
        "Content-Disposition: attachment; filename={}\r\n",
        attachment.name
    )?;
    out.write_all(b"Content-Transfer-Encoding: base64\r\n\r\n")?;
    out.write_all(encode_base64(&attachment.bytes).as_bytes())?;
    out.write_all(b"\r\n")?;
    Ok(())
}

fn write_inline<W: Write>(out: &mut W, inline: &InlineAttachment) -> Result<()> {
    write!(out, "Content-Type: {}\r\n", inline.content_type)?;
    match &inline.name {
        Some(name) => {
            write!(out, "Content-Disposition: inline; filename={name}\r\n")?;
            write!(out, "Content-Location: {name}\r\n")?;
        }
        None => out.write_all(b"Content-Disposition: inline\r\n")?,
    }
    write!(out, "Content-Id: <{}>\r\n", inline.content_id)?;
    out.write_all(b"Content-Transfer-Encoding: base64\r\n\r\n")?;
    out.write_all(encode_base64(&inline.bytes).as_bytes())?;
    out.write_all(b"\r\n")?;
    Ok(())
}

fn write_alternative<W: Write>(out: &mut W, text: &str, html: &str) -> Result<()> {
    let boundary = Boundary::generate();
    write!(
        out,
        "Content-Type: multipart/alternative; boundary=\"{boundary}\"\r\n\r\n"
    )?;
    write!(out, "--{boundary}\r\n")?;
    write_text_part(out, "text/plain", text)?;
    write!(out, "--{boundary}\r\n")?;
    write_text_part(out, "text/html", html)?;
    write!(out, "--{boundary}--\r\n")?;
    Ok(())
}

fn write_mixed<W: Write>(
    out: &mut W,
    text: Option<&str>,
    html: Option<&str>,
    attachments: &[Attachment],
) -> Result<()> {
    let boundary = Boundary::generate();
    write!(
        out,
        "Content-Type: multipart/mixed; boundary=\"{boundary}\"\r\n\r\n"
    )?;
    match (text, html) {
        (Some(text), Some(html)) => {
            write!(out, "--{boundary}\r\n")?;
            write_alternative(out, text, html)?;
        }
        (Some(text), None) => {
            write!(out, "--{boundary}\r\n")?;
            write_text_part(out, "text/plain", text)?;
        }
        (None, Some(html)) => {
            write!(out, "--{boundary}\r\n")?;
            write_text_part(out, "text/html", html)?;
        }
        (None, None) => {}
    }
    for attachment in attachments {
        write!(out, "--{boundary}\r\n")?;
        write_attachment(out, attachment)?;
    }
    write!(out, "--{boundary}--\r\n")?;
    Ok(())
}

fn write_related<W: Write>(
    out: &mut W,
    text: Option<&str>,
    html: &str,
    inlines: &[InlineAttachment],
) -> Result<()> {
    match text {
        Some(text) => {
            let boundary = Boundary::generate();
            write!(
                out,
                "Content-Type: multipart/alternative; boundary=\"{boundary}\"\r\n\r\n"
            )?;
            write!(out, "--{boundary}\r\n")?;
            write_text_part(out, "text/plain", text)?;
            write!(out, "--{boundary}\r\n")?;
            write_related_block(out, html, inlines)?;
            write!(out, "--{boundary}--\r\n")?;
        }
        None => write_related_block(out, html, inlines)?,
    }
    Ok(())
}

fn write_related_block<W: Write>(
    out: &mut W,
    html: &str,
    inlines: &[InlineAttachment],
) -> Result<()> {
    let boundary = Boundary::generate();
    write!(
        out,
        "Content-Type: multipart/related; boundary=\"{boundary}\"\r\n\r\n"
    )?;
    write!(out, "--{boundary}\r\n")?;
    write_text_part(out, "text/html", html)?;
    for inline in inlines {
        write!(out, "--{boundary}\r\n")?;
        write_inline(out, inline)?;
    }
    write!(out, "--{boundary}--\r\n")?;
    Ok(())
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
    use crate::error::Error;
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;

    fn text_message() -> Message {
        Message::builder()
            .from(Mailbox::with_name("Alice", "alice@example.com"))
            .to(Mailbox::new("bob@example.com"))
            .subject("Greetings")
            .timestamp(0)
            .text("Hello")
            .build()
            .unwrap()
    }

    fn rendered(message: &Message) -> String {
        String::from_utf8(render(message).unwrap()).unwrap()
    }

    /// Extracts the boundary of the first multipart header in the output.
    fn first_boundary(output: &str) -> &str {
        let start = output.find("boundary=\"").unwrap() + "boundary=\"".len();
        let end = output[start..].find('"').unwrap();
        &output[start..start + end]
    }

    #[test]
    fn test_header_order() {
        let output = rendered(&text_message());
        let positions: Vec<usize> = [
            "From: ",
            "To: ",
            "Subject: ",
            "Date: ",
            "MIME-Version: 1.0",
            "Message-ID: <",
            "Content-Type: text/plain",
        ]
        .iter()
        .map(|h| output.find(h).unwrap_or_else(|| panic!("missing {h}")))
        .collect();
        let mut sorted = positions.clone();
        sorted.sort_unstable();
        assert_eq!(positions, sorted);
    }

    #[test]
    fn test_fixed_timestamp_date_header() {
        let output = rendered(&text_message());
        assert!(output.contains("Date: 01 Jan 1970 00:00:00 +0000\r\n"));
    }

    #[test]
    fn test_absent_timestamp_still_emits_date() {
        let mut message = text_message();
        message.timestamp = None;
        let output = rendered(&message);
        assert!(output.contains("\r\nDate: "));
    }

    #[test]
    fn test_recipient_lists_share_separator_style() {
        let mut message = text_message();
        message.to.push(Mailbox::new("carol@example.com"));
        message.cc.push(Mailbox::new("dave@example.com"));
        message.bcc.push(Mailbox::new("erin@example.com"));
        let output = rendered(&message);
        assert!(output.contains("To: <bob@example.com>, <carol@example.com>\r\n"));
        assert!(output.contains("Cc: <dave@example.com>\r\n"));
        assert!(output.contains("Bcc: <erin@example.com>\r\n"));
    }

    #[test]
    fn test_message_id_domain_from_sender() {
        let output = rendered(&text_message());
        let start = output.find("Message-ID: <").unwrap() + "Message-ID: <".len();
        let end = output[start..].find('>').unwrap();
        let id = &output[start..start + end];
        let (hex, domain) = id.split_once('@').unwrap();
        assert_eq!(hex.len(), 32);
        assert_eq!(domain, "example.com");
    }

    #[test]
    fn test_missing_from_domain_rejected_before_output() {
        let mut message = text_message();
        message.from = Mailbox::new("nodomain");
        assert!(matches!(
            render(&message),
            Err(Error::ExpectedEmailDomain(_))
        ));
    }

    #[test]
    fn test_non_ascii_subject_encoded() {
        let mut message = text_message();
        message.subject = Some("Grüße".to_string());
        let output = rendered(&message);
        assert!(output.contains("Subject: =?UTF-8?Q?Gr=C3=BC=C3=9Fe?=\r\n"));
    }

    #[test]
    fn test_alternative_layout() {
        let message = Message::builder()
            .from(Mailbox::new("a@x.test"))
            .to(Mailbox::new("b@x.test"))
            .text("Hello")
            .html("<p>Hi</p>")
            .build()
            .unwrap();
        let output = rendered(&message);
        let boundary = first_boundary(&output);

        assert_eq!(output.matches(&format!("--{boundary}")).count(), 3);
        assert!(output.contains(&format!("--{boundary}--\r\n")));
        let text_at = output.find("Content-Type: text/plain").unwrap();
        let html_at = output.find("Content-Type: text/html").unwrap();
        assert!(text_at < html_at);
        assert_eq!(
            output
                .matches("Content-Transfer-Encoding: quoted-printable")
                .count(),
            2
        );
    }

    #[test]
    fn test_mixed_nests_alternative_with_distinct_boundary() {
        let message = Message::builder()
            .from(Mailbox::new("a@x.test"))
            .to(Mailbox::new("b@x.test"))
            .text("Hello")
            .html("<p>Hi</p>")
            .attach(Attachment::new("data.bin", "application/octet-stream", vec![0, 159, 255]))
            .build()
            .unwrap();
        let output = rendered(&message);

        let outer = first_boundary(&output);
        let inner_at = output.find("multipart/alternative").unwrap();
        let inner = first_boundary(&output[inner_at..]);
        assert_ne!(outer, inner);
        assert!(output.contains("Content-Type: multipart/mixed"));
        assert!(output.contains(&format!("--{outer}--\r\n")));
        assert!(output.contains(&format!("--{inner}--\r\n")));
        assert!(output.contains("Content-Disposition: attachment; filename=data.bin\r\n"));
    }

    #[test]
    fn test_attachment_bytes_round_trip() {
        let payload: Vec<u8> = (0u16..=255).map(|b| b as u8).collect();
        let message = Message::builder()
            .from(Mailbox::new("a@x.test"))
            .to(Mailbox::new("b@x.test"))
            .text("see attachment")
            .attach(Attachment::new("blob", "application/octet-stream", payload.clone()))
            .build()
            .unwrap();
        let output = rendered(&message);

        let marker = "Content-Transfer-Encoding: base64\r\n\r\n";
        let start = output.find(marker).unwrap() + marker.len();
        let end = output[start..].find("\r\n").unwrap();
        let decoded = STANDARD.decode(&output[start..start + end]).unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn test_related_wrapped_in_alternative_when_text_present() {
        let id = ContentId::generate("x.test");
        let cid = id.to_string();
        let message = Message::builder()
            .from(Mailbox::new("a@x.test"))
            .to(Mailbox::new("b@x.test"))
            .text("plain fallback")
            .html(format!("<img src=\"{}\">", id.url()))
            .inline(InlineAttachment::new(id, "image/png", vec![1, 2, 3]).name("pixel.png"))
            .build()
            .unwrap();
        let output = rendered(&message);

        assert!(output.contains("Content-Type: multipart/alternative"));
        assert!(output.contains("Content-Type: multipart/related"));
        let text_at = output.find("Content-Type: text/plain").unwrap();
        let related_at = output.find("Content-Type: multipart/related").unwrap();
        assert!(text_at < related_at);
        assert!(output.contains("Content-Disposition: inline; filename=pixel.png\r\n"));
        assert!(output.contains("Content-Location: pixel.png\r\n"));
        assert!(output.contains(&format!("Content-Id: <{cid}>\r\n")));
    }

    #[test]
    fn test_related_without_text_has_no_alternative_wrapper() {
        let id = ContentId::generate("x.test");
        let message = Message::builder()
            .from(Mailbox::new("a@x.test"))
            .to(Mailbox::new("b@x.test"))
            .html(format!("<img src=\"{}\">", id.url()))
            .inline(InlineAttachment::new(id, "image/png", vec![1, 2, 3]))
            .build()
            .unwrap();
        let output = rendered(&message);

        assert!(!output.contains("multipart/alternative"));
        assert!(output.contains("Content-Type: multipart/related"));
        assert!(output.contains("Content-Disposition: inline\r\n"));
        assert!(!output.contains("Content-Location"));
    }

    #[test]
    fn test_single_attachment_body() {
        let message = Message::builder()
            .from(Mailbox::new("a@x.test"))
            .to(Mailbox::new("b@x.test"))
            .body(Body::Attachment(Attachment::new(
                "report.pdf",
                "application/pdf",
                vec![1, 2, 3],
            )))
            .build()
            .unwrap();
        let output = rendered(&message);
        assert!(output.contains("Content-Type: application/pdf\r\n"));
        assert!(output.contains("Content-Disposition: attachment; filename=report.pdf\r\n"));
        assert!(!output.contains("multipart"));
    }

    #[test]
    fn test_output_ends_with_crlf() {
        for message in [text_message()] {
            let output = rendered(&message);
            assert!(output.ends_with("\r\n"));
        }
    }

    #[test]
    fn test_multipart_closes_every_container() {
        let id = ContentId::generate("x.test");
        let message = Message::builder()
            .from(Mailbox::new("a@x.test"))
            .to(Mailbox::new("b@x.test"))
            .text("plain")
            .html("<p>html</p>")
            .inline(InlineAttachment::new(id, "image/png", vec![9]))
            .build()
            .unwrap();
        let output = rendered(&message);
        // Two containers, two closings.
        assert_eq!(output.matches("--\r\n").count(), 2);
    }
}
