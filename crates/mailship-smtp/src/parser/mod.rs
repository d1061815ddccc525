//! SMTP reply-line parser.

use crate::error::{Error, Result};

/// One parsed server reply line.
///
/// SMTP replies are one or more lines, each starting with a three-digit
/// code. A `-` after the code marks a continuation line; a space (or the
/// end of the line) marks the terminal line of the reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplyLine<'a> {
    /// Three-digit reply code.
    pub code: u16,
    /// True when more lines of this reply follow.
    pub continuation: bool,
    /// Text after the separator.
    pub payload: &'a str,
}

/// Parses one reply line with the terminator already stripped.
///
/// The fourth byte selects between continuation (`-`) and terminal (space);
/// any other fourth byte belongs to the payload of a terminal line.
///
/// # Errors
///
/// Returns [`Error::UnexpectedServerResponse`] when the line is shorter
/// than the code or does not start with three decimal digits.
pub fn parse_line(line: &str) -> Result<ReplyLine<'_>> {
    let bytes = line.as_bytes();
    if bytes.len() < 3 || !bytes[..3].iter().all(u8::is_ascii_digit) {
        return Err(Error::UnexpectedServerResponse(line.to_string()));
    }

    let code = u16::from(bytes[0] - b'0') * 100
        + u16::from(bytes[1] - b'0') * 10
        + u16::from(bytes[2] - b'0');

    let (continuation, payload) = match bytes.get(3) {
        None => (false, ""),
        Some(b'-') => (true, &line[4..]),
        Some(b' ') => (false, &line[4..]),
        Some(_) => (false, &line[3..]),
    };

    Ok(ReplyLine {
        code,
        continuation,
        payload,
    })
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
    fn test_terminal_line() {
        let line = parse_line("250 OK").unwrap();
        assert_eq!(line.code, 250);
        assert!(!line.continuation);
        assert_eq!(line.payload, "OK");
    }

    #[test]
    fn test_continuation_line() {
        let line = parse_line("250-STARTTLS").unwrap();
        assert_eq!(line.code, 250);
        assert!(line.continuation);
        assert_eq!(line.payload, "STARTTLS");
    }

    #[test]
    fn test_bare_code() {
        let line = parse_line("354").unwrap();
        assert_eq!(line.code, 354);
        assert!(!line.continuation);
        assert_eq!(line.payload, "");
    }

    #[test]
    fn test_other_fourth_byte_joins_payload() {
        let line = parse_line("250ok").unwrap();
        assert_eq!(line.code, 250);
        assert!(!line.continuation);
        assert_eq!(line.payload, "ok");
    }

    #[test]
    fn test_greeting() {
        let line = parse_line("220 smtp.example.com ESMTP ready").unwrap();
        assert_eq!(line.code, 220);
        assert_eq!(line.payload, "smtp.example.com ESMTP ready");
    }

    #[test]
    fn test_too_short_rejected() {
        assert!(parse_line("25").is_err());
        assert!(parse_line("").is_err());
    }

    #[test]
    fn test_non_digit_code_rejected() {
        assert!(parse_line("ABC OK").is_err());
        assert!(parse_line("2x0 OK").is_err());
    }
}
