//! Wire encodings: base64 bodies, quoted-printable, RFC 2047 subjects.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::io::{self, Write};

/// Encodes bytes as base64 (standard alphabet, padded, no line breaks).
#[must_use]
pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Columns available on a quoted-printable line before the soft break `=`.
///
/// A full line is then 76 characters, the RFC 2045 section 6.7 limit.
const QP_LINE_LIMIT: usize = 75;

/// Encodes a byte stream as quoted-printable (RFC 2045 section 6.7).
///
/// Printable ASCII passes through literally; `=` becomes `=3D`; everything
/// else becomes an uppercase `=XX` escape. CRLF pairs are hard line breaks
/// and survive literally. A lone `\r` or `\n` is escaped. Whitespace that
/// would end up trailing on a wire line is escaped so it survives transport:
/// the last space or tab of a run before a line break, and every byte of a
/// whitespace run at the end of the input.
///
/// # Errors
///
/// The encoder itself is total; only writer errors are returned.
pub fn encode_quoted_printable<W: Write>(src: &[u8], out: &mut W) -> io::Result<()> {
    let mut encoder = QpEncoder::new(out);
    for &byte in src {
        encoder.push(byte)?;
    }
    encoder.finish()
}

struct QpEncoder<'a, W: Write> {
    out: &'a mut W,
    col: usize,
    /// Run of spaces and tabs not yet committed. Whether they are emitted
    /// literally or escaped depends on what follows the run.
    pending_ws: Vec<u8>,
    /// A `\r` has been seen and may still pair with a `\n`.
    pending_cr: bool,
}

impl<'a, W: Write> QpEncoder<'a, W> {
    fn new(out: &'a mut W) -> Self {
        Self {
            out,
            col: 0,
            pending_ws: Vec::new(),
            pending_cr: false,
        }
    }

    fn push(&mut self, byte: u8) -> io::Result<()> {
        if self.pending_cr {
            self.pending_cr = false;
            if byte == b'\n' {
                self.flush_ws_before_break()?;
                self.out.write_all(b"\r\n")?;
                self.col = 0;
                return Ok(());
            }
            // Lone CR: escape it, plus the whitespace in front of it.
            self.flush_ws_before_break()?;
            self.escape(b'\r')?;
        }

        match byte {
            b' ' | b'\t' => self.pending_ws.push(byte),
            b'\r' => self.pending_cr = true,
            b'\n' => {
                // Lone LF, treated the same as a lone CR.
                self.flush_ws_before_break()?;
                self.escape(b'\n')?;
            }
            b'=' => {
                self.flush_ws_literal()?;
                self.escape(b'=')?;
            }
            b'!'..=b'~' => {
                self.flush_ws_literal()?;
                self.literal(byte)?;
            }
            _ => {
                self.flush_ws_literal()?;
                self.escape(byte)?;
            }
        }
        Ok(())
    }

    fn finish(mut self) -> io::Result<()> {
        // Whatever is still pending is trailing on the final line and must
        // be escaped in full to survive transport.
        let run = std::mem::take(&mut self.pending_ws);
        for ws in run {
            self.escape(ws)?;
        }
        if self.pending_cr {
            self.escape(b'\r')?;
        }
        Ok(())
    }

    /// Commits the pending whitespace run ahead of a printable byte.
    fn flush_ws_literal(&mut self) -> io::Result<()> {
        let run = std::mem::take(&mut self.pending_ws);
        for ws in run {
            self.literal(ws)?;
        }
        Ok(())
    }

    /// Commits the pending whitespace run ahead of a line terminator.
    ///
    /// Only the final byte of the run needs the `=XX` form: once it is
    /// escaped, the bytes before it no longer trail on the wire line.
    fn flush_ws_before_break(&mut self) -> io::Result<()> {
        let run = std::mem::take(&mut self.pending_ws);
        if let Some((&last, rest)) = run.split_last() {
            for &ws in rest {
                self.literal(ws)?;
            }
            self.escape(last)?;
        }
        Ok(())
    }

    fn literal(&mut self, byte: u8) -> io::Result<()> {
        if self.col + 1 > QP_LINE_LIMIT {
            self.soft_break()?;
        }
        self.out.write_all(&[byte])?;
        self.col += 1;
        Ok(())
    }

    fn escape(&mut self, byte: u8) -> io::Result<()> {
        if self.col + 3 > QP_LINE_LIMIT {
            self.soft_break()?;
        }
        write!(self.out, "={byte:02X}")?;
        self.col += 3;
        Ok(())
    }

    fn soft_break(&mut self) -> io::Result<()> {
        self.out.write_all(b"=\r\n")?;
        self.col = 0;
        Ok(())
    }
}

/// Writes a `Subject:` header value, RFC 2047-wrapping non-ASCII subjects.
///
/// ASCII subjects pass through untouched. A subject containing any high-bit
/// byte is emitted as a single `=?UTF-8?Q?…?=` encoded word whose inner text
/// comes from the quoted-printable encoder.
///
/// # Errors
///
/// Only writer errors are returned.
pub fn encode_subject<W: Write>(subject: &str, out: &mut W) -> io::Result<()> {
    if subject.bytes().any(|b| !b.is_ascii()) {
        out.write_all(b"=?UTF-8?Q?")?;
        encode_quoted_printable(subject.as_bytes(), out)?;
        out.write_all(b"?=")
    } else {
        out.write_all(subject.as_bytes())
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

    fn encode(src: &[u8]) -> String {
        let mut out = Vec::new();
        encode_quoted_printable(src, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    /// Reference decoder: drops soft breaks, resolves `=XX`, keeps the rest.
    fn decode(encoded: &str) -> Vec<u8> {
        let bytes = encoded.as_bytes();
        let mut out = Vec::new();
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] == b'=' {
                if bytes[i + 1] == b'\r' {
                    i += 3; // soft break
                } else {
                    out.push(u8::from_str_radix(&encoded[i + 1..i + 3], 16).unwrap());
                    i += 3;
                }
            } else {
                out.push(bytes[i]);
                i += 1;
            }
        }
        out
    }

    #[test]
    fn test_plain_ascii_passthrough() {
        assert_eq!(encode(b"Hello, World!"), "Hello, World!");
    }

    #[test]
    fn test_equals_always_escaped() {
        assert_eq!(encode(b"a=b"), "a=3Db");
    }

    #[test]
    fn test_non_ascii_escaped_uppercase() {
        assert_eq!(encode("é".as_bytes()), "=C3=A9");
    }

    #[test]
    fn test_crlf_survives_literally() {
        assert_eq!(encode(b"one\r\ntwo"), "one\r\ntwo");
    }

    #[test]
    fn test_lone_cr_escaped() {
        assert_eq!(encode(b"odd\rline"), "odd=0Dline");
    }

    #[test]
    fn test_lone_lf_escaped() {
        assert_eq!(encode(b"odd\nline"), "odd=0Aline");
    }

    #[test]
    fn test_whitespace_before_crlf_escaped() {
        assert_eq!(encode(b"a \r\nb"), "a=20\r\nb");
        assert_eq!(encode(b"a\t\r\nb"), "a=09\r\nb");
    }

    #[test]
    fn test_whitespace_run_before_crlf_escapes_last_only() {
        assert_eq!(encode(b"a\t\t\r\nb"), "a\t=09\r\nb");
    }

    #[test]
    fn test_whitespace_before_lone_terminator_escaped() {
        assert_eq!(encode(b"a \rb"), "a=20=0Db");
        assert_eq!(encode(b"a \nb"), "a=20=0Ab");
    }

    #[test]
    fn test_trailing_whitespace_fully_escaped() {
        assert_eq!(encode(b"line  "), "line=20=20");
        assert_eq!(encode(b"line\t"), "line=09");
        assert_eq!(encode(b"line \r"), "line=20=0D");
    }

    #[test]
    fn test_stateful_edge_mix() {
        let input = b"= spaced\t\t\r\nend\xC3\xA9\r\nodd\rline  ";
        assert_eq!(encode(input), "=3D spaced\t=09\r\nend=C3=A9\r\nodd=0Dline=20=20");
    }

    #[test]
    fn test_75_columns_not_wrapped() {
        let input = "a".repeat(75);
        assert_eq!(encode(input.as_bytes()), input);
    }

    #[test]
    fn test_76_columns_soft_wrapped_once() {
        let input = "a".repeat(76);
        let encoded = encode(input.as_bytes());
        assert_eq!(encoded, format!("{}=\r\n{}", "a".repeat(75), "a"));
    }

    #[test]
    fn test_escape_never_split_across_lines() {
        // 74 literals leave 1 column; the escape must move to a new line.
        let mut input = vec![b'a'; 74];
        input.push(0xC3);
        let encoded = encode(&input);
        assert_eq!(encoded, format!("{}=\r\n=C3", "a".repeat(74)));
    }

    #[test]
    fn test_no_line_exceeds_limit() {
        let mut input = Vec::new();
        for i in 0u16..600 {
            input.push((i % 251) as u8);
        }
        let encoded = encode(&input);
        for line in encoded.split("\r\n") {
            assert!(line.len() <= 76, "line too long: {line:?}");
        }
    }

    #[test]
    fn test_round_trip() {
        let cases: &[&[u8]] = &[
            b"plain",
            b"= spaced\t\t\r\nend\xC3\xA9\r\nodd\rline  ",
            b"trailing ws \t ",
            b"a\r\n\r\nb",
            b"\x00\x01\x02binary\xFF",
            b"ends with break\r\n",
        ];
        for &case in cases {
            let encoded = encode(case);
            assert_eq!(decode(&encoded), case, "case {case:?}");
        }
    }

    #[test]
    fn test_long_input_round_trip() {
        let input: Vec<u8> = (0u16..2000).map(|i| (i % 256) as u8).collect();
        let encoded = encode(&input);
        assert_eq!(decode(&encoded), input);
        for line in encoded.split("\r\n") {
            assert!(line.len() <= 76);
        }
    }

    #[test]
    fn test_subject_ascii_untouched() {
        let mut out = Vec::new();
        encode_subject("Weekly report", &mut out).unwrap();
        assert_eq!(out, b"Weekly report");
    }

    #[test]
    fn test_subject_non_ascii_wrapped() {
        let mut out = Vec::new();
        encode_subject("Héllo", &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "=?UTF-8?Q?H=C3=A9llo?=");
    }

    #[test]
    fn test_base64_standard_padded() {
        assert_eq!(encode_base64(b"Hello, World!"), "SGVsbG8sIFdvcmxkIQ==");
        assert_eq!(encode_base64(b""), "");
        assert_eq!(encode_base64(b"a"), "YQ==");
    }
}
