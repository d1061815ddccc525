//! EHLO capability negotiation.

/// SASL authentication mechanism.
///
/// Variant order is selection precedence: when a server offers several
/// mechanisms the highest one wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AuthMechanism {
    /// PLAIN (RFC 4616), single base64 response.
    Plain,
    /// LOGIN, two-step base64 exchange.
    Login,
    /// `XOAUTH2` bearer-token authentication (Google/Microsoft).
    XOAuth2,
}

impl AuthMechanism {
    /// Parses a mechanism name from an `AUTH` capability token.
    ///
    /// Unknown mechanisms yield `None` and are ignored during negotiation.
    #[must_use]
    pub fn parse(token: &str) -> Option<Self> {
        match token.to_ascii_uppercase().as_str() {
            "PLAIN" => Some(Self::Plain),
            "LOGIN" => Some(Self::Login),
            "XOAUTH2" => Some(Self::XOAuth2),
            _ => None,
        }
    }

    /// Returns the mechanism name as sent on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Plain => "PLAIN",
            Self::Login => "LOGIN",
            Self::XOAuth2 => "XOAUTH2",
        }
    }
}

/// Capability flags negotiated from an EHLO reply.
///
/// Re-read after a STARTTLS upgrade; servers routinely advertise a
/// different set on the encrypted channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Extensions {
    /// SMTPUTF8 offered.
    pub smtp_utf8: bool,
    /// 8BITMIME offered.
    pub eight_bit_mime: bool,
    /// STARTTLS offered.
    pub starttls: bool,
    /// Best offered authentication mechanism, if any is supported.
    pub auth: Option<AuthMechanism>,
}

impl Extensions {
    /// Builds the flag set from the payload lines of an EHLO reply.
    #[must_use]
    pub fn from_lines<'a>(lines: impl IntoIterator<Item = &'a str>) -> Self {
        let mut extensions = Self::default();
        for line in lines {
            extensions.apply_line(line);
        }
        extensions
    }

    /// Folds one EHLO payload line into the flag set.
    ///
    /// The first token selects the capability; `AUTH` sub-tokens are
    /// reduced to the single highest-precedence supported mechanism.
    pub fn apply_line(&mut self, line: &str) {
        let mut tokens = line.split_whitespace();
        let Some(keyword) = tokens.next() else {
            return;
        };
        match keyword.to_ascii_uppercase().as_str() {
            "STARTTLS" => self.starttls = true,
            "SMTPUTF8" => self.smtp_utf8 = true,
            "8BITMIME" => self.eight_bit_mime = true,
            "AUTH" => {
                for token in tokens {
                    if let Some(mechanism) = AuthMechanism::parse(token) {
                        if self.auth.is_none_or(|current| mechanism > current) {
                            self.auth = Some(mechanism);
                        }
                    }
                }
            }
            _ => {}
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
    fn test_mechanism_precedence_ordering() {
        assert!(AuthMechanism::XOAuth2 > AuthMechanism::Login);
        assert!(AuthMechanism::Login > AuthMechanism::Plain);
    }

    #[test]
    fn test_parse_mechanisms() {
        assert_eq!(AuthMechanism::parse("PLAIN"), Some(AuthMechanism::Plain));
        assert_eq!(AuthMechanism::parse("login"), Some(AuthMechanism::Login));
        assert_eq!(AuthMechanism::parse("XOAUTH2"), Some(AuthMechanism::XOAuth2));
        assert_eq!(AuthMechanism::parse("CRAM-MD5"), None);
    }

    #[test]
    fn test_auth_selects_highest_precedence() {
        let extensions = Extensions::from_lines(["AUTH PLAIN LOGIN"]);
        assert_eq!(extensions.auth, Some(AuthMechanism::Login));

        let extensions = Extensions::from_lines(["AUTH PLAIN LOGIN XOAUTH2"]);
        assert_eq!(extensions.auth, Some(AuthMechanism::XOAuth2));
    }

    #[test]
    fn test_auth_ignores_unknown_mechanisms() {
        let extensions = Extensions::from_lines(["AUTH CRAM-MD5 NTLM PLAIN"]);
        assert_eq!(extensions.auth, Some(AuthMechanism::Plain));

        let extensions = Extensions::from_lines(["AUTH CRAM-MD5 NTLM"]);
        assert_eq!(extensions.auth, None);
    }

    #[test]
    fn test_auth_accumulates_across_lines() {
        let extensions = Extensions::from_lines(["AUTH PLAIN", "AUTH XOAUTH2"]);
        assert_eq!(extensions.auth, Some(AuthMechanism::XOAuth2));
    }

    #[test]
    fn test_flags() {
        let extensions =
            Extensions::from_lines(["mail.example.com greets you", "STARTTLS", "8BITMIME", "SMTPUTF8"]);
        assert!(extensions.starttls);
        assert!(extensions.eight_bit_mime);
        assert!(extensions.smtp_utf8);
        assert_eq!(extensions.auth, None);
    }

    #[test]
    fn test_keywords_case_insensitive() {
        let extensions = Extensions::from_lines(["starttls", "auth plain"]);
        assert!(extensions.starttls);
        assert_eq!(extensions.auth, Some(AuthMechanism::Plain));
    }

    #[test]
    fn test_unknown_lines_ignored() {
        let extensions = Extensions::from_lines(["SIZE 52428800", "PIPELINING", ""]);
        assert_eq!(extensions, Extensions::default());
    }
}
