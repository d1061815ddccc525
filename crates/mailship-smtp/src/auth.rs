//! SASL credential encoding for `AUTH`.
//!
//! Implements the three mechanisms the negotiation layer can select:
//! - PLAIN (RFC 4616), single base64 initial response
//! - LOGIN, two-step base64 exchange against fixed challenges
//! - XOAUTH2 (Google/Microsoft proprietary), bearer-token initial response

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::fmt;

/// Expected LOGIN first challenge: base64 of `Username:`.
pub const LOGIN_USERNAME_CHALLENGE: &str = "VXNlcm5hbWU6";
/// Expected LOGIN second challenge: base64 of `Password:`.
pub const LOGIN_PASSWORD_CHALLENGE: &str = "UGFzc3dvcmQ6";

/// Account credentials for authentication.
///
/// The secret doubles as the account password for PLAIN and LOGIN and as
/// the OAuth2 access token for XOAUTH2.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    secret: String,
}

impl Credentials {
    /// Creates credentials from a username and a secret.
    #[must_use]
    pub fn new(username: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            secret: secret.into(),
        }
    }

    /// Returns the username.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns the password or access token.
    #[must_use]
    pub fn secret(&self) -> &str {
        &self.secret
    }
}

// The secret must not leak into logs or error chains.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Generates the PLAIN initial response (RFC 4616).
///
/// Format: `\0<username>\0<password>`, base64 encoded. The leading NUL is
/// the empty authorization identity.
#[must_use]
pub fn plain_response(username: &str, password: &str) -> String {
    let auth_string = format!("\0{username}\0{password}");
    STANDARD.encode(auth_string.as_bytes())
}

/// Generates the XOAUTH2 initial response.
///
/// Format: `user=<user>\x01auth=Bearer <token>\x01\x01`, base64 encoded.
#[must_use]
pub fn xoauth2_response(user: &str, token: &str) -> String {
    let auth_string = format!("user={user}\x01auth=Bearer {token}\x01\x01");
    STANDARD.encode(auth_string.as_bytes())
}

/// Encodes one LOGIN exchange line (username or password).
#[must_use]
pub fn login_response(value: &str) -> String {
    STANDARD.encode(value.as_bytes())
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
    fn test_plain_response_format() {
        let response = plain_response("test", "pass");
        let decoded = STANDARD.decode(&response).unwrap();
        assert_eq!(decoded, b"\0test\0pass");
    }

    #[test]
    fn test_plain_response_special_chars() {
        let response = plain_response("user", "pass@word!");
        let decoded = STANDARD.decode(&response).unwrap();
        assert_eq!(decoded, b"\0user\0pass@word!");
    }

    #[test]
    fn test_xoauth2_format() {
        let response = xoauth2_response("test@test.com", "abc");
        let decoded = STANDARD.decode(&response).unwrap();
        assert_eq!(
            String::from_utf8(decoded).unwrap(),
            "user=test@test.com\x01auth=Bearer abc\x01\x01"
        );
    }

    #[test]
    fn test_login_challenges_decode() {
        assert_eq!(
            STANDARD.decode(LOGIN_USERNAME_CHALLENGE).unwrap(),
            b"Username:"
        );
        assert_eq!(
            STANDARD.decode(LOGIN_PASSWORD_CHALLENGE).unwrap(),
            b"Password:"
        );
    }

    #[test]
    fn test_login_response_round_trip() {
        let encoded = login_response("hunter2");
        assert_eq!(STANDARD.decode(&encoded).unwrap(), b"hunter2");
    }

    #[test]
    fn test_responses_are_base64_opaque() {
        let response = plain_response("user@example.com", "token");
        assert!(!response.contains("user@example.com"));
        assert!(STANDARD.decode(&response).is_ok());
    }

    #[test]
    fn test_credentials_debug_redacts_secret() {
        let credentials = Credentials::new("user@example.com", "hunter2");
        let rendered = format!("{credentials:?}");
        assert!(rendered.contains("user@example.com"));
        assert!(!rendered.contains("hunter2"));
    }
}
