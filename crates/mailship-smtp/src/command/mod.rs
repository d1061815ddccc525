//! SMTP command builder.

use crate::types::AuthMechanism;
use mailship_mime::Address;

/// SMTP command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// EHLO - Extended greeting
    Ehlo {
        /// Client hostname
        hostname: String,
    },
    /// STARTTLS - Upgrade to TLS
    StartTls,
    /// AUTH - Begin authentication
    Auth {
        /// Authentication mechanism
        mechanism: AuthMechanism,
        /// Initial response (for SASL-IR mechanisms)
        initial_response: Option<String>,
    },
    /// Continuation line of a challenge-response exchange
    AuthResponse {
        /// Base64 payload answering the server challenge
        payload: String,
    },
    /// MAIL FROM - Start mail transaction
    MailFrom {
        /// Sender address
        from: Address,
        /// Append ` BODY=8BITMIME` (server offered 8BITMIME)
        eight_bit_mime: bool,
        /// Append ` SMTPUTF8` (server offered SMTPUTF8)
        smtp_utf8: bool,
    },
    /// RCPT TO - Add one recipient
    RcptTo {
        /// Recipient address
        to: Address,
    },
    /// DATA - Begin message data
    Data,
    /// RSET - Reset transaction
    Rset,
    /// QUIT - Close connection
    Quit,
}

impl Command {
    /// Serializes the command to bytes, CRLF terminator included.
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();

        match self {
            Self::Ehlo { hostname } => {
                buf.extend_from_slice(b"EHLO ");
                buf.extend_from_slice(hostname.as_bytes());
            }
            Self::StartTls => {
                buf.extend_from_slice(b"STARTTLS");
            }
            Self::Auth {
                mechanism,
                initial_response,
            } => {
                buf.extend_from_slice(b"AUTH ");
                buf.extend_from_slice(mechanism.as_str().as_bytes());
                if let Some(response) = initial_response {
                    buf.push(b' ');
                    buf.extend_from_slice(response.as_bytes());
                }
            }
            Self::AuthResponse { payload } => {
                buf.extend_from_slice(payload.as_bytes());
            }
            Self::MailFrom {
                from,
                eight_bit_mime,
                smtp_utf8,
            } => {
                buf.extend_from_slice(b"MAIL FROM:<");
                buf.extend_from_slice(from.as_str().as_bytes());
                buf.push(b'>');
                if *eight_bit_mime {
                    buf.extend_from_slice(b" BODY=8BITMIME");
                }
                if *smtp_utf8 {
                    buf.extend_from_slice(b" SMTPUTF8");
                }
            }
            Self::RcptTo { to } => {
                buf.extend_from_slice(b"RCPT TO:<");
                buf.extend_from_slice(to.as_str().as_bytes());
                buf.push(b'>');
            }
            Self::Data => {
                buf.extend_from_slice(b"DATA");
            }
            Self::Rset => {
                buf.extend_from_slice(b"RSET");
            }
            Self::Quit => {
                buf.extend_from_slice(b"QUIT");
            }
        }

        buf.extend_from_slice(b"\r\n");
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ehlo_command() {
        let cmd = Command::Ehlo {
            hostname: "client.example.com".to_string(),
        };
        assert_eq!(cmd.serialize(), b"EHLO client.example.com\r\n");
    }

    #[test]
    fn test_starttls_command() {
        assert_eq!(Command::StartTls.serialize(), b"STARTTLS\r\n");
    }

    #[test]
    fn test_auth_plain_with_initial_response() {
        let cmd = Command::Auth {
            mechanism: AuthMechanism::Plain,
            initial_response: Some("AHVzZXIAcGFzcw==".to_string()),
        };
        assert_eq!(cmd.serialize(), b"AUTH PLAIN AHVzZXIAcGFzcw==\r\n");
    }

    #[test]
    fn test_auth_login_without_initial_response() {
        let cmd = Command::Auth {
            mechanism: AuthMechanism::Login,
            initial_response: None,
        };
        assert_eq!(cmd.serialize(), b"AUTH LOGIN\r\n");
    }

    #[test]
    fn test_auth_response_line() {
        let cmd = Command::AuthResponse {
            payload: "dXNlcg==".to_string(),
        };
        assert_eq!(cmd.serialize(), b"dXNlcg==\r\n");
    }

    #[test]
    fn test_mail_from_plain() {
        let cmd = Command::MailFrom {
            from: Address::new("sender@example.com"),
            eight_bit_mime: false,
            smtp_utf8: false,
        };
        assert_eq!(cmd.serialize(), b"MAIL FROM:<sender@example.com>\r\n");
    }

    #[test]
    fn test_mail_from_with_negotiated_parameters() {
        let cmd = Command::MailFrom {
            from: Address::new("sender@example.com"),
            eight_bit_mime: true,
            smtp_utf8: true,
        };
        assert_eq!(
            cmd.serialize(),
            b"MAIL FROM:<sender@example.com> BODY=8BITMIME SMTPUTF8\r\n"
        );
    }

    #[test]
    fn test_mail_from_smtputf8_only() {
        let cmd = Command::MailFrom {
            from: Address::new("a@x"),
            eight_bit_mime: false,
            smtp_utf8: true,
        };
        assert_eq!(cmd.serialize(), b"MAIL FROM:<a@x> SMTPUTF8\r\n");
    }

    #[test]
    fn test_rcpt_to_command() {
        let cmd = Command::RcptTo {
            to: Address::new("recipient@example.com"),
        };
        assert_eq!(cmd.serialize(), b"RCPT TO:<recipient@example.com>\r\n");
    }

    #[test]
    fn test_bare_commands() {
        assert_eq!(Command::Data.serialize(), b"DATA\r\n");
        assert_eq!(Command::Rset.serialize(), b"RSET\r\n");
        assert_eq!(Command::Quit.serialize(), b"QUIT\r\n");
    }
}
