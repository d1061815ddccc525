//! Type-state SMTP dialog client.
//!
//! The dialog is strictly request-response: every command waits for a
//! complete reply (terminal-line sentinel) before the next one is issued.
//! Any reply outside the expected set is classified into the error
//! taxonomy and leaves the session unusable.

use super::stream::SmtpStream;
use crate::auth::{self, Credentials};
use crate::command::Command;
use crate::error::{Error, Result};
use crate::parser::parse_line;
use crate::types::{AuthMechanism, Extensions, Reply, ReplyCode};
use mailship_mime::Address;
use std::marker::PhantomData;
use tracing::debug;

/// Longest accepted EHLO reply, all lines included.
const MAX_HANDSHAKE_REPLY: usize = 4096;

/// Type-state marker: greeting read, transaction not started.
#[derive(Debug)]
pub struct Connected;

/// Type-state marker: AUTH accepted.
#[derive(Debug)]
pub struct Authenticated;

/// Type-state marker: MAIL FROM accepted.
#[derive(Debug)]
pub struct MailTransaction;

/// Type-state marker: at least one RCPT TO accepted.
#[derive(Debug)]
pub struct RecipientAdded;

/// Type-state marker: DATA accepted, server expects message content.
#[derive(Debug)]
pub struct Data;

/// SMTP client with type-state dialog tracking.
#[derive(Debug)]
pub struct Client<State> {
    stream: SmtpStream,
    extensions: Option<Extensions>,
    _state: PhantomData<State>,
}

impl Client<Connected> {
    /// Creates a client from a fresh stream and reads the server greeting.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidServerGreetings`] when the greeting code is
    /// not 220.
    pub async fn from_stream(mut stream: SmtpStream) -> Result<Self> {
        let greeting = read_reply(&mut stream).await?;
        if greeting.code != ReplyCode::SERVICE_READY {
            return Err(Error::InvalidServerGreetings(greeting.code.as_u16()));
        }
        debug!(greeting = %greeting.text(), "connected");

        Ok(Self {
            stream,
            extensions: None,
            _state: PhantomData,
        })
    }

    /// Sends EHLO and negotiates extensions.
    ///
    /// Every payload line participates in capability matching, so servers
    /// that skip the hello line are handled too.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HandshakeOversize`] when the reply exceeds the
    /// handshake buffer, or the classified error for a non-250 reply.
    pub async fn ehlo(mut self, client_hostname: &str) -> Result<Self> {
        let command = Command::Ehlo {
            hostname: client_hostname.to_string(),
        };
        self.stream.write_all(&command.serialize()).await?;
        self.stream.flush().await?;
        let reply = read_reply_capped(&mut self.stream, MAX_HANDSHAKE_REPLY).await?;
        expect(&reply, ReplyCode::OK)?;

        let extensions = Extensions::from_lines(reply.lines.iter().map(String::as_str));
        debug!(?extensions, "negotiated extensions");
        self.extensions = Some(extensions);
        Ok(self)
    }

    /// Upgrades the connection to TLS via STARTTLS, then repeats EHLO.
    ///
    /// Callers invoke this only on a plain transport after the server
    /// offered STARTTLS; extensions negotiated before the upgrade are
    /// discarded and re-read on the encrypted channel.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTlsHandshakeResponse`] when STARTTLS is not
    /// acknowledged with 220, or a TLS error from the handshake itself.
    pub async fn starttls(
        mut self,
        server_name: &str,
        client_hostname: &str,
        connector: &tokio_rustls::TlsConnector,
    ) -> Result<Self> {
        let reply = self.send_command(Command::StartTls).await?;
        if reply.code != ReplyCode::SERVICE_READY {
            return Err(Error::InvalidTlsHandshakeResponse(reply.code.as_u16()));
        }

        self.stream = self.stream.upgrade_to_tls(server_name, connector).await?;
        self.extensions = None;
        debug!(server_name, "transport upgraded to TLS");
        self.ehlo(client_hostname).await
    }

    /// Authenticates with the best mechanism the server offered.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TlsRequiredForAuth`] on a plain transport,
    /// [`Error::UnsupportedAuthHandshake`] when no supported mechanism was
    /// offered, and the classified server error when the exchange fails.
    pub async fn auth(mut self, credentials: &Credentials) -> Result<Client<Authenticated>> {
        if !self.stream.is_tls() {
            return Err(Error::TlsRequiredForAuth);
        }
        let mechanism = self
            .extensions
            .and_then(|extensions| extensions.auth)
            .ok_or(Error::UnsupportedAuthHandshake)?;

        match mechanism {
            AuthMechanism::Plain => self.auth_plain(credentials).await?,
            AuthMechanism::Login => self.auth_login(credentials).await?,
            AuthMechanism::XOAuth2 => self.auth_xoauth2(credentials).await?,
        }
        debug!(mechanism = mechanism.as_str(), "authenticated");
        Ok(self.transition())
    }

    async fn auth_plain(&mut self, credentials: &Credentials) -> Result<()> {
        let initial = auth::plain_response(credentials.username(), credentials.secret());
        let reply = self
            .send_command(Command::Auth {
                mechanism: AuthMechanism::Plain,
                initial_response: Some(initial),
            })
            .await?;
        expect(&reply, ReplyCode::AUTH_SUCCEEDED)
    }

    async fn auth_login(&mut self, credentials: &Credentials) -> Result<()> {
        let reply = self
            .send_command(Command::Auth {
                mechanism: AuthMechanism::Login,
                initial_response: None,
            })
            .await?;
        expect_challenge(&reply, auth::LOGIN_USERNAME_CHALLENGE)?;

        let reply = self
            .send_command(Command::AuthResponse {
                payload: auth::login_response(credentials.username()),
            })
            .await?;
        expect_challenge(&reply, auth::LOGIN_PASSWORD_CHALLENGE)?;

        let reply = self
            .send_command(Command::AuthResponse {
                payload: auth::login_response(credentials.secret()),
            })
            .await?;
        expect(&reply, ReplyCode::AUTH_SUCCEEDED)
    }

    async fn auth_xoauth2(&mut self, credentials: &Credentials) -> Result<()> {
        let initial = auth::xoauth2_response(credentials.username(), credentials.secret());
        let reply = self
            .send_command(Command::Auth {
                mechanism: AuthMechanism::XOAuth2,
                initial_response: Some(initial),
            })
            .await?;
        expect(&reply, ReplyCode::AUTH_SUCCEEDED)
    }

    /// Starts a mail transaction without authenticating first.
    ///
    /// # Errors
    ///
    /// Returns the classified error for a non-250 reply.
    pub async fn mail_from(self, from: &Address) -> Result<Client<MailTransaction>> {
        self.start_transaction(from).await
    }
}

impl Client<Authenticated> {
    /// Starts a mail transaction.
    ///
    /// # Errors
    ///
    /// Returns the classified error for a non-250 reply.
    pub async fn mail_from(self, from: &Address) -> Result<Client<MailTransaction>> {
        self.start_transaction(from).await
    }
}

impl Client<MailTransaction> {
    /// Adds the first recipient.
    ///
    /// # Errors
    ///
    /// Returns the classified error for a non-250 reply.
    pub async fn rcpt_to(mut self, to: &Address) -> Result<Client<RecipientAdded>> {
        let reply = self.send_command(Command::RcptTo { to: to.clone() }).await?;
        expect(&reply, ReplyCode::OK)?;
        Ok(self.transition())
    }

    /// Aborts the transaction with RSET.
    ///
    /// # Errors
    ///
    /// Returns the classified error for a non-250 reply.
    pub async fn reset(mut self) -> Result<Client<Connected>> {
        let reply = self.send_command(Command::Rset).await?;
        expect(&reply, ReplyCode::OK)?;
        Ok(self.transition())
    }
}

impl Client<RecipientAdded> {
    /// Adds another recipient. Each one is acknowledged separately.
    ///
    /// # Errors
    ///
    /// Returns the classified error for a non-250 reply.
    pub async fn rcpt_to(mut self, to: &Address) -> Result<Self> {
        let reply = self.send_command(Command::RcptTo { to: to.clone() }).await?;
        expect(&reply, ReplyCode::OK)?;
        Ok(self)
    }

    /// Begins message transmission.
    ///
    /// # Errors
    ///
    /// Returns the classified error when the server does not answer 354.
    pub async fn data(mut self) -> Result<Client<Data>> {
        let reply = self.send_command(Command::Data).await?;
        expect(&reply, ReplyCode::START_DATA)?;
        Ok(self.transition())
    }

    /// Aborts the transaction with RSET.
    ///
    /// # Errors
    ///
    /// Returns the classified error for a non-250 reply.
    pub async fn reset(mut self) -> Result<Client<Connected>> {
        let reply = self.send_command(Command::Rset).await?;
        expect(&reply, ReplyCode::OK)?;
        Ok(self.transition())
    }
}

impl Client<Data> {
    /// Streams the composed message and finishes the transaction.
    ///
    /// Lines are dot-stuffed per RFC 5321 section 4.5.2 and the stream is
    /// closed with the `\r\n.\r\n` terminator.
    ///
    /// # Errors
    ///
    /// Returns the classified error when the server does not accept the
    /// message with 250.
    pub async fn send_payload(mut self, payload: &[u8]) -> Result<Client<Connected>> {
        let mut lines = payload.split(|&byte| byte == b'\n').peekable();
        while let Some(line) = lines.next() {
            if lines.peek().is_none() && line.is_empty() {
                // The payload ended with a line break; the terminator
                // supplies the final CRLF.
                break;
            }
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            if line.first() == Some(&b'.') {
                self.stream.write_all(b".").await?;
            }
            self.stream.write_all(line).await?;
            self.stream.write_all(b"\r\n").await?;
        }
        self.stream.write_all(b".\r\n").await?;
        self.stream.flush().await?;

        let reply = read_reply(&mut self.stream).await?;
        expect(&reply, ReplyCode::OK)?;
        debug!("message accepted");
        Ok(self.transition())
    }
}

impl<State> Client<State> {
    /// Extensions negotiated by the most recent EHLO, if any.
    #[must_use]
    pub const fn extensions(&self) -> Option<Extensions> {
        self.extensions
    }

    /// Sends QUIT and closes the stream.
    ///
    /// The acknowledgement and the shutdown are best-effort: the session
    /// is over regardless of how the server reacts.
    ///
    /// # Errors
    ///
    /// Returns an error only when writing QUIT itself fails.
    pub async fn quit(mut self) -> Result<()> {
        self.stream.write_all(&Command::Quit.serialize()).await?;
        let _ = self.stream.flush().await;
        let _ = read_reply(&mut self.stream).await;
        let _ = self.stream.shutdown().await;
        Ok(())
    }

    async fn start_transaction(mut self, from: &Address) -> Result<Client<MailTransaction>> {
        let extensions = self.extensions.unwrap_or_default();
        let reply = self
            .send_command(Command::MailFrom {
                from: from.clone(),
                eight_bit_mime: extensions.eight_bit_mime,
                smtp_utf8: extensions.smtp_utf8,
            })
            .await?;
        expect(&reply, ReplyCode::OK)?;
        Ok(self.transition())
    }

    async fn send_command(&mut self, command: Command) -> Result<Reply> {
        self.stream.write_all(&command.serialize()).await?;
        self.stream.flush().await?;
        read_reply(&mut self.stream).await
    }

    fn transition<Next>(self) -> Client<Next> {
        Client {
            stream: self.stream,
            extensions: self.extensions,
            _state: PhantomData,
        }
    }
}

/// Drains one complete reply, following continuation lines to the terminal.
pub(crate) async fn read_reply(stream: &mut SmtpStream) -> Result<Reply> {
    read_reply_capped(stream, usize::MAX).await
}

async fn read_reply_capped(stream: &mut SmtpStream, max_bytes: usize) -> Result<Reply> {
    let mut lines = Vec::new();
    let mut total = 0usize;
    loop {
        let line = stream.read_line().await?;
        total += line.len();
        if total > max_bytes {
            return Err(Error::HandshakeOversize);
        }
        let parsed = parse_line(&line)?;
        let code = parsed.code;
        let done = !parsed.continuation;
        lines.push(parsed.payload.to_string());
        if done {
            return Ok(Reply::new(ReplyCode::new(code), lines));
        }
    }
}

fn expect(reply: &Reply, code: ReplyCode) -> Result<()> {
    if reply.code == code {
        Ok(())
    } else {
        Err(Error::from_code(reply.code.as_u16()))
    }
}

fn expect_challenge(reply: &Reply, challenge: &str) -> Result<()> {
    if reply.code != ReplyCode::AUTH_CONTINUE {
        return Err(Error::from_code(reply.code.as_u16()));
    }
    match reply.first_line() {
        Some(payload) if payload == challenge => Ok(()),
        payload => Err(Error::UnexpectedServerResponse(
            payload.unwrap_or_default().to_string(),
        )),
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
    fn test_expect_mismatch_classifies() {
        let reply = Reply::new(ReplyCode::new(535), vec!["nope".to_string()]);
        assert!(matches!(
            expect(&reply, ReplyCode::AUTH_SUCCEEDED),
            Err(Error::InvalidCredentials)
        ));
    }

    #[test]
    fn test_expect_match_is_ok() {
        let reply = Reply::new(ReplyCode::OK, vec![]);
        assert!(expect(&reply, ReplyCode::OK).is_ok());
    }

    #[test]
    fn test_challenge_code_mismatch_classifies() {
        let reply = Reply::new(ReplyCode::new(504), vec![]);
        assert!(matches!(
            expect_challenge(&reply, auth::LOGIN_USERNAME_CHALLENGE),
            Err(Error::ParameterNotImplemented)
        ));
    }

    #[test]
    fn test_challenge_payload_mismatch_is_unexpected() {
        let reply = Reply::new(
            ReplyCode::AUTH_CONTINUE,
            vec!["c3VycHJpc2U=".to_string()],
        );
        assert!(matches!(
            expect_challenge(&reply, auth::LOGIN_USERNAME_CHALLENGE),
            Err(Error::UnexpectedServerResponse(payload)) if payload == "c3VycHJpc2U="
        ));
    }

    #[test]
    fn test_challenge_match_is_ok() {
        let reply = Reply::new(
            ReplyCode::AUTH_CONTINUE,
            vec![auth::LOGIN_USERNAME_CHALLENGE.to_string()],
        );
        assert!(expect_challenge(&reply, auth::LOGIN_USERNAME_CHALLENGE).is_ok());
    }
}
