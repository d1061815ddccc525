//! High-level send driver: one connection, one dialog, one message.

use crate::auth::Credentials;
use crate::connection::{
    Client, Connected, Endpoint, Protocol, connect, connect_tls, tls_connector,
};
use crate::error::{Error, Result};
use mailship_mime::{Message, compose};
use rustls::ClientConfig;
use std::sync::Arc;
use tracing::debug;

/// SMTP submission client bound to one endpoint.
///
/// Each [`Mailer::send`] opens a fresh connection, drives the complete
/// dialog, and closes the connection; there is no pooling, queueing, or
/// retrying. A mailer drives one session at a time; run independent
/// mailers for concurrent submissions.
#[derive(Debug, Clone)]
pub struct Mailer {
    endpoint: Endpoint,
    hostname: String,
    credentials: Option<Credentials>,
    tls_config: Option<Arc<ClientConfig>>,
}

impl Mailer {
    /// Creates a mailer for an `smtp://` or `smtps://` endpoint URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSmtpScheme`] or [`Error::UriMissingHost`]
    /// when the URL is unusable.
    pub fn new(endpoint_url: &str) -> Result<Self> {
        Ok(Self {
            endpoint: Endpoint::parse(endpoint_url)?,
            hostname: "localhost".to_string(),
            credentials: None,
            tls_config: None,
        })
    }

    /// Sets credentials. Sending will authenticate after the handshake and
    /// refuse to do so on an unencrypted transport.
    #[must_use]
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Sets the hostname announced in EHLO.
    #[must_use]
    pub fn hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    /// Supplies a TLS configuration, e.g. to pin a custom CA bundle.
    #[must_use]
    pub fn tls_config(mut self, config: Arc<ClientConfig>) -> Self {
        self.tls_config = Some(config);
        self
    }

    /// The parsed endpoint this mailer submits to.
    #[must_use]
    pub const fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Sends one message.
    ///
    /// The message is composed before anything touches the network, so
    /// composition errors cost no connection. After any error the session
    /// is abandoned; the server connection is not reused.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ExpectToAddress`] when the message has no `to`
    /// recipients, composition errors from the MIME layer, and transport,
    /// TLS, or classified protocol errors from the dialog.
    pub async fn send(&self, message: &Message) -> Result<()> {
        if message.to.is_empty() {
            return Err(Error::ExpectToAddress);
        }
        let payload = compose::render(message)?;
        debug!(
            host = %self.endpoint.host,
            port = self.endpoint.port,
            bytes = payload.len(),
            "submitting message"
        );

        match self.endpoint.protocol {
            Protocol::Smtps => {
                let connector = tls_connector(self.tls_config.clone());
                let stream = connect_tls(&self.endpoint.host, self.endpoint.port, &connector).await?;
                let client = Client::from_stream(stream).await?;
                let client = client.ehlo(&self.hostname).await?;
                self.run_transaction(client, message, &payload).await
            }
            Protocol::Smtp => {
                let stream = connect(&self.endpoint.host, self.endpoint.port).await?;
                let client = Client::from_stream(stream).await?;
                let mut client = client.ehlo(&self.hostname).await?;
                if client
                    .extensions()
                    .is_some_and(|extensions| extensions.starttls)
                {
                    let connector = tls_connector(self.tls_config.clone());
                    client = client
                        .starttls(&self.endpoint.host, &self.hostname, &connector)
                        .await?;
                }
                self.run_transaction(client, message, &payload).await
            }
        }
    }

    /// Runs authentication, the envelope, and DATA over a greeted client.
    async fn run_transaction(
        &self,
        client: Client<Connected>,
        message: &Message,
        payload: &[u8],
    ) -> Result<()> {
        let from = &message.from.address;
        let client = match &self.credentials {
            Some(credentials) => client.auth(credentials).await?.mail_from(from).await?,
            None => client.mail_from(from).await?,
        };

        // The envelope covers every recipient list; one RCPT each, with
        // its own acknowledgement.
        let Some((first, rest)) = message.to.split_first() else {
            return Err(Error::ExpectToAddress);
        };
        let mut client = client.rcpt_to(&first.address).await?;
        for mailbox in rest.iter().chain(&message.cc).chain(&message.bcc) {
            client = client.rcpt_to(&mailbox.address).await?;
        }

        let client = client.data().await?;
        let client = client.send_payload(payload).await?;
        client.quit().await
    }
}
