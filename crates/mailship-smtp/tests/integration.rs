//! Integration tests for the SMTP dialog.
//!
//! These tests run the full client against a scripted server on a loopback
//! socket, asserting both the outcome and the exact command transcript.

use std::net::SocketAddr;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use mailship_mime::{Mailbox, Message};
use mailship_smtp::{Credentials, Error, Mailer};

/// Replies the scripted server gives at each dialog step.
#[derive(Clone)]
struct Script {
    greeting: String,
    ehlo: String,
    starttls: String,
    mail_from: String,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            greeting: "220 mail.example.test ESMTP ready\r\n".to_string(),
            ehlo: "250-mail.example.test\r\n250-8BITMIME\r\n250 SMTPUTF8\r\n".to_string(),
            starttls: "220 go ahead\r\n".to_string(),
            mail_from: "250 ok\r\n".to_string(),
        }
    }
}

/// Spawns a one-connection scripted server. The handle resolves to the
/// transcript of everything the client sent, line by line.
async fn spawn_server(script: Script) -> (SocketAddr, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let mut transcript = Vec::new();
        let Ok((stream, _)) = listener.accept().await else {
            return transcript;
        };
        let mut reader = BufReader::new(stream);
        if reader
            .get_mut()
            .write_all(script.greeting.as_bytes())
            .await
            .is_err()
        {
            return transcript;
        }

        let mut in_data = false;
        let mut line = String::new();
        loop {
            line.clear();
            match reader.read_line(&mut line).await {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }
            let received = line.trim_end().to_string();
            transcript.push(received.clone());

            if in_data {
                if received == "." {
                    in_data = false;
                    if reader.get_mut().write_all(b"250 accepted\r\n").await.is_err() {
                        break;
                    }
                }
                continue;
            }

            let reply: Vec<u8> = if received.starts_with("EHLO") {
                script.ehlo.clone().into_bytes()
            } else if received.starts_with("MAIL FROM") {
                script.mail_from.clone().into_bytes()
            } else if received.starts_with("RCPT TO") {
                b"250 ok\r\n".to_vec()
            } else if received == "STARTTLS" {
                script.starttls.clone().into_bytes()
            } else if received == "DATA" {
                in_data = true;
                b"354 go ahead\r\n".to_vec()
            } else if received == "QUIT" {
                let _ = reader.get_mut().write_all(b"221 bye\r\n").await;
                break;
            } else {
                b"250 ok\r\n".to_vec()
            };
            if reader.get_mut().write_all(&reply).await.is_err() {
                break;
            }
        }
        transcript
    });

    (addr, handle)
}

fn test_message() -> Message {
    Message::builder()
        .from(Mailbox::with_name("Alice", "alice@example.com"))
        .to(Mailbox::new("bob@example.test"))
        .subject("Greetings")
        .timestamp(0)
        .text("Hello\r\n.dotted line")
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_full_plain_dialog() {
    let (addr, handle) = spawn_server(Script::default()).await;

    let message = Message::builder()
        .from(Mailbox::with_name("Alice", "alice@example.com"))
        .to(Mailbox::new("bob@example.test"))
        .to(Mailbox::new("carol@example.test"))
        .cc(Mailbox::new("dave@example.test"))
        .subject("Greetings")
        .timestamp(0)
        .text("Hello\r\n.dotted line")
        .build()
        .unwrap();

    Mailer::new(&format!("smtp://127.0.0.1:{}", addr.port()))
        .unwrap()
        .hostname("client.test")
        .send(&message)
        .await
        .unwrap();

    let transcript = handle.await.unwrap();

    assert_eq!(transcript[0], "EHLO client.test");
    let mail_at = transcript
        .iter()
        .position(|l| l == "MAIL FROM:<alice@example.com> BODY=8BITMIME SMTPUTF8")
        .expect("MAIL FROM with negotiated parameters");

    // One RCPT per recipient, to and cc alike, each its own command.
    let rcpts: Vec<&String> = transcript
        .iter()
        .filter(|l| l.starts_with("RCPT TO"))
        .collect();
    assert_eq!(
        rcpts,
        [
            "RCPT TO:<bob@example.test>",
            "RCPT TO:<carol@example.test>",
            "RCPT TO:<dave@example.test>",
        ]
    );

    let data_at = transcript.iter().position(|l| l == "DATA").unwrap();
    assert!(mail_at < data_at);

    // Composed headers travel inside the DATA section.
    assert!(transcript.contains(&"From: Alice <alice@example.com>".to_string()));
    assert!(transcript.contains(&"Subject: Greetings".to_string()));
    assert!(transcript.contains(&"Date: 01 Jan 1970 00:00:00 +0000".to_string()));

    // The line starting with a dot was stuffed on the wire.
    assert!(transcript.contains(&"..dotted line".to_string()));

    let dot_at = transcript.iter().position(|l| l == ".").unwrap();
    assert!(data_at < dot_at);
    assert_eq!(transcript.last().unwrap(), "QUIT");
}

#[tokio::test]
async fn test_auth_refused_without_tls() {
    let (addr, handle) = spawn_server(Script {
        ehlo: "250 AUTH PLAIN\r\n".to_string(),
        ..Script::default()
    })
    .await;

    let result = Mailer::new(&format!("smtp://127.0.0.1:{}", addr.port()))
        .unwrap()
        .credentials(Credentials::new("alice@example.com", "hunter2"))
        .send(&test_message())
        .await;

    assert!(matches!(result, Err(Error::TlsRequiredForAuth)));

    // Credentials never touched the unencrypted wire.
    let transcript = handle.await.unwrap();
    assert!(transcript.iter().all(|l| !l.starts_with("AUTH")));
}

#[tokio::test]
async fn test_rejected_greeting() {
    let (addr, _handle) = spawn_server(Script {
        greeting: "554 go away\r\n".to_string(),
        ..Script::default()
    })
    .await;

    let result = Mailer::new(&format!("smtp://127.0.0.1:{}", addr.port()))
        .unwrap()
        .send(&test_message())
        .await;

    assert!(matches!(result, Err(Error::InvalidServerGreetings(554))));
}

#[tokio::test]
async fn test_starttls_rejection_aborts_upgrade() {
    let (addr, handle) = spawn_server(Script {
        ehlo: "250-mail.example.test\r\n250 STARTTLS\r\n".to_string(),
        starttls: "454 not today\r\n".to_string(),
        ..Script::default()
    })
    .await;

    let result = Mailer::new(&format!("smtp://127.0.0.1:{}", addr.port()))
        .unwrap()
        .send(&test_message())
        .await;

    assert!(matches!(
        result,
        Err(Error::InvalidTlsHandshakeResponse(454))
    ));

    // Nothing beyond the failed upgrade attempt was sent in the clear.
    let transcript = handle.await.unwrap();
    assert_eq!(transcript.last().unwrap(), "STARTTLS");
}

#[tokio::test]
async fn test_mail_from_rejection_classified() {
    let (addr, _handle) = spawn_server(Script {
        mail_from: "550 denied\r\n".to_string(),
        ..Script::default()
    })
    .await;

    let result = Mailer::new(&format!("smtp://127.0.0.1:{}", addr.port()))
        .unwrap()
        .send(&test_message())
        .await;

    assert!(matches!(result, Err(Error::MailboxNotAvailable)));
}

#[tokio::test]
async fn test_oversize_ehlo_reply() {
    let mut ehlo = String::new();
    for i in 0..200 {
        ehlo.push_str(&format!("250-X{i:04}{}\r\n", "x".repeat(40)));
    }
    ehlo.push_str("250 ok\r\n");

    let (addr, _handle) = spawn_server(Script {
        ehlo,
        ..Script::default()
    })
    .await;

    let result = Mailer::new(&format!("smtp://127.0.0.1:{}", addr.port()))
        .unwrap()
        .send(&test_message())
        .await;

    assert!(matches!(result, Err(Error::HandshakeOversize)));
}

#[tokio::test]
async fn test_no_recipients_fails_before_connecting() {
    // Port 1 is never listening; the check must fire before any connect.
    let mailer = Mailer::new("smtp://127.0.0.1:1").unwrap();
    let message = Message::builder()
        .from(Mailbox::new("alice@example.com"))
        .text("Hello")
        .build()
        .unwrap();

    let result = mailer.send(&message).await;
    assert!(matches!(result, Err(Error::ExpectToAddress)));
}

#[tokio::test]
async fn test_missing_sender_domain_fails_before_connecting() {
    let mailer = Mailer::new("smtp://127.0.0.1:1").unwrap();
    let message = Message::builder()
        .from(Mailbox::new("nodomain"))
        .to(Mailbox::new("bob@example.test"))
        .text("Hello")
        .build()
        .unwrap();

    let result = mailer.send(&message).await;
    assert!(matches!(
        result,
        Err(Error::Mime(mailship_mime::Error::ExpectedEmailDomain(_)))
    ));
}
