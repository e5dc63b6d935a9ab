//! Integration tests for sending.
//!
//! These tests use a mock transport that captures submissions instead of
//! talking to a real mail service.

#![allow(clippy::unwrap_used)]

use std::cell::RefCell;
use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

use mailpost_mime::Message;
use mailpost_send::{Error, Mailer, Session, SessionProvider, Transport, attach_file};

const HTML: &str = "<html>\n<h2>Message body</h2>\n<p>This is a html text message.</p>\n</html>";

/// Error returned by the mock service.
#[derive(Debug)]
struct ServiceError(u16);

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "service returned status {}", self.0)
    }
}

impl std::error::Error for ServiceError {}

/// Submission captured by the mock service.
struct Submission {
    access_token: String,
    sender: String,
    raw: String,
}

/// Mock mail service.
#[derive(Default)]
struct MockService {
    /// Captured submissions (in order).
    submissions: RefCell<Vec<Submission>>,
    /// Status to fail with, if any.
    fail_with: Option<u16>,
}

impl MockService {
    fn failing(status: u16) -> Self {
        Self {
            fail_with: Some(status),
            ..Self::default()
        }
    }

    fn decoded(&self, index: usize) -> String {
        let raw = &self.submissions.borrow()[index].raw;
        String::from_utf8(URL_SAFE_NO_PAD.decode(raw).unwrap()).unwrap()
    }
}

impl Transport for MockService {
    type Error = ServiceError;

    fn deliver(&self, session: &Session, sender: &str, raw: &str) -> Result<String, ServiceError> {
        if let Some(status) = self.fail_with {
            return Err(ServiceError(status));
        }
        let mut submissions = self.submissions.borrow_mut();
        submissions.push(Submission {
            access_token: session.token.access_token.clone(),
            sender: sender.to_string(),
            raw: raw.to_string(),
        });
        Ok(format!("msg-{}", submissions.len()))
    }
}

/// Provider whose session can be dropped, like a client that was never set up.
struct Registry {
    current: Option<Session>,
}

impl SessionProvider for Registry {
    fn session(&self) -> Option<&Session> {
        self.current.as_ref()
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("mailpost_send=debug")
        .with_test_writer()
        .try_init();
}

fn session() -> Session {
    Session::from_token_json(
        r#"{"access_token": "ya29.token", "token_type": "Bearer", "expiry": "2099-01-01T00:00:00Z"}"#,
    )
    .unwrap()
}

fn message() -> Message {
    let mut message = Message::new(
        "Тестовое сообщение",
        "",
        &["Дмитрий Седых <d3@yandex.ru>"],
        &[] as &[&str],
    )
    .unwrap();
    message.set_body(HTML).unwrap();
    message
}

#[test]
fn test_send_message() {
    init_tracing();
    let service = MockService::default();
    let mailer = Mailer::new(session(), &service);

    let mut message = message();
    message.attach("test_file.html", HTML).unwrap();
    message.attach("test_file.txt", "Message body\nThis is a text text message.").unwrap();

    assert_eq!(mailer.send(&message).unwrap(), "msg-1");

    let submissions = service.submissions.borrow();
    assert_eq!(submissions[0].access_token, "ya29.token");
    assert_eq!(submissions[0].sender, "me");
    drop(submissions);

    let decoded = service.decoded(0);
    assert!(decoded.contains("Subject: =?utf-8?q?"));
    assert!(decoded.contains("Content-Type: multipart/mixed;\r\n boundary="));
    assert!(decoded.contains("filename=test_file.html"));
    assert!(decoded.contains("filename=test_file.txt"));
    assert!(!decoded.contains("From:"));
}

#[test]
fn test_send_is_repeatable() {
    init_tracing();
    let service = MockService::default();
    let mailer = Mailer::new(session(), &service);
    let message = message();

    assert_eq!(mailer.send(&message).unwrap(), "msg-1");
    assert_eq!(mailer.send(&message).unwrap(), "msg-2");

    // Single-part messages have no boundary, so repeated sends are identical.
    assert_eq!(service.decoded(0), service.decoded(1));
    assert!(message.has_body());
}

#[test]
fn test_send_not_initialized() {
    init_tracing();
    let service = MockService::default();
    let mut registry = Registry { current: None };

    {
        let mailer = Mailer::new(&registry, &service);
        assert!(matches!(mailer.send(&message()), Err(Error::NotInitialized)));
    }

    registry.current = Some(session());
    let mailer = Mailer::new(&registry, &service);
    assert!(mailer.send(&message()).is_ok());
    assert_eq!(service.submissions.borrow().len(), 1);
}

#[test]
fn test_send_expired_token() {
    init_tracing();
    let service = MockService::default();
    let expired = Session::from_token_json(
        r#"{"access_token": "old", "expiry": "2001-01-01T00:00:00Z"}"#,
    )
    .unwrap();
    let mailer = Mailer::new(expired, &service);

    assert!(matches!(mailer.send(&message()), Err(Error::NotInitialized)));
    assert!(service.submissions.borrow().is_empty());
}

#[test]
fn test_send_service_failure() {
    init_tracing();
    let service = MockService::failing(403);
    let mailer = Mailer::new(session(), &service);

    let err = mailer.send(&message()).unwrap_err();
    assert_eq!(err.to_string(), "Transport error: service returned status 403");
}

#[test]
fn test_send_with_file_attachment() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("README.md");
    std::fs::write(&path, "# mailpost\n").unwrap();

    let service = MockService::default();
    let mailer = Mailer::new(session().with_identity("sender@example.com"), &service);

    let mut message = message();
    attach_file(&mut message, &path).unwrap();
    mailer.send(&message).unwrap();

    assert_eq!(service.submissions.borrow()[0].sender, "sender@example.com");
    assert!(service.decoded(0).contains("filename=README.md"));
}
