//! Sending assembled messages through a transport.

use crate::config::SendConfig;
use crate::error::{Error, Result};
use crate::session::SessionProvider;
use crate::transport::Transport;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use mailpost_mime::Message;
use tracing::{debug, warn};

/// Sends messages using a session provider and a transport.
#[derive(Debug, Clone)]
pub struct Mailer<P, T> {
    provider: P,
    transport: T,
    config: SendConfig,
}

impl<P: SessionProvider, T: Transport> Mailer<P, T> {
    /// Creates a mailer with the default configuration.
    #[must_use]
    pub fn new(provider: P, transport: T) -> Self {
        Self::with_config(provider, transport, SendConfig::default())
    }

    /// Creates a mailer with the given configuration.
    #[must_use]
    pub const fn with_config(provider: P, transport: T, config: SendConfig) -> Self {
        Self {
            provider,
            transport,
            config,
        }
    }

    /// Send configuration.
    #[must_use]
    pub const fn config(&self) -> &SendConfig {
        &self.config
    }

    /// Session provider.
    #[must_use]
    pub const fn provider(&self) -> &P {
        &self.provider
    }

    /// Sends a message and returns the identifier the service assigned.
    ///
    /// The message is only borrowed, so it can be sent again.
    ///
    /// # Errors
    ///
    /// - [`Error::NotInitialized`] if there is no session or its token expired
    /// - [`Error::Mime`] if the message cannot be serialized, including a
    ///   configured `mailer` that would break the header block
    /// - [`Error::Transport`] if delivery fails
    pub fn send(&self, message: &Message) -> Result<String> {
        let session = self.provider.session().ok_or(Error::NotInitialized)?;
        if !session.is_active() {
            warn!(
                identity = %session.identity,
                expires_at = ?session.token.expires_at,
                "session token expired"
            );
            return Err(Error::NotInitialized);
        }

        let mut buf = Vec::new();
        message.write_to_with_mailer(&self.config.mailer, &mut buf)?;
        let raw = URL_SAFE_NO_PAD.encode(&buf);

        let sender = self.config.sender_or(&session.identity);
        debug!(sender, size = buf.len(), "sending message");

        let id = self
            .transport
            .deliver(session, sender, &raw)
            .map_err(Error::transport)?;

        debug!(sender, id = %id, "message sent");
        Ok(id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::session::Session;
    use crate::token::Token;
    use chrono::{Duration, Utc};
    use std::cell::RefCell;
    use std::fmt;

    #[derive(Debug)]
    struct Rejected;

    impl fmt::Display for Rejected {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "rejected")
        }
    }

    impl std::error::Error for Rejected {}

    /// Records every delivery; fails when `reject` is set.
    #[derive(Default)]
    struct Recorder {
        sent: RefCell<Vec<(String, String)>>,
        reject: bool,
    }

    impl Transport for Recorder {
        type Error = Rejected;

        fn deliver(
            &self,
            _session: &Session,
            sender: &str,
            raw: &str,
        ) -> std::result::Result<String, Rejected> {
            if self.reject {
                return Err(Rejected);
            }
            let mut sent = self.sent.borrow_mut();
            sent.push((sender.to_string(), raw.to_string()));
            Ok(format!("id-{}", sent.len()))
        }
    }

    fn message() -> Message {
        let mut message = Message::new("Hi", "", &["a@b.com"], &[] as &[&str]).unwrap();
        message.set_body("hello").unwrap();
        message
    }

    #[test]
    fn test_send_without_session() {
        let recorder = Recorder::default();
        let mailer = Mailer::new(None::<Session>, &recorder);

        assert!(matches!(mailer.send(&message()), Err(Error::NotInitialized)));
        assert!(recorder.sent.borrow().is_empty());
    }

    #[test]
    fn test_send_with_expired_session() {
        let token = Token::bearer("abc").with_expires_at(Utc::now() - Duration::minutes(5));
        let recorder = Recorder::default();
        let mailer = Mailer::new(Session::new(token), &recorder);

        assert!(matches!(mailer.send(&message()), Err(Error::NotInitialized)));
        assert!(recorder.sent.borrow().is_empty());
    }

    #[test]
    fn test_send_encodes_message() {
        let recorder = Recorder::default();
        let mailer = Mailer::new(Session::new(Token::bearer("abc")), &recorder);
        let message = message();

        assert_eq!(mailer.send(&message).unwrap(), "id-1");

        let sent = recorder.sent.borrow();
        let (sender, raw) = &sent[0];
        assert_eq!(sender, "me");
        assert!(!raw.contains(['=', '+', '/']));
        assert_eq!(URL_SAFE_NO_PAD.decode(raw).unwrap(), message.to_bytes().unwrap());
    }

    #[test]
    fn test_send_empty_message() {
        let recorder = Recorder::default();
        let mailer = Mailer::new(Session::new(Token::bearer("abc")), &recorder);
        let message = Message::new("", "", &["a@b.com"], &[] as &[&str]).unwrap();

        assert!(matches!(
            mailer.send(&message),
            Err(Error::Mime(mailpost_mime::Error::EmptyMessage))
        ));
    }

    #[test]
    fn test_transport_error_is_passed_through() {
        let recorder = Recorder {
            reject: true,
            ..Recorder::default()
        };
        let mailer = Mailer::new(Session::new(Token::bearer("abc")), &recorder);

        let err = mailer.send(&message()).unwrap_err();
        match err {
            Error::Transport(source) => assert!(source.is::<Rejected>()),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_config_applies() {
        let recorder = Recorder::default();
        let config = SendConfig::new()
            .with_sender("alias@example.com")
            .with_mailer("reports/1.2");
        let mailer = Mailer::with_config(Session::new(Token::bearer("abc")), &recorder, config);

        mailer.send(&message()).unwrap();

        let sent = recorder.sent.borrow();
        let (sender, raw) = &sent[0];
        assert_eq!(sender, "alias@example.com");
        let decoded = String::from_utf8(URL_SAFE_NO_PAD.decode(raw).unwrap()).unwrap();
        assert!(decoded.contains("X-Mailer: reports/1.2\r\n"));
    }

    #[test]
    fn test_config_mailer_with_line_break_is_rejected() {
        let recorder = Recorder::default();
        let config: SendConfig =
            serde_json::from_str(r#"{"mailer": "tool\r\nBcc: evil@attacker.example"}"#).unwrap();
        let mailer = Mailer::with_config(Session::new(Token::bearer("abc")), &recorder, config);

        let err = mailer.send(&message()).unwrap_err();
        assert!(matches!(
            err,
            Error::Mime(mailpost_mime::Error::InvalidHeader(_))
        ));
        assert!(recorder.sent.borrow().is_empty());
    }
}
