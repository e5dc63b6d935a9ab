//! Send configuration.

use crate::session::SELF_IDENTITY;
use serde::{Deserialize, Serialize};

/// Settings applied to every message a [`Mailer`](crate::Mailer) sends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SendConfig {
    /// Sender identity; `None` uses the session's identity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,

    /// Product identifier announced in the `X-Mailer` header.
    pub mailer: String,
}

impl Default for SendConfig {
    fn default() -> Self {
        Self {
            sender: None,
            mailer: mailpost_mime::MAILER.to_string(),
        }
    }
}

impl SendConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the sender identity.
    #[must_use]
    pub fn with_sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = Some(sender.into());
        self
    }

    /// Sets the `X-Mailer` product identifier.
    #[must_use]
    pub fn with_mailer(mut self, mailer: impl Into<String>) -> Self {
        self.mailer = mailer.into();
        self
    }

    /// Sender to submit as, falling back to `session_identity` and then to
    /// the authenticated user.
    #[must_use]
    pub fn sender_or<'a>(&'a self, session_identity: &'a str) -> &'a str {
        match self.sender.as_deref() {
            Some(sender) if !sender.is_empty() => sender,
            _ if !session_identity.is_empty() => session_identity,
            _ => SELF_IDENTITY,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SendConfig::new();
        assert_eq!(config.sender, None);
        assert_eq!(config.mailer, mailpost_mime::MAILER);
        assert_eq!(config.sender_or("me"), "me");
        assert_eq!(config.sender_or(""), "me");
    }

    #[test]
    fn test_sender_precedence() {
        let config = SendConfig::new().with_sender("alias@example.com");
        assert_eq!(config.sender_or("me"), "alias@example.com");

        let config = SendConfig::new().with_sender("");
        assert_eq!(config.sender_or("owner@example.com"), "owner@example.com");
    }

    #[test]
    fn test_deserialize_partial() {
        let config: SendConfig = serde_json::from_str(r#"{"mailer": "reports/1.2"}"#).unwrap();
        assert_eq!(config, SendConfig::new().with_mailer("reports/1.2"));

        let config: SendConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, SendConfig::default());
    }
}
