//! `OAuth2` access token held by a send session.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Seconds before the recorded expiry at which a token is already treated as
/// expired.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// `OAuth2` access token with metadata.
///
/// The JSON form matches the token files written by common `OAuth2` clients:
/// `access_token`, `token_type`, optional `refresh_token`, and the expiry as
/// either `expires_at` or `expiry`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Access token string.
    pub access_token: String,
    /// Token type (usually "Bearer").
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Expiration time.
    #[serde(
        default,
        alias = "expiry",
        skip_serializing_if = "Option::is_none"
    )]
    pub expires_at: Option<DateTime<Utc>>,
    /// Refresh token for obtaining new access tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Scope granted by authorization server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl Token {
    /// Creates a new token.
    #[must_use]
    pub fn new(access_token: impl Into<String>, token_type: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: token_type.into(),
            expires_at: None,
            refresh_token: None,
            scope: None,
        }
    }

    /// Creates a bearer token.
    #[must_use]
    pub fn bearer(access_token: impl Into<String>) -> Self {
        Self::new(access_token, default_token_type())
    }

    /// Parses a stored token.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or has no access token.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Checks if the token is expired (with 60 second buffer).
    ///
    /// A token without an expiry never expires.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|exp| Utc::now() + Duration::seconds(EXPIRY_MARGIN_SECS) >= exp)
    }

    /// Returns true if the token is valid (not expired).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.is_expired()
    }

    /// Value for an HTTP `Authorization` header.
    #[must_use]
    pub fn authorization(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }

    /// Sets the refresh token.
    #[must_use]
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    /// Sets the expiration time.
    #[must_use]
    pub const fn with_expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Sets the scope.
    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
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
    fn test_token_creation() {
        let token = Token::bearer("access123");
        assert_eq!(token.access_token, "access123");
        assert_eq!(token.token_type, "Bearer");
        assert!(token.expires_at.is_none());
        assert!(token.refresh_token.is_none());
        assert!(token.is_valid());
    }

    #[test]
    fn test_token_expiration() {
        let expired = Token::bearer("access123").with_expires_at(Utc::now() - Duration::seconds(120));
        assert!(expired.is_expired());
        assert!(!expired.is_valid());

        let almost = Token::bearer("access123").with_expires_at(Utc::now() + Duration::seconds(30));
        assert!(almost.is_expired());

        let valid = Token::bearer("access123").with_expires_at(Utc::now() + Duration::seconds(3600));
        assert!(!valid.is_expired());
        assert!(valid.is_valid());
    }

    #[test]
    fn test_token_authorization() {
        let token = Token::bearer("ya29.abc");
        assert_eq!(token.authorization(), "Bearer ya29.abc");
    }

    #[test]
    fn test_token_from_stored_json() {
        let token = Token::from_json(
            r#"{
                "access_token": "ya29.abc",
                "token_type": "Bearer",
                "refresh_token": "1//refresh",
                "expiry": "2099-01-01T00:00:00Z"
            }"#,
        )
        .unwrap();
        assert_eq!(token.refresh_token.as_deref(), Some("1//refresh"));
        assert!(token.expires_at.is_some());
        assert!(token.is_valid());
    }

    #[test]
    fn test_token_json_defaults() {
        let token = Token::from_json(r#"{"access_token": "abc"}"#).unwrap();
        assert_eq!(token, Token::bearer("abc"));

        assert!(Token::from_json(r#"{"token_type": "Bearer"}"#).is_err());
        assert!(Token::from_json("not json").is_err());
    }

    #[test]
    fn test_token_json_round_trip_omits_empty_fields() {
        let token = Token::bearer("abc").with_scope("gmail.send");
        let json = serde_json::to_string(&token).unwrap();
        assert!(!json.contains("refresh_token"));
        assert_eq!(Token::from_json(&json).unwrap(), token);
    }
}
