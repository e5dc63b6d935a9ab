//! Authorized sessions and the providers that hand them out.

use crate::error::Result;
use crate::token::Token;

/// Sender identity meaning "the authenticated user".
pub const SELF_IDENTITY: &str = "me";

/// An authorized mail API session.
///
/// Established once by the caller (after whatever authorization flow it
/// runs) and then only read while sending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Account the messages are sent from; [`SELF_IDENTITY`] by default.
    pub identity: String,
    /// Access token presented to the mail API.
    pub token: Token,
}

impl Session {
    /// Creates a session for the authenticated user.
    #[must_use]
    pub fn new(token: Token) -> Self {
        Self {
            identity: SELF_IDENTITY.to_string(),
            token,
        }
    }

    /// Restores a session from a previously stored token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if the token cannot be parsed.
    pub fn from_token_json(json: &str) -> Result<Self> {
        Ok(Self::new(Token::from_json(json)?))
    }

    /// Sets the sender identity.
    #[must_use]
    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = identity.into();
        self
    }

    /// Returns true if the token can still be used.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.token.is_valid()
    }
}

/// Source of the session used for sending.
pub trait SessionProvider {
    /// Current session, if one has been established.
    fn session(&self) -> Option<&Session>;
}

impl SessionProvider for Session {
    fn session(&self) -> Option<&Session> {
        Some(self)
    }
}

impl SessionProvider for Option<Session> {
    fn session(&self) -> Option<&Session> {
        self.as_ref()
    }
}

impl<P: SessionProvider + ?Sized> SessionProvider for &P {
    fn session(&self) -> Option<&Session> {
        (**self).session()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::Error;
    use chrono::{Duration, Utc};

    #[test]
    fn test_session_defaults_to_self() {
        let session = Session::new(Token::bearer("abc"));
        assert_eq!(session.identity, "me");
        assert!(session.is_active());

        let session = session.with_identity("sender@example.com");
        assert_eq!(session.identity, "sender@example.com");
    }

    #[test]
    fn test_session_from_token_json() {
        let session = Session::from_token_json(r#"{"access_token": "abc"}"#).unwrap();
        assert_eq!(session.token.access_token, "abc");

        let err = Session::from_token_json("{").unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_expired_session_is_inactive() {
        let token = Token::bearer("abc").with_expires_at(Utc::now() - Duration::hours(1));
        assert!(!Session::new(token).is_active());
    }

    #[test]
    fn test_providers() {
        let session = Session::new(Token::bearer("abc"));
        assert_eq!(session.session(), Some(&session));

        let none: Option<Session> = None;
        assert!(none.session().is_none());

        let some = Some(session.clone());
        assert_eq!(some.session(), Some(&session));
    }
}
