//! Delivery seam between the mailer and a mail API client.

use crate::session::Session;

/// Delivers an encoded message to a mail service.
///
/// Implementations wrap a concrete API client (for example the Gmail
/// `users.messages.send` call). Errors are passed back to the caller
/// unchanged; the mailer does not retry.
pub trait Transport {
    /// Error returned by the service client.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Submits one message and returns the identifier the service assigned.
    ///
    /// `raw` is the complete RFC 5322 message in URL-safe base64 without
    /// padding. `sender` is the account to send from.
    ///
    /// # Errors
    ///
    /// Returns the client's error if the service rejects the message or
    /// cannot be reached.
    fn deliver(&self, session: &Session, sender: &str, raw: &str) -> Result<String, Self::Error>;
}

impl<T: Transport + ?Sized> Transport for &T {
    type Error = T::Error;

    fn deliver(&self, session: &Session, sender: &str, raw: &str) -> Result<String, Self::Error> {
        (**self).deliver(session, sender, raw)
    }
}
