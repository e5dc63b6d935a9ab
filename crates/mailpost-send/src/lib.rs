//! # mailpost-send
//!
//! Sends messages built with `mailpost-mime` through an authorized mail API
//! session, such as the Gmail API.
//!
//! ## Features
//!
//! - **Sessions**: `OAuth2` token plus sender identity, restorable from a stored token
//! - **Transport seam**: plug in any API client through the [`Transport`] trait
//! - **Encoding**: messages are submitted as URL-safe base64 without padding
//! - **File attachments**: [`attach_file`] reads attachments from disk
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailpost_mime::Message;
//! use mailpost_send::{Mailer, Session, attach_file};
//!
//! // Restore the token saved after the authorization flow
//! let session = Session::from_token_json(&std::fs::read_to_string("token.json")?)?;
//! let mailer = Mailer::new(session, GmailTransport::new(client));
//!
//! let mut message = Message::new(
//!     "Subject",
//!     "sender@example.com",
//!     &["Test User <test@example.com>"],
//!     &[] as &[&str],
//! )?;
//! message.set_body("<html><p>body text</p></html>")?;
//! attach_file(&mut message, "README.md")?;
//!
//! let id = mailer.send(&message)?;
//! println!("Sent message {id}");
//! ```

mod config;
mod error;
mod mailer;
mod session;
mod source;
mod token;
mod transport;

pub use config::SendConfig;
pub use error::{Error, Result};
pub use mailer::Mailer;
pub use session::{SELF_IDENTITY, Session, SessionProvider};
pub use source::attach_file;
pub use token::Token;
pub use transport::Transport;
