//! # mailpost-mime
//!
//! Assembly of outgoing MIME email messages.
//!
//! ## Features
//!
//! - **Address validation**: RFC 5322 mailboxes for From, To and Cc
//! - **Content detection**: type from file extension, or sniffed from content
//! - **Parts**: a text body plus any number of named attachments
//! - **Serialization**: single-part or `multipart/mixed` output with CRLF line endings
//! - **Encoding**: Base64, Quoted-Printable, RFC 2047 header encoding
//!
//! ## Quick Start
//!
//! ```
//! use mailpost_mime::Message;
//!
//! # fn main() -> mailpost_mime::Result<()> {
//! let mut message = Message::new(
//!     "Quarterly report",
//!     "Reports <reports@example.com>",
//!     &["alice@example.com", "Bob <bob@example.com>"],
//!     &[] as &[&str],
//! )?;
//! message.set_body("<html><p>See attached.</p></html>")?;
//! message.attach("q3/report.csv", "region,total\nnorth,42\n")?;
//!
//! let raw = message.to_bytes()?;
//! assert!(raw.starts_with(b"Content-Type: multipart/mixed;\r\n boundary="));
//! # Ok(())
//! # }
//! ```
//!
//! ### Encoding
//!
//! ```ignore
//! use mailpost_mime::encoding::{encode_base64, encode_quoted_printable, encode_rfc2047, WordEncoding};
//!
//! let body = encode_base64(b"Hello, World!");
//! let text = encode_quoted_printable("Héllo, Wørld!".as_bytes());
//! let subject = encode_rfc2047("Héllo", WordEncoding::Q);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod address;
mod classify;
mod content_type;
mod error;
mod header;
mod message;

pub mod encoding;

pub use address::{AddressList, Mailbox, ParsedAddresses};
pub use classify::{Classification, classify, sniff, type_by_extension};
pub use content_type::ContentType;
pub use error::{Error, Result};
pub use header::Headers;
pub use message::{MAILER, Message, Part, PartKey, TransferEncoding};
