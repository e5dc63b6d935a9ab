//! Outgoing MIME message structure and serialization.

use crate::address::AddressList;
use crate::classify::{Classification, classify};
use crate::content_type::{ContentType, write_parameter_value};
use crate::encoding::{WordEncoding, encode_base64, encode_quoted_printable, encode_rfc2047};
use crate::error::{Error, Result};
use crate::header::Headers;
use rand::Rng;
use std::collections::BTreeMap;
use std::fmt::{self, Write as _};
use std::io::Write;
use tracing::debug;

/// Product identifier written as `X-Mailer` unless the message overrides it.
pub const MAILER: &str = concat!("mailpost/", env!("CARGO_PKG_VERSION"));

/// Number of random bytes in a multipart boundary.
const BOUNDARY_BYTES: usize = 30;

/// Transfer encodings the serializer can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEncoding {
    /// Base64 encoding.
    Base64,
    /// Quoted-Printable encoding.
    QuotedPrintable,
}

impl TransferEncoding {
    /// Parses a `Content-Transfer-Encoding` value.
    ///
    /// Returns `None` for encodings this crate does not write.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "base64" => Some(Self::Base64),
            "quoted-printable" => Some(Self::QuotedPrintable),
            _ => None,
        }
    }
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Base64 => write!(f, "base64"),
            Self::QuotedPrintable => write!(f, "quoted-printable"),
        }
    }
}

/// Key of a part within a message.
///
/// The body sorts before every attachment, so it is always serialized first.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PartKey {
    /// The message text.
    Body,
    /// A file attachment, by file name.
    Attachment(String),
}

/// MIME message part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    headers: Headers,
    data: Vec<u8>,
}

impl Part {
    fn new(class: Classification, disposition: Option<String>, data: Vec<u8>) -> Self {
        let mut headers = Headers::new();
        headers.set("Content-Type", class.content_type.to_string());
        headers.set("Content-Transfer-Encoding", class.encoding.to_string());
        if let Some(disposition) = disposition {
            headers.set("Content-Disposition", disposition);
        }
        Self { headers, data }
    }

    /// Part headers.
    #[must_use]
    pub const fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Raw, unencoded payload.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Gets the declared transfer encoding, if it is one the serializer
    /// can write.
    #[must_use]
    pub fn transfer_encoding(&self) -> Option<TransferEncoding> {
        self.headers
            .get("content-transfer-encoding")
            .and_then(TransferEncoding::parse)
    }

    /// Writes the payload with its declared transfer encoding.
    ///
    /// Only quoted-printable and base64 are produced; any other declared
    /// encoding is an error naming the declared value.
    fn write_data<W: Write + ?Sized>(&self, w: &mut W) -> Result<()> {
        let encoded = match self.transfer_encoding() {
            Some(TransferEncoding::QuotedPrintable) => encode_quoted_printable(&self.data),
            Some(TransferEncoding::Base64) => encode_base64(&self.data),
            None => {
                let declared = self
                    .headers
                    .get("content-transfer-encoding")
                    .unwrap_or_default();
                return Err(Error::UnsupportedEncoding(declared.to_string()));
            }
        };
        w.write_all(encoded.as_bytes())?;
        Ok(())
    }
}

/// Outgoing MIME message.
///
/// Built from validated addresses, then filled with a body and attachments.
/// Serialization borrows the message, so the same message can be written or
/// sent any number of times.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    headers: Headers,
    parts: BTreeMap<PartKey, Part>,
}

impl Message {
    /// Creates a new message.
    ///
    /// `from` may be empty or `me` to send as the authenticated user. Any
    /// other value must be a single mailbox and is used for both `From` and
    /// `Reply-To`. At least one `to` or `cc` address is required.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] for a malformed address and
    /// [`Error::NoRecipient`] when `to` and `cc` are both empty.
    pub fn new<S: AsRef<str>>(subject: &str, from: &str, to: &[S], cc: &[S]) -> Result<Self> {
        let mut headers = Headers::new();

        let from = from.trim();
        if !from.is_empty() && from != "me" {
            if let Some(sender) = AddressList::parse(&[from]).into_result("from")? {
                if sender.len() > 1 {
                    return Err(Error::invalid_address(
                        "from",
                        format!("expected single address in {from:?}"),
                    ));
                }
                let sender = sender.to_string();
                headers.set("From", sender.clone());
                headers.set("Reply-To", sender);
            }
        }

        let to = AddressList::parse(to).into_result("to")?;
        let cc = AddressList::parse(cc).into_result("cc")?;
        if to.is_none() && cc.is_none() {
            return Err(Error::NoRecipient);
        }
        if let Some(to) = to {
            headers.set("To", to.to_string());
        }
        if let Some(cc) = cc {
            headers.set("Cc", cc.to_string());
        }

        if !subject.is_empty() {
            headers.set("Subject", encode_rfc2047(subject, WordEncoding::Q));
        }

        Ok(Self {
            headers,
            parts: BTreeMap::new(),
        })
    }

    /// Message headers (without MIME framing headers).
    #[must_use]
    pub const fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Sets an extra message header, replacing any previous value.
    ///
    /// Message headers take precedence over the fixed `MIME-Version` and
    /// `X-Mailer` headers when serialized.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHeader`] if the header would break the block.
    pub fn set_header(&mut self, name: &str, value: &str) -> Result<()> {
        Headers::validate(name, value)?;
        self.headers.set(name, value);
        Ok(())
    }

    /// Attaches a file. Empty `data` removes the attachment instead.
    ///
    /// Only the final path component of `name` is kept. The content type
    /// comes from the extension, or from the data when the extension is
    /// unknown.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidName`] if `name` has no usable file name.
    pub fn attach(&mut self, name: &str, data: impl Into<Vec<u8>>) -> Result<()> {
        let data = data.into();
        if data.is_empty() {
            self.remove(name);
            return Ok(());
        }

        let filename = base_name(name).ok_or_else(|| Error::InvalidName(name.to_string()))?;
        let class = classify(Some(filename), &data);
        debug!(
            filename,
            content_type = %class.content_type,
            size = data.len(),
            "attaching file"
        );

        let disposition = attachment_disposition(filename);
        self.parts.insert(
            PartKey::Attachment(filename.to_string()),
            Part::new(class, Some(disposition), data),
        );
        Ok(())
    }

    /// Sets the message text. Empty `data` clears the body.
    ///
    /// The format (plain text, HTML, ...) is detected from the content; wrap
    /// HTML in an `<html>` tag to be sure it is recognized.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedBodyType`] if the data is not text. The
    /// message is left unchanged in that case.
    pub fn set_body(&mut self, data: impl Into<Vec<u8>>) -> Result<()> {
        let data = data.into();
        if data.is_empty() {
            self.clear_body();
            return Ok(());
        }

        let class = classify(None, &data);
        if !class.content_type.is_text() {
            return Err(Error::UnsupportedBodyType(class.content_type.to_string()));
        }
        debug!(content_type = %class.content_type, size = data.len(), "setting body");

        self.parts.insert(PartKey::Body, Part::new(class, None, data));
        Ok(())
    }

    /// Removes the message text, if any.
    pub fn clear_body(&mut self) {
        self.parts.remove(&PartKey::Body);
    }

    /// Removes an attachment. Returns true if it was present.
    pub fn remove(&mut self, name: &str) -> bool {
        let Some(filename) = base_name(name) else {
            return false;
        };
        let removed = self
            .parts
            .remove(&PartKey::Attachment(filename.to_string()))
            .is_some();
        if removed {
            debug!(filename, "removed attachment");
        }
        removed
    }

    /// Returns true if an attachment with that file name is present.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        base_name(name).is_some_and(|filename| {
            self.parts
                .contains_key(&PartKey::Attachment(filename.to_string()))
        })
    }

    /// Returns true if the message text is set.
    #[must_use]
    pub fn has_body(&self) -> bool {
        self.parts.contains_key(&PartKey::Body)
    }

    /// Gets a part by key.
    #[must_use]
    pub fn part(&self, key: &PartKey) -> Option<&Part> {
        self.parts.get(key)
    }

    /// Attachment file names in serialization order.
    pub fn attachment_names(&self) -> impl Iterator<Item = &str> {
        self.parts.keys().filter_map(|key| match key {
            PartKey::Body => None,
            PartKey::Attachment(name) => Some(name.as_str()),
        })
    }

    /// Writes the message with the default `X-Mailer`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyMessage`] if there is neither body nor
    /// attachment, or the first error from the sink.
    pub fn write_to<W: Write>(&self, w: W) -> Result<()> {
        self.write_to_with_mailer(MAILER, w)
    }

    /// Writes the message, announcing `mailer` as `X-Mailer`.
    ///
    /// A message with only a body is written as a single part; anything else
    /// becomes `multipart/mixed` with the body first and attachments in name
    /// order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyMessage`] if there is neither body nor
    /// attachment, [`Error::InvalidHeader`] if `mailer` contains a line
    /// break, or the first error from the sink. Nothing is written when
    /// the message or `mailer` is rejected.
    pub fn write_to_with_mailer<W: Write>(&self, mailer: &str, mut w: W) -> Result<()> {
        if self.parts.is_empty() {
            return Err(Error::EmptyMessage);
        }
        Headers::validate("X-Mailer", mailer)?;

        let mut headers = Headers::new();
        headers.set("MIME-Version", "1.0");
        headers.set("X-Mailer", mailer);
        headers.merge(&self.headers);

        if let (1, Some(body)) = (self.parts.len(), self.parts.get(&PartKey::Body)) {
            headers.merge(&body.headers);
            headers.write_to(&mut w)?;
            return body.write_data(&mut w);
        }

        let boundary = generate_boundary();
        headers.set(
            "Content-Type",
            ContentType::multipart_mixed(boundary.as_str()).to_string(),
        );
        headers.write_to(&mut w)?;

        for (index, part) in self.parts.values().enumerate() {
            if index > 0 {
                w.write_all(b"\r\n")?;
            }
            write!(w, "--{boundary}\r\n")?;
            part.headers.write_to(&mut w)?;
            part.write_data(&mut w)?;
        }
        write!(w, "\r\n--{boundary}--\r\n")?;

        Ok(())
    }

    /// Serializes the message into a byte vector.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyMessage`] if there is neither body nor attachment.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.write_to(&mut buf)?;
        Ok(buf)
    }
}

/// Final path component of `name`, or `None` for names that do not resolve
/// to a file (`""`, `.`, `..`, bare separators).
fn base_name(name: &str) -> Option<&str> {
    let trimmed = name.trim_end_matches(['/', '\\']);
    let base = trimmed.rsplit(['/', '\\']).next().unwrap_or(trimmed);
    match base {
        "" | "." | ".." => None,
        _ => Some(base),
    }
}

/// `attachment; filename=...`, quoted or RFC 2231 encoded as needed.
fn attachment_disposition(filename: &str) -> String {
    let mut value = String::from("attachment; ");
    if filename.is_ascii() && !filename.bytes().any(|b| b.is_ascii_control()) {
        value.push_str("filename=");
        let _ = write_parameter_value(&mut value, filename);
    } else {
        value.push_str("filename*=utf-8''");
        for byte in filename.bytes() {
            if byte.is_ascii_alphanumeric() || b"!#$&+-.^_`|~".contains(&byte) {
                value.push(byte as char);
            } else {
                let _ = write!(value, "%{byte:02X}");
            }
        }
    }
    value
}

fn generate_boundary() -> String {
    let mut bytes = [0u8; BOUNDARY_BYTES];
    rand::thread_rng().fill(&mut bytes[..]);
    bytes.iter().fold(String::with_capacity(BOUNDARY_BYTES * 2), |mut s, b| {
        let _ = write!(s, "{b:02x}");
        s
    })
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
    use proptest::prelude::*;

    const NO_ADDRESSES: &[&str] = &[];

    fn message() -> Message {
        Message::new("Subject", "", &["a@b.com"], NO_ADDRESSES).unwrap()
    }

    fn render(message: &Message) -> String {
        String::from_utf8(message.to_bytes().unwrap()).unwrap()
    }

    #[test]
    fn test_transfer_encoding_parse() {
        assert_eq!(TransferEncoding::parse("base64"), Some(TransferEncoding::Base64));
        assert_eq!(
            TransferEncoding::parse(" Quoted-Printable"),
            Some(TransferEncoding::QuotedPrintable)
        );
        assert_eq!(TransferEncoding::parse("7bit"), None);
        assert_eq!(TransferEncoding::parse("x-uuencode"), None);
    }

    #[test]
    fn test_new_sets_address_headers() {
        let message = Message::new(
            "Subject",
            "Dmitrys <dmitrys@xyzrd.com>",
            &["I am<sedykh@gmail.com>", "d3@yandex.ru"],
            &["other@example.com"],
        )
        .unwrap();

        let headers = message.headers();
        assert_eq!(headers.get("From"), Some("\"Dmitrys\" <dmitrys@xyzrd.com>"));
        assert_eq!(headers.get("Reply-To"), headers.get("From"));
        assert_eq!(
            headers.get("To"),
            Some("\"I am\" <sedykh@gmail.com>, <d3@yandex.ru>")
        );
        assert_eq!(headers.get("Cc"), Some("<other@example.com>"));
        assert_eq!(headers.get("Subject"), Some("Subject"));
    }

    #[test]
    fn test_new_send_as_self() {
        for from in ["", "me", "  "] {
            let message = Message::new("", from, &["a@b.com"], NO_ADDRESSES).unwrap();
            assert!(!message.headers().contains("From"));
            assert!(!message.headers().contains("Reply-To"));
            assert!(!message.headers().contains("Subject"));
        }
    }

    #[test]
    fn test_new_cc_only() {
        let message = Message::new("", "", NO_ADDRESSES, &["cc@example.com"]).unwrap();
        assert!(!message.headers().contains("To"));
        assert_eq!(message.headers().get("cc"), Some("<cc@example.com>"));
    }

    #[test]
    fn test_new_encodes_subject() {
        let message = Message::new("Тест", "", &["a@b.com"], NO_ADDRESSES).unwrap();
        assert_eq!(
            message.headers().get("Subject"),
            Some("=?utf-8?q?=D0=A2=D0=B5=D1=81=D1=82?=")
        );
    }

    #[test]
    fn test_new_rejects_bad_addresses() {
        let err = Message::new("", "me", &["bad"], NO_ADDRESSES).unwrap_err();
        assert!(matches!(err, Error::InvalidAddress { field: "to", .. }));

        let err = Message::new("", "me", NO_ADDRESSES, &["bad"]).unwrap_err();
        assert!(matches!(err, Error::InvalidAddress { field: "cc", .. }));

        let err = Message::new("", "bad", &["a@b.com"], NO_ADDRESSES).unwrap_err();
        assert!(matches!(err, Error::InvalidAddress { field: "from", .. }));

        let err = Message::new("", "a@b.com, c@d.com", &["a@b.com"], NO_ADDRESSES).unwrap_err();
        assert!(matches!(err, Error::InvalidAddress { field: "from", .. }));
    }

    #[test]
    fn test_new_requires_recipient() {
        let err = Message::new("", "", NO_ADDRESSES, NO_ADDRESSES).unwrap_err();
        assert!(matches!(err, Error::NoRecipient));

        let err = Message::new("", "me", &[" ", ""], &[""]).unwrap_err();
        assert!(matches!(err, Error::NoRecipient));
    }

    #[test]
    fn test_set_header_rejects_injection() {
        let mut message = message();
        assert!(message.set_header("In-Reply-To", "<id@example.com>").is_ok());
        assert!(matches!(
            message.set_header("X-Bad", "a\r\nBcc: x@y.z"),
            Err(Error::InvalidHeader(_))
        ));
    }

    #[test]
    fn test_attach_and_remove() {
        let mut message = message();
        message.attach("test_file.txt", "text").unwrap();
        assert!(message.has("test_file.txt"));

        message.attach("test_file.txt", Vec::new()).unwrap();
        assert!(!message.has("test_file.txt"));

        // Removing twice, or something never attached, is fine.
        message.attach("test_file.txt", Vec::new()).unwrap();
        message.attach("never.bin", Vec::new()).unwrap();
        assert!(!message.has("never.bin"));
    }

    #[test]
    fn test_attach_uses_base_name() {
        let mut message = message();
        message.attach("~/test/file.name", "<html><p>x</p></html>").unwrap();
        assert!(message.has("file.name"));
        assert!(message.has("/elsewhere/file.name"));
        assert_eq!(message.attachment_names().collect::<Vec<_>>(), vec!["file.name"]);

        message.attach("C:\\docs\\report.txt", "report").unwrap();
        assert!(message.has("report.txt"));
    }

    #[test]
    fn test_attach_rejects_bad_names() {
        let mut message = message();
        for name in ["", ".", "..", "/", "\\", "dir/..", "dir/"] {
            if name == "dir/" {
                // Trailing separators are ignored.
                assert!(message.attach(name, "x").is_ok());
                continue;
            }
            assert!(
                matches!(message.attach(name, "x"), Err(Error::InvalidName(_))),
                "accepted {name:?}"
            );
        }
    }

    #[test]
    fn test_attach_headers() {
        let mut message = message();
        message.attach("a.bin", vec![0, 1, 2, 3]).unwrap();
        message.attach("notes.txt", "hello").unwrap();
        message.attach("my report.pdf", "%PDF-1.4").unwrap();
        message.attach("résumé.txt", "cv").unwrap();

        let part = |name: &str| message.part(&PartKey::Attachment(name.to_string())).unwrap();

        let bin = part("a.bin").headers();
        assert_eq!(bin.get("Content-Type"), Some("application/octet-stream"));
        assert_eq!(bin.get("Content-Transfer-Encoding"), Some("base64"));
        assert_eq!(bin.get("Content-Disposition"), Some("attachment; filename=a.bin"));

        let txt = part("notes.txt").headers();
        assert_eq!(txt.get("Content-Type"), Some("text/plain; charset=utf-8"));
        assert_eq!(txt.get("Content-Transfer-Encoding"), Some("quoted-printable"));

        assert_eq!(
            part("my report.pdf").headers().get("Content-Disposition"),
            Some("attachment; filename=\"my report.pdf\"")
        );
        assert_eq!(
            part("résumé.txt").headers().get("Content-Disposition"),
            Some("attachment; filename*=utf-8''r%C3%A9sum%C3%A9.txt")
        );
    }

    #[test]
    fn test_attach_replaces_existing() {
        let mut message = message();
        message.attach("file.zzq", "<html><p>x</p></html>").unwrap();
        message.attach("file.zzq", vec![0, 1, 2]).unwrap();

        let part = message.part(&PartKey::Attachment("file.zzq".into())).unwrap();
        assert_eq!(part.data(), &[0, 1, 2]);
        assert_eq!(part.transfer_encoding(), Some(TransferEncoding::Base64));
    }

    #[test]
    fn test_set_body_rejects_binary() {
        let mut message = message();
        let err = message.set_body(vec![0, 1, 2]).unwrap_err();
        assert!(matches!(err, Error::UnsupportedBodyType(ref ct) if ct == "application/octet-stream"));
        assert!(!message.has_body());
        // Address headers survive the failure.
        assert!(message.headers().contains("To"));
    }

    #[test]
    fn test_set_body_failure_keeps_previous_body() {
        let mut message = message();
        message.set_body("first").unwrap();
        assert!(message.set_body(vec![0xFF, 0xD8, 0xFF, 0xE0]).is_err());
        assert_eq!(message.part(&PartKey::Body).unwrap().data(), b"first");
    }

    #[test]
    fn test_set_body_empty_clears() {
        let mut message = message();
        message.set_body("text").unwrap();
        assert!(message.has_body());
        message.set_body(Vec::new()).unwrap();
        assert!(!message.has_body());
    }

    #[test]
    fn test_body_is_not_an_attachment() {
        let mut message = message();
        message.set_body("text").unwrap();
        assert_eq!(message.attachment_names().count(), 0);
        assert!(
            message
                .part(&PartKey::Body)
                .unwrap()
                .headers()
                .get("Content-Disposition")
                .is_none()
        );
    }

    #[test]
    fn test_write_empty_message() {
        let message = message();
        assert!(matches!(message.to_bytes(), Err(Error::EmptyMessage)));
    }

    #[test]
    fn test_write_single_part() {
        let mut message = message();
        message.set_body("<html><p>hi</p></html>").unwrap();

        assert_eq!(
            render(&message),
            format!(
                "Content-Transfer-Encoding: quoted-printable\r\n\
                 Content-Type: text/html; charset=utf-8\r\n\
                 MIME-Version: 1.0\r\n\
                 Subject: Subject\r\n\
                 To: <a@b.com>\r\n\
                 X-Mailer: {MAILER}\r\n\
                 \r\n\
                 <html><p>hi</p></html>"
            )
        );
    }

    #[test]
    fn test_write_multipart() {
        let mut message = message();
        message.set_body("<html><p>hi</p></html>").unwrap();
        message.attach("a.bin", vec![0, 1, 2, 3]).unwrap();

        let out = render(&message);
        let (head, body) = out.split_once("\r\n\r\n").unwrap();
        // The boundary parameter does not fit on the first line.
        let (_, folded) = head
            .split_once("Content-Type: multipart/mixed;\r\n boundary=")
            .unwrap();
        let boundary = folded.split("\r\n").next().unwrap();
        assert_eq!(boundary.len(), BOUNDARY_BYTES * 2);
        assert!(!head.contains("Content-Transfer-Encoding"));

        assert_eq!(
            body,
            format!(
                "--{boundary}\r\n\
                 Content-Transfer-Encoding: quoted-printable\r\n\
                 Content-Type: text/html; charset=utf-8\r\n\
                 \r\n\
                 <html><p>hi</p></html>\r\n\
                 --{boundary}\r\n\
                 Content-Disposition: attachment; filename=a.bin\r\n\
                 Content-Transfer-Encoding: base64\r\n\
                 Content-Type: application/octet-stream\r\n\
                 \r\n\
                 AAECAw==\r\n\
                 --{boundary}--\r\n"
            )
        );
    }

    #[test]
    fn test_write_attachments_only() {
        let mut message = message();
        message.attach("b.txt", "second").unwrap();
        message.attach("a.txt", "first").unwrap();

        let out = render(&message);
        assert!(out.contains("multipart/mixed"));
        let first = out.find("filename=a.txt").unwrap();
        let second = out.find("filename=b.txt").unwrap();
        assert!(first < second);
    }

    #[test]
    fn test_message_headers_override_fixed() {
        let mut message = message();
        message.set_body("text").unwrap();
        message.set_header("X-Mailer", "custom").unwrap();

        let out = render(&message);
        assert!(out.contains("X-Mailer: custom\r\n"));
        assert!(!out.contains(MAILER));
    }

    #[test]
    fn test_write_with_mailer() {
        let mut message = message();
        message.set_body("text").unwrap();

        let mut out = Vec::new();
        message.write_to_with_mailer("tool/2.0", &mut out).unwrap();
        assert!(String::from_utf8(out).unwrap().contains("X-Mailer: tool/2.0\r\n"));
    }

    #[test]
    fn test_write_with_mailer_rejects_line_breaks() {
        let mut message = message();
        message.set_body("text").unwrap();

        for mailer in ["tool\r\nBcc: evil@x.example", "tool\nBcc: evil@x.example", "tool\r"] {
            let mut out = Vec::new();
            let err = message.write_to_with_mailer(mailer, &mut out).unwrap_err();
            assert!(matches!(err, Error::InvalidHeader(_)), "{mailer:?}: {err}");
            assert!(out.is_empty());
        }
    }

    #[test]
    fn test_unsupported_encoding() {
        let mut headers = Headers::new();
        headers.set("Content-Type", "text/plain");
        headers.set("Content-Transfer-Encoding", "7bit");
        let part = Part {
            headers,
            data: b"x".to_vec(),
        };

        let mut out = Vec::new();
        assert!(matches!(
            part.write_data(&mut out),
            Err(Error::UnsupportedEncoding(ref e)) if e == "7bit"
        ));
    }

    #[test]
    fn test_unsupported_encoding_reports_declared_value() {
        for declared in ["x-uuencode", "8bit", "binary"] {
            let mut headers = Headers::new();
            headers.set("Content-Type", "application/octet-stream");
            headers.set("Content-Transfer-Encoding", declared);
            let part = Part {
                headers,
                data: vec![1, 2, 3],
            };

            let err = part.write_data(&mut Vec::new()).unwrap_err();
            assert!(
                matches!(err, Error::UnsupportedEncoding(ref e) if e == declared),
                "{declared}: {err}"
            );
        }
    }

    #[test]
    fn test_write_surfaces_sink_errors() {
        struct FailingSink;

        impl Write for FailingSink {
            fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::other("disk full"))
            }

            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let mut message = message();
        message.set_body("text").unwrap();
        assert!(matches!(message.write_to(FailingSink), Err(Error::Io(_))));
    }

    #[test]
    fn test_message_is_reusable() {
        let mut message = message();
        message.set_body("text").unwrap();

        assert_eq!(message.to_bytes().unwrap(), message.to_bytes().unwrap());
        assert!(message.has_body());
    }

    #[test]
    fn test_base_name() {
        assert_eq!(base_name("a/b/c.txt"), Some("c.txt"));
        assert_eq!(base_name("c.txt"), Some("c.txt"));
        assert_eq!(base_name("dir/"), Some("dir"));
        assert_eq!(base_name("//"), None);
        assert_eq!(base_name("a/.."), None);
    }

    proptest! {
        #[test]
        fn prop_attach_then_empty_removes(name in "[a-z]{1,10}\\.(txt|bin|png)", data in proptest::collection::vec(any::<u8>(), 1..64)) {
            let mut message = message();
            message.attach(&name, data).unwrap();
            prop_assert!(message.has(&name));

            message.attach(&name, Vec::new()).unwrap();
            prop_assert!(!message.has(&name));
            message.attach(&name, Vec::new()).unwrap();
            prop_assert!(!message.has(&name));
        }
    }
}
