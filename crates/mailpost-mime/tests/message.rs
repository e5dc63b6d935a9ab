//! Integration tests for message assembly.
//!
//! These tests build complete messages through the public API and check the
//! serialized output a mail service would receive.

#![allow(clippy::unwrap_used)]

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use mailpost_mime::{Error, MAILER, Message};

const TEXT: &[u8] = b"Message body\nThis is a text text message.";
const HTML: &[u8] = b"<html>\n<h2>Message body</h2>\n<p>This is a html text message.</p>\n</html>";
const BIN: &[u8] = &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10];
const NONE: &[&str] = &[];

/// One serialized part: its header lines and encoded payload.
struct RawPart<'a> {
    headers: Vec<&'a str>,
    payload: &'a str,
}

impl RawPart<'_> {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter().find_map(|line| {
            let (key, value) = line.split_once(": ")?;
            key.eq_ignore_ascii_case(name).then_some(value)
        })
    }
}

/// Joins folded header lines back into one line per header.
fn unfold(head: &str) -> Vec<String> {
    head.replace("\r\n ", " ")
        .split("\r\n")
        .map(str::to_string)
        .collect()
}

/// Splits a serialized multipart message into unfolded top-level headers
/// and parts.
fn split_multipart(raw: &str) -> (Vec<String>, Vec<RawPart<'_>>) {
    let (head, body) = raw.split_once("\r\n\r\n").unwrap();
    let headers = unfold(head);
    let boundary = headers
        .iter()
        .find_map(|line| line.strip_prefix("Content-Type: multipart/mixed; boundary="))
        .unwrap()
        .to_string();

    let closing = format!("\r\n--{boundary}--\r\n");
    let body = body
        .strip_prefix(&format!("--{boundary}\r\n"))
        .unwrap()
        .strip_suffix(&closing)
        .unwrap();

    let parts = body
        .split(&format!("\r\n--{boundary}\r\n"))
        .map(|part| {
            let (head, payload) = part.split_once("\r\n\r\n").unwrap();
            RawPart {
                headers: head.split("\r\n").collect(),
                payload,
            }
        })
        .collect();

    (headers, parts)
}

#[test]
fn test_full_message() {
    let mut message = Message::new(
        "Subject",
        "Dmitrys <dmitrys@xyzrd.com>",
        &[
            "I am<sedykh@gmail.com>",
            "I am too <dmitrys@xyzrd.com>",
            "d3@yandex.ru",
        ],
        &["Дмитрий Седых <d3@yandex.ru>"],
    )
    .unwrap();

    message.set_body(HTML).unwrap();
    message.attach("test_file.html", HTML).unwrap();
    message.attach("test_file.txt", TEXT).unwrap();
    message.attach("test_file.txt", Vec::new()).unwrap();
    assert!(!message.has("test_file.txt"));
    message.attach("test_file.bin", BIN).unwrap();

    let raw = String::from_utf8(message.to_bytes().unwrap()).unwrap();
    let (headers, parts) = split_multipart(&raw);

    let has = |line: &str| headers.iter().any(|header| header == line);
    assert!(has("MIME-Version: 1.0"));
    assert!(has(&format!("X-Mailer: {MAILER}")));
    assert!(has("From: \"Dmitrys\" <dmitrys@xyzrd.com>"));
    assert!(has("Reply-To: \"Dmitrys\" <dmitrys@xyzrd.com>"));
    assert!(has(
        "To: \"I am\" <sedykh@gmail.com>, \"I am too\" <dmitrys@xyzrd.com>, <d3@yandex.ru>"
    ));
    assert!(
        headers
            .iter()
            .any(|line| line.starts_with("Cc: =?utf-8?q?") && line.ends_with(" <d3@yandex.ru>"))
    );
    assert!(has("Subject: Subject"));

    // Body first, then attachments by name.
    assert_eq!(parts.len(), 3);
    assert_eq!(parts[0].header("Content-Disposition"), None);
    assert_eq!(parts[0].header("Content-Type"), Some("text/html; charset=utf-8"));
    assert_eq!(
        parts[0].payload,
        "<html>\r\n<h2>Message body</h2>\r\n<p>This is a html text message.</p>\r\n</html>"
    );

    assert_eq!(
        parts[1].header("Content-Disposition"),
        Some("attachment; filename=test_file.bin")
    );
    assert_eq!(parts[1].header("Content-Transfer-Encoding"), Some("base64"));
    assert_eq!(STANDARD.decode(parts[1].payload).unwrap(), BIN);

    assert_eq!(
        parts[2].header("Content-Disposition"),
        Some("attachment; filename=test_file.html")
    );
    assert_eq!(
        parts[2].header("Content-Transfer-Encoding"),
        Some("quoted-printable")
    );
}

#[test]
fn test_bad_messages() {
    assert!(matches!(
        Message::new("", "me", &["bad"], NONE),
        Err(Error::InvalidAddress { .. })
    ));
    assert!(matches!(
        Message::new("", "me", NONE, &["bad"]),
        Err(Error::InvalidAddress { .. })
    ));
    assert!(matches!(
        Message::new("", "bad", NONE, NONE),
        Err(Error::InvalidAddress { .. })
    ));
    assert!(matches!(
        Message::new("", "me", NONE, NONE),
        Err(Error::NoRecipient)
    ));

    let mut message = Message::new("", "me", &["d3@ya.ru"], NONE).unwrap();
    assert!(matches!(
        message.set_body(BIN),
        Err(Error::UnsupportedBodyType(_))
    ));
}

#[test]
fn test_bad_attachments() {
    let mut message = Message::new("", "", &["d3@yandex.ru"], NONE).unwrap();

    assert!(matches!(message.attach("", HTML), Err(Error::InvalidName(_))));
    assert!(matches!(
        message.write_to(std::io::sink()),
        Err(Error::EmptyMessage)
    ));

    message.attach("~/test/file.name", HTML).unwrap();
    message.write_to(std::io::sink()).unwrap();

    assert!(matches!(message.attach("..", TEXT), Err(Error::InvalidName(_))));
    message.attach("~/test/file.name", TEXT).unwrap();
    message.attach("~/test/file.name", BIN).unwrap();
    assert_eq!(message.attachment_names().collect::<Vec<_>>(), vec!["file.name"]);
}

#[test]
fn test_simple_message() {
    let mut message = Message::new("Subject", "", &["Дмитрий Седых <d3@yandex.ru>"], NONE).unwrap();
    message.set_body(HTML).unwrap();

    let raw = String::from_utf8(message.to_bytes().unwrap()).unwrap();
    assert!(!raw.contains("multipart"));
    assert!(!raw.contains("From:"));
    assert!(raw.contains("Content-Type: text/html; charset=utf-8\r\n"));
    assert!(raw.contains("Content-Transfer-Encoding: quoted-printable\r\n"));
    assert!(raw.ends_with("\r\n</html>"));
}

#[test]
fn test_plain_text_body() {
    let mut message = Message::new("", "", &["a@b.com"], NONE).unwrap();
    message.set_body("Привет, мир").unwrap();

    let raw = String::from_utf8(message.to_bytes().unwrap()).unwrap();
    assert!(raw.contains("Content-Type: text/plain; charset=utf-8\r\n"));
    assert!(raw.ends_with("\r\n\r\n=D0=9F=D1=80=D0=B8=D0=B2=D0=B5=D1=82, =D0=BC=D0=B8=D1=80"));
}

#[test]
fn test_long_recipient_lists_are_folded() {
    let recipients: Vec<String> = (0..60).map(|i| format!("user{i}@example.com")).collect();
    let mut message = Message::new("", "", &recipients, &[] as &[String]).unwrap();
    message.set_body("text").unwrap();

    let raw = String::from_utf8(message.to_bytes().unwrap()).unwrap();
    let (head, _) = raw.split_once("\r\n\r\n").unwrap();
    for line in head.split("\r\n") {
        assert!(line.len() <= 78, "line too long: {line:?}");
    }

    let to = unfold(head)
        .into_iter()
        .find_map(|line| line.strip_prefix("To: ").map(str::to_string))
        .unwrap();
    assert_eq!(to.split(", ").count(), 60);
    assert!(to.starts_with("<user0@example.com>, <user1@example.com>"));
}

#[test]
fn test_serialization_lines_are_bounded() {
    let mut message = Message::new("", "", &["a@b.com"], NONE).unwrap();
    message.set_body("word ".repeat(100)).unwrap();
    message.attach("data.bin", vec![0xAB; 1000]).unwrap();

    let raw = String::from_utf8(message.to_bytes().unwrap()).unwrap();
    let (_, body) = raw.split_once("\r\n\r\n").unwrap();
    for line in body.split("\r\n").filter(|line| !line.contains(": ")) {
        assert!(line.len() <= 76, "line too long: {line:?}");
        assert!(!line.contains('\n') && !line.contains('\r'));
    }
}
