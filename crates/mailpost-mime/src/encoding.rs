//! MIME encoding utilities.
//!
//! Supports Base64 and Quoted-Printable body encoding (RFC 2045) and
//! RFC 2047 encoded words for header values.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::fmt::Write as _;

/// Maximum encoded line length for body encodings, excluding CRLF.
const MAX_LINE_LENGTH: usize = 76;

/// Maximum length of a single RFC 2047 encoded word.
const MAX_ENCODED_WORD_LENGTH: usize = 75;

/// Charset used for every encoded word.
const CHARSET: &str = "utf-8";

/// Encodes data as Base64, wrapped at 76 columns with CRLF line breaks.
#[must_use]
pub fn encode_base64(data: &[u8]) -> String {
    let encoded = STANDARD.encode(data);
    let mut result = String::with_capacity(encoded.len() + encoded.len() / MAX_LINE_LENGTH * 2);

    // Base64 output is pure ASCII, so byte chunks are valid str slices.
    for (index, chunk) in encoded.as_bytes().chunks(MAX_LINE_LENGTH).enumerate() {
        if index > 0 {
            result.push_str("\r\n");
        }
        result.extend(chunk.iter().map(|&b| b as char));
    }

    result
}

/// Encodes bytes using Quoted-Printable encoding (RFC 2045).
///
/// Line breaks (`\n`, `\r\n` or a lone `\r`) become CRLF hard breaks,
/// whitespace before a hard break is escaped, and lines longer than 76
/// characters are split with soft line breaks.
#[must_use]
pub fn encode_quoted_printable(data: &[u8]) -> String {
    let mut result = String::with_capacity(data.len() + data.len() / 8);
    let mut line = String::new();
    let mut bytes = data.iter().copied().peekable();

    while let Some(byte) = bytes.next() {
        if byte == b'\r' || byte == b'\n' {
            if byte == b'\r' && bytes.peek() == Some(&b'\n') {
                bytes.next();
            }
            finish_line(&mut result, &mut line);
            result.push_str("\r\n");
            continue;
        }

        let width = if is_qp_literal(byte) { 1 } else { 3 };
        // Keep one column free for the soft break marker.
        if line.len() + width > MAX_LINE_LENGTH - 1 {
            result.push_str(&line);
            result.push_str("=\r\n");
            line.clear();
        }

        if width == 1 {
            line.push(byte as char);
        } else {
            let _ = write!(line, "={byte:02X}");
        }
    }

    finish_line(&mut result, &mut line);
    result
}

/// Bytes that Quoted-Printable can carry unescaped.
const fn is_qp_literal(byte: u8) -> bool {
    matches!(byte, b'!'..=b'<' | b'>'..=b'~' | b' ' | b'\t')
}

/// Flushes a line, escaping trailing whitespace that transports may strip.
fn finish_line(result: &mut String, line: &mut String) {
    if let Some(last @ (' ' | '\t')) = line.chars().last() {
        line.pop();
        let escaped = if last == ' ' { "=20" } else { "=09" };
        if line.len() + escaped.len() > MAX_LINE_LENGTH {
            result.push_str(line);
            result.push_str("=\r\n");
            line.clear();
        }
        line.push_str(escaped);
    }

    result.push_str(line);
    line.clear();
}

/// Encoding used inside an RFC 2047 encoded word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordEncoding {
    /// `Q` encoding: Quoted-Printable variant with `_` for space.
    Q,
    /// `B` encoding: Base64.
    B,
}

impl WordEncoding {
    const fn marker(self) -> char {
        match self {
            Self::Q => 'q',
            Self::B => 'b',
        }
    }
}

/// Returns true if a header value must be RFC 2047 encoded.
///
/// Anything outside printable ASCII (other than tab) needs encoding,
/// including CR and LF.
#[must_use]
pub fn needs_encoding(text: &str) -> bool {
    text.bytes().any(|b| (b < b' ' || b > b'~') && b != b'\t')
}

/// Encodes a header value using RFC 2047 encoded words if needed.
///
/// Format: `=?utf-8?q?encoded-text?=`. Long values are split into several
/// words separated by a space, never inside a UTF-8 sequence.
#[must_use]
pub fn encode_rfc2047(text: &str, encoding: WordEncoding) -> String {
    if !needs_encoding(text) {
        return text.to_string();
    }

    let prefix = format!("=?{CHARSET}?{}?", encoding.marker());
    let budget = MAX_ENCODED_WORD_LENGTH - prefix.len() - 2;
    let mut words: Vec<String> = Vec::new();
    let mut chunk = String::new();

    for ch in text.chars() {
        let mut buf = [0u8; 4];
        let bytes = ch.encode_utf8(&mut buf).as_bytes();

        let fits = match encoding {
            WordEncoding::Q => chunk.len() + q_width(bytes) <= budget,
            WordEncoding::B => (chunk.len() + bytes.len()).div_ceil(3) * 4 <= budget,
        };
        if !fits && !chunk.is_empty() {
            words.push(finish_word(&prefix, &chunk, encoding));
            chunk.clear();
        }

        match encoding {
            WordEncoding::Q => push_q(&mut chunk, bytes),
            WordEncoding::B => chunk.push(ch),
        }
    }

    if !chunk.is_empty() {
        words.push(finish_word(&prefix, &chunk, encoding));
    }

    words.join(" ")
}

fn q_width(bytes: &[u8]) -> usize {
    bytes
        .iter()
        .map(|&b| if is_q_literal(b) || b == b' ' { 1 } else { 3 })
        .sum()
}

const fn is_q_literal(byte: u8) -> bool {
    byte.is_ascii_graphic() && byte != b'=' && byte != b'?' && byte != b'_'
}

fn push_q(chunk: &mut String, bytes: &[u8]) {
    for &byte in bytes {
        if byte == b' ' {
            chunk.push('_');
        } else if is_q_literal(byte) {
            chunk.push(byte as char);
        } else {
            let _ = write!(chunk, "={byte:02X}");
        }
    }
}

/// Q chunks arrive already encoded, B chunks as raw text.
fn finish_word(prefix: &str, chunk: &str, encoding: WordEncoding) -> String {
    match encoding {
        WordEncoding::Q => format!("{prefix}{chunk}?="),
        WordEncoding::B => format!("{prefix}{}?=", STANDARD.encode(chunk.as_bytes())),
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
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;

    #[test]
    fn test_base64_encode() {
        assert_eq!(encode_base64(b"Hello, World!"), "SGVsbG8sIFdvcmxkIQ==");
        assert_eq!(encode_base64(&[0, 1, 2, 3]), "AAECAw==");
    }

    #[test]
    fn test_base64_wraps_at_76_columns() {
        let data = vec![0xABu8; 200];
        let encoded = encode_base64(&data);

        let lines: Vec<&str> = encoded.split("\r\n").collect();
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|line| line.len() <= 76));
        assert_eq!(STANDARD.decode(lines.concat()).unwrap(), data);
    }

    #[test]
    fn test_quoted_printable_plain_ascii() {
        assert_eq!(encode_quoted_printable(b"Hello, World!"), "Hello, World!");
        assert_eq!(
            encode_quoted_printable(b"<html><p>hi</p></html>"),
            "<html><p>hi</p></html>"
        );
    }

    #[test]
    fn test_quoted_printable_escapes() {
        assert_eq!(encode_quoted_printable(b"a=b"), "a=3Db");
        assert_eq!(encode_quoted_printable("Héllo".as_bytes()), "H=C3=A9llo");
    }

    #[test]
    fn test_quoted_printable_line_breaks() {
        assert_eq!(encode_quoted_printable(b"one\ntwo"), "one\r\ntwo");
        assert_eq!(encode_quoted_printable(b"one\r\ntwo"), "one\r\ntwo");
        assert_eq!(encode_quoted_printable(b"end \nnext"), "end=20\r\nnext");
        assert_eq!(encode_quoted_printable(b"tab\t"), "tab=09");
    }

    #[test]
    fn test_quoted_printable_soft_line_break() {
        let text = "x".repeat(100);
        let encoded = encode_quoted_printable(text.as_bytes());

        let lines: Vec<&str> = encoded.split("\r\n").collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].len(), 76);
        assert!(lines[0].ends_with('='));
        assert_eq!(lines[0].len() - 1 + lines[1].len(), 100);
    }

    #[test]
    fn test_quoted_printable_never_splits_escapes() {
        let text = "é".repeat(40);
        let encoded = encode_quoted_printable(text.as_bytes());

        for line in encoded.split("\r\n") {
            assert!(line.len() <= 76);
            let body = line.strip_suffix('=').unwrap_or(line);
            assert_eq!(body.len() % 3, 0, "escape split across lines: {line}");
        }
    }

    #[test]
    fn test_rfc2047_plain_passthrough() {
        assert_eq!(encode_rfc2047("Subject", WordEncoding::Q), "Subject");
        assert_eq!(encode_rfc2047("a = b?", WordEncoding::Q), "a = b?");
    }

    #[test]
    fn test_rfc2047_q_encoding() {
        assert_eq!(
            encode_rfc2047("Héllo World", WordEncoding::Q),
            "=?utf-8?q?H=C3=A9llo_World?="
        );
    }

    #[test]
    fn test_rfc2047_b_encoding() {
        assert_eq!(
            encode_rfc2047("Héllo", WordEncoding::B),
            "=?utf-8?b?SMOpbGxv?="
        );
    }

    #[test]
    fn test_rfc2047_splits_long_values() {
        let text = "Тестовое сообщение с очень длинной темой письма";
        let encoded = encode_rfc2047(text, WordEncoding::Q);

        let words: Vec<&str> = encoded.split(' ').collect();
        assert!(words.len() > 1);
        for word in words {
            assert!(word.len() <= 75);
            assert!(word.starts_with("=?utf-8?q?"));
            assert!(word.ends_with("?="));
        }
    }

    #[test]
    fn test_rfc2047_control_characters_are_encoded() {
        let encoded = encode_rfc2047("line\r\nBcc: x@y.z", WordEncoding::Q);
        assert!(!encoded.contains('\r'));
        assert!(!encoded.contains('\n'));
    }
}
