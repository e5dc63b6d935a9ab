//! Content type and transfer encoding inference.
//!
//! The content type comes from the file extension when it is known, and
//! from the leading bytes of the payload otherwise. Sniffing follows the
//! WHATWG MIME sniffing table: markup, document and BOM signatures first,
//! then image, media, font and archive magic numbers, and finally a
//! text-versus-binary check over control bytes.

use crate::content_type::ContentType;
use crate::message::TransferEncoding;

/// Number of leading bytes considered when sniffing.
const SNIFF_LENGTH: usize = 512;

/// Result of classifying a payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Inferred content type.
    pub content_type: ContentType,
    /// Transfer encoding the serializer applies to the payload.
    pub encoding: TransferEncoding,
}

/// Classifies a payload by file name and content.
///
/// Text types get `charset=utf-8` unless the signature names another
/// charset, and are sent as quoted-printable. Everything else is base64.
#[must_use]
pub fn classify(filename: Option<&str>, data: &[u8]) -> Classification {
    let content_type = filename
        .and_then(type_by_extension)
        .unwrap_or_else(|| sniff(data))
        .with_default_charset();

    let encoding = if content_type.is_text() {
        TransferEncoding::QuotedPrintable
    } else {
        TransferEncoding::Base64
    };

    Classification {
        content_type,
        encoding,
    }
}

/// Looks up a content type by file extension (case-insensitive).
#[must_use]
pub fn type_by_extension(filename: &str) -> Option<ContentType> {
    let (stem, ext) = filename.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }

    mime_guess::from_ext(&ext.to_ascii_lowercase())
        .first()
        .map(|mime| ContentType::new(mime.type_().as_str(), mime.subtype().as_str()))
}

/// Detects a content type from the leading bytes of a payload.
///
/// Always returns a type; unrecognized binary data is
/// `application/octet-stream`.
#[must_use]
pub fn sniff(data: &[u8]) -> ContentType {
    let data = &data[..data.len().min(SNIFF_LENGTH)];
    let first_non_ws = data
        .iter()
        .position(|&b| !is_whitespace(b))
        .unwrap_or(data.len());

    for signature in SIGNATURES {
        if let Some(content_type) = signature.matches(data, first_non_ws) {
            return content_type;
        }
    }

    ContentType::octet_stream()
}

const fn is_whitespace(b: u8) -> bool {
    matches!(b, b'\t' | b'\n' | b'\x0C' | b'\r' | b' ')
}

/// Bytes that mark a payload as binary rather than text.
const fn is_binary_byte(b: u8) -> bool {
    matches!(b, 0x00..=0x08 | 0x0B | 0x0E..=0x1A | 0x1C..=0x1F)
}

enum Signature {
    /// Case-insensitive HTML tag after leading whitespace, followed by a
    /// space or `>`.
    Html(&'static [u8]),
    /// Exact prefix.
    Exact(&'static [u8], &'static str),
    /// Prefix compared through a mask, optionally after leading whitespace.
    Masked {
        mask: &'static [u8],
        pattern: &'static [u8],
        skip_ws: bool,
        content_type: &'static str,
    },
    /// ISO base media file with an `mp4` brand.
    Mp4,
    /// Anything without binary bytes.
    Text,
}

const SIGNATURES: &[Signature] = &[
    Signature::Html(b"<!DOCTYPE HTML"),
    Signature::Html(b"<HTML"),
    Signature::Html(b"<HEAD"),
    Signature::Html(b"<SCRIPT"),
    Signature::Html(b"<IFRAME"),
    Signature::Html(b"<H1"),
    Signature::Html(b"<DIV"),
    Signature::Html(b"<FONT"),
    Signature::Html(b"<TABLE"),
    Signature::Html(b"<A"),
    Signature::Html(b"<STYLE"),
    Signature::Html(b"<TITLE"),
    Signature::Html(b"<B"),
    Signature::Html(b"<BODY"),
    Signature::Html(b"<BR"),
    Signature::Html(b"<P"),
    Signature::Html(b"<!--"),
    Signature::Masked {
        mask: b"\xFF\xFF\xFF\xFF\xFF",
        pattern: b"<?xml",
        skip_ws: true,
        content_type: "text/xml; charset=utf-8",
    },
    Signature::Exact(b"%PDF-", "application/pdf"),
    Signature::Exact(b"%!PS-Adobe-", "application/postscript"),
    // Byte order marks.
    Signature::Exact(b"\xFE\xFF", "text/plain; charset=utf-16be"),
    Signature::Exact(b"\xFF\xFE", "text/plain; charset=utf-16le"),
    Signature::Exact(b"\xEF\xBB\xBF", "text/plain; charset=utf-8"),
    // Images.
    Signature::Exact(b"\x00\x00\x01\x00", "image/x-icon"),
    Signature::Exact(b"\x00\x00\x02\x00", "image/x-icon"),
    Signature::Exact(b"BM", "image/bmp"),
    Signature::Exact(b"GIF87a", "image/gif"),
    Signature::Exact(b"GIF89a", "image/gif"),
    Signature::Masked {
        mask: b"\xFF\xFF\xFF\xFF\x00\x00\x00\x00\xFF\xFF\xFF\xFF\xFF\xFF",
        pattern: b"RIFF\x00\x00\x00\x00WEBPVP",
        skip_ws: false,
        content_type: "image/webp",
    },
    Signature::Exact(b"\x89PNG\x0D\x0A\x1A\x0A", "image/png"),
    Signature::Exact(b"\xFF\xD8\xFF", "image/jpeg"),
    // Audio and video.
    Signature::Masked {
        mask: b"\xFF\xFF\xFF\xFF\x00\x00\x00\x00\xFF\xFF\xFF\xFF",
        pattern: b"FORM\x00\x00\x00\x00AIFF",
        skip_ws: false,
        content_type: "audio/aiff",
    },
    Signature::Exact(b"ID3", "audio/mpeg"),
    Signature::Exact(b"OggS\x00", "application/ogg"),
    Signature::Exact(b"MThd\x00\x00\x00\x06", "audio/midi"),
    Signature::Masked {
        mask: b"\xFF\xFF\xFF\xFF\x00\x00\x00\x00\xFF\xFF\xFF\xFF",
        pattern: b"RIFF\x00\x00\x00\x00AVI ",
        skip_ws: false,
        content_type: "video/avi",
    },
    Signature::Masked {
        mask: b"\xFF\xFF\xFF\xFF\x00\x00\x00\x00\xFF\xFF\xFF\xFF",
        pattern: b"RIFF\x00\x00\x00\x00WAVE",
        skip_ws: false,
        content_type: "audio/wave",
    },
    Signature::Mp4,
    Signature::Exact(b"\x1A\x45\xDF\xA3", "video/webm"),
    // Fonts.
    Signature::Exact(b"\x00\x01\x00\x00", "font/ttf"),
    Signature::Exact(b"OTTO", "font/otf"),
    Signature::Exact(b"ttcf", "font/collection"),
    Signature::Exact(b"wOFF", "font/woff"),
    Signature::Exact(b"wOF2", "font/woff2"),
    // Archives.
    Signature::Exact(b"\x1F\x8B\x08", "application/x-gzip"),
    Signature::Exact(b"PK\x03\x04", "application/zip"),
    Signature::Exact(b"Rar!\x1A\x07\x00", "application/x-rar-compressed"),
    Signature::Exact(b"Rar!\x1A\x07\x01\x00", "application/x-rar-compressed"),
    Signature::Exact(b"\x00\x61\x73\x6D", "application/wasm"),
    Signature::Text,
];

impl Signature {
    fn matches(&self, data: &[u8], first_non_ws: usize) -> Option<ContentType> {
        let hit = match self {
            Self::Html(tag) => {
                let rest = &data[first_non_ws..];
                rest.len() > tag.len()
                    && rest[..tag.len()].eq_ignore_ascii_case(tag)
                    && matches!(rest[tag.len()], b' ' | b'>')
            }
            Self::Exact(prefix, _) => data.starts_with(prefix),
            Self::Masked {
                mask,
                pattern,
                skip_ws,
                ..
            } => {
                let data = if *skip_ws { &data[first_non_ws..] } else { data };
                data.len() >= pattern.len()
                    && data
                        .iter()
                        .zip(mask.iter().zip(pattern.iter()))
                        .all(|(b, (m, p))| b & m == *p)
            }
            Self::Mp4 => is_mp4(data),
            Self::Text => !data.iter().copied().any(is_binary_byte),
        };

        hit.then(|| match self {
            Self::Html(_) => ContentType::text_html(),
            Self::Exact(_, content_type) | Self::Masked { content_type, .. } => {
                parse_static(content_type)
            }
            Self::Mp4 => ContentType::new("video", "mp4"),
            Self::Text => ContentType::text_plain(),
        })
    }
}

/// Splits a table entry such as `text/plain; charset=utf-16le`.
fn parse_static(content_type: &str) -> ContentType {
    let (essence, params) = content_type
        .split_once(';')
        .unwrap_or((content_type, ""));
    let (main, sub) = essence.split_once('/').unwrap_or((essence, ""));

    params
        .split(';')
        .filter_map(|param| param.trim().split_once('='))
        .fold(ContentType::new(main, sub), |ct, (key, value)| {
            ct.with_parameter(key, value)
        })
}

/// Matches an `ftyp` box whose major or compatible brands include `mp4`.
fn is_mp4(data: &[u8]) -> bool {
    if data.len() < 12 {
        return false;
    }
    let box_size = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as usize;
    if data.len() < box_size || box_size % 4 != 0 || &data[4..8] != b"ftyp" {
        return false;
    }

    (8..box_size)
        .step_by(4)
        .filter(|&st| st != 12) // minor version, not a brand
        .any(|st| data.get(st..st + 3) == Some(b"mp4".as_slice()))
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

    fn sniffed(data: &[u8]) -> String {
        sniff(data).to_string()
    }

    #[test]
    fn test_sniff_html() {
        assert_eq!(sniffed(b"<html><p>hi</p></html>"), "text/html; charset=utf-8");
        assert_eq!(sniffed(b"\n  <!doctype html>\n"), "text/html; charset=utf-8");
        assert_eq!(sniffed(b"<p>html body</p>"), "text/html; charset=utf-8");
        // Tag must be terminated
        assert_eq!(sniffed(b"<pre>x</pre>"), "text/plain; charset=utf-8");
    }

    #[test]
    fn test_sniff_xml_and_documents() {
        assert_eq!(sniffed(b" <?xml version=\"1.0\"?>"), "text/xml; charset=utf-8");
        assert_eq!(sniffed(b"%PDF-1.7\n"), "application/pdf");
        assert_eq!(sniffed(b"%!PS-Adobe-3.0"), "application/postscript");
    }

    #[test]
    fn test_sniff_bom() {
        assert_eq!(sniffed(b"\xFF\xFEh\x00i\x00"), "text/plain; charset=utf-16le");
        assert_eq!(sniffed(b"\xFE\xFF\x00h"), "text/plain; charset=utf-16be");
        assert_eq!(sniffed(b"\xEF\xBB\xBFhi"), "text/plain; charset=utf-8");
    }

    #[test]
    fn test_sniff_images_and_archives() {
        assert_eq!(sniffed(b"\x89PNG\x0D\x0A\x1A\x0A\x00\x00"), "image/png");
        assert_eq!(sniffed(b"GIF89a...."), "image/gif");
        assert_eq!(sniffed(b"\xFF\xD8\xFF\xE0"), "image/jpeg");
        assert_eq!(sniffed(b"RIFF\x10\x00\x00\x00WEBPVP8 "), "image/webp");
        assert_eq!(sniffed(b"PK\x03\x04rest"), "application/zip");
        assert_eq!(sniffed(b"\x1F\x8B\x08\x00"), "application/x-gzip");
    }

    #[test]
    fn test_sniff_mp4() {
        let mut data = vec![0x00, 0x00, 0x00, 0x1C];
        data.extend_from_slice(b"ftypisom\x00\x00\x02\x00isomiso2mp41");
        assert_eq!(sniffed(&data), "video/mp4");
    }

    #[test]
    fn test_sniff_text_and_binary() {
        assert_eq!(
            sniffed(b"Message body\nThis is a text text message."),
            "text/plain; charset=utf-8"
        );
        assert_eq!(sniffed("Привет".as_bytes()), "text/plain; charset=utf-8");
        assert_eq!(sniffed(&[0, 1, 2]), "application/octet-stream");
        assert_eq!(sniffed(&[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10]), "application/octet-stream");
    }

    #[test]
    fn test_sniff_only_reads_prefix() {
        let mut data = vec![b'a'; SNIFF_LENGTH];
        data.push(0x00);
        assert_eq!(sniffed(&data), "text/plain; charset=utf-8");
    }

    #[test]
    fn test_type_by_extension() {
        assert_eq!(type_by_extension("index.HTML").unwrap().essence(), "text/html");
        assert_eq!(type_by_extension("notes.txt").unwrap().essence(), "text/plain");
        assert_eq!(type_by_extension("photo.png").unwrap().essence(), "image/png");
        assert!(type_by_extension("file.zzq").is_none());
        assert!(type_by_extension("README").is_none());
        assert!(type_by_extension(".bashrc").is_none());
    }

    #[test]
    fn test_classify_extension_wins() {
        // Binary content with a text extension is still text.
        let class = classify(Some("data.txt"), &[0, 1, 2]);
        assert_eq!(class.content_type.to_string(), "text/plain; charset=utf-8");
        assert_eq!(class.encoding, TransferEncoding::QuotedPrintable);

        // Plain text content with an image extension is still an image.
        let class = classify(Some("logo.png"), b"not really a png");
        assert_eq!(class.content_type.to_string(), "image/png");
        assert_eq!(class.encoding, TransferEncoding::Base64);
    }

    #[test]
    fn test_classify_falls_back_to_sniffing() {
        let class = classify(Some("body"), b"<html><h2>Body</h2></html>");
        assert_eq!(class.content_type.to_string(), "text/html; charset=utf-8");
        assert_eq!(class.encoding, TransferEncoding::QuotedPrintable);

        let class = classify(None, &[0, 1, 2, 3]);
        assert_eq!(class.content_type, ContentType::octet_stream());
        assert_eq!(class.encoding, TransferEncoding::Base64);
    }

    #[test]
    fn test_classify_does_not_touch_input() {
        let data = b"line one\nline two".to_vec();
        let copy = data.clone();
        let _ = classify(Some("a.txt"), &data);
        assert_eq!(data, copy);
    }
}
