//! MIME header handling.

use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::fmt::{self, Write as _};
use std::io::Write;

/// Line length after which header values are folded (RFC 5322 section 2.1.1).
const FOLD_WIDTH: usize = 78;

/// Collection of email headers.
///
/// Names are matched case-insensitively and keep the spelling of the last
/// write. Iteration and output follow the lowercase name order, so the same
/// set of headers always renders the same bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    headers: BTreeMap<String, Entry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    name: String,
    values: Vec<String>,
}

impl Headers {
    /// Creates a new empty header collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a header value.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        self.headers
            .entry(name.to_lowercase())
            .and_modify(|entry| entry.values.push(value.clone()))
            .or_insert_with(|| Entry {
                name,
                values: vec![value],
            });
    }

    /// Sets a header value, replacing any existing values.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.headers.insert(
            name.to_lowercase(),
            Entry {
                name,
                values: vec![value.into()],
            },
        );
    }

    /// Gets the first value for a header.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_lowercase())
            .and_then(|entry| entry.values.first().map(String::as_str))
    }

    /// Gets all values for a header.
    #[must_use]
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.headers
            .get(&name.to_lowercase())
            .map(|entry| entry.values.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Returns true if the header is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.headers.contains_key(&name.to_lowercase())
    }

    /// Removes all values for a header.
    pub fn remove(&mut self, name: &str) {
        self.headers.remove(&name.to_lowercase());
    }

    /// Copies every header from `other`, replacing headers with the same name.
    pub fn merge(&mut self, other: &Self) {
        for (key, entry) in &other.headers {
            self.headers.insert(key.clone(), entry.clone());
        }
    }

    /// Number of distinct header names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.headers.len()
    }

    /// Returns true if no headers are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Returns an iterator over all headers in output order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.values().flat_map(|entry| {
            entry
                .values
                .iter()
                .map(move |v| (entry.name.as_str(), v.as_str()))
        })
    }

    /// Writes the header block followed by the blank separator line.
    ///
    /// # Errors
    ///
    /// Returns an error if the sink fails.
    pub fn write_to<W: Write + ?Sized>(&self, w: &mut W) -> Result<()> {
        write!(w, "{self}\r\n")?;
        Ok(())
    }

    /// Checks that a header can be written without breaking the header block.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is not a field name (RFC 5322 ftext) or
    /// the value contains CR or LF.
    pub fn validate(name: &str, value: &str) -> Result<()> {
        if name.is_empty() || !name.bytes().all(|b| b.is_ascii_graphic() && b != b':') {
            return Err(Error::InvalidHeader(format!("bad header name {name:?}")));
        }
        if value.contains(['\r', '\n']) {
            return Err(Error::InvalidHeader(format!(
                "line break in value of {name}"
            )));
        }
        Ok(())
    }
}

/// Writes `name: value` plus CRLF, folding before a space whenever the line
/// would pass [`FOLD_WIDTH`]. Runs without spaces are never split.
fn write_folded(f: &mut impl fmt::Write, name: &str, value: &str) -> fmt::Result {
    f.write_str(name)?;
    f.write_char(':')?;
    let mut width = name.len() + 1;
    for (index, word) in value.split(' ').enumerate() {
        if index > 0 && !word.is_empty() && width + 1 + word.len() > FOLD_WIDTH {
            f.write_str("\r\n")?;
            width = 0;
        }
        f.write_char(' ')?;
        f.write_str(word)?;
        width += 1 + word.len();
    }
    f.write_str("\r\n")
}

impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in self.iter() {
            write_folded(f, name, value)?;
        }
        Ok(())
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
    use proptest::prelude::*;

    #[test]
    fn test_headers_new() {
        let headers = Headers::new();
        assert!(headers.is_empty());
    }

    #[test]
    fn test_headers_add_get() {
        let mut headers = Headers::new();
        headers.add("Content-Type", "text/plain");
        assert_eq!(headers.get("Content-Type"), Some("text/plain"));
        assert_eq!(headers.get("content-type"), Some("text/plain")); // Case insensitive
    }

    #[test]
    fn test_headers_set() {
        let mut headers = Headers::new();
        headers.add("To", "alice@example.com");
        headers.add("to", "bob@example.com");
        assert_eq!(headers.get_all("To").len(), 2);

        headers.set("TO", "charlie@example.com");
        assert_eq!(headers.get_all("To"), vec!["charlie@example.com"]);
        assert_eq!(headers.to_string(), "TO: charlie@example.com\r\n");
    }

    #[test]
    fn test_headers_remove() {
        let mut headers = Headers::new();
        headers.add("Subject", "Test");
        assert!(headers.contains("subject"));

        headers.remove("SUBJECT");
        assert!(headers.get("Subject").is_none());
    }

    #[test]
    fn test_headers_merge_overwrites() {
        let mut base = Headers::new();
        base.set("MIME-Version", "1.0");
        base.set("X-Mailer", "default");

        let mut own = Headers::new();
        own.set("X-Mailer", "custom");
        own.set("Subject", "Hi");

        base.merge(&own);
        assert_eq!(base.len(), 3);
        assert_eq!(base.get("x-mailer"), Some("custom"));
    }

    #[test]
    fn test_headers_display_sorted() {
        let mut headers = Headers::new();
        headers.set("To", "<recipient@example.com>");
        headers.set("MIME-Version", "1.0");
        headers.set("From", "<sender@example.com>");
        headers.set("Content-Type", "text/plain");

        assert_eq!(
            headers.to_string(),
            "Content-Type: text/plain\r\n\
             From: <sender@example.com>\r\n\
             MIME-Version: 1.0\r\n\
             To: <recipient@example.com>\r\n"
        );
    }

    #[test]
    fn test_headers_write_to_adds_separator() {
        let mut headers = Headers::new();
        headers.set("Subject", "Test");

        let mut out = Vec::new();
        headers.write_to(&mut out).unwrap();
        assert_eq!(out, b"Subject: Test\r\n\r\n");
    }

    #[test]
    fn test_headers_validate() {
        assert!(Headers::validate("X-Custom", "value").is_ok());
        assert!(Headers::validate("Bad Name", "value").is_err());
        assert!(Headers::validate("", "value").is_err());
        assert!(Headers::validate("X-Custom", "a\r\nBcc: x@y.z").is_err());
    }

    #[test]
    fn test_headers_fold_long_values() {
        let recipients: Vec<String> = (0..40).map(|i| format!("<user{i}@example.com>")).collect();
        let value = recipients.join(", ");

        let mut headers = Headers::new();
        headers.set("To", value.clone());
        let out = headers.to_string();

        assert!(out.ends_with("\r\n"));
        for line in out.trim_end_matches("\r\n").split("\r\n") {
            assert!(line.len() <= FOLD_WIDTH, "line too long: {line:?}");
        }
        // Folded lines continue with whitespace, and unfolding restores the value.
        let unfolded = out.trim_end_matches("\r\n").replace("\r\n", "");
        assert_eq!(unfolded, format!("To: {value}"));
        assert_eq!(headers.get("to"), Some(value.as_str()));
    }

    #[test]
    fn test_headers_short_values_are_not_folded() {
        let mut headers = Headers::new();
        headers.set("Subject", "a  b ");
        assert_eq!(headers.to_string(), "Subject: a  b \r\n");
    }

    proptest! {
        #[test]
        fn prop_folding_only_inserts_line_breaks(words in proptest::collection::vec("[!-~]{1,30}", 0..40)) {
            let value = words.join(" ");
            let mut headers = Headers::new();
            headers.set("X-Long", value.clone());

            let out = headers.to_string();
            let body = out.strip_suffix("\r\n").unwrap();
            for line in body.split("\r\n").skip(1) {
                prop_assert!(line.starts_with(' '));
            }
            prop_assert_eq!(body.replace("\r\n", ""), format!("X-Long: {value}"));
        }

        #[test]
        fn prop_insertion_order_does_not_change_output(
            mut entries in proptest::collection::btree_map("[A-Z][a-z]{0,8}(-[A-Z][a-z]{0,8})?", "[ -~]{0,20}", 0..8)
                .prop_map(|m| m.into_iter().collect::<Vec<_>>())
        ) {
            let mut forward = Headers::new();
            for (name, value) in &entries {
                forward.set(name.clone(), value.clone());
            }

            entries.reverse();
            let mut backward = Headers::new();
            for (name, value) in &entries {
                backward.set(name.clone(), value.clone());
            }

            prop_assert_eq!(forward.to_string(), backward.to_string());
        }
    }
}
