//! Sender and recipient address parsing.
//!
//! Accepts the usual header forms:
//!
//! ```text
//! test@example.com
//! <test@example.com>
//! Test User <test@example.com>
//! "User, Test" <test@example.com>, other@example.com
//! ```
//!
//! Parsed mailboxes are rendered back in a normalized form: the address is
//! always in angle brackets, printable ASCII display names are quoted, and
//! other display names are RFC 2047 encoded.

use crate::encoding::{WordEncoding, encode_rfc2047};
use crate::error::{Error, Result};
use std::fmt;

/// Characters that may not appear inside an RFC 2047 `Q` word of a phrase.
const PHRASE_SPECIALS: &str = "\"#$%&'(),.:;<>@[\\]^`{|}~";

/// Mailbox (optional display name + address).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mailbox {
    /// Display name (optional).
    pub name: Option<String>,
    /// Local part, unquoted.
    pub local: String,
    /// Domain, or a bracketed domain literal.
    pub domain: String,
}

impl Mailbox {
    /// Parses a single mailbox.
    ///
    /// # Errors
    ///
    /// Returns the parser's reason if the input is not exactly one mailbox.
    pub fn parse(input: &str) -> std::result::Result<Self, String> {
        let mut parser = Parser::new(input);
        let mailbox = parser.mailbox()?;
        parser.skip_cfws()?;
        if parser.is_done() {
            Ok(mailbox)
        } else {
            Err(format!("expected single address in {input:?}"))
        }
    }

    /// Returns the bare `local@domain` address.
    #[must_use]
    pub fn address(&self) -> String {
        let local = if is_dot_atom(&self.local) {
            self.local.clone()
        } else {
            quote(&self.local)
        };
        format!("{local}@{}", self.domain)
    }
}

impl fmt::Display for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let address = self.address();
        let Some(name) = self.name.as_deref().filter(|n| !n.is_empty()) else {
            return write!(f, "<{address}>");
        };

        if name.chars().all(|c| c == ' ' || c == '\t' || c.is_ascii_graphic()) {
            write!(f, "{} <{address}>", quote(name))
        } else if name.contains(|c: char| PHRASE_SPECIALS.contains(c)) {
            write!(f, "{} <{address}>", encode_rfc2047(name, WordEncoding::B))
        } else {
            write!(f, "{} <{address}>", encode_rfc2047(name, WordEncoding::Q))
        }
    }
}

/// Ordered list of validated mailboxes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressList(Vec<Mailbox>);

/// Outcome of parsing an address field.
///
/// Keeps "nothing supplied" apart from "something supplied but malformed"
/// without inspecting error text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedAddresses {
    /// Only blank input.
    Absent,
    /// At least one mailbox, all valid.
    Valid(AddressList),
    /// Some entry failed to parse.
    Invalid(String),
}

impl ParsedAddresses {
    /// Converts into a result, attributing failures to `field`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] for the `Invalid` state.
    pub fn into_result(self, field: &'static str) -> Result<Option<AddressList>> {
        match self {
            Self::Absent => Ok(None),
            Self::Valid(list) => Ok(Some(list)),
            Self::Invalid(reason) => Err(Error::invalid_address(field, reason)),
        }
    }
}

impl AddressList {
    /// Parses raw entries, each holding one or more comma-separated
    /// mailboxes. Blank entries are skipped; order is preserved.
    pub fn parse<S: AsRef<str>>(entries: &[S]) -> ParsedAddresses {
        let mut mailboxes = Vec::new();

        for entry in entries {
            for item in split_top_level(entry.as_ref()) {
                if item.trim().is_empty() {
                    continue;
                }
                match Mailbox::parse(item) {
                    Ok(mailbox) => mailboxes.push(mailbox),
                    Err(reason) => return ParsedAddresses::Invalid(reason),
                }
            }
        }

        if mailboxes.is_empty() {
            ParsedAddresses::Absent
        } else {
            ParsedAddresses::Valid(Self(mailboxes))
        }
    }

    /// Returns the mailboxes in input order.
    #[must_use]
    pub fn mailboxes(&self) -> &[Mailbox] {
        &self.0
    }

    /// Number of mailboxes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for AddressList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, mailbox) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{mailbox}")?;
        }
        Ok(())
    }
}

/// Splits on commas outside quoted strings, comments and angle brackets.
fn split_top_level(input: &str) -> Vec<&str> {
    let mut items = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    let mut escaped = false;
    let mut comment_depth = 0usize;
    let mut in_angle = false;

    for (index, ch) in input.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_quotes || comment_depth > 0 => escaped = true,
            '"' if comment_depth == 0 => in_quotes = !in_quotes,
            '(' if !in_quotes => comment_depth += 1,
            ')' if !in_quotes => comment_depth = comment_depth.saturating_sub(1),
            '<' if !in_quotes && comment_depth == 0 => in_angle = true,
            '>' if !in_quotes && comment_depth == 0 => in_angle = false,
            ',' if !in_quotes && comment_depth == 0 && !in_angle => {
                items.push(&input[start..index]);
                start = index + 1;
            }
            _ => {}
        }
    }

    items.push(&input[start..]);
    items
}

/// RFC 5322 atext, extended with UTF-8 (RFC 6532).
fn is_atext(c: char) -> bool {
    if c.is_ascii() {
        c.is_ascii_graphic() && !"()<>[]:;@\\,.\"".contains(c)
    } else {
        !c.is_control() && !c.is_whitespace()
    }
}

fn is_dot_atom(s: &str) -> bool {
    !s.is_empty() && s.split('.').all(|atom| !atom.is_empty() && atom.chars().all(is_atext))
}

fn quote(s: &str) -> String {
    let mut quoted = String::with_capacity(s.len() + 2);
    quoted.push('"');
    for c in s.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// Recursive-descent parser over a single mailbox.
struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    const fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn is_done(&self) -> bool {
        self.pos >= self.input.len()
    }

    /// Skips folding whitespace and (nested) comments.
    fn skip_cfws(&mut self) -> std::result::Result<(), String> {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('(') => self.comment()?,
                _ => return Ok(()),
            }
        }
    }

    fn comment(&mut self) -> std::result::Result<(), String> {
        let mut depth = 0usize;
        loop {
            match self.bump() {
                Some('(') => depth += 1,
                Some(')') => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                Some('\\') => {
                    self.bump();
                }
                Some(_) => {}
                None => return Err("unterminated comment".to_string()),
            }
        }
    }

    /// mailbox = name-addr / addr-spec
    fn mailbox(&mut self) -> std::result::Result<Mailbox, String> {
        self.skip_cfws()?;
        if self.is_done() {
            return Err("no address".to_string());
        }

        // Try addr-spec first; fall back to name-addr from the same spot.
        let start = self.pos;
        if let Ok((local, domain)) = self.addr_spec() {
            let end = self.pos;
            self.skip_cfws()?;
            if self.is_done() {
                return Ok(Mailbox {
                    name: None,
                    local,
                    domain,
                });
            }
            self.pos = end;
        }

        self.pos = start;
        let name = self.phrase()?;
        self.skip_cfws()?;
        if !self.eat('<') {
            return Err(format!("missing @ in addr-spec {:?}", self.input.trim()));
        }
        let (local, domain) = self.addr_spec()?;
        if !self.eat('>') {
            return Err("unclosed angle-addr".to_string());
        }

        Ok(Mailbox {
            name: (!name.is_empty()).then_some(name),
            local,
            domain,
        })
    }

    /// Display name: words separated by whitespace, dots tolerated.
    fn phrase(&mut self) -> std::result::Result<String, String> {
        let mut words: Vec<String> = Vec::new();
        loop {
            self.skip_cfws()?;
            match self.peek() {
                Some('"') => words.push(self.quoted_string()?),
                Some(c) if is_atext(c) || c == '.' => {
                    let start = self.pos;
                    while self.peek().is_some_and(|c| is_atext(c) || c == '.') {
                        self.bump();
                    }
                    words.push(self.input[start..self.pos].to_string());
                }
                _ => return Ok(words.join(" ")),
            }
        }
    }

    /// addr-spec = local-part "@" domain
    fn addr_spec(&mut self) -> std::result::Result<(String, String), String> {
        self.skip_cfws()?;
        let local = if self.peek() == Some('"') {
            self.quoted_string()?
        } else {
            self.dot_atom("local part")?
        };
        self.skip_cfws()?;
        if !self.eat('@') {
            return Err(format!("missing @ in addr-spec {:?}", self.input.trim()));
        }
        self.skip_cfws()?;
        let domain = if self.peek() == Some('[') {
            self.domain_literal()?
        } else {
            self.dot_atom("domain")?
        };
        if local.is_empty() {
            return Err("empty local part".to_string());
        }
        Ok((local, domain))
    }

    fn dot_atom(&mut self, what: &str) -> std::result::Result<String, String> {
        let start = self.pos;
        while self.peek().is_some_and(|c| is_atext(c) || c == '.') {
            self.bump();
        }
        let atom = &self.input[start..self.pos];
        if is_dot_atom(atom) {
            Ok(atom.to_string())
        } else if atom.is_empty() {
            Err(format!("missing {what}"))
        } else {
            Err(format!("invalid {what} {atom:?}"))
        }
    }

    fn quoted_string(&mut self) -> std::result::Result<String, String> {
        self.eat('"');
        let mut value = String::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(value),
                Some('\\') => match self.bump() {
                    Some(c) if c != '\r' && c != '\n' => value.push(c),
                    _ => return Err("bad quoted-pair in quoted-string".to_string()),
                },
                Some('\r' | '\n') => return Err("line break in quoted-string".to_string()),
                Some(c) => value.push(c),
                None => return Err("unclosed quoted-string".to_string()),
            }
        }
    }

    fn domain_literal(&mut self) -> std::result::Result<String, String> {
        let start = self.pos;
        self.eat('[');
        loop {
            match self.bump() {
                Some(']') => return Ok(self.input[start..self.pos].to_string()),
                Some('[' | '\\' | '\r' | '\n') | None => {
                    return Err("invalid domain literal".to_string());
                }
                Some(_) => {}
            }
        }
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

    fn render(input: &str) -> String {
        Mailbox::parse(input).unwrap().to_string()
    }

    #[test]
    fn test_bare_address() {
        let mailbox = Mailbox::parse("user@example.com").unwrap();
        assert!(mailbox.name.is_none());
        assert_eq!(mailbox.address(), "user@example.com");
        assert_eq!(mailbox.to_string(), "<user@example.com>");
    }

    #[test]
    fn test_angle_address() {
        assert_eq!(render("<test@example.com>"), "<test@example.com>");
        assert_eq!(render("  <test@example.com>  "), "<test@example.com>");
    }

    #[test]
    fn test_named_address() {
        assert_eq!(render("TestUser <test@example.com>"), "\"TestUser\" <test@example.com>");
        assert_eq!(render("I am<sedykh@gmail.com>"), "\"I am\" <sedykh@gmail.com>");
        assert_eq!(
            render("\"Doe, John\" <john@example.com>"),
            "\"Doe, John\" <john@example.com>"
        );
    }

    #[test]
    fn test_non_ascii_name_is_encoded() {
        assert_eq!(
            render("Дмитрий Седых <d3@yandex.ru>"),
            "=?utf-8?q?=D0=94=D0=BC=D0=B8=D1=82=D1=80=D0=B8=D0=B9_=D0=A1=D0=B5=D0=B4?= \
             =?utf-8?q?=D1=8B=D1=85?= <d3@yandex.ru>"
        );
        let rendered = render("\"Dmitry, Д.\" <d3@yandex.ru>");
        assert!(rendered.starts_with("=?utf-8?b?"));
    }

    #[test]
    fn test_non_ascii_name_with_backslash_is_b_encoded() {
        assert_eq!(render("\"Д\\\\x\" <a@b.com>"), "=?utf-8?b?0JRceA==?= <a@b.com>");
    }

    #[test]
    fn test_quoted_local_part() {
        let mailbox = Mailbox::parse("\"john doe\"@example.com").unwrap();
        assert_eq!(mailbox.local, "john doe");
        assert_eq!(mailbox.address(), "\"john doe\"@example.com");
    }

    #[test]
    fn test_comments_and_literals() {
        assert_eq!(render("user@example.com (work)"), "<user@example.com>");
        assert_eq!(render("user@[192.168.0.1]"), "<user@[192.168.0.1]>");
    }

    #[test]
    fn test_invalid_addresses() {
        for input in [
            "bad",
            "",
            "@example.com",
            "user@",
            "user@@example.com",
            "a..b@example.com",
            ".a@example.com",
            "Name <user@example.com",
            "Name user@example.com",
            "user@example.com extra",
            "\"unclosed@example.com",
            "a@b.com, c@d.com",
        ] {
            assert!(Mailbox::parse(input).is_err(), "accepted {input:?}");
        }
    }

    #[test]
    fn test_list_preserves_order() {
        let ParsedAddresses::Valid(list) = AddressList::parse(&[
            "I am<sedykh@gmail.com>",
            "I am too <dmitrys@xyzrd.com>",
            "d3@yandex.ru",
        ]) else {
            panic!("expected valid list");
        };

        assert_eq!(list.len(), 3);
        assert_eq!(
            list.to_string(),
            "\"I am\" <sedykh@gmail.com>, \"I am too\" <dmitrys@xyzrd.com>, <d3@yandex.ru>"
        );
    }

    #[test]
    fn test_list_entry_with_several_addresses() {
        let ParsedAddresses::Valid(list) =
            AddressList::parse(&["a@b.com, \"Doe, J\" <j@d.com>", "z@y.com"])
        else {
            panic!("expected valid list");
        };
        let addresses: Vec<String> = list.mailboxes().iter().map(Mailbox::address).collect();
        assert_eq!(addresses, vec!["a@b.com", "j@d.com", "z@y.com"]);
    }

    #[test]
    fn test_list_absent() {
        let empty: [&str; 0] = [];
        assert_eq!(AddressList::parse(&empty), ParsedAddresses::Absent);
        assert_eq!(AddressList::parse(&["", "  ", " , "]), ParsedAddresses::Absent);
        assert!(AddressList::parse(&empty).into_result("to").unwrap().is_none());
    }

    #[test]
    fn test_list_rejects_whole_batch() {
        let parsed = AddressList::parse(&["good@example.com", "bad"]);
        assert!(matches!(parsed, ParsedAddresses::Invalid(_)));

        let err = parsed.into_result("cc").unwrap_err();
        assert!(matches!(err, Error::InvalidAddress { field: "cc", .. }));
    }

    proptest! {
        #[test]
        fn prop_valid_lists_keep_count_and_order(
            entries in proptest::collection::vec(
                ("[a-z]{1,8}(\\.[a-z0-9]{1,4})?", "[a-z]{1,8}\\.(com|org|net)", proptest::option::of("[A-Za-z]{1,6}( [A-Za-z]{1,6})?")),
                1..6,
            )
        ) {
            let raw: Vec<String> = entries
                .iter()
                .map(|(local, domain, name)| match name {
                    Some(name) => format!("{name} <{local}@{domain}>"),
                    None => format!("{local}@{domain}"),
                })
                .collect();

            let ParsedAddresses::Valid(list) = AddressList::parse(raw.as_slice()) else {
                return Err(TestCaseError::fail("valid input rejected"));
            };

            prop_assert_eq!(list.len(), entries.len());
            for (mailbox, (local, domain, name)) in list.mailboxes().iter().zip(&entries) {
                prop_assert_eq!(&mailbox.local, local);
                prop_assert_eq!(&mailbox.domain, domain);
                prop_assert_eq!(&mailbox.name, name);
            }
        }
    }
}
