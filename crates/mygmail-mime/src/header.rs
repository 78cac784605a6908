//! MIME header handling.

use crate::encoding::{decode_rfc2047, encode_rfc2047};
use crate::error::{Error, Result};
use std::fmt;

/// Preferred longest header line, excluding CRLF (RFC 5322 §2.1.1).
const FOLD_WIDTH: usize = 78;

/// Ordered collection of email headers.
///
/// Lookups are case-insensitive; insertion order is kept for rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    /// Creates a new empty header collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a header value.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries
            .push((name.into().to_lowercase(), value.into()));
    }

    /// Sets a header value, replacing any existing values.
    ///
    /// The header keeps the position of its first occurrence.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into().to_lowercase();
        let value = value.into();
        match self.entries.iter().position(|(n, _)| *n == name) {
            Some(index) => {
                self.entries[index].1 = value;
                let mut seen = false;
                self.entries.retain(|(n, _)| {
                    if *n != name {
                        return true;
                    }
                    let keep = !seen;
                    seen = true;
                    keep
                });
            }
            None => self.entries.push((name, value)),
        }
    }

    /// Gets the first value for a header.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        let name = name.to_lowercase();
        self.entries
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Gets the first value for a header with RFC 2047 words decoded.
    #[must_use]
    pub fn get_decoded(&self, name: &str) -> Option<String> {
        self.get(name)
            .map(|value| Self::decode_value(value).unwrap_or_else(|_| value.to_string()))
    }

    /// Gets all values for a header.
    #[must_use]
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        let name = name.to_lowercase();
        self.entries
            .iter()
            .filter(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Removes all values for a header.
    pub fn remove(&mut self, name: &str) {
        let name = name.to_lowercase();
        self.entries.retain(|(n, _)| *n != name);
    }

    /// Returns the number of header lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no headers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns an iterator over all headers in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Parses headers from raw text.
    ///
    /// Headers are in the format:
    /// ```text
    /// Header-Name: value
    ///  continuation
    /// ```
    ///
    /// Parsing stops at the first empty line.
    ///
    /// # Errors
    ///
    /// Returns an error if a line is neither a header nor a continuation.
    pub fn parse(text: &str) -> Result<Self> {
        let mut headers = Self::new();
        let mut current: Option<(String, String)> = None;

        for line in text.lines() {
            if line.is_empty() {
                break;
            }

            // Unfolding removes only the line break
            if line.starts_with(' ') || line.starts_with('\t') {
                if let Some((_, value)) = current.as_mut() {
                    value.push_str(line);
                }
                continue;
            }

            if let Some((name, value)) = current.take() {
                headers.add(name, value.trim().to_string());
            }

            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| Error::InvalidHeader(line.to_string()))?;
            current = Some((name.trim().to_string(), value.trim_start().to_string()));
        }

        if let Some((name, value)) = current {
            headers.add(name, value.trim().to_string());
        }

        Ok(headers)
    }

    /// Encodes a header value using RFC 2047 if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn encode_value(value: &str) -> Result<String> {
        encode_rfc2047(value, "utf-8")
    }

    /// Encodes the display names of an address list using RFC 2047.
    ///
    /// `Zoë <zoe@example.com>, bob@example.com` becomes
    /// `=?utf-8?B?Wm/Dqw==?= <zoe@example.com>, bob@example.com`. ASCII
    /// values and bare addresses are left as they are.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn encode_addresses(value: &str) -> Result<String> {
        if value.is_ascii() {
            return Ok(value.to_string());
        }
        let addresses = split_addresses(value)
            .into_iter()
            .map(|address| encode_address(address.trim()))
            .collect::<Result<Vec<_>>>()?;
        Ok(addresses.join(", "))
    }

    /// Decodes a header value from RFC 2047 if encoded.
    ///
    /// # Errors
    ///
    /// Returns an error if decoding fails.
    pub fn decode_value(value: &str) -> Result<String> {
        decode_rfc2047(value)
    }
}

/// Splits an address list on commas outside quotes and angle brackets.
fn split_addresses(value: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut in_angle = false;
    let mut start = 0;

    for (index, ch) in value.char_indices() {
        match ch {
            '"' => in_quotes = !in_quotes,
            '<' if !in_quotes => in_angle = true,
            '>' if !in_quotes => in_angle = false,
            ',' if !in_quotes && !in_angle => {
                parts.push(&value[start..index]);
                start = index + 1;
            }
            _ => {}
        }
    }
    parts.push(&value[start..]);
    parts.retain(|part| !part.trim().is_empty());
    parts
}

fn encode_address(address: &str) -> Result<String> {
    match address.rsplit_once('<') {
        Some((name, addr)) if addr.ends_with('>') => {
            let name = name.trim().trim_matches('"');
            if name.is_ascii() {
                return Ok(address.to_string());
            }
            Ok(format!("{} <{addr}", encode_rfc2047(name, "utf-8")?))
        }
        _ => Ok(address.to_string()),
    }
}

/// Writes `Name: value` folded at spaces so lines stay within
/// [`FOLD_WIDTH`] unless a single word is longer. The first word may move
/// to a continuation line of its own.
fn write_folded(f: &mut fmt::Formatter<'_>, name: &str, value: &str) -> fmt::Result {
    write!(f, "{name}:")?;
    let mut line_len = name.len() + 1;

    for word in value.split(' ') {
        if !word.is_empty() && line_len + 1 + word.len() > FOLD_WIDTH {
            f.write_str("\r\n")?;
            line_len = 0;
        }
        write!(f, " {word}")?;
        line_len += 1 + word.len();
    }
    f.write_str("\r\n")
}

/// Canonical capitalization: `content-type` -> `Content-Type`,
/// `mime-version` -> `MIME-Version`, `message-id` -> `Message-ID`.
fn canonical_name(name: &str) -> String {
    name.split('-')
        .map(|part| match part {
            "mime" => "MIME".to_string(),
            "id" => "ID".to_string(),
            _ => {
                let mut chars = part.chars();
                chars.next().map_or_else(String::new, |first| {
                    first.to_uppercase().collect::<String>() + chars.as_str()
                })
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.entries {
            write_folded(f, &canonical_name(name), value)?;
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
        assert_eq!(headers.get("content-type"), Some("text/plain"));
    }

    #[test]
    fn test_headers_set() {
        let mut headers = Headers::new();
        headers.add("To", "alice@example.com");
        headers.add("Subject", "Hi");
        headers.add("To", "bob@example.com");
        assert_eq!(headers.get_all("To").len(), 2);

        headers.set("To", "charlie@example.com");
        assert_eq!(headers.get_all("To"), vec!["charlie@example.com"]);
        assert_eq!(headers.iter().next(), Some(("to", "charlie@example.com")));
        assert_eq!(headers.len(), 2);
    }

    #[test]
    fn test_headers_remove() {
        let mut headers = Headers::new();
        headers.add("Subject", "Test");
        assert!(headers.get("Subject").is_some());

        headers.remove("Subject");
        assert!(headers.get("Subject").is_none());
    }

    #[test]
    fn test_headers_parse() {
        let text = concat!(
            "From: sender@example.com\r\n",
            "To: recipient@example.com\r\n",
            "Subject: Test Message\r\n",
            "Content-Type: text/plain;\r\n",
            " charset=utf-8\r\n",
            "\r\n",
            "Body: not a header\r\n"
        );

        let headers = Headers::parse(text).unwrap();
        assert_eq!(headers.get("From"), Some("sender@example.com"));
        assert_eq!(headers.get("To"), Some("recipient@example.com"));
        assert_eq!(headers.get("Subject"), Some("Test Message"));
        assert_eq!(
            headers.get("Content-Type"),
            Some("text/plain; charset=utf-8")
        );
        assert!(headers.get("Body").is_none());
    }

    #[test]
    fn test_headers_parse_rejects_garbage() {
        assert!(matches!(
            Headers::parse("no colon here\r\n"),
            Err(Error::InvalidHeader(_))
        ));
    }

    #[test]
    fn test_headers_display_keeps_order() {
        let mut headers = Headers::new();
        headers.add("mime-version", "1.0");
        headers.add("to", "recipient@example.com");
        headers.add("from", "sender@example.com");

        assert_eq!(
            headers.to_string(),
            "MIME-Version: 1.0\r\nTo: recipient@example.com\r\nFrom: sender@example.com\r\n"
        );
    }

    #[test]
    fn test_get_decoded() {
        let mut headers = Headers::new();
        headers.add("Subject", Headers::encode_value("Grüße").unwrap());
        assert_ne!(headers.get("subject"), Some("Grüße"));
        assert_eq!(headers.get_decoded("subject").as_deref(), Some("Grüße"));
    }

    #[test]
    fn test_long_values_are_folded() {
        let subject = "lorem ipsum ".repeat(40);
        let mut headers = Headers::new();
        headers.add("subject", subject.trim_end());
        let rendered = headers.to_string();

        assert!(rendered.lines().count() > 1);
        assert!(rendered.split("\r\n").all(|l| l.len() <= FOLD_WIDTH));
        assert!(rendered.split("\r\n").skip(1).all(|l| l.is_empty() || l.starts_with(' ')));

        let parsed = Headers::parse(&rendered).unwrap();
        assert_eq!(parsed.get("Subject"), Some(subject.trim_end()));
    }

    #[test]
    fn test_unfolding_keeps_spacing() {
        let parsed = Headers::parse("Subject: a  \r\n b\r\n\tc\r\n").unwrap();
        assert_eq!(parsed.get("Subject"), Some("a   b\tc"));
    }

    #[test]
    fn test_encode_addresses() {
        assert_eq!(
            Headers::encode_addresses("Bob <bob@example.com>, carol@example.com").unwrap(),
            "Bob <bob@example.com>, carol@example.com"
        );

        let encoded =
            Headers::encode_addresses("\"Zoë, Z\" <zoe@example.com>, bob@example.com").unwrap();
        assert!(encoded.is_ascii());
        assert!(encoded.starts_with("=?utf-8?B?"));
        assert!(encoded.ends_with(" <zoe@example.com>, bob@example.com"));
        assert_eq!(
            Headers::decode_value(&encoded).unwrap(),
            "Zoë, Z <zoe@example.com>, bob@example.com"
        );
    }

    #[test]
    fn test_canonical_names() {
        assert_eq!(canonical_name("content-transfer-encoding"), "Content-Transfer-Encoding");
        assert_eq!(canonical_name("message-id"), "Message-ID");
    }
}
