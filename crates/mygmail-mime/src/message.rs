//! MIME message structure, rendering and parsing.

use crate::content_type::ContentType;
use crate::disposition::ContentDisposition;
use crate::encoding::{decode_base64, decode_quoted_printable, from_crlf};
use crate::error::{Error, Result};
use crate::header::Headers;
use std::fmt;
use std::fmt::Write as _;

/// Transfer encoding types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEncoding {
    /// 7-bit ASCII.
    SevenBit,
    /// 8-bit binary.
    EightBit,
    /// Base64 encoding.
    Base64,
    /// Quoted-Printable encoding.
    QuotedPrintable,
    /// Binary (no encoding).
    Binary,
}

impl TransferEncoding {
    /// Parses transfer encoding from string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "8bit" => Self::EightBit,
            "base64" => Self::Base64,
            "quoted-printable" => Self::QuotedPrintable,
            "binary" => Self::Binary,
            _ => Self::SevenBit, // Default (includes "7bit")
        }
    }
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SevenBit => write!(f, "7bit"),
            Self::EightBit => write!(f, "8bit"),
            Self::Base64 => write!(f, "base64"),
            Self::QuotedPrintable => write!(f, "quoted-printable"),
            Self::Binary => write!(f, "binary"),
        }
    }
}

fn content_type_of(headers: &Headers) -> Result<ContentType> {
    headers
        .get("content-type")
        .map_or_else(|| Ok(ContentType::text_plain()), ContentType::parse)
}

fn transfer_encoding_of(headers: &Headers) -> TransferEncoding {
    headers
        .get("content-transfer-encoding")
        .map_or(TransferEncoding::SevenBit, TransferEncoding::parse)
}

fn decode(headers: &Headers, body: &[u8]) -> Result<Vec<u8>> {
    match transfer_encoding_of(headers) {
        TransferEncoding::Base64 => {
            let body_str = String::from_utf8_lossy(body);
            // Remove whitespace for lenient parsing
            let cleaned: String = body_str.chars().filter(|c| !c.is_whitespace()).collect();
            decode_base64(&cleaned)
        }
        TransferEncoding::QuotedPrintable => {
            let body_str = String::from_utf8_lossy(body);
            Ok(decode_quoted_printable(&body_str)?.into_bytes())
        }
        _ => Ok(body.to_vec()),
    }
}

/// Decodes a text body to LF line breaks.
///
/// Only wire line breaks are rewritten; a CR carried inside base64 or as
/// `=0D` is part of the text.
fn decode_text(headers: &Headers, body: &[u8]) -> Result<String> {
    match transfer_encoding_of(headers) {
        TransferEncoding::QuotedPrintable => {
            decode_quoted_printable(&from_crlf(&String::from_utf8_lossy(body)))
        }
        TransferEncoding::Base64 => Ok(String::from_utf8(decode(headers, body)?)?),
        _ => Ok(from_crlf(&String::from_utf8(body.to_vec())?)),
    }
}

/// MIME message part.
#[derive(Debug, Clone)]
pub struct Part {
    /// Part headers.
    pub headers: Headers,
    /// Part body as it appears on the wire (still transfer-encoded).
    pub body: Vec<u8>,
}

impl Part {
    /// Creates a new part.
    #[must_use]
    pub const fn new(headers: Headers, body: Vec<u8>) -> Self {
        Self { headers, body }
    }

    /// Gets the content type.
    ///
    /// # Errors
    ///
    /// Returns an error if content type header is invalid.
    pub fn content_type(&self) -> Result<ContentType> {
        content_type_of(&self.headers)
    }

    /// Gets the transfer encoding.
    #[must_use]
    pub fn transfer_encoding(&self) -> TransferEncoding {
        transfer_encoding_of(&self.headers)
    }

    /// Gets the parsed `Content-Disposition` header, if any.
    #[must_use]
    pub fn content_disposition(&self) -> Option<ContentDisposition> {
        self.headers
            .get("content-disposition")
            .map(ContentDisposition::parse)
    }

    /// Returns true if the part is marked as an attachment.
    #[must_use]
    pub fn is_attachment(&self) -> bool {
        self.content_disposition()
            .is_some_and(|d| d.is_attachment())
    }

    /// Returns the part's file name from `Content-Disposition`, falling
    /// back to the `name` parameter of `Content-Type`.
    #[must_use]
    pub fn filename(&self) -> Option<String> {
        self.content_disposition()
            .and_then(|d| d.filename())
            .or_else(|| {
                self.content_type()
                    .ok()
                    .and_then(|ct| ct.parameters.get("name").cloned())
            })
    }

    /// Decodes the body according to the transfer encoding.
    ///
    /// # Errors
    ///
    /// Returns an error if decoding fails.
    pub fn decode_body(&self) -> Result<Vec<u8>> {
        decode(&self.headers, &self.body)
    }

    /// Gets the decoded body as a string with LF line breaks.
    ///
    /// # Errors
    ///
    /// Returns an error if decoding or UTF-8 conversion fails.
    pub fn body_text(&self) -> Result<String> {
        decode_text(&self.headers, &self.body)
    }
}

/// MIME message.
#[derive(Debug, Clone)]
pub struct Message {
    /// Message headers.
    pub headers: Headers,
    /// Message parts (empty for single-part messages).
    pub parts: Vec<Part>,
    /// Body for single-part messages.
    pub body: Option<Vec<u8>>,
}

impl Message {
    /// Creates a new message.
    #[must_use]
    pub const fn new(headers: Headers) -> Self {
        Self {
            headers,
            parts: Vec::new(),
            body: None,
        }
    }

    /// Creates a single-part message.
    #[must_use]
    pub const fn single_part(headers: Headers, body: Vec<u8>) -> Self {
        Self {
            headers,
            parts: Vec::new(),
            body: Some(body),
        }
    }

    /// Creates a multipart message.
    #[must_use]
    pub const fn multipart(headers: Headers, parts: Vec<Part>) -> Self {
        Self {
            headers,
            parts,
            body: None,
        }
    }

    /// Gets the content type.
    ///
    /// # Errors
    ///
    /// Returns an error if content type header is invalid.
    pub fn content_type(&self) -> Result<ContentType> {
        content_type_of(&self.headers)
    }

    /// Checks if this is a multipart message.
    ///
    /// # Errors
    ///
    /// Returns an error if content type cannot be determined.
    pub fn is_multipart(&self) -> Result<bool> {
        Ok(self.content_type()?.is_multipart())
    }

    /// Gets the From header.
    #[must_use]
    pub fn from(&self) -> Option<String> {
        self.headers.get_decoded("from")
    }

    /// Gets the To header.
    #[must_use]
    pub fn to(&self) -> Option<String> {
        self.headers.get_decoded("to")
    }

    /// Gets the Subject header with encoded words decoded.
    #[must_use]
    pub fn subject(&self) -> Option<String> {
        self.headers.get_decoded("subject")
    }

    /// Gets the Date header.
    #[must_use]
    pub fn date(&self) -> Option<&str> {
        self.headers.get("date")
    }

    /// Gets the body as text for single-part messages.
    ///
    /// # Errors
    ///
    /// Returns an error if this is a multipart message or decoding fails.
    pub fn body_text(&self) -> Result<String> {
        if !self.parts.is_empty() {
            return Err(Error::InvalidMultipart(
                "Use parts for multipart messages".to_string(),
            ));
        }

        let body = self
            .body
            .as_ref()
            .ok_or_else(|| Error::Parse("No body".to_string()))?;

        decode_text(&self.headers, body)
    }

    /// Finds the first text/plain part that is not an attachment.
    ///
    /// # Errors
    ///
    /// Returns an error if no text part is found or decoding fails.
    pub fn text_part(&self) -> Result<String> {
        for part in self.parts.iter().filter(|p| !p.is_attachment()) {
            let ct = part.content_type()?;
            if ct.essence() == "text/plain" {
                return part.body_text();
            }
        }

        Err(Error::Parse("No text/plain part found".to_string()))
    }

    /// Returns the parts marked as attachments.
    #[must_use]
    pub fn attachments(&self) -> Vec<&Part> {
        self.parts.iter().filter(|p| p.is_attachment()).collect()
    }

    /// Renders the message as MIME text with CRLF line breaks.
    ///
    /// `MIME-Version: 1.0` is added when the headers lack it. Multipart
    /// messages are written with a delimiter line before each part and a
    /// closing delimiter after the last.
    ///
    /// # Errors
    ///
    /// Returns an error if a multipart message has no boundary.
    pub fn render(&self) -> Result<String> {
        let mut out = String::new();
        if self.headers.get("mime-version").is_none() {
            out.push_str("MIME-Version: 1.0\r\n");
        }
        // Writing into a String cannot fail
        let _ = write!(out, "{}\r\n", self.headers);

        if self.parts.is_empty() {
            if let Some(body) = &self.body {
                out.push_str(&String::from_utf8_lossy(body));
            }
            return Ok(out);
        }

        let content_type = self.content_type()?;
        let boundary = content_type.boundary().ok_or(Error::MissingBoundary)?;
        for part in &self.parts {
            let _ = write!(
                out,
                "--{boundary}\r\n{}\r\n{}\r\n",
                part.headers,
                String::from_utf8_lossy(&part.body)
            );
        }
        let _ = write!(out, "--{boundary}--\r\n");
        Ok(out)
    }

    /// Parses a MIME document.
    ///
    /// Multipart bodies are split on their boundary; nested multiparts are
    /// kept as opaque parts.
    ///
    /// # Errors
    ///
    /// Returns an error on malformed headers, a multipart without a boundary,
    /// or a multipart body with no delimiter lines.
    pub fn parse(text: &str) -> Result<Self> {
        let (head, body) = split_head_body(text);
        let headers = Headers::parse(head)?;
        let content_type = content_type_of(&headers)?;

        if !content_type.is_multipart() {
            return Ok(Self::single_part(headers, body.as_bytes().to_vec()));
        }

        let boundary = content_type.boundary().ok_or(Error::MissingBoundary)?;
        let parts = split_parts(body, boundary)?
            .into_iter()
            .map(|section| {
                let (head, body) = split_head_body(section);
                Ok(Part::new(Headers::parse(head)?, body.as_bytes().to_vec()))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self::multipart(headers, parts))
    }
}

/// Splits at the first blank line; a leading blank line means no headers.
fn split_head_body(text: &str) -> (&str, &str) {
    if let Some(rest) = text.strip_prefix("\r\n") {
        return ("", rest);
    }
    if let Some(rest) = text.strip_prefix('\n') {
        return ("", rest);
    }

    let crlf = text.find("\r\n\r\n").map(|i| (i, 4));
    let lf = text.find("\n\n").map(|i| (i, 2));
    let split = match (crlf, lf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    };

    split.map_or((text, ""), |(index, len)| {
        (&text[..index], &text[index + len..])
    })
}

/// Returns the sections between delimiter lines. The line break before a
/// delimiter belongs to the delimiter.
fn split_parts<'a>(body: &'a str, boundary: &str) -> Result<Vec<&'a str>> {
    let delimiter = format!("--{boundary}");
    let close = format!("--{boundary}--");

    let mut sections = Vec::new();
    let mut start: Option<usize> = None;
    let mut offset = 0;
    let mut closed = false;

    for line in body.split_inclusive('\n') {
        let trimmed = line.trim_end_matches(['\r', '\n']).trim_end();
        let is_close = trimmed == close;
        if is_close || trimmed == delimiter {
            if let Some(begin) = start.take() {
                let section = &body[begin..offset];
                let section = section
                    .strip_suffix("\r\n")
                    .or_else(|| section.strip_suffix('\n'))
                    .unwrap_or(section);
                sections.push(section);
            }
            if is_close {
                closed = true;
                break;
            }
            start = Some(offset + line.len());
        }
        offset += line.len();
    }

    // Tolerate a missing closing delimiter
    if !closed && let Some(begin) = start {
        sections.push(&body[begin..]);
    }

    if sections.is_empty() {
        return Err(Error::InvalidMultipart(format!(
            "No parts delimited by '{delimiter}'"
        )));
    }
    Ok(sections)
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

    const MULTIPART: &str = concat!(
        "MIME-Version: 1.0\r\n",
        "Content-Type: multipart/mixed; boundary=\"XYZ\"\r\n",
        "To: recipient@example.com\r\n",
        "\r\n",
        "preamble\r\n",
        "--XYZ\r\n",
        "Content-Type: text/plain; charset=utf-8\r\n",
        "\r\n",
        "Hello\r\n",
        "--XYZ\r\n",
        "Content-Type: image/png\r\n",
        "Content-Transfer-Encoding: base64\r\n",
        "Content-Disposition: attachment; filename=\"dot.png\"\r\n",
        "\r\n",
        "iVBORw0K\r\n",
        "--XYZ--\r\n",
        "epilogue\r\n",
    );

    #[test]
    fn test_transfer_encoding_parse() {
        assert_eq!(TransferEncoding::parse("7bit"), TransferEncoding::SevenBit);
        assert_eq!(TransferEncoding::parse("base64"), TransferEncoding::Base64);
        assert_eq!(
            TransferEncoding::parse("quoted-printable"),
            TransferEncoding::QuotedPrintable
        );
    }

    #[test]
    fn test_part_body_text() {
        let mut headers = Headers::new();
        headers.add("content-type", "text/plain; charset=utf-8");
        let part = Part::new(headers, b"Hello,\r\nWorld!".to_vec());

        assert_eq!(part.body_text().unwrap(), "Hello,\nWorld!");
    }

    #[test]
    fn test_part_filename_falls_back_to_name() {
        let mut headers = Headers::new();
        headers.add("content-type", "application/pdf; name=\"a.pdf\"");
        let part = Part::new(headers, Vec::new());

        assert!(!part.is_attachment());
        assert_eq!(part.filename().as_deref(), Some("a.pdf"));
    }

    #[test]
    fn test_message_single_part() {
        let mut headers = Headers::new();
        headers.add("from", "sender@example.com");
        headers.add("to", "recipient@example.com");
        headers.add("subject", "Test");

        let message = Message::single_part(headers, b"Hello, World!".to_vec());

        assert_eq!(message.from().as_deref(), Some("sender@example.com"));
        assert_eq!(message.to().as_deref(), Some("recipient@example.com"));
        assert_eq!(message.subject().as_deref(), Some("Test"));
        assert_eq!(message.body_text().unwrap(), "Hello, World!");
    }

    #[test]
    fn test_parse_single_part() {
        let raw = "To: a@example.com\r\nSubject: Hi\r\nContent-Transfer-Encoding: quoted-printable\r\n\r\nCaf=C3=A9\r\nnext";
        let message = Message::parse(raw).unwrap();

        assert!(!message.is_multipart().unwrap());
        assert_eq!(message.to().as_deref(), Some("a@example.com"));
        assert_eq!(message.body_text().unwrap(), "Café\nnext");
    }

    #[test]
    fn test_parse_multipart() {
        let message = Message::parse(MULTIPART).unwrap();

        assert_eq!(message.parts.len(), 2);
        assert_eq!(message.text_part().unwrap(), "Hello");

        let attachments = message.attachments();
        assert_eq!(attachments.len(), 1);
        assert_eq!(attachments[0].filename().as_deref(), Some("dot.png"));
        assert_eq!(
            attachments[0].decode_body().unwrap(),
            b"\x89PNG\r\n".to_vec()
        );
    }

    #[test]
    fn test_parse_multipart_without_boundary() {
        let raw = "Content-Type: multipart/mixed\r\n\r\nbody";
        assert!(matches!(Message::parse(raw), Err(Error::MissingBoundary)));
    }

    #[test]
    fn test_parse_multipart_without_delimiters() {
        let raw = "Content-Type: multipart/mixed; boundary=b\r\n\r\nbody";
        assert!(matches!(
            Message::parse(raw),
            Err(Error::InvalidMultipart(_))
        ));
    }

    #[test]
    fn test_render_adds_mime_version() {
        let mut headers = Headers::new();
        headers.add("to", "a@example.com");
        let message = Message::single_part(headers, b"Hi\r\n".to_vec());

        assert_eq!(
            message.render().unwrap(),
            "MIME-Version: 1.0\r\nTo: a@example.com\r\n\r\nHi\r\n"
        );
    }

    #[test]
    fn test_render_parse_multipart() {
        let mut headers = Headers::new();
        headers.add("content-type", "multipart/mixed; boundary=abc123");

        let mut part1_headers = Headers::new();
        part1_headers.add("content-type", "text/plain");
        let part1 = Part::new(part1_headers, b"Part 1".to_vec());

        let mut part2_headers = Headers::new();
        part2_headers.add("content-type", "text/plain");
        part2_headers.add("content-disposition", "attachment; filename=two.txt");
        let part2 = Part::new(part2_headers, b"Part 2\r\n".to_vec());

        let message = Message::multipart(headers, vec![part1, part2]);
        let rendered = message.render().unwrap();
        assert!(rendered.ends_with("--abc123--\r\n"));

        let parsed = Message::parse(&rendered).unwrap();
        assert!(parsed.is_multipart().unwrap());
        assert_eq!(parsed.parts.len(), 2);
        assert_eq!(parsed.parts[0].body, b"Part 1");
        assert_eq!(parsed.parts[1].body, b"Part 2\r\n");
        assert_eq!(parsed.attachments()[0].filename().as_deref(), Some("two.txt"));
    }

    #[test]
    fn test_render_multipart_without_boundary() {
        let part = Part::new(Headers::new(), Vec::new());
        let message = Message::multipart(Headers::new(), vec![part]);
        assert!(matches!(message.render(), Err(Error::MissingBoundary)));
    }
}
