//! `Content-Disposition` header (RFC 2183).

use crate::content_type::{parse_parameters, write_parameters};
use crate::encoding::{decode_rfc2231, encode_rfc2231};
use std::collections::HashMap;
use std::fmt;

/// Parsed `Content-Disposition` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentDisposition {
    /// Disposition type, `attachment` or `inline`.
    pub kind: String,
    /// Parameters such as `filename`.
    pub parameters: HashMap<String, String>,
}

impl ContentDisposition {
    /// Creates an `attachment` disposition for `filename`.
    ///
    /// Non-ASCII names are carried in the RFC 2231 `filename*` form.
    #[must_use]
    pub fn attachment(filename: &str) -> Self {
        let mut parameters = HashMap::new();
        if filename.is_ascii() {
            parameters.insert("filename".to_string(), filename.to_string());
        } else {
            parameters.insert("filename*".to_string(), encode_rfc2231(filename));
        }
        Self {
            kind: "attachment".to_string(),
            parameters,
        }
    }

    /// Parses a header value such as `attachment; filename="a.txt"`.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        let mut parts = value.split(';');
        let kind = parts.next().unwrap_or_default().trim().to_lowercase();
        Self {
            kind,
            parameters: parse_parameters(parts),
        }
    }

    /// Returns true for `attachment` dispositions.
    #[must_use]
    pub fn is_attachment(&self) -> bool {
        self.kind == "attachment"
    }

    /// Returns the file name, decoding the RFC 2231 form when present.
    #[must_use]
    pub fn filename(&self) -> Option<String> {
        self.parameters
            .get("filename*")
            .and_then(|v| decode_rfc2231(v).ok())
            .or_else(|| self.parameters.get("filename").cloned())
    }
}

impl fmt::Display for ContentDisposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.kind)?;
        write_parameters(f, &self.parameters)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_attachment() {
        let disposition = ContentDisposition::attachment("report.pdf");
        assert_eq!(disposition.to_string(), "attachment; filename=report.pdf");
        assert_eq!(disposition.filename().as_deref(), Some("report.pdf"));
    }

    #[test]
    fn test_filename_with_spaces_is_quoted() {
        let disposition = ContentDisposition::attachment("my report.pdf");
        assert_eq!(
            disposition.to_string(),
            "attachment; filename=\"my report.pdf\""
        );
    }

    #[test]
    fn test_non_ascii_filename() {
        let disposition = ContentDisposition::attachment("résumé.pdf");
        let rendered = disposition.to_string();
        assert_eq!(rendered, "attachment; filename*=utf-8''r%C3%A9sum%C3%A9.pdf");

        let parsed = ContentDisposition::parse(&rendered);
        assert_eq!(parsed.filename().as_deref(), Some("résumé.pdf"));
    }

    #[test]
    fn test_parse() {
        let parsed = ContentDisposition::parse("Attachment; Filename=\"a b.txt\"");
        assert!(parsed.is_attachment());
        assert_eq!(parsed.filename().as_deref(), Some("a b.txt"));

        let inline = ContentDisposition::parse("inline");
        assert!(!inline.is_attachment());
        assert!(inline.filename().is_none());
    }
}
