//! File attachments.

use crate::content_type::ContentType;
use crate::disposition::ContentDisposition;
use crate::encoding::{encode_base64_wrapped, to_crlf};
use crate::error::{Error, Result};
use crate::header::Headers;
use crate::message::{Part, TransferEncoding};
use std::fmt;
use std::path::Path;

/// Suffixes of compressed files. These always travel as opaque bytes,
/// whatever the inner file type is.
const COMPRESSION_SUFFIXES: &[&str] = &["gz", "bz2", "xz", "Z", "br", "zst"];

/// Broad attachment class, taken from the main content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum AttachmentKind {
    /// `text/*`
    Text,
    /// `image/*`
    Image,
    /// `audio/*`
    Audio,
    /// Everything else.
    Other,
}

impl AttachmentKind {
    /// Classifies a content type.
    #[must_use]
    pub fn of(content_type: &ContentType) -> Self {
        match content_type.main_type.to_ascii_lowercase().as_str() {
            "text" => Self::Text,
            "image" => Self::Image,
            "audio" => Self::Audio,
            _ => Self::Other,
        }
    }
}

impl fmt::Display for AttachmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Audio => "audio",
            Self::Other => "other",
        };
        f.write_str(name)
    }
}

/// A file to attach to a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Name shown to the recipient.
    pub filename: String,
    /// Guessed content type.
    pub content_type: ContentType,
    /// Raw file contents.
    pub data: Vec<u8>,
}

impl Attachment {
    /// Creates an attachment from in-memory data.
    #[must_use]
    pub fn new(filename: impl Into<String>, content_type: ContentType, data: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            content_type,
            data,
        }
    }

    /// Reads `filename` from `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Attachment`] if the file cannot be read.
    pub fn from_file(dir: impl AsRef<Path>, filename: &str) -> Result<Self> {
        let path = dir.as_ref().join(filename);
        let data = std::fs::read(&path).map_err(|source| Error::Attachment {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self::new(filename, guess_content_type(filename), data))
    }

    /// Reads the file at `path`, naming the attachment after its last
    /// component.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Attachment`] if the file cannot be read.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| Error::Attachment {
                path: path.display().to_string(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a file path"),
            })?;
        let dir = path.parent().unwrap_or_else(|| Path::new(""));
        Self::from_file(dir, &filename)
    }

    /// Returns the attachment class.
    #[must_use]
    pub fn kind(&self) -> AttachmentKind {
        AttachmentKind::of(&self.content_type)
    }

    /// Builds the MIME part for this attachment.
    ///
    /// ASCII text without CRs goes out as 7bit; anything else is base64.
    #[must_use]
    pub fn to_part(&self) -> Part {
        let mut headers = Headers::new();
        headers.add("content-type", self.content_type.to_string());

        let text = match self.kind() {
            AttachmentKind::Text => std::str::from_utf8(&self.data)
                .ok()
                .filter(|text| crate::encoding::is_7bit_safe(text)),
            _ => None,
        };

        let body = if let Some(text) = text {
            headers.add("content-transfer-encoding", TransferEncoding::SevenBit.to_string());
            to_crlf(text)
        } else {
            headers.add("content-transfer-encoding", TransferEncoding::Base64.to_string());
            encode_base64_wrapped(&self.data)
        };

        headers.add(
            "content-disposition",
            ContentDisposition::attachment(&self.filename).to_string(),
        );

        Part::new(headers, body.into_bytes())
    }
}

/// Guesses the content type from the file name.
///
/// Compressed files and unknown extensions map to
/// `application/octet-stream`.
#[must_use]
pub fn guess_content_type(filename: &str) -> ContentType {
    let compressed = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| COMPRESSION_SUFFIXES.contains(&ext));
    if compressed {
        return ContentType::octet_stream();
    }

    mime_guess::from_path(filename)
        .first_raw()
        .map_or_else(ContentType::octet_stream, ContentType::from_mime_str)
}
