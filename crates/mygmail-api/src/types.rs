//! Gmail API request and response payloads.

use crate::error::{Error, Result};
use mygmail_mime::encoding::decode_base64_url;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The special user id for the authenticated user.
pub const USER_ME: &str = "me";

/// An RFC 2822 message in the form the API accepts: `{"raw": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMessage {
    /// URL-safe base64 of the whole MIME document.
    pub raw: String,
}

impl RawMessage {
    /// Wraps an already encoded payload.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    /// Decodes the payload back to MIME text.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is not base64 or not UTF-8.
    pub fn decode(&self) -> Result<String> {
        let bytes = decode_base64_url(&self.raw)?;
        String::from_utf8(bytes).map_err(|e| Error::Mime(e.into()))
    }
}

/// Body of `drafts.create`: `{"message": {"raw": "..."}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftRequest {
    /// The draft content.
    pub message: RawMessage,
}

/// Reference to a stored message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRef {
    /// Message id.
    pub id: String,
    /// Thread the message belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    /// Labels applied to the message.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub label_ids: Vec<String>,
}

impl fmt::Display for MessageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{id: {}", self.id)?;
        if let Some(thread_id) = &self.thread_id {
            write!(f, ", threadId: {thread_id}")?;
        }
        if !self.label_ids.is_empty() {
            write!(f, ", labelIds: [{}]", self.label_ids.join(", "))?;
        }
        f.write_str("}")
    }
}

/// A draft as returned by `drafts.create`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
    /// Draft id.
    pub id: String,
    /// The message held by the draft.
    pub message: MessageRef,
}

/// Google's JSON error envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    /// Error details.
    pub error: ApiErrorDetail,
}

/// Inner part of [`ApiErrorBody`].
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDetail {
    /// HTTP status code.
    #[serde(default)]
    pub code: u16,
    /// Human readable message.
    #[serde(default)]
    pub message: String,
    /// Canonical status such as `INVALID_ARGUMENT`.
    #[serde(default)]
    pub status: Option<String>,
}
