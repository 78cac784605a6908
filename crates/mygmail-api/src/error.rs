//! Error types for Gmail API operations.

/// Result type alias for Gmail API operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Gmail API error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with an error status.
    #[error("Gmail API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Message from Google's error envelope, or the raw body.
        message: String,
    },

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Credential error.
    #[error("Authorization error: {0}")]
    Auth(#[from] mygmail_oauth::Error),

    /// Message construction error.
    #[error("MIME error: {0}")]
    Mime(#[from] mygmail_mime::Error),
}
