//! `OAuth2` provider configurations and Gmail scopes.

use crate::error::{Error, Result};
use url::Url;

/// Gmail API authorization scopes.
///
/// See <https://developers.google.com/gmail/api/auth/scopes>.
pub mod scope {
    /// Create, read, update and delete drafts; send messages and drafts.
    pub const GMAIL_COMPOSE: &str = "https://www.googleapis.com/auth/gmail.compose";
    /// Send messages only.
    pub const GMAIL_SEND: &str = "https://www.googleapis.com/auth/gmail.send";
    /// Read all resources and their metadata.
    pub const GMAIL_READONLY: &str = "https://www.googleapis.com/auth/gmail.readonly";
    /// All read/write operations except immediate, permanent deletion.
    pub const GMAIL_MODIFY: &str = "https://www.googleapis.com/auth/gmail.modify";
    /// Full access to the account.
    pub const MAIL_GOOGLE_COM: &str = "https://mail.google.com/";
}

/// Default Google authorization endpoint.
pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// Default Google token endpoint.
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// `OAuth2` provider configuration.
#[derive(Debug, Clone)]
pub struct Provider {
    /// Provider name (e.g., "Google").
    pub name: String,
    /// Authorization endpoint URL.
    pub auth_url: Url,
    /// Token endpoint URL.
    pub token_url: Url,
    /// Default scopes.
    pub default_scopes: Vec<String>,
}

impl Provider {
    /// Creates a new provider configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if URLs are invalid.
    pub fn new(
        name: impl Into<String>,
        auth_url: impl AsRef<str>,
        token_url: impl AsRef<str>,
    ) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            auth_url: Url::parse(auth_url.as_ref())?,
            token_url: Url::parse(token_url.as_ref())?,
            default_scopes: Vec::new(),
        })
    }

    /// Sets the default scopes.
    #[must_use]
    pub fn with_default_scopes(mut self, scopes: Vec<String>) -> Self {
        self.default_scopes = scopes;
        self
    }

    /// Google `OAuth2` provider configuration.
    ///
    /// Defaults to the `gmail.compose` scope, enough to create drafts and
    /// send messages.
    ///
    /// # Errors
    ///
    /// Returns an error if URL parsing fails.
    pub fn google() -> Result<Self> {
        Ok(Self::new("Google", GOOGLE_AUTH_URL, GOOGLE_TOKEN_URL)?
            .with_default_scopes(vec![scope::GMAIL_COMPOSE.to_string()]))
    }

    /// Returns true if this provider talks to Google's endpoints.
    #[must_use]
    pub fn is_google(&self) -> bool {
        self.name == "Google"
            || self
                .auth_url
                .host_str()
                .is_some_and(|host| host.ends_with("google.com"))
    }

    /// Validates that required URLs are set.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is invalid.
    pub fn validate(&self) -> Result<()> {
        if self.auth_url.as_str().is_empty() {
            return Err(Error::InvalidConfig("auth_url is empty".into()));
        }
        if self.token_url.as_str().is_empty() {
            return Err(Error::InvalidConfig("token_url is empty".into()));
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
    fn test_google_provider() {
        let provider = Provider::google().unwrap();
        assert_eq!(provider.name, "Google");
        assert_eq!(provider.default_scopes, vec![scope::GMAIL_COMPOSE]);
        assert!(provider.is_google());
        provider.validate().unwrap();
    }

    #[test]
    fn test_custom_provider() {
        let provider = Provider::new(
            "Custom",
            "https://auth.example.com/authorize",
            "https://auth.example.com/token",
        )
        .unwrap()
        .with_default_scopes(vec!["email".to_string()]);

        assert_eq!(provider.name, "Custom");
        assert_eq!(provider.default_scopes.len(), 1);
        assert!(!provider.is_google());
        provider.validate().unwrap();
    }

    #[test]
    fn test_google_endpoints_from_client_secret_are_recognized() {
        let provider = Provider::new(
            "installed",
            "https://accounts.google.com/o/oauth2/auth",
            "https://oauth2.googleapis.com/token",
        )
        .unwrap();
        assert!(provider.is_google());
    }

    #[test]
    fn test_invalid_url_rejected() {
        assert!(Provider::new("Bad", "not a url", "https://example.com/token").is_err());
    }
}
