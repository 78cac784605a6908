//! Google "client secret" JSON files.
//!
//! The Google Cloud console hands out a JSON document with a single
//! top-level key, `installed` for desktop applications or `web` for web
//! applications, holding the client id, secret and endpoints.

use crate::error::{Error, Result};
use crate::client::OAuthClient;
use crate::provider::{GOOGLE_AUTH_URL, GOOGLE_TOKEN_URL, Provider};
use serde::Deserialize;
use std::path::Path;

/// Which kind of OAuth client the secret file describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientKind {
    /// Desktop ("installed") application.
    Installed,
    /// Web application.
    Web,
}

/// Client registration read from a client secret file.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecret {
    /// OAuth client id.
    pub client_id: String,
    /// OAuth client secret.
    #[serde(default)]
    pub client_secret: Option<String>,
    /// Google Cloud project id.
    #[serde(default)]
    pub project_id: Option<String>,
    /// Authorization endpoint.
    #[serde(default)]
    pub auth_uri: Option<String>,
    /// Token endpoint.
    #[serde(default)]
    pub token_uri: Option<String>,
    /// Registered redirect URIs.
    #[serde(default)]
    pub redirect_uris: Vec<String>,
    #[serde(skip, default = "default_kind")]
    kind: ClientKind,
}

const fn default_kind() -> ClientKind {
    ClientKind::Installed
}

#[derive(Deserialize)]
struct ClientSecretFile {
    installed: Option<ClientSecret>,
    web: Option<ClientSecret>,
}

impl ClientSecret {
    /// Reads and parses a client secret file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a client secret.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::InvalidConfig(format!(
                "cannot read client secret file '{}': {e}",
                path.display()
            ))
        })?;
        Self::parse(&content)
    }

    /// Parses the JSON content of a client secret file.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or has neither an
    /// `installed` nor a `web` section.
    pub fn parse(json: &str) -> Result<Self> {
        let file: ClientSecretFile = serde_json::from_str(json)?;
        let secret = match (file.installed, file.web) {
            (Some(mut secret), _) => {
                secret.kind = ClientKind::Installed;
                secret
            }
            (None, Some(mut secret)) => {
                secret.kind = ClientKind::Web;
                secret
            }
            (None, None) => {
                return Err(Error::InvalidConfig(
                    "client secret file has no 'installed' or 'web' section".into(),
                ));
            }
        };

        if secret.client_id.is_empty() {
            return Err(Error::InvalidConfig("client_id is empty".into()));
        }
        Ok(secret)
    }

    /// Returns the client kind.
    #[must_use]
    pub const fn kind(&self) -> ClientKind {
        self.kind
    }

    /// Builds a provider from the endpoints in the file, falling back to
    /// Google's defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if an endpoint in the file is not a valid URL.
    pub fn provider(&self, scopes: &[String]) -> Result<Provider> {
        let provider = Provider::new(
            "Google",
            self.auth_uri.as_deref().unwrap_or(GOOGLE_AUTH_URL),
            self.token_uri.as_deref().unwrap_or(GOOGLE_TOKEN_URL),
        )?;
        Ok(provider.with_default_scopes(scopes.to_vec()))
    }

    /// Builds an OAuth client for the given scopes.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider endpoints are invalid.
    pub fn into_client(self, scopes: &[String]) -> Result<OAuthClient> {
        let provider = self.provider(scopes)?;
        let client = OAuthClient::new(self.client_id, provider);
        Ok(match self.client_secret {
            Some(secret) => client.with_client_secret(secret),
            None => client,
        })
    }
}
