//! JSON file storage for credentials.

use super::Token;
use crate::client::OAuthClient;
use crate::error::{Error, Result};
use crate::provider::{GOOGLE_AUTH_URL, Provider};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Directory under the user's home that holds stored credentials.
pub const CREDENTIAL_DIR: &str = ".credentials";

/// File name of the stored Gmail credential.
pub const CREDENTIAL_FILE: &str = "gmail-quickstart.json";

/// A token together with the client it was issued to.
///
/// Holding the client registration lets a stored credential be refreshed
/// without the client secret file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredCredential {
    /// Client the token was issued to.
    pub client_id: String,
    /// Secret of that client, if it has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    /// Token endpoint used for refreshes.
    pub token_uri: String,
    /// The token itself.
    #[serde(flatten)]
    pub token: Token,
}

impl StoredCredential {
    /// Records `token` as issued to `client`.
    #[must_use]
    pub fn new(client: &OAuthClient, token: Token) -> Self {
        Self {
            client_id: client.client_id.clone(),
            client_secret: client.client_secret.clone(),
            token_uri: client.token_uri().to_string(),
            token,
        }
    }

    /// Splits into a client able to refresh the token, and the token.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored token endpoint is not a valid URL.
    pub fn into_parts(self) -> Result<(OAuthClient, Token)> {
        let provider = Provider::new("Google", GOOGLE_AUTH_URL, &self.token_uri)?;
        let client = OAuthClient::new(self.client_id, provider);
        let client = match self.client_secret {
            Some(secret) => client.with_client_secret(secret),
            None => client,
        };
        Ok((client, self.token))
    }
}

/// Persistent credential storage backed by a JSON file.
///
/// The file is created with owner-only permissions on Unix.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    /// Creates a store at the given path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns `~/.credentials/gmail-quickstart.json`.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn default_path() -> Result<PathBuf> {
        dirs::home_dir()
            .map(|home| home.join(CREDENTIAL_DIR).join(CREDENTIAL_FILE))
            .ok_or_else(|| Error::InvalidConfig("cannot determine home directory".into()))
    }

    /// Creates a store at [`TokenStore::default_path`].
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn at_default_path() -> Result<Self> {
        Self::default_path().map(Self::new)
    }

    /// Creates the parent directory of the store file if it is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn ensure_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    /// Loads the stored credential.
    ///
    /// A missing file, or one that does not parse, yields `Ok(None)` so the
    /// consent flow runs again.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    pub fn load(&self) -> Result<Option<StoredCredential>> {
        if !self.path.exists() {
            debug!("No stored credential at {}", self.path.display());
            return Ok(None);
        }

        let content = std::fs::read_to_string(&self.path)?;
        match serde_json::from_str::<StoredCredential>(&content) {
            Ok(stored) => {
                debug!(
                    "Loaded credential from {} (expires_at={:?})",
                    self.path.display(),
                    stored.token.expires_at
                );
                Ok(Some(stored))
            }
            Err(e) => {
                warn!("Ignoring unreadable credential {}: {e}", self.path.display());
                Ok(None)
            }
        }
    }

    /// Saves the credential, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, stored: &StoredCredential) -> Result<()> {
        self.ensure_dir()?;
        let content = serde_json::to_string_pretty(stored)?;
        let mut file = open_private(&self.path)?;
        file.write_all(content.as_bytes())?;
        debug!("Saved credential to {}", self.path.display());
        Ok(())
    }

    /// Deletes the stored credential, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be removed.
    pub fn delete(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        Ok(())
    }

    /// Returns the store file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(unix)]
fn open_private(path: &Path) -> Result<std::fs::File> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // mode() only applies when the file is created
    file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    Ok(file)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> Result<std::fs::File> {
    Ok(std::fs::File::create(path)?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn client() -> OAuthClient {
        OAuthClient::new("cid.apps.googleusercontent.com", Provider::google().unwrap())
            .with_client_secret("shh")
    }

    #[test]
    fn test_missing_file_loads_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("absent.json"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("nested").join("token.json"));
        let expires = Utc::now() + Duration::seconds(3600);
        let token = Token::new("ya29.abc", "Bearer")
            .with_refresh_token("1//xyz")
            .with_expires_at(expires)
            .with_scope("https://www.googleapis.com/auth/gmail.compose");

        store.save(&StoredCredential::new(&client(), token.clone())).unwrap();
        let loaded = store.load().unwrap().unwrap();

        assert_eq!(loaded.client_id, "cid.apps.googleusercontent.com");
        assert_eq!(loaded.client_secret.as_deref(), Some("shh"));
        assert_eq!(loaded.token_uri, "https://oauth2.googleapis.com/token");
        assert_eq!(loaded.token.access_token, "ya29.abc");
        assert_eq!(loaded.token.refresh_token.as_deref(), Some("1//xyz"));
        assert_eq!(loaded.token.expires_at, Some(expires));
        assert_eq!(loaded.token.scope, token.scope);
    }

    #[test]
    fn test_file_is_flat_json() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("token.json"));
        store
            .save(&StoredCredential::new(&client(), Token::new("a", "Bearer")))
            .unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(value["access_token"], "a");
        assert_eq!(value["client_id"], "cid.apps.googleusercontent.com");
        assert!(value.get("token").is_none());
    }

    #[test]
    fn test_into_parts_rebuilds_client() {
        let stored = StoredCredential::new(&client(), Token::new("a", "Bearer"));
        let (client, token) = stored.into_parts().unwrap();
        assert_eq!(client.client_id, "cid.apps.googleusercontent.com");
        assert_eq!(client.client_secret.as_deref(), Some("shh"));
        assert_eq!(client.token_uri(), "https://oauth2.googleapis.com/token");
        assert_eq!(token.access_token, "a");
    }

    #[cfg(unix)]
    #[test]
    fn test_saved_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        std::fs::write(&path, "old").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        let store = TokenStore::new(&path);
        store
            .save(&StoredCredential::new(&client(), Token::new("a", "Bearer")))
            .unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert!(store.load().unwrap().is_some());
    }

    #[test]
    fn test_corrupt_file_loads_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(TokenStore::new(&path).load().unwrap().is_none());

        // A bare token without its client cannot be refreshed
        std::fs::write(&path, r#"{"access_token": "a", "token_type": "Bearer"}"#).unwrap();
        assert!(TokenStore::new(path).load().unwrap().is_none());
    }

    #[test]
    fn test_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("token.json"));
        store
            .save(&StoredCredential::new(&client(), Token::new("a", "Bearer")))
            .unwrap();
        store.delete().unwrap();
        assert!(store.load().unwrap().is_none());
        store.delete().unwrap();
    }

    #[test]
    fn test_default_path_layout() {
        if let Ok(path) = TokenStore::default_path() {
            assert!(path.ends_with(".credentials/gmail-quickstart.json"));
        }
    }
}
