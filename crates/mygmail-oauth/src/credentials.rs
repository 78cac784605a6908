//! Stored user credentials with automatic refresh.

use crate::client::OAuthClient;
use crate::error::Result;
use crate::flow::{AuthOptions, run_flow};
use crate::secret::ClientSecret;
use crate::token::{StoredCredential, Token, TokenStore};
use std::path::Path;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// An authorized user credential.
///
/// Hands out access tokens, refreshing and re-saving the stored credential
/// when the token has expired.
#[derive(Debug)]
pub struct Credentials {
    client: OAuthClient,
    store: TokenStore,
    token: Mutex<Token>,
}

impl Credentials {
    /// Wraps a token obtained for `client`, persisted in `store`.
    #[must_use]
    pub fn new(client: OAuthClient, store: TokenStore, token: Token) -> Self {
        Self {
            client,
            store,
            token: Mutex::new(token),
        }
    }

    /// Returns a valid access token, refreshing it first if expired.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is expired and cannot be refreshed, or
    /// the refreshed token cannot be saved.
    pub async fn access_token(&self) -> Result<String> {
        let mut token = self.token.lock().await;
        if token.is_expired() {
            debug!("Access token expired, refreshing");
            let refreshed = self.client.refresh_token(&token).await?;
            self.store
                .save(&StoredCredential::new(&self.client, refreshed.clone()))?;
            *token = refreshed;
        }
        Ok(token.access_token.clone())
    }

    /// Returns true if the credential can no longer produce access tokens.
    pub async fn invalid(&self) -> bool {
        self.token.lock().await.is_invalid()
    }

    /// Returns a copy of the current token.
    pub async fn token(&self) -> Token {
        self.token.lock().await.clone()
    }

    /// Returns the OAuth client.
    #[must_use]
    pub const fn client(&self) -> &OAuthClient {
        &self.client
    }

    /// Returns the token store.
    #[must_use]
    pub const fn store(&self) -> &TokenStore {
        &self.store
    }
}

/// Gets valid user credentials from storage.
///
/// A stored credential that is still usable and covers `scopes` is returned
/// as is; the client secret file is only read when nothing usable is stored,
/// in which case the consent flow runs and its token is stored.
///
/// # Errors
///
/// Returns an error if the store cannot be read or written, or the consent
/// flow has to run and the client secret file is missing or malformed or the
/// flow fails.
pub async fn get_credentials(
    scopes: &[String],
    client_secret_file: impl AsRef<Path>,
    application_name: &str,
    options: &AuthOptions,
) -> Result<Credentials> {
    let store = options.token_store()?;
    store.ensure_dir()?;

    if let Some(stored) = store.load()?
        && !stored.token.is_invalid()
        && stored.token.has_scopes(scopes)
    {
        let (client, token) = stored.into_parts()?;
        let client = client.with_user_agent(application_name)?;
        return Ok(Credentials::new(client, store, token));
    }

    let client = ClientSecret::from_file(client_secret_file)?
        .into_client(scopes)?
        .with_user_agent(application_name)?;
    let token = run_flow(&client, options).await?;
    store.save(&StoredCredential::new(&client, token.clone()))?;
    info!("Storing credentials to {}", store.path().display());

    Ok(Credentials::new(client, store, token))
}
