//! Token endpoint client for a registered Google OAuth application.

use crate::error::Result;
use crate::provider::Provider;
use crate::token::{ErrorResponse, Token, TokenResponse};
use reqwest::Client;
use tracing::debug;

/// A grant sent to the token endpoint.
enum Grant<'a> {
    AuthorizationCode {
        code: &'a str,
        redirect_uri: &'a str,
        code_verifier: &'a str,
    },
    RefreshToken(&'a str),
}

impl Grant<'_> {
    fn form(&self) -> Vec<(&'static str, &str)> {
        match *self {
            Self::AuthorizationCode {
                code,
                redirect_uri,
                code_verifier,
            } => vec![
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", redirect_uri),
                ("code_verifier", code_verifier),
            ],
            Self::RefreshToken(refresh_token) => vec![
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ],
        }
    }
}

/// A registered OAuth client: its id, optional secret and the endpoints it
/// talks to.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    /// Client ID issued by Google.
    pub client_id: String,
    /// Client secret; installed applications receive one that is not
    /// actually confidential.
    pub client_secret: Option<String>,
    /// Endpoints and the scopes requested during consent.
    pub provider: Provider,
    /// User agent sent with token requests.
    pub user_agent: Option<String>,
    http: Client,
}

impl OAuthClient {
    /// Creates a client without a secret.
    #[must_use]
    pub fn new(client_id: impl Into<String>, provider: Provider) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: None,
            provider,
            user_agent: None,
            http: Client::new(),
        }
    }

    /// Sets the client secret.
    #[must_use]
    pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }

    /// Sends `user_agent` (typically the application name) with token
    /// requests.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Result<Self> {
        let user_agent = user_agent.into();
        self.http = Client::builder().user_agent(user_agent.clone()).build()?;
        self.user_agent = Some(user_agent);
        Ok(self)
    }

    /// Returns the token endpoint.
    #[must_use]
    pub fn token_uri(&self) -> &str {
        self.provider.token_url.as_str()
    }

    /// Obtains a fresh access token with the token's refresh token.
    ///
    /// The refresh token and granted scope carry over when Google omits them
    /// from the response.
    ///
    /// # Errors
    ///
    /// Returns `NoRefreshToken` if there is nothing to refresh with, or the
    /// error reported by the token endpoint.
    pub async fn refresh_token(&self, token: &Token) -> Result<Token> {
        let refresh_token = token.refresh_token()?;
        debug!("Refreshing access token at {}", self.token_uri());

        let mut refreshed = self.request(&Grant::RefreshToken(refresh_token)).await?;
        if refreshed.refresh_token.is_none() {
            refreshed.refresh_token.clone_from(&token.refresh_token);
        }
        if refreshed.scope.is_none() {
            refreshed.scope.clone_from(&token.scope);
        }
        Ok(refreshed)
    }

    pub(crate) async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
        code_verifier: &str,
    ) -> Result<Token> {
        debug!("Exchanging authorization code at {}", self.token_uri());
        self.request(&Grant::AuthorizationCode {
            code,
            redirect_uri,
            code_verifier,
        })
        .await
    }

    async fn request(&self, grant: &Grant<'_>) -> Result<Token> {
        let mut form = grant.form();
        form.push(("client_id", &self.client_id));
        if let Some(secret) = &self.client_secret {
            form.push(("client_secret", secret));
        }

        let response = self
            .http
            .post(self.provider.token_url.clone())
            .form(&form)
            .send()
            .await?;

        if !response.status().is_success() {
            let error: ErrorResponse = response.json().await?;
            return Err(error.into_error());
        }

        let body: TokenResponse = response.json().await?;
        Token::from_response(body)
    }
}
