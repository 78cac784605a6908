//! One consent round trip against Google's authorization endpoint.

use super::PkceChallenge;
use crate::client::OAuthClient;
use crate::error::Result;
use crate::token::Token;
use url::Url;

/// A single authorization request and the code exchange that completes it.
///
/// Every request carries a fresh PKCE challenge and asks for the scopes the
/// client was built with.
#[derive(Debug)]
pub struct AuthorizationCodeFlow<'a> {
    client: &'a OAuthClient,
    redirect_uri: String,
    pkce: PkceChallenge,
}

impl<'a> AuthorizationCodeFlow<'a> {
    /// Starts a flow whose redirect lands on `redirect_uri`.
    #[must_use]
    pub fn new(client: &'a OAuthClient, redirect_uri: impl Into<String>) -> Self {
        Self {
            client,
            redirect_uri: redirect_uri.into(),
            pkce: PkceChallenge::generate(),
        }
    }

    /// Returns the redirect URI sent with both requests.
    #[must_use]
    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// Builds the consent URL, echoing `state` back on the redirect.
    #[must_use]
    pub fn authorization_url(&self, state: Option<&str>) -> Url {
        let provider = &self.client.provider;
        let mut url = provider.auth_url.clone();
        url.query_pairs_mut()
            .append_pair("client_id", &self.client.client_id)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", &provider.default_scopes.join(" "))
            .append_pair("code_challenge", self.pkce.challenge())
            .append_pair("code_challenge_method", self.pkce.method());

        if let Some(state) = state {
            url.query_pairs_mut().append_pair("state", state);
        }
        // Refresh tokens are only issued for offline access
        if provider.is_google() {
            url.query_pairs_mut()
                .append_pair("access_type", "offline")
                .append_pair("prompt", "consent");
        }
        url
    }

    /// Trades the authorization code for a token.
    ///
    /// # Errors
    ///
    /// Returns the token endpoint's error, or a transport error.
    pub async fn exchange_code(&self, code: &str) -> Result<Token> {
        self.client
            .exchange_code(code, &self.redirect_uri, self.pkce.verifier())
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::provider::{Provider, scope};
    use crate::secret::ClientSecret;

    fn query(url: &Url, key: &str) -> Option<String> {
        url.query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    #[test]
    fn test_url_carries_client_scopes() {
        let scopes = vec![scope::GMAIL_SEND.to_string(), scope::GMAIL_COMPOSE.to_string()];
        let client = ClientSecret::parse(r#"{"installed": {"client_id": "cid"}}"#)
            .unwrap()
            .into_client(&scopes)
            .unwrap();
        let flow = AuthorizationCodeFlow::new(&client, "http://localhost:8080/");
        let url = flow.authorization_url(Some("st"));

        assert_eq!(query(&url, "client_id").as_deref(), Some("cid"));
        assert_eq!(query(&url, "scope"), Some(scopes.join(" ")));
        assert_eq!(
            query(&url, "redirect_uri").as_deref(),
            Some("http://localhost:8080/")
        );
        assert_eq!(query(&url, "state").as_deref(), Some("st"));
        assert_eq!(query(&url, "response_type").as_deref(), Some("code"));
    }

    #[test]
    fn test_url_has_pkce_and_offline_access() {
        let client = OAuthClient::new("cid", Provider::google().unwrap());
        let flow = AuthorizationCodeFlow::new(&client, "http://localhost");
        let url = flow.authorization_url(None);

        assert_eq!(
            query(&url, "code_challenge").as_deref(),
            Some(flow.pkce.challenge())
        );
        assert_eq!(query(&url, "code_challenge_method").as_deref(), Some("S256"));
        assert_eq!(query(&url, "access_type").as_deref(), Some("offline"));
        assert_eq!(query(&url, "prompt").as_deref(), Some("consent"));
        assert!(query(&url, "state").is_none());
    }

    #[test]
    fn test_other_providers_skip_offline_access() {
        let provider = Provider::new(
            "Custom",
            "https://auth.example.com/authorize",
            "https://auth.example.com/token",
        )
        .unwrap()
        .with_default_scopes(vec!["email".to_string()]);
        let client = OAuthClient::new("cid", provider);
        let url = AuthorizationCodeFlow::new(&client, "http://localhost").authorization_url(None);

        assert_eq!(query(&url, "scope").as_deref(), Some("email"));
        assert!(query(&url, "access_type").is_none());
    }

    #[test]
    fn test_each_flow_has_its_own_challenge() {
        let client = OAuthClient::new("cid", Provider::google().unwrap());
        let first = AuthorizationCodeFlow::new(&client, "http://localhost");
        let second = AuthorizationCodeFlow::new(&client, "http://localhost");
        assert_ne!(first.pkce.verifier(), second.pkce.verifier());
        assert_eq!(first.redirect_uri(), "http://localhost");
    }
}
