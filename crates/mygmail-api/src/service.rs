//! Authorized Gmail REST client.

use crate::error::{Error, Result};
use crate::types::{ApiErrorBody, Draft, DraftRequest, MessageRef, RawMessage};
use mygmail_oauth::{AuthOptions, Credentials, get_credentials};
use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Gmail REST API root.
pub const GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// The two Gmail operations this crate drives.
pub trait GmailApi {
    /// Stores `message` as a new draft for `user_id`.
    fn create_draft(
        &self,
        user_id: &str,
        message: &RawMessage,
    ) -> impl Future<Output = Result<Draft>> + Send;

    /// Sends `message` on behalf of `user_id`.
    fn send_message(
        &self,
        user_id: &str,
        message: &RawMessage,
    ) -> impl Future<Output = Result<MessageRef>> + Send;
}

/// Gmail client authorized with stored user credentials.
#[derive(Debug)]
pub struct GmailService {
    http: Client,
    credentials: Credentials,
    base_url: String,
}

impl GmailService {
    /// Creates a client sending `application_name` as its user agent.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(credentials: Credentials, application_name: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(application_name)
            .build()?;
        Ok(Self {
            http,
            credentials,
            base_url: GMAIL_API_BASE.to_string(),
        })
    }

    /// Points the client at another API root.
    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Returns the API root in use.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the credentials requests are authorized with.
    #[must_use]
    pub const fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let token = self.credentials.access_token().await?;
        let url = format!("{}{path}", self.base_url);
        debug!("POST {url}");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&token)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&text)
                .map(|body| body.error.message)
                .unwrap_or(text);
            return Err(Error::Api {
                status: status.as_u16(),
                message,
            });
        }

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(Into::into)
    }
}

/// Escapes a user id for use as a path segment.
fn user_path(user_id: &str) -> String {
    let mut escaped = String::with_capacity(user_id.len());
    for byte in user_id.bytes() {
        if byte.is_ascii_alphanumeric() || b"-._~@+".contains(&byte) {
            escaped.push(char::from(byte));
        } else {
            escaped.push_str(&format!("%{byte:02X}"));
        }
    }
    format!("/users/{escaped}")
}

impl GmailApi for GmailService {
    async fn create_draft(&self, user_id: &str, message: &RawMessage) -> Result<Draft> {
        let request = DraftRequest {
            message: message.clone(),
        };
        self.post(&format!("{}/drafts", user_path(user_id)), &request)
            .await
    }

    async fn send_message(&self, user_id: &str, message: &RawMessage) -> Result<MessageRef> {
        self.post(&format!("{}/messages/send", user_path(user_id)), message)
            .await
    }
}

/// Builds an authorized Gmail client, running the consent flow if no usable
/// credential is stored.
///
/// # Errors
///
/// Returns an error if credentials cannot be obtained.
pub async fn initialize_service(
    scopes: &[String],
    client_secret_file: impl AsRef<Path>,
    application_name: &str,
    options: &AuthOptions,
) -> Result<GmailService> {
    let credentials =
        get_credentials(scopes, client_secret_file, application_name, options).await?;
    GmailService::new(credentials, application_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_path() {
        assert_eq!(user_path("me"), "/users/me");
        assert_eq!(user_path("a.b+c@example.com"), "/users/a.b+c@example.com");
        assert_eq!(user_path("a/b c"), "/users/a%2Fb%20c");
    }
}
