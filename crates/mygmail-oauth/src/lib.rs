//! # mygmail-oauth
//!
//! Google `OAuth2` credentials for the Gmail API.
//!
//! ## Features
//!
//! - **Client secret files**: reads the JSON downloaded from the Google Cloud console
//! - **Consent flow**: Authorization Code Flow with PKCE, redirect captured on a
//!   loopback listener or pasted by hand
//! - **Token storage**: JSON file under `~/.credentials`, owner-only permissions
//! - **Token management**: automatic refresh, expiration and scope checks
//!
//! ## Quick Start
//!
//! ```ignore
//! use mygmail_oauth::{AuthOptions, get_credentials, scope};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let scopes = vec![scope::GMAIL_COMPOSE.to_string()];
//!     let credentials = get_credentials(
//!         &scopes,
//!         "client_secret.json",
//!         "Test MyGmail API",
//!         &AuthOptions::default(),
//!     )
//!     .await?;
//!
//!     // Refreshed transparently when expired
//!     let access_token = credentials.access_token().await?;
//!     Ok(())
//! }
//! ```
//!
//! ### Manual flow
//!
//! ```ignore
//! use mygmail_oauth::{AuthorizationCodeFlow, ClientSecret};
//!
//! let client = ClientSecret::from_file("client_secret.json")?.into_client(&scopes)?;
//! let flow = AuthorizationCodeFlow::new(&client, "http://localhost:8080/");
//! println!("Visit: {}", flow.authorization_url(Some("state")));
//! let token = flow.exchange_code("code_from_redirect").await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod client;
mod credentials;
mod error;
pub mod flow;
pub mod provider;
mod secret;
pub mod token;

pub use client::OAuthClient;
pub use credentials::{Credentials, get_credentials};
pub use error::{Error, Result};
pub use flow::{AuthOptions, AuthorizationCodeFlow, LoopbackReceiver, PkceChallenge, run_flow};
pub use provider::{Provider, scope};
pub use secret::{ClientKind, ClientSecret};
pub use token::{StoredCredential, Token, TokenStore};
