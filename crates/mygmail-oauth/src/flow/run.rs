//! Interactive consent flow for command-line tools.

use super::{AuthorizationCodeFlow, LoopbackReceiver, Redirect};
use crate::client::OAuthClient;
use crate::error::{Error, Result};
use crate::token::{Token, TokenStore};
use rand::Rng;
use rand::distributions::Alphanumeric;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};
use url::Url;

/// Host the redirect listener binds to by default.
pub const DEFAULT_AUTH_HOST: &str = "localhost";

/// Ports tried in order for the redirect listener.
pub const DEFAULT_AUTH_PORTS: [u16; 2] = [8080, 8090];

/// Redirect URI used when no local listener runs; the user copies the
/// resulting address (or just the code) back into the terminal.
const MANUAL_REDIRECT_URI: &str = "http://localhost";

/// Options controlling how credentials are obtained.
#[derive(Debug, Clone)]
pub struct AuthOptions {
    /// Where the token is stored; `None` uses `~/.credentials/gmail-quickstart.json`.
    pub credential_path: Option<PathBuf>,
    /// Do not run a local web server; ask for the code on stdin instead.
    pub noauth_local_webserver: bool,
    /// Host name for the redirect listener.
    pub auth_host_name: String,
    /// Ports tried in order for the redirect listener.
    pub auth_host_ports: Vec<u16>,
    /// Try to open the authorization URL in a browser.
    pub open_browser: bool,
    /// How long to wait for the browser redirect.
    pub timeout: Duration,
}

impl Default for AuthOptions {
    fn default() -> Self {
        Self {
            credential_path: None,
            noauth_local_webserver: false,
            auth_host_name: DEFAULT_AUTH_HOST.to_string(),
            auth_host_ports: DEFAULT_AUTH_PORTS.to_vec(),
            open_browser: true,
            timeout: Duration::from_secs(300),
        }
    }
}

impl AuthOptions {
    /// Resolves the token store for these options.
    ///
    /// # Errors
    ///
    /// Returns an error if no path is set and the home directory is unknown.
    pub fn token_store(&self) -> Result<TokenStore> {
        self.credential_path
            .as_ref()
            .map_or_else(TokenStore::at_default_path, |path| {
                Ok(TokenStore::new(path.clone()))
            })
    }
}

/// Runs the consent flow for `client` and returns the new token.
///
/// With a local web server (the default) the redirect is captured on the
/// loopback interface; if no port can be bound, or `noauth_local_webserver`
/// is set, the user pastes the code instead.
///
/// # Errors
///
/// Returns an error if the user declines, the redirect is invalid or the code
/// exchange fails.
pub async fn run_flow(client: &OAuthClient, options: &AuthOptions) -> Result<Token> {
    let receiver = if options.noauth_local_webserver {
        None
    } else {
        match LoopbackReceiver::bind(&options.auth_host_name, &options.auth_host_ports).await {
            Ok(receiver) => Some(receiver),
            Err(e) => {
                warn!("{e}; falling back to manual code entry");
                None
            }
        }
    };

    let token = match receiver {
        Some(receiver) => {
            let flow = AuthorizationCodeFlow::new(client, receiver.redirect_uri());
            let state = random_state();
            let url = flow.authorization_url(Some(&state));
            debug!("Waiting for redirect to {}", flow.redirect_uri());

            if options.open_browser {
                open_browser(&url);
            }
            eprintln!("Visit the following URL to authorize this application:\n\n    {url}\n");
            eprintln!(
                "If your browser is on a different machine, rerun with --noauth-local-webserver\n"
            );

            let code = receiver.receive(Some(&state), options.timeout).await?;
            flow.exchange_code(&code).await?
        }
        None => {
            let flow = AuthorizationCodeFlow::new(client, MANUAL_REDIRECT_URI);
            let url = flow.authorization_url(None);

            eprintln!("Go to the following link in your browser:\n\n    {url}\n");
            let code = prompt_for_code().await?;
            flow.exchange_code(&code).await?
        }
    };

    info!("Authentication successful");
    Ok(token)
}

fn random_state() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

fn open_browser(url: &Url) {
    if let Err(e) = opener::open_browser(url.as_str()) {
        warn!("Could not open a browser: {e}");
    }
}

async fn prompt_for_code() -> Result<String> {
    eprint!("Enter verification code (or the full redirected URL): ");
    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await?;
    code_from_input(&line)
}

/// Accepts either a bare authorization code or the URL the browser was
/// redirected to.
fn code_from_input(input: &str) -> Result<String> {
    let input = input.trim();
    if input.is_empty() {
        return Err(Error::InvalidResponse("no verification code entered".into()));
    }
    match Url::parse(input) {
        Ok(url) => Redirect::from_url(&url).into_code(None),
        Err(_) => Ok(input.to_string()),
    }
}
