//! Config file and option resolution.

use crate::cli::CommonOpts;
use anyhow::{Context, Result};
use mygmail_oauth::AuthOptions;
use mygmail_oauth::flow::{DEFAULT_AUTH_HOST, DEFAULT_AUTH_PORTS};
use mygmail_oauth::scope;
use serde::Deserialize;
use std::path::{Path, PathBuf};

const SCOPE_PREFIX: &str = "https://www.googleapis.com/auth/";

/// Values read from `config.json`. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub client_secret_file: Option<PathBuf>,
    pub scopes: Option<Vec<String>>,
    pub application_name: Option<String>,
    pub credential_path: Option<PathBuf>,
    pub user_id: Option<String>,
    pub auth_host_name: Option<String>,
    pub auth_host_ports: Option<Vec<u16>>,
}

/// Effective configuration after applying CLI, file and defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub client_secret_file: PathBuf,
    pub scopes: Vec<String>,
    pub application_name: String,
    pub user_id: String,
    pub auth: AuthOptions,
}

impl Settings {
    /// `<config dir>/mygmail/config.json`
    #[must_use]
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("mygmail")
            .join("config.json")
    }

    /// Loads settings; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_str(&contents).with_context(|| format!("parsing {}", path.display()))
    }

    /// Layers CLI options over these settings.
    #[must_use]
    pub fn resolve(self, opts: &CommonOpts) -> Config {
        let scopes = if opts.scopes.is_empty() {
            self.scopes
                .unwrap_or_else(|| vec![scope::GMAIL_COMPOSE.to_string()])
        } else {
            opts.scopes.clone()
        };

        let auth = AuthOptions {
            credential_path: opts.credential_path.clone().or(self.credential_path),
            noauth_local_webserver: opts.noauth_local_webserver,
            auth_host_name: opts
                .auth_host_name
                .clone()
                .or(self.auth_host_name)
                .unwrap_or_else(|| DEFAULT_AUTH_HOST.to_string()),
            auth_host_ports: if opts.auth_host_ports.is_empty() {
                self.auth_host_ports
                    .unwrap_or_else(|| DEFAULT_AUTH_PORTS.to_vec())
            } else {
                opts.auth_host_ports.clone()
            },
            open_browser: !opts.no_browser,
            ..AuthOptions::default()
        };

        Config {
            client_secret_file: opts
                .client_secret
                .clone()
                .or(self.client_secret_file)
                .unwrap_or_else(|| PathBuf::from("client_secret.json")),
            scopes: scopes.iter().map(|s| expand_scope(s)).collect(),
            application_name: opts
                .application_name
                .clone()
                .or(self.application_name)
                .unwrap_or_else(|| "mygmail".to_string()),
            user_id: opts
                .user_id
                .clone()
                .or(self.user_id)
                .unwrap_or_else(|| mygmail_api::USER_ME.to_string()),
            auth,
        }
    }
}

/// Expands `gmail.send` to its full URL; full URLs pass through.
fn expand_scope(scope: &str) -> String {
    if scope.contains("://") {
        scope.to_string()
    } else {
        format!("{SCOPE_PREFIX}{scope}")
    }
}
