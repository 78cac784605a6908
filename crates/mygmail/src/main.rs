//! `mygmail` - send Gmail messages and drafts from the command line.
//!
//! Credentials come from a Google OAuth client secret file; the user token
//! is stored under `~/.credentials` and refreshed as needed.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod cli;
mod config;

use anyhow::{Context, Result, bail};
use clap::Parser;
use cli::{Cli, Command, CommonOpts, ComposeArgs};
use config::Settings;
use mygmail_api::{
    RawMessage, create_draft, create_message, create_message_with_attachment,
    initialize_service, send_message,
};
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "mygmail=info,mygmail_api=info,mygmail_oauth=info";

fn init_logging(opts: &CommonOpts) {
    let fallback = match (opts.quiet, opts.verbose) {
        (true, _) => "error".to_string(),
        (false, 0) => DEFAULT_FILTER.to_string(),
        (false, 1) => DEFAULT_FILTER.replace("=info", "=debug"),
        (false, _) => DEFAULT_FILTER.replace("=info", "=trace"),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| fallback.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(&cli.common);

    let settings_path = cli
        .common
        .config
        .clone()
        .unwrap_or_else(Settings::default_path);
    let config = Settings::load(&settings_path)?.resolve(&cli.common);

    let message = match &cli.command {
        Command::Auth => None,
        Command::Send(args) | Command::Draft(args) => Some(compose(args)?),
    };

    let service = initialize_service(
        &config.scopes,
        &config.client_secret_file,
        &config.application_name,
        &config.auth,
    )
    .await
    .with_context(|| {
        format!(
            "obtaining credentials with {}",
            config.client_secret_file.display()
        )
    })?;
    debug!(
        "{} acting as {} via {}",
        config.application_name,
        config.user_id,
        service.base_url()
    );

    let ok = match (&cli.command, message) {
        (Command::Send(_), Some(message)) => send_message(&service, &config.user_id, &message)
            .await
            .context("sending message")?
            .is_some(),
        (Command::Draft(_), Some(message)) => create_draft(&service, &config.user_id, &message)
            .await
            .context("creating draft")?
            .is_some(),
        _ => {
            info!(
                "Authorized; credentials stored at {}",
                service.credentials().store().path().display()
            );
            true
        }
    };

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

fn compose(args: &ComposeArgs) -> Result<RawMessage> {
    let text = match (&args.body, &args.body_file) {
        (Some(body), _) => body.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?,
        (None, None) => bail!("a message body is required"),
    };

    let message = match &args.attach {
        None => create_message(&args.from, &args.to, &args.subject, &text)?,
        Some(path) => {
            let filename = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .with_context(|| format!("{} is not a file", path.display()))?;
            let dir = path.parent().unwrap_or_else(|| std::path::Path::new(""));
            create_message_with_attachment(&args.from, &args.to, &args.subject, &text, dir, &filename)?
        }
    };
    Ok(message)
}
