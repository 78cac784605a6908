//! Command-line arguments.

use clap::{ArgGroup, Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Authorize with Gmail, then send messages or save them as drafts.",
    propagate_version = true
)]
pub struct Cli {
    #[command(flatten)]
    pub common: CommonOpts,
    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by every subcommand. Unset values fall back to the
/// config file, then to built-in defaults.
#[derive(Debug, Clone, Default, Args)]
pub struct CommonOpts {
    /// Config file (default: <config dir>/mygmail/config.json).
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,
    /// OAuth client secret JSON downloaded from the Google Cloud console.
    #[arg(long, value_name = "PATH", env = "MYGMAIL_CLIENT_SECRET", global = true)]
    pub client_secret: Option<PathBuf>,
    /// Scope to request; short names such as `gmail.send` are expanded.
    #[arg(long = "scope", value_name = "SCOPE", global = true)]
    pub scopes: Vec<String>,
    /// Name sent as the user agent.
    #[arg(long, value_name = "NAME", global = true)]
    pub application_name: Option<String>,
    /// Where the token is stored.
    #[arg(long, value_name = "PATH", global = true)]
    pub credential_path: Option<PathBuf>,
    /// Gmail user id; `me` is the authorized user.
    #[arg(long, value_name = "ID", global = true)]
    pub user_id: Option<String>,
    #[arg(short, long, action = clap::ArgAction::SetTrue, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
    /// Paste the authorization code instead of running a local web server.
    #[arg(long, global = true)]
    pub noauth_local_webserver: bool,
    /// Host name for the local redirect server.
    #[arg(long, value_name = "HOST", global = true)]
    pub auth_host_name: Option<String>,
    /// Port for the local redirect server; repeat to try several.
    #[arg(long = "auth-host-port", value_name = "PORT", global = true)]
    pub auth_host_ports: Vec<u16>,
    /// Print the authorization URL instead of opening a browser.
    #[arg(long, global = true)]
    pub no_browser: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Obtain and store credentials, then exit.
    Auth,
    /// Send a message.
    Send(ComposeArgs),
    /// Save a message as a draft.
    Draft(ComposeArgs),
}

#[derive(Debug, Clone, Args)]
#[command(group(ArgGroup::new("text").required(true).args(["body", "body_file"])))]
pub struct ComposeArgs {
    /// Sender address.
    #[arg(long)]
    pub from: String,
    /// Recipient address(es).
    #[arg(long)]
    pub to: String,
    #[arg(long, default_value = "")]
    pub subject: String,
    /// Message text.
    #[arg(long)]
    pub body: Option<String>,
    /// Read the message text from a file.
    #[arg(long, value_name = "PATH")]
    pub body_file: Option<PathBuf>,
    /// File to attach.
    #[arg(long, value_name = "PATH")]
    pub attach: Option<PathBuf>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_send_args() {
        let cli = Cli::try_parse_from([
            "mygmail",
            "send",
            "--from",
            "a@example.com",
            "--to",
            "b@example.com",
            "--subject",
            "Hi",
            "--body",
            "Hello",
            "--attach",
            "/tmp/report.pdf",
            "-vv",
        ])
        .unwrap();

        assert_eq!(cli.common.verbose, 2);
        let Command::Send(args) = cli.command else {
            panic!("expected send");
        };
        assert_eq!(args.to, "b@example.com");
        assert_eq!(args.body.as_deref(), Some("Hello"));
        assert_eq!(args.attach, Some(PathBuf::from("/tmp/report.pdf")));
    }

    #[test]
    fn test_body_is_required() {
        let err = Cli::try_parse_from(["mygmail", "draft", "--from", "a", "--to", "b"]);
        assert!(err.is_err());

        let err = Cli::try_parse_from([
            "mygmail", "draft", "--from", "a", "--to", "b", "--body", "x", "--body-file", "y",
        ]);
        assert!(err.is_err());
    }

    #[test]
    fn test_flow_flags() {
        let cli = Cli::try_parse_from([
            "mygmail",
            "--noauth-local-webserver",
            "--auth-host-port",
            "9000",
            "--auth-host-port",
            "9001",
            "--scope",
            "gmail.send",
            "auth",
        ])
        .unwrap();

        assert!(cli.common.noauth_local_webserver);
        assert_eq!(cli.common.auth_host_ports, vec![9000, 9001]);
        assert_eq!(cli.common.scopes, vec!["gmail.send"]);
        assert!(matches!(cli.command, Command::Auth));
    }
}
