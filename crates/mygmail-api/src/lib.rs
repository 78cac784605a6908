//! # mygmail-api
//!
//! Gmail REST client for creating drafts and sending messages.
//!
//! ## Quick Start
//!
//! ```ignore
//! use mygmail_api::{USER_ME, create_message, initialize_service, send_message};
//! use mygmail_oauth::{AuthOptions, scope};
//!
//! let scopes = vec![scope::GMAIL_COMPOSE.to_string()];
//! let service = initialize_service(&scopes, "client_secret.json", "mygmail", &AuthOptions::default()).await?;
//!
//! let message = create_message("me@example.com", "you@example.com", "Hello", "Hello world!")?;
//! if send_message(&service, USER_ME, &message).await?.is_none() {
//!     eprintln!("not sent");
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod actions;
mod compose;
mod error;
mod service;
mod types;

pub use actions::{create_draft, send_message};
pub use compose::{create_message, create_message_with_attachment};
pub use error::{Error, Result};
pub use service::{GMAIL_API_BASE, GmailApi, GmailService, initialize_service};
pub use types::{ApiErrorBody, ApiErrorDetail, Draft, DraftRequest, MessageRef, RawMessage, USER_ME};
