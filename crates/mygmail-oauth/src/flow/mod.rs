//! Interactive consent: authorization URL, redirect capture and code exchange.

mod code;
mod loopback;
mod pkce;
mod run;

pub use code::AuthorizationCodeFlow;
pub use loopback::{LoopbackReceiver, Redirect};
pub use pkce::PkceChallenge;
pub use run::{AuthOptions, DEFAULT_AUTH_HOST, DEFAULT_AUTH_PORTS, run_flow};
