//! # mygmail-mime
//!
//! MIME construction and parsing for outgoing Gmail messages.
//!
//! ## Features
//!
//! - **Message generation**: plain text messages and `multipart/mixed`
//!   messages with file attachments
//! - **Message parsing**: single-part and multipart documents, for checking
//!   what was built
//! - **Encoding/Decoding**: Base64 (standard and URL-safe), Quoted-Printable,
//!   RFC 2047 headers, RFC 2231 parameters
//! - **Attachments**: content type guessed from the file name
//!
//! ## Quick Start
//!
//! ### Building a message
//!
//! ```ignore
//! use mygmail_mime::MessageBuilder;
//!
//! let message = MessageBuilder::new()
//!     .from("sender@example.com")
//!     .to("recipient@example.com")
//!     .subject("Test Message")
//!     .text_body("Hello, World!")
//!     .build()?;
//!
//! println!("{}", message.render()?);
//! ```
//!
//! ### Attaching a file
//!
//! ```ignore
//! use mygmail_mime::{Attachment, MessageBuilder};
//!
//! let attachment = Attachment::from_file("/tmp", "document.pdf")?;
//!
//! let message = MessageBuilder::new()
//!     .from("sender@example.com")
//!     .to("recipient@example.com")
//!     .subject("Document")
//!     .text_body("Please find the attached document.")
//!     .attach(attachment)
//!     .build()?;
//! ```
//!
//! ### Parsing
//!
//! ```ignore
//! use mygmail_mime::Message;
//!
//! let message = Message::parse(&raw)?;
//! for part in message.attachments() {
//!     println!("{:?}", part.filename());
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod attachment;
mod builder;
mod content_type;
mod disposition;
mod error;
mod header;
mod message;

pub mod encoding;

pub use attachment::{Attachment, AttachmentKind, guess_content_type};
pub use builder::MessageBuilder;
pub use content_type::ContentType;
pub use disposition::ContentDisposition;
pub use error::{Error, Result};
pub use header::Headers;
pub use message::{Message, Part, TransferEncoding};
