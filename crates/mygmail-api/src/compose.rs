//! Building API payloads from message fields.

use crate::error::Result;
use crate::types::RawMessage;
use mygmail_mime::encoding::encode_base64_url;
use mygmail_mime::{Attachment, Message, MessageBuilder};
use std::path::Path;
use tracing::debug;

fn encode(message: &Message) -> Result<RawMessage> {
    let rendered = message.render()?;
    debug!("Encoded message of {} bytes", rendered.len());
    Ok(RawMessage::new(encode_base64_url(rendered.as_bytes())))
}

/// Creates a plain text message.
///
/// # Errors
///
/// Returns an error if the message cannot be rendered.
pub fn create_message(
    sender: &str,
    to: &str,
    subject: &str,
    message_text: &str,
) -> Result<RawMessage> {
    let message = MessageBuilder::new()
        .to(to)
        .from(sender)
        .subject(subject)
        .text_body(message_text)
        .build()?;
    encode(&message)
}

/// Creates a message with `file_dir/filename` attached.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the message cannot be
/// rendered.
pub fn create_message_with_attachment(
    sender: &str,
    to: &str,
    subject: &str,
    message_text: &str,
    file_dir: impl AsRef<Path>,
    filename: &str,
) -> Result<RawMessage> {
    let attachment = Attachment::from_file(file_dir, filename)?;
    debug!(
        "Attaching {} as {} ({} bytes)",
        attachment.filename,
        attachment.content_type.essence(),
        attachment.data.len()
    );

    let message = MessageBuilder::new()
        .to(to)
        .from(sender)
        .subject(subject)
        .text_body(message_text)
        .attach(attachment)
        .build()?;
    encode(&message)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_create_message_decodes_to_inputs() {
        let raw = create_message(
            "sender@example.com",
            "recipient@example.com",
            "Hello from mygmail!",
            "Hello world!",
        )
        .unwrap();
        assert!(!raw.raw.contains(['+', '/']));

        let message = Message::parse(&raw.decode().unwrap()).unwrap();
        assert_eq!(message.to().as_deref(), Some("recipient@example.com"));
        assert_eq!(message.from().as_deref(), Some("sender@example.com"));
        assert_eq!(message.subject().as_deref(), Some("Hello from mygmail!"));
        assert_eq!(message.body_text().unwrap(), "Hello world!");
    }

    #[test]
    fn test_create_message_with_attachment() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("data.csv"), "a,b\n1,2\n").unwrap();

        let raw = create_message_with_attachment(
            "sender@example.com",
            "recipient@example.com",
            "Numbers",
            "Attached.",
            dir.path(),
            "data.csv",
        )
        .unwrap();

        let message = Message::parse(&raw.decode().unwrap()).unwrap();
        assert_eq!(message.parts.len(), 2);
        assert_eq!(message.text_part().unwrap(), "Attached.");

        let attachments = message.attachments();
        assert_eq!(attachments.len(), 1);
        assert_eq!(attachments[0].filename().as_deref(), Some("data.csv"));
        assert_eq!(attachments[0].body_text().unwrap(), "a,b\n1,2\n");
    }

    #[test]
    fn test_missing_attachment_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let err = create_message_with_attachment("a", "b", "c", "d", dir.path(), "nope.txt")
            .unwrap_err();
        assert!(matches!(err, Error::Mime(mygmail_mime::Error::Attachment { .. })));
    }
}
