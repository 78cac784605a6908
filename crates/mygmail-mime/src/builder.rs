//! Outgoing message construction.

use crate::attachment::Attachment;
use crate::content_type::ContentType;
use crate::encoding::{encode_quoted_printable, is_7bit_safe, to_crlf};
use crate::error::Result;
use crate::header::Headers;
use crate::message::{Message, Part, TransferEncoding};
use rand::Rng;
use rand::distributions::Alphanumeric;

const BOUNDARY_PREFIX: &str = "mygmail-";
const BOUNDARY_RANDOM_LEN: usize = 24;

/// Builder for outgoing messages.
///
/// Without attachments the result is a single `text/plain` message; with
/// attachments it is `multipart/mixed` with the text body first.
#[derive(Debug, Clone, Default)]
pub struct MessageBuilder {
    from: Option<String>,
    to: Option<String>,
    subject: Option<String>,
    text: String,
    attachments: Vec<Attachment>,
    date: Option<String>,
}

impl MessageBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the sender. Non-ASCII display names are RFC 2047 encoded.
    #[must_use]
    pub fn from(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }

    /// Sets the recipient list.
    #[must_use]
    pub fn to(mut self, to: impl Into<String>) -> Self {
        self.to = Some(to.into());
        self
    }

    /// Sets the subject. Non-ASCII subjects are RFC 2047 encoded.
    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Sets the plain text body.
    #[must_use]
    pub fn text_body(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Adds an attachment.
    #[must_use]
    pub fn attach(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Overrides the `Date` header, which otherwise is the current local time.
    #[must_use]
    pub fn date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    /// Builds the message.
    ///
    /// # Errors
    ///
    /// Returns an error if a header value cannot be encoded.
    pub fn build(self) -> Result<Message> {
        let (text_headers, text_body) = text_entity(&self.text);
        let mut headers = Headers::new();

        if self.attachments.is_empty() {
            let mut text_headers = text_headers.iter();
            if let Some((name, value)) = text_headers.next() {
                headers.add(name, value);
            }
            headers.add("mime-version", "1.0");
            for (name, value) in text_headers {
                headers.add(name, value);
            }
            self.add_envelope(&mut headers)?;
            return Ok(Message::single_part(headers, text_body));
        }

        headers.add(
            "content-type",
            ContentType::multipart_mixed(generate_boundary()).to_string(),
        );
        headers.add("mime-version", "1.0");
        self.add_envelope(&mut headers)?;

        let mut parts = Vec::with_capacity(self.attachments.len() + 1);
        parts.push(Part::new(text_headers, text_body));
        parts.extend(self.attachments.iter().map(Attachment::to_part));

        Ok(Message::multipart(headers, parts))
    }

    fn add_envelope(&self, headers: &mut Headers) -> Result<()> {
        if let Some(to) = &self.to {
            headers.add("to", Headers::encode_addresses(to)?);
        }
        if let Some(from) = &self.from {
            headers.add("from", Headers::encode_addresses(from)?);
        }
        if let Some(subject) = &self.subject {
            headers.add("subject", Headers::encode_value(subject)?);
        }
        let date = self
            .date
            .clone()
            .unwrap_or_else(|| chrono::Local::now().to_rfc2822());
        headers.add("date", date);
        Ok(())
    }
}

/// Headers and wire body for a UTF-8 text entity.
fn text_entity(text: &str) -> (Headers, Vec<u8>) {
    let mut headers = Headers::new();
    headers.add("content-type", ContentType::text_plain().to_string());

    let (encoding, body) = if is_7bit_safe(text) {
        (TransferEncoding::SevenBit, to_crlf(text))
    } else {
        (TransferEncoding::QuotedPrintable, encode_quoted_printable(text))
    };
    headers.add("content-transfer-encoding", encoding.to_string());

    (headers, body.into_bytes())
}

/// Generates a multipart boundary that will not appear in encoded content.
fn generate_boundary() -> String {
    let random: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(BOUNDARY_RANDOM_LEN)
        .map(char::from)
        .collect();
    format!("{BOUNDARY_PREFIX}{random}")
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::needless_collect,
    clippy::similar_names
)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn plain(text: &str) -> Message {
        MessageBuilder::new()
            .from("sender@example.com")
            .to("recipient@example.com")
            .subject("Greetings")
            .text_body(text)
            .build()
            .unwrap()
    }

    #[test]
    fn test_plain_header_order() {
        let message = MessageBuilder::new()
            .from("sender@example.com")
            .to("recipient@example.com")
            .subject("Greetings")
            .text_body("Hello")
            .date("Sun, 18 Oct 2026 10:00:00 +0000")
            .build()
            .unwrap();

        assert_eq!(
            message.render().unwrap(),
            concat!(
                "Content-Type: text/plain; charset=utf-8\r\n",
                "MIME-Version: 1.0\r\n",
                "Content-Transfer-Encoding: 7bit\r\n",
                "To: recipient@example.com\r\n",
                "From: sender@example.com\r\n",
                "Subject: Greetings\r\n",
                "Date: Sun, 18 Oct 2026 10:00:00 +0000\r\n",
                "\r\n",
                "Hello"
            )
        );
    }

    #[test]
    fn test_plain_render_parse() {
        let rendered = plain("line one\nline two\n").render().unwrap();
        let parsed = Message::parse(&rendered).unwrap();

        assert!(!parsed.is_multipart().unwrap());
        assert_eq!(parsed.to().as_deref(), Some("recipient@example.com"));
        assert_eq!(parsed.from().as_deref(), Some("sender@example.com"));
        assert_eq!(parsed.subject().as_deref(), Some("Greetings"));
        assert!(parsed.date().is_some());
        assert_eq!(parsed.body_text().unwrap(), "line one\nline two\n");
    }

    #[test]
    fn test_non_ascii_body_and_subject() {
        let message = MessageBuilder::new()
            .subject("Grüße")
            .text_body("naïve café")
            .build()
            .unwrap();
        let rendered = message.render().unwrap();
        assert!(rendered.is_ascii());
        assert!(rendered.contains("Content-Transfer-Encoding: quoted-printable"));

        let parsed = Message::parse(&rendered).unwrap();
        assert_eq!(parsed.subject().as_deref(), Some("Grüße"));
        assert_eq!(parsed.body_text().unwrap(), "naïve café");
    }

    #[test]
    fn test_carriage_returns_survive() {
        for body in ["a\r\nb", "abc\r", "\r", "one\rtwo\n"] {
            let rendered = plain(body).render().unwrap();
            assert!(rendered.contains("Content-Transfer-Encoding: quoted-printable"));
            let parsed = Message::parse(&rendered).unwrap();
            assert_eq!(parsed.body_text().unwrap(), body);
        }
    }

    #[test]
    fn test_long_subjects_are_folded() {
        for subject in ["x".repeat(1200), "é".repeat(200), "word ".repeat(200).trim_end().to_string()] {
            let rendered = MessageBuilder::new()
                .subject(subject.as_str())
                .build()
                .unwrap()
                .render()
                .unwrap();
            let (head, _) = rendered.split_once("\r\n\r\n").unwrap();

            assert!(head.split("\r\n").all(|line| line.len() <= 78), "{head}");
            assert!(
                head.split([' ', '\r', '\n'])
                    .filter(|word| word.starts_with("=?"))
                    .all(|word| word.len() <= 75)
            );
            let parsed = Message::parse(&rendered).unwrap();
            assert_eq!(parsed.subject().unwrap(), subject);
        }
    }

    #[test]
    fn test_non_ascii_display_names() {
        let message = MessageBuilder::new()
            .from("Zoë Ångström <zoe@example.com>")
            .to("Jürgen <j@example.com>, bob@example.com")
            .text_body("hi")
            .build()
            .unwrap();
        let rendered = message.render().unwrap();
        assert!(rendered.is_ascii());
        assert!(rendered.contains(" <zoe@example.com>\r\n"));

        let parsed = Message::parse(&rendered).unwrap();
        assert_eq!(parsed.from().as_deref(), Some("Zoë Ångström <zoe@example.com>"));
        assert_eq!(
            parsed.to().as_deref(),
            Some("Jürgen <j@example.com>, bob@example.com")
        );
    }

    #[test]
    fn test_attachment_message() {
        let attachment = Attachment::new(
            "photo.png",
            ContentType::new("image", "png"),
            vec![0x89, b'P', b'N', b'G', 0, 1, 2, 255],
        );
        let message = MessageBuilder::new()
            .from("sender@example.com")
            .to("recipient@example.com")
            .subject("Picture")
            .text_body("See attached")
            .attach(attachment.clone())
            .build()
            .unwrap();

        let content_type = message.content_type().unwrap();
        assert_eq!(content_type.essence(), "multipart/mixed");
        assert!(content_type.boundary().unwrap().starts_with(BOUNDARY_PREFIX));

        let parsed = Message::parse(&message.render().unwrap()).unwrap();
        assert_eq!(parsed.parts.len(), 2);
        assert_eq!(parsed.text_part().unwrap(), "See attached");

        let attachments = parsed.attachments();
        assert_eq!(attachments.len(), 1);
        assert_eq!(attachments[0].filename().as_deref(), Some("photo.png"));
        assert_eq!(attachments[0].decode_body().unwrap(), attachment.data);
    }

    #[test]
    fn test_boundaries_differ() {
        assert_ne!(generate_boundary(), generate_boundary());
        assert_eq!(
            generate_boundary().len(),
            BOUNDARY_PREFIX.len() + BOUNDARY_RANDOM_LEN
        );
    }

    proptest! {
        #[test]
        fn prop_plain_body_round_trips(body in "(?s).{0,300}") {
            let parsed = Message::parse(&plain(&body).render().unwrap()).unwrap();
            prop_assert_eq!(parsed.body_text().unwrap(), body);
        }

        #[test]
        fn prop_subject_round_trips(subject in "[^\r\n\t ]([^\r\n]{0,198}[^\r\n\t ])?") {
            let message = MessageBuilder::new().subject(subject.clone()).build().unwrap();
            let parsed = Message::parse(&message.render().unwrap()).unwrap();
            prop_assert_eq!(parsed.subject().unwrap_or_default(), subject);
        }
    }
}
