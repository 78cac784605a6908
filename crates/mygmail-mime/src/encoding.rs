//! MIME encoding and decoding utilities.
//!
//! Supports Base64 (standard and URL-safe), Quoted-Printable, RFC 2047
//! header encoding and RFC 2231 parameter encoding.

use crate::error::{Error, Result};
use base64::Engine;
use base64::alphabet;
use base64::engine::general_purpose::{PAD, STANDARD};
use base64::engine::{DecodePaddingMode, GeneralPurpose};
use std::fmt::Write as _;

/// URL-safe alphabet, padded on encode, padding optional on decode.
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    PAD.with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Maximum encoded line length (RFC 2045).
const MAX_LINE_LENGTH: usize = 76;

/// Longest line allowed in a 7bit body (RFC 5322), excluding CRLF.
const MAX_7BIT_LINE: usize = 998;

/// Longest encoded word (RFC 2047 §2).
const MAX_ENCODED_WORD: usize = 75;

/// Plain header words longer than this are sent as encoded words so the
/// header can still be folded.
const MAX_PLAIN_WORD: usize = 76;

/// Encodes data as Base64.
#[must_use]
pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Encodes data as Base64 broken into CRLF-terminated 76 character lines,
/// as required for MIME bodies.
#[must_use]
pub fn encode_base64_wrapped(data: &[u8]) -> String {
    let encoded = STANDARD.encode(data);
    let mut result = String::with_capacity(encoded.len() + encoded.len() / MAX_LINE_LENGTH * 2 + 2);
    for chunk in encoded.as_bytes().chunks(MAX_LINE_LENGTH) {
        // Base64 output is ASCII, so every chunk is valid UTF-8
        result.push_str(&String::from_utf8_lossy(chunk));
        result.push_str("\r\n");
    }
    result
}

/// Decodes Base64 data.
///
/// # Errors
///
/// Returns an error if the input is not valid Base64.
pub fn decode_base64(data: &str) -> Result<Vec<u8>> {
    STANDARD.decode(data).map_err(Into::into)
}

/// Encodes data with the URL-safe Base64 alphabet (RFC 4648 §5).
///
/// This is the form the Gmail API expects in a message's `raw` field.
#[must_use]
pub fn encode_base64_url(data: &[u8]) -> String {
    URL_SAFE_LENIENT.encode(data)
}

/// Decodes URL-safe Base64, with or without padding.
///
/// # Errors
///
/// Returns an error if the input is not valid URL-safe Base64.
pub fn decode_base64_url(data: &str) -> Result<Vec<u8>> {
    URL_SAFE_LENIENT.decode(data.trim()).map_err(Into::into)
}

/// Returns true if `text` can travel as a 7bit body: ASCII only, no NUL or
/// CR, no line longer than 998 characters.
///
/// A CR in the text cannot survive the LF to CRLF conversion of a 7bit body.
#[must_use]
pub fn is_7bit_safe(text: &str) -> bool {
    text.bytes().all(|b| b.is_ascii() && b != 0 && b != b'\r')
        && text
            .split('\n')
            .all(|line| line.trim_end_matches('\r').len() <= MAX_7BIT_LINE)
}

/// Converts bare LF line breaks to CRLF.
#[must_use]
pub fn to_crlf(text: &str) -> String {
    let mut result = String::with_capacity(text.len() + text.len() / 32);
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            result.push_str("\r\n");
        }
        result.push_str(line.strip_suffix('\r').unwrap_or(line));
    }
    result
}

/// Converts CRLF line breaks to LF.
#[must_use]
pub fn from_crlf(text: &str) -> String {
    text.replace("\r\n", "\n")
}

/// Encodes text using Quoted-Printable encoding (RFC 2045).
///
/// Each LF in the input becomes a CRLF hard break and any CR is escaped as
/// `=0D`; long lines get soft breaks so no encoded line exceeds 76
/// characters.
#[must_use]
pub fn encode_quoted_printable(text: &str) -> String {
    let mut result = String::new();

    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            result.push_str("\r\n");
        }
        let line = line.as_bytes();
        let mut line_length = 0;

        for (pos, byte) in line.iter().enumerate() {
            let last = pos + 1 == line.len();
            let mut token = String::with_capacity(3);
            match byte {
                // Printable ASCII except '='
                b'!'..=b'<' | b'>'..=b'~' => token.push(*byte as char),
                // Whitespace at end of line must be encoded
                b' ' | b'\t' if !last => token.push(*byte as char),
                _ => {
                    let _ = write!(token, "={byte:02X}");
                }
            }

            // Leave room for the soft break marker
            if line_length + token.len() > MAX_LINE_LENGTH - 1 {
                result.push_str("=\r\n");
                line_length = 0;
            }
            result.push_str(&token);
            line_length += token.len();
        }
    }

    result
}

/// Decodes Quoted-Printable text (RFC 2045).
///
/// Hard line breaks are kept as they appear in the input.
///
/// # Errors
///
/// Returns an error if the input contains invalid escape sequences or does
/// not decode to UTF-8.
pub fn decode_quoted_printable(text: &str) -> Result<String> {
    String::from_utf8(decode_qp_bytes(text)?).map_err(Into::into)
}

fn decode_qp_bytes(text: &str) -> Result<Vec<u8>> {
    let mut result = Vec::new();
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '=' {
            // Soft line break
            if chars.peek() == Some(&'\r') {
                chars.next();
                if chars.peek() == Some(&'\n') {
                    chars.next();
                    continue;
                }
            } else if chars.peek() == Some(&'\n') {
                chars.next();
                continue;
            }

            // Hex encoded byte
            let hex: String = chars.by_ref().take(2).collect();
            if hex.len() == 2 {
                let byte = u8::from_str_radix(&hex, 16)
                    .map_err(|e| Error::InvalidEncoding(format!("Invalid hex: {e}")))?;
                result.push(byte);
            } else {
                return Err(Error::InvalidEncoding(
                    "Incomplete escape sequence".to_string(),
                ));
            }
        } else {
            let mut buf = [0u8; 4];
            result.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
        }
    }

    Ok(result)
}

/// Encodes a header value using RFC 2047 `B` encoded words.
///
/// Values made of printable ASCII words are returned unchanged. Anything
/// else becomes a run of space separated encoded words, each at most 75
/// characters and each holding whole characters, so the header can be
/// folded between them.
///
/// # Errors
///
/// Returns an error if encoding fails.
pub fn encode_rfc2047(text: &str, charset: &str) -> Result<String> {
    let plain = text
        .chars()
        .all(|c| (c.is_ascii_graphic() || c == ' ') && c != '=' && c != '?');
    if plain && text.split(' ').all(|word| word.len() <= MAX_PLAIN_WORD) {
        return Ok(text.to_string());
    }

    // "=?" charset "?B?" ... "?="
    let room = MAX_ENCODED_WORD.saturating_sub(charset.len() + 7);
    let budget = (room / 4 * 3).max(3);

    let mut words = Vec::new();
    let mut start = 0;
    for (index, ch) in text.char_indices() {
        if index > start && index + ch.len_utf8() - start > budget {
            words.push(&text[start..index]);
            start = index;
        }
    }
    words.push(&text[start..]);

    Ok(words
        .iter()
        .map(|word| format!("=?{charset}?B?{}?=", encode_base64(word.as_bytes())))
        .collect::<Vec<_>>()
        .join(" "))
}

/// Decodes a header value that may contain RFC 2047 encoded words.
///
/// Whitespace between adjacent encoded words is dropped and their bytes are
/// joined before UTF-8 decoding; plain words and their spacing are kept.
///
/// # Errors
///
/// Returns an error if an encoded word is malformed or the decoded bytes are
/// not UTF-8.
pub fn decode_rfc2047(text: &str) -> Result<String> {
    let mut result = String::with_capacity(text.len());
    let mut pending: Vec<u8> = Vec::new();
    let mut in_encoded_run = false;
    let mut rest = text;

    while !rest.is_empty() {
        let gap_end = rest.find(|c: char| !c.is_whitespace()).unwrap_or(rest.len());
        let gap = &rest[..gap_end];
        rest = &rest[gap_end..];

        let word_end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        let word = &rest[..word_end];
        rest = &rest[word_end..];

        match decode_encoded_word(word)? {
            Some(bytes) => {
                if !in_encoded_run {
                    result.push_str(gap);
                }
                pending.extend_from_slice(&bytes);
                in_encoded_run = true;
            }
            None => {
                result.push_str(&String::from_utf8(std::mem::take(&mut pending))?);
                result.push_str(gap);
                result.push_str(word);
                in_encoded_run = false;
            }
        }
    }

    result.push_str(&String::from_utf8(pending)?);
    Ok(result)
}

/// Decodes `=?charset?encoding?text?=`; anything not shaped like an encoded
/// word yields `None`.
fn decode_encoded_word(word: &str) -> Result<Option<Vec<u8>>> {
    let Some(inner) = word
        .strip_prefix("=?")
        .and_then(|inner| inner.strip_suffix("?="))
    else {
        return Ok(None);
    };

    let parts: Vec<&str> = inner.split('?').collect();
    if parts.len() != 3 {
        return Err(Error::InvalidEncoding(
            "Invalid RFC 2047 format".to_string(),
        ));
    }

    let encoding = parts[1].to_uppercase();
    let encoded_text = parts[2];

    match encoding.as_str() {
        "B" => decode_base64(encoded_text).map(Some),
        // Underscore stands for space in Q encoding
        "Q" => decode_qp_bytes(&encoded_text.replace('_', " ")).map(Some),
        _ => Err(Error::InvalidEncoding(format!(
            "Unknown encoding: {encoding}"
        ))),
    }
}

/// Encodes a parameter value per RFC 2231 (`utf-8''%E2%82%AC.txt`).
#[must_use]
pub fn encode_rfc2231(value: &str) -> String {
    let mut result = String::from("utf-8''");
    for byte in value.bytes() {
        if byte.is_ascii_alphanumeric() || b"!#$&+-.^_`|~".contains(&byte) {
            result.push(byte as char);
        } else {
            let _ = write!(result, "%{byte:02X}");
        }
    }
    result
}

/// Decodes an RFC 2231 extended parameter value.
///
/// # Errors
///
/// Returns an error on malformed percent escapes or invalid UTF-8.
pub fn decode_rfc2231(value: &str) -> Result<String> {
    // charset'language'percent-encoded
    let encoded = value.splitn(3, '\'').nth(2).unwrap_or(value);
    let bytes = encoded.as_bytes();
    let mut result = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = encoded
                .get(i + 1..i + 3)
                .ok_or_else(|| Error::InvalidEncoding("Truncated percent escape".into()))?;
            let byte = u8::from_str_radix(hex, 16)
                .map_err(|e| Error::InvalidEncoding(format!("Invalid hex: {e}")))?;
            result.push(byte);
            i += 3;
        } else {
            result.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(result).map_err(Into::into)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;

    #[test]
    fn test_base64_encode_decode() {
        let data = b"Hello, World!";
        let encoded = encode_base64(data);
        assert_eq!(encoded, "SGVsbG8sIFdvcmxkIQ==");

        let decoded = decode_base64(&encoded).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn test_base64_wrapped_lines() {
        let data = vec![0xAB; 200];
        let encoded = encode_base64_wrapped(&data);
        let lines: Vec<&str> = encoded.split("\r\n").filter(|l| !l.is_empty()).collect();
        assert!(lines.iter().all(|l| l.len() <= 76));
        assert_eq!(lines[0].len(), 76);
        assert_eq!(decode_base64(&lines.concat()).unwrap(), data);
    }

    #[test]
    fn test_base64_url_alphabet() {
        // 0xFB 0xFF encodes to "+/8=" in the standard alphabet
        assert_eq!(encode_base64(&[0xFB, 0xFF]), "+/8=");
        assert_eq!(encode_base64_url(&[0xFB, 0xFF]), "-_8=");
        assert_eq!(decode_base64_url("-_8=").unwrap(), vec![0xFB, 0xFF]);
        assert_eq!(decode_base64_url("-_8").unwrap(), vec![0xFB, 0xFF]);
    }

    #[test]
    fn test_7bit_safety() {
        assert!(is_7bit_safe("Hello world!\nSecond line"));
        assert!(!is_7bit_safe("Héllo"));
        assert!(!is_7bit_safe(&"x".repeat(999)));
        assert!(!is_7bit_safe("a\r\nb"));
        assert!(!is_7bit_safe("abc\r"));
    }

    #[test]
    fn test_line_ending_conversion() {
        assert_eq!(to_crlf("a\nb\r\nc"), "a\r\nb\r\nc");
        assert_eq!(from_crlf("a\r\nb"), "a\nb");
    }

    #[test]
    fn test_quoted_printable_encode() {
        let text = "Hello, World!";
        let encoded = encode_quoted_printable(text);
        assert_eq!(encoded, "Hello, World!");

        let text = "Héllo, Wørld!";
        let encoded = encode_quoted_printable(text);
        assert!(encoded.contains("=C3"));
    }

    #[test]
    fn test_quoted_printable_hard_breaks_and_trailing_space() {
        let encoded = encode_quoted_printable("one \ntwo=");
        assert_eq!(encoded, "one=20\r\ntwo=3D");
    }

    #[test]
    fn test_quoted_printable_escapes_carriage_returns() {
        assert_eq!(encode_quoted_printable("a\r\nb"), "a=0D\r\nb");
        assert_eq!(encode_quoted_printable("abc\r"), "abc=0D");
        assert_eq!(decode_quoted_printable("abc=0D").unwrap(), "abc\r");
    }

    #[test]
    fn test_quoted_printable_soft_breaks() {
        let text = "é".repeat(60);
        let encoded = encode_quoted_printable(&text);
        assert!(encoded.split("\r\n").all(|l| l.len() <= 76));
        assert_eq!(decode_quoted_printable(&encoded).unwrap(), text);
    }

    #[test]
    fn test_quoted_printable_decode() {
        let encoded = "Hello, World!";
        let decoded = decode_quoted_printable(encoded).unwrap();
        assert_eq!(decoded, "Hello, World!");

        let encoded = "H=C3=A9llo";
        let decoded = decode_quoted_printable(encoded).unwrap();
        assert_eq!(decoded, "Héllo");
    }

    #[test]
    fn test_quoted_printable_soft_line_break() {
        let encoded = "Hello=\r\nWorld";
        let decoded = decode_quoted_printable(encoded).unwrap();
        assert_eq!(decoded, "HelloWorld");
    }

    #[test]
    fn test_rfc2047_encode() {
        let text = "Hello from MyGmail API!";
        let encoded = encode_rfc2047(text, "utf-8").unwrap();
        assert_eq!(encoded, text);

        let text = "Héllo";
        let encoded = encode_rfc2047(text, "utf-8").unwrap();
        assert!(encoded.starts_with("=?utf-8?B?"));
        assert!(encoded.ends_with("?="));
        assert_eq!(decode_rfc2047(&encoded).unwrap(), text);
    }

    #[test]
    fn test_rfc2047_decode() {
        let encoded = "Hello";
        let decoded = decode_rfc2047(encoded).unwrap();
        assert_eq!(decoded, "Hello");

        let encoded = "=?utf-8?B?SMOpbGxv?=";
        let decoded = decode_rfc2047(encoded).unwrap();
        assert_eq!(decoded, "Héllo");
    }

    #[test]
    fn test_rfc2047_words_stay_short() {
        let text = "é".repeat(200);
        let encoded = encode_rfc2047(&text, "utf-8").unwrap();
        let words: Vec<&str> = encoded.split(' ').collect();

        assert!(words.len() > 1);
        assert!(words.iter().all(|w| w.len() <= 75 && w.starts_with("=?utf-8?B?")));
        assert_eq!(decode_rfc2047(&encoded).unwrap(), text);
    }

    #[test]
    fn test_rfc2047_long_plain_word_is_encoded() {
        let text = "x".repeat(1200);
        let encoded = encode_rfc2047(&text, "utf-8").unwrap();
        assert!(encoded.split(' ').all(|w| w.len() <= 75));
        assert_eq!(decode_rfc2047(&encoded).unwrap(), text);

        let spaced = "word ".repeat(240);
        assert_eq!(encode_rfc2047(&spaced, "utf-8").unwrap(), spaced);
    }

    #[test]
    fn test_rfc2047_mixed_words() {
        assert_eq!(
            decode_rfc2047("Re:  =?utf-8?B?SMOp?=   =?utf-8?B?bGxv?= there").unwrap(),
            "Re:  Héllo there"
        );
        // A character split across two words
        assert_eq!(decode_rfc2047("=?utf-8?B?ww==?= =?utf-8?B?qQ==?=").unwrap(), "é");
        assert!(decode_rfc2047("=?utf-8?B?").is_ok());
        assert!(decode_rfc2047("=?bad?=").is_err());
    }

    #[test]
    fn test_rfc2047_quoted_printable() {
        let encoded = "=?utf-8?Q?H=C3=A9llo_there?=";
        let decoded = decode_rfc2047(encoded).unwrap();
        assert_eq!(decoded, "Héllo there");
    }

    #[test]
    fn test_rfc2231_round_trip() {
        let encoded = encode_rfc2231("résumé 2024.pdf");
        assert_eq!(encoded, "utf-8''r%C3%A9sum%C3%A9%202024.pdf");
        assert_eq!(decode_rfc2231(&encoded).unwrap(), "résumé 2024.pdf");
        assert!(decode_rfc2231("utf-8''%E").is_err());
    }
}
