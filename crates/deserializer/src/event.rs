//! Event type produced by deserializers and the builder that encodes text
//! into event bodies.

use ingest_file::Charset;
use std::collections::BTreeMap;

use crate::{Error, Result};

/// A single pipeline record: string headers plus an opaque body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Event {
    headers: BTreeMap<String, String>,
    body: Vec<u8>,
}

impl Event {
    pub fn new(headers: BTreeMap<String, String>, body: Vec<u8>) -> Self {
        Self { headers, body }
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut BTreeMap<String, String> {
        &mut self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn into_body(self) -> Vec<u8> {
        self.body
    }
}

/// Constructs events from raw bytes or from text in a given charset.
pub struct EventBuilder;

impl EventBuilder {
    pub fn with_body(body: Vec<u8>) -> Event {
        Event::new(BTreeMap::new(), body)
    }

    /// Build an event whose body is `text` encoded in `charset`.
    pub fn with_text(text: &str, charset: Charset) -> Result<Event> {
        Ok(Self::with_body(encode(text, charset)?))
    }

    pub fn with_text_and_headers(
        text: &str,
        charset: Charset,
        headers: BTreeMap<String, String>,
    ) -> Result<Event> {
        Ok(Event::new(headers, encode(text, charset)?))
    }
}

/// Encode `text` in `charset`.
///
/// Characters the charset cannot represent are an error; nothing is
/// substituted.
pub fn encode(text: &str, charset: Charset) -> Result<Vec<u8>> {
    match charset {
        Charset::UsAscii => encode_single_byte(text, charset, 0x7F),
        Charset::Latin1 => encode_single_byte(text, charset, 0xFF),
        Charset::Utf16 => {
            let mut bytes = vec![0xFE, 0xFF];
            bytes.extend(text.encode_utf16().flat_map(u16::to_be_bytes));
            Ok(bytes)
        }
        Charset::Whatwg(encoding) if encoding == encoding_rs::UTF_16LE => {
            Ok(text.encode_utf16().flat_map(u16::to_le_bytes).collect())
        }
        Charset::Whatwg(encoding) if encoding == encoding_rs::UTF_16BE => {
            Ok(text.encode_utf16().flat_map(u16::to_be_bytes).collect())
        }
        Charset::Whatwg(encoding) => {
            if encoding.output_encoding() != encoding {
                return Err(Error::Encoding {
                    charset: charset.name().to_string(),
                    reason: "charset cannot be used for output".to_string(),
                });
            }

            let (bytes, _, had_errors) = encoding.encode(text);
            if had_errors {
                return Err(Error::Encoding {
                    charset: charset.name().to_string(),
                    reason: "text contains unmappable characters".to_string(),
                });
            }
            Ok(bytes.into_owned())
        }
    }
}

fn encode_single_byte(text: &str, charset: Charset, max: u32) -> Result<Vec<u8>> {
    text.chars()
        .map(|c| match u8::try_from(c) {
            Ok(byte) if u32::from(byte) <= max => Ok(byte),
            _ => Err(Error::Encoding {
                charset: charset.name().to_string(),
                reason: format!("character {:?} (U+{:04X}) is not representable", c, c as u32),
            }),
        })
        .collect()
}

/// Fail early if `charset` can never be used by `encode`.
pub(crate) fn ensure_output_charset(charset: Charset) -> Result<()> {
    if let Charset::Whatwg(encoding) = charset {
        let usable = encoding == encoding_rs::UTF_16LE
            || encoding == encoding_rs::UTF_16BE
            || encoding.output_encoding() == encoding;
        if !usable {
            return Err(Error::Config(format!(
                "{} cannot be used as an output charset",
                encoding.name()
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_text_utf8() {
        let event = EventBuilder::with_text("héllo", Charset::utf8()).unwrap();
        assert_eq!(event.body(), "héllo".as_bytes());
        assert!(event.headers().is_empty());
    }

    #[test]
    fn test_with_text_single_byte() {
        let windows_1252 = Charset::Whatwg(encoding_rs::WINDOWS_1252);
        let event = EventBuilder::with_text("café", windows_1252).unwrap();
        assert_eq!(event.body(), b"caf\xE9");
    }

    #[test]
    fn test_with_text_utf16() {
        let le = EventBuilder::with_text("hi", Charset::Whatwg(encoding_rs::UTF_16LE)).unwrap();
        assert_eq!(le.body(), &[0x68, 0x00, 0x69, 0x00]);
        let be = EventBuilder::with_text("hi", Charset::Whatwg(encoding_rs::UTF_16BE)).unwrap();
        assert_eq!(be.body(), &[0x00, 0x68, 0x00, 0x69]);
    }

    #[test]
    fn test_unmappable_character_fails() {
        let windows_1252 = Charset::Whatwg(encoding_rs::WINDOWS_1252);
        let result = EventBuilder::with_text("snow ☃", windows_1252);
        assert!(matches!(
            result,
            Err(Error::Encoding { ref charset, .. }) if charset == "windows-1252"
        ));
    }

    #[test]
    fn test_replacement_encoding_rejected() {
        let replacement = Charset::Whatwg(encoding_rs::REPLACEMENT);
        assert!(encode("x", replacement).is_err());
        assert!(ensure_output_charset(replacement).is_err());
        assert!(ensure_output_charset(Charset::Whatwg(encoding_rs::UTF_16BE)).is_ok());
        assert!(ensure_output_charset(Charset::utf8()).is_ok());
        assert!(ensure_output_charset(Charset::Latin1).is_ok());
    }

    #[test]
    fn test_us_ascii_rejects_non_ascii() {
        assert_eq!(encode("plain", Charset::UsAscii).unwrap(), b"plain");
        let result = encode("é", Charset::UsAscii);
        assert!(matches!(
            result,
            Err(Error::Encoding { ref charset, .. }) if charset == "US-ASCII"
        ));
    }

    #[test]
    fn test_latin1_is_not_windows_1252() {
        assert_eq!(encode("\u{0080}", Charset::Latin1).unwrap(), vec![0x80]);
        assert_eq!(encode("café", Charset::Latin1).unwrap(), b"caf\xE9");
        assert!(matches!(
            encode("€", Charset::Latin1),
            Err(Error::Encoding { ref charset, .. }) if charset == "ISO-8859-1"
        ));
    }

    #[test]
    fn test_utf16_writes_big_endian_with_bom() {
        assert_eq!(
            encode("hi", Charset::Utf16).unwrap(),
            vec![0xFE, 0xFF, 0x00, 0x68, 0x00, 0x69]
        );
    }

    #[test]
    fn test_headers_are_mutable() {
        let mut headers = BTreeMap::new();
        headers.insert("file".to_string(), "a.txt".to_string());
        let mut event =
            EventBuilder::with_text_and_headers("x", Charset::utf8(), headers).unwrap();
        event
            .headers_mut()
            .insert("offset".to_string(), "0".to_string());
        assert_eq!(event.headers().len(), 2);
        assert_eq!(event.into_body(), b"x".to_vec());
    }
}
