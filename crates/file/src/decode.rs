//! Character decoding with byte-exact position tracking.

use anyhow::{Context, Result};
use encoding_rs::{Decoder, DecoderResult, Encoding};
use std::collections::VecDeque;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::str::FromStr;

use crate::{Charset, DEFAULT_BUFFER_SIZE};

/// What a source does when the input bytes are not valid in its charset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodeErrorPolicy {
    /// Fail the read with an error
    #[default]
    Fail,
    /// Substitute U+FFFD for the malformed sequence
    Replace,
    /// Drop the malformed sequence
    Ignore,
}

impl DecodeErrorPolicy {
    pub fn as_str(&self) -> &str {
        match self {
            DecodeErrorPolicy::Fail => "FAIL",
            DecodeErrorPolicy::Replace => "REPLACE",
            DecodeErrorPolicy::Ignore => "IGNORE",
        }
    }
}

impl FromStr for DecodeErrorPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FAIL" => Ok(DecodeErrorPolicy::Fail),
            "REPLACE" => Ok(DecodeErrorPolicy::Replace),
            "IGNORE" => Ok(DecodeErrorPolicy::Ignore),
            _ => anyhow::bail!(
                "Unknown decode error policy: {s} (expected FAIL, REPLACE or IGNORE)"
            ),
        }
    }
}

impl std::fmt::Display for DecodeErrorPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decodes characters one at a time from a seekable byte stream.
///
/// `position` is always the offset of the next byte the decoder has not
/// consumed. Some charsets map one byte sequence to several characters; those
/// are queued in `pending` and `tell()` keeps reporting the start of the
/// sequence until all of them have been handed out.
///
/// A failed read leaves the stream at the start of the character that
/// failed, so retrying fails again at the same offset.
///
/// Seeking resets the decoder, so shift state of stateful encodings
/// (ISO-2022-JP) is not carried across a seek.
pub struct CharDecoder<R> {
    inner: BufReader<R>,
    charset: Charset,
    decoder: Option<Decoder>,
    utf16_order: Option<&'static Encoding>,
    policy: DecodeErrorPolicy,
    position: u64,
    sequence_start: u64,
    pending: VecDeque<char>,
    finished: bool,
}

impl<R: Read + Seek> CharDecoder<R> {
    /// Wrap `inner`, which must be positioned at byte offset 0.
    pub fn new(inner: R, charset: Charset, policy: DecodeErrorPolicy) -> Self {
        Self::with_capacity(DEFAULT_BUFFER_SIZE, inner, charset, policy)
    }

    pub fn with_capacity(
        capacity: usize,
        inner: R,
        charset: Charset,
        policy: DecodeErrorPolicy,
    ) -> Self {
        Self {
            inner: BufReader::with_capacity(capacity, inner),
            charset,
            decoder: None,
            utf16_order: None,
            policy,
            position: 0,
            sequence_start: 0,
            pending: VecDeque::new(),
            finished: false,
        }
    }

    pub fn charset(&self) -> Charset {
        self.charset
    }

    pub fn policy(&self) -> DecodeErrorPolicy {
        self.policy
    }

    /// Byte offset of the next character boundary.
    pub fn tell(&self) -> u64 {
        if self.pending.is_empty() {
            self.position
        } else {
            self.sequence_start
        }
    }

    /// Move to byte offset `position`, which must be a character boundary.
    pub fn seek(&mut self, position: u64) -> Result<()> {
        self.inner
            .seek(SeekFrom::Start(position))
            .with_context(|| format!("Failed to seek to byte {position}"))?;

        self.position = position;
        self.sequence_start = position;
        self.pending.clear();
        self.finished = false;
        self.decoder = None;
        Ok(())
    }

    /// Read the next character, or `None` at end of stream.
    pub fn read_char(&mut self) -> Result<Option<char>> {
        if let Some(c) = self.pending.pop_front() {
            return Ok(Some(c));
        }
        if self.finished {
            return Ok(None);
        }

        match self.charset {
            Charset::UsAscii | Charset::Latin1 => self.read_single_byte(),
            Charset::Whatwg(encoding) => self.read_decoded(encoding),
            Charset::Utf16 => {
                let encoding = self.utf16_byte_order()?;
                self.read_decoded(encoding)
            }
        }
    }

    fn malformed(&self, start: u64) -> anyhow::Error {
        anyhow::anyhow!(
            "Malformed {} input at byte offset {}",
            self.charset.name(),
            start
        )
    }

    fn read_single_byte(&mut self) -> Result<Option<char>> {
        loop {
            let start = self.position;
            let byte = self
                .inner
                .fill_buf()
                .context("Failed to read input")?
                .first()
                .copied();
            let Some(byte) = byte else {
                self.finished = true;
                return Ok(None);
            };

            let c = if self.charset == Charset::UsAscii && !byte.is_ascii() {
                match self.policy {
                    // The byte stays unconsumed
                    DecodeErrorPolicy::Fail => return Err(self.malformed(start)),
                    DecodeErrorPolicy::Replace => {
                        tracing::warn!(
                            "Replaced malformed {} input at byte offset {}",
                            self.charset.name(),
                            start
                        );
                        char::REPLACEMENT_CHARACTER
                    }
                    DecodeErrorPolicy::Ignore => {
                        tracing::debug!(
                            "Skipped malformed {} input at byte offset {}",
                            self.charset.name(),
                            start
                        );
                        self.inner.consume(1);
                        self.position += 1;
                        continue;
                    }
                }
            } else {
                // ISO-8859-1 bytes are the first 256 code points
                char::from(byte)
            };

            self.inner.consume(1);
            self.position += 1;
            self.sequence_start = start;
            return Ok(Some(c));
        }
    }

    /// Byte order of a `UTF-16` stream, taken from its byte order mark.
    fn utf16_byte_order(&mut self) -> Result<&'static Encoding> {
        if let Some(encoding) = self.utf16_order {
            return Ok(encoding);
        }

        let mut bom = Vec::with_capacity(2);
        self.inner
            .seek(SeekFrom::Start(0))
            .context("Failed to read byte order mark")?;
        (&mut self.inner)
            .take(2)
            .read_to_end(&mut bom)
            .context("Failed to read byte order mark")?;
        self.inner
            .seek(SeekFrom::Start(self.position))
            .with_context(|| format!("Failed to seek to byte {}", self.position))?;

        let encoding = if bom == [0xFF, 0xFE] {
            encoding_rs::UTF_16LE
        } else {
            encoding_rs::UTF_16BE
        };
        self.utf16_order = Some(encoding);
        Ok(encoding)
    }

    fn read_decoded(&mut self, encoding: &'static Encoding) -> Result<Option<char>> {
        let mut decoder = match self.decoder.take() {
            Some(decoder) => decoder,
            // BOM removal only applies at the very start of the stream
            None if self.position == 0 => encoding.new_decoder_with_bom_removal(),
            None => encoding.new_decoder_without_bom_handling(),
        };

        let start = self.position;
        match self.decode_next(&mut decoder) {
            Ok(c) => {
                self.decoder = Some(decoder);
                Ok(c)
            }
            Err(e) => {
                if let Err(seek_err) = self.seek(start) {
                    tracing::warn!("Failed to rewind to byte {}: {:#}", start, seek_err);
                }
                Err(e)
            }
        }
    }

    fn decode_next(&mut self, decoder: &mut Decoder) -> Result<Option<char>> {
        let mut start = self.position;
        let mut decoded = String::new();
        while decoded.is_empty() {
            let byte = self
                .inner
                .fill_buf()
                .context("Failed to read input")?
                .first()
                .copied();
            let src: &[u8] = match &byte {
                Some(b) => std::slice::from_ref(b),
                None => &[],
            };
            let last = byte.is_none();

            let needed = decoder
                .max_utf8_buffer_length_without_replacement(src.len())
                .unwrap_or(16);
            decoded.reserve(needed);

            let (result, read) =
                decoder.decode_to_string_without_replacement(src, &mut decoded, last);
            self.inner.consume(read);
            self.position += read as u64;

            if let DecoderResult::OutputFull = result {
                decoded.reserve(decoded.capacity() + 16);
            } else if let DecoderResult::Malformed(_, _) = result {
                match self.policy {
                    DecodeErrorPolicy::Fail => return Err(self.malformed(start)),
                    DecodeErrorPolicy::Replace => {
                        tracing::warn!(
                            "Replaced malformed {} input at byte offset {}",
                            self.charset.name(),
                            start
                        );
                        decoded.push(char::REPLACEMENT_CHARACTER);
                    }
                    DecodeErrorPolicy::Ignore => {
                        tracing::debug!(
                            "Skipped malformed {} input at byte offset {}",
                            self.charset.name(),
                            start
                        );
                        if decoded.is_empty() {
                            start = self.position;
                        }
                    }
                }
            }

            if last && !matches!(result, DecoderResult::OutputFull) {
                // The decoder must not be fed again after `last`
                self.finished = true;
                break;
            }
        }

        let mut chars = decoded.chars();
        let first = chars.next();
        self.pending.extend(chars);
        self.sequence_start = start;
        Ok(first)
    }
}
