//! In-memory resettable source

use anyhow::Result;
use std::io::Cursor;

use crate::{CharDecoder, Charset, DecodeErrorPolicy, ResettableSource};

/// Resettable source over bytes held in memory.
///
/// The mark lives in the source itself, so it is lost with the source.
pub struct ResettableBufferSource {
    reader: CharDecoder<Cursor<Vec<u8>>>,
    mark: u64,
    closed: bool,
}

impl ResettableBufferSource {
    /// UTF-8 source that fails on malformed input.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self::with_charset(bytes, Charset::utf8(), DecodeErrorPolicy::Fail)
    }

    pub fn with_charset(
        bytes: impl Into<Vec<u8>>,
        charset: Charset,
        policy: DecodeErrorPolicy,
    ) -> Self {
        Self {
            reader: CharDecoder::new(Cursor::new(bytes.into()), charset, policy),
            mark: 0,
            closed: false,
        }
    }

    /// The last marked position.
    pub fn mark_position(&self) -> u64 {
        self.mark
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            anyhow::bail!("Buffer source has been closed");
        }
        Ok(())
    }
}

impl ResettableSource for ResettableBufferSource {
    fn read_char(&mut self) -> Result<Option<char>> {
        self.ensure_open()?;
        self.reader.read_char()
    }

    fn mark(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.mark = self.reader.tell();
        Ok(())
    }

    fn reset(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.reader.seek(self.mark)
    }

    fn tell(&self) -> u64 {
        self.reader.tell()
    }

    fn seek(&mut self, position: u64) -> Result<()> {
        self.ensure_open()?;
        self.reader.seek(position)
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}
