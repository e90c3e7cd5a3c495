//! Resettable character sources for file-ingest
//!
//! This crate provides the character-level reader that deserializers pull
//! from. A source decodes bytes into characters and keeps two cursors:
//!
//! - the **read cursor**, advanced by every `read_char`
//! - the **mark**, a committed position that `reset` jumps back to
//!
//! # Source Types
//!
//! - **File**: A local file whose mark is stored through a `PositionTracker`,
//!   so it survives a restart when the tracker is durable
//! - **Buffer**: An in-memory byte vector with an in-memory mark
//!
//! # Example
//!
//! ```ignore
//! use ingest_file::{ResettableFileSource, ResettableSource};
//! use position_tracker::TransientPositionTracker;
//!
//! let tracker = TransientPositionTracker::new("data.txt");
//! let mut source = ResettableFileSource::open("data.txt", Box::new(tracker))?;
//! while let Some(c) = source.read_char()? {
//!     // ...
//! }
//! source.reset()?;
//! ```

mod buffer;
mod charset;
mod decode;
mod local;

use anyhow::Result;

pub use buffer::ResettableBufferSource;
pub use charset::Charset;
pub use decode::{CharDecoder, DecodeErrorPolicy};
pub use local::{ResettableFileSource, SourceConfig};

/// Default buffer size for reading operations (64KB)
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// A character stream with a resettable, byte-addressed position.
///
/// Positions reported by `tell` and accepted by `seek` are byte offsets of
/// character boundaries in the underlying data.
pub trait ResettableSource: Send {
    /// Read the next character, or `None` once the stream is exhausted.
    fn read_char(&mut self) -> Result<Option<char>>;

    /// Record the current position as the resume point.
    fn mark(&mut self) -> Result<()>;

    /// Move the read cursor back to the last mark (or the initial position
    /// if `mark` was never called).
    fn reset(&mut self) -> Result<()>;

    /// Byte offset of the read cursor.
    fn tell(&self) -> u64;

    /// Move the read cursor to `position`.
    fn seek(&mut self, position: u64) -> Result<()>;

    /// Release the underlying resources. Every other call fails afterwards.
    fn close(&mut self) -> Result<()>;
}

impl<S: ResettableSource + ?Sized> ResettableSource for Box<S> {
    fn read_char(&mut self) -> Result<Option<char>> {
        (**self).read_char()
    }

    fn mark(&mut self) -> Result<()> {
        (**self).mark()
    }

    fn reset(&mut self) -> Result<()> {
        (**self).reset()
    }

    fn tell(&self) -> u64 {
        (**self).tell()
    }

    fn seek(&mut self, position: u64) -> Result<()> {
        (**self).seek(position)
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}
