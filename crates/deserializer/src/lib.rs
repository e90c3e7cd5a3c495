//! Event deserializers for file-ingest
//!
//! A deserializer pulls characters from a `ResettableSource` and turns them
//! into `Event`s. Deserializers expose the source's mark/reset cursor so the
//! caller can commit progress only after events were delivered downstream.
//!
//! # Deserializers
//!
//! - `FileDeserializer` (`FILE`) - The whole source becomes one event with a
//!   suffix marker appended
//!
//! # Example
//!
//! ```ignore
//! use ingest_deserializer::{Context, EventDeserializer, EventDeserializerFactory};
//! use ingest_file::ResettableBufferSource;
//!
//! let factory = EventDeserializerFactory::new();
//! let source = Box::new(ResettableBufferSource::new("hello"));
//! let mut deserializer = factory.get_instance("FILE", &Context::new(), source)?;
//!
//! let events = deserializer.read_events(10)?;
//! deliver(&events)?;
//! deserializer.mark()?;
//! deserializer.close()?;
//! ```

mod context;
mod error;
mod event;
mod factory;
pub mod file;

pub use context::Context;
pub use error::{Error, Result};
pub use event::{encode, Event, EventBuilder};
pub use factory::{DeserializerType, EventDeserializerFactory};
pub use file::{FileDeserializer, FileDeserializerBuilder, FileDeserializerConfig};

use ingest_file::ResettableSource;

/// Reads events from a resettable source.
///
/// Implementations are not reentrant; every method takes `&mut self`.
/// Once `close` succeeds every other method fails with
/// `Error::InvalidState`.
pub trait EventDeserializer: Send {
    /// Read the next event, or `None` when the source has no more data.
    fn read_event(&mut self) -> Result<Option<Event>>;

    /// Read up to `count` events, stopping early when the source runs out.
    fn read_events(&mut self, count: usize) -> Result<Vec<Event>>;

    /// Commit the current source position as the resume point.
    fn mark(&mut self) -> Result<()>;

    /// Rewind the source to the last committed position.
    fn reset(&mut self) -> Result<()>;

    /// Reset to the last mark and release the source.
    ///
    /// Calling `close` on a closed deserializer does nothing.
    fn close(&mut self) -> Result<()>;
}

/// Constructs a deserializer from configuration and an open source.
pub trait EventDeserializerBuilder: Send + Sync {
    fn build(
        &self,
        context: &Context,
        source: Box<dyn ResettableSource>,
    ) -> Result<Box<dyn EventDeserializer>>;
}
