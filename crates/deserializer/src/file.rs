//! Whole-file deserializer.
//!
//! Reads the entire source as a single record, appends a configurable suffix
//! marker, and emits the result as one event. A source therefore yields at
//! most one event per pass; a second pass only happens after `reset`.

use ingest_file::{Charset, ResettableSource};

use crate::event::{ensure_output_charset, EventBuilder};
use crate::{Context, Error, Event, EventDeserializer, EventDeserializerBuilder, Result};

pub const OUT_CHARSET_KEY: &str = "outputCharset";
pub const CHARSET_DFLT: &str = "UTF-8";

pub const MAXLINE_KEY: &str = "maxLineLength";
pub const MAXLINE_DFLT: usize = 2048;

pub const FILE_SUFFIX_KEY: &str = "fileSuffix";
pub const FILE_SUFFIX_DFLT: &str = "\r\nflumeFileSuffix";

/// Typed view of the whole-file deserializer settings.
#[derive(Debug, Clone)]
pub struct FileDeserializerConfig {
    /// Charset used to encode the record body
    pub output_charset: Charset,
    /// Advisory bound on record length in characters. Longer records are
    /// still emitted whole; crossing the bound only logs a warning.
    pub max_record_length: usize,
    /// Marker appended to every record
    pub file_suffix: String,
}

impl Default for FileDeserializerConfig {
    fn default() -> Self {
        Self {
            output_charset: Charset::utf8(),
            max_record_length: MAXLINE_DFLT,
            file_suffix: FILE_SUFFIX_DFLT.to_string(),
        }
    }
}

impl FileDeserializerConfig {
    /// Read `outputCharset`, `maxLineLength` and `fileSuffix` from `context`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if:
    /// - The charset name is unknown or cannot be used for output
    /// - `maxLineLength` is not a non-negative integer
    pub fn from_context(context: &Context) -> Result<Self> {
        let charset_name = context.get_string_or(OUT_CHARSET_KEY, CHARSET_DFLT);
        let output_charset =
            Charset::for_label(&charset_name).map_err(|e| Error::Config(e.to_string()))?;
        ensure_output_charset(output_charset)?;

        let max_record_length = context.get_integer_or(MAXLINE_KEY, MAXLINE_DFLT as i64)?;
        let max_record_length = usize::try_from(max_record_length).map_err(|_| {
            Error::Config(format!(
                "'{MAXLINE_KEY}' must not be negative, got {max_record_length}"
            ))
        })?;

        let file_suffix = context.get_string_or(FILE_SUFFIX_KEY, FILE_SUFFIX_DFLT);

        Ok(Self {
            output_charset,
            max_record_length,
            file_suffix,
        })
    }
}

/// Deserializer that turns an entire source into one event.
///
/// Each instance owns its source and its suffix. Nothing is shared between
/// instances, so readers built with different configurations never affect
/// each other.
pub struct FileDeserializer {
    source: Box<dyn ResettableSource>,
    output_charset: Charset,
    max_record_length: usize,
    file_suffix: String,
    is_open: bool,
}

impl FileDeserializer {
    pub fn new(config: FileDeserializerConfig, source: Box<dyn ResettableSource>) -> Self {
        tracing::debug!(
            "Created file deserializer (charset {}, max length {}, suffix {:?})",
            config.output_charset.name(),
            config.max_record_length,
            config.file_suffix
        );
        Self {
            source,
            output_charset: config.output_charset,
            max_record_length: config.max_record_length,
            file_suffix: config.file_suffix,
            is_open: true,
        }
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn file_suffix(&self) -> &str {
        &self.file_suffix
    }

    pub fn output_charset(&self) -> Charset {
        self.output_charset
    }

    pub fn max_record_length(&self) -> usize {
        self.max_record_length
    }

    fn ensure_open(&self) -> Result<()> {
        if !self.is_open {
            return Err(Error::InvalidState);
        }
        Ok(())
    }

    /// Drain the source and return its text plus the suffix, or `None` if
    /// the source had no characters left.
    fn read_record(&mut self) -> Result<Option<String>> {
        let mut record = String::new();
        let mut read_chars = 0usize;

        while let Some(c) = self.source.read_char()? {
            read_chars += 1;
            if read_chars == self.max_record_length.saturating_add(1) {
                tracing::warn!(
                    "Record exceeds the configured maximum of {} characters; emitting it whole",
                    self.max_record_length
                );
            }
            record.push(c);
        }
        record.push_str(&self.file_suffix);

        if read_chars == 0 {
            return Ok(None);
        }

        tracing::debug!("Read record of {} characters", read_chars);
        Ok(Some(record))
    }
}

impl EventDeserializer for FileDeserializer {
    fn read_event(&mut self) -> Result<Option<Event>> {
        self.ensure_open()?;

        let start = self.source.tell();
        let charset = self.output_charset;
        let result = self.read_record().and_then(|record| match record {
            Some(record) => EventBuilder::with_text(&record, charset).map(Some),
            None => Ok(None),
        });

        // A failed record is never emitted in part; the next read starts over
        if result.is_err() {
            if let Err(e) = self.source.seek(start) {
                tracing::warn!("Failed to rewind source to byte {}: {:#}", start, e);
            }
        }
        result
    }

    fn read_events(&mut self, count: usize) -> Result<Vec<Event>> {
        self.ensure_open()?;
        let mut events = Vec::new();
        for _ in 0..count {
            match self.read_event()? {
                Some(event) => events.push(event),
                None => break,
            }
        }
        Ok(events)
    }

    fn mark(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.source.mark()?;
        Ok(())
    }

    fn reset(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.source.reset()?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.is_open {
            self.reset()?;
            self.source.close()?;
            self.is_open = false;
            tracing::debug!("Closed file deserializer");
        }
        Ok(())
    }
}

/// Builds `FileDeserializer`s from a context.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileDeserializerBuilder;

impl EventDeserializerBuilder for FileDeserializerBuilder {
    fn build(
        &self,
        context: &Context,
        source: Box<dyn ResettableSource>,
    ) -> Result<Box<dyn EventDeserializer>> {
        let config = FileDeserializerConfig::from_context(context)?;
        Ok(Box::new(FileDeserializer::new(config, source)))
    }
}
