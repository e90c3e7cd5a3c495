//! Local filesystem resettable source implementation

use anyhow::{Context, Result};
use position_tracker::PositionTracker;
use std::fs::File;
use std::path::{Path, PathBuf};

use crate::{CharDecoder, Charset, DecodeErrorPolicy, ResettableSource, DEFAULT_BUFFER_SIZE};

/// Options for opening a `ResettableFileSource`.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// Size of the read buffer in bytes
    pub buffer_size: usize,
    /// Charset of the file contents
    pub input_charset: Charset,
    /// Handling of bytes that are not valid in `input_charset`
    pub decode_error_policy: DecodeErrorPolicy,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            input_charset: Charset::utf8(),
            decode_error_policy: DecodeErrorPolicy::Fail,
        }
    }
}

/// Resettable source over a local file.
///
/// The mark is delegated to a `PositionTracker`. Opening a source positions
/// the read cursor at the tracker's committed position, so with a durable
/// tracker a reader resumes where the previous process last marked.
pub struct ResettableFileSource {
    path: PathBuf,
    reader: Option<CharDecoder<File>>,
    tracker: Box<dyn PositionTracker>,
    last_position: u64,
}

impl ResettableFileSource {
    /// Open a UTF-8 file with default options.
    pub fn open(path: impl AsRef<Path>, tracker: Box<dyn PositionTracker>) -> Result<Self> {
        Self::open_with(path, tracker, SourceConfig::default())
    }

    /// Open a file and seek to the tracker's committed position.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be opened
    /// - The committed position lies beyond the end of the file
    pub fn open_with(
        path: impl AsRef<Path>,
        tracker: Box<dyn PositionTracker>,
        config: SourceConfig,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)
            .with_context(|| format!("Failed to open file: {}", path.display()))?;
        let len = file
            .metadata()
            .with_context(|| format!("Failed to get metadata for: {}", path.display()))?
            .len();

        let mut reader = CharDecoder::with_capacity(
            config.buffer_size,
            file,
            config.input_charset,
            config.decode_error_policy,
        );

        let position = tracker.position();
        if position > len {
            anyhow::bail!(
                "Committed position {} is beyond the end of {} ({} bytes)",
                position,
                path.display(),
                len
            );
        }
        if position > 0 {
            reader.seek(position)?;
            tracing::info!("Resuming {} at byte {}", path.display(), position);
        }

        Ok(Self {
            path,
            reader: Some(reader),
            tracker,
            last_position: position,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The committed (marked) position.
    pub fn mark_position(&self) -> u64 {
        self.tracker.position()
    }

    pub fn is_closed(&self) -> bool {
        self.reader.is_none()
    }

    fn reader_mut(&mut self) -> Result<&mut CharDecoder<File>> {
        let path = &self.path;
        self.reader
            .as_mut()
            .with_context(|| format!("File source {} has been closed", path.display()))
    }
}

impl ResettableSource for ResettableFileSource {
    fn read_char(&mut self) -> Result<Option<char>> {
        self.reader_mut()?.read_char()
    }

    fn mark(&mut self) -> Result<()> {
        let position = self.reader_mut()?.tell();
        self.tracker.store_position(position)?;
        tracing::debug!("Marked {} at byte {}", self.path.display(), position);
        Ok(())
    }

    fn reset(&mut self) -> Result<()> {
        let position = self.tracker.position();
        self.reader_mut()?.seek(position)?;
        tracing::debug!("Reset {} to byte {}", self.path.display(), position);
        Ok(())
    }

    fn tell(&self) -> u64 {
        match &self.reader {
            Some(reader) => reader.tell(),
            None => self.last_position,
        }
    }

    fn seek(&mut self, position: u64) -> Result<()> {
        self.reader_mut()?.seek(position)
    }

    fn close(&mut self) -> Result<()> {
        let Some(reader) = self.reader.as_ref() else {
            return Ok(());
        };
        let position = reader.tell();

        self.tracker.close()?;
        self.last_position = position;
        self.reader = None;
        tracing::debug!("Closed {}", self.path.display());
        Ok(())
    }
}
