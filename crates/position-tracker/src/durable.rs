//! Filesystem-backed position tracker.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::{read_tracker_file, PositionTracker, TrackerFile};

/// Tracker that persists every committed position as a JSON file.
///
/// Writes go to a sibling temporary file that is synced to disk and then
/// renamed over the tracker file. The directory is synced after the rename
/// on Unix, so a crash mid-write leaves the previous commit intact.
pub struct DurablePositionTracker {
    path: PathBuf,
    target: String,
    position: u64,
    closed: bool,
}

impl DurablePositionTracker {
    /// Open the tracker stored at `path` for `target`.
    ///
    /// A missing file means nothing was committed yet and the position
    /// starts at 0.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The existing tracker file cannot be read or parsed
    /// - The existing tracker file belongs to a different target
    pub fn open(path: impl Into<PathBuf>, target: impl Into<String>) -> Result<Self> {
        let path = path.into();
        let target = target.into();

        let position = match read_tracker_file(&path)? {
            Some(file) => {
                file.validate_target(&target)?;
                tracing::info!(
                    "Loaded committed position {} for {} from {}",
                    file.position,
                    target,
                    path.display()
                );
                file.position
            }
            None => 0,
        };

        Ok(Self {
            path,
            target,
            position,
            closed: false,
        })
    }

    /// Location of the tracker file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self) -> Result<()> {
        let dir = self.path.parent().filter(|dir| !dir.as_os_str().is_empty());
        if let Some(dir) = dir {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create tracker directory: {}", dir.display()))?;
        }

        let file = TrackerFile::new(self.target.clone(), self.position);
        let tmp = self.path.with_extension("json.tmp");
        let mut out = File::create(&tmp)
            .with_context(|| format!("Failed to create tracker file: {}", tmp.display()))?;
        out.write_all(serde_json::to_string_pretty(&file)?.as_bytes())
            .and_then(|()| out.sync_all())
            .with_context(|| format!("Failed to write tracker file: {}", tmp.display()))?;
        drop(out);

        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace tracker file: {}", self.path.display()))?;

        // The rename is only durable once the directory entry is flushed
        #[cfg(unix)]
        {
            let dir = dir.unwrap_or_else(|| Path::new("."));
            File::open(dir)
                .and_then(|handle| handle.sync_all())
                .with_context(|| format!("Failed to sync tracker directory: {}", dir.display()))?;
        }
        Ok(())
    }
}

impl PositionTracker for DurablePositionTracker {
    fn store_position(&mut self, position: u64) -> Result<()> {
        if self.closed {
            anyhow::bail!("Position tracker for '{}' has been closed", self.target);
        }

        let previous = self.position;
        self.position = position;
        if let Err(e) = self.write() {
            self.position = previous;
            return Err(e);
        }

        tracing::debug!(
            "Committed position {} for {} to {}",
            position,
            self.target,
            self.path.display()
        );
        Ok(())
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn target(&self) -> &str {
        &self.target
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}
