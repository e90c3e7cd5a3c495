//! Committed read-position tracking for file-ingest
//!
//! A position tracker remembers the byte offset a reader last committed
//! (its mark) so that a reader built later over the same data can resume
//! from that offset instead of the beginning.
//!
//! # Trackers
//!
//! - `TransientPositionTracker` - Keeps the position in memory only
//! - `DurablePositionTracker` - Persists the position as a JSON file
//!
//! # Example
//!
//! ```ignore
//! use position_tracker::{tracker_path_for, DurablePositionTracker, PositionTracker};
//!
//! let path = tracker_path_for("/data/in/report.txt", None);
//! let mut tracker = DurablePositionTracker::open(path, "/data/in/report.txt")?;
//! tracker.store_position(4096)?;
//! ```

mod durable;
mod file;
mod transient;


pub use durable::DurablePositionTracker;
pub use file::TrackerFile;
pub use transient::TransientPositionTracker;

use std::path::{Path, PathBuf};

/// Suffix of tracker files written by `DurablePositionTracker`.
pub const TRACKER_FILE_SUFFIX: &str = ".position.json";

/// Storage for the committed read position of a single target.
///
/// Implementations only record what they are told; deciding when a position
/// is safe to commit belongs to the reader that owns the tracker.
pub trait PositionTracker: Send {
    /// Commit `position` as the new resume point.
    fn store_position(&mut self, position: u64) -> anyhow::Result<()>;

    /// The last committed position, or 0 if nothing was committed yet.
    fn position(&self) -> u64;

    /// Identifier of the data this tracker belongs to (usually a file path).
    fn target(&self) -> &str;

    /// Release any resources held by the tracker.
    ///
    /// Further calls to `store_position` fail after a successful close.
    fn close(&mut self) -> anyhow::Result<()>;
}

/// Build the default tracker file location for a data file.
///
/// The tracker is a hidden file named after the data file. It is placed in
/// `tracker_dir` when given, otherwise next to the data file.
pub fn tracker_path_for<P: AsRef<Path>>(data_path: P, tracker_dir: Option<&Path>) -> PathBuf {
    let data_path = data_path.as_ref();
    let file_name = data_path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| "input".to_string());

    let dir = match tracker_dir {
        Some(dir) => dir.to_path_buf(),
        None => data_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default(),
    };

    dir.join(format!(".{file_name}{TRACKER_FILE_SUFFIX}"))
}

/// Read a tracker file from disk.
///
/// Returns `None` when the file does not exist.
pub fn read_tracker_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Option<TrackerFile>> {
    use anyhow::Context;

    let path = path.as_ref();
    if !path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read tracker file: {}", path.display()))?;
    let file: TrackerFile = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse tracker file: {}", path.display()))?;
    Ok(Some(file))
}
