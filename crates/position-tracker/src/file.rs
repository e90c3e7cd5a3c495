//! On-disk tracker file format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Serialized form of a committed position.
///
/// # File Format
///
/// ```json
/// {
///     "target": "/data/in/report.txt",
///     "position": 4096,
///     "updated_at": "2024-01-01T00:00:00Z"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerFile {
    /// Identifier of the tracked data (usually the data file path)
    pub target: String,
    /// Committed byte offset
    pub position: u64,
    /// Timestamp of the last commit
    pub updated_at: DateTime<Utc>,
}

impl TrackerFile {
    pub fn new(target: impl Into<String>, position: u64) -> Self {
        Self {
            target: target.into(),
            position,
            updated_at: Utc::now(),
        }
    }

    /// Check that this file was written for `expected`.
    ///
    /// A mismatch is an error; the position is never silently reset to 0.
    pub fn validate_target(&self, expected: &str) -> anyhow::Result<()> {
        if self.target != expected {
            anyhow::bail!(
                "Tracker target mismatch: expected '{}', found '{}'",
                expected,
                self.target
            );
        }
        Ok(())
    }
}
