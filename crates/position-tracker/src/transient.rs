//! In-memory position tracker.

use crate::PositionTracker;

/// Tracker that keeps the committed position in memory.
///
/// The position is lost when the tracker is dropped, so a reader using it
/// can rewind within one process but cannot resume after a restart.
#[derive(Debug, Clone, Default)]
pub struct TransientPositionTracker {
    target: String,
    position: u64,
}

impl TransientPositionTracker {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            position: 0,
        }
    }

    /// Start from an already-committed position.
    pub fn starting_at(target: impl Into<String>, position: u64) -> Self {
        Self {
            target: target.into(),
            position,
        }
    }
}

impl PositionTracker for TransientPositionTracker {
    fn store_position(&mut self, position: u64) -> anyhow::Result<()> {
        self.position = position;
        Ok(())
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn target(&self) -> &str {
        &self.target
    }

    fn close(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}
