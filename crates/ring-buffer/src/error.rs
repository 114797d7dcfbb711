//! Window Error Types

use thiserror::Error;

/// Errors raised by temporal windows
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WindowError {
    /// Batch window already holds `capacity` items and must be drained first
    #[error("Window is full ({capacity} items); drain or clear before appending")]
    Full { capacity: usize },

    /// A window needs room for at least one item
    #[error("Window capacity must be greater than zero")]
    ZeroCapacity,
}
