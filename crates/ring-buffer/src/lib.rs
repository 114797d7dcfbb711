//! Temporal Windows
//!
//! Fixed-capacity buffers for per-frame samples:
//! - [`RollingWindow`] keeps the most recent `N` items, evicting the oldest
//! - [`BatchWindow`] collects exactly `N` items, then must be drained

mod batch;
mod error;
mod rolling;

pub use batch::BatchWindow;
pub use error::WindowError;
pub use rolling::RollingWindow;

/// Default window length (frames)
pub const DEFAULT_CAPACITY: usize = 30;

/// Behaviour shared by both window policies
pub trait TemporalWindow<T> {
    /// Append an item according to the window's policy
    fn push(&mut self, item: T) -> Result<(), WindowError>;

    /// Number of buffered items
    fn len(&self) -> usize;

    /// Maximum number of buffered items
    fn capacity(&self) -> usize;

    /// Discard all buffered items
    fn clear(&mut self);

    /// Iterate oldest first
    fn iter(&self) -> Box<dyn Iterator<Item = &T> + '_>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_full(&self) -> bool {
        self.len() >= self.capacity()
    }

    /// Clone the buffered items, oldest first
    fn snapshot(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.iter().cloned().collect()
    }
}
