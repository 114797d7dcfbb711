//! Rolling (FIFO-evicting) window

use std::collections::VecDeque;

use crate::{TemporalWindow, WindowError};

/// Keeps the most recent `capacity` items; the oldest is evicted on overflow
#[derive(Debug, Clone)]
pub struct RollingWindow<T> {
    items: VecDeque<T>,
    capacity: usize,
    /// Total items pushed since creation (including evicted ones)
    total_written: u64,
}

impl<T> RollingWindow<T> {
    /// Create a new rolling window with given capacity
    pub fn new(capacity: usize) -> Result<Self, WindowError> {
        if capacity == 0 {
            return Err(WindowError::ZeroCapacity);
        }
        Ok(Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
            total_written: 0,
        })
    }

    /// Append an item, evicting the oldest one if the window is full.
    /// Returns the evicted item, if any.
    pub fn push_evicting(&mut self, item: T) -> Option<T> {
        let evicted = if self.items.len() == self.capacity {
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(item);
        self.total_written += 1;
        evicted
    }

    /// Most recently pushed item
    pub fn latest(&self) -> Option<&T> {
        self.items.back()
    }

    /// Read the last N items (most recent first)
    pub fn read_last(&self, count: usize) -> Vec<&T> {
        self.items.iter().rev().take(count).collect()
    }

    /// Total items pushed since creation
    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    /// Get fill ratio (0.0 to 1.0)
    pub fn fill_ratio(&self) -> f64 {
        self.items.len() as f64 / self.capacity as f64
    }

    /// Fraction of buffered items matching `predicate` (0.0 when empty)
    pub fn fraction_where<F>(&self, predicate: F) -> f64
    where
        F: Fn(&T) -> bool,
    {
        if self.items.is_empty() {
            return 0.0;
        }
        let hits = self.items.iter().filter(|item| predicate(item)).count();
        hits as f64 / self.items.len() as f64
    }
}

impl<T> TemporalWindow<T> for RollingWindow<T> {
    fn push(&mut self, item: T) -> Result<(), WindowError> {
        self.push_evicting(item);
        Ok(())
    }

    fn len(&self) -> usize {
        self.items.len()
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn clear(&mut self) {
        self.items.clear();
    }

    fn iter(&self) -> Box<dyn Iterator<Item = &T> + '_> {
        Box::new(self.items.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_zero_capacity_rejected() {
        assert_eq!(
            RollingWindow::<u32>::new(0).unwrap_err(),
            WindowError::ZeroCapacity
        );
    }

    #[test]
    fn test_push_and_read() {
        let mut window = RollingWindow::new(10).unwrap();
        for i in 0..5 {
            window.push(i * 100).unwrap();
        }

        assert_eq!(window.len(), 5);
        assert!(!window.is_full());

        let recent = window.read_last(3);
        assert_eq!(recent, vec![&400, &300, &200]);
        assert_eq!(window.latest(), Some(&400));
    }

    #[test]
    fn test_overwrite_oldest() {
        let mut window = RollingWindow::new(5).unwrap();
        for i in 0..10 {
            window.push(i).unwrap();
        }

        assert_eq!(window.len(), 5);
        assert!(window.is_full());
        assert_eq!(window.snapshot(), vec![5, 6, 7, 8, 9]);
        assert_eq!(window.total_written(), 10);
    }

    #[test]
    fn test_push_evicting_returns_oldest() {
        let mut window = RollingWindow::new(2).unwrap();
        assert_eq!(window.push_evicting('a'), None);
        assert_eq!(window.push_evicting('b'), None);
        assert_eq!(window.push_evicting('c'), Some('a'));
    }

    #[test]
    fn test_fill_ratio_and_clear() {
        let mut window = RollingWindow::new(100).unwrap();
        assert_eq!(window.fill_ratio(), 0.0);

        for i in 0..50 {
            window.push(i).unwrap();
        }
        assert!((window.fill_ratio() - 0.5).abs() < 0.01);

        window.clear();
        assert!(window.is_empty());
        window.push(1).unwrap();
        assert_eq!(window.len(), 1);
    }

    #[test]
    fn test_fraction_where() {
        let mut window = RollingWindow::new(4).unwrap();
        assert_eq!(window.fraction_where(|v: &f32| *v < 0.2), 0.0);

        for v in [0.1_f32, 0.3, 0.1, 0.3] {
            window.push(v).unwrap();
        }
        assert!((window.fraction_where(|v| *v < 0.2) - 0.5).abs() < 1e-9);
    }

    proptest! {
        #[test]
        fn prop_keeps_last_capacity_items(capacity in 1usize..64, extra in 1usize..64) {
            let mut window = RollingWindow::new(capacity).unwrap();
            let total = capacity + extra;
            for i in 0..total {
                window.push(i).unwrap();
            }

            let expected: Vec<usize> = (extra..total).collect();
            prop_assert_eq!(window.len(), capacity);
            prop_assert_eq!(window.snapshot(), expected);
        }

        #[test]
        fn prop_len_is_min_of_seen_and_capacity(capacity in 1usize..64, seen in 0usize..128) {
            let mut window = RollingWindow::new(capacity).unwrap();
            for i in 0..seen {
                window.push(i).unwrap();
            }
            prop_assert_eq!(window.len(), seen.min(capacity));
        }
    }
}
