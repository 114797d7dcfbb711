//! Batch-collect window

use crate::{TemporalWindow, WindowError};

/// Collects exactly `capacity` items, then refuses appends until drained
#[derive(Debug, Clone)]
pub struct BatchWindow<T> {
    items: Vec<T>,
    capacity: usize,
    /// Number of completed drains
    batches: u64,
}

impl<T> BatchWindow<T> {
    /// Create a new batch window with given capacity
    pub fn new(capacity: usize) -> Result<Self, WindowError> {
        if capacity == 0 {
            return Err(WindowError::ZeroCapacity);
        }
        Ok(Self {
            items: Vec::with_capacity(capacity),
            capacity,
            batches: 0,
        })
    }

    /// Take every buffered item in insertion order and reset the window
    pub fn drain(&mut self) -> Vec<T> {
        self.batches += 1;
        std::mem::replace(&mut self.items, Vec::with_capacity(self.capacity))
    }

    /// Number of batches drained so far
    pub fn batches_drained(&self) -> u64 {
        self.batches
    }

    /// Items still needed before the window is full
    pub fn remaining(&self) -> usize {
        self.capacity - self.items.len()
    }
}

impl<T> TemporalWindow<T> for BatchWindow<T> {
    fn push(&mut self, item: T) -> Result<(), WindowError> {
        if self.items.len() >= self.capacity {
            return Err(WindowError::Full {
                capacity: self.capacity,
            });
        }
        self.items.push(item);
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
