//! Fixed-capacity sliding window of recent observations.
//!
//! Oldest observations are evicted first. PSI is always computed over a
//! [`SlidingWindow::snapshot`], never over the live window.

use std::collections::VecDeque;

use crate::error::InvalidInputError;

#[derive(Debug, Clone)]
pub struct SlidingWindow {
    capacity: usize,
    values: VecDeque<f64>,
}

impl SlidingWindow {
    pub fn new(capacity: usize) -> Result<Self, InvalidInputError> {
        if capacity == 0 {
            return Err(InvalidInputError::WindowCapacity);
        }
        Ok(Self {
            capacity,
            values: VecDeque::with_capacity(capacity),
        })
    }

    /// Append a value, returning the evicted one if the window was full.
    pub fn push(&mut self, value: f64) -> Option<f64> {
        let evicted = if self.values.len() == self.capacity {
            self.values.pop_front()
        } else {
            None
        };
        self.values.push_back(value);
        evicted
    }

    /// Owned copy of the current contents, oldest first.
    pub fn snapshot(&self) -> Vec<f64> {
        self.values.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
