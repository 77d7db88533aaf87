use std::collections::VecDeque;

use crate::features::FeatureVector;

/// Fixed-capacity FIFO of feature vectors.
///
/// Once full, every insert evicts the oldest vector.
#[derive(Debug, Clone)]
pub struct WindowBuffer {
    capacity: usize,
    data: VecDeque<FeatureVector>,
}

impl WindowBuffer {
    pub fn new(capacity: usize) -> WindowBuffer {
        Self {
            capacity,
            data: VecDeque::with_capacity(capacity),
        }
    }

    pub fn add(&mut self, features: FeatureVector) {
        if self.capacity == 0 {
            return;
        }
        if self.data.len() == self.capacity {
            self.data.pop_front();
        }
        self.data.push_back(features);
    }

    /// Oldest-first copy of the current contents.
    pub fn snapshot(&self) -> Vec<FeatureVector> {
        self.data.iter().copied().collect()
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
