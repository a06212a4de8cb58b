//! Contiguous-window bookkeeping for the decode strategies.

use std::collections::VecDeque;

/// Accumulates consumed chunks and tracks the total sample count against a
/// capacity bound. Owned exclusively by the decode thread; never shared.
pub struct WindowBuffer {
    chunks: VecDeque<Vec<f32>>,
    total_samples: usize,
    max_samples: usize,
}

impl WindowBuffer {
    pub fn new(max_samples: usize) -> Self {
        Self {
            chunks: VecDeque::new(),
            total_samples: 0,
            max_samples: max_samples.max(1),
        }
    }

    pub fn push(&mut self, chunk: Vec<f32>) {
        self.total_samples = self.total_samples.saturating_add(chunk.len());
        self.chunks.push_back(chunk);
    }

    /// Evict whole chunks from the front until the total fits the capacity
    /// bound again. Returns the number of samples evicted, which the Sliding
    /// strategy folds into its time-origin offset.
    pub fn evict_to_capacity(&mut self) -> usize {
        let mut evicted = 0usize;
        while self.total_samples > self.max_samples {
            match self.chunks.pop_front() {
                Some(oldest) => {
                    evicted += oldest.len();
                    self.total_samples = self.total_samples.saturating_sub(oldest.len());
                }
                None => break,
            }
        }
        evicted
    }

    /// Concatenate the buffered chunks into one contiguous decode window.
    pub fn concat(&self) -> Vec<f32> {
        let mut data = Vec::with_capacity(self.total_samples);
        for chunk in &self.chunks {
            data.extend_from_slice(chunk);
        }
        data
    }

    pub fn reset(&mut self) {
        self.chunks.clear();
        self.total_samples = 0;
    }

    /// Replace the contents with a single chunk (the retained overlap tail).
    pub fn reset_to(&mut self, chunk: Vec<f32>) {
        self.reset();
        self.push(chunk);
    }

    /// Clear and refill with pure silence up to the capacity bound,
    /// re-establishing a clean decode context. Silence is stored in
    /// `chunk_samples`-sized pieces so later ring eviction trims it
    /// gradually instead of dropping it all at once.
    pub fn fill_silence(&mut self, chunk_samples: usize) {
        self.reset();
        let chunk_samples = chunk_samples.clamp(1, self.max_samples);
        let mut remaining = self.max_samples;
        while remaining > 0 {
            let take = remaining.min(chunk_samples);
            self.push(vec![0.0; take]);
            remaining -= take;
        }
    }

    pub fn total_samples(&self) -> usize {
        self.total_samples
    }

    pub fn max_samples(&self) -> usize {
        self.max_samples
    }

    pub fn is_empty(&self) -> bool {
        self.total_samples == 0
    }
}
