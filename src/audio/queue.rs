//! Fixed-capacity chunk queue between the capture worker and the decode thread.
//!
//! Overflow evicts the oldest chunk rather than blocking the producer, so the
//! amount of audio waiting in the queue can never exceed
//! `capacity x chunk_duration`. Recency of captions beats completeness here.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex};
use std::time::Duration;

/// Thread-safe drop-oldest ring of mono audio chunks.
///
/// `push` never blocks and never fails; `pop` parks the caller for at most
/// the given poll interval. One concurrent writer and one concurrent reader
/// are the intended users, but every operation is safe under arbitrary
/// concurrency so diagnostics can probe `len`/`snapshot` from other threads.
pub struct BoundedAudioQueue {
    inner: Mutex<VecDeque<Vec<f32>>>,
    available: Condvar,
    capacity: usize,
    dropped: AtomicUsize,
}

impl BoundedAudioQueue {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            available: Condvar::new(),
            capacity,
            dropped: AtomicUsize::new(0),
        }
    }

    /// Insert a chunk, evicting the single oldest entry first when full.
    pub fn push(&self, chunk: Vec<f32>) {
        let mut queue = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if queue.len() == self.capacity {
            queue.pop_front();
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        queue.push_back(chunk);
        drop(queue);
        self.available.notify_one();
    }

    /// Remove the oldest chunk, waiting up to `timeout` for one to arrive.
    /// Returns `None` on timeout; callers retry so a stop signal is always
    /// observed within one poll interval.
    pub fn pop(&self, timeout: Duration) -> Option<Vec<f32>> {
        let mut queue = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(chunk) = queue.pop_front() {
            return Some(chunk);
        }
        let (mut queue, _timed_out) = self
            .available
            .wait_timeout(queue, timeout)
            .unwrap_or_else(|e| e.into_inner());
        queue.pop_front()
    }

    /// Non-blocking variant used when draining after shutdown.
    pub fn try_pop(&self) -> Option<Vec<f32>> {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Chunks evicted by overflow since construction.
    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Consistent copy of the queued chunks for diagnostics; never exposes a
    /// view that could observe a mid-mutation state.
    pub fn snapshot(&self) -> Vec<Vec<f32>> {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .cloned()
            .collect()
    }
}
