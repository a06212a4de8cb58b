//! Silence-debounced text relay plus the translator and output-sink seams.

use anyhow::Result;
use std::time::{Duration, Instant};

/// Pure text-to-text transform applied after captioning. Errors are hard
/// failures of this stage; partial or garbled translation is worse than a
/// visible failure.
pub trait Translator {
    fn translate(&self, text: &str) -> Result<String>;
}

/// Fire-and-forget caption destination. Must tolerate an empty string as a
/// clear/silence signal.
pub trait OutputSink {
    fn display(&mut self, text: &str);
}

/// Debounces the caption stream's silence steps.
///
/// Non-empty text is forwarded immediately. Empty steps produce at most one
/// blank marker per quiet period — only once the configured timeout has
/// elapsed since the last speech — and further blanks are suppressed until
/// speech returns. Matters because Sliding decode ticks can be sub-second.
pub struct StreamRelay {
    silence_timeout: Duration,
    last_non_empty: Instant,
    empty_emitted: bool,
}

impl StreamRelay {
    pub fn new(silence_timeout: Duration) -> Self {
        Self {
            silence_timeout,
            last_non_empty: Instant::now(),
            empty_emitted: false,
        }
    }

    /// Offer one step of text. Returns the text to forward downstream, or
    /// `None` to suppress this step.
    pub fn offer(&mut self, text: &str) -> Option<String> {
        self.offer_at(text, Instant::now())
    }

    /// Clock-injected variant of [`offer`](Self::offer) used by tests.
    pub fn offer_at(&mut self, text: &str, now: Instant) -> Option<String> {
        if text.trim().is_empty() {
            if !self.empty_emitted
                && now.saturating_duration_since(self.last_non_empty) >= self.silence_timeout
            {
                self.empty_emitted = true;
                return Some(String::new());
            }
            return None;
        }
        self.last_non_empty = now;
        self.empty_emitted = false;
        Some(text.to_string())
    }
}
