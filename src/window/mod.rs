//! Windowing strategies: decide when the accumulated audio is ready for the
//! decoder and what to retain afterwards.
//!
//! Two policies, one tagged variant. Overlap decodes on buffer-full and
//! keeps a constant tail for cross-window context; Sliding keeps a true
//! ring of the most recent audio and decodes on an adaptively paced
//! interval. A strategy never issues concurrent decodes; the consumer
//! thread passes its decoder in at each step.

mod buffer;
mod filter;
mod overlap;
mod sliding;
#[cfg(test)]
mod tests;

pub use buffer::WindowBuffer;
pub use filter::{FilterConfig, FilterOutcome, SegmentFilter};
pub use overlap::OverlapWindow;
pub use sliding::SlidingWindow;

use crate::decode::{DecodeParameters, Decoder, Segment};
use anyhow::Result;
use std::time::{Duration, Instant};

/// One strategy instance driving a single stream.
pub enum CaptionStrategy {
    Overlap(OverlapWindow),
    Sliding(SlidingWindow),
}

impl CaptionStrategy {
    /// Feed one chunk. Returns `None` when no decode was due, `Some(text)`
    /// when a decode ran — the text may be empty (a silence step) or an
    /// error marker (a failed decode, reported rather than dropped).
    pub fn push_chunk(
        &mut self,
        chunk: Vec<f32>,
        decoder: &dyn Decoder,
        params: &DecodeParameters,
    ) -> Option<String> {
        match self {
            CaptionStrategy::Overlap(window) => window.push_chunk(chunk, decoder, params),
            CaptionStrategy::Sliding(window) => window.push_chunk(chunk, decoder, params),
        }
    }

    /// Run one throwaway decode of a silence window and pre-fill the buffer
    /// with silence so the first real decode has a clean context. Failures
    /// are logged and skipped; warm-up is best effort.
    pub fn warm_up(&mut self, decoder: &dyn Decoder, params: &DecodeParameters) {
        match self {
            CaptionStrategy::Overlap(window) => window.warm_up(decoder, params),
            CaptionStrategy::Sliding(window) => window.warm_up(decoder, params),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CaptionStrategy::Overlap(_) => "overlap",
            CaptionStrategy::Sliding(_) => "sliding",
        }
    }
}

pub(crate) struct DecodeRun {
    pub(crate) segments: Result<Vec<Segment>>,
    pub(crate) elapsed: Duration,
}

/// Run one blocking decode and measure its wall-clock cost; the Sliding
/// strategy uses the measurement for pacing.
pub(crate) fn run_decode(
    decoder: &dyn Decoder,
    samples: &[f32],
    params: &DecodeParameters,
) -> DecodeRun {
    let start = Instant::now();
    let segments = decoder.decode(samples, params);
    let elapsed = start.elapsed();
    tracing::debug!(
        samples = samples.len(),
        decode_ms = elapsed.as_millis() as u64,
        ok = segments.is_ok(),
        "decode finished"
    );
    DecodeRun { segments, elapsed }
}

pub(crate) fn decode_error_text(err: &anyhow::Error) -> String {
    format!("[decode error: {err:#}]")
}

pub(crate) fn warm_up_decode(
    decoder: &dyn Decoder,
    params: &DecodeParameters,
    max_samples: usize,
) {
    let silence = vec![0.0f32; max_samples];
    let start = Instant::now();
    if let Err(err) = decoder.decode(&silence, params) {
        tracing::warn!(error = %format!("{err:#}"), "warm-up decode failed; continuing");
    } else {
        tracing::info!(
            warm_up_ms = start.elapsed().as_millis() as u64,
            "warm-up decode complete"
        );
    }
}
