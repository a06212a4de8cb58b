//! Sliding strategy: a true ring of the most recent audio, decoded on an
//! adaptively paced interval.

use super::buffer::WindowBuffer;
use super::filter::{FilterOutcome, SegmentFilter};
use super::{decode_error_text, run_decode, warm_up_decode};
use crate::decode::{DecodeParameters, Decoder};

/// Pacing head-room over the measured decode cost. Keeps the strategy from
/// requesting decodes faster than it can complete them, so backlog cannot
/// grow without bound under sustained load.
const PACING_FACTOR: f32 = 1.5;

pub struct SlidingWindow {
    buffer: WindowBuffer,
    filter: SegmentFilter,
    sample_rate: u32,
    /// Configured floor for the decode interval, in seconds.
    interval_secs: f32,
    interval_samples: usize,
    /// Samples accumulated since the last decode.
    new_samples: usize,
    /// Cumulative samples evicted from the ring; converts window-relative
    /// segment times to stream-absolute ones.
    evicted_samples: u64,
}

impl SlidingWindow {
    pub fn new(
        max_samples: usize,
        interval_secs: f32,
        sample_rate: u32,
        filter: SegmentFilter,
    ) -> Self {
        let sample_rate = sample_rate.max(1);
        let interval_secs = interval_secs.max(0.0);
        Self {
            buffer: WindowBuffer::new(max_samples),
            filter,
            sample_rate,
            interval_secs,
            interval_samples: (interval_secs * sample_rate as f32).max(1.0) as usize,
            new_samples: 0,
            evicted_samples: 0,
        }
    }

    pub fn buffer(&self) -> &WindowBuffer {
        &self.buffer
    }

    /// Current decode interval in samples (grows under load, never shrinks
    /// below the configured floor).
    pub fn interval_samples(&self) -> usize {
        self.interval_samples
    }

    pub fn last_emitted_end(&self) -> f32 {
        self.filter.last_end()
    }

    pub(super) fn push_chunk(
        &mut self,
        chunk: Vec<f32>,
        decoder: &dyn Decoder,
        params: &DecodeParameters,
    ) -> Option<String> {
        let chunk_len = chunk.len();
        self.buffer.push(chunk);
        // Ring discipline: the window always holds the most recent samples.
        self.evicted_samples += self.buffer.evict_to_capacity() as u64;
        self.new_samples += chunk_len;

        if self.new_samples < self.interval_samples {
            return None;
        }

        let data = self.buffer.concat();
        let run = run_decode(decoder, &data, params);

        // Adaptive pacing: never schedule the next decode sooner than
        // PACING_FACTOR x the cost we just measured.
        let measured = run.elapsed.as_secs_f32();
        let paced_secs = self.interval_secs.max(PACING_FACTOR * measured);
        self.interval_samples = (paced_secs * self.sample_rate as f32).max(1.0) as usize;
        self.new_samples = 0;

        let segments = match run.segments {
            Ok(segments) => segments,
            // Reported as an explicit marker; the ring keeps accumulating.
            Err(err) => return Some(decode_error_text(&err)),
        };

        let offset = self.evicted_samples as f32 / self.sample_rate as f32;
        match self.filter.admit(&segments, offset) {
            FilterOutcome::Text(text) => Some(text),
            FilterOutcome::NoNewSpeech => {
                // No surviving segment: re-establish a clean decode context
                // and report one empty step.
                self.filter.reset(offset);
                self.buffer.fill_silence(chunk_len.max(1));
                Some(String::new())
            }
        }
    }

    pub(super) fn warm_up(&mut self, decoder: &dyn Decoder, params: &DecodeParameters) {
        warm_up_decode(decoder, params, self.buffer.max_samples());
        let chunk = (self.buffer.max_samples() / 10).max(1);
        self.buffer.fill_silence(chunk);
        self.new_samples = 0;
    }
}
