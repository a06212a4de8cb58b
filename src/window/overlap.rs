//! Overlap strategy: decode on buffer-full, retain a constant tail.

use super::buffer::WindowBuffer;
use super::filter::scrub_text;
use super::{decode_error_text, run_decode, warm_up_decode};
use crate::decode::{DecodeParameters, Decoder};

/// Accumulates chunks until the window is full, decodes the whole window,
/// then keeps only the trailing `overlap_samples` so the next window reuses
/// a constant tail of acoustic context. Decode cadence is governed purely by
/// buffer fill, not wall-clock time.
pub struct OverlapWindow {
    buffer: WindowBuffer,
    overlap_samples: usize,
}

impl OverlapWindow {
    pub fn new(max_samples: usize, overlap_samples: usize) -> Self {
        let max_samples = max_samples.max(1);
        Self {
            buffer: WindowBuffer::new(max_samples),
            // A tail as large as the window would never make progress.
            overlap_samples: overlap_samples.min(max_samples.saturating_sub(1)),
        }
    }

    pub fn buffer(&self) -> &WindowBuffer {
        &self.buffer
    }

    pub(super) fn push_chunk(
        &mut self,
        chunk: Vec<f32>,
        decoder: &dyn Decoder,
        params: &DecodeParameters,
    ) -> Option<String> {
        self.buffer.push(chunk);
        if self.buffer.total_samples() < self.buffer.max_samples() {
            return None;
        }

        let data = self.buffer.concat();
        let run = run_decode(decoder, &data, params);
        let text = match run.segments {
            Ok(segments) => {
                let joined: String = segments.iter().map(|s| s.text.as_str()).collect();
                scrub_text(&joined)
            }
            Err(err) => decode_error_text(&err),
        };

        // Keep exactly the tail of the just-decoded array; discard the rest.
        let tail_start = data.len().saturating_sub(self.overlap_samples);
        self.buffer.reset_to(data[tail_start..].to_vec());

        Some(text)
    }

    pub(super) fn warm_up(&mut self, decoder: &dyn Decoder, params: &DecodeParameters) {
        warm_up_decode(decoder, params, self.buffer.max_samples());
        let chunk = (self.buffer.max_samples() / 10).max(1);
        self.buffer.fill_silence(chunk);
    }
}
