//! Audio ingestion: bounded chunk queue, producer worker, and capture devices.
//!
//! Audio enters the engine as fixed-size blocks from a [`Recorder`], is
//! down-mixed to mono, and flows through a [`BoundedAudioQueue`] to the
//! decode thread. The queue bounds worst-case queued latency by dropping
//! the oldest chunk on overflow.

/// Default sample rate the decode pipeline expects.
pub const TARGET_RATE: u32 = 16_000;

mod input;
mod queue;
mod recorder;
mod resample;

pub use input::{AudioInputStream, ChunkStream};
pub use queue::BoundedAudioQueue;
pub use recorder::{BlockAssembler, CpalRecorder, Recorder};

/// Down-mix interleaved multi-channel samples to mono by averaging each
/// frame, applying `convert` so integer formats normalize to f32 on the way.
pub(crate) fn append_downmixed_samples<T, F>(
    buf: &mut Vec<f32>,
    data: &[T],
    channels: usize,
    mut convert: F,
) where
    T: Copy,
    F: FnMut(T) -> f32,
{
    if channels <= 1 {
        buf.extend(data.iter().copied().map(&mut convert));
        return;
    }

    let mut acc = 0.0f32;
    let mut count = 0usize;
    for sample in data.iter().copied() {
        acc += convert(sample);
        count += 1;
        if count == channels {
            buf.push(acc / channels as f32);
            acc = 0.0;
            count = 0;
        }
    }
    // A truncated trailing frame still contributes its mean.
    if count > 0 {
        buf.push(acc / count as f32);
    }
}
