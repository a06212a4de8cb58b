//! livecap: streaming live-caption engine.
//!
//! Buffers an unbounded real-time audio source into bounded decode windows,
//! feeds a black-box speech decoder, and emits a stable, de-duplicated
//! incremental transcript with bounded end-to-end latency.

pub mod audio;
pub mod config;
pub mod decode;
pub mod pipeline;
pub mod relay;
mod telemetry;
pub mod window;

pub use pipeline::{start_caption_job, CaptionEvent, CaptionJob};
pub use telemetry::init_tracing;
