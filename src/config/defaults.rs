//! Named defaults for the caption engine configuration.

/// Pipeline sample rate (Hz); whisper models expect 16 kHz.
pub const DEFAULT_SAMPLE_RATE: u32 = 16_000;

/// Nominal capture chunk duration (milliseconds).
pub const DEFAULT_CHUNK_MS: u64 = 100;

/// Decode window capacity (seconds of audio).
pub const DEFAULT_MAX_BUFFER_SECS: f64 = 5.0;

/// Tail retained between Overlap windows (seconds).
pub const DEFAULT_OVERLAP_SECS: f64 = 3.0;

/// Sliding decode interval floor (seconds).
pub const DEFAULT_INTERVAL_SECS: f64 = 2.0;

/// Worst-case audio allowed to queue between capture and decode (seconds);
/// sets the drop-oldest queue capacity.
pub const DEFAULT_MAX_LATENCY_SECS: f64 = 3.0;

/// Quiet period before the relay forwards a single blank marker (seconds).
pub const DEFAULT_SILENCE_TIMEOUT_SECS: f64 = 5.0;

pub const DEFAULT_BEAM_SIZE: u32 = 5;

pub const DEFAULT_TEMPERATURE: f32 = 0.0;

/// No-speech probability above which the decoder treats a window as silent.
pub const DEFAULT_NO_SPEECH_THRESHOLD: f32 = 0.7;

/// Confidence floor on a segment's mean token log-probability.
pub const DEFAULT_MIN_AVG_LOGPROB: f32 = -1.0;

/// Character density that overrides the confidence floor.
pub const DEFAULT_MIN_CHARS_PER_SEC: f32 = 6.0;

pub const MIN_CHUNK_MS: u64 = 10;
pub const MAX_CHUNK_MS: u64 = 1_000;
pub const MIN_SAMPLE_RATE: u32 = 8_000;
pub const MAX_SAMPLE_RATE: u32 = 48_000;
pub const MAX_BUFFER_HARD_LIMIT_SECS: f64 = 60.0;
pub const MAX_SILENCE_TIMEOUT_SECS: f64 = 600.0;
pub const MAX_BEAM_SIZE: u32 = 32;
