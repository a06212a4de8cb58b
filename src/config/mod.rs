//! Command-line parsing, file overlay, and validation.

mod defaults;
#[cfg(test)]
mod tests;
mod validation;

use crate::decode::DecodeParameters;
use crate::window::FilterConfig;
use clap::{Parser, ValueEnum};
use serde::Deserialize;
use std::path::PathBuf;

pub use defaults::{
    DEFAULT_BEAM_SIZE, DEFAULT_CHUNK_MS, DEFAULT_INTERVAL_SECS, DEFAULT_MAX_BUFFER_SECS,
    DEFAULT_MAX_LATENCY_SECS, DEFAULT_MIN_AVG_LOGPROB, DEFAULT_MIN_CHARS_PER_SEC,
    DEFAULT_NO_SPEECH_THRESHOLD, DEFAULT_OVERLAP_SECS, DEFAULT_SAMPLE_RATE,
    DEFAULT_SILENCE_TIMEOUT_SECS, DEFAULT_TEMPERATURE,
};
pub use validation::load_config_file;

/// CLI options for the livecap engine. Every value is validated at startup;
/// nothing is coerced at first use.
#[derive(Debug, Parser, Clone)]
#[command(name = "livecap", about = "livecap — streaming live captions", author, version)]
pub struct AppConfig {
    /// Path to the whisper GGML model file
    #[arg(long = "model", env = "LIVECAP_MODEL")]
    pub model_path: Option<PathBuf>,

    /// Optional JSON config file overlaying these options
    #[arg(short = 'c', long = "config")]
    pub config_file: Option<PathBuf>,

    /// Windowing strategy
    #[arg(long, value_enum, default_value_t = StrategyKind::Overlap)]
    pub strategy: StrategyKind,

    /// Preferred audio input device name
    #[arg(long)]
    pub input_device: Option<String>,

    /// Print detected audio input devices and exit
    #[arg(long = "list-input-devices", default_value_t = false)]
    pub list_input_devices: bool,

    /// Language passed to the decoder ("auto" detects)
    #[arg(long, default_value = "auto")]
    pub lang: String,

    /// Translate captions to English inside the decoder
    #[arg(long, default_value_t = false)]
    pub translate: bool,

    /// Pipeline sample rate (Hz)
    #[arg(long = "sample-rate", default_value_t = defaults::DEFAULT_SAMPLE_RATE)]
    pub sample_rate: u32,

    /// Capture chunk duration (milliseconds)
    #[arg(long = "chunk-ms", default_value_t = defaults::DEFAULT_CHUNK_MS)]
    pub chunk_ms: u64,

    /// Decode window size (seconds of audio)
    #[arg(long = "max-buffer-secs", default_value_t = defaults::DEFAULT_MAX_BUFFER_SECS)]
    pub max_buffer_secs: f64,

    /// Tail retained between Overlap windows (seconds)
    #[arg(long = "overlap-secs", default_value_t = defaults::DEFAULT_OVERLAP_SECS)]
    pub overlap_secs: f64,

    /// Sliding decode interval floor (seconds)
    #[arg(long = "interval-secs", default_value_t = defaults::DEFAULT_INTERVAL_SECS)]
    pub interval_secs: f64,

    /// Worst-case queued-audio latency (seconds); sets queue capacity
    #[arg(long = "max-latency-secs", default_value_t = defaults::DEFAULT_MAX_LATENCY_SECS)]
    pub max_latency_secs: f64,

    /// Quiet period before a single blank caption is forwarded (seconds)
    #[arg(
        long = "silence-timeout-secs",
        allow_negative_numbers = true,
        default_value_t = defaults::DEFAULT_SILENCE_TIMEOUT_SECS
    )]
    pub silence_timeout_secs: f64,

    /// Decoder beam size (>1 enables beam search)
    #[arg(long = "beam-size", default_value_t = defaults::DEFAULT_BEAM_SIZE)]
    pub beam_size: u32,

    /// Decoder sampling temperature
    #[arg(long, allow_negative_numbers = true, default_value_t = defaults::DEFAULT_TEMPERATURE)]
    pub temperature: f32,

    /// Initial prompt seeding the decoder's text context
    #[arg(long = "initial-prompt")]
    pub initial_prompt: Option<String>,

    /// No-speech probability above which a decode window counts as silent
    #[arg(
        long = "no-speech-threshold",
        allow_negative_numbers = true,
        default_value_t = defaults::DEFAULT_NO_SPEECH_THRESHOLD
    )]
    pub no_speech_threshold: f32,

    /// Confidence floor on mean token log-probability (Sliding filter)
    #[arg(
        long = "min-avg-logprob",
        allow_negative_numbers = true,
        default_value_t = defaults::DEFAULT_MIN_AVG_LOGPROB
    )]
    pub min_avg_logprob: f32,

    /// Character density (chars/sec) that admits short confident fragments
    #[arg(long = "min-chars-per-sec", default_value_t = defaults::DEFAULT_MIN_CHARS_PER_SEC)]
    pub min_chars_per_sec: f32,

    /// Run a throwaway warm-up decode before streaming
    #[arg(long = "warm-up", default_value_t = false)]
    pub warm_up: bool,

    /// Enable trace logging to a file
    #[arg(long = "logs", env = "LIVECAP_LOGS", default_value_t = false)]
    pub logs: bool,

    /// Disable all file logging (overrides --logs and log env vars)
    #[arg(long = "no-logs", env = "LIVECAP_NO_LOGS", default_value_t = false)]
    pub no_logs: bool,
}

/// The two windowing policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    Overlap,
    Sliding,
}

impl StrategyKind {
    pub fn label(self) -> &'static str {
        match self {
            StrategyKind::Overlap => "overlap",
            StrategyKind::Sliding => "sliding",
        }
    }
}

impl AppConfig {
    /// Capture block size in samples at the pipeline rate.
    pub fn block_size(&self) -> usize {
        ((u64::from(self.sample_rate) * self.chunk_ms) / 1_000).max(1) as usize
    }

    /// Queue capacity in chunks: `max_latency / chunk_duration`, rounded up
    /// so the configured latency is an upper bound.
    pub fn queue_capacity(&self) -> usize {
        let chunk_secs = self.chunk_ms as f64 / 1_000.0;
        (self.max_latency_secs / chunk_secs).ceil().max(1.0) as usize
    }

    /// Decode window capacity in samples.
    pub fn max_samples(&self) -> usize {
        (self.max_buffer_secs * f64::from(self.sample_rate)).max(1.0) as usize
    }

    pub fn overlap_samples(&self) -> usize {
        (self.overlap_secs * f64::from(self.sample_rate)) as usize
    }

    /// Immutable decode parameter snapshot handed to every decode call.
    pub fn decode_parameters(&self) -> DecodeParameters {
        DecodeParameters {
            language: if self.lang.eq_ignore_ascii_case("auto") {
                None
            } else {
                Some(self.lang.clone())
            },
            translate: self.translate,
            beam_size: self.beam_size,
            temperature: self.temperature,
            initial_prompt: self.initial_prompt.clone(),
            suppress_blank: true,
            no_speech_threshold: self.no_speech_threshold,
        }
    }

    pub fn filter_config(&self) -> FilterConfig {
        FilterConfig {
            min_avg_logprob: self.min_avg_logprob,
            min_chars_per_sec: self.min_chars_per_sec,
        }
    }
}
