//! Startup validation and the JSON config-file overlay.
//!
//! Every recognized option is range-checked here, at construction; unknown
//! or malformed file keys are rejected rather than silently ignored.

use super::defaults::{
    MAX_BEAM_SIZE, MAX_BUFFER_HARD_LIMIT_SECS, MAX_CHUNK_MS, MAX_SAMPLE_RATE,
    MAX_SILENCE_TIMEOUT_SECS, MIN_CHUNK_MS, MIN_SAMPLE_RATE,
};
use super::{AppConfig, StrategyKind};
use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Deserialize;
use std::fs;
use std::path::Path;

impl AppConfig {
    /// Parse CLI arguments, overlay the config file if one was named, and
    /// validate right away.
    pub fn parse_args() -> Result<Self> {
        let mut config = Self::parse();
        if let Some(path) = config.config_file.clone() {
            let overlay = load_config_file(&path)?;
            overlay.apply(&mut config);
        }
        config.validate()?;
        Ok(config)
    }

    /// Range-check every value; called once at startup.
    pub fn validate(&mut self) -> Result<()> {
        if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&self.sample_rate) {
            bail!(
                "--sample-rate must be between {MIN_SAMPLE_RATE} and {MAX_SAMPLE_RATE} Hz, got {}",
                self.sample_rate
            );
        }
        if !(MIN_CHUNK_MS..=MAX_CHUNK_MS).contains(&self.chunk_ms) {
            bail!(
                "--chunk-ms must be between {MIN_CHUNK_MS} and {MAX_CHUNK_MS}, got {}",
                self.chunk_ms
            );
        }
        if !self.max_buffer_secs.is_finite()
            || self.max_buffer_secs <= 0.0
            || self.max_buffer_secs > MAX_BUFFER_HARD_LIMIT_SECS
        {
            bail!(
                "--max-buffer-secs must be between 0 and {MAX_BUFFER_HARD_LIMIT_SECS}, got {}",
                self.max_buffer_secs
            );
        }
        if !self.overlap_secs.is_finite()
            || self.overlap_secs < 0.0
            || self.overlap_secs >= self.max_buffer_secs
        {
            bail!(
                "--overlap-secs must be >= 0 and smaller than --max-buffer-secs ({}), got {}",
                self.max_buffer_secs,
                self.overlap_secs
            );
        }
        if !self.interval_secs.is_finite() || self.interval_secs <= 0.0 {
            bail!("--interval-secs must be positive, got {}", self.interval_secs);
        }
        let chunk_secs = self.chunk_ms as f64 / 1_000.0;
        if !self.max_latency_secs.is_finite() || self.max_latency_secs < chunk_secs {
            bail!(
                "--max-latency-secs must be at least one chunk duration ({chunk_secs}s), got {}",
                self.max_latency_secs
            );
        }
        if !self.silence_timeout_secs.is_finite()
            || self.silence_timeout_secs <= 0.0
            || self.silence_timeout_secs > MAX_SILENCE_TIMEOUT_SECS
        {
            bail!(
                "--silence-timeout-secs must be between 0 and {MAX_SILENCE_TIMEOUT_SECS}, got {}",
                self.silence_timeout_secs
            );
        }
        if self.beam_size > MAX_BEAM_SIZE {
            bail!(
                "--beam-size must be at most {MAX_BEAM_SIZE}, got {}",
                self.beam_size
            );
        }
        if !(0.0..=1.0).contains(&self.temperature) {
            bail!(
                "--temperature must be between 0.0 and 1.0, got {}",
                self.temperature
            );
        }
        if !(0.0..=1.0).contains(&self.no_speech_threshold) {
            bail!(
                "--no-speech-threshold must be between 0.0 and 1.0, got {}",
                self.no_speech_threshold
            );
        }
        if !self.min_avg_logprob.is_finite() || self.min_avg_logprob > 0.0 {
            bail!(
                "--min-avg-logprob must be a finite value <= 0.0, got {}",
                self.min_avg_logprob
            );
        }
        if !self.min_chars_per_sec.is_finite() || self.min_chars_per_sec < 0.0 {
            bail!(
                "--min-chars-per-sec must be non-negative, got {}",
                self.min_chars_per_sec
            );
        }
        if !valid_language(&self.lang) {
            bail!(
                "--lang must be \"auto\" or a short language code, got {:?}",
                self.lang
            );
        }
        Ok(())
    }
}

fn valid_language(lang: &str) -> bool {
    if lang.eq_ignore_ascii_case("auto") {
        return true;
    }
    (2..=8).contains(&lang.len())
        && lang
            .chars()
            .all(|c| c.is_ascii_lowercase() || c == '-')
}

/// Partial option set a JSON config file may carry; values present here
/// replace the CLI's. Unknown keys are rejected.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFileOverlay {
    pub model: Option<String>,
    pub strategy: Option<StrategyKind>,
    pub input_device: Option<String>,
    pub lang: Option<String>,
    pub translate: Option<bool>,
    pub sample_rate: Option<u32>,
    pub chunk_ms: Option<u64>,
    pub max_buffer_secs: Option<f64>,
    pub overlap_secs: Option<f64>,
    pub interval_secs: Option<f64>,
    pub max_latency_secs: Option<f64>,
    pub silence_timeout_secs: Option<f64>,
    pub beam_size: Option<u32>,
    pub temperature: Option<f32>,
    pub initial_prompt: Option<String>,
    pub no_speech_threshold: Option<f32>,
    pub min_avg_logprob: Option<f32>,
    pub min_chars_per_sec: Option<f32>,
    pub warm_up: Option<bool>,
}

impl ConfigFileOverlay {
    pub fn apply(self, config: &mut AppConfig) {
        if let Some(model) = self.model {
            config.model_path = Some(model.into());
        }
        if let Some(strategy) = self.strategy {
            config.strategy = strategy;
        }
        if let Some(device) = self.input_device {
            config.input_device = Some(device);
        }
        if let Some(lang) = self.lang {
            config.lang = lang;
        }
        if let Some(translate) = self.translate {
            config.translate = translate;
        }
        if let Some(rate) = self.sample_rate {
            config.sample_rate = rate;
        }
        if let Some(chunk_ms) = self.chunk_ms {
            config.chunk_ms = chunk_ms;
        }
        if let Some(secs) = self.max_buffer_secs {
            config.max_buffer_secs = secs;
        }
        if let Some(secs) = self.overlap_secs {
            config.overlap_secs = secs;
        }
        if let Some(secs) = self.interval_secs {
            config.interval_secs = secs;
        }
        if let Some(secs) = self.max_latency_secs {
            config.max_latency_secs = secs;
        }
        if let Some(secs) = self.silence_timeout_secs {
            config.silence_timeout_secs = secs;
        }
        if let Some(beam) = self.beam_size {
            config.beam_size = beam;
        }
        if let Some(temperature) = self.temperature {
            config.temperature = temperature;
        }
        if let Some(prompt) = self.initial_prompt {
            config.initial_prompt = Some(prompt);
        }
        if let Some(threshold) = self.no_speech_threshold {
            config.no_speech_threshold = threshold;
        }
        if let Some(floor) = self.min_avg_logprob {
            config.min_avg_logprob = floor;
        }
        if let Some(density) = self.min_chars_per_sec {
            config.min_chars_per_sec = density;
        }
        if let Some(warm_up) = self.warm_up {
            config.warm_up = warm_up;
        }
    }
}

/// Read and parse a JSON config overlay.
pub fn load_config_file(path: &Path) -> Result<ConfigFileOverlay> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("invalid config file {}", path.display()))
}
