//! The acoustic decoder seam and its whisper.cpp implementation.
//!
//! The engine treats the model as a pure function from a finite sample
//! buffer plus parameters to timed text segments; all streaming state lives
//! on this side of the trait.

use anyhow::Result;

/// One timed unit of decoder output, relative to the decoded buffer's own
/// time origin.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    /// Start offset in seconds from the beginning of the decoded window.
    pub start: f32,
    /// End offset in seconds from the beginning of the decoded window.
    pub end: f32,
    pub text: String,
    /// Mean natural-log token probability; higher is more confident.
    pub avg_logprob: f32,
}

/// Immutable decode configuration, passed unchanged to every decode call
/// within an engine's lifetime.
#[derive(Debug, Clone)]
pub struct DecodeParameters {
    /// ISO 639-1 code, or `None` for auto-detection.
    pub language: Option<String>,
    /// Translate to English instead of transcribing.
    pub translate: bool,
    /// Beam size; values above 1 enable beam search.
    pub beam_size: u32,
    pub temperature: f32,
    /// Carried prompt that seeds the decoder's text context.
    pub initial_prompt: Option<String>,
    /// Suppress blank outputs at the start of sampling.
    pub suppress_blank: bool,
    /// Probability above which a window counts as containing no speech.
    pub no_speech_threshold: f32,
}

impl Default for DecodeParameters {
    fn default() -> Self {
        Self {
            language: None,
            translate: false,
            beam_size: 5,
            temperature: 0.0,
            initial_prompt: None,
            suppress_blank: true,
            no_speech_threshold: 0.7,
        }
    }
}

/// Black-box decode function. Must be callable repeatedly and statelessly
/// across calls; any cross-call memory travels through `params`.
pub trait Decoder {
    fn decode(&self, samples: &[f32], params: &DecodeParameters) -> Result<Vec<Segment>>;
}

#[cfg(unix)]
mod platform {
    use super::{DecodeParameters, Decoder, Segment};
    use anyhow::{anyhow, Context, Result};
    use std::io;
    use std::os::raw::{c_char, c_uint, c_void};
    use std::os::unix::io::AsRawFd;
    use std::sync::Once;
    use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

    /// Whisper model context. Load once at startup and reuse for every
    /// decode; the single consumer thread owns it exclusively.
    pub struct WhisperDecoder {
        ctx: WhisperContext,
    }

    impl WhisperDecoder {
        /// Load the GGML model from disk.
        ///
        /// Stderr is redirected to `/dev/null` while loading because
        /// whisper.cpp prints verbose initialization messages that would
        /// corrupt caption output.
        pub fn new(model_path: &str) -> Result<Self> {
            install_whisper_log_silencer();

            let null = std::fs::OpenOptions::new()
                .write(true)
                .open("/dev/null")
                .context("failed to open /dev/null")?;
            let null_fd = null.as_raw_fd();

            // SAFETY: dup(2) duplicates the stderr descriptor; we restore it
            // before returning and hold the only copy in between.
            let orig_stderr = unsafe { libc::dup(2) };
            if orig_stderr < 0 {
                return Err(anyhow!(
                    "failed to dup stderr: {}",
                    io::Error::last_os_error()
                ));
            }

            let dup_result = unsafe { libc::dup2(null_fd, 2) };
            if dup_result < 0 {
                unsafe {
                    libc::close(orig_stderr);
                }
                return Err(anyhow!(
                    "failed to redirect stderr: {}",
                    io::Error::last_os_error()
                ));
            }

            let ctx_result =
                WhisperContext::new_with_params(model_path, WhisperContextParameters::default());

            let restore_result = unsafe { libc::dup2(orig_stderr, 2) };
            unsafe {
                libc::close(orig_stderr);
            }
            if restore_result < 0 {
                return Err(anyhow!(
                    "failed to restore stderr: {}",
                    io::Error::last_os_error()
                ));
            }

            let ctx = ctx_result.context("failed to load whisper model")?;
            Ok(Self { ctx })
        }

        fn build_params<'a>(&self, config: &'a DecodeParameters) -> FullParams<'a, 'a> {
            let mut params = if config.beam_size > 1 {
                FullParams::new(SamplingStrategy::BeamSearch {
                    beam_size: config.beam_size as i32,
                    patience: -1.0,
                })
            } else {
                FullParams::new(SamplingStrategy::Greedy { best_of: 1 })
            };
            match config.language.as_deref() {
                Some(lang) => {
                    params.set_language(Some(lang));
                    params.set_detect_language(false);
                }
                None => {
                    params.set_language(None);
                    params.set_detect_language(true);
                }
            }
            if let Some(prompt) = config.initial_prompt.as_deref() {
                params.set_initial_prompt(prompt);
            }
            params.set_temperature(config.temperature);
            params.set_translate(config.translate);
            params.set_suppress_blank(config.suppress_blank);
            params.set_no_speech_thold(config.no_speech_threshold);
            // Cap threads so laptops don't max out all cores.
            params.set_n_threads(num_cpus::get().min(8) as i32);
            params.set_print_progress(false);
            params.set_print_timestamps(false);
            params.set_print_special(false);
            params.set_print_realtime(false);
            params.set_token_timestamps(false);
            params
        }
    }

    impl Decoder for WhisperDecoder {
        fn decode(&self, samples: &[f32], params: &DecodeParameters) -> Result<Vec<Segment>> {
            let mut state = self
                .ctx
                .create_state()
                .context("failed to create whisper state")?;
            state.full(self.build_params(params), samples)?;

            let num_segments = state.full_n_segments()?;
            let mut segments = Vec::with_capacity(num_segments.max(0) as usize);
            for i in 0..num_segments {
                let text = match state.full_get_segment_text_lossy(i) {
                    Ok(text) => text,
                    Err(err) => {
                        tracing::debug!(segment = i, error = %err, "failed to read segment text");
                        continue;
                    }
                };
                // Whisper reports timestamps in centiseconds.
                let start = state.full_get_segment_t0(i)? as f32 / 100.0;
                let end = state.full_get_segment_t1(i)? as f32 / 100.0;
                segments.push(Segment {
                    start,
                    end,
                    text,
                    avg_logprob: segment_avg_logprob(&state, i),
                });
            }
            Ok(segments)
        }
    }

    /// Mean ln(probability) over a segment's tokens; mirrors the
    /// `avg_logprob` faster-whisper reports per segment.
    fn segment_avg_logprob(state: &whisper_rs::WhisperState, segment: i32) -> f32 {
        let n_tokens = match state.full_n_tokens(segment) {
            Ok(n) if n > 0 => n,
            _ => return -10.0,
        };
        let mut sum = 0.0f32;
        let mut counted = 0usize;
        for t in 0..n_tokens {
            if let Ok(prob) = state.full_get_token_prob(segment, t) {
                sum += prob.max(1e-10).ln();
                counted += 1;
            }
        }
        if counted == 0 {
            return -10.0;
        }
        sum / counted as f32
    }

    fn install_whisper_log_silencer() {
        static INSTALL_LOG_CALLBACK: Once = Once::new();
        INSTALL_LOG_CALLBACK.call_once(|| unsafe {
            whisper_rs::set_log_callback(Some(whisper_log_callback), std::ptr::null_mut());
        });
    }

    unsafe extern "C" fn whisper_log_callback(
        _level: c_uint,
        _text: *const c_char,
        _user_data: *mut c_void,
    ) {
        // Silence the default whisper.cpp logger; captions own stdout/stderr.
    }
}

#[cfg(unix)]
pub use platform::WhisperDecoder;

#[cfg(not(unix))]
mod platform {
    use super::{DecodeParameters, Decoder, Segment};
    use anyhow::{anyhow, Result};

    /// Stub for unsupported targets such as Windows.
    pub struct WhisperDecoder;

    impl WhisperDecoder {
        pub fn new(_: &str) -> Result<Self> {
            Err(anyhow!(
                "whisper decoding is currently supported only on Unix-like platforms"
            ))
        }
    }

    impl Decoder for WhisperDecoder {
        fn decode(&self, _: &[f32], _: &DecodeParameters) -> Result<Vec<Segment>> {
            Err(anyhow!(
                "whisper decoding is currently supported only on Unix-like platforms"
            ))
        }
    }
}

#[cfg(not(unix))]
pub use platform::WhisperDecoder;
