//! Post-decode segment filtering: duplicate suppression across overlapping
//! windows, confidence gating, and hallucination cleanup.

use crate::decode::Segment;
use regex::Regex;
use std::sync::OnceLock;

/// Tunable thresholds for [`SegmentFilter`]. The defaults favor dropping
/// ambiguous speech over risking hallucinated repeats.
#[derive(Debug, Clone)]
pub struct FilterConfig {
    /// Segments below this mean log-probability are suspect.
    pub min_avg_logprob: f32,
    /// A suspect segment is still admitted when its character-to-duration
    /// ratio is at least this dense (short but likely-correct fragments).
    pub min_chars_per_sec: f32,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            min_avg_logprob: -1.0,
            min_chars_per_sec: 6.0,
        }
    }
}

/// Outcome of filtering one decode's segments.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterOutcome {
    /// Joined text of the surviving segments.
    Text(String),
    /// Nothing survived: treat as a silence / no-new-speech condition.
    NoNewSpeech,
}

/// Tracks the last emitted end time so already-reported speech is never
/// re-announced, and applies the confidence and hallucination gates.
pub struct SegmentFilter {
    config: FilterConfig,
    last_end: f32,
}

impl SegmentFilter {
    pub fn new(config: FilterConfig) -> Self {
        Self {
            config,
            last_end: 0.0,
        }
    }

    /// Stream-absolute end time of the last emitted segment.
    pub fn last_end(&self) -> f32 {
        self.last_end
    }

    /// Reset the marker to `origin` (the time offset of a freshly cleared
    /// buffer) so speech in the new window is admissible again.
    pub fn reset(&mut self, origin: f32) {
        self.last_end = origin;
    }

    /// Filter one decode's segments. `offset` is the stream-absolute time of
    /// the decoded window's origin; segment times are re-based against it so
    /// the monotonic gate holds across a rolling buffer.
    pub fn admit(&mut self, segments: &[Segment], offset: f32) -> FilterOutcome {
        let mut joined = String::new();
        let mut latest_end = self.last_end;

        for segment in segments {
            let end = offset + segment.end;
            if end <= self.last_end {
                // Already reported by an earlier, overlapping window.
                continue;
            }
            if !self.is_confident(segment) {
                tracing::debug!(
                    avg_logprob = segment.avg_logprob,
                    text = %segment.text,
                    "dropping low-confidence segment"
                );
                continue;
            }
            let cleaned = scrub_text(&segment.text);
            if cleaned.is_empty() {
                continue;
            }
            if !joined.is_empty() {
                joined.push(' ');
            }
            joined.push_str(&cleaned);
            latest_end = latest_end.max(end);
        }

        if joined.is_empty() {
            FilterOutcome::NoNewSpeech
        } else {
            self.last_end = latest_end;
            FilterOutcome::Text(joined)
        }
    }

    fn is_confident(&self, segment: &Segment) -> bool {
        if segment.avg_logprob >= self.config.min_avg_logprob {
            return true;
        }
        let duration = (segment.end - segment.start).max(f32::EPSILON);
        let density = segment.text.trim().chars().count() as f32 / duration;
        density >= self.config.min_chars_per_sec
    }
}

/// Strip non-speech markers and the closing-phrase hallucinations whisper
/// models are prone to emit on silence, then collapse whitespace.
pub(crate) fn scrub_text(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    static NON_SPEECH_RE: OnceLock<Regex> = OnceLock::new();
    let non_speech = NON_SPEECH_RE.get_or_init(|| {
        Regex::new(
            r"(?i)\[\s*\]|\(\s*\)|\[(?:\s*(?:silence|noise|inaudible|blank_audio|blank audio|music|laughter|applause|cough|breath(?:ing)?|wind|background)\s*)\]|\((?:\s*(?:silence|noise|inaudible|blank audio|music|laughter|applause|cough|breath(?:ing)?|wind|background)\s*)\)",
        )
        .expect("non-speech regex should compile")
    });

    // Stock sign-off phrases the model hallucinates from trailing silence.
    // Punctuation hanging off a matched phrase goes with it.
    static BAN_PHRASE_RE: OnceLock<Regex> = OnceLock::new();
    let ban = BAN_PHRASE_RE.get_or_init(|| {
        Regex::new(
            r"(?i)(?:thanks? (?:you )?for (?:watching|listening|tuning in|joining us)|(?:please|remember to|don't forget to) (?:like and )?subscribe|see you (?:next time|in the next video)|hit the bell|ご視聴ありがとうございました|チャンネル登録よろしくお願いします|感謝觀看|感谢观看|記得訂閱|别忘了订阅|시청해 주셔서 감사합니다|gracias por ver|merci d'avoir regardé|danke fürs zuschauen|obrigado por assistir|спасибо за просмотр)(?:\s*[[:punct:]。、，！？…]+)?",
        )
        .expect("ban-phrase regex should compile")
    });

    let without_markers = non_speech.replace_all(trimmed, " ");
    let had_hallucination = ban.is_match(&without_markers);
    let without_hallucinations = ban.replace_all(&without_markers, " ");
    let collapsed = without_hallucinations
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    // A phrase removal can strand leading punctuation ("...", quotes); if
    // nothing word-like is left the whole segment was hallucinated.
    if had_hallucination && !collapsed.chars().any(char::is_alphanumeric) {
        return String::new();
    }
    collapsed
}
