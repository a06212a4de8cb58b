use super::buffer::WindowBuffer;
use super::filter::{scrub_text, FilterConfig, FilterOutcome, SegmentFilter};
use super::overlap::OverlapWindow;
use super::sliding::SlidingWindow;
use super::CaptionStrategy;
use crate::decode::{DecodeParameters, Decoder, Segment};
use anyhow::{anyhow, Result};
use std::cell::RefCell;
use std::time::Duration;

fn segment(start: f32, end: f32, text: &str, avg_logprob: f32) -> Segment {
    Segment {
        start,
        end,
        text: text.to_string(),
        avg_logprob,
    }
}

/// Scripted decoder: records every window it sees and replays canned
/// responses in order, repeating the last one when the script runs out.
struct ScriptedDecoder {
    windows: RefCell<Vec<Vec<f32>>>,
    script: RefCell<Vec<Result<Vec<Segment>>>>,
    delay: Option<Duration>,
}

impl ScriptedDecoder {
    fn new(script: Vec<Result<Vec<Segment>>>) -> Self {
        Self {
            windows: RefCell::new(Vec::new()),
            script: RefCell::new(script),
            delay: None,
        }
    }

    fn silent() -> Self {
        Self::new(vec![Ok(Vec::new())])
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn calls(&self) -> usize {
        self.windows.borrow().len()
    }
}

impl Decoder for ScriptedDecoder {
    fn decode(&self, samples: &[f32], _params: &DecodeParameters) -> Result<Vec<Segment>> {
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        self.windows.borrow_mut().push(samples.to_vec());
        let mut script = self.script.borrow_mut();
        if script.len() > 1 {
            script.remove(0)
        } else {
            match script.first() {
                Some(Ok(segments)) => Ok(segments.clone()),
                Some(Err(err)) => Err(anyhow!("{err:#}")),
                None => Ok(Vec::new()),
            }
        }
    }
}

#[test]
fn buffer_tracks_totals_and_evicts_whole_chunks() {
    let mut buffer = WindowBuffer::new(10);
    buffer.push(vec![1.0; 4]);
    buffer.push(vec![2.0; 4]);
    buffer.push(vec![3.0; 4]);
    assert_eq!(buffer.total_samples(), 12);

    let evicted = buffer.evict_to_capacity();
    assert_eq!(evicted, 4, "one whole oldest chunk comes off the front");
    assert_eq!(buffer.total_samples(), 8);
    assert_eq!(buffer.concat()[0], 2.0);
}

#[test]
fn buffer_eviction_is_a_no_op_under_capacity() {
    let mut buffer = WindowBuffer::new(10);
    buffer.push(vec![0.0; 10]);
    assert_eq!(buffer.evict_to_capacity(), 0);
    assert_eq!(buffer.total_samples(), 10);
}

#[test]
fn buffer_fill_silence_reaches_capacity_in_pieces() {
    let mut buffer = WindowBuffer::new(100);
    buffer.push(vec![5.0; 40]);
    buffer.fill_silence(30);
    assert_eq!(buffer.total_samples(), 100);
    assert!(buffer.concat().iter().all(|&s| s == 0.0));
    // Pieces stay chunk-sized so ring eviction trims gradually.
    assert_eq!(buffer.evict_to_capacity(), 0);
    buffer.push(vec![1.0; 10]);
    assert_eq!(buffer.evict_to_capacity(), 30);
}

#[test]
fn overlap_decodes_on_full_and_retains_the_tail() {
    // max 1600, overlap 400: sixteen 100-sample chunks trigger exactly one
    // decode of the full window, then 400 samples remain.
    let decoder = ScriptedDecoder::new(vec![Ok(vec![segment(0.0, 1.0, "hello", -0.2)])]);
    let params = DecodeParameters::default();
    let mut window = OverlapWindow::new(1600, 400);

    let mut emitted = Vec::new();
    for _ in 0..16 {
        if let Some(text) = window.push_chunk(vec![1.0; 100], &decoder, &params) {
            emitted.push(text);
        }
    }

    assert_eq!(decoder.calls(), 1);
    assert_eq!(decoder.windows.borrow()[0].len(), 1600);
    assert_eq!(emitted, vec!["hello".to_string()]);
    assert_eq!(window.buffer().total_samples(), 400);
    assert!(window.buffer().concat().iter().all(|&s| s == 1.0));
}

#[test]
fn overlap_tail_is_clamped_below_the_window() {
    let decoder = ScriptedDecoder::silent();
    let params = DecodeParameters::default();
    // overlap >= max would never make progress; it is clamped to max - 1.
    let mut window = OverlapWindow::new(8, 8);
    let _ = window.push_chunk(vec![1.0; 8], &decoder, &params);
    assert_eq!(window.buffer().total_samples(), 7);
}

#[test]
fn overlap_reports_decode_failures_as_markers() {
    let decoder = ScriptedDecoder::new(vec![Err(anyhow!("model exploded"))]);
    let params = DecodeParameters::default();
    let mut window = OverlapWindow::new(4, 1);
    let text = window
        .push_chunk(vec![0.0; 4], &decoder, &params)
        .expect("full buffer must decode");
    assert_eq!(text, "[decode error: model exploded]");
    // The window still rolls over so the stream keeps moving.
    assert_eq!(window.buffer().total_samples(), 1);
}

#[test]
fn sliding_decodes_only_after_the_interval_fills() {
    let decoder = ScriptedDecoder::new(vec![Ok(vec![segment(0.0, 0.05, "one", -0.1)])]);
    let params = DecodeParameters::default();
    // 1 kHz, 0.1 s interval: a decode is due every 100 new samples.
    let mut window = SlidingWindow::new(1000, 0.1, 1000, SegmentFilter::new(FilterConfig::default()));

    assert_eq!(window.push_chunk(vec![0.5; 40], &decoder, &params), None);
    assert_eq!(window.push_chunk(vec![0.5; 40], &decoder, &params), None);
    let text = window.push_chunk(vec![0.5; 40], &decoder, &params);
    assert_eq!(text, Some("one".to_string()));
    assert_eq!(decoder.calls(), 1);
}

#[test]
fn sliding_ring_never_exceeds_capacity() {
    let decoder = ScriptedDecoder::silent();
    let params = DecodeParameters::default();
    let mut window = SlidingWindow::new(500, 10.0, 1000, SegmentFilter::new(FilterConfig::default()));
    for _ in 0..20 {
        let _ = window.push_chunk(vec![0.1; 100], &decoder, &params);
        assert!(window.buffer().total_samples() <= 500);
    }
}

#[test]
fn sliding_gate_suppresses_already_reported_speech() {
    // Two decodes over an overlapping ring: the second repeats the first
    // segment plus new speech; only the new speech comes through.
    let decoder = ScriptedDecoder::new(vec![
        Ok(vec![segment(0.0, 1.0, "first part", -0.1)]),
        Ok(vec![
            segment(0.0, 1.0, "first part", -0.1),
            segment(1.0, 2.0, "second part", -0.1),
        ]),
    ]);
    let params = DecodeParameters::default();
    // Capacity is generous so nothing is evicted and offsets stay at zero.
    let mut window =
        SlidingWindow::new(100_000, 1.0, 1000, SegmentFilter::new(FilterConfig::default()));

    let first = window.push_chunk(vec![0.5; 1000], &decoder, &params);
    assert_eq!(first, Some("first part".to_string()));
    let second = window.push_chunk(vec![0.5; 1000], &decoder, &params);
    assert_eq!(second, Some("second part".to_string()));
    assert_eq!(window.last_emitted_end(), 2.0);
}

#[test]
fn sliding_rebases_times_by_evicted_samples() {
    // Ring of 1000 at 1 kHz; after 2000 pushed samples, 1000 are evicted and
    // the window origin sits at t=1.0s. A segment ending at window-relative
    // 0.5s is stream-absolute 1.5s and must pass a gate at 1.2s.
    let decoder = ScriptedDecoder::new(vec![
        Ok(vec![segment(0.0, 1.2, "early", -0.1)]),
        Ok(vec![segment(0.0, 0.5, "later", -0.1)]),
    ]);
    let params = DecodeParameters::default();
    let mut window =
        SlidingWindow::new(1000, 1.0, 1000, SegmentFilter::new(FilterConfig::default()));

    let first = window.push_chunk(vec![0.5; 1000], &decoder, &params);
    assert_eq!(first, Some("early".to_string()));
    assert_eq!(window.last_emitted_end(), 1.2);

    let second = window.push_chunk(vec![0.5; 1000], &decoder, &params);
    assert_eq!(second, Some("later".to_string()));
    assert_eq!(window.last_emitted_end(), 1.5);
}

#[test]
fn sliding_pacing_stretches_under_slow_decodes() {
    let decoder = ScriptedDecoder::new(vec![Ok(vec![segment(0.0, 0.1, "slow", -0.1)])])
        .with_delay(Duration::from_millis(100));
    let params = DecodeParameters::default();
    // Configured floor is 10 ms; a ~100 ms decode must stretch the interval
    // to at least 1.5 x the measured cost.
    let mut window =
        SlidingWindow::new(100_000, 0.01, 16_000, SegmentFilter::new(FilterConfig::default()));

    window
        .push_chunk(vec![0.5; 200], &decoder, &params)
        .expect("interval elapsed, decode due");

    // 1.5 x 100 ms at 16 kHz is 2400 samples; allow timer slop downwards
    // but require a clear stretch beyond the 160-sample floor.
    assert!(
        window.interval_samples() >= 2000,
        "interval should pace off measured cost, got {}",
        window.interval_samples()
    );
}

#[test]
fn sliding_silence_resets_context_and_emits_one_empty_step() {
    let decoder = ScriptedDecoder::silent();
    let params = DecodeParameters::default();
    let mut window =
        SlidingWindow::new(1000, 0.1, 1000, SegmentFilter::new(FilterConfig::default()));

    let text = window.push_chunk(vec![0.0; 100], &decoder, &params);
    assert_eq!(text, Some(String::new()), "a silence step reports empty text");
    // The ring is refilled with pure silence to capacity.
    assert_eq!(window.buffer().total_samples(), 1000);
    assert!(window.buffer().concat().iter().all(|&s| s == 0.0));
}

#[test]
fn sliding_error_marker_does_not_clear_the_ring() {
    let decoder = ScriptedDecoder::new(vec![
        Err(anyhow!("transient fault")),
        Ok(vec![segment(0.0, 0.2, "recovered", -0.1)]),
    ]);
    let params = DecodeParameters::default();
    let mut window =
        SlidingWindow::new(1000, 0.1, 1000, SegmentFilter::new(FilterConfig::default()));

    let first = window.push_chunk(vec![0.5; 100], &decoder, &params);
    assert_eq!(first, Some("[decode error: transient fault]".to_string()));
    assert_eq!(window.buffer().total_samples(), 100, "audio survives the fault");

    let second = window.push_chunk(vec![0.5; 100], &decoder, &params);
    assert_eq!(second, Some("recovered".to_string()));
}

#[test]
fn strategy_labels_name_the_policy() {
    let overlap = CaptionStrategy::Overlap(OverlapWindow::new(16, 4));
    let sliding = CaptionStrategy::Sliding(SlidingWindow::new(
        16,
        1.0,
        16,
        SegmentFilter::new(FilterConfig::default()),
    ));
    assert_eq!(overlap.label(), "overlap");
    assert_eq!(sliding.label(), "sliding");
}

#[test]
fn warm_up_prefills_silence_and_survives_decoder_failure() {
    let decoder = ScriptedDecoder::new(vec![Err(anyhow!("not ready"))]);
    let params = DecodeParameters::default();
    let mut strategy = CaptionStrategy::Overlap(OverlapWindow::new(1000, 100));
    strategy.warm_up(&decoder, &params);
    let CaptionStrategy::Overlap(window) = &strategy else {
        unreachable!()
    };
    assert_eq!(window.buffer().total_samples(), 1000);
    assert!(window.buffer().concat().iter().all(|&s| s == 0.0));
}

#[test]
fn filter_drops_low_confidence_sparse_segments() {
    let mut filter = SegmentFilter::new(FilterConfig::default());
    // Below the logprob floor and only 2 chars over 2 seconds.
    let outcome = filter.admit(&[segment(0.0, 2.0, "uh", -2.5)], 0.0);
    assert_eq!(outcome, FilterOutcome::NoNewSpeech);
}

#[test]
fn filter_keeps_dense_segments_despite_low_confidence() {
    let mut filter = SegmentFilter::new(FilterConfig::default());
    // Low logprob but 20 chars in one second clears the density override.
    let outcome = filter.admit(&[segment(0.0, 1.0, "twenty characters ok", -2.5)], 0.0);
    assert_eq!(outcome, FilterOutcome::Text("twenty characters ok".to_string()));
}

#[test]
fn filter_joins_survivors_and_advances_the_marker() {
    let mut filter = SegmentFilter::new(FilterConfig::default());
    let outcome = filter.admit(
        &[
            segment(0.0, 1.0, "hello", -0.1),
            segment(1.0, 2.0, "world", -0.1),
        ],
        0.0,
    );
    assert_eq!(outcome, FilterOutcome::Text("hello world".to_string()));
    assert_eq!(filter.last_end(), 2.0);
}

#[test]
fn filter_reset_reopens_the_gate() {
    let mut filter = SegmentFilter::new(FilterConfig::default());
    filter.admit(&[segment(0.0, 5.0, "speech", -0.1)], 0.0);
    assert_eq!(
        filter.admit(&[segment(0.0, 1.0, "repeat", -0.1)], 0.0),
        FilterOutcome::NoNewSpeech
    );
    filter.reset(0.0);
    assert_eq!(
        filter.admit(&[segment(0.0, 1.0, "repeat", -0.1)], 0.0),
        FilterOutcome::Text("repeat".to_string())
    );
}

#[test]
fn scrub_removes_non_speech_markers() {
    assert_eq!(scrub_text("[silence]"), "");
    assert_eq!(scrub_text("(noise)"), "");
    assert_eq!(scrub_text("hello [inaudible] world"), "hello world");
    assert_eq!(scrub_text("  spaced   out  "), "spaced out");
}

#[test]
fn scrub_removes_sign_off_hallucinations() {
    assert_eq!(scrub_text("Thanks for watching!"), "");
    assert_eq!(scrub_text("ご視聴ありがとうございました"), "");
    assert_eq!(scrub_text("real speech. thanks for listening"), "real speech.");
}

#[test]
fn scrub_takes_dangling_punctuation_with_the_phrase() {
    assert_eq!(scrub_text("Thanks for watching..."), "");
    assert_eq!(scrub_text("ご視聴ありがとうございました。"), "");
    assert_eq!(scrub_text("\u{201c}thanks for watching\u{201d}"), "");
    // Punctuation belonging to real speech is untouched.
    assert_eq!(
        scrub_text("real speech. thanks for listening."),
        "real speech."
    );
}

#[test]
fn scrub_keeps_ordinary_text_intact() {
    assert_eq!(scrub_text("the quick brown fox"), "the quick brown fox");
}
