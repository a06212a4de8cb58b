use super::validation::ConfigFileOverlay;
use super::{AppConfig, StrategyKind};
use clap::Parser;

fn config_from(args: &[&str]) -> AppConfig {
    let mut argv = vec!["livecap"];
    argv.extend_from_slice(args);
    AppConfig::parse_from(argv)
}

#[test]
fn defaults_parse_and_validate() {
    let mut config = config_from(&[]);
    assert!(config.validate().is_ok());
    assert_eq!(config.strategy, StrategyKind::Overlap);
    assert_eq!(config.sample_rate, 16_000);
    assert_eq!(config.chunk_ms, 100);
    assert_eq!(config.lang, "auto");
    assert!(!config.translate);
    assert!(!config.warm_up);
}

#[test]
fn block_size_follows_rate_and_chunk_duration() {
    let config = config_from(&["--sample-rate", "16000", "--chunk-ms", "100"]);
    assert_eq!(config.block_size(), 1600);

    let config = config_from(&["--sample-rate", "8000", "--chunk-ms", "250"]);
    assert_eq!(config.block_size(), 2000);
}

#[test]
fn queue_capacity_rounds_up_to_bound_latency() {
    // 3.0 s of latency over 100 ms chunks: exactly 30 chunks.
    let config = config_from(&["--max-latency-secs", "3.0", "--chunk-ms", "100"]);
    assert_eq!(config.queue_capacity(), 30);

    // 0.25 s over 100 ms chunks is 2.5; a partial chunk still counts.
    let config = config_from(&["--max-latency-secs", "0.25", "--chunk-ms", "100"]);
    assert_eq!(config.queue_capacity(), 3);
}

#[test]
fn window_sizes_convert_seconds_to_samples() {
    let config = config_from(&[
        "--sample-rate",
        "16000",
        "--max-buffer-secs",
        "5.0",
        "--overlap-secs",
        "3.0",
    ]);
    assert_eq!(config.max_samples(), 80_000);
    assert_eq!(config.overlap_samples(), 48_000);
}

#[test]
fn decode_parameters_map_auto_language_to_detection() {
    let auto = config_from(&[]).decode_parameters();
    assert_eq!(auto.language, None);

    let fixed = config_from(&["--lang", "de", "--translate"]).decode_parameters();
    assert_eq!(fixed.language.as_deref(), Some("de"));
    assert!(fixed.translate);
}

#[test]
fn rejects_out_of_range_sample_rate() {
    assert!(config_from(&["--sample-rate", "4000"]).validate().is_err());
    assert!(config_from(&["--sample-rate", "96000"]).validate().is_err());
}

#[test]
fn rejects_out_of_range_chunk_duration() {
    assert!(config_from(&["--chunk-ms", "5"]).validate().is_err());
    assert!(config_from(&["--chunk-ms", "2000"]).validate().is_err());
}

#[test]
fn rejects_overlap_at_or_above_the_window() {
    let mut config = config_from(&["--max-buffer-secs", "5.0", "--overlap-secs", "5.0"]);
    assert!(config.validate().is_err());
    let mut config = config_from(&["--max-buffer-secs", "5.0", "--overlap-secs", "4.9"]);
    assert!(config.validate().is_ok());
}

#[test]
fn rejects_latency_below_one_chunk() {
    let mut config = config_from(&["--chunk-ms", "200", "--max-latency-secs", "0.1"]);
    assert!(config.validate().is_err());
}

#[test]
fn rejects_non_positive_silence_timeout() {
    assert!(config_from(&["--silence-timeout-secs", "0"]).validate().is_err());
    assert!(config_from(&["--silence-timeout-secs", "-1"]).validate().is_err());
}

#[test]
fn rejects_temperature_outside_unit_range() {
    assert!(config_from(&["--temperature", "1.5"]).validate().is_err());
    assert!(config_from(&["--temperature", "-0.1"]).validate().is_err());
}

#[test]
fn no_speech_threshold_reaches_the_decoder_parameters() {
    let params = config_from(&["--no-speech-threshold", "0.4"]).decode_parameters();
    assert_eq!(params.no_speech_threshold, 0.4);

    let defaults = config_from(&[]).decode_parameters();
    assert_eq!(defaults.no_speech_threshold, super::DEFAULT_NO_SPEECH_THRESHOLD);
}

#[test]
fn rejects_no_speech_threshold_outside_unit_range() {
    assert!(config_from(&["--no-speech-threshold", "1.5"])
        .validate()
        .is_err());
    assert!(config_from(&["--no-speech-threshold", "-0.2"])
        .validate()
        .is_err());
    assert!(config_from(&["--no-speech-threshold", "0.0"])
        .validate()
        .is_ok());
}

#[test]
fn rejects_oversized_beam() {
    assert!(config_from(&["--beam-size", "64"]).validate().is_err());
    assert!(config_from(&["--beam-size", "1"]).validate().is_ok());
}

#[test]
fn rejects_positive_logprob_floor() {
    assert!(config_from(&["--min-avg-logprob", "0.5"]).validate().is_err());
    assert!(config_from(&["--min-avg-logprob", "-2.0"]).validate().is_ok());
}

#[test]
fn accepts_short_language_codes_only() {
    assert!(config_from(&["--lang", "en"]).validate().is_ok());
    assert!(config_from(&["--lang", "zh-hans"]).validate().is_ok());
    assert!(config_from(&["--lang", "AUTO"]).validate().is_ok());
    assert!(config_from(&["--lang", "x"]).validate().is_err());
    assert!(config_from(&["--lang", "English!"]).validate().is_err());
}

#[test]
fn overlay_replaces_only_present_fields() {
    let overlay: ConfigFileOverlay = serde_json::from_str(
        r#"{
            "strategy": "sliding",
            "lang": "ja",
            "interval_secs": 1.0,
            "no_speech_threshold": 0.5,
            "warm_up": true
        }"#,
    )
    .expect("valid overlay");

    let mut config = config_from(&["--chunk-ms", "50"]);
    overlay.apply(&mut config);

    assert_eq!(config.strategy, StrategyKind::Sliding);
    assert_eq!(config.lang, "ja");
    assert_eq!(config.interval_secs, 1.0);
    assert_eq!(config.no_speech_threshold, 0.5);
    assert!(config.warm_up);
    // CLI values without an overlay entry are untouched.
    assert_eq!(config.chunk_ms, 50);
}

#[test]
fn overlay_rejects_unknown_keys() {
    let result: Result<ConfigFileOverlay, _> =
        serde_json::from_str(r#"{"not_an_option": true}"#);
    assert!(result.is_err());
}

#[test]
fn overlay_can_set_the_model_path() {
    let overlay: ConfigFileOverlay =
        serde_json::from_str(r#"{"model": "/models/ggml-base.bin"}"#).expect("valid overlay");
    let mut config = config_from(&[]);
    overlay.apply(&mut config);
    assert_eq!(
        config.model_path.as_deref(),
        Some(std::path::Path::new("/models/ggml-base.bin"))
    );
}

#[test]
fn strategy_labels_match_cli_names() {
    assert_eq!(StrategyKind::Overlap.label(), "overlap");
    assert_eq!(StrategyKind::Sliding.label(), "sliding");
}
