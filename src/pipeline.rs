//! End-to-end wiring: capture producer, decode consumer, relay, translator.
//!
//! One producer thread per stream feeds the bounded queue; one consumer
//! thread owns the decoder and the windowing strategy and performs every
//! decode synchronously, so no two decodes ever overlap. The two sides
//! share nothing but the queue. `stop` is cooperative: production and
//! scheduling cease, any in-flight decode completes, queued audio drains.

use crate::audio::{AudioInputStream, Recorder};
use crate::config::{AppConfig, StrategyKind};
use crate::decode::{DecodeParameters, Decoder};
use crate::relay::{StreamRelay, Translator};
use crate::window::{CaptionStrategy, OverlapWindow, SegmentFilter, SlidingWindow};
use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

/// Messages the consumer thread reports to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptionEvent {
    /// New caption text, in non-decreasing source-time order.
    Caption(String),
    /// One debounced blank marker: the speaker has gone quiet.
    Silence,
    /// A non-fatal stage error, reported rather than swallowed.
    Error(String),
}

/// Handle to a running caption job.
pub struct CaptionJob {
    pub receiver: mpsc::Receiver<CaptionEvent>,
    stop_flag: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl CaptionJob {
    /// Signal the pipeline to stop. Idempotent; `join` waits for shutdown.
    pub fn request_stop(&self) {
        self.stop_flag.store(true, Ordering::Relaxed);
    }

    /// Wait for the consumer (and its producer) to finish.
    pub fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!("caption worker panicked during shutdown");
            }
        }
    }
}

impl Drop for CaptionJob {
    fn drop(&mut self) {
        self.request_stop();
        self.join();
    }
}

/// Build the configured strategy.
pub fn build_strategy(config: &AppConfig) -> CaptionStrategy {
    match config.strategy {
        StrategyKind::Overlap => CaptionStrategy::Overlap(OverlapWindow::new(
            config.max_samples(),
            config.overlap_samples(),
        )),
        StrategyKind::Sliding => CaptionStrategy::Sliding(SlidingWindow::new(
            config.max_samples(),
            config.interval_secs as f32,
            config.sample_rate,
            SegmentFilter::new(config.filter_config()),
        )),
    }
}

/// Spawn the caption pipeline. `recorder_factory` runs on the producer
/// thread (capture resources are rarely `Send`); `decoder_factory` runs on
/// the consumer thread, which then owns the decoder exclusively. Startup
/// resource failures surface as a single [`CaptionEvent::Error`] followed by
/// stream end.
pub fn start_caption_job<R, FR, D, FD>(
    recorder_factory: FR,
    decoder_factory: FD,
    translator: Option<Box<dyn Translator + Send>>,
    config: AppConfig,
) -> CaptionJob
where
    R: Recorder,
    FR: FnOnce() -> Result<R> + Send + 'static,
    D: Decoder,
    FD: FnOnce() -> Result<D> + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    let stop_flag = Arc::new(AtomicBool::new(false));
    let consumer_stop = stop_flag.clone();

    let handle = thread::Builder::new()
        .name("livecap-decode".to_string())
        .spawn(move || {
            run_pipeline(recorder_factory, decoder_factory, translator, config, &tx, &consumer_stop);
        })
        .ok();

    CaptionJob {
        receiver: rx,
        stop_flag,
        handle,
    }
}

fn run_pipeline<R, FR, D, FD>(
    recorder_factory: FR,
    decoder_factory: FD,
    translator: Option<Box<dyn Translator + Send>>,
    config: AppConfig,
    events: &mpsc::Sender<CaptionEvent>,
    stop: &AtomicBool,
) where
    R: Recorder,
    FR: FnOnce() -> Result<R> + Send + 'static,
    D: Decoder,
    FD: FnOnce() -> Result<D> + Send + 'static,
{
    let decoder = match decoder_factory() {
        Ok(decoder) => decoder,
        Err(err) => {
            let _ = events.send(CaptionEvent::Error(format!(
                "failed to initialize decoder: {err:#}"
            )));
            return;
        }
    };

    let mut input = match AudioInputStream::start(
        recorder_factory,
        config.block_size(),
        config.queue_capacity(),
    ) {
        Ok(input) => input,
        Err(err) => {
            let _ = events.send(CaptionEvent::Error(format!("{err:#}")));
            return;
        }
    };

    let params: DecodeParameters = config.decode_parameters();
    let mut strategy = build_strategy(&config);
    let mut relay = StreamRelay::new(Duration::from_secs_f64(config.silence_timeout_secs));

    tracing::info!(
        strategy = strategy.label(),
        sample_rate = config.sample_rate,
        queue_capacity = config.queue_capacity(),
        "caption pipeline starting"
    );

    if config.warm_up {
        strategy.warm_up(&decoder, &params);
    }

    for chunk in input.chunks() {
        if stop.load(Ordering::Relaxed) {
            break;
        }
        let Some(text) = strategy.push_chunk(chunk, &decoder, &params) else {
            continue;
        };
        let Some(forwarded) = relay.offer(&text) else {
            continue;
        };
        let event = if forwarded.is_empty() {
            CaptionEvent::Silence
        } else {
            match translate(&translator, &forwarded) {
                Ok(translated) => CaptionEvent::Caption(translated),
                // Translation faults are hard failures of that stage;
                // surface them instead of emitting partial output.
                Err(err) => CaptionEvent::Error(format!("translation failed: {err:#}")),
            }
        };
        if events.send(event).is_err() {
            // Caller went away; shut the stream down.
            break;
        }
    }

    input.stop();
    tracing::info!("caption pipeline stopped");
}

fn translate(translator: &Option<Box<dyn Translator + Send>>, text: &str) -> Result<String> {
    match translator {
        Some(translator) => translator.translate(text),
        None => Ok(text.to_string()),
    }
}
