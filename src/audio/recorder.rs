//! Capture devices behind the [`Recorder`] seam.
//!
//! A recorder delivers exactly `block_size` mono samples per call, padding
//! with silence when the real source under-delivers within its timeout, so
//! the producer loop never stalls on a slow or faulty device. The cpal
//! implementation normalizes format, channel count, and sample rate.

use super::resample::convert_frame_to_target;
use super::{append_downmixed_samples, TARGET_RATE};
use anyhow::{anyhow, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, TrySendError};
use std::time::{Duration, Instant};

/// Source of fixed-size audio blocks.
///
/// Implementations own their capture resource; dropping the recorder
/// releases it. `record` must return exactly `block_size` samples at the
/// pipeline sample rate within a bounded time.
pub trait Recorder {
    fn record(&mut self, block_size: usize) -> Result<Vec<f32>>;

    fn device_name(&self) -> String {
        "unknown device".to_string()
    }
}

/// Assembles exact-size blocks from irregular capture batches, padding with
/// a fill value once the time budget runs out.
pub struct BlockAssembler {
    pending: Vec<f32>,
    fill_value: f32,
}

impl BlockAssembler {
    pub fn new(fill_value: f32) -> Self {
        Self {
            pending: Vec::new(),
            fill_value,
        }
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Pull batches via `pull` until `block_size` samples are pending or the
    /// budget elapses, then return exactly `block_size` samples. Shortfall is
    /// synthesized from the fill value so callers never block indefinitely.
    pub fn take_block<F>(&mut self, block_size: usize, budget: Duration, mut pull: F) -> Vec<f32>
    where
        F: FnMut(Duration) -> Option<Vec<f32>>,
    {
        let deadline = Instant::now() + budget;
        while self.pending.len() < block_size {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            match pull(deadline - now) {
                Some(batch) => self.pending.extend(batch),
                None => break,
            }
        }
        if self.pending.len() < block_size {
            let missing = block_size - self.pending.len();
            self.pending
                .extend(std::iter::repeat(self.fill_value).take(missing));
        }
        self.pending.drain(..block_size).collect()
    }
}

/// Batches the capture callback can queue before overflow; overflow drops the
/// newest batch and is surfaced in the trace log.
const CAPTURE_CHANNEL_CAPACITY: usize = 256;

/// Grace multiplier on the nominal block duration before silence fill kicks in.
const BLOCK_BUDGET_FACTOR: u32 = 2;

/// Microphone capture via cpal.
///
/// The input stream runs from construction until drop; the callback
/// down-mixes to mono at the device rate and hands batches to `record`
/// through a bounded channel. Construct this on the thread that will call
/// `record` (cpal streams do not move across threads).
pub struct CpalRecorder {
    _stream: cpal::Stream,
    batches: Receiver<Vec<f32>>,
    assembler: BlockAssembler,
    device_rate: u32,
    target_rate: u32,
    name: String,
}

impl CpalRecorder {
    /// List input device names so the CLI can expose a selector.
    pub fn list_devices() -> Result<Vec<String>> {
        let host = cpal::default_host();
        let devices = host.input_devices().context("no input devices available")?;
        let mut names = Vec::new();
        for device in devices {
            if let Ok(name) = device.name() {
                names.push(name);
            }
        }
        Ok(names)
    }

    /// Open the preferred device (or the default) and start capturing.
    pub fn new(preferred_device: Option<&str>, target_rate: u32) -> Result<Self> {
        let host = cpal::default_host();
        let device = match preferred_device {
            Some(name) => {
                let mut devices = host.input_devices().context("no input devices available")?;
                devices
                    .find(|d| d.name().map(|n| n == name).unwrap_or(false))
                    .ok_or_else(|| anyhow!("input device '{name}' not found"))?
            }
            None => host
                .default_input_device()
                .context("no default input device available")?,
        };
        let name = device
            .name()
            .unwrap_or_else(|_| "unknown device".to_string());

        let default_config = device
            .default_input_config()
            .context("failed to query default input config")?;
        let format = default_config.sample_format();
        let config: StreamConfig = default_config.into();
        let device_rate = config.sample_rate.0;
        let channels = usize::from(config.channels.max(1));

        tracing::info!(
            device = %name,
            ?format,
            device_rate,
            channels,
            "opening capture stream"
        );

        let (tx, rx) = bounded::<Vec<f32>>(CAPTURE_CHANNEL_CAPACITY);
        let err_fn = |err| tracing::warn!(error = %err, "capture stream error");

        // Convert every supported sample type to mono f32 in the callback so
        // the rest of the pipeline stays format-agnostic.
        macro_rules! build {
            ($ty:ty, $convert:expr) => {{
                let tx = tx.clone();
                device.build_input_stream(
                    &config,
                    move |data: &[$ty], _| {
                        let mut mono = Vec::with_capacity(data.len() / channels + 1);
                        append_downmixed_samples(&mut mono, data, channels, $convert);
                        if let Err(TrySendError::Full(_)) = tx.try_send(mono) {
                            tracing::debug!("capture channel full; dropping batch");
                        }
                    },
                    err_fn,
                    None,
                )
            }};
        }

        let stream = match format {
            SampleFormat::F32 => build!(f32, |sample| sample),
            SampleFormat::I16 => build!(i16, |sample| sample as f32 / 32_768.0_f32),
            SampleFormat::U16 => build!(u16, |sample| {
                (sample as f32 - 32_768.0_f32) / 32_768.0_f32
            }),
            other => return Err(anyhow!("unsupported sample format: {other:?}")),
        }
        .context("failed to build input stream")?;

        stream.play().context("failed to start input stream")?;

        Ok(Self {
            _stream: stream,
            batches: rx,
            assembler: BlockAssembler::new(0.0),
            device_rate,
            target_rate: if target_rate == 0 {
                TARGET_RATE
            } else {
                target_rate
            },
            name,
        })
    }
}

impl Recorder for CpalRecorder {
    fn record(&mut self, block_size: usize) -> Result<Vec<f32>> {
        // Work in device-rate samples; convert once a whole block is together.
        let device_block = ((block_size as u64 * u64::from(self.device_rate))
            / u64::from(self.target_rate))
        .max(1) as usize;
        let nominal = Duration::from_secs_f64(block_size as f64 / f64::from(self.target_rate));
        let budget = nominal * BLOCK_BUDGET_FACTOR;

        let batches = &self.batches;
        let raw = self
            .assembler
            .take_block(device_block, budget, |timeout| {
                match batches.recv_timeout(timeout) {
                    Ok(batch) => Some(batch),
                    Err(RecvTimeoutError::Timeout) => None,
                    Err(RecvTimeoutError::Disconnected) => None,
                }
            });

        Ok(convert_frame_to_target(
            raw,
            self.device_rate,
            self.target_rate,
            block_size,
        ))
    }

    fn device_name(&self) -> String {
        self.name.clone()
    }
}
