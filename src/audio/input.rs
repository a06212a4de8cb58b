//! Producer worker that feeds the bounded queue from a [`Recorder`].

use super::queue::BoundedAudioQueue;
use super::recorder::Recorder;
use anyhow::{anyhow, Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};

/// How long the consumer parks on an empty queue before re-checking the
/// stop flag.
const CONSUMER_POLL: Duration = Duration::from_millis(200);

/// How long `start` waits for the producer to acquire its capture resource
/// before treating startup as failed.
const STARTUP_TIMEOUT: Duration = Duration::from_secs(10);

/// After a startup timeout, how long to keep waiting for the producer
/// thread to wind down before detaching it.
const STARTUP_JOIN_GRACE: Duration = Duration::from_secs(2);

/// One capture stream: a producer thread pulling fixed-size blocks from a
/// recorder into a [`BoundedAudioQueue`], and a pull-style chunk sequence on
/// the consumer side.
///
/// The recorder is constructed *on* the producer thread (capture resources
/// are rarely `Send`) and released when that thread exits, error or not.
pub struct AudioInputStream {
    queue: Arc<BoundedAudioQueue>,
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
    block_size: usize,
}

impl AudioInputStream {
    /// Spawn the producer. `factory` runs on the producer thread; a factory
    /// error is fatal and surfaces here (resource faults are fatal at
    /// startup only — once streaming, capture faults degrade to silence).
    pub fn start<R, F>(factory: F, block_size: usize, queue_capacity: usize) -> Result<Self>
    where
        R: Recorder,
        F: FnOnce() -> Result<R> + Send + 'static,
    {
        Self::start_with_timeout(factory, block_size, queue_capacity, STARTUP_TIMEOUT)
    }

    pub(super) fn start_with_timeout<R, F>(
        factory: F,
        block_size: usize,
        queue_capacity: usize,
        startup_timeout: Duration,
    ) -> Result<Self>
    where
        R: Recorder,
        F: FnOnce() -> Result<R> + Send + 'static,
    {
        let block_size = block_size.max(1);
        let queue = Arc::new(BoundedAudioQueue::new(queue_capacity));
        let stop = Arc::new(AtomicBool::new(false));
        let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<String>>(1);

        let producer_queue = queue.clone();
        let producer_stop = stop.clone();
        let handle = thread::Builder::new()
            .name("livecap-capture".to_string())
            .spawn(move || {
                let mut recorder = match factory() {
                    Ok(recorder) => {
                        let _ = ready_tx.send(Ok(recorder.device_name()));
                        recorder
                    }
                    Err(err) => {
                        let _ = ready_tx.send(Err(err));
                        return;
                    }
                };
                produce_loop(&mut recorder, block_size, &producer_queue, &producer_stop);
                // Recorder drops here: resource released even if the loop
                // bailed mid-iteration.
            })
            .context("failed to spawn capture thread")?;

        match ready_rx.recv_timeout(startup_timeout) {
            Ok(Ok(device)) => {
                tracing::info!(device = %device, block_size, "capture started");
            }
            Ok(Err(err)) => {
                let _ = handle.join();
                return Err(err.context("failed to acquire capture device"));
            }
            Err(_) => {
                stop.store(true, Ordering::Relaxed);
                // The thread may still be blocked inside `factory()`, where
                // the stop flag is not observable; give it a grace period so
                // a tardy capture resource is still released before we
                // report failure, and only detach as a last resort.
                let deadline = Instant::now() + STARTUP_JOIN_GRACE;
                while !handle.is_finished() && Instant::now() < deadline {
                    thread::sleep(Duration::from_millis(10));
                }
                if handle.is_finished() {
                    let _ = handle.join();
                } else {
                    tracing::warn!("capture thread unresponsive after startup timeout; detaching");
                }
                return Err(anyhow!(
                    "capture device did not come up within {startup_timeout:?}"
                ));
            }
        }

        Ok(Self {
            queue,
            stop,
            handle: Some(handle),
            block_size,
        })
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn queue(&self) -> &BoundedAudioQueue {
        &self.queue
    }

    /// Lazy, single-pass chunk sequence. Keeps yielding while the producer
    /// runs, and drains whatever is still queued after `stop`.
    pub fn chunks(&self) -> ChunkStream {
        ChunkStream {
            queue: self.queue.clone(),
            stop: self.stop.clone(),
            poll: CONSUMER_POLL,
        }
    }

    /// Signal the producer and join it. Idempotent; the stream cannot be
    /// restarted afterwards.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!("capture thread panicked during shutdown");
            }
        }
    }
}

impl Drop for AudioInputStream {
    fn drop(&mut self) {
        self.stop();
    }
}

fn produce_loop<R: Recorder>(
    recorder: &mut R,
    block_size: usize,
    queue: &BoundedAudioQueue,
    stop: &AtomicBool,
) {
    while !stop.load(Ordering::Relaxed) {
        match recorder.record(block_size) {
            Ok(chunk) => queue.push(chunk),
            Err(err) => {
                // Capture faults are non-fatal: keep downstream timing alive
                // with synthetic silence.
                tracing::warn!(error = %format!("{err:#}"), "capture fault; substituting silence");
                queue.push(vec![0.0; block_size]);
            }
        }
    }
    tracing::debug!(dropped = queue.dropped(), "capture loop exited");
}

/// Pull-side iterator over queued chunks. Not restartable once the stream
/// has stopped and drained.
pub struct ChunkStream {
    queue: Arc<BoundedAudioQueue>,
    stop: Arc<AtomicBool>,
    poll: Duration,
}

impl Iterator for ChunkStream {
    type Item = Vec<f32>;

    fn next(&mut self) -> Option<Vec<f32>> {
        loop {
            if self.stop.load(Ordering::Relaxed) {
                // Producer is done; hand out the backlog, then finish.
                return self.queue.try_pop();
            }
            if let Some(chunk) = self.queue.pop(self.poll) {
                return Some(chunk);
            }
        }
    }
}
