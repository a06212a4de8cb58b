//! livecap CLI: stream microphone audio into live stdout captions.

use anyhow::{bail, Result};
use livecap::audio::CpalRecorder;
use livecap::config::AppConfig;
use livecap::decode::WhisperDecoder;
use livecap::relay::OutputSink;
use livecap::{init_tracing, start_caption_job, CaptionEvent};
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Set from the SIGINT handler; the main loop polls it between events.
static INTERRUPTED: AtomicBool = AtomicBool::new(false);

struct StdoutSink;

impl OutputSink for StdoutSink {
    fn display(&mut self, text: &str) {
        if text.is_empty() {
            // Blank marker: the speaker went quiet.
            println!();
        } else {
            println!("{text}");
        }
        let _ = std::io::stdout().flush();
    }
}

fn main() {
    if let Err(err) = run() {
        eprintln!("livecap: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let config = AppConfig::parse_args()?;
    init_tracing(&config);

    if config.list_input_devices {
        return list_input_devices();
    }

    let Some(model_path) = config.model_path.clone() else {
        bail!("--model is required (or set LIVECAP_MODEL)");
    };
    let model_path = model_path.to_string_lossy().into_owned();

    install_interrupt_handler();

    let device = config.input_device.clone();
    let sample_rate = config.sample_rate;
    let mut job = start_caption_job(
        move || CpalRecorder::new(device.as_deref(), sample_rate),
        move || WhisperDecoder::new(&model_path),
        None,
        config,
    );

    let mut sink = StdoutSink;
    loop {
        if INTERRUPTED.load(Ordering::Relaxed) {
            job.request_stop();
            job.join();
            break;
        }
        match job.receiver.recv_timeout(Duration::from_millis(200)) {
            Ok(CaptionEvent::Caption(text)) => sink.display(&text),
            Ok(CaptionEvent::Silence) => sink.display(""),
            Ok(CaptionEvent::Error(message)) => {
                eprintln!("livecap: {message}");
            }
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => continue,
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    Ok(())
}

fn list_input_devices() -> Result<()> {
    match CpalRecorder::list_devices() {
        Ok(devices) if devices.is_empty() => {
            println!("No audio input devices detected.");
        }
        Ok(devices) => {
            println!("Detected audio input devices:");
            for name in devices {
                println!("  {name}");
            }
        }
        Err(err) => {
            println!("Failed to list audio input devices: {err:#}");
        }
    }
    Ok(())
}

#[cfg(unix)]
fn install_interrupt_handler() {
    unsafe extern "C" fn on_sigint(_: libc::c_int) {
        INTERRUPTED.store(true, Ordering::Relaxed);
    }
    let handler = on_sigint as unsafe extern "C" fn(libc::c_int);
    // SAFETY: the handler only touches an atomic flag.
    unsafe {
        libc::signal(libc::SIGINT, handler as libc::sighandler_t);
    }
}

#[cfg(not(unix))]
fn install_interrupt_handler() {}
