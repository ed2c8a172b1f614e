//! Software clock backend.
//!
//! Renders blocks on a dedicated thread at the real-time block cadence and
//! discards them. Useful for headless runs where no audio device exists but
//! the phase clock should still advance like a real stream.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::{AudioBackend, AudioStream, RenderCallback, StreamSpec};
use crate::error::GeneratorError;

pub const DEFAULT_CLOCK_SAMPLE_RATE: u32 = 48_000;

#[derive(Debug, Clone)]
pub struct ClockBackend {
    sample_rate: u32,
}

impl ClockBackend {
    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate }
    }
}

impl Default for ClockBackend {
    fn default() -> Self {
        Self::new(DEFAULT_CLOCK_SAMPLE_RATE)
    }
}

impl AudioBackend for ClockBackend {
    fn name(&self) -> &'static str {
        "clock"
    }

    fn sample_rate(&self) -> Result<u32, GeneratorError> {
        if self.sample_rate == 0 {
            return Err(GeneratorError::DeviceUnavailable(
                "Clock backend configured with a zero sample rate".to_string(),
            ));
        }
        Ok(self.sample_rate)
    }

    fn open_stream(
        &mut self,
        spec: StreamSpec,
        render: RenderCallback,
    ) -> Result<Box<dyn AudioStream>, GeneratorError> {
        if spec.sample_rate == 0 || spec.block_size == 0 {
            return Err(GeneratorError::StreamBuild(format!(
                "Invalid clock stream: {} Hz, block {}",
                spec.sample_rate, spec.block_size
            )));
        }
        Ok(Box::new(ClockStream {
            spec,
            render,
            stop: Arc::new(AtomicBool::new(false)),
            handle: None,
        }))
    }
}

struct ClockStream {
    spec: StreamSpec,
    render: RenderCallback,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl AudioStream for ClockStream {
    fn play(&mut self) -> Result<(), GeneratorError> {
        if self.handle.is_some() {
            return Ok(());
        }
        self.stop.store(false, Ordering::Release);

        let stop = Arc::clone(&self.stop);
        let render = Arc::clone(&self.render);
        let block = self.spec.block_size as usize;
        let period =
            Duration::from_secs_f64(self.spec.block_size as f64 / self.spec.sample_rate as f64);

        let handle = thread::Builder::new()
            .name("gammasync-clock".into())
            .spawn(move || {
                debug!("Clock stream started ({:?} per block)", period);
                let mut buffer = vec![0.0f32; block];
                let mut deadline = Instant::now();
                while !stop.load(Ordering::Acquire) {
                    render(&mut buffer);
                    // Advance by whole blocks so sleep jitter never accumulates.
                    deadline += period;
                    let now = Instant::now();
                    if deadline > now {
                        thread::sleep(deadline - now);
                    } else if now - deadline > period * 4 {
                        warn!("Clock stream fell behind; resynchronising");
                        deadline = now;
                    }
                }
                debug!("Clock stream finished");
            })?;

        self.handle = Some(handle);
        Ok(())
    }

    fn pause(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Clock stream thread panicked");
            }
        }
    }
}

impl Drop for ClockStream {
    fn drop(&mut self) {
        self.pause();
    }
}
