//! Signal generator: renders the modulated tone and answers phase queries.
//!
//! State shared with the audio thread is limited to the parameter snapshot
//! and the render cursor:
//!
//! - Parameters sit behind a `Mutex` that is only ever held to copy or
//!   replace the whole struct, never around waveform math. Every render block
//!   and every phase query sees a combination that actually existed.
//! - The cursor is an `AtomicU64` advanced only by the render path.
//! - The modulation frequency is mirrored into an atomic so the phase query
//!   never touches the lock.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tracing::{debug, info};

use super::oscillator::{OscillatorParams, modulation_phase};
use crate::backend::{
    AudioBackend, AudioStream, DEFAULT_BLOCK_SIZE, LatencyHint, RenderCallback, StreamSpec,
};
use crate::error::GeneratorError;

/// State shared between the owner, the audio thread and phase observers.
#[derive(Debug)]
struct Shared {
    params: Mutex<OscillatorParams>,
    /// Bit pattern of `params.modulation_frequency`; written under the lock.
    modulation_bits: AtomicU64,
    cursor: AtomicU64,
    running: AtomicBool,
    sample_rate: f64,
}

impl Shared {
    fn lock_params(&self) -> MutexGuard<'_, OscillatorParams> {
        // A panic while holding the lock cannot leave a torn Copy struct.
        self.params.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn snapshot(&self) -> OscillatorParams {
        *self.lock_params()
    }

    fn update(&self, f: impl FnOnce(&mut OscillatorParams)) -> Result<(), GeneratorError> {
        let mut guard = self.lock_params();
        let mut next = *guard;
        f(&mut next);
        next.validate()?;
        *guard = next;
        self.modulation_bits
            .store(next.modulation_frequency.to_bits(), Ordering::Release);
        Ok(())
    }

    fn render_into(&self, out: &mut [f32]) {
        let params = self.snapshot();
        let start = self.cursor.load(Ordering::Acquire);
        for (i, sample) in out.iter_mut().enumerate() {
            let t = (start + i as u64) as f64 / self.sample_rate;
            *sample = params.sample_at(t) as f32;
        }
        self.cursor.fetch_add(out.len() as u64, Ordering::AcqRel);
    }

    fn modulation_phase(&self) -> f64 {
        let cursor = self.cursor.load(Ordering::Acquire);
        let modulation = f64::from_bits(self.modulation_bits.load(Ordering::Acquire));
        modulation_phase(cursor, self.sample_rate, modulation)
    }
}

/// Amplitude-modulated tone generator bound to an audio backend.
///
/// Constructed once per session; `start`/`stop` may be called any number of
/// times and each start resets the render cursor to zero.
pub struct SignalGenerator {
    shared: Arc<Shared>,
    backend: Box<dyn AudioBackend>,
    stream: Option<Box<dyn AudioStream>>,
    block_size: u32,
    latency: LatencyHint,
}

impl SignalGenerator {
    /// Bind to `backend`, fixing the sample rate to the device's native rate.
    pub fn new(backend: Box<dyn AudioBackend>) -> Result<Self, GeneratorError> {
        Self::with_params(backend, OscillatorParams::default())
    }

    pub fn with_params(
        backend: Box<dyn AudioBackend>,
        params: OscillatorParams,
    ) -> Result<Self, GeneratorError> {
        params.validate()?;
        let sample_rate = backend.sample_rate()?;
        info!(
            "Signal generator on '{}' backend at {} Hz",
            backend.name(),
            sample_rate
        );
        Ok(SignalGenerator {
            shared: Arc::new(Shared {
                params: Mutex::new(params),
                modulation_bits: AtomicU64::new(params.modulation_frequency.to_bits()),
                cursor: AtomicU64::new(0),
                running: AtomicBool::new(false),
                sample_rate: sample_rate as f64,
            }),
            backend,
            stream: None,
            block_size: DEFAULT_BLOCK_SIZE,
            latency: LatencyHint::Low,
        })
    }

    /// Frames per callback requested when the next stream opens.
    pub fn with_block_size(mut self, block_size: u32) -> Self {
        self.block_size = block_size.max(1);
        self
    }

    pub fn with_latency(mut self, latency: LatencyHint) -> Self {
        self.latency = latency;
        self
    }

    /// Replace all four live parameters as one unit.
    pub fn configure(
        &self,
        carrier_hz: f64,
        modulation_hz: f64,
        depth: f64,
        amplitude: f64,
    ) -> Result<(), GeneratorError> {
        self.set_params(OscillatorParams {
            carrier_frequency: carrier_hz,
            modulation_frequency: modulation_hz,
            modulation_depth: depth,
            amplitude,
        })
    }

    pub fn set_params(&self, params: OscillatorParams) -> Result<(), GeneratorError> {
        self.shared.update(|p| *p = params)
    }

    pub fn set_carrier_frequency(&self, hz: f64) -> Result<(), GeneratorError> {
        self.shared.update(|p| p.carrier_frequency = hz)
    }

    pub fn set_modulation_frequency(&self, hz: f64) -> Result<(), GeneratorError> {
        self.shared.update(|p| p.modulation_frequency = hz)
    }

    pub fn set_modulation_depth(&self, depth: f64) -> Result<(), GeneratorError> {
        self.shared.update(|p| p.modulation_depth = depth)
    }

    pub fn set_amplitude(&self, amplitude: f64) -> Result<(), GeneratorError> {
        self.shared.update(|p| p.amplitude = amplitude)
    }

    /// Current parameter snapshot.
    pub fn params(&self) -> OscillatorParams {
        self.shared.snapshot()
    }

    /// Parameter handle for control surfaces on other threads.
    pub fn controls(&self) -> GeneratorControls {
        GeneratorControls {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.shared.sample_rate as u32
    }

    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    /// Samples rendered since the last start.
    pub fn cursor(&self) -> u64 {
        self.shared.cursor.load(Ordering::Acquire)
    }

    /// Render the next `frame_count` samples into a new buffer.
    ///
    /// Allocates; the audio callback uses [`render_into`](Self::render_into).
    pub fn render(&self, frame_count: usize) -> Vec<f32> {
        let mut out = vec![0.0; frame_count];
        self.shared.render_into(&mut out);
        out
    }

    /// Fill `out` with the next `out.len()` samples and advance the cursor.
    pub fn render_into(&self, out: &mut [f32]) {
        self.shared.render_into(out);
    }

    /// Fraction of the current modulation cycle elapsed, in [0, 1).
    pub fn modulation_phase(&self) -> f64 {
        self.shared.modulation_phase()
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// Non-owning handle for phase observers on other threads.
    pub fn probe(&self) -> PhaseProbe {
        PhaseProbe {
            shared: Arc::downgrade(&self.shared),
        }
    }

    /// Reset the cursor and start the backend stream. No-op if running.
    pub fn start(&mut self) -> Result<(), GeneratorError> {
        if self.stream.is_some() {
            debug!("Signal generator already running");
            return Ok(());
        }

        self.shared.cursor.store(0, Ordering::Release);

        let shared = Arc::clone(&self.shared);
        let render: RenderCallback = Arc::new(move |out: &mut [f32]| shared.render_into(out));
        let spec = StreamSpec {
            sample_rate: self.sample_rate(),
            block_size: self.block_size,
            latency: self.latency,
        };
        let mut stream = self.backend.open_stream(spec, render)?;
        stream.play()?;

        self.stream = Some(stream);
        self.shared.running.store(true, Ordering::Release);
        info!("Signal generator started");
        Ok(())
    }

    /// Stop and close the backend stream. Returns once no render callback can
    /// fire. No-op if not running.
    pub fn stop(&mut self) {
        let Some(mut stream) = self.stream.take() else {
            return;
        };
        self.shared.running.store(false, Ordering::Release);
        stream.pause();
        drop(stream);
        info!("Signal generator stopped after {} samples", self.cursor());
    }
}

impl Drop for SignalGenerator {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Cloneable, thread-safe write access to a generator's live parameters.
///
/// The stream itself may be tied to the thread that opened it; this handle is
/// what a UI thread holds instead.
#[derive(Debug, Clone)]
pub struct GeneratorControls {
    shared: Arc<Shared>,
}

impl GeneratorControls {
    pub fn configure(
        &self,
        carrier_hz: f64,
        modulation_hz: f64,
        depth: f64,
        amplitude: f64,
    ) -> Result<(), GeneratorError> {
        self.set_params(OscillatorParams {
            carrier_frequency: carrier_hz,
            modulation_frequency: modulation_hz,
            modulation_depth: depth,
            amplitude,
        })
    }

    pub fn set_params(&self, params: OscillatorParams) -> Result<(), GeneratorError> {
        self.shared.update(|p| *p = params)
    }

    pub fn set_carrier_frequency(&self, hz: f64) -> Result<(), GeneratorError> {
        self.shared.update(|p| p.carrier_frequency = hz)
    }

    pub fn set_modulation_frequency(&self, hz: f64) -> Result<(), GeneratorError> {
        self.shared.update(|p| p.modulation_frequency = hz)
    }

    pub fn set_modulation_depth(&self, depth: f64) -> Result<(), GeneratorError> {
        self.shared.update(|p| p.modulation_depth = depth)
    }

    pub fn set_amplitude(&self, amplitude: f64) -> Result<(), GeneratorError> {
        self.shared.update(|p| p.amplitude = amplitude)
    }

    pub fn params(&self) -> OscillatorParams {
        self.shared.snapshot()
    }
}

/// Read-only view of a generator's phase clock.
///
/// Holds a weak reference: once the generator is dropped the probe reports
/// not running, and phase observers fall back to their own timing.
#[derive(Debug, Clone)]
pub struct PhaseProbe {
    shared: Weak<Shared>,
}

impl PhaseProbe {
    pub fn is_running(&self) -> bool {
        self.shared
            .upgrade()
            .is_some_and(|s| s.running.load(Ordering::Acquire))
    }

    /// Phase if the generator still exists and is running.
    pub fn running_phase(&self) -> Option<f64> {
        let shared = self.shared.upgrade()?;
        if shared.running.load(Ordering::Acquire) {
            Some(shared.modulation_phase())
        } else {
            None
        }
    }

    /// Phase regardless of running state; `None` once the generator is gone.
    pub fn modulation_phase(&self) -> Option<f64> {
        self.shared.upgrade().map(|s| s.modulation_phase())
    }
}
