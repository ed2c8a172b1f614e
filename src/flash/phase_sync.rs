//! Phase sync: polls a [`FlashGate`] on its own thread and forwards
//! transitions to the visual collaborator.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::gate::{FlashGate, FlashState, FlashTransition};
use crate::dsp::generator::PhaseProbe;
use crate::error::GeneratorError;

/// Default poll interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Receives transitions; called from the polling thread.
pub type TransitionSink = Box<dyn FnMut(FlashTransition) + Send + 'static>;

struct Poller {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// Drives the flash gate at a fixed interval.
///
/// Binding to a generator is observation only: the sync never starts, stops
/// or keeps alive the generator it follows.
pub struct PhaseSync {
    gate: Arc<Mutex<FlashGate>>,
    interval: Duration,
    sink: Arc<Mutex<TransitionSink>>,
    poller: Option<Poller>,
    started_at: Option<Instant>,
}

impl PhaseSync {
    pub fn new(source: Option<PhaseProbe>) -> Self {
        let sink: TransitionSink = Box::new(|_| {});
        PhaseSync {
            gate: Arc::new(Mutex::new(FlashGate::new(source, Instant::now()))),
            interval: DEFAULT_POLL_INTERVAL,
            sink: Arc::new(Mutex::new(sink)),
            poller: None,
            started_at: None,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval.max(Duration::from_micros(50));
        self
    }

    /// Install the transition sink, replacing the previous one.
    pub fn on_transition(&self, sink: impl FnMut(FlashTransition) + Send + 'static) {
        *lock(&self.sink) = Box::new(sink);
    }

    fn gate(&self) -> MutexGuard<'_, FlashGate> {
        lock(&self.gate)
    }

    /// Follow `probe`'s phase from the next poll on, even mid-session.
    pub fn bind(&self, probe: PhaseProbe) {
        self.gate().bind(probe);
    }

    /// Drop the generator binding; the gate falls back to free-running.
    pub fn unbind(&self) {
        self.gate().unbind();
    }

    pub fn is_bound(&self) -> bool {
        self.gate().is_bound()
    }

    pub fn set_intensity(&self, percent: u8) {
        self.gate().set_intensity(percent);
    }

    pub fn set_fallback_frequency(&self, hz: f64) -> Result<(), GeneratorError> {
        self.gate().set_fallback_frequency(hz)
    }

    pub fn intensity(&self) -> u8 {
        self.gate().intensity()
    }

    pub fn alpha(&self) -> u8 {
        self.gate().alpha()
    }

    pub fn state(&self) -> FlashState {
        self.gate().state()
    }

    pub fn cycles(&self) -> u64 {
        self.gate().cycles()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_flashing(&self) -> bool {
        self.poller.is_some()
    }

    /// Time since `start_flashing`, if flashing.
    pub fn elapsed(&self) -> Option<Duration> {
        self.started_at.map(|t| t.elapsed())
    }

    /// Reset to OFF and start polling. No-op if already polling: a running
    /// session keeps its state, cycle count and free-running reference.
    pub fn start_flashing(&mut self) -> Result<(), GeneratorError> {
        if self.poller.is_some() {
            debug!("Flashing already active");
            return Ok(());
        }

        let now = Instant::now();
        self.gate().reset(now);

        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);
        let gate = Arc::clone(&self.gate);
        let sink = Arc::clone(&self.sink);
        let interval = self.interval;

        let handle = thread::Builder::new()
            .name("gammasync-flash".into())
            .spawn(move || {
                let mut next = Instant::now();
                while !thread_stop.load(Ordering::Acquire) {
                    let now = Instant::now();
                    let transition = lock(&gate).tick(now);
                    if let Some(t) = transition {
                        let mut sink = lock(&sink);
                        (*sink)(t);
                    }

                    next += interval;
                    let now = Instant::now();
                    if next > now {
                        thread::sleep(next - now);
                    } else {
                        // Missed ticks are not replayed; the gate catches up.
                        next = now;
                    }
                }
            })?;

        self.poller = Some(Poller { stop, handle });
        self.started_at = Some(now);
        info!("Flashing started ({:?} poll interval)", self.interval);
        Ok(())
    }

    /// Stop polling and force OFF. Returns once the polling thread has
    /// exited; no transition is delivered afterwards except the final OFF.
    pub fn stop_flashing(&mut self) {
        let Some(poller) = self.poller.take() else {
            return;
        };
        poller.stop.store(true, Ordering::Release);
        if poller.handle.join().is_err() {
            warn!("Flash polling thread panicked");
        }

        let cleared = self.gate().clear(Instant::now());
        if let Some(t) = cleared {
            let mut sink = lock(&self.sink);
            (*sink)(t);
        }
        self.started_at = None;
        info!("Flashing stopped after {} cycles", self.cycles());
    }
}

fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Drop for PhaseSync {
    fn drop(&mut self) {
        self.stop_flashing();
    }
}
