//! Flash gate: the ON/OFF state machine behind the visual overlay.
//!
//! Each `tick` is a pure function of the gate's state and the supplied
//! instant, so the polling thread and tests drive the exact same logic.

use std::time::{Duration, Instant};

use crate::dsp::generator::PhaseProbe;
use crate::dsp::oscillator::DEFAULT_MODULATION_HZ;
use crate::error::GeneratorError;

/// Default overlay intensity (percent).
pub const DEFAULT_INTENSITY: u8 = 40;

/// Visual flash state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FlashState {
    #[default]
    Off,
    On,
}

impl FlashState {
    /// ON for the first half of the modulation cycle.
    pub fn from_phase(phase: f64) -> Self {
        if phase < 0.5 { FlashState::On } else { FlashState::Off }
    }

    pub fn is_on(self) -> bool {
        self == FlashState::On
    }

    pub fn toggled(self) -> Self {
        match self {
            FlashState::Off => FlashState::On,
            FlashState::On => FlashState::Off,
        }
    }
}

/// A redraw request for the visual collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlashTransition {
    pub state: FlashState,
    /// Overlay alpha (0–255) to paint while ON.
    pub alpha: u8,
    pub at: Instant,
}

/// Where the last decision came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Timing {
    Generator,
    FreeRunning,
}

#[derive(Debug, Clone)]
pub struct FlashGate {
    source: Option<PhaseProbe>,
    state: FlashState,
    timing: Timing,
    half_period: Duration,
    fallback_frequency: f64,
    /// Reference point for the free-running toggle.
    last_toggle: Instant,
    intensity: u8,
    cycles: u64,
}

impl FlashGate {
    pub fn new(source: Option<PhaseProbe>, now: Instant) -> Self {
        FlashGate {
            source,
            state: FlashState::Off,
            timing: Timing::FreeRunning,
            half_period: Duration::from_secs_f64(0.5 / DEFAULT_MODULATION_HZ),
            fallback_frequency: DEFAULT_MODULATION_HZ,
            last_toggle: now,
            intensity: DEFAULT_INTENSITY,
            cycles: 0,
        }
    }

    pub fn bind(&mut self, probe: PhaseProbe) {
        self.source = Some(probe);
    }

    pub fn unbind(&mut self) {
        self.source = None;
    }

    pub fn is_bound(&self) -> bool {
        self.source.is_some()
    }

    /// Frequency of the free-running toggle used while no generator runs.
    pub fn set_fallback_frequency(&mut self, hz: f64) -> Result<(), GeneratorError> {
        self.half_period = half_period(hz)?;
        self.fallback_frequency = hz;
        Ok(())
    }

    pub fn fallback_frequency(&self) -> f64 {
        self.fallback_frequency
    }

    /// Intensity in percent; values above 100 are clamped.
    pub fn set_intensity(&mut self, percent: u8) {
        self.intensity = percent.min(100);
    }

    pub fn intensity(&self) -> u8 {
        self.intensity
    }

    /// Overlay alpha for the current intensity: 0% → 0, 100% → 255.
    pub fn alpha(&self) -> u8 {
        (self.intensity as u16 * 255 / 100) as u8
    }

    pub fn state(&self) -> FlashState {
        self.state
    }

    /// Completed OFF→ON transitions since the last reset.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Back to OFF with the free-running reference at `now`.
    pub fn reset(&mut self, now: Instant) {
        self.state = FlashState::Off;
        self.timing = Timing::FreeRunning;
        self.last_toggle = now;
        self.cycles = 0;
    }

    /// Force OFF. Returns the transition if the overlay was showing.
    pub fn clear(&mut self, now: Instant) -> Option<FlashTransition> {
        self.apply(FlashState::Off, now)
    }

    /// One poll. Returns a transition when the state changes.
    pub fn tick(&mut self, now: Instant) -> Option<FlashTransition> {
        if let Some(phase) = self.source.as_ref().and_then(PhaseProbe::running_phase) {
            self.timing = Timing::Generator;
            return self.apply(FlashState::from_phase(phase), now);
        }

        if self.timing == Timing::Generator {
            // Generator just went away: restart the free-running half period
            // here instead of replaying every crossing since the last toggle.
            self.timing = Timing::FreeRunning;
            self.last_toggle = now;
            return None;
        }

        if now.saturating_duration_since(self.last_toggle) < self.half_period {
            return None;
        }
        // Advance by exactly one half period, not to `now`, so tick jitter
        // never accumulates.
        self.last_toggle += self.half_period;
        let next = self.state.toggled();
        self.apply(next, now)
    }

    fn apply(&mut self, next: FlashState, now: Instant) -> Option<FlashTransition> {
        if next == self.state {
            return None;
        }
        self.state = next;
        if next.is_on() {
            self.cycles += 1;
        }
        Some(FlashTransition {
            state: next,
            alpha: self.alpha(),
            at: now,
        })
    }
}

/// Half of one modulation cycle at `hz`. Fails for frequencies whose half
/// period is not a positive, representable `Duration`.
pub fn half_period(hz: f64) -> Result<Duration, GeneratorError> {
    let invalid = GeneratorError::InvalidParameter {
        name: "fallback frequency",
        value: hz,
    };
    if !(hz.is_finite() && hz > 0.0) {
        return Err(invalid);
    }
    match Duration::try_from_secs_f64(0.5 / hz) {
        Ok(d) if !d.is_zero() => Ok(d),
        _ => Err(invalid),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::OfflineBackend;
    use crate::dsp::generator::SignalGenerator;

    #[test]
    fn fallback_toggles_forty_times_per_second_each_way() {
        let t0 = Instant::now();
        let mut gate = FlashGate::new(None, t0);
        let (mut rising, mut falling) = (0, 0);
        for ms in 1..=1000 {
            if let Some(t) = gate.tick(t0 + Duration::from_millis(ms)) {
                match t.state {
                    FlashState::On => rising += 1,
                    FlashState::Off => falling += 1,
                }
            }
        }
        assert_eq!(rising, 40);
        assert_eq!(falling, 40);
        assert_eq!(gate.cycles(), 40);
    }

    #[test]
    fn fallback_does_not_drift_with_late_ticks() {
        let t0 = Instant::now();
        let mut gate = FlashGate::new(None, t0);
        // Ticks arrive 3 ms late each time; the reference still advances by
        // 12.5 ms steps, so the first toggle lands on the tick at 15 ms and
        // the second on the tick at 27 ms (≥ 25 ms), not at 30 ms.
        let mut toggles = Vec::new();
        for ms in (3..=60).step_by(3) {
            let now = t0 + Duration::from_millis(ms);
            if gate.tick(now).is_some() {
                toggles.push(ms);
            }
        }
        assert_eq!(toggles, vec![15, 27, 39, 51]);
    }

    #[test]
    fn fallback_holds_state_between_crossings() {
        let t0 = Instant::now();
        let mut gate = FlashGate::new(None, t0);
        assert!(gate.tick(t0 + Duration::from_millis(5)).is_none());
        assert_eq!(gate.state(), FlashState::Off);
        let t = gate.tick(t0 + Duration::from_millis(13)).unwrap();
        assert_eq!(t.state, FlashState::On);
        assert!(gate.tick(t0 + Duration::from_millis(20)).is_none());
        assert_eq!(gate.state(), FlashState::On);
    }

    #[test]
    fn generator_phase_drives_fifty_percent_duty() {
        let mut generator =
            SignalGenerator::new(Box::new(OfflineBackend::new(48_000))).unwrap();
        generator.start().unwrap();
        let t0 = Instant::now();
        let mut gate = FlashGate::new(Some(generator.probe()), t0);

        let mut on = 0usize;
        let samples = 48_000usize;
        for i in 0..samples {
            gate.tick(t0);
            let expected = FlashState::from_phase(generator.modulation_phase());
            assert_eq!(gate.state(), expected, "sample {i}");
            if gate.state().is_on() {
                on += 1;
            }
            generator.render(1);
        }
        assert_eq!(on, samples / 2);
        assert_eq!(gate.cycles(), 40);
    }

    #[test]
    fn stopped_generator_falls_back() {
        let mut generator =
            SignalGenerator::new(Box::new(OfflineBackend::new(48_000))).unwrap();
        let t0 = Instant::now();
        let mut gate = FlashGate::new(Some(generator.probe()), t0);

        // Not running yet: free-running toggle at 12.5 ms.
        assert_eq!(
            gate.tick(t0 + Duration::from_millis(13)).map(|t| t.state),
            Some(FlashState::On)
        );

        generator.start().unwrap();
        generator.render(700);
        assert_eq!(
            gate.tick(t0 + Duration::from_millis(14)).map(|t| t.state),
            Some(FlashState::Off)
        );

        generator.stop();
        // Re-anchors on the first fallback tick instead of bursting.
        assert!(gate.tick(t0 + Duration::from_millis(100)).is_none());
        assert!(gate.tick(t0 + Duration::from_millis(110)).is_none());
        assert_eq!(
            gate.tick(t0 + Duration::from_millis(113)).map(|t| t.state),
            Some(FlashState::On)
        );
    }

    #[test]
    fn intensity_maps_to_alpha() {
        let mut gate = FlashGate::new(None, Instant::now());
        assert_eq!(gate.alpha(), 102);
        gate.set_intensity(0);
        assert_eq!(gate.alpha(), 0);
        gate.set_intensity(100);
        assert_eq!(gate.alpha(), 255);
        gate.set_intensity(250);
        assert_eq!(gate.intensity(), 100);
        gate.set_intensity(50);
        assert_eq!(gate.alpha(), 127);
    }

    #[test]
    fn clear_reports_only_when_on() {
        let t0 = Instant::now();
        let mut gate = FlashGate::new(None, t0);
        assert!(gate.clear(t0).is_none());
        gate.tick(t0 + Duration::from_millis(13));
        let t = gate.clear(t0 + Duration::from_millis(14)).unwrap();
        assert_eq!(t.state, FlashState::Off);
        assert_eq!(gate.state(), FlashState::Off);
    }

    #[test]
    fn rejects_bad_fallback_frequency() {
        let mut gate = FlashGate::new(None, Instant::now());
        assert!(gate.set_fallback_frequency(0.0).is_err());
        assert!(gate.set_fallback_frequency(f64::INFINITY).is_err());
        gate.set_fallback_frequency(10.0).unwrap();
        assert_eq!(gate.fallback_frequency(), 10.0);
    }

    #[test]
    fn rejects_unrepresentable_half_period() {
        let mut gate = FlashGate::new(None, Instant::now());
        // Half period overflows `Duration`.
        assert!(gate.set_fallback_frequency(1e-20).is_err());
        // Half period rounds to zero.
        assert!(gate.set_fallback_frequency(1e300).is_err());
        assert_eq!(gate.fallback_frequency(), DEFAULT_MODULATION_HZ);
        assert_eq!(half_period(40.0).unwrap(), Duration::from_micros(12_500));
    }
}
