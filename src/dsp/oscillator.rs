//! Amplitude-modulated sine pair: a carrier tone shaped by a low-frequency
//! modulator.
//!
//! Both oscillators are evaluated from absolute time rather than from running
//! phase accumulators, so the waveform at any sample index is a pure function
//! of the parameters and the index. That keeps audio and the visual phase
//! query derived from the same sample clock.

use std::f64::consts::TAU;

use crate::error::GeneratorError;

/// Default carrier tone (Hz).
pub const DEFAULT_CARRIER_HZ: f64 = 250.0;
/// Default entrainment frequency (Hz).
pub const DEFAULT_MODULATION_HZ: f64 = 40.0;
pub const DEFAULT_MODULATION_DEPTH: f64 = 1.0;
pub const DEFAULT_AMPLITUDE: f64 = 0.3;

/// Live oscillator parameters. Copied out as one unit by every reader.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OscillatorParams {
    /// Carrier tone in Hz.
    pub carrier_frequency: f64,
    /// Modulator (entrainment) frequency in Hz.
    pub modulation_frequency: f64,
    /// Fraction of the carrier swept by the modulator, in [0, 1].
    pub modulation_depth: f64,
    /// Master output scale, in [0, 1].
    pub amplitude: f64,
}

impl Default for OscillatorParams {
    fn default() -> Self {
        OscillatorParams {
            carrier_frequency: DEFAULT_CARRIER_HZ,
            modulation_frequency: DEFAULT_MODULATION_HZ,
            modulation_depth: DEFAULT_MODULATION_DEPTH,
            amplitude: DEFAULT_AMPLITUDE,
        }
    }
}

impl OscillatorParams {
    /// Build a validated parameter set.
    pub fn new(
        carrier_frequency: f64,
        modulation_frequency: f64,
        modulation_depth: f64,
        amplitude: f64,
    ) -> Result<Self, GeneratorError> {
        let params = OscillatorParams {
            carrier_frequency,
            modulation_frequency,
            modulation_depth,
            amplitude,
        };
        params.validate()?;
        Ok(params)
    }

    /// Frequencies must be finite and positive; depth and amplitude must lie
    /// in [0, 1]. Anything narrower (e.g. audible carrier bounds) is the
    /// caller's business.
    pub fn validate(&self) -> Result<(), GeneratorError> {
        check_frequency("carrier frequency", self.carrier_frequency)?;
        check_frequency("modulation frequency", self.modulation_frequency)?;
        check_unit("modulation depth", self.modulation_depth)?;
        check_unit("amplitude", self.amplitude)?;
        Ok(())
    }

    /// Waveform value at `t` seconds since stream start:
    /// `amplitude * sin(2π·fc·t) * (1 + depth * sin(2π·fm·t))`.
    #[inline]
    pub fn sample_at(&self, t: f64) -> f64 {
        let carrier = (TAU * self.carrier_frequency * t).sin();
        let envelope = 1.0 + self.modulation_depth * (TAU * self.modulation_frequency * t).sin();
        self.amplitude * carrier * envelope
    }

    /// Largest magnitude `sample_at` can produce.
    pub fn peak(&self) -> f64 {
        self.amplitude * (1.0 + self.modulation_depth)
    }
}

/// Fraction of the modulation cycle elapsed after `cursor` samples, in [0, 1).
///
/// Multiplies before dividing so that whole cycles at integer sample periods
/// (e.g. 40 Hz at 48 kHz) land exactly on 0.0 and the midpoint exactly on 0.5.
#[inline]
pub fn modulation_phase(cursor: u64, sample_rate: f64, modulation_frequency: f64) -> f64 {
    (cursor as f64 * modulation_frequency / sample_rate).fract()
}

fn check_frequency(name: &'static str, value: f64) -> Result<(), GeneratorError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(GeneratorError::InvalidParameter { name, value })
    }
}

fn check_unit(name: &'static str, value: f64) -> Result<(), GeneratorError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(GeneratorError::InvalidParameter { name, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_zero() {
        let p = OscillatorParams::default();
        assert!(p.sample_at(0.0).abs() < 1e-12);
    }

    #[test]
    fn stays_within_peak() {
        let p = OscillatorParams::new(440.0, 40.0, 1.0, 0.5).unwrap();
        for i in 0..48_000 {
            let s = p.sample_at(i as f64 / 48_000.0);
            assert!(s.abs() <= p.peak() + 1e-12, "sample {s} exceeds peak");
        }
    }

    #[test]
    fn zero_depth_is_plain_carrier() {
        let p = OscillatorParams::new(300.0, 40.0, 0.0, 1.0).unwrap();
        for i in 0..1000 {
            let t = i as f64 / 44_100.0;
            let expected = (TAU * 300.0 * t).sin();
            assert!((p.sample_at(t) - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn full_depth_silences_modulator_trough() {
        // sin(2π·40·t) = -1 at t = 3/160 s, so the envelope is 0 there.
        let p = OscillatorParams::new(250.0, 40.0, 1.0, 1.0).unwrap();
        assert!(p.sample_at(3.0 / 160.0).abs() < 1e-9);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(OscillatorParams::new(0.0, 40.0, 1.0, 0.3).is_err());
        assert!(OscillatorParams::new(250.0, -1.0, 1.0, 0.3).is_err());
        assert!(OscillatorParams::new(250.0, f64::NAN, 1.0, 0.3).is_err());
        assert!(OscillatorParams::new(250.0, 40.0, 1.5, 0.3).is_err());
        assert!(OscillatorParams::new(250.0, 40.0, 1.0, -0.1).is_err());
        assert!(OscillatorParams::new(250.0, 40.0, 0.0, 0.0).is_ok());
    }

    #[test]
    fn phase_wraps_per_cycle() {
        // 40 Hz at 48 kHz: 1200 samples per cycle.
        assert_eq!(modulation_phase(0, 48_000.0, 40.0), 0.0);
        assert_eq!(modulation_phase(600, 48_000.0, 40.0), 0.5);
        assert_eq!(modulation_phase(1200, 48_000.0, 40.0), 0.0);
        assert!((modulation_phase(300, 48_000.0, 40.0) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn phase_always_in_unit_interval() {
        for cursor in (0..10_000_000u64).step_by(7919) {
            let p = modulation_phase(cursor, 44_100.0, 40.0);
            assert!((0.0..1.0).contains(&p), "phase {p} out of range");
        }
    }
}
