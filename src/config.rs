//! Session configuration.
//!
//! Every field has a default, so a config file only needs the values it
//! changes. Files are TOML or JSON, chosen by extension.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::backend::{DEFAULT_BLOCK_SIZE, LatencyHint};
use crate::dsp::oscillator::{
    DEFAULT_AMPLITUDE, DEFAULT_CARRIER_HZ, DEFAULT_MODULATION_DEPTH, DEFAULT_MODULATION_HZ,
    OscillatorParams,
};
use crate::error::ConfigError;
use crate::flash::DEFAULT_INTENSITY;
use crate::flash::gate::half_period;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub audio: AudioConfig,
    pub flash: FlashConfig,
    pub controls: ControlConfig,
    pub session: SessionTiming,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub carrier_frequency: f64,
    pub modulation_frequency: f64,
    pub modulation_depth: f64,
    pub amplitude: f64,
    /// Frames per audio callback.
    pub block_size: u32,
    pub latency: LatencyHint,
}

impl Default for AudioConfig {
    fn default() -> Self {
        AudioConfig {
            carrier_frequency: DEFAULT_CARRIER_HZ,
            modulation_frequency: DEFAULT_MODULATION_HZ,
            modulation_depth: DEFAULT_MODULATION_DEPTH,
            amplitude: DEFAULT_AMPLITUDE,
            block_size: DEFAULT_BLOCK_SIZE,
            latency: LatencyHint::Low,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlashConfig {
    /// Overlay darkness, 0–100 %.
    pub intensity: u8,
    /// How often the overlay checks the phase.
    pub poll_interval_ms: u64,
}

impl Default for FlashConfig {
    fn default() -> Self {
        FlashConfig {
            intensity: DEFAULT_INTENSITY,
            poll_interval_ms: 1,
        }
    }
}

/// Bounds the control surface applies before values reach the generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    pub carrier_min: f64,
    pub carrier_max: f64,
    pub carrier_step: f64,
    /// Initial volume slider position, 0–100 %.
    pub volume_default: u8,
    /// Amplitude at 100 % volume.
    pub volume_max_amplitude: f64,
}

impl Default for ControlConfig {
    fn default() -> Self {
        ControlConfig {
            carrier_min: 100.0,
            carrier_max: 10_000.0,
            carrier_step: 10.0,
            volume_default: 30,
            volume_max_amplitude: 0.3,
        }
    }
}

impl ControlConfig {
    /// Map a 0–100 volume percentage onto amplitude.
    pub fn volume_to_amplitude(&self, percent: u8) -> f64 {
        percent.min(100) as f64 / 100.0 * self.volume_max_amplitude
    }

    /// Clamp a carrier request into the control bounds.
    pub fn clamp_carrier(&self, hz: f64) -> f64 {
        hz.clamp(self.carrier_min, self.carrier_max)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionTiming {
    /// Auto-stop after this many minutes; 0 runs until interrupted.
    pub minutes: u64,
    /// Seconds between status reports; 0 disables them.
    pub report_interval_secs: u64,
}

impl Default for SessionTiming {
    fn default() -> Self {
        SessionTiming {
            minutes: 60,
            report_interval_secs: 10,
        }
    }
}

impl SessionConfig {
    /// Load from a `.toml` or `.json` file and validate.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let config = match ext.as_str() {
            "toml" => Self::from_toml_str(&text)?,
            "json" => Self::from_json_str(&text)?,
            other => return Err(ConfigError::UnsupportedFormat(other.to_string())),
        };
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: SessionConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: SessionConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.oscillator_params()?;
        half_period(self.audio.modulation_frequency)
            .map_err(|e| invalid("audio.modulation_frequency", e.to_string()))?;
        if self.audio.block_size == 0 {
            return Err(invalid("audio.block_size", "must be at least 1"));
        }
        if self.flash.intensity > 100 {
            return Err(invalid("flash.intensity", "must be 0-100"));
        }
        if self.flash.poll_interval_ms == 0 {
            return Err(invalid("flash.poll_interval_ms", "must be at least 1"));
        }
        let c = &self.controls;
        if !(c.carrier_min > 0.0 && c.carrier_min <= c.carrier_max) {
            return Err(invalid(
                "controls.carrier_min",
                format!("range {}..{} is empty or non-positive", c.carrier_min, c.carrier_max),
            ));
        }
        if c.volume_default > 100 {
            return Err(invalid("controls.volume_default", "must be 0-100"));
        }
        if !(0.0..=1.0).contains(&c.volume_max_amplitude) {
            return Err(invalid("controls.volume_max_amplitude", "must be 0-1"));
        }
        Ok(())
    }

    /// Generator parameters described by the `[audio]` section.
    pub fn oscillator_params(&self) -> Result<OscillatorParams, ConfigError> {
        OscillatorParams::new(
            self.audio.carrier_frequency,
            self.audio.modulation_frequency,
            self.audio.modulation_depth,
            self.audio.amplitude,
        )
        .map_err(|e| invalid("audio", e.to_string()))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.flash.poll_interval_ms)
    }

    /// `None` for a continuous session.
    pub fn session_length(&self) -> Option<Duration> {
        (self.session.minutes > 0).then(|| Duration::from_secs(self.session.minutes * 60))
    }

    pub fn report_interval(&self) -> Option<Duration> {
        (self.session.report_interval_secs > 0)
            .then(|| Duration::from_secs(self.session.report_interval_secs))
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = SessionConfig::default();
        config.validate().unwrap();
        assert_eq!(config.audio.carrier_frequency, 250.0);
        assert_eq!(config.audio.modulation_frequency, 40.0);
        assert_eq!(config.audio.block_size, 512);
        assert_eq!(config.flash.intensity, 40);
        assert_eq!(config.poll_interval(), Duration::from_millis(1));
        assert_eq!(config.session_length(), Some(Duration::from_secs(3600)));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = SessionConfig::from_toml_str(
            r#"
[audio]
carrier_frequency = 500.0
latency = "high"

[session]
minutes = 0
"#,
        )
        .unwrap();
        assert_eq!(config.audio.carrier_frequency, 500.0);
        assert_eq!(config.audio.latency, LatencyHint::High);
        assert_eq!(config.audio.modulation_frequency, 40.0);
        assert_eq!(config.session_length(), None);
        assert_eq!(config.flash, FlashConfig::default());
    }

    #[test]
    fn json_round_trips() {
        let mut config = SessionConfig::default();
        config.flash.intensity = 75;
        let text = serde_json::to_string(&config).unwrap();
        assert_eq!(SessionConfig::from_json_str(&text).unwrap(), config);
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(SessionConfig::from_toml_str("[audio]\nmodulation_depth = 1.5").is_err());
        assert!(SessionConfig::from_toml_str("[flash]\nintensity = 101").is_err());
        // Valid for the tone but too slow for the flash clock.
        assert!(SessionConfig::from_toml_str("[audio]\nmodulation_frequency = 1e-20").is_err());
        assert!(SessionConfig::from_toml_str("[flash]\npoll_interval_ms = 0").is_err());
        assert!(
            SessionConfig::from_toml_str("[controls]\ncarrier_min = 500.0\ncarrier_max = 100.0")
                .is_err()
        );
    }

    #[test]
    fn volume_maps_onto_max_amplitude() {
        let controls = ControlConfig::default();
        assert_eq!(controls.volume_to_amplitude(0), 0.0);
        assert!((controls.volume_to_amplitude(30) - 0.09).abs() < 1e-12);
        assert!((controls.volume_to_amplitude(100) - 0.3).abs() < 1e-12);
        assert!((controls.volume_to_amplitude(200) - 0.3).abs() < 1e-12);
    }

    #[test]
    fn clamps_carrier_to_bounds() {
        let controls = ControlConfig::default();
        assert_eq!(controls.clamp_carrier(50.0), 100.0);
        assert_eq!(controls.clamp_carrier(440.0), 440.0);
        assert_eq!(controls.clamp_carrier(20_000.0), 10_000.0);
    }

    #[test]
    fn loads_by_extension() {
        let dir = tempfile::tempdir().unwrap();

        let toml_path = dir.path().join("session.toml");
        let mut f = std::fs::File::create(&toml_path).unwrap();
        writeln!(f, "[flash]\nintensity = 90").unwrap();
        assert_eq!(SessionConfig::load(&toml_path).unwrap().flash.intensity, 90);

        let json_path = dir.path().join("session.json");
        std::fs::write(&json_path, r#"{"audio": {"amplitude": 0.1}}"#).unwrap();
        assert_eq!(SessionConfig::load(&json_path).unwrap().audio.amplitude, 0.1);

        let yaml_path = dir.path().join("session.yaml");
        std::fs::write(&yaml_path, "audio: {}").unwrap();
        assert!(matches!(
            SessionConfig::load(&yaml_path),
            Err(ConfigError::UnsupportedFormat(_))
        ));
    }
}
