//! Offline backend: an inert stream with a caller-chosen sample rate.
//!
//! Nothing pulls blocks on its own; the owner drives
//! [`SignalGenerator::render`](crate::dsp::generator::SignalGenerator::render)
//! directly. Used for WAV export and for deterministic tests.

use tracing::trace;

use super::{AudioBackend, AudioStream, RenderCallback, StreamSpec};
use crate::error::GeneratorError;

#[derive(Debug, Clone)]
pub struct OfflineBackend {
    sample_rate: u32,
}

impl OfflineBackend {
    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate }
    }
}

impl AudioBackend for OfflineBackend {
    fn name(&self) -> &'static str {
        "offline"
    }

    fn sample_rate(&self) -> Result<u32, GeneratorError> {
        if self.sample_rate == 0 {
            return Err(GeneratorError::DeviceUnavailable(
                "Offline backend configured with a zero sample rate".to_string(),
            ));
        }
        Ok(self.sample_rate)
    }

    fn open_stream(
        &mut self,
        spec: StreamSpec,
        _render: RenderCallback,
    ) -> Result<Box<dyn AudioStream>, GeneratorError> {
        trace!("Opened offline stream at {} Hz", spec.sample_rate);
        Ok(Box::new(OfflineStream))
    }
}

struct OfflineStream;

impl AudioStream for OfflineStream {
    fn play(&mut self) -> Result<(), GeneratorError> {
        Ok(())
    }

    fn pause(&mut self) {}
}
