//! Default output device via cpal.

use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{debug, error, info, warn};

use super::{AudioBackend, AudioStream, LatencyHint, RenderCallback, StreamSpec};
use crate::error::GeneratorError;

/// Scratch size for fanning mono out to multi-channel devices.
const SCRATCH_FRAMES: usize = 4096;

/// Backend bound to the host's default output device.
pub struct CpalBackend {
    device: cpal::Device,
}

impl CpalBackend {
    /// Bind to the default output device.
    pub fn new() -> Result<Self, GeneratorError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or_else(|| {
            GeneratorError::DeviceUnavailable("No audio output device available".to_string())
        })?;
        if let Ok(name) = device.name() {
            info!("Using audio output device '{}'", name);
        }
        Ok(Self { device })
    }

    fn build(
        &self,
        config: &cpal::StreamConfig,
        render: RenderCallback,
    ) -> Result<cpal::Stream, cpal::BuildStreamError> {
        let channels = config.channels as usize;
        if channels == 1 {
            return self.device.build_output_stream(
                config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| render(data),
                |err| error!("Audio stream error: {}", err),
                None,
            );
        }

        // Pre-allocated; only grows if the host hands us an oversized buffer.
        let mut scratch: Vec<f32> = vec![0.0; SCRATCH_FRAMES];
        self.device.build_output_stream(
            config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let frames = data.len() / channels;
                if scratch.len() < frames {
                    scratch.resize(frames, 0.0);
                }
                render(&mut scratch[..frames]);
                for (frame, &s) in data.chunks_exact_mut(channels).zip(&scratch[..frames]) {
                    frame.fill(s);
                }
            },
            |err| error!("Audio stream error: {}", err),
            None,
        )
    }
}

impl AudioBackend for CpalBackend {
    fn name(&self) -> &'static str {
        "cpal"
    }

    fn sample_rate(&self) -> Result<u32, GeneratorError> {
        let config = self.device.default_output_config().map_err(|e| {
            GeneratorError::DeviceUnavailable(format!("Failed to get default output config: {}", e))
        })?;
        Ok(config.sample_rate().0)
    }

    fn open_stream(
        &mut self,
        spec: StreamSpec,
        render: RenderCallback,
    ) -> Result<Box<dyn AudioStream>, GeneratorError> {
        let buffer_size = match spec.latency {
            LatencyHint::Low => cpal::BufferSize::Fixed(spec.block_size),
            LatencyHint::High => cpal::BufferSize::Default,
        };
        let mono = cpal::StreamConfig {
            channels: 1,
            sample_rate: cpal::SampleRate(spec.sample_rate),
            buffer_size,
        };

        let stream = match self.build(&mono, Arc::clone(&render)) {
            Ok(stream) => stream,
            Err(cpal::BuildStreamError::DeviceNotAvailable) => {
                return Err(GeneratorError::DeviceUnavailable(
                    "Output device is no longer available".to_string(),
                ));
            }
            Err(e) => {
                // Some hosts refuse mono; fall back to the device's own layout.
                let channels = self
                    .device
                    .default_output_config()
                    .map(|c| c.channels())
                    .map_err(|_| GeneratorError::StreamBuild(e.to_string()))?;
                warn!(
                    "Mono stream rejected ({}); opening {} channels instead",
                    e, channels
                );
                let config = cpal::StreamConfig { channels, ..mono };
                self.build(&config, render).map_err(build_error)?
            }
        };

        debug!(
            "Opened cpal stream: {} Hz, block {} ({:?})",
            spec.sample_rate, spec.block_size, spec.latency
        );
        Ok(Box::new(CpalStream { stream }))
    }
}

fn build_error(e: cpal::BuildStreamError) -> GeneratorError {
    match e {
        cpal::BuildStreamError::DeviceNotAvailable => {
            GeneratorError::DeviceUnavailable(e.to_string())
        }
        other => GeneratorError::StreamBuild(other.to_string()),
    }
}

struct CpalStream {
    stream: cpal::Stream,
}

impl AudioStream for CpalStream {
    fn play(&mut self) -> Result<(), GeneratorError> {
        self.stream.play().map_err(|e| match e {
            cpal::PlayStreamError::DeviceNotAvailable => {
                GeneratorError::DeviceUnavailable(e.to_string())
            }
            other => GeneratorError::StreamPlay(other.to_string()),
        })
    }

    fn pause(&mut self) {
        if let Err(e) = self.stream.pause() {
            // Dropping the stream still stops it.
            debug!("Failed to pause audio stream: {}", e);
        }
    }
}
