//! Audio backends: where render timing comes from.
//!
//! A backend knows the output device's native sample rate and can open a mono
//! f32 stream that repeatedly calls a render callback. The generator supplies
//! the callback; the backend supplies the clock.

pub mod clock;
pub mod cpal_output;
pub mod offline;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::GeneratorError;

pub use clock::ClockBackend;
pub use cpal_output::CpalBackend;
pub use offline::OfflineBackend;

/// Default frames per render callback.
pub const DEFAULT_BLOCK_SIZE: u32 = 512;

/// Block-render callback invoked from the backend's timing thread.
/// Must fill the whole slice. Shared so a backend can rebuild a stream
/// without asking for a new one.
pub type RenderCallback = Arc<dyn Fn(&mut [f32]) + Send + Sync + 'static>;

/// How aggressively the stream trades buffering for latency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LatencyHint {
    /// Request a fixed buffer of exactly `block_size` frames.
    #[default]
    Low,
    /// Let the device pick its default buffering.
    High,
}

/// Parameters for opening an output stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSpec {
    pub sample_rate: u32,
    pub block_size: u32,
    pub latency: LatencyHint,
}

/// An open output stream. Dropping it closes the stream; no callback may run
/// after `drop` returns.
pub trait AudioStream {
    fn play(&mut self) -> Result<(), GeneratorError>;
    fn pause(&mut self);
}

pub trait AudioBackend {
    fn name(&self) -> &'static str;

    /// Native sample rate of the output device.
    fn sample_rate(&self) -> Result<u32, GeneratorError>;

    fn open_stream(
        &mut self,
        spec: StreamSpec,
        render: RenderCallback,
    ) -> Result<Box<dyn AudioStream>, GeneratorError>;
}
