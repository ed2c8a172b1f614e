pub mod backend;
pub mod config;
pub mod dsp;
pub mod error;
pub mod flash;

pub use backend::{AudioBackend, ClockBackend, CpalBackend, LatencyHint, OfflineBackend};
pub use config::SessionConfig;
pub use dsp::generator::{GeneratorControls, PhaseProbe, SignalGenerator};
pub use dsp::oscillator::OscillatorParams;
pub use error::{ConfigError, GammaSyncError, GeneratorError, RenderError};
pub use flash::{FlashGate, FlashState, FlashTransition, PhaseSync};

/// The crate version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build a generator from the `[audio]` section of `config` on `backend`.
pub fn generator_from_config(
    config: &SessionConfig,
    backend: Box<dyn AudioBackend>,
) -> Result<SignalGenerator, GammaSyncError> {
    let params = config.oscillator_params()?;
    Ok(SignalGenerator::with_params(backend, params)?
        .with_block_size(config.audio.block_size)
        .with_latency(config.audio.latency))
}

/// Build a flash sync from the `[flash]` section of `config`, following
/// `generator` when one is given.
pub fn phase_sync_from_config(
    config: &SessionConfig,
    generator: Option<&SignalGenerator>,
) -> Result<PhaseSync, GammaSyncError> {
    let sync = PhaseSync::new(generator.map(SignalGenerator::probe))
        .with_interval(config.poll_interval());
    sync.set_intensity(config.flash.intensity);
    sync.set_fallback_frequency(config.audio.modulation_frequency)?;
    Ok(sync)
}
