//! Command-line driver: plays the stimulus tone and runs the flash clock.
//!
//! The overlay window lives elsewhere; here flash transitions are logged at
//! debug level (`RUST_LOG=gammasync=debug`) and a status line is printed at
//! the configured report interval.

use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use clap::Parser;
use tracing::{debug, error, info, warn};

use gammasync_core::backend::clock::DEFAULT_CLOCK_SAMPLE_RATE;
use gammasync_core::dsp::renderer::render_wav;
use gammasync_core::{
    AudioBackend, ClockBackend, CpalBackend, FlashState, GammaSyncError, GeneratorError,
    SessionConfig, SignalGenerator, generator_from_config, phase_sync_from_config,
};

#[derive(Parser, Debug)]
#[command(name = "gammasync", version, about = "40 Hz audio-visual entrainment driver")]
struct Args {
    /// Session config file (.toml or .json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Carrier frequency in Hz (clamped to the configured bounds)
    #[arg(long)]
    carrier: Option<f64>,

    /// Volume, 0-100 %
    #[arg(long)]
    volume: Option<u8>,

    /// Flash intensity, 0-100 %
    #[arg(long)]
    intensity: Option<u8>,

    /// Session length in minutes (0 = run until killed)
    #[arg(long)]
    minutes: Option<u64>,

    /// Skip audio entirely; the flash clock free-runs
    #[arg(long)]
    no_audio: bool,

    /// Drive the phase clock from a software timer instead of a sound card
    #[arg(long, conflicts_with = "no_audio")]
    headless: bool,

    /// Render the stimulus to a WAV file and exit
    #[arg(long, value_name = "PATH")]
    export_wav: Option<PathBuf>,

    /// Length of the WAV export in seconds
    #[arg(long, default_value_t = 10.0, requires = "export_wav")]
    seconds: f64,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), GammaSyncError> {
    let mut config = match &args.config {
        Some(path) => SessionConfig::load(path)?,
        None => SessionConfig::default(),
    };
    apply_overrides(&mut config, &args);
    config.validate()?;

    if let Some(path) = &args.export_wav {
        return render_wav(
            config.oscillator_params()?,
            DEFAULT_CLOCK_SAMPLE_RATE,
            args.seconds,
            path,
        );
    }

    let mut generator = if args.no_audio {
        None
    } else {
        open_generator(&config, args.headless)?
    };
    if let Some(generator) = generator.as_mut() {
        generator.start()?;
    }

    let mut sync = phase_sync_from_config(&config, generator.as_ref())?;
    sync.on_transition(|t| match t.state {
        FlashState::On => debug!(alpha = t.alpha, "flash on"),
        FlashState::Off => debug!("flash off"),
    });
    sync.start_flashing()?;

    info!(
        "Session running: carrier {} Hz, modulation {} Hz, {}",
        config.audio.carrier_frequency,
        config.audio.modulation_frequency,
        match config.session_length() {
            Some(len) => format!("{} min", len.as_secs() / 60),
            None => "continuous".to_string(),
        }
    );

    let session_length = config.session_length();
    let report = config.report_interval();
    let mut next_report = report;

    loop {
        let elapsed = sync.elapsed().unwrap_or_default();
        if session_length.is_some_and(|len| elapsed >= len) {
            break;
        }
        if let (Some(due), Some(interval)) = (next_report, report) {
            if elapsed >= due {
                let cycles = sync.cycles();
                info!(
                    "{:>5}s elapsed | {} cycles | {:.2} Hz measured",
                    elapsed.as_secs(),
                    cycles,
                    cycles as f64 / elapsed.as_secs_f64()
                );
                next_report = Some(due + interval);
            }
        }
        thread::sleep(Duration::from_millis(100));
    }

    sync.stop_flashing();
    if let Some(generator) = generator.as_mut() {
        generator.stop();
    }
    info!("Session complete");
    Ok(())
}

fn apply_overrides(config: &mut SessionConfig, args: &Args) {
    if let Some(hz) = args.carrier {
        config.audio.carrier_frequency = config.controls.clamp_carrier(hz);
    }
    if let Some(volume) = args.volume {
        config.audio.amplitude = config.controls.volume_to_amplitude(volume);
    }
    if let Some(intensity) = args.intensity {
        config.flash.intensity = intensity.min(100);
    }
    if let Some(minutes) = args.minutes {
        config.session.minutes = minutes;
    }
}

/// Open the audio generator. A missing sound card is not fatal: the session
/// continues with free-running flashes.
fn open_generator(
    config: &SessionConfig,
    headless: bool,
) -> Result<Option<SignalGenerator>, GammaSyncError> {
    let backend: Box<dyn AudioBackend> = if headless {
        Box::new(ClockBackend::default())
    } else {
        match CpalBackend::new() {
            Ok(backend) => Box::new(backend),
            Err(GeneratorError::DeviceUnavailable(reason)) => {
                warn!("{}. Audio disabled; flashing free-runs.", reason);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        }
    };
    match generator_from_config(config, backend) {
        Ok(generator) => Ok(Some(generator)),
        Err(GammaSyncError::Generator(GeneratorError::DeviceUnavailable(reason))) => {
            warn!("{}. Audio disabled; flashing free-runs.", reason);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}
