//! WAV renderer: renders the stimulus offline to a mono float WAV.

use std::io::{Seek, Write};
use std::path::Path;

use tracing::info;

use super::generator::SignalGenerator;
use super::oscillator::OscillatorParams;
use crate::backend::{DEFAULT_BLOCK_SIZE, OfflineBackend};
use crate::error::{GammaSyncError, RenderError};

/// Largest export a WAV data chunk can hold: 32-bit samples, u32 byte count.
pub const MAX_WAV_SAMPLES: u64 = u32::MAX as u64 / 4;

/// Number of samples in `seconds` at `sample_rate`, rejecting lengths that
/// are negative, non-finite or too long for a WAV file.
pub fn sample_count(seconds: f64, sample_rate: u32) -> Result<u64, RenderError> {
    if !(seconds.is_finite() && seconds >= 0.0) {
        return Err(RenderError::InvalidLength(seconds));
    }
    let total = (seconds * sample_rate as f64).round();
    if total > MAX_WAV_SAMPLES as f64 {
        return Err(RenderError::InvalidLength(seconds));
    }
    Ok(total as u64)
}

fn offline_generator(
    params: OscillatorParams,
    sample_rate: u32,
) -> Result<SignalGenerator, GammaSyncError> {
    let mut generator =
        SignalGenerator::with_params(Box::new(OfflineBackend::new(sample_rate)), params)?;
    generator.start()?;
    Ok(generator)
}

/// Render `seconds` of the stimulus from t = 0, block by block, exactly as
/// the audio callback would see it.
pub fn render_samples(
    params: OscillatorParams,
    sample_rate: u32,
    seconds: f64,
) -> Result<Vec<f32>, GammaSyncError> {
    let total = sample_count(seconds, sample_rate)? as usize;
    let mut generator = offline_generator(params, sample_rate)?;

    let mut samples = vec![0.0f32; total];
    for block in samples.chunks_mut(DEFAULT_BLOCK_SIZE as usize) {
        generator.render_into(block);
    }
    generator.stop();
    Ok(samples)
}

fn wav_spec(sample_rate: u32) -> hound::WavSpec {
    hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    }
}

/// Encode mono f32 samples as a 32-bit float WAV.
pub fn write_wav<W: Write + Seek>(
    samples: &[f32],
    sample_rate: u32,
    writer: W,
) -> Result<(), RenderError> {
    let mut wav = hound::WavWriter::new(writer, wav_spec(sample_rate))?;
    for &sample in samples {
        wav.write_sample(sample)?;
    }
    wav.finalize()?;
    Ok(())
}

/// Stream `seconds` of the stimulus into a 32-bit float WAV one block at a
/// time. Returns the number of samples written.
pub fn stream_wav<W: Write + Seek>(
    params: OscillatorParams,
    sample_rate: u32,
    seconds: f64,
    writer: W,
) -> Result<u64, GammaSyncError> {
    let total = sample_count(seconds, sample_rate)?;
    let mut generator = offline_generator(params, sample_rate)?;
    let mut wav =
        hound::WavWriter::new(writer, wav_spec(sample_rate)).map_err(RenderError::from)?;

    let mut block = vec![0.0f32; DEFAULT_BLOCK_SIZE as usize];
    let mut remaining = total;
    while remaining > 0 {
        let len = remaining.min(block.len() as u64) as usize;
        let out = &mut block[..len];
        generator.render_into(out);
        for &sample in out.iter() {
            wav.write_sample(sample).map_err(RenderError::from)?;
        }
        remaining -= len as u64;
    }
    wav.finalize().map_err(RenderError::from)?;
    generator.stop();
    Ok(total)
}

/// Render `seconds` of the stimulus to a WAV file at `path`.
pub fn render_wav(
    params: OscillatorParams,
    sample_rate: u32,
    seconds: f64,
    path: impl AsRef<Path>,
) -> Result<(), GammaSyncError> {
    sample_count(seconds, sample_rate)?;
    let file = std::fs::File::create(path.as_ref()).map_err(RenderError::from)?;
    let written = stream_wav(params, sample_rate, seconds, std::io::BufWriter::new(file))?;
    info!(
        "Wrote {} samples ({:.1} s) to {}",
        written,
        seconds,
        path.as_ref().display()
    );
    Ok(())
}
