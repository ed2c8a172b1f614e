//! DSP: the amplitude-modulated stimulus tone.
//!
//! The same generator feeds the live audio callback, the offline WAV
//! renderer and the phase clock the flash overlay follows.

pub mod generator;
pub mod oscillator;
pub mod renderer;
