//! Visual flash timing.
//!
//! [`FlashGate`] turns the generator's modulation phase (or a free-running
//! fallback clock) into an ON/OFF state; [`PhaseSync`] polls it on a
//! dedicated thread and hands transitions to whoever paints the overlay.

pub mod gate;
pub mod phase_sync;

pub use gate::{DEFAULT_INTENSITY, FlashGate, FlashState, FlashTransition};
pub use phase_sync::{DEFAULT_POLL_INTERVAL, PhaseSync, TransitionSink};
