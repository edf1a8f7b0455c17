//! Real-time clocking and waveform capture.
//!
//! ## Virtual and wall time
//!
//! The [`Oscillator`] is ticked once per host frame. It converts wall-clock
//! progress (from an injected [`TimeSource`]) into whole periods of virtual
//! time and, for each period:
//!
//! 1. Updates every [`ClockPulse`] with the new virtual time
//! 2. Hands toggles to a [`PulseSink`] and records the level changes it
//!    reports on the matching [`WaveTrace`]s
//! 3. Advances every trace by one pitch
//!
//! A frame gap longer than the idle threshold (host suspended, tab hidden)
//! re-anchors the wall clock instead of replaying the backlog.

mod oscillator;
mod pulse;
mod time;
mod trace;

pub use oscillator::{
    LevelChange, Oscillator, OscillatorConfig, PulseSink, TraceSnapshot, WaveformSnapshot,
};
pub use pulse::{ClockConfig, ClockPulse, PulseLevel};
pub use time::{ManualTimeSource, SystemTimeSource, TimeSource};
pub use trace::{TraceGeometry, Vertex, WaveTrace};
