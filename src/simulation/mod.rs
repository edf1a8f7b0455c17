//! Netlist-driven simulation.
//!
//! This module ties the propagation kernel and the oscillator together:
//!
//! - [`Engine`] - builds nodes and slots from elements and ports, flattens
//!   integrated circuits, and reports port-level value changes
//! - [`Simulation`] - owns an engine and an oscillator, registers clock
//!   pulses and monitored traces, and runs one host frame at a time
//!
//! # Frame loop
//!
//! Each [`Simulation::frame`] call runs at most one kernel step for work
//! left queued by structural edits, then ticks the oscillator. The engine
//! is the oscillator's [`PulseSink`](crate::timing::PulseSink): every clock
//! toggle drives its clock node, stabilizes the circuit, and hands the
//! resulting port changes back to the traces.

mod engine;
mod orchestrator;

pub use engine::{Engine, OutputCallback};
pub use orchestrator::{Simulation, SimulationConfig};
