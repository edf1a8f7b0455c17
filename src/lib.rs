//! # Logicwave Core
//!
//! A tri-state digital logic simulator with real-time waveform traces.
//!
//! This library provides:
//! - A JSON netlist format for describing gates, latches and composite
//!   sub-circuits
//! - Worklist-based propagation over TRUE / FALSE / UNKNOWN signals that
//!   converges on feedback networks
//! - Clock pulses and compacted waveform traces driven by host frames
//! - A headless CLI runner and WASM bindings
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`netlist`] - Structural description records, JSON loading and validation
//! - [`components`] - Logic values, gate rules and circuit nodes
//! - [`circuit`] - The propagation kernel (node arena plus worklist)
//! - [`timing`] - Clock pulses, waveform traces and the oscillator
//! - [`simulation`] - Netlist-to-node mapping and the frame loop
//! - [`host`] - Headless frame runner (CLI only)
//!
//! ## Usage
//!
//! ### Native CLI
//!
//! ```bash
//! logicwave latch.json --set s.o=1 --set s.o=0 --monitor q.i --frames 120
//! ```
//!
//! ### WASM
//!
//! ```javascript
//! import { WasmLogicSim } from 'logicwave_core';
//!
//! const sim = new WasmLogicSim(netlistJson);
//! sim.monitor('q.i');
//! requestAnimationFrame(function loop(now) {
//!   const snapshot = sim.frame(now);
//!   if (snapshot) draw(JSON.parse(snapshot));
//!   requestAnimationFrame(loop);
//! });
//! ```
//!
//! ## Propagation
//!
//! Each call to [`Circuit::next`] sweeps a snapshot of the worklist:
//!
//! 1. Every queued node commits its pending value and, on change, delivers
//!    it to the input slots of its targets
//! 2. Touched targets are queued for the next sweep
//! 3. Sweeps repeat while work remains and either nothing changed or a
//!    processed node forces continuation
//!
//! Sweeps are capped by [`CircuitConfig::max_passes`] so oscillating
//! feedback cannot stall a host frame.

pub mod circuit;
pub mod components;
pub mod error;
pub mod netlist;
pub mod simulation;
pub mod timing;

#[cfg(feature = "cli")]
pub mod host;

// Re-export main types for convenience
pub use circuit::{Circuit, CircuitConfig, NodeId};
pub use components::LogicValue;
pub use error::{LogicError, Result};
pub use netlist::Netlist;
pub use simulation::{Simulation, SimulationConfig};
pub use timing::{Oscillator, OscillatorConfig};

// WASM bindings
#[cfg(feature = "wasm")]
mod wasm;

#[cfg(feature = "wasm")]
pub use wasm::WasmLogicSim;

/// Default cap on propagation sweeps per `next()` or `stabilize()` call
pub const DEFAULT_MAX_PASSES: usize = 10_000;

/// Default virtual time per oscillator period, one 60 Hz display frame (ms)
pub const DEFAULT_REFRESH_PERIOD_MS: f64 = 1000.0 / 60.0;

/// Default wall-clock gap after which the oscillator restarts (ms)
pub const DEFAULT_IDLE_THRESHOLD_MS: f64 = 1000.0;

/// Default waveform viewport width
pub const DEFAULT_VIEWPORT_WIDTH: f64 = 800.0;
