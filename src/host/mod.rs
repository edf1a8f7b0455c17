//! Headless frame runner for the CLI frontend.
//!
//! Runs a simulation against a manual clock, one fixed-length frame at a
//! time, and writes the final waveform snapshot as JSON.

use std::io::Write;

use tracing::{debug, info};

use crate::components::LogicValue;
use crate::error::{LogicError, Result};
use crate::netlist::Netlist;
use crate::simulation::{Simulation, SimulationConfig};
use crate::timing::{ManualTimeSource, WaveformSnapshot};

/// What a headless run does besides building the circuit.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Number of host frames to run
    pub frames: usize,
    /// Wall-clock milliseconds between frames
    pub frame_ms: f64,
    /// Port writes applied before the first frame, in order
    pub writes: Vec<(String, LogicValue)>,
    /// Ports to record waveforms for
    pub monitors: Vec<String>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            frames: 60,
            frame_ms: crate::DEFAULT_REFRESH_PERIOD_MS,
            writes: Vec::new(),
            monitors: Vec::new(),
        }
    }
}

/// Parse a `port=level` assignment.
pub fn parse_assignment(text: &str) -> Result<(String, LogicValue)> {
    let (port, level) = text
        .split_once('=')
        .ok_or_else(|| LogicError::InvalidAssignment {
            text: text.to_string(),
            message: "expected PORT=LEVEL".to_string(),
        })?;
    let level = level
        .trim()
        .parse::<LogicValue>()
        .map_err(|message| LogicError::InvalidAssignment {
            text: text.to_string(),
            message,
        })?;
    Ok((port.trim().to_string(), level))
}

/// Build a simulation, apply writes and monitors, and run the frames.
///
/// Returns the snapshot after the last frame.
pub fn run_headless(
    netlist: &Netlist,
    config: SimulationConfig,
    options: &RunOptions,
) -> Result<WaveformSnapshot> {
    let time = ManualTimeSource::new(0.0);
    let mut sim = Simulation::from_netlist(netlist, config, Box::new(time.clone()))?;

    for port in &options.monitors {
        sim.monitor(port)?;
    }
    for (port, level) in &options.writes {
        sim.set_port_value(port, *level)?;
    }

    let mut broadcasts = 0usize;
    for _ in 0..options.frames {
        time.advance(options.frame_ms);
        if sim.frame().is_some() {
            broadcasts += 1;
        }
    }
    debug!(frames = options.frames, broadcasts, "headless run finished");

    for port in &options.monitors {
        info!(port = %port, level = %sim.port_value(port)?, "final level");
    }
    Ok(sim.snapshot())
}

/// Write a snapshot as pretty-printed JSON followed by a newline.
pub fn write_snapshot<W: Write>(snapshot: &WaveformSnapshot, mut out: W) -> Result<()> {
    serde_json::to_writer_pretty(&mut out, snapshot).map_err(|e| LogicError::OutputError {
        message: e.to_string(),
    })?;
    writeln!(out).map_err(|e| LogicError::OutputError {
        message: e.to_string(),
    })
}
