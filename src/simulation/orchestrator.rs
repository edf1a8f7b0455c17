//! Simulation orchestrator.

use tracing::{debug, info};

use super::engine::{Engine, OutputCallback};
use crate::circuit::{Circuit, CircuitConfig};
use crate::components::LogicValue;
use crate::error::Result;
use crate::netlist::{validate_netlist, ConnectionDef, ElementDef, ElementKind, Netlist, PortDef};
use crate::timing::{
    ClockPulse, LevelChange, Oscillator, OscillatorConfig, TimeSource, WaveformSnapshot,
};

/// Configuration for a simulation.
#[derive(Debug, Clone, Default)]
pub struct SimulationConfig {
    pub circuit: CircuitConfig,
    pub oscillator: OscillatorConfig,
}

impl SimulationConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_circuit(mut self, circuit: CircuitConfig) -> Self {
        self.circuit = circuit;
        self
    }

    pub fn with_oscillator(mut self, oscillator: OscillatorConfig) -> Self {
        self.oscillator = oscillator;
        self
    }

    /// Set the kernel pass cap.
    pub fn with_max_passes(mut self, max_passes: usize) -> Self {
        self.circuit = self.circuit.with_max_passes(max_passes);
        self
    }

    /// Set the virtual time advanced per oscillator period.
    pub fn with_refresh_period(mut self, refresh_period_ms: f64) -> Self {
        self.oscillator = self.oscillator.with_refresh_period(refresh_period_ms);
        self
    }
}

/// A circuit built from a netlist, driven by host frames.
///
/// Structural edits are accepted at any time, including while paused.
/// Pausing suppresses kernel stepping and clock advancement only.
#[derive(Debug)]
pub struct Simulation {
    engine: Engine,
    oscillator: Oscillator,
    paused: bool,
}

impl Simulation {
    /// Create an empty, running simulation.
    pub fn new(config: SimulationConfig, time: Box<dyn TimeSource>) -> Result<Self> {
        Ok(Self {
            oscillator: Oscillator::new(config.oscillator, time)?,
            engine: Engine::new(config.circuit),
            paused: false,
        })
    }

    /// Build a simulation from a netlist and settle it.
    pub fn from_netlist(
        netlist: &Netlist,
        config: SimulationConfig,
        time: Box<dyn TimeSource>,
    ) -> Result<Self> {
        validate_netlist(netlist)?;
        let mut sim = Self::new(config, time)?;

        for element in &netlist.elements {
            sim.add_element(element)?;
        }
        for element in &netlist.elements {
            for port in netlist.ports_of(element) {
                sim.add_port(port)?;
            }
        }
        for connection in &netlist.connections {
            sim.add_connection(connection)?;
        }

        sim.engine.settle();
        sim.flush();
        info!(
            elements = netlist.elements.len(),
            ports = netlist.ports.len(),
            connections = netlist.connections.len(),
            nodes = sim.engine.circuit().len(),
            "simulation built"
        );
        Ok(sim)
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn circuit(&self) -> &Circuit {
        self.engine.circuit()
    }

    pub fn oscillator(&self) -> &Oscillator {
        &self.oscillator
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    // ============ Structure ============

    /// Add an element. Clock elements also register their pulse.
    pub fn add_element(&mut self, def: &ElementDef) -> Result<()> {
        self.engine.add_element(def)?;
        if def.kind == ElementKind::Clock {
            if let Some(clock) = &def.clock {
                self.oscillator.add_pulse(ClockPulse::from_config(&def.id, clock));
                if !self.paused {
                    self.oscillator.start();
                }
            }
        }
        self.flush();
        Ok(())
    }

    /// Remove an element, its pulse and the traces of its ports.
    pub fn remove_element(&mut self, id: &str) -> Result<()> {
        let ports = self.engine.element_ports(id)?.to_vec();
        self.engine.remove_element(id)?;
        for port in &ports {
            self.oscillator.remove_trace(port);
        }
        self.oscillator.remove_pulse(id);
        self.flush();
        Ok(())
    }

    pub fn add_port(&mut self, def: &PortDef) -> Result<()> {
        self.engine.add_port(def)?;
        self.flush();
        Ok(())
    }

    pub fn remove_port(&mut self, id: &str) -> Result<()> {
        self.engine.remove_port(id)?;
        self.oscillator.remove_trace(id);
        self.flush();
        Ok(())
    }

    pub fn add_connection(&mut self, def: &ConnectionDef) -> Result<()> {
        self.engine.add_connection(def)?;
        self.flush();
        Ok(())
    }

    pub fn remove_connection(&mut self, def: &ConnectionDef) -> Result<()> {
        self.engine.remove_connection(def)?;
        self.flush();
        Ok(())
    }

    // ============ Values ============

    /// Drive a source port and stabilize synchronously.
    pub fn set_port_value(&mut self, port: &str, value: LogicValue) -> Result<()> {
        let changes = self.engine.set_port_value(port, value)?;
        self.record(changes);
        Ok(())
    }

    pub fn port_value(&self, port: &str) -> Result<LogicValue> {
        self.engine.port_value(port)
    }

    /// Register a callback for every port value change.
    pub fn on_output_change(&mut self, callback: OutputCallback) {
        self.engine.on_output_change(callback);
    }

    /// Start recording a waveform for a port. Returns false if the port is
    /// already monitored.
    pub fn monitor(&mut self, port: &str) -> Result<bool> {
        let level = self.engine.port_value(port)?;
        let added = self.oscillator.add_trace(port, level);
        if added {
            debug!(port, %level, "monitor");
        }
        Ok(added)
    }

    pub fn unmonitor(&mut self, port: &str) -> bool {
        self.oscillator.remove_trace(port)
    }

    // ============ Run Control ============

    pub fn pause(&mut self) {
        self.paused = true;
        self.oscillator.stop();
        debug!("simulation paused");
    }

    pub fn unpause(&mut self) {
        self.paused = false;
        if self.oscillator.pulse_count() > 0 {
            self.oscillator.start();
        }
        debug!("simulation resumed");
    }

    /// One host frame: a kernel step if work is queued, then an oscillator
    /// tick. Returns the waveform snapshot when the oscillator broadcast.
    pub fn frame(&mut self) -> Option<WaveformSnapshot> {
        if self.paused {
            return None;
        }
        if !self.engine.is_settled() {
            let changes = self.engine.step();
            self.record(changes);
        }
        self.oscillator.tick(&mut self.engine)
    }

    /// Current waveforms, bounded to the viewport.
    pub fn snapshot(&mut self) -> WaveformSnapshot {
        self.oscillator.broadcast()
    }

    /// Kernel changes caused by structural edits go to traces and callbacks
    /// right away.
    fn flush(&mut self) {
        let changes = self.engine.dispatch();
        self.record(changes);
    }

    fn record(&mut self, changes: Vec<LevelChange>) {
        for change in changes {
            self.oscillator.record_level(&change.id, change.level);
        }
    }
}
