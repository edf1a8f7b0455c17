//! WASM bindings for Logicwave Core.
//!
//! This module provides JavaScript-friendly bindings for browser hosts that
//! drive the simulation from `requestAnimationFrame`.
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { WasmLogicSim } from 'logicwave_core';
//!
//! await init();
//!
//! const sim = new WasmLogicSim(JSON.stringify(netlist));
//! sim.monitor('q.i');
//! sim.set_port_value('s.o', 1);
//!
//! function loop(now) {
//!   const snapshot = sim.frame(now);
//!   if (snapshot !== undefined) {
//!     drawWaveforms(JSON.parse(snapshot));
//!   }
//!   for (const change of JSON.parse(sim.take_output_changes())) {
//!     updateLamp(change.port, change.level);
//!   }
//!   requestAnimationFrame(loop);
//! }
//! requestAnimationFrame(loop);
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::components::LogicValue;
use crate::error::LogicError;
use crate::netlist;
use crate::simulation::{Simulation, SimulationConfig};
use crate::timing::{ManualTimeSource, OscillatorConfig};

/// Initialize panic hook for better error messages in browser console.
#[wasm_bindgen(start)]
pub fn init_panic_hook() {
    console_error_panic_hook::set_once();
}

fn to_js(err: LogicError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn to_json<T: Serialize>(value: &T) -> Result<String, JsValue> {
    serde_json::to_string(value).map_err(|e| {
        to_js(LogicError::WasmError {
            message: e.to_string(),
        })
    })
}

/// A port value change reported to JavaScript.
#[derive(Debug, Clone, Serialize)]
struct PortChange {
    port: String,
    level: i8,
}

/// WASM-compatible logic simulator.
///
/// Time comes from the host: every `frame(now)` call first moves the
/// simulation clock to the `requestAnimationFrame` timestamp.
#[wasm_bindgen]
pub struct WasmLogicSim {
    sim: Simulation,
    time: ManualTimeSource,
    changes: Rc<RefCell<Vec<PortChange>>>,
}

#[wasm_bindgen]
impl WasmLogicSim {
    /// Create a simulator from a JSON netlist.
    ///
    /// # Example
    /// ```javascript
    /// const sim = new WasmLogicSim(netlistJson);
    /// ```
    #[wasm_bindgen(constructor)]
    pub fn new(netlist_json: &str) -> Result<WasmLogicSim, JsValue> {
        Self::with_config(
            netlist_json,
            crate::DEFAULT_REFRESH_PERIOD_MS,
            crate::DEFAULT_VIEWPORT_WIDTH,
        )
    }

    /// Create a simulator with a custom oscillator period and viewport.
    ///
    /// # Arguments
    /// * `netlist_json` - The circuit as a JSON netlist
    /// * `refresh_period_ms` - Virtual milliseconds per oscillator period
    /// * `viewport_width` - Width of the waveform viewport
    #[wasm_bindgen]
    pub fn with_config(
        netlist_json: &str,
        refresh_period_ms: f64,
        viewport_width: f64,
    ) -> Result<WasmLogicSim, JsValue> {
        let netlist = netlist::parse(netlist_json).map_err(to_js)?;

        let config = SimulationConfig::new().with_oscillator(
            OscillatorConfig::new()
                .with_refresh_period(refresh_period_ms)
                .with_viewport_width(viewport_width),
        );
        let time = ManualTimeSource::new(0.0);
        let mut sim =
            Simulation::from_netlist(&netlist, config, Box::new(time.clone())).map_err(to_js)?;

        let changes = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&changes);
        sim.on_output_change(Box::new(move |port, level| {
            sink.borrow_mut().push(PortChange {
                port: port.to_string(),
                level: level.signal(),
            });
        }));

        Ok(WasmLogicSim { sim, time, changes })
    }

    /// Run one host frame at timestamp `now_ms`.
    ///
    /// # Returns
    /// The waveform snapshot as JSON, or `undefined` when nothing advanced.
    #[wasm_bindgen]
    pub fn frame(&mut self, now_ms: f64) -> Result<Option<String>, JsValue> {
        self.time.set(now_ms);
        self.sim.frame().map(|snapshot| to_json(&snapshot)).transpose()
    }

    /// Current waveforms as JSON.
    #[wasm_bindgen]
    pub fn snapshot(&mut self) -> Result<String, JsValue> {
        to_json(&self.sim.snapshot())
    }

    /// Drive a source port to 1 (high), -1 (low) or 0 (unknown).
    #[wasm_bindgen]
    pub fn set_port_value(&mut self, port: &str, level: i8) -> Result<(), JsValue> {
        self.sim
            .set_port_value(port, LogicValue::from_signal(level))
            .map_err(to_js)
    }

    /// Current level at a port: 1, -1 or 0.
    #[wasm_bindgen]
    pub fn port_value(&self, port: &str) -> Result<i8, JsValue> {
        self.sim.port_value(port).map(LogicValue::signal).map_err(to_js)
    }

    /// Start recording a waveform for a port.
    #[wasm_bindgen]
    pub fn monitor(&mut self, port: &str) -> Result<bool, JsValue> {
        self.sim.monitor(port).map_err(to_js)
    }

    #[wasm_bindgen]
    pub fn unmonitor(&mut self, port: &str) -> bool {
        self.sim.unmonitor(port)
    }

    #[wasm_bindgen]
    pub fn pause(&mut self) {
        self.sim.pause();
    }

    #[wasm_bindgen]
    pub fn unpause(&mut self) {
        self.sim.unpause();
    }

    #[wasm_bindgen(getter)]
    pub fn paused(&self) -> bool {
        self.sim.is_paused()
    }

    /// Port changes since the last call, as a JSON array of
    /// `{port, level}` objects.
    #[wasm_bindgen]
    pub fn take_output_changes(&mut self) -> Result<String, JsValue> {
        let changes = std::mem::take(&mut *self.changes.borrow_mut());
        to_json(&changes)
    }
}

/// Get the library version.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
