//! Real-time scheduler for clock pulses and waveform traces.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, info, trace};

use super::pulse::{ClockPulse, PulseLevel};
use super::time::TimeSource;
use super::trace::{TraceGeometry, Vertex, WaveTrace};
use crate::components::LogicValue;
use crate::error::{LogicError, Result};

/// Configuration for the oscillator.
#[derive(Debug, Clone)]
pub struct OscillatorConfig {
    /// Virtual time advanced per drained period (ms).
    pub refresh_period_ms: f64,
    /// Wall-clock gap after which `tick` restarts instead of replaying (ms).
    pub idle_threshold_ms: f64,
    /// Width of the waveform viewport.
    pub viewport_width: f64,
    /// Horizontal advance of every trace per period.
    pub pitch: f64,
    /// Distance between the high and low rails of a trace.
    pub trace_height: f64,
}

impl Default for OscillatorConfig {
    fn default() -> Self {
        Self {
            refresh_period_ms: crate::DEFAULT_REFRESH_PERIOD_MS,
            idle_threshold_ms: crate::DEFAULT_IDLE_THRESHOLD_MS,
            viewport_width: crate::DEFAULT_VIEWPORT_WIDTH,
            pitch: 1.0,
            trace_height: 20.0,
        }
    }
}

impl OscillatorConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_refresh_period(mut self, refresh_period_ms: f64) -> Self {
        self.refresh_period_ms = refresh_period_ms;
        self
    }

    /// Set the idle watchdog threshold.
    ///
    /// Hosts that throttle frames in the background (browser tabs, laptop
    /// sleep) produce gaps far longer than any period; beyond this threshold
    /// the backlog is discarded.
    pub fn with_idle_threshold(mut self, idle_threshold_ms: f64) -> Self {
        self.idle_threshold_ms = idle_threshold_ms;
        self
    }

    pub fn with_viewport_width(mut self, viewport_width: f64) -> Self {
        self.viewport_width = viewport_width;
        self
    }

    pub fn with_pitch(mut self, pitch: f64) -> Self {
        self.pitch = pitch;
        self
    }

    pub fn with_trace_height(mut self, trace_height: f64) -> Self {
        self.trace_height = trace_height;
        self
    }

    /// Check that every length is positive and finite.
    pub fn validate(&self) -> Result<()> {
        let checks = [
            ("refresh period", self.refresh_period_ms),
            ("viewport width", self.viewport_width),
            ("trace pitch", self.pitch),
        ];
        for (field, value) in checks {
            if !(value.is_finite() && value > 0.0) {
                return Err(LogicError::InvalidConfig {
                    field,
                    message: format!("expected a positive length, got {}", value),
                });
            }
        }
        if self.idle_threshold_ms.is_nan() || self.idle_threshold_ms < 0.0 {
            return Err(LogicError::InvalidConfig {
                field: "idle threshold",
                message: format!("expected a non-negative time, got {}", self.idle_threshold_ms),
            });
        }
        Ok(())
    }

    /// Wall-clock gap that trips the idle watchdog.
    ///
    /// Never less than two periods: a frame landing just past a period
    /// boundary must still drain.
    pub fn watchdog_ms(&self) -> f64 {
        self.idle_threshold_ms.max(2.0 * self.refresh_period_ms)
    }

    /// Geometry shared by every trace this oscillator owns.
    pub fn geometry(&self) -> TraceGeometry {
        TraceGeometry {
            pitch: self.pitch,
            ticks_per_second: 1000.0 / self.refresh_period_ms,
            height: self.trace_height,
        }
    }

    /// Seconds of history that fit in the viewport.
    pub fn history_seconds(&self) -> f64 {
        let geometry = self.geometry();
        self.viewport_width / (geometry.pitch * geometry.ticks_per_second)
    }
}

/// A monitored signal level change reported back to the oscillator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelChange {
    pub id: String,
    pub level: LogicValue,
}

/// Receiver of clock toggles.
///
/// The oscillator calls [`on_pulse`](Self::on_pulse) for every toggle in
/// the period it happens, and records the returned level changes on the
/// matching traces before the traces advance.
pub trait PulseSink {
    fn on_pulse(&mut self, id: &str, level: PulseLevel) -> Vec<LevelChange>;
}

/// Sink for oscillators that only drive traces.
impl PulseSink for () {
    fn on_pulse(&mut self, _id: &str, _level: PulseLevel) -> Vec<LevelChange> {
        Vec::new()
    }
}

/// One trace in a broadcast.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceSnapshot {
    pub path: Vec<Vertex>,
    pub width: f64,
    /// Stable per-signal display key
    pub color_key: usize,
}

/// Broadcast payload, keyed by signal id.
pub type WaveformSnapshot = BTreeMap<String, TraceSnapshot>;

#[derive(Debug)]
struct Monitored {
    color_key: usize,
    trace: WaveTrace,
}

/// Drives every clock pulse and waveform trace from host frames.
#[derive(Debug)]
pub struct Oscillator {
    pulses: BTreeMap<String, ClockPulse>,
    traces: BTreeMap<String, Monitored>,
    next_color_key: usize,
    paused: bool,
    /// Wall-clock time of the last drained period
    last_update: f64,
    /// Virtual time
    elapsed: f64,
    /// Progress into the current period when stopped
    offset: f64,
    config: OscillatorConfig,
    time: Box<dyn TimeSource>,
}

impl Oscillator {
    /// Create a stopped oscillator.
    ///
    /// Fails when the configuration holds a non-positive length.
    pub fn new(config: OscillatorConfig, time: Box<dyn TimeSource>) -> Result<Self> {
        config.validate()?;
        let last_update = time.now_ms();
        Ok(Self {
            pulses: BTreeMap::new(),
            traces: BTreeMap::new(),
            next_color_key: 0,
            paused: true,
            last_update,
            elapsed: 0.0,
            offset: 0.0,
            config,
            time,
        })
    }

    pub fn config(&self) -> &OscillatorConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        !self.paused
    }

    /// Virtual time in milliseconds.
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn pulse(&self, id: &str) -> Option<&ClockPulse> {
        self.pulses.get(id)
    }

    pub fn trace(&self, id: &str) -> Option<&WaveTrace> {
        self.traces.get(id).map(|m| &m.trace)
    }

    pub fn has_trace(&self, id: &str) -> bool {
        self.traces.contains_key(id)
    }

    pub fn pulse_count(&self) -> usize {
        self.pulses.len()
    }

    // ============ Run Control ============

    /// Resume, keeping the progress made into the current period.
    pub fn start(&mut self) {
        if !self.paused {
            return;
        }
        self.last_update = self.time.now_ms() - self.offset;
        self.offset = 0.0;
        self.paused = false;
        debug!(elapsed = self.elapsed, "oscillator started");
    }

    /// Pause. A tick already in progress finishes its drain.
    pub fn stop(&mut self) {
        if self.paused {
            return;
        }
        let progress = self.time.now_ms() - self.last_update;
        self.offset = progress.max(0.0).rem_euclid(self.config.refresh_period_ms);
        self.paused = true;
        debug!(elapsed = self.elapsed, offset = self.offset, "oscillator stopped");
    }

    /// One host frame.
    ///
    /// Drains every whole period since the last update, then broadcasts if
    /// anything was drained. A gap longer than the watchdog restarts the
    /// anchor at the current time instead of replaying the backlog.
    pub fn tick(&mut self, sink: &mut dyn PulseSink) -> Option<WaveformSnapshot> {
        if self.paused {
            return None;
        }

        let now = self.time.now_ms();
        let gap = now - self.last_update;
        if gap > self.config.watchdog_ms() {
            info!(gap_ms = gap, "idle gap exceeded, restarting oscillator");
            self.stop();
            // The gap itself is not progress into the period
            self.offset = 0.0;
            self.start();
            return None;
        }

        let period = self.config.refresh_period_ms;
        let mut drained = 0usize;
        while now - self.last_update >= period {
            self.last_update += period;
            self.elapsed += period;
            self.advance(sink);
            drained += 1;
        }

        if drained == 0 {
            return None;
        }
        trace!(drained, elapsed = self.elapsed, "oscillator tick");
        Some(self.broadcast())
    }

    /// One period: pulses first, then the level changes they caused, then
    /// every trace moves one pitch.
    fn advance(&mut self, sink: &mut dyn PulseSink) {
        let elapsed = self.elapsed;
        let mut changes = Vec::new();
        for (id, pulse) in &mut self.pulses {
            if let Some(level) = pulse.update(elapsed) {
                trace!(pulse = %id, ?level, elapsed, "pulse toggled");
                changes.extend(sink.on_pulse(id, level));
            }
        }

        for change in changes {
            self.record_level(&change.id, change.level);
        }
        for monitored in self.traces.values_mut() {
            monitored.trace.update();
        }
    }

    /// Bound every trace to the viewport and snapshot them.
    ///
    /// When any trace overflows the viewport, every trace is cut to half
    /// the viewport's worth of history so truncation happens in batches.
    pub fn broadcast(&mut self) -> WaveformSnapshot {
        let max_width = self.config.viewport_width;
        if self.traces.values().any(|m| m.trace.width() > max_width) {
            let keep = self.config.history_seconds() / 2.0;
            for monitored in self.traces.values_mut() {
                monitored.trace.truncate_segments(keep);
            }
            debug!(keep_seconds = keep, "truncated traces");
        }

        self.traces
            .iter()
            .map(|(id, m)| {
                (
                    id.clone(),
                    TraceSnapshot {
                        path: m.trace.vertices().to_vec(),
                        width: m.trace.width(),
                        color_key: m.color_key,
                    },
                )
            })
            .collect()
    }

    // ============ Registration ============

    /// Register a pulse, aligned to the current virtual time.
    ///
    /// Returns false if the id is already registered.
    pub fn add_pulse(&mut self, mut pulse: ClockPulse) -> bool {
        if self.pulses.contains_key(&pulse.id) {
            return false;
        }
        pulse.align(self.elapsed);
        debug!(pulse = %pulse.id, period = pulse.period(), "add pulse");
        self.pulses.insert(pulse.id.clone(), pulse);
        true
    }

    /// Deregister a pulse. Removing the last one stops the oscillator and
    /// clears every trace.
    pub fn remove_pulse(&mut self, id: &str) -> Option<ClockPulse> {
        let removed = self.pulses.remove(id)?;
        if self.pulses.is_empty() {
            self.stop();
            self.traces.clear();
            debug!("last pulse removed, oscillator cleared");
        }
        Some(removed)
    }

    /// Start recording a trace at `level`. Returns false if already present.
    pub fn add_trace(&mut self, id: impl Into<String>, level: LogicValue) -> bool {
        let id = id.into();
        if self.traces.contains_key(&id) {
            return false;
        }
        let monitored = Monitored {
            color_key: self.next_color_key,
            trace: WaveTrace::new(self.config.geometry(), level.signal()),
        };
        self.next_color_key += 1;
        self.traces.insert(id, monitored);
        true
    }

    pub fn remove_trace(&mut self, id: &str) -> bool {
        self.traces.remove(id).is_some()
    }

    /// Record a level change on a trace, if `id` is monitored.
    pub fn record_level(&mut self, id: &str, level: LogicValue) {
        if let Some(monitored) = self.traces.get_mut(id) {
            monitored.trace.on_level_change(level.signal());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timing::ManualTimeSource;
    use approx::assert_relative_eq;

    fn oscillator(time: &ManualTimeSource) -> Oscillator {
        let config = OscillatorConfig::new()
            .with_refresh_period(10.0)
            .with_idle_threshold(1000.0)
            .with_viewport_width(100.0);
        Oscillator::new(config, Box::new(time.clone())).unwrap()
    }

    /// Records toggles and echoes each one as a level change on the same id.
    #[derive(Default)]
    struct Echo {
        toggles: Vec<(String, PulseLevel)>,
    }

    impl PulseSink for Echo {
        fn on_pulse(&mut self, id: &str, level: PulseLevel) -> Vec<LevelChange> {
            self.toggles.push((id.to_string(), level));
            vec![LevelChange {
                id: id.to_string(),
                level: level.into(),
            }]
        }
    }

    #[test]
    fn test_tick_drains_whole_periods() {
        let time = ManualTimeSource::new(0.0);
        let mut osc = oscillator(&time);
        osc.add_pulse(ClockPulse::new("clk", 20.0, PulseLevel::High));
        osc.start();

        time.advance(5.0);
        assert!(osc.tick(&mut ()).is_none());

        time.advance(30.0);
        let snapshot = osc.tick(&mut ());
        assert!(snapshot.is_some());
        assert_relative_eq!(osc.elapsed(), 30.0);

        // The 5ms remainder carries into the next frame
        time.advance(5.0);
        assert!(osc.tick(&mut ()).is_some());
        assert_relative_eq!(osc.elapsed(), 40.0);
    }

    #[test]
    fn test_pulses_reach_sink_and_traces() {
        let time = ManualTimeSource::new(0.0);
        let mut osc = oscillator(&time);
        osc.add_pulse(ClockPulse::new("clk", 20.0, PulseLevel::High));
        osc.add_trace("clk", LogicValue::True);
        osc.start();

        let mut sink = Echo::default();
        time.advance(40.0);
        let snapshot = osc.tick(&mut sink).unwrap();

        assert_eq!(
            sink.toggles,
            vec![
                ("clk".to_string(), PulseLevel::Low),
                ("clk".to_string(), PulseLevel::High)
            ]
        );
        let clk = &snapshot["clk"];
        assert_relative_eq!(clk.width, 4.0);
        assert_eq!(clk.color_key, 0);
        // Steps at x=1 (low) and x=3 (high)
        assert!(clk.path.contains(&Vertex::new(1.0, 20.0)));
        assert!(clk.path.contains(&Vertex::new(3.0, 0.0)));
    }

    #[test]
    fn test_idle_gap_restarts_instead_of_replaying() {
        let time = ManualTimeSource::new(0.0);
        let mut osc = oscillator(&time);
        osc.add_pulse(ClockPulse::new("clk", 20.0, PulseLevel::High));
        osc.start();

        time.advance(20.0);
        osc.tick(&mut ());
        assert_relative_eq!(osc.elapsed(), 20.0);

        // Host suspended for a minute
        time.advance(60_000.0);
        assert!(osc.tick(&mut ()).is_none());
        assert_relative_eq!(osc.elapsed(), 20.0);
        assert!(osc.is_running());

        time.advance(10.0);
        osc.tick(&mut ());
        assert!(osc.elapsed() <= 40.0);
    }

    #[test]
    fn test_long_period_survives_short_idle_threshold() {
        let time = ManualTimeSource::new(0.0);
        let config = OscillatorConfig::new()
            .with_refresh_period(2000.0)
            .with_idle_threshold(1000.0);
        let mut osc = Oscillator::new(config, Box::new(time.clone())).unwrap();
        osc.add_pulse(ClockPulse::new("clk", 4000.0, PulseLevel::High));
        osc.start();

        let mut broadcasts = 0;
        for _ in 0..600 {
            time.advance(16.0);
            if osc.tick(&mut ()).is_some() {
                broadcasts += 1;
            }
        }
        // 9600ms of frames hold four whole 2000ms periods
        assert_relative_eq!(osc.elapsed(), 8000.0);
        assert_eq!(broadcasts, 4);
    }

    #[test]
    fn test_restart_drops_backlog_phase() {
        let time = ManualTimeSource::new(0.0);
        let mut osc = oscillator(&time);
        osc.add_pulse(ClockPulse::new("clk", 20.0, PulseLevel::High));
        osc.start();

        // 1005ms is past the watchdog and not a whole number of periods
        time.advance(1005.0);
        assert!(osc.tick(&mut ()).is_none());
        time.advance(9.0);
        assert!(osc.tick(&mut ()).is_none());
        time.advance(1.0);
        assert!(osc.tick(&mut ()).is_some());
        assert_relative_eq!(osc.elapsed(), 10.0);
    }

    #[test]
    fn test_non_positive_lengths_rejected() {
        let time = ManualTimeSource::new(0.0);
        for config in [
            OscillatorConfig::new().with_refresh_period(0.0),
            OscillatorConfig::new().with_refresh_period(-5.0),
            OscillatorConfig::new().with_refresh_period(f64::NAN),
            OscillatorConfig::new().with_viewport_width(0.0),
            OscillatorConfig::new().with_idle_threshold(-1.0),
        ] {
            let err = Oscillator::new(config, Box::new(time.clone())).unwrap_err();
            assert!(matches!(err, LogicError::InvalidConfig { .. }));
        }
        assert!(OscillatorConfig::new().validate().is_ok());
    }

    #[test]
    fn test_stop_preserves_phase() {
        let time = ManualTimeSource::new(0.0);
        let mut osc = oscillator(&time);
        osc.add_pulse(ClockPulse::new("clk", 20.0, PulseLevel::High));
        osc.start();

        time.advance(7.0);
        osc.tick(&mut ());
        osc.stop();
        assert!(osc.tick(&mut ()).is_none());

        time.advance(500.0);
        osc.start();
        // 7ms were banked before the pause; 3 more complete the period
        time.advance(3.0);
        assert!(osc.tick(&mut ()).is_some());
        assert_relative_eq!(osc.elapsed(), 10.0);
    }

    #[test]
    fn test_registration_is_idempotent() {
        let time = ManualTimeSource::new(0.0);
        let mut osc = oscillator(&time);
        assert!(osc.add_pulse(ClockPulse::new("a", 20.0, PulseLevel::High)));
        assert!(!osc.add_pulse(ClockPulse::new("a", 50.0, PulseLevel::Low)));
        assert!(osc.add_pulse(ClockPulse::new("b", 20.0, PulseLevel::High)));
        assert!(osc.add_trace("x", LogicValue::Unknown));
        assert!(!osc.add_trace("x", LogicValue::True));
        osc.start();

        assert!(osc.remove_pulse("a").is_some());
        assert!(osc.remove_pulse("a").is_none());
        assert!(osc.is_running());
        assert!(osc.has_trace("x"));

        osc.remove_pulse("b");
        assert!(!osc.is_running());
        assert!(!osc.has_trace("x"));
    }

    #[test]
    fn test_broadcast_halves_history_on_overflow() {
        let time = ManualTimeSource::new(0.0);
        let mut osc = oscillator(&time);
        osc.add_pulse(ClockPulse::new("clk", 1_000_000.0, PulseLevel::High));
        osc.add_trace("sig", LogicValue::False);
        osc.start();

        // 101 periods at pitch 1 overflow the 100-wide viewport
        for _ in 0..101 {
            time.advance(10.0);
            osc.tick(&mut ());
        }
        let snapshot = osc.broadcast();
        let sig = &snapshot["sig"];
        assert_relative_eq!(sig.width, 50.0);
        assert_relative_eq!(sig.path[0].x, 0.0);
        assert!(sig.path.iter().all(|v| v.x >= 0.0 && v.x <= 50.0));
    }

    #[test]
    fn test_snapshot_serializes_camel_case() {
        let time = ManualTimeSource::new(0.0);
        let mut osc = oscillator(&time);
        osc.add_trace("sig", LogicValue::True);
        let json = serde_json::to_string(&osc.broadcast()).unwrap();
        assert!(json.contains("\"colorKey\":0"));
        assert!(json.contains("\"path\":[{\"x\":0.0,\"y\":0.0}]"));
    }
}
