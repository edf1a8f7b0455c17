//! Step-waveform history for one signal.
//!
//! A [`WaveTrace`] is a polyline of vertices. Each oscillator tick moves the
//! pen right by one pitch; a run of ticks at the same level keeps moving the
//! last vertex instead of appending one per tick, so a long flat segment
//! costs two vertices regardless of its length.

use serde::Serialize;

/// A point on the waveform path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Vertex {
    pub x: f64,
    pub y: f64,
}

impl Vertex {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Horizontal and vertical scale of a trace.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraceGeometry {
    /// Horizontal advance per tick
    pub pitch: f64,
    /// Ticks per second of virtual time
    pub ticks_per_second: f64,
    /// Distance between the high and low rails
    pub height: f64,
}

impl TraceGeometry {
    /// Vertical coordinate of a signal level: high at 0, low at `height`,
    /// unknown halfway.
    pub fn y(&self, level: i8) -> f64 {
        self.height * (1.0 - f64::from(level.signum())) / 2.0
    }

    /// Horizontal extent of `seconds` of history.
    pub fn width_of(&self, seconds: f64) -> f64 {
        seconds * self.ticks_per_second * self.pitch
    }
}

/// Waveform history of a single signal.
#[derive(Debug, Clone)]
pub struct WaveTrace {
    vertices: Vec<Vertex>,
    width: f64,
    /// Last committed level
    level: i8,
    /// Level drawn by the last tick, `None` before the first tick or after
    /// a step
    rendered: Option<i8>,
    geometry: TraceGeometry,
}

impl WaveTrace {
    pub fn new(geometry: TraceGeometry, level: i8) -> Self {
        Self {
            vertices: vec![Vertex::new(0.0, geometry.y(level))],
            width: 0.0,
            level,
            rendered: None,
            geometry,
        }
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn level(&self) -> i8 {
        self.level
    }

    pub fn geometry(&self) -> &TraceGeometry {
        &self.geometry
    }

    /// Advance by one tick.
    pub fn update(&mut self) {
        self.width += self.geometry.pitch;
        let cursor = Vertex::new(self.width, self.geometry.y(self.level));

        if self.rendered == Some(self.level) && self.vertices.len() > 1 {
            // Extend the current flat run
            self.vertices.pop();
        }
        self.vertices.push(cursor);
        self.rendered = Some(self.level);
    }

    /// Record a new level with a vertical step at the current position.
    pub fn on_level_change(&mut self, level: i8) {
        if level == self.level {
            return;
        }
        self.level = level;
        self.vertices
            .push(Vertex::new(self.width, self.geometry.y(level)));
        // The step vertex is a corner; the next tick must not move it
        self.rendered = None;
    }

    /// Drop history older than `seconds_to_keep`, shifting the remainder so
    /// the path starts at x = 0.
    pub fn truncate_segments(&mut self, seconds_to_keep: f64) {
        let keep = self.geometry.width_of(seconds_to_keep.max(0.0));
        let excess = self.width - keep;
        if excess <= 0.0 || self.vertices.is_empty() {
            return;
        }

        for vertex in &mut self.vertices {
            vertex.x -= excess;
        }

        // The last vertex at or left of zero carries the level at the new
        // left edge
        let boundary = self
            .vertices
            .iter()
            .position(|v| v.x > 0.0)
            .map_or(self.vertices.len() - 1, |i| i.saturating_sub(1));
        if self.vertices[boundary].x < 0.0 {
            self.vertices[boundary].x = 0.0;
        }
        self.vertices.drain(..boundary);
        self.width -= excess;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn geometry() -> TraceGeometry {
        TraceGeometry {
            pitch: 2.0,
            ticks_per_second: 10.0,
            height: 20.0,
        }
    }

    fn assert_monotonic(trace: &WaveTrace) {
        for pair in trace.vertices().windows(2) {
            assert!(pair[0].x <= pair[1].x, "{:?}", trace.vertices());
        }
        assert!(trace.vertices().iter().all(|v| v.x >= 0.0));
    }

    #[test]
    fn test_flat_run_coalesces() {
        let mut trace = WaveTrace::new(geometry(), 1);
        for _ in 0..5 {
            trace.update();
        }
        assert_eq!(trace.vertices().len(), 2);
        assert_relative_eq!(trace.width(), 10.0);
        assert_eq!(trace.vertices()[1], Vertex::new(10.0, 0.0));
    }

    #[test]
    fn test_level_change_draws_step() {
        let mut trace = WaveTrace::new(geometry(), 1);
        trace.update();
        trace.update();
        trace.on_level_change(-1);
        trace.update();
        trace.update();

        assert_eq!(
            trace.vertices(),
            &[
                Vertex::new(0.0, 0.0),
                Vertex::new(4.0, 0.0),
                Vertex::new(4.0, 20.0),
                Vertex::new(8.0, 20.0),
            ]
        );
        // Same level again is not a step
        trace.on_level_change(-1);
        assert_eq!(trace.vertices().len(), 4);
    }

    #[test]
    fn test_unknown_sits_midway() {
        let trace = WaveTrace::new(geometry(), 0);
        assert_relative_eq!(trace.vertices()[0].y, 10.0);
    }

    #[test]
    fn test_glitch_between_ticks_keeps_corners() {
        let mut trace = WaveTrace::new(geometry(), 1);
        trace.update();
        trace.on_level_change(-1);
        trace.on_level_change(1);
        trace.update();
        assert_monotonic(&trace);
        assert_eq!(trace.vertices().last(), Some(&Vertex::new(4.0, 0.0)));
        assert_eq!(trace.vertices().len(), 5);
    }

    #[test]
    fn test_truncate_shifts_and_clamps() {
        let mut trace = WaveTrace::new(geometry(), 1);
        for _ in 0..10 {
            trace.update();
        }
        trace.on_level_change(-1);
        for _ in 0..10 {
            trace.update();
        }
        assert_relative_eq!(trace.width(), 40.0);

        // One second at 10 ticks/s and pitch 2 keeps 20 units
        trace.truncate_segments(1.0);
        assert_relative_eq!(trace.width(), 20.0);
        assert_monotonic(&trace);
        // The step sat exactly on the new left edge; only the low run remains
        assert_eq!(trace.vertices(), &[Vertex::new(0.0, 20.0), Vertex::new(20.0, 20.0)]);

        trace.truncate_segments(0.5);
        assert_relative_eq!(trace.width(), 10.0);
        assert_eq!(trace.vertices(), &[Vertex::new(0.0, 20.0), Vertex::new(10.0, 20.0)]);
    }

    #[test]
    fn test_truncate_mid_run_clamps_run_start() {
        let mut trace = WaveTrace::new(geometry(), 1);
        for _ in 0..10 {
            trace.update();
        }
        trace.on_level_change(-1);
        for _ in 0..10 {
            trace.update();
        }

        trace.truncate_segments(1.5);
        assert_eq!(
            trace.vertices(),
            &[
                Vertex::new(0.0, 0.0),
                Vertex::new(10.0, 0.0),
                Vertex::new(10.0, 20.0),
                Vertex::new(30.0, 20.0),
            ]
        );
    }

    #[test]
    fn test_truncate_is_noop_within_window() {
        let mut trace = WaveTrace::new(geometry(), -1);
        trace.update();
        let before = trace.vertices().to_vec();
        trace.truncate_segments(10.0);
        assert_eq!(trace.vertices(), before.as_slice());
    }

    #[test]
    fn test_random_walk_stays_monotonic() {
        let mut trace = WaveTrace::new(geometry(), 1);
        // Deterministic pseudo-random sequence of ticks, steps and truncations
        let mut state: u32 = 0x2545_f491;
        for _ in 0..500 {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            match state % 7 {
                0 => trace.on_level_change((state % 3) as i8 - 1),
                1 => trace.truncate_segments(f64::from(state % 4) * 0.5),
                _ => trace.update(),
            }
            assert_monotonic(&trace);
        }
    }
}
