//! Periodic two-level clock generator.
//!
//! A [`ClockPulse`] toggles whenever the virtual elapsed time passes its
//! last toggle plus one period. It never looks at the wall clock, so it can
//! be driven by synthetic time in tests.

use serde::{Deserialize, Serialize};

use crate::components::LogicValue;

/// Level of a clock signal. Unlike [`LogicValue`] it has no UNKNOWN state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PulseLevel {
    #[default]
    High,
    Low,
}

impl PulseLevel {
    /// Numeric signal: 1 for high, -1 for low.
    pub fn signal(self) -> i8 {
        match self {
            Self::High => 1,
            Self::Low => -1,
        }
    }

    /// Non-negative signals read as high.
    pub fn from_signal(signal: i8) -> Self {
        if signal < 0 {
            Self::Low
        } else {
            Self::High
        }
    }

    pub fn flip(self) -> Self {
        match self {
            Self::High => Self::Low,
            Self::Low => Self::High,
        }
    }
}

impl From<PulseLevel> for LogicValue {
    fn from(level: PulseLevel) -> Self {
        match level {
            PulseLevel::High => LogicValue::True,
            PulseLevel::Low => LogicValue::False,
        }
    }
}

/// Clock configuration as supplied by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClockConfig {
    /// Display label
    #[serde(default)]
    pub label: String,
    /// Time between toggles
    pub period_milliseconds: f64,
    /// Level before the first toggle
    #[serde(default)]
    pub initial_level: PulseLevel,
}

impl ClockConfig {
    pub fn new(label: impl Into<String>, period_milliseconds: f64, initial_level: PulseLevel) -> Self {
        Self {
            label: label.into(),
            period_milliseconds,
            initial_level,
        }
    }
}

/// A clock signal driven by virtual elapsed time.
#[derive(Debug, Clone)]
pub struct ClockPulse {
    pub id: String,
    period: f64,
    level: PulseLevel,
    /// Virtual time of the last toggle
    last_toggle: f64,
}

impl ClockPulse {
    /// Create a pulse whose first toggle is due one period after time zero.
    pub fn new(id: impl Into<String>, period: f64, level: PulseLevel) -> Self {
        Self {
            id: id.into(),
            period: period.max(f64::EPSILON),
            level,
            last_toggle: 0.0,
        }
    }

    pub fn from_config(id: impl Into<String>, config: &ClockConfig) -> Self {
        Self::new(id, config.period_milliseconds, config.initial_level)
    }

    pub fn level(&self) -> PulseLevel {
        self.level
    }

    pub fn period(&self) -> f64 {
        self.period
    }

    pub fn last_toggle(&self) -> f64 {
        self.last_toggle
    }

    /// Restart the period count from `elapsed`.
    pub fn align(&mut self, elapsed: f64) {
        self.last_toggle = elapsed;
    }

    /// Toggle if a full period has passed since the last toggle.
    ///
    /// Returns the new level on change.
    pub fn update(&mut self, elapsed: f64) -> Option<PulseLevel> {
        if elapsed < self.last_toggle + self.period {
            return None;
        }
        self.level = self.level.flip();
        self.last_toggle = elapsed;
        Some(self.level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_toggles_once_per_period() {
        let mut pulse = ClockPulse::new("clk", 1000.0, PulseLevel::from_signal(1));
        let events: Vec<i8> = [0.0, 1000.0, 2000.0]
            .iter()
            .filter_map(|&t| pulse.update(t))
            .map(PulseLevel::signal)
            .collect();
        assert_eq!(events, vec![-1, 1]);
    }

    #[test]
    fn test_clock_ignores_partial_periods() {
        let mut pulse = ClockPulse::new("clk", 100.0, PulseLevel::Low);
        assert_eq!(pulse.update(99.9), None);
        assert_eq!(pulse.update(150.0), Some(PulseLevel::High));
        // Period restarts from the toggle, not from the schedule
        assert_eq!(pulse.update(200.0), None);
        assert_eq!(pulse.update(250.0), Some(PulseLevel::Low));
    }

    #[test]
    fn test_align_defers_next_toggle() {
        let mut pulse = ClockPulse::new("clk", 100.0, PulseLevel::High);
        pulse.align(5000.0);
        assert_eq!(pulse.update(5050.0), None);
        assert_eq!(pulse.update(5100.0), Some(PulseLevel::Low));
    }

    #[test]
    fn test_config_from_json() {
        let config: ClockConfig =
            serde_json::from_str(r#"{"label":"CLK","periodMilliseconds":500,"initialLevel":"low"}"#)
                .unwrap();
        assert_eq!(config, ClockConfig::new("CLK", 500.0, PulseLevel::Low));
        let pulse = ClockPulse::from_config("c1", &config);
        assert_eq!(LogicValue::from(pulse.level()), LogicValue::False);
    }
}
