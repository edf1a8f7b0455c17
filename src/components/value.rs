//! Tri-state signal level.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Signal level carried on every node and connection.
///
/// There is no ordering between levels; gates only compare for equality and
/// apply their dominance scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicValue {
    True,
    False,
    /// Undriven or indeterminate
    #[default]
    Unknown,
}

impl LogicValue {
    /// Numeric signal used by waveforms and the JS bindings: 1, -1 or 0.
    pub fn signal(self) -> i8 {
        match self {
            Self::True => 1,
            Self::False => -1,
            Self::Unknown => 0,
        }
    }

    /// Inverse of [`signal`](Self::signal). Any positive number is TRUE,
    /// any negative number FALSE.
    pub fn from_signal(signal: i8) -> Self {
        match signal {
            s if s > 0 => Self::True,
            s if s < 0 => Self::False,
            _ => Self::Unknown,
        }
    }

    /// Logical negation; UNKNOWN stays UNKNOWN.
    pub fn not(self) -> Self {
        match self {
            Self::True => Self::False,
            Self::False => Self::True,
            Self::Unknown => Self::Unknown,
        }
    }

    pub fn is_known(self) -> bool {
        self != Self::Unknown
    }
}

impl From<bool> for LogicValue {
    fn from(b: bool) -> Self {
        if b {
            Self::True
        } else {
            Self::False
        }
    }
}

impl fmt::Display for LogicValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::True => write!(f, "1"),
            Self::False => write!(f, "0"),
            Self::Unknown => write!(f, "X"),
        }
    }
}

impl FromStr for LogicValue {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "1" | "true" | "high" | "h" => Ok(Self::True),
            "0" | "false" | "low" | "l" => Ok(Self::False),
            "x" | "u" | "unknown" => Ok(Self::Unknown),
            other => Err(format!("unrecognized logic level '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_mapping() {
        for v in [LogicValue::True, LogicValue::False, LogicValue::Unknown] {
            assert_eq!(LogicValue::from_signal(v.signal()), v);
        }
        assert_eq!(LogicValue::from_signal(42), LogicValue::True);
    }

    #[test]
    fn test_parse_levels() {
        assert_eq!("1".parse::<LogicValue>(), Ok(LogicValue::True));
        assert_eq!("LOW".parse::<LogicValue>(), Ok(LogicValue::False));
        assert_eq!("x".parse::<LogicValue>(), Ok(LogicValue::Unknown));
        assert!("maybe".parse::<LogicValue>().is_err());
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&LogicValue::Unknown).unwrap();
        assert_eq!(json, "\"unknown\"");
        let v: LogicValue = serde_json::from_str("\"true\"").unwrap();
        assert_eq!(v, LogicValue::True);
    }
}
