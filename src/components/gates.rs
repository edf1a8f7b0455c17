//! Tri-state gate evaluation rules.
//!
//! Each rule is a single dominance scan over the input slots. Nor and Nand
//! run their own scan rather than negating Or/And so that the dominance
//! order is explicit in one place per gate.

use super::LogicValue::{self, False, True, Unknown};

/// TRUE if any input is TRUE; else UNKNOWN if any is UNKNOWN; else FALSE.
pub fn or(inputs: &[LogicValue]) -> LogicValue {
    if inputs.contains(&True) {
        True
    } else if inputs.contains(&Unknown) {
        Unknown
    } else {
        False
    }
}

/// FALSE if any input is TRUE; else UNKNOWN if any is UNKNOWN; else TRUE.
pub fn nor(inputs: &[LogicValue]) -> LogicValue {
    if inputs.contains(&True) {
        False
    } else if inputs.contains(&Unknown) {
        Unknown
    } else {
        True
    }
}

/// FALSE if any input is FALSE; else UNKNOWN if any is UNKNOWN; else TRUE.
pub fn and(inputs: &[LogicValue]) -> LogicValue {
    if inputs.contains(&False) {
        False
    } else if inputs.contains(&Unknown) {
        Unknown
    } else {
        True
    }
}

/// TRUE if any input is FALSE; else UNKNOWN if any is UNKNOWN; else FALSE.
pub fn nand(inputs: &[LogicValue]) -> LogicValue {
    if inputs.contains(&False) {
        True
    } else if inputs.contains(&Unknown) {
        Unknown
    } else {
        False
    }
}

/// Negation of the first slot. A gate with no inputs reads UNKNOWN.
pub fn not(inputs: &[LogicValue]) -> LogicValue {
    inputs.first().copied().unwrap_or(Unknown).not()
}

/// Pass-through of the first slot.
pub fn buffer(inputs: &[LogicValue]) -> LogicValue {
    inputs.first().copied().unwrap_or(Unknown)
}
