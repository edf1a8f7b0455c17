//! Node models for logic simulation.
//!
//! This module provides every evaluable unit of the kernel:
//! - Driven: Input (pinned to an external constant)
//! - Sink: Output
//! - Pass-through: Buffer
//! - Combinational: Or, Nor, And, Nand, Not
//!
//! A node's behavior is selected by its [`NodeKind`] at evaluation time;
//! the kind is never swapped after construction except for the constant
//! carried by an input.

mod gates;
mod node;
mod value;

pub use gates::{and, buffer, nand, nor, not, or};
pub use node::{Node, Subscriber};
pub use value::LogicValue;

use serde::{Deserialize, Serialize};

/// Gate function used by combinational nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateKind {
    Or,
    Nor,
    And,
    Nand,
    Not,
    Buffer,
}

impl GateKind {
    /// Parse a gate from its element subkind.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "or" => Some(Self::Or),
            "nor" => Some(Self::Nor),
            "and" => Some(Self::And),
            "nand" => Some(Self::Nand),
            "not" | "inverter" => Some(Self::Not),
            "buffer" | "buf" => Some(Self::Buffer),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Or => "or",
            Self::Nor => "nor",
            Self::And => "and",
            Self::Nand => "nand",
            Self::Not => "not",
            Self::Buffer => "buffer",
        }
    }

    pub fn node_kind(self) -> NodeKind {
        match self {
            Self::Or => NodeKind::Or,
            Self::Nor => NodeKind::Nor,
            Self::And => NodeKind::And,
            Self::Nand => NodeKind::Nand,
            Self::Not => NodeKind::Not,
            Self::Buffer => NodeKind::Buffer,
        }
    }
}

/// Evaluation discriminant of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Driven node, evaluation pinned to `constant`
    Input { constant: LogicValue },
    /// Sink; the delivered value is taken directly
    Output,
    Buffer,
    Or,
    Nor,
    And,
    Nand,
    Not,
}

impl NodeKind {
    /// Input node pinned to `constant`.
    pub fn input(constant: LogicValue) -> Self {
        Self::Input { constant }
    }

    pub fn is_input(&self) -> bool {
        matches!(self, Self::Input { .. })
    }

    /// Number of input slots a freshly built node of this kind gets.
    pub fn default_arity(&self) -> usize {
        match self {
            Self::Input { .. } => 0,
            Self::Output | Self::Buffer | Self::Not => 1,
            Self::Or | Self::Nor | Self::And | Self::Nand => 2,
        }
    }

    /// Compute the node value from its input slots.
    pub fn evaluate(&self, inputs: &[LogicValue]) -> LogicValue {
        match self {
            Self::Input { constant } => *constant,
            Self::Output | Self::Buffer => buffer(inputs),
            Self::Or => or(inputs),
            Self::Nor => nor(inputs),
            Self::And => and(inputs),
            Self::Nand => nand(inputs),
            Self::Not => not(inputs),
        }
    }
}
