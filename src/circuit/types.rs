//! Core types for the circuit graph.

use std::fmt;

use crate::components::LogicValue;

/// A unique identifier for a node in the circuit.
///
/// Ids index the circuit's node arena and are never reused after removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "N{}", self.0)
    }
}

/// A directed edge from a source node's output to one input slot of a
/// target node. Owned by the source node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Connection {
    /// Node receiving the value
    pub target: NodeId,
    /// Input slot on the target
    pub slot: usize,
}

impl Connection {
    /// Create a new connection.
    pub fn new(target: NodeId, slot: usize) -> Self {
        Self { target, slot }
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.target, self.slot)
    }
}

/// A committed value change, recorded by the circuit for its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueChange {
    pub node: NodeId,
    pub value: LogicValue,
}

/// Outcome of one call to [`Circuit::next`](super::Circuit::next).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Number of worklist sweeps performed
    pub passes: usize,
    /// Whether any node committed a new value
    pub changed: bool,
    /// Whether the pass cap cut the call short
    pub capped: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(NodeId(4).to_string(), "N4");
        assert_eq!(Connection::new(NodeId(2), 1).to_string(), "N2[1]");
    }
}
