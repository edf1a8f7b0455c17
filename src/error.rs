//! Error types for the Logicwave simulator.
//!
//! This module provides a unified error type [`LogicError`] that covers
//! all error conditions that can occur while loading a netlist, mutating
//! the circuit graph, and running the oscillator.

use thiserror::Error;

use crate::circuit::NodeId;

/// Result type alias using [`LogicError`].
pub type Result<T> = std::result::Result<T, LogicError>;

/// Unified error type for all Logicwave operations.
#[derive(Error, Debug)]
pub enum LogicError {
    // ============ Structural Reference Errors ============
    /// Port not found in the simulation
    #[error("Port '{port}' not found")]
    PortNotFound { port: String },

    /// Element not found in the simulation
    #[error("Element '{element}' not found")]
    ElementNotFound { element: String },

    /// Node not found in the circuit
    #[error("Node {node} not found in circuit")]
    NodeNotFound { node: NodeId },

    /// Element id registered twice
    #[error("Duplicate element id '{element}'")]
    DuplicateElement { element: String },

    /// Port id registered twice
    #[error("Duplicate port id '{port}'")]
    DuplicatePort { port: String },

    // ============ Netlist Errors ============
    /// Element definition that cannot be turned into nodes
    #[error("Invalid element '{element}': {message}")]
    InvalidElement { element: String, message: String },

    /// Connection between incompatible ports
    #[error("Invalid connection '{source_port}' -> '{target_port}': {message}")]
    InvalidConnection {
        source_port: String,
        target_port: String,
        message: String,
    },

    /// Malformed JSON netlist
    #[error("Failed to parse netlist: {source}")]
    NetlistParse {
        #[source]
        source: serde_json::Error,
    },

    // ============ Configuration Errors ============
    /// Configuration value outside its valid range
    #[error("Invalid {field}: {message}")]
    InvalidConfig { field: &'static str, message: String },

    // ============ Kernel Errors ============
    /// Update targeted an input slot outside the node's arity
    #[error("Input slot {slot} out of range for node {node} (arity {arity})")]
    InvalidPortIndex {
        node: NodeId,
        slot: usize,
        arity: usize,
    },

    /// Stabilization did not reach an empty worklist within the pass cap
    #[error("Propagation did not settle after {passes} passes ({pending} nodes still queued)")]
    NonTerminatingPropagation { passes: usize, pending: usize },

    // ============ I/O Errors ============
    /// Error reading a netlist file
    #[error("Failed to read netlist file '{path}': {source}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Malformed `port=level` command-line assignment
    #[error("Invalid port assignment '{text}': {message}")]
    InvalidAssignment { text: String, message: String },

    /// Error writing a waveform snapshot
    #[error("Snapshot output error: {message}")]
    OutputError { message: String },

    // ============ WASM Errors ============
    /// WASM-specific error
    #[cfg(feature = "wasm")]
    #[error("WASM error: {message}")]
    WasmError { message: String },
}

impl LogicError {
    /// Create a port-not-found error
    pub fn port_not_found(port: impl Into<String>) -> Self {
        Self::PortNotFound { port: port.into() }
    }

    /// Create an element-not-found error
    pub fn element_not_found(element: impl Into<String>) -> Self {
        Self::ElementNotFound {
            element: element.into(),
        }
    }

    /// Create an invalid element error
    pub fn invalid_element(element: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidElement {
            element: element.into(),
            message: message.into(),
        }
    }

    /// Create an invalid connection error
    pub fn invalid_connection(
        source_port: impl Into<String>,
        target_port: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidConnection {
            source_port: source_port.into(),
            target_port: target_port.into(),
            message: message.into(),
        }
    }

    /// Whether this error is a dangling structural reference.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::PortNotFound { .. } | Self::ElementNotFound { .. } | Self::NodeNotFound { .. }
        )
    }
}
