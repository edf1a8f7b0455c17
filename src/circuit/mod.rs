//! Circuit graph and propagation kernel.
//!
//! The [`Circuit`] owns every node in an arena, the edges between them, and
//! a duplicate-free worklist. Structural edits enqueue the affected nodes;
//! [`Circuit::next`] sweeps the worklist until the network settles.

mod graph;
mod types;

pub use graph::{Circuit, CircuitConfig};
pub use types::*;
