//! Discrete-event propagation kernel.

use std::collections::{HashSet, VecDeque};

use tracing::{debug, trace, warn};

use super::types::{Connection, NodeId, PassReport, ValueChange};
use crate::components::{LogicValue, Node, NodeKind, Subscriber};
use crate::error::{LogicError, Result};

/// Configuration for the propagation kernel.
#[derive(Debug, Clone)]
pub struct CircuitConfig {
    /// Upper bound on worklist sweeps for one `next()` or `stabilize()` call.
    pub max_passes: usize,
}

impl Default for CircuitConfig {
    fn default() -> Self {
        Self {
            max_passes: crate::DEFAULT_MAX_PASSES,
        }
    }
}

impl CircuitConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the pass cap.
    ///
    /// Genuinely oscillating feedback (a ring of three Not gates) never
    /// empties the worklist; the cap keeps such networks from stalling the
    /// host frame. The remaining queue is left for the next frame.
    pub fn with_max_passes(mut self, max_passes: usize) -> Self {
        self.max_passes = max_passes.max(1);
        self
    }
}

/// A network of nodes plus the worklist that drives it to stability.
#[derive(Debug, Default)]
pub struct Circuit {
    /// Node arena; removed nodes leave a `None` hole so ids stay stable
    nodes: Vec<Option<Node>>,
    /// Input-kind nodes, in insertion order
    inputs: Vec<NodeId>,
    /// Worklist in insertion order
    queue: VecDeque<NodeId>,
    /// Membership index for `queue`
    queued: HashSet<NodeId>,
    /// Committed changes not yet drained by the owner
    changes: Vec<ValueChange>,
    config: CircuitConfig,
}

impl Circuit {
    /// Create an empty circuit with default configuration.
    pub fn new() -> Self {
        Self::with_config(CircuitConfig::default())
    }

    pub fn with_config(config: CircuitConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &CircuitConfig {
        &self.config
    }

    // ============ Node Access ============

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0).and_then(Option::as_mut)
    }

    fn require(&mut self, id: NodeId) -> Result<&mut Node> {
        self.node_mut(id).ok_or(LogicError::NodeNotFound { node: id })
    }

    /// Current committed value of a node.
    pub fn value(&self, id: NodeId) -> Option<LogicValue> {
        self.node(id).map(Node::value)
    }

    /// Iterate over live nodes.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().flatten()
    }

    pub fn inputs(&self) -> &[NodeId] {
        &self.inputs
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.nodes().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ============ Structural Mutation ============

    /// Add a node with its kind's natural arity.
    pub fn add_node(&mut self, name: impl Into<String>, kind: NodeKind) -> NodeId {
        self.add_node_with_arity(name, kind, kind.default_arity())
    }

    /// Add a node with an explicit input arity.
    ///
    /// Input nodes are registered as inputs and enqueued so their constant
    /// reaches downstream nodes on the next pass.
    pub fn add_node_with_arity(
        &mut self,
        name: impl Into<String>,
        kind: NodeKind,
        arity: usize,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        let node = Node::with_arity(id, name, kind, arity);
        debug!(node = %id, name = %node.name, ?kind, "add node");
        self.nodes.push(Some(node));

        if kind.is_input() {
            self.inputs.push(id);
            self.enqueue(id);
        }
        id
    }

    /// Mark a node as requiring another pass whenever it is processed.
    pub fn set_force_continue(&mut self, id: NodeId, force: bool) -> Result<()> {
        self.require(id)?.force_continue = force;
        Ok(())
    }

    /// Remove a node and every edge touching it, then run one pass.
    ///
    /// Removing an input resets the whole circuit: other nodes may have
    /// settled on values only that input justified.
    pub fn remove_node(&mut self, id: NodeId) -> Result<()> {
        let node = self.require(id)?;
        let is_input = node.is_input();
        let outputs: Vec<Connection> = node.outputs().to_vec();

        for connection in outputs {
            self.detach(id, connection.target);
        }
        for other in self.nodes.iter_mut().flatten() {
            other.disconnect(id);
        }

        self.dequeue(id);
        self.nodes[id.0] = None;
        debug!(node = %id, is_input, "remove node");

        if is_input {
            self.inputs.retain(|&n| n != id);
            self.reset();
            let inputs = self.inputs.clone();
            for input in inputs {
                if let Some(node) = self.node_mut(input) {
                    node.invalidate();
                }
                self.enqueue(input);
            }
        }

        self.next();
        Ok(())
    }

    /// Wire `source` to input `slot` of `target`, then run one pass.
    ///
    /// The source is invalidated so it retransmits its value over the new
    /// edge.
    pub fn add_connection(&mut self, source: NodeId, target: NodeId, slot: usize) -> Result<()> {
        let arity = self.require(target)?.arity();
        if slot >= arity {
            return Err(LogicError::InvalidPortIndex {
                node: target,
                slot,
                arity,
            });
        }

        let node = self.require(source)?;
        node.connect(Connection::new(target, slot));
        node.invalidate();
        trace!(%source, %target, slot, "add connection");

        self.enqueue(source);
        self.next();
        Ok(())
    }

    /// Drop every edge from `source` to `target`, then run one pass.
    pub fn remove_connection(&mut self, source: NodeId, target: NodeId) -> Result<()> {
        self.require(source)?;
        self.require(target)?;

        self.detach(source, target);
        self.enqueue(source);
        self.next();
        Ok(())
    }

    /// Remove edges and reset the slots they fed, without stabilizing.
    fn detach(&mut self, source: NodeId, target: NodeId) {
        let removed = match self.node_mut(source) {
            Some(node) => node.disconnect(target),
            None => return,
        };
        if removed.is_empty() {
            return;
        }
        if let Some(node) = self.node_mut(target) {
            for connection in &removed {
                node.update(LogicValue::Unknown, connection.slot);
            }
        }
        trace!(%source, %target, edges = removed.len(), "detach");
        self.enqueue(target);
    }

    /// Append an input slot to a node, returning the slot index.
    pub fn add_input_slot(&mut self, id: NodeId) -> Result<usize> {
        let slot = self.require(id)?.add_input_slot();
        self.enqueue(id);
        Ok(slot)
    }

    /// Remove one input slot, dropping edges into it and renumbering edges
    /// into later slots.
    pub fn remove_input_slot(&mut self, id: NodeId, slot: usize) -> Result<()> {
        let arity = self.require(id)?.arity();
        if slot >= arity {
            return Err(LogicError::InvalidPortIndex {
                node: id,
                slot,
                arity,
            });
        }

        for node in self.nodes.iter_mut().flatten() {
            node.shift_slots(id, slot);
        }
        self.require(id)?.remove_input_slot(slot);
        self.enqueue(id);
        Ok(())
    }

    /// Drive an input node to a new constant and enqueue it.
    pub fn set_input_value(&mut self, id: NodeId, value: LogicValue) -> Result<()> {
        let node = self.require(id)?;
        if !node.set_constant(value) {
            return Err(LogicError::invalid_element(
                node.name.clone(),
                "only input nodes can be driven",
            ));
        }
        self.enqueue(id);
        Ok(())
    }

    /// Attach a change subscriber to a node.
    pub fn subscribe(&mut self, id: NodeId, subscriber: Subscriber) -> Result<()> {
        self.require(id)?.subscribe(subscriber);
        Ok(())
    }

    /// Reset every node. Inputs keep their constant.
    ///
    /// Nodes that drop to UNKNOWN notify their subscribers and land in the
    /// change log like any committed value.
    pub fn reset(&mut self) {
        for node in self.nodes.iter_mut().flatten() {
            if node.reset() {
                node.notify();
                self.changes.push(ValueChange {
                    node: node.id,
                    value: LogicValue::Unknown,
                });
            }
        }
    }

    // ============ Worklist ============

    /// Add a node to the worklist unless it is already queued.
    pub fn enqueue(&mut self, id: NodeId) {
        if self.queued.insert(id) {
            self.queue.push_back(id);
        }
    }

    /// Remove a node from the worklist if present.
    pub fn dequeue(&mut self, id: NodeId) {
        if !self.queued.remove(&id) {
            return;
        }
        // Nodes are drained in order, so the front is the common case
        if self.queue.front() == Some(&id) {
            self.queue.pop_front();
        } else {
            self.queue.retain(|&n| n != id);
        }
    }

    pub fn is_queued(&self, id: NodeId) -> bool {
        self.queued.contains(&id)
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// True when no node awaits propagation.
    pub fn is_complete(&self) -> bool {
        self.queue.is_empty()
    }

    // ============ Propagation ============

    /// Commit a node's pending value and fan it out.
    ///
    /// Returns the downstream nodes that received the new value, or an empty
    /// list when the value did not change.
    pub fn propagate(&mut self, id: NodeId) -> Vec<NodeId> {
        let (value, outputs) = match self.node_mut(id) {
            Some(node) => match node.commit() {
                Some(value) => (value, node.outputs().to_vec()),
                None => return Vec::new(),
            },
            None => return Vec::new(),
        };

        let mut touched = Vec::with_capacity(outputs.len());
        for connection in outputs {
            if let Some(target) = self.node_mut(connection.target) {
                target.update(value, connection.slot);
                if !touched.contains(&connection.target) {
                    touched.push(connection.target);
                }
            }
        }

        if let Some(node) = self.node_mut(id) {
            node.notify();
        }
        self.changes.push(ValueChange { node: id, value });
        touched
    }

    /// Run stabilization passes over a snapshot of the worklist.
    ///
    /// Another pass follows while the queue is non-empty and either nothing
    /// changed or a processed node carries `force_continue`. Otherwise the
    /// call returns with the rest of the queue left for the next call.
    pub fn next(&mut self) -> PassReport {
        let mut report = PassReport::default();

        loop {
            let snapshot: Vec<NodeId> = self.queue.iter().copied().collect();
            let mut changed = false;
            let mut forced = false;

            for id in snapshot {
                if let Some(node) = self.node(id) {
                    forced |= node.force_continue;
                    let touched = self.propagate(id);
                    changed |= self.node(id).is_some_and(Node::changed);
                    for target in touched {
                        self.enqueue(target);
                    }
                }
                self.dequeue(id);
            }

            report.passes += 1;
            report.changed |= changed;
            trace!(
                pass = report.passes,
                changed,
                forced,
                queued = self.queue.len(),
                "propagation pass"
            );

            if self.queue.is_empty() || (changed && !forced) {
                break;
            }
            if report.passes >= self.config.max_passes {
                warn!(
                    passes = report.passes,
                    queued = self.queue.len(),
                    "propagation pass cap reached"
                );
                report.capped = true;
                break;
            }
        }

        report
    }

    /// Call [`next`](Self::next) until the worklist is empty.
    ///
    /// Returns the total number of passes, or
    /// [`LogicError::NonTerminatingPropagation`] once the pass cap is
    /// exceeded. The queue is kept so later frames can resume.
    pub fn stabilize(&mut self) -> Result<usize> {
        let mut passes = 0;
        while !self.is_complete() {
            passes += self.next().passes;
            if passes >= self.config.max_passes && !self.is_complete() {
                return Err(LogicError::NonTerminatingPropagation {
                    passes,
                    pending: self.queue.len(),
                });
            }
        }
        Ok(passes)
    }

    /// Drain committed value changes recorded since the last call.
    pub fn take_changes(&mut self) -> Vec<ValueChange> {
        std::mem::take(&mut self.changes)
    }
}
