//! Evaluable circuit node.

use std::fmt;

use crate::circuit::{Connection, NodeId};

use super::{LogicValue, NodeKind};

/// Change-event subscriber attached to a single node.
///
/// Subscribers receive the committed value only; they have no access to the
/// circuit and therefore cannot mutate the graph mid-propagation.
pub type Subscriber = Box<dyn FnMut(NodeId, LogicValue)>;

/// A node in the propagation graph.
pub struct Node {
    pub id: NodeId,
    pub name: String,
    kind: NodeKind,
    /// Values last delivered to each input slot
    inputs: Vec<LogicValue>,
    /// Outgoing edges
    outputs: Vec<Connection>,
    /// Visible value, only changed by [`commit`](Self::commit)
    value: LogicValue,
    /// Value computed from the inputs, not yet propagated
    pending: LogicValue,
    changed: bool,
    /// Request another stabilization pass whenever this node is processed
    pub force_continue: bool,
    subscribers: Vec<Subscriber>,
}

impl Node {
    /// Create a node with the kind's natural arity.
    pub fn new(id: NodeId, name: impl Into<String>, kind: NodeKind) -> Self {
        let arity = kind.default_arity();
        Self::with_arity(id, name, kind, arity)
    }

    /// Create a node with an explicit number of input slots.
    ///
    /// Input nodes always get zero slots regardless of `arity`.
    pub fn with_arity(id: NodeId, name: impl Into<String>, kind: NodeKind, arity: usize) -> Self {
        let arity = if kind.is_input() { 0 } else { arity };
        let inputs = vec![LogicValue::Unknown; arity];
        let pending = kind.evaluate(&inputs);
        Self {
            id,
            name: name.into(),
            kind,
            inputs,
            outputs: Vec::new(),
            value: LogicValue::Unknown,
            pending,
            changed: false,
            force_continue: false,
            subscribers: Vec::new(),
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn is_input(&self) -> bool {
        self.kind.is_input()
    }

    /// Current committed value.
    pub fn value(&self) -> LogicValue {
        self.value
    }

    /// Value that the next propagation would commit.
    pub fn pending(&self) -> LogicValue {
        self.pending
    }

    /// Whether the last [`commit`](Self::commit) changed the value.
    pub fn changed(&self) -> bool {
        self.changed
    }

    pub fn arity(&self) -> usize {
        self.inputs.len()
    }

    pub fn inputs(&self) -> &[LogicValue] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[Connection] {
        &self.outputs
    }

    /// Deliver a value to an input slot and recompute the pending value.
    ///
    /// Out-of-range slots trip a debug assertion and are ignored in release.
    pub fn update(&mut self, value: LogicValue, slot: usize) {
        debug_assert!(
            slot < self.inputs.len(),
            "slot {} out of range for {} (arity {})",
            slot,
            self.id,
            self.inputs.len()
        );
        let Some(input) = self.inputs.get_mut(slot) else {
            return;
        };
        *input = value;

        self.pending = match self.kind {
            // Sinks take the delivered value as-is
            NodeKind::Output => value,
            kind => kind.evaluate(&self.inputs),
        };
    }

    /// Commit the pending value if it differs from the current one.
    ///
    /// Returns the new value on change. Fan-out and notification are the
    /// circuit's job, see [`Circuit::propagate`](crate::circuit::Circuit::propagate).
    pub fn commit(&mut self) -> Option<LogicValue> {
        self.changed = self.pending != self.value;
        if !self.changed {
            return None;
        }
        self.value = self.pending;
        Some(self.value)
    }

    /// Fire the change event to every subscriber.
    pub fn notify(&mut self) {
        let (id, value) = (self.id, self.value);
        for subscriber in &mut self.subscribers {
            subscriber(id, value);
        }
    }

    pub fn subscribe(&mut self, subscriber: Subscriber) {
        self.subscribers.push(subscriber);
    }

    /// Pin an input node to a new constant. No-op on other kinds.
    pub fn set_constant(&mut self, value: LogicValue) -> bool {
        match &mut self.kind {
            NodeKind::Input { constant } => {
                *constant = value;
                self.pending = value;
                true
            }
            _ => false,
        }
    }

    /// Return to the undriven state. Input nodes keep their constant.
    ///
    /// Returns true when the visible value changed.
    pub fn reset(&mut self) -> bool {
        if self.is_input() {
            return false;
        }
        let was = self.value;
        self.inputs.fill(LogicValue::Unknown);
        self.value = LogicValue::Unknown;
        self.pending = LogicValue::Unknown;
        self.changed = false;
        was != LogicValue::Unknown
    }

    /// Force the visible value to UNKNOWN so the next propagation
    /// retransmits the pending value downstream.
    pub fn invalidate(&mut self) {
        self.value = LogicValue::Unknown;
    }

    pub fn connect(&mut self, connection: Connection) {
        self.outputs.push(connection);
    }

    /// Remove every edge to `target`, returning the removed edges.
    pub fn disconnect(&mut self, target: NodeId) -> Vec<Connection> {
        let (removed, kept): (Vec<Connection>, Vec<Connection>) =
            self.outputs.drain(..).partition(|c| c.target == target);
        self.outputs = kept;
        removed
    }

    /// Rewrite edges to `target` after one of its slots was removed.
    pub fn shift_slots(&mut self, target: NodeId, removed_slot: usize) {
        self.outputs
            .retain(|c| !(c.target == target && c.slot == removed_slot));
        for c in &mut self.outputs {
            if c.target == target && c.slot > removed_slot {
                c.slot -= 1;
            }
        }
    }

    /// Append an UNKNOWN input slot, returning its index.
    pub fn add_input_slot(&mut self) -> usize {
        self.inputs.push(LogicValue::Unknown);
        self.recompute();
        self.inputs.len() - 1
    }

    /// Remove an input slot; later slots move down by one.
    pub fn remove_input_slot(&mut self, slot: usize) {
        if slot < self.inputs.len() {
            self.inputs.remove(slot);
            self.recompute();
        }
    }

    fn recompute(&mut self) {
        self.pending = match self.kind {
            NodeKind::Output => self.inputs.first().copied().unwrap_or(LogicValue::Unknown),
            kind => kind.evaluate(&self.inputs),
        };
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .field("value", &self.value)
            .field("pending", &self.pending)
            .field("force_continue", &self.force_continue)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_update_recomputes_pending() {
        let mut node = Node::with_arity(NodeId(0), "or", NodeKind::Or, 2);
        assert_eq!(node.pending(), LogicValue::Unknown);

        node.update(LogicValue::False, 0);
        node.update(LogicValue::False, 1);
        assert_eq!(node.pending(), LogicValue::False);
        assert_eq!(node.value(), LogicValue::Unknown);

        node.update(LogicValue::True, 1);
        assert_eq!(node.pending(), LogicValue::True);
    }

    #[test]
    fn test_commit_only_on_change() {
        let mut node = Node::new(NodeId(0), "buf", NodeKind::Buffer);
        assert_eq!(node.commit(), None);
        assert!(!node.changed());

        node.update(LogicValue::True, 0);
        assert_eq!(node.commit(), Some(LogicValue::True));
        assert!(node.changed());
        assert_eq!(node.commit(), None);
    }

    #[test]
    fn test_input_is_pinned_and_survives_reset() {
        let mut node = Node::new(NodeId(0), "in", NodeKind::input(LogicValue::True));
        assert_eq!(node.arity(), 0);
        assert_eq!(node.pending(), LogicValue::True);
        node.commit();

        node.reset();
        assert_eq!(node.value(), LogicValue::True);
        assert_eq!(node.pending(), LogicValue::True);

        assert!(node.set_constant(LogicValue::False));
        assert_eq!(node.pending(), LogicValue::False);
    }

    #[test]
    fn test_output_takes_value_directly() {
        let mut node = Node::new(NodeId(0), "out", NodeKind::Output);
        node.update(LogicValue::False, 0);
        assert_eq!(node.pending(), LogicValue::False);
        assert!(!node.set_constant(LogicValue::True));
    }

    #[test]
    fn test_reset_clears_gate() {
        let mut node = Node::new(NodeId(0), "not", NodeKind::Not);
        node.update(LogicValue::False, 0);
        node.commit();
        assert_eq!(node.value(), LogicValue::True);

        node.reset();
        assert_eq!(node.value(), LogicValue::Unknown);
        assert_eq!(node.inputs(), &[LogicValue::Unknown]);
    }

    #[cfg(not(debug_assertions))]
    #[test]
    fn test_out_of_range_slot_ignored() {
        let mut node = Node::new(NodeId(0), "not", NodeKind::Not);
        node.update(LogicValue::False, 3);
        assert_eq!(node.pending(), LogicValue::Unknown);
    }

    #[test]
    fn test_subscribers_receive_value() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let mut node = Node::new(NodeId(7), "buf", NodeKind::Buffer);
        node.subscribe(Box::new(move |id, v| sink.borrow_mut().push((id, v))));

        node.update(LogicValue::True, 0);
        node.commit();
        node.notify();
        assert_eq!(*seen.borrow(), vec![(NodeId(7), LogicValue::True)]);
    }

    #[test]
    fn test_slot_edits() {
        let mut node = Node::with_arity(NodeId(0), "nor", NodeKind::Nor, 1);
        node.update(LogicValue::False, 0);
        assert_eq!(node.pending(), LogicValue::True);

        assert_eq!(node.add_input_slot(), 1);
        assert_eq!(node.pending(), LogicValue::Unknown);

        node.remove_input_slot(1);
        assert_eq!(node.pending(), LogicValue::True);
    }

    #[test]
    fn test_disconnect_and_shift() {
        let mut node = Node::new(NodeId(0), "buf", NodeKind::Buffer);
        node.connect(Connection::new(NodeId(1), 0));
        node.connect(Connection::new(NodeId(1), 2));
        node.connect(Connection::new(NodeId(2), 0));

        node.shift_slots(NodeId(1), 0);
        assert_eq!(
            node.outputs(),
            &[Connection::new(NodeId(1), 1), Connection::new(NodeId(2), 0)]
        );

        let removed = node.disconnect(NodeId(1));
        assert_eq!(removed.len(), 1);
        assert_eq!(node.outputs(), &[Connection::new(NodeId(2), 0)]);
    }
}
