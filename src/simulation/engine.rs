//! Element-level view of the propagation kernel.
//!
//! The [`Engine`] maps netlist elements and ports onto circuit nodes and
//! slots, keeps the port-level connection list, and turns committed node
//! changes into port-level [`LevelChange`]s.

use std::collections::{HashMap, VecDeque};
use std::fmt;

use tracing::{debug, trace, warn};

use crate::circuit::{Circuit, CircuitConfig, NodeId};
use crate::components::{LogicValue, NodeKind};
use crate::error::{LogicError, Result};
use crate::netlist::{validate_netlist, ConnectionDef, ElementDef, ElementKind, Netlist, PortDef, PortDirection};
use crate::timing::{LevelChange, PulseLevel, PulseSink};

/// Callback fired for every port whose value changes.
pub type OutputCallback = Box<dyn FnMut(&str, LogicValue)>;

/// Nodes built for one element.
#[derive(Debug)]
struct ElementEntry {
    kind: ElementKind,
    /// Node carrying the element's value; `None` for integrated circuits
    node: Option<NodeId>,
    /// Every node owned by the element
    nodes: Vec<NodeId>,
    /// Bound ports, in binding order
    ports: Vec<String>,
    /// Interior boundary nodes not yet bound to a port
    free_inputs: VecDeque<NodeId>,
    free_outputs: VecDeque<NodeId>,
}

impl ElementEntry {
    fn single(kind: ElementKind, node: NodeId) -> Self {
        Self {
            kind,
            node: Some(node),
            nodes: vec![node],
            ports: Vec::new(),
            free_inputs: VecDeque::new(),
            free_outputs: VecDeque::new(),
        }
    }
}

/// Where a port lands in the circuit.
#[derive(Debug, Clone)]
struct PortBinding {
    element: String,
    direction: PortDirection,
    node: NodeId,
    /// Input slot on `node`, for input ports
    slot: Option<usize>,
}

/// Flattened interior of an integrated circuit.
#[derive(Debug, Default)]
struct Interior {
    nodes: Vec<NodeId>,
    inputs: VecDeque<NodeId>,
    outputs: VecDeque<NodeId>,
}

/// Circuit plus the element and port bookkeeping around it.
pub struct Engine {
    circuit: Circuit,
    elements: HashMap<String, ElementEntry>,
    ports: HashMap<String, PortBinding>,
    /// Ports that report a node's value
    node_ports: HashMap<NodeId, Vec<String>>,
    /// Last level dispatched per node
    reported: HashMap<NodeId, LogicValue>,
    /// Port-level connections, in insertion order
    connections: Vec<ConnectionDef>,
    output_callbacks: Vec<OutputCallback>,
}

impl Engine {
    pub fn new(config: CircuitConfig) -> Self {
        Self {
            circuit: Circuit::with_config(config),
            elements: HashMap::new(),
            ports: HashMap::new(),
            node_ports: HashMap::new(),
            reported: HashMap::new(),
            connections: Vec::new(),
            output_callbacks: Vec::new(),
        }
    }

    pub fn circuit(&self) -> &Circuit {
        &self.circuit
    }

    pub fn has_element(&self, id: &str) -> bool {
        self.elements.contains_key(id)
    }

    pub fn has_port(&self, id: &str) -> bool {
        self.ports.contains_key(id)
    }

    /// Ports bound to an element.
    pub fn element_ports(&self, id: &str) -> Result<&[String]> {
        self.elements
            .get(id)
            .map(|e| e.ports.as_slice())
            .ok_or_else(|| LogicError::element_not_found(id))
    }

    /// Node carrying an element's value.
    pub fn element_node(&self, id: &str) -> Option<NodeId> {
        self.elements.get(id).and_then(|e| e.node)
    }

    /// Node a port reads from or writes to.
    pub fn port_node(&self, id: &str) -> Option<NodeId> {
        self.ports.get(id).map(|p| p.node)
    }

    pub fn connections(&self) -> &[ConnectionDef] {
        &self.connections
    }

    pub fn on_output_change(&mut self, callback: OutputCallback) {
        self.output_callbacks.push(callback);
    }

    // ============ Elements ============

    /// Build the nodes for an element. Ports are bound separately.
    pub fn add_element(&mut self, def: &ElementDef) -> Result<()> {
        if self.elements.contains_key(&def.id) {
            return Err(LogicError::DuplicateElement {
                element: def.id.clone(),
            });
        }

        let entry = match def.kind {
            ElementKind::Input => {
                let constant = def.value.unwrap_or(LogicValue::False);
                let node = self.circuit.add_node(def.id.as_str(), NodeKind::input(constant));
                ElementEntry::single(def.kind, node)
            }
            ElementKind::Clock => {
                let clock = def.clock.as_ref().ok_or_else(|| {
                    LogicError::invalid_element(&def.id, "clock elements need a clock configuration")
                })?;
                let constant = LogicValue::from(clock.initial_level);
                let node = self.circuit.add_node(def.id.as_str(), NodeKind::input(constant));
                ElementEntry::single(def.kind, node)
            }
            ElementKind::Output => {
                let node = self
                    .circuit
                    .add_node_with_arity(def.id.as_str(), NodeKind::Output, 0);
                ElementEntry::single(def.kind, node)
            }
            ElementKind::Gate => {
                let gate = def.gate_kind().ok_or_else(|| {
                    LogicError::invalid_element(&def.id, "gate elements need a known subkind")
                })?;
                let node = self
                    .circuit
                    .add_node_with_arity(def.id.as_str(), gate.node_kind(), 0);
                ElementEntry::single(def.kind, node)
            }
            ElementKind::IntegratedCircuit => {
                let interior = def.circuit.as_deref().ok_or_else(|| {
                    LogicError::invalid_element(&def.id, "integrated circuits need an interior netlist")
                })?;
                validate_netlist(interior)?;
                let built = self.flatten(&def.id, interior)?;
                ElementEntry {
                    kind: def.kind,
                    node: None,
                    nodes: built.nodes,
                    ports: Vec::new(),
                    free_inputs: built.inputs,
                    free_outputs: built.outputs,
                }
            }
        };

        debug!(element = %def.id, kind = ?def.kind, nodes = entry.nodes.len(), "add element");
        self.elements.insert(def.id.clone(), entry);
        Ok(())
    }

    /// Build the interior of an integrated circuit under `prefix`.
    ///
    /// Interior inputs and outputs become Buffer boundary nodes, returned in
    /// interior element order. Every interior node re-runs stabilization
    /// passes whenever it is processed.
    fn flatten(&mut self, prefix: &str, netlist: &Netlist) -> Result<Interior> {
        let mut interior = Interior::default();
        let mut local: HashMap<&str, (NodeId, Option<usize>)> = HashMap::new();

        for element in &netlist.elements {
            let name = format!("{}/{}", prefix, element.id);
            let mut nested = match element.kind {
                ElementKind::Input => {
                    let node = self.circuit.add_node_with_arity(name.as_str(), NodeKind::Buffer, 1);
                    interior.inputs.push_back(node);
                    Interior {
                        nodes: vec![node],
                        ..Interior::default()
                    }
                }
                ElementKind::Output => {
                    let node = self.circuit.add_node_with_arity(name.as_str(), NodeKind::Buffer, 0);
                    interior.outputs.push_back(node);
                    Interior {
                        nodes: vec![node],
                        ..Interior::default()
                    }
                }
                ElementKind::Gate => {
                    let gate = element.gate_kind().ok_or_else(|| {
                        LogicError::invalid_element(&name, "gate elements need a known subkind")
                    })?;
                    let node = self.circuit.add_node_with_arity(name.as_str(), gate.node_kind(), 0);
                    Interior {
                        nodes: vec![node],
                        ..Interior::default()
                    }
                }
                ElementKind::IntegratedCircuit => match element.circuit.as_deref() {
                    Some(circuit) => self.flatten(&name, circuit)?,
                    None => {
                        return Err(LogicError::invalid_element(
                            name,
                            "integrated circuits need an interior netlist",
                        ))
                    }
                },
                ElementKind::Clock => {
                    return Err(LogicError::invalid_element(
                        name,
                        "clocks cannot be nested inside integrated circuits",
                    ))
                }
            };

            for port in netlist.ports_of(element) {
                let binding = match (element.kind, port.direction) {
                    (ElementKind::IntegratedCircuit, PortDirection::Input) => {
                        nested.inputs.pop_front().map(|node| (node, Some(0)))
                    }
                    (ElementKind::IntegratedCircuit, PortDirection::Output) => {
                        nested.outputs.pop_front().map(|node| (node, None))
                    }
                    (_, PortDirection::Input) => {
                        let node = nested.nodes[0];
                        Some((node, Some(self.circuit.add_input_slot(node)?)))
                    }
                    (_, PortDirection::Output) => Some((nested.nodes[0], None)),
                };
                let binding = binding.ok_or_else(|| {
                    LogicError::invalid_element(&name, format!("no interior node for port '{}'", port.id))
                })?;
                local.insert(port.id.as_str(), binding);
            }
            interior.nodes.append(&mut nested.nodes);
        }

        for &node in &interior.nodes {
            self.circuit.set_force_continue(node, true)?;
        }

        for connection in &netlist.connections {
            let source = local
                .get(connection.source_port_id.as_str())
                .ok_or_else(|| LogicError::port_not_found(&connection.source_port_id))?;
            let target = local
                .get(connection.target_port_id.as_str())
                .ok_or_else(|| LogicError::port_not_found(&connection.target_port_id))?;
            match target.1 {
                Some(slot) => self.circuit.add_connection(source.0, target.0, slot)?,
                None => {
                    return Err(LogicError::invalid_connection(
                        &connection.source_port_id,
                        &connection.target_port_id,
                        "target must be an input port",
                    ))
                }
            }
        }

        trace!(prefix, nodes = interior.nodes.len(), "flattened integrated circuit");
        Ok(interior)
    }

    /// Remove an element with its ports, connections and nodes.
    pub fn remove_element(&mut self, id: &str) -> Result<()> {
        let ports = self.element_ports(id)?.to_vec();
        for port in ports {
            self.remove_port(&port)?;
        }

        let entry = self
            .elements
            .remove(id)
            .ok_or_else(|| LogicError::element_not_found(id))?;
        for node in entry.nodes {
            self.node_ports.remove(&node);
            self.reported.remove(&node);
            self.circuit.remove_node(node)?;
        }
        debug!(element = %id, "remove element");
        Ok(())
    }

    // ============ Ports ============

    /// Bind a port to its element's node.
    ///
    /// Input ports on gates and outputs append an input slot; ports on
    /// integrated circuits take the next free boundary node.
    pub fn add_port(&mut self, def: &PortDef) -> Result<()> {
        if self.ports.contains_key(&def.id) {
            return Err(LogicError::DuplicatePort {
                port: def.id.clone(),
            });
        }
        let entry = self
            .elements
            .get_mut(&def.element_id)
            .ok_or_else(|| LogicError::element_not_found(&def.element_id))?;

        let (node, slot) = match (entry.kind, def.direction, entry.node) {
            (ElementKind::IntegratedCircuit, PortDirection::Input, _) => entry
                .free_inputs
                .pop_front()
                .map(|node| (node, Some(0))),
            (ElementKind::IntegratedCircuit, PortDirection::Output, _) => {
                entry.free_outputs.pop_front().map(|node| (node, None))
            }
            (ElementKind::Input | ElementKind::Clock, PortDirection::Input, _) => {
                return Err(LogicError::invalid_element(
                    &def.element_id,
                    "sources cannot have input ports",
                ))
            }
            (ElementKind::Output, PortDirection::Output, _) => {
                return Err(LogicError::invalid_element(
                    &def.element_id,
                    "output elements have no output ports",
                ))
            }
            (_, PortDirection::Input, Some(node)) => {
                Some((node, Some(self.circuit.add_input_slot(node)?)))
            }
            (_, PortDirection::Output, Some(node)) => Some((node, None)),
            (_, _, None) => None,
        }
        .ok_or_else(|| {
            LogicError::invalid_element(
                &def.element_id,
                format!("no node left to bind port '{}'", def.id),
            )
        })?;

        entry.ports.push(def.id.clone());

        let reports = def.direction == PortDirection::Output || entry.kind == ElementKind::Output;
        if reports {
            self.node_ports.entry(node).or_default().push(def.id.clone());
        }

        trace!(port = %def.id, element = %def.element_id, %node, ?slot, "add port");
        self.ports.insert(
            def.id.clone(),
            PortBinding {
                element: def.element_id.clone(),
                direction: def.direction,
                node,
                slot,
            },
        );
        Ok(())
    }

    /// Unbind a port, dropping its connections and the slot it occupied.
    pub fn remove_port(&mut self, id: &str) -> Result<()> {
        let binding = self
            .ports
            .get(id)
            .cloned()
            .ok_or_else(|| LogicError::port_not_found(id))?;

        let attached: Vec<ConnectionDef> = self
            .connections
            .iter()
            .filter(|c| c.source_port_id == id || c.target_port_id == id)
            .cloned()
            .collect();
        for connection in &attached {
            self.remove_connection(connection)?;
        }
        self.ports.remove(id);

        let kind = self.elements.get(&binding.element).map(|e| e.kind);
        match (kind, binding.direction, binding.slot) {
            (Some(ElementKind::IntegratedCircuit), PortDirection::Input, _) => {
                if let Some(entry) = self.elements.get_mut(&binding.element) {
                    entry.free_inputs.push_front(binding.node);
                }
            }
            (Some(ElementKind::IntegratedCircuit), PortDirection::Output, _) => {
                if let Some(entry) = self.elements.get_mut(&binding.element) {
                    entry.free_outputs.push_front(binding.node);
                }
            }
            (_, PortDirection::Input, Some(slot)) => {
                self.circuit.remove_input_slot(binding.node, slot)?;
                for other in self.ports.values_mut() {
                    if other.node == binding.node {
                        if let Some(s) = other.slot.as_mut().filter(|s| **s > slot) {
                            *s -= 1;
                        }
                    }
                }
            }
            _ => {}
        }

        if let Some(reporting) = self.node_ports.get_mut(&binding.node) {
            reporting.retain(|p| p != id);
        }
        if let Some(entry) = self.elements.get_mut(&binding.element) {
            entry.ports.retain(|p| p != id);
        }
        trace!(port = %id, "remove port");
        Ok(())
    }

    // ============ Connections ============

    /// Wire an output port to an input port. Adding an existing connection
    /// is a no-op.
    pub fn add_connection(&mut self, def: &ConnectionDef) -> Result<()> {
        if self.connections.contains(def) {
            return Ok(());
        }
        let (source, target, slot) = self.resolve(def)?;
        self.circuit.add_connection(source, target, slot)?;
        self.connections.push(def.clone());
        trace!(source = %def.source_port_id, target = %def.target_port_id, "add connection");
        Ok(())
    }

    /// Remove a connection. Removing an absent connection between known
    /// ports is a no-op.
    pub fn remove_connection(&mut self, def: &ConnectionDef) -> Result<()> {
        let (source, target, _) = self.resolve(def)?;
        let index = match self.connections.iter().position(|c| c == def) {
            Some(index) => index,
            None => return Ok(()),
        };
        self.connections.remove(index);

        // The kernel drops every edge between the two nodes; restore the
        // ones other port pairs still need
        self.circuit.remove_connection(source, target)?;
        let siblings: Vec<ConnectionDef> = self.connections.clone();
        for sibling in &siblings {
            let (s, t, slot) = self.resolve(sibling)?;
            if s == source && t == target {
                self.circuit.add_connection(s, t, slot)?;
            }
        }
        trace!(source = %def.source_port_id, target = %def.target_port_id, "remove connection");
        Ok(())
    }

    /// Resolve a connection to (source node, target node, target slot).
    fn resolve(&self, def: &ConnectionDef) -> Result<(NodeId, NodeId, usize)> {
        let source = self
            .ports
            .get(&def.source_port_id)
            .ok_or_else(|| LogicError::port_not_found(&def.source_port_id))?;
        let target = self
            .ports
            .get(&def.target_port_id)
            .ok_or_else(|| LogicError::port_not_found(&def.target_port_id))?;

        if source.direction != PortDirection::Output {
            return Err(LogicError::invalid_connection(
                &def.source_port_id,
                &def.target_port_id,
                "source must be an output port",
            ));
        }
        match (target.direction, target.slot) {
            (PortDirection::Input, Some(slot)) => Ok((source.node, target.node, slot)),
            _ => Err(LogicError::invalid_connection(
                &def.source_port_id,
                &def.target_port_id,
                "target must be an input port",
            )),
        }
    }

    // ============ Values ============

    /// Drive the node behind a source port, stabilize, and report changes.
    pub fn set_port_value(&mut self, port: &str, value: LogicValue) -> Result<Vec<LevelChange>> {
        let node = self
            .ports
            .get(port)
            .map(|p| p.node)
            .ok_or_else(|| LogicError::port_not_found(port))?;
        self.circuit.set_input_value(node, value)?;
        debug!(port, %value, "set port value");
        self.settle();
        Ok(self.dispatch())
    }

    /// Current value seen at a port.
    ///
    /// Input ports report the value delivered to their slot, output ports
    /// the value of their node.
    pub fn port_value(&self, port: &str) -> Result<LogicValue> {
        let binding = self
            .ports
            .get(port)
            .ok_or_else(|| LogicError::port_not_found(port))?;
        let node = self
            .circuit
            .node(binding.node)
            .ok_or(LogicError::NodeNotFound { node: binding.node })?;
        Ok(match (binding.direction, binding.slot) {
            (PortDirection::Input, Some(slot)) => node
                .inputs()
                .get(slot)
                .copied()
                .unwrap_or(LogicValue::Unknown),
            _ => node.value(),
        })
    }

    // ============ Propagation ============

    pub fn is_settled(&self) -> bool {
        self.circuit.is_complete()
    }

    /// One kernel step, then report changes.
    pub fn step(&mut self) -> Vec<LevelChange> {
        self.circuit.next();
        self.dispatch()
    }

    /// Stabilize, propagating the kernel's pass-cap error.
    pub fn stabilize(&mut self) -> Result<usize> {
        self.circuit.stabilize()
    }

    /// Stabilize; a network that never settles is left queued for the
    /// following frames.
    pub fn settle(&mut self) {
        if let Err(err) = self.circuit.stabilize() {
            warn!(error = %err, "circuit did not settle");
        }
    }

    /// Turn committed node changes into port changes and fire the output
    /// callbacks.
    ///
    /// Each node reports its final level of the batch, and only when it
    /// differs from the level it last reported.
    pub fn dispatch(&mut self) -> Vec<LevelChange> {
        let mut latest: Vec<(NodeId, LogicValue)> = Vec::new();
        for change in self.circuit.take_changes() {
            match latest.iter_mut().find(|(node, _)| *node == change.node) {
                Some(entry) => entry.1 = change.value,
                None => latest.push((change.node, change.value)),
            }
        }

        let mut reported = Vec::new();
        for (node, value) in latest {
            let last = self.reported.insert(node, value).unwrap_or(LogicValue::Unknown);
            if last == value {
                continue;
            }
            let ports = match self.node_ports.get(&node) {
                Some(ports) => ports,
                None => continue,
            };
            for port in ports {
                for callback in &mut self.output_callbacks {
                    callback(port, value);
                }
                reported.push(LevelChange {
                    id: port.clone(),
                    level: value,
                });
            }
        }
        reported
    }
}

impl PulseSink for Engine {
    /// Drive the clock element `id` to `level` and report what followed.
    fn on_pulse(&mut self, id: &str, level: PulseLevel) -> Vec<LevelChange> {
        let node = match self.element_node(id) {
            Some(node) => node,
            None => {
                debug!(pulse = %id, "pulse without clock element");
                return Vec::new();
            }
        };
        if let Err(err) = self.circuit.set_input_value(node, level.into()) {
            warn!(pulse = %id, error = %err, "clock node rejected pulse");
            return Vec::new();
        }
        self.settle();
        self.dispatch()
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("circuit", &self.circuit)
            .field("elements", &self.elements)
            .field("ports", &self.ports)
            .field("connections", &self.connections)
            .field("output_callbacks", &self.output_callbacks.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::GateKind;
    use std::cell::RefCell;
    use std::rc::Rc;
    use LogicValue::{False, True, Unknown};
    use PortDirection::{Input, Output};

    fn port(id: &str, element: &str, direction: PortDirection) -> PortDef {
        PortDef {
            id: id.to_string(),
            element_id: element.to_string(),
            direction,
        }
    }

    /// a, b -> or -> y
    fn or_engine() -> Engine {
        let mut engine = Engine::new(CircuitConfig::default());
        engine.add_element(&ElementDef::input("a", True)).unwrap();
        engine.add_element(&ElementDef::input("b", False)).unwrap();
        engine.add_element(&ElementDef::gate("or", GateKind::Or)).unwrap();
        engine.add_element(&ElementDef::output("y")).unwrap();
        for p in [
            port("a.o", "a", Output),
            port("b.o", "b", Output),
            port("or.i0", "or", Input),
            port("or.i1", "or", Input),
            port("or.o", "or", Output),
            port("y.i", "y", Input),
        ] {
            engine.add_port(&p).unwrap();
        }
        engine.add_connection(&ConnectionDef::new("a.o", "or.i0")).unwrap();
        engine.add_connection(&ConnectionDef::new("b.o", "or.i1")).unwrap();
        engine.add_connection(&ConnectionDef::new("or.o", "y.i")).unwrap();
        engine.settle();
        engine
    }

    #[test]
    fn test_ports_map_to_slots() {
        let engine = or_engine();
        assert_eq!(engine.port_value("or.i0").unwrap(), True);
        assert_eq!(engine.port_value("or.i1").unwrap(), False);
        assert_eq!(engine.port_value("y.i").unwrap(), True);
        assert_eq!(engine.circuit().node(engine.port_node("or.o").unwrap()).unwrap().arity(), 2);
    }

    #[test]
    fn test_set_port_value_reports_changes() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let mut engine = or_engine();
        engine.dispatch();
        engine.on_output_change(Box::new(move |port, value| {
            sink.borrow_mut().push((port.to_string(), value));
        }));

        engine.set_port_value("a.o", False).unwrap();
        assert_eq!(engine.port_value("y.i").unwrap(), False);
        let seen = seen.borrow();
        assert!(seen.contains(&("or.o".to_string(), False)));
        assert!(seen.contains(&("y.i".to_string(), False)));

        assert!(engine.set_port_value("nope", True).unwrap_err().is_not_found());
        assert!(engine.set_port_value("or.o", True).is_err());
    }

    #[test]
    fn test_remove_port_renumbers_slots() {
        let mut engine = or_engine();
        engine.remove_port("or.i0").unwrap();
        engine.settle();

        assert_eq!(engine.connections().len(), 2);
        assert_eq!(engine.port_value("or.i1").unwrap(), False);
        assert_eq!(engine.port_value("y.i").unwrap(), False);
        assert_eq!(engine.element_ports("or").unwrap(), &["or.i1", "or.o"]);
    }

    #[test]
    fn test_connections_between_same_nodes_survive_removal() {
        let mut engine = or_engine();
        engine.add_port(&port("or.i2", "or", Input)).unwrap();
        engine.add_connection(&ConnectionDef::new("a.o", "or.i2")).unwrap();
        engine.add_connection(&ConnectionDef::new("a.o", "or.i2")).unwrap();
        assert_eq!(engine.connections().len(), 4);

        engine.remove_connection(&ConnectionDef::new("a.o", "or.i0")).unwrap();
        engine.settle();
        assert_eq!(engine.port_value("or.i0").unwrap(), Unknown);
        assert_eq!(engine.port_value("or.i2").unwrap(), True);
        assert_eq!(engine.port_value("y.i").unwrap(), True);
    }

    #[test]
    fn test_bad_connections_rejected() {
        let mut engine = or_engine();
        let err = engine
            .add_connection(&ConnectionDef::new("or.i0", "y.i"))
            .unwrap_err();
        assert!(matches!(err, LogicError::InvalidConnection { .. }));
        assert!(engine
            .add_connection(&ConnectionDef::new("a.o", "ghost"))
            .unwrap_err()
            .is_not_found());
        assert!(engine.add_port(&port("a.i", "a", Input)).is_err());
        assert!(engine.add_port(&port("x", "ghost", Input)).unwrap_err().is_not_found());
    }

    #[test]
    fn test_remove_element_drops_nodes() {
        let mut engine = or_engine();
        engine.remove_element("or").unwrap();
        engine.settle();
        assert!(!engine.has_element("or"));
        assert!(!engine.has_port("or.o"));
        assert!(engine.connections().is_empty());
        assert_eq!(engine.port_value("y.i").unwrap(), Unknown);
        assert!(engine.remove_element("or").unwrap_err().is_not_found());
    }

    #[test]
    fn test_integrated_circuit_flattens() {
        // Interior: x -> not -> q
        let mut inner = Netlist::new();
        inner
            .element(ElementDef::input("x", Unknown), &[("x.o", Output)])
            .element(
                ElementDef::gate("not", GateKind::Not),
                &[("not.i", Input), ("not.o", Output)],
            )
            .element(ElementDef::output("q"), &[("q.i", Input)])
            .connect("x.o", "not.i")
            .connect("not.o", "q.i");

        let mut engine = Engine::new(CircuitConfig::default());
        engine.add_element(&ElementDef::input("a", True)).unwrap();
        engine.add_element(&ElementDef::integrated("ic", inner)).unwrap();
        engine.add_element(&ElementDef::output("y")).unwrap();
        for p in [
            port("a.o", "a", Output),
            port("ic.x", "ic", Input),
            port("ic.q", "ic", Output),
            port("y.i", "y", Input),
        ] {
            engine.add_port(&p).unwrap();
        }
        engine.add_connection(&ConnectionDef::new("a.o", "ic.x")).unwrap();
        engine.add_connection(&ConnectionDef::new("ic.q", "y.i")).unwrap();
        engine.settle();

        assert_eq!(engine.port_value("y.i").unwrap(), False);
        let names: Vec<&str> = engine.circuit().nodes().map(|n| n.name.as_str()).collect();
        assert!(names.contains(&"ic/not"));
        assert!(engine
            .circuit()
            .nodes()
            .filter(|n| n.name.starts_with("ic/"))
            .all(|n| n.force_continue));

        // No boundary left for a third port
        assert!(engine.add_port(&port("ic.z", "ic", Output)).is_err());

        engine.set_port_value("a.o", False).unwrap();
        assert_eq!(engine.port_value("y.i").unwrap(), True);

        engine.remove_element("ic").unwrap();
        assert_eq!(engine.circuit().len(), 2);
    }

    #[test]
    fn test_pulse_drives_clock_node() {
        use crate::timing::ClockConfig;

        let mut engine = Engine::new(CircuitConfig::default());
        let clock = ClockConfig::new("clk", 100.0, PulseLevel::High);
        engine.add_element(&ElementDef::clock("clk", clock)).unwrap();
        engine.add_port(&port("clk.o", "clk", Output)).unwrap();
        engine.settle();
        engine.dispatch();

        let changes = engine.on_pulse("clk", PulseLevel::Low);
        assert_eq!(
            changes,
            vec![LevelChange {
                id: "clk.o".to_string(),
                level: False
            }]
        );
        assert!(engine.on_pulse("missing", PulseLevel::Low).is_empty());
    }
}
