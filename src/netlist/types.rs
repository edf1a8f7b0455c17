//! Structural description records.

use serde::{Deserialize, Serialize};

use crate::components::{GateKind, LogicValue};
use crate::timing::ClockConfig;

/// Complete structural description of a circuit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Netlist {
    #[serde(default)]
    pub elements: Vec<ElementDef>,
    #[serde(default)]
    pub ports: Vec<PortDef>,
    #[serde(default)]
    pub connections: Vec<ConnectionDef>,
}

impl Netlist {
    /// Create a new empty netlist.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an element together with its ports, in port order.
    pub fn element(&mut self, mut def: ElementDef, ports: &[(&str, PortDirection)]) -> &mut Self {
        for &(id, direction) in ports {
            def.port_ids.push(id.to_string());
            self.ports.push(PortDef {
                id: id.to_string(),
                element_id: def.id.clone(),
                direction,
            });
        }
        self.elements.push(def);
        self
    }

    /// Wire an output port to an input port.
    pub fn connect(&mut self, source: &str, target: &str) -> &mut Self {
        self.connections.push(ConnectionDef::new(source, target));
        self
    }

    pub fn find_element(&self, id: &str) -> Option<&ElementDef> {
        self.elements.iter().find(|e| e.id == id)
    }

    pub fn find_port(&self, id: &str) -> Option<&PortDef> {
        self.ports.iter().find(|p| p.id == id)
    }

    /// Ports of an element: those listed in its `port_ids` first, in that
    /// order, then any other port naming the element.
    pub fn ports_of<'a>(&'a self, element: &ElementDef) -> Vec<&'a PortDef> {
        let mut ports: Vec<&PortDef> = element
            .port_ids
            .iter()
            .filter_map(|id| self.find_port(id))
            .filter(|p| p.element_id == element.id)
            .collect();
        for port in &self.ports {
            if port.element_id == element.id && !element.port_ids.contains(&port.id) {
                ports.push(port);
            }
        }
        ports
    }
}

/// Element categories understood by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ElementKind {
    /// Externally driven source
    Input,
    /// Sink reporting the value it receives
    Output,
    /// Combinational gate; `subkind` names the gate
    Gate,
    /// Source driven by a clock pulse
    Clock,
    /// Composite element with a nested netlist
    #[serde(alias = "ic")]
    IntegratedCircuit,
}

/// An element instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementDef {
    pub id: String,
    pub kind: ElementKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subkind: Option<String>,
    #[serde(default)]
    pub port_ids: Vec<String>,
    /// Initial constant of an input element
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<LogicValue>,
    /// Clock configuration of a clock element
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clock: Option<ClockConfig>,
    /// Interior of an integrated circuit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub circuit: Option<Box<Netlist>>,
}

impl ElementDef {
    fn bare(id: impl Into<String>, kind: ElementKind) -> Self {
        Self {
            id: id.into(),
            kind,
            subkind: None,
            port_ids: Vec::new(),
            value: None,
            clock: None,
            circuit: None,
        }
    }

    pub fn input(id: impl Into<String>, value: LogicValue) -> Self {
        Self {
            value: Some(value),
            ..Self::bare(id, ElementKind::Input)
        }
    }

    pub fn output(id: impl Into<String>) -> Self {
        Self::bare(id, ElementKind::Output)
    }

    pub fn gate(id: impl Into<String>, gate: GateKind) -> Self {
        Self {
            subkind: Some(gate.name().to_string()),
            ..Self::bare(id, ElementKind::Gate)
        }
    }

    pub fn clock(id: impl Into<String>, config: ClockConfig) -> Self {
        Self {
            clock: Some(config),
            ..Self::bare(id, ElementKind::Clock)
        }
    }

    pub fn integrated(id: impl Into<String>, circuit: Netlist) -> Self {
        Self {
            circuit: Some(Box::new(circuit)),
            ..Self::bare(id, ElementKind::IntegratedCircuit)
        }
    }

    /// Gate function named by `subkind`.
    pub fn gate_kind(&self) -> Option<GateKind> {
        self.subkind.as_deref().and_then(GateKind::from_str)
    }
}

/// Port direction relative to its element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortDirection {
    Input,
    Output,
}

/// A port on an element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortDef {
    pub id: String,
    pub element_id: String,
    pub direction: PortDirection,
}

/// A wire from an output port to an input port.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionDef {
    pub source_port_id: String,
    pub target_port_id: String,
}

impl ConnectionDef {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source_port_id: source.into(),
            target_port_id: target.into(),
        }
    }
}
