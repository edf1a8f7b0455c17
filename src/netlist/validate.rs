//! Netlist validation.

use std::collections::{HashMap, HashSet};

use super::types::{ElementDef, ElementKind, Netlist, PortDirection};
use crate::components::GateKind;
use crate::error::{LogicError, Result};

/// Validate a netlist before building nodes from it.
///
/// Checks:
/// - Element and port ids are unique
/// - Every port belongs to a known element and every connection to known ports
/// - Connections run from an output port to an input port
/// - Each element has the ports its kind allows
/// - Integrated circuits carry a valid interior
pub fn validate_netlist(netlist: &Netlist) -> Result<()> {
    let mut elements: HashMap<&str, &ElementDef> = HashMap::new();
    for element in &netlist.elements {
        if elements.insert(element.id.as_str(), element).is_some() {
            return Err(LogicError::DuplicateElement {
                element: element.id.clone(),
            });
        }
    }

    let mut directions: HashMap<&str, PortDirection> = HashMap::new();
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for port in &netlist.ports {
        if !elements.contains_key(port.element_id.as_str()) {
            return Err(LogicError::element_not_found(&port.element_id));
        }
        if directions.insert(port.id.as_str(), port.direction).is_some() {
            return Err(LogicError::DuplicatePort {
                port: port.id.clone(),
            });
        }
        let entry = counts.entry(port.element_id.as_str()).or_default();
        match port.direction {
            PortDirection::Input => entry.0 += 1,
            PortDirection::Output => entry.1 += 1,
        }
    }

    for element in &netlist.elements {
        for port_id in &element.port_ids {
            if !directions.contains_key(port_id.as_str()) {
                return Err(LogicError::port_not_found(port_id));
            }
        }
        let (inputs, outputs) = counts.get(element.id.as_str()).copied().unwrap_or_default();
        validate_element(element, inputs, outputs)?;
    }

    let mut seen = HashSet::new();
    for connection in &netlist.connections {
        let source = &connection.source_port_id;
        let target = &connection.target_port_id;
        match directions.get(source.as_str()) {
            None => return Err(LogicError::port_not_found(source)),
            Some(PortDirection::Input) => {
                return Err(LogicError::invalid_connection(
                    source,
                    target,
                    "source must be an output port",
                ))
            }
            Some(PortDirection::Output) => {}
        }
        match directions.get(target.as_str()) {
            None => return Err(LogicError::port_not_found(target)),
            Some(PortDirection::Output) => {
                return Err(LogicError::invalid_connection(
                    source,
                    target,
                    "target must be an input port",
                ))
            }
            Some(PortDirection::Input) => {}
        }
        if !seen.insert(connection) {
            return Err(LogicError::invalid_connection(source, target, "duplicate connection"));
        }
    }

    Ok(())
}

/// Check one element against the ports attached to it.
fn validate_element(element: &ElementDef, inputs: usize, outputs: usize) -> Result<()> {
    let fail = |message: &str| Err(LogicError::invalid_element(&element.id, message));

    match element.kind {
        ElementKind::Input | ElementKind::Clock => {
            if inputs > 0 {
                return fail("sources cannot have input ports");
            }
            if element.kind == ElementKind::Clock {
                match &element.clock {
                    None => return fail("clock elements need a clock configuration"),
                    Some(clock) if !(clock.period_milliseconds > 0.0) => {
                        return fail("clock period must be positive")
                    }
                    Some(_) => {}
                }
            }
        }
        ElementKind::Output => {
            if inputs != 1 || outputs != 0 {
                return fail("output elements take exactly one input port");
            }
        }
        ElementKind::Gate => {
            let gate = match element.gate_kind() {
                Some(gate) => gate,
                None => {
                    let subkind = element.subkind.as_deref().unwrap_or("<none>");
                    return fail(&format!("unknown gate '{}'", subkind));
                }
            };
            if matches!(gate, GateKind::Not | GateKind::Buffer) && inputs != 1 {
                return fail("single-input gate needs exactly one input port");
            }
        }
        ElementKind::IntegratedCircuit => {
            let interior = match &element.circuit {
                Some(interior) => interior,
                None => return fail("integrated circuits need an interior netlist"),
            };
            validate_netlist(interior)?;

            let count = |kind: ElementKind| interior.elements.iter().filter(|e| e.kind == kind).count();
            if count(ElementKind::Clock) > 0 {
                return fail("clocks cannot be nested inside integrated circuits");
            }
            if inputs > count(ElementKind::Input) {
                return fail("more input ports than interior inputs");
            }
            if outputs > count(ElementKind::Output) {
                return fail("more output ports than interior outputs");
            }
        }
    }
    Ok(())
}
