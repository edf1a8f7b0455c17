//! Structural circuit descriptions.
//!
//! A netlist lists elements, the ports they expose and the connections
//! between ports. It is the interchange the orchestrator builds nodes from,
//! loaded from JSON:
//!
//! ```json
//! {
//!   "elements": [
//!     { "id": "s", "kind": "input", "value": "false", "portIds": ["s.out"] },
//!     { "id": "g", "kind": "gate", "subkind": "nor", "portIds": ["g.a", "g.b", "g.out"] },
//!     { "id": "q", "kind": "output", "portIds": ["q.in"] }
//!   ],
//!   "ports": [
//!     { "id": "s.out", "elementId": "s", "direction": "output" },
//!     { "id": "g.a", "elementId": "g", "direction": "input" },
//!     { "id": "g.b", "elementId": "g", "direction": "input" },
//!     { "id": "g.out", "elementId": "g", "direction": "output" },
//!     { "id": "q.in", "elementId": "q", "direction": "input" }
//!   ],
//!   "connections": [
//!     { "sourcePortId": "s.out", "targetPortId": "g.a" },
//!     { "sourcePortId": "g.out", "targetPortId": "q.in" }
//!   ]
//! }
//! ```
//!
//! # Element kinds
//!
//! | Kind | Ports | Node |
//! |------|-------|------|
//! | input | outputs only | Input, pinned to `value` |
//! | clock | outputs only | Input, driven by a clock pulse |
//! | output | one input | Output sink |
//! | gate | inputs and outputs | gate named by `subkind` |
//! | integratedCircuit | inputs and outputs | flattened interior `circuit` |

mod types;
mod validate;

pub use types::*;
pub use validate::validate_netlist;

use crate::error::{LogicError, Result};

/// Parse a JSON netlist.
pub fn parse(input: &str) -> Result<Netlist> {
    serde_json::from_str(input).map_err(|source| LogicError::NetlistParse { source })
}

/// Parse a JSON netlist file.
#[cfg(feature = "cli")]
pub fn parse_file(path: &std::path::Path) -> Result<Netlist> {
    let content = std::fs::read_to_string(path).map_err(|e| LogicError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    parse(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{GateKind, LogicValue};
    use crate::timing::PulseLevel;

    #[test]
    fn test_parse_json() {
        let json = r#"{
            "elements": [
                { "id": "s", "kind": "input", "value": "true", "portIds": ["s.out"] },
                { "id": "g", "kind": "gate", "subkind": "NOR", "portIds": ["g.a", "g.out"] },
                { "id": "clk", "kind": "clock", "portIds": ["clk.out"],
                  "clock": { "label": "main", "periodMilliseconds": 500, "initialLevel": "low" } }
            ],
            "ports": [
                { "id": "s.out", "elementId": "s", "direction": "output" },
                { "id": "g.a", "elementId": "g", "direction": "input" },
                { "id": "g.out", "elementId": "g", "direction": "output" },
                { "id": "clk.out", "elementId": "clk", "direction": "output" }
            ],
            "connections": [{ "sourcePortId": "s.out", "targetPortId": "g.a" }]
        }"#;

        let netlist = parse(json).unwrap();
        assert_eq!(netlist.elements.len(), 3);
        assert_eq!(netlist.elements[0].value, Some(LogicValue::True));
        assert_eq!(netlist.elements[1].gate_kind(), Some(GateKind::Nor));
        let clock = netlist.find_element("clk").and_then(|e| e.clock.clone()).unwrap();
        assert_eq!(clock.initial_level, PulseLevel::Low);
        assert_eq!(clock.period_milliseconds, 500.0);
        assert_eq!(netlist.find_port("g.a").unwrap().direction, PortDirection::Input);
        assert!(validate_netlist(&netlist).is_ok());
    }

    #[test]
    fn test_parse_nested_circuit() {
        let json = r#"{
            "elements": [{ "id": "ic", "kind": "ic", "circuit": { "elements": [] } }]
        }"#;
        let netlist = parse(json).unwrap();
        assert_eq!(netlist.elements[0].kind, ElementKind::IntegratedCircuit);
        assert!(netlist.elements[0].circuit.as_ref().unwrap().elements.is_empty());
    }

    #[test]
    fn test_parse_error() {
        let err = parse("{ \"elements\": [{ \"id\": 3 }] }").unwrap_err();
        assert!(matches!(err, LogicError::NetlistParse { .. }));
    }

    #[test]
    fn test_builder_matches_json() {
        let mut built = Netlist::new();
        built
            .element(ElementDef::input("s", LogicValue::False), &[("s.out", PortDirection::Output)])
            .element(ElementDef::output("q"), &[("q.in", PortDirection::Input)])
            .connect("s.out", "q.in");

        let json = serde_json::to_string(&built).unwrap();
        assert!(json.contains("\"portIds\":[\"s.out\"]"));
        assert_eq!(parse(&json).unwrap(), built);
    }
}
