//! Circuit validation.

use crate::error::{KirchhoffError, Result};

use super::{Circuit, NodeId};

/// Validate a circuit for simulation.
///
/// Fails when the circuit is empty or no component touches ground, since
/// node voltages would then have no reference. Nodes with a single terminal
/// are legal but usually a typo, so they are only logged.
pub fn validate_circuit(circuit: &Circuit) -> Result<()> {
    if circuit.components.is_empty() {
        return Err(KirchhoffError::InvalidTopology {
            message: "circuit has no components".to_string(),
        });
    }

    let mut terminals = vec![0usize; circuit.num_nodes];
    for component in &circuit.components {
        for node in component.nodes() {
            terminals[node.0] += 1;
        }
    }

    if terminals[NodeId::GROUND.0] == 0 {
        return Err(KirchhoffError::InvalidTopology {
            message: "no component connects to ground".to_string(),
        });
    }

    for (node, &count) in terminals.iter().enumerate().skip(1) {
        if count < 2 {
            tracing::warn!(
                node = circuit.node_name(NodeId(node)),
                "node has a single connection"
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlist;

    fn check(text: &str) -> Result<()> {
        validate_circuit(&Circuit::from_ast(netlist::parse(text)?)?)
    }

    #[test]
    fn test_valid_divider() {
        assert!(check("V1 a 0 1\nR1 a b 1k\nR2 b 0 1k").is_ok());
    }

    #[test]
    fn test_empty_circuit() {
        assert!(matches!(
            check("* nothing here\n"),
            Err(KirchhoffError::InvalidTopology { .. })
        ));
    }

    #[test]
    fn test_missing_ground() {
        assert!(matches!(
            check("R1 a b 1k\nR2 b a 1k"),
            Err(KirchhoffError::InvalidTopology { .. })
        ));
    }

    #[test]
    fn test_dangling_node_is_allowed() {
        assert!(check("V1 a 0 1\nR1 a 0 1k\nR2 a stub 1k").is_ok());
    }
}
