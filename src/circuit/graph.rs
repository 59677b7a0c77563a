//! Circuit graph structure.

use std::collections::HashMap;

use super::types::{ComponentId, NodeId, VarIndex};
use crate::components::{Behavior, BehaviorRegistry};
use crate::error::{KirchhoffError, Result};
use crate::netlist::{is_ground, NetlistAst, GROUND_NAME};

/// A complete circuit ready for simulation.
#[derive(Debug)]
pub struct Circuit {
    /// Optional netlist title
    pub title: Option<String>,

    /// All components in the circuit
    pub components: Vec<Box<dyn Behavior>>,

    /// Mapping from node names to node IDs
    pub node_map: HashMap<String, NodeId>,

    /// Reverse mapping from node IDs to names
    pub node_names: Vec<String>,

    /// Number of nodes (including ground)
    pub num_nodes: usize,

    /// Number of branch current unknowns (voltage sources, inductors)
    pub num_branches: usize,
}

impl Circuit {
    /// Build a circuit from a parsed AST using the built-in components.
    pub fn from_ast(ast: NetlistAst) -> Result<Self> {
        Self::from_ast_with(ast, &BehaviorRegistry::new())
    }

    /// Build a circuit from a parsed AST with a custom registry.
    ///
    /// Nodes are numbered in the order the AST lists them, which is the
    /// order of first appearance in the netlist.
    pub fn from_ast_with(ast: NetlistAst, registry: &BehaviorRegistry) -> Result<Self> {
        let mut node_map = HashMap::new();
        let mut node_names = vec![GROUND_NAME.to_string()];
        node_map.insert(GROUND_NAME.to_string(), NodeId::GROUND);

        for name in &ast.nodes {
            if !node_map.contains_key(name) {
                node_map.insert(name.clone(), NodeId(node_names.len()));
                node_names.push(name.clone());
            }
        }
        let num_nodes = node_names.len();

        let mut components: Vec<Box<dyn Behavior>> = Vec::with_capacity(ast.components.len());
        let mut num_branches = 0usize;

        for def in &ast.components {
            if components.iter().any(|c| c.name() == def.name) {
                return Err(KirchhoffError::DuplicateComponent {
                    name: def.name.clone(),
                });
            }

            let nodes: Vec<NodeId> = def
                .nodes
                .iter()
                .map(|name| {
                    node_map
                        .get(name)
                        .copied()
                        .ok_or_else(|| KirchhoffError::NodeNotFound { node: name.clone() })
                })
                .collect::<Result<Vec<_>>>()?;

            components.push(registry.create(def, &nodes, &mut num_branches)?);
        }

        tracing::debug!(
            nodes = num_nodes - 1,
            branches = num_branches,
            components = components.len(),
            "circuit built"
        );

        Ok(Circuit {
            title: ast.title,
            components,
            node_map,
            node_names,
            num_nodes,
            num_branches,
        })
    }

    /// Number of unknowns: node voltages (excluding ground) plus branch
    /// currents.
    pub fn matrix_size(&self) -> usize {
        (self.num_nodes - 1) + self.num_branches
    }

    /// External matrix index of an unknown.
    pub fn index(&self, var: VarIndex) -> usize {
        var.external(self.num_nodes)
    }

    /// Find a node ID by name. `0` and `gnd` resolve to ground.
    pub fn find_node(&self, name: &str) -> Option<NodeId> {
        if is_ground(name) {
            return Some(NodeId::GROUND);
        }
        self.node_map.get(name).copied()
    }

    /// Get the name of a node.
    pub fn node_name(&self, node: NodeId) -> &str {
        &self.node_names[node.0]
    }

    /// Find a component by name.
    pub fn find_component(&self, name: &str) -> Option<ComponentId> {
        self.components
            .iter()
            .position(|c| c.name() == name)
            .map(ComponentId)
    }

    /// Get a component by ID.
    pub fn component(&self, id: ComponentId) -> &dyn Behavior {
        self.components[id.0].as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::BranchId;
    use crate::netlist;

    fn circuit(text: &str) -> Result<Circuit> {
        Circuit::from_ast(netlist::parse(text)?)
    }

    #[test]
    fn test_node_numbering() {
        let c = circuit("V1 in 0 5\nR1 in out 1k\nR2 out gnd 2k").unwrap();
        assert_eq!(c.num_nodes, 3);
        assert_eq!(c.find_node("in"), Some(NodeId(1)));
        assert_eq!(c.find_node("out"), Some(NodeId(2)));
        assert_eq!(c.find_node("GND"), Some(NodeId::GROUND));
        assert_eq!(c.node_name(NodeId(2)), "out");
        assert_eq!(c.find_node("missing"), None);
    }

    #[test]
    fn test_branches_follow_nodes() {
        let c = circuit("V1 a 0 1\nL1 a b 1m\nR1 b 0 1").unwrap();
        assert_eq!(c.num_branches, 2);
        assert_eq!(c.matrix_size(), 4);
        let l1 = c.find_component("L1").unwrap();
        assert_eq!(c.component(l1).branch(), Some(BranchId(1)));
        assert_eq!(c.index(VarIndex::Current(BranchId(1))), 4);
    }

    #[test]
    fn test_duplicate_component_rejected() {
        let err = circuit("R1 a 0 1k\nR1 a 0 2k").unwrap_err();
        assert!(matches!(err, KirchhoffError::DuplicateComponent { .. }));
    }
}
