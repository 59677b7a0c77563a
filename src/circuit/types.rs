//! Identifiers for nodes, components and unknowns.

/// Node number. Node 0 is ground; the others are numbered in order of
/// first appearance in the netlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl NodeId {
    pub const GROUND: NodeId = NodeId(0);
}

/// Index of a component in [`Circuit::components`](super::Circuit).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComponentId(pub usize);

/// Extra unknown carrying a branch current (voltage sources, inductors).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BranchId(pub usize);

/// An unknown of the network equations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VarIndex {
    /// Node voltage variable
    Voltage(NodeId),
    /// Branch current variable
    Current(BranchId),
}

impl VarIndex {
    /// External matrix index of this unknown.
    ///
    /// Node voltages keep their node number, so ground stays at 0 and lands
    /// on the matrix trash element. Branch currents follow the last node.
    /// `num_nodes` counts ground.
    pub fn external(&self, num_nodes: usize) -> usize {
        match self {
            VarIndex::Voltage(NodeId(n)) => *n,
            VarIndex::Current(BranchId(b)) => num_nodes + b,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_external_indices() {
        // Ground plus three nodes: branches start at 4
        assert_eq!(VarIndex::Voltage(NodeId::GROUND).external(4), 0);
        assert_eq!(VarIndex::Voltage(NodeId(3)).external(4), 3);
        assert_eq!(VarIndex::Current(BranchId(0)).external(4), 4);
        assert_eq!(VarIndex::Current(BranchId(2)).external(4), 6);
    }
}
