//! Component behaviors for network stamping.
//!
//! This module provides models for all supported linear components:
//! - Passive: Resistor, Capacitor, Inductor
//! - Sources: Voltage Source, Current Source
//! - Controlled: Voltage-Controlled Current Source
//!
//! Every component implements [`Behavior`]. Matrix elements are requested
//! once in [`Behavior::setup`] and kept as handles; each analysis then only
//! writes values through those handles, so the matrix structure is fixed
//! after setup and the pivot order can be reused between solves.

mod controlled;
mod linear;
mod sources;

pub use controlled::Vccs;
pub use linear::{Capacitor, Inductor, Resistor};
pub use sources::{AcExcitation, CurrentSource, VoltageSource};

use std::collections::HashMap;
use std::fmt;

use num_complex::Complex64;

use crate::circuit::{BranchId, NodeId, VarIndex};
use crate::error::{KirchhoffError, Result};
use crate::netlist::{ComponentDef, ComponentType};
use crate::sparse::{ElementHandle, Matrix, Scalar};

/// A component that can stamp itself into the network equations.
pub trait Behavior: fmt::Debug + Send {
    /// Component name (e.g., "R1", "V1").
    fn name(&self) -> &str;

    /// Terminal nodes.
    fn nodes(&self) -> &[NodeId];

    /// Branch current unknown, if this component has one.
    fn branch(&self) -> Option<BranchId> {
        None
    }

    /// Allocate matrix elements. Called once before the first load.
    fn setup(&mut self, ctx: &mut SetupContext<'_>) -> Result<()>;

    /// Stamp the DC operating-point equations.
    fn load_real(&self, matrix: &mut Matrix, rhs: &mut [f64]);

    /// Stamp the small-signal equations at angular frequency `omega`.
    fn load_complex(&self, matrix: &mut Matrix, rhs: &mut [Complex64], omega: f64);
}

/// Matrix access handed to behaviors during setup.
pub struct SetupContext<'a> {
    matrix: &'a mut Matrix,
    num_nodes: usize,
}

impl<'a> SetupContext<'a> {
    /// Create a context for a network with `num_nodes` nodes, ground included.
    pub fn new(matrix: &'a mut Matrix, num_nodes: usize) -> Self {
        Self { matrix, num_nodes }
    }

    /// External matrix index of an unknown.
    pub fn index(&self, var: VarIndex) -> usize {
        var.external(self.num_nodes)
    }

    /// Element at the intersection of two unknowns.
    pub fn element(&mut self, row: VarIndex, col: VarIndex) -> Result<ElementHandle> {
        let (row, col) = (self.index(row), self.index(col));
        self.matrix.get_element(row as isize, col as isize)
    }

    /// The four elements of an admittance between two nodes.
    pub fn quad(&mut self, pos: NodeId, neg: NodeId) -> Result<Quad> {
        self.transfer_quad((pos, neg), (pos, neg))
    }

    /// The four elements coupling a pair of row nodes to a pair of column
    /// nodes, as used by transconductances.
    pub fn transfer_quad(
        &mut self,
        rows: (NodeId, NodeId),
        cols: (NodeId, NodeId),
    ) -> Result<Quad> {
        let (rp, rn) = (VarIndex::Voltage(rows.0), VarIndex::Voltage(rows.1));
        let (cp, cn) = (VarIndex::Voltage(cols.0), VarIndex::Voltage(cols.1));
        Ok(Quad {
            pos_pos: self.element(rp, cp)?,
            pos_neg: self.element(rp, cn)?,
            neg_pos: self.element(rn, cp)?,
            neg_neg: self.element(rn, cn)?,
        })
    }

    /// The incidence elements tying a branch current to its two nodes.
    pub fn branch_incidence(
        &mut self,
        pos: NodeId,
        neg: NodeId,
        branch: BranchId,
    ) -> Result<BranchIncidence> {
        let (p, n, b) = (
            VarIndex::Voltage(pos),
            VarIndex::Voltage(neg),
            VarIndex::Current(branch),
        );
        Ok(BranchIncidence {
            pos_branch: self.element(p, b)?,
            neg_branch: self.element(n, b)?,
            branch_pos: self.element(b, p)?,
            branch_neg: self.element(b, n)?,
            row: self.index(b),
        })
    }
}

/// Handles for a two-port stamp pattern.
///
/// For an admittance `y` between `pos` and `neg`:
/// ```text
///          pos   neg
///   pos [  +y    -y  ]
///   neg [  -y    +y  ]
/// ```
/// Any handle touching ground is the matrix trash element, so stamps never
/// need to special-case grounded terminals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quad {
    pub pos_pos: ElementHandle,
    pub pos_neg: ElementHandle,
    pub neg_pos: ElementHandle,
    pub neg_neg: ElementHandle,
}

impl Quad {
    /// Placeholder before setup; every write is absorbed.
    pub const UNSET: Quad = Quad {
        pos_pos: ElementHandle::GROUND,
        pos_neg: ElementHandle::GROUND,
        neg_pos: ElementHandle::GROUND,
        neg_neg: ElementHandle::GROUND,
    };

    /// Add `value` with the two-port sign pattern.
    pub fn add<T: Scalar>(&self, matrix: &mut Matrix, value: T) {
        matrix.add(self.pos_pos, value);
        matrix.add(self.neg_neg, value);
        matrix.add(self.pos_neg, -value);
        matrix.add(self.neg_pos, -value);
    }
}

/// Handles for the branch-current incidence of a voltage-defined component.
///
/// Enforces `V(pos) - V(neg) = ...` in the branch row and injects the branch
/// current into the KCL rows of both nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BranchIncidence {
    pub pos_branch: ElementHandle,
    pub neg_branch: ElementHandle,
    pub branch_pos: ElementHandle,
    pub branch_neg: ElementHandle,
    /// External index of the branch row
    pub row: usize,
}

impl BranchIncidence {
    /// Placeholder before setup; every write is absorbed.
    pub const UNSET: BranchIncidence = BranchIncidence {
        pos_branch: ElementHandle::GROUND,
        neg_branch: ElementHandle::GROUND,
        branch_pos: ElementHandle::GROUND,
        branch_neg: ElementHandle::GROUND,
        row: 0,
    };

    /// Stamp the `±1` incidence entries.
    pub fn add<T: Scalar>(&self, matrix: &mut Matrix) {
        let one = T::one();
        matrix.add(self.pos_branch, one);
        matrix.add(self.branch_pos, one);
        matrix.add(self.neg_branch, -one);
        matrix.add(self.branch_neg, -one);
    }
}

/// Builds a behavior from a parsed component line.
///
/// `branches` counts the branch currents allocated so far; factories needing
/// one take the current value and increment it.
pub type Factory = fn(&ComponentDef, &[NodeId], &mut usize) -> Result<Box<dyn Behavior>>;

/// Explicit map from component type to factory.
#[derive(Clone)]
pub struct BehaviorRegistry {
    factories: HashMap<ComponentType, Factory>,
}

impl fmt::Debug for BehaviorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.factories.keys()).finish()
    }
}

impl Default for BehaviorRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(ComponentType::Resistor, Resistor::from_def);
        registry.register(ComponentType::Capacitor, Capacitor::from_def);
        registry.register(ComponentType::Inductor, Inductor::from_def);
        registry.register(ComponentType::VoltageSource, VoltageSource::from_def);
        registry.register(ComponentType::CurrentSource, CurrentSource::from_def);
        registry.register(ComponentType::Vccs, Vccs::from_def);
        registry
    }
}

impl BehaviorRegistry {
    /// Registry with every built-in component type.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with nothing registered.
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register or replace the factory for a component type.
    pub fn register(&mut self, component_type: ComponentType, factory: Factory) {
        self.factories.insert(component_type, factory);
    }

    /// Whether a factory exists for the component type.
    pub fn supports(&self, component_type: ComponentType) -> bool {
        self.factories.contains_key(&component_type)
    }

    /// Build the behavior for a component line.
    pub fn create(
        &self,
        def: &ComponentDef,
        nodes: &[NodeId],
        branches: &mut usize,
    ) -> Result<Box<dyn Behavior>> {
        let factory = self.factories.get(&def.component_type).ok_or_else(|| {
            KirchhoffError::UnknownComponentType {
                component_type: def.component_type.to_string(),
                line: def.line,
            }
        })?;
        factory(def, nodes, branches)
    }
}

/// Take the next branch current.
pub(crate) fn allocate_branch(branches: &mut usize) -> BranchId {
    let branch = BranchId(*branches);
    *branches += 1;
    branch
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlist;

    fn def(line: &str) -> ComponentDef {
        netlist::parse(line).unwrap().components.remove(0)
    }

    #[test]
    fn test_quad_sign_pattern() {
        let mut m = Matrix::new();
        let quad = SetupContext::new(&mut m, 3)
            .quad(NodeId(1), NodeId(2))
            .unwrap();
        quad.add(&mut m, 0.5);
        assert_eq!(m.real(quad.pos_pos), 0.5);
        assert_eq!(m.real(quad.neg_neg), 0.5);
        assert_eq!(m.real(quad.pos_neg), -0.5);
        assert_eq!(m.real(quad.neg_pos), -0.5);
    }

    #[test]
    fn test_grounded_quad_uses_trash() {
        let mut m = Matrix::new();
        let quad = SetupContext::new(&mut m, 2)
            .quad(NodeId(1), NodeId::GROUND)
            .unwrap();
        assert!(quad.pos_neg.is_ground());
        assert!(quad.neg_pos.is_ground());
        assert!(quad.neg_neg.is_ground());
        assert_eq!(m.element_count(), 1);
    }

    #[test]
    fn test_branch_incidence_rows() {
        let mut m = Matrix::new();
        let inc = SetupContext::new(&mut m, 3)
            .branch_incidence(NodeId(1), NodeId(2), BranchId(0))
            .unwrap();
        assert_eq!(inc.row, 3);
        inc.add::<f64>(&mut m);
        assert_eq!(m.location(inc.branch_neg), (3, 2));
        assert_eq!(m.real(inc.branch_neg), -1.0);
        assert_eq!(m.real(inc.pos_branch), 1.0);
    }

    #[test]
    fn test_registry_dispatch() {
        let registry = BehaviorRegistry::new();
        let mut branches = 0;
        let v = registry
            .create(&def("V1 a 0 5"), &[NodeId(1), NodeId::GROUND], &mut branches)
            .unwrap();
        assert_eq!(v.name(), "V1");
        assert_eq!(v.branch(), Some(BranchId(0)));
        assert_eq!(branches, 1);
    }

    #[test]
    fn test_registry_missing_factory() {
        let registry = BehaviorRegistry::empty();
        assert!(!registry.supports(ComponentType::Resistor));
        let err = registry
            .create(&def("R1 a 0 1k"), &[NodeId(1), NodeId::GROUND], &mut 0)
            .unwrap_err();
        assert!(matches!(err, KirchhoffError::UnknownComponentType { .. }));
    }
}
