//! Linear passive components: Resistor, Capacitor, Inductor.

use num_complex::Complex64;

use super::{allocate_branch, Behavior, BranchIncidence, Quad, SetupContext};
use crate::circuit::{BranchId, NodeId, VarIndex};
use crate::error::{KirchhoffError, Result};
use crate::netlist::ComponentDef;
use crate::sparse::{ElementHandle, Matrix};

/// A resistor component.
#[derive(Debug, Clone)]
pub struct Resistor {
    pub name: String,
    pub nodes: [NodeId; 2], // [positive, negative]
    pub resistance: f64,
    quad: Quad,
}

impl Resistor {
    /// Create a new resistor.
    pub fn new(name: String, nodes: [NodeId; 2], resistance: f64) -> Self {
        Self {
            name,
            nodes,
            resistance,
            quad: Quad::UNSET,
        }
    }

    /// Zero resistance is rejected; a short is modeled with a voltage source.
    pub(crate) fn from_def(
        def: &ComponentDef,
        nodes: &[NodeId],
        _branches: &mut usize,
    ) -> Result<Box<dyn Behavior>> {
        let value = def.require_value("resistor")?;
        if value == 0.0 || !value.is_finite() {
            return Err(KirchhoffError::invalid_component(
                &def.name,
                def.line,
                "resistance must be finite and nonzero",
            ));
        }
        Ok(Box::new(Self::new(def.name.clone(), [nodes[0], nodes[1]], value)))
    }

    /// Get the conductance (1/R).
    pub fn conductance(&self) -> f64 {
        1.0 / self.resistance
    }
}

impl Behavior for Resistor {
    fn name(&self) -> &str {
        &self.name
    }

    fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    fn setup(&mut self, ctx: &mut SetupContext<'_>) -> Result<()> {
        self.quad = ctx.quad(self.nodes[0], self.nodes[1])?;
        Ok(())
    }

    fn load_real(&self, matrix: &mut Matrix, _rhs: &mut [f64]) {
        self.quad.add(matrix, self.conductance());
    }

    fn load_complex(&self, matrix: &mut Matrix, _rhs: &mut [Complex64], _omega: f64) {
        self.quad.add(matrix, Complex64::new(self.conductance(), 0.0));
    }
}

/// A capacitor component.
///
/// Open in the DC operating point, admittance `jωC` in AC. The elements are
/// still allocated at setup so both analyses share one structure.
#[derive(Debug, Clone)]
pub struct Capacitor {
    pub name: String,
    pub nodes: [NodeId; 2],
    pub capacitance: f64,
    quad: Quad,
}

impl Capacitor {
    /// Create a new capacitor.
    pub fn new(name: String, nodes: [NodeId; 2], capacitance: f64) -> Self {
        Self {
            name,
            nodes,
            capacitance,
            quad: Quad::UNSET,
        }
    }

    pub(crate) fn from_def(
        def: &ComponentDef,
        nodes: &[NodeId],
        _branches: &mut usize,
    ) -> Result<Box<dyn Behavior>> {
        let value = def.require_value("capacitor")?;
        Ok(Box::new(Self::new(
            def.name.clone(),
            [nodes[0], nodes[1]],
            value,
        )))
    }

    /// Admittance at angular frequency `omega`.
    pub fn admittance(&self, omega: f64) -> Complex64 {
        Complex64::new(0.0, omega * self.capacitance)
    }
}

impl Behavior for Capacitor {
    fn name(&self) -> &str {
        &self.name
    }

    fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    fn setup(&mut self, ctx: &mut SetupContext<'_>) -> Result<()> {
        self.quad = ctx.quad(self.nodes[0], self.nodes[1])?;
        Ok(())
    }

    fn load_real(&self, _matrix: &mut Matrix, _rhs: &mut [f64]) {}

    fn load_complex(&self, matrix: &mut Matrix, _rhs: &mut [Complex64], omega: f64) {
        self.quad.add(matrix, self.admittance(omega));
    }
}

/// An inductor component.
///
/// Carries its current as an extra unknown. The branch row reads
/// `V(pos) - V(neg) - jωL·I = 0`, which degenerates to a short in DC.
#[derive(Debug, Clone)]
pub struct Inductor {
    pub name: String,
    pub nodes: [NodeId; 2],
    pub inductance: f64,
    pub branch: BranchId,
    incidence: BranchIncidence,
    branch_branch: ElementHandle,
}

impl Inductor {
    /// Create a new inductor.
    pub fn new(name: String, nodes: [NodeId; 2], inductance: f64, branch: BranchId) -> Self {
        Self {
            name,
            nodes,
            inductance,
            branch,
            incidence: BranchIncidence::UNSET,
            branch_branch: ElementHandle::GROUND,
        }
    }

    pub(crate) fn from_def(
        def: &ComponentDef,
        nodes: &[NodeId],
        branches: &mut usize,
    ) -> Result<Box<dyn Behavior>> {
        let value = def.require_value("inductor")?;
        Ok(Box::new(Self::new(
            def.name.clone(),
            [nodes[0], nodes[1]],
            value,
            allocate_branch(branches),
        )))
    }

    /// Impedance at angular frequency `omega`.
    pub fn impedance(&self, omega: f64) -> Complex64 {
        Complex64::new(0.0, omega * self.inductance)
    }
}

impl Behavior for Inductor {
    fn name(&self) -> &str {
        &self.name
    }

    fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    fn branch(&self) -> Option<BranchId> {
        Some(self.branch)
    }

    fn setup(&mut self, ctx: &mut SetupContext<'_>) -> Result<()> {
        self.incidence = ctx.branch_incidence(self.nodes[0], self.nodes[1], self.branch)?;
        let b = VarIndex::Current(self.branch);
        self.branch_branch = ctx.element(b, b)?;
        Ok(())
    }

    fn load_real(&self, matrix: &mut Matrix, _rhs: &mut [f64]) {
        self.incidence.add::<f64>(matrix);
    }

    fn load_complex(&self, matrix: &mut Matrix, _rhs: &mut [Complex64], omega: f64) {
        self.incidence.add::<Complex64>(matrix);
        matrix.add(self.branch_branch, -self.impedance(omega));
    }
}
