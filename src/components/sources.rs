//! Voltage and current sources.

use num_complex::Complex64;

use super::{allocate_branch, Behavior, BranchIncidence, SetupContext};
use crate::circuit::{BranchId, NodeId};
use crate::error::Result;
use crate::netlist::ComponentDef;
use crate::sparse::Matrix;

/// Small-signal excitation of an independent source.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AcExcitation {
    /// Magnitude
    pub magnitude: f64,
    /// Phase in degrees
    pub phase: f64,
}

impl AcExcitation {
    fn from_def(def: &ComponentDef) -> Self {
        Self {
            magnitude: def.params.get("ac").copied().unwrap_or(0.0),
            phase: def.params.get("acphase").copied().unwrap_or(0.0),
        }
    }

    /// Phasor value.
    pub fn phasor(&self) -> Complex64 {
        Complex64::from_polar(self.magnitude, self.phase.to_radians())
    }
}

/// A voltage source component.
///
/// Voltage sources require an extra unknown for the branch current. The
/// branch row enforces `V+ - V- = E`.
#[derive(Debug, Clone)]
pub struct VoltageSource {
    pub name: String,
    pub nodes: [NodeId; 2], // [positive, negative]
    pub dc_value: f64,
    pub ac: AcExcitation,
    pub branch: BranchId,
    incidence: BranchIncidence,
}

impl VoltageSource {
    /// Create a new voltage source.
    pub fn new(
        name: String,
        nodes: [NodeId; 2],
        dc_value: f64,
        ac: AcExcitation,
        branch: BranchId,
    ) -> Self {
        Self {
            name,
            nodes,
            dc_value,
            ac,
            branch,
            incidence: BranchIncidence::UNSET,
        }
    }

    pub(crate) fn from_def(
        def: &ComponentDef,
        nodes: &[NodeId],
        branches: &mut usize,
    ) -> Result<Box<dyn Behavior>> {
        Ok(Box::new(Self::new(
            def.name.clone(),
            [nodes[0], nodes[1]],
            def.value.unwrap_or(0.0),
            AcExcitation::from_def(def),
            allocate_branch(branches),
        )))
    }
}

impl Behavior for VoltageSource {
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
        Ok(())
    }

    fn load_real(&self, matrix: &mut Matrix, rhs: &mut [f64]) {
        self.incidence.add::<f64>(matrix);
        rhs[self.incidence.row] += self.dc_value;
    }

    fn load_complex(&self, matrix: &mut Matrix, rhs: &mut [Complex64], _omega: f64) {
        self.incidence.add::<Complex64>(matrix);
        rhs[self.incidence.row] += self.ac.phasor();
    }
}

/// A current source component.
///
/// Current flows from `n+` through the source to `n-`, so it leaves node `n+`
/// and enters node `n-`. Only the right-hand side is touched.
#[derive(Debug, Clone)]
pub struct CurrentSource {
    pub name: String,
    pub nodes: [NodeId; 2], // [positive, negative]
    pub dc_value: f64,
    pub ac: AcExcitation,
}

impl CurrentSource {
    /// Create a new current source.
    pub fn new(name: String, nodes: [NodeId; 2], dc_value: f64, ac: AcExcitation) -> Self {
        Self {
            name,
            nodes,
            dc_value,
            ac,
        }
    }

    pub(crate) fn from_def(
        def: &ComponentDef,
        nodes: &[NodeId],
        _branches: &mut usize,
    ) -> Result<Box<dyn Behavior>> {
        Ok(Box::new(Self::new(
            def.name.clone(),
            [nodes[0], nodes[1]],
            def.value.unwrap_or(0.0),
            AcExcitation::from_def(def),
        )))
    }
}

impl Behavior for CurrentSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    fn setup(&mut self, _ctx: &mut SetupContext<'_>) -> Result<()> {
        Ok(())
    }

    // Slot 0 of the right-hand side belongs to ground and is never read.
    fn load_real(&self, _matrix: &mut Matrix, rhs: &mut [f64]) {
        rhs[self.nodes[0].0] -= self.dc_value;
        rhs[self.nodes[1].0] += self.dc_value;
    }

    fn load_complex(&self, _matrix: &mut Matrix, rhs: &mut [Complex64], _omega: f64) {
        let phasor = self.ac.phasor();
        rhs[self.nodes[0].0] -= phasor;
        rhs[self.nodes[1].0] += phasor;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_ac_phasor() {
        let ac = AcExcitation {
            magnitude: 2.0,
            phase: 90.0,
        };
        let p = ac.phasor();
        assert_relative_eq!(p.re, 0.0, epsilon = 1e-12);
        assert_relative_eq!(p.im, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_voltage_source_rhs() {
        let mut m = Matrix::new();
        let mut v = VoltageSource::new(
            "V1".into(),
            [NodeId(1), NodeId::GROUND],
            5.0,
            AcExcitation::default(),
            BranchId(0),
        );
        v.setup(&mut SetupContext::new(&mut m, 2)).unwrap();
        let mut rhs = vec![0.0; 3];
        v.load_real(&mut m, &mut rhs);
        assert_eq!(rhs, vec![0.0, 0.0, 5.0]);
        let h = m.find_element(1, 2).unwrap().unwrap();
        assert_eq!(m.real(h), 1.0);
    }

    #[test]
    fn test_current_source_direction() {
        let mut m = Matrix::new();
        let i = CurrentSource::new(
            "I1".into(),
            [NodeId(1), NodeId(2)],
            1e-3,
            AcExcitation::default(),
        );
        let mut rhs = vec![0.0; 3];
        i.load_real(&mut m, &mut rhs);
        assert_eq!(rhs, vec![0.0, -1e-3, 1e-3]);
        assert_eq!(m.element_count(), 0);
    }
}
