//! Controlled sources.

use num_complex::Complex64;

use super::{Behavior, Quad, SetupContext};
use crate::circuit::NodeId;
use crate::error::Result;
use crate::netlist::ComponentDef;
use crate::sparse::Matrix;

/// Voltage-controlled current source.
///
/// `I = gm * (V[ctrl+] - V[ctrl-])`, flowing from `out+` to `out-` through
/// the source. The stamp is not symmetric, which is what makes the matrix
/// structurally unsymmetric in general.
#[derive(Debug, Clone)]
pub struct Vccs {
    pub name: String,
    pub nodes: [NodeId; 4], // [out+, out-, ctrl+, ctrl-]
    pub transconductance: f64,
    quad: Quad,
}

impl Vccs {
    /// Create a new VCCS.
    pub fn new(name: String, nodes: [NodeId; 4], transconductance: f64) -> Self {
        Self {
            name,
            nodes,
            transconductance,
            quad: Quad::UNSET,
        }
    }

    pub(crate) fn from_def(
        def: &ComponentDef,
        nodes: &[NodeId],
        _branches: &mut usize,
    ) -> Result<Box<dyn Behavior>> {
        let gm = def.require_value("vccs")?;
        Ok(Box::new(Self::new(
            def.name.clone(),
            [nodes[0], nodes[1], nodes[2], nodes[3]],
            gm,
        )))
    }
}

impl Behavior for Vccs {
    fn name(&self) -> &str {
        &self.name
    }

    fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    fn setup(&mut self, ctx: &mut SetupContext<'_>) -> Result<()> {
        let [out_pos, out_neg, ctrl_pos, ctrl_neg] = self.nodes;
        self.quad = ctx.transfer_quad((out_pos, out_neg), (ctrl_pos, ctrl_neg))?;
        Ok(())
    }

    fn load_real(&self, matrix: &mut Matrix, _rhs: &mut [f64]) {
        self.quad.add(matrix, self.transconductance);
    }

    fn load_complex(&self, matrix: &mut Matrix, _rhs: &mut [Complex64], _omega: f64) {
        self.quad.add(matrix, Complex64::new(self.transconductance, 0.0));
    }
}
