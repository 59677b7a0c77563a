//! Main analysis interface.

use std::f64::consts::TAU;

use num_complex::Complex64;

use crate::circuit::{validate_circuit, BranchId, Circuit, NodeId, VarIndex};
use crate::components::SetupContext;
use crate::error::{KirchhoffError, Result};
use crate::netlist;
use crate::sparse::{Matrix, MatrixConfig, DEFAULT_ABS_THRESHOLD, DEFAULT_REL_THRESHOLD};

/// Configuration for a network.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Relative pivot threshold passed to the matrix.
    pub rel_threshold: f64,
    /// Absolute pivot threshold passed to the matrix.
    pub abs_threshold: f64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            rel_threshold: DEFAULT_REL_THRESHOLD,
            abs_threshold: DEFAULT_ABS_THRESHOLD,
        }
    }
}

impl NetworkConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the relative pivot threshold.
    ///
    /// Larger values pivot more for accuracy, smaller ones keep the factors
    /// sparser.
    /// - 1e-3 (default): good for typical circuit matrices
    /// - 0.1 and above: close to partial pivoting
    pub fn with_rel_threshold(mut self, rel_threshold: f64) -> Self {
        self.rel_threshold = rel_threshold;
        self
    }

    /// Set the absolute pivot threshold.
    pub fn with_abs_threshold(mut self, abs_threshold: f64) -> Self {
        self.abs_threshold = abs_threshold;
        self
    }

    fn matrix_config(&self) -> MatrixConfig {
        MatrixConfig::new()
            .with_rel_threshold(self.rel_threshold)
            .with_abs_threshold(self.abs_threshold)
    }
}

/// Result of a small-signal analysis at one frequency.
#[derive(Debug, Clone)]
pub struct AcSolution {
    /// Frequency in Hz
    pub frequency: f64,
    /// Phasors indexed by external unknown index
    pub values: Vec<Complex64>,
}

/// A circuit bound to its sparse matrix.
///
/// Owns the circuit, the matrix and the right-hand sides. Each analysis runs
/// clear, stamp, factor and solve on the same matrix, so the structure built
/// at construction and the pivot order found by the first factorization are
/// reused by every later solve.
pub struct Network {
    circuit: Circuit,
    matrix: Matrix,
    rhs_real: Vec<f64>,
    rhs_complex: Vec<Complex64>,
    dc: Option<Vec<f64>>,
    ac: Option<AcSolution>,
}

impl Network {
    /// Bind a circuit with default configuration.
    pub fn new(circuit: Circuit) -> Result<Self> {
        Self::with_config(circuit, NetworkConfig::default())
    }

    /// Bind a circuit with custom configuration.
    pub fn with_config(mut circuit: Circuit, config: NetworkConfig) -> Result<Self> {
        let mut matrix = Matrix::with_config(config.matrix_config());

        let mut ctx = SetupContext::new(&mut matrix, circuit.num_nodes);
        for component in &mut circuit.components {
            component.setup(&mut ctx)?;
        }
        // Every node gets a diagonal, so a node no element conductance reaches
        // still shows up in the factorization and fails there as singular.
        for node in 1..circuit.num_nodes {
            let voltage = VarIndex::Voltage(NodeId(node));
            ctx.element(voltage, voltage)?;
        }

        let len = circuit.matrix_size() + 1;
        tracing::debug!(
            unknowns = circuit.matrix_size(),
            elements = matrix.element_count(),
            "network set up"
        );

        Ok(Self {
            circuit,
            matrix,
            rhs_real: vec![0.0; len],
            rhs_complex: vec![Complex64::new(0.0, 0.0); len],
            dc: None,
            ac: None,
        })
    }

    /// Parse, build and validate a netlist, then bind it.
    pub fn from_netlist(text: &str) -> Result<Self> {
        Self::from_netlist_with_config(text, NetworkConfig::default())
    }

    /// [`Network::from_netlist`] with custom configuration.
    pub fn from_netlist_with_config(text: &str, config: NetworkConfig) -> Result<Self> {
        let circuit = Circuit::from_ast(netlist::parse(text)?)?;
        validate_circuit(&circuit)?;
        Self::with_config(circuit, config)
    }

    /// The circuit being analysed.
    pub fn circuit(&self) -> &Circuit {
        &self.circuit
    }

    /// The underlying matrix.
    pub fn matrix(&self) -> &Matrix {
        &self.matrix
    }

    /// Solve the DC operating point.
    ///
    /// Capacitors are open and inductors are shorts. Returns the solution
    /// indexed by external unknown index, slot 0 being ground.
    pub fn solve_dc(&mut self) -> Result<&[f64]> {
        self.matrix.set_complex_mode(false);
        self.matrix.clear();
        self.rhs_real.fill(0.0);

        for component in &self.circuit.components {
            component.load_real(&mut self.matrix, &mut self.rhs_real);
        }

        self.factor()?;
        let solution = self.matrix.solve(&self.rhs_real)?;
        tracing::debug!(fill_ins = self.matrix.fill_in_count(), "dc solved");
        Ok(self.dc.insert(solution).as_slice())
    }

    /// Solve the small-signal response at `frequency` Hz.
    pub fn solve_ac(&mut self, frequency: f64) -> Result<&[Complex64]> {
        let omega = TAU * frequency;
        self.matrix.set_complex_mode(true);
        self.matrix.clear();
        self.rhs_complex.fill(Complex64::new(0.0, 0.0));

        for component in &self.circuit.components {
            component.load_complex(&mut self.matrix, &mut self.rhs_complex, omega);
        }

        self.factor()?;
        let values = self.matrix.solve(&self.rhs_complex)?;
        tracing::debug!(frequency, fill_ins = self.matrix.fill_in_count(), "ac solved");
        let solution = self.ac.insert(AcSolution { frequency, values });
        Ok(solution.values.as_slice())
    }

    fn factor(&mut self) -> Result<()> {
        self.matrix.factor().map_err(|err| {
            if let KirchhoffError::SingularMatrix { row, col } = err {
                tracing::warn!(
                    row = %self.unknown_name(row),
                    col = %self.unknown_name(col),
                    "network matrix is singular"
                );
            }
            err
        })
    }

    /// Human-readable name of an external unknown: a node name, or
    /// `I(<component>)` for a branch current.
    pub fn unknown_name(&self, index: usize) -> String {
        if index < self.circuit.num_nodes {
            return self.circuit.node_names[index].clone();
        }
        let branch = BranchId(index - self.circuit.num_nodes);
        self.circuit
            .components
            .iter()
            .find(|c| c.branch() == Some(branch))
            .map(|c| format!("I({})", c.name()))
            .unwrap_or_else(|| format!("#{}", index))
    }

    /// Last DC solution, if any.
    pub fn dc_solution(&self) -> Option<&[f64]> {
        self.dc.as_deref()
    }

    /// Last AC solution, if any.
    pub fn ac_solution(&self) -> Option<&AcSolution> {
        self.ac.as_ref()
    }

    fn node_index(&self, node_name: &str) -> Result<usize> {
        let node = self
            .circuit
            .find_node(node_name)
            .ok_or_else(|| KirchhoffError::NodeNotFound {
                node: node_name.to_string(),
            })?;
        Ok(self.circuit.index(VarIndex::Voltage(node)))
    }

    fn branch_index(&self, component_name: &str) -> Result<usize> {
        let id = self.circuit.find_component(component_name).ok_or_else(|| {
            KirchhoffError::ComponentNotFound {
                name: component_name.to_string(),
            }
        })?;
        let branch = self.circuit.component(id).branch().ok_or_else(|| {
            KirchhoffError::ComponentNotFound {
                name: format!("{} (no branch current)", component_name),
            }
        })?;
        Ok(self.circuit.index(VarIndex::Current(branch)))
    }

    /// DC voltage at a named node.
    pub fn node_voltage(&self, node_name: &str) -> Result<f64> {
        let index = self.node_index(node_name)?;
        let dc = self.dc.as_ref().ok_or(KirchhoffError::NoSolution { analysis: "DC" })?;
        Ok(dc[index])
    }

    /// AC phasor at a named node.
    pub fn node_phasor(&self, node_name: &str) -> Result<Complex64> {
        let index = self.node_index(node_name)?;
        let ac = self.ac.as_ref().ok_or(KirchhoffError::NoSolution { analysis: "AC" })?;
        Ok(ac.values[index])
    }

    /// DC current through a voltage source or inductor, flowing from its
    /// positive terminal through the component to its negative terminal.
    pub fn branch_current(&self, component_name: &str) -> Result<f64> {
        let index = self.branch_index(component_name)?;
        let dc = self.dc.as_ref().ok_or(KirchhoffError::NoSolution { analysis: "DC" })?;
        Ok(dc[index])
    }

    /// AC current through a voltage source or inductor.
    pub fn branch_phasor(&self, component_name: &str) -> Result<Complex64> {
        let index = self.branch_index(component_name)?;
        let ac = self.ac.as_ref().ok_or(KirchhoffError::NoSolution { analysis: "AC" })?;
        Ok(ac.values[index])
    }
}
