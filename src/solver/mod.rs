//! MNA (Modified Nodal Analysis) driver.
//!
//! This module ties a [`Circuit`](crate::circuit::Circuit) to the sparse
//! matrix and runs the linear analyses.
//!
//! ## Modified Nodal Analysis
//!
//! MNA assembles a system of equations Ax = z where:
//! - x contains node voltages and branch currents
//! - A is the conductance/coefficient matrix
//! - z is the source vector
//!
//! The matrix structure is:
//! ```text
//! [ G   B ] [ v ]   [ i ]
//! [ C   D ] [ j ] = [ e ]
//! ```
//!
//! where:
//! - G is the conductance matrix (node equations)
//! - B, C connect voltage sources and inductors to nodes
//! - D holds `-jωL` for inductors and is zero otherwise
//! - v is the vector of node voltages
//! - j is the vector of branch currents
//! - i is the sum of current sources into each node
//! - e is the vector of voltage source values
//!
//! Node voltages use the node number as their matrix index and branch
//! currents follow the last node, so the ground row and column fall on the
//! matrix's trash element and never reach the factorization.

mod network;

pub use network::{AcSolution, Network, NetworkConfig};
