//! # Kirchhoff Core
//!
//! A sparse direct solver for circuit equations.
//!
//! This library provides:
//! - A sparse matrix with Markowitz pivoting, built for the repeated
//!   clear / stamp / factor / solve cycle of circuit simulation
//! - Real and complex arithmetic on the same structure
//! - A stamping layer with linear components (R, C, L, sources, VCCS)
//! - A SPICE-like netlist parser and DC / single-frequency AC analyses
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`sparse`] - The sparse matrix engine: element store, index translation,
//!   ordering, factorization and solve
//! - [`netlist`] - Parser for the netlist format
//! - [`circuit`] - Circuit graph representation and validation
//! - [`components`] - Component behaviors and their stamps
//! - [`solver`] - MNA driver running DC and AC analyses
//!
//! ## Usage
//!
//! ### Matrix
//!
//! ```
//! use kirchhoff_core::Matrix;
//!
//! let mut m = Matrix::new();
//! let a = m.get_element(1, 1)?;
//! let b = m.get_element(1, 2)?;
//! let c = m.get_element(2, 1)?;
//! let d = m.get_element(2, 2)?;
//!
//! for _ in 0..2 {
//!     m.clear();
//!     m.add_real(a, 4.0);
//!     m.add_real(b, 1.0);
//!     m.add_real(c, 2.0);
//!     m.add_real(d, 3.0);
//!     m.factor()?;
//!     // Slot 0 is ground
//!     let x: Vec<f64> = m.solve(&[0.0, 6.0, 7.0])?;
//!     assert!((x[1] - 1.1).abs() < 1e-12);
//!     assert!((x[2] - 1.6).abs() < 1e-12);
//! }
//! # Ok::<(), kirchhoff_core::KirchhoffError>(())
//! ```
//!
//! ### Netlist
//!
//! ```
//! use kirchhoff_core::Network;
//!
//! let mut net = Network::from_netlist("V1 in 0 5\nR1 in out 1k\nR2 out 0 2k")?;
//! net.solve_dc()?;
//! assert!((net.node_voltage("out")? - 10.0 / 3.0).abs() < 1e-9);
//! # Ok::<(), kirchhoff_core::KirchhoffError>(())
//! ```
//!
//! ### Native CLI
//!
//! ```bash
//! RUST_LOG=kirchhoff_core=debug kirchhoff divider.cir --frequency 1k
//! ```

pub mod circuit;
pub mod components;
pub mod error;
pub mod netlist;
pub mod solver;
pub mod sparse;

// Re-export main types for convenience
pub use circuit::Circuit;
pub use error::{KirchhoffError, Result};
pub use solver::{Network, NetworkConfig};
pub use sparse::{ElementHandle, ElementValue, Matrix, MatrixConfig, Scalar};

// WASM bindings
#[cfg(feature = "wasm")]
mod wasm;

#[cfg(feature = "wasm")]
pub use wasm::WasmNetwork;
