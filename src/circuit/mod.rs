//! Circuit graph representation and validation.
//!
//! This module provides the internal representation of a network after
//! parsing. The [`Circuit`] struct holds all component behaviors, nodes, and
//! their numbering in a form suitable for stamping.

mod graph;
mod types;
mod validate;

pub use graph::Circuit;
pub use types::*;
pub use validate::validate_circuit;
