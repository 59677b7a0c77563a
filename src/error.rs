//! Error types for the Kirchhoff equation solver.
//!
//! This module provides a unified error type [`KirchhoffError`] that covers
//! all error conditions that can occur while building and factoring the sparse
//! matrix, stamping a network, and parsing netlists.

use thiserror::Error;

/// Result type alias using [`KirchhoffError`].
pub type Result<T> = std::result::Result<T, KirchhoffError>;

/// Unified error type for all Kirchhoff operations.
#[derive(Error, Debug)]
pub enum KirchhoffError {
    // ============ Matrix Errors ============
    /// Negative row or column passed to the matrix
    #[error("Invalid matrix index ({row}, {col}): indices must be non-negative")]
    InvalidIndex { row: isize, col: isize },

    /// No acceptable pivot could be found during factorization
    #[error("Singular matrix at row {row}, column {col} - circuit may have a floating node or a voltage loop")]
    SingularMatrix { row: usize, col: usize },

    /// Solve requested before a successful factorization
    #[error("Matrix has not been factored")]
    NotFactored,

    /// Complex mode was switched without clearing the matrix
    #[error("Matrix mode changed since the last clear; clear the matrix before factoring")]
    StaleMode,

    /// Vector type does not match the matrix mode
    #[error("Vector does not match matrix mode (matrix is {})", if *complex { "complex" } else { "real" })]
    ModeMismatch { complex: bool },

    /// Vector is too short for the matrix
    #[error("Vector length {actual} is too short, expected at least {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    // ============ Netlist Errors ============
    /// Error during lexical analysis
    #[error("Lexer error at line {line}, column {column}: {message}")]
    LexerError {
        line: usize,
        column: usize,
        message: String,
    },

    /// Error during parsing
    #[error("Parse error at line {line}: {message}")]
    ParseError { line: usize, message: String },

    /// Invalid component definition
    #[error("Invalid component '{name}' at line {line}: {message}")]
    InvalidComponent {
        name: String,
        line: usize,
        message: String,
    },

    /// No factory registered for a component type
    #[error("Unknown component type '{component_type}' at line {line}")]
    UnknownComponentType { component_type: String, line: usize },

    /// Duplicate component name
    #[error("Duplicate component name '{name}'")]
    DuplicateComponent { name: String },

    /// Node not found in network
    #[error("Node '{node}' not found in network")]
    NodeNotFound { node: String },

    /// Component not found in network
    #[error("Component '{name}' not found in network")]
    ComponentNotFound { name: String },

    /// Network cannot be solved as described
    #[error("Invalid network topology: {message}")]
    InvalidTopology { message: String },

    /// Result requested before any analysis ran
    #[error("No {analysis} solution available; run the analysis first")]
    NoSolution { analysis: &'static str },

    // ============ I/O Errors ============
    /// Error reading netlist file
    #[error("Failed to read netlist file '{path}': {source}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl KirchhoffError {
    /// Create an invalid index error
    pub fn invalid_index(row: isize, col: isize) -> Self {
        Self::InvalidIndex { row, col }
    }

    /// Create a singular matrix error
    pub fn singular(row: usize, col: usize) -> Self {
        Self::SingularMatrix { row, col }
    }

    /// Create a lexer error
    pub fn lexer(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self::LexerError {
            line,
            column,
            message: message.into(),
        }
    }

    /// Create a parse error
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::ParseError {
            line,
            message: message.into(),
        }
    }

    /// Create an invalid component error
    pub fn invalid_component(name: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        Self::InvalidComponent {
            name: name.into(),
            line,
            message: message.into(),
        }
    }

    /// Whether the error came from numerical singularity, which an outer
    /// simulation loop may choose to recover from.
    pub fn is_singular(&self) -> bool {
        matches!(self, Self::SingularMatrix { .. })
    }
}
