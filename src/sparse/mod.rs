//! Sparse matrix engine.
//!
//! This module provides a general sparse direct solver built for the
//! assemble / factor / solve cycle of circuit simulation.
//!
//! ## Structure
//!
//! Elements live in an arena and are linked into per-column chains (ordered
//! by row) and, once the matrix is first factored, per-row chains (ordered by
//! column). Diagonal elements are additionally reachable through a diagonal
//! table. Callers address the matrix with *external* indices (node and branch
//! numbers) which are translated to dense *internal* indices on first use.
//! Index 0 is the reference node: every access touching row or column 0 lands
//! on a shared trash element that never takes part in factorization.
//!
//! ```text
//!            col 1        col 2        col 3
//! row 1  [ (1,1) ]--->[ (1,2) ]
//!            |            |
//! row 2  [ (2,1) ]--->[ (2,2) ]--->[ (2,3) ]
//!                         |            |
//! row 3               [ (3,2) ]--->[ (3,3) ]
//! ```
//!
//! ## Factorization
//!
//! Pivots are chosen with the Markowitz criterion under a relative threshold
//! test. Once a pivot order is known it is reused by later factorizations
//! until the structure changes, which keeps Newton and time-step iterations
//! cheap: only the values change between calls, not the elimination order.

mod build;
mod element;
mod factor;
mod solve;
mod translate;
mod value;

use std::fmt;

use num_complex::Complex64;

pub use element::ElementHandle;
pub use value::{ElementValue, Scalar};

use crate::error::{KirchhoffError, Result};
use element::Element;
use factor::Markowitz;
use translate::Translation;

/// Growth factor applied when per-index arrays must be reallocated.
pub const EXPANSION_FACTOR: f64 = 1.5;

/// Default relative pivot threshold.
pub const DEFAULT_REL_THRESHOLD: f64 = 1e-3;

/// Default absolute pivot threshold.
pub const DEFAULT_ABS_THRESHOLD: f64 = 0.0;

/// Default number of internal indices allocated up front.
pub const DEFAULT_INITIAL_SIZE: usize = 8;

/// Configuration for a sparse matrix.
#[derive(Debug, Clone)]
pub struct MatrixConfig {
    /// A pivot candidate must be at least this fraction of the largest
    /// remaining entry in its column.
    pub rel_threshold: f64,
    /// A pivot candidate must be larger than this magnitude.
    pub abs_threshold: f64,
    /// Start in complex mode.
    pub complex: bool,
    /// Initial allocated size of the per-index arrays.
    pub initial_size: usize,
}

impl Default for MatrixConfig {
    fn default() -> Self {
        Self {
            rel_threshold: DEFAULT_REL_THRESHOLD,
            abs_threshold: DEFAULT_ABS_THRESHOLD,
            complex: false,
            initial_size: DEFAULT_INITIAL_SIZE,
        }
    }
}

impl MatrixConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the relative pivot threshold.
    ///
    /// Values close to 1 approach partial pivoting and favor accuracy; small
    /// values favor sparsity. Values outside `(0, 1]` are replaced by
    /// [`DEFAULT_REL_THRESHOLD`].
    pub fn with_rel_threshold(mut self, rel_threshold: f64) -> Self {
        self.rel_threshold = if rel_threshold <= 0.0 || rel_threshold > 1.0 {
            DEFAULT_REL_THRESHOLD
        } else {
            rel_threshold
        };
        self
    }

    /// Set the absolute pivot threshold.
    pub fn with_abs_threshold(mut self, abs_threshold: f64) -> Self {
        self.abs_threshold = abs_threshold.max(0.0);
        self
    }

    /// Start the matrix in complex mode.
    pub fn with_complex(mut self, complex: bool) -> Self {
        self.complex = complex;
        self
    }

    /// Set the initial allocation.
    pub fn with_initial_size(mut self, initial_size: usize) -> Self {
        self.initial_size = initial_size.max(1);
        self
    }
}

/// A sparse matrix that can be stamped, factored and solved repeatedly.
#[derive(Debug, Clone)]
pub struct Matrix {
    /// Element arena; slot 0 is the trash element
    elements: Vec<Element>,
    /// Head of each row chain (internal index)
    first_in_row: Vec<Option<ElementHandle>>,
    /// Head of each column chain (internal index)
    first_in_col: Vec<Option<ElementHandle>>,
    /// Diagonal element of each internal row
    diag: Vec<Option<ElementHandle>>,
    /// External/internal index maps
    translation: Translation,
    /// Largest internal index in use
    size: usize,
    /// Capacity of the per-index arrays
    allocated_size: usize,
    rel_threshold: f64,
    abs_threshold: f64,
    complex: bool,
    /// Mode recorded at the last clear
    previous_complex: bool,
    factored: bool,
    rows_linked: bool,
    needs_ordering: bool,
    /// Elements created by stamping
    element_count: usize,
    /// Elements created by elimination
    fill_in_count: usize,
    /// External (row, col) of the last singularity
    singular: Option<(usize, usize)>,
    /// Markowitz work vectors, dropped on growth
    markowitz: Option<Markowitz>,
    /// Largest stamped magnitude per internal column, taken at the start of
    /// each factorization and exchanged along with the columns
    column_scale: Vec<f64>,
}

impl Default for Matrix {
    fn default() -> Self {
        Self::new()
    }
}

impl Matrix {
    /// Create an empty real matrix with default configuration.
    pub fn new() -> Self {
        Self::with_config(MatrixConfig::default())
    }

    /// Create an empty complex matrix with default configuration.
    pub fn new_complex() -> Self {
        Self::with_config(MatrixConfig::default().with_complex(true))
    }

    /// Create an empty matrix with custom configuration.
    pub fn with_config(config: MatrixConfig) -> Self {
        let allocated = config.initial_size.max(1);
        Self {
            elements: vec![Element::trash()],
            first_in_row: vec![None; allocated + 1],
            first_in_col: vec![None; allocated + 1],
            diag: vec![None; allocated + 1],
            translation: Translation::new(allocated),
            size: 0,
            allocated_size: allocated,
            rel_threshold: config.rel_threshold,
            abs_threshold: config.abs_threshold,
            complex: config.complex,
            previous_complex: config.complex,
            factored: false,
            rows_linked: false,
            needs_ordering: true,
            element_count: 0,
            fill_in_count: 0,
            singular: None,
            markowitz: None,
            column_scale: Vec::new(),
        }
    }

    /// Number of internal indices in use.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Capacity of the per-index arrays.
    pub fn allocated_size(&self) -> usize {
        self.allocated_size
    }

    /// Largest external index mapped into the matrix.
    pub fn external_size(&self) -> usize {
        self.translation.external_size()
    }

    /// Minimum length of right-hand side and solution vectors.
    ///
    /// Vectors are indexed by external index, with slot 0 for ground.
    pub fn vector_len(&self) -> usize {
        self.external_size() + 1
    }

    /// Whether the matrix is in complex mode.
    pub fn is_complex(&self) -> bool {
        self.complex
    }

    /// Switch between real and complex mode.
    ///
    /// Existing values are not reinterpreted; call [`Matrix::clear`] before
    /// stamping in the new mode. Factoring without that clear fails with
    /// [`KirchhoffError::StaleMode`].
    pub fn set_complex_mode(&mut self, complex: bool) {
        if self.complex != complex {
            tracing::debug!(complex, "matrix mode switched");
            self.complex = complex;
            self.factored = false;
        }
    }

    /// Whether the matrix holds a valid factorization.
    pub fn is_factored(&self) -> bool {
        self.factored
    }

    /// Whether row chains have been built.
    pub fn rows_linked(&self) -> bool {
        self.rows_linked
    }

    /// Whether the next factorization must search for a new pivot order.
    pub fn needs_ordering(&self) -> bool {
        self.needs_ordering
    }

    /// Force the next factorization to recompute the pivot order.
    pub fn reorder(&mut self) {
        self.needs_ordering = true;
    }

    /// Number of stamped elements.
    pub fn element_count(&self) -> usize {
        self.element_count
    }

    /// Number of fill-in elements created by elimination.
    pub fn fill_in_count(&self) -> usize {
        self.fill_in_count
    }

    /// External (row, col) where the last factorization found no pivot.
    pub fn singular_location(&self) -> Option<(usize, usize)> {
        self.singular
    }

    /// Relative pivot threshold in use.
    pub fn rel_threshold(&self) -> f64 {
        self.rel_threshold
    }

    /// Absolute pivot threshold in use.
    pub fn abs_threshold(&self) -> f64 {
        self.abs_threshold
    }

    /// External (row, col) of an element. The ground element reports (0, 0).
    pub fn location(&self, handle: ElementHandle) -> (usize, usize) {
        if handle.is_ground() {
            return (0, 0);
        }
        let element = &self.elements[handle.0];
        (
            self.translation.row_to_external(element.row),
            self.translation.col_to_external(element.col),
        )
    }

    /// Determinant of the factored matrix.
    ///
    /// The type parameter selects the real or complex view and must match the
    /// matrix mode.
    pub fn determinant<T: Scalar>(&self) -> Result<T> {
        if !self.factored {
            return Err(KirchhoffError::NotFactored);
        }
        if T::COMPLEX != self.complex {
            return Err(KirchhoffError::ModeMismatch {
                complex: self.complex,
            });
        }

        let mut det = T::one();
        for step in 1..=self.size {
            let pivot = self.diag[step].ok_or(KirchhoffError::NotFactored)?;
            // Diagonals hold reciprocal pivots after factoring
            det *= T::one() / T::load(&self.elements[pivot.0].value);
        }

        if self.translation.permutation_is_odd(self.size) {
            det = -det;
        }
        Ok(det)
    }

    /// Element at an external position, or `None` if no element exists.
    fn external_element(&self, row: usize, col: usize) -> Option<&Element> {
        let r = self.translation.row_to_internal(row)?;
        let c = self.translation.col_to_internal(col)?;
        self.locate_in_col(r, c)
            .0
            .map(|handle| &self.elements[handle.0])
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let externals: Vec<usize> = (1..=self.external_size())
            .filter(|&ext| self.translation.row_to_internal(ext).is_some())
            .collect();

        writeln!(
            f,
            "{} matrix, size {}, {} elements, {} fill-ins{}",
            if self.complex { "complex" } else { "real" },
            self.size,
            self.element_count,
            self.fill_in_count,
            if self.factored { " (factored)" } else { "" },
        )?;

        write!(f, "{:>6}", "")?;
        for &col in &externals {
            write!(f, " {:>14}", col)?;
        }
        writeln!(f)?;

        for &row in &externals {
            write!(f, "{:>6}", row)?;
            for &col in &externals {
                // Fill-ins are marked with a trailing `*`
                match self.external_element(row, col) {
                    Some(element) => {
                        let text = if self.complex {
                            let c: Complex64 = element.value.complex();
                            format!("{:.3e}{:+.3e}j", c.re, c.im)
                        } else {
                            format!("{:.6e}", element.value.real())
                        };
                        let mark = if element.fillin { "*" } else { " " };
                        write!(f, " {:>13}{}", text, mark)?
                    }
                    None => write!(f, " {:>13} ", ".")?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
