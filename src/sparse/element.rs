//! Matrix elements and the handles that address them.

use std::fmt;

use super::value::ElementValue;

/// Stable handle to a matrix element.
///
/// Handles index into the matrix's element arena and stay valid for the
/// lifetime of the matrix: elements are never removed, and row/column
/// exchanges during ordering move elements between chains without changing
/// their arena slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementHandle(pub(crate) usize);

impl ElementHandle {
    /// The shared ground (trash) element absorbing writes to row or column 0.
    pub const GROUND: ElementHandle = ElementHandle(0);

    /// Check if this handle refers to the ground element.
    pub fn is_ground(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_ground() {
            write!(f, "E<gnd>")
        } else {
            write!(f, "E{}", self.0)
        }
    }
}

/// One nonzero entry of the sparse matrix.
#[derive(Debug, Clone)]
pub(crate) struct Element {
    /// Internal row index
    pub row: usize,
    /// Internal column index
    pub col: usize,
    /// Numeric value (real or complex view)
    pub value: ElementValue,
    /// Next element in the same row (higher column), once rows are linked
    pub next_in_row: Option<ElementHandle>,
    /// Next element in the same column (higher row)
    pub next_in_col: Option<ElementHandle>,
    /// Created during elimination rather than by stamping
    pub fillin: bool,
}

impl Element {
    pub fn new(row: usize, col: usize, fillin: bool) -> Self {
        Self {
            row,
            col,
            value: ElementValue::ZERO,
            next_in_row: None,
            next_in_col: None,
            fillin,
        }
    }

    /// The trash element living in arena slot 0.
    pub fn trash() -> Self {
        Self::new(0, 0, false)
    }
}
