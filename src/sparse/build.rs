//! Element store, structural growth and clearing.

use super::element::{Element, ElementHandle};
use super::value::{ElementValue, Scalar};
use super::{Matrix, EXPANSION_FACTOR};
use crate::error::{KirchhoffError, Result};
use num_complex::Complex64;

impl Matrix {
    /// Get the element at external (row, col), creating it if necessary.
    ///
    /// Repeated calls with the same pair return the same handle. Any access
    /// touching row or column 0 returns the shared ground element.
    pub fn get_element(&mut self, row: isize, col: isize) -> Result<ElementHandle> {
        if row < 0 || col < 0 {
            return Err(KirchhoffError::invalid_index(row, col));
        }
        if row == 0 || col == 0 {
            return Ok(ElementHandle::GROUND);
        }

        let (row, col) = self.translate(row, col)?;
        if row == col {
            if let Some(diag) = self.diag[row] {
                return Ok(diag);
            }
        }
        Ok(self.find_or_create(row, col, false))
    }

    /// Look up the element at external (row, col) without creating anything.
    pub fn find_element(&self, row: isize, col: isize) -> Result<Option<ElementHandle>> {
        if row < 0 || col < 0 {
            return Err(KirchhoffError::invalid_index(row, col));
        }
        if row == 0 || col == 0 {
            return Ok(Some(ElementHandle::GROUND));
        }

        let internal = (
            self.translation.row_to_internal(row as usize),
            self.translation.col_to_internal(col as usize),
        );
        match internal {
            (Some(r), Some(c)) => Ok(self.locate_in_col(r, c).0),
            _ => Ok(None),
        }
    }

    /// Value of an element.
    ///
    /// # Panics
    /// Panics if the handle was not produced by this matrix.
    pub fn value(&self, handle: ElementHandle) -> ElementValue {
        self.elements[handle.0].value
    }

    /// Real view of an element.
    pub fn real(&self, handle: ElementHandle) -> f64 {
        self.elements[handle.0].value.real()
    }

    /// Complex view of an element.
    pub fn complex(&self, handle: ElementHandle) -> Complex64 {
        self.elements[handle.0].value.complex()
    }

    /// Add to an element through the real or complex view.
    pub fn add<T: Scalar>(&mut self, handle: ElementHandle, value: T) {
        value.accumulate(&mut self.elements[handle.0].value);
    }

    /// Add a real contribution to an element.
    pub fn add_real(&mut self, handle: ElementHandle, value: f64) {
        self.add(handle, value);
    }

    /// Add a complex contribution to an element.
    pub fn add_complex(&mut self, handle: ElementHandle, value: Complex64) {
        self.add(handle, value);
    }

    /// Overwrite an element through the real or complex view.
    pub fn set<T: Scalar>(&mut self, handle: ElementHandle, value: T) {
        value.store(&mut self.elements[handle.0].value);
    }

    /// Overwrite the real lane of an element.
    pub fn set_real(&mut self, handle: ElementHandle, value: f64) {
        self.set(handle, value);
    }

    /// Overwrite both lanes of an element.
    pub fn set_complex(&mut self, handle: ElementHandle, value: Complex64) {
        self.set(handle, value);
    }

    /// Zero every element while keeping the structure.
    ///
    /// Both lanes are cleared so that nothing stale survives a switch between
    /// real and complex mode. Index maps, chains and counters are untouched.
    pub fn clear(&mut self) {
        if self.previous_complex != self.complex {
            tracing::debug!(complex = self.complex, "clearing across mode change");
        }

        for element in &mut self.elements {
            element.value.clear();
        }

        self.factored = false;
        self.singular = None;
        self.previous_complex = self.complex;
    }

    /// Grow the logical size to at least `new_size`.
    ///
    /// New internal indices are bound to the lowest unused external indices,
    /// so every internal index in `1..=size` keeps an external counterpart.
    /// The size never shrinks.
    pub fn enlarge(&mut self, new_size: usize) {
        let old_size = self.size;
        if new_size <= old_size {
            return;
        }
        self.grow_frame(new_size);
        self.bind_unassigned(old_size, new_size);
    }

    /// Grow the matrix frame and drop everything derived from the old
    /// structure.
    pub(crate) fn grow_frame(&mut self, new_size: usize) {
        if new_size <= self.size {
            return;
        }
        self.size = new_size;
        self.markowitz = None;
        self.needs_ordering = true;
        self.factored = false;

        let old_allocated = self.allocated_size;
        if new_size <= old_allocated {
            return;
        }

        let allocated = new_size.max((EXPANSION_FACTOR * old_allocated as f64) as usize);
        self.allocated_size = allocated;
        self.first_in_row.resize(allocated + 1, None);
        self.first_in_col.resize(allocated + 1, None);
        self.diag.resize(allocated + 1, None);
        self.translation.reserve_internal(allocated);

        tracing::debug!(size = new_size, allocated, "matrix frame enlarged");
    }

    /// Search column `col` for row `row`.
    ///
    /// Returns the element if present, plus the last element above the
    /// position where it would be inserted.
    pub(crate) fn locate_in_col(
        &self,
        row: usize,
        col: usize,
    ) -> (Option<ElementHandle>, Option<ElementHandle>) {
        let mut last = None;
        let mut current = self.first_in_col[col];
        while let Some(handle) = current {
            let element = &self.elements[handle.0];
            if element.row < row {
                last = Some(handle);
                current = element.next_in_col;
            } else if element.row == row {
                return (Some(handle), last);
            } else {
                break;
            }
        }
        (None, last)
    }

    pub(crate) fn find_or_create(&mut self, row: usize, col: usize, fillin: bool) -> ElementHandle {
        match self.locate_in_col(row, col) {
            (Some(handle), _) => handle,
            (None, last) => self.create_element(row, col, last, fillin),
        }
    }

    /// Allocate a zeroed element and splice it in after `last` in its column
    /// (at the head when `last` is `None`), and into its row when rows are
    /// linked.
    pub(crate) fn create_element(
        &mut self,
        row: usize,
        col: usize,
        last: Option<ElementHandle>,
        fillin: bool,
    ) -> ElementHandle {
        let handle = ElementHandle(self.elements.len());
        let mut element = Element::new(row, col, fillin);

        match last {
            Some(prev) => {
                element.next_in_col = self.elements[prev.0].next_in_col;
                self.elements[prev.0].next_in_col = Some(handle);
            }
            None => {
                element.next_in_col = self.first_in_col[col];
                self.first_in_col[col] = Some(handle);
            }
        }
        self.elements.push(element);

        if row == col {
            self.diag[row] = Some(handle);
        }
        if self.rows_linked {
            self.link_into_row(handle);
        }

        if fillin {
            self.fill_in_count += 1;
        } else {
            self.element_count += 1;
        }
        self.needs_ordering = true;
        handle
    }

    /// Build the row chains from the column chains.
    pub(crate) fn link_rows(&mut self) {
        for head in self.first_in_row.iter_mut() {
            *head = None;
        }
        for col in (1..=self.size).rev() {
            let mut current = self.first_in_col[col];
            while let Some(handle) = current {
                let row = self.elements[handle.0].row;
                self.elements[handle.0].next_in_row = self.first_in_row[row];
                self.first_in_row[row] = Some(handle);
                current = self.elements[handle.0].next_in_col;
            }
        }
        self.rows_linked = true;
        tracing::debug!(size = self.size, "row links built");
    }

    /// Insert an element into its row chain in column order.
    pub(crate) fn link_into_row(&mut self, handle: ElementHandle) {
        let (row, col) = (self.elements[handle.0].row, self.elements[handle.0].col);
        let mut prev = None;
        let mut current = self.first_in_row[row];
        while let Some(h) = current {
            if self.elements[h.0].col >= col {
                break;
            }
            prev = Some(h);
            current = self.elements[h.0].next_in_row;
        }
        self.elements[handle.0].next_in_row = current;
        match prev {
            Some(p) => self.elements[p.0].next_in_row = Some(handle),
            None => self.first_in_row[row] = Some(handle),
        }
    }

    /// Insert an element into its column chain in row order.
    pub(crate) fn link_into_col(&mut self, handle: ElementHandle) {
        let (row, col) = (self.elements[handle.0].row, self.elements[handle.0].col);
        let mut prev = None;
        let mut current = self.first_in_col[col];
        while let Some(h) = current {
            if self.elements[h.0].row >= row {
                break;
            }
            prev = Some(h);
            current = self.elements[h.0].next_in_col;
        }
        self.elements[handle.0].next_in_col = current;
        match prev {
            Some(p) => self.elements[p.0].next_in_col = Some(handle),
            None => self.first_in_col[col] = Some(handle),
        }
    }

    /// Remove an element from its row chain.
    pub(crate) fn unlink_from_row(&mut self, handle: ElementHandle) {
        let row = self.elements[handle.0].row;
        let next = self.elements[handle.0].next_in_row;
        if self.first_in_row[row] == Some(handle) {
            self.first_in_row[row] = next;
        } else {
            let mut current = self.first_in_row[row];
            while let Some(h) = current {
                if self.elements[h.0].next_in_row == Some(handle) {
                    self.elements[h.0].next_in_row = next;
                    break;
                }
                current = self.elements[h.0].next_in_row;
            }
        }
        self.elements[handle.0].next_in_row = None;
    }

    /// Remove an element from its column chain.
    pub(crate) fn unlink_from_col(&mut self, handle: ElementHandle) {
        let col = self.elements[handle.0].col;
        let next = self.elements[handle.0].next_in_col;
        if self.first_in_col[col] == Some(handle) {
            self.first_in_col[col] = next;
        } else {
            let mut current = self.first_in_col[col];
            while let Some(h) = current {
                if self.elements[h.0].next_in_col == Some(handle) {
                    self.elements[h.0].next_in_col = next;
                    break;
                }
                current = self.elements[h.0].next_in_col;
            }
        }
        self.elements[handle.0].next_in_col = None;
    }

    /// Elements of an internal row, in column order.
    pub(crate) fn row_handles(&self, row: usize) -> Vec<ElementHandle> {
        let mut handles = Vec::new();
        let mut current = self.first_in_row[row];
        while let Some(h) = current {
            handles.push(h);
            current = self.elements[h.0].next_in_row;
        }
        handles
    }

    /// Elements of an internal column, in row order.
    pub(crate) fn col_handles(&self, col: usize) -> Vec<ElementHandle> {
        let mut handles = Vec::new();
        let mut current = self.first_in_col[col];
        while let Some(h) = current {
            handles.push(h);
            current = self.elements[h.0].next_in_col;
        }
        handles
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Check chain ordering, chain membership and the diagonal table.
    pub(crate) fn assert_structure(m: &Matrix) {
        let mut seen_in_cols = 0;
        for col in 1..=m.size {
            let rows: Vec<usize> = m.col_handles(col).iter().map(|h| m.elements[h.0].row).collect();
            assert!(rows.windows(2).all(|w| w[0] < w[1]), "column {} out of order: {:?}", col, rows);
            for h in m.col_handles(col) {
                assert_eq!(m.elements[h.0].col, col);
            }
            seen_in_cols += rows.len();
        }
        assert_eq!(seen_in_cols, m.elements.len() - 1);

        if m.rows_linked {
            let mut seen_in_rows = 0;
            for row in 1..=m.size {
                let cols: Vec<usize> = m.row_handles(row).iter().map(|h| m.elements[h.0].col).collect();
                assert!(cols.windows(2).all(|w| w[0] < w[1]), "row {} out of order: {:?}", row, cols);
                for h in m.row_handles(row) {
                    assert_eq!(m.elements[h.0].row, row);
                }
                seen_in_rows += cols.len();
            }
            assert_eq!(seen_in_rows, m.elements.len() - 1);
        }

        for i in 1..=m.size {
            let expected = m.locate_in_col(i, i).0;
            assert_eq!(m.diag[i], expected, "diagonal table stale at {}", i);
        }

        let marked = m.elements[1..].iter().filter(|e| e.fillin).count();
        assert_eq!(marked, m.fill_in_count);
    }

    #[test]
    fn test_get_element_is_idempotent() {
        let mut m = Matrix::new();
        let a = m.get_element(2, 3).unwrap();
        let b = m.get_element(2, 3).unwrap();
        let d1 = m.get_element(4, 4).unwrap();
        let d2 = m.get_element(4, 4).unwrap();
        assert_eq!(a, b);
        assert_eq!(d1, d2);
        assert_ne!(a, d1);
        assert_eq!(m.element_count(), 2);
    }

    #[test]
    fn test_ground_absorbs_writes() {
        let mut m = Matrix::new();
        let g1 = m.get_element(0, 3).unwrap();
        let g2 = m.get_element(5, 0).unwrap();
        assert!(g1.is_ground());
        assert_eq!(g1, g2);
        m.add_real(g1, 42.0);
        assert_eq!(m.real(g2), 42.0);
        assert_eq!(m.element_count(), 0);
        assert_eq!(m.size(), 0);
    }

    #[test]
    fn test_negative_index_rejected() {
        let mut m = Matrix::new();
        assert!(matches!(
            m.get_element(1, -2),
            Err(KirchhoffError::InvalidIndex { row: 1, col: -2 })
        ));
        assert!(m.find_element(-1, 0).is_err());
    }

    #[test]
    fn test_find_element_does_not_create() {
        let mut m = Matrix::new();
        assert_eq!(m.find_element(1, 1).unwrap(), None);
        let h = m.get_element(1, 2).unwrap();
        assert_eq!(m.find_element(1, 2).unwrap(), Some(h));
        assert_eq!(m.find_element(2, 1).unwrap(), None);
        assert_eq!(m.element_count(), 1);
    }

    #[test]
    fn test_column_chains_stay_ordered() {
        let mut m = Matrix::new();
        for &(r, c) in &[(3, 1), (1, 1), (2, 1), (5, 1), (4, 1), (2, 2), (1, 2)] {
            m.get_element(r, c).unwrap();
        }
        assert_structure(&m);
    }

    #[test]
    fn test_row_links_after_creation() {
        let mut m = Matrix::new();
        for &(r, c) in &[(1, 3), (1, 1), (2, 2)] {
            m.get_element(r, c).unwrap();
        }
        m.link_rows();
        assert!(m.rows_linked());
        m.get_element(1, 2).unwrap();
        m.get_element(3, 1).unwrap();
        assert_structure(&m);
    }

    #[test]
    fn test_clear_preserves_structure() {
        let mut m = Matrix::new();
        let handles: Vec<_> = [(1, 1), (1, 2), (2, 1), (2, 2)]
            .iter()
            .map(|&(r, c)| m.get_element(r, c).unwrap())
            .collect();
        for &h in &handles {
            m.add_real(h, 3.0);
        }
        let (elements, fill_ins, size) = (m.element_count(), m.fill_in_count(), m.size());
        m.clear();
        assert_eq!(m.element_count(), elements);
        assert_eq!(m.fill_in_count(), fill_ins);
        assert_eq!(m.size(), size);
        for &h in &handles {
            assert_eq!(m.value(h), ElementValue::ZERO);
        }
    }

    #[test]
    fn test_enlarge_is_monotonic_and_gap_free() {
        let mut m = Matrix::with_config(crate::sparse::MatrixConfig::new().with_initial_size(2));
        m.get_element(3, 3).unwrap();
        m.enlarge(4);
        assert_eq!(m.size(), 4);
        m.enlarge(2);
        assert_eq!(m.size(), 4);
        assert!(m.allocated_size() >= 4);

        // Internal indices 1..=4 each map to a distinct external index
        let mut externals: Vec<usize> = (1..=4).map(|i| m.translation.row_to_external(i)).collect();
        externals.sort_unstable();
        externals.dedup();
        assert_eq!(externals.len(), 4);
        assert_eq!(m.translation.row_to_internal(3), Some(1));
        assert_eq!(m.translation.row_to_internal(1), Some(2));
    }

    #[test]
    fn test_enlarge_invalidates_ordering() {
        let mut m = Matrix::new();
        let h = m.get_element(1, 1).unwrap();
        m.add_real(h, 1.0);
        m.factor().unwrap();
        assert!(!m.needs_ordering());
        m.enlarge(2);
        assert!(m.needs_ordering());
        assert!(!m.is_factored());
        assert!(m.markowitz.is_none());
    }
}
