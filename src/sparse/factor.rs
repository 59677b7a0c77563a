//! Markowitz pivot ordering and in-place LU factorization.
//!
//! After factoring, each diagonal element holds the reciprocal of its pivot,
//! the elements below the diagonal hold the lower factor `L` (pivot column
//! values), and the elements right of the diagonal hold the unit upper factor
//! `U` (pivot row divided by the pivot).

use num_complex::Complex64;

use super::element::ElementHandle;
use super::value::Scalar;
use super::Matrix;
use crate::error::{KirchhoffError, Result};

/// Stop the diagonal search after this many ties per unit of Markowitz count.
const TIES_MULTIPLIER: usize = 5;

/// Nonzero counts of the rows and columns in the active submatrix.
#[derive(Debug, Clone, Default)]
pub(crate) struct Markowitz {
    pub row: Vec<usize>,
    pub col: Vec<usize>,
}

impl Markowitz {
    /// Recount the submatrix starting at `step`.
    fn count(&mut self, matrix: &Matrix, step: usize) {
        let n = matrix.size;
        self.row.clear();
        self.row.resize(n + 1, 0);
        self.col.clear();
        self.col.resize(n + 1, 0);

        for col in step..=n {
            let mut current = matrix.first_in_col[col];
            while let Some(handle) = current {
                let element = &matrix.elements[handle.0];
                if element.row >= step {
                    self.row[element.row] += 1;
                    self.col[col] += 1;
                }
                current = element.next_in_col;
            }
        }
    }

    /// Markowitz count of a candidate at (row, col).
    fn product(&self, row: usize, col: usize) -> usize {
        self.row[row].saturating_sub(1) * self.col[col].saturating_sub(1)
    }
}

impl Matrix {
    /// Factor the matrix in place.
    ///
    /// Reuses the previous pivot order when the structure has not changed and
    /// every reused pivot still passes the threshold test; otherwise searches
    /// for a new order from the first rejected step onward.
    pub fn factor(&mut self) -> Result<()> {
        if self.complex != self.previous_complex {
            return Err(KirchhoffError::StaleMode);
        }
        if self.complex {
            self.factor_with::<Complex64>()
        } else {
            self.factor_with::<f64>()
        }
    }

    fn factor_with<T: Scalar>(&mut self) -> Result<()> {
        self.factored = false;
        self.singular = None;
        if !self.rows_linked {
            self.link_rows();
        }
        self.measure_columns::<T>();

        let mut step = 1;
        if !self.needs_ordering {
            while step <= self.size {
                match self.diag[step] {
                    Some(pivot) if self.reused_pivot_acceptable::<T>(pivot, step) => {
                        self.eliminate::<T>(pivot, step, None)?;
                        step += 1;
                    }
                    _ => {
                        tracing::debug!(step, "reused pivot rejected, reordering");
                        break;
                    }
                }
            }
            if step > self.size {
                self.factored = true;
                return Ok(());
            }
        }

        self.order_and_factor::<T>(step)
    }

    /// Record the largest magnitude of every column before elimination.
    fn measure_columns<T: Scalar>(&mut self) {
        self.column_scale.clear();
        self.column_scale.resize(self.size + 1, 0.0);
        for col in 1..=self.size {
            let largest = self.largest_in_col::<T>(col, 1);
            self.column_scale[col] = largest;
        }
    }

    /// Whether a pivot candidate in internal column `col` is indistinguishable
    /// from zero: at or below the absolute threshold, or within round-off of
    /// the column's original scale.
    fn negligible(&self, magnitude: f64, col: usize) -> bool {
        let round_off = self.size as f64 * f64::EPSILON * self.column_scale[col];
        magnitude <= self.abs_threshold || magnitude <= round_off
    }

    /// Threshold test for a pivot taken from the previous ordering.
    fn reused_pivot_acceptable<T: Scalar>(&self, pivot: ElementHandle, step: usize) -> bool {
        let magnitude = T::load(&self.elements[pivot.0].value).magnitude();
        if self.negligible(magnitude, step) {
            return false;
        }
        let largest = self.largest_in_col::<T>(step, step + 1);
        magnitude >= self.rel_threshold * largest
    }

    /// Choose pivots and eliminate from `start` to the end of the matrix.
    fn order_and_factor<T: Scalar>(&mut self, start: usize) -> Result<()> {
        let mut markowitz = self.markowitz.take().unwrap_or_default();
        markowitz.count(self, start);

        for step in start..=self.size {
            let pivot = match self.search_for_pivot::<T>(step, &markowitz) {
                Some(pivot) => pivot,
                None => {
                    let (row, col) = self.singular_position(step);
                    tracing::warn!(step, row, col, "no acceptable pivot, matrix is singular");
                    self.singular = Some((row, col));
                    self.markowitz = Some(markowitz);
                    return Err(KirchhoffError::singular(row, col));
                }
            };

            let (row, col) = (self.elements[pivot.0].row, self.elements[pivot.0].col);
            self.exchange_rows(step, row, &mut markowitz);
            self.exchange_cols(step, col, &mut markowitz);
            self.eliminate::<T>(pivot, step, Some(&mut markowitz))?;
        }

        self.markowitz = Some(markowitz);
        self.needs_ordering = false;
        self.factored = true;
        tracing::debug!(
            size = self.size,
            elements = self.element_count,
            fill_ins = self.fill_in_count,
            "matrix ordered and factored"
        );
        Ok(())
    }

    /// Largest magnitude in column `col` among rows `>= from_row`.
    fn largest_in_col<T: Scalar>(&self, col: usize, from_row: usize) -> f64 {
        let mut largest = 0.0f64;
        let mut current = self.first_in_col[col];
        while let Some(handle) = current {
            let element = &self.elements[handle.0];
            if element.row >= from_row {
                largest = largest.max(T::load(&element.value).magnitude());
            }
            current = element.next_in_col;
        }
        largest
    }

    fn search_for_pivot<T: Scalar>(&self, step: usize, markowitz: &Markowitz) -> Option<ElementHandle> {
        self.search_diagonal::<T>(step, markowitz)
            .or_else(|| self.search_submatrix::<T>(step, markowitz))
    }

    /// Prefer diagonal pivots: they keep the structure symmetric.
    fn search_diagonal<T: Scalar>(&self, step: usize, markowitz: &Markowitz) -> Option<ElementHandle> {
        let mut best = None;
        let mut best_product = usize::MAX;
        let mut best_ratio = 0.0;
        let mut ties = 0;

        for k in step..=self.size {
            let Some(candidate) = self.diag[k] else {
                continue;
            };
            let magnitude = T::load(&self.elements[candidate.0].value).magnitude();
            if self.negligible(magnitude, k) {
                continue;
            }
            let largest = self.largest_in_col::<T>(k, step);
            if magnitude < self.rel_threshold * largest {
                continue;
            }

            let product = markowitz.product(k, k);
            let ratio = magnitude / largest;
            if product < best_product {
                if product == 0 {
                    return Some(candidate);
                }
                best = Some(candidate);
                best_product = product;
                best_ratio = ratio;
                ties = 0;
            } else if product == best_product {
                ties += 1;
                if ratio > best_ratio {
                    best = Some(candidate);
                    best_ratio = ratio;
                }
                if ties >= best_product * TIES_MULTIPLIER {
                    break;
                }
            }
        }
        best
    }

    /// Search every remaining element; falls back to the largest one that is
    /// not negligible.
    fn search_submatrix<T: Scalar>(&self, step: usize, markowitz: &Markowitz) -> Option<ElementHandle> {
        let mut best = None;
        let mut best_product = usize::MAX;
        let mut best_ratio = 0.0;
        let mut largest_element: Option<(ElementHandle, f64)> = None;

        for col in step..=self.size {
            let largest = self.largest_in_col::<T>(col, step);
            let mut current = self.first_in_col[col];
            while let Some(handle) = current {
                let element = &self.elements[handle.0];
                current = element.next_in_col;
                if element.row < step {
                    continue;
                }

                let magnitude = T::load(&element.value).magnitude();
                if self.negligible(magnitude, col) {
                    continue;
                }
                if largest_element.map_or(true, |(_, m)| magnitude > m) {
                    largest_element = Some((handle, magnitude));
                }
                if magnitude < self.rel_threshold * largest {
                    continue;
                }

                let product = markowitz.product(element.row, col);
                let ratio = magnitude / largest;
                if product < best_product || (product == best_product && ratio > best_ratio) {
                    best = Some(handle);
                    best_product = product;
                    best_ratio = ratio;
                }
            }
        }

        if best.is_some() {
            return best;
        }
        let (handle, magnitude) = largest_element?;
        tracing::warn!(step, magnitude, "using small pivot");
        Some(handle)
    }

    /// External position to blame when no pivot exists at `step`.
    ///
    /// An empty row or column has never received a stamp and is the most
    /// useful thing to report; otherwise report the failing step.
    fn singular_position(&self, step: usize) -> (usize, usize) {
        let row = (step..=self.size)
            .find(|&r| self.first_in_row[r].is_none())
            .unwrap_or(step);
        let col = (step..=self.size)
            .find(|&c| self.first_in_col[c].is_none())
            .unwrap_or(step);
        (
            self.translation.row_to_external(row),
            self.translation.col_to_external(col),
        )
    }

    /// Exchange internal rows `a` and `b`, keeping column chains ordered.
    fn exchange_rows(&mut self, a: usize, b: usize, markowitz: &mut Markowitz) {
        if a == b {
            return;
        }
        let mut moved = self.row_handles(a);
        moved.extend(self.row_handles(b));

        for &handle in &moved {
            self.unlink_from_col(handle);
            let element = &self.elements[handle.0];
            if element.row == element.col {
                self.diag[element.col] = None;
            }
        }
        for &handle in &moved {
            let element = &mut self.elements[handle.0];
            element.row = if element.row == a { b } else { a };
        }
        for &handle in &moved {
            self.link_into_col(handle);
            let element = &self.elements[handle.0];
            if element.row == element.col {
                self.diag[element.row] = Some(handle);
            }
        }

        self.first_in_row.swap(a, b);
        self.translation.swap_rows(a, b);
        markowitz.row.swap(a, b);
    }

    /// Exchange internal columns `a` and `b`, keeping row chains ordered.
    fn exchange_cols(&mut self, a: usize, b: usize, markowitz: &mut Markowitz) {
        if a == b {
            return;
        }
        let mut moved = self.col_handles(a);
        moved.extend(self.col_handles(b));

        for &handle in &moved {
            self.unlink_from_row(handle);
            let element = &self.elements[handle.0];
            if element.row == element.col {
                self.diag[element.row] = None;
            }
        }
        for &handle in &moved {
            let element = &mut self.elements[handle.0];
            element.col = if element.col == a { b } else { a };
        }
        for &handle in &moved {
            self.link_into_row(handle);
            let element = &self.elements[handle.0];
            if element.row == element.col {
                self.diag[element.col] = Some(handle);
            }
        }

        self.first_in_col.swap(a, b);
        self.column_scale.swap(a, b);
        self.translation.swap_cols(a, b);
        markowitz.col.swap(a, b);
    }

    /// Eliminate the pivot at (step, step) from the active submatrix.
    fn eliminate<T: Scalar>(
        &mut self,
        pivot: ElementHandle,
        step: usize,
        mut markowitz: Option<&mut Markowitz>,
    ) -> Result<()> {
        let pivot_value = T::load(&self.elements[pivot.0].value);
        if self.negligible(pivot_value.magnitude(), step) {
            let (row, col) = (
                self.translation.row_to_external(step),
                self.translation.col_to_external(step),
            );
            self.singular = Some((row, col));
            return Err(KirchhoffError::singular(row, col));
        }
        let reciprocal = T::one() / pivot_value;
        reciprocal.store(&mut self.elements[pivot.0].value);

        let mut upper = self.elements[pivot.0].next_in_row;
        while let Some(u) = upper {
            let scaled = T::load(&self.elements[u.0].value) * reciprocal;
            scaled.store(&mut self.elements[u.0].value);
            let upper_col = self.elements[u.0].col;

            let mut sub_prev = u;
            let mut sub = self.elements[u.0].next_in_col;
            let mut lower = self.elements[pivot.0].next_in_col;
            while let Some(l) = lower {
                let lower_row = self.elements[l.0].row;
                while let Some(s) = sub {
                    if self.elements[s.0].row >= lower_row {
                        break;
                    }
                    sub_prev = s;
                    sub = self.elements[s.0].next_in_col;
                }

                let target = match sub {
                    Some(s) if self.elements[s.0].row == lower_row => s,
                    _ => {
                        let fill = self.create_element(lower_row, upper_col, Some(sub_prev), true);
                        if let Some(m) = markowitz.as_deref_mut() {
                            m.row[lower_row] += 1;
                            m.col[upper_col] += 1;
                        }
                        fill
                    }
                };

                let updated =
                    T::load(&self.elements[target.0].value) - scaled * T::load(&self.elements[l.0].value);
                updated.store(&mut self.elements[target.0].value);

                sub_prev = target;
                sub = self.elements[target.0].next_in_col;
                lower = self.elements[l.0].next_in_col;
            }
            upper = self.elements[u.0].next_in_row;
        }

        if let Some(m) = markowitz {
            let mut upper = self.elements[pivot.0].next_in_row;
            while let Some(u) = upper {
                let col = self.elements[u.0].col;
                m.col[col] = m.col[col].saturating_sub(1);
                upper = self.elements[u.0].next_in_row;
            }
            let mut lower = self.elements[pivot.0].next_in_col;
            while let Some(l) = lower {
                let row = self.elements[l.0].row;
                m.row[row] = m.row[row].saturating_sub(1);
                lower = self.elements[l.0].next_in_col;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sparse::build::tests::assert_structure;
    use approx::assert_relative_eq;

    fn stamp(m: &mut Matrix, entries: &[(isize, isize, f64)]) {
        for &(r, c, v) in entries {
            let h = m.get_element(r, c).unwrap();
            m.add_real(h, v);
        }
    }

    /// Solve against `rhs` and return `|A x - rhs| / |rhs|` with `A` rebuilt
    /// densely from the stamped entries.
    fn relative_residual(m: &Matrix, entries: &[(isize, isize, f64)], rhs: &[f64]) -> f64 {
        let x: Vec<f64> = m.solve(rhs).unwrap();
        let mut ax = vec![0.0; rhs.len()];
        for &(r, c, v) in entries {
            ax[r as usize] += v * x[c as usize];
        }
        let error: f64 = ax.iter().zip(rhs).skip(1).map(|(a, b)| (a - b).powi(2)).sum();
        let norm: f64 = rhs.iter().skip(1).map(|b| b * b).sum();
        (error / norm).sqrt()
    }

    #[test]
    fn test_markowitz_counts() {
        let mut m = Matrix::new();
        stamp(&mut m, &[(1, 1, 1.0), (1, 2, 1.0), (1, 3, 1.0), (2, 2, 1.0), (3, 1, 1.0)]);
        let mut markowitz = Markowitz::default();
        markowitz.count(&m, 1);
        assert_eq!(markowitz.row[1..], [3, 1, 1]);
        assert_eq!(markowitz.col[1..], [2, 2, 1]);
        assert_eq!(markowitz.product(1, 1), 2);
        assert_eq!(markowitz.product(2, 2), 0);
    }

    #[test]
    fn test_arrow_matrix_avoids_fill_in() {
        // Dense first row and column: pivoting on (1,1) first would fill
        // the whole matrix. The Markowitz order leaves it for last.
        let n = 6;
        let mut m = Matrix::new();
        for i in 1..=n {
            stamp(&mut m, &[(i, i, 10.0)]);
            if i > 1 {
                stamp(&mut m, &[(1, i, 1.0), (i, 1, 1.0)]);
            }
        }
        m.factor().unwrap();
        assert_eq!(m.fill_in_count(), 0);
        assert_structure(&m);

        let mut entries = Vec::new();
        for i in 1..=n {
            entries.push((i, i, 10.0));
            if i > 1 {
                entries.extend([(1, i, 1.0), (i, 1, 1.0)]);
            }
        }
        let rhs: Vec<f64> = (0..=n).map(|i| if i == 0 { 0.0 } else { i as f64 }).collect();
        assert!(relative_residual(&m, &entries, &rhs) < 1e-12);
    }

    #[test]
    fn test_fill_in_created_and_counted() {
        // A four-node ring: pivoting on any diagonal couples its two
        // neighbours, which are not yet connected.
        let mut m = Matrix::new();
        let entries = [
            (1, 1, 4.0),
            (1, 2, 1.0),
            (2, 1, 1.0),
            (2, 2, 4.0),
            (2, 3, 1.0),
            (3, 2, 1.0),
            (3, 3, 4.0),
            (3, 4, 1.0),
            (4, 3, 1.0),
            (4, 4, 4.0),
            (4, 1, 1.0),
            (1, 4, 1.0),
        ];
        stamp(&mut m, &entries);
        let elements = m.element_count();
        m.factor().unwrap();
        assert_eq!(m.element_count(), elements);
        assert!(m.fill_in_count() > 0);
        assert_structure(&m);
        assert!(relative_residual(&m, &entries, &[0.0, 1.0, -2.0, 3.0, 0.5]) < 1e-12);
    }

    #[test]
    fn test_fill_in_with_exchanges_solves() {
        // Zero diagonals at 1 and 3 force off-diagonal pivots and exchanges.
        let entries = [
            (1, 2, 3.0),
            (1, 4, 1.0),
            (2, 1, 5.0),
            (2, 2, 1.0),
            (3, 4, 4.0),
            (3, 1, 1.0),
            (4, 3, 2.0),
            (4, 1, 1.0),
            (4, 4, 1.0),
        ];
        let mut m = Matrix::new();
        stamp(&mut m, &entries);
        m.factor().unwrap();
        assert_structure(&m);
        let rhs = [0.0, 1.0, 2.0, 3.0, 4.0];
        assert!(relative_residual(&m, &entries, &rhs) < 1e-12);
        let det: f64 = m.determinant().unwrap();
        assert!(det.abs() > 1e-6);
    }

    #[test]
    fn test_numerically_singular_rejected() {
        // Row 2 is three times row 1, but the elimination leaves round-off
        // rather than an exact zero.
        let mut m = Matrix::new();
        stamp(&mut m, &[(1, 1, 0.1), (1, 2, 0.3), (2, 1, 0.3), (2, 2, 0.9)]);
        let err = m.factor().unwrap_err();
        assert!(err.is_singular());
        assert!(m.singular_location().is_some());
        assert!(!m.is_factored());
    }

    #[test]
    fn test_reused_order_detects_numerical_singularity() {
        let mut m = Matrix::new();
        stamp(&mut m, &[(1, 1, 4.0), (1, 2, 1.0), (2, 1, 1.0), (2, 2, 4.0)]);
        m.factor().unwrap();
        assert!(!m.needs_ordering());

        m.clear();
        stamp(&mut m, &[(1, 1, 0.1), (1, 2, 0.3), (2, 1, 0.3), (2, 2, 0.9)]);
        assert!(m.factor().unwrap_err().is_singular());
    }

    #[test]
    fn test_fast_path_reuses_order() {
        let mut m = Matrix::new();
        let entries = [(1, 1, 2.0), (1, 2, -1.0), (2, 1, -1.0), (2, 2, 2.0), (2, 3, -1.0), (3, 2, -1.0), (3, 3, 2.0)];
        stamp(&mut m, &entries);
        m.factor().unwrap();
        let fill_ins = m.fill_in_count();
        assert!(!m.needs_ordering());

        m.clear();
        stamp(&mut m, &entries);
        m.factor().unwrap();
        assert!(m.is_factored());
        assert!(!m.needs_ordering());
        assert_eq!(m.fill_in_count(), fill_ins);

        let x: Vec<f64> = m.solve(&[0.0, 1.0, 0.0, 1.0]).unwrap();
        assert_relative_eq!(x[1], 1.0, epsilon = 1e-12);
        assert_relative_eq!(x[2], 1.0, epsilon = 1e-12);
        assert_relative_eq!(x[3], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_fast_path_falls_back_on_bad_pivot() {
        let mut m = Matrix::new();
        stamp(&mut m, &[(1, 1, 4.0), (1, 2, 1.0), (2, 1, 1.0), (2, 2, 4.0)]);
        m.factor().unwrap();

        // Same structure, but the first reused pivot is now zero
        m.clear();
        stamp(&mut m, &[(1, 1, 0.0), (1, 2, 1.0), (2, 1, 1.0), (2, 2, 4.0)]);
        m.factor().unwrap();
        let x: Vec<f64> = m.solve(&[0.0, 1.0, 6.0]).unwrap();
        // [0 1; 1 4] x = [1; 6]  =>  x = [2, 1]
        assert_relative_eq!(x[1], 2.0, epsilon = 1e-12);
        assert_relative_eq!(x[2], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_new_element_after_factor_forces_reorder() {
        let mut m = Matrix::new();
        stamp(&mut m, &[(1, 1, 1.0), (2, 2, 1.0)]);
        m.factor().unwrap();
        assert!(!m.needs_ordering());
        m.get_element(1, 2).unwrap();
        assert!(m.needs_ordering());
        assert_structure(&m);
    }

    #[test]
    fn test_singular_empty_row() {
        let mut m = Matrix::new();
        stamp(&mut m, &[(1, 1, 4.0), (1, 2, 1.0), (2, 1, 1.0), (2, 2, 4.0), (1, 3, 1.0)]);
        let err = m.factor().unwrap_err();
        assert!(matches!(err, KirchhoffError::SingularMatrix { row: 3, .. }));
        assert_eq!(m.singular_location().map(|(r, _)| r), Some(3));
        assert!(!m.is_factored());
    }

    #[test]
    fn test_singular_cleared_by_clear() {
        let mut m = Matrix::new();
        stamp(&mut m, &[(1, 1, 0.0)]);
        assert!(m.factor().is_err());
        assert_eq!(m.singular_location(), Some((1, 1)));
        m.clear();
        assert_eq!(m.singular_location(), None);
    }

    #[test]
    fn test_stale_mode_rejected() {
        let mut m = Matrix::new();
        stamp(&mut m, &[(1, 1, 1.0)]);
        m.set_complex_mode(true);
        assert!(matches!(m.factor(), Err(KirchhoffError::StaleMode)));
        m.clear();
        let h = m.get_element(1, 1).unwrap();
        m.add_complex(h, Complex64::new(0.0, 2.0));
        m.factor().unwrap();
    }
}
