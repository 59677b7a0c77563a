//! Forward and back substitution against a factored matrix.
//!
//! Vectors are indexed by external index; slot 0 belongs to ground and is
//! always zero in the solution. The row and column permutations chosen during
//! ordering are applied on the way in and undone on the way out.

use super::value::Scalar;
use super::Matrix;
use crate::error::{KirchhoffError, Result};

impl Matrix {
    /// Solve `A x = rhs`, returning `x`.
    pub fn solve<T: Scalar>(&self, rhs: &[T]) -> Result<Vec<T>> {
        let mut solution = rhs.to_vec();
        self.solve_in_place(&mut solution)?;
        Ok(solution)
    }

    /// Solve `A x = b`, overwriting `b` with `x`.
    pub fn solve_in_place<T: Scalar>(&self, vector: &mut [T]) -> Result<()> {
        self.check_vector(vector)?;
        let n = self.size;

        let mut intermediate = vec![T::zero(); n + 1];
        for (i, slot) in intermediate.iter_mut().enumerate().skip(1) {
            *slot = vector[self.translation.row_to_external(i)];
        }

        // Forward substitution: L y = b
        for i in 1..=n {
            let pivot = self.pivot(i)?;
            let mut temp = intermediate[i];
            if temp != T::zero() {
                temp *= T::load(&self.elements[pivot.0].value);
                intermediate[i] = temp;
                let mut lower = self.elements[pivot.0].next_in_col;
                while let Some(l) = lower {
                    let element = &self.elements[l.0];
                    intermediate[element.row] -= temp * T::load(&element.value);
                    lower = element.next_in_col;
                }
            }
        }

        // Back substitution: U x = y
        for i in (1..=n).rev() {
            let pivot = self.pivot(i)?;
            let mut temp = intermediate[i];
            let mut upper = self.elements[pivot.0].next_in_row;
            while let Some(u) = upper {
                let element = &self.elements[u.0];
                temp -= T::load(&element.value) * intermediate[element.col];
                upper = element.next_in_row;
            }
            intermediate[i] = temp;
        }

        for slot in vector.iter_mut() {
            *slot = T::zero();
        }
        for (i, &value) in intermediate.iter().enumerate().skip(1) {
            vector[self.translation.col_to_external(i)] = value;
        }
        Ok(())
    }

    /// Solve `Aᵀ x = rhs` with the existing factorization.
    pub fn solve_transpose<T: Scalar>(&self, rhs: &[T]) -> Result<Vec<T>> {
        self.check_vector(rhs)?;
        let n = self.size;

        let mut intermediate = vec![T::zero(); n + 1];
        for (i, slot) in intermediate.iter_mut().enumerate().skip(1) {
            *slot = rhs[self.translation.col_to_external(i)];
        }

        // Forward substitution: Uᵀ z = b
        for i in 1..=n {
            let pivot = self.pivot(i)?;
            let temp = intermediate[i];
            if temp != T::zero() {
                let mut upper = self.elements[pivot.0].next_in_row;
                while let Some(u) = upper {
                    let element = &self.elements[u.0];
                    intermediate[element.col] -= temp * T::load(&element.value);
                    upper = element.next_in_row;
                }
            }
        }

        // Back substitution: Lᵀ x = z
        for i in (1..=n).rev() {
            let pivot = self.pivot(i)?;
            let mut temp = intermediate[i];
            let mut lower = self.elements[pivot.0].next_in_col;
            while let Some(l) = lower {
                let element = &self.elements[l.0];
                temp -= T::load(&element.value) * intermediate[element.row];
                lower = element.next_in_col;
            }
            intermediate[i] = temp * T::load(&self.elements[pivot.0].value);
        }

        let mut solution = vec![T::zero(); rhs.len()];
        for (i, &value) in intermediate.iter().enumerate().skip(1) {
            solution[self.translation.row_to_external(i)] = value;
        }
        Ok(solution)
    }

    /// A nonzero entry at an external index the matrix never saw is an
    /// equation `0 = b` with no unknowns, reported as singular at that index.
    fn check_vector<T: Scalar>(&self, vector: &[T]) -> Result<()> {
        let len = vector.len();
        if !self.factored {
            return Err(KirchhoffError::NotFactored);
        }
        if T::COMPLEX != self.complex {
            return Err(KirchhoffError::ModeMismatch {
                complex: self.complex,
            });
        }
        let expected = self.vector_len();
        if len < expected {
            return Err(KirchhoffError::DimensionMismatch {
                expected,
                actual: len,
            });
        }
        if let Some(ext) = (1..len).find(|&ext| {
            vector[ext] != T::zero() && !self.translation.is_assigned(ext)
        }) {
            return Err(KirchhoffError::singular(ext, ext));
        }
        Ok(())
    }

    fn pivot(&self, step: usize) -> Result<super::ElementHandle> {
        self.diag[step].ok_or(KirchhoffError::NotFactored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use num_complex::Complex64;

    fn build(entries: &[(isize, isize, f64)]) -> Matrix {
        let mut m = Matrix::new();
        for &(r, c, v) in entries {
            let h = m.get_element(r, c).unwrap();
            m.add_real(h, v);
        }
        m
    }

    #[test]
    fn test_solve_requires_factor() {
        let m = build(&[(1, 1, 1.0)]);
        assert!(matches!(
            m.solve(&[0.0, 1.0]),
            Err(KirchhoffError::NotFactored)
        ));
    }

    #[test]
    fn test_solve_checks_mode_and_length() {
        let mut m = build(&[(1, 1, 1.0), (3, 3, 1.0)]);
        m.factor().unwrap();
        assert!(matches!(
            m.solve(&[Complex64::new(0.0, 0.0); 4]),
            Err(KirchhoffError::ModeMismatch { complex: false })
        ));
        assert!(matches!(
            m.solve(&[0.0; 3]),
            Err(KirchhoffError::DimensionMismatch { expected: 4, actual: 3 })
        ));
    }

    #[test]
    fn test_sparse_external_indices() {
        // Unknowns numbered 2 and 5; the ground slot is ignored on input
        let mut m = build(&[(2, 2, 2.0), (2, 5, 1.0), (5, 2, 1.0), (5, 5, 3.0)]);
        m.factor().unwrap();
        let x: Vec<f64> = m.solve(&[9.0, 0.0, 4.0, 0.0, 0.0, 7.0]).unwrap();
        // [2 1; 1 3] x = [4; 7]  =>  x = [1, 2]
        assert_relative_eq!(x[2], 1.0, epsilon = 1e-12);
        assert_relative_eq!(x[5], 2.0, epsilon = 1e-12);
        for i in [0, 1, 3, 4] {
            assert_eq!(x[i], 0.0);
        }
    }

    #[test]
    fn test_rhs_at_unused_index_rejected() {
        let mut m = build(&[(2, 2, 2.0), (5, 5, 3.0)]);
        m.factor().unwrap();
        let err = m.solve(&[0.0, 0.0, 4.0, 1.0, 0.0, 7.0]).unwrap_err();
        assert!(matches!(err, KirchhoffError::SingularMatrix { row: 3, col: 3 }));
        let err = m.solve_transpose(&[0.0, 0.0, 4.0, 0.0, 0.0, 7.0, 1.0]).unwrap_err();
        assert!(matches!(err, KirchhoffError::SingularMatrix { row: 6, col: 6 }));
    }

    #[test]
    fn test_solve_in_place_overwrites() {
        let mut m = build(&[(1, 1, 4.0), (1, 2, 2.0), (2, 2, 1.0)]);
        m.factor().unwrap();
        let mut b = vec![0.0, 8.0, 3.0];
        m.solve_in_place(&mut b).unwrap();
        assert_relative_eq!(b[1], 0.5, epsilon = 1e-12);
        assert_relative_eq!(b[2], 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_solve_transpose() {
        let mut m = build(&[(1, 1, 4.0), (1, 2, 2.0), (2, 1, 1.0), (2, 2, 3.0)]);
        m.factor().unwrap();
        // Aᵀ = [4 1; 2 3], Aᵀ x = [6; 8]  =>  x = [1, 2]
        let x: Vec<f64> = m.solve_transpose(&[0.0, 6.0, 8.0]).unwrap();
        assert_relative_eq!(x[1], 1.0, epsilon = 1e-12);
        assert_relative_eq!(x[2], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_solve_transpose_after_pivot_exchange() {
        let mut m = build(&[(1, 2, 3.0), (2, 1, 2.0), (2, 2, 1.0)]);
        m.factor().unwrap();
        // A = [0 3; 2 1], Aᵀ = [0 2; 3 1], Aᵀ x = [4; 5]  =>  x = [1, 2]
        let x: Vec<f64> = m.solve_transpose(&[0.0, 4.0, 5.0]).unwrap();
        assert_relative_eq!(x[1], 1.0, epsilon = 1e-12);
        assert_relative_eq!(x[2], 2.0, epsilon = 1e-12);
        // A x = [6; 4]  =>  x = [1, 2]
        let y: Vec<f64> = m.solve(&[0.0, 6.0, 4.0]).unwrap();
        assert_relative_eq!(y[1], 1.0, epsilon = 1e-12);
        assert_relative_eq!(y[2], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_complex_solve() {
        let mut m = Matrix::new_complex();
        let entries = [
            (1, 1, Complex64::new(1.0, 1.0)),
            (1, 2, Complex64::new(0.0, -1.0)),
            (2, 1, Complex64::new(0.0, -1.0)),
            (2, 2, Complex64::new(2.0, 0.0)),
        ];
        for &(r, c, v) in &entries {
            let h = m.get_element(r, c).unwrap();
            m.add_complex(h, v);
        }
        m.factor().unwrap();

        let expected = [Complex64::new(1.0, -1.0), Complex64::new(0.5, 2.0)];
        let mut rhs = vec![Complex64::new(0.0, 0.0); 3];
        for &(r, c, v) in &entries {
            rhs[r as usize] += v * expected[c as usize - 1];
        }
        let x: Vec<Complex64> = m.solve(&rhs).unwrap();
        assert_relative_eq!(x[1].re, expected[0].re, epsilon = 1e-12);
        assert_relative_eq!(x[1].im, expected[0].im, epsilon = 1e-12);
        assert_relative_eq!(x[2].re, expected[1].re, epsilon = 1e-12);
        assert_relative_eq!(x[2].im, expected[1].im, epsilon = 1e-12);
    }
}
