//! Translation between external and internal indices.
//!
//! External indices are whatever the caller uses to number its unknowns and
//! may be sparse (node 3, node 17, branch 1000). Internal indices are dense,
//! `1..=size`, assigned in order of first appearance. Rows and columns have
//! separate maps because pivoting exchanges them independently.

use super::{Matrix, EXPANSION_FACTOR};
use crate::error::{KirchhoffError, Result};

/// External/internal index maps.
#[derive(Debug, Clone)]
pub(crate) struct Translation {
    ext_to_int_row: Vec<Option<usize>>,
    ext_to_int_col: Vec<Option<usize>>,
    int_to_ext_row: Vec<usize>,
    int_to_ext_col: Vec<usize>,
    /// Largest external index bound so far
    external_size: usize,
}

impl Translation {
    pub fn new(allocated: usize) -> Self {
        Self {
            ext_to_int_row: vec![None; allocated + 1],
            ext_to_int_col: vec![None; allocated + 1],
            int_to_ext_row: (0..=allocated).collect(),
            int_to_ext_col: (0..=allocated).collect(),
            external_size: 0,
        }
    }

    pub fn external_size(&self) -> usize {
        self.external_size
    }

    pub fn row_to_internal(&self, ext: usize) -> Option<usize> {
        self.ext_to_int_row.get(ext).copied().flatten()
    }

    pub fn col_to_internal(&self, ext: usize) -> Option<usize> {
        self.ext_to_int_col.get(ext).copied().flatten()
    }

    pub fn row_to_external(&self, int: usize) -> usize {
        self.int_to_ext_row[int]
    }

    pub fn col_to_external(&self, int: usize) -> usize {
        self.int_to_ext_col[int]
    }

    pub fn is_assigned(&self, ext: usize) -> bool {
        self.row_to_internal(ext).is_some()
    }

    /// Make room for external index `ext`, growing geometrically.
    pub fn reserve_external(&mut self, ext: usize) {
        let allocated = self.ext_to_int_row.len() - 1;
        if ext <= allocated {
            return;
        }
        let new_allocated = ext.max((EXPANSION_FACTOR * allocated as f64) as usize);
        self.ext_to_int_row.resize(new_allocated + 1, None);
        self.ext_to_int_col.resize(new_allocated + 1, None);
    }

    /// Grow the internal-to-external maps along with the matrix frame.
    pub fn reserve_internal(&mut self, allocated: usize) {
        let old = self.int_to_ext_row.len();
        if allocated + 1 <= old {
            return;
        }
        self.int_to_ext_row.extend(old..=allocated);
        self.int_to_ext_col.extend(old..=allocated);
    }

    /// Bind a fresh external index to a fresh internal index for both axes.
    pub fn bind(&mut self, ext: usize, int: usize) {
        self.reserve_external(ext);
        self.ext_to_int_row[ext] = Some(int);
        self.ext_to_int_col[ext] = Some(int);
        self.int_to_ext_row[int] = ext;
        self.int_to_ext_col[int] = ext;
        self.external_size = self.external_size.max(ext);
    }

    pub fn swap_rows(&mut self, a: usize, b: usize) {
        self.int_to_ext_row.swap(a, b);
        let (ext_a, ext_b) = (self.int_to_ext_row[a], self.int_to_ext_row[b]);
        self.ext_to_int_row[ext_a] = Some(a);
        self.ext_to_int_row[ext_b] = Some(b);
    }

    pub fn swap_cols(&mut self, a: usize, b: usize) {
        self.int_to_ext_col.swap(a, b);
        let (ext_a, ext_b) = (self.int_to_ext_col[a], self.int_to_ext_col[b]);
        self.ext_to_int_col[ext_a] = Some(a);
        self.ext_to_int_col[ext_b] = Some(b);
    }

    /// Parity of the combined row and column permutation over `1..=size`.
    ///
    /// Rows and columns start out with identical maps, so the permutation
    /// taking internal row `i` to the internal column of the same external
    /// index is the identity until pivoting exchanges something.
    pub fn permutation_is_odd(&self, size: usize) -> bool {
        let perm: Vec<usize> = (0..=size)
            .map(|i| {
                if i == 0 {
                    0
                } else {
                    self.col_to_internal(self.int_to_ext_row[i]).unwrap_or(i)
                }
            })
            .collect();

        let mut visited = vec![false; size + 1];
        let mut transpositions = 0;
        for start in 1..=size {
            if visited[start] {
                continue;
            }
            let mut len = 0;
            let mut i = start;
            while !visited[i] {
                visited[i] = true;
                i = perm[i];
                len += 1;
            }
            transpositions += len - 1;
        }
        transpositions % 2 == 1
    }
}

impl Matrix {
    /// Translate an external (row, col) pair into internal indices.
    ///
    /// External indices seen for the first time are assigned the next internal
    /// index, growing the matrix. Index 0 is ground and translates to 0
    /// without being assigned.
    pub fn translate(&mut self, ext_row: isize, ext_col: isize) -> Result<(usize, usize)> {
        if ext_row < 0 || ext_col < 0 {
            return Err(KirchhoffError::invalid_index(ext_row, ext_col));
        }
        let (ext_row, ext_col) = (ext_row as usize, ext_col as usize);

        let row = match ext_row {
            0 => 0,
            ext => match self.translation.row_to_internal(ext) {
                Some(int) => int,
                None => self.assign_external(ext),
            },
        };
        let col = match ext_col {
            0 => 0,
            ext => match self.translation.col_to_internal(ext) {
                Some(int) => int,
                None => self.assign_external(ext),
            },
        };
        Ok((row, col))
    }

    /// Give a new external index the next internal index.
    fn assign_external(&mut self, ext: usize) -> usize {
        let int = self.size + 1;
        self.grow_frame(int);
        self.translation.bind(ext, int);
        tracing::trace!(external = ext, internal = int, "index translated");
        int
    }

    /// Bind every new internal index in `(old, new]` to the lowest free
    /// external index.
    pub(crate) fn bind_unassigned(&mut self, old_size: usize, new_size: usize) {
        let mut ext = 1;
        for int in (old_size + 1)..=new_size {
            while self.translation.is_assigned(ext) {
                ext += 1;
            }
            self.translation.bind(ext, int);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translate_assigns_dense_indices() {
        let mut m = Matrix::new();
        assert_eq!(m.translate(10, 3).unwrap(), (1, 2));
        assert_eq!(m.translate(3, 10).unwrap(), (2, 1));
        assert_eq!(m.translate(7, 7).unwrap(), (3, 3));
        assert_eq!(m.size(), 3);
        assert_eq!(m.external_size(), 10);
    }

    #[test]
    fn test_translate_ground_is_not_assigned() {
        let mut m = Matrix::new();
        assert_eq!(m.translate(0, 4).unwrap(), (0, 1));
        assert_eq!(m.size(), 1);
    }

    #[test]
    fn test_translate_rejects_negative() {
        let mut m = Matrix::new();
        assert!(matches!(
            m.translate(-1, 2),
            Err(KirchhoffError::InvalidIndex { row: -1, col: 2 })
        ));
        assert_eq!(m.size(), 0);
    }

    #[test]
    fn test_translation_tables_grow_geometrically() {
        let mut t = Translation::new(4);
        t.reserve_external(5);
        assert_eq!(t.ext_to_int_row.len(), 7);
        t.reserve_external(100);
        assert_eq!(t.ext_to_int_row.len(), 101);
        assert!(t.ext_to_int_row.iter().all(Option::is_none));
    }

    #[test]
    fn test_swap_keeps_maps_inverse() {
        let mut t = Translation::new(4);
        for (ext, int) in [(5, 1), (9, 2), (2, 3)] {
            t.bind(ext, int);
        }
        t.swap_rows(1, 3);
        assert_eq!(t.row_to_external(1), 2);
        assert_eq!(t.row_to_internal(2), Some(1));
        assert_eq!(t.row_to_internal(5), Some(3));
        assert_eq!(t.col_to_internal(5), Some(1));
        assert!(t.permutation_is_odd(3));
        t.swap_cols(1, 3);
        assert!(!t.permutation_is_odd(3));
    }
}
