// Copyright 2022 Chris Gubbin
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Envelope LU factorisation over a fixed sparsity pattern
//!
//! For every row the envelope runs from its first stored column up to the diagonal. Because the
//! pattern is symmetric the same envelope, read as a column, holds the strictly upper part. The
//! profile pointer table therefore serves both factors:
//!
//! - `profile[i]` for `i < n` is the start of row `i`'s envelope, `profile[n]` its end,
//! - `profile[k]` for `k > n` is the column index of slot `k`,
//! - `lower[i]` for `i < n` holds the pivot `U_ii` of row `i`, `lower[k]` for `k > n` the
//!   multiplier `L_ij` of slot `k`,
//! - `upper[k]` for `k > n` holds `U_ji / U_jj` of the transposed slot, the upper factor has a
//!   unit diagonal.
//!
//! Elimination never leaves the envelope, so no storage is allocated after the analysis.

use crate::{error::MatrixError, Scalar};
use nalgebra::DVector;
use nalgebra_sparse::pattern::SparsityPattern;

#[derive(Debug, Clone)]
pub(super) struct ProfileFactorisation<T> {
    profile: Vec<usize>,
    lower: Vec<T>,
    upper: Vec<T>,
    /// Scratch: the row currently being eliminated for every active column
    marker: Vec<usize>,
    /// Scratch: multipliers of the current row, indexed by column
    row_lower: Vec<T>,
    /// Scratch: normalised upper entries of the current column, indexed by row
    column_upper: Vec<T>,
}

impl<T: Scalar> ProfileFactorisation<T> {
    /// Reserves the envelope of `pattern`
    pub(super) fn analyse(pattern: &SparsityPattern) -> Self {
        let num_rows = pattern.major_dim();
        let mut profile = vec![0; num_rows + 1];
        for row in 0..num_rows {
            profile[row] = profile.len();
            if let Some(&first) = pattern.lane(row).first() {
                if first < row {
                    profile.extend(first..row);
                }
            }
        }
        profile[num_rows] = profile.len();

        let len = profile.len();
        Self {
            profile,
            lower: vec![T::zero(); len],
            upper: vec![T::zero(); len],
            marker: vec![usize::MAX; num_rows],
            row_lower: vec![T::zero(); num_rows],
            column_upper: vec![T::zero(); num_rows],
        }
    }

    pub(super) fn clear(&mut self) {
        self.lower.iter_mut().for_each(|value| *value = T::zero());
        self.upper.iter_mut().for_each(|value| *value = T::zero());
    }

    fn num_rows(&self) -> usize {
        self.marker.len()
    }

    /// The slot of column `column` in row `row`'s envelope
    fn slot(&self, row: usize, column: usize) -> Option<usize> {
        let (start, end) = (self.profile[row], self.profile[row + 1]);
        if start == end {
            return None;
        }
        let first = self.profile[start];
        (first <= column && column < row).then(|| start + column - first)
    }

    /// Size of the envelope, the number of off-diagonal slots of each factor
    #[cfg(test)]
    pub(super) fn envelope_size(&self) -> usize {
        self.profile.len() - self.num_rows() - 1
    }

    /// Factorises the matrix given by `pattern` and `values`
    ///
    /// Fails when a pivot magnitude falls below `tolerance`, leaving the factors unusable.
    pub(super) fn factorise(
        &mut self,
        pattern: &SparsityPattern,
        values: &[T],
        tolerance: T,
    ) -> Result<(), MatrixError> {
        let num_rows = self.num_rows();
        self.clear();
        self.marker.iter_mut().for_each(|row| *row = usize::MAX);

        let offsets = pattern.major_offsets();
        for row in 0..num_rows {
            for (index, &column) in pattern.lane(row).iter().enumerate() {
                let value = values[offsets[row] + index];
                if column < row {
                    if let Some(slot) = self.slot(row, column) {
                        self.lower[slot] = value;
                    }
                } else if column > row {
                    if let Some(slot) = self.slot(column, row) {
                        self.upper[slot] = value;
                    }
                } else {
                    self.lower[row] = value;
                }
            }
        }

        for row in 0..num_rows {
            let mut pivot = self.lower[row];
            for slot in self.profile[row]..self.profile[row + 1] {
                let column = self.profile[slot];
                self.marker[column] = row;
                let mut lower = self.lower[slot];
                let mut upper = self.upper[slot];
                for inner in self.profile[column]..self.profile[column + 1] {
                    let k = self.profile[inner];
                    if self.marker[k] == row {
                        lower -= self.upper[inner] * self.row_lower[k];
                        upper -= self.lower[inner] * self.column_upper[k];
                    }
                }
                let upper = upper / self.lower[column];
                pivot -= lower * upper;
                self.upper[slot] = upper;
                self.column_upper[column] = upper;
                self.lower[slot] = lower;
                self.row_lower[column] = lower;
            }
            self.lower[row] = pivot;
            if pivot.abs() < tolerance {
                tracing::error!(
                    "Factorisation failed: pivot {:e} in row {} is below {:e}",
                    pivot,
                    row,
                    tolerance
                );
                return Err(MatrixError::SingularPivot {
                    row,
                    magnitude: pivot.abs().to_f64_lossy(),
                });
            }
        }
        Ok(())
    }

    /// Solves `L U x = b` by forward then backward substitution
    ///
    /// A pivot smaller than the smallest positive normal value is replaced by it.
    pub(super) fn substitute(&self, rhs: &DVector<T>, solution: &mut DVector<T>) {
        let num_rows = self.num_rows();
        let floor = T::min_positive();
        for row in 0..num_rows {
            let mut value = rhs[row];
            for slot in self.profile[row]..self.profile[row + 1] {
                value -= self.lower[slot] * solution[self.profile[slot]];
            }
            let pivot = self.lower[row];
            solution[row] = if pivot.abs() < floor {
                tracing::warn!(
                    "Caution: pivot {:e} in row {} replaced by {:e}",
                    pivot,
                    row,
                    floor
                );
                value / floor
            } else {
                value / pivot
            };
        }
        for row in (0..num_rows).rev() {
            let value = solution[row];
            for slot in self.profile[row]..self.profile[row + 1] {
                let column = self.profile[slot];
                solution[column] -= self.upper[slot] * value;
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::ProfileFactorisation;
    use approx::assert_relative_eq;
    use nalgebra::{DMatrix, DVector};
    use nalgebra_sparse::pattern::SparsityPattern;

    /// Dense rows of a symmetric-pattern matrix with a gap inside the first envelope
    fn dense() -> DMatrix<f64> {
        DMatrix::from_row_slice(
            4,
            4,
            &[
                4.0, 0.0, 1.0, 0.0, //
                0.0, 5.0, 2.0, 0.0, //
                2.0, 1.0, 6.0, 1.5, //
                0.0, 0.0, 0.5, 3.0,
            ],
        )
    }

    fn sparse(matrix: &DMatrix<f64>) -> (SparsityPattern, Vec<f64>) {
        let mut offsets = vec![0];
        let mut indices = Vec::new();
        let mut values = Vec::new();
        for i in 0..matrix.nrows() {
            for j in 0..matrix.ncols() {
                if matrix[(i, j)] != 0.0 || matrix[(j, i)] != 0.0 {
                    indices.push(j);
                    values.push(matrix[(i, j)]);
                }
            }
            offsets.push(indices.len());
        }
        let n = matrix.nrows();
        let pattern =
            SparsityPattern::try_from_offsets_and_indices(n, n, offsets, indices).unwrap();
        (pattern, values)
    }

    #[test]
    fn envelope_covers_gaps_between_first_column_and_diagonal() {
        let (pattern, _) = sparse(&dense());
        let factorisation = ProfileFactorisation::<f64>::analyse(&pattern);
        // Row 2 starts at column 0 and reserves columns 0 and 1, row 3 reserves column 2
        assert_eq!(factorisation.envelope_size(), 3);
        assert_eq!(factorisation.slot(2, 1), Some(factorisation.profile[2] + 1));
        assert_eq!(factorisation.slot(1, 0), None);
        assert_eq!(factorisation.slot(3, 1), None);
    }

    #[test]
    fn factors_reproduce_the_dense_solution() {
        let matrix = dense();
        let (pattern, values) = sparse(&matrix);
        let mut factorisation = ProfileFactorisation::analyse(&pattern);
        factorisation.factorise(&pattern, &values, 1e-50).unwrap();

        let expected = DVector::from_vec(vec![1.0, -2.0, 0.5, 3.0]);
        let rhs = &matrix * &expected;
        let mut solution = DVector::zeros(4);
        factorisation.substitute(&rhs, &mut solution);
        for (computed, exact) in solution.iter().zip(expected.iter()) {
            assert_relative_eq!(*computed, *exact, epsilon = 1e-13);
        }
    }

    #[test]
    fn zero_pivot_is_reported() {
        let matrix = DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 1.0, 1.0]);
        let (pattern, values) = sparse(&matrix);
        let mut factorisation = ProfileFactorisation::analyse(&pattern);
        let result = factorisation.factorise(&pattern, &values, 1e-50);
        assert!(matches!(
            result,
            Err(crate::error::MatrixError::SingularPivot { row: 1, .. })
        ));
    }
}
