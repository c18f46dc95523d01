// Copyright 2022 Chris Gubbin
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! # Sparse
//!
//! A block structured sparse linear system `A x = b` with a fixed sparsity pattern.
//!
//! Every node of the mesh owns a contiguous block of unknowns. The pattern couples each node to
//! itself and to every unknown of its neighbours, and never changes after construction. The
//! system is solved by an envelope LU factorisation whose storage is reserved up front, so
//! repeated Newton iterations reuse the same buffers.

mod assembler;
mod coordinate;
mod factorisation;
mod solve;

use crate::{error::MatrixError, Scalar};
use factorisation::ProfileFactorisation;
use nalgebra::DVector;
use nalgebra_sparse::pattern::SparsityPattern;

/// Default magnitude below which a pivot is treated as singular
pub const DEFAULT_PIVOT_TOLERANCE: f64 = 1e-50;

/// A fixed-pattern sparse matrix whose rows are grouped into per-node blocks
#[derive(Debug, Clone)]
pub struct SparseBlockMatrix<T> {
    /// The symmetric sparsity pattern, always containing the diagonal
    pattern: SparsityPattern,
    /// Coefficients in the order of the pattern's column indices
    values: Vec<T>,
    solution: DVector<T>,
    rhs: DVector<T>,
    block_sizes: Vec<usize>,
    /// Prefix sum of `block_sizes`, the global row of the first unknown of each node
    block_offsets: Vec<usize>,
    factorisation: ProfileFactorisation<T>,
    pivot_tolerance: T,
}

impl<T: Scalar> SparseBlockMatrix<T> {
    fn from_pattern(pattern: SparsityPattern, block_sizes: Vec<usize>) -> Self {
        let num_rows = pattern.major_dim();
        let block_offsets = std::iter::once(0)
            .chain(block_sizes.iter().scan(0, |offset, &size| {
                *offset += size;
                Some(*offset)
            }))
            .collect();
        let factorisation = ProfileFactorisation::analyse(&pattern);
        Self {
            values: vec![T::zero(); pattern.nnz()],
            solution: DVector::zeros(num_rows),
            rhs: DVector::zeros(num_rows),
            pattern,
            block_sizes,
            block_offsets,
            factorisation,
            pivot_tolerance: T::from_f64_constant(DEFAULT_PIVOT_TOLERANCE),
        }
    }

    /// Sets the magnitude below which a pivot aborts the factorisation
    pub fn with_pivot_tolerance(mut self, pivot_tolerance: T) -> Self {
        self.pivot_tolerance = pivot_tolerance;
        self
    }

    /// The total number of unknowns
    pub fn nrows(&self) -> usize {
        self.pattern.major_dim()
    }

    pub fn nnz(&self) -> usize {
        self.pattern.nnz()
    }

    pub fn number_of_nodes(&self) -> usize {
        self.block_sizes.len()
    }

    pub fn block_size(&self, node: usize) -> usize {
        self.block_sizes[node]
    }

    pub fn pattern(&self) -> &SparsityPattern {
        &self.pattern
    }

    /// The global row of unknown `sub_index` of `node`
    pub fn global_index(&self, node: usize, sub_index: usize) -> Result<usize, MatrixError> {
        match self.block_sizes.get(node) {
            Some(&block) if sub_index < block => Ok(self.block_offsets[node] + sub_index),
            Some(&block) => Err(MatrixError::SubIndex {
                node,
                sub_index,
                block,
            }),
            None => Err(MatrixError::SubIndex {
                node,
                sub_index,
                block: 0,
            }),
        }
    }

    fn position(&self, row: usize, column: usize) -> Result<usize, MatrixError> {
        if row >= self.nrows() {
            return Err(MatrixError::OutOfPattern { row, column });
        }
        self.pattern
            .lane(row)
            .binary_search(&column)
            .map(|index| self.pattern.major_offsets()[row] + index)
            .map_err(|_| MatrixError::OutOfPattern { row, column })
    }

    /// The coefficient at global position (`row`, `column`)
    pub fn entry(&self, row: usize, column: usize) -> Result<T, MatrixError> {
        Ok(self.values[self.position(row, column)?])
    }

    /// A mutable reference to the coefficient at global position (`row`, `column`)
    pub fn entry_mut(&mut self, row: usize, column: usize) -> Result<&mut T, MatrixError> {
        let position = self.position(row, column)?;
        Ok(&mut self.values[position])
    }

    /// The coefficient coupling unknown `row_sub` of `row_node` to unknown `column_sub` of
    /// `column_node`
    pub fn block_entry(
        &self,
        row_node: usize,
        column_node: usize,
        row_sub: usize,
        column_sub: usize,
    ) -> Result<T, MatrixError> {
        self.entry(
            self.global_index(row_node, row_sub)?,
            self.global_index(column_node, column_sub)?,
        )
    }

    pub fn block_entry_mut(
        &mut self,
        row_node: usize,
        column_node: usize,
        row_sub: usize,
        column_sub: usize,
    ) -> Result<&mut T, MatrixError> {
        let row = self.global_index(row_node, row_sub)?;
        let column = self.global_index(column_node, column_sub)?;
        self.entry_mut(row, column)
    }

    /// The column indices and coefficients stored in `row`
    pub fn row(&self, row: usize) -> (&[usize], &[T]) {
        let offsets = self.pattern.major_offsets();
        (
            self.pattern.lane(row),
            &self.values[offsets[row]..offsets[row + 1]],
        )
    }

    pub fn rhs(&self) -> &DVector<T> {
        &self.rhs
    }

    pub fn rhs_mut(&mut self) -> &mut DVector<T> {
        &mut self.rhs
    }

    pub fn block_rhs(&self, node: usize, sub_index: usize) -> Result<T, MatrixError> {
        Ok(self.rhs[self.global_index(node, sub_index)?])
    }

    pub fn block_rhs_mut(&mut self, node: usize, sub_index: usize) -> Result<&mut T, MatrixError> {
        let row = self.global_index(node, sub_index)?;
        Ok(&mut self.rhs[row])
    }

    pub fn solution(&self) -> &DVector<T> {
        &self.solution
    }

    pub fn block_solution(&self, node: usize, sub_index: usize) -> Result<T, MatrixError> {
        Ok(self.solution[self.global_index(node, sub_index)?])
    }

    /// Zeroes the coefficients, vectors and factorisation buffers, keeping the pattern
    pub fn clear(&mut self) {
        self.values.iter_mut().for_each(|value| *value = T::zero());
        self.solution.fill(T::zero());
        self.rhs.fill(T::zero());
        self.factorisation.clear();
    }

    /// Replaces every row of `node`'s block with `diagonal * x = 0`
    pub fn apply_dirichlet(&mut self, node: usize, diagonal: T) -> Result<(), MatrixError> {
        for sub_index in 0..self.block_size(node) {
            let row = self.global_index(node, sub_index)?;
            let offsets = self.pattern.major_offsets();
            let (start, end) = (offsets[row], offsets[row + 1]);
            for (value, &column) in self.values[start..end]
                .iter_mut()
                .zip(self.pattern.lane(row))
            {
                *value = if column == row { diagonal } else { T::zero() };
            }
            self.rhs[row] = T::zero();
        }
        Ok(())
    }

    /// The Euclidean norm of the solution, `||x||`
    pub fn solution_norm(&self) -> T {
        self.solution.norm()
    }

    /// The Euclidean norm of the right hand side, `||b||`
    pub fn rhs_norm(&self) -> T {
        self.rhs.norm()
    }

    /// The Euclidean norm of the true residual `||b - A x||`, recomputed from the coefficients
    pub fn residual_norm(&self) -> T {
        (0..self.nrows())
            .map(|row| {
                let (columns, values) = self.row(row);
                columns
                    .iter()
                    .zip(values)
                    .fold(self.rhs[row], |acc, (&column, &value)| {
                        acc - value * self.solution[column]
                    })
            })
            .fold(T::zero(), |acc, residual| acc + residual * residual)
            .sqrt()
    }
}
