// Copyright 2022 Chris Gubbin
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Construction of the fixed sparsity pattern

use super::SparseBlockMatrix;
use crate::{error::MatrixError, Scalar};
use drifter_mesher::DeviceTopology;
use nalgebra_sparse::pattern::SparsityPattern;
use std::collections::BTreeSet;

impl<T: Scalar> SparseBlockMatrix<T> {
    /// Builds the matrix for `mesh`, where node `i` owns `block_sizes[i]` unknowns
    ///
    /// Every node couples fully to its own block and to every unknown of the nodes it shares an
    /// element with.
    pub fn from_topology<Mesh>(mesh: &Mesh, block_sizes: &[usize]) -> Result<Self, MatrixError>
    where
        Mesh: DeviceTopology<T>,
    {
        let num_nodes = mesh.number_of_nodes();
        if block_sizes.len() != num_nodes {
            return Err(MatrixError::BlockCount {
                expected: num_nodes,
                found: block_sizes.len(),
            });
        }
        if let Some(node) = block_sizes.iter().position(|&size| size == 0) {
            return Err(MatrixError::EmptyBlock { node });
        }

        let mut block_offsets = Vec::with_capacity(num_nodes + 1);
        block_offsets.push(0);
        for size in block_sizes {
            block_offsets.push(block_offsets[block_offsets.len() - 1] + size);
        }
        let block = |node: usize| block_offsets[node]..block_offsets[node + 1];

        let mut matrix_entries = BTreeSet::new();
        for node in 0..num_nodes {
            for row in block(node) {
                for column in block(node) {
                    matrix_entries.insert((row, column));
                }
            }
        }
        for element in 0..mesh.number_of_elements() {
            let [i, j] = mesh.element_nodes(element);
            for row in block(i) {
                for column in block(j) {
                    matrix_entries.insert((row, column));
                    matrix_entries.insert((column, row));
                }
            }
        }

        let pattern = assemble_pattern(block_offsets[num_nodes], matrix_entries)?;
        Ok(Self::from_pattern(pattern, block_sizes.to_vec()))
    }
}

/// Converts ordered (row, column) pairs into a square `SparsityPattern`
pub(super) fn assemble_pattern(
    num_rows: usize,
    matrix_entries: BTreeSet<(usize, usize)>,
) -> Result<SparsityPattern, MatrixError> {
    let mut offsets = Vec::with_capacity(num_rows + 1);
    let mut column_indices = Vec::with_capacity(matrix_entries.len());
    offsets.push(0);
    for (i, j) in matrix_entries {
        while i + 1 > offsets.len() {
            offsets.push(column_indices.len());
        }
        column_indices.push(j);
    }

    while offsets.len() < (num_rows + 1) {
        offsets.push(column_indices.len())
    }

    Ok(SparsityPattern::try_from_offsets_and_indices(
        num_rows,
        num_rows,
        offsets,
        column_indices,
    )?)
}

#[cfg(test)]
mod test {
    use crate::{error::MatrixError, sparse::SparseBlockMatrix};
    use drifter_mesher::create_line_segment_mesh_1d;

    #[test]
    fn pattern_couples_blocks_of_neighbouring_nodes() {
        let mesh = create_line_segment_mesh_1d(1.0, 3, 0.0).unwrap();
        let matrix = SparseBlockMatrix::<f64>::from_topology(&mesh, &[1, 3, 3, 1]).unwrap();
        assert_eq!(matrix.nrows(), 8);
        // 1 + 9 + 9 + 1 in the blocks, 2 * (3 + 9 + 3) between neighbours
        assert_eq!(matrix.nnz(), 50);
        assert_eq!(matrix.global_index(2, 1).unwrap(), 5);
        assert_eq!(matrix.row(0).0, &[0, 1, 2, 3]);
        assert_eq!(matrix.row(7).0, &[4, 5, 6, 7]);
        assert_eq!(matrix.row(2).0, &[0, 1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn pattern_is_symmetric_and_contains_the_diagonal() {
        let mesh = create_line_segment_mesh_1d(1.0, 6, 0.0).unwrap();
        let matrix =
            SparseBlockMatrix::<f64>::from_topology(&mesh, &[1, 3, 3, 1, 1, 3, 3]).unwrap();
        for row in 0..matrix.nrows() {
            assert!(matrix.entry(row, row).is_ok());
            for &column in matrix.row(row).0 {
                assert!(matrix.entry(column, row).is_ok());
            }
        }
    }

    #[test]
    fn out_of_pattern_access_fails() {
        let mesh = create_line_segment_mesh_1d(1.0, 3, 0.0).unwrap();
        let mut matrix = SparseBlockMatrix::<f64>::from_topology(&mesh, &[1, 3, 3, 1]).unwrap();
        assert!(matches!(
            matrix.entry_mut(0, 5),
            Err(MatrixError::OutOfPattern { row: 0, column: 5 })
        ));
        assert!(matches!(
            matrix.block_entry_mut(0, 0, 1, 0),
            Err(MatrixError::SubIndex {
                node: 0,
                sub_index: 1,
                block: 1
            })
        ));
        *matrix.block_entry_mut(1, 2, 2, 0).unwrap() += 2.5;
        assert_eq!(matrix.entry(3, 4).unwrap(), 2.5);
    }

    #[test]
    fn mismatched_block_sizes_are_rejected() {
        let mesh = create_line_segment_mesh_1d(1.0, 3, 0.0).unwrap();
        assert!(matches!(
            SparseBlockMatrix::<f64>::from_topology(&mesh, &[1, 1, 1]),
            Err(MatrixError::BlockCount {
                expected: 4,
                found: 3
            })
        ));
        assert!(matches!(
            SparseBlockMatrix::<f64>::from_topology(&mesh, &[1, 0, 1, 1]),
            Err(MatrixError::EmptyBlock { node: 1 })
        ));
    }

    #[test]
    fn clear_and_dirichlet_rows_keep_the_pattern() {
        let mesh = create_line_segment_mesh_1d(1.0, 2, 0.0).unwrap();
        let mut matrix = SparseBlockMatrix::<f64>::from_topology(&mesh, &[3, 3, 1]).unwrap();
        for row in 0..matrix.nrows() {
            for column in matrix.row(row).0.to_vec() {
                *matrix.entry_mut(row, column).unwrap() = 1.0;
            }
        }
        matrix.rhs_mut().fill(2.0);
        matrix.apply_dirichlet(0, 1e-12).unwrap();
        for row in 0..3 {
            let (columns, values) = matrix.row(row);
            for (&column, &value) in columns.iter().zip(values) {
                assert_eq!(value, if column == row { 1e-12 } else { 0.0 });
            }
            assert_eq!(matrix.rhs()[row], 0.0);
        }
        assert_eq!(matrix.entry(3, 0).unwrap(), 1.0);

        let nnz = matrix.nnz();
        matrix.clear();
        assert_eq!(matrix.nnz(), nnz);
        assert!((0..matrix.nrows()).all(|row| matrix.row(row).1.iter().all(|&v| v == 0.0)));
        assert_eq!(matrix.rhs_norm(), 0.0);
    }
}
