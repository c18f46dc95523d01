// Copyright 2022 Chris Gubbin
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Solution of the assembled system

use super::SparseBlockMatrix;
use crate::{error::MatrixError, Scalar};
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

impl<T: Scalar> SparseBlockMatrix<T> {
    /// Solves `A x = b`, overwriting the solution vector
    ///
    /// Columns are scaled by the diagonal of the matching row before factorisation and the
    /// scaling is removed afterwards, also when the factorisation fails. When `dump` names a
    /// directory the assembled system is written to `Ab.mtx` and the solution with its
    /// componentwise residual to `x.mtx`.
    pub fn solve(&mut self, dump: Option<&Path>) -> Result<(), MatrixError> {
        if let Some(directory) = dump {
            self.write_system(&directory.join("Ab.mtx"))?;
        }

        let scale = self.diagonal_scale();
        self.scale_columns(&scale, |value, factor| value / factor);
        let factorised =
            self.factorisation
                .factorise(&self.pattern, &self.values, self.pivot_tolerance);
        if factorised.is_ok() {
            self.factorisation.substitute(&self.rhs, &mut self.solution);
        }
        self.scale_columns(&scale, |value, factor| value * factor);
        factorised?;

        self.solution
            .iter_mut()
            .zip(scale.iter())
            .for_each(|(value, &factor)| *value /= factor);

        if let Some(directory) = dump {
            self.write_solution(&directory.join("x.mtx"))?;
        }
        Ok(())
    }

    /// The diagonal of every row, or one where it is zero or absent
    fn diagonal_scale(&self) -> Vec<T> {
        (0..self.nrows())
            .map(|row| match self.entry(row, row) {
                Ok(diagonal) if diagonal != T::zero() => diagonal,
                _ => T::one(),
            })
            .collect()
    }

    fn scale_columns(&mut self, scale: &[T], operation: impl Fn(T, T) -> T) {
        for (value, &column) in self.values.iter_mut().zip(self.pattern.minor_indices()) {
            *value = operation(*value, scale[column]);
        }
    }

    fn write_system(&self, path: &Path) -> Result<(), MatrixError> {
        let mut writer = BufWriter::new(File::create(path)?);
        writeln!(writer, "### --- A ---")?;
        for row in 0..self.nrows() {
            let (columns, values) = self.row(row);
            for (column, value) in columns.iter().zip(values) {
                writeln!(writer, "{} {} {:.16e}", row, column, value)?;
            }
        }
        writeln!(writer)?;
        writeln!(writer, "### --- b ---")?;
        for (row, value) in self.rhs.iter().enumerate() {
            writeln!(writer, "{} {:.16e}", row, value)?;
        }
        writer.flush()?;
        Ok(())
    }

    fn write_solution(&self, path: &Path) -> Result<(), MatrixError> {
        let mut writer = BufWriter::new(File::create(path)?);
        writeln!(writer, "### --- x, b-Ax, (b-Ax)/max(b,Ax) ---")?;
        for row in 0..self.nrows() {
            let (columns, values) = self.row(row);
            let mut residual = self.rhs[row];
            let mut magnitude = self.rhs[row].abs();
            for (&column, &value) in columns.iter().zip(values) {
                let term = value * self.solution[column];
                residual -= term;
                magnitude = magnitude.max(term.abs());
            }
            if magnitude == T::zero() {
                magnitude = T::one();
            }
            writeln!(
                writer,
                "{} {:.16e} {:.16e} {:.16e}",
                row,
                self.solution[row],
                residual,
                (residual / magnitude).abs()
            )?;
        }
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use crate::sparse::SparseBlockMatrix;
    use approx::assert_relative_eq;
    use drifter_mesher::create_line_segment_mesh_1d;
    use nalgebra::DVector;
    use rand::{thread_rng, Rng};

    /// Fills every stored entry randomly, making each row strictly diagonally dominant
    fn diagonally_dominant(matrix: &mut SparseBlockMatrix<f64>) {
        let mut rng = thread_rng();
        for row in 0..matrix.nrows() {
            let (columns, _) = matrix.row(row);
            let columns = columns.to_vec();
            let mut off_diagonal = 0.0;
            for &column in columns.iter().filter(|&&column| column != row) {
                let value: f64 = rng.gen_range(-1.0..1.0);
                off_diagonal += value.abs();
                *matrix.entry_mut(row, column).unwrap() = value;
            }
            let sign = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
            *matrix.entry_mut(row, row).unwrap() = sign * (off_diagonal + rng.gen_range(0.5..2.0));
        }
    }

    fn multiply(matrix: &SparseBlockMatrix<f64>, x: &DVector<f64>) -> DVector<f64> {
        DVector::from_iterator(
            matrix.nrows(),
            (0..matrix.nrows()).map(|row| {
                let (columns, values) = matrix.row(row);
                columns
                    .iter()
                    .zip(values)
                    .map(|(&column, &value)| value * x[column])
                    .sum::<f64>()
            }),
        )
    }

    #[test]
    fn diagonally_dominant_block_system_is_solved() {
        let mesh = create_line_segment_mesh_1d(1.0, 9, 0.0).unwrap();
        let blocks = [1, 3, 3, 3, 1, 1, 3, 3, 3, 1];
        let mut matrix = SparseBlockMatrix::from_topology(&mesh, &blocks).unwrap();
        diagonally_dominant(&mut matrix);

        let mut rng = thread_rng();
        let expected = DVector::from_iterator(
            matrix.nrows(),
            (0..matrix.nrows()).map(|_| rng.gen_range(-10.0..10.0)),
        );
        *matrix.rhs_mut() = multiply(&matrix, &expected);

        matrix.solve(None).unwrap();
        for (computed, exact) in matrix.solution().iter().zip(expected.iter()) {
            assert_relative_eq!(*computed, *exact, epsilon = 1e-10);
        }
        assert!(matrix.residual_norm() <= 1e-12 * matrix.rhs_norm());
    }

    #[test]
    fn scaling_is_removed_after_the_solve() {
        let mesh = create_line_segment_mesh_1d(1.0, 5, 0.0).unwrap();
        let mut matrix = SparseBlockMatrix::from_topology(&mesh, &[3; 6]).unwrap();
        diagonally_dominant(&mut matrix);
        // Rows spanning many decades, as in the coupled carrier system
        for row in 0..matrix.nrows() {
            let factor = 10f64.powi(row as i32 - 8);
            let (columns, _) = matrix.row(row);
            for column in columns.to_vec() {
                *matrix.entry_mut(row, column).unwrap() *= factor;
            }
        }
        let before: Vec<f64> = (0..matrix.nrows())
            .flat_map(|row| matrix.row(row).1.to_vec())
            .collect();
        matrix.rhs_mut().fill(1.0);

        matrix.solve(None).unwrap();
        let after: Vec<f64> = (0..matrix.nrows())
            .flat_map(|row| matrix.row(row).1.to_vec())
            .collect();
        for (a, b) in before.iter().zip(after.iter()) {
            assert_relative_eq!(*a, *b, max_relative = 1e-15);
        }
        // Rows differ by decades, so each row is judged against its own magnitude
        let x = matrix.solution();
        for row in 0..matrix.nrows() {
            let (columns, values) = matrix.row(row);
            let (product, magnitude) = columns.iter().zip(values).fold(
                (0.0, 0.0),
                |(product, magnitude), (&column, &value)| {
                    (product + value * x[column], magnitude + (value * x[column]).abs())
                },
            );
            let b = matrix.rhs()[row];
            let backward_error = (b - product).abs() / (magnitude + b.abs());
            assert!(backward_error < 1e3 * f64::EPSILON, "row {}: {:e}", row, backward_error);
        }
    }

    #[test]
    fn singular_system_does_not_produce_a_solution() {
        let mesh = create_line_segment_mesh_1d(1.0, 3, 0.0).unwrap();
        let mut matrix = SparseBlockMatrix::<f64>::from_topology(&mesh, &[1; 4]).unwrap();
        matrix.rhs_mut().fill(1.0);
        let result = matrix.solve(None);
        assert!(matches!(
            result,
            Err(crate::error::MatrixError::SingularPivot { row: 0, .. })
        ));
        assert!(matrix.solution().iter().all(|&x| x == 0.0));
    }

    #[test]
    fn dumps_are_written_when_requested() {
        let directory = tempfile::tempdir().unwrap();
        let mesh = create_line_segment_mesh_1d(1.0, 2, 0.0).unwrap();
        let mut matrix = SparseBlockMatrix::from_topology(&mesh, &[1; 3]).unwrap();
        diagonally_dominant(&mut matrix);
        matrix.rhs_mut().fill(1.0);
        matrix.solve(Some(directory.path())).unwrap();

        let system = std::fs::read_to_string(directory.path().join("Ab.mtx")).unwrap();
        assert!(system.starts_with("### --- A ---"));
        assert!(system.contains("### --- b ---"));
        assert_eq!(system.lines().count(), 1 + 7 + 1 + 1 + 3);

        let solution = std::fs::read_to_string(directory.path().join("x.mtx")).unwrap();
        let lines: Vec<&str> = solution.lines().collect();
        assert_eq!(lines.len(), 4);
        for line in &lines[1..] {
            let fields: Vec<f64> = line
                .split_whitespace()
                .skip(1)
                .map(|field| field.parse().unwrap())
                .collect();
            assert!(fields[2] < 1e-12);
        }
    }
}
