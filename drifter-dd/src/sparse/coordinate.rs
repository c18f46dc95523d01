// Copyright 2022 Chris Gubbin
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Reading and writing matrices in coordinate format
//!
//! Lines starting with `%` and blank lines are ignored. The first remaining line holds
//! `rows columns entries`, every following line a one-based `row column value` triplet.

use super::{assembler::assemble_pattern, SparseBlockMatrix};
use crate::{error::MatrixError, Scalar};
use std::{
    collections::{BTreeMap, BTreeSet},
    fs::File,
    io::{BufRead, BufReader, BufWriter, Write},
    path::Path,
};

impl<T: Scalar> SparseBlockMatrix<T> {
    /// Loads a matrix from a coordinate file, every row forming its own block
    ///
    /// Transposed positions missing from the file are stored as explicit zeros so the pattern
    /// stays symmetric, and the diagonal is always present. Repeated triplets keep the last
    /// value.
    pub fn from_coordinate_file<P: AsRef<Path>>(path: P) -> Result<Self, MatrixError> {
        let reader = BufReader::new(File::open(path.as_ref())?);

        let mut size: Option<(usize, usize)> = None;
        let mut triplets: BTreeMap<(usize, usize), T> = BTreeMap::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            let line_number = index + 1;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('%') {
                continue;
            }
            let fields: Vec<&str> = trimmed.split_whitespace().collect();
            let malformed = |reason: &str| MatrixError::Parse {
                line: line_number,
                reason: reason.to_string(),
            };
            if fields.len() != 3 {
                return Err(malformed("expected three fields"));
            }

            match size {
                None => {
                    let parsed = fields
                        .iter()
                        .map(|field| field.parse::<usize>())
                        .collect::<Result<Vec<_>, _>>()
                        .map_err(|_| malformed("the size line must hold three integers"))?;
                    if parsed[0] != parsed[1] {
                        return Err(malformed("the matrix must be square"));
                    }
                    tracing::debug!(
                        "Reading a {} x {} matrix with {} entries",
                        parsed[0],
                        parsed[1],
                        parsed[2]
                    );
                    size = Some((parsed[0], line_number));
                }
                Some((num_rows, _)) => {
                    let row = fields[0]
                        .parse::<usize>()
                        .map_err(|_| malformed("invalid row index"))?;
                    let column = fields[1]
                        .parse::<usize>()
                        .map_err(|_| malformed("invalid column index"))?;
                    let value = fields[2]
                        .parse::<T>()
                        .map_err(|_| malformed("invalid value"))?;
                    if row == 0 || row > num_rows || column == 0 || column > num_rows {
                        return Err(malformed("index outside the matrix"));
                    }
                    triplets.insert((row - 1, column - 1), value);
                }
            }
        }
        let (num_rows, _) = size.ok_or(MatrixError::MissingHeader)?;

        let mut matrix_entries = BTreeSet::new();
        for &(row, column) in triplets.keys() {
            matrix_entries.insert((row, column));
            matrix_entries.insert((column, row));
        }
        matrix_entries.extend((0..num_rows).map(|row| (row, row)));

        let pattern = assemble_pattern(num_rows, matrix_entries)?;
        let mut matrix = Self::from_pattern(pattern, vec![1; num_rows]);
        for ((row, column), value) in triplets {
            *matrix.entry_mut(row, column)? = value;
        }
        Ok(matrix)
    }

    /// Writes every stored entry, including explicit zeros, in coordinate format
    pub fn write_coordinate<P: AsRef<Path>>(&self, path: P) -> Result<(), MatrixError> {
        let mut writer = BufWriter::new(File::create(path.as_ref())?);
        writeln!(writer, "% block matrix, one-based row column value")?;
        writeln!(writer, "{} {} {}", self.nrows(), self.nrows(), self.nnz())?;
        for row in 0..self.nrows() {
            let (columns, values) = self.row(row);
            for (column, value) in columns.iter().zip(values) {
                writeln!(writer, "{} {} {:.16e}", row + 1, column + 1, value)?;
            }
        }
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use crate::{error::MatrixError, sparse::SparseBlockMatrix};
    use drifter_mesher::create_line_segment_mesh_1d;
    use std::io::Write;

    fn write(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn round_trip_reproduces_pattern_and_coefficients() {
        let mesh = create_line_segment_mesh_1d(1.0, 4, 0.0).unwrap();
        let mut matrix = SparseBlockMatrix::<f64>::from_topology(&mesh, &[1; 5]).unwrap();
        for row in 0..matrix.nrows() {
            for column in matrix.row(row).0.to_vec() {
                let value = if row == column {
                    4.0 + row as f64
                } else {
                    -1.0 / (1.0 + row as f64 + 3.0 * column as f64)
                };
                *matrix.entry_mut(row, column).unwrap() = value;
            }
        }
        let file = tempfile::NamedTempFile::new().unwrap();
        matrix.write_coordinate(file.path()).unwrap();

        let read = SparseBlockMatrix::<f64>::from_coordinate_file(file.path()).unwrap();
        assert_eq!(read.pattern(), matrix.pattern());
        for row in 0..matrix.nrows() {
            assert_eq!(read.row(row).1, matrix.row(row).1);
        }
    }

    #[test]
    fn comments_are_skipped_and_pattern_is_completed() {
        let file = write(concat!(
            "%%MatrixMarket matrix coordinate real general\n",
            "% comment\n\n",
            "3 3 4\n1 1 2.0\n2 1 -1\n2 2 3e0\n3 3 1.5\n",
        ));
        let mut matrix = SparseBlockMatrix::<f64>::from_coordinate_file(file.path()).unwrap();
        assert_eq!(matrix.nrows(), 3);
        assert_eq!(matrix.block_size(2), 1);
        assert_eq!(matrix.entry(1, 0).unwrap(), -1.0);
        assert_eq!(matrix.entry(0, 1).unwrap(), 0.0);
        assert!(matrix.entry(0, 2).is_err());

        matrix.rhs_mut().copy_from_slice(&[2.0, 2.0, 3.0]);
        matrix.solve(None).unwrap();
        let expected = [1.0, 1.0, 2.0];
        for (computed, exact) in matrix.solution().iter().zip(expected) {
            approx::assert_relative_eq!(*computed, exact, epsilon = 1e-14);
        }
    }

    #[test]
    fn malformed_lines_are_reported_with_their_number() {
        let file = write("% header\n2 2 2\n1 1 1.0\n2 x 1.0\n");
        assert!(matches!(
            SparseBlockMatrix::<f64>::from_coordinate_file(file.path()),
            Err(MatrixError::Parse { line: 4, .. })
        ));

        let file = write("2 2 1\n3 1 1.0\n");
        assert!(matches!(
            SparseBlockMatrix::<f64>::from_coordinate_file(file.path()),
            Err(MatrixError::Parse { line: 2, .. })
        ));

        let file = write("% only comments\n");
        assert!(matches!(
            SparseBlockMatrix::<f64>::from_coordinate_file(file.path()),
            Err(MatrixError::MissingHeader)
        ));
    }

    #[test]
    fn unreadable_file_is_an_io_error() {
        let directory = tempfile::tempdir().unwrap();
        assert!(matches!(
            SparseBlockMatrix::<f64>::from_coordinate_file(directory.path().join("missing.mtx")),
            Err(MatrixError::Io(_))
        ));
    }
}
