pub mod structures;

use drifter_dd::sparse::SparseBlockMatrix;
use drifter_mesher::create_line_segment_mesh_1d;
use rand::{thread_rng, Rng};

/// A random, strictly diagonally dominant system on a chain of `num_nodes` nodes
///
/// Every node carries `block_size` unknowns, coupled to those of its neighbours.
pub fn construct_block_system(num_nodes: usize, block_size: usize) -> SparseBlockMatrix<f64> {
    let mut rng = thread_rng();
    let mesh = create_line_segment_mesh_1d(1.0, num_nodes - 1, 0.0)
        .expect("Mesh data must be valid");
    let mut matrix = SparseBlockMatrix::from_topology(&mesh, &vec![block_size; num_nodes])
        .expect("Block sizes must match the mesh");

    for row in 0..matrix.nrows() {
        let (columns, _) = matrix.row(row);
        let columns = columns.to_vec();
        let mut off_diagonal = 0.0;
        for &column in columns.iter().filter(|&&column| column != row) {
            let value: f64 = rng.gen_range(-1.0..1.0);
            *matrix.entry_mut(row, column).unwrap() = value;
            off_diagonal += value.abs();
        }
        *matrix.entry_mut(row, row).unwrap() = off_diagonal + rng.gen_range(1.0..2.0);
        matrix.rhs_mut()[row] = rng.gen();
    }
    matrix
}
