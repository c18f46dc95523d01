use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use drifter_dd::newton::{Convergence, NewtonSolverBuilder, NewtonStep};
use utilities::{
    construct_block_system,
    structures::{construct_npn_device, construct_problem},
};

pub fn bench_block_matrix_solve(c: &mut Criterion) {
    let mut group = c.benchmark_group("block_matrix_solve");

    for num_nodes in [32, 64, 128, 256, 512, 1024, 2048].into_iter() {
        for block_size in [1, 3] {
            let matrix = construct_block_system(num_nodes, block_size);
            group.bench_with_input(
                BenchmarkId::new(format!("block_{}", block_size), num_nodes),
                &num_nodes,
                |b, _| {
                    b.iter_batched(
                        || matrix.clone(),
                        |mut matrix| matrix.solve(black_box(None)).unwrap(),
                        criterion::BatchSize::SmallInput,
                    )
                },
            );
        }
    }
    group.finish();
}

pub fn bench_drift_diffusion_setup(c: &mut Criterion) {
    let mut group = c.benchmark_group("drift_diffusion_setup");

    for divisions in [50, 100, 200].into_iter() {
        let device = construct_npn_device(divisions);
        let (mesh, info_desk, mut field) = construct_problem(&device);
        let convergence = Convergence::new(1e-2, 1e-5, 100);
        let mut solver = NewtonSolverBuilder::new()
            .with_mesh(&mesh)
            .with_info_desk(&info_desk)
            .with_field(&mut field)
            .with_convergence_settings(&convergence)
            .build_drift_diffusion()
            .unwrap();
        solver.set_voltage(0.0);
        group.bench_with_input(
            BenchmarkId::from_parameter(mesh_nodes(divisions)),
            &divisions,
            |b, _| b.iter(|| solver.setup().unwrap()),
        );
    }
    group.finish();
}

fn mesh_nodes(divisions: usize) -> usize {
    3 * divisions + 1
}

criterion_group!(
    benches,
    bench_block_matrix_solve,
    bench_drift_diffusion_setup
);
criterion_main!(benches);
