// Copyright 2022 Chris Gubbin
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The single carrier Newton solver
//!
//! Solves Poisson's equation for the potential with the quasi-Fermi levels held fixed, the
//! carrier densities following the potential through the Boltzmann relations.

use super::{
    assembly::{max_abs, semiconductor_volumes, PoissonEdge},
    validate, Convergence, Extremum, NewtonSolverBuilder, NewtonStep, PotentialUpdate,
    ResidualReport,
};
use crate::{
    constants::ELECTRON_CHARGE,
    device::{info_desk::thermal_voltage, MaterialModel, RegionInfoDesk},
    error::{BuildError, NewtonError},
    field::Field,
    sparse::SparseBlockMatrix,
    Scalar,
};
use drifter_mesher::DeviceTopology;

/// A Newton solver for the potential alone
pub struct PoissonSolver<'a, T: Scalar, Mesh, InfoDesk> {
    mesh: &'a Mesh,
    info_desk: &'a InfoDesk,
    field: &'a mut Field<T>,
    convergence: &'a Convergence<T>,
    matrix: SparseBlockMatrix<T>,
    /// The largest off-diagonal term acting on each node, `Axj`
    coupling: Vec<T>,
    /// The physical scale of the residual at each node
    scale: Vec<T>,
    increment_converged: bool,
    residual_converged: bool,
    residual_report: ResidualReport<T>,
    increment_report: Extremum<T>,
}

impl<'a, T, Mesh, InfoDesk>
    NewtonSolverBuilder<T, &'a Mesh, &'a InfoDesk, &'a mut Field<T>, &'a Convergence<T>>
where
    T: Scalar,
    Mesh: DeviceTopology<T>,
    InfoDesk: RegionInfoDesk<T>,
{
    /// Build the single carrier solver, with one unknown per node
    pub fn build_poisson(self) -> Result<PoissonSolver<'a, T, Mesh, InfoDesk>, BuildError> {
        validate(self.mesh, self.field)?;
        let num_nodes = self.mesh.number_of_nodes();
        let matrix = SparseBlockMatrix::from_topology(self.mesh, &vec![1; num_nodes])?
            .with_pivot_tolerance(self.convergence.pivot_tolerance);
        Ok(PoissonSolver {
            mesh: self.mesh,
            info_desk: self.info_desk,
            field: self.field,
            convergence: self.convergence,
            matrix,
            coupling: vec![T::zero(); num_nodes],
            scale: vec![T::zero(); num_nodes],
            increment_converged: false,
            residual_converged: false,
            residual_report: ResidualReport::default(),
            increment_report: Extremum::default(),
        })
    }
}

impl<'a, T, Mesh, InfoDesk> PoissonSolver<'a, T, Mesh, InfoDesk>
where
    T: Scalar,
    Mesh: DeviceTopology<T>,
    InfoDesk: RegionInfoDesk<T>,
{
    pub fn matrix(&self) -> &SparseBlockMatrix<T> {
        &self.matrix
    }

    /// The residual diagnostics of the last `setup`
    pub fn residual_report(&self) -> &ResidualReport<T> {
        &self.residual_report
    }

    /// The largest `dx / (|psi| + 1e-3)` of the last `update`
    pub fn increment_report(&self) -> &Extremum<T> {
        &self.increment_report
    }

    fn last_node(&self) -> usize {
        self.mesh.number_of_nodes() - 1
    }

    fn built_in_potential(&self, node: usize) -> T {
        let material = self.info_desk.material(self.mesh.node_region(node));
        material.built_in_potential(
            self.info_desk.temperature(),
            self.field.donor_density[node],
            self.field.acceptor_density[node],
        )
    }

    /// Adds the space charge of every semiconductor control volume
    #[numeric_literals::replace_float_literals(T::from_f64_constant(literal))]
    fn assemble_space_charge(&mut self) -> Result<(), NewtonError> {
        let q = T::from_f64_constant(ELECTRON_CHARGE);
        let q_squared_per_kt = q / thermal_voltage(self.info_desk.temperature());
        let field = &*self.field;
        for node in 0..self.mesh.number_of_nodes() {
            let (nd, na) = (field.donor_density[node], field.acceptor_density[node]);
            let (n, p) = (field.electron_density[node], field.hole_density[node]);
            let mut volume = 0.0;
            for cv in semiconductor_volumes(self.mesh, self.info_desk, node) {
                volume += cv;
                *self.matrix.block_entry_mut(node, node, 0, 0)? += q_squared_per_kt * (n + p) * cv;
                *self.matrix.block_rhs_mut(node, 0)? += q * (nd - na + p - n) * cv;
            }
            let charge_scale = max_abs(&[nd, na, p, n]) * q * volume;
            self.scale[node] = self.scale[node].max(charge_scale);
        }
        Ok(())
    }

    /// Collects the residual diagnostics over the interior nodes
    #[numeric_literals::replace_float_literals(T::from_f64_constant(literal))]
    fn check_residual(&mut self) -> Result<(), NewtonError> {
        let mut report = ResidualReport::default();
        for node in 1..self.last_node() {
            let rhs = self.matrix.block_rhs(node, 0)?;
            report.rhs.offer(node, rhs);

            let diagonal = self.matrix.block_entry(node, node, 0, 0)?;
            let reference = self.coupling[node] + (diagonal * 1e-3).abs();
            if reference != 0.0 {
                report.coupled.offer(node, rhs / reference);
            }
            if self.scale[node] != 0.0 {
                report.scaled.offer(node, rhs.abs() / self.scale[node]);
            }
        }
        tracing::info!("||b|| = {:e}", self.matrix.rhs_norm());
        tracing::debug!("max.b: {}", report.rhs);
        tracing::info!("RES: {}", report.coupled);
        tracing::debug!("Qv: {}", report.scaled);

        self.residual_converged = report.coupled.magnitude() < self.convergence.residual_tolerance;
        self.residual_report = report;
        Ok(())
    }
}

impl<'a, T, Mesh, InfoDesk> NewtonStep<T> for PoissonSolver<'a, T, Mesh, InfoDesk>
where
    T: Scalar,
    Mesh: DeviceTopology<T>,
    InfoDesk: RegionInfoDesk<T>,
{
    fn set_voltage(&mut self, voltage: T) {
        let last = self.last_node();
        self.field.potential[0] = self.built_in_potential(0);
        self.field.potential[last] = voltage + self.built_in_potential(last);
    }

    #[tracing::instrument(name = "poisson setup", skip_all)]
    fn setup(&mut self) -> Result<(), NewtonError> {
        self.matrix.clear();
        self.coupling.fill(T::zero());
        self.scale.fill(T::zero());

        for element in 0..self.mesh.number_of_elements() {
            PoissonEdge::new(self.mesh, self.info_desk, &self.field.potential, element)
                .assemble(&mut self.matrix, &mut self.scale, &mut self.coupling, 1)?;
        }
        self.assemble_space_charge()?;

        let diagonal = self.convergence.dirichlet_diagonal;
        self.matrix.apply_dirichlet(0, diagonal)?;
        self.matrix.apply_dirichlet(self.last_node(), diagonal)?;

        self.check_residual()
    }

    #[tracing::instrument(name = "poisson solve", skip_all)]
    fn solve(&mut self) -> Result<(), NewtonError> {
        self.matrix.solve(None)?;

        let mut largest = Extremum::default();
        for (node, &dx) in self.matrix.solution().iter().enumerate() {
            largest.offer(node, dx);
        }
        tracing::info!(
            "||dx|| = {:e}, ||r|| = {:e}",
            self.matrix.solution_norm(),
            self.matrix.residual_norm()
        );
        tracing::debug!("max.dx: {}", largest);
        Ok(())
    }

    #[tracing::instrument(name = "poisson update", skip_all)]
    #[numeric_literals::replace_float_literals(T::from_f64_constant(literal))]
    fn update(&mut self) -> Result<(), NewtonError> {
        let thermal = thermal_voltage(self.info_desk.temperature());
        let last = self.last_node();
        let increment = self.matrix.solution();
        let field = &mut *self.field;

        for node in 0..=last {
            let dx = increment[node];
            match self.convergence.potential_update {
                PotentialUpdate::ScaleBoundary if node == 0 || node == last => {
                    field.potential[node] *= dx
                }
                _ => field.potential[node] += dx,
            }
            let psi = field.potential[node];
            let ni = field.intrinsic_density[node];
            field.electron_density[node] =
                ni * ((psi - field.electron_quasi_fermi_level[node]) / thermal).exp();
            field.hole_density[node] =
                ni * ((field.hole_quasi_fermi_level[node] - psi) / thermal).exp();
        }

        let mut report = Extremum::default();
        for (node, &dx) in increment.iter().enumerate() {
            report.offer(node, dx / (field.potential[node].abs() + 1e-3));
        }
        tracing::info!("DEL: {}", report);

        self.increment_converged = report.magnitude() < self.convergence.increment_tolerance;
        self.increment_report = report;
        Ok(())
    }

    fn is_converged(&self) -> bool {
        tracing::info!(
            "DEL {}, RES {}",
            if self.increment_converged { "converged" } else { "not converged" },
            if self.residual_converged { "converged" } else { "not converged" }
        );
        self.increment_converged && self.residual_converged
    }

    fn maximum_iterations(&self) -> usize {
        self.convergence.maximum_iterations
    }

    fn field(&self) -> &Field<T> {
        &*self.field
    }
}

#[cfg(test)]
mod test {
    use crate::{
        device::{MaterialModel, RegionInfoDesk},
        error::NewtonError,
        field::Field,
        newton::{fixtures, Convergence, NewtonSolverBuilder, NewtonStep},
    };
    use drifter_mesher::DeviceTopology;

    #[test]
    fn uniform_bar_converges_within_ten_iterations() {
        let (mesh, info_desk) = fixtures::bar(1e17, 50);
        let mut field = Field::build(&mesh, &info_desk).unwrap();
        let convergence = Convergence::new(1e-2, 1e-5, 10);
        let mut solver = NewtonSolverBuilder::new()
            .with_mesh(&mesh)
            .with_info_desk(&info_desk)
            .with_field(&mut field)
            .with_convergence_settings(&convergence)
            .build_poisson()
            .unwrap();
        solver.set_voltage(0.0);
        let iterations = solver.run_to_convergence().unwrap();
        assert!(iterations <= 10);
        assert!(solver.increment_report().magnitude() < 1e-2);
    }

    #[test]
    fn contact_rows_hold_only_the_placeholder_diagonal() {
        let (mesh, info_desk) = fixtures::junction(1e17, 1e16, 10);
        let mut field = Field::build(&mesh, &info_desk).unwrap();
        let convergence = Convergence::new(1e-2, 1e-5, 10).with_dirichlet_diagonal(1e-9);
        let mut solver = NewtonSolverBuilder::new()
            .with_mesh(&mesh)
            .with_info_desk(&info_desk)
            .with_field(&mut field)
            .with_convergence_settings(&convergence)
            .build_poisson()
            .unwrap();
        solver.set_voltage(0.3);
        solver.setup().unwrap();

        let matrix = solver.matrix();
        for row in [0, matrix.nrows() - 1] {
            let (columns, values) = matrix.row(row);
            for (&column, &value) in columns.iter().zip(values) {
                let expected = if column == row { 1e-9 } else { 0.0 };
                assert_eq!(value, expected);
            }
            assert_eq!(matrix.rhs()[row], 0.0);
        }
        // Interior rows keep their coupling to the contacts
        assert!(matrix.entry(1, 0).unwrap() < 0.0);
    }

    #[test]
    fn junction_relaxes_to_equilibrium() {
        let (mesh, info_desk) = fixtures::junction(1e17, 1e16, 40);
        let mut field = Field::build(&mesh, &info_desk).unwrap();
        let convergence = Convergence::new(1e-2, 1e-5, 50);
        {
            let mut solver = NewtonSolverBuilder::new()
                .with_mesh(&mesh)
                .with_info_desk(&info_desk)
                .with_field(&mut field)
                .with_convergence_settings(&convergence)
                .build_poisson()
                .unwrap();
            solver.set_voltage(0.0);
            solver.run_to_convergence().unwrap();
            assert!(solver.is_converged());
        }

        let last = mesh.number_of_nodes() - 1;
        let silicon = info_desk.material(0);
        let temperature = info_desk.temperature();
        let psi = &field.potential;
        approx::assert_relative_eq!(
            psi[0],
            silicon.built_in_potential(temperature, 1e17, 0.0),
            max_relative = 1e-12
        );
        approx::assert_relative_eq!(
            psi[last],
            silicon.built_in_potential(temperature, 0.0, 1e16),
            max_relative = 1e-12
        );
        for node in 1..=last {
            assert!(psi[node] <= psi[node - 1] + 1e-9);
        }
        // The depletion region sits around the junction at node 40
        assert!(field.electron_density[40] < 5e16);
        assert!(field.hole_density[40] < 1e15);
    }

    #[test]
    fn exhausted_budget_is_an_error() {
        let (mesh, info_desk) = fixtures::junction(1e17, 1e16, 10);
        let mut field = Field::build(&mesh, &info_desk).unwrap();
        let convergence = Convergence::new(1e-2, 0.0, 2);
        let mut solver = NewtonSolverBuilder::new()
            .with_mesh(&mesh)
            .with_info_desk(&info_desk)
            .with_field(&mut field)
            .with_convergence_settings(&convergence)
            .build_poisson()
            .unwrap();
        solver.set_voltage(0.0);
        let mut seen = Vec::new();
        let result = solver.run_to_convergence_with(|iteration, _| {
            seen.push(iteration);
            Ok(())
        });
        assert!(matches!(
            result,
            Err(NewtonError::IterationBudget { iterations: 2 })
        ));
        assert_eq!(seen, vec![1, 2]);
    }
}
