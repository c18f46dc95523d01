// Copyright 2022 Chris Gubbin
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! # Newton
//!
//! Newton-Raphson solvers for the discretised drift-diffusion equations.
//!
//! Each iteration assembles the Jacobian and the negative residual of the equations into a
//! `SparseBlockMatrix`, solves for the increment and applies it to the `Field`. Convergence
//! requires both a small relative increment and a small scaled residual.
//!
//! Two variants are provided:
//! - the `PoissonSolver` holds the quasi-Fermi levels fixed and solves for the potential alone,
//!   giving the equilibrium state;
//! - the `DriftDiffusionSolver` couples the potential to the electron and hole continuity
//!   equations, discretised with the Scharfetter-Gummel scheme.

mod assembly;
mod convergence;
mod drift_diffusion;
mod poisson;

pub use convergence::{
    Convergence, DampingPolicy, Extremum, IncrementPolicy, IncrementReport, PotentialUpdate,
    ResidualReport, Unknown,
};
pub use drift_diffusion::DriftDiffusionSolver;
pub use poisson::PoissonSolver;

use crate::{
    error::{BuildError, NewtonError},
    field::Field,
    Scalar,
};
use drifter_mesher::DeviceTopology;
use std::marker::PhantomData;

/// A single Newton iteration split into its phases
///
/// A cycle runs `setup`, then repeatedly `solve`, `update` and `setup` until `is_converged`.
pub trait NewtonStep<T: Scalar> {
    /// Places the contacts at their built-in potentials, the last contact offset by `voltage`
    fn set_voltage(&mut self, voltage: T);
    /// Assembles the Jacobian and residual at the current field and checks the residual
    fn setup(&mut self) -> Result<(), NewtonError>;
    /// Solves for the increment
    fn solve(&mut self) -> Result<(), NewtonError>;
    /// Applies the increment to the field and checks its relative size
    fn update(&mut self) -> Result<(), NewtonError>;
    /// Whether the most recent `update` and `setup` both converged
    fn is_converged(&self) -> bool;
    fn maximum_iterations(&self) -> usize;
    fn field(&self) -> &Field<T>;

    /// Iterates to convergence, returning the number of iterations taken
    fn run_to_convergence(&mut self) -> Result<usize, NewtonError> {
        self.run_to_convergence_with(|_, _| Ok(()))
    }

    /// Iterates to convergence, calling `on_iteration` with the field after every iteration
    fn run_to_convergence_with<F>(&mut self, mut on_iteration: F) -> Result<usize, NewtonError>
    where
        F: FnMut(usize, &Field<T>) -> Result<(), NewtonError>,
    {
        self.setup()?;
        let mut iteration = 0;
        loop {
            iteration += 1;
            tracing::info!("Newton iteration {}", iteration);
            self.solve()?;
            self.update()?;
            self.setup()?;
            on_iteration(iteration, self.field())?;
            if self.is_converged() {
                return Ok(iteration);
            }
            if iteration >= self.maximum_iterations() {
                tracing::error!("No convergence within {} iterations", iteration);
                return Err(NewtonError::IterationBudget {
                    iterations: iteration,
                });
            }
        }
    }
}

/// Builder for the Newton solvers
pub struct NewtonSolverBuilder<T, RefMesh, RefInfoDesk, RefField, RefConvergence> {
    mesh: RefMesh,
    info_desk: RefInfoDesk,
    field: RefField,
    convergence: RefConvergence,
    marker: PhantomData<T>,
}

impl<T> NewtonSolverBuilder<T, (), (), (), ()> {
    /// Initialise an empty NewtonSolverBuilder
    pub fn new() -> Self {
        Self {
            mesh: (),
            info_desk: (),
            field: (),
            convergence: (),
            marker: PhantomData,
        }
    }
}

impl<T> Default for NewtonSolverBuilder<T, (), (), (), ()> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, RefMesh, RefInfoDesk, RefField, RefConvergence>
    NewtonSolverBuilder<T, RefMesh, RefInfoDesk, RefField, RefConvergence>
{
    /// Attach the problem's mesh
    pub fn with_mesh<Mesh>(
        self,
        mesh: &Mesh,
    ) -> NewtonSolverBuilder<T, &Mesh, RefInfoDesk, RefField, RefConvergence> {
        NewtonSolverBuilder {
            mesh,
            info_desk: self.info_desk,
            field: self.field,
            convergence: self.convergence,
            marker: PhantomData,
        }
    }

    /// Attach the info desk describing the material of every region
    pub fn with_info_desk<InfoDesk>(
        self,
        info_desk: &InfoDesk,
    ) -> NewtonSolverBuilder<T, RefMesh, &InfoDesk, RefField, RefConvergence> {
        NewtonSolverBuilder {
            mesh: self.mesh,
            info_desk,
            field: self.field,
            convergence: self.convergence,
            marker: PhantomData,
        }
    }

    /// Attach the field the solver iterates on
    pub fn with_field(
        self,
        field: &mut Field<T>,
    ) -> NewtonSolverBuilder<T, RefMesh, RefInfoDesk, &mut Field<T>, RefConvergence>
    where
        T: Scalar,
    {
        NewtonSolverBuilder {
            mesh: self.mesh,
            info_desk: self.info_desk,
            field,
            convergence: self.convergence,
            marker: PhantomData,
        }
    }

    /// Attach the tolerances and policies of the iteration
    pub fn with_convergence_settings<Settings>(
        self,
        convergence: &Settings,
    ) -> NewtonSolverBuilder<T, RefMesh, RefInfoDesk, RefField, &Settings> {
        NewtonSolverBuilder {
            mesh: self.mesh,
            info_desk: self.info_desk,
            field: self.field,
            convergence,
            marker: PhantomData,
        }
    }
}

/// Checks the mesh can hold two contacts and matches the field
fn validate<T: Scalar, Mesh: DeviceTopology<T>>(
    mesh: &Mesh,
    field: &Field<T>,
) -> Result<(), BuildError> {
    let num_nodes = mesh.number_of_nodes();
    if num_nodes < 2 {
        return Err(BuildError::TooFewNodes(num_nodes));
    }
    if field.num_nodes() != num_nodes {
        return Err(BuildError::FieldSize {
            expected: num_nodes,
            found: field.num_nodes(),
        });
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::device::{DeviceInfoDesk, Material};
    use drifter_mesher::{create_line_segment_mesh_1d_from_regions, Mesh1d, Region};

    /// An abrupt silicon junction of two 0.5 um layers
    pub(crate) fn junction(
        donor_density: f64,
        acceptor_density: f64,
        divisions: usize,
    ) -> (Mesh1d<f64>, DeviceInfoDesk<f64>) {
        let region = Region {
            thickness: 0.5,
            divisions,
            priority: 0,
        };
        let mesh = create_line_segment_mesh_1d_from_regions(&[region, region], 0.0)
            .unwrap()
            .with_length_scale(1e-4)
            .with_cross_section(1e-8);
        let info_desk = DeviceInfoDesk::from_layers(
            vec![Material::Silicon; 2],
            vec![donor_density, 0.0],
            vec![0.0, acceptor_density],
            300.0,
        )
        .unwrap();
        (mesh, info_desk)
    }

    /// A uniformly doped 1 um silicon bar with `num_nodes` nodes
    pub(crate) fn bar(donor_density: f64, num_nodes: usize) -> (Mesh1d<f64>, DeviceInfoDesk<f64>) {
        let region = Region {
            thickness: 1.0,
            divisions: num_nodes - 1,
            priority: 0,
        };
        let mesh = create_line_segment_mesh_1d_from_regions(&[region], 0.0)
            .unwrap()
            .with_length_scale(1e-4);
        let info_desk = DeviceInfoDesk::from_layers(
            vec![Material::Silicon],
            vec![donor_density],
            vec![0.0],
            300.0,
        )
        .unwrap();
        (mesh, info_desk)
    }
}
