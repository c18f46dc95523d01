// Copyright 2022 Chris Gubbin
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The two carrier Newton solver
//!
//! Couples Poisson's equation to the electron and hole continuity equations. Semiconductor
//! nodes carry the potential, electron density and hole density, insulator nodes the potential
//! alone. Carrier fluxes along each element use the Scharfetter-Gummel discretisation, written
//! in terms of the Bernoulli function.

use super::{
    assembly::{max_abs, semiconductor_volumes, PoissonEdge},
    validate, Convergence, DampingPolicy, Extremum, IncrementReport, NewtonSolverBuilder,
    NewtonStep, ResidualReport, Unknown,
};
use crate::{
    bernoulli::{bernoulli, bernoulli_derivative, exp_minus_one},
    constants::{BOLTZMANN, ELECTRON_CHARGE},
    device::{info_desk::thermal_voltage, MaterialModel, RegionInfoDesk},
    error::{BuildError, MatrixError, NewtonError},
    field::Field,
    sparse::SparseBlockMatrix,
    Scalar,
};
use drifter_mesher::DeviceTopology;

/// Unknowns held by a semiconductor node
const SEMICONDUCTOR_BLOCK: usize = 3;
/// Halvings after which the damping pre-pass gives up
const MAXIMUM_HALVINGS: usize = 64;

/// A Newton solver for the coupled potential and carrier densities
pub struct DriftDiffusionSolver<'a, T: Scalar, Mesh, InfoDesk> {
    mesh: &'a Mesh,
    info_desk: &'a InfoDesk,
    field: &'a mut Field<T>,
    convergence: &'a Convergence<T>,
    matrix: SparseBlockMatrix<T>,
    block_sizes: Vec<usize>,
    /// The largest off-diagonal term acting on each unknown, `Axj`, three slots per node
    coupling: Vec<T>,
    /// The physical scale of the residual of each unknown type at each node
    scales: [Vec<T>; 3],
    increment_converged: bool,
    residual_converged: bool,
    residual_reports: [ResidualReport<T>; 3],
    increment_reports: [IncrementReport<T>; 3],
    damping_factor: T,
}

impl<'a, T, Mesh, InfoDesk>
    NewtonSolverBuilder<T, &'a Mesh, &'a InfoDesk, &'a mut Field<T>, &'a Convergence<T>>
where
    T: Scalar,
    Mesh: DeviceTopology<T>,
    InfoDesk: RegionInfoDesk<T>,
{
    /// Build the two carrier solver
    ///
    /// Nodes governed by a semiconductor hold three unknowns, all others one.
    pub fn build_drift_diffusion(
        self,
    ) -> Result<DriftDiffusionSolver<'a, T, Mesh, InfoDesk>, BuildError> {
        validate(self.mesh, self.field)?;
        let num_nodes = self.mesh.number_of_nodes();
        let block_sizes: Vec<usize> = (0..num_nodes)
            .map(|node| {
                let material = self.info_desk.material(self.mesh.node_region(node));
                if material.is_semiconductor() {
                    SEMICONDUCTOR_BLOCK
                } else {
                    1
                }
            })
            .collect();
        let matrix = SparseBlockMatrix::from_topology(self.mesh, &block_sizes)?
            .with_pivot_tolerance(self.convergence.pivot_tolerance);
        tracing::info!(
            "Two carrier system with {} unknowns on {} nodes",
            matrix.nrows(),
            num_nodes
        );

        Ok(DriftDiffusionSolver {
            mesh: self.mesh,
            info_desk: self.info_desk,
            field: self.field,
            convergence: self.convergence,
            matrix,
            block_sizes,
            coupling: vec![T::zero(); num_nodes * SEMICONDUCTOR_BLOCK],
            scales: [
                vec![T::zero(); num_nodes],
                vec![T::zero(); num_nodes],
                vec![T::zero(); num_nodes],
            ],
            increment_converged: false,
            residual_converged: false,
            residual_reports: [ResidualReport::default(); 3],
            increment_reports: [IncrementReport::default(); 3],
            damping_factor: T::one(),
        })
    }
}

impl<'a, T, Mesh, InfoDesk> DriftDiffusionSolver<'a, T, Mesh, InfoDesk>
where
    T: Scalar,
    Mesh: DeviceTopology<T>,
    InfoDesk: RegionInfoDesk<T>,
{
    pub fn matrix(&self) -> &SparseBlockMatrix<T> {
        &self.matrix
    }

    pub fn block_sizes(&self) -> &[usize] {
        &self.block_sizes
    }

    /// The residual diagnostics of the last `setup`, indexed by `Unknown::sub_index`
    pub fn residual_reports(&self) -> &[ResidualReport<T>; 3] {
        &self.residual_reports
    }

    /// The increment diagnostics of the last `update`, indexed by `Unknown::sub_index`
    pub fn increment_reports(&self) -> &[IncrementReport<T>; 3] {
        &self.increment_reports
    }

    /// The damping factor found by the last `update`
    pub fn damping_factor(&self) -> T {
        self.damping_factor
    }

    fn last_node(&self) -> usize {
        self.mesh.number_of_nodes() - 1
    }

    fn unknowns(&self, node: usize) -> impl Iterator<Item = Unknown> {
        Unknown::ALL.into_iter().take(self.block_sizes[node])
    }

    fn built_in_potential(&self, node: usize) -> T {
        let material = self.info_desk.material(self.mesh.node_region(node));
        material.built_in_potential(
            self.info_desk.temperature(),
            self.field.donor_density[node],
            self.field.acceptor_density[node],
        )
    }

    /// Adds the Scharfetter-Gummel electron and hole fluxes across a semiconductor element
    #[allow(clippy::many_single_char_names)]
    fn assemble_fluxes(
        &mut self,
        element: usize,
        edge: &PoissonEdge<T>,
    ) -> Result<(), MatrixError> {
        let [i, j] = edge.nodes;
        let temperature = self.info_desk.temperature();
        let material = self.info_desk.material(self.mesh.element_region(element));
        let area = self.mesh.element_area(element);
        let kt_l =
            T::from_f64_constant(BOLTZMANN) * temperature / self.mesh.element_length(element);
        let q_kt = T::one() / thermal_voltage(temperature);
        let field = &*self.field;

        let energy_step = (field.intrinsic_density[j] / field.intrinsic_density[i]).ln();
        let delta_n = q_kt * edge.potential_difference() + energy_step;
        let delta_p = -q_kt * edge.potential_difference() + energy_step;

        let (n_i, n_j) = (field.electron_density[i], field.electron_density[j]);
        let (p_i, p_j) = (field.hole_density[i], field.hole_density[j]);
        let y_n = -delta_n + (n_j / n_i).ln();
        let y_p = -delta_p + (p_j / p_i).ln();

        // Electron flux kT/l B(-dn) n_i (exp(y_n) - 1) and its partials
        let b_n = bernoulli(-delta_n);
        let q_n = n_i * exp_minus_one(y_n);
        let flux_n = kt_l * b_n * q_n;
        let db_n_dpsi_i = bernoulli_derivative(-delta_n) * q_kt;
        let dq_n_dpsi_i = n_i * y_n.exp() * q_kt;
        let dn_dpsi_i = (db_n_dpsi_i * q_n + b_n * dq_n_dpsi_i) * kt_l;
        let dn_dpsi_j = -dn_dpsi_i;
        let dn_dn_i = -b_n * kt_l;
        let dn_dn_j = b_n * n_i * y_n.exp() / n_j * kt_l;

        // Hole flux -kT/l B(-dp) p_i (exp(y_p) - 1) and its partials
        let b_p = bernoulli(-delta_p);
        let q_p = p_i * exp_minus_one(y_p);
        let flux_p = -kt_l * b_p * q_p;
        let db_p_dpsi_i = -bernoulli_derivative(-delta_p) * q_kt;
        let dq_p_dpsi_i = -p_i * y_p.exp() * q_kt;
        let dp_dpsi_i = -(db_p_dpsi_i * q_p + b_p * dq_p_dpsi_i) * kt_l;
        let dp_dpsi_j = -dp_dpsi_i;
        let dp_dp_i = b_p * kt_l;
        let dp_dp_j = -b_p * p_i * y_p.exp() / p_j * kt_l;

        let electron = material.electron_mobility() * area;
        let hole = material.hole_mobility() * area;
        let (e, h) = (
            Unknown::ElectronDensity.sub_index(),
            Unknown::HoleDensity.sub_index(),
        );
        let matrix = &mut self.matrix;

        *matrix.block_entry_mut(i, i, e, 0)? += dn_dpsi_i * electron;
        *matrix.block_entry_mut(i, i, e, e)? += dn_dn_i * electron;
        *matrix.block_entry_mut(i, j, e, 0)? += dn_dpsi_j * electron;
        *matrix.block_entry_mut(i, j, e, e)? += dn_dn_j * electron;
        *matrix.block_entry_mut(j, j, e, 0)? -= dn_dpsi_j * electron;
        *matrix.block_entry_mut(j, j, e, e)? -= dn_dn_j * electron;
        *matrix.block_entry_mut(j, i, e, 0)? -= dn_dpsi_i * electron;
        *matrix.block_entry_mut(j, i, e, e)? -= dn_dn_i * electron;
        *matrix.block_rhs_mut(i, e)? -= flux_n * electron;
        *matrix.block_rhs_mut(j, e)? += flux_n * electron;

        *matrix.block_entry_mut(i, i, h, 0)? -= dp_dpsi_i * hole;
        *matrix.block_entry_mut(i, i, h, h)? -= dp_dp_i * hole;
        *matrix.block_entry_mut(i, j, h, 0)? -= dp_dpsi_j * hole;
        *matrix.block_entry_mut(i, j, h, h)? -= dp_dp_j * hole;
        *matrix.block_entry_mut(j, j, h, 0)? += dp_dpsi_j * hole;
        *matrix.block_entry_mut(j, j, h, h)? += dp_dp_j * hole;
        *matrix.block_entry_mut(j, i, h, 0)? += dp_dpsi_i * hole;
        *matrix.block_entry_mut(j, i, h, h)? += dp_dp_i * hole;
        *matrix.block_rhs_mut(i, h)? += flux_p * hole;
        *matrix.block_rhs_mut(j, h)? -= flux_p * hole;

        let electron_scale = max_abs(&[
            electron * kt_l * bernoulli(delta_n) * n_j,
            electron * kt_l * b_n * n_i,
        ]);
        let hole_scale = max_abs(&[
            hole * kt_l * bernoulli(delta_p) * p_j,
            hole * kt_l * b_p * p_i,
        ]);
        for node in [i, j] {
            self.scales[e][node] = self.scales[e][node].max(electron_scale);
            self.scales[h][node] = self.scales[h][node].max(hole_scale);
        }

        let coupling = &mut self.coupling;
        let stride = SEMICONDUCTOR_BLOCK;
        coupling[i * stride + e] = coupling[i * stride + e].max((dn_dn_j * electron * n_j).abs());
        coupling[j * stride + e] = coupling[j * stride + e].max((dn_dn_i * electron * n_i).abs());
        coupling[i * stride + h] = coupling[i * stride + h].max((dp_dp_j * hole * p_j).abs());
        coupling[j * stride + h] = coupling[j * stride + h].max((dp_dp_i * hole * p_i).abs());
        Ok(())
    }

    /// Couples the potential to the carrier densities through the space charge
    fn assemble_space_charge(&mut self) -> Result<(), MatrixError> {
        let q = T::from_f64_constant(ELECTRON_CHARGE);
        let (e, h) = (
            Unknown::ElectronDensity.sub_index(),
            Unknown::HoleDensity.sub_index(),
        );
        let field = &*self.field;
        for node in 0..self.mesh.number_of_nodes() {
            let (nd, na) = (field.donor_density[node], field.acceptor_density[node]);
            let (n, p) = (field.electron_density[node], field.hole_density[node]);
            let mut volume = T::zero();
            for cv in semiconductor_volumes(self.mesh, self.info_desk, node) {
                volume += cv;
                *self.matrix.block_entry_mut(node, node, 0, e)? += q * cv;
                *self.matrix.block_entry_mut(node, node, 0, h)? -= q * cv;
                *self.matrix.block_rhs_mut(node, 0)? += q * (nd - na + p - n) * cv;
            }
            let charge_scale = max_abs(&[nd, na, p, n]) * q * volume;
            self.scales[0][node] = self.scales[0][node].max(charge_scale);
        }
        Ok(())
    }

    #[numeric_literals::replace_float_literals(T::from_f64_constant(literal))]
    fn check_residual(&mut self) -> Result<(), MatrixError> {
        let mut reports = [ResidualReport::default(); 3];
        for node in 0..self.mesh.number_of_nodes() {
            for unknown in self.unknowns(node) {
                let k = unknown.sub_index();
                let rhs = self.matrix.block_rhs(node, k)?;
                reports[k].rhs.offer(node, rhs);

                let diagonal = self.matrix.block_entry(node, node, k, k)?;
                let reference = self.coupling[node * SEMICONDUCTOR_BLOCK + k]
                    + (diagonal * 1e-3).abs();
                if reference != 0.0 {
                    reports[k].coupled.offer(node, rhs / reference);
                }
                let scale = self.scales[k][node];
                if scale != 0.0 {
                    reports[k].scaled.offer(node, rhs / scale);
                }
            }
        }

        tracing::info!("||b|| = {:e}", self.matrix.rhs_norm());
        for unknown in Unknown::ALL {
            let report = &reports[unknown.sub_index()];
            tracing::info!("RES {}: {}", unknown, report.coupled);
            tracing::debug!("b(max) {}: {}, scaled {}", unknown, report.rhs, report.scaled);
        }

        let tolerance = self.convergence.residual_tolerance;
        self.residual_converged = reports
            .iter()
            .all(|report| report.coupled.magnitude() < tolerance);
        self.residual_reports = reports;
        Ok(())
    }

    /// Halves a damping factor until no carrier density would fall below the floor, giving up
    /// after `MAXIMUM_HALVINGS` halvings
    #[numeric_literals::replace_float_literals(T::from_f64_constant(literal))]
    fn find_damping_factor(&self) -> Result<T, NewtonError> {
        let floor = self.convergence.density_floor;
        let carriers = [
            (Unknown::ElectronDensity, &self.field.electron_density),
            (Unknown::HoleDensity, &self.field.hole_density),
        ];
        let mut factor = 1.0;
        let mut halvings = 0;
        loop {
            let mut halved = false;
            for node in (0..self.mesh.number_of_nodes())
                .filter(|&node| self.block_sizes[node] == SEMICONDUCTOR_BLOCK)
            {
                for (unknown, density) in carriers.iter() {
                    let increment = self.matrix.block_solution(node, unknown.sub_index())?;
                    let tentative = density[node] + factor * increment;
                    if tentative < floor {
                        tracing::warn!(
                            "{}[{}] = {:e} + {:e} = {:e}",
                            unknown,
                            node,
                            density[node],
                            factor * increment,
                            tentative
                        );
                        factor *= 0.5;
                        halvings += 1;
                        halved = true;
                    }
                }
            }
            if !halved {
                break;
            }
            if halvings >= MAXIMUM_HALVINGS {
                tracing::error!("Stopped damping after {} halvings", halvings);
                return Err(NewtonError::DampingExhausted { halvings });
            }
        }
        Ok(factor)
    }
}

impl<'a, T, Mesh, InfoDesk> NewtonStep<T> for DriftDiffusionSolver<'a, T, Mesh, InfoDesk>
where
    T: Scalar,
    Mesh: DeviceTopology<T>,
    InfoDesk: RegionInfoDesk<T>,
{
    fn set_voltage(&mut self, voltage: T) {
        tracing::info!("Voltage: {:e}", voltage);
        let last = self.last_node();
        self.field.potential[0] = self.built_in_potential(0);
        self.field.potential[last] = voltage + self.built_in_potential(last);
    }

    #[tracing::instrument(name = "drift diffusion setup", skip_all)]
    fn setup(&mut self) -> Result<(), NewtonError> {
        self.matrix.clear();
        self.coupling.fill(T::zero());
        self.scales
            .iter_mut()
            .for_each(|scale| scale.fill(T::zero()));

        let (mesh, info_desk) = (self.mesh, self.info_desk);
        for element in 0..mesh.number_of_elements() {
            let edge = PoissonEdge::new(mesh, info_desk, &self.field.potential, element);
            edge.assemble(
                &mut self.matrix,
                &mut self.scales[0],
                &mut self.coupling,
                SEMICONDUCTOR_BLOCK,
            )?;
            if info_desk
                .material(mesh.element_region(element))
                .is_semiconductor()
            {
                self.assemble_fluxes(element, &edge)?;
            }
        }
        self.assemble_space_charge()?;

        let diagonal = self.convergence.dirichlet_diagonal;
        self.matrix.apply_dirichlet(0, diagonal)?;
        self.matrix.apply_dirichlet(self.last_node(), diagonal)?;

        self.check_residual()?;
        Ok(())
    }

    #[tracing::instrument(name = "drift diffusion solve", skip_all)]
    fn solve(&mut self) -> Result<(), NewtonError> {
        self.matrix
            .solve(self.convergence.dump_directory.as_deref())?;
        tracing::info!(
            "||x|| = {:e}, ||r|| = {:e}",
            self.matrix.solution_norm(),
            self.matrix.residual_norm()
        );

        for unknown in Unknown::ALL {
            let mut largest = Extremum::default();
            for node in 1..self.mesh.number_of_nodes() {
                if unknown.sub_index() < self.block_sizes[node] {
                    largest.offer_inclusive(
                        node,
                        self.matrix.block_solution(node, unknown.sub_index())?,
                    );
                }
            }
            if let Some(node) = largest.node {
                tracing::debug!(
                    "x(max) {}: {} (v = {:e})",
                    unknown,
                    largest,
                    self.field.get(unknown.quantity())[node]
                );
            }
        }
        Ok(())
    }

    #[tracing::instrument(name = "drift diffusion update", skip_all)]
    #[numeric_literals::replace_float_literals(T::from_f64_constant(literal))]
    fn update(&mut self) -> Result<(), NewtonError> {
        self.damping_factor = self.find_damping_factor()?;
        tracing::info!("Damping factor: {:e}", self.damping_factor);
        let applied = match self.convergence.damping {
            DampingPolicy::Report => 1.0,
            DampingPolicy::Apply => self.damping_factor,
        };

        let floor = self.convergence.density_floor;
        let num_nodes = self.mesh.number_of_nodes();
        for node in 0..num_nodes {
            self.field.potential[node] += applied * self.matrix.block_solution(node, 0)?;
            if self.block_sizes[node] != SEMICONDUCTOR_BLOCK {
                continue;
            }
            let electron = self.field.electron_density[node]
                + applied * self.matrix.block_solution(node, 1)?;
            self.field.electron_density[node] = electron.max(floor);
            let hole =
                self.field.hole_density[node] + applied * self.matrix.block_solution(node, 2)?;
            self.field.hole_density[node] = hole.max(floor);
        }

        let mut maxima = [0.0; 3];
        for node in 0..num_nodes {
            for unknown in self.unknowns(node) {
                let k = unknown.sub_index();
                maxima[k] = maxima[k].max(self.field.get(unknown.quantity())[node].abs());
            }
        }

        let mut reports = [IncrementReport::default(); 3];
        for node in 0..num_nodes {
            for unknown in self.unknowns(node) {
                let k = unknown.sub_index();
                let increment = self.matrix.block_solution(node, k)?;
                let value = self.field.get(unknown.quantity())[node].abs();
                reports[k]
                    .relative_to_value
                    .offer_inclusive(node, increment / (value + 1e-3));
                if maxima[k] != 0.0 {
                    reports[k]
                        .relative_to_maximum
                        .offer_inclusive(node, increment / maxima[k]);
                }
                let blend = value + 1e-10 * maxima[k];
                if blend != 0.0 {
                    reports[k]
                        .relative_to_blend
                        .offer_inclusive(node, increment / blend);
                }
            }
        }

        let policy = self.convergence.increment_policy;
        for unknown in Unknown::ALL {
            let report = &reports[unknown.sub_index()];
            tracing::info!("DEL {}: {}", unknown, report.selected(policy));
            tracing::debug!(
                "DEL {}: value {}, maximum {}, blend {}",
                unknown,
                report.relative_to_value,
                report.relative_to_maximum,
                report.relative_to_blend
            );
        }

        let tolerance = self.convergence.increment_tolerance;
        self.increment_converged = reports
            .iter()
            .all(|report| report.selected(policy).magnitude() < tolerance);
        self.increment_reports = reports;
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
