// Copyright 2022 Chris Gubbin
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use crate::{
    newton::{Convergence, DampingPolicy, IncrementPolicy, PotentialUpdate},
    Scalar,
};
use color_eyre::eyre::eyre;
use config::{Config, File};
use serde::{de::DeserializeOwned, Deserialize};
use std::{env, path::Path};

#[derive(Debug, Deserialize)]
pub(crate) struct Configuration<T> {
    pub(crate) matrix: MatrixConfiguration<T>,
    pub(crate) newton: NewtonConfiguration<T>,
    pub(crate) poisson: PoissonConfiguration<T>,
    pub(crate) drift_diffusion: DriftDiffusionConfiguration<T>,
    pub(crate) mesh: MeshConfiguration<T>,
    pub(crate) sweep: SweepConfiguration<T>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MatrixConfiguration<T> {
    /// Pivots smaller in magnitude than this abort the factorisation
    pub(crate) pivot_tolerance: T,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NewtonConfiguration<T> {
    /// The diagonal left on Dirichlet rows
    pub(crate) dirichlet_diagonal: T,
    /// Carrier densities are clamped from below to this value
    pub(crate) density_floor: T,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PoissonConfiguration<T> {
    pub(crate) del_criterion: T,
    pub(crate) res_criterion: T,
    pub(crate) maximum_iterations: usize,
    #[serde(default)]
    pub(crate) potential_update: PotentialUpdate,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DriftDiffusionConfiguration<T> {
    pub(crate) del_criterion: T,
    pub(crate) res_criterion: T,
    pub(crate) maximum_iterations: usize,
    #[serde(default)]
    pub(crate) damping: DampingPolicy,
    #[serde(default)]
    pub(crate) increment_policy: IncrementPolicy,
    /// Writes the assembled system and its solution to the output directory
    #[serde(default)]
    pub(crate) dump_diagnostics: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MeshConfiguration<T> {
    /// Centimetres per unit of layer thickness
    pub(crate) length_scale: T,
    /// Cross-sectional area of the device in square centimetres
    pub(crate) cross_section: T,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SweepConfiguration<T> {
    pub(crate) voltage_step: T,
    pub(crate) steps: usize,
    /// Writes the fields after every Newton iteration of the sweep
    #[serde(default)]
    pub(crate) write_iterations: bool,
}

impl<T: DeserializeOwned> Configuration<T> {
    /// Reads `default.toml` from `directory`, overridden by the optional `$RUN_MODE.toml`
    pub(crate) fn build(directory: &Path) -> color_eyre::Result<Self> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .add_source(File::from(directory.join("default")))
            // User overrides, optional
            .add_source(File::from(directory.join(&run_mode)).required(false))
            .build()?;

        s.try_deserialize()
            .map_err(|e| eyre!(format!("Failed to deserialize the config file: {:?}", e)))
    }
}

impl<T: Scalar> Configuration<T> {
    pub(crate) fn poisson_convergence(&self) -> Convergence<T> {
        Convergence::new(
            self.poisson.del_criterion,
            self.poisson.res_criterion,
            self.poisson.maximum_iterations,
        )
        .with_potential_update(self.poisson.potential_update)
        .with_dirichlet_diagonal(self.newton.dirichlet_diagonal)
        .with_density_floor(self.newton.density_floor)
        .with_pivot_tolerance(self.matrix.pivot_tolerance)
    }

    pub(crate) fn drift_diffusion_convergence(&self, output: &Path) -> Convergence<T> {
        let dump_directory = self
            .drift_diffusion
            .dump_diagnostics
            .then(|| output.to_path_buf());
        Convergence::new(
            self.drift_diffusion.del_criterion,
            self.drift_diffusion.res_criterion,
            self.drift_diffusion.maximum_iterations,
        )
        .with_damping(self.drift_diffusion.damping)
        .with_increment_policy(self.drift_diffusion.increment_policy)
        .with_dirichlet_diagonal(self.newton.dirichlet_diagonal)
        .with_density_floor(self.newton.density_floor)
        .with_pivot_tolerance(self.matrix.pivot_tolerance)
        .with_dump_directory(dump_directory)
    }
}
