// Copyright 2022 Chris Gubbin
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Drifter is a one dimensional drift-diffusion device simulator written in Rust
//!
//! # Overview
//! Drifter calculates the electrostatic potential and the electron and hole densities in a stack
//! of semiconductor and insulator layers. The equilibrium state is found by a Newton solve of
//! Poisson's equation with the carrier densities following the potential through the Boltzmann
//! relations. Under bias, Poisson's equation is coupled to the electron and hole continuity
//! equations, discretised with the Scharfetter-Gummel scheme, and the three unknowns are solved
//! for simultaneously at every semiconductor node.
//!
//! The Jacobian of each Newton step is held in a block sparse matrix with one block per mesh
//! node, factorised in place on its fixed sparsity pattern.
//!
//! # Usage
//! Drifter is distributed as a binary crate, and is intended to be run from the command line. To
//! run the software first define a structure in a `.toml` file:
//!
//! ```toml
//! temperature = 300.0
//!
//! [[layers]]
//! material = "Si"
//! thickness = 0.5
//! divisions = 100
//! donor_density = 1e20
//! ```
//!
//! where additional layers can be appended with subsequent `layers` fields. Thicknesses are in
//! micrometres and densities in cm^-3. Then run
//!
//! ```bash
//! drifter structures/npn.toml -l info -c .config -o results
//! ```
//!
//! Solver settings are read from `.config/default.toml`, optionally overridden by the file named
//! by the `RUN_MODE` environment variable.

#![allow(clippy::type_complexity)]

/// The command line application, configuration and tracing
pub mod app;

/// The Bernoulli function and its relatives
pub mod bernoulli;

/// Physical constants
pub mod constants;

/// Materials, device descriptions and the info desk
pub mod device;

/// Error handling
pub mod error;

/// The physical quantities held at every mesh node
pub mod field;

/// The Newton solvers
pub mod newton;

/// The floating point abstraction
mod scalar;

/// Block sparse matrices and their factorisation
pub mod sparse;

pub use scalar::Scalar;
