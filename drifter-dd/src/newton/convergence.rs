// Copyright 2022 Chris Gubbin
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Convergence settings and the diagnostics reported by the Newton solvers

use crate::{field::Quantity, Scalar};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// How the single carrier solver applies the potential increment
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PotentialUpdate {
    /// The increment is added at every node
    #[default]
    Additive,
    /// The contact potentials are multiplied by their increment, interior nodes are additive
    ScaleBoundary,
}

/// What the two carrier solver does with the damping factor found by the pre-pass
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DampingPolicy {
    /// The factor is logged and the full increment applied
    #[default]
    Report,
    /// The increment is scaled by the factor
    Apply,
}

/// The relative increment which decides whether the two carrier solver has converged
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncrementPolicy {
    /// `dx / (|v| + 1e-3)`
    RelativeToValue,
    /// `dx / max |v|`
    RelativeToMaximum,
    /// `dx / (|v| + 1e-10 max |v|)`
    #[default]
    RelativeToBlend,
}

/// The unknowns held at a semiconductor node, in block order
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Unknown {
    Potential,
    ElectronDensity,
    HoleDensity,
}

impl Unknown {
    pub const ALL: [Unknown; 3] = [
        Unknown::Potential,
        Unknown::ElectronDensity,
        Unknown::HoleDensity,
    ];

    /// The position of the unknown in a node's block
    pub fn sub_index(&self) -> usize {
        *self as usize
    }

    /// The field quantity the unknown is stored in
    pub fn quantity(&self) -> Quantity {
        match self {
            Unknown::Potential => Quantity::Potential,
            Unknown::ElectronDensity => Quantity::ElectronDensity,
            Unknown::HoleDensity => Quantity::HoleDensity,
        }
    }
}

impl std::fmt::Display for Unknown {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Unknown::Potential => write!(f, "psi"),
            Unknown::ElectronDensity => write!(f, "elec"),
            Unknown::HoleDensity => write!(f, "hole"),
        }
    }
}

/// Tolerances, budget and policies shared by the Newton solvers
#[derive(Clone, Debug)]
pub struct Convergence<T> {
    /// Threshold on the relative increment, `DEL_crit`
    pub(crate) increment_tolerance: T,
    /// Threshold on the coupling relative residual, `RES_crit`
    pub(crate) residual_tolerance: T,
    pub(crate) maximum_iterations: usize,
    /// Diagonal placed on the rows of contact nodes
    pub(crate) dirichlet_diagonal: T,
    /// Smallest carrier density the two carrier solver allows
    pub(crate) density_floor: T,
    pub(crate) pivot_tolerance: T,
    pub(crate) potential_update: PotentialUpdate,
    pub(crate) damping: DampingPolicy,
    pub(crate) increment_policy: IncrementPolicy,
    /// Directory receiving `Ab.mtx` and `x.mtx` on every two carrier solve
    pub(crate) dump_directory: Option<PathBuf>,
}

impl<T: Scalar> Convergence<T> {
    pub fn new(increment_tolerance: T, residual_tolerance: T, maximum_iterations: usize) -> Self {
        Self {
            increment_tolerance,
            residual_tolerance,
            maximum_iterations,
            dirichlet_diagonal: T::from_f64_constant(1e-12),
            density_floor: T::from_f64_constant(f64::from(f32::MIN_POSITIVE)),
            pivot_tolerance: T::from_f64_constant(crate::sparse::DEFAULT_PIVOT_TOLERANCE),
            potential_update: PotentialUpdate::default(),
            damping: DampingPolicy::default(),
            increment_policy: IncrementPolicy::default(),
            dump_directory: None,
        }
    }

    pub fn with_dirichlet_diagonal(mut self, dirichlet_diagonal: T) -> Self {
        self.dirichlet_diagonal = dirichlet_diagonal;
        self
    }

    pub fn with_density_floor(mut self, density_floor: T) -> Self {
        self.density_floor = density_floor;
        self
    }

    pub fn with_pivot_tolerance(mut self, pivot_tolerance: T) -> Self {
        self.pivot_tolerance = pivot_tolerance;
        self
    }

    pub fn with_potential_update(mut self, potential_update: PotentialUpdate) -> Self {
        self.potential_update = potential_update;
        self
    }

    pub fn with_damping(mut self, damping: DampingPolicy) -> Self {
        self.damping = damping;
        self
    }

    pub fn with_increment_policy(mut self, increment_policy: IncrementPolicy) -> Self {
        self.increment_policy = increment_policy;
        self
    }

    pub fn with_dump_directory(mut self, dump_directory: Option<PathBuf>) -> Self {
        self.dump_directory = dump_directory;
        self
    }

    pub fn increment_tolerance(&self) -> T {
        self.increment_tolerance
    }

    pub fn residual_tolerance(&self) -> T {
        self.residual_tolerance
    }

    pub fn maximum_iterations(&self) -> usize {
        self.maximum_iterations
    }

    pub fn dirichlet_diagonal(&self) -> T {
        self.dirichlet_diagonal
    }

    pub fn density_floor(&self) -> T {
        self.density_floor
    }

    pub fn dump_directory(&self) -> Option<&Path> {
        self.dump_directory.as_deref()
    }
}

/// The signed value of largest magnitude among a set of diagnostics and the node it sits on
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Extremum<T> {
    pub node: Option<usize>,
    pub value: T,
}

impl<T: Scalar> Default for Extremum<T> {
    fn default() -> Self {
        Self {
            node: None,
            value: T::zero(),
        }
    }
}

impl<T: Scalar> Extremum<T> {
    /// Replaces the extremum if `value` is strictly larger in magnitude
    pub(crate) fn offer(&mut self, node: usize, value: T) {
        if self.value.abs() < value.abs() {
            self.node = Some(node);
            self.value = value;
        }
    }

    /// Replaces the extremum if `value` is at least as large in magnitude
    pub(crate) fn offer_inclusive(&mut self, node: usize, value: T) {
        if self.value.abs() <= value.abs() {
            self.node = Some(node);
            self.value = value;
        }
    }

    pub fn magnitude(&self) -> T {
        self.value.abs()
    }
}

impl<T: Scalar> std::fmt::Display for Extremum<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self.node {
            Some(node) => write!(f, "{:.6e} at node {}", self.value, node),
            None => write!(f, "none"),
        }
    }
}

/// The residual diagnostics of one unknown type after assembly
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ResidualReport<T: Scalar> {
    /// Largest right hand side entry
    pub rhs: Extremum<T>,
    /// Residual relative to the largest off-diagonal coupling plus a fraction of the diagonal
    pub coupled: Extremum<T>,
    /// Residual relative to the physical scale of the node
    pub scaled: Extremum<T>,
}

/// The increment diagnostics of one unknown type after an update
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct IncrementReport<T: Scalar> {
    pub relative_to_value: Extremum<T>,
    pub relative_to_maximum: Extremum<T>,
    pub relative_to_blend: Extremum<T>,
}

impl<T: Scalar> Default for ResidualReport<T> {
    fn default() -> Self {
        Self {
            rhs: Extremum::default(),
            coupled: Extremum::default(),
            scaled: Extremum::default(),
        }
    }
}

impl<T: Scalar> Default for IncrementReport<T> {
    fn default() -> Self {
        Self {
            relative_to_value: Extremum::default(),
            relative_to_maximum: Extremum::default(),
            relative_to_blend: Extremum::default(),
        }
    }
}

impl<T: Scalar> IncrementReport<T> {
    /// The diagnostic selected by `policy`
    pub fn selected(&self, policy: IncrementPolicy) -> &Extremum<T> {
        match policy {
            IncrementPolicy::RelativeToValue => &self.relative_to_value,
            IncrementPolicy::RelativeToMaximum => &self.relative_to_maximum,
            IncrementPolicy::RelativeToBlend => &self.relative_to_blend,
        }
    }
}

#[cfg(test)]
mod test {
    use super::{Convergence, Extremum, IncrementPolicy, IncrementReport, Unknown};

    #[test]
    fn extremum_keeps_the_signed_value_of_largest_magnitude() {
        let mut extremum = Extremum::default();
        extremum.offer(0, 1.0);
        extremum.offer(1, -3.0);
        extremum.offer(2, 3.0);
        assert_eq!(extremum.node, Some(1));
        assert_eq!(extremum.value, -3.0);
        extremum.offer_inclusive(2, 3.0);
        assert_eq!(extremum.node, Some(2));
        assert_eq!(extremum.magnitude(), 3.0);
    }

    #[test]
    fn policy_selects_the_matching_increment() {
        let mut report = IncrementReport::default();
        report.relative_to_value.offer(4, 0.5);
        report.relative_to_blend.offer(2, 1e-4);
        assert_eq!(report.selected(IncrementPolicy::RelativeToValue).value, 0.5);
        assert_eq!(report.selected(IncrementPolicy::RelativeToBlend).node, Some(2));
        assert_eq!(report.selected(IncrementPolicy::RelativeToMaximum).node, None);
    }

    #[test]
    fn defaults_match_the_documented_values() {
        let convergence = Convergence::<f64>::new(1e-2, 1e-5, 100);
        assert_eq!(convergence.dirichlet_diagonal(), 1e-12);
        assert_eq!(convergence.density_floor(), f64::from(f32::MIN_POSITIVE));
        assert_eq!(convergence.increment_policy, IncrementPolicy::RelativeToBlend);
        assert!(convergence.dump_directory().is_none());
        assert_eq!(Unknown::HoleDensity.sub_index(), 2);
        assert_eq!(Unknown::ElectronDensity.to_string(), "elec");
    }
}
