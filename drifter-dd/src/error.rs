// Copyright 2022 Chris Gubbin
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! # Error
//!
//! Error types raised while building and solving a device

use miette::Diagnostic;

#[derive(thiserror::Error, Debug, Diagnostic)]
/// Errors raised while building the components of a simulation
pub enum BuildError {
    #[error(transparent)]
    Mesh(#[from] drifter_mesher::MeshError),
    #[error(transparent)]
    Matrix(#[from] MatrixError),
    #[error("The device has no layers")]
    EmptyDevice,
    #[error("Region {region} is referenced by the mesh but has no material")]
    MissingMaterial { region: usize },
    #[error("The mesh needs at least two nodes to hold the contacts, found {0}")]
    TooFewNodes(usize),
    #[error("The field holds {found} nodes but the mesh has {expected}")]
    FieldSize { expected: usize, found: usize },
}

#[derive(thiserror::Error, Debug, Diagnostic)]
/// General error for block matrix construction, patterns, element access and factorisation
pub enum MatrixError {
    #[error("Expected a block size for each of the {expected} nodes, found {found}")]
    BlockCount { expected: usize, found: usize },
    #[error("Block sizes must be positive, node {node} has a block of zero")]
    EmptyBlock { node: usize },
    #[error("Entry ({row}, {column}) is not part of the sparsity pattern")]
    OutOfPattern { row: usize, column: usize },
    #[error("Sub-index {sub_index} is outside the block of size {block} at node {node}")]
    SubIndex {
        node: usize,
        sub_index: usize,
        block: usize,
    },
    #[error("Pivot {magnitude:e} in row {row} is below the factorisation tolerance")]
    #[diagnostic(help("the assembled system is singular or badly scaled"))]
    SingularPivot { row: usize, magnitude: f64 },
    #[error("Malformed coordinate file at line {line}: {reason}")]
    Parse { line: usize, reason: String },
    #[error("The coordinate file contains no size line")]
    MissingHeader,
    #[error(transparent)]
    Pattern(#[from] nalgebra_sparse::pattern::SparsityPatternFormatError),
    #[error("IO Failure: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(thiserror::Error, Debug, Diagnostic)]
/// Errors raised by the field store
pub enum FieldError {
    #[error("No field named {0}")]
    UnknownQuantity(String),
    #[error("IO Failure: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(thiserror::Error, Debug, Diagnostic)]
/// Errors raised while iterating a Newton solver
pub enum NewtonError {
    #[error(transparent)]
    Matrix(#[from] MatrixError),
    #[error(transparent)]
    Field(#[from] FieldError),
    #[error("Reached the maximum iteration count of {iterations} without converging")]
    IterationBudget { iterations: usize },
    #[error("No damping factor keeps the carrier densities above the floor ({halvings} halvings)")]
    DampingExhausted { halvings: usize },
}
