// Copyright 2022 Chris Gubbin
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Assembly shared by both Newton solvers

use crate::{
    device::{MaterialModel, RegionInfoDesk},
    error::MatrixError,
    sparse::SparseBlockMatrix,
    Scalar,
};
use drifter_mesher::DeviceTopology;
use nalgebra::DVector;

/// The electrostatic coupling across a single element
pub(crate) struct PoissonEdge<T> {
    pub(crate) nodes: [usize; 2],
    /// `permittivity * area / length`
    pub(crate) conductance: T,
    /// Endpoint potentials referred to the work function of the element's material
    pub(crate) potentials: [T; 2],
}

impl<T: Scalar> PoissonEdge<T> {
    pub(crate) fn new<Mesh, InfoDesk>(
        mesh: &Mesh,
        info_desk: &InfoDesk,
        potential: &DVector<T>,
        element: usize,
    ) -> Self
    where
        Mesh: DeviceTopology<T>,
        InfoDesk: RegionInfoDesk<T>,
    {
        let temperature = info_desk.temperature();
        let material = info_desk.material(mesh.element_region(element));
        let nodes = mesh.element_nodes(element);
        let conductance =
            material.permittivity() * mesh.element_area(element) / mesh.element_length(element);

        let potentials = nodes.map(|node| {
            let governing = info_desk.material(mesh.node_region(node));
            if governing == material {
                potential[node]
            } else {
                potential[node] + material.work_function(temperature)
                    - governing.work_function(temperature)
            }
        });

        Self {
            nodes,
            conductance,
            potentials,
        }
    }

    /// `psi_j - psi_i`
    pub(crate) fn potential_difference(&self) -> T {
        self.potentials[1] - self.potentials[0]
    }

    /// Adds the element's Laplacian to sub-block (0, 0) and its flux to the right hand side
    ///
    /// `scale` receives the magnitude of the potential terms at each endpoint, `coupling`
    /// (indexed by `node * stride`) the largest off-diagonal term acting on each endpoint.
    pub(crate) fn assemble(
        &self,
        matrix: &mut SparseBlockMatrix<T>,
        scale: &mut [T],
        coupling: &mut [T],
        stride: usize,
    ) -> Result<(), MatrixError> {
        let [i, j] = self.nodes;
        let c = self.conductance;

        *matrix.block_entry_mut(i, i, 0, 0)? += c;
        *matrix.block_entry_mut(i, j, 0, 0)? -= c;
        *matrix.block_entry_mut(j, j, 0, 0)? += c;
        *matrix.block_entry_mut(j, i, 0, 0)? -= c;

        let flux = c * self.potential_difference();
        *matrix.block_rhs_mut(i, 0)? += flux;
        *matrix.block_rhs_mut(j, 0)? -= flux;

        let [term_i, term_j] = self.potentials.map(|psi| (c * psi).abs());
        let local = term_i.max(term_j);
        scale[i] = scale[i].max(local);
        scale[j] = scale[j].max(local);
        coupling[i * stride] = coupling[i * stride].max(term_j);
        coupling[j * stride] = coupling[j * stride].max(term_i);
        Ok(())
    }
}

/// Control volumes of `node` within each bordering semiconductor element
pub(crate) fn semiconductor_volumes<'a, T, Mesh, InfoDesk>(
    mesh: &'a Mesh,
    info_desk: &'a InfoDesk,
    node: usize,
) -> impl Iterator<Item = T> + 'a
where
    T: Scalar,
    Mesh: DeviceTopology<T>,
    InfoDesk: RegionInfoDesk<T>,
{
    mesh.node_elements(node)
        .iter()
        .enumerate()
        .filter(move |(_, element)| {
            info_desk
                .material(mesh.element_region(**element))
                .is_semiconductor()
        })
        .map(move |(local, _)| mesh.control_volume(node, local))
}

/// The largest magnitude of the values
pub(crate) fn max_abs<T: Scalar>(values: &[T]) -> T {
    values
        .iter()
        .fold(T::zero(), |acc, &value| acc.max(value.abs()))
}
