//! One dimensional line-segment meshes for layered devices
//!
//! A device is described as a stack of regions, each of which is split into a number of
//! equal elements. The resulting mesh knows which region every element belongs to and,
//! for every node, which regions border it and which of those governs the node.

mod connectivity;
mod error;
mod generate;
mod mesh;
mod primitives;

pub use connectivity::*;
pub use error::MeshError;
pub use generate::*;
pub use mesh::*;
pub use primitives::*;

use nalgebra::RealField;

/// The read-only topology and geometry consumed by the discretisation
///
/// Nodes are indexed contiguously from zero and every element joins two adjacent nodes.
pub trait DeviceTopology<T: Copy + RealField> {
    /// The number of nodes in the mesh
    fn number_of_nodes(&self) -> usize;
    /// The number of elements in the mesh
    fn number_of_elements(&self) -> usize;
    /// The indices of the two nodes bounding `element`, in ascending order
    fn element_nodes(&self, element: usize) -> [usize; 2];
    /// The length of `element` in the physical unit of the discretisation
    fn element_length(&self, element: usize) -> T;
    /// The cross-sectional area of `element`
    fn element_area(&self, element: usize) -> T;
    /// The index of the region containing `element`
    fn element_region(&self, element: usize) -> usize;
    /// The elements bordering `node`
    fn node_elements(&self, node: usize) -> &[usize];
    /// The region governing `node`, the one with the lowest priority among its bordering elements
    fn node_region(&self, node: usize) -> usize;

    /// The share of the volume of the `local`th element bordering `node` which belongs to `node`
    fn control_volume(&self, node: usize, local: usize) -> T {
        let element = self.node_elements(node)[local];
        self.element_area(element) * self.element_length(element) / (T::one() + T::one())
    }

    /// The full control volume of `node`
    fn total_control_volume(&self, node: usize) -> T {
        (0..self.node_elements(node).len())
            .fold(T::zero(), |acc, local| acc + self.control_volume(node, local))
    }
}
