use crate::{Connectivity, DeviceTopology, LineSegment1d, Segment1dConnectivity};
use nalgebra::{Point1, RealField};

/// The regions bordering a vertex
///
/// A `Core` vertex lies inside a single region, a `Boundary` vertex sits on the interface
/// between the listed regions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assignment {
    Core(usize),
    Boundary(Vec<usize>),
}

impl Assignment {
    /// Builds the assignment from the regions of the elements bordering a vertex
    pub(crate) fn from_regions(regions: &[usize]) -> Self {
        let mut unique: Vec<usize> = Vec::with_capacity(regions.len());
        for &region in regions {
            if !unique.contains(&region) {
                unique.push(region);
            }
        }
        match unique.as_slice() {
            [region] => Assignment::Core(*region),
            _ => Assignment::Boundary(unique),
        }
    }

    /// The distinct regions bordering the vertex
    pub fn regions(&self) -> &[usize] {
        match self {
            Assignment::Core(region) => std::slice::from_ref(region),
            Assignment::Boundary(regions) => regions,
        }
    }
}

/// A one dimensional mesh of line segments
#[derive(Debug, Clone)]
pub struct Mesh1d<T: RealField> {
    vertices: Vec<(Point1<T>, Assignment)>,
    connectivity: Vec<Segment1dConnectivity>,
    elements: Vec<LineSegment1d<T>>,
    governing_regions: Vec<usize>,
    length_scale: T,
    cross_section: T,
}

impl<T> Mesh1d<T>
where
    T: Copy + RealField,
{
    pub(crate) fn from_parts(
        vertices: Vec<(Point1<T>, Assignment)>,
        connectivity: Vec<Segment1dConnectivity>,
        elements: Vec<LineSegment1d<T>>,
        governing_regions: Vec<usize>,
    ) -> Self {
        Self {
            vertices,
            connectivity,
            elements,
            governing_regions,
            length_scale: T::one(),
            cross_section: T::one(),
        }
    }

    /// Sets the factor converting vertex coordinates into element lengths
    pub fn with_length_scale(mut self, length_scale: T) -> Self {
        self.length_scale = length_scale;
        self
    }

    /// Sets the cross-sectional area shared by every element
    pub fn with_cross_section(mut self, cross_section: T) -> Self {
        self.cross_section = cross_section;
        self
    }

    pub fn num_nodes(&self) -> usize {
        self.vertices.len()
    }

    pub fn vertices(&self) -> &[(Point1<T>, Assignment)] {
        &self.vertices
    }

    pub fn elements(&self) -> &[LineSegment1d<T>] {
        &self.elements
    }

    pub fn connectivity(&self) -> Vec<&[usize]> {
        self.connectivity.iter().map(|x| x.as_inner()).collect()
    }
}

impl<T> DeviceTopology<T> for Mesh1d<T>
where
    T: Copy + RealField,
{
    fn number_of_nodes(&self) -> usize {
        self.vertices.len()
    }

    fn number_of_elements(&self) -> usize {
        self.elements.len()
    }

    fn element_nodes(&self, element: usize) -> [usize; 2] {
        self.elements[element].nodes()
    }

    fn element_length(&self, element: usize) -> T {
        let [left, right] = self.elements[element].nodes();
        (self.vertices[right].0.x - self.vertices[left].0.x) * self.length_scale
    }

    fn element_area(&self, _element: usize) -> T {
        self.cross_section
    }

    fn element_region(&self, element: usize) -> usize {
        self.elements[element].region()
    }

    fn node_elements(&self, node: usize) -> &[usize] {
        self.connectivity[node].as_inner()
    }

    fn node_region(&self, node: usize) -> usize {
        self.governing_regions[node]
    }
}
