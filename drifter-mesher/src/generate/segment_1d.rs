use crate::{Assignment, Connectivity, LineSegment1d, Mesh1d, MeshError, Segment1dConnectivity};
use nalgebra::{Point1, RealField};

/// A homogeneous slab of the device
#[derive(Debug, Clone, Copy)]
pub struct Region<T> {
    /// The thickness of the region in vertex coordinates
    pub thickness: T,
    /// The number of equal elements the region is split into
    pub divisions: usize,
    /// The priority of the region's material, the lowest priority governs a shared node
    pub priority: i32,
}

/// Creates a mesh of `divisions` equal cells between `left` and `left + length`
pub fn create_line_segment_mesh_1d<T>(
    length: T,
    divisions: usize,
    left: T,
) -> Result<Mesh1d<T>, MeshError>
where
    T: Copy + RealField,
{
    create_line_segment_mesh_1d_from_regions(
        &[Region {
            thickness: length,
            divisions,
            priority: 0,
        }],
        left,
    )
}

/// Creates a mesh from consecutive regions starting at `left`
///
/// Vertices on region interfaces are shared by the elements on both sides.
pub fn create_line_segment_mesh_1d_from_regions<T>(
    regions: &[Region<T>],
    left: T,
) -> Result<Mesh1d<T>, MeshError>
where
    T: Copy + RealField,
{
    if regions.is_empty() {
        return Err(MeshError::NoRegions);
    }

    let mut coordinates = vec![left];
    let mut element_regions = Vec::new();
    let mut offset = left;
    for (index, region) in regions.iter().enumerate() {
        if region.divisions == 0 {
            return Err(MeshError::NoDivisions { region: index });
        }
        if region.thickness <= T::zero() {
            return Err(MeshError::Thickness { region: index });
        }
        let divisions = T::from_subset(&(region.divisions as f64));
        for step in 1..=region.divisions {
            let fraction = T::from_subset(&(step as f64)) / divisions;
            coordinates.push(offset + region.thickness * fraction);
            element_regions.push(index);
        }
        offset += region.thickness;
    }

    let num_vertices = coordinates.len();
    let elements = element_regions
        .iter()
        .enumerate()
        .map(|(element, &region)| {
            LineSegment1d::from_vertices(
                &[
                    Point1::new(coordinates[element]),
                    Point1::new(coordinates[element + 1]),
                ],
                &[element, element + 1],
                region,
            )
        })
        .collect::<Vec<_>>();

    let mut connectivity = Vec::with_capacity(num_vertices);
    connectivity.push(Segment1dConnectivity::Boundary([0]));
    for i in 1..num_vertices - 1 {
        connectivity.push(Segment1dConnectivity::Core([i - 1, i]));
    }
    connectivity.push(Segment1dConnectivity::Boundary([num_vertices - 2]));

    let mut vertices = Vec::with_capacity(num_vertices);
    let mut governing_regions = Vec::with_capacity(num_vertices);
    for (coordinate, cells) in coordinates.into_iter().zip(connectivity.iter()) {
        let bordering = cells
            .as_inner()
            .iter()
            .map(|&element| element_regions[element])
            .collect::<Vec<_>>();
        let mut governing = bordering[0];
        for &region in bordering.iter().skip(1) {
            if regions[region].priority < regions[governing].priority {
                governing = region;
            }
        }
        governing_regions.push(governing);
        vertices.push((Point1::new(coordinate), Assignment::from_regions(&bordering)));
    }

    Ok(Mesh1d::from_parts(
        vertices,
        connectivity,
        elements,
        governing_regions,
    ))
}

#[cfg(test)]
mod test {
    use super::{create_line_segment_mesh_1d, create_line_segment_mesh_1d_from_regions, Region};
    use crate::{Assignment, DeviceTopology, MeshError};
    use approx::assert_relative_eq;

    fn stack() -> [Region<f64>; 3] {
        [
            Region {
                thickness: 0.5,
                divisions: 5,
                priority: 0,
            },
            Region {
                thickness: 0.2,
                divisions: 2,
                priority: 100,
            },
            Region {
                thickness: 0.5,
                divisions: 4,
                priority: 0,
            },
        ]
    }

    #[test]
    fn mesh_from_regions_shares_interface_vertices() {
        let mesh = create_line_segment_mesh_1d_from_regions(&stack(), 0.0).unwrap();
        assert_eq!(mesh.number_of_nodes(), 12);
        assert_eq!(mesh.number_of_elements(), 11);

        let delta: Vec<f64> = mesh
            .vertices()
            .windows(2)
            .map(|vertices| (vertices[1].0.x - vertices[0].0.x).abs())
            .collect();
        assert!(delta.iter().all(|&x| x > 0.001));
        assert_relative_eq!(mesh.vertices()[11].0.x, 1.2, epsilon = 1e-12);
    }

    #[test]
    fn interface_nodes_are_governed_by_the_lowest_priority() {
        let mesh = create_line_segment_mesh_1d_from_regions(&stack(), 0.0).unwrap();
        assert_eq!(mesh.vertices()[5].1, Assignment::Boundary(vec![0, 1]));
        assert_eq!(mesh.node_region(5), 0);
        assert_eq!(mesh.vertices()[6].1, Assignment::Core(1));
        assert_eq!(mesh.node_region(6), 1);
        assert_eq!(mesh.node_region(7), 2);
        assert_eq!(mesh.element_region(6), 1);
        assert_eq!(mesh.element_region(7), 2);
    }

    #[test]
    fn terminal_nodes_border_a_single_element() {
        let mesh = create_line_segment_mesh_1d(1.0, 4, 0.0).unwrap();
        assert_eq!(mesh.node_elements(0), &[0]);
        assert_eq!(mesh.node_elements(2), &[1, 2]);
        assert_eq!(mesh.node_elements(4), &[3]);
        assert_eq!(mesh.element_nodes(3), [3, 4]);
    }

    #[test]
    fn control_volumes_are_half_cells() {
        let mesh = create_line_segment_mesh_1d(1.0, 4, 0.0)
            .unwrap()
            .with_length_scale(1e-4)
            .with_cross_section(1e-8);
        assert_relative_eq!(mesh.element_length(0), 0.25e-4, max_relative = 1e-12);
        assert_relative_eq!(mesh.control_volume(0, 0), 0.125e-12, max_relative = 1e-12);
        assert_relative_eq!(mesh.total_control_volume(2), 0.25e-12, max_relative = 1e-12);
        let total: f64 = (0..5).map(|node| mesh.total_control_volume(node)).sum();
        assert_relative_eq!(total, 1e-12, max_relative = 1e-12);
    }

    #[test]
    fn degenerate_regions_are_rejected() {
        assert!(matches!(
            create_line_segment_mesh_1d_from_regions::<f64>(&[], 0.0),
            Err(MeshError::NoRegions)
        ));
        assert!(matches!(
            create_line_segment_mesh_1d(1.0f64, 0, 0.0),
            Err(MeshError::NoDivisions { region: 0 })
        ));
        assert!(matches!(
            create_line_segment_mesh_1d(-1.0f64, 3, 0.0),
            Err(MeshError::Thickness { region: 0 })
        ));
    }
}
