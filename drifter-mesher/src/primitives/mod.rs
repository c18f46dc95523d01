use nalgebra::{Point1, RealField};

pub trait ElementMethods<T: RealField> {
    fn vertex_indices(&self) -> &[usize];
    fn midpoint(&self) -> Point1<T>;
    fn diameter(&self) -> T;
}

/// A single element of a one dimensional mesh
#[derive(Debug, Clone)]
pub struct LineSegment1d<T>
where
    T: RealField,
{
    vertices: [Point1<T>; 2],
    vertex_indices: [usize; 2],
    region: usize,
}

impl<T> LineSegment1d<T>
where
    T: Copy + RealField,
{
    pub fn from_vertices(
        vertices: &[Point1<T>; 2],
        vertex_indices: &[usize; 2],
        region: usize,
    ) -> Self {
        Self {
            vertices: vertices.to_owned(),
            vertex_indices: vertex_indices.to_owned(),
            region,
        }
    }

    pub fn region(&self) -> usize {
        self.region
    }

    pub(crate) fn nodes(&self) -> [usize; 2] {
        self.vertex_indices
    }
}

impl<T: Copy + RealField> ElementMethods<T> for LineSegment1d<T> {
    fn midpoint(&self) -> Point1<T> {
        Point1::new((self.vertices[0].x + self.vertices[1].x) / (T::one() + T::one()))
    }
    fn vertex_indices(&self) -> &[usize] {
        &self.vertex_indices
    }
    fn diameter(&self) -> T {
        (self.vertices[0].x - self.vertices[1].x).abs()
    }
}

#[cfg(test)]
mod test {
    use super::{ElementMethods, LineSegment1d};
    use approx::assert_relative_eq;
    use nalgebra::Point1;

    #[test]
    fn diameter_is_independent_of_vertex_order() {
        let forward =
            LineSegment1d::from_vertices(&[Point1::new(0.25), Point1::new(1.0)], &[0, 1], 0);
        let backward =
            LineSegment1d::from_vertices(&[Point1::new(1.0), Point1::new(0.25)], &[1, 0], 0);
        assert_relative_eq!(forward.diameter(), 0.75);
        assert_relative_eq!(backward.diameter(), forward.diameter());
        assert_relative_eq!(forward.midpoint().x, 0.625);
    }
}
