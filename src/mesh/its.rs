//! Indexed triangle set: shared vertex positions plus triangle index triples.

use std::collections::HashMap;

use nalgebra::Point3;

use crate::error::{MeshError, Result};

/// A triangle mesh stored as a vertex array and a triangle index array.
///
/// Triangles reference the shared vertex array, so a vertex used by several
/// triangles is stored once. This is the only type that crosses the
/// simplification boundary: [`simplify`](crate::algo::decimate::simplify)
/// rewrites both arrays in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexedTriangleSet {
    /// Vertex positions.
    pub vertices: Vec<Point3<f32>>,
    /// Triangles as counter-clockwise vertex index triples.
    pub indices: Vec<[u32; 3]>,
}

impl IndexedTriangleSet {
    /// Create an empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty mesh with preallocated storage.
    pub fn with_capacity(num_vertices: usize, num_triangles: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(num_vertices),
            indices: Vec::with_capacity(num_triangles),
        }
    }

    /// Create a mesh from raw parts, validating every triangle.
    ///
    /// # Example
    ///
    /// ```
    /// use meshslim::mesh::IndexedTriangleSet;
    /// use nalgebra::Point3;
    ///
    /// let its = IndexedTriangleSet::from_parts(
    ///     vec![
    ///         Point3::new(0.0, 0.0, 0.0),
    ///         Point3::new(1.0, 0.0, 0.0),
    ///         Point3::new(0.0, 1.0, 0.0),
    ///     ],
    ///     vec![[0, 1, 2]],
    /// )
    /// .unwrap();
    /// assert_eq!(its.num_triangles(), 1);
    /// ```
    pub fn from_parts(vertices: Vec<Point3<f32>>, indices: Vec<[u32; 3]>) -> Result<Self> {
        let its = Self { vertices, indices };
        its.validate()?;
        Ok(its)
    }

    /// Create a mesh from `f64` positions and `usize` faces.
    ///
    /// See [`build_from_triangles`](super::build_from_triangles).
    pub fn from_triangles(vertices: &[Point3<f64>], faces: &[[usize; 3]]) -> Result<Self> {
        super::build_from_triangles(vertices, faces)
    }

    /// Number of vertices.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Number of triangles.
    #[inline]
    pub fn num_triangles(&self) -> usize {
        self.indices.len()
    }

    /// Returns true if the mesh has no triangles.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Vertex positions of a triangle.
    #[inline]
    pub fn triangle_vertices(&self, triangle: usize) -> [Point3<f32>; 3] {
        let [a, b, c] = self.indices[triangle];
        [
            self.vertices[a as usize],
            self.vertices[b as usize],
            self.vertices[c as usize],
        ]
    }

    /// Check that the mesh is non-empty, that every index is in range, that
    /// no triangle repeats a vertex and that both arrays fit 32-bit indexing.
    pub fn validate(&self) -> Result<()> {
        if self.indices.is_empty() {
            return Err(MeshError::EmptyMesh);
        }
        if self.vertices.len() > u32::MAX as usize {
            return Err(MeshError::TooManyElements {
                what: "vertices",
                count: self.vertices.len(),
            });
        }
        if self.indices.len() > u32::MAX as usize {
            return Err(MeshError::TooManyElements {
                what: "triangles",
                count: self.indices.len(),
            });
        }
        for (fi, t) in self.indices.iter().enumerate() {
            for &vi in t {
                if vi as usize >= self.vertices.len() {
                    return Err(MeshError::InvalidVertexIndex {
                        face: fi,
                        vertex: vi as usize,
                    });
                }
            }
            if t[0] == t[1] || t[1] == t[2] || t[0] == t[2] {
                return Err(MeshError::DegenerateFace { face: fi });
            }
        }
        Ok(())
    }

    /// Count how many triangles use each undirected edge.
    ///
    /// Keys are `(min, max)` vertex index pairs.
    pub fn edge_use_counts(&self) -> HashMap<(u32, u32), usize> {
        let mut counts = HashMap::with_capacity(self.indices.len() * 3 / 2);
        for t in &self.indices {
            for i in 0..3 {
                let a = t[i];
                let b = t[(i + 1) % 3];
                let key = if a < b { (a, b) } else { (b, a) };
                *counts.entry(key).or_insert(0) += 1;
            }
        }
        counts
    }

    /// Returns true if every edge is shared by exactly two triangles.
    pub fn is_closed_manifold(&self) -> bool {
        !self.indices.is_empty() && self.edge_use_counts().values().all(|&c| c == 2)
    }

    /// Number of edges used by a single triangle.
    pub fn num_boundary_edges(&self) -> usize {
        self.edge_use_counts().values().filter(|&&c| c == 1).count()
    }

    /// Axis-aligned bounding box, or `None` for a mesh without vertices.
    pub fn bounding_box(&self) -> Option<(Point3<f32>, Point3<f32>)> {
        let first = *self.vertices.first()?;
        Some(self.vertices.iter().fold((first, first), |(min, max), v| {
            (min.inf(v), max.sup(v))
        }))
    }

    /// Total surface area.
    pub fn surface_area(&self) -> f64 {
        (0..self.indices.len())
            .map(|ti| {
                let [a, b, c] = self.triangle_vertices(ti);
                let a = a.cast::<f64>();
                let b = b.cast::<f64>();
                let c = c.cast::<f64>();
                (b - a).cross(&(c - a)).norm() * 0.5
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> IndexedTriangleSet {
        IndexedTriangleSet {
            vertices: vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            indices: vec![[0, 1, 2]],
        }
    }

    #[test]
    fn test_validate_ok() {
        assert!(triangle().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_index() {
        let mut its = triangle();
        its.indices[0][2] = 7;
        assert!(matches!(
            its.validate(),
            Err(MeshError::InvalidVertexIndex { face: 0, vertex: 7 })
        ));
    }

    #[test]
    fn test_validate_rejects_degenerate() {
        let mut its = triangle();
        its.indices[0] = [0, 1, 1];
        assert!(matches!(
            its.validate(),
            Err(MeshError::DegenerateFace { face: 0 })
        ));
    }

    #[test]
    fn test_validate_rejects_empty() {
        assert!(matches!(
            IndexedTriangleSet::new().validate(),
            Err(MeshError::EmptyMesh)
        ));
    }

    #[test]
    fn test_open_triangle_is_not_closed() {
        let its = triangle();
        assert!(!its.is_closed_manifold());
        assert_eq!(its.num_boundary_edges(), 3);
    }

    #[test]
    fn test_area_and_bbox() {
        let its = triangle();
        assert!((its.surface_area() - 0.5).abs() < 1e-9);
        let (min, max) = its.bounding_box().unwrap();
        assert_eq!(min, Point3::new(0.0, 0.0, 0.0));
        assert_eq!(max, Point3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn test_from_triangles_narrows_precision() {
        let its = IndexedTriangleSet::from_triangles(
            &[
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 0.1, 0.0),
            ],
            &[[0, 1, 2]],
        )
        .unwrap();
        assert_eq!(its.vertices[2].y, 0.1f32);
        assert_eq!(its.indices, vec![[0, 1, 2]]);
    }
}
