//! Mesh construction utilities.
//!
//! This module converts between the face-vertex lists commonly produced by
//! file formats and generators (`f64` positions, `usize` indices) and the
//! compact [`IndexedTriangleSet`] used by the simplifier.

use nalgebra::Point3;

use super::its::IndexedTriangleSet;
use crate::error::{MeshError, Result};

/// Build an indexed triangle set from vertices and triangle faces.
///
/// # Arguments
/// * `vertices` - List of vertex positions
/// * `faces` - List of triangle faces, each as [v0, v1, v2] indices
///
/// # Returns
/// The mesh, or an error if the input is invalid.
///
/// # Example
/// ```
/// use meshslim::mesh::build_from_triangles;
/// use nalgebra::Point3;
///
/// let vertices = vec![
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(1.0, 0.0, 0.0),
///     Point3::new(0.5, 1.0, 0.0),
/// ];
/// let faces = vec![[0, 1, 2]];
///
/// let its = build_from_triangles(&vertices, &faces).unwrap();
/// assert_eq!(its.num_vertices(), 3);
/// assert_eq!(its.num_triangles(), 1);
/// ```
pub fn build_from_triangles(
    vertices: &[Point3<f64>],
    faces: &[[usize; 3]],
) -> Result<IndexedTriangleSet> {
    if faces.is_empty() {
        return Err(MeshError::EmptyMesh);
    }
    if vertices.len() > u32::MAX as usize {
        return Err(MeshError::TooManyElements {
            what: "vertices",
            count: vertices.len(),
        });
    }

    let mut its = IndexedTriangleSet::with_capacity(vertices.len(), faces.len());
    its.vertices
        .extend(vertices.iter().map(|p| p.cast::<f32>()));

    for (fi, face) in faces.iter().enumerate() {
        for &vi in face {
            if vi >= vertices.len() {
                return Err(MeshError::InvalidVertexIndex { face: fi, vertex: vi });
            }
        }
        if face[0] == face[1] || face[1] == face[2] || face[0] == face[2] {
            return Err(MeshError::DegenerateFace { face: fi });
        }
        its.indices
            .push([face[0] as u32, face[1] as u32, face[2] as u32]);
    }

    its.validate()?;
    Ok(its)
}

/// Convert an indexed triangle set back into face-vertex lists.
///
/// Returns `(vertices, faces)` with `f64` positions and `usize` indices.
pub fn to_face_vertex(its: &IndexedTriangleSet) -> (Vec<Point3<f64>>, Vec<[usize; 3]>) {
    let vertices = its.vertices.iter().map(|p| p.cast::<f64>()).collect();
    let faces = its
        .indices
        .iter()
        .map(|t| [t[0] as usize, t[1] as usize, t[2] as usize])
        .collect();
    (vertices, faces)
}
