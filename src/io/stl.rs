//! STL (stereolithography) format support.
//!
//! This module provides loading and saving of meshes in the STL format,
//! commonly used for 3D printing. Both binary and ASCII files are read;
//! files are written as binary STL.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use nalgebra::{Point3, Vector3};

use crate::error::{MeshError, Result};
use crate::mesh::IndexedTriangleSet;

/// Load a mesh from an STL file.
///
/// Vertices with bit-identical coordinates are merged into one.
///
/// # Example
///
/// ```no_run
/// use meshslim::io::stl;
///
/// let mesh = stl::load("model.stl").unwrap();
/// ```
pub fn load<P: AsRef<Path>>(path: P) -> Result<IndexedTriangleSet> {
    let path = path.as_ref();
    let mut file = File::open(path)?;

    let stl = stl_io::read_stl(&mut file).map_err(|e| MeshError::LoadError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let vertices = stl
        .vertices
        .iter()
        .map(|v| Point3::new(v[0], v[1], v[2]))
        .collect();
    let faces = stl.faces.iter().map(|f| f.vertices);

    super::assemble(path, vertices, faces)
}

/// Save a mesh to a binary STL file.
///
/// Facet normals are recomputed from the vertex positions; degenerate
/// triangles get a zero normal.
///
/// # Example
///
/// ```no_run
/// use meshslim::io::stl;
/// use meshslim::mesh::primitives::unit_cube;
///
/// stl::save(&unit_cube(), "cube.stl").unwrap();
/// ```
pub fn save<P: AsRef<Path>>(its: &IndexedTriangleSet, path: P) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    let triangles: Vec<stl_io::Triangle> = (0..its.num_triangles())
        .map(|ti| {
            let [p0, p1, p2] = its.triangle_vertices(ti);
            let n = (p1 - p0)
                .cross(&(p2 - p0))
                .try_normalize(0.0)
                .unwrap_or_else(Vector3::zeros);

            stl_io::Triangle {
                normal: stl_io::Normal::new([n.x, n.y, n.z]),
                vertices: [
                    stl_io::Vertex::new([p0.x, p0.y, p0.z]),
                    stl_io::Vertex::new([p1.x, p1.y, p1.z]),
                    stl_io::Vertex::new([p2.x, p2.y, p2.z]),
                ],
            }
        })
        .collect();

    stl_io::write_stl(&mut writer, triangles.iter()).map_err(|e| MeshError::SaveError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    Ok(())
}
