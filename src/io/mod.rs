//! Mesh file I/O.
//!
//! This module provides functions for loading and saving meshes in the
//! formats slicers exchange.
//!
//! # Supported Formats
//!
//! | Format | Extension | Load | Save | Notes |
//! |--------|-----------|------|------|-------|
//! | STL | `.stl` | ✓ | ✓ | Binary and ASCII on load, binary on save |
//! | PLY | `.ply` | ✓ | ✓ | Polygons are fan-triangulated, ASCII on save |
//!
//! # Usage
//!
//! ```no_run
//! use meshslim::io::{load, save};
//!
//! // Load with automatic format detection
//! let mesh = load("model.stl").unwrap();
//!
//! // Save with automatic format detection
//! save(&mesh, "output.ply").unwrap();
//! ```
//!
//! Triangles that repeat a vertex after loading are dropped, so every
//! loaded mesh can be handed to the simplifier directly.

pub mod ply;
pub mod stl;

use std::path::Path;

use crate::error::{MeshError, Result};
use crate::mesh::IndexedTriangleSet;

/// Supported mesh file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// STL (stereolithography) format.
    Stl,
    /// PLY (Stanford polygon) format.
    Ply,
}

impl Format {
    /// Detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Format> {
        match ext.to_lowercase().as_str() {
            "stl" => Some(Format::Stl),
            "ply" => Some(Format::Ply),
            _ => None,
        }
    }

    /// Detect format from file path.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Format> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Format::from_extension)
    }

    fn detect(path: &Path) -> Result<Format> {
        Format::from_path(path).ok_or_else(|| MeshError::UnsupportedFormat {
            extension: path
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("(none)")
                .to_string(),
        })
    }
}

/// Load a mesh from a file with automatic format detection.
///
/// The format is determined by the file extension.
pub fn load<P: AsRef<Path>>(path: P) -> Result<IndexedTriangleSet> {
    let path = path.as_ref();
    match Format::detect(path)? {
        Format::Stl => stl::load(path),
        Format::Ply => ply::load(path),
    }
}

/// Save a mesh to a file with automatic format detection.
///
/// The format is determined by the file extension.
pub fn save<P: AsRef<Path>>(its: &IndexedTriangleSet, path: P) -> Result<()> {
    let path = path.as_ref();
    match Format::detect(path)? {
        Format::Stl => stl::save(its, path),
        Format::Ply => ply::save(its, path),
    }
}

/// Turn loaded vertices and faces into a validated mesh, dropping faces
/// that repeat a vertex.
fn assemble(
    path: &Path,
    vertices: Vec<nalgebra::Point3<f32>>,
    faces: impl IntoIterator<Item = [usize; 3]>,
) -> Result<IndexedTriangleSet> {
    if vertices.len() > u32::MAX as usize {
        return Err(MeshError::TooManyElements {
            what: "vertices",
            count: vertices.len(),
        });
    }

    let mut indices = Vec::new();
    let mut dropped = 0usize;
    for (fi, [a, b, c]) in faces.into_iter().enumerate() {
        for vi in [a, b, c] {
            if vi >= vertices.len() {
                return Err(MeshError::InvalidVertexIndex { face: fi, vertex: vi });
            }
        }
        if a == b || b == c || a == c {
            dropped += 1;
            continue;
        }
        indices.push([a as u32, b as u32, c as u32]);
    }
    if dropped > 0 {
        tracing::debug!(path = %path.display(), dropped, "Dropped degenerate faces");
    }

    if indices.is_empty() {
        return Err(MeshError::LoadError {
            path: path.to_path_buf(),
            message: "file contains no valid triangles".to_string(),
        });
    }

    IndexedTriangleSet::from_parts(vertices, indices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::primitives::unit_cube;

    #[test]
    fn test_format_detection() {
        assert_eq!(Format::from_path("a/b/part.STL"), Some(Format::Stl));
        assert_eq!(Format::from_path("scan.ply"), Some(Format::Ply));
        assert_eq!(Format::from_path("model.obj"), None);
        assert_eq!(Format::from_path("noext"), None);
    }

    #[test]
    fn test_unsupported_extension() {
        let result = save(&unit_cube(), "out.3mf");
        assert!(matches!(
            result,
            Err(MeshError::UnsupportedFormat { extension }) if extension == "3mf"
        ));
    }

    #[test]
    fn test_round_trip_both_formats() {
        let dir = tempfile::tempdir().unwrap();
        let cube = unit_cube();
        for name in ["cube.stl", "cube.ply"] {
            let path = dir.path().join(name);
            save(&cube, &path).unwrap();
            let loaded = load(&path).unwrap();
            assert_eq!(loaded.num_vertices(), 8, "{name}");
            assert_eq!(loaded.num_triangles(), 12, "{name}");
            assert!(loaded.is_closed_manifold(), "{name}");
        }
    }

    #[test]
    fn test_assemble_drops_degenerate() {
        let vertices = unit_cube().vertices;
        let its = assemble(Path::new("mem"), vertices, [[0, 1, 2], [3, 3, 4]]).unwrap();
        assert_eq!(its.indices, vec![[0, 1, 2]]);

        let vertices = unit_cube().vertices;
        assert!(matches!(
            assemble(Path::new("mem"), vertices, [[1, 1, 2]]),
            Err(MeshError::LoadError { .. })
        ));
    }
}
