//! Core mesh data structures.
//!
//! This module provides the indexed triangle mesh that the simplifier reads
//! and rewrites in place.
//!
//! # Overview
//!
//! The primary type is [`IndexedTriangleSet`]: a flat array of vertex
//! positions and a flat array of `[u32; 3]` triangles that index into it.
//! There is no per-vertex or per-face allocation and no pointer structure,
//! which keeps the type trivially serialisable and cheap to copy.
//!
//! # Construction
//!
//! Meshes are typically constructed from file I/O or from face-vertex lists:
//!
//! ```
//! use meshslim::mesh::build_from_triangles;
//! use nalgebra::Point3;
//!
//! let vertices = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.5, 1.0, 0.0),
//! ];
//! let faces = vec![[0, 1, 2]];
//!
//! let its = build_from_triangles(&vertices, &faces).unwrap();
//! assert_eq!(its.num_triangles(), 1);
//! ```

mod builder;
mod its;
pub mod primitives;

pub use builder::{build_from_triangles, to_face_vertex};
pub use its::IndexedTriangleSet;
