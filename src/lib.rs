//! # meshslim
//!
//! Simplification of indexed triangle meshes by quadric edge collapse.
//!
//! meshslim reduces the triangle count of a mesh while keeping its shape,
//! using the Quadric Error Metrics of Garland and Heckbert. The mesh is
//! rewritten in place and stays a valid indexed triangle set at every exit,
//! including cancellation.
//!
//! ## Features
//!
//! - **Compact mesh type**: [`IndexedTriangleSet`](mesh::IndexedTriangleSet),
//!   flat `f32` positions plus `[u32; 3]` triangles
//! - **Triangle-count and error budgets**: stop at a count, a ratio, a
//!   maximum collapse error or a named detail level
//! - **Progress and cancellation**: monotone percentage callbacks and a
//!   periodically polled cancel hook
//! - **Indexable priority queues**: binary and cache-friendly skip-heap
//!   layouts behind one trait ([`queue`])
//! - **File formats**: STL and PLY
//!
//! ## Quick Start
//!
//! ```no_run
//! use meshslim::prelude::*;
//!
//! let mut mesh = meshslim::io::load("model.stl").unwrap();
//!
//! let report = simplify(&mut mesh, &SimplifyOptions::with_target_ratio(0.2)).unwrap();
//! println!("{report}");
//!
//! meshslim::io::save(&mesh, "model_simplified.stl").unwrap();
//! ```
//!
//! ## Error Budget
//!
//! ```
//! use meshslim::prelude::*;
//!
//! let mut sphere = uv_sphere(1.0, 48, 24);
//! let before = sphere.num_triangles();
//!
//! let options = SimplifyOptions::with_detail_level(DetailLevel::High);
//! let report = simplify(&mut sphere, &options).unwrap();
//!
//! assert!(sphere.num_triangles() < before);
//! assert!(report.last_collapsed_error < DetailLevel::High.max_error());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod algo;
pub mod error;
pub mod io;
pub mod mesh;
pub mod queue;

/// Prelude module for convenient imports.
///
/// This module re-exports the most commonly used types and functions:
///
/// ```
/// use meshslim::prelude::*;
/// ```
pub mod prelude {
    pub use crate::algo::decimate::{
        simplify, simplify_with_progress, DetailLevel, QueueLayout, SimplifyOptions,
        SimplifyReport, StopReason, Target,
    };
    pub use crate::algo::{Cancellation, Progress};
    pub use crate::error::{MeshError, Result};
    pub use crate::mesh::primitives::{grid, octahedron, unit_cube, uv_sphere};
    pub use crate::mesh::{build_from_triangles, to_face_vertex, IndexedTriangleSet};
}

// Re-export nalgebra types for convenience
pub use nalgebra;
