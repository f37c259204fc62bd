//! Simple closed and open meshes.
//!
//! These are used by tests, benchmarks and the CLI's self-check; they are
//! small, well-shaped and have known topology.

use std::f64::consts::PI;

use nalgebra::Point3;

use super::its::IndexedTriangleSet;

/// Axis-aligned unit cube: 8 vertices, 12 outward-facing triangles.
pub fn unit_cube() -> IndexedTriangleSet {
    let p = |x: f32, y: f32, z: f32| Point3::new(x, y, z);
    IndexedTriangleSet {
        vertices: vec![
            p(0.0, 0.0, 0.0),
            p(1.0, 0.0, 0.0),
            p(1.0, 1.0, 0.0),
            p(0.0, 1.0, 0.0),
            p(0.0, 0.0, 1.0),
            p(1.0, 0.0, 1.0),
            p(1.0, 1.0, 1.0),
            p(0.0, 1.0, 1.0),
        ],
        indices: vec![
            [0, 2, 1],
            [0, 3, 2], // bottom
            [4, 5, 6],
            [4, 6, 7], // top
            [0, 1, 5],
            [0, 5, 4], // front
            [2, 3, 7],
            [2, 7, 6], // back
            [0, 4, 7],
            [0, 7, 3], // left
            [1, 2, 6],
            [1, 6, 5], // right
        ],
    }
}

/// Regular octahedron with unit circumradius: 6 vertices, 8 triangles.
pub fn octahedron() -> IndexedTriangleSet {
    let p = |x: f32, y: f32, z: f32| Point3::new(x, y, z);
    IndexedTriangleSet {
        vertices: vec![
            p(1.0, 0.0, 0.0),
            p(-1.0, 0.0, 0.0),
            p(0.0, 1.0, 0.0),
            p(0.0, -1.0, 0.0),
            p(0.0, 0.0, 1.0),
            p(0.0, 0.0, -1.0),
        ],
        indices: vec![
            [0, 2, 4],
            [2, 1, 4],
            [1, 3, 4],
            [3, 0, 4],
            [2, 0, 5],
            [1, 2, 5],
            [3, 1, 5],
            [0, 3, 5],
        ],
    }
}

/// Flat `n x n` grid in the XY plane with unit spacing (open mesh).
///
/// Produces `(n + 1)^2` vertices and `2 n^2` triangles.
pub fn grid(n: usize) -> IndexedTriangleSet {
    let mut its = IndexedTriangleSet::with_capacity((n + 1) * (n + 1), 2 * n * n);

    for j in 0..=n {
        for i in 0..=n {
            its.vertices.push(Point3::new(i as f32, j as f32, 0.0));
        }
    }

    for j in 0..n {
        for i in 0..n {
            let v00 = (j * (n + 1) + i) as u32;
            let v10 = v00 + 1;
            let v01 = v00 + (n + 1) as u32;
            let v11 = v01 + 1;

            its.indices.push([v00, v10, v11]);
            its.indices.push([v00, v11, v01]);
        }
    }

    its
}

/// Closed UV sphere of the given radius centred at the origin.
///
/// `segments` is the number of slices around the Z axis (at least 3) and
/// `rings` the number of latitude bands (at least 2). The result has
/// `2 * segments * (rings - 1)` triangles.
pub fn uv_sphere(radius: f64, segments: usize, rings: usize) -> IndexedTriangleSet {
    let segments = segments.max(3);
    let rings = rings.max(2);
    let mut its =
        IndexedTriangleSet::with_capacity(2 + (rings - 1) * segments, 2 * segments * (rings - 1));

    let point = |theta: f64, phi: f64| {
        Point3::new(
            (radius * theta.sin() * phi.cos()) as f32,
            (radius * theta.sin() * phi.sin()) as f32,
            (radius * theta.cos()) as f32,
        )
    };

    its.vertices.push(Point3::new(0.0, 0.0, radius as f32));
    for i in 1..rings {
        let theta = PI * i as f64 / rings as f64;
        for j in 0..segments {
            let phi = 2.0 * PI * j as f64 / segments as f64;
            its.vertices.push(point(theta, phi));
        }
    }
    its.vertices.push(Point3::new(0.0, 0.0, -radius as f32));

    let top = 0u32;
    let bottom = (its.vertices.len() - 1) as u32;
    let ring = |i: usize, j: usize| (1 + (i - 1) * segments + j % segments) as u32;

    for j in 0..segments {
        its.indices.push([top, ring(1, j), ring(1, j + 1)]);
    }
    for i in 1..rings - 1 {
        for j in 0..segments {
            let a = ring(i, j);
            let b = ring(i, j + 1);
            let c = ring(i + 1, j);
            let d = ring(i + 1, j + 1);
            its.indices.push([a, c, d]);
            its.indices.push([a, d, b]);
        }
    }
    for j in 0..segments {
        its.indices
            .push([ring(rings - 1, j), bottom, ring(rings - 1, j + 1)]);
    }

    its
}
