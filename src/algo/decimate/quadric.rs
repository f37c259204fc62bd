//! Quadric error metric.
//!
//! A quadric is the symmetric 4x4 matrix `Q` for which `[v 1]ᵀ Q [v 1]` is
//! the sum of squared distances from `v` to a set of planes. Summing the
//! quadrics of the triangles around a vertex gives the error of moving that
//! vertex anywhere in space.

use std::ops::{Add, AddAssign};

use nalgebra::{Point3, Vector3};

/// A quadric error matrix (4x4 symmetric matrix).
///
/// Stored as the 10 coefficients of the upper triangle:
///
/// ```text
/// | q0 q1 q2 q3 |
/// | q1 q4 q5 q6 |
/// | q2 q5 q7 q8 |
/// | q3 q6 q8 q9 |
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Quadric {
    data: [f64; 10],
}

impl Quadric {
    /// The zero quadric.
    pub const ZERO: Quadric = Quadric { data: [0.0; 10] };

    /// Create a quadric from a plane equation `ax + by + cz + d = 0`.
    ///
    /// The plane should be normalized (`a² + b² + c² = 1`) for the error to
    /// be a squared distance.
    pub fn from_plane(a: f64, b: f64, c: f64, d: f64) -> Self {
        Self {
            data: [
                a * a,
                a * b,
                a * c,
                a * d,
                b * b,
                b * c,
                b * d,
                c * c,
                c * d,
                d * d,
            ],
        }
    }

    /// Determinant of the 3x3 matrix picked from the coefficients by index.
    #[allow(clippy::too_many_arguments)]
    #[inline]
    pub fn det(
        &self,
        a11: usize,
        a12: usize,
        a13: usize,
        a21: usize,
        a22: usize,
        a23: usize,
        a31: usize,
        a32: usize,
        a33: usize,
    ) -> f64 {
        let m = &self.data;
        m[a11] * m[a22] * m[a33] + m[a13] * m[a21] * m[a32] + m[a12] * m[a23] * m[a31]
            - m[a13] * m[a22] * m[a31]
            - m[a11] * m[a23] * m[a32]
            - m[a12] * m[a21] * m[a33]
    }

    /// Evaluate the quadric error for a point: `vᵀ Q v` with `v = [x, y, z, 1]`.
    ///
    /// Never negative for sums of plane quadrics, up to rounding.
    pub fn vertex_error(&self, p: &Point3<f64>) -> f64 {
        let q = &self.data;
        let (x, y, z) = (p.x, p.y, p.z);
        q[0] * x * x
            + 2.0 * q[1] * x * y
            + 2.0 * q[2] * x * z
            + 2.0 * q[3] * x
            + q[4] * y * y
            + 2.0 * q[5] * y * z
            + 2.0 * q[6] * y
            + q[7] * z * z
            + 2.0 * q[8] * z
            + q[9]
    }

    /// Point minimizing the error, or `None` if the leading 3x3 block is
    /// numerically singular.
    pub fn optimal_point(&self) -> Option<Point3<f64>> {
        let det = self.det(0, 1, 2, 1, 4, 5, 2, 5, 7);
        if det.abs() < f64::EPSILON {
            return None;
        }
        let det_1 = -1.0 / det;
        Some(Point3::new(
            det_1 * self.det(1, 2, 3, 4, 5, 6, 5, 7, 8),
            -det_1 * self.det(0, 2, 3, 1, 5, 6, 2, 7, 8),
            det_1 * self.det(0, 1, 3, 1, 4, 6, 2, 5, 8),
        ))
    }
}

impl AddAssign for Quadric {
    fn add_assign(&mut self, other: Quadric) {
        for (a, b) in self.data.iter_mut().zip(other.data) {
            *a += b;
        }
    }
}

impl Add for Quadric {
    type Output = Quadric;

    fn add(mut self, other: Quadric) -> Quadric {
        self += other;
        self
    }
}

impl std::iter::Sum for Quadric {
    fn sum<I: Iterator<Item = Quadric>>(iter: I) -> Quadric {
        iter.fold(Quadric::ZERO, Add::add)
    }
}

/// Unit normal of a triangle; zero for a degenerate triangle.
pub fn create_normal(triangle: [u32; 3], vertices: &[Point3<f32>]) -> Vector3<f32> {
    let v0 = vertices[triangle[0] as usize].cast::<f64>();
    let v1 = vertices[triangle[1] as usize].cast::<f64>();
    let v2 = vertices[triangle[2] as usize].cast::<f64>();
    (v1 - v0)
        .cross(&(v2 - v0))
        .try_normalize(0.0)
        .map(|n| n.cast::<f32>())
        .unwrap_or_else(Vector3::zeros)
}

/// Plane quadric of a triangle through its first vertex.
pub fn create_quadric(triangle: [u32; 3], normal: &Vector3<f32>, vertices: &[Point3<f32>]) -> Quadric {
    let n = normal.cast::<f64>();
    let v0 = vertices[triangle[0] as usize].cast::<f64>();
    Quadric::from_plane(n.x, n.y, n.z, -n.dot(&v0.coords))
}

/// The three fallback candidates of a singular collapse: both endpoints and
/// their midpoint, with the first minimum winning.
fn best_fallback(v0: usize, v1: usize, q: &Quadric, vertices: &[Point3<f32>]) -> (Point3<f64>, f64) {
    let a = vertices[v0].cast::<f64>();
    let b = vertices[v1].cast::<f64>();
    let candidates = [a, b, nalgebra::center(&a, &b)];
    let mut best = (candidates[0], q.vertex_error(&candidates[0]));
    for c in &candidates[1..] {
        let error = q.vertex_error(c);
        if error < best.1 {
            best = (*c, error);
        }
    }
    best
}

/// Error of collapsing edge `(v0, v1)` whose merged quadric is `q`.
pub fn calculate_error(v0: usize, v1: usize, q: &Quadric, vertices: &[Point3<f32>]) -> f64 {
    match q.optimal_point() {
        Some(p) => q.vertex_error(&p),
        None => best_fallback(v0, v1, q, vertices).1,
    }
}

/// Position of the vertex replacing edge `(v0, v1)` whose merged quadric is `q`.
pub fn calculate_vertex(v0: usize, v1: usize, q: &Quadric, vertices: &[Point3<f32>]) -> Point3<f32> {
    match q.optimal_point() {
        Some(p) => p.cast::<f32>(),
        None => best_fallback(v0, v1, q, vertices).0.cast::<f32>(),
    }
}

/// Collapse error of the three edges of a triangle.
///
/// Edge `j` joins `triangle[j]` and `triangle[(j + 1) % 3]`; `quadric`
/// looks up the per-vertex quadric.
pub fn calculate_3errors(
    triangle: [u32; 3],
    vertices: &[Point3<f32>],
    quadric: impl Fn(usize) -> Quadric,
) -> [f32; 3] {
    std::array::from_fn(|j| {
        let v0 = triangle[j] as usize;
        let v1 = triangle[(j + 1) % 3] as usize;
        let q = quadric(v0) + quadric(v1);
        calculate_error(v0, v1, &q, vertices) as f32
    })
}

/// Edge indices ordered by error, ties broken by the lower index.
pub fn edge_order(errors: &[f32; 3]) -> [u8; 3] {
    let mut order = [0u8, 1, 2];
    order.sort_by(|&a, &b| errors[a as usize].total_cmp(&errors[b as usize]));
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plane_x(offset: f64) -> Quadric {
        Quadric::from_plane(1.0, 0.0, 0.0, -offset)
    }

    #[test]
    fn test_plane_error_is_squared_distance() {
        let q = plane_x(1.0);
        assert!((q.vertex_error(&Point3::new(3.0, 5.0, -2.0)) - 4.0).abs() < 1e-12);
        assert!(q.vertex_error(&Point3::new(1.0, 9.0, 9.0)).abs() < 1e-12);
    }

    #[test]
    fn test_three_planes_meet_in_corner() {
        let q = Quadric::from_plane(1.0, 0.0, 0.0, -1.0)
            + Quadric::from_plane(0.0, 1.0, 0.0, -2.0)
            + Quadric::from_plane(0.0, 0.0, 1.0, -3.0);
        let p = q.optimal_point().unwrap();
        assert!((p - Point3::new(1.0, 2.0, 3.0)).norm() < 1e-9);
        assert!(q.vertex_error(&p).abs() < 1e-9);
    }

    #[test]
    fn test_singular_falls_back_to_candidates() {
        // A single plane has a singular 3x3 block.
        let q = plane_x(0.0);
        assert!(q.optimal_point().is_none());
        let vertices = vec![Point3::new(2.0f32, 0.0, 0.0), Point3::new(-1.0, 0.0, 0.0)];
        // Midpoint x = 0.5 beats both endpoints.
        let error = calculate_error(0, 1, &q, &vertices);
        assert!((error - 0.25).abs() < 1e-9);
        let v = calculate_vertex(0, 1, &q, &vertices);
        assert_eq!(v, Point3::new(0.5, 0.0, 0.0));
    }

    #[test]
    fn test_singular_tie_keeps_first_endpoint() {
        let q = Quadric::ZERO;
        let vertices = vec![Point3::new(1.0f32, 2.0, 3.0), Point3::new(4.0, 5.0, 6.0)];
        assert_eq!(calculate_vertex(0, 1, &q, &vertices), vertices[0]);
        assert!(calculate_error(0, 1, &q, &vertices).is_finite());
    }

    #[test]
    fn test_additivity() {
        let a = Quadric::from_plane(0.6, 0.8, 0.0, -1.5);
        let b = Quadric::from_plane(0.0, 0.0, 1.0, 2.0);
        let p = Point3::new(0.3, -1.2, 4.5);
        let sum = a + b;
        assert!((sum.vertex_error(&p) - (a.vertex_error(&p) + b.vertex_error(&p))).abs() < 1e-9);
        assert_eq!(a + b, b + a);
        assert_eq!([a, b].into_iter().sum::<Quadric>(), sum);
    }

    #[test]
    fn test_normal_and_quadric() {
        let vertices = vec![
            Point3::new(0.0f32, 0.0, 1.0),
            Point3::new(1.0, 0.0, 1.0),
            Point3::new(0.0, 1.0, 1.0),
        ];
        let n = create_normal([0, 1, 2], &vertices);
        assert!((n - Vector3::z()).norm() < 1e-6);
        let q = create_quadric([0, 1, 2], &n, &vertices);
        for v in &vertices {
            assert!(q.vertex_error(&v.cast()).abs() < 1e-9);
        }
        assert!((q.vertex_error(&Point3::new(5.0, 5.0, 3.0)) - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_normal_is_zero() {
        let vertices = vec![
            Point3::new(0.0f32, 0.0, 0.0),
            Point3::new(1.0, 1.0, 1.0),
            Point3::new(2.0, 2.0, 2.0),
        ];
        assert_eq!(create_normal([0, 1, 2], &vertices), Vector3::zeros());
    }

    #[test]
    fn test_edge_order_ties_prefer_lower_index() {
        assert_eq!(edge_order(&[1.0, 1.0, 1.0]), [0, 1, 2]);
        assert_eq!(edge_order(&[3.0, 1.0, 1.0]), [1, 2, 0]);
        assert_eq!(edge_order(&[0.5, 2.0, 0.1]), [2, 0, 1]);
    }
}
