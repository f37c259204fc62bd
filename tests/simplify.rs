//! End-to-end tests of quadric edge collapse simplification.

use std::ops::ControlFlow;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use meshslim::algo::decimate::Quadric;
use meshslim::nalgebra::Point3;
use meshslim::prelude::*;
use proptest::prelude::*;

/// Every vertex is used by at least one triangle.
fn has_no_orphans(its: &IndexedTriangleSet) -> bool {
    let mut used = vec![false; its.num_vertices()];
    for t in &its.indices {
        for &vi in t {
            used[vi as usize] = true;
        }
    }
    used.into_iter().all(|u| u)
}

fn signed_volume(its: &IndexedTriangleSet) -> f64 {
    (0..its.num_triangles())
        .map(|ti| {
            let [a, b, c] = its.triangle_vertices(ti);
            let a = a.cast::<f64>().coords;
            let b = b.cast::<f64>().coords;
            let c = c.cast::<f64>().coords;
            a.dot(&b.cross(&c)) / 6.0
        })
        .sum()
}

#[test]
fn test_cube_becomes_closed_tetrahedron() {
    for queue in [QueueLayout::Binary, QueueLayout::SkipHeap] {
        let mut cube = unit_cube();
        let options = SimplifyOptions::with_target_triangles(4).with_queue_layout(queue);
        let report = simplify(&mut cube, &options).unwrap();

        assert_eq!(report.stop_reason, StopReason::TargetReached, "{queue:?}");
        assert_eq!(cube.num_triangles(), 4, "{queue:?}");
        assert_eq!(cube.num_vertices(), 4, "{queue:?}");
        assert!(cube.is_closed_manifold(), "{queue:?}");
        assert!(has_no_orphans(&cube), "{queue:?}");
    }
}

#[test]
fn test_octahedron_reaches_four_triangles() {
    let mut octa = octahedron();
    let report = simplify(&mut octa, &SimplifyOptions::with_target_triangles(4)).unwrap();

    assert_eq!(report.stop_reason, StopReason::TargetReached);
    assert_eq!(octa.num_triangles(), 4);
    assert!(octa.is_closed_manifold());
}

#[test]
fn test_collapse_error_grows_with_reduction() {
    let original = uv_sphere(1.0, 32, 16);
    let mut previous = 0.0f32;
    for target in [900, 600, 300, 150] {
        let mut sphere = original.clone();
        let report = simplify(&mut sphere, &SimplifyOptions::with_target_triangles(target)).unwrap();

        assert_eq!(report.stop_reason, StopReason::TargetReached, "target {target}");
        assert!(
            report.last_collapsed_error >= previous,
            "target {target}: {} after {previous}",
            report.last_collapsed_error
        );
        previous = report.last_collapsed_error;
    }
    assert!(previous > 0.0);
}

#[test]
fn test_met_target_is_bit_identical() {
    let mut sphere = uv_sphere(1.0, 16, 8);
    let before = sphere.clone();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let progress = Progress::new(move |_| {
        counter.fetch_add(1, Ordering::Relaxed);
    });

    let options = SimplifyOptions::with_target_triangles(before.num_triangles());
    let report =
        simplify_with_progress(&mut sphere, &options, &progress, &Cancellation::none()).unwrap();

    assert_eq!(report.stop_reason, StopReason::Skipped);
    assert_eq!(sphere, before);
    assert_eq!(calls.load(Ordering::Relaxed), 0);
}

#[test]
fn test_each_collapse_removes_two_triangles() {
    let original = uv_sphere(1.0, 24, 12);
    for target in [500, 401, 250, 99, 20] {
        let mut sphere = original.clone();
        let report = simplify(&mut sphere, &SimplifyOptions::with_target_triangles(target)).unwrap();

        assert_eq!(
            report.final_triangles,
            report.original_triangles - 2 * report.collapses,
            "target {target}"
        );
        if report.stop_reason == StopReason::TargetReached {
            assert!(report.final_triangles <= target, "target {target}");
            assert!(report.final_triangles + 2 > target, "target {target}");
        }
        assert!(sphere.validate().is_ok(), "target {target}");
        assert!(has_no_orphans(&sphere), "target {target}");
    }
}

#[test]
fn test_sphere_keeps_its_shape() {
    let mut sphere = uv_sphere(1.0, 32, 16);
    let area_before = sphere.surface_area();
    let report = simplify(&mut sphere, &SimplifyOptions::with_target_ratio(0.5)).unwrap();

    assert_eq!(report.stop_reason, StopReason::TargetReached);
    assert_eq!(sphere.num_triangles(), 480);
    for v in &sphere.vertices {
        let r = v.coords.norm();
        assert!((r - 1.0).abs() < 0.15, "vertex {v} at radius {r}");
    }
    let area_after = sphere.surface_area();
    assert!((area_after - area_before).abs() / area_before < 0.2);
    assert!(signed_volume(&sphere) > 0.0);
}

#[test]
fn test_max_error_bounds_every_collapse() {
    let mut sphere = uv_sphere(1.0, 32, 16);
    let options = SimplifyOptions::with_target_triangles(0).with_max_error(1e-4);
    let report = simplify(&mut sphere, &options).unwrap();

    assert_eq!(report.stop_reason, StopReason::ErrorLimit);
    assert!(report.last_collapsed_error < 1e-4);
    assert!(sphere.num_triangles() > 0);
}

#[test]
fn test_detail_levels_are_ordered() {
    let original = uv_sphere(1.0, 32, 16);
    let mut counts = Vec::new();
    for level in [DetailLevel::ExtraHigh, DetailLevel::High, DetailLevel::Medium] {
        let mut sphere = original.clone();
        simplify(&mut sphere, &SimplifyOptions::with_detail_level(level)).unwrap();
        counts.push(sphere.num_triangles());
    }
    assert!(counts.windows(2).all(|w| w[0] >= w[1]), "{counts:?}");
    assert!(counts[0] < original.num_triangles());
}

#[test]
fn test_progress_is_monotone_and_complete() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let progress = Progress::new(move |p| sink.lock().unwrap().push(p));

    let mut sphere = uv_sphere(1.0, 32, 16);
    let options = SimplifyOptions::with_target_ratio(0.1).with_check_cancel_period(1);
    simplify_with_progress(&mut sphere, &options, &progress, &Cancellation::none()).unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.first(), Some(&0));
    assert_eq!(seen.last(), Some(&100));
    assert!(seen.windows(2).all(|w| w[0] <= w[1]), "{seen:?}");
    assert!(seen.iter().any(|&p| p > 10 && p < 100));
}

#[test]
fn test_cancellation_leaves_valid_mesh() {
    let polls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&polls);
    let cancel = Cancellation::new(move || {
        if counter.fetch_add(1, Ordering::Relaxed) >= 5 {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    });
    let last = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&last);
    let progress = Progress::new(move |p| *sink.lock().unwrap() = Some(p));

    let mut sphere = uv_sphere(1.0, 32, 16);
    let original = sphere.num_triangles();
    let options = SimplifyOptions::with_target_triangles(0).with_check_cancel_period(4);
    let result = simplify_with_progress(&mut sphere, &options, &progress, &cancel);

    assert!(matches!(result, Err(ref e) if e.is_cancelled()));
    assert_eq!(polls.load(Ordering::Relaxed), 6);
    assert!(sphere.num_triangles() < original);
    assert_eq!((original - sphere.num_triangles()) % 2, 0);
    assert!(sphere.validate().is_ok());
    assert!(has_no_orphans(&sphere));
    assert_ne!(*last.lock().unwrap(), Some(100));
}

#[test]
fn test_queue_layouts_and_threading_agree_on_counts() {
    let original = uv_sphere(1.5, 40, 20);
    let mut results = Vec::new();
    for queue in [QueueLayout::Binary, QueueLayout::SkipHeap] {
        for parallel in [false, true] {
            let mut mesh = original.clone();
            let options = SimplifyOptions::with_target_triangles(300)
                .with_queue_layout(queue)
                .with_parallel(parallel);
            let report = simplify(&mut mesh, &options).unwrap();
            results.push((report.final_triangles, report.stop_reason));
        }
    }
    assert!(results.windows(2).all(|w| w[0] == w[1]), "{results:?}");
    assert_eq!(results[0], (300, StopReason::TargetReached));
}

#[test]
fn test_open_grid_boundary_survives() {
    let mut g = grid(8);
    let boundary_before = g.num_boundary_edges();
    let report = simplify(&mut g, &SimplifyOptions::with_target_ratio(0.5)).unwrap();

    assert!(report.was_simplified());
    assert!(g.validate().is_ok());
    assert!(has_no_orphans(&g));
    assert!(g.num_boundary_edges() > 0);
    assert!(g.num_boundary_edges() <= boundary_before);
}

#[test]
fn test_invalid_input_is_reported() {
    let mut broken = IndexedTriangleSet {
        vertices: vec![Point3::origin(); 3],
        indices: vec![[0, 1, 7]],
    };
    let result = simplify(&mut broken, &SimplifyOptions::with_target_triangles(0));
    assert!(matches!(
        result,
        Err(MeshError::InvalidVertexIndex { face: 0, vertex: 7 })
    ));
}

fn plane() -> impl Strategy<Value = (f64, f64, f64, f64)> {
    (-1.0..1.0f64, -1.0..1.0f64, -1.0..1.0f64, -5.0..5.0f64)
        .prop_filter("non-degenerate normal", |(a, b, c, _)| {
            a * a + b * b + c * c > 1e-3
        })
        .prop_map(|(a, b, c, d)| {
            let n = (a * a + b * b + c * c).sqrt();
            (a / n, b / n, c / n, d)
        })
}

fn point() -> impl Strategy<Value = Point3<f64>> {
    (-10.0..10.0f64, -10.0..10.0f64, -10.0..10.0f64).prop_map(|(x, y, z)| Point3::new(x, y, z))
}

proptest! {
    #[test]
    fn quadric_error_is_additive_and_non_negative(p in plane(), q in plane(), v in point()) {
        let a = Quadric::from_plane(p.0, p.1, p.2, p.3);
        let b = Quadric::from_plane(q.0, q.1, q.2, q.3);
        let sum = a + b;
        let expected = a.vertex_error(&v) + b.vertex_error(&v);
        prop_assert!((sum.vertex_error(&v) - expected).abs() <= 1e-9 * (1.0 + expected));
        prop_assert!(sum.vertex_error(&v) >= -1e-9);
    }

    #[test]
    fn quadric_plane_error_is_squared_distance(p in plane(), v in point()) {
        let q = Quadric::from_plane(p.0, p.1, p.2, p.3);
        let distance = p.0 * v.x + p.1 * v.y + p.2 * v.z + p.3;
        prop_assert!((q.vertex_error(&v) - distance * distance).abs() <= 1e-9 * (1.0 + distance * distance));
    }
}
