//! Greedy quadric edge collapse.

use tracing::{debug, trace};

use super::quadric::{calculate_3errors, calculate_vertex, create_normal, edge_order};
use super::topology::{triangle_error, Arena};
use super::StopReason;
use crate::algo::progress::{Cancellation, Progress};
use crate::error::Result;
use crate::mesh::IndexedTriangleSet;
use crate::queue::{IndexSetter, MutableQueue};

/// Queue entry: the cost of the cheapest edge of a triangle.
#[derive(Debug, Clone, Copy)]
pub struct Candidate {
    pub value: f32,
    pub triangle: u32,
}

/// Ordering of the candidate queue.
pub fn cheaper(a: &Candidate, b: &Candidate) -> bool {
    a.value < b.value
}

/// `triangle -> queue slot` side table filled by the queue.
#[derive(Debug, Clone)]
pub struct TriangleSlots(Vec<usize>);

impl TriangleSlots {
    pub fn new(num_triangles: usize) -> Self {
        Self(vec![0; num_triangles])
    }

    #[inline]
    fn slot(&self, triangle: usize) -> usize {
        self.0[triangle]
    }
}

impl IndexSetter<Candidate> for TriangleSlots {
    #[inline]
    fn set_index(&mut self, item: &Candidate, index: usize) {
        self.0[item.triangle as usize] = index;
    }
}

/// Parameters of one run, already checked against the mesh.
#[derive(Debug, Clone, Copy)]
pub struct CollapseParams {
    pub target: usize,
    pub max_error: f32,
    pub error_limited: bool,
    pub check_cancel_period: u32,
    pub parallel: bool,
}

/// What a finished run did.
#[derive(Debug, Clone, Copy)]
pub struct CollapseStats {
    pub collapses: usize,
    pub rejected: usize,
    pub last_collapsed_error: f32,
    pub stop_reason: StopReason,
}

/// Why a candidate edge may not collapse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rejection {
    Boundary,
    Degenerate,
    Flipped,
    NoVolume,
}

struct Decimator<'a, Q> {
    its: &'a mut IndexedTriangleSet,
    arena: Arena,
    queue: Q,
    max_error: f32,
    changed: Vec<u32>,
}

/// Collapse edges of `its` until `params.target` triangles remain or no
/// candidate is cheaper than `params.max_error`.
///
/// On cancellation the mesh is still compacted, so it is left valid and
/// partially simplified.
pub fn quadric_edge_collapse<Q>(
    its: &mut IndexedTriangleSet,
    params: &CollapseParams,
    queue: Q,
    progress: &Progress,
    cancel: &Cancellation,
) -> Result<CollapseStats>
where
    Q: MutableQueue<Candidate, Setter = TriangleSlots>,
{
    let original = its.num_triangles();
    progress.report(0);
    let (arena, errors) = Arena::build(its, params.parallel);
    progress.report(10);
    debug!(triangles = original, vertices = its.num_vertices(), "built incidence arena");

    let mut decimator = Decimator {
        its,
        arena,
        queue,
        max_error: params.max_error,
        changed: Vec::new(),
    };
    decimator.queue.reserve(errors.len());
    for (ti, value) in errors.into_iter().enumerate() {
        decimator.queue.push(Candidate {
            value,
            triangle: ti as u32,
        });
    }

    let to_reduce = original - params.target;
    let status_mod = (to_reduce / 100).max(16);
    let check_cancel_period = params.check_cancel_period.max(1) as usize;

    let mut stats = CollapseStats {
        collapses: 0,
        rejected: 0,
        last_collapsed_error: 0.0,
        stop_reason: StopReason::QueueExhausted,
    };
    let mut actual = original;
    let mut iteration = 0usize;

    let outcome = loop {
        if actual <= params.target {
            stats.stop_reason = StopReason::TargetReached;
            break Ok(());
        }
        if decimator.queue.is_empty() {
            break Ok(());
        }

        iteration += 1;
        if iteration % status_mod == 0 {
            progress.report_sub(original - actual, to_reduce, 10, 100);
        }
        if iteration % check_cancel_period == 0 {
            if let Err(err) = cancel.check() {
                break Err(err);
            }
        }

        let top = *decimator.queue.top();
        if top.value >= params.max_error {
            if params.error_limited {
                stats.stop_reason = StopReason::ErrorLimit;
            }
            break Ok(());
        }
        decimator.queue.pop();

        let ti0 = top.triangle as usize;
        if decimator.arena.t_infos[ti0].is_deleted() {
            continue;
        }
        match decimator.collapse(ti0) {
            Ok(()) => {
                stats.collapses += 1;
                stats.last_collapsed_error = top.value;
                actual -= 2;
            }
            Err(reason) => {
                trace!(triangle = ti0, ?reason, "collapse rejected");
                stats.rejected += 1;
                decimator.retry_next_edge(ti0);
            }
        }
    };

    debug_assert!(decimator.arena.check_neighbors(&decimator.its.indices));
    decimator.arena.compact(decimator.its);
    debug!(
        collapses = stats.collapses,
        rejected = stats.rejected,
        "edge collapse finished"
    );
    outcome?;
    progress.report(100);
    Ok(stats)
}

impl<Q> Decimator<'_, Q>
where
    Q: MutableQueue<Candidate, Setter = TriangleSlots>,
{
    /// Collapse the proposed edge of `ti0` if every check passes.
    fn collapse(&mut self, ti0: usize) -> std::result::Result<(), Rejection> {
        let t0 = self.its.indices[ti0];
        let min_index = self.arena.t_infos[ti0].min_index as usize;
        let mut vi0 = t0[min_index];
        let mut vi1 = t0[(min_index + 1) % 3];
        // Ranges are merged into the lower vertex.
        if vi0 > vi1 {
            std::mem::swap(&mut vi0, &mut vi1);
        }
        let v_info0 = self.arena.v_infos[vi0 as usize];
        let v_info1 = self.arena.v_infos[vi1 as usize];
        debug_assert!(!v_info0.is_deleted() && !v_info1.is_deleted());

        let q = v_info0.q + v_info1.q;
        let new_vertex = calculate_vertex(vi0 as usize, vi1 as usize, &q, &self.its.vertices);

        let indices = &self.its.indices;
        let ti0 = ti0 as u32;
        let ti1 = if v_info0.count < v_info1.count {
            self.arena.find_opposite_triangle(indices, vi1, &v_info0, ti0)
        } else {
            self.arena.find_opposite_triangle(indices, vi0, &v_info1, ti0)
        }
        .ok_or(Rejection::Boundary)?;

        if self.arena.degenerate(indices, vi0, ti0, ti1, &v_info1)
            || self.arena.degenerate(indices, vi1, ti0, ti1, &v_info0)
        {
            return Err(Rejection::Degenerate);
        }
        if self.arena.is_flipped(self.its, &new_vertex, ti0, ti1, &v_info0)
            || self.arena.is_flipped(self.its, &new_vertex, ti0, ti1, &v_info1)
        {
            return Err(Rejection::Flipped);
        }
        if self.arena.create_no_volume(indices, &v_info0, &v_info1, ti0, ti1) {
            return Err(Rejection::NoVolume);
        }

        self.changed.clear();
        for e in self.arena.edges(&v_info0) {
            if e.t_index != ti0 && e.t_index != ti1 {
                self.changed.push(e.t_index);
            }
        }
        for e in self.arena.edges(&v_info1) {
            if e.t_index != ti0 && e.t_index != ti1 {
                self.its.indices[e.t_index as usize][e.edge as usize] = vi0;
                self.changed.push(e.t_index);
            }
        }

        self.arena.v_infos[vi0 as usize].q = q;
        let vi_top0 = t0[(min_index + 2) % 3];
        let t1 = self.its.indices[ti1 as usize];
        self.arena.change_neighbors(ti0, ti1, vi0, vi1, vi_top0, t1);
        self.its.vertices[vi0 as usize] = new_vertex;

        let slot = self.queue.index_setter().slot(ti1 as usize);
        self.queue.remove(slot);

        for &ti in &self.changed {
            let ti = ti as usize;
            let t = self.its.indices[ti];
            self.arena.t_infos[ti].n = create_normal(t, &self.its.vertices);
            let (value, min_index) = triangle_error(t, &self.its.vertices, &self.arena.v_infos);
            self.arena.t_infos[ti].min_index = min_index;

            let slot = self.queue.index_setter().slot(ti);
            self.queue.get_mut(slot).value = value;
            self.queue.update(slot);
        }

        self.arena.t_infos[ti0 as usize].set_deleted();
        self.arena.t_infos[ti1 as usize].set_deleted();
        Ok(())
    }

    /// Propose the next cheapest edge of a rejected triangle, or park the
    /// triangle at `max_error` once all three edges were tried.
    fn retry_next_edge(&mut self, ti0: usize) {
        let t = self.its.indices[ti0];
        let v_infos = &self.arena.v_infos;
        let errors = calculate_3errors(t, &self.its.vertices, |vi| v_infos[vi].q);
        let order = edge_order(&errors);

        let t_info = &mut self.arena.t_infos[ti0];
        let value = if t_info.min_index == order[0] {
            t_info.min_index = order[1];
            errors[order[1] as usize]
        } else if t_info.min_index == order[1] {
            t_info.min_index = order[2];
            errors[order[2] as usize]
        } else {
            self.max_error
        };
        self.queue.push(Candidate {
            value,
            triangle: ti0 as u32,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::primitives::{unit_cube, uv_sphere};
    use nalgebra::Point3;
    use crate::queue::{MutablePriorityQueue, MutableSkipHeapPriorityQueue};

    fn params(target: usize) -> CollapseParams {
        CollapseParams {
            target,
            max_error: f32::INFINITY,
            error_limited: false,
            check_cancel_period: 16,
            parallel: false,
        }
    }

    fn run(its: &mut IndexedTriangleSet, params: &CollapseParams) -> CollapseStats {
        let queue = MutablePriorityQueue::new(TriangleSlots::new(its.num_triangles()), cheaper);
        quadric_edge_collapse(its, params, queue, &Progress::none(), &Cancellation::none()).unwrap()
    }

    #[test]
    fn test_cube_first_collapses() {
        let mut cube = unit_cube();
        let stats = run(&mut cube, &params(10));
        assert_eq!(cube.num_triangles(), 10);
        assert_eq!(cube.num_vertices(), 7);
        assert_eq!(stats.collapses, 1);
        assert_eq!(stats.stop_reason, StopReason::TargetReached);
        assert!(cube.validate().is_ok());
    }

    #[test]
    fn test_tetrahedron_is_never_collapsed() {
        // Every edge of a tetrahedron would fold two faces onto each other.
        let mut tet = IndexedTriangleSet {
            vertices: vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
                Point3::new(0.0, 0.0, 1.0),
            ],
            indices: vec![[0, 2, 1], [0, 1, 3], [0, 3, 2], [1, 2, 3]],
        };
        let before = tet.clone();
        let stats = run(&mut tet, &params(0));
        assert_eq!(tet, before);
        assert_eq!(stats.collapses, 0);
        // Each triangle tries its three edges before it is parked.
        assert_eq!(stats.rejected, 12);
        assert_eq!(stats.stop_reason, StopReason::QueueExhausted);
    }

    #[test]
    fn test_error_limit_stops_early() {
        let mut sphere = uv_sphere(1.0, 16, 8);
        let p = CollapseParams {
            max_error: 1e-12,
            error_limited: true,
            ..params(0)
        };
        let stats = run(&mut sphere, &p);
        assert_eq!(stats.stop_reason, StopReason::ErrorLimit);
        assert!(sphere.num_triangles() > 0);
        assert!(stats.last_collapsed_error < 1e-12);
    }

    #[test]
    fn test_sphere_reaches_target() {
        let mut sphere = uv_sphere(1.0, 24, 12);
        let stats = run(&mut sphere, &params(100));
        assert!(sphere.num_triangles() <= 100);
        assert_eq!(sphere.num_triangles() % 2, 0);
        assert_eq!(stats.collapses, (528 - sphere.num_triangles()) / 2);
        assert!(sphere.validate().is_ok());
    }

    #[test]
    fn test_cancel_leaves_valid_mesh() {
        let mut sphere = uv_sphere(1.0, 24, 12);
        let queue = MutablePriorityQueue::new(TriangleSlots::new(sphere.num_triangles()), cheaper);
        let cancel = Cancellation::new(|| std::ops::ControlFlow::Break(()));
        let result = quadric_edge_collapse(&mut sphere, &params(0), queue, &Progress::none(), &cancel);
        assert!(matches!(result, Err(crate::error::MeshError::Cancelled)));
        assert!(sphere.num_triangles() <= 528);
        assert_eq!(sphere.num_triangles() % 2, 0);
        assert!(sphere.validate().is_ok());
    }

    #[test]
    fn test_queue_layouts_agree() {
        let mut a = uv_sphere(2.0, 20, 10);
        let mut b = a.clone();
        let p = params(60);
        run(&mut a, &p);
        let queue: MutableSkipHeapPriorityQueue<_, _, _, 8> =
            MutableSkipHeapPriorityQueue::new(TriangleSlots::new(b.num_triangles()), cheaper);
        quadric_edge_collapse(&mut b, &p, queue, &Progress::none(), &Cancellation::none()).unwrap();
        assert_eq!(a.num_triangles(), b.num_triangles());
        assert_eq!(a.num_vertices(), b.num_vertices());
    }
}
