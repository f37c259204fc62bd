//! Flat incidence arena used by the edge-collapse loop.
//!
//! Every vertex owns a contiguous range of one shared [`EdgeInfo`] array
//! listing the triangles that touch it. A collapse merges the range of the
//! higher vertex into the lower one; the range grows in place by shifting
//! the ranges that follow it into the nearest free space (see
//! [`CopyEdgeInfo`]), so no per-vertex allocation ever happens.

use nalgebra::{Point3, Vector3};
use rayon::prelude::*;

use super::quadric::{calculate_3errors, create_normal, create_quadric, edge_order, Quadric};
use crate::mesh::IndexedTriangleSet;

/// Normal x-component marking a deleted triangle; unit normals never reach it.
const DELETED_MARKER: f32 = 3.0;

/// Per-triangle state.
#[derive(Debug, Clone, Copy)]
pub struct TriangleInfo {
    /// Unit normal, or [`DELETED_MARKER`] in `x` once deleted.
    pub n: Vector3<f32>,
    /// Local index of the edge currently proposed for collapse.
    pub min_index: u8,
}

impl TriangleInfo {
    #[inline]
    pub fn is_deleted(&self) -> bool {
        self.n.x > 2.0
    }

    #[inline]
    pub fn set_deleted(&mut self) {
        self.n.x = DELETED_MARKER;
    }
}

/// Per-vertex state.
#[derive(Debug, Clone, Copy, Default)]
pub struct VertexInfo {
    /// Sum of the plane quadrics around the vertex.
    pub q: Quadric,
    /// First entry of the vertex's incidence range.
    pub start: u32,
    /// Number of triangles touching the vertex; zero once merged away.
    pub count: u32,
}

impl VertexInfo {
    #[inline]
    pub fn is_deleted(&self) -> bool {
        self.count == 0
    }

    #[inline]
    fn range(&self) -> std::ops::Range<usize> {
        self.start as usize..(self.start + self.count) as usize
    }
}

/// One incidence entry: a triangle and the local slot of the owning vertex.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EdgeInfo {
    pub t_index: u32,
    pub edge: u8,
}

/// A window of incidence entries to move towards the end of the array.
///
/// Windows are produced in increasing address order and must be applied in
/// reverse so that a window never overwrites one that has not moved yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyEdgeInfo {
    pub start: u32,
    pub count: u32,
    pub shift: u32,
}

impl CopyEdgeInfo {
    /// Move `[start, start + count)` to `start + shift`.
    #[inline]
    pub fn apply(&self, e_infos: &mut [EdgeInfo]) {
        let start = self.start as usize;
        let end = start + self.count as usize;
        e_infos.copy_within(start..end, start + self.shift as usize);
    }
}

/// Reserve `need` extra entries directly after the range of `vi`.
///
/// Shifts the starts of the following vertices and returns the windows that
/// must be moved to match, stopping at the first gap large enough to absorb
/// what is left of `need`. `e_len` is the length of the incidence array.
pub fn plan_shift(v_infos: &mut [VertexInfo], vi: usize, mut need: u32, e_len: u32) -> Vec<CopyEdgeInfo> {
    let mut plan: Vec<CopyEdgeInfo> = Vec::new();
    let mut last_end = v_infos[vi].start + v_infos[vi].count;
    let mut act_vi = vi + 1;
    loop {
        let act_start = v_infos.get(act_vi).map_or(e_len, |v| v.start);
        let gap = act_start - last_end;
        if gap >= need {
            break;
        }
        // Past the last vertex the tail gap always suffices.
        let Some(act) = v_infos.get_mut(act_vi) else {
            debug_assert!(false, "incidence array has no room left");
            break;
        };
        match plan.last_mut() {
            Some(last) if gap == 0 => last.count += act.count,
            _ => {
                need -= gap;
                plan.push(CopyEdgeInfo {
                    start: act.start,
                    count: act.count,
                    shift: need,
                });
            }
        }
        last_end = act.start + act.count;
        act.start += need;
        act_vi += 1;
    }
    plan
}

/// The incidence arena of one simplification run.
#[derive(Debug, Clone, Default)]
pub struct Arena {
    pub t_infos: Vec<TriangleInfo>,
    pub v_infos: Vec<VertexInfo>,
    pub e_infos: Vec<EdgeInfo>,
    moved: Vec<EdgeInfo>,
}

/// Cost of the cheapest edge of a triangle and that edge's local index.
pub fn triangle_error(t: [u32; 3], vertices: &[Point3<f32>], v_infos: &[VertexInfo]) -> (f32, u8) {
    let errors = calculate_3errors(t, vertices, |vi| v_infos[vi].q);
    let best = edge_order(&errors)[0];
    (errors[best as usize], best)
}

fn map_triangles<R, F>(indices: &[[u32; 3]], parallel: bool, f: F) -> Vec<R>
where
    R: Send,
    F: Fn(&[u32; 3]) -> R + Send + Sync,
{
    if parallel {
        indices.par_iter().map(&f).collect()
    } else {
        indices.iter().map(&f).collect()
    }
}

impl Arena {
    /// Build normals, quadrics and incidence ranges for `its`.
    ///
    /// Returns the arena and the initial cost of every triangle. The mesh
    /// must be valid (see [`IndexedTriangleSet::validate`]).
    pub fn build(its: &IndexedTriangleSet, parallel: bool) -> (Self, Vec<f32>) {
        let vertices = &its.vertices;
        let planes = map_triangles(&its.indices, parallel, |&t| {
            let n = create_normal(t, vertices);
            (n, create_quadric(t, &n, vertices))
        });

        let mut v_infos = vec![VertexInfo::default(); vertices.len()];
        let mut t_infos = Vec::with_capacity(its.indices.len());
        for (t, (n, q)) in its.indices.iter().zip(&planes) {
            for &vi in t {
                let v_info = &mut v_infos[vi as usize];
                v_info.q += *q;
                v_info.count += 1;
            }
            t_infos.push(TriangleInfo { n: *n, min_index: 0 });
        }

        let mut start = 0;
        for v_info in &mut v_infos {
            v_info.start = start;
            start += v_info.count;
            v_info.count = 0;
        }
        debug_assert_eq!(start as usize, its.indices.len() * 3);

        let errors = map_triangles(&its.indices, parallel, |&t| triangle_error(t, vertices, &v_infos));

        let mut e_infos = vec![EdgeInfo::default(); its.indices.len() * 3];
        let mut values = Vec::with_capacity(errors.len());
        for (ti, (t, (value, min_index))) in its.indices.iter().zip(errors).enumerate() {
            t_infos[ti].min_index = min_index;
            values.push(value);
            for (j, &vi) in t.iter().enumerate() {
                let v_info = &mut v_infos[vi as usize];
                e_infos[(v_info.start + v_info.count) as usize] = EdgeInfo {
                    t_index: ti as u32,
                    edge: j as u8,
                };
                v_info.count += 1;
            }
        }

        let arena = Self {
            t_infos,
            v_infos,
            e_infos,
            moved: Vec::new(),
        };
        (arena, values)
    }

    /// Incidence entries of a vertex.
    #[inline]
    pub fn edges(&self, v_info: &VertexInfo) -> &[EdgeInfo] {
        &self.e_infos[v_info.range()]
    }

    /// Incidence entries of `v_info` other than the two collapsing triangles.
    fn surviving<'a>(&'a self, v_info: &VertexInfo, ti0: u32, ti1: u32) -> impl Iterator<Item = EdgeInfo> + 'a {
        self.edges(v_info)
            .iter()
            .copied()
            .filter(move |e| e.t_index != ti0 && e.t_index != ti1)
    }

    /// The triangle other than `ti0` that shares the edge between the vertex
    /// owning `v_info` and `vi`, or `None` for a boundary edge.
    pub fn find_opposite_triangle(&self, indices: &[[u32; 3]], vi: u32, v_info: &VertexInfo, ti0: u32) -> Option<u32> {
        self.edges(v_info)
            .iter()
            .filter(|e| e.t_index != ti0)
            .find(|e| {
                let t = indices[e.t_index as usize];
                let edge = e.edge as usize;
                t[(edge + 1) % 3] == vi || t[(edge + 2) % 3] == vi
            })
            .map(|e| e.t_index)
    }

    /// True if a triangle around `v_info` that survives the collapse already
    /// contains `vi`, so merging would repeat a vertex in it.
    pub fn degenerate(&self, indices: &[[u32; 3]], vi: u32, ti0: u32, ti1: u32, v_info: &VertexInfo) -> bool {
        self.surviving(v_info, ti0, ti1)
            .any(|e| indices[e.t_index as usize].contains(&vi))
    }

    /// True if merging would place two surviving triangles on the same three
    /// vertices with opposite winding.
    pub fn create_no_volume(
        &self,
        indices: &[[u32; 3]],
        v_info0: &VertexInfo,
        v_info1: &VertexInfo,
        ti0: u32,
        ti1: u32,
    ) -> bool {
        let opposite = |e: EdgeInfo| {
            let t = indices[e.t_index as usize];
            let edge = e.edge as usize;
            (t[(edge + 1) % 3], t[(edge + 2) % 3])
        };
        self.surviving(v_info0, ti0, ti1).any(|a| {
            let (a1, a2) = opposite(a);
            self.surviving(v_info1, ti0, ti1).any(|b| {
                let (b1, b2) = opposite(b);
                a1 == b2 && a2 == b1
            })
        })
    }

    /// True if moving the vertex owning `v_info` to `new_vertex` degenerates
    /// or flips any of its surviving triangles.
    pub fn is_flipped(
        &self,
        its: &IndexedTriangleSet,
        new_vertex: &Point3<f32>,
        ti0: u32,
        ti1: u32,
        v_info: &VertexInfo,
    ) -> bool {
        self.surviving(v_info, ti0, ti1).any(|e| {
            let t = its.indices[e.t_index as usize];
            let edge = e.edge as usize;
            let vf = &its.vertices[t[(edge + 1) % 3] as usize];
            let vs = &its.vertices[t[(edge + 2) % 3] as usize];
            is_flipped(new_vertex, vf, vs, &self.t_infos[e.t_index as usize].n)
        })
    }

    /// Drop triangle `ti` from the range of vertex `vi`.
    pub fn remove_triangle(&mut self, vi: usize, ti: u32) {
        let v_info = &mut self.v_infos[vi];
        let range = v_info.range();
        let Some(last) = range.end.checked_sub(1) else {
            debug_assert!(false, "vertex {vi} has no triangles");
            return;
        };
        match self.e_infos[range].iter().position(|e| e.t_index == ti) {
            Some(pos) => {
                self.e_infos[v_info.start as usize + pos] = self.e_infos[last];
                v_info.count -= 1;
            }
            None => debug_assert!(false, "triangle {ti} is not around vertex {vi}"),
        }
    }

    /// Merge the incidence range of `vi1` into `vi0` after collapsing edge
    /// `(vi0, vi1)` shared by `ti0` and `ti1`.
    ///
    /// `vi_top0` is the third vertex of `ti0`; `t1` the vertices of `ti1`.
    pub fn change_neighbors(&mut self, ti0: u32, ti1: u32, vi0: u32, vi1: u32, vi_top0: u32, t1: [u32; 3]) {
        debug_assert!(vi0 < vi1);
        let vi_top1 = t1
            .into_iter()
            .find(|&v| v != vi0 && v != vi1)
            .unwrap_or(t1[2]);
        let (vi0, vi1) = (vi0 as usize, vi1 as usize);

        self.remove_triangle(vi_top0 as usize, ti0);
        self.remove_triangle(vi_top1 as usize, ti1);
        self.remove_triangle(vi0, ti0);
        self.remove_triangle(vi0, ti1);

        let mut moved = std::mem::take(&mut self.moved);
        moved.clear();
        moved.extend(self.surviving(&self.v_infos[vi1], ti0, ti1));
        self.v_infos[vi1].count = 0;

        let e_len = self.e_infos.len() as u32;
        let plan = plan_shift(&mut self.v_infos, vi0, moved.len() as u32, e_len);
        for window in plan.iter().rev() {
            window.apply(&mut self.e_infos);
        }

        let v_info0 = &mut self.v_infos[vi0];
        let end = (v_info0.start + v_info0.count) as usize;
        self.e_infos[end..end + moved.len()].copy_from_slice(&moved);
        v_info0.count += moved.len() as u32;
        self.moved = moved;
    }

    /// Arena self-check: every live vertex counts exactly the live triangles
    /// that reference it and live ranges do not overlap.
    pub fn check_neighbors(&self, indices: &[[u32; 3]]) -> bool {
        let mut counts = vec![0u32; self.v_infos.len()];
        for (t, t_info) in indices.iter().zip(&self.t_infos) {
            if t_info.is_deleted() {
                continue;
            }
            for &vi in t {
                counts[vi as usize] += 1;
            }
        }

        let mut prev_end = 0;
        for (vi, (v_info, &count)) in self.v_infos.iter().zip(&counts).enumerate() {
            if v_info.is_deleted() {
                if count != 0 {
                    return false;
                }
                continue;
            }
            if v_info.count != count || v_info.start < prev_end {
                return false;
            }
            let listed = self.edges(v_info).iter().all(|e| {
                !self.t_infos[e.t_index as usize].is_deleted()
                    && indices[e.t_index as usize][e.edge as usize] as usize == vi
            });
            if !listed {
                return false;
            }
            prev_end = v_info.start + v_info.count;
        }
        prev_end as usize <= self.e_infos.len()
    }

    /// Drop deleted vertices and triangles from `its` and renumber the rest.
    pub fn compact(&self, its: &mut IndexedTriangleSet) {
        let mut remap = vec![u32::MAX; self.v_infos.len()];
        let mut vi_new = 0usize;
        for (vi, v_info) in self.v_infos.iter().enumerate() {
            if v_info.is_deleted() {
                continue;
            }
            remap[vi] = vi_new as u32;
            its.vertices[vi_new] = its.vertices[vi];
            vi_new += 1;
        }
        its.vertices.truncate(vi_new);

        let mut ti_new = 0usize;
        for ti in 0..self.t_infos.len() {
            if self.t_infos[ti].is_deleted() {
                continue;
            }
            its.indices[ti_new] = its.indices[ti].map(|vi| remap[vi as usize]);
            ti_new += 1;
        }
        its.indices.truncate(ti_new);
    }
}

/// True if the triangle `(vn, v1, v2)` is a sliver or its normal turned away
/// from `normal` by more than about 78 degrees.
pub fn is_flipped(vn: &Point3<f32>, v1: &Point3<f32>, v2: &Point3<f32>, normal: &Vector3<f32>) -> bool {
    const THR_POS: f32 = 1.0 - f32::EPSILON;
    const DOT_THR: f32 = 0.2;

    let (Some(d1), Some(d2)) = ((v1 - vn).try_normalize(0.0), (v2 - vn).try_normalize(0.0)) else {
        return true;
    };
    let dot = d1.dot(&d2);
    if !(-THR_POS..=THR_POS).contains(&dot) {
        return true;
    }
    d1.cross(&d2)
        .try_normalize(0.0)
        .map_or(true, |n| n.dot(normal) < DOT_THR)
}
