//! Mesh decimation (simplification).
//!
//! This module reduces the number of triangles of an [`IndexedTriangleSet`]
//! while preserving its overall shape as much as possible.
//!
//! # Quadric Error Metrics (QEM)
//!
//! Each vertex carries a quadric: the sum of squared distances to the planes
//! of the triangles it touched in the original mesh. Every triangle proposes
//! its cheapest edge; the globally cheapest proposal is collapsed into the
//! point minimizing the summed quadric, the quadric of the merged vertex is
//! the sum of both, and the costs around it are refreshed. A collapse is
//! skipped if it would open a boundary edge, repeat a vertex in a triangle,
//! fold two triangles onto each other or flip a triangle; the triangle then
//! proposes its next cheapest edge instead.
//!
//! # Example
//!
//! ```
//! use meshslim::algo::decimate::{simplify, SimplifyOptions};
//! use meshslim::mesh::primitives::uv_sphere;
//!
//! let mut mesh = uv_sphere(1.0, 32, 16);
//!
//! // Reduce to 25% of the original triangles
//! let options = SimplifyOptions::with_target_ratio(0.25);
//! let report = simplify(&mut mesh, &options).unwrap();
//!
//! assert_eq!(report.final_triangles, 240);
//! assert_eq!(report.final_triangles, mesh.num_triangles());
//! ```
//!
//! # References
//!
//! - Garland, M. & Heckbert, P. (1997). "Surface Simplification Using Quadric
//!   Error Metrics." SIGGRAPH '97.

mod qem;
mod quadric;
mod topology;

use std::fmt;

use tracing::info;

pub use quadric::Quadric;

use self::qem::{cheaper, quadric_edge_collapse, CollapseParams, TriangleSlots};
use crate::algo::progress::{Cancellation, Progress};
use crate::error::{MeshError, Result};
use crate::mesh::IndexedTriangleSet;
use crate::queue::{MutablePriorityQueue, MutableSkipHeapPriorityQueue};

/// Block size of the skip-heap queue: eight 8-byte candidates per block.
const SKIP_HEAP_BLOCK_SIZE: usize = 8;

/// How many triangles to keep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Target {
    /// Keep at most this many triangles.
    Count(usize),
    /// Keep this fraction (0.0 to 1.0) of the original triangles.
    Ratio(f64),
}

/// Layout of the candidate priority queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QueueLayout {
    /// Flat binary heap.
    Binary,
    /// Block-organised heap touching fewer cache lines per operation.
    #[default]
    SkipHeap,
}

/// Named error budgets, from finest to coarsest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailLevel {
    /// Maximum error `1e-3`.
    ExtraHigh,
    /// Maximum error `1e-2`.
    High,
    /// Maximum error `0.1`.
    Medium,
    /// Maximum error `0.5`.
    Low,
    /// Maximum error `1.0`.
    ExtraLow,
}

impl DetailLevel {
    /// The maximum collapse error of this level.
    pub fn max_error(self) -> f32 {
        match self {
            DetailLevel::ExtraHigh => 1e-3,
            DetailLevel::High => 1e-2,
            DetailLevel::Medium => 0.1,
            DetailLevel::Low => 0.5,
            DetailLevel::ExtraLow => 1.0,
        }
    }
}

/// Options for mesh simplification.
#[derive(Debug, Clone)]
pub struct SimplifyOptions {
    /// How many triangles to keep.
    pub target: Target,

    /// Maximum allowed error for a single edge collapse.
    /// Unlimited if `None`.
    pub max_error: Option<f32>,

    /// Number of loop iterations between two cancellation polls (default: 16).
    pub check_cancel_period: u32,

    /// Whether to compute the initial quadrics in parallel (default: true).
    pub parallel: bool,

    /// Layout of the candidate queue (default: skip heap).
    pub queue: QueueLayout,
}

impl Default for SimplifyOptions {
    fn default() -> Self {
        Self {
            target: Target::Count(0),
            max_error: None,
            check_cancel_period: 16,
            parallel: true,
            queue: QueueLayout::default(),
        }
    }
}

impl SimplifyOptions {
    /// Create options to reduce to a target number of triangles.
    pub fn with_target_triangles(target: usize) -> Self {
        Self {
            target: Target::Count(target),
            ..Self::default()
        }
    }

    /// Create options to reduce to a ratio of the original triangle count.
    pub fn with_target_ratio(ratio: f64) -> Self {
        Self {
            target: Target::Ratio(ratio.clamp(0.0, 1.0)),
            ..Self::default()
        }
    }

    /// Create options that collapse everything cheaper than `level` allows.
    pub fn with_detail_level(level: DetailLevel) -> Self {
        Self {
            target: Target::Count(0),
            max_error: Some(level.max_error()),
            ..Self::default()
        }
    }

    /// Set the maximum error threshold for edge collapses.
    pub fn with_max_error(mut self, max_error: f32) -> Self {
        self.max_error = Some(max_error);
        self
    }

    /// Set how many loop iterations pass between cancellation polls.
    pub fn with_check_cancel_period(mut self, period: u32) -> Self {
        self.check_cancel_period = period;
        self
    }

    /// Set whether to use parallel execution.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Disable parallel execution.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Set the candidate queue layout.
    pub fn with_queue_layout(mut self, queue: QueueLayout) -> Self {
        self.queue = queue;
        self
    }

    /// Compute the target number of triangles given the original count.
    pub fn compute_target(&self, original_triangles: usize) -> usize {
        match self.target {
            Target::Count(target) => target.min(original_triangles),
            Target::Ratio(ratio) => ((original_triangles as f64) * ratio).round() as usize,
        }
    }

    /// Check the options for values no run could honour.
    pub fn validate(&self) -> Result<()> {
        if let Target::Ratio(ratio) = self.target {
            if !(0.0..=1.0).contains(&ratio) {
                return Err(MeshError::invalid_param(
                    "target ratio",
                    ratio,
                    "must be between 0.0 and 1.0",
                ));
            }
        }
        if self.check_cancel_period == 0 {
            return Err(MeshError::invalid_param(
                "check_cancel_period",
                0,
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Why simplification stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The triangle count reached the target.
    TargetReached,
    /// Every remaining candidate costs at least the maximum error.
    ErrorLimit,
    /// No remaining edge can be collapsed.
    QueueExhausted,
    /// Nothing to do: the target was already met or the maximum error was
    /// not positive. The mesh is untouched.
    Skipped,
}

/// Result of mesh simplification.
#[derive(Debug, Clone)]
pub struct SimplifyReport {
    /// Number of triangles in the original mesh.
    pub original_triangles: usize,

    /// Number of triangles in the simplified mesh.
    pub final_triangles: usize,

    /// Number of vertices in the original mesh.
    pub original_vertices: usize,

    /// Number of vertices in the simplified mesh.
    pub final_vertices: usize,

    /// Number of edge collapses performed.
    pub collapses: usize,

    /// Number of edge collapses rejected by the safety checks.
    pub rejected_collapses: usize,

    /// Error of the last collapsed edge (0 if nothing collapsed).
    pub last_collapsed_error: f32,

    /// Why the run stopped.
    pub stop_reason: StopReason,
}

impl SimplifyReport {
    fn skipped(its: &IndexedTriangleSet) -> Self {
        Self {
            original_triangles: its.num_triangles(),
            final_triangles: its.num_triangles(),
            original_vertices: its.num_vertices(),
            final_vertices: its.num_vertices(),
            collapses: 0,
            rejected_collapses: 0,
            last_collapsed_error: 0.0,
            stop_reason: StopReason::Skipped,
        }
    }

    /// Get the reduction ratio (final / original).
    #[must_use]
    pub fn reduction_ratio(&self) -> f64 {
        if self.original_triangles == 0 {
            1.0
        } else {
            self.final_triangles as f64 / self.original_triangles as f64
        }
    }

    /// Get the percentage of triangles removed.
    #[must_use]
    pub fn reduction_percent(&self) -> f64 {
        (1.0 - self.reduction_ratio()) * 100.0
    }

    /// Check if any collapse happened.
    #[must_use]
    pub const fn was_simplified(&self) -> bool {
        self.collapses > 0
    }
}

impl fmt::Display for SimplifyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Simplification: {} → {} triangles ({:.1}% reduction, {} collapses, {} rejected, last error {:.3e}, {:?})",
            self.original_triangles,
            self.final_triangles,
            self.reduction_percent(),
            self.collapses,
            self.rejected_collapses,
            self.last_collapsed_error,
            self.stop_reason
        )
    }
}

/// Simplify `its` in place.
///
/// Same as [`simplify_with_progress`] without progress reporting or
/// cancellation.
pub fn simplify(its: &mut IndexedTriangleSet, options: &SimplifyOptions) -> Result<SimplifyReport> {
    simplify_with_progress(its, options, &Progress::none(), &Cancellation::none())
}

/// Simplify `its` in place by quadric edge collapse.
///
/// A target that is not below the current triangle count, or a maximum
/// error that is not positive, leaves the mesh untouched and returns a
/// report with [`StopReason::Skipped`].
///
/// `progress` receives non-decreasing percentages ending with 100;
/// `cancel` is polled every [`SimplifyOptions::check_cancel_period`]
/// iterations.
///
/// # Errors
/// - [`MeshError::InvalidParameter`] for invalid options.
/// - Mesh validation errors ([`IndexedTriangleSet::validate`]) and
///   [`MeshError::TooManyElements`] if the incidence array would not fit
///   32-bit indexing.
/// - [`MeshError::Cancelled`] if `cancel` aborted the run. The mesh is then
///   partially simplified but valid.
pub fn simplify_with_progress(
    its: &mut IndexedTriangleSet,
    options: &SimplifyOptions,
    progress: &Progress,
    cancel: &Cancellation,
) -> Result<SimplifyReport> {
    options.validate()?;

    let original_triangles = its.num_triangles();
    let original_vertices = its.num_vertices();
    let target = options.compute_target(original_triangles);
    let max_error = options.max_error.unwrap_or(f32::INFINITY);

    if target >= original_triangles || !(max_error > 0.0) {
        return Ok(SimplifyReport::skipped(its));
    }

    its.validate()?;
    if original_triangles > u32::MAX as usize / 3 {
        return Err(MeshError::TooManyElements {
            what: "triangles",
            count: original_triangles,
        });
    }

    info!(
        original = original_triangles,
        target = target,
        max_error = max_error,
        "Starting mesh simplification"
    );

    let params = CollapseParams {
        target,
        max_error,
        error_limited: options.max_error.is_some(),
        check_cancel_period: options.check_cancel_period,
        parallel: options.parallel,
    };
    let slots = TriangleSlots::new(original_triangles);
    let stats = match options.queue {
        QueueLayout::Binary => {
            let queue = MutablePriorityQueue::new(slots, cheaper);
            quadric_edge_collapse(its, &params, queue, progress, cancel)
        }
        QueueLayout::SkipHeap => {
            let queue: MutableSkipHeapPriorityQueue<_, _, _, SKIP_HEAP_BLOCK_SIZE> =
                MutableSkipHeapPriorityQueue::new(slots, cheaper);
            quadric_edge_collapse(its, &params, queue, progress, cancel)
        }
    };
    let stats = match stats {
        Ok(stats) => stats,
        Err(err) => {
            info!(
                triangles = its.num_triangles(),
                "Mesh simplification cancelled"
            );
            return Err(err);
        }
    };

    let report = SimplifyReport {
        original_triangles,
        final_triangles: its.num_triangles(),
        original_vertices,
        final_vertices: its.num_vertices(),
        collapses: stats.collapses,
        rejected_collapses: stats.rejected,
        last_collapsed_error: stats.last_collapsed_error,
        stop_reason: stats.stop_reason,
    };
    info!(
        final_triangles = report.final_triangles,
        collapses = report.collapses,
        stop_reason = ?report.stop_reason,
        "Mesh simplification complete"
    );
    Ok(report)
}
