//! Progress reporting and cancellation for long-running algorithms.
//!
//! Algorithms receive a [`Progress`] to report a completion percentage and
//! a [`Cancellation`] they poll at a bounded interval.
//!
//! # Example
//!
//! ```
//! use std::sync::atomic::AtomicBool;
//! use std::sync::Arc;
//! use meshslim::algo::{Cancellation, Progress};
//!
//! let progress = Progress::new(|percent| println!("{percent}%"));
//! progress.report(0);
//! progress.report(100);
//!
//! let stop = Arc::new(AtomicBool::new(false));
//! let cancel = Cancellation::from_flag(stop.clone());
//! assert!(cancel.check().is_ok());
//! stop.store(true, std::sync::atomic::Ordering::Relaxed);
//! assert!(cancel.check().is_err());
//! ```

use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::Arc;

use crate::error::{MeshError, Result};

/// A progress callback that receives a completion percentage.
///
/// Reports are clamped to `[0, 100]` and never go backwards: a value lower
/// than one already reported is dropped, so the callback always observes a
/// non-decreasing sequence.
pub struct Progress {
    callback: Box<dyn Fn(i32) + Send + Sync>,
    last: AtomicI32,
}

impl Progress {
    /// Create a new progress reporter with the given callback.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(i32) + Send + Sync + 'static,
    {
        Self {
            callback: Box::new(callback),
            last: AtomicI32::new(-1),
        }
    }

    /// Report progress in percent.
    #[inline]
    pub fn report(&self, percent: i32) {
        let percent = percent.clamp(0, 100);
        let previous = self.last.fetch_max(percent, Ordering::Relaxed);
        if percent >= previous {
            (self.callback)(percent);
        }
    }

    /// Report progress within a sub-range.
    ///
    /// Maps `current / total` onto `[range_start, range_end]` percent. This
    /// lets a phase of an algorithm report into the slice it was allocated.
    ///
    /// ```
    /// use meshslim::algo::Progress;
    ///
    /// // Initialisation owns the first 10 percent.
    /// let progress = Progress::none();
    /// progress.report_sub(3, 4, 0, 10);
    /// ```
    #[inline]
    pub fn report_sub(&self, current: usize, total: usize, range_start: i32, range_end: i32) {
        if total == 0 {
            return;
        }
        let fraction = current.min(total) as f64 / total as f64;
        let span = f64::from(range_end - range_start);
        self.report(range_start + (fraction * span) as i32);
    }

    /// The highest percentage reported so far, if any.
    pub fn last_reported(&self) -> Option<i32> {
        let last = self.last.load(Ordering::Relaxed);
        (last >= 0).then_some(last)
    }

    /// Create a no-op progress reporter that discards all updates.
    pub fn none() -> Self {
        Self::new(|_| {})
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::none()
    }
}

impl std::fmt::Debug for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Progress")
            .field("last", &self.last_reported())
            .finish_non_exhaustive()
    }
}

/// A cancellation poll supplied by the caller.
///
/// The callback returns [`ControlFlow::Break`] to abort the running
/// operation, which then returns [`MeshError::Cancelled`].
pub struct Cancellation {
    poll: Box<dyn Fn() -> ControlFlow<()> + Send + Sync>,
}

impl Cancellation {
    /// Create a cancellation from a poll callback.
    pub fn new<F>(poll: F) -> Self
    where
        F: Fn() -> ControlFlow<()> + Send + Sync + 'static,
    {
        Self {
            poll: Box::new(poll),
        }
    }

    /// Cancel once `flag` is set.
    pub fn from_flag(flag: Arc<AtomicBool>) -> Self {
        Self::new(move || {
            if flag.load(Ordering::Relaxed) {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        })
    }

    /// Never cancel.
    pub fn none() -> Self {
        Self::new(|| ControlFlow::Continue(()))
    }

    /// Poll the callback.
    ///
    /// # Errors
    /// Returns [`MeshError::Cancelled`] if the callback asked to abort.
    #[inline]
    pub fn check(&self) -> Result<()> {
        match (self.poll)() {
            ControlFlow::Continue(()) => Ok(()),
            ControlFlow::Break(()) => Err(MeshError::Cancelled),
        }
    }
}

impl Default for Cancellation {
    fn default() -> Self {
        Self::none()
    }
}

impl std::fmt::Debug for Cancellation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cancellation").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    fn recording() -> (Progress, Arc<Mutex<Vec<i32>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let progress = Progress::new(move |p| sink.lock().unwrap().push(p));
        (progress, seen)
    }

    #[test]
    fn test_progress_is_monotonic_and_clamped() {
        let (progress, seen) = recording();
        progress.report(-5);
        progress.report(40);
        progress.report(30);
        progress.report(40);
        progress.report(250);
        assert_eq!(*seen.lock().unwrap(), vec![0, 40, 40, 100]);
        assert_eq!(progress.last_reported(), Some(100));
    }

    #[test]
    fn test_report_sub() {
        let (progress, seen) = recording();
        progress.report_sub(0, 4, 0, 10);
        progress.report_sub(2, 4, 0, 10);
        progress.report_sub(1, 2, 10, 100);
        progress.report_sub(1, 0, 10, 100);
        assert_eq!(*seen.lock().unwrap(), vec![0, 5, 55]);
    }

    #[test]
    fn test_none_reports_nothing_observable() {
        let progress = Progress::none();
        assert_eq!(progress.last_reported(), None);
        progress.report(10);
        assert_eq!(progress.last_reported(), Some(10));
    }

    #[test]
    fn test_cancellation_after_n_polls() {
        let polls = Arc::new(AtomicUsize::new(0));
        let counter = polls.clone();
        let cancel = Cancellation::new(move || {
            if counter.fetch_add(1, Ordering::Relaxed) >= 2 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });
        assert!(cancel.check().is_ok());
        assert!(cancel.check().is_ok());
        assert!(matches!(cancel.check(), Err(MeshError::Cancelled)));
    }

    #[test]
    fn test_cancellation_none() {
        assert!(Cancellation::default().check().is_ok());
    }
}
