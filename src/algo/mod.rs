//! Mesh processing algorithms.
//!
//! - **Decimation**: quadric-error edge collapse ([`decimate`])
//! - **Progress**: progress reporting and cancellation shared by
//!   long-running algorithms ([`progress`])

pub mod decimate;
pub mod progress;

pub use progress::{Cancellation, Progress};
