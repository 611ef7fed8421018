//! Parallel execution primitives for Structura
//!
//! This crate provides the two ways filters parallelize work:
//! - ParallelRange: split an N-d index range into slabs along its outermost
//!   dimension and run a body per slab on a rayon pool
//! - ParallelTaskRunner: bounded queue of independent closures (one per
//!   array, typically) drained by a fixed set of scoped worker threads
//!
//! Both fall back to running inline when `ParallelConfig::enabled` is false,
//! so there is a single code path for parallel and sequential builds.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cancel;
pub mod config;
pub mod range;
pub mod task_runner;

pub use cancel::CancellationToken;
pub use config::ParallelConfig;
pub use range::{IndexRange, ParallelRange};
pub use task_runner::{ParallelTaskRunner, TaskRunnerStats};
