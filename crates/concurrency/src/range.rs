//! Parallel for over N-dimensional index ranges
//!
//! An [`IndexRange`] is a slab of an N-d grid: the full extent of every inner
//! dimension and a sub-range of the outermost (slowest-varying) one. Slabs
//! of a row-major grid are contiguous in flat index space, so every slab maps
//! to one contiguous run of output elements.
//!
//! [`ParallelRange`] splits a range into slabs and runs a body per slab on a
//! rayon pool. Ranges smaller than `min_grain` elements, single-row ranges
//! and disabled configurations run the body once, inline.

use rayon::prelude::*;
use smallvec::SmallVec;
use std::fmt;
use std::ops::Range;
use std::sync::Arc;
use structura_core::Shape;
use tracing::{debug, warn};

use crate::config::ParallelConfig;

/// Slab of an N-d grid, dimensions ordered slowest first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexRange {
    dims: SmallVec<[usize; 4]>,
    outer: Range<usize>,
}

impl IndexRange {
    /// The whole grid described by `shape`
    pub fn new(shape: &Shape) -> Self {
        let mut dims: SmallVec<[usize; 4]> = SmallVec::from_slice(shape.dims());
        if dims.is_empty() {
            dims.push(1);
        }
        let outer = 0..dims[0];
        Self { dims, outer }
    }

    /// One-dimensional range `0..len`
    pub fn linear(len: usize) -> Self {
        Self::new(&Shape::scalar(len))
    }

    /// Full grid extents
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Covered rows of the outermost dimension
    pub fn outer(&self) -> Range<usize> {
        self.outer.clone()
    }

    /// Elements per outermost row
    pub fn inner_len(&self) -> usize {
        self.dims[1..].iter().product()
    }

    /// Elements covered
    pub fn len(&self) -> usize {
        self.outer.len() * self.inner_len()
    }

    /// True if no element is covered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Covered flat (row-major) indices of the full grid
    pub fn flat_range(&self) -> Range<usize> {
        let inner = self.inner_len();
        self.outer.start * inner..self.outer.end * inner
    }

    /// N-d coordinate of flat index `flat`
    pub fn coords(&self, flat: usize) -> SmallVec<[usize; 4]> {
        let mut coords: SmallVec<[usize; 4]> = SmallVec::from_elem(0, self.dims.len());
        let mut rest = flat;
        for (axis, extent) in self.dims.iter().enumerate().rev() {
            let extent = (*extent).max(1);
            coords[axis] = rest % extent;
            rest /= extent;
        }
        coords
    }

    /// Split the outermost dimension into at most `parts` non-empty slabs
    pub fn split_outer(&self, parts: usize) -> Vec<IndexRange> {
        let rows = self.outer.len();
        let parts = parts.clamp(1, rows.max(1));
        let base = rows / parts;
        let extra = rows % parts;
        let mut out = Vec::with_capacity(parts);
        let mut start = self.outer.start;
        for part in 0..parts {
            let size = base + usize::from(part < extra);
            if size == 0 {
                continue;
            }
            out.push(IndexRange {
                dims: self.dims.clone(),
                outer: start..start + size,
            });
            start += size;
        }
        out
    }
}

/// Parallel-for executor over [`IndexRange`]s and output slices
#[derive(Clone)]
pub struct ParallelRange {
    config: ParallelConfig,
    pool: Option<Arc<rayon::ThreadPool>>,
}

impl fmt::Debug for ParallelRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParallelRange")
            .field("config", &self.config)
            .field("dedicated_pool", &self.pool.is_some())
            .finish()
    }
}

impl ParallelRange {
    /// Executor for `config`
    ///
    /// An explicit `worker_threads` gets a dedicated pool; otherwise the
    /// global rayon pool is used. If the pool cannot be built the global
    /// pool is used instead.
    pub fn new(config: ParallelConfig) -> Self {
        let pool = match (config.enabled, config.worker_threads) {
            (true, Some(threads)) => {
                match rayon::ThreadPoolBuilder::new()
                    .num_threads(threads.max(1))
                    .thread_name(|i| format!("structura-par-{}", i))
                    .build()
                {
                    Ok(pool) => Some(Arc::new(pool)),
                    Err(e) => {
                        warn!(target: "structura::parallel", error = %e, "Falling back to the global thread pool");
                        None
                    }
                }
            }
            _ => None,
        };
        Self { config, pool }
    }

    /// Executor that always runs inline
    pub fn sequential() -> Self {
        Self::new(ParallelConfig::sequential())
    }

    /// Settings in effect
    pub fn config(&self) -> &ParallelConfig {
        &self.config
    }

    fn install<R: Send>(&self, op: impl FnOnce() -> R + Send) -> R {
        match &self.pool {
            Some(pool) => pool.install(op),
            None => op(),
        }
    }

    fn threads(&self) -> usize {
        match &self.pool {
            Some(pool) => pool.current_num_threads(),
            None => rayon::current_num_threads(),
        }
    }

    /// Number of slabs to cut `rows` outer rows holding `elements` into
    fn slab_count(&self, rows: usize, elements: usize) -> usize {
        if !self.config.enabled || rows < 2 || elements < self.config.min_grain {
            return 1;
        }
        let by_grain = elements / self.config.min_grain.max(1);
        (self.threads() * 4).min(by_grain).min(rows).max(1)
    }

    /// Run `body` over `range`, possibly as several concurrent slabs
    ///
    /// `body` may read shared state but must only write locations implied by
    /// the slab it receives.
    pub fn execute<F>(&self, range: IndexRange, body: F)
    where
        F: Fn(IndexRange) + Sync + Send,
    {
        let parts = self.slab_count(range.outer().len(), range.len());
        if parts <= 1 {
            body(range);
            return;
        }
        let slabs = range.split_outer(parts);
        debug!(target: "structura::parallel", slabs = slabs.len(), elements = range.len(), "Splitting index range");
        self.install(|| slabs.into_par_iter().for_each(|slab| body(slab)));
    }

    /// Run `body` over disjoint chunks of `out`
    ///
    /// `out` holds `tuple_width` elements per tuple. Each invocation gets the
    /// tuple range it covers and the matching mutable sub-slice.
    pub fn execute_mut<T, F>(&self, out: &mut [T], tuple_width: usize, body: F)
    where
        T: Send,
        F: Fn(Range<usize>, &mut [T]) + Sync + Send,
    {
        let width = tuple_width.max(1);
        let tuples = out.len() / width;
        let parts = self.slab_count(tuples, out.len());
        if parts <= 1 {
            body(0..tuples, out);
            return;
        }
        let chunk_tuples = (tuples + parts - 1) / parts;
        debug!(target: "structura::parallel", parts, tuples, "Splitting output slice");
        self.install(|| {
            out.par_chunks_mut(chunk_tuples * width)
                .enumerate()
                .for_each(|(i, slice)| {
                    let start = i * chunk_tuples;
                    body(start..start + slice.len() / width, slice)
                })
        });
    }
}
