//! Runtime switch and sizing for parallel execution

use serde::{Deserialize, Serialize};

/// Parallelism settings shared by [`ParallelRange`](crate::ParallelRange) and
/// [`ParallelTaskRunner`](crate::ParallelTaskRunner)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParallelConfig {
    /// Run on worker threads; when false every body runs inline
    pub enabled: bool,
    /// Worker thread count; `None` uses the available parallelism
    pub worker_threads: Option<usize>,
    /// Smallest range (in elements) worth splitting
    pub min_grain: usize,
    /// Queued plus running tasks allowed before `execute` blocks
    pub max_pending_tasks: usize,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            worker_threads: None,
            min_grain: 4096,
            max_pending_tasks: 64,
        }
    }
}

impl ParallelConfig {
    /// Everything inline
    pub fn sequential() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Effective worker count, at least one
    pub fn thread_count(&self) -> usize {
        self.worker_threads
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(1)
            })
            .max(1)
    }
}
