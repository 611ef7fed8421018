//! Engine preferences via `structura.toml`
//!
//! Preferences decide how much work runs in parallel and where large arrays
//! live. A default `structura.toml` can be written next to a project; edit
//! it and reload to change settings.

use serde::{Deserialize, Serialize};
use std::path::Path;
use structura_concurrency::ParallelConfig;
use structura_core::{StructuraError, StructuraResult};
use structura_storage::OutOfCoreOptions;

/// Preferences file name.
pub const CONFIG_FILE_NAME: &str = "structura.toml";

/// Engine preferences loaded from `structura.toml`.
///
/// # Example
///
/// ```toml
/// parallel = true
/// min_grain = 4096
/// max_pending_tasks = 64
/// large_data_threshold = 2147483648
///
/// [out_of_core]
/// chunk_elements = 65536
/// resident_chunks = 16
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    /// Run numeric kernels and task queues on worker threads.
    #[serde(default = "default_parallel")]
    pub parallel: bool,
    /// Worker thread count; the available parallelism when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_threads: Option<usize>,
    /// Smallest index range (in elements) worth splitting.
    #[serde(default = "default_min_grain")]
    pub min_grain: usize,
    /// Queued plus running tasks allowed before submission blocks.
    #[serde(default = "default_max_pending_tasks")]
    pub max_pending_tasks: usize,
    /// Arrays larger than this many bytes go out of core when a backend is
    /// configured.
    #[serde(default = "default_large_data_threshold")]
    pub large_data_threshold: u64,
    /// Fixed available-memory figure in bytes, replacing the system probe.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_memory: Option<u64>,
    /// Out-of-core backend settings; no out-of-core storage when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub out_of_core: Option<OutOfCoreOptions>,
}

fn default_parallel() -> bool {
    true
}

fn default_min_grain() -> usize {
    4096
}

fn default_max_pending_tasks() -> usize {
    64
}

fn default_large_data_threshold() -> u64 {
    2 * 1024 * 1024 * 1024
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            parallel: default_parallel(),
            worker_threads: None,
            min_grain: default_min_grain(),
            max_pending_tasks: default_max_pending_tasks(),
            large_data_threshold: default_large_data_threshold(),
            available_memory: None,
            out_of_core: None,
        }
    }
}

impl Preferences {
    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` naming the first offending key.
    pub fn validate(&self) -> StructuraResult<()> {
        if self.worker_threads == Some(0) {
            return Err(StructuraError::invalid_parameter(
                "worker_threads",
                "must be at least 1 when set",
            ));
        }
        if self.min_grain == 0 {
            return Err(StructuraError::invalid_parameter("min_grain", "must be at least 1"));
        }
        if self.max_pending_tasks == 0 {
            return Err(StructuraError::invalid_parameter(
                "max_pending_tasks",
                "must be at least 1",
            ));
        }
        if let Some(options) = &self.out_of_core {
            if options.chunk_elements == 0 {
                return Err(StructuraError::invalid_parameter(
                    "out_of_core.chunk_elements",
                    "must be at least 1",
                ));
            }
            if options.resident_chunks == 0 {
                return Err(StructuraError::invalid_parameter(
                    "out_of_core.resident_chunks",
                    "must be at least 1",
                ));
            }
        }
        Ok(())
    }

    /// Parallel execution settings derived from these preferences.
    pub fn parallel_config(&self) -> ParallelConfig {
        ParallelConfig {
            enabled: self.parallel,
            worker_threads: self.worker_threads,
            min_grain: self.min_grain,
            max_pending_tasks: self.max_pending_tasks,
        }
    }

    /// Returns the default preferences file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# Structura preferences
#
# Run numeric kernels and task queues on worker threads (default: true).
# Set to false to run everything on the calling thread.
parallel = true

# Worker thread count (default: available parallelism).
# worker_threads = 8

# Smallest index range, in elements, that is split across workers.
min_grain = 4096

# Queued plus running tasks allowed before submission blocks.
max_pending_tasks = 64

# Arrays above this size in bytes are stored out of core when the
# [out_of_core] section is present (default: 2 GiB).
large_data_threshold = 2147483648

# Fixed available-memory figure in bytes instead of asking the system.
# available_memory = 8589934592

# Out-of-core storage. Uncomment to let large arrays spill to disk.
# [out_of_core]
# chunk_elements = 65536
# resident_chunks = 16
# directory = "/var/tmp/structura"   # optional, system temp dir by default
"#
    }

    /// Read and parse preferences from a file path.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be read and `InvalidParameter` if it
    /// cannot be parsed or holds out-of-range values.
    pub fn from_file(path: &Path) -> StructuraResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let preferences: Preferences = toml::from_str(&content).map_err(|e| {
            StructuraError::invalid_parameter(
                path.display().to_string(),
                format!("failed to parse preferences: {}", e),
            )
        })?;
        preferences.validate()?;
        Ok(preferences)
    }

    /// Write the default preferences file if it does not already exist.
    ///
    /// Returns `Ok(())` whether the file was created or already existed.
    pub fn write_default_if_missing(path: &Path) -> StructuraResult<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml())?;
        }
        Ok(())
    }

    /// Serialize these preferences to TOML and write them to the given path.
    pub fn write_to_file(&self, path: &Path) -> StructuraResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| StructuraError::internal(format!("failed to serialize preferences: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
