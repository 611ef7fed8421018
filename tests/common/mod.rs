//! Shared test utilities for the end-to-end suites.
//!
//! Import via `mod common;` from any test's main.rs.

#![allow(dead_code)]

use std::sync::Once;

use structura::{DataPath, Preferences, RunEnvironment};

static INIT_TRACING: Once = Once::new();

/// Route `tracing` output through the test harness once per binary.
///
/// Set `RUST_LOG=structura=debug` to see it.
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Parse a path literal.
pub fn path(text: &str) -> DataPath {
    DataPath::parse(text).unwrap()
}

/// Environment with parallelism forced on at a small grain.
pub fn parallel_env() -> RunEnvironment {
    let preferences = Preferences {
        parallel: true,
        worker_threads: Some(4),
        min_grain: 32,
        max_pending_tasks: 8,
        available_memory: Some(u64::MAX),
        ..Preferences::default()
    };
    RunEnvironment::new(&preferences)
}
