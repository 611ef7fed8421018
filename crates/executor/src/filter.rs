//! The filter contract
//!
//! A [`Filter`] is planned, committed, then run:
//!
//! 1. [`Filter::plan`] inspects the graph and returns an [`ActionPlan`]
//!    plus diagnostics. It must not mutate anything.
//! 2. The pipeline applies the plan (placeholders in preflight, real
//!    storage in execute).
//! 3. [`Filter::run`] fills element data through the arrays the plan
//!    created, using the [`ExecutionContext`] for cancellation, messages,
//!    parallelism and the per-run cache.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use structura_concurrency::{CancellationToken, ParallelConfig, ParallelRange};
use structura_core::{Diagnostic, FaultState, Outcome, StructuraError, StructuraResult};
use structura_engine::ActionPlan;
use structura_storage::DataGraph;
use uuid::Uuid;

use crate::cache::ScopedCache;
use crate::message::{Message, MessageHandler, MessageKind};
use crate::parameters::{Arguments, Parameters};

/// Stable identifier of a filter implementation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterId(Uuid);

impl FilterId {
    /// Identifier from a fixed 128-bit value
    pub const fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }

    /// Underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for FilterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for FilterId {
    type Err = StructuraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(FilterId)
            .map_err(|e| StructuraError::invalid_parameter("filter", e.to_string()))
    }
}

/// Named value shown to the user after planning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewValue {
    /// Label
    pub name: String,
    /// Rendered value
    pub value: String,
}

impl PreviewValue {
    /// Create a preview entry
    pub fn new(name: impl Into<String>, value: impl fmt::Display) -> Self {
        Self {
            name: name.into(),
            value: value.to_string(),
        }
    }
}

/// Result of [`Filter::plan`]
///
/// Any error means the plan must not be applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanOutcome {
    /// Mutations to apply
    pub plan: ActionPlan,
    /// Non-fatal diagnostics
    pub warnings: Vec<Diagnostic>,
    /// Fatal diagnostics
    pub errors: Vec<Diagnostic>,
    /// Values to show the user
    pub preview: Vec<PreviewValue>,
}

impl PlanOutcome {
    /// Outcome wrapping `plan` with no diagnostics
    pub fn from_plan(plan: ActionPlan) -> Self {
        Self {
            plan,
            ..Self::default()
        }
    }

    /// Failed outcome with a single error
    pub fn error(diagnostic: impl Into<Diagnostic>) -> Self {
        Self {
            errors: vec![diagnostic.into()],
            ..Self::default()
        }
    }

    /// Record an error
    pub fn push_error(&mut self, diagnostic: impl Into<Diagnostic>) {
        self.errors.push(diagnostic.into());
    }

    /// Record a warning
    pub fn push_warning(&mut self, diagnostic: impl Into<Diagnostic>) {
        self.warnings.push(diagnostic.into());
    }

    /// Add a preview value
    pub fn push_preview(&mut self, name: impl Into<String>, value: impl fmt::Display) {
        self.preview.push(PreviewValue::new(name, value));
    }

    /// True if there are no errors
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// Severity of this outcome
    pub fn fault_state(&self) -> FaultState {
        FaultState::from_counts(self.errors.len(), self.warnings.len())
    }
}

impl From<StructuraResult<ActionPlan>> for PlanOutcome {
    fn from(result: StructuraResult<ActionPlan>) -> Self {
        match result {
            Ok(plan) => PlanOutcome::from_plan(plan),
            Err(e) => PlanOutcome::error(e),
        }
    }
}

/// Everything a running filter may use besides the graph
pub struct ExecutionContext<'a> {
    cancel: &'a CancellationToken,
    messages: &'a dyn MessageHandler,
    parallel: &'a ParallelRange,
    cache: ScopedCache<'a>,
}

impl<'a> ExecutionContext<'a> {
    /// Bundle the run services
    pub fn new(
        cancel: &'a CancellationToken,
        messages: &'a dyn MessageHandler,
        parallel: &'a ParallelRange,
        cache: ScopedCache<'a>,
    ) -> Self {
        Self {
            cancel,
            messages,
            parallel,
            cache,
        }
    }

    /// True once the run has been cancelled
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// The run's cancellation flag, for polling inside kernels
    pub fn cancel_token(&self) -> &CancellationToken {
        self.cancel
    }

    /// Parallel-for executor
    pub fn parallel(&self) -> &ParallelRange {
        self.parallel
    }

    /// Parallelism settings, for building a task runner
    pub fn parallel_config(&self) -> &ParallelConfig {
        self.parallel.config()
    }

    /// This filter's slice of the run cache
    pub fn cache(&self) -> &ScopedCache<'a> {
        &self.cache
    }

    /// Send a message
    pub fn send(&self, kind: MessageKind, text: impl Into<String>) {
        self.messages.handle(Message::new(kind, text));
    }

    /// Send an info message
    pub fn info(&self, text: impl Into<String>) {
        self.send(MessageKind::Info, text);
    }

    /// Send a progress message
    pub fn progress(&self, text: impl Into<String>) {
        self.send(MessageKind::Progress, text);
    }

    /// Send a warning message
    pub fn warning(&self, text: impl Into<String>) {
        self.send(MessageKind::Warning, text);
    }
}

impl fmt::Debug for ExecutionContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("cancelled", &self.is_cancelled())
            .field("parallel", self.parallel)
            .field("cache_scope", &self.cache.scope())
            .finish()
    }
}

/// A pluggable unit of work with a parameter schema and plan/run callbacks
pub trait Filter: Send + Sync {
    /// Stable identifier, used in pipeline documents
    fn name(&self) -> &'static str;

    /// Stable UUID
    fn uuid(&self) -> FilterId;

    /// Label shown to users
    fn human_name(&self) -> &'static str;

    /// Declared inputs
    fn parameters(&self) -> Parameters;

    /// Describe the graph mutations for `args` without applying them
    ///
    /// `args` has already been validated against [`Filter::parameters`].
    fn plan(&self, graph: &DataGraph, args: &Arguments) -> PlanOutcome;

    /// Fill element data after the plan was committed
    ///
    /// When the run is cancelled the filter stops early and returns an
    /// empty success. Filters that only change structure keep the default.
    fn run(&self, graph: &mut DataGraph, args: &Arguments, ctx: &ExecutionContext<'_>) -> Outcome<()> {
        let _ = (graph, args, ctx);
        Outcome::ok(())
    }
}

impl fmt::Debug for dyn Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filter")
            .field("name", &self.name())
            .field("uuid", &self.uuid())
            .finish()
    }
}
