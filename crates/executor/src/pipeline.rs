//! Ordered filter execution
//!
//! A [`Pipeline`] is a list of nodes, each a bound filter or a nested
//! pipeline. Both entry points walk the nodes depth-first in order:
//!
//! | Step | `preflight` | `execute` |
//! |------|-------------|-----------|
//! | validate arguments + paths | yes | yes |
//! | `Filter::plan` | yes | yes, against the live graph |
//! | apply plan | placeholders | real storage |
//! | `Filter::run` | no | yes |
//!
//! The walk stops after the first node whose fault state is `Errors`, and
//! before the next node once the cancellation token is set. Nothing is
//! rolled back.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use structura_concurrency::{CancellationToken, ParallelRange};
use structura_core::{Diagnostic, FaultState, StructuraError, StructuraResult};
use structura_engine::{ActionMode, Preferences, StorageAllocator};
use structura_storage::DataGraph;
use tracing::{debug, info, warn};

use crate::cache::RunCache;
use crate::filter::{ExecutionContext, Filter, PreviewValue};
use crate::message::{MessageHandler, TracingHandler};
use crate::parameters::Arguments;
use crate::state::FilterState;

/// One entry of a [`Pipeline`]
pub enum PipelineNode {
    /// A filter with its bound arguments
    Filter {
        /// Filter instance
        filter: Box<dyn Filter>,
        /// Bound arguments, validated when the node runs
        args: Arguments,
        /// Disabled nodes are skipped
        enabled: bool,
    },
    /// A sub-pipeline run in place
    Nested {
        /// The sub-pipeline
        pipeline: Pipeline,
        /// Disabled nodes are skipped
        enabled: bool,
    },
}

impl PipelineNode {
    /// Filter name or sub-pipeline name
    pub fn name(&self) -> &str {
        match self {
            PipelineNode::Filter { filter, .. } => filter.name(),
            PipelineNode::Nested { pipeline, .. } => pipeline.name(),
        }
    }

    /// Whether the node takes part in runs
    pub fn is_enabled(&self) -> bool {
        match self {
            PipelineNode::Filter { enabled, .. } | PipelineNode::Nested { enabled, .. } => *enabled,
        }
    }

    fn set_enabled(&mut self, value: bool) {
        match self {
            PipelineNode::Filter { enabled, .. } | PipelineNode::Nested { enabled, .. } => *enabled = value,
        }
    }
}

impl fmt::Debug for PipelineNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineNode::Filter { filter, args, enabled } => f
                .debug_struct("Filter")
                .field("filter", &filter.name())
                .field("args", args)
                .field("enabled", enabled)
                .finish(),
            PipelineNode::Nested { pipeline, enabled } => f
                .debug_struct("Nested")
                .field("pipeline", pipeline)
                .field("enabled", enabled)
                .finish(),
        }
    }
}

/// Receives node and pipeline results as they happen
///
/// Every method has an empty default.
pub trait PipelineObserver: Send + Sync {
    /// A filter node is about to plan
    fn node_started(&self, index: &[usize], name: &str) {
        let _ = (index, name);
    }

    /// A node finished or was skipped
    fn node_finished(&self, report: &NodeReport) {
        let _ = report;
    }

    /// The whole run finished
    fn pipeline_finished(&self, report: &PipelineReport) {
        let _ = report;
    }
}

/// Observer that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl PipelineObserver for NoopObserver {}

/// Result of one node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeReport {
    /// Position, one index per nesting level
    pub index: Vec<usize>,
    /// Filter or sub-pipeline name
    pub name: String,
    /// Final lifecycle state
    pub state: FilterState,
    /// Severity of the diagnostics
    pub fault_state: FaultState,
    /// Fatal diagnostics
    pub errors: Vec<Diagnostic>,
    /// Non-fatal diagnostics
    pub warnings: Vec<Diagnostic>,
    /// Values reported by planning
    pub preview: Vec<PreviewValue>,
    /// True for disabled nodes
    pub skipped: bool,
}

impl NodeReport {
    fn new(index: Vec<usize>, name: &str) -> Self {
        Self {
            index,
            name: name.to_string(),
            state: FilterState::Idle,
            fault_state: FaultState::None,
            errors: Vec::new(),
            warnings: Vec::new(),
            preview: Vec::new(),
            skipped: false,
        }
    }

    fn skipped(index: Vec<usize>, name: &str) -> Self {
        Self {
            skipped: true,
            ..Self::new(index, name)
        }
    }

    fn finish(&mut self, state: FilterState) {
        if let Err(e) = self.state.transition(state) {
            self.errors.push(Diagnostic::from(e));
            self.state = FilterState::Faulted;
        }
        if self.state == FilterState::Faulted && self.errors.is_empty() {
            self.errors.push(Diagnostic::from(StructuraError::internal(format!(
                "{} failed without reporting an error",
                self.name
            ))));
        }
        self.fault_state = FaultState::from_counts(self.errors.len(), self.warnings.len());
    }

    fn advance(&mut self, state: FilterState) -> StructuraResult<()> {
        self.state.transition(state)
    }
}

/// Result of a whole run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    /// Reports of every node reached, in visiting order
    pub nodes: Vec<NodeReport>,
    /// Worst node fault state
    pub fault_state: FaultState,
    /// True if the run stopped because of cancellation
    pub cancelled: bool,
}

impl PipelineReport {
    /// True if no node reported errors
    pub fn is_ok(&self) -> bool {
        self.fault_state != FaultState::Errors
    }

    /// Report of the node at `index`
    pub fn node(&self, index: &[usize]) -> Option<&NodeReport> {
        self.nodes.iter().find(|n| n.index == index)
    }

    /// Every error, paired with the name of the node that raised it
    pub fn errors(&self) -> impl Iterator<Item = (&str, &Diagnostic)> {
        self.nodes
            .iter()
            .flat_map(|n| n.errors.iter().map(move |d| (n.name.as_str(), d)))
    }

    /// Every warning, paired with the name of the node that raised it
    pub fn warnings(&self) -> impl Iterator<Item = (&str, &Diagnostic)> {
        self.nodes
            .iter()
            .flat_map(|n| n.warnings.iter().map(move |d| (n.name.as_str(), d)))
    }
}

/// Services shared by every node of a run
#[derive(Clone)]
pub struct RunEnvironment {
    /// Storage backend policy for execute mode
    pub allocator: StorageAllocator,
    /// Parallel-for executor handed to filters
    pub parallel: ParallelRange,
    /// Cancellation flag for the run
    pub cancel: CancellationToken,
    /// Message sink for running filters
    pub messages: Arc<dyn MessageHandler>,
    /// Progress observer
    pub observer: Arc<dyn PipelineObserver>,
}

impl RunEnvironment {
    /// Environment following `preferences`
    pub fn new(preferences: &Preferences) -> Self {
        Self {
            allocator: StorageAllocator::new(preferences),
            parallel: ParallelRange::new(preferences.parallel_config()),
            cancel: CancellationToken::new(),
            messages: Arc::new(TracingHandler),
            observer: Arc::new(NoopObserver),
        }
    }

    /// Replace the message sink
    pub fn with_messages(mut self, messages: Arc<dyn MessageHandler>) -> Self {
        self.messages = messages;
        self
    }

    /// Replace the observer
    pub fn with_observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Replace the allocator
    pub fn with_allocator(mut self, allocator: StorageAllocator) -> Self {
        self.allocator = allocator;
        self
    }

    /// Replace the parallel executor
    pub fn with_parallel(mut self, parallel: ParallelRange) -> Self {
        self.parallel = parallel;
        self
    }

    /// Use an externally owned cancellation token
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

impl Default for RunEnvironment {
    fn default() -> Self {
        Self {
            allocator: StorageAllocator::unlimited(),
            parallel: ParallelRange::new(Default::default()),
            cancel: CancellationToken::new(),
            messages: Arc::new(TracingHandler),
            observer: Arc::new(NoopObserver),
        }
    }
}

impl fmt::Debug for RunEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunEnvironment")
            .field("allocator", &self.allocator)
            .field("parallel", &self.parallel)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

/// Ordered list of bound filters and sub-pipelines
#[derive(Debug, Default)]
pub struct Pipeline {
    name: String,
    nodes: Vec<PipelineNode>,
}

impl Pipeline {
    /// Empty pipeline
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: Vec::new(),
        }
    }

    /// Pipeline name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Top-level nodes
    pub fn nodes(&self) -> &[PipelineNode] {
        &self.nodes
    }

    /// Number of top-level nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True if there are no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Append an enabled filter node
    pub fn push_filter(&mut self, filter: Box<dyn Filter>, args: Arguments) -> &mut Self {
        self.nodes.push(PipelineNode::Filter {
            filter,
            args,
            enabled: true,
        });
        self
    }

    /// Append an enabled sub-pipeline
    pub fn push_nested(&mut self, pipeline: Pipeline) -> &mut Self {
        self.nodes.push(PipelineNode::Nested {
            pipeline,
            enabled: true,
        });
        self
    }

    /// Append any node
    pub fn push_node(&mut self, node: PipelineNode) -> &mut Self {
        self.nodes.push(node);
        self
    }

    /// Enable or disable the top-level node at `index`
    pub fn set_enabled(&mut self, index: usize, enabled: bool) -> StructuraResult<()> {
        let len = self.nodes.len();
        self.nodes
            .get_mut(index)
            .ok_or(StructuraError::IndexOutOfBounds { index, len })?
            .set_enabled(enabled);
        Ok(())
    }

    /// Validate every node against a structural copy of `graph`
    ///
    /// Returns the copy with every planned change applied as placeholders.
    pub fn preflight(&self, graph: &DataGraph, env: &RunEnvironment) -> (DataGraph, PipelineReport) {
        let mut preview = graph.structural_copy();
        let report = Walk::new(env, ActionMode::Preflight).run(self, &mut preview);
        (preview, report)
    }

    /// Plan, commit and run every node against `graph`
    pub fn execute(&self, graph: &mut DataGraph, env: &RunEnvironment) -> PipelineReport {
        Walk::new(env, ActionMode::Execute).run(self, graph)
    }
}

/// Whether the walk continues after a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

/// Cache scope of one node: its filter name plus its position
fn cache_scope(name: &str, index: &[usize]) -> String {
    let position: Vec<String> = index.iter().map(usize::to_string).collect();
    format!("{}@{}", name, position.join("."))
}

/// State of one run over a pipeline tree
struct Walk<'e> {
    env: &'e RunEnvironment,
    mode: ActionMode,
    cache: RunCache,
    report: PipelineReport,
}

impl<'e> Walk<'e> {
    fn new(env: &'e RunEnvironment, mode: ActionMode) -> Self {
        Self {
            env,
            mode,
            cache: RunCache::new(),
            report: PipelineReport::default(),
        }
    }

    fn run(mut self, pipeline: &Pipeline, graph: &mut DataGraph) -> PipelineReport {
        info!(
            target: "structura::pipeline",
            pipeline = pipeline.name(),
            mode = %self.mode,
            nodes = pipeline.len(),
            "Pipeline started"
        );
        self.walk(pipeline, graph, &[]);
        self.report.fault_state = self
            .report
            .nodes
            .iter()
            .fold(FaultState::None, |acc, n| acc.worst(n.fault_state));
        info!(
            target: "structura::pipeline",
            pipeline = pipeline.name(),
            mode = %self.mode,
            fault_state = ?self.report.fault_state,
            cancelled = self.report.cancelled,
            "Pipeline finished"
        );
        self.env.observer.pipeline_finished(&self.report);
        self.report
    }

    fn walk(&mut self, pipeline: &Pipeline, graph: &mut DataGraph, prefix: &[usize]) -> Flow {
        for (i, node) in pipeline.nodes.iter().enumerate() {
            let mut index = prefix.to_vec();
            index.push(i);

            if self.env.cancel.is_cancelled() {
                self.report.cancelled = true;
                return Flow::Stop;
            }
            if !node.is_enabled() {
                debug!(target: "structura::pipeline", node = node.name(), ?index, "Skipping disabled node");
                self.record(NodeReport::skipped(index, node.name()));
                continue;
            }

            let flow = match node {
                PipelineNode::Nested { pipeline, .. } => self.walk(pipeline, graph, &index),
                PipelineNode::Filter { filter, args, .. } => {
                    let report = self.run_filter(filter.as_ref(), args, graph, index);
                    let flow = match report.state {
                        FilterState::Cancelled => {
                            self.report.cancelled = true;
                            Flow::Stop
                        }
                        _ if report.fault_state == FaultState::Errors => Flow::Stop,
                        _ => Flow::Continue,
                    };
                    self.record(report);
                    flow
                }
            };
            if flow == Flow::Stop {
                return Flow::Stop;
            }
        }
        Flow::Continue
    }

    fn record(&mut self, report: NodeReport) {
        self.env.observer.node_finished(&report);
        self.report.nodes.push(report);
    }

    fn run_filter(&self, filter: &dyn Filter, args: &Arguments, graph: &mut DataGraph, index: Vec<usize>) -> NodeReport {
        let mut node = NodeReport::new(index, filter.name());
        self.env.observer.node_started(&node.index, filter.name());
        if let Err(e) = self.drive(filter, args, graph, &mut node) {
            node.errors.push(Diagnostic::from(e));
            node.finish(FilterState::Faulted);
        }
        match node.fault_state {
            FaultState::Errors => warn!(
                target: "structura::pipeline",
                filter = filter.name(),
                index = ?node.index,
                errors = node.errors.len(),
                first = %node.errors.first().map(|d| d.to_string()).unwrap_or_default(),
                "Node faulted"
            ),
            _ => debug!(
                target: "structura::pipeline",
                filter = filter.name(),
                index = ?node.index,
                state = %node.state,
                warnings = node.warnings.len(),
                "Node finished"
            ),
        }
        node
    }

    /// Move `node` through the filter lifecycle
    ///
    /// Returns `Err` only for lifecycle violations; filter failures are
    /// recorded in `node` and end in `Faulted`.
    fn drive(
        &self,
        filter: &dyn Filter,
        args: &Arguments,
        graph: &mut DataGraph,
        node: &mut NodeReport,
    ) -> StructuraResult<()> {
        node.advance(FilterState::Planning)?;
        let parameters = filter.parameters();
        let (validated, warnings) = parameters.validate(args).into_parts();
        node.warnings.extend(warnings);
        let args = match validated {
            Ok(args) => args,
            Err(errors) => {
                node.errors.extend(errors);
                node.finish(FilterState::Faulted);
                return Ok(());
            }
        };
        let path_errors = parameters.check_paths(graph, &args);
        if !path_errors.is_empty() {
            node.errors.extend(path_errors);
            node.finish(FilterState::Faulted);
            return Ok(());
        }

        let planned = filter.plan(graph, &args);
        node.warnings.extend(planned.warnings);
        node.preview = planned.preview;
        if !planned.errors.is_empty() {
            node.errors.extend(planned.errors);
            node.finish(FilterState::Faulted);
            return Ok(());
        }
        node.advance(FilterState::Planned)?;
        if self.env.cancel.is_cancelled() {
            node.finish(FilterState::Cancelled);
            return Ok(());
        }

        node.advance(FilterState::Committing)?;
        if let Err(e) = planned.plan.apply(graph, self.mode, &self.env.allocator) {
            node.errors.push(Diagnostic::from(e));
            node.finish(FilterState::Faulted);
            return Ok(());
        }
        if self.mode == ActionMode::Preflight {
            node.finish(FilterState::Completed);
            return Ok(());
        }
        if self.env.cancel.is_cancelled() {
            node.finish(FilterState::Cancelled);
            return Ok(());
        }

        node.advance(FilterState::Running)?;
        let ctx = ExecutionContext::new(
            &self.env.cancel,
            self.env.messages.as_ref(),
            &self.env.parallel,
            self.cache.scoped(cache_scope(filter.name(), &node.index)),
        );
        let (result, warnings) = filter.run(graph, &args, &ctx).into_parts();
        node.warnings.extend(warnings);
        let state = match result {
            Err(errors) => {
                node.errors.extend(errors);
                FilterState::Faulted
            }
            Ok(()) if self.env.cancel.is_cancelled() => FilterState::Cancelled,
            Ok(()) => FilterState::Completed,
        };
        node.finish(state);
        Ok(())
    }
}
