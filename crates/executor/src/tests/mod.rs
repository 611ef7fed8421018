//! Test modules for the executor crate.

pub mod cancellation;
pub mod pipeline;

use std::sync::Arc;

use parking_lot::Mutex;
use structura_core::{DataPath, Outcome, StructuraError};
use structura_engine::{Action, ActionPlan};
use structura_storage::DataGraph;

use crate::filter::{ExecutionContext, Filter, FilterId, PlanOutcome};
use crate::parameters::{Arguments, Parameter, Parameters};
use crate::pipeline::{NodeReport, PipelineObserver, PipelineReport};

pub(crate) fn path(text: &str) -> DataPath {
    DataPath::parse(text).unwrap()
}

/// Plans one `CreateGroup` at its `path` argument and optionally fails in `run`
#[derive(Debug, Default)]
pub(crate) struct GroupStep {
    pub fail_run: bool,
    pub cancel_in_run: bool,
}

impl Filter for GroupStep {
    fn name(&self) -> &'static str {
        "group_step"
    }

    fn uuid(&self) -> FilterId {
        FilterId::from_u128(0xfeed)
    }

    fn human_name(&self) -> &'static str {
        "Group Step"
    }

    fn parameters(&self) -> Parameters {
        let mut params = Parameters::new();
        params.insert(Parameter::created_path("path", "Group"));
        params
    }

    fn plan(&self, _graph: &DataGraph, args: &Arguments) -> PlanOutcome {
        match args.path("path") {
            Ok(path) => PlanOutcome::from_plan(ActionPlan::from(vec![Action::CreateGroup { path: path.clone() }])),
            Err(e) => PlanOutcome::error(e),
        }
    }

    fn run(&self, _graph: &mut DataGraph, _args: &Arguments, ctx: &ExecutionContext<'_>) -> Outcome<()> {
        if self.cancel_in_run {
            ctx.cancel_token().cancel();
        }
        if self.fail_run {
            return Outcome::error(StructuraError::internal("group step failure"));
        }
        ctx.info("group step ran");
        Outcome::ok(())
    }
}

pub(crate) fn group_step(group: &str) -> (Box<dyn Filter>, Arguments) {
    (Box::new(GroupStep::default()), Arguments::new().with("path", path(group)))
}

/// Observer recording every callback
#[derive(Debug, Default)]
pub(crate) struct Recorder {
    pub started: Mutex<Vec<(Vec<usize>, String)>>,
    pub finished: Mutex<Vec<NodeReport>>,
    pub reports: Mutex<Vec<PipelineReport>>,
}

impl PipelineObserver for Recorder {
    fn node_started(&self, index: &[usize], name: &str) {
        self.started.lock().push((index.to_vec(), name.to_string()));
    }

    fn node_finished(&self, report: &NodeReport) {
        self.finished.lock().push(report.clone());
    }

    fn pipeline_finished(&self, report: &PipelineReport) {
        self.reports.lock().push(report.clone());
    }
}

pub(crate) fn recorder() -> Arc<Recorder> {
    Arc::new(Recorder::default())
}
