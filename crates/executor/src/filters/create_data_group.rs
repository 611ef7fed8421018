use structura_engine::{Action, ActionPlan};
use structura_storage::DataGraph;

use crate::filter::{Filter, FilterId, PlanOutcome};
use crate::parameters::{Arguments, Parameter, Parameters};

/// Creates an empty group
#[derive(Debug, Clone, Copy, Default)]
pub struct CreateDataGroup;

impl Filter for CreateDataGroup {
    fn name(&self) -> &'static str {
        "create_data_group"
    }

    fn uuid(&self) -> FilterId {
        FilterId::from_u128(0xe7d2f9b1_8f0a_4d4c_9c11_2b6a0c3e5d01)
    }

    fn human_name(&self) -> &'static str {
        "Create Data Group"
    }

    fn parameters(&self) -> Parameters {
        let mut params = Parameters::new();
        params.insert(Parameter::created_path("path", "Group Path"));
        params
    }

    fn plan(&self, _graph: &DataGraph, args: &Arguments) -> PlanOutcome {
        args.path("path")
            .map(|path| ActionPlan::from(vec![Action::CreateGroup { path: path.clone() }]))
            .into()
    }
}
