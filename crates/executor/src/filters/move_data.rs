use structura_core::{Diagnostic, StructuraError, StructuraResult};
use structura_engine::{Action, ActionPlan};
use structura_storage::DataGraph;

use crate::filter::{Filter, FilterId, PlanOutcome};
use crate::filters::CONTAINERS;
use crate::parameters::{Arguments, Parameter, Parameters};

/// Warning code for a source already living directly under the new parent
pub const MOVE_IS_NOOP: i32 = 21;

/// Reparents objects, keeping their names
#[derive(Debug, Clone, Copy, Default)]
pub struct MoveData;

impl MoveData {
    fn build(&self, graph: &DataGraph, args: &Arguments, outcome: &mut PlanOutcome) -> StructuraResult<ActionPlan> {
        let sources = args.path_list("sources")?;
        let new_parent = args.path("new_parent")?;
        if sources.is_empty() {
            return Err(StructuraError::invalid_parameter("sources", "nothing selected to move"));
        }

        let mut plan = ActionPlan::new();
        for source in sources {
            if new_parent.starts_with(source) {
                return Err(StructuraError::CyclicMove {
                    path: source.clone(),
                    target: new_parent.clone(),
                });
            }
            if source.parent().as_ref() == Some(new_parent) {
                outcome.push_warning(Diagnostic::new(
                    MOVE_IS_NOOP,
                    format!("{} is already under {}", source, new_parent),
                ));
                continue;
            }
            let name = source
                .name()
                .ok_or_else(|| StructuraError::invalid_parameter("sources", "empty path"))?;
            let target = new_parent.join(name)?;
            if graph.contains(&target) {
                return Err(StructuraError::NameConflict {
                    parent: new_parent.clone(),
                    name: name.to_string(),
                });
            }
            outcome.push_preview("Moved To", &target);
            plan.push(Action::Move {
                path: source.clone(),
                new_parent: new_parent.clone(),
            });
        }
        Ok(plan)
    }
}

impl Filter for MoveData {
    fn name(&self) -> &'static str {
        "move_data"
    }

    fn uuid(&self) -> FilterId {
        FilterId::from_u128(0x2d9f4b16_7e03_4a8c_b1f5_6c0e9a3d2b08)
    }

    fn human_name(&self) -> &'static str {
        "Move Data"
    }

    fn parameters(&self) -> Parameters {
        let mut params = Parameters::new();
        params.insert(Parameter::path_list("sources", "Objects to Move", &[]));
        params.insert(Parameter::data_path("new_parent", "New Parent", CONTAINERS));
        params
    }

    fn plan(&self, graph: &DataGraph, args: &Arguments) -> PlanOutcome {
        let mut outcome = PlanOutcome::default();
        match self.build(graph, args, &mut outcome) {
            Ok(plan) => outcome.plan = plan,
            Err(e) => outcome.push_error(e),
        }
        outcome
    }
}
