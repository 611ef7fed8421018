use structura_core::{validate_name, Diagnostic, StructuraResult};
use structura_engine::{Action, ActionPlan};
use structura_storage::DataGraph;

use crate::filter::{Filter, FilterId, PlanOutcome};
use crate::parameters::{Arguments, Parameter, Parameters};

/// Warning code for a rename that replaces an existing sibling
pub const RENAME_OVERWRITES: i32 = 20;

/// Renames one object in place
#[derive(Debug, Clone, Copy, Default)]
pub struct RenameDataObject;

impl RenameDataObject {
    fn build(&self, graph: &DataGraph, args: &Arguments, outcome: &mut PlanOutcome) -> StructuraResult<ActionPlan> {
        let path = args.path("path")?.clone();
        let new_name = args.string("new_name")?.to_string();
        let allow_overwrite = args.bool("allow_overwrite")?;
        validate_name(&new_name)?;

        let target = path.with_name(&new_name)?;
        if allow_overwrite && target != path && graph.contains(&target) {
            outcome.push_warning(Diagnostic::new(
                RENAME_OVERWRITES,
                format!("{} will be replaced", target),
            ));
        }
        outcome.push_preview("New Path", &target);
        Ok(ActionPlan::from(vec![Action::Rename {
            path,
            new_name,
            allow_overwrite,
        }]))
    }
}

impl Filter for RenameDataObject {
    fn name(&self) -> &'static str {
        "rename_data_object"
    }

    fn uuid(&self) -> FilterId {
        FilterId::from_u128(0x911b4a3f_6c2e_47a1_8d5b_0e3f7a9c4d07)
    }

    fn human_name(&self) -> &'static str {
        "Rename Data Object"
    }

    fn parameters(&self) -> Parameters {
        let mut params = Parameters::new();
        params.insert(Parameter::data_path("path", "Object to Rename", &[]));
        params.insert(Parameter::string("new_name", "New Name", ""));
        params.insert(Parameter::bool("allow_overwrite", "Allow Overwrite", false));
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
