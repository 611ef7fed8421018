//! Object removal
//!
//! Deletes are deferred so that filters later in the same plan still see
//! the objects. Selecting both an object and one of its descendants deletes
//! the ancestor once.

use structura_core::{DataPath, Diagnostic, StructuraError, StructuraResult};
use structura_engine::{Action, ActionPlan};
use structura_storage::DataGraph;

use crate::filter::{Filter, FilterId, PlanOutcome};
use crate::parameters::{Arguments, Parameter, Parameters};

/// Warning code for a selection already covered by a selected ancestor
pub const DELETE_COVERED: i32 = 22;

/// Removes objects and everything they own
#[derive(Debug, Clone, Copy, Default)]
pub struct DeleteData;

impl DeleteData {
    fn build(&self, graph: &DataGraph, args: &Arguments, outcome: &mut PlanOutcome) -> StructuraResult<ActionPlan> {
        let paths = args.path_list("paths")?;
        if paths.is_empty() {
            return Err(StructuraError::invalid_parameter("paths", "nothing selected to delete"));
        }

        let mut selected: Vec<&DataPath> = Vec::with_capacity(paths.len());
        for path in paths {
            if let Some(ancestor) = paths.iter().find(|other| path.is_descendant_of(other)) {
                outcome.push_warning(Diagnostic::new(
                    DELETE_COVERED,
                    format!("{} is removed with {}", path, ancestor),
                ));
            } else if !selected.contains(&path) {
                selected.push(path);
            }
        }

        let mut plan = ActionPlan::new();
        for path in selected {
            let removed = graph.descendant_paths(path, |_| true)?.len() + 1;
            outcome.push_preview(format!("Delete {}", path), format!("{} objects", removed));
            plan.push_deferred(Action::Delete { path: path.clone() });
        }
        Ok(plan)
    }
}

impl Filter for DeleteData {
    fn name(&self) -> &'static str {
        "delete_data"
    }

    fn uuid(&self) -> FilterId {
        FilterId::from_u128(0x8c3e7a05_f21b_4d69_9e4a_1b7d5f0c6e09)
    }

    fn human_name(&self) -> &'static str {
        "Delete Data"
    }

    fn parameters(&self) -> Parameters {
        let mut params = Parameters::new();
        params.insert(Parameter::path_list("paths", "Objects to Delete", &[]));
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
