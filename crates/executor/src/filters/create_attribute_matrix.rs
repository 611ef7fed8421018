use structura_core::Shape;
use structura_engine::{Action, ActionPlan};
use structura_storage::DataGraph;

use crate::filter::{Filter, FilterId, PlanOutcome};
use crate::parameters::{Arguments, Parameter, Parameters};

/// Creates an attribute matrix with a fixed tuple shape
#[derive(Debug, Clone, Copy, Default)]
pub struct CreateAttributeMatrix;

impl Filter for CreateAttributeMatrix {
    fn name(&self) -> &'static str {
        "create_attribute_matrix"
    }

    fn uuid(&self) -> FilterId {
        FilterId::from_u128(0x3a1c6d4e_2b7f_4e58_a0d9_71c4e2f8b602)
    }

    fn human_name(&self) -> &'static str {
        "Create Attribute Matrix"
    }

    fn parameters(&self) -> Parameters {
        let mut params = Parameters::new();
        params.insert(Parameter::created_path("path", "Attribute Matrix Path"));
        params.insert(Parameter::shape("tuple_shape", "Tuple Shape", Shape::scalar(1)));
        params
    }

    fn plan(&self, _graph: &DataGraph, args: &Arguments) -> PlanOutcome {
        let action = args.path("path").and_then(|path| {
            Ok(Action::CreateAttributeMatrix {
                path: path.clone(),
                tuple_shape: args.shape("tuple_shape")?.clone(),
            })
        });
        let mut outcome: PlanOutcome = action.map(|a| ActionPlan::from(vec![a])).into();
        if let Ok(shape) = args.shape("tuple_shape") {
            outcome.push_preview("Tuples", shape.num_elements());
        }
        outcome
    }
}
