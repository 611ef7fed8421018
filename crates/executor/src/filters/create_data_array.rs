//! Numeric array creation with an optional initial value
//!
//! When the new array's parent is an attribute matrix the matrix's tuple
//! shape wins over the `tuple_shape` argument. The fill value is text so one
//! parameter serves every element type; it must be exactly representable in
//! the chosen type (integers: no fraction, in range; `bool`: `true`, `false`,
//! `0` or `1`).

use structura_core::{dispatch_data_type, DataPath, DataType, Element, Outcome, Shape, StructuraError, StructuraResult};
use structura_engine::{Action, ActionPlan};
use structura_storage::{DataGraph, ObjectType};

use crate::filter::{ExecutionContext, Filter, FilterId, PlanOutcome};
use crate::parameters::{Arguments, Parameter, Parameters};

/// Creates a numeric array, optionally filled with a constant
#[derive(Debug, Clone, Copy, Default)]
pub struct CreateDataArray;

/// Parse `text` as a value of `data_type`, returned widened to `f64`
pub fn parse_fill_value(text: &str, data_type: DataType) -> StructuraResult<f64> {
    let reject = |reason: String| StructuraError::invalid_parameter("fill_value", reason);
    let text = text.trim();
    if data_type == DataType::Boolean {
        return match text {
            "true" | "1" => Ok(1.0),
            "false" | "0" => Ok(0.0),
            other => Err(reject(format!("'{}' is not a boolean", other))),
        };
    }
    let value: f64 = text
        .parse()
        .map_err(|_| reject(format!("'{}' is not a number", text)))?;
    if data_type.is_float() {
        if data_type == DataType::Float32 && value.is_finite() && value.abs() > f32::MAX as f64 {
            return Err(reject(format!("{} does not fit in {}", value, data_type)));
        }
        return Ok(value);
    }
    let fits = dispatch_data_type!(data_type, T => T::from_f64(value).to_f64() == value);
    if fits {
        Ok(value)
    } else {
        Err(reject(format!("{} is not a valid {} value", text, data_type)))
    }
}

fn target_shape(graph: &DataGraph, path: &DataPath, requested: &Shape) -> Shape {
    path.parent()
        .and_then(|parent| graph.attribute_matrix_shape(&parent).ok().cloned())
        .unwrap_or_else(|| requested.clone())
}

fn fill<T: Element>(graph: &mut DataGraph, path: &DataPath, value: f64, ctx: &ExecutionContext<'_>) -> StructuraResult<()> {
    let value = T::from_f64(value);
    let array = graph.array_mut::<T>(path)?;
    let width = array.store().num_components();
    let store = array.store_mut();
    match store.as_mut_slice() {
        Some(values) => {
            ctx.parallel().execute_mut(values, width, |_, chunk| chunk.fill(value));
            Ok(())
        }
        None => store.fill(value),
    }
}

impl CreateDataArray {
    fn build(&self, graph: &DataGraph, args: &Arguments, outcome: &mut PlanOutcome) -> StructuraResult<ActionPlan> {
        let path = args.path("path")?.clone();
        let data_type = args.data_type("data_type")?;
        let component_shape = args.shape("component_shape")?.clone();
        let tuple_shape = target_shape(graph, &path, args.shape("tuple_shape")?);
        if args.bool("initialize")? {
            let value = parse_fill_value(args.string("fill_value")?, data_type)?;
            outcome.push_preview("Fill Value", value);
        }

        outcome.push_preview("Data Type", data_type);
        outcome.push_preview("Tuple Shape", &tuple_shape);
        outcome.push_preview("Component Shape", &component_shape);
        Ok(ActionPlan::from(vec![Action::CreateArray {
            path,
            data_type,
            tuple_shape,
            component_shape,
        }]))
    }
}

impl Filter for CreateDataArray {
    fn name(&self) -> &'static str {
        "create_data_array"
    }

    fn uuid(&self) -> FilterId {
        FilterId::from_u128(0x67a4c8f2_d153_4b0e_9f6a_5c2d8e1b7a03)
    }

    fn human_name(&self) -> &'static str {
        "Create Data Array"
    }

    fn parameters(&self) -> Parameters {
        let mut params = Parameters::new();
        params.insert(Parameter::created_path("path", "Created Array"));
        params.insert(Parameter::data_type("data_type", "Data Type", DataType::Float32));
        params.insert(Parameter::shape("component_shape", "Component Shape", Shape::scalar(1)));
        params.insert(Parameter::shape("tuple_shape", "Tuple Shape", Shape::scalar(1)));
        params.insert(Parameter::bool("initialize", "Initialize", false));
        params.insert(Parameter::string("fill_value", "Fill Value", "0"));
        params.link("initialize", true, "fill_value");
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

    fn run(&self, graph: &mut DataGraph, args: &Arguments, ctx: &ExecutionContext<'_>) -> Outcome<()> {
        initialize(graph, args, ctx).into()
    }
}

fn initialize(graph: &mut DataGraph, args: &Arguments, ctx: &ExecutionContext<'_>) -> StructuraResult<()> {
    if !args.bool("initialize")? || ctx.is_cancelled() {
        return Ok(());
    }
    let path = args.path("path")?;
    let data_type = args.data_type("data_type")?;
    let value = parse_fill_value(args.string("fill_value")?, data_type)?;
    // Allocation already zeroed the array.
    if value == 0.0 {
        return Ok(());
    }
    if graph.resolve(path)?.object_type() != ObjectType::DataArray {
        return Err(StructuraError::invalid_operation(format!("{} is not a data array", path)));
    }
    dispatch_data_type!(data_type, T => fill::<T>(graph, path, value, ctx))?;
    ctx.info(format!("Filled {} with {}", path, value));
    Ok(())
}
