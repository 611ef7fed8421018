//! Element-wise arithmetic with a constant
//!
//! Values are widened to `f64`, combined with the constant, and narrowed
//! back. Integer results truncate toward zero and saturate at the type's
//! bounds. 64-bit integers do not fit in an `f64` mantissa, so they are
//! combined exactly in `i128` against the constant's binary expansion
//! instead. In-memory arrays are processed in slabs on the parallel range;
//! out-of-core arrays are walked element by element through the chunk cache.

use serde::{Deserialize, Serialize};
use std::fmt;
use structura_core::{
    dispatch_data_type, DataPath, DataType, Diagnostic, Element, Outcome, StructuraError, StructuraResult,
};
use structura_engine::{Action, ActionPlan};
use structura_storage::{ArrayKind, DataGraph, ObjectType};

use crate::filter::{ExecutionContext, Filter, FilterId, PlanOutcome};
use crate::parameters::{Arguments, Parameter, Parameters};

/// Warning code for a floating-point division by zero
pub const DIVIDE_BY_ZERO: i32 = 23;

/// Elements between cancellation checks on the out-of-core path
const CANCEL_POLL: usize = 4096;

/// Operation applied as `element <op> value`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArithmeticOperation {
    /// `element + value`
    Add,
    /// `element - value`
    Subtract,
    /// `element * value`
    Multiply,
    /// `element / value`
    Divide,
}

impl ArithmeticOperation {
    /// Choice labels, in index order
    pub const NAMES: [&'static str; 4] = ["add", "subtract", "multiply", "divide"];

    /// Operation for a choice index
    pub fn from_index(index: usize) -> StructuraResult<Self> {
        match index {
            0 => Ok(Self::Add),
            1 => Ok(Self::Subtract),
            2 => Ok(Self::Multiply),
            3 => Ok(Self::Divide),
            other => Err(StructuraError::invalid_parameter(
                "operation",
                format!("no operation with index {}", other),
            )),
        }
    }

    /// Combine one element with `value`
    #[inline]
    pub fn apply(self, element: f64, value: f64) -> f64 {
        match self {
            Self::Add => element + value,
            Self::Subtract => element - value,
            Self::Multiply => element * value,
            Self::Divide => element / value,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
        }
    }
}

impl fmt::Display for ArithmeticOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(Self::NAMES[*self as usize])
    }
}

/// Adds, subtracts, multiplies or divides a numeric array by a constant
#[derive(Debug, Clone, Copy, Default)]
pub struct ScalarArithmetic;

fn numeric_type(graph: &DataGraph, path: &DataPath) -> StructuraResult<DataType> {
    let array = graph.any_array(path)?;
    match (array.array_kind(), array.data_type()) {
        (ArrayKind::Data, Some(DataType::Boolean)) => Err(StructuraError::TypeMismatch {
            path: path.clone(),
            expected: "numeric array".to_string(),
            actual: DataType::Boolean.to_string(),
        }),
        (ArrayKind::Data, Some(data_type)) => Ok(data_type),
        (kind, _) => Err(StructuraError::TypeMismatch {
            path: path.clone(),
            expected: "numeric array".to_string(),
            actual: format!("{:?}", kind),
        }),
    }
}

/// Path the kernel writes to
fn target(args: &Arguments) -> StructuraResult<&DataPath> {
    if args.bool("create_output")? {
        args.path("output")
    } else {
        args.path("input")
    }
}

impl ScalarArithmetic {
    fn build(&self, graph: &DataGraph, args: &Arguments, outcome: &mut PlanOutcome) -> StructuraResult<ActionPlan> {
        let input = args.path("input")?;
        let operation = ArithmeticOperation::from_index(args.choice("operation")?)?;
        let value = args.float("value")?;
        let data_type = numeric_type(graph, input)?;

        if operation == ArithmeticOperation::Divide && value == 0.0 {
            if data_type.is_integer() {
                return Err(StructuraError::invalid_parameter(
                    "value",
                    format!("integer division by zero on {}", input),
                ));
            }
            outcome.push_warning(Diagnostic::new(
                DIVIDE_BY_ZERO,
                format!("dividing {} by zero yields infinities and NaN", input),
            ));
        }

        let mut plan = ActionPlan::new();
        if args.bool("create_output")? {
            let array = graph.any_array(input)?;
            plan.push(Action::CreateArray {
                path: args.path("output")?.clone(),
                data_type,
                tuple_shape: array.tuple_shape().clone(),
                component_shape: array.component_shape().clone(),
            });
        }
        outcome.push_preview("Expression", format!("{} {} {}", input, operation.symbol(), value));
        outcome.push_preview("Result", target(args)?);
        Ok(plan)
    }
}

impl Filter for ScalarArithmetic {
    fn name(&self) -> &'static str {
        "scalar_arithmetic"
    }

    fn uuid(&self) -> FilterId {
        FilterId::from_u128(0xf6a1d83c_4b29_4e07_a5c8_9d2e6b1f0a10)
    }

    fn human_name(&self) -> &'static str {
        "Scalar Arithmetic"
    }

    fn parameters(&self) -> Parameters {
        let mut params = Parameters::new();
        params.insert(Parameter::data_path("input", "Input Array", &[ObjectType::DataArray]));
        params.insert(Parameter::choice("operation", "Operation", &ArithmeticOperation::NAMES, 0));
        params.insert(Parameter::float("value", "Value", 0.0));
        params.insert(Parameter::bool("create_output", "Write to New Array", false));
        params.insert(Parameter::created_path("output", "Output Array"));
        params.link("create_output", true, "output");
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
        compute(graph, args, ctx).into()
    }
}

fn compute(graph: &mut DataGraph, args: &Arguments, ctx: &ExecutionContext<'_>) -> StructuraResult<()> {
    let input = args.path("input")?;
    let operation = ArithmeticOperation::from_index(args.choice("operation")?)?;
    let value = args.float("value")?;
    let output = target(args)?;
    let data_type = numeric_type(graph, input)?;

    if output != input {
        let pair = (graph.resolve_id(input)?, graph.resolve_id(output)?);
        for (source, destination) in graph.array_pairs_mut(&[pair])? {
            destination.copy_data_from(source)?;
        }
    }
    if ctx.is_cancelled() {
        return Ok(());
    }

    let processed = match data_type {
        DataType::Int64 => apply_exact::<i64>(graph, output, operation, value, ctx)?,
        DataType::UInt64 => apply_exact::<u64>(graph, output, operation, value, ctx)?,
        _ => dispatch_data_type!(data_type, T => apply::<T>(graph, output, operation, value, ctx))?,
    };
    let total = ctx
        .cache()
        .update::<u64, _>("elements_processed", |count| {
            *count += processed as u64;
            *count
        });
    ctx.info(format!(
        "{} {} {} over {} elements ({} this run)",
        output, operation, value, processed, total
    ));
    Ok(())
}

/// Apply `operation` to every element of the array at `path` through `f64`
fn apply<T: Element>(
    graph: &mut DataGraph,
    path: &DataPath,
    operation: ArithmeticOperation,
    value: f64,
    ctx: &ExecutionContext<'_>,
) -> StructuraResult<usize> {
    map_elements::<T, _>(graph, path, ctx, |element| {
        T::from_f64(operation.apply(element.to_f64(), value))
    })
}

/// Apply `operation` to a 64-bit integer array without rounding through `f64`
fn apply_exact<T: WideInteger>(
    graph: &mut DataGraph,
    path: &DataPath,
    operation: ArithmeticOperation,
    value: f64,
    ctx: &ExecutionContext<'_>,
) -> StructuraResult<usize> {
    if !value.is_finite() {
        return apply::<T>(graph, path, operation, value, ctx);
    }
    map_elements::<T, _>(graph, path, ctx, |element| {
        T::narrow(exact(operation, element.widen(), value))
    })
}

/// Replace every element with `kernel(element)`, polling cancellation
fn map_elements<T, K>(
    graph: &mut DataGraph,
    path: &DataPath,
    ctx: &ExecutionContext<'_>,
    kernel: K,
) -> StructuraResult<usize>
where
    T: Element,
    K: Fn(T) -> T + Send + Sync,
{
    let array = graph.array_mut::<T>(path)?;
    let width = array.store().num_components();
    let store = array.store_mut();
    let len = store.len();
    let cancel = ctx.cancel_token();
    match store.as_mut_slice() {
        Some(values) => ctx.parallel().execute_mut(values, width, |_, slab| {
            if cancel.is_cancelled() {
                return;
            }
            for element in slab.iter_mut() {
                *element = kernel(*element);
            }
        }),
        None => {
            for i in 0..len {
                if i % CANCEL_POLL == 0 && cancel.is_cancelled() {
                    break;
                }
                let element = store.get(i)?;
                store.set(i, kernel(element))?;
            }
        }
    }
    Ok(len)
}

/// Integer element types wider than an `f64` mantissa
trait WideInteger: Element {
    fn widen(self) -> i128;

    /// Saturating narrow
    fn narrow(value: i128) -> Self;
}

macro_rules! impl_wide_integer {
    ($($t:ty),*) => {$(
        impl WideInteger for $t {
            #[inline]
            fn widen(self) -> i128 {
                self as i128
            }

            #[inline]
            fn narrow(value: i128) -> Self {
                value.clamp(<$t>::MIN as i128, <$t>::MAX as i128) as $t
            }
        }
    )*};
}

impl_wide_integer!(i64, u64);

/// `value` as `mantissa * 2^exponent`, exactly
fn decompose(value: f64) -> (i128, i32) {
    let bits = value.to_bits();
    let biased = ((bits >> 52) & 0x7ff) as i32;
    let fraction = (bits & 0x000f_ffff_ffff_ffff) as i128;
    let mantissa = if biased == 0 { fraction << 1 } else { fraction | (1 << 52) };
    let mantissa = if bits >> 63 == 1 { -mantissa } else { mantissa };
    (mantissa, biased - 1075)
}

fn saturated(negative: bool) -> i128 {
    if negative {
        i128::MIN
    } else {
        i128::MAX
    }
}

/// `value * 2^shift`, truncated toward zero
fn shifted(value: i128, shift: i32) -> i128 {
    if value == 0 {
        0
    } else if shift >= 127 {
        saturated(value < 0)
    } else if shift >= 0 {
        value.checked_mul(1i128 << shift).unwrap_or_else(|| saturated(value < 0))
    } else if shift <= -127 {
        0
    } else {
        value / (1i128 << -shift)
    }
}

/// `trunc(element + value)`
fn add_exact(element: i128, value: f64) -> i128 {
    let whole = value.trunc();
    let sum = element.saturating_add(whole as i128);
    let fraction = value - whole;
    if fraction > 0.0 && sum < 0 {
        sum + 1
    } else if fraction < 0.0 && sum > 0 {
        sum - 1
    } else {
        sum
    }
}

/// `trunc(element <op> value)` for a finite `value`
fn exact(operation: ArithmeticOperation, element: i128, value: f64) -> i128 {
    match operation {
        ArithmeticOperation::Add => add_exact(element, value),
        ArithmeticOperation::Subtract => add_exact(element, -value),
        ArithmeticOperation::Multiply => {
            let (mantissa, exponent) = decompose(value);
            shifted(element * mantissa, exponent)
        }
        ArithmeticOperation::Divide => {
            let (mantissa, exponent) = decompose(value);
            if mantissa == 0 {
                // Rejected during planning.
                return 0;
            }
            if exponent >= 0 {
                shifted(element / mantissa, -exponent)
            } else {
                let scaled = shifted(element, -exponent);
                if scaled == i128::MIN || scaled == i128::MAX {
                    saturated((element < 0) != (mantissa < 0))
                } else {
                    scaled / mantissa
                }
            }
        }
    }
}
