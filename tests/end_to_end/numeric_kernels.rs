//! Numeric kernels give the same answer with and without worker threads.

use proptest::prelude::*;

use crate::common::{parallel_env, path};
use structura::filters::{ArithmeticOperation, ScalarArithmetic};
use structura::{Arguments, DataArray, DataGraph, DataPath, DataStore, ParallelRange, Pipeline, RunEnvironment, Shape};

fn graph_with(values: &[i32], width: usize) -> DataGraph {
    let mut graph = DataGraph::new();
    let store = DataStore::from_vec(
        Shape::from([values.len() / width]),
        Shape::from([width]),
        values.to_vec(),
    )
    .unwrap();
    graph
        .create_array(&DataPath::empty(), "X", Box::new(DataArray::new(store)))
        .unwrap();
    graph
}

fn arithmetic(operation: ArithmeticOperation, value: f64) -> Pipeline {
    let mut pipeline = Pipeline::new("arith");
    pipeline.push_filter(
        Box::new(ScalarArithmetic),
        Arguments::new()
            .with("input", path("X"))
            .with("operation", operation.to_string())
            .with("value", value),
    );
    pipeline
}

fn operation() -> impl Strategy<Value = ArithmeticOperation> {
    prop_oneof![
        Just(ArithmeticOperation::Add),
        Just(ArithmeticOperation::Subtract),
        Just(ArithmeticOperation::Multiply),
        Just(ArithmeticOperation::Divide),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_parallel_arithmetic_matches_sequential(
        tuples in 1usize..600,
        width in 1usize..4,
        operation in operation(),
        value in 0.25f64..1000.0,
        seed in any::<i32>(),
    ) {
        let values: Vec<i32> = (0..tuples * width)
            .map(|i| seed.wrapping_mul(31).wrapping_add(i as i32 * 7919) % 100_000)
            .collect();
        let mut sequential = graph_with(&values, width);
        let mut parallel = graph_with(&values, width);
        let pipeline = arithmetic(operation, value);

        let env = RunEnvironment::default().with_parallel(ParallelRange::sequential());
        prop_assert!(pipeline.execute(&mut sequential, &env).is_ok());
        prop_assert!(pipeline.execute(&mut parallel, &parallel_env()).is_ok());

        let expected: Vec<i32> = values
            .iter()
            .map(|v| operation.apply(*v as f64, value) as i32)
            .collect();
        let read = |graph: &DataGraph| graph.array::<i32>(&path("X")).unwrap().store().to_vec().unwrap();
        prop_assert_eq!(read(&sequential), expected.clone());
        prop_assert_eq!(read(&parallel), expected);
    }
}
