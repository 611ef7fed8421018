//! Cancellation tests: the in-flight node ends as `Cancelled`, later nodes
//! never start, and committed structure is kept.

use super::{group_step, path, recorder, GroupStep};
use crate::filters::{CopyDataObject, ScalarArithmetic};
use crate::{
    Arguments, CollectingHandler, ExecutionContext, Filter, FilterState, MessageKind, Pipeline, RunCache,
    RunEnvironment,
};
use structura_engine::{ActionMode, StorageAllocator};
use structura_concurrency::{CancellationToken, ParallelConfig, ParallelRange};
use structura_core::{DataPath, FaultState, Shape};
use structura_storage::{DataArray, DataGraph, DataStore};

#[test]
fn test_cancel_before_start_runs_nothing() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let observer = recorder();
    let env = RunEnvironment::default()
        .with_cancel(cancel)
        .with_observer(observer.clone());

    let mut pipeline = Pipeline::new("p");
    let (filter, args) = group_step("A");
    pipeline.push_filter(filter, args);

    let mut graph = DataGraph::new();
    let report = pipeline.execute(&mut graph, &env);
    assert!(report.cancelled);
    assert!(report.nodes.is_empty());
    assert!(observer.started.lock().is_empty());
    assert!(graph.is_empty());
}

#[test]
fn test_cancel_during_run_stops_later_nodes() {
    let mut pipeline = Pipeline::new("p");
    pipeline.push_filter(
        Box::new(GroupStep {
            cancel_in_run: true,
            ..GroupStep::default()
        }),
        Arguments::new().with("path", path("A")),
    );
    let (filter, args) = group_step("B");
    pipeline.push_filter(filter, args);

    let env = RunEnvironment::default();
    let mut graph = DataGraph::new();
    let report = pipeline.execute(&mut graph, &env);

    assert!(report.cancelled);
    assert_eq!(report.nodes.len(), 1);
    assert_eq!(report.nodes[0].state, FilterState::Cancelled);
    // Cancellation is not an error.
    assert_eq!(report.fault_state, FaultState::None);
    assert!(graph.contains(&path("A")));
    assert!(!graph.contains(&path("B")));
    assert!(env.cancel.is_cancelled());
}

#[test]
fn test_cancelled_preflight_stops_too() {
    let cancel = CancellationToken::new();
    let env = RunEnvironment::default().with_cancel(cancel.clone());
    let mut pipeline = Pipeline::new("p");
    let (filter, args) = group_step("A");
    pipeline.push_filter(filter, args);

    cancel.cancel();
    let (preview, report) = pipeline.preflight(&DataGraph::new(), &env);
    assert!(report.cancelled);
    assert!(preview.is_empty());
}

fn graph_with_array(len: usize) -> DataGraph {
    let mut graph = DataGraph::new();
    let values: Vec<f64> = (0..len).map(|i| i as f64).collect();
    let store = DataStore::from_vec(Shape::from([len]), Shape::scalar(1), values).unwrap();
    graph
        .create_array(&DataPath::empty(), "X", Box::new(DataArray::new(store)))
        .unwrap();
    graph
}

#[test]
fn test_cancelled_copy_returns_empty_success() {
    let mut graph = graph_with_array(1024);
    let args = CopyDataObject
        .parameters()
        .validate(&Arguments::new().with("sources", vec![path("X")]))
        .result
        .unwrap();
    let planned = CopyDataObject.plan(&graph, &args);
    assert!(planned.is_ok());
    planned
        .plan
        .apply(&mut graph, ActionMode::Execute, &StorageAllocator::unlimited())
        .unwrap();

    let cancel = CancellationToken::new();
    cancel.cancel();
    let messages = CollectingHandler::new();
    let parallel = ParallelRange::new(ParallelConfig {
        enabled: true,
        worker_threads: Some(2),
        min_grain: 16,
        max_pending_tasks: 4,
    });
    let cache = RunCache::new();
    let ctx = ExecutionContext::new(&cancel, &messages, &parallel, cache.scoped("copy_data_object"));

    assert!(CopyDataObject.run(&mut graph, &args, &ctx).is_ok());
    let copy = graph.array::<f64>(&path("X_COPY")).unwrap().store().to_vec().unwrap();
    assert!(copy.iter().all(|v| *v == 0.0));
    assert_eq!(messages.texts(MessageKind::Progress), vec!["Copied 0/1 arrays"]);
}

#[test]
fn test_cancelled_arithmetic_leaves_data_alone() {
    let mut graph = graph_with_array(256);
    let before = graph.array::<f64>(&path("X")).unwrap().store().to_vec().unwrap();
    let args = ScalarArithmetic
        .parameters()
        .validate(
            &Arguments::new()
                .with("input", path("X"))
                .with("operation", "multiply")
                .with("value", 3.0),
        )
        .result
        .unwrap();

    let cancel = CancellationToken::new();
    cancel.cancel();
    let messages = CollectingHandler::new();
    let parallel = ParallelRange::sequential();
    let cache = RunCache::new();
    let ctx = ExecutionContext::new(&cancel, &messages, &parallel, cache.scoped("scalar_arithmetic"));

    assert!(ScalarArithmetic.run(&mut graph, &args, &ctx).is_ok());
    assert_eq!(graph.array::<f64>(&path("X")).unwrap().store().to_vec().unwrap(), before);
}
