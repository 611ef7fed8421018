//! Pipeline walk tests: ordering, short-circuiting, reporting.

use std::sync::Arc;

use super::{group_step, path, recorder, GroupStep};
use crate::filters::{CreateAttributeMatrix, CreateDataArray, CreateDataGroup, DeleteData};
use crate::message::{CollectingHandler, MessageKind};
use crate::{Arguments, FilterState, Pipeline, RunEnvironment};
use structura_core::{DataPath, DataType, FaultState, Shape, StructuraError};
use structura_storage::{DataGraph, StoreKind};

/// G, G/AM with 10 tuples, G/AM/X as float32
fn setup_pipeline() -> Pipeline {
    let mut pipeline = Pipeline::new("setup");
    pipeline
        .push_filter(Box::new(CreateDataGroup), Arguments::new().with("path", path("G")))
        .push_filter(
            Box::new(CreateAttributeMatrix),
            Arguments::new()
                .with("path", path("G/AM"))
                .with("tuple_shape", Shape::from([10])),
        )
        .push_filter(
            Box::new(CreateDataArray),
            Arguments::new()
                .with("path", path("G/AM/X"))
                .with("data_type", DataType::Float32),
        );
    pipeline
}

// =============================================================================
// Preflight
// =============================================================================

#[test]
fn test_preflight_leaves_input_untouched() {
    let graph = DataGraph::new();
    let (preview, report) = setup_pipeline().preflight(&graph, &RunEnvironment::default());

    assert!(report.is_ok(), "{:?}", report.errors().collect::<Vec<_>>());
    assert!(graph.is_empty());
    assert_eq!(preview.any_array(&path("G/AM/X")).unwrap().store_kind(), StoreKind::Empty);
    assert_eq!(
        preview.any_array(&path("G/AM/X")).unwrap().tuple_shape(),
        &Shape::from([10])
    );
    assert!(report.nodes.iter().all(|n| n.state == FilterState::Completed));
}

#[test]
fn test_preflight_does_not_run_filters() {
    let messages = Arc::new(CollectingHandler::new());
    let env = RunEnvironment::default().with_messages(messages.clone());
    let mut pipeline = Pipeline::new("p");
    let (filter, args) = group_step("G");
    pipeline.push_filter(filter, args);

    let (_, report) = pipeline.preflight(&DataGraph::new(), &env);
    assert!(report.is_ok());
    assert!(messages.messages().is_empty());

    pipeline.execute(&mut DataGraph::new(), &env);
    assert_eq!(messages.texts(MessageKind::Info), vec!["group step ran"]);
}

#[test]
fn test_preflight_rejects_overflowing_shapes() {
    let mut pipeline = Pipeline::new("huge");
    pipeline.push_filter(
        Box::new(CreateDataArray),
        Arguments::new()
            .with("path", path("X"))
            .with("tuple_shape", Shape::from([usize::MAX, 4])),
    );
    let env = RunEnvironment::default();

    let (_, preflight) = pipeline.preflight(&DataGraph::new(), &env);
    let execute = pipeline.execute(&mut DataGraph::new(), &env);
    assert!(!preflight.is_ok());
    assert!(!execute.is_ok());
    assert_eq!(
        preflight.errors().map(|(_, e)| e.code).collect::<Vec<_>>(),
        execute.errors().map(|(_, e)| e.code).collect::<Vec<_>>()
    );
}

// =============================================================================
// Execute
// =============================================================================

#[test]
fn test_execute_allocates_zeroed_arrays() {
    let mut graph = DataGraph::new();
    let report = setup_pipeline().execute(&mut graph, &RunEnvironment::default());

    assert!(report.is_ok());
    assert_eq!(report.fault_state, FaultState::None);
    let x = graph.array::<f32>(&path("G/AM/X")).unwrap();
    assert_eq!(x.store().kind(), StoreKind::InMemory);
    assert_eq!(x.store().to_vec().unwrap(), vec![0.0; 10]);
}

#[test]
fn test_first_error_stops_the_walk() {
    let mut pipeline = Pipeline::new("p");
    for _ in 0..3 {
        pipeline.push_filter(Box::new(CreateDataGroup), Arguments::new().with("path", path("G")));
    }
    let mut graph = DataGraph::new();
    let report = pipeline.execute(&mut graph, &RunEnvironment::default());

    assert!(!report.is_ok());
    assert_eq!(report.nodes.len(), 2);
    assert_eq!(report.nodes[1].state, FilterState::Faulted);
    assert_eq!(
        report.nodes[1].errors[0].code,
        StructuraError::NameConflict {
            parent: DataPath::empty(),
            name: "G".into()
        }
        .code()
    );
    assert_eq!(graph.len(), 1);
}

#[test]
fn test_invalid_arguments_fault_before_planning() {
    let mut pipeline = Pipeline::new("p");
    pipeline.push_filter(Box::new(CreateDataGroup), Arguments::new().with("path", true));
    let mut graph = DataGraph::new();
    let report = pipeline.execute(&mut graph, &RunEnvironment::default());

    assert_eq!(report.fault_state, FaultState::Errors);
    assert!(graph.is_empty());
}

#[test]
fn test_run_failure_faults_the_node() {
    let mut pipeline = Pipeline::new("p");
    pipeline.push_filter(
        Box::new(GroupStep {
            fail_run: true,
            ..GroupStep::default()
        }),
        Arguments::new().with("path", path("A")),
    );
    let (filter, args) = group_step("B");
    pipeline.push_filter(filter, args);

    let mut graph = DataGraph::new();
    let report = pipeline.execute(&mut graph, &RunEnvironment::default());
    assert_eq!(report.nodes.len(), 1);
    assert_eq!(report.nodes[0].state, FilterState::Faulted);
    // The committed structure stays.
    assert!(graph.contains(&path("A")));
    assert!(!graph.contains(&path("B")));
}

#[test]
fn test_warnings_do_not_stop_the_walk() {
    let mut pipeline = Pipeline::new("p");
    for group in ["A", "A/B"] {
        let (filter, args) = group_step(group);
        pipeline.push_filter(filter, args);
    }
    pipeline.push_filter(
        Box::new(DeleteData),
        Arguments::new().with("paths", vec![path("A/B"), path("A")]),
    );
    let (filter, args) = group_step("A");
    pipeline.push_filter(filter, args);

    let mut graph = DataGraph::new();
    let report = pipeline.execute(&mut graph, &RunEnvironment::default());
    assert!(report.is_ok());
    assert_eq!(report.fault_state, FaultState::Warnings);
    assert_eq!(report.nodes.len(), 4);
    assert_eq!(report.warnings().count(), 1);
    assert!(graph.contains(&path("A")));
    assert!(!graph.contains(&path("A/B")));
}

#[test]
fn test_disabled_nodes_are_skipped() {
    let mut pipeline = setup_pipeline();
    pipeline.set_enabled(2, false).unwrap();
    assert!(pipeline.set_enabled(9, false).is_err());

    let mut graph = DataGraph::new();
    let report = pipeline.execute(&mut graph, &RunEnvironment::default());
    assert!(report.is_ok());
    assert!(report.nodes[2].skipped);
    assert_eq!(report.nodes[2].state, FilterState::Idle);
    assert!(!graph.contains(&path("G/AM/X")));
}

// =============================================================================
// Nesting and observers
// =============================================================================

#[test]
fn test_nested_pipelines_report_full_indices() {
    let mut inner = Pipeline::new("inner");
    let (filter, args) = group_step("B");
    inner.push_filter(filter, args);
    let (filter, args) = group_step("C");
    inner.push_filter(filter, args);

    let mut outer = Pipeline::new("outer");
    let (filter, args) = group_step("A");
    outer.push_filter(filter, args).push_nested(inner);

    let observer = recorder();
    let env = RunEnvironment::default().with_observer(observer.clone());
    let mut graph = DataGraph::new();
    let report = outer.execute(&mut graph, &env);

    assert!(report.is_ok());
    assert!(report.node(&[1, 1]).is_some());
    assert_eq!(graph.len(), 3);
    let started: Vec<Vec<usize>> = observer.started.lock().iter().map(|(i, _)| i.clone()).collect();
    assert_eq!(started, vec![vec![0], vec![1, 0], vec![1, 1]]);
    assert_eq!(observer.finished.lock().len(), 3);
    assert_eq!(observer.reports.lock().as_slice(), &[report]);
}

#[test]
fn test_preview_values_reach_the_report() {
    let (_, report) = setup_pipeline().preflight(&DataGraph::new(), &RunEnvironment::default());
    let preview = &report.node(&[2]).unwrap().preview;
    assert!(preview.iter().any(|p| p.name == "Data Type" && p.value == "float32"));
}
