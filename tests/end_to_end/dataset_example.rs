//! The reference dataset walk-through: group, attribute matrix, array,
//! a rejected shape and a rename, driven both on the graph and through
//! filters.

use crate::common::{init_tracing, path};
use structura::filters::{CreateAttributeMatrix, CreateDataArray, CreateDataGroup, RenameDataObject};
use structura::{
    Action, ActionMode, ActionPlan, Arguments, DataGraph, DataPath, DataType, FilterState, Pipeline, RunEnvironment,
    Shape, StorageAllocator, StructuraError,
};

#[test]
fn test_dataset_example_on_the_graph() {
    init_tracing();
    let mut graph = DataGraph::new();
    let allocator = StorageAllocator::unlimited();

    let setup = ActionPlan::from(vec![
        Action::CreateGroup { path: path("G") },
        Action::CreateAttributeMatrix {
            path: path("G/AM"),
            tuple_shape: Shape::from([10]),
        },
        Action::CreateArray {
            path: path("G/AM/X"),
            data_type: DataType::Float32,
            tuple_shape: Shape::from([10]),
            component_shape: Shape::from([1]),
        },
    ]);
    setup.apply(&mut graph, ActionMode::Execute, &allocator).unwrap();
    assert_eq!(
        graph.array::<f32>(&path("G/AM/X")).unwrap().store().to_vec().unwrap(),
        vec![0.0; 10]
    );

    let mismatched = ActionPlan::from(vec![Action::CreateArray {
        path: path("G/AM/Y"),
        data_type: DataType::Float32,
        tuple_shape: Shape::from([5]),
        component_shape: Shape::from([1]),
    }]);
    let err = mismatched
        .apply(&mut graph, ActionMode::Execute, &allocator)
        .unwrap_err();
    assert!(matches!(err, StructuraError::ShapeMismatch { .. }), "{:?}", err);
    assert!(!graph.contains(&path("G/AM/Y")));

    graph.rename(&path("G/AM/X"), "Z", false).unwrap();
    assert!(graph.resolve(&path("G/AM/X")).unwrap_err().is_not_found());
    assert!(graph.contains(&path("G/AM/Z")));
}

#[test]
fn test_dataset_example_through_filters() {
    init_tracing();
    let mut pipeline = Pipeline::new("example");
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
                .with("data_type", DataType::Float32)
                .with("tuple_shape", Shape::from([10])),
        )
        .push_filter(
            Box::new(RenameDataObject),
            Arguments::new()
                .with("path", path("G/AM/X"))
                .with("new_name", "Z")
                .with("allow_overwrite", false),
        );

    let env = RunEnvironment::default();
    let (preview, preflight) = pipeline.preflight(&DataGraph::new(), &env);
    assert!(preflight.is_ok());
    assert!(preview.contains(&path("G/AM/Z")));

    let mut graph = DataGraph::new();
    let report = pipeline.execute(&mut graph, &env);
    assert!(report.is_ok(), "{:?}", report.errors().collect::<Vec<_>>());
    assert!(report.nodes.iter().all(|n| n.state == FilterState::Completed));
    assert!(!graph.contains(&path("G/AM/X")));
    assert_eq!(
        graph.array::<f32>(&path("G/AM/Z")).unwrap().store().to_vec().unwrap(),
        vec![0.0; 10]
    );
    assert_eq!(graph.structure().unwrap(), preview.structure().unwrap());
}

#[test]
fn test_failed_plans_leave_the_graph_alone() {
    let mut graph = DataGraph::new();
    graph.create_group(&DataPath::empty(), "G").unwrap();
    let before = graph.structure().unwrap();

    let mut pipeline = Pipeline::new("bad");
    pipeline.push_filter(
        Box::new(RenameDataObject),
        Arguments::new()
            .with("path", path("G"))
            .with("new_name", ""),
    );
    let report = pipeline.execute(&mut graph, &RunEnvironment::default());
    assert!(!report.is_ok());
    assert_eq!(report.nodes[0].state, FilterState::Faulted);
    assert_eq!(graph.structure().unwrap(), before);
}
