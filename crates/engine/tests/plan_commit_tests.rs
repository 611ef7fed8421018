//! Plan/commit protocol tests
//!
//! Validates that preflight and execute agree:
//! - Same structure (paths, types, shapes) after applying the same plan
//! - Same failure code when a plan is rejected
//! - Deferred actions never run after a failed primary action
//! - Execute mode allocates through the capacity policy

use proptest::prelude::*;
use std::sync::Arc;

use structura_core::{DataPath, DataType, Shape, StructuraError};
use structura_engine::{
    Action, ActionMode, ActionPlan, FixedMemoryProbe, GeometrySpec, Preferences, StorageAllocator,
};
use structura_storage::{DataGraph, ImageGrid, OutOfCoreOptions, StoreKind};

// ============================================================================
// Helpers
// ============================================================================

fn path(text: &str) -> DataPath {
    DataPath::parse(text).unwrap()
}

fn seeded_graph() -> DataGraph {
    let mut graph = DataGraph::new();
    let plan = ActionPlan::from(vec![
        Action::CreateGroup { path: path("G") },
        Action::CreateAttributeMatrix {
            path: path("G/AM"),
            tuple_shape: Shape::from([6]),
        },
        Action::CreateArray {
            path: path("G/AM/X"),
            data_type: DataType::Float32,
            tuple_shape: Shape::from([6]),
            component_shape: Shape::from([1]),
        },
    ]);
    plan.apply(&mut graph, ActionMode::Execute, &StorageAllocator::unlimited())
        .unwrap();
    graph
}

/// Apply `plan` in both modes and compare the outcomes
fn assert_modes_agree(graph: &DataGraph, plan: &ActionPlan) {
    let alloc = StorageAllocator::unlimited();
    let mut preview = graph.structural_copy();
    let mut live = graph.try_clone().unwrap();

    let planned = plan.apply(&mut preview, ActionMode::Preflight, &alloc);
    let committed = plan.apply(&mut live, ActionMode::Execute, &alloc);

    match (&planned, &committed) {
        (Ok(()), Ok(())) => {}
        (Err(a), Err(b)) => assert_eq!(a.code(), b.code(), "{} vs {}", a, b),
        _ => panic!("modes disagree: preflight {:?}, execute {:?}", planned, committed),
    }
    assert_eq!(preview.structure().unwrap(), live.structure().unwrap());
}

// ============================================================================
// Fixed scenarios
// ============================================================================

#[test]
fn test_image_geometry_plan_commits_like_preflight() {
    let graph = DataGraph::new();
    let mut plan = ActionPlan::new();
    plan.push(Action::CreateGeometry {
        path: path("Image"),
        geometry: GeometrySpec::Image {
            grid: ImageGrid::new([4, 3, 2]),
            cell_data: "Cells".to_string(),
        },
    });
    plan.push(Action::CreateAttributeMatrix {
        path: path("Image/Cells"),
        tuple_shape: Shape::from([2, 3, 4]),
    });
    plan.push(Action::CreateArray {
        path: path("Image/Cells/Phases"),
        data_type: DataType::Int32,
        tuple_shape: Shape::from([2, 3, 4]),
        component_shape: Shape::from([1]),
    });
    assert_modes_agree(&graph, &plan);
}

#[test]
fn test_rejected_plan_fails_identically() {
    let graph = seeded_graph();
    let plan = ActionPlan::from(vec![Action::CreateArray {
        path: path("G/AM/Y"),
        data_type: DataType::UInt8,
        tuple_shape: Shape::from([7]),
        component_shape: Shape::from([1]),
    }]);
    assert_modes_agree(&graph, &plan);
}

#[test]
fn test_deferred_delete_runs_last() {
    let mut graph = seeded_graph();
    let mut plan = ActionPlan::new();
    plan.push_deferred(Action::Delete { path: path("G/AM/X") });
    plan.push(Action::Copy {
        source: path("G/AM/X"),
        destination: path("G/AM/XCopy"),
        copy_data: true,
    });
    plan.apply(&mut graph, ActionMode::Execute, &StorageAllocator::unlimited())
        .unwrap();
    assert!(graph.contains(&path("G/AM/XCopy")));
    assert!(!graph.contains(&path("G/AM/X")));
}

#[test]
fn test_deferred_delete_skipped_when_primary_fails() {
    let mut graph = seeded_graph();
    let mut plan = ActionPlan::new();
    plan.push(Action::Copy {
        source: path("G/AM/Missing"),
        destination: path("G/AM/Copy"),
        copy_data: true,
    });
    plan.push_deferred(Action::Delete { path: path("G/AM/X") });
    let err = plan
        .apply(&mut graph, ActionMode::Execute, &StorageAllocator::unlimited())
        .unwrap_err();
    assert!(err.is_not_found());
    assert!(graph.contains(&path("G/AM/X")));
}

#[test]
fn test_execute_spills_large_arrays_out_of_core() {
    let prefs = Preferences {
        large_data_threshold: 64,
        out_of_core: Some(OutOfCoreOptions {
            chunk_elements: 32,
            resident_chunks: 2,
            directory: None,
        }),
        ..Preferences::default()
    };
    let alloc = StorageAllocator::with_probe(&prefs, Arc::new(FixedMemoryProbe(u64::MAX)));
    let mut graph = DataGraph::new();
    ActionPlan::from(vec![
        Action::CreateArray {
            path: path("Small"),
            data_type: DataType::Float64,
            tuple_shape: Shape::from([4]),
            component_shape: Shape::from([1]),
        },
        Action::CreateArray {
            path: path("Large"),
            data_type: DataType::Float64,
            tuple_shape: Shape::from([100]),
            component_shape: Shape::from([1]),
        },
    ])
    .apply(&mut graph, ActionMode::Execute, &alloc)
    .unwrap();

    assert_eq!(graph.any_array(&path("Small")).unwrap().store_kind(), StoreKind::InMemory);
    assert_eq!(graph.any_array(&path("Large")).unwrap().store_kind(), StoreKind::OutOfCore);
    graph.array_mut::<f64>(&path("Large")).unwrap().set(99, 2.5).unwrap();
    assert_eq!(graph.array::<f64>(&path("Large")).unwrap().get(99).unwrap(), 2.5);
}

#[test]
fn test_capacity_exceeded_without_out_of_core() {
    let alloc = StorageAllocator::with_probe(&Preferences::default(), Arc::new(FixedMemoryProbe(16)));
    let mut graph = DataGraph::new();
    let err = Action::CreateArray {
        path: path("Big"),
        data_type: DataType::UInt32,
        tuple_shape: Shape::from([5]),
        component_shape: Shape::from([1]),
    }
    .apply(&mut graph, ActionMode::Execute, &alloc)
    .unwrap_err();
    assert!(matches!(err, StructuraError::CapacityExceeded { requested: 20, .. }));
    assert!(graph.is_empty());

    // Preflight never allocates, so the same action validates.
    Action::CreateArray {
        path: path("Big"),
        data_type: DataType::UInt32,
        tuple_shape: Shape::from([5]),
        component_shape: Shape::from([1]),
    }
    .apply(&mut graph, ActionMode::Preflight, &alloc)
    .unwrap();
}

// ============================================================================
// Property: preflight and execute agree on arbitrary plans
// ============================================================================

const NAMES: [&str; 4] = ["A", "B", "C", "D"];

fn arb_path() -> impl Strategy<Value = DataPath> {
    prop::collection::vec(0..NAMES.len(), 1..3)
        .prop_map(|idx| DataPath::from_segments(idx.into_iter().map(|i| NAMES[i])).unwrap())
}

fn arb_action() -> impl Strategy<Value = Action> {
    prop_oneof![
        arb_path().prop_map(|path| Action::CreateGroup { path }),
        (arb_path(), 1usize..4).prop_map(|(path, n)| Action::CreateAttributeMatrix {
            path,
            tuple_shape: Shape::from([n]),
        }),
        (arb_path(), 1usize..4, 1usize..3).prop_map(|(path, n, c)| Action::CreateArray {
            path,
            data_type: DataType::Int16,
            tuple_shape: Shape::from([n]),
            component_shape: Shape::from([c]),
        }),
        (arb_path(), 0..NAMES.len(), any::<bool>()).prop_map(|(path, i, allow_overwrite)| {
            Action::Rename {
                path,
                new_name: NAMES[i].to_string(),
                allow_overwrite,
            }
        }),
        (arb_path(), arb_path()).prop_map(|(path, new_parent)| Action::Move { path, new_parent }),
        arb_path().prop_map(|path| Action::Delete { path }),
        (arb_path(), arb_path(), any::<bool>()).prop_map(|(source, destination, copy_data)| Action::Copy {
            source,
            destination,
            copy_data,
        }),
    ]
}

proptest! {
    #[test]
    fn prop_preflight_matches_execute(
        actions in prop::collection::vec(arb_action(), 1..12),
        deferred in prop::collection::vec(arb_action(), 0..3),
    ) {
        let graph = seeded_graph();
        let plan = ActionPlan { actions, deferred };
        assert_modes_agree(&graph, &plan);
    }
}
