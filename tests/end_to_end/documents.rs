//! Pipelines and preferences loaded from disk.

use crate::common::{init_tracing, path};
use structura::{
    DataGraph, FilterRegistry, OutOfCoreOptions, PipelineDocument, Preferences, RunEnvironment, StoreKind,
    CONFIG_FILE_NAME,
};

const PIPELINE: &str = r#"{
    "name": "from disk",
    "nodes": [
        { "node": "filter", "filter": "create_data_group", "args": { "path": { "path": "G" } } },
        {
            "node": "filter",
            "filter": "create_data_array",
            "args": {
                "path": { "path": "G/Values" },
                "data_type": { "data_type": "float64" },
                "tuple_shape": { "shape": [256] },
                "initialize": { "bool": true },
                "fill_value": { "string": "1.5" }
            }
        },
        {
            "node": "pipeline",
            "pipeline": {
                "name": "scale",
                "nodes": [
                    {
                        "node": "filter",
                        "filter": "scalar_arithmetic",
                        "args": {
                            "input": { "path": "G/Values" },
                            "operation": { "string": "multiply" },
                            "value": { "integer": 4 }
                        }
                    }
                ]
            }
        },
        {
            "node": "filter",
            "filter": "delete_data",
            "enabled": false,
            "args": { "paths": { "path_list": ["G"] } }
        }
    ]
}"#;

#[test]
fn test_pipeline_and_preferences_from_files() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let pipeline_file = dir.path().join("pipeline.json");
    std::fs::write(&pipeline_file, PIPELINE).unwrap();

    let config_file = dir.path().join(CONFIG_FILE_NAME);
    Preferences::write_default_if_missing(&config_file).unwrap();
    let mut preferences = Preferences::from_file(&config_file).unwrap();
    assert_eq!(preferences, Preferences::default());

    // Everything above 1 KiB spills to disk.
    preferences.large_data_threshold = 1024;
    preferences.available_memory = Some(u64::MAX);
    preferences.out_of_core = Some(OutOfCoreOptions {
        chunk_elements: 64,
        resident_chunks: 2,
        directory: Some(dir.path().to_path_buf()),
    });
    preferences.write_to_file(&config_file).unwrap();
    let preferences = Preferences::from_file(&config_file).unwrap();

    let pipeline = PipelineDocument::from_file(&pipeline_file)
        .unwrap()
        .into_pipeline(&FilterRegistry::with_builtins())
        .unwrap();
    let mut graph = DataGraph::new();
    let report = pipeline.execute(&mut graph, &RunEnvironment::new(&preferences));

    assert!(report.is_ok(), "{:?}", report.errors().collect::<Vec<_>>());
    assert!(report.node(&[3]).unwrap().skipped);
    assert!(report.node(&[2, 0]).is_some());
    let values = graph.array::<f64>(&path("G/Values")).unwrap();
    assert_eq!(values.store().kind(), StoreKind::OutOfCore);
    assert_eq!(values.store().to_vec().unwrap(), vec![6.0; 256]);
}

#[test]
fn test_documents_survive_a_round_trip() {
    let registry = FilterRegistry::with_builtins();
    let document = PipelineDocument::from_json(PIPELINE).unwrap();
    let pipeline = document.into_pipeline(&registry).unwrap();
    let rewritten = pipeline.to_document();
    assert_eq!(rewritten.nodes.len(), document.nodes.len());
    assert_eq!(
        PipelineDocument::from_json(&rewritten.to_json().unwrap()).unwrap(),
        rewritten
    );
}

#[test]
fn test_unknown_filters_are_reported_by_identifier() {
    let document = PipelineDocument::from_json(
        r#"{ "name": "x", "nodes": [ { "node": "filter", "filter": "segment_features" } ] }"#,
    )
    .unwrap();
    let err = document.into_pipeline(&FilterRegistry::with_builtins()).unwrap_err();
    assert!(err.to_string().contains("segment_features"));
}
