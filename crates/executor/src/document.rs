//! Serialized pipelines
//!
//! A [`PipelineDocument`] is the JSON form of a [`Pipeline`]: nodes name
//! their filter by identifier and carry their bound arguments.
//!
//! ```text
//! {
//!   "name": "setup",
//!   "nodes": [
//!     { "node": "filter", "filter": "create_data_group",
//!       "args": { "path": { "path": "G" } } },
//!     { "node": "pipeline", "enabled": false,
//!       "pipeline": { "name": "inner", "nodes": [] } }
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use structura_core::{StructuraError, StructuraResult};

use crate::parameters::Arguments;
use crate::pipeline::{Pipeline, PipelineNode};
use crate::registry::FilterRegistry;

fn enabled_default() -> bool {
    true
}

/// JSON form of a pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineDocument {
    /// Pipeline name
    pub name: String,
    /// Nodes in order
    #[serde(default)]
    pub nodes: Vec<NodeDocument>,
}

/// JSON form of one pipeline node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum NodeDocument {
    /// Bound filter
    Filter {
        /// Filter name or UUID
        filter: String,
        /// Bound arguments
        #[serde(default)]
        args: Arguments,
        /// Whether the node runs
        #[serde(default = "enabled_default")]
        enabled: bool,
    },
    /// Sub-pipeline
    Pipeline {
        /// The sub-pipeline
        pipeline: PipelineDocument,
        /// Whether the node runs
        #[serde(default = "enabled_default")]
        enabled: bool,
    },
}

impl PipelineDocument {
    /// Parse a document from JSON text
    pub fn from_json(text: &str) -> StructuraResult<Self> {
        serde_json::from_str(text).map_err(|e| StructuraError::invalid_parameter("document", e.to_string()))
    }

    /// Render as pretty-printed JSON
    pub fn to_json(&self) -> StructuraResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| StructuraError::internal(e.to_string()))
    }

    /// Read and parse a document file
    pub fn from_file(path: &Path) -> StructuraResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Write this document as JSON
    pub fn write_to_file(&self, path: &Path) -> StructuraResult<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Instantiate every filter through `registry`
    pub fn into_pipeline(&self, registry: &FilterRegistry) -> StructuraResult<Pipeline> {
        let mut pipeline = Pipeline::new(self.name.clone());
        for node in &self.nodes {
            let node = match node {
                NodeDocument::Filter { filter, args, enabled } => PipelineNode::Filter {
                    filter: registry.create(filter)?,
                    args: args.clone(),
                    enabled: *enabled,
                },
                NodeDocument::Pipeline { pipeline, enabled } => PipelineNode::Nested {
                    pipeline: pipeline.into_pipeline(registry)?,
                    enabled: *enabled,
                },
            };
            pipeline.push_node(node);
        }
        Ok(pipeline)
    }
}

impl Pipeline {
    /// Serializable form, naming filters by their stable name
    pub fn to_document(&self) -> PipelineDocument {
        let nodes = self
            .nodes()
            .iter()
            .map(|node| match node {
                PipelineNode::Filter { filter, args, enabled } => NodeDocument::Filter {
                    filter: filter.name().to_string(),
                    args: args.clone(),
                    enabled: *enabled,
                },
                PipelineNode::Nested { pipeline, enabled } => NodeDocument::Pipeline {
                    pipeline: pipeline.to_document(),
                    enabled: *enabled,
                },
            })
            .collect();
        PipelineDocument {
            name: self.name().to_string(),
            nodes,
        }
    }
}
