//! Structural mutations of the data graph
//!
//! An [`Action`] describes one mutation. Applying it in
//! [`ActionMode::Preflight`] runs every check and installs placeholder
//! arrays that carry shape and type but hold no data, so a whole pipeline
//! can be validated without allocating. [`ActionMode::Execute`] runs the
//! same checks and allocates real storage through the
//! [`StorageAllocator`].
//!
//! A failed apply leaves the graph unchanged.

use serde::{Deserialize, Serialize};
use std::fmt;
use structura_core::{dispatch_data_type, DataPath, DataType, Shape, StructuraError, StructuraResult};
use structura_storage::{
    AnyArray, DataGraph, Geometry, GeometryKind, ImageGrid, NeighborList, ObjectKind, StringArray,
};
use tracing::debug;

use crate::allocator::{placeholder_array, request_bytes, StorageAllocator};

/// Validate-only or committing application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionMode {
    /// Checks plus placeholders
    Preflight,
    /// Checks plus real allocation
    Execute,
}

impl fmt::Display for ActionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionMode::Preflight => write!(f, "preflight"),
            ActionMode::Execute => write!(f, "execute"),
        }
    }
}

/// Geometry to create, with references given as paths
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GeometrySpec {
    /// Uniform grid
    Image {
        /// Grid parameters
        grid: ImageGrid,
        /// Name of the cell attribute matrix
        cell_data: String,
    },
    /// Rectilinear grid
    RectGrid {
        /// Cells per axis
        dimensions: [usize; 3],
        /// x/y/z bounds arrays
        bounds: [DataPath; 3],
        /// Name of the cell attribute matrix
        cell_data: String,
    },
    /// Vertex, edge, surface or volume mesh
    NodeBased {
        /// Mesh kind
        geometry: GeometryKind,
        /// Shared vertex list
        vertices: DataPath,
        /// Connectivity list, absent for vertex geometries
        #[serde(default, skip_serializing_if = "Option::is_none")]
        connectivity: Option<DataPath>,
        /// Name of the cell attribute matrix
        cell_data: String,
        /// Name of the vertex attribute matrix
        vertex_data: String,
    },
}

impl GeometrySpec {
    /// Geometry subtype
    pub fn kind(&self) -> GeometryKind {
        match self {
            GeometrySpec::Image { .. } => GeometryKind::Image,
            GeometrySpec::RectGrid { .. } => GeometryKind::RectGrid,
            GeometrySpec::NodeBased { geometry, .. } => *geometry,
        }
    }

    /// Resolve path references against `graph`
    pub fn resolve(&self, graph: &DataGraph) -> StructuraResult<Geometry> {
        match self {
            GeometrySpec::Image { grid, cell_data } => Ok(Geometry::image(grid.clone(), cell_data.as_str())),
            GeometrySpec::RectGrid {
                dimensions,
                bounds,
                cell_data,
            } => {
                let [x, y, z] = bounds;
                let ids = [graph.resolve_id(x)?, graph.resolve_id(y)?, graph.resolve_id(z)?];
                Ok(Geometry::rect_grid(*dimensions, ids, cell_data.as_str()))
            }
            GeometrySpec::NodeBased {
                geometry,
                vertices,
                connectivity,
                cell_data,
                vertex_data,
            } => {
                let vertices = graph.resolve_id(vertices)?;
                let connectivity = connectivity
                    .as_ref()
                    .map(|path| graph.resolve_id(path))
                    .transpose()?;
                Geometry::node_based(
                    *geometry,
                    vertices,
                    connectivity,
                    cell_data.as_str(),
                    vertex_data.as_str(),
                )
            }
        }
    }
}

/// One structural mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// New zero-filled numeric array
    CreateArray {
        /// Location of the new array
        path: DataPath,
        /// Element type
        data_type: DataType,
        /// Tuple shape
        tuple_shape: Shape,
        /// Component shape
        component_shape: Shape,
    },
    /// New array of empty strings
    CreateStringArray {
        /// Location of the new array
        path: DataPath,
        /// Tuple shape
        tuple_shape: Shape,
    },
    /// New neighbor list with every list empty
    CreateNeighborList {
        /// Location of the new list
        path: DataPath,
        /// Element type
        data_type: DataType,
        /// Tuple shape
        tuple_shape: Shape,
    },
    /// New group
    CreateGroup {
        /// Location of the new group
        path: DataPath,
    },
    /// New attribute matrix
    CreateAttributeMatrix {
        /// Location of the new matrix
        path: DataPath,
        /// Tuple shape shared by its arrays
        tuple_shape: Shape,
    },
    /// New geometry
    CreateGeometry {
        /// Location of the new geometry
        path: DataPath,
        /// Geometry description
        geometry: GeometrySpec,
    },
    /// Rename in place
    Rename {
        /// Object to rename
        path: DataPath,
        /// New name
        new_name: String,
        /// Replace an existing sibling of that name
        #[serde(default)]
        allow_overwrite: bool,
    },
    /// Reparent
    Move {
        /// Object to move
        path: DataPath,
        /// New parent; the empty path makes it a root
        new_parent: DataPath,
    },
    /// Remove with everything it owns
    Delete {
        /// Object to remove
        path: DataPath,
    },
    /// Deep copy of a subtree
    Copy {
        /// Subtree to copy
        source: DataPath,
        /// Path of the copy
        destination: DataPath,
        /// Copy element data; when false the copied arrays are zero-filled
        #[serde(default = "default_copy_data")]
        copy_data: bool,
    },
}

fn default_copy_data() -> bool {
    true
}

/// Split a non-empty path into parent path and final name
fn split(path: &DataPath) -> StructuraResult<(DataPath, &str)> {
    match (path.parent(), path.name()) {
        (Some(parent), Some(name)) => Ok((parent, name)),
        _ => Err(StructuraError::invalid_parameter("path", "the empty path names no object")),
    }
}

fn array_bytes(array: &dyn AnyArray) -> u64 {
    let elements = (array.num_tuples() as u64).saturating_mul(array.num_components() as u64);
    match array.data_type() {
        Some(data_type) => elements.saturating_mul(data_type.size_of() as u64),
        None => 0,
    }
}

impl Action {
    /// Object the action targets or creates
    pub fn path(&self) -> &DataPath {
        match self {
            Action::CreateArray { path, .. }
            | Action::CreateStringArray { path, .. }
            | Action::CreateNeighborList { path, .. }
            | Action::CreateGroup { path }
            | Action::CreateAttributeMatrix { path, .. }
            | Action::CreateGeometry { path, .. }
            | Action::Rename { path, .. }
            | Action::Move { path, .. }
            | Action::Delete { path } => path,
            Action::Copy { destination, .. } => destination,
        }
    }

    /// One-line summary for logs
    pub fn description(&self) -> String {
        match self {
            Action::CreateArray {
                path,
                data_type,
                tuple_shape,
                component_shape,
            } => format!("create {} array {} {} x {}", data_type, path, tuple_shape, component_shape),
            Action::CreateStringArray { path, tuple_shape } => {
                format!("create string array {} {}", path, tuple_shape)
            }
            Action::CreateNeighborList {
                path,
                data_type,
                tuple_shape,
            } => format!("create {} neighbor list {} {}", data_type, path, tuple_shape),
            Action::CreateGroup { path } => format!("create group {}", path),
            Action::CreateAttributeMatrix { path, tuple_shape } => {
                format!("create attribute matrix {} {}", path, tuple_shape)
            }
            Action::CreateGeometry { path, geometry } => {
                format!("create {} geometry {}", geometry.kind(), path)
            }
            Action::Rename {
                path,
                new_name,
                allow_overwrite,
            } => format!(
                "rename {} to '{}'{}",
                path,
                new_name,
                if *allow_overwrite { " (overwrite)" } else { "" }
            ),
            Action::Move { path, new_parent } => {
                if new_parent.is_empty() {
                    format!("move {} to the top level", path)
                } else {
                    format!("move {} under {}", path, new_parent)
                }
            }
            Action::Delete { path } => format!("delete {}", path),
            Action::Copy {
                source,
                destination,
                copy_data,
            } => format!(
                "copy {} to {}{}",
                source,
                destination,
                if *copy_data { "" } else { " (structure only)" }
            ),
        }
    }

    /// Apply to `graph`
    ///
    /// # Errors
    ///
    /// Any graph error (`NotFound`, `NameConflict`, `ShapeMismatch`, ...)
    /// and, in execute mode, `CapacityExceeded` from the allocator.
    pub fn apply(&self, graph: &mut DataGraph, mode: ActionMode, allocator: &StorageAllocator) -> StructuraResult<()> {
        debug!(target: "structura::action", %mode, action = %self.description(), "Applying action");
        match self {
            Action::CreateArray {
                path,
                data_type,
                tuple_shape,
                component_shape,
            } => {
                let (parent, name) = split(path)?;
                request_bytes(*data_type, tuple_shape, component_shape)?;
                let placeholder = placeholder_array(*data_type, tuple_shape.clone(), component_shape.clone());
                let array = match mode {
                    ActionMode::Preflight => placeholder,
                    ActionMode::Execute => {
                        graph.validate_create(&parent, name, &ObjectKind::Array(placeholder))?;
                        allocator.allocate_array(*data_type, tuple_shape.clone(), component_shape.clone())?
                    }
                };
                graph.create_array(&parent, name, array)?;
            }
            Action::CreateStringArray { path, tuple_shape } => {
                let (parent, name) = split(path)?;
                let array = match mode {
                    ActionMode::Preflight => StringArray::placeholder(tuple_shape.clone()),
                    ActionMode::Execute => StringArray::new(tuple_shape.clone()),
                };
                graph.create_array(&parent, name, Box::new(array))?;
            }
            Action::CreateNeighborList {
                path,
                data_type,
                tuple_shape,
            } => {
                let (parent, name) = split(path)?;
                let array: Box<dyn AnyArray> = dispatch_data_type!(*data_type, T => match mode {
                    ActionMode::Preflight => {
                        Box::new(NeighborList::<T>::placeholder(tuple_shape.clone())) as Box<dyn AnyArray>
                    }
                    ActionMode::Execute => Box::new(NeighborList::<T>::new(tuple_shape.clone())) as Box<dyn AnyArray>,
                });
                graph.create_array(&parent, name, array)?;
            }
            Action::CreateGroup { path } => {
                let (parent, name) = split(path)?;
                graph.create_group(&parent, name)?;
            }
            Action::CreateAttributeMatrix { path, tuple_shape } => {
                let (parent, name) = split(path)?;
                graph.create_attribute_matrix(&parent, name, tuple_shape.clone())?;
            }
            Action::CreateGeometry { path, geometry } => {
                let (parent, name) = split(path)?;
                let geometry = geometry.resolve(graph)?;
                graph.create_geometry(&parent, name, geometry)?;
            }
            Action::Rename {
                path,
                new_name,
                allow_overwrite,
            } => graph.rename(path, new_name, *allow_overwrite)?,
            Action::Move { path, new_parent } => graph.move_to(path, new_parent)?,
            Action::Delete { path } => {
                graph.remove(path)?;
            }
            Action::Copy {
                source,
                destination,
                copy_data,
            } => {
                let (parent, name) = split(destination)?;
                match (mode, copy_data) {
                    (ActionMode::Preflight, _) => {
                        graph.deep_copy_with(source, &parent, name, |array| Ok(array.placeholder_boxed()))?;
                    }
                    (ActionMode::Execute, true) => {
                        let mut bytes = graph.any_array(source).map(array_bytes).unwrap_or(0);
                        for array_path in graph.descendant_paths(source, |t| t.is_array())? {
                            bytes = bytes.saturating_add(array_bytes(graph.any_array(&array_path)?));
                        }
                        allocator.reserve(bytes)?;
                        graph.deep_copy(source, &parent, name)?;
                    }
                    (ActionMode::Execute, false) => {
                        graph.deep_copy_with(source, &parent, name, |array| allocator.allocate_like(array))?;
                    }
                }
            }
        }
        Ok(())
    }
}
