//! Geometry descriptors
//!
//! A geometry is a group that describes a spatial grid or mesh. Grid
//! geometries carry their dimensions inline; node-based geometries point at a
//! shared vertex array (`float32`, 3 components) and, except for `Vertex`, a
//! connectivity array (`uint64`). Both pointers are non-owning [`DataId`]s:
//! the arrays may live anywhere in the graph.
//!
//! The per-element ("cell") attribute matrix and, for node-based kinds, the
//! vertex attribute matrix are recorded by name and looked up among the
//! geometry's own children.

use serde::{Deserialize, Serialize};
use std::fmt;
use structura_core::{DataId, Shape, StructuraError, StructuraResult};

/// Geometry subtype
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeometryKind {
    /// Uniform grid: dimensions, spacing, origin
    Image,
    /// Rectilinear grid with per-axis bounds arrays
    RectGrid,
    /// Point cloud
    Vertex,
    /// Line segments
    Edge,
    /// Triangle mesh
    Triangle,
    /// Quadrilateral mesh
    Quad,
    /// Tetrahedral mesh
    Tetrahedral,
    /// Hexahedral mesh
    Hexahedral,
}

impl GeometryKind {
    /// True for `Image` and `RectGrid`
    pub fn is_grid(&self) -> bool {
        matches!(self, GeometryKind::Image | GeometryKind::RectGrid)
    }

    /// Vertex indices per element, `None` for grids and point clouds
    pub fn connectivity_components(&self) -> Option<usize> {
        match self {
            GeometryKind::Image | GeometryKind::RectGrid | GeometryKind::Vertex => None,
            GeometryKind::Edge => Some(2),
            GeometryKind::Triangle => Some(3),
            GeometryKind::Quad | GeometryKind::Tetrahedral => Some(4),
            GeometryKind::Hexahedral => Some(8),
        }
    }

    /// Lowercase name
    pub fn name(&self) -> &'static str {
        match self {
            GeometryKind::Image => "image",
            GeometryKind::RectGrid => "rect_grid",
            GeometryKind::Vertex => "vertex",
            GeometryKind::Edge => "edge",
            GeometryKind::Triangle => "triangle",
            GeometryKind::Quad => "quad",
            GeometryKind::Tetrahedral => "tetrahedral",
            GeometryKind::Hexahedral => "hexahedral",
        }
    }
}

impl fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Uniform grid description, all arrays ordered x, y, z
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageGrid {
    /// Cells per axis
    pub dimensions: [usize; 3],
    /// Cell size per axis
    pub spacing: [f32; 3],
    /// Position of the first cell corner
    pub origin: [f32; 3],
}

impl ImageGrid {
    /// Grid with unit spacing at the origin
    pub fn new(dimensions: [usize; 3]) -> Self {
        Self {
            dimensions,
            spacing: [1.0; 3],
            origin: [0.0; 3],
        }
    }

    /// Tuple shape of the cell attribute matrix: `[z, y, x]`
    pub fn cell_shape(&self) -> Shape {
        let [x, y, z] = self.dimensions;
        Shape::from([z, y, x])
    }

    /// Total number of cells
    pub fn num_cells(&self) -> usize {
        self.dimensions.iter().product()
    }
}

/// Geometry object payload
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    kind: GeometryKind,
    image: Option<ImageGrid>,
    grid_dimensions: Option<[usize; 3]>,
    bounds: Option<[DataId; 3]>,
    vertices: Option<DataId>,
    connectivity: Option<DataId>,
    cell_data: String,
    vertex_data: Option<String>,
}

impl Geometry {
    /// Uniform grid geometry
    pub fn image(grid: ImageGrid, cell_data: impl Into<String>) -> Self {
        Self {
            kind: GeometryKind::Image,
            image: Some(grid),
            grid_dimensions: None,
            bounds: None,
            vertices: None,
            connectivity: None,
            cell_data: cell_data.into(),
            vertex_data: None,
        }
    }

    /// Rectilinear grid with x/y/z bounds arrays
    ///
    /// Each bounds array holds `dimension + 1` coordinates.
    pub fn rect_grid(dimensions: [usize; 3], bounds: [DataId; 3], cell_data: impl Into<String>) -> Self {
        Self {
            kind: GeometryKind::RectGrid,
            image: None,
            grid_dimensions: Some(dimensions),
            bounds: Some(bounds),
            vertices: None,
            connectivity: None,
            cell_data: cell_data.into(),
            vertex_data: None,
        }
    }

    /// Node-based geometry
    ///
    /// `connectivity` must be `None` for `Vertex` and present for every
    /// other node-based kind. Grid kinds are rejected.
    pub fn node_based(
        kind: GeometryKind,
        vertices: DataId,
        connectivity: Option<DataId>,
        cell_data: impl Into<String>,
        vertex_data: impl Into<String>,
    ) -> StructuraResult<Self> {
        if kind.is_grid() {
            return Err(StructuraError::invalid_operation(format!(
                "{} is a grid geometry, not node-based",
                kind
            )));
        }
        if kind.connectivity_components().is_some() != connectivity.is_some() {
            return Err(StructuraError::invalid_operation(format!(
                "{} geometry {} a connectivity list",
                kind,
                if connectivity.is_some() {
                    "does not take"
                } else {
                    "requires"
                }
            )));
        }
        Ok(Self {
            kind,
            image: None,
            grid_dimensions: None,
            bounds: None,
            vertices: Some(vertices),
            connectivity,
            cell_data: cell_data.into(),
            vertex_data: Some(vertex_data.into()),
        })
    }

    /// Subtype
    pub fn kind(&self) -> GeometryKind {
        self.kind
    }

    /// Uniform grid parameters (`Image` only)
    pub fn image_grid(&self) -> Option<&ImageGrid> {
        self.image.as_ref()
    }

    /// Cells per axis for grid kinds
    pub fn grid_dimensions(&self) -> Option<[usize; 3]> {
        match &self.image {
            Some(grid) => Some(grid.dimensions),
            None => self.grid_dimensions,
        }
    }

    /// Bounds arrays (`RectGrid` only)
    pub fn bounds(&self) -> Option<[DataId; 3]> {
        self.bounds
    }

    /// Shared vertex list
    pub fn vertices(&self) -> Option<DataId> {
        self.vertices
    }

    /// Element connectivity list
    pub fn connectivity(&self) -> Option<DataId> {
        self.connectivity
    }

    /// Name of the cell attribute matrix child
    pub fn cell_data(&self) -> &str {
        &self.cell_data
    }

    /// Name of the vertex attribute matrix child
    pub fn vertex_data(&self) -> Option<&str> {
        self.vertex_data.as_deref()
    }

    pub(crate) fn rename_attribute_matrix(&mut self, old: &str, new: &str) {
        if self.cell_data == old {
            self.cell_data = new.to_string();
        }
        if self.vertex_data.as_deref() == Some(old) {
            self.vertex_data = Some(new.to_string());
        }
    }

    /// Every non-owning reference this geometry holds
    pub fn references(&self) -> Vec<DataId> {
        let mut refs = Vec::new();
        if let Some(bounds) = self.bounds {
            refs.extend(bounds);
        }
        refs.extend(self.vertices);
        refs.extend(self.connectivity);
        refs
    }

    /// Rewrite references through `map`; ids it does not know stay as they are
    pub fn remap(&mut self, map: impl Fn(DataId) -> Option<DataId>) {
        let apply = |id: DataId| map(id).unwrap_or(id);
        if let Some(bounds) = self.bounds.as_mut() {
            for id in bounds.iter_mut() {
                *id = apply(*id);
            }
        }
        self.vertices = self.vertices.map(apply);
        self.connectivity = self.connectivity.map(apply);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_cell_shape_is_zyx() {
        let grid = ImageGrid::new([4, 3, 2]);
        assert_eq!(grid.cell_shape(), Shape::from([2, 3, 4]));
        assert_eq!(grid.num_cells(), 24);
    }

    #[test]
    fn node_based_checks_connectivity_presence() {
        let v = DataId::new(1);
        let c = DataId::new(2);
        assert!(Geometry::node_based(GeometryKind::Triangle, v, Some(c), "Faces", "Verts").is_ok());
        assert!(Geometry::node_based(GeometryKind::Triangle, v, None, "Faces", "Verts").is_err());
        assert!(Geometry::node_based(GeometryKind::Vertex, v, Some(c), "Cells", "Verts").is_err());
        assert!(Geometry::node_based(GeometryKind::Image, v, None, "Cells", "Verts").is_err());
    }

    #[test]
    fn remap_rewrites_known_ids_only() {
        let mut geom = Geometry::rect_grid(
            [1, 1, 1],
            [DataId::new(1), DataId::new(2), DataId::new(3)],
            "Cells",
        );
        geom.remap(|id| (id == DataId::new(2)).then(|| DataId::new(20)));
        assert_eq!(
            geom.references(),
            vec![DataId::new(1), DataId::new(20), DataId::new(3)]
        );
    }
}
