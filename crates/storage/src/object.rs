//! Data graph nodes

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use structura_core::{DataId, Shape};

use crate::array::{AnyArray, ArrayKind};
use crate::geometry::{Geometry, GeometryKind};

/// Concrete kind tag of a [`DataObject`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectType {
    /// Plain group
    Group,
    /// Group whose arrays share one tuple shape
    AttributeMatrix,
    /// Uniform grid geometry
    ImageGeom,
    /// Rectilinear grid geometry
    RectGridGeom,
    /// Point cloud geometry
    VertexGeom,
    /// Edge mesh geometry
    EdgeGeom,
    /// Triangle mesh geometry
    TriangleGeom,
    /// Quad mesh geometry
    QuadGeom,
    /// Tetrahedral mesh geometry
    TetrahedralGeom,
    /// Hexahedral mesh geometry
    HexahedralGeom,
    /// Fixed-width numeric array
    DataArray,
    /// Variable-length list array
    NeighborList,
    /// String array
    StringArray,
}

impl ObjectType {
    /// True for every geometry subtype
    pub fn is_geometry(&self) -> bool {
        matches!(
            self,
            ObjectType::ImageGeom
                | ObjectType::RectGridGeom
                | ObjectType::VertexGeom
                | ObjectType::EdgeGeom
                | ObjectType::TriangleGeom
                | ObjectType::QuadGeom
                | ObjectType::TetrahedralGeom
                | ObjectType::HexahedralGeom
        )
    }

    /// True for every array flavor
    pub fn is_array(&self) -> bool {
        matches!(
            self,
            ObjectType::DataArray | ObjectType::NeighborList | ObjectType::StringArray
        )
    }

    /// True if objects of this type may own children
    pub fn is_container(&self) -> bool {
        !self.is_array()
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl From<GeometryKind> for ObjectType {
    fn from(kind: GeometryKind) -> Self {
        match kind {
            GeometryKind::Image => ObjectType::ImageGeom,
            GeometryKind::RectGrid => ObjectType::RectGridGeom,
            GeometryKind::Vertex => ObjectType::VertexGeom,
            GeometryKind::Edge => ObjectType::EdgeGeom,
            GeometryKind::Triangle => ObjectType::TriangleGeom,
            GeometryKind::Quad => ObjectType::QuadGeom,
            GeometryKind::Tetrahedral => ObjectType::TetrahedralGeom,
            GeometryKind::Hexahedral => ObjectType::HexahedralGeom,
        }
    }
}

/// Payload of a [`DataObject`]
#[derive(Debug)]
pub enum ObjectKind {
    /// Plain group
    Group,
    /// Attribute matrix with the tuple shape every child array must share
    AttributeMatrix {
        /// Shared tuple shape
        tuple_shape: Shape,
    },
    /// Geometry descriptor
    Geometry(Geometry),
    /// Any array flavor
    Array(Box<dyn AnyArray>),
}

impl ObjectKind {
    /// Kind tag
    pub fn object_type(&self) -> ObjectType {
        match self {
            ObjectKind::Group => ObjectType::Group,
            ObjectKind::AttributeMatrix { .. } => ObjectType::AttributeMatrix,
            ObjectKind::Geometry(geom) => geom.kind().into(),
            ObjectKind::Array(array) => match array.array_kind() {
                ArrayKind::Data => ObjectType::DataArray,
                ArrayKind::NeighborList => ObjectType::NeighborList,
                ArrayKind::String => ObjectType::StringArray,
            },
        }
    }

    pub(crate) fn placeholder(&self) -> ObjectKind {
        match self {
            ObjectKind::Array(array) => ObjectKind::Array(array.placeholder_boxed()),
            other => other.clone_structure(),
        }
    }

    pub(crate) fn try_clone(&self) -> structura_core::StructuraResult<ObjectKind> {
        match self {
            ObjectKind::Array(array) => Ok(ObjectKind::Array(array.try_clone_boxed()?)),
            other => Ok(other.clone_structure()),
        }
    }

    fn clone_structure(&self) -> ObjectKind {
        match self {
            ObjectKind::Group => ObjectKind::Group,
            ObjectKind::AttributeMatrix { tuple_shape } => ObjectKind::AttributeMatrix {
                tuple_shape: tuple_shape.clone(),
            },
            ObjectKind::Geometry(geom) => ObjectKind::Geometry(geom.clone()),
            ObjectKind::Array(array) => ObjectKind::Array(array.placeholder_boxed()),
        }
    }
}

/// One node in the data graph
#[derive(Debug)]
pub struct DataObject {
    pub(crate) id: DataId,
    pub(crate) name: String,
    pub(crate) parent: Option<DataId>,
    pub(crate) children: BTreeMap<String, DataId>,
    pub(crate) kind: ObjectKind,
}

impl DataObject {
    /// Identity
    pub fn id(&self) -> DataId {
        self.id
    }

    /// Name, unique among siblings
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Owning parent, `None` for roots
    pub fn parent(&self) -> Option<DataId> {
        self.parent
    }

    /// Children by name
    pub fn children(&self) -> &BTreeMap<String, DataId> {
        &self.children
    }

    /// Payload
    pub fn kind(&self) -> &ObjectKind {
        &self.kind
    }

    /// Kind tag
    pub fn object_type(&self) -> ObjectType {
        self.kind.object_type()
    }

    /// Array payload, if this object is an array
    pub fn as_array(&self) -> Option<&dyn AnyArray> {
        match &self.kind {
            ObjectKind::Array(array) => Some(array.as_ref()),
            _ => None,
        }
    }

    /// Geometry payload, if this object is a geometry
    pub fn as_geometry(&self) -> Option<&Geometry> {
        match &self.kind {
            ObjectKind::Geometry(geom) => Some(geom),
            _ => None,
        }
    }

    /// Shared tuple shape, if this object is an attribute matrix
    pub fn attribute_matrix_shape(&self) -> Option<&Shape> {
        match &self.kind {
            ObjectKind::AttributeMatrix { tuple_shape } => Some(tuple_shape),
            _ => None,
        }
    }
}
