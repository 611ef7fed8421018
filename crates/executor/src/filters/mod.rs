//! Built-in filters
//!
//! These exercise the filter contract end to end. Each module holds one
//! filter:
//!
//! | Module | Filter | Touches data |
//! |--------|--------|--------------|
//! | `create_data_group` | [`CreateDataGroup`] | no |
//! | `create_attribute_matrix` | [`CreateAttributeMatrix`] | no |
//! | `create_data_array` | [`CreateDataArray`] | optional fill |
//! | `create_image_geometry` | [`CreateImageGeometry`] | no |
//! | `copy_data_object` | [`CopyDataObject`] | copies arrays on the task runner |
//! | `rename_data_object` | [`RenameDataObject`] | no |
//! | `move_data` | [`MoveData`] | no |
//! | `delete_data` | [`DeleteData`] | no |
//! | `scalar_arithmetic` | [`ScalarArithmetic`] | parallel range kernel |

mod copy_data_object;
mod create_attribute_matrix;
mod create_data_array;
mod create_data_group;
mod create_image_geometry;
mod delete_data;
mod move_data;
mod rename_data_object;
mod scalar_arithmetic;

pub use copy_data_object::CopyDataObject;
pub use create_attribute_matrix::CreateAttributeMatrix;
pub use create_data_array::{parse_fill_value, CreateDataArray};
pub use create_data_group::CreateDataGroup;
pub use create_image_geometry::CreateImageGeometry;
pub use delete_data::{DeleteData, DELETE_COVERED};
pub use move_data::{MoveData, MOVE_IS_NOOP};
pub use rename_data_object::{RenameDataObject, RENAME_OVERWRITES};
pub use scalar_arithmetic::{ArithmeticOperation, ScalarArithmetic, DIVIDE_BY_ZERO};

use structura_storage::ObjectType;

use crate::filter::Filter;
use crate::registry::FilterFactory;

/// Factories for every built-in filter
pub fn builtin_factories() -> Vec<FilterFactory> {
    vec![
        instance::<CreateDataGroup>,
        instance::<CreateAttributeMatrix>,
        instance::<CreateDataArray>,
        instance::<CreateImageGeometry>,
        instance::<CopyDataObject>,
        instance::<RenameDataObject>,
        instance::<MoveData>,
        instance::<DeleteData>,
        instance::<ScalarArithmetic>,
    ]
}

fn instance<F: Filter + Default + 'static>() -> Box<dyn Filter> {
    Box::new(F::default())
}

/// Object types that can hold children
pub(crate) const CONTAINERS: &[ObjectType] = &[
    ObjectType::Group,
    ObjectType::AttributeMatrix,
    ObjectType::ImageGeom,
    ObjectType::RectGridGeom,
    ObjectType::VertexGeom,
    ObjectType::EdgeGeom,
    ObjectType::TriangleGeom,
    ObjectType::QuadGeom,
    ObjectType::TetrahedralGeom,
    ObjectType::HexahedralGeom,
];
