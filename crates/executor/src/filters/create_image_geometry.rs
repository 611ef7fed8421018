use structura_core::{DataPath, Shape, StructuraError, StructuraResult};
use structura_engine::{Action, ActionPlan, GeometrySpec};
use structura_storage::{DataGraph, ImageGrid};

use crate::filter::{Filter, FilterId, PlanOutcome};
use crate::parameters::{Arguments, Parameter, ParameterKind, Parameters};

/// Creates an image geometry and its cell attribute matrix
///
/// The cell attribute matrix has tuple shape `[z, y, x]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CreateImageGeometry;

const AXES: [&str; 3] = ["x", "y", "z"];

fn positive(key: &str, label: &str) -> Parameter {
    Parameter::new(
        key,
        label,
        ParameterKind::Float {
            min: Some(f64::MIN_POSITIVE),
            max: None,
        },
        1.0,
    )
}

impl CreateImageGeometry {
    fn grid(args: &Arguments) -> StructuraResult<ImageGrid> {
        let dims = args.shape("dimensions")?;
        let dimensions: [usize; 3] = dims.dims().try_into().map_err(|_| {
            StructuraError::invalid_parameter("dimensions", format!("expected 3 dimensions (x, y, z), got {}", dims))
        })?;
        if dimensions.contains(&0) {
            return Err(StructuraError::invalid_parameter("dimensions", "every dimension must be at least 1"));
        }
        let mut grid = ImageGrid::new(dimensions);
        for (axis, name) in AXES.iter().enumerate() {
            grid.spacing[axis] = args.float(&format!("spacing_{}", name))? as f32;
            grid.origin[axis] = args.float(&format!("origin_{}", name))? as f32;
        }
        Ok(grid)
    }

    fn build(&self, args: &Arguments, outcome: &mut PlanOutcome) -> StructuraResult<ActionPlan> {
        let path = args.path("path")?.clone();
        let cell_data = args.string("cell_data_name")?.to_string();
        let grid = Self::grid(args)?;
        let cell_path: DataPath = path.join(&cell_data)?;

        outcome.push_preview("Cells", grid.num_cells());
        outcome.push_preview("Cell Data Shape", grid.cell_shape());
        let extent: Vec<String> = (0..3)
            .map(|axis| {
                let start = grid.origin[axis];
                let end = start + grid.spacing[axis] * grid.dimensions[axis] as f32;
                format!("{}: [{}, {}]", AXES[axis], start, end)
            })
            .collect();
        outcome.push_preview("Bounds", extent.join(", "));

        let tuple_shape: Shape = grid.cell_shape();
        Ok(ActionPlan::from(vec![
            Action::CreateGeometry {
                path,
                geometry: GeometrySpec::Image {
                    grid,
                    cell_data,
                },
            },
            Action::CreateAttributeMatrix {
                path: cell_path,
                tuple_shape,
            },
        ]))
    }
}

impl Filter for CreateImageGeometry {
    fn name(&self) -> &'static str {
        "create_image_geometry"
    }

    fn uuid(&self) -> FilterId {
        FilterId::from_u128(0xc40f1e2a_95b7_4d36_8e0c_3f9a6b2d1e04)
    }

    fn human_name(&self) -> &'static str {
        "Create Image Geometry"
    }

    fn parameters(&self) -> Parameters {
        let mut params = Parameters::new();
        params.insert(Parameter::created_path("path", "Geometry Path"));
        params.insert(Parameter::shape("dimensions", "Dimensions (x, y, z)", Shape::from([1, 1, 1])));
        for axis in AXES {
            params.insert(positive(&format!("spacing_{}", axis), &format!("Spacing {}", axis)));
        }
        for axis in AXES {
            params.insert(Parameter::float(&format!("origin_{}", axis), &format!("Origin {}", axis), 0.0));
        }
        params.insert(Parameter::string("cell_data_name", "Cell Data Name", "Cell Data"));
        params
    }

    fn plan(&self, _graph: &DataGraph, args: &Arguments) -> PlanOutcome {
        let mut outcome = PlanOutcome::default();
        match self.build(args, &mut outcome) {
            Ok(plan) => outcome.plan = plan,
            Err(e) => outcome.push_error(e),
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validated(args: Arguments) -> Arguments {
        CreateImageGeometry.parameters().validate(&args).result.unwrap()
    }

    #[test]
    fn cell_matrix_is_z_y_x() {
        let args = validated(
            Arguments::new()
                .with("path", DataPath::parse("Image").unwrap())
                .with("dimensions", Shape::from([4, 3, 2]))
                .with("spacing_x", 0.5),
        );
        let outcome = CreateImageGeometry.plan(&DataGraph::new(), &args);
        assert!(outcome.is_ok(), "{:?}", outcome.errors);
        match &outcome.plan.actions[1] {
            Action::CreateAttributeMatrix { path, tuple_shape } => {
                assert_eq!(path.to_string(), "Image/Cell Data");
                assert_eq!(tuple_shape, &Shape::from([2, 3, 4]));
            }
            other => panic!("unexpected action {:?}", other),
        }
        let bounds = outcome.preview.iter().find(|p| p.name == "Bounds").unwrap();
        assert!(bounds.value.starts_with("x: [0, 2]"));
    }

    #[test]
    fn dimensions_need_three_axes() {
        let args = validated(
            Arguments::new()
                .with("path", DataPath::parse("Image").unwrap())
                .with("dimensions", Shape::from([4, 3])),
        );
        assert!(!CreateImageGeometry.plan(&DataGraph::new(), &args).is_ok());
    }

    #[test]
    fn spacing_must_be_positive() {
        let args = Arguments::new()
            .with("path", DataPath::parse("Image").unwrap())
            .with("spacing_y", 0.0);
        assert!(!CreateImageGeometry.parameters().validate(&args).is_ok());
    }
}
