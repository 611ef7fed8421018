//! Hierarchical data graph
//!
//! The graph is an arena of [`DataObject`]s keyed by [`DataId`]. Ownership
//! edges are stored twice (the child's `parent` id and the parent's
//! name → id map); every mutation updates both sides or neither.
//!
//! # Invariants
//!
//! - Sibling names are unique; root names are unique among roots.
//! - Ids are allocated from a monotonic counter and never reused.
//! - Every array owned by an attribute matrix has the matrix's tuple shape.
//! - A geometry's non-owning references resolve to live arrays of the right
//!   type. Removing a subtree that is referenced from outside of it fails
//!   with `InUse`; references held from inside the subtree vanish with it.
//!
//! Every fallible mutation performs all of its checks before touching the
//! arena, so an `Err` leaves the graph unchanged.

use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeMap;
use structura_core::{
    validate_name, DataId, DataPath, DataType, Element, Shape, StructuraError, StructuraResult,
};
use tracing::debug;

use crate::array::{AnyArray, ArrayKind, DataArray};
use crate::geometry::{Geometry, GeometryKind};
use crate::neighbor_list::NeighborList;
use crate::object::{DataObject, ObjectKind, ObjectType};
use crate::string_array::StringArray;

/// Structural description of one object, independent of its element data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSummary {
    /// Location
    pub path: DataPath,
    /// Kind tag
    pub object_type: ObjectType,
    /// Element type, arrays only
    pub data_type: Option<DataType>,
    /// Tuple shape for arrays and attribute matrices
    pub tuple_shape: Option<Shape>,
    /// Component shape, arrays only
    pub component_shape: Option<Shape>,
}

/// Arena-backed object forest addressed by [`DataPath`]
#[derive(Debug)]
pub struct DataGraph {
    objects: FxHashMap<DataId, DataObject>,
    roots: BTreeMap<String, DataId>,
    next_id: u64,
}

impl Default for DataGraph {
    fn default() -> Self {
        Self::new()
    }
}

fn not_an_array(id: DataId) -> StructuraError {
    StructuraError::invalid_operation(format!("object {} is not an array", id))
}

fn type_mismatch(path: &DataPath, expected: impl Into<String>, actual: impl Into<String>) -> StructuraError {
    StructuraError::TypeMismatch {
        path: path.clone(),
        expected: expected.into(),
        actual: actual.into(),
    }
}

impl DataGraph {
    /// Empty graph
    pub fn new() -> Self {
        Self {
            objects: FxHashMap::default(),
            roots: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Number of objects
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// True if the graph holds no objects
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// True if `path` resolves
    pub fn contains(&self, path: &DataPath) -> bool {
        self.resolve_id(path).is_ok()
    }

    /// Every object, in no particular order
    pub fn objects(&self) -> impl Iterator<Item = &DataObject> {
        self.objects.values()
    }

    /// Object by id
    pub fn get(&self, id: DataId) -> StructuraResult<&DataObject> {
        self.objects
            .get(&id)
            .ok_or(StructuraError::IdNotFound { id: id.as_u64() })
    }

    fn get_mut(&mut self, id: DataId) -> StructuraResult<&mut DataObject> {
        self.objects
            .get_mut(&id)
            .ok_or(StructuraError::IdNotFound { id: id.as_u64() })
    }

    fn allocate_id(&mut self) -> DataId {
        let id = DataId::new(self.next_id);
        self.next_id += 1;
        id
    }

    // ========================================================================
    // Addressing
    // ========================================================================

    /// Id of the object at `path`
    pub fn resolve_id(&self, path: &DataPath) -> StructuraResult<DataId> {
        let mut segments = path.segments().iter();
        let first = segments
            .next()
            .ok_or_else(|| StructuraError::not_found(path))?;
        let mut current = *self
            .roots
            .get(first)
            .ok_or_else(|| StructuraError::not_found(path))?;
        for segment in segments {
            current = *self
                .objects
                .get(&current)
                .and_then(|object| object.children.get(segment))
                .ok_or_else(|| StructuraError::not_found(path))?;
        }
        Ok(current)
    }

    /// Object at `path`
    pub fn resolve(&self, path: &DataPath) -> StructuraResult<&DataObject> {
        self.get(self.resolve_id(path)?)
    }

    /// Current path of `id`
    pub fn path_of(&self, id: DataId) -> StructuraResult<DataPath> {
        let mut names = Vec::new();
        let mut current = Some(id);
        while let Some(cur) = current {
            let object = self.get(cur)?;
            names.push(object.name.clone());
            current = object.parent;
        }
        names.reverse();
        DataPath::from_segments(names)
    }

    /// `None` for the empty (top-level) path, otherwise the resolved id
    fn container_id(&self, path: &DataPath) -> StructuraResult<Option<DataId>> {
        if path.is_empty() {
            return Ok(None);
        }
        self.resolve_id(path).map(Some)
    }

    fn siblings(&self, parent: Option<DataId>) -> StructuraResult<&BTreeMap<String, DataId>> {
        match parent {
            None => Ok(&self.roots),
            Some(id) => Ok(&self.get(id)?.children),
        }
    }

    fn siblings_mut(&mut self, parent: Option<DataId>) -> StructuraResult<&mut BTreeMap<String, DataId>> {
        match parent {
            None => Ok(&mut self.roots),
            Some(id) => Ok(&mut self.get_mut(id)?.children),
        }
    }

    // ========================================================================
    // Validation
    // ========================================================================

    /// Check that an object of `kind` may live at `path` under `parent`
    fn check_placement(
        &self,
        parent: Option<DataId>,
        kind: &ObjectKind,
        path: &DataPath,
    ) -> StructuraResult<()> {
        let Some(parent_id) = parent else {
            return Ok(());
        };
        let parent = self.get(parent_id)?;
        match &parent.kind {
            ObjectKind::Array(_) => Err(StructuraError::invalid_operation(format!(
                "{} is an array and cannot own children",
                self.path_of(parent_id)?
            ))),
            ObjectKind::AttributeMatrix { tuple_shape } => match kind {
                ObjectKind::Array(array) if array.tuple_shape() == tuple_shape => Ok(()),
                ObjectKind::Array(array) => Err(StructuraError::ShapeMismatch {
                    path: path.clone(),
                    expected: tuple_shape.clone(),
                    actual: array.tuple_shape().clone(),
                }),
                other => Err(StructuraError::invalid_operation(format!(
                    "attribute matrix children must be arrays, not {}",
                    other.object_type()
                ))),
            },
            ObjectKind::Geometry(geom) => {
                let ObjectKind::AttributeMatrix { tuple_shape } = kind else {
                    return Ok(());
                };
                let name = path.name().unwrap_or_default();
                let expected = if name == geom.cell_data() {
                    self.geometry_cell_shape(geom)
                } else if geom.vertex_data() == Some(name) {
                    self.array_tuple_count(geom.vertices())
                } else {
                    None
                };
                match expected {
                    Some(expected) if &expected != tuple_shape => Err(StructuraError::ShapeMismatch {
                        path: path.clone(),
                        expected,
                        actual: tuple_shape.clone(),
                    }),
                    _ => Ok(()),
                }
            }
            ObjectKind::Group => Ok(()),
        }
    }

    fn array_tuple_count(&self, id: Option<DataId>) -> Option<Shape> {
        id.and_then(|id| self.objects.get(&id))
            .and_then(DataObject::as_array)
            .map(|array| Shape::scalar(array.num_tuples()))
    }

    /// Tuple shape the cell attribute matrix of `geom` must have
    fn geometry_cell_shape(&self, geom: &Geometry) -> Option<Shape> {
        match geom.kind() {
            GeometryKind::Image => geom.image_grid().map(|grid| grid.cell_shape()),
            GeometryKind::RectGrid => geom
                .grid_dimensions()
                .map(|[x, y, z]| Shape::from([z, y, x])),
            GeometryKind::Vertex => self.array_tuple_count(geom.vertices()),
            _ => self.array_tuple_count(geom.connectivity()),
        }
    }

    fn check_reference_array(
        &self,
        id: DataId,
        data_type: DataType,
        components: usize,
    ) -> StructuraResult<&dyn AnyArray> {
        let object = self.get(id)?;
        let path = self.path_of(id)?;
        let array = match object.as_array() {
            Some(array) if array.array_kind() == ArrayKind::Data => array,
            _ => return Err(type_mismatch(&path, data_type.name(), object.object_type().to_string())),
        };
        if array.data_type() != Some(data_type) {
            return Err(type_mismatch(&path, data_type.name(), array.type_name()));
        }
        if array.num_components() != components {
            return Err(StructuraError::ShapeMismatch {
                path,
                expected: Shape::scalar(components),
                actual: array.component_shape().clone(),
            });
        }
        Ok(array)
    }

    fn validate_geometry(&self, geom: &Geometry) -> StructuraResult<()> {
        validate_name(geom.cell_data())?;
        if let Some(name) = geom.vertex_data() {
            validate_name(name)?;
        }
        if let Some(vertices) = geom.vertices() {
            self.check_reference_array(vertices, DataType::Float32, 3)?;
        }
        if let (Some(connectivity), Some(width)) =
            (geom.connectivity(), geom.kind().connectivity_components())
        {
            self.check_reference_array(connectivity, DataType::UInt64, width)?;
        }
        if let (Some(bounds), Some(dims)) = (geom.bounds(), geom.grid_dimensions()) {
            for (axis, id) in bounds.iter().enumerate() {
                let array = self.check_reference_array(*id, DataType::Float32, 1)?;
                if array.num_tuples() != dims[axis] + 1 {
                    return Err(StructuraError::ShapeMismatch {
                        path: self.path_of(*id)?,
                        expected: Shape::scalar(dims[axis] + 1),
                        actual: array.tuple_shape().clone(),
                    });
                }
            }
        }
        Ok(())
    }

    // ========================================================================
    // Creation
    // ========================================================================

    /// Run every check [`create`](Self::create) performs without mutating
    ///
    /// Returns the parent id (`None` for a root) and the new object's path.
    pub fn validate_create(
        &self,
        parent: &DataPath,
        name: &str,
        kind: &ObjectKind,
    ) -> StructuraResult<(Option<DataId>, DataPath)> {
        validate_name(name)?;
        let parent_id = self.container_id(parent)?;
        let path = parent.join(name)?;
        if self.siblings(parent_id)?.contains_key(name) {
            return Err(StructuraError::NameConflict {
                parent: parent.clone(),
                name: name.to_string(),
            });
        }
        self.check_placement(parent_id, kind, &path)?;
        if let ObjectKind::Geometry(geom) = kind {
            self.validate_geometry(geom)?;
        }
        Ok((parent_id, path))
    }

    /// Create an object named `name` under `parent` (the empty path for a root)
    pub fn create(&mut self, parent: &DataPath, name: &str, kind: ObjectKind) -> StructuraResult<DataId> {
        let (parent_id, path) = self.validate_create(parent, name, &kind)?;
        let id = self.allocate_id();
        let object_type = kind.object_type();
        self.siblings_mut(parent_id)?.insert(name.to_string(), id);
        self.objects.insert(
            id,
            DataObject {
                id,
                name: name.to_string(),
                parent: parent_id,
                children: BTreeMap::new(),
                kind,
            },
        );
        debug!(target: "structura::graph", %path, %id, kind = %object_type, "Created data object");
        Ok(id)
    }

    /// Create a plain group
    pub fn create_group(&mut self, parent: &DataPath, name: &str) -> StructuraResult<DataId> {
        self.create(parent, name, ObjectKind::Group)
    }

    /// Create an attribute matrix with the given tuple shape
    pub fn create_attribute_matrix(
        &mut self,
        parent: &DataPath,
        name: &str,
        tuple_shape: Shape,
    ) -> StructuraResult<DataId> {
        self.create(parent, name, ObjectKind::AttributeMatrix { tuple_shape })
    }

    /// Create a geometry; its references must already resolve
    pub fn create_geometry(&mut self, parent: &DataPath, name: &str, geometry: Geometry) -> StructuraResult<DataId> {
        self.create(parent, name, ObjectKind::Geometry(geometry))
    }

    /// Insert an array object
    pub fn create_array(
        &mut self,
        parent: &DataPath,
        name: &str,
        array: Box<dyn AnyArray>,
    ) -> StructuraResult<DataId> {
        self.create(parent, name, ObjectKind::Array(array))
    }

    // ========================================================================
    // Iteration
    // ========================================================================

    /// Direct children of `path` in name order; the empty path lists roots
    pub fn children(&self, path: &DataPath) -> StructuraResult<Vec<&DataObject>> {
        let parent = self.container_id(path)?;
        self.siblings(parent)?
            .values()
            .map(|id| self.get(*id))
            .collect()
    }

    /// Paths of every descendant of `path` whose type satisfies `filter`
    ///
    /// Depth-first, children in name order, `path` itself excluded.
    pub fn descendant_paths(
        &self,
        path: &DataPath,
        filter: impl Fn(ObjectType) -> bool,
    ) -> StructuraResult<Vec<DataPath>> {
        let parent = self.container_id(path)?;
        let mut out = Vec::new();
        let mut stack: Vec<(DataId, DataPath)> = Vec::new();
        for (name, id) in self.siblings(parent)?.iter().rev() {
            stack.push((*id, path.join(name)?));
        }
        while let Some((id, current)) = stack.pop() {
            let object = self.get(id)?;
            for (name, child) in object.children.iter().rev() {
                stack.push((*child, current.join(name)?));
            }
            if filter(object.object_type()) {
                out.push(current);
            }
        }
        Ok(out)
    }

    /// Every path in the graph
    pub fn paths(&self) -> StructuraResult<Vec<DataPath>> {
        self.descendant_paths(&DataPath::empty(), |_| true)
    }

    /// Structural listing of every object, sorted by path
    pub fn structure(&self) -> StructuraResult<Vec<ObjectSummary>> {
        let mut out = Vec::with_capacity(self.objects.len());
        for path in self.paths()? {
            let object = self.resolve(&path)?;
            let (data_type, tuple_shape, component_shape) = match &object.kind {
                ObjectKind::Array(array) => (
                    array.data_type(),
                    Some(array.tuple_shape().clone()),
                    Some(array.component_shape().clone()),
                ),
                ObjectKind::AttributeMatrix { tuple_shape } => (None, Some(tuple_shape.clone()), None),
                _ => (None, None, None),
            };
            out.push(ObjectSummary {
                path,
                object_type: object.object_type(),
                data_type,
                tuple_shape,
                component_shape,
            });
        }
        out.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(out)
    }

    /// `id` and every object it transitively owns
    fn subtree_ids(&self, id: DataId) -> Vec<DataId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            if let Some(object) = self.objects.get(&current) {
                stack.extend(object.children.values().copied());
            }
        }
        out
    }

    /// Geometries holding a non-owning reference to `id`
    pub fn referrers(&self, id: DataId) -> Vec<DataId> {
        let mut out: Vec<DataId> = self
            .objects
            .values()
            .filter(|object| {
                object
                    .as_geometry()
                    .map(|geom| geom.references().contains(&id))
                    .unwrap_or(false)
            })
            .map(|object| object.id)
            .collect();
        out.sort();
        out
    }

    // ========================================================================
    // Removal, rename, move
    // ========================================================================

    /// Remove `path` and everything it owns, returning the removed paths
    pub fn remove(&mut self, path: &DataPath) -> StructuraResult<Vec<DataPath>> {
        let id = self.resolve_id(path)?;
        self.remove_by_id(id)
    }

    /// Remove `id` and everything it owns, returning the removed paths
    pub fn remove_by_id(&mut self, id: DataId) -> StructuraResult<Vec<DataPath>> {
        let root_path = self.path_of(id)?;
        let subtree: FxHashSet<DataId> = self.subtree_ids(id).into_iter().collect();

        let mut blocked: Vec<(DataId, DataId)> = Vec::new();
        for (other, object) in &self.objects {
            if subtree.contains(other) {
                continue;
            }
            if let Some(geom) = object.as_geometry() {
                for target in geom.references() {
                    if subtree.contains(&target) {
                        blocked.push((*other, target));
                    }
                }
            }
        }
        blocked.sort();
        if let Some((referrer, target)) = blocked.first() {
            return Err(StructuraError::InUse {
                path: self.path_of(*target)?,
                referrer: self.path_of(*referrer)?,
            });
        }

        let mut removed = Vec::with_capacity(subtree.len());
        for member in &subtree {
            removed.push(self.path_of(*member)?);
        }
        removed.sort();

        let (parent, name) = {
            let object = self.get(id)?;
            (object.parent, object.name.clone())
        };
        self.siblings_mut(parent)?.remove(&name);
        for member in &subtree {
            self.objects.remove(member);
        }
        debug!(target: "structura::graph", path = %root_path, count = removed.len(), "Removed data object subtree");
        Ok(removed)
    }

    /// Rename the object at `path`
    ///
    /// With `allow_overwrite`, an existing sibling named `new_name` is removed
    /// first (subject to the same reference check as [`remove`](Self::remove));
    /// otherwise a clash fails with `NameConflict`. Renaming a geometry's
    /// attribute matrix updates the name the geometry records.
    pub fn rename(&mut self, path: &DataPath, new_name: &str, allow_overwrite: bool) -> StructuraResult<()> {
        validate_name(new_name)?;
        let id = self.resolve_id(path)?;
        let (parent, old_name) = {
            let object = self.get(id)?;
            (object.parent, object.name.clone())
        };
        if old_name == new_name {
            return Ok(());
        }
        let parent_path = path.parent().unwrap_or_else(DataPath::empty);
        let new_path = parent_path.join(new_name)?;
        self.check_placement(parent, &self.get(id)?.kind, &new_path)?;

        if let Some(existing) = self.siblings(parent)?.get(new_name).copied() {
            if !allow_overwrite {
                return Err(StructuraError::NameConflict {
                    parent: parent_path,
                    name: new_name.to_string(),
                });
            }
            self.remove_by_id(existing)?;
        }

        let siblings = self.siblings_mut(parent)?;
        siblings.remove(&old_name);
        siblings.insert(new_name.to_string(), id);
        self.get_mut(id)?.name = new_name.to_string();
        if let Some(parent_id) = parent {
            if let ObjectKind::Geometry(geom) = &mut self.get_mut(parent_id)?.kind {
                geom.rename_attribute_matrix(&old_name, new_name);
            }
        }
        debug!(target: "structura::graph", from = %path, to = %new_path, "Renamed data object");
        Ok(())
    }

    /// Re-parent the object at `path` under `new_parent`
    pub fn move_to(&mut self, path: &DataPath, new_parent: &DataPath) -> StructuraResult<()> {
        let id = self.resolve_id(path)?;
        if new_parent.starts_with(path) {
            return Err(StructuraError::CyclicMove {
                path: path.clone(),
                target: new_parent.clone(),
            });
        }
        let target = self.container_id(new_parent)?;
        let (old_parent, name) = {
            let object = self.get(id)?;
            (object.parent, object.name.clone())
        };
        if old_parent == target {
            return Ok(());
        }
        if self.siblings(target)?.contains_key(&name) {
            return Err(StructuraError::NameConflict {
                parent: new_parent.clone(),
                name,
            });
        }
        let new_path = new_parent.join(&name)?;
        self.check_placement(target, &self.get(id)?.kind, &new_path)?;

        self.siblings_mut(old_parent)?.remove(&name);
        self.siblings_mut(target)?.insert(name, id);
        self.get_mut(id)?.parent = target;
        debug!(target: "structura::graph", from = %path, to = %new_path, "Moved data object");
        Ok(())
    }

    // ========================================================================
    // Typed access
    // ========================================================================

    /// Array at `path`, any flavor
    pub fn any_array(&self, path: &DataPath) -> StructuraResult<&dyn AnyArray> {
        let object = self.resolve(path)?;
        object
            .as_array()
            .ok_or_else(|| type_mismatch(path, "array", object.object_type().to_string()))
    }

    /// Mutable array at `path`, any flavor
    pub fn any_array_mut(&mut self, path: &DataPath) -> StructuraResult<&mut dyn AnyArray> {
        let id = self.resolve_id(path)?;
        let object = self.get_mut(id)?;
        let object_type = object.object_type();
        match &mut object.kind {
            ObjectKind::Array(array) => Ok(&mut **array),
            _ => Err(type_mismatch(path, "array", object_type.to_string())),
        }
    }

    /// Borrow `(source, destination)` array pairs at once
    ///
    /// A source may appear in several pairs. Every destination must be
    /// distinct and must not also be a source.
    pub fn array_pairs_mut(
        &mut self,
        pairs: &[(DataId, DataId)],
    ) -> StructuraResult<Vec<(&dyn AnyArray, &mut dyn AnyArray)>> {
        let mut source_ids = FxHashSet::default();
        let mut dest_index = FxHashMap::default();
        for (i, (source, dest)) in pairs.iter().enumerate() {
            self.get(*source)?;
            self.get(*dest)?;
            source_ids.insert(*source);
            if dest_index.insert(*dest, i).is_some() {
                return Err(StructuraError::invalid_operation(format!(
                    "object {} appears twice as a copy destination",
                    dest
                )));
            }
        }
        if let Some(id) = dest_index.keys().find(|id| source_ids.contains(*id)) {
            return Err(StructuraError::invalid_operation(format!(
                "object {} is both a copy source and a destination",
                id
            )));
        }

        let mut sources: FxHashMap<DataId, &dyn AnyArray> = FxHashMap::default();
        let mut dests: Vec<Option<&mut dyn AnyArray>> = (0..pairs.len()).map(|_| None).collect();
        for (id, object) in self.objects.iter_mut() {
            if let Some(&i) = dest_index.get(id) {
                match &mut object.kind {
                    ObjectKind::Array(array) => dests[i] = Some(&mut **array),
                    _ => return Err(not_an_array(*id)),
                }
            } else if source_ids.contains(id) {
                match &object.kind {
                    ObjectKind::Array(array) => {
                        sources.insert(*id, &**array);
                    }
                    _ => return Err(not_an_array(*id)),
                }
            }
        }

        pairs
            .iter()
            .zip(dests)
            .map(|((source, _), dest)| {
                let source = sources
                    .get(source)
                    .copied()
                    .ok_or_else(|| StructuraError::internal("copy source vanished"))?;
                let dest = dest.ok_or_else(|| StructuraError::internal("copy destination vanished"))?;
                Ok((source, dest))
            })
            .collect()
    }

    fn typed<A: AnyArray + 'static>(&self, path: &DataPath, expected: &str) -> StructuraResult<&A> {
        let array = self.any_array(path)?;
        array
            .downcast_ref::<A>()
            .ok_or_else(|| type_mismatch(path, expected, array.type_name()))
    }

    fn typed_mut<A: AnyArray + 'static>(&mut self, path: &DataPath, expected: &str) -> StructuraResult<&mut A> {
        let array = self.any_array_mut(path)?;
        if !array.as_any().is::<A>() {
            return Err(type_mismatch(path, expected, array.type_name()));
        }
        array
            .downcast_mut::<A>()
            .ok_or_else(|| StructuraError::internal("array downcast failed after type check"))
    }

    /// Numeric array at `path` with element type `T`
    pub fn array<T: Element>(&self, path: &DataPath) -> StructuraResult<&DataArray<T>> {
        self.typed::<DataArray<T>>(path, T::DATA_TYPE.name())
    }

    /// Mutable numeric array at `path` with element type `T`
    pub fn array_mut<T: Element>(&mut self, path: &DataPath) -> StructuraResult<&mut DataArray<T>> {
        self.typed_mut::<DataArray<T>>(path, T::DATA_TYPE.name())
    }

    /// String array at `path`
    pub fn string_array(&self, path: &DataPath) -> StructuraResult<&StringArray> {
        self.typed::<StringArray>(path, "string")
    }

    /// Mutable string array at `path`
    pub fn string_array_mut(&mut self, path: &DataPath) -> StructuraResult<&mut StringArray> {
        self.typed_mut::<StringArray>(path, "string")
    }

    /// Neighbor list at `path` with element type `T`
    pub fn neighbor_list<T: Element>(&self, path: &DataPath) -> StructuraResult<&NeighborList<T>> {
        let expected = format!("neighborlist<{}>", T::DATA_TYPE);
        self.typed::<NeighborList<T>>(path, &expected)
    }

    /// Mutable neighbor list at `path` with element type `T`
    pub fn neighbor_list_mut<T: Element>(&mut self, path: &DataPath) -> StructuraResult<&mut NeighborList<T>> {
        let expected = format!("neighborlist<{}>", T::DATA_TYPE);
        self.typed_mut::<NeighborList<T>>(path, &expected)
    }

    /// Geometry at `path`
    pub fn geometry(&self, path: &DataPath) -> StructuraResult<&Geometry> {
        let object = self.resolve(path)?;
        object
            .as_geometry()
            .ok_or_else(|| type_mismatch(path, "geometry", object.object_type().to_string()))
    }

    /// Tuple shape of the attribute matrix at `path`
    pub fn attribute_matrix_shape(&self, path: &DataPath) -> StructuraResult<&Shape> {
        let object = self.resolve(path)?;
        object
            .attribute_matrix_shape()
            .ok_or_else(|| type_mismatch(path, "AttributeMatrix", object.object_type().to_string()))
    }

    // ========================================================================
    // Resizing
    // ========================================================================

    /// Change the tuple shape of an attribute matrix and every array it owns
    ///
    /// Every child is resized into a new store before any is swapped in.
    pub fn resize_attribute_matrix(&mut self, path: &DataPath, tuple_shape: Shape) -> StructuraResult<()> {
        let id = self.resolve_id(path)?;
        self.attribute_matrix_shape(path)?;
        let object = self.get(id)?;
        let resized_kind = ObjectKind::AttributeMatrix {
            tuple_shape: tuple_shape.clone(),
        };
        self.check_placement(object.parent, &resized_kind, path)?;
        tuple_shape.checked_num_elements().ok_or_else(|| {
            StructuraError::invalid_operation(format!("tuple shape {} overflows", tuple_shape))
        })?;

        let mut staged = Vec::with_capacity(object.children.len());
        for &child in object.children.values() {
            if let ObjectKind::Array(array) = &self.get(child)?.kind {
                staged.push((child, array.resized_boxed(tuple_shape.clone())?));
            }
        }
        for (child, resized) in staged {
            if let ObjectKind::Array(array) = &mut self.get_mut(child)?.kind {
                *array = resized;
            }
        }
        if let ObjectKind::AttributeMatrix { tuple_shape: shape } = &mut self.get_mut(id)?.kind {
            *shape = tuple_shape.clone();
        }
        debug!(target: "structura::graph", %path, shape = %tuple_shape, "Resized attribute matrix");
        Ok(())
    }

    /// Change the tuple shape of one array
    ///
    /// Arrays owned by an attribute matrix can only take the matrix's shape;
    /// resize the matrix instead.
    pub fn resize_array(&mut self, path: &DataPath, tuple_shape: Shape) -> StructuraResult<()> {
        let id = self.resolve_id(path)?;
        if let Some(parent) = self.get(id)?.parent {
            if let Some(expected) = self.get(parent)?.attribute_matrix_shape() {
                if expected != &tuple_shape {
                    return Err(StructuraError::ShapeMismatch {
                        path: path.clone(),
                        expected: expected.clone(),
                        actual: tuple_shape,
                    });
                }
            }
        }
        self.any_array_mut(path)?.resize_tuples(tuple_shape)
    }

    // ========================================================================
    // Copies
    // ========================================================================

    /// Copy the subtree at `source` to `dest_parent/new_name` with fresh ids
    ///
    /// References between objects inside the copied subtree are remapped to
    /// the copies; references to objects outside it are kept.
    pub fn deep_copy(
        &mut self,
        source: &DataPath,
        dest_parent: &DataPath,
        new_name: &str,
    ) -> StructuraResult<DataId> {
        self.deep_copy_with(source, dest_parent, new_name, |array| array.try_clone_boxed())
    }

    /// [`deep_copy`](Self::deep_copy) with every array produced by `make_array`
    ///
    /// `make_array` receives each source array and must return one of the
    /// same shapes, for example a placeholder or freshly allocated storage.
    pub fn deep_copy_with(
        &mut self,
        source: &DataPath,
        dest_parent: &DataPath,
        new_name: &str,
        mut make_array: impl FnMut(&dyn AnyArray) -> StructuraResult<Box<dyn AnyArray>>,
    ) -> StructuraResult<DataId> {
        validate_name(new_name)?;
        let source_id = self.resolve_id(source)?;
        if dest_parent.starts_with(source) {
            return Err(StructuraError::CyclicMove {
                path: source.clone(),
                target: dest_parent.clone(),
            });
        }
        let dest = self.container_id(dest_parent)?;
        if self.siblings(dest)?.contains_key(new_name) {
            return Err(StructuraError::NameConflict {
                parent: dest_parent.clone(),
                name: new_name.to_string(),
            });
        }
        let dest_path = dest_parent.join(new_name)?;
        self.check_placement(dest, &self.get(source_id)?.kind, &dest_path)?;

        let subtree = self.subtree_ids(source_id);
        let mut kinds = Vec::with_capacity(subtree.len());
        for old in &subtree {
            let kind = match &self.get(*old)?.kind {
                ObjectKind::Array(array) => ObjectKind::Array(make_array(array.as_ref())?),
                other => other.try_clone()?,
            };
            kinds.push(kind);
        }

        let mut mapping: FxHashMap<DataId, DataId> = FxHashMap::default();
        for old in &subtree {
            let fresh = self.allocate_id();
            mapping.insert(*old, fresh);
        }
        let lookup = |id: &DataId| {
            mapping
                .get(id)
                .copied()
                .ok_or_else(|| StructuraError::internal(format!("no copy allocated for {}", id)))
        };

        let mut staged = Vec::with_capacity(subtree.len());
        for (old, mut kind) in subtree.iter().zip(kinds) {
            let object = self.get(*old)?;
            if let ObjectKind::Geometry(geom) = &mut kind {
                geom.remap(|id| mapping.get(&id).copied());
            }
            let (parent, name) = if *old == source_id {
                (dest, new_name.to_string())
            } else {
                let parent = object.parent.map(|p| lookup(&p)).transpose()?;
                (parent, object.name.clone())
            };
            let mut children = BTreeMap::new();
            for (child_name, child) in &object.children {
                children.insert(child_name.clone(), lookup(child)?);
            }
            staged.push(DataObject {
                id: lookup(old)?,
                name,
                parent,
                children,
                kind,
            });
        }

        let new_root = lookup(&source_id)?;
        self.siblings_mut(dest)?.insert(new_name.to_string(), new_root);
        for object in staged {
            self.objects.insert(object.id, object);
        }
        debug!(target: "structura::graph", from = %source, to = %dest_path, count = subtree.len(), "Copied data object subtree");
        Ok(new_root)
    }

    /// Same structure and ids with every array replaced by a placeholder
    pub fn structural_copy(&self) -> DataGraph {
        DataGraph {
            objects: self
                .objects
                .iter()
                .map(|(id, object)| (*id, clone_object(object, object.kind.placeholder())))
                .collect(),
            roots: self.roots.clone(),
            next_id: self.next_id,
        }
    }

    /// Full copy including element data
    pub fn try_clone(&self) -> StructuraResult<DataGraph> {
        let mut objects = FxHashMap::default();
        for (id, object) in &self.objects {
            objects.insert(*id, clone_object(object, object.kind.try_clone()?));
        }
        Ok(DataGraph {
            objects,
            roots: self.roots.clone(),
            next_id: self.next_id,
        })
    }
}

fn clone_object(object: &DataObject, kind: ObjectKind) -> DataObject {
    DataObject {
        id: object.id,
        name: object.name.clone(),
        parent: object.parent,
        children: object.children.clone(),
        kind,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::ImageGrid;
    use crate::store::{DataStore, StoreKind};

    fn path(text: &str) -> DataPath {
        DataPath::parse(text).unwrap()
    }

    fn f32_array(tuples: &[usize], components: usize) -> Box<dyn AnyArray> {
        let store = DataStore::<f32>::in_memory(Shape::from(tuples), Shape::scalar(components)).unwrap();
        Box::new(DataArray::new(store))
    }

    fn u64_array(tuples: usize, components: usize) -> Box<dyn AnyArray> {
        let store = DataStore::<u64>::in_memory(Shape::scalar(tuples), Shape::scalar(components)).unwrap();
        Box::new(DataArray::new(store))
    }

    #[test]
    fn create_and_resolve() {
        let mut graph = DataGraph::new();
        let g = graph.create_group(&DataPath::empty(), "G").unwrap();
        let am = graph
            .create_attribute_matrix(&path("G"), "AM", Shape::from([10]))
            .unwrap();
        assert_ne!(g, am);
        assert_eq!(graph.resolve_id(&path("G/AM")).unwrap(), am);
        assert_eq!(graph.path_of(am).unwrap(), path("G/AM"));
        assert!(graph.resolve(&path("G/missing")).unwrap_err().is_not_found());
    }

    #[test]
    fn sibling_names_are_unique() {
        let mut graph = DataGraph::new();
        graph.create_group(&DataPath::empty(), "G").unwrap();
        let err = graph.create_group(&DataPath::empty(), "G").unwrap_err();
        assert!(matches!(err, StructuraError::NameConflict { .. }));
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn missing_parent_is_not_found() {
        let mut graph = DataGraph::new();
        let err = graph.create_group(&path("nope"), "G").unwrap_err();
        assert!(err.is_not_found());
        assert!(graph.is_empty());
    }

    #[test]
    fn arrays_cannot_own_children() {
        let mut graph = DataGraph::new();
        graph.create_array(&DataPath::empty(), "A", f32_array(&[2], 1)).unwrap();
        assert!(graph.create_group(&path("A"), "child").is_err());
    }

    #[test]
    fn typed_access_checks_element_type() {
        let mut graph = DataGraph::new();
        graph.create_array(&DataPath::empty(), "A", f32_array(&[3], 1)).unwrap();
        graph.array_mut::<f32>(&path("A")).unwrap().set(1, 4.5).unwrap();
        assert_eq!(graph.array::<f32>(&path("A")).unwrap().get(1).unwrap(), 4.5);
        let err = graph.array::<i32>(&path("A")).unwrap_err();
        assert!(matches!(err, StructuraError::TypeMismatch { .. }));
        assert!(graph.array_mut::<f64>(&path("A")).is_err());
        assert!(graph.string_array(&path("A")).is_err());
    }

    #[test]
    fn rename_onto_existing_requires_overwrite() {
        let mut graph = DataGraph::new();
        graph.create_group(&DataPath::empty(), "A").unwrap();
        graph.create_group(&DataPath::empty(), "B").unwrap();
        graph.create_group(&path("B"), "inner").unwrap();

        let err = graph.rename(&path("A"), "B", false).unwrap_err();
        assert!(matches!(err, StructuraError::NameConflict { .. }));

        graph.rename(&path("A"), "B", true).unwrap();
        assert!(!graph.contains(&path("A")));
        assert!(!graph.contains(&path("B/inner")));
        assert_eq!(graph.len(), 1);

        graph.rename(&path("B"), "B", false).unwrap();
    }

    #[test]
    fn move_rejects_cycles_and_clashes() {
        let mut graph = DataGraph::new();
        graph.create_group(&DataPath::empty(), "A").unwrap();
        graph.create_group(&path("A"), "B").unwrap();
        graph.create_group(&DataPath::empty(), "C").unwrap();
        graph.create_group(&path("C"), "B").unwrap();

        assert!(matches!(
            graph.move_to(&path("A"), &path("A/B")).unwrap_err(),
            StructuraError::CyclicMove { .. }
        ));
        assert!(matches!(
            graph.move_to(&path("A"), &path("A")).unwrap_err(),
            StructuraError::CyclicMove { .. }
        ));
        assert!(matches!(
            graph.move_to(&path("A/B"), &path("C")).unwrap_err(),
            StructuraError::NameConflict { .. }
        ));

        graph.move_to(&path("C"), &path("A/B")).unwrap();
        assert!(graph.contains(&path("A/B/C/B")));
        assert_eq!(graph.roots.len(), 1);
    }

    #[test]
    fn move_into_attribute_matrix_checks_shape() {
        let mut graph = DataGraph::new();
        graph
            .create_attribute_matrix(&DataPath::empty(), "AM", Shape::from([4]))
            .unwrap();
        graph.create_array(&DataPath::empty(), "short", f32_array(&[3], 1)).unwrap();
        graph.create_array(&DataPath::empty(), "fits", f32_array(&[4], 1)).unwrap();

        assert!(matches!(
            graph.move_to(&path("short"), &path("AM")).unwrap_err(),
            StructuraError::ShapeMismatch { .. }
        ));
        graph.move_to(&path("fits"), &path("AM")).unwrap();
        assert!(graph.contains(&path("AM/fits")));
    }

    #[test]
    fn descendant_paths_filter_by_type() {
        let mut graph = DataGraph::new();
        graph.create_group(&DataPath::empty(), "G").unwrap();
        graph
            .create_attribute_matrix(&path("G"), "AM", Shape::from([2]))
            .unwrap();
        graph.create_array(&path("G/AM"), "b", f32_array(&[2], 1)).unwrap();
        graph.create_array(&path("G/AM"), "a", f32_array(&[2], 3)).unwrap();

        let arrays = graph
            .descendant_paths(&path("G"), |t| t == ObjectType::DataArray)
            .unwrap();
        assert_eq!(arrays, vec![path("G/AM/a"), path("G/AM/b")]);
        assert_eq!(graph.paths().unwrap().len(), 4);
        assert_eq!(graph.children(&path("G/AM")).unwrap().len(), 2);
    }

    #[test]
    fn image_geometry_cell_matrix_is_zyx() {
        let mut graph = DataGraph::new();
        let geom = Geometry::image(ImageGrid::new([4, 3, 2]), "Cells");
        graph.create_geometry(&DataPath::empty(), "Img", geom).unwrap();

        let err = graph
            .create_attribute_matrix(&path("Img"), "Cells", Shape::from([4, 3, 2]))
            .unwrap_err();
        assert!(matches!(err, StructuraError::ShapeMismatch { .. }));
        graph
            .create_attribute_matrix(&path("Img"), "Cells", Shape::from([2, 3, 4]))
            .unwrap();
        graph
            .create_attribute_matrix(&path("Img"), "Other", Shape::from([7]))
            .unwrap();
    }

    #[test]
    fn renaming_cell_matrix_updates_geometry() {
        let mut graph = DataGraph::new();
        let geom = Geometry::image(ImageGrid::new([2, 2, 1]), "Cells");
        graph.create_geometry(&DataPath::empty(), "Img", geom).unwrap();
        graph
            .create_attribute_matrix(&path("Img"), "Cells", Shape::from([1, 2, 2]))
            .unwrap();
        graph.rename(&path("Img/Cells"), "CellData", false).unwrap();
        assert_eq!(graph.geometry(&path("Img")).unwrap().cell_data(), "CellData");
    }

    #[test]
    fn referenced_vertices_cannot_be_removed() {
        let mut graph = DataGraph::new();
        graph.create_group(&DataPath::empty(), "Shared").unwrap();
        let verts = graph
            .create_array(&path("Shared"), "Verts", f32_array(&[3], 3))
            .unwrap();
        let tris = graph
            .create_array(&path("Shared"), "Tris", u64_array(1, 3))
            .unwrap();
        let geom = Geometry::node_based(GeometryKind::Triangle, verts, Some(tris), "Faces", "Vertices").unwrap();
        graph.create_geometry(&DataPath::empty(), "Mesh", geom).unwrap();

        let err = graph.remove(&path("Shared")).unwrap_err();
        assert!(matches!(err, StructuraError::InUse { .. }));
        assert!(graph.contains(&path("Shared/Verts")));
        assert_eq!(graph.referrers(verts).len(), 1);

        graph.remove(&path("Mesh")).unwrap();
        let removed = graph.remove(&path("Shared")).unwrap();
        assert_eq!(removed.len(), 3);
        assert!(graph.is_empty());
    }

    #[test]
    fn geometry_references_are_type_checked() {
        let mut graph = DataGraph::new();
        let verts = graph.create_array(&DataPath::empty(), "V", f32_array(&[3], 2)).unwrap();
        let geom = Geometry::node_based(GeometryKind::Vertex, verts, None, "Cells", "Vertices").unwrap();
        assert!(matches!(
            graph.create_geometry(&DataPath::empty(), "Pts", geom).unwrap_err(),
            StructuraError::ShapeMismatch { .. }
        ));

        let wrong = graph.create_array(&DataPath::empty(), "W", u64_array(3, 3)).unwrap();
        let geom = Geometry::node_based(GeometryKind::Vertex, wrong, None, "Cells", "Vertices").unwrap();
        assert!(matches!(
            graph.create_geometry(&DataPath::empty(), "Pts", geom).unwrap_err(),
            StructuraError::TypeMismatch { .. }
        ));
    }

    #[test]
    fn resize_attribute_matrix_resizes_children() {
        let mut graph = DataGraph::new();
        graph
            .create_attribute_matrix(&DataPath::empty(), "AM", Shape::from([2]))
            .unwrap();
        graph.create_array(&path("AM"), "X", f32_array(&[2], 1)).unwrap();
        graph.array_mut::<f32>(&path("AM/X")).unwrap().set(1, 9.0).unwrap();

        assert!(graph.resize_array(&path("AM/X"), Shape::from([3])).is_err());
        graph.resize_attribute_matrix(&path("AM"), Shape::from([3])).unwrap();
        let x = graph.array::<f32>(&path("AM/X")).unwrap();
        assert_eq!(x.store().to_vec().unwrap(), vec![0.0, 9.0, 0.0]);
        assert_eq!(graph.attribute_matrix_shape(&path("AM")).unwrap(), &Shape::from([3]));
    }

    #[test]
    fn failed_matrix_resize_changes_nothing() {
        let mut graph = DataGraph::new();
        graph
            .create_attribute_matrix(&DataPath::empty(), "AM", Shape::from([1]))
            .unwrap();
        graph.create_array(&path("AM"), "A", f32_array(&[1], 1)).unwrap();
        let wide = DataStore::<f32>::empty(Shape::from([1]), Shape::from([usize::MAX / 2]));
        graph.create_array(&path("AM"), "B", Box::new(DataArray::new(wide))).unwrap();
        graph.create_array(&path("AM"), "C", f32_array(&[1], 1)).unwrap();

        let err = graph.resize_attribute_matrix(&path("AM"), Shape::from([4])).unwrap_err();
        assert!(matches!(err, StructuraError::InvalidOperation(_)));
        assert_eq!(graph.attribute_matrix_shape(&path("AM")).unwrap(), &Shape::from([1]));
        for name in ["AM/A", "AM/B", "AM/C"] {
            assert_eq!(graph.any_array(&path(name)).unwrap().tuple_shape(), &Shape::from([1]), "{}", name);
        }
    }

    #[test]
    fn deep_copy_remaps_internal_references() {
        let mut graph = DataGraph::new();
        graph.create_group(&DataPath::empty(), "G").unwrap();
        let verts = graph.create_array(&path("G"), "Verts", f32_array(&[2], 3)).unwrap();
        let geom = Geometry::node_based(GeometryKind::Vertex, verts, None, "Cells", "Vertices").unwrap();
        graph.create_geometry(&path("G"), "Pts", geom).unwrap();
        graph.array_mut::<f32>(&path("G/Verts")).unwrap().set(5, 1.5).unwrap();

        let copy = graph.deep_copy(&path("G"), &DataPath::empty(), "H").unwrap();
        assert_eq!(graph.path_of(copy).unwrap(), path("H"));
        let copied_verts = graph.resolve_id(&path("H/Verts")).unwrap();
        assert_ne!(copied_verts, verts);
        assert_eq!(graph.geometry(&path("H/Pts")).unwrap().vertices(), Some(copied_verts));
        assert_eq!(graph.array::<f32>(&path("H/Verts")).unwrap().get(5).unwrap(), 1.5);

        assert!(matches!(
            graph.deep_copy(&path("G"), &path("G"), "Inner").unwrap_err(),
            StructuraError::CyclicMove { .. }
        ));
    }

    #[test]
    fn structural_copy_has_placeholders_only() {
        let mut graph = DataGraph::new();
        graph.create_array(&DataPath::empty(), "A", f32_array(&[5], 2)).unwrap();
        let preview = graph.structural_copy();
        assert_eq!(preview.structure().unwrap(), graph.structure().unwrap());
        assert_eq!(preview.any_array(&path("A")).unwrap().store_kind(), StoreKind::Empty);
    }

    #[test]
    fn array_pairs_borrow_sources_and_destinations_together() {
        let mut graph = DataGraph::new();
        let a = graph.create_array(&DataPath::empty(), "A", u64_array(4, 1)).unwrap();
        let b = graph.create_array(&DataPath::empty(), "B", u64_array(4, 1)).unwrap();
        let c = graph.create_array(&DataPath::empty(), "C", u64_array(4, 1)).unwrap();
        graph.array_mut::<u64>(&path("A")).unwrap().set(3, 42).unwrap();

        for (source, dest) in graph.array_pairs_mut(&[(a, b), (a, c)]).unwrap() {
            dest.copy_data_from(source).unwrap();
        }
        assert_eq!(graph.array::<u64>(&path("B")).unwrap().get(3).unwrap(), 42);
        assert_eq!(graph.array::<u64>(&path("C")).unwrap().get(3).unwrap(), 42);

        assert!(graph.array_pairs_mut(&[(a, b), (c, b)]).is_err());
        assert!(graph.array_pairs_mut(&[(a, b), (b, c)]).is_err());
    }
}
