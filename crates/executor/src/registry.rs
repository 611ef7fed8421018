//! Filter lookup by identifier
//!
//! A [`FilterRegistry`] maps filter names and UUIDs to factories. Pipeline
//! documents store the name; either form resolves.

use std::collections::{BTreeMap, HashMap};
use structura_core::{StructuraError, StructuraResult};
use tracing::debug;

use crate::filter::{Filter, FilterId};
use crate::filters;

/// Produces a fresh filter instance
pub type FilterFactory = fn() -> Box<dyn Filter>;

/// Identifier → factory map
#[derive(Debug, Default, Clone)]
pub struct FilterRegistry {
    by_name: BTreeMap<&'static str, FilterFactory>,
    by_id: HashMap<FilterId, &'static str>,
}

impl FilterRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in filter
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for factory in filters::builtin_factories() {
            // Built-in names and ids are distinct.
            let _ = registry.register(factory);
        }
        registry
    }

    /// Add a factory; its name and UUID must both be unused
    pub fn register(&mut self, factory: FilterFactory) -> StructuraResult<()> {
        let sample = factory();
        let (name, id) = (sample.name(), sample.uuid());
        if self.by_name.contains_key(name) || self.by_id.contains_key(&id) {
            return Err(StructuraError::invalid_operation(format!(
                "filter '{}' ({}) is already registered",
                name, id
            )));
        }
        debug!(target: "structura::pipeline", filter = name, %id, "Registered filter");
        self.by_name.insert(name, factory);
        self.by_id.insert(id, name);
        Ok(())
    }

    /// Instantiate the filter named or identified by `identifier`
    pub fn create(&self, identifier: &str) -> StructuraResult<Box<dyn Filter>> {
        let name = match identifier.parse::<FilterId>() {
            Ok(id) => self.by_id.get(&id).copied(),
            Err(_) => self.by_name.get_key_value(identifier).map(|(name, _)| *name),
        };
        name.and_then(|name| self.by_name.get(name))
            .map(|factory| factory())
            .ok_or_else(|| StructuraError::invalid_parameter("filter", format!("unknown filter '{}'", identifier)))
    }

    /// True if `identifier` resolves
    pub fn contains(&self, identifier: &str) -> bool {
        self.create(identifier).is_ok()
    }

    /// Registered names in order
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.by_name.keys().copied()
    }

    /// Number of registered filters
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// True if nothing is registered
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::CreateDataGroup;

    #[test]
    fn builtins_resolve_by_name_and_uuid() {
        let registry = FilterRegistry::with_builtins();
        assert_eq!(registry.len(), filters::builtin_factories().len());
        let by_name = registry.create("create_data_group").unwrap();
        let by_id = registry.create(&by_name.uuid().to_string()).unwrap();
        assert_eq!(by_id.name(), "create_data_group");
    }

    #[test]
    fn duplicates_are_rejected() {
        let mut registry = FilterRegistry::new();
        let factory: FilterFactory = || Box::new(CreateDataGroup);
        registry.register(factory).unwrap();
        assert!(registry.register(factory).is_err());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn unknown_identifiers_fail() {
        let registry = FilterRegistry::with_builtins();
        assert!(registry.create("no_such_filter").is_err());
        assert!(!registry.contains("00000000-0000-0000-0000-000000000000"));
    }
}
