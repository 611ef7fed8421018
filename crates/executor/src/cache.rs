//! Per-run scratch storage shared by filters
//!
//! A [`RunCache`] lives for exactly one pipeline run. Each node sees a
//! [`ScopedCache`] keyed by its filter name and position, so two nodes
//! running the same filter never share entries.

use dashmap::DashMap;
use std::any::Any;
use std::fmt;

type Entry = Box<dyn Any + Send + Sync>;

/// Concurrent map of `(scope, name)` to arbitrary values
#[derive(Default)]
pub struct RunCache {
    entries: DashMap<(String, String), Entry>,
}

impl fmt::Debug for RunCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunCache").field("entries", &self.entries.len()).finish()
    }
}

impl RunCache {
    /// Empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// View restricted to `scope`
    pub fn scoped(&self, scope: impl Into<String>) -> ScopedCache<'_> {
        ScopedCache {
            cache: self,
            scope: scope.into(),
        }
    }

    /// Number of entries across all scopes
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing is cached
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.entries.clear();
    }
}

/// One scope of a [`RunCache`]
#[derive(Debug, Clone)]
pub struct ScopedCache<'a> {
    cache: &'a RunCache,
    scope: String,
}

impl<'a> ScopedCache<'a> {
    fn key(&self, name: &str) -> (String, String) {
        (self.scope.clone(), name.to_string())
    }

    /// Scope name
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Store `value` under `name`, replacing any previous entry
    pub fn insert<T: Any + Send + Sync>(&self, name: &str, value: T) {
        self.cache.entries.insert(self.key(name), Box::new(value));
    }

    /// Copy of the entry under `name`, if present and of type `T`
    pub fn get<T: Any + Clone>(&self, name: &str) -> Option<T> {
        let entry = self.cache.entries.get(&self.key(name))?;
        (**entry).downcast_ref::<T>().cloned()
    }

    /// Modify the entry under `name` in place
    ///
    /// A missing entry, or one of another type, starts from `T::default()`.
    pub fn update<T, R>(&self, name: &str, f: impl FnOnce(&mut T) -> R) -> R
    where
        T: Any + Send + Sync + Default,
    {
        let mut slot = self
            .cache
            .entries
            .entry(self.key(name))
            .or_insert_with(|| Box::new(T::default()));
        if !(**slot).is::<T>() {
            *slot = Box::new(T::default());
        }
        match (**slot).downcast_mut::<T>() {
            Some(value) => f(value),
            None => f(&mut T::default()),
        }
    }

    /// Remove the entry under `name`; true if there was one
    pub fn remove(&self, name: &str) -> bool {
        self.cache.entries.remove(&self.key(name)).is_some()
    }

    /// True if `name` holds an entry
    pub fn contains(&self, name: &str) -> bool {
        self.cache.entries.contains_key(&self.key(name))
    }
}
