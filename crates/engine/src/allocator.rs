//! Backend selection for new arrays
//!
//! Every array created in execute mode asks the [`StorageAllocator`] which
//! backend should hold it:
//!
//! | Request | Out-of-core configured | Result |
//! |---------|------------------------|--------|
//! | ≤ threshold and ≤ available | any | `InMemory` |
//! | > threshold or > available | yes | `OutOfCore` |
//! | ≤ threshold, > available | no | `CapacityExceeded` |
//! | > threshold, ≤ available | no | `InMemory` |
//!
//! Available memory is read through a [`MemoryProbe`] on every request.

use std::fmt;
use std::sync::Arc;
use structura_core::{dispatch_data_type, DataType, Element, Shape, StructuraError, StructuraResult};
use structura_storage::{
    AnyArray, ArrayKind, DataArray, DataStore, NeighborList, OutOfCoreOptions, StoreKind, StringArray,
};
use tracing::debug;

use crate::config::Preferences;

/// Source of the currently available memory figure
pub trait MemoryProbe: Send + Sync {
    /// Bytes available for new allocations; `None` when unknown
    fn available_bytes(&self) -> Option<u64>;
}

/// Reads `MemAvailable` from `/proc/meminfo`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemMemoryProbe;

impl MemoryProbe for SystemMemoryProbe {
    fn available_bytes(&self) -> Option<u64> {
        let meminfo = std::fs::read_to_string("/proc/meminfo").ok()?;
        parse_mem_available(&meminfo)
    }
}

fn parse_mem_available(meminfo: &str) -> Option<u64> {
    meminfo.lines().find_map(|line| {
        let rest = line.strip_prefix("MemAvailable:")?;
        let kib: u64 = rest.trim().trim_end_matches("kB").trim().parse().ok()?;
        kib.checked_mul(1024)
    })
}

/// Constant figure, for tests and explicit overrides
#[derive(Debug, Clone, Copy)]
pub struct FixedMemoryProbe(pub u64);

impl MemoryProbe for FixedMemoryProbe {
    fn available_bytes(&self) -> Option<u64> {
        Some(self.0)
    }
}

/// Capacity policy and store factory
#[derive(Clone)]
pub struct StorageAllocator {
    large_data_threshold: u64,
    out_of_core: Option<OutOfCoreOptions>,
    probe: Arc<dyn MemoryProbe>,
}

impl fmt::Debug for StorageAllocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageAllocator")
            .field("large_data_threshold", &self.large_data_threshold)
            .field("out_of_core", &self.out_of_core)
            .finish()
    }
}

impl StorageAllocator {
    /// Allocator following `preferences`, probing the system unless an
    /// explicit available-memory figure is set
    pub fn new(preferences: &Preferences) -> Self {
        let probe: Arc<dyn MemoryProbe> = match preferences.available_memory {
            Some(bytes) => Arc::new(FixedMemoryProbe(bytes)),
            None => Arc::new(SystemMemoryProbe),
        };
        Self::with_probe(preferences, probe)
    }

    /// Allocator following `preferences` with a custom probe
    pub fn with_probe(preferences: &Preferences, probe: Arc<dyn MemoryProbe>) -> Self {
        Self {
            large_data_threshold: preferences.large_data_threshold,
            out_of_core: preferences.out_of_core.clone(),
            probe,
        }
    }

    /// Everything in memory, no capacity limit
    pub fn unlimited() -> Self {
        Self {
            large_data_threshold: u64::MAX,
            out_of_core: None,
            probe: Arc::new(FixedMemoryProbe(u64::MAX)),
        }
    }

    /// Out-of-core settings, if that backend is configured
    pub fn out_of_core_options(&self) -> Option<&OutOfCoreOptions> {
        self.out_of_core.as_ref()
    }

    /// Backend for a request of `bytes`
    pub fn choose(&self, bytes: u64) -> StructuraResult<StoreKind> {
        // Unknown availability never blocks an allocation.
        let available = self.probe.available_bytes().unwrap_or(u64::MAX);
        let fits = bytes <= available;
        let large = bytes > self.large_data_threshold;

        let kind = match (&self.out_of_core, fits, large) {
            (_, true, false) => StoreKind::InMemory,
            (Some(_), _, _) => StoreKind::OutOfCore,
            (None, true, true) => StoreKind::InMemory,
            (None, false, _) => {
                return Err(StructuraError::CapacityExceeded {
                    requested: bytes,
                    available,
                })
            }
        };
        debug!(target: "structura::alloc", bytes, available, %kind, "Selected storage backend");
        Ok(kind)
    }

    /// Allocate a zeroed store for `tuple_shape × component_shape` elements
    pub fn allocate<T: Element>(&self, tuple_shape: Shape, component_shape: Shape) -> StructuraResult<DataStore<T>> {
        let bytes = request_bytes(T::DATA_TYPE, &tuple_shape, &component_shape)?;
        let kind = self.choose(bytes)?;
        let options = self.out_of_core.clone().unwrap_or_default();
        DataStore::allocate(kind, tuple_shape, component_shape, &options)
    }

    /// Allocate a zeroed array of runtime type `data_type`
    pub fn allocate_array(
        &self,
        data_type: DataType,
        tuple_shape: Shape,
        component_shape: Shape,
    ) -> StructuraResult<Box<dyn AnyArray>> {
        dispatch_data_type!(data_type, T => {
            let store = self.allocate::<T>(tuple_shape, component_shape)?;
            Ok(Box::new(DataArray::new(store)) as Box<dyn AnyArray>)
        })
    }

    /// Zeroed array with the flavor, element type and shapes of `array`
    pub fn allocate_like(&self, array: &dyn AnyArray) -> StructuraResult<Box<dyn AnyArray>> {
        let tuple_shape = array.tuple_shape().clone();
        match (array.array_kind(), array.data_type()) {
            (ArrayKind::String, _) => Ok(Box::new(StringArray::new(tuple_shape))),
            (ArrayKind::Data, Some(data_type)) => {
                self.allocate_array(data_type, tuple_shape, array.component_shape().clone())
            }
            (ArrayKind::NeighborList, Some(data_type)) => Ok(dispatch_data_type!(data_type, T => {
                Box::new(NeighborList::<T>::new(tuple_shape)) as Box<dyn AnyArray>
            })),
            (kind, None) => Err(StructuraError::internal(format!(
                "{:?} array without an element type",
                kind
            ))),
        }
    }

    /// Check that `bytes` more can be held somewhere
    pub fn reserve(&self, bytes: u64) -> StructuraResult<()> {
        self.choose(bytes).map(|_| ())
    }
}

/// Placeholder array of runtime type `data_type` carrying only metadata
pub fn placeholder_array(data_type: DataType, tuple_shape: Shape, component_shape: Shape) -> Box<dyn AnyArray> {
    dispatch_data_type!(data_type, T => {
        Box::new(DataArray::new(DataStore::<T>::empty(tuple_shape, component_shape))) as Box<dyn AnyArray>
    })
}

/// Bytes needed for `tuple_shape × component_shape` elements of `data_type`
///
/// # Errors
///
/// `InvalidParameter` when the count or byte size overflows.
pub fn request_bytes(data_type: DataType, tuple_shape: &Shape, component_shape: &Shape) -> StructuraResult<u64> {
    tuple_shape
        .checked_num_elements()
        .and_then(|t| component_shape.checked_num_elements().and_then(|c| t.checked_mul(c)))
        .and_then(|n| (n as u64).checked_mul(data_type.size_of() as u64))
        .ok_or_else(|| {
            StructuraError::invalid_parameter(
                "shape",
                format!("{} x {} of {} overflows", tuple_shape, component_shape, data_type),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn preferences(threshold: u64, out_of_core: bool) -> Preferences {
        Preferences {
            large_data_threshold: threshold,
            out_of_core: out_of_core.then(|| OutOfCoreOptions {
                chunk_elements: 16,
                resident_chunks: 2,
                directory: None,
            }),
            ..Preferences::default()
        }
    }

    fn allocator(threshold: u64, available: u64, out_of_core: bool) -> StorageAllocator {
        StorageAllocator::with_probe(&preferences(threshold, out_of_core), Arc::new(FixedMemoryProbe(available)))
    }

    #[test]
    fn small_requests_stay_in_memory() {
        let alloc = allocator(1000, 10_000, true);
        assert_eq!(alloc.choose(100).unwrap(), StoreKind::InMemory);
    }

    #[test]
    fn large_requests_go_out_of_core_when_configured() {
        let alloc = allocator(1000, 10_000, true);
        assert_eq!(alloc.choose(5000).unwrap(), StoreKind::OutOfCore);
        assert_eq!(alloc.choose(50_000).unwrap(), StoreKind::OutOfCore);
    }

    #[test]
    fn without_out_of_core_memory_is_the_limit() {
        let alloc = allocator(1000, 10_000, false);
        assert_eq!(alloc.choose(5000).unwrap(), StoreKind::InMemory);
        let err = alloc.choose(50_000).unwrap_err();
        assert!(matches!(
            err,
            StructuraError::CapacityExceeded {
                requested: 50_000,
                available: 10_000
            }
        ));
    }

    #[test]
    fn allocate_array_uses_the_chosen_backend() {
        let alloc = allocator(64, u64::MAX, true);
        let small = alloc.allocate_array(DataType::Float32, Shape::from([4]), Shape::from([1])).unwrap();
        assert_eq!(small.store_kind(), StoreKind::InMemory);
        let large = alloc.allocate_array(DataType::Float64, Shape::from([100]), Shape::from([1])).unwrap();
        assert_eq!(large.store_kind(), StoreKind::OutOfCore);
        assert_eq!(large.data_type(), Some(DataType::Float64));
    }

    #[test]
    fn placeholder_array_has_metadata_only() {
        let array = placeholder_array(DataType::Int16, Shape::from([3, 2]), Shape::from([4]));
        assert_eq!(array.store_kind(), StoreKind::Empty);
        assert_eq!(array.num_tuples(), 6);
        assert_eq!(array.num_components(), 4);
    }

    #[test]
    fn parses_proc_meminfo() {
        let text = "MemTotal:       16000000 kB\nMemFree:         1000 kB\nMemAvailable:    2048 kB\n";
        assert_eq!(parse_mem_available(text), Some(2048 * 1024));
        assert_eq!(parse_mem_available("MemTotal: 1 kB\n"), None);
    }

    #[test]
    fn explicit_available_memory_overrides_probe() {
        let prefs = Preferences {
            available_memory: Some(10),
            ..Preferences::default()
        };
        let alloc = StorageAllocator::new(&prefs);
        assert!(alloc.choose(11).is_err());
        assert!(alloc.choose(10).is_ok());
    }
}
