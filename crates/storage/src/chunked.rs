//! Capacity-constrained (out-of-core) element storage
//!
//! A [`ChunkedStore`] keeps its elements in an anonymous temporary file and
//! holds at most `resident_chunks` fixed-size chunks in memory. Chunks are
//! loaded on first touch, evicted least-recently-used first, and written back
//! only when dirty. Chunks that were never written read back as zeros.
//!
//! # Design
//!
//! - One `parking_lot::Mutex` guards the chunk cache so `get(&self)` works
//!   from parallel readers; `set(&mut self)` bypasses the lock via `get_mut`.
//! - Elements are encoded little-endian through [`Element::write_le`].

use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs::File;
use std::io::{Cursor, Read, Seek, SeekFrom, Write};
use std::path::PathBuf;
use structura_core::{Element, StructuraError, StructuraResult};

/// Tuning for out-of-core stores
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutOfCoreOptions {
    /// Elements per chunk
    #[serde(default = "default_chunk_elements")]
    pub chunk_elements: usize,
    /// Maximum number of chunks held in memory at once
    #[serde(default = "default_resident_chunks")]
    pub resident_chunks: usize,
    /// Directory for backing files; system temp dir when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}

fn default_chunk_elements() -> usize {
    64 * 1024
}

fn default_resident_chunks() -> usize {
    16
}

impl Default for OutOfCoreOptions {
    fn default() -> Self {
        Self {
            chunk_elements: default_chunk_elements(),
            resident_chunks: default_resident_chunks(),
            directory: None,
        }
    }
}

struct ResidentChunk<T> {
    data: Vec<T>,
    dirty: bool,
}

struct ChunkCache<T> {
    file: File,
    resident: FxHashMap<usize, ResidentChunk<T>>,
    lru: VecDeque<usize>,
    on_disk: FxHashSet<usize>,
}

/// File-backed element buffer with a bounded in-memory chunk cache
pub struct ChunkedStore<T: Element> {
    len: usize,
    options: OutOfCoreOptions,
    cache: Mutex<ChunkCache<T>>,
}

impl<T: Element> std::fmt::Debug for ChunkedStore<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkedStore")
            .field("len", &self.len)
            .field("chunk_elements", &self.options.chunk_elements)
            .field("resident_chunks", &self.options.resident_chunks)
            .finish()
    }
}

impl<T: Element> ChunkedStore<T> {
    /// Create a zero-filled store of `len` elements
    pub fn new(len: usize, options: &OutOfCoreOptions) -> StructuraResult<Self> {
        if options.chunk_elements == 0 || options.resident_chunks == 0 {
            return Err(StructuraError::invalid_operation(
                "out-of-core chunk size and resident chunk count must be non-zero",
            ));
        }
        let file = match &options.directory {
            Some(dir) => tempfile::tempfile_in(dir)?,
            None => tempfile::tempfile()?,
        };
        Ok(Self {
            len,
            options: options.clone(),
            cache: Mutex::new(ChunkCache {
                file,
                resident: FxHashMap::default(),
                lru: VecDeque::new(),
                on_disk: FxHashSet::default(),
            }),
        })
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when the store holds no elements
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Options this store was created with
    pub fn options(&self) -> &OutOfCoreOptions {
        &self.options
    }

    /// Number of chunks currently held in memory
    pub fn resident_chunk_count(&self) -> usize {
        self.cache.lock().resident.len()
    }

    fn check_index(&self, index: usize) -> StructuraResult<()> {
        if index >= self.len {
            return Err(StructuraError::IndexOutOfBounds {
                index,
                len: self.len,
            });
        }
        Ok(())
    }

    /// Read one element
    pub fn get(&self, index: usize) -> StructuraResult<T> {
        self.check_index(index)?;
        let chunk = index / self.options.chunk_elements;
        let offset = index % self.options.chunk_elements;
        let mut cache = self.cache.lock();
        let resident = load_chunk(&mut cache, chunk, self.chunk_len(chunk), &self.options)?;
        Ok(resident.data[offset])
    }

    /// Write one element
    pub fn set(&mut self, index: usize, value: T) -> StructuraResult<()> {
        self.check_index(index)?;
        let chunk = index / self.options.chunk_elements;
        let offset = index % self.options.chunk_elements;
        let chunk_len = self.chunk_len(chunk);
        let cache = self.cache.get_mut();
        let resident = load_chunk(cache, chunk, chunk_len, &self.options)?;
        resident.data[offset] = value;
        resident.dirty = true;
        Ok(())
    }

    /// Set every element to `value`
    pub fn fill(&mut self, value: T) -> StructuraResult<()> {
        for index in 0..self.len {
            self.set(index, value)?;
        }
        Ok(())
    }

    /// Write every dirty resident chunk back to the backing file
    pub fn flush(&mut self) -> StructuraResult<()> {
        let cache = self.cache.get_mut();
        let dirty: Vec<usize> = cache
            .resident
            .iter()
            .filter(|(_, c)| c.dirty)
            .map(|(idx, _)| *idx)
            .collect();
        for chunk in dirty {
            write_back(cache, chunk, self.options.chunk_elements)?;
        }
        cache.file.flush()?;
        Ok(())
    }

    /// Copy of this store with `new_len` elements, preserving the overlap
    pub fn resized(&self, new_len: usize) -> StructuraResult<Self> {
        let mut out = ChunkedStore::new(new_len, &self.options)?;
        for index in 0..self.len.min(new_len) {
            out.set(index, self.get(index)?)?;
        }
        Ok(out)
    }

    /// Independent copy backed by a new file
    pub fn try_clone(&self) -> StructuraResult<Self> {
        self.resized(self.len)
    }

    /// Materialize every element
    pub fn to_vec(&self) -> StructuraResult<Vec<T>> {
        (0..self.len).map(|i| self.get(i)).collect()
    }

    fn chunk_len(&self, chunk: usize) -> usize {
        let start = chunk * self.options.chunk_elements;
        self.options.chunk_elements.min(self.len - start)
    }
}

fn load_chunk<'a, T: Element>(
    cache: &'a mut ChunkCache<T>,
    chunk: usize,
    chunk_len: usize,
    options: &OutOfCoreOptions,
) -> StructuraResult<&'a mut ResidentChunk<T>> {
    if cache.resident.contains_key(&chunk) {
        if let Some(pos) = cache.lru.iter().position(|c| *c == chunk) {
            cache.lru.remove(pos);
        }
        cache.lru.push_back(chunk);
    } else {
        while cache.resident.len() >= options.resident_chunks {
            let Some(victim) = cache.lru.pop_front() else {
                break;
            };
            write_back(cache, victim, options.chunk_elements)?;
            cache.resident.remove(&victim);
        }

        let data = if cache.on_disk.contains(&chunk) {
            read_chunk::<T>(&mut cache.file, chunk, chunk_len, options.chunk_elements)?
        } else {
            vec![T::default(); chunk_len]
        };
        cache
            .resident
            .insert(chunk, ResidentChunk { data, dirty: false });
        cache.lru.push_back(chunk);
    }

    cache
        .resident
        .get_mut(&chunk)
        .ok_or_else(|| StructuraError::internal("chunk vanished from cache after load"))
}

fn chunk_offset<T: Element>(chunk: usize, chunk_elements: usize) -> u64 {
    (chunk * chunk_elements * T::DATA_TYPE.size_of()) as u64
}

fn read_chunk<T: Element>(
    file: &mut File,
    chunk: usize,
    chunk_len: usize,
    chunk_elements: usize,
) -> StructuraResult<Vec<T>> {
    let mut bytes = vec![0u8; chunk_len * T::DATA_TYPE.size_of()];
    file.seek(SeekFrom::Start(chunk_offset::<T>(chunk, chunk_elements)))?;
    file.read_exact(&mut bytes)?;
    let mut cursor = Cursor::new(bytes);
    (0..chunk_len)
        .map(|_| T::read_le(&mut cursor).map_err(StructuraError::from))
        .collect()
}

fn write_back<T: Element>(
    cache: &mut ChunkCache<T>,
    chunk: usize,
    chunk_elements: usize,
) -> StructuraResult<()> {
    let Some(resident) = cache.resident.get_mut(&chunk) else {
        return Ok(());
    };
    if !resident.dirty {
        return Ok(());
    }
    let mut bytes = Vec::with_capacity(resident.data.len() * T::DATA_TYPE.size_of());
    for value in &resident.data {
        value.write_le(&mut bytes)?;
    }
    cache
        .file
        .seek(SeekFrom::Start(chunk_offset::<T>(chunk, chunk_elements)))?;
    cache.file.write_all(&bytes)?;
    resident.dirty = false;
    cache.on_disk.insert(chunk);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny() -> OutOfCoreOptions {
        OutOfCoreOptions {
            chunk_elements: 4,
            resident_chunks: 2,
            directory: None,
        }
    }

    #[test]
    fn fresh_store_reads_zeros() {
        let store = ChunkedStore::<f32>::new(10, &tiny()).unwrap();
        assert_eq!(store.to_vec().unwrap(), vec![0.0; 10]);
    }

    #[test]
    fn writes_survive_eviction() {
        let mut store = ChunkedStore::<i32>::new(40, &tiny()).unwrap();
        for i in 0..40 {
            store.set(i, i as i32 * 3).unwrap();
        }
        assert!(store.resident_chunk_count() <= 2);
        for i in 0..40 {
            assert_eq!(store.get(i).unwrap(), i as i32 * 3);
        }
    }

    #[test]
    fn out_of_bounds_is_an_error() {
        let store = ChunkedStore::<u8>::new(3, &tiny()).unwrap();
        assert!(matches!(
            store.get(3),
            Err(StructuraError::IndexOutOfBounds { index: 3, len: 3 })
        ));
    }

    #[test]
    fn resized_preserves_overlap() {
        let mut store = ChunkedStore::<u16>::new(9, &tiny()).unwrap();
        for i in 0..9 {
            store.set(i, i as u16 + 1).unwrap();
        }
        let grown = store.resized(12).unwrap();
        assert_eq!(grown.get(8).unwrap(), 9);
        assert_eq!(grown.get(11).unwrap(), 0);
        let shrunk = store.resized(2).unwrap();
        assert_eq!(shrunk.to_vec().unwrap(), vec![1, 2]);
    }

    #[test]
    fn zero_sized_chunks_are_rejected() {
        let options = OutOfCoreOptions {
            chunk_elements: 0,
            ..OutOfCoreOptions::default()
        };
        assert!(ChunkedStore::<f64>::new(4, &options).is_err());
    }
}
