//! Disk-backed, append-only typed buffers for the tree pool.
//!
//! Trees reach tens of millions of nodes; a flat array of POD records over a
//! memory-mapped file keeps construction writes sequential and lets the OS
//! page out cold regions during the solve. The backing file is truncated to
//! `capacity * size_of::<T>()` up front and is sparse on filesystems that
//! support it, so only written pages consume disk.

use std::fs::{File, OpenOptions};
use std::marker::PhantomData;
use std::mem::size_of;
use std::path::{Path, PathBuf};

use memmap2::MmapMut;

use crate::error::{SolverError, SolverResult};
use crate::poker::hands::Card;
use crate::tree::node::{Action, Node};

/// A typed, bounded, append-only buffer backed by a memory-mapped file.
///
/// Indices are stable for the lifetime of the buffer. Appending past the
/// fixed capacity is an error; indexing past the logical length panics.
#[derive(Debug)]
pub struct MmapBuffer<T: Copy> {
    file_name: String,
    map: MmapMut,
    len: usize,
    capacity: usize,
    _file: File,
    _marker: PhantomData<T>,
}

impl<T: Copy> MmapBuffer<T> {
    /// Create a buffer at `path` holding up to `capacity` elements.
    ///
    /// Any existing file at `path` is truncated.
    pub fn create(path: &Path, capacity: usize) -> SolverResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        file.set_len((capacity * size_of::<T>()) as u64)?;

        // SAFETY: the map is private to this buffer; the file stays open for
        // as long as the map lives.
        let map = unsafe { MmapMut::map_mut(&file)? };

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self {
            file_name,
            map,
            len: 0,
            capacity,
            _file: file,
            _marker: PhantomData,
        })
    }

    /// Append an element.
    pub fn push(&mut self, value: T) -> SolverResult<()> {
        if self.len >= self.capacity {
            return Err(SolverError::BufferOverflow {
                file: self.file_name.clone(),
                limit: self.capacity,
            });
        }
        // SAFETY: len < capacity, so the write stays inside the mapping; the
        // base pointer is page-aligned, which satisfies any POD alignment.
        unsafe {
            let ptr = self.map.as_mut_ptr() as *mut T;
            ptr.add(self.len).write(value);
        }
        self.len += 1;
        Ok(())
    }

    /// Number of elements appended so far.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Fixed maximum element count.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Reset the logical length to zero without shrinking the file.
    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// View the appended elements.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        // SAFETY: elements 0..len were written through `push` or
        // `as_mut_slice`; the mapping outlives the returned borrow.
        unsafe { std::slice::from_raw_parts(self.map.as_ptr() as *const T, self.len) }
    }

    /// Mutable view of the appended elements.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        // SAFETY: same bounds as `as_slice`, and &mut self gives exclusivity.
        unsafe { std::slice::from_raw_parts_mut(self.map.as_mut_ptr() as *mut T, self.len) }
    }
}

impl<T: Copy> std::ops::Index<usize> for MmapBuffer<T> {
    type Output = T;

    #[inline]
    fn index(&self, index: usize) -> &T {
        &self.as_slice()[index]
    }
}

impl<T: Copy> std::ops::IndexMut<usize> for MmapBuffer<T> {
    #[inline]
    fn index_mut(&mut self, index: usize) -> &mut T {
        &mut self.as_mut_slice()[index]
    }
}

/// Capacity limits for the four pool buffers.
///
/// Overflowing any of these fails the build; the defaults cover trees of
/// tens of millions of nodes.
#[derive(Debug, Clone, Copy)]
pub struct PoolCapacity {
    pub nodes: usize,
    pub actions: usize,
    pub child_ids: usize,
    pub chance_cards: usize,
}

impl Default for PoolCapacity {
    fn default() -> Self {
        Self {
            nodes: 50_000_000,
            actions: 100_000_000,
            child_ids: 100_000_000,
            chance_cards: 10_000_000,
        }
    }
}

/// The tree pool: four append-only buffers holding every node, action,
/// child index, and chance card of a built tree.
///
/// Node 0 is reserved for the root. The pool is written once by the builder
/// and read-only during the solve.
#[derive(Debug)]
pub struct TreeDataPool {
    pub nodes: MmapBuffer<Node>,
    pub actions: MmapBuffer<Action>,
    pub child_ids: MmapBuffer<i32>,
    pub chance_cards: MmapBuffer<Card>,
}

impl TreeDataPool {
    /// Create a pool with default capacities under `tmp/`.
    pub fn new() -> SolverResult<Self> {
        Self::with_capacity(Path::new("tmp"), PoolCapacity::default())
    }

    /// Create a pool with explicit capacities under `dir`.
    pub fn with_capacity(dir: &Path, capacity: PoolCapacity) -> SolverResult<Self> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            nodes: MmapBuffer::create(&file_in(dir, "nodes.bin"), capacity.nodes)?,
            actions: MmapBuffer::create(&file_in(dir, "actions.bin"), capacity.actions)?,
            child_ids: MmapBuffer::create(&file_in(dir, "child_ids.bin"), capacity.child_ids)?,
            chance_cards: MmapBuffer::create(
                &file_in(dir, "chance_cards.bin"),
                capacity.chance_cards,
            )?,
        })
    }

    /// Reset all four buffers to zero length.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.actions.clear();
        self.child_ids.clear();
        self.chance_cards.clear();
    }
}

fn file_in(dir: &Path, name: &str) -> PathBuf {
    dir.join(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("solver-core-{}-{}", std::process::id(), tag));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_push_and_index() {
        let dir = temp_dir("push");
        let mut buf: MmapBuffer<i32> = MmapBuffer::create(&dir.join("ints.bin"), 16).unwrap();
        assert!(buf.is_empty());

        for i in 0..10 {
            buf.push(i * 3).unwrap();
        }
        assert_eq!(buf.len(), 10);
        assert_eq!(buf[0], 0);
        assert_eq!(buf[9], 27);

        buf[4] = -1;
        assert_eq!(buf[4], -1);
        assert_eq!(buf.as_slice().len(), 10);
    }

    #[test]
    fn test_overflow_is_an_error() {
        let dir = temp_dir("overflow");
        let mut buf: MmapBuffer<u8> = MmapBuffer::create(&dir.join("bytes.bin"), 2).unwrap();
        buf.push(1).unwrap();
        buf.push(2).unwrap();
        let err = buf.push(3).unwrap_err();
        match err {
            SolverError::BufferOverflow { file, limit } => {
                assert_eq!(file, "bytes.bin");
                assert_eq!(limit, 2);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    #[should_panic]
    fn test_out_of_bounds_read_panics() {
        let dir = temp_dir("oob");
        let mut buf: MmapBuffer<i32> = MmapBuffer::create(&dir.join("oob.bin"), 8).unwrap();
        buf.push(1).unwrap();
        let _ = buf[3];
    }

    #[test]
    fn test_clear_keeps_capacity() {
        let dir = temp_dir("clear");
        let mut buf: MmapBuffer<i32> = MmapBuffer::create(&dir.join("clear.bin"), 4).unwrap();
        buf.push(7).unwrap();
        buf.clear();
        assert_eq!(buf.len(), 0);
        assert_eq!(buf.capacity(), 4);
        buf.push(9).unwrap();
        assert_eq!(buf[0], 9);
    }

    #[test]
    fn test_file_size_matches_capacity() {
        let dir = temp_dir("filesize");
        let path = dir.join("sized.bin");
        let _buf: MmapBuffer<u64> = MmapBuffer::create(&path, 100).unwrap();
        let meta = std::fs::metadata(&path).unwrap();
        assert_eq!(meta.len(), 800);
    }

    #[test]
    fn test_pool_construction() {
        let dir = temp_dir("pool");
        let capacity = PoolCapacity {
            nodes: 128,
            actions: 256,
            child_ids: 256,
            chance_cards: 64,
        };
        let mut pool = TreeDataPool::with_capacity(&dir, capacity).unwrap();
        pool.nodes.push(Node::placeholder()).unwrap();
        pool.actions
            .push(Action::new(crate::tree::node::ActionKind::Check, 0.0))
            .unwrap();
        pool.child_ids.push(1).unwrap();
        pool.chance_cards.push(12).unwrap();

        pool.clear();
        assert!(pool.nodes.is_empty());
        assert!(pool.actions.is_empty());
        assert!(pool.child_ids.is_empty());
        assert!(pool.chance_cards.is_empty());
    }
}
