//! Owned, growable in-memory store.

use super::{ArchiveStore, StoreMode};
use crate::util::{Error, Result};

/// Smallest allocation made on the first write to an empty store.
const MIN_GROW_CAPACITY: usize = 1024;

/// In-memory store owning its buffer.
///
/// Constructed empty it is a write sink whose buffer doubles whenever a
/// write runs past the current capacity; it never shrinks. Constructed from
/// bytes it holds a private copy for reading.
///
/// Capacity and bytes in use are tracked separately: [`ArchiveStore::length`]
/// is the capacity including any unused tail, [`MemoryStore::size`] is the
/// number of bytes actually written. Use `size` when embedding the output in
/// another container.
#[derive(Debug, Default)]
pub struct MemoryStore {
    /// Backing buffer; `buf.len()` is the capacity.
    buf: Vec<u8>,
    size: usize,
    pos: usize,
    mode: StoreMode,
}

impl MemoryStore {
    /// Create an empty write sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty write sink with `capacity` bytes preallocated.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: vec![0; capacity],
            ..Self::default()
        }
    }

    /// Create a readable store holding a copy of `data`.
    pub fn from_bytes(data: &[u8]) -> Self {
        Self {
            buf: data.to_vec(),
            size: data.len(),
            pos: 0,
            mode: StoreMode::Closed,
        }
    }

    /// Number of bytes written (or supplied at construction).
    #[inline]
    pub fn size(&self) -> u64 {
        self.size as u64
    }

    /// Bytes in use.
    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.buf[..self.size]
    }

    fn reserve_for(&mut self, end: usize) {
        if end <= self.buf.len() {
            return;
        }
        let doubled = (self.buf.len() * 2).max(MIN_GROW_CAPACITY);
        self.buf.resize(doubled.max(end), 0);
    }
}

impl ArchiveStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn open_read(&mut self) -> Result<()> {
        self.mode = StoreMode::Read;
        self.pos = 0;
        Ok(())
    }

    fn open_write(&mut self) -> Result<()> {
        self.mode = StoreMode::Write;
        self.pos = 0;
        self.size = 0;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        // Bytes stay available for `bytes`/`into_bytes` until drop.
        self.mode = StoreMode::Closed;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<()> {
        self.mode.check_read()?;
        let end = self.pos + buf.len();
        if end > self.size {
            return Err(Error::UnexpectedEof(end as u64));
        }
        buf.copy_from_slice(&self.buf[self.pos..end]);
        self.pos = end;
        Ok(())
    }

    fn write(&mut self, buf: &[u8]) -> Result<()> {
        self.mode.check_write()?;
        let end = self.pos + buf.len();
        self.reserve_for(end);
        self.buf[self.pos..end].copy_from_slice(buf);
        self.pos = end;
        self.size = self.size.max(end);
        Ok(())
    }

    #[inline]
    fn tell(&self) -> u64 {
        self.pos as u64
    }

    fn seek(&mut self, pos: u64) -> Result<()> {
        if self.mode == StoreMode::Closed {
            return Err(Error::NotOpen);
        }
        if pos > self.length() {
            return Err(Error::SeekOutOfBounds { pos, len: self.length() });
        }
        self.pos = pos as usize;
        Ok(())
    }

    #[inline]
    fn length(&self) -> u64 {
        self.buf.len() as u64
    }

    #[inline]
    fn data_length(&self) -> u64 {
        self.size as u64
    }

    #[inline]
    fn is_valid(&self) -> bool {
        self.mode != StoreMode::Closed
    }

    fn into_bytes(self: Box<Self>) -> Option<Vec<u8>> {
        let mut buf = self.buf;
        buf.truncate(self.size);
        Some(buf)
    }
}
