//! Byte-level storage backends for archives.
//!
//! An [`ArchiveStore`] knows only a current position, a total addressable
//! length and raw bytes. It has no concept of objects, types or versions;
//! that is the job of [`crate::archive::Archive`].
//!
//! ## Backends
//!
//! | Store                 | Read | Write | Seek | Notes                                   |
//! |-----------------------|------|-------|------|-----------------------------------------|
//! | [`FileStore`]         | yes  | yes   | yes  | unbuffered pass-through to the OS file  |
//! | [`FastFileStore`]     | yes  | no    | yes  | whole file read into one heap buffer    |
//! | [`MappedFileStore`]   | yes  | no    | yes  | read-only memory map (`mmap` feature)   |
//! | [`MemoryStore`]       | yes  | yes   | yes  | owned, geometrically growing buffer     |
//! | [`MemoryNoCopyStore`] | yes  | no    | yes  | borrows a caller buffer                 |
//! | [`NullStore`]         | -    | count | -    | counts written bytes, discards them     |
//!
//! Misuse (writing to a read-only store, reading past the end, seeking past
//! [`ArchiveStore::length`]) is reported as an `Err`, never a panic.

mod fast_file;
mod file;
#[cfg(feature = "mmap")]
mod mapped;
mod memory;
mod memory_no_copy;
mod null;

pub use fast_file::FastFileStore;
pub use file::FileStore;
#[cfg(feature = "mmap")]
pub use mapped::MappedFileStore;
pub use memory::MemoryStore;
pub use memory_no_copy::MemoryNoCopyStore;
pub use null::NullStore;

use crate::util::{Error, Result};

/// Direction a store has been opened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreMode {
    /// Not opened yet, or closed.
    #[default]
    Closed,
    /// Opened with [`ArchiveStore::open_read`].
    Read,
    /// Opened with [`ArchiveStore::open_write`].
    Write,
}

impl StoreMode {
    /// Check that the store may be read from.
    #[inline]
    pub(crate) fn check_read(self) -> Result<()> {
        match self {
            Self::Read => Ok(()),
            Self::Write => Err(Error::WriteOnly),
            Self::Closed => Err(Error::NotOpen),
        }
    }

    /// Check that the store may be written to.
    #[inline]
    pub(crate) fn check_write(self) -> Result<()> {
        match self {
            Self::Write => Ok(()),
            Self::Read => Err(Error::ReadOnly),
            Self::Closed => Err(Error::NotOpen),
        }
    }
}

/// Byte-level I/O against exactly one physical medium.
///
/// A store is exclusively owned by one [`crate::archive::Archive`] for the
/// duration of one pass.
pub trait ArchiveStore {
    /// Short backend name, used in diagnostics.
    fn name(&self) -> &'static str;

    /// Prepare the medium for reading.
    fn open_read(&mut self) -> Result<()>;

    /// Prepare the medium for writing.
    fn open_write(&mut self) -> Result<()>;

    /// Release medium-specific resources (file handles, mapped views).
    fn close(&mut self) -> Result<()>;

    /// Fill `buf` completely from the current position.
    fn read(&mut self, buf: &mut [u8]) -> Result<()>;

    /// Write all of `buf` at the current position.
    fn write(&mut self, buf: &[u8]) -> Result<()>;

    /// Current offset.
    fn tell(&self) -> u64;

    /// Move to an absolute offset, which must not exceed [`Self::length`].
    fn seek(&mut self, pos: u64) -> Result<()>;

    /// Total addressable length.
    fn length(&self) -> u64;

    /// Bytes holding data. Only a growable sink has an unused tail past this.
    fn data_length(&self) -> u64 {
        self.length()
    }

    /// Whether the store is open and its medium usable.
    fn is_valid(&self) -> bool;

    /// Whether [`Self::seek`] moves a real cursor.
    fn is_seekable(&self) -> bool {
        true
    }

    /// Hand back the bytes written to an in-memory sink.
    ///
    /// Only [`MemoryStore`] returns `Some`.
    fn into_bytes(self: Box<Self>) -> Option<Vec<u8>> {
        None
    }
}

/// Read cursor over any contiguous byte buffer.
///
/// Shared by the stores that serve reads from memory: a borrowed slice
/// ([`MemoryNoCopyStore`]), a heap buffer owned by [`FastFileStore`], or a
/// memory map owned by [`MappedFileStore`].
#[derive(Debug)]
pub(crate) struct SliceCursor<B> {
    data: B,
    pos: u64,
}

impl<B: AsRef<[u8]>> SliceCursor<B> {
    pub(crate) fn new(data: B) -> Self {
        Self { data, pos: 0 }
    }

    #[inline]
    pub(crate) fn len(&self) -> u64 {
        self.data.as_ref().len() as u64
    }

    #[inline]
    pub(crate) fn tell(&self) -> u64 {
        self.pos
    }

    pub(crate) fn read(&mut self, buf: &mut [u8]) -> Result<()> {
        let end = self.pos + buf.len() as u64;
        if end > self.len() {
            return Err(Error::UnexpectedEof(end));
        }
        let start = self.pos as usize;
        buf.copy_from_slice(&self.data.as_ref()[start..end as usize]);
        self.pos = end;
        Ok(())
    }

    pub(crate) fn seek(&mut self, pos: u64) -> Result<()> {
        if pos > self.len() {
            return Err(Error::SeekOutOfBounds { pos, len: self.len() });
        }
        self.pos = pos;
        Ok(())
    }
}
