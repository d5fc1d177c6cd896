//! Memory-mapped, read-only file store.

use std::fs::File;
use std::path::{Path, PathBuf};

use memmap2::Mmap;

use super::file::open_error;
use super::{ArchiveStore, SliceCursor};
use crate::util::{Error, Result};

/// Read-only store over a memory map of the file.
///
/// Like [`super::FastFileStore`] every read is served from memory, but pages
/// are faulted in on demand instead of copied up front.
#[derive(Debug)]
pub struct MappedFileStore {
    path: PathBuf,
    cursor: Option<SliceCursor<Mmap>>,
}

impl MappedFileStore {
    /// Create a store for the given path. Nothing is mapped yet.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            cursor: None,
        }
    }

    /// Path this store maps.
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn cursor_mut(&mut self) -> Result<&mut SliceCursor<Mmap>> {
        self.cursor.as_mut().ok_or(Error::NotOpen)
    }
}

impl ArchiveStore for MappedFileStore {
    fn name(&self) -> &'static str {
        "mapped-file"
    }

    fn open_read(&mut self) -> Result<()> {
        let file = File::open(&self.path).map_err(|e| open_error(&self.path, e))?;
        if file.metadata()?.len() == 0 {
            // Zero-length maps are rejected on some platforms.
            return Err(Error::UnexpectedEof(0));
        }
        // Safety: the map is read-only and lives no longer than this store.
        let mmap = unsafe { Mmap::map(&file) }?;
        self.cursor = Some(SliceCursor::new(mmap));
        Ok(())
    }

    fn open_write(&mut self) -> Result<()> {
        Err(Error::ReadOnly)
    }

    fn close(&mut self) -> Result<()> {
        self.cursor = None;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<()> {
        self.cursor_mut()?.read(buf)
    }

    fn write(&mut self, _buf: &[u8]) -> Result<()> {
        Err(Error::ReadOnly)
    }

    #[inline]
    fn tell(&self) -> u64 {
        self.cursor.as_ref().map_or(0, SliceCursor::tell)
    }

    fn seek(&mut self, pos: u64) -> Result<()> {
        self.cursor_mut()?.seek(pos)
    }

    #[inline]
    fn length(&self) -> u64 {
        self.cursor.as_ref().map_or(0, SliceCursor::len)
    }

    #[inline]
    fn is_valid(&self) -> bool {
        self.cursor.is_some()
    }
}
