//! Fully-buffered, read-only file store.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use super::file::open_error;
use super::{ArchiveStore, SliceCursor};
use crate::util::{Error, Result};

/// Read-only store that pulls the entire file into one heap allocation on
/// open and serves every later read, seek and tell from memory.
///
/// Trades peak memory (the whole file size) for load speed. The file handle
/// is only held while the contents are read.
#[derive(Debug)]
pub struct FastFileStore {
    path: PathBuf,
    cursor: Option<SliceCursor<Vec<u8>>>,
}

impl FastFileStore {
    /// Create a store for the given path. Nothing is read yet.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            cursor: None,
        }
    }

    /// Path this store loads from.
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn cursor_mut(&mut self) -> Result<&mut SliceCursor<Vec<u8>>> {
        self.cursor.as_mut().ok_or(Error::NotOpen)
    }
}

impl ArchiveStore for FastFileStore {
    fn name(&self) -> &'static str {
        "fast-file"
    }

    fn open_read(&mut self) -> Result<()> {
        let mut file = File::open(&self.path).map_err(|e| open_error(&self.path, e))?;
        let size = file.metadata()?.len() as usize;
        let mut buf = Vec::with_capacity(size);
        file.read_to_end(&mut buf)?;
        self.cursor = Some(SliceCursor::new(buf));
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
