//! Counting sink.

use super::ArchiveStore;
use crate::util::Result;

/// Store that discards everything written to it and counts the bytes.
///
/// Every operation succeeds. [`ArchiveStore::tell`] and
/// [`ArchiveStore::length`] are always 0: the store is not navigable, it
/// only measures. Used for the directory pass and for sizing object graphs
/// without materialising them.
#[derive(Debug, Default)]
pub struct NullStore {
    written: u64,
    open: bool,
}

impl NullStore {
    /// Create a fresh counter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total bytes written since creation.
    #[inline]
    pub fn bytes_written(&self) -> u64 {
        self.written
    }
}

impl ArchiveStore for NullStore {
    fn name(&self) -> &'static str {
        "null"
    }

    fn open_read(&mut self) -> Result<()> {
        self.open = true;
        Ok(())
    }

    fn open_write(&mut self) -> Result<()> {
        self.open = true;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.open = false;
        Ok(())
    }

    fn read(&mut self, _buf: &mut [u8]) -> Result<()> {
        Ok(())
    }

    fn write(&mut self, buf: &[u8]) -> Result<()> {
        self.written += buf.len() as u64;
        Ok(())
    }

    #[inline]
    fn tell(&self) -> u64 {
        0
    }

    fn seek(&mut self, _pos: u64) -> Result<()> {
        Ok(())
    }

    #[inline]
    fn length(&self) -> u64 {
        0
    }

    #[inline]
    fn is_valid(&self) -> bool {
        self.open
    }

    fn is_seekable(&self) -> bool {
        false
    }
}
