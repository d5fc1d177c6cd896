//! Read-only store over a borrowed buffer.

use super::{ArchiveStore, SliceCursor};
use crate::util::{Error, Result};

/// Read-only view over a caller-owned buffer.
///
/// Never copies or frees the bytes; the borrow keeps the buffer alive for
/// as long as the store (and the archive that owns it) exists. An empty
/// buffer is treated as "no buffer" and fails [`ArchiveStore::open_read`].
#[derive(Debug)]
pub struct MemoryNoCopyStore<'a> {
    cursor: SliceCursor<&'a [u8]>,
    open: bool,
}

impl<'a> MemoryNoCopyStore<'a> {
    /// Wrap `data` without copying it.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            cursor: SliceCursor::new(data),
            open: false,
        }
    }

    fn check_open(&self) -> Result<()> {
        if self.open {
            Ok(())
        } else {
            Err(Error::NotOpen)
        }
    }
}

impl ArchiveStore for MemoryNoCopyStore<'_> {
    fn name(&self) -> &'static str {
        "memory-no-copy"
    }

    fn open_read(&mut self) -> Result<()> {
        if self.cursor.len() == 0 {
            return Err(Error::UnexpectedEof(0));
        }
        self.cursor.seek(0)?;
        self.open = true;
        Ok(())
    }

    fn open_write(&mut self) -> Result<()> {
        Err(Error::ReadOnly)
    }

    fn close(&mut self) -> Result<()> {
        self.open = false;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<()> {
        self.check_open()?;
        self.cursor.read(buf)
    }

    fn write(&mut self, _buf: &[u8]) -> Result<()> {
        Err(Error::ReadOnly)
    }

    #[inline]
    fn tell(&self) -> u64 {
        self.cursor.tell()
    }

    fn seek(&mut self, pos: u64) -> Result<()> {
        self.check_open()?;
        self.cursor.seek(pos)
    }

    #[inline]
    fn length(&self) -> u64 {
        self.cursor.len()
    }

    #[inline]
    fn is_valid(&self) -> bool {
        self.open
    }
}
