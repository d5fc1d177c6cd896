//! Unbuffered file store.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use super::{ArchiveStore, StoreMode};
use crate::util::{Error, Result};

/// Pass-through store over an OS file handle.
///
/// No buffering beyond what the OS does. Suited to large archives where
/// holding the whole file in memory is not acceptable.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    file: Option<File>,
    mode: StoreMode,
    pos: u64,
    len: u64,
}

impl FileStore {
    /// Create a store for the given path. Nothing is opened yet.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            file: None,
            mode: StoreMode::Closed,
            pos: 0,
            len: 0,
        }
    }

    /// Path this store reads from or writes to.
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn file_mut(&mut self) -> Result<&mut File> {
        self.file.as_mut().ok_or(Error::NotOpen)
    }
}

/// Map an open error, turning "not found" into [`Error::FileNotFound`].
pub(crate) fn open_error(path: &Path, e: std::io::Error) -> Error {
    if e.kind() == std::io::ErrorKind::NotFound {
        Error::FileNotFound(path.to_path_buf())
    } else {
        Error::Io(e)
    }
}

impl ArchiveStore for FileStore {
    fn name(&self) -> &'static str {
        "file"
    }

    fn open_read(&mut self) -> Result<()> {
        let file = File::open(&self.path).map_err(|e| open_error(&self.path, e))?;
        self.len = file.metadata()?.len();
        self.file = Some(file);
        self.mode = StoreMode::Read;
        self.pos = 0;
        Ok(())
    }

    fn open_write(&mut self) -> Result<()> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.path)
            .map_err(|e| open_error(&self.path, e))?;
        self.file = Some(file);
        self.mode = StoreMode::Write;
        self.pos = 0;
        self.len = 0;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        let mode = std::mem::take(&mut self.mode);
        if let Some(mut file) = self.file.take() {
            if mode == StoreMode::Write {
                file.flush()?;
                file.sync_all()?;
            }
        }
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<()> {
        self.mode.check_read()?;
        let end = self.pos + buf.len() as u64;
        if end > self.len {
            return Err(Error::UnexpectedEof(end));
        }
        self.file_mut()?.read_exact(buf).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                Error::UnexpectedEof(end)
            } else {
                Error::Io(e)
            }
        })?;
        self.pos = end;
        Ok(())
    }

    fn write(&mut self, buf: &[u8]) -> Result<()> {
        self.mode.check_write()?;
        self.file_mut()?.write_all(buf)?;
        self.pos += buf.len() as u64;
        self.len = self.len.max(self.pos);
        Ok(())
    }

    #[inline]
    fn tell(&self) -> u64 {
        self.pos
    }

    fn seek(&mut self, pos: u64) -> Result<()> {
        if pos > self.len {
            return Err(Error::SeekOutOfBounds { pos, len: self.len });
        }
        self.file_mut()?.seek(SeekFrom::Start(pos))?;
        self.pos = pos;
        Ok(())
    }

    #[inline]
    fn length(&self) -> u64 {
        self.len
    }

    #[inline]
    fn is_valid(&self) -> bool {
        self.file.is_some() && self.mode != StoreMode::Closed
    }
}
