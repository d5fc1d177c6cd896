//! The archive engine.
//!
//! An [`Archive`] binds one [`ArchiveStore`] to one [`ArchiveMode`] for its
//! whole life and streams typed values through it. Saving is two sequential
//! sessions:
//!
//! 1. A [`ArchiveMode::CreateDirectory`] archive over a
//!    [`crate::store::NullStore`] visits the graph and records the
//!    [`Directory`]: class versions, interned names, one entry per distinct
//!    object and the total payload length.
//! 2. A [`ArchiveMode::Save`] archive over the real store receives that
//!    directory through [`Archive::set_internal_data_state`], writes it after
//!    the header, then streams the same graph again as the payload.
//!
//! Loading is one session in [`ArchiveMode::Load`] (random access, objects
//! can be fetched by slot) or [`ArchiveMode::LoadLinear`] (forward only).
//!
//! ```ignore
//! let mut arc = Archive::new(MemoryNoCopyStore::new(&bytes), ArchiveMode::Load,
//!                            ByteOrder::LittleEndian, registry.clone());
//! arc.open()?;
//! arc.stream(&mut scene)?;
//! arc.close()?;
//! ```
//!
//! The first failing operation marks the archive invalid. Every later
//! operation returns [`Error::InvalidArchive`] and leaves caller values
//! untouched.

mod codec;
mod directory;
mod format;
mod object;
mod progress;
mod stream;


pub use codec::{Primitive, MAX_PRIMITIVE_SIZE};
pub use directory::{ClassVersion, Directory, DirectoryEntry};
pub use format::*;
pub use progress::ProgressCallback;
pub use stream::{Name, Streamable};

use std::collections::HashMap;
use std::sync::Arc;

use crate::registry::{ClassRegistry, ObjectRef};
use crate::store::ArchiveStore;
use crate::util::{Error, Result};
use progress::Progress;

/// One archive session over one store.
pub struct Archive<'s> {
    store: Box<dyn ArchiveStore + 's>,
    mode: ArchiveMode,
    byte_order: ByteOrder,
    registry: Arc<ClassRegistry>,
    info: ArchiveInfo,
    format_version: u16,
    valid: bool,
    opened: bool,
    closed: bool,
    /// Set while the header or directory is streamed.
    in_header: bool,
    /// Bytes streamed so far, header included.
    pos: u64,
    /// Stream position of the first payload byte, once known.
    payload_start: Option<u64>,
    directory: Directory,
    /// Save side of the object table: object address -> slot.
    saved: HashMap<usize, u32>,
    next_slot: u32,
    /// Load side of the object table: slot -> instance.
    loaded: Vec<Option<ObjectRef>>,
    progress: Option<Progress<'s>>,
}

impl<'s> Archive<'s> {
    /// Bind a store and a mode. Nothing touches the store until [`Self::open`].
    ///
    /// `byte_order` is used when saving; loads take the order from the
    /// archive header.
    pub fn new(
        store: impl ArchiveStore + 's,
        mode: ArchiveMode,
        byte_order: ByteOrder,
        registry: Arc<ClassRegistry>,
    ) -> Self {
        Self::from_boxed(Box::new(store), mode, byte_order, registry)
    }

    /// Like [`Self::new`] for an already boxed store.
    pub fn from_boxed(
        store: Box<dyn ArchiveStore + 's>,
        mode: ArchiveMode,
        byte_order: ByteOrder,
        registry: Arc<ClassRegistry>,
    ) -> Self {
        Self {
            store,
            mode,
            byte_order,
            registry,
            info: ArchiveInfo::default(),
            format_version: FORMAT_VERSION,
            valid: false,
            opened: false,
            closed: false,
            in_header: false,
            pos: 0,
            payload_start: None,
            directory: Directory::new(),
            saved: HashMap::new(),
            next_slot: 0,
            loaded: Vec::new(),
            progress: None,
        }
    }

    /// Writer identity to put in the header on save.
    pub fn with_info(mut self, info: ArchiveInfo) -> Self {
        self.info = info;
        self
    }

    // ========================================================================
    // Session lifecycle
    // ========================================================================

    /// Open the store and ready the session.
    ///
    /// Save mode writes the header. Load modes read the header and the
    /// directory. On failure the store is closed again and the archive stays
    /// invalid.
    pub fn open(&mut self) -> Result<()> {
        if self.opened {
            return Err(Error::other("archive already opened"));
        }
        self.opened = true;

        let result = self.open_session();
        if result.is_err() {
            self.valid = false;
            let _ = self.store.close();
        }
        result
    }

    fn open_session(&mut self) -> Result<()> {
        match self.mode {
            ArchiveMode::CreateDirectory => {
                self.store.open_write()?;
                self.valid = true;
                self.payload_start = Some(0);
            }
            ArchiveMode::Save => {
                self.store.open_write()?;
                self.valid = true;
                self.write_header()?;
            }
            ArchiveMode::Load | ArchiveMode::LoadLinear => {
                self.store.open_read()?;
                self.valid = true;
                self.read_header()?;

                let mut directory = Directory::new();
                self.header_phase(|arc| directory.stream(arc))?;
                self.loaded = vec![None; directory.num_objects()];
                self.directory = directory;
                self.payload_start = Some(self.pos);
                self.update_progress_total();
            }
        }
        Ok(())
    }

    fn write_header(&mut self) -> Result<()> {
        self.header_phase(|arc| {
            arc.write_data(ARCHIVE_MAGIC)?;
            let mut tag = arc.byte_order.tag();
            arc.stream(&mut tag)?;
            let mut version = FORMAT_VERSION;
            arc.stream(&mut version)?;
            let mut info = arc.info.clone();
            arc.stream(&mut info)
        })
    }

    fn read_header(&mut self) -> Result<()> {
        self.header_phase(|arc| {
            let mut magic = [0u8; 3];
            arc.read_data(&mut magic)?;
            if &magic != ARCHIVE_MAGIC {
                return Err(Error::InvalidMagic);
            }

            let mut tag = 0u8;
            arc.stream(&mut tag)?;
            arc.byte_order = ByteOrder::from_tag(tag).ok_or(Error::InvalidMagic)?;

            let mut version = 0u16;
            arc.stream(&mut version)?;
            if version > FORMAT_VERSION {
                return Err(Error::UnsupportedVersion(version));
            }
            arc.format_version = version;

            let mut info = ArchiveInfo::default();
            arc.stream(&mut info)?;
            arc.info = info;
            Ok(())
        })
    }

    fn header_phase<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.in_header = true;
        let result = f(self);
        self.in_header = false;
        self.track(result)
    }

    /// Finish the session and close the store.
    ///
    /// A save is only reported successful if every directory entry was
    /// written and the payload has exactly the length the directory pass
    /// predicted. Closing twice is a no-op.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let verified = if self.valid && self.mode == ArchiveMode::Save {
            self.verify_save_complete()
        } else {
            Ok(())
        };
        let closed = if self.opened { self.store.close() } else { Ok(()) };
        let was_valid = self.valid;
        self.valid = false;

        verified?;
        closed?;
        if self.opened && !was_valid {
            return Err(Error::InvalidArchive);
        }
        Ok(())
    }

    fn verify_save_complete(&self) -> Result<()> {
        if self.payload_start.is_none() {
            return Err(Error::mismatch("save finished without a directory"));
        }
        let expected = self.directory.num_objects();
        if self.next_slot as usize != expected {
            return Err(Error::mismatch(format!(
                "saved {} objects, directory lists {}",
                self.next_slot, expected
            )));
        }
        let expected = self.directory.payload_length() as u64;
        if self.payload_pos() != expected {
            return Err(Error::mismatch(format!(
                "payload is {} bytes, directory pass measured {}",
                self.payload_pos(),
                expected
            )));
        }
        Ok(())
    }

    /// Consume the archive and hand back its store.
    pub fn into_store(self) -> Box<dyn ArchiveStore + 's> {
        self.store
    }

    // ========================================================================
    // Directory handoff
    // ========================================================================

    /// Snapshot of the directory recorded so far by a directory pass.
    ///
    /// The payload length is the number of payload bytes streamed until now,
    /// so call this after the whole graph has been streamed.
    pub fn internal_data(&self) -> Result<Directory> {
        self.expect_mode(ArchiveMode::CreateDirectory)?;
        self.ensure_valid()?;
        let mut directory = self.directory.clone();
        directory.set_payload_length(self.payload_offset()?);
        Ok(directory)
    }

    /// Seed a save pass with the directory from a directory pass.
    ///
    /// Writes the directory immediately after the header; payload streaming
    /// is refused until this has been called.
    pub fn set_internal_data_state(&mut self, directory: Directory) -> Result<()> {
        let result = self.seed_directory(directory);
        self.track(result)
    }

    fn seed_directory(&mut self, mut directory: Directory) -> Result<()> {
        self.expect_mode(ArchiveMode::Save)?;
        self.ensure_valid()?;
        if self.payload_start.is_some() {
            return Err(Error::other("directory already written"));
        }
        self.header_phase(|arc| directory.stream(arc))?;
        self.directory = directory;
        self.payload_start = Some(self.pos);
        self.update_progress_total();
        Ok(())
    }

    // ========================================================================
    // Streaming
    // ========================================================================

    /// Stream any [`Streamable`] value in the archive's direction.
    pub fn stream<T: Streamable>(&mut self, value: &mut T) -> Result<()> {
        let result = value.stream(self);
        self.track(result)
    }

    /// Encode or decode one fixed-width value in the archive byte order.
    ///
    /// On load `value` is assigned only after the bytes were read.
    pub fn stream_primitive<P: Primitive>(&mut self, value: &mut P) -> Result<()> {
        let mut buf = [0u8; MAX_PRIMITIVE_SIZE];
        let buf = &mut buf[..P::SIZE];
        if self.mode.is_saving() {
            value.encode(self.byte_order, buf);
            self.write_data(buf)
        } else {
            self.read_data(buf)?;
            *value = P::decode(self.byte_order, buf);
            Ok(())
        }
    }

    /// Stream a length-prefixed byte blob without per-element dispatch.
    pub fn stream_bytes(&mut self, data: &mut Vec<u8>) -> Result<()> {
        let mut len =
            u32::try_from(data.len()).map_err(|_| Error::invalid("blob longer than 4 GiB"))?;
        self.stream_primitive(&mut len)?;
        if self.mode.is_saving() {
            self.write_data(data)
        } else {
            self.check_remaining(len as u64)?;
            let mut buf = vec![0u8; len as usize];
            self.read_data(&mut buf)?;
            *data = buf;
            Ok(())
        }
    }

    /// Stream an interned name as its name-table index.
    pub fn stream_name(&mut self, name: &mut Name) -> Result<()> {
        let result = self.stream_name_index(name);
        self.track(result)
    }

    fn stream_name_index(&mut self, name: &mut Name) -> Result<()> {
        self.ensure_valid()?;
        match self.mode {
            ArchiveMode::CreateDirectory => {
                let mut index = self.directory.add_name(name.as_str())?;
                self.stream_primitive(&mut index)
            }
            ArchiveMode::Save => {
                let mut index = self.directory.find_name(name.as_str()).ok_or_else(|| {
                    Error::mismatch(format!("name {name:?} was not seen by the directory pass"))
                })?;
                self.stream_primitive(&mut index)
            }
            ArchiveMode::Load | ArchiveMode::LoadLinear => {
                let mut index = 0u32;
                self.stream_primitive(&mut index)?;
                let text = self
                    .directory
                    .name(index)
                    .ok_or_else(|| Error::UnknownName(format!("#{index}")))?;
                *name = Name::new(text);
                Ok(())
            }
        }
    }

    // ========================================================================
    // Class versions
    // ========================================================================

    /// Version of a registered class for this archive.
    ///
    /// Directory pass: the class's current registered version, recorded in
    /// the class table. Save: the recorded version. Load: the version the
    /// archive was written with.
    pub fn serialize_class_version(&mut self, class_name: &str) -> Result<u16> {
        let result = self.class_version(class_name, None);
        self.track(result)
    }

    /// Like [`Self::serialize_class_version`] for types outside the registry,
    /// which state their current version explicitly.
    pub fn serialize_type_version(&mut self, type_name: &str, current: u16) -> Result<u16> {
        let result = self.class_version(type_name, Some(current));
        self.track(result)
    }

    fn class_version(&mut self, name: &str, current: Option<u16>) -> Result<u16> {
        self.ensure_valid()?;
        if self.mode == ArchiveMode::CreateDirectory {
            if let Some(version) = self.directory.find_class_version(name) {
                return Ok(version);
            }
            let version = match current {
                Some(version) => version,
                None => self
                    .registry
                    .current_version(name)
                    .ok_or_else(|| Error::UnknownClass(name.to_string()))?,
            };
            self.directory.insert_class_version(name, version);
            return Ok(version);
        }
        self.directory.find_class_version(name).ok_or_else(|| {
            Error::mismatch(format!("no version recorded for class {name}"))
        })
    }

    // ========================================================================
    // Progress
    // ========================================================================

    /// Report progress through `callback` whenever at least
    /// `update_frequency` (a fraction of the payload) more has been streamed.
    ///
    /// Fires during loads and saves. A directory pass has no known total and
    /// never reports.
    pub fn register_progress_callback(
        &mut self,
        callback: impl FnMut(f32) + 's,
        update_frequency: f32,
    ) {
        self.progress = Some(Progress::new(Box::new(callback), update_frequency));
        self.update_progress_total();
    }

    fn update_progress_total(&mut self) {
        if self.mode == ArchiveMode::CreateDirectory || self.payload_start.is_none() {
            return;
        }
        let total = self.directory.payload_length() as u64;
        if let Some(progress) = self.progress.as_mut() {
            progress.set_total(total);
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    #[inline]
    pub fn mode(&self) -> ArchiveMode {
        self.mode
    }

    #[inline]
    pub fn is_loading(&self) -> bool {
        self.mode.is_loading()
    }

    /// True for both the directory pass and the save pass.
    #[inline]
    pub fn is_saving(&self) -> bool {
        self.mode.is_saving()
    }

    #[inline]
    pub fn is_creating_directory(&self) -> bool {
        self.mode == ArchiveMode::CreateDirectory
    }

    /// Whether the session opened successfully and nothing has failed since.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Byte order of the payload. After a load, the order from the header.
    #[inline]
    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    /// Writer identity: the one being written, or the one read on load.
    #[inline]
    pub fn info(&self) -> &ArchiveInfo {
        &self.info
    }

    /// Format version of the archive being read or written.
    #[inline]
    pub fn format_version(&self) -> u16 {
        self.format_version
    }

    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    pub fn registry(&self) -> &Arc<ClassRegistry> {
        &self.registry
    }

    pub fn store(&self) -> &dyn ArchiveStore {
        self.store.as_ref()
    }

    /// Bytes streamed so far, header and directory included.
    #[inline]
    pub fn tell(&self) -> u64 {
        self.pos
    }

    /// Offset into the payload, or 0 before the payload starts.
    #[inline]
    pub fn payload_pos(&self) -> u64 {
        self.payload_start.map_or(0, |start| self.pos.saturating_sub(start))
    }

    fn payload_offset(&self) -> Result<u32> {
        u32::try_from(self.payload_pos()).map_err(|_| Error::invalid("payload exceeds 4 GiB"))
    }

    // ========================================================================
    // Raw I/O
    // ========================================================================

    #[inline]
    fn track<T>(&mut self, result: Result<T>) -> Result<T> {
        if result.is_err() {
            self.valid = false;
        }
        result
    }

    fn ensure_valid(&self) -> Result<()> {
        if self.valid {
            Ok(())
        } else {
            Err(Error::InvalidArchive)
        }
    }

    fn expect_mode(&self, expected: ArchiveMode) -> Result<()> {
        if self.mode == expected {
            Ok(())
        } else {
            Err(Error::WrongMode {
                expected: expected.name().to_string(),
                actual: self.mode.name().to_string(),
            })
        }
    }

    fn check_ready(&self) -> Result<()> {
        self.ensure_valid()?;
        if !self.in_header && self.payload_start.is_none() {
            return Err(Error::mismatch("payload streamed before the directory was set"));
        }
        Ok(())
    }

    /// Write raw bytes at the current position.
    pub(crate) fn write_data(&mut self, bytes: &[u8]) -> Result<()> {
        let result = self.check_ready().and_then(|()| self.store.write(bytes));
        self.track(result)?;
        self.advance(bytes.len() as u64);
        Ok(())
    }

    /// Fill `buf` from the current position.
    pub(crate) fn read_data(&mut self, buf: &mut [u8]) -> Result<()> {
        let result = self.check_ready().and_then(|()| self.store.read(buf));
        self.track(result)?;
        self.advance(buf.len() as u64);
        Ok(())
    }

    /// Bytes left to read, or `None` when the store cannot tell.
    pub(crate) fn remaining(&self) -> Option<u64> {
        let length = self.store.data_length();
        if !self.mode.is_loading() || length == 0 {
            return None;
        }
        Some(length.saturating_sub(self.store.tell()))
    }

    /// Fail early when a decoded byte count cannot fit in the rest of the store.
    pub(crate) fn check_remaining(&mut self, needed: u64) -> Result<()> {
        let Some(remaining) = self.remaining() else {
            return Ok(());
        };
        let at = self.store.tell();
        if needed > remaining {
            self.valid = false;
            return Err(Error::UnexpectedEof(at + needed));
        }
        Ok(())
    }

    fn seek_to(&mut self, pos: u64) -> Result<()> {
        let result = self.store.seek(pos);
        self.track(result)?;
        self.pos = pos;
        Ok(())
    }

    fn advance(&mut self, n: u64) {
        self.pos += n;
        if self.in_header {
            return;
        }
        let done = self.payload_pos();
        if let Some(progress) = self.progress.as_mut() {
            progress.update(done);
        }
    }
}

impl std::fmt::Debug for Archive<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Archive")
            .field("store", &self.store.name())
            .field("mode", &self.mode)
            .field("byte_order", &self.byte_order)
            .field("valid", &self.valid)
            .field("pos", &self.pos)
            .field("objects", &self.directory.num_objects())
            .finish()
    }
}
