//! Call-site helpers.
//!
//! Uniform wrappers that pick a store, drive the two-pass save or the
//! single-pass load, and report the outcome as a [`Result`]. These are the
//! only functions in the crate that log.
//!
//! ```ignore
//! let registry = Arc::new(ClassRegistry::new());
//! registry.register::<Actor>();
//!
//! let mut scene = Some(new_object(actor));
//! save_to_file(&mut scene, "actor.obj", &registry, SaveOptions::default())?;
//!
//! let mut loaded: Option<ObjectRef> = None;
//! load_from_file(&mut loaded, "actor.obj", &registry, LoadOptions::default().fast(true))?;
//! ```

use std::path::Path;
use std::sync::Arc;

use crate::archive::{
    Archive, ArchiveInfo, ArchiveMode, ByteOrder, Directory, ProgressCallback, Streamable,
    DEFAULT_UPDATE_FREQUENCY,
};
use crate::registry::ClassRegistry;
#[cfg(feature = "mmap")]
use crate::store::MappedFileStore;
use crate::store::{
    ArchiveStore, FastFileStore, FileStore, MemoryNoCopyStore, MemoryStore, NullStore,
};
use crate::util::{Error, Result};

// ============================================================================
// Options
// ============================================================================

/// Settings for a save.
pub struct SaveOptions<'a> {
    /// Byte order of the written archive.
    pub byte_order: ByteOrder,
    /// Writer identity stamped into the header.
    pub info: ArchiveInfo,
    /// Receives the completed fraction while the payload is written.
    pub progress: Option<ProgressCallback<'a>>,
    /// Minimum progress step between callbacks.
    pub update_frequency: f32,
}

impl Default for SaveOptions<'_> {
    fn default() -> Self {
        Self {
            byte_order: ByteOrder::LittleEndian,
            info: ArchiveInfo::default(),
            progress: None,
            update_frequency: DEFAULT_UPDATE_FREQUENCY,
        }
    }
}

impl<'a> SaveOptions<'a> {
    pub fn byte_order(mut self, byte_order: ByteOrder) -> Self {
        self.byte_order = byte_order;
        self
    }

    pub fn info(mut self, info: ArchiveInfo) -> Self {
        self.info = info;
        self
    }

    pub fn progress(mut self, callback: impl FnMut(f32) + 'a) -> Self {
        self.progress = Some(Box::new(callback));
        self
    }

    pub fn update_frequency(mut self, update_frequency: f32) -> Self {
        self.update_frequency = update_frequency;
        self
    }
}

/// Settings for a load.
pub struct LoadOptions<'a> {
    /// Read the whole file up front and load forward-only.
    pub fast: bool,
    /// Serve reads from a memory map instead of file reads.
    pub mmap: bool,
    /// Receives the completed fraction while the payload is read.
    pub progress: Option<ProgressCallback<'a>>,
    /// Minimum progress step between callbacks.
    pub update_frequency: f32,
}

impl Default for LoadOptions<'_> {
    fn default() -> Self {
        Self {
            fast: false,
            mmap: false,
            progress: None,
            update_frequency: DEFAULT_UPDATE_FREQUENCY,
        }
    }
}

impl<'a> LoadOptions<'a> {
    pub fn fast(mut self, fast: bool) -> Self {
        self.fast = fast;
        self
    }

    pub fn mmap(mut self, mmap: bool) -> Self {
        self.mmap = mmap;
        self
    }

    pub fn progress(mut self, callback: impl FnMut(f32) + 'a) -> Self {
        self.progress = Some(Box::new(callback));
        self
    }

    pub fn update_frequency(mut self, update_frequency: f32) -> Self {
        self.update_frequency = update_frequency;
        self
    }

    fn mode(&self) -> ArchiveMode {
        if self.fast {
            ArchiveMode::LoadLinear
        } else {
            ArchiveMode::Load
        }
    }
}

// ============================================================================
// Save
// ============================================================================

/// Run the directory pass over a [`NullStore`] and return its directory.
pub fn create_directory<T: Streamable>(obj: &mut T, registry: &Arc<ClassRegistry>) -> Result<Directory> {
    let mut arc = Archive::new(
        NullStore::new(),
        ArchiveMode::CreateDirectory,
        ByteOrder::native(),
        Arc::clone(registry),
    );
    let result = run_directory_pass(&mut arc, obj);
    let closed = arc.close();
    let directory = result?;
    closed?;

    tracing::debug!(
        objects = directory.num_objects(),
        classes = directory.classes().len(),
        names = directory.names().len(),
        payload_bytes = directory.payload_length(),
        "directory pass complete"
    );
    Ok(directory)
}

fn run_directory_pass<T: Streamable>(arc: &mut Archive<'_>, obj: &mut T) -> Result<Directory> {
    arc.open()?;
    arc.stream(obj)?;
    arc.internal_data()
}

/// Payload size of `obj` in bytes, measured without writing anything.
pub fn measure<T: Streamable>(obj: &mut T, registry: &Arc<ClassRegistry>) -> Result<u64> {
    let _span = tracing::debug_span!("measure").entered();
    create_directory(obj, registry).map(|d| d.payload_length() as u64)
}

/// Save `obj` to a file.
///
/// The directory pass runs before `path` is touched, so a failure there
/// leaves any existing file alone. A partially written file is removed when
/// the save pass fails.
pub fn save_to_file<T: Streamable>(
    obj: &mut T,
    path: impl AsRef<Path>,
    registry: &Arc<ClassRegistry>,
    options: SaveOptions<'_>,
) -> Result<()> {
    let path = path.as_ref();
    let _span = tracing::debug_span!("save_to_file", path = %path.display()).entered();

    let directory = match create_directory(obj, registry) {
        Ok(directory) => directory,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "save failed before writing");
            return Err(err);
        }
    };
    let result = write_archive(obj, FileStore::new(path), directory, registry, options).map(|_| ());
    if let Err(err) = &result {
        tracing::warn!(path = %path.display(), error = %err, "save failed");
        if path.exists() {
            let _ = std::fs::remove_file(path);
        }
    }
    result
}

/// Save `obj` into a fresh buffer holding exactly the archive bytes.
pub fn save_to_memory<T: Streamable>(
    obj: &mut T,
    registry: &Arc<ClassRegistry>,
    options: SaveOptions<'_>,
) -> Result<Vec<u8>> {
    let _span = tracing::debug_span!("save_to_memory").entered();

    let result = create_directory(obj, registry)
        .and_then(|directory| write_archive(obj, MemoryStore::new(), directory, registry, options))
        .and_then(|store| {
            store
                .into_bytes()
                .ok_or_else(|| Error::other("memory store returned no bytes"))
        });
    match &result {
        Ok(bytes) => tracing::debug!(bytes = bytes.len(), "saved to memory"),
        Err(err) => tracing::warn!(error = %err, "save to memory failed"),
    }
    result
}

fn write_archive<'s, T: Streamable>(
    obj: &mut T,
    store: impl ArchiveStore + 's,
    directory: Directory,
    registry: &Arc<ClassRegistry>,
    options: SaveOptions<'s>,
) -> Result<Box<dyn ArchiveStore + 's>> {
    let SaveOptions { byte_order, info, progress, update_frequency } = options;
    let mut arc =
        Archive::new(store, ArchiveMode::Save, byte_order, Arc::clone(registry)).with_info(info);
    if let Some(callback) = progress {
        arc.register_progress_callback(callback, update_frequency);
    }

    let result = run_save_pass(&mut arc, obj, directory);
    let closed = arc.close();
    result?;
    closed?;
    tracing::debug!(bytes = arc.tell(), store = arc.store().name(), "save pass complete");
    Ok(arc.into_store())
}

fn run_save_pass<T: Streamable>(arc: &mut Archive<'_>, obj: &mut T, directory: Directory) -> Result<()> {
    arc.open()?;
    arc.set_internal_data_state(directory)?;
    arc.stream(obj)
}

// ============================================================================
// Load
// ============================================================================

/// Load `obj` from a file, returning the writer identity from its header.
///
/// With [`LoadOptions::fast`] the file is read into memory in one go and
/// loaded forward-only; with [`LoadOptions::mmap`] it is memory mapped.
pub fn load_from_file<T: Streamable>(
    obj: &mut T,
    path: impl AsRef<Path>,
    registry: &Arc<ClassRegistry>,
    options: LoadOptions<'_>,
) -> Result<ArchiveInfo> {
    let path = path.as_ref();
    let _span = tracing::debug_span!("load_from_file", path = %path.display(), fast = options.fast)
        .entered();

    let store = file_store(path, &options);
    let result = read_archive(obj, store, registry, options);
    if let Err(err) = &result {
        tracing::warn!(path = %path.display(), error = %err, "load failed");
    }
    result
}

/// Load `obj` from archive bytes without copying them.
pub fn load_from_memory<T: Streamable>(
    obj: &mut T,
    bytes: &[u8],
    registry: &Arc<ClassRegistry>,
    options: LoadOptions<'_>,
) -> Result<ArchiveInfo> {
    let _span = tracing::debug_span!("load_from_memory", bytes = bytes.len()).entered();

    let result = read_archive(obj, Box::new(MemoryNoCopyStore::new(bytes)), registry, options);
    if let Err(err) = &result {
        tracing::warn!(error = %err, "load from memory failed");
    }
    result
}

#[cfg(feature = "mmap")]
fn file_store<'s>(path: &Path, options: &LoadOptions<'_>) -> Box<dyn ArchiveStore + 's> {
    if options.mmap {
        Box::new(MappedFileStore::new(path))
    } else if options.fast {
        Box::new(FastFileStore::new(path))
    } else {
        Box::new(FileStore::new(path))
    }
}

#[cfg(not(feature = "mmap"))]
fn file_store<'s>(path: &Path, options: &LoadOptions<'_>) -> Box<dyn ArchiveStore + 's> {
    if options.mmap || options.fast {
        Box::new(FastFileStore::new(path))
    } else {
        Box::new(FileStore::new(path))
    }
}

fn read_archive<'s, T: Streamable>(
    obj: &mut T,
    store: Box<dyn ArchiveStore + 's>,
    registry: &Arc<ClassRegistry>,
    options: LoadOptions<'s>,
) -> Result<ArchiveInfo> {
    let mode = options.mode();
    let LoadOptions { progress, update_frequency, .. } = options;
    let mut arc = Archive::from_boxed(store, mode, ByteOrder::native(), Arc::clone(registry));
    if let Some(callback) = progress {
        arc.register_progress_callback(callback, update_frequency);
    }

    let result = run_load_pass(&mut arc, obj);
    let closed = arc.close();
    result?;
    closed?;
    tracing::debug!(
        objects = arc.directory().num_objects(),
        bytes = arc.tell(),
        writer = %arc.info().writer_version_string(),
        "load complete"
    );
    Ok(arc.info().clone())
}

fn run_load_pass<T: Streamable>(arc: &mut Archive<'_>, obj: &mut T) -> Result<()> {
    arc.open()?;
    arc.stream(obj)
}
