//! # objarchive
//!
//! Binary archives for polymorphic object graphs.
//!
//! Objects are written through an [`Archive`] in two passes: a directory pass
//! over a counting sink records every distinct object, its class and schema
//! version and where it will land, then the save pass writes that directory
//! followed by the payload. Loads are a single pass, either random-access or
//! forward-only.
//!
//! ## Modules
//!
//! - [`util`] - Error and result types
//! - [`store`] - Byte-level backends (file, fast file, mapped file, memory, null)
//! - [`registry`] - Class registry and the polymorphic object traits
//! - [`archive`] - The archive engine, directory and primitive codecs
//! - [`io`] - Load/save helpers for files and memory
//!
//! ## Example
//!
//! ```ignore
//! use objarchive::prelude::*;
//!
//! #[derive(Default)]
//! struct Bone { name: Name, length: f32, parent: Option<ObjectRef> }
//!
//! impl ArchiveClass for Bone {
//!     const CLASS_NAME: &'static str = "Bone";
//!     const VERSION: u16 = 1;
//!
//!     fn serialize(&mut self, arc: &mut Archive<'_>) -> Result<()> {
//!         let version = arc.serialize_class_version(Self::CLASS_NAME)?;
//!         arc.stream(&mut self.name)?;
//!         if version >= 1 {
//!             arc.stream(&mut self.length)?;
//!         }
//!         arc.stream(&mut self.parent)
//!     }
//! }
//!
//! let registry = Arc::new(ClassRegistry::new());
//! registry.register::<Bone>();
//!
//! let mut root = Some(new_object(Bone::default()));
//! let bytes = save_to_memory(&mut root, &registry, SaveOptions::default())?;
//! ```

pub mod archive;
pub mod io;
pub mod registry;
pub mod store;
pub mod util;

// Re-export commonly used types
pub use archive::{Archive, ArchiveInfo, ArchiveMode, ByteOrder, Directory, Name, Streamable};
pub use io::{
    create_directory, load_from_file, load_from_memory, measure, save_to_file, save_to_memory,
    LoadOptions, SaveOptions,
};
pub use registry::{ArchiveClass, ArchiveObject, ClassDesc, ClassRegistry, ObjectRef};
pub use util::{Error, Result};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::archive::{Archive, ArchiveInfo, ArchiveMode, ByteOrder, Name, Streamable};
    pub use crate::io::*;
    pub use crate::registry::{
        downcast_mut, downcast_ref, new_object, ArchiveClass, ClassRegistry, ObjectRef,
    };
    pub use crate::store::*;
    pub use crate::util::{Error, Result};
    pub use std::sync::Arc;
}
