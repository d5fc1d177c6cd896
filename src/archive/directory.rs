//! The archive directory.
//!
//! Built by the directory pass, handed by value to the save pass and written
//! ahead of the payload. It carries the class-version table, the interned
//! name table, the payload length and one entry per distinct object.

use std::collections::HashMap;

use super::format::DIRECTORY_VERSION;
use super::stream::Streamable;
use super::Archive;
use crate::util::{Error, Result};

/// Version of one class at the time the archive was written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassVersion {
    pub name: String,
    pub version: u16,
}

impl Streamable for ClassVersion {
    fn stream(&mut self, arc: &mut Archive<'_>) -> Result<()> {
        arc.stream(&mut self.name)?;
        arc.stream(&mut self.version)
    }
}

/// Location and type of one object in the payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryEntry {
    /// Concrete class name.
    pub class_name: String,
    /// Class version at write time.
    pub version: u16,
    /// Body start, relative to the payload start.
    pub offset: u32,
    /// Body length in bytes, including nested objects defined inside it.
    pub length: u32,
}

impl Streamable for DirectoryEntry {
    fn stream(&mut self, arc: &mut Archive<'_>) -> Result<()> {
        arc.stream(&mut self.class_name)?;
        arc.stream(&mut self.version)?;
        arc.stream(&mut self.offset)?;
        arc.stream(&mut self.length)
    }
}

/// Index written ahead of the payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directory {
    classes: Vec<ClassVersion>,
    names: Vec<String>,
    name_index: HashMap<String, u32>,
    payload_length: u32,
    entries: Vec<DirectoryEntry>,
}

impl Directory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Class versions
    // ========================================================================

    /// Record `version` for `name` unless the class is already present.
    pub fn insert_class_version(&mut self, name: &str, version: u16) {
        if self.class_index(name).is_none() {
            self.classes.push(ClassVersion { name: name.to_string(), version });
        }
    }

    /// Version recorded for `name`.
    pub fn find_class_version(&self, name: &str) -> Option<u16> {
        self.classes.iter().find(|c| c.name == name).map(|c| c.version)
    }

    /// Position of `name` in the class table.
    pub fn class_index(&self, name: &str) -> Option<u16> {
        self.classes
            .iter()
            .position(|c| c.name == name)
            .and_then(|i| u16::try_from(i).ok())
    }

    /// Class table entry at `index`.
    pub fn class_at(&self, index: u16) -> Option<&ClassVersion> {
        self.classes.get(index as usize)
    }

    /// The whole class table, in first-use order.
    pub fn classes(&self) -> &[ClassVersion] {
        &self.classes
    }

    // ========================================================================
    // Names
    // ========================================================================

    /// Intern `name`, returning its index.
    pub fn add_name(&mut self, name: &str) -> Result<u32> {
        if let Some(index) = self.find_name(name) {
            return Ok(index);
        }
        let index = u32::try_from(self.names.len())
            .map_err(|_| Error::invalid("name table overflow"))?;
        self.names.push(name.to_string());
        self.name_index.insert(name.to_string(), index);
        Ok(index)
    }

    /// Index of an interned name.
    pub fn find_name(&self, name: &str) -> Option<u32> {
        self.name_index.get(name).copied()
    }

    /// Name at `index`.
    pub fn name(&self, index: u32) -> Option<&str> {
        self.names.get(index as usize).map(String::as_str)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    fn reindex_names(&mut self) {
        self.name_index = self
            .names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), i as u32))
            .collect();
    }

    // ========================================================================
    // Objects
    // ========================================================================

    /// Object entries in slot order.
    pub fn entries(&self) -> &[DirectoryEntry] {
        &self.entries
    }

    /// Entry for `slot`.
    pub fn entry(&self, slot: u32) -> Option<&DirectoryEntry> {
        self.entries.get(slot as usize)
    }

    pub(crate) fn entry_mut(&mut self, slot: u32) -> Option<&mut DirectoryEntry> {
        self.entries.get_mut(slot as usize)
    }

    pub(crate) fn push_entry(&mut self, entry: DirectoryEntry) {
        self.entries.push(entry);
    }

    /// Number of distinct objects in the payload.
    #[inline]
    pub fn num_objects(&self) -> usize {
        self.entries.len()
    }

    /// Payload size in bytes.
    #[inline]
    pub fn payload_length(&self) -> u32 {
        self.payload_length
    }

    pub(crate) fn set_payload_length(&mut self, length: u32) {
        self.payload_length = length;
    }
}

impl Streamable for Directory {
    fn stream(&mut self, arc: &mut Archive<'_>) -> Result<()> {
        let mut version = DIRECTORY_VERSION;
        arc.stream(&mut version)?;
        if version > DIRECTORY_VERSION {
            return Err(Error::UnsupportedVersion(version));
        }

        arc.stream(&mut self.classes)?;
        arc.stream(&mut self.names)?;
        arc.stream(&mut self.payload_length)?;
        arc.stream(&mut self.entries)?;

        if arc.is_loading() {
            self.reindex_names();
            for entry in &self.entries {
                if entry.offset as u64 + entry.length as u64 > self.payload_length as u64 {
                    return Err(Error::invalid(format!(
                        "object {} at {}+{} exceeds payload length {}",
                        entry.class_name, entry.offset, entry.length, self.payload_length
                    )));
                }
            }
        }
        Ok(())
    }
}
