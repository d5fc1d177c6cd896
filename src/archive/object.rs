//! Polymorphic pointers and the object table.
//!
//! A pointer is written as a `u32` reference: `0` for null, `slot + 1`
//! otherwise. The first time a slot is reached the reference is followed by
//! the class index and the object body; later references to the same object
//! carry only the reference, so aliases survive a round trip and cycles
//! terminate.

use std::rc::Rc;

use super::format::{ArchiveMode, CLASS_INDEX_SIZE, NULL_REF};
use super::{Archive, DirectoryEntry};
use crate::registry::ObjectRef;
use crate::util::{Error, Result};

/// Identity of a live object for the save-side object table.
#[inline]
fn object_key(obj: &ObjectRef) -> usize {
    Rc::as_ptr(obj) as *const () as usize
}

impl<'s> Archive<'s> {
    /// Stream a polymorphic pointer.
    ///
    /// On save the pointee is written once per archive, however many fields
    /// refer to it. On load a fresh instance of the recorded concrete class
    /// is built through the registry, or the already loaded instance is
    /// shared.
    pub fn stream_object(&mut self, obj: &mut Option<ObjectRef>) -> Result<()> {
        let result = if self.is_saving() {
            self.save_object(obj.as_ref())
        } else {
            self.load_object().map(|loaded| *obj = loaded.map(|(_, o)| o))
        };
        self.track(result)
    }

    /// Stream a pointer whose pointee must be `base` or a subclass of it.
    ///
    /// A loaded object of an unrelated class is rejected with
    /// [`Error::NotKindOf`] and `obj` is left untouched.
    pub fn stream_object_of_kind(&mut self, obj: &mut Option<ObjectRef>, base: &str) -> Result<()> {
        let result = self.stream_kind_checked(obj, base);
        self.track(result)
    }

    fn stream_kind_checked(&mut self, obj: &mut Option<ObjectRef>, base: &str) -> Result<()> {
        if self.is_saving() {
            if let Some(target) = obj.as_ref() {
                let class_name = self.saving_class_name(target)?;
                self.check_kind(&class_name, base)?;
            }
            return self.save_object(obj.as_ref());
        }

        let loaded = self.load_object()?;
        if let Some((slot, _)) = loaded.as_ref() {
            let class_name = self
                .directory
                .entry(*slot)
                .map(|e| e.class_name.as_str())
                .unwrap_or_default();
            self.check_kind(class_name, base)?;
        }
        *obj = loaded.map(|(_, o)| o);
        Ok(())
    }

    /// Class of an object on the save side. Objects already in the table may
    /// be mid-serialization, so their class comes from the directory.
    fn saving_class_name(&self, obj: &ObjectRef) -> Result<String> {
        let recorded = self
            .saved
            .get(&object_key(obj))
            .and_then(|&slot| self.directory.entry(slot));
        match recorded {
            Some(entry) => Ok(entry.class_name.clone()),
            None => borrow_class_name(obj).map(str::to_string),
        }
    }

    fn check_kind(&self, class_name: &str, base: &str) -> Result<()> {
        if self.registry.is_kind_of(class_name, base) {
            Ok(())
        } else {
            Err(Error::NotKindOf {
                expected: base.to_string(),
                actual: class_name.to_string(),
            })
        }
    }

    /// Materialise the object in `slot` by seeking to its directory offset.
    ///
    /// Only valid in [`ArchiveMode::Load`]. The stream position is restored
    /// afterwards, so this can be called between ordinary stream operations.
    pub fn load_slot(&mut self, slot: u32) -> Result<ObjectRef> {
        let result = self.load_slot_at(slot);
        self.track(result)
    }

    /// Instance already materialised for `slot`, if any.
    pub fn loaded_object(&self, slot: u32) -> Option<ObjectRef> {
        self.loaded.get(slot as usize).cloned().flatten()
    }

    // ========================================================================
    // Save side
    // ========================================================================

    fn save_object(&mut self, obj: Option<&ObjectRef>) -> Result<()> {
        self.ensure_valid()?;
        let Some(target) = obj else {
            let mut reference = NULL_REF;
            return self.stream_primitive(&mut reference);
        };

        let key = object_key(target);
        if let Some(&slot) = self.saved.get(&key) {
            let mut reference = slot + 1;
            return self.stream_primitive(&mut reference);
        }

        let slot = self.next_slot;
        let mut reference = slot
            .checked_add(1)
            .ok_or_else(|| Error::invalid("object table overflow"))?;
        self.next_slot = reference;
        self.saved.insert(key, slot);
        self.stream_primitive(&mut reference)?;

        let class_name = borrow_class_name(target)?;
        let version = self.serialize_class_version(class_name)?;
        let mut class_index = self
            .directory
            .class_index(class_name)
            .ok_or_else(|| Error::mismatch(format!("class {class_name} missing from class table")))?;
        self.stream_primitive(&mut class_index)?;

        let offset = self.payload_offset()?;
        if self.mode == ArchiveMode::CreateDirectory {
            self.directory.push_entry(DirectoryEntry {
                class_name: class_name.to_string(),
                version,
                offset,
                length: 0,
            });
        } else {
            let entry = self.directory.entry(slot).ok_or_else(|| {
                Error::mismatch(format!("object slot {slot} ({class_name}) not in directory"))
            })?;
            if entry.class_name != class_name || entry.offset != offset {
                return Err(Error::mismatch(format!(
                    "object slot {slot}: directory has {} at {}, streaming {} at {}",
                    entry.class_name, entry.offset, class_name, offset
                )));
            }
        }

        {
            let mut body = target
                .try_borrow_mut()
                .map_err(|_| Error::BorrowConflict(class_name.to_string()))?;
            body.serialize_object(self)?;
        }

        let length = self.payload_offset()? - offset;
        if self.mode == ArchiveMode::CreateDirectory {
            if let Some(entry) = self.directory.entry_mut(slot) {
                entry.length = length;
            }
        } else if self.directory.entry(slot).map(|e| e.length) != Some(length) {
            return Err(Error::mismatch(format!(
                "object slot {slot} ({class_name}) wrote {length} bytes, directory pass measured a different size"
            )));
        }
        Ok(())
    }

    // ========================================================================
    // Load side
    // ========================================================================

    /// Read one reference, returning the slot and instance it resolves to.
    fn load_object(&mut self) -> Result<Option<(u32, ObjectRef)>> {
        self.ensure_valid()?;
        let mut reference = 0u32;
        self.stream_primitive(&mut reference)?;
        if reference == NULL_REF {
            return Ok(None);
        }

        let slot = reference - 1;
        let offset = self.entry_offset(slot)?;
        let defined_here = offset as u64 == self.payload_pos() + CLASS_INDEX_SIZE;

        if let Some(existing) = self.loaded_object(slot) {
            if defined_here {
                // Fetched earlier through `load_slot`; step over its body.
                self.skip_body(slot)?;
            }
            return Ok(Some((slot, existing)));
        }
        if defined_here {
            return self.materialize(slot).map(|o| Some((slot, o)));
        }
        // A reference to an object whose body lies elsewhere in the payload.
        match self.mode {
            ArchiveMode::Load => self.load_slot_at(slot).map(|o| Some((slot, o))),
            _ => Err(Error::invalid(format!(
                "object slot {slot} is defined out of order; load it in random-access mode"
            ))),
        }
    }

    fn load_slot_at(&mut self, slot: u32) -> Result<ObjectRef> {
        self.expect_mode(ArchiveMode::Load)?;
        self.ensure_valid()?;
        if let Some(existing) = self.loaded_object(slot) {
            return Ok(existing);
        }

        let offset = self.entry_offset(slot)? as u64;
        let start = self
            .payload_start
            .ok_or_else(|| Error::invalid("payload start unknown"))?;
        let body_start = (start + offset)
            .checked_sub(CLASS_INDEX_SIZE)
            .filter(|&p| p >= start)
            .ok_or_else(|| Error::invalid(format!("object slot {slot} has a bad offset")))?;

        let resume = self.pos;
        self.seek_to(body_start)?;
        let result = self.materialize(slot);
        // Restore the cursor even if the object failed to load.
        let restored = self.seek_to(resume);
        let object = result?;
        restored?;
        Ok(object)
    }

    fn skip_body(&mut self, slot: u32) -> Result<()> {
        let (offset, length) = self
            .directory
            .entry(slot)
            .map(|e| (e.offset as u64, e.length as u64))
            .ok_or_else(|| Error::invalid(format!("object reference {slot} outside directory")))?;
        let start = self
            .payload_start
            .ok_or_else(|| Error::invalid("payload start unknown"))?;
        self.seek_to(start + offset + length)
    }

    fn entry_offset(&self, slot: u32) -> Result<u32> {
        self.directory
            .entry(slot)
            .map(|entry| entry.offset)
            .ok_or_else(|| Error::invalid(format!("object reference {slot} outside directory")))
    }

    /// Read the class index and body of `slot` at the current position.
    fn materialize(&mut self, slot: u32) -> Result<ObjectRef> {
        let mut class_index = 0u16;
        self.stream_primitive(&mut class_index)?;
        let class_name = self
            .directory
            .class_at(class_index)
            .map(|c| c.name.clone())
            .ok_or_else(|| Error::invalid(format!("class index {class_index} outside class table")))?;

        let recorded = self.directory.entry(slot).map(|e| e.class_name.as_str());
        if recorded != Some(class_name.as_str()) {
            return Err(Error::invalid(format!(
                "object slot {slot} is tagged {class_name}, directory lists {}",
                recorded.unwrap_or("nothing")
            )));
        }

        let instance = self.registry.create(&class_name)?;
        // Registered before the body so references back to it resolve.
        if let Some(cell) = self.loaded.get_mut(slot as usize) {
            *cell = Some(Rc::clone(&instance));
        }
        {
            let mut body = instance
                .try_borrow_mut()
                .map_err(|_| Error::BorrowConflict(class_name.clone()))?;
            body.serialize_object(self)?;
        }
        Ok(instance)
    }
}

fn borrow_class_name(obj: &ObjectRef) -> Result<&'static str> {
    obj.try_borrow()
        .map(|o| o.class_name())
        .map_err(|_| Error::BorrowConflict("object in use while streaming".to_string()))
}
