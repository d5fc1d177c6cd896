//! Class registry and polymorphic object traits.
//!
//! Every type that can sit behind a polymorphic pointer implements
//! [`ArchiveClass`] and is registered once in a [`ClassRegistry`]. The
//! registry maps a stable class name to a factory, the class's current
//! schema version, its parent class and its instance size. Archives consult
//! it to tag written objects with "version as of this save" and to construct
//! the right concrete type when a pointer is loaded.
//!
//! The registry is an explicit object shared through an `Arc`, not a
//! language-level singleton. Register classes at startup; descriptors are
//! immutable once inserted.

use std::any::Any;
use std::cell::{Ref, RefCell, RefMut};
use std::collections::HashMap;
use std::rc::Rc;

use parking_lot::RwLock;

use crate::archive::Archive;
use crate::util::{Error, Result};

/// Shared, mutable handle to a polymorphic archive object.
///
/// Two fields holding clones of the same `ObjectRef` are one object to the
/// archive: it is written once and both fields point at the same instance
/// after loading.
pub type ObjectRef = Rc<RefCell<dyn ArchiveObject>>;

/// Serialization contract for a concrete class.
///
/// `serialize` is called in both directions. Query
/// [`Archive::is_loading`] only when the two directions must differ; branch
/// on the value returned by [`Archive::serialize_class_version`] for schema
/// evolution.
pub trait ArchiveClass: Any + Default {
    /// Stable name written to archives. Never change it once files exist.
    const CLASS_NAME: &'static str;
    /// Current schema version.
    const VERSION: u16;
    /// Name of the parent class, if any.
    const PARENT: Option<&'static str> = None;

    /// Stream every persistent field through `arc`.
    fn serialize(&mut self, arc: &mut Archive<'_>) -> Result<()>;
}

/// Object-safe face of [`ArchiveClass`], used behind [`ObjectRef`].
pub trait ArchiveObject: Any {
    /// Stable class name.
    fn class_name(&self) -> &'static str;

    /// Stream the object's fields.
    fn serialize_object(&mut self, arc: &mut Archive<'_>) -> Result<()>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: ArchiveClass> ArchiveObject for T {
    #[inline]
    fn class_name(&self) -> &'static str {
        T::CLASS_NAME
    }

    fn serialize_object(&mut self, arc: &mut Archive<'_>) -> Result<()> {
        self.serialize(arc)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Wrap a value in a fresh [`ObjectRef`].
pub fn new_object<T: ArchiveClass>(value: T) -> ObjectRef {
    Rc::new(RefCell::new(value))
}

/// Borrow the concrete type behind an [`ObjectRef`].
///
/// Returns `None` if the object is another class or is mutably borrowed.
pub fn downcast_ref<T: ArchiveClass>(obj: &ObjectRef) -> Option<Ref<'_, T>> {
    let guard = obj.try_borrow().ok()?;
    Ref::filter_map(guard, |o| o.as_any().downcast_ref::<T>()).ok()
}

/// Mutably borrow the concrete type behind an [`ObjectRef`].
pub fn downcast_mut<T: ArchiveClass>(obj: &ObjectRef) -> Option<RefMut<'_, T>> {
    let guard = obj.try_borrow_mut().ok()?;
    RefMut::filter_map(guard, |o| o.as_any_mut().downcast_mut::<T>()).ok()
}

fn construct<T: ArchiveClass>() -> ObjectRef {
    Rc::new(RefCell::new(T::default()))
}

/// Descriptor for one registered class.
#[derive(Debug, Clone)]
pub struct ClassDesc {
    name: &'static str,
    version: u16,
    parent: Option<&'static str>,
    size: usize,
    factory: fn() -> ObjectRef,
}

impl ClassDesc {
    /// Build the descriptor for `T` from its [`ArchiveClass`] constants.
    pub fn of<T: ArchiveClass>() -> Self {
        Self {
            name: T::CLASS_NAME,
            version: T::VERSION,
            parent: T::PARENT,
            size: std::mem::size_of::<T>(),
            factory: construct::<T>,
        }
    }

    /// Override the registered version.
    ///
    /// Lets a tool write archives in an older schema revision.
    pub fn with_version(mut self, version: u16) -> Self {
        self.version = version;
        self
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn version(&self) -> u16 {
        self.version
    }

    #[inline]
    pub fn parent(&self) -> Option<&'static str> {
        self.parent
    }

    /// Size in bytes of one in-memory instance.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Allocate a default instance.
    pub fn create(&self) -> ObjectRef {
        (self.factory)()
    }
}

/// Table of every class an archive may construct.
#[derive(Debug, Default)]
pub struct ClassRegistry {
    classes: RwLock<HashMap<&'static str, ClassDesc>>,
}

impl ClassRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `T` at its declared version.
    ///
    /// Returns `false` if a class with the same name is already registered;
    /// the existing descriptor is kept.
    pub fn register<T: ArchiveClass>(&self) -> bool {
        self.register_desc(ClassDesc::of::<T>())
    }

    /// Register a prepared descriptor.
    pub fn register_desc(&self, desc: ClassDesc) -> bool {
        let mut classes = self.classes.write();
        if classes.contains_key(desc.name) {
            return false;
        }
        classes.insert(desc.name, desc);
        true
    }

    /// Look up a class descriptor.
    pub fn find(&self, name: &str) -> Option<ClassDesc> {
        self.classes.read().get(name).cloned()
    }

    /// Current version of a registered class.
    pub fn current_version(&self, name: &str) -> Option<u16> {
        self.classes.read().get(name).map(ClassDesc::version)
    }

    /// Construct a default instance of the named class.
    pub fn create(&self, name: &str) -> Result<ObjectRef> {
        self.find(name)
            .map(|desc| desc.create())
            .ok_or_else(|| Error::UnknownClass(name.to_string()))
    }

    /// Whether `name` is `ancestor` or derives from it.
    pub fn is_kind_of(&self, name: &str, ancestor: &str) -> bool {
        let classes = self.classes.read();
        let mut current = Some(name);
        // Bounded walk so a malformed parent chain cannot loop forever.
        for _ in 0..=classes.len() {
            match current {
                Some(n) if n == ancestor => return true,
                Some(n) => current = classes.get(n).and_then(|d| d.parent),
                None => return false,
            }
        }
        false
    }

    /// Number of registered classes.
    pub fn len(&self) -> usize {
        self.classes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.read().is_empty()
    }

    /// Registered class names, sorted.
    pub fn class_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.classes.read().keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Drop every registration.
    pub fn clear(&self) {
        self.classes.write().clear();
    }
}
