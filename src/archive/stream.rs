//! The [`Streamable`] trait and its implementations for leaf types.

use std::fmt;

use super::format::ArchiveInfo;
use super::Archive;
use crate::registry::ObjectRef;
use crate::util::{Error, Result};

/// A value that can be streamed through an [`Archive`] in either direction.
///
/// On save `stream` reads `self` and encodes it; on load it overwrites
/// `self` with the decoded value. One method body serves both directions.
pub trait Streamable {
    fn stream(&mut self, arc: &mut Archive<'_>) -> Result<()>;
}

macro_rules! impl_streamable_primitive {
    ($($t:ty),*) => {
        $(
            impl Streamable for $t {
                #[inline]
                fn stream(&mut self, arc: &mut Archive<'_>) -> Result<()> {
                    arc.stream_primitive(self)
                }
            }
        )*
    };
}

impl_streamable_primitive!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);

impl Streamable for bool {
    fn stream(&mut self, arc: &mut Archive<'_>) -> Result<()> {
        let mut raw = u8::from(*self);
        arc.stream_primitive(&mut raw)?;
        if arc.is_loading() {
            *self = match raw {
                0 => false,
                1 => true,
                other => return Err(Error::invalid(format!("invalid bool byte {other}"))),
            };
        }
        Ok(())
    }
}

impl Streamable for String {
    fn stream(&mut self, arc: &mut Archive<'_>) -> Result<()> {
        if arc.is_saving() {
            let mut len = u32::try_from(self.len())
                .map_err(|_| Error::invalid("string longer than 4 GiB"))?;
            arc.stream_primitive(&mut len)?;
            arc.write_data(self.as_bytes())
        } else {
            let mut len = 0u32;
            arc.stream_primitive(&mut len)?;
            arc.check_remaining(len as u64)?;
            let mut buf = vec![0u8; len as usize];
            arc.read_data(&mut buf)?;
            *self = String::from_utf8(buf)?;
            Ok(())
        }
    }
}

impl<T: Streamable + Default> Streamable for Vec<T> {
    fn stream(&mut self, arc: &mut Archive<'_>) -> Result<()> {
        let mut count = u32::try_from(self.len())
            .map_err(|_| Error::invalid("array longer than u32::MAX"))?;
        arc.stream_primitive(&mut count)?;
        if arc.is_saving() {
            for item in self.iter_mut() {
                item.stream(arc)?;
            }
        } else {
            // Elements may encode to zero bytes; only the preallocation is capped.
            let reserve = arc.remaining().map_or(count as u64, |left| left.min(count as u64));
            let mut items = Vec::with_capacity(reserve as usize);
            for _ in 0..count {
                let mut item = T::default();
                item.stream(arc)?;
                items.push(item);
            }
            *self = items;
        }
        Ok(())
    }
}

impl Streamable for Option<ObjectRef> {
    fn stream(&mut self, arc: &mut Archive<'_>) -> Result<()> {
        arc.stream_object(self)
    }
}

impl Streamable for ArchiveInfo {
    fn stream(&mut self, arc: &mut Archive<'_>) -> Result<()> {
        arc.stream(&mut self.writer_version)?;
        arc.stream(&mut self.licensee_name)?;
        arc.stream(&mut self.project_name)?;
        arc.stream(&mut self.licensee_version)
    }
}

/// An interned name.
///
/// Each distinct name is stored once in the archive's name table; the
/// payload carries only its `u32` index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name(String);

impl Name {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for Name {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for Name {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Streamable for Name {
    fn stream(&mut self, arc: &mut Archive<'_>) -> Result<()> {
        arc.stream_name(self)
    }
}
