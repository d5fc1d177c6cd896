//! Fixed-width primitive codecs.
//!
//! Every multi-byte value goes through [`Primitive::encode`] /
//! [`Primitive::decode`] with the archive's [`ByteOrder`], independent of
//! host order.

use byteorder::{BigEndian, ByteOrder as _, LittleEndian};

use super::format::ByteOrder;

/// Largest primitive width in bytes.
pub const MAX_PRIMITIVE_SIZE: usize = 8;

/// A fixed-width value with a byte-order aware encoding.
pub trait Primitive: Copy {
    /// Encoded width in bytes.
    const SIZE: usize;

    /// Encode into `buf`, which is exactly `SIZE` bytes.
    fn encode(self, order: ByteOrder, buf: &mut [u8]);

    /// Decode from `buf`, which is exactly `SIZE` bytes.
    fn decode(order: ByteOrder, buf: &[u8]) -> Self;
}

impl Primitive for u8 {
    const SIZE: usize = 1;

    #[inline]
    fn encode(self, _order: ByteOrder, buf: &mut [u8]) {
        buf[0] = self;
    }

    #[inline]
    fn decode(_order: ByteOrder, buf: &[u8]) -> Self {
        buf[0]
    }
}

impl Primitive for i8 {
    const SIZE: usize = 1;

    #[inline]
    fn encode(self, _order: ByteOrder, buf: &mut [u8]) {
        buf[0] = self as u8;
    }

    #[inline]
    fn decode(_order: ByteOrder, buf: &[u8]) -> Self {
        buf[0] as i8
    }
}

macro_rules! impl_primitive {
    ($t:ty, $size:expr, $write:ident, $read:ident) => {
        impl Primitive for $t {
            const SIZE: usize = $size;

            #[inline]
            fn encode(self, order: ByteOrder, buf: &mut [u8]) {
                match order {
                    ByteOrder::LittleEndian => LittleEndian::$write(buf, self),
                    ByteOrder::BigEndian => BigEndian::$write(buf, self),
                }
            }

            #[inline]
            fn decode(order: ByteOrder, buf: &[u8]) -> Self {
                match order {
                    ByteOrder::LittleEndian => LittleEndian::$read(buf),
                    ByteOrder::BigEndian => BigEndian::$read(buf),
                }
            }
        }
    };
}

impl_primitive!(u16, 2, write_u16, read_u16);
impl_primitive!(i16, 2, write_i16, read_i16);
impl_primitive!(u32, 4, write_u32, read_u32);
impl_primitive!(i32, 4, write_i32, read_i32);
impl_primitive!(u64, 8, write_u64, read_u64);
impl_primitive!(i64, 8, write_i64, read_i64);
impl_primitive!(f32, 4, write_f32, read_f32);
impl_primitive!(f64, 8, write_f64, read_f64);
