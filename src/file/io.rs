//! Endian-aware, bounds-checked primitive reads and writes.
//!
//! This module is the lowest decoding layer of the crate. Every multi-byte value in a serialized
//! module goes through the [`ByteIO`] trait, which converts between a fixed-size byte array and a
//! numeric type in either byte order. The conversion never depends on the host's native order
//! and never assumes the source buffer is aligned: bytes are copied out of the slice into an
//! owned array before being reinterpreted.
//!
//! # Key Components
//!
//! - [`ByteIO`] - Conversion between numeric types and their byte representation
//! - [`read_at`] / [`write_at`] - Offset-advancing access with an explicit [`ByteOrder`]
//! - [`read_le_at`], [`read_be_at`], [`write_le_at`], [`write_be_at`] - Fixed-order shorthands
//! - [`read_le`], [`read_be`] - Decode from the start of a buffer
//!
//! # Supported Types
//!
//! - **Unsigned integers**: `u8`, `u16`, `u32`, `u64`, `usize`
//! - **Signed integers**: `i8`, `i16`, `i32`, `i64`, `isize`
//! - **Floating point**: `f32`, `f64`
//!
//! # Error Handling
//!
//! Reads and writes that would touch bytes past the end of the buffer return
//! [`crate::Error::TruncatedInput`] and leave the offset untouched.
//!
//! # Examples
//!
//! ```rust
//! use optcore::file::io::{read_at, write_at};
//! use optcore::ByteOrder;
//!
//! let mut data = [0u8; 6];
//! let mut offset = 0;
//! write_at(&mut data, &mut offset, 0x0102_u16, ByteOrder::Big)?;
//! write_at(&mut data, &mut offset, 7_u32, ByteOrder::Little)?;
//! assert_eq!(data, [0x01, 0x02, 0x07, 0x00, 0x00, 0x00]);
//!
//! let mut offset = 0;
//! let first: u16 = read_at(&data, &mut offset, ByteOrder::Big)?;
//! let second: u32 = read_at(&data, &mut offset, ByteOrder::Little)?;
//! assert_eq!((first, second, offset), (0x0102, 7, 6));
//! # Ok::<(), optcore::Error>(())
//! ```

use strum::EnumIter;

use crate::{Error, Result};

/// Byte order of multi-byte values in a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, EnumIter)]
pub enum ByteOrder {
    /// Least significant byte first.
    #[default]
    Little,
    /// Most significant byte first.
    Big,
}

impl ByteOrder {
    /// Returns the byte order of the host.
    #[must_use]
    pub const fn native() -> Self {
        if cfg!(target_endian = "big") {
            ByteOrder::Big
        } else {
            ByteOrder::Little
        }
    }

    /// Decodes the one-byte order tag used in serialized headers.
    ///
    /// `0` is little-endian, `1` is big-endian.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] for any other tag value.
    pub fn from_tag(tag: u8) -> Result<Self> {
        match tag {
            0 => Ok(ByteOrder::Little),
            1 => Ok(ByteOrder::Big),
            other => Err(malformed_error!("Invalid byte order tag - {}", other)),
        }
    }

    /// Returns the one-byte tag for this order, the inverse of [`ByteOrder::from_tag`].
    #[must_use]
    pub const fn tag(self) -> u8 {
        match self {
            ByteOrder::Little => 0,
            ByteOrder::Big => 1,
        }
    }
}

/// Conversion between a numeric type and its fixed-size byte representation.
///
/// Each implementation names the byte array matching its width (`[u8; 4]` for `u32`, ...). The
/// reading functions copy exactly `size_of::<Self>()` bytes into that array before converting,
/// which is what makes unaligned input safe.
pub trait ByteIO: Sized + Copy {
    /// Byte array holding one encoded value.
    type Bytes: Sized + AsRef<[u8]> + for<'a> TryFrom<&'a [u8]>;

    /// Decode from little-endian bytes
    fn from_le_bytes(bytes: Self::Bytes) -> Self;
    /// Decode from big-endian bytes
    fn from_be_bytes(bytes: Self::Bytes) -> Self;

    /// Encode as little-endian bytes
    fn to_le_bytes(self) -> Self::Bytes;
    /// Encode as big-endian bytes
    fn to_be_bytes(self) -> Self::Bytes;

    /// Decode using a runtime byte order.
    fn from_bytes(bytes: Self::Bytes, order: ByteOrder) -> Self {
        match order {
            ByteOrder::Little => Self::from_le_bytes(bytes),
            ByteOrder::Big => Self::from_be_bytes(bytes),
        }
    }

    /// Encode using a runtime byte order.
    fn to_bytes(self, order: ByteOrder) -> Self::Bytes {
        match order {
            ByteOrder::Little => self.to_le_bytes(),
            ByteOrder::Big => self.to_be_bytes(),
        }
    }
}

macro_rules! impl_byte_io {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ByteIO for $ty {
                type Bytes = [u8; std::mem::size_of::<$ty>()];

                fn from_le_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_le_bytes(bytes)
                }

                fn from_be_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_be_bytes(bytes)
                }

                fn to_le_bytes(self) -> Self::Bytes {
                    <$ty>::to_le_bytes(self)
                }

                fn to_be_bytes(self) -> Self::Bytes {
                    <$ty>::to_be_bytes(self)
                }
            }
        )*
    };
}

impl_byte_io!(u8, i8, u16, i16, u32, i32, u64, i64, usize, isize, f32, f64);

/// Reads a value of type `T` at `offset` in the given byte order and advances `offset`.
///
/// # Arguments
///
/// * `data` - The byte buffer to read from
/// * `offset` - Position to read at; advanced by `size_of::<T>()` on success
/// * `order` - Byte order the value was encoded in
///
/// # Errors
///
/// Returns [`crate::Error::TruncatedInput`] if fewer than `size_of::<T>()` bytes remain after
/// `offset`. The offset is not modified in that case.
pub fn read_at<T: ByteIO>(data: &[u8], offset: &mut usize, order: ByteOrder) -> Result<T> {
    let type_len = std::mem::size_of::<T>();
    let available = data.len().saturating_sub(*offset);
    if type_len > available {
        return Err(Error::TruncatedInput {
            needed: type_len,
            available,
        });
    }

    let Ok(bytes) = data[*offset..*offset + type_len].try_into() else {
        return Err(Error::TruncatedInput {
            needed: type_len,
            available,
        });
    };

    *offset += type_len;

    Ok(T::from_bytes(bytes, order))
}

/// Writes `value` at `offset` in the given byte order and advances `offset`.
///
/// # Errors
///
/// Returns [`crate::Error::TruncatedInput`] if the buffer has fewer than `size_of::<T>()`
/// bytes left after `offset`. Nothing is written in that case.
pub fn write_at<T: ByteIO>(
    data: &mut [u8],
    offset: &mut usize,
    value: T,
    order: ByteOrder,
) -> Result<()> {
    let type_len = std::mem::size_of::<T>();
    let available = data.len().saturating_sub(*offset);
    if type_len > available {
        return Err(Error::TruncatedInput {
            needed: type_len,
            available,
        });
    }

    let bytes = value.to_bytes(order);
    data[*offset..*offset + type_len].copy_from_slice(bytes.as_ref());
    *offset += type_len;

    Ok(())
}

/// Reads a little-endian `T` from the start of `data`.
///
/// # Errors
///
/// Returns [`crate::Error::TruncatedInput`] if `data` is shorter than `T`.
pub fn read_le<T: ByteIO>(data: &[u8]) -> Result<T> {
    let mut offset = 0_usize;
    read_at(data, &mut offset, ByteOrder::Little)
}

/// Reads a big-endian `T` from the start of `data`.
///
/// # Errors
///
/// Returns [`crate::Error::TruncatedInput`] if `data` is shorter than `T`.
pub fn read_be<T: ByteIO>(data: &[u8]) -> Result<T> {
    let mut offset = 0_usize;
    read_at(data, &mut offset, ByteOrder::Big)
}

/// Reads a little-endian `T` at `offset`, advancing it.
///
/// # Errors
///
/// Returns [`crate::Error::TruncatedInput`] if there are insufficient bytes.
pub fn read_le_at<T: ByteIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    read_at(data, offset, ByteOrder::Little)
}

/// Reads a big-endian `T` at `offset`, advancing it.
///
/// # Errors
///
/// Returns [`crate::Error::TruncatedInput`] if there are insufficient bytes.
pub fn read_be_at<T: ByteIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    read_at(data, offset, ByteOrder::Big)
}

/// Writes a little-endian `T` at `offset`, advancing it.
///
/// # Errors
///
/// Returns [`crate::Error::TruncatedInput`] if there is insufficient space.
pub fn write_le_at<T: ByteIO>(data: &mut [u8], offset: &mut usize, value: T) -> Result<()> {
    write_at(data, offset, value, ByteOrder::Little)
}

/// Writes a big-endian `T` at `offset`, advancing it.
///
/// # Errors
///
/// Returns [`crate::Error::TruncatedInput`] if there is insufficient space.
pub fn write_be_at<T: ByteIO>(data: &mut [u8], offset: &mut usize, value: T) -> Result<()> {
    write_at(data, offset, value, ByteOrder::Big)
}
