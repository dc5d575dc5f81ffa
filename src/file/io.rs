//! Low-level byte order and LEB128 utilities for DWARF section decoding.
//!
//! This module provides bounds-checked reading of fixed-width integers in either byte order, and
//! decoding of the LEB128 variable-length integers that DWARF uses throughout `.debug_macro`.
//! DWARF data is stored in the byte order of the target, so every fixed-width read goes through
//! an [`crate::file::io::Endian`] chosen from the containing object file.
//!
//! # Key Components
//!
//! - [`crate::file::io::DwarfIO`] - Trait defining endian-aware conversion for primitive types
//! - [`crate::file::io::read_le_at`] / [`crate::file::io::read_be_at`] - Read at an offset with auto-advance
//! - [`crate::file::io::read_at`] - Read at an offset using a runtime [`crate::file::io::Endian`]
//! - [`crate::file::io::decode_uleb128`] / [`crate::file::io::decode_sleb128`] - LEB128 decoding
//!
//! # Examples
//!
//! ```rust
//! use macroscope::file::io::{read_at, decode_uleb128, Endian};
//!
//! let data = [0x00, 0x10, 0xE5, 0x8E, 0x26];
//! let mut offset = 0;
//!
//! let value: u16 = read_at(&data, &mut offset, Endian::Big)?;
//! assert_eq!(value, 0x0010);
//!
//! let (leb, length) = decode_uleb128(&data[offset..])?;
//! assert_eq!((leb, length), (624_485, 3));
//! # Ok::<(), macroscope::Error>(())
//! ```
//!
//! # Error Handling
//!
//! All functions return [`crate::Result<T>`]. Insufficient input yields
//! [`crate::Error::OutOfBounds`]; a LEB128 value that does not fit into 64 bits yields
//! [`crate::Error::Malformed`].

use crate::Result;

/// Byte order of multi-byte values inside a DWARF section.
///
/// DWARF does not encode its own byte order; it follows the object file that carries it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endian {
    /// Least significant byte first
    #[default]
    Little,
    /// Most significant byte first
    Big,
}

impl Endian {
    /// Map the `little_endian` flag most object file parsers expose.
    #[must_use]
    pub fn from_little(little_endian: bool) -> Self {
        if little_endian {
            Endian::Little
        } else {
            Endian::Big
        }
    }
}

/// Trait for implementing type-specific safe binary data reading operations.
///
/// Each implementation defines a `Bytes` associated type that represents the fixed-size
/// byte array required for that particular type (e.g., `[u8; 4]` for `u32`).
pub trait DwarfIO: Sized {
    /// Associated type representing the byte array type for this numeric type.
    type Bytes: Sized + for<'a> TryFrom<&'a [u8]>;

    /// Read T from a byte buffer in little-endian
    fn from_le_bytes(bytes: Self::Bytes) -> Self;
    /// Read T from a byte buffer in big-endian
    fn from_be_bytes(bytes: Self::Bytes) -> Self;
}

macro_rules! impl_dwarf_io {
    ($($ty:ty => $len:literal),* $(,)?) => {
        $(
            impl DwarfIO for $ty {
                type Bytes = [u8; $len];

                fn from_le_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_le_bytes(bytes)
                }

                fn from_be_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_be_bytes(bytes)
                }
            }
        )*
    };
}

impl_dwarf_io!(
    u8 => 1,
    i8 => 1,
    u16 => 2,
    i16 => 2,
    u32 => 4,
    i32 => 4,
    u64 => 8,
    i64 => 8,
);

fn take_bytes<T: DwarfIO>(data: &[u8], offset: &mut usize) -> Result<T::Bytes> {
    let type_len = std::mem::size_of::<T>();
    let Some(end) = offset.checked_add(type_len) else {
        return Err(out_of_bounds_error!());
    };
    if end > data.len() {
        return Err(out_of_bounds_error!());
    }

    let Ok(read) = data[*offset..end].try_into() else {
        return Err(out_of_bounds_error!());
    };

    *offset = end;
    Ok(read)
}

/// Safely reads a value of type `T` in little-endian byte order from a data buffer at a specific
/// offset, advancing the offset by the number of bytes read.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes.
pub fn read_le_at<T: DwarfIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    take_bytes::<T>(data, offset).map(T::from_le_bytes)
}

/// Safely reads a value of type `T` in big-endian byte order from a data buffer at a specific
/// offset, advancing the offset by the number of bytes read.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes.
pub fn read_be_at<T: DwarfIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    take_bytes::<T>(data, offset).map(T::from_be_bytes)
}

/// Reads a value of type `T` at `offset` in the given byte order, advancing the offset.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes.
pub fn read_at<T: DwarfIO>(data: &[u8], offset: &mut usize, endian: Endian) -> Result<T> {
    match endian {
        Endian::Little => read_le_at(data, offset),
        Endian::Big => read_be_at(data, offset),
    }
}

/// Decodes an unsigned LEB128 value from the start of `data`.
///
/// Returns `(value, bytes_consumed)`.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if no byte with a clear continuation bit is found
/// before the end of `data`, and [`crate::Error::Malformed`] if the value overflows a `u64`.
pub fn decode_uleb128(data: &[u8]) -> Result<(u64, usize)> {
    let mut result: u64 = 0;
    let mut shift: u32 = 0;

    for (i, &byte) in data.iter().enumerate() {
        let value = u64::from(byte & 0x7f);
        if shift >= 64 || (shift > 0 && value > (u64::MAX >> shift)) {
            // Zero padding past bit 63 is tolerated, as producers do emit it
            if value != 0 {
                return Err(malformed_error!("ULEB128 value overflows 64 bits"));
            }
        } else {
            result |= value << shift;
        }
        shift = shift.saturating_add(7);

        if byte & 0x80 == 0 {
            return Ok((result, i + 1));
        }
    }

    Err(out_of_bounds_error!())
}

/// Decodes a signed LEB128 value from the start of `data`.
///
/// Returns `(value, bytes_consumed)`.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if the encoding is truncated, and
/// [`crate::Error::Malformed`] if it is longer than a 64-bit value can need.
pub fn decode_sleb128(data: &[u8]) -> Result<(i64, usize)> {
    let mut result: i64 = 0;
    let mut shift: u32 = 0;

    for (i, &byte) in data.iter().enumerate() {
        if shift >= 70 {
            return Err(malformed_error!("SLEB128 value overflows 64 bits"));
        }
        if shift < 64 {
            result |= i64::from(byte & 0x7f) << shift;
        }
        shift += 7;

        if byte & 0x80 == 0 {
            if shift < 64 && (byte & 0x40) != 0 {
                result |= !0i64 << shift;
            }
            return Ok((result, i + 1));
        }
    }

    Err(out_of_bounds_error!())
}
