//! Low-level byte stream parser for DWARF section decoding.
//!
//! This module provides the [`crate::file::parser::Parser`] type, a cursor-based binary data
//! parser over an untrusted section buffer. Every read validates the remaining length before
//! touching memory, so a truncated or corrupted section produces an error instead of a panic or
//! an out-of-bounds read.
//!
//! # Key Components
//!
//! ## Navigation Methods
//! - [`crate::file::parser::Parser::seek`] - Move to specific position
//! - [`crate::file::parser::Parser::advance_by`] - Move forward by specified bytes
//! - [`crate::file::parser::Parser::pos`] - Get current position
//!
//! ## Data Access Methods
//! - [`crate::file::parser::Parser::read`] - Read primitive types in the section's byte order
//! - [`crate::file::parser::Parser::read_offset`] - Read a 4- or 8-byte section offset
//! - [`crate::file::parser::Parser::read_uleb128`] / [`crate::file::parser::Parser::read_sleb128`] - LEB128 values
//! - [`crate::file::parser::Parser::read_cstr`] - Borrow a null-terminated string
//! - [`crate::file::parser::Parser::read_bytes`] - Borrow a raw byte range
//!
//! # Usage Examples
//!
//! ```rust
//! use macroscope::Parser;
//!
//! let data = [0x05, 0x00, 0x02, 0x80, 0x01, b'A', 0x00];
//! let mut parser = Parser::new(&data);
//!
//! assert_eq!(parser.read::<u16>()?, 5);
//! assert_eq!(parser.read::<u8>()?, 2);
//! assert_eq!(parser.read_uleb128()?, (128, 2));
//! assert_eq!(parser.read_cstr()?, b"A");
//! assert!(!parser.has_more_data());
//! # Ok::<(), macroscope::Error>(())
//! ```

use crate::{
    file::io::{decode_sleb128, decode_uleb128, read_at, DwarfIO, Endian},
    Result,
};

/// A bounds-checked cursor over a borrowed byte buffer.
///
/// `Parser` keeps a position within the data and reads fixed-width values in a configurable byte
/// order, LEB128 values, null-terminated strings and raw byte ranges. All borrowed results keep
/// the lifetime of the underlying buffer, so decoded views never copy section data.
///
/// # Examples
///
/// ```rust
/// use macroscope::{file::io::Endian, Parser};
///
/// let data = [0x00, 0x00, 0x10, 0x00];
/// let mut parser = Parser::with_endian(&data, Endian::Big);
/// assert_eq!(parser.read_offset(4)?, 0x1000);
/// # Ok::<(), macroscope::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct Parser<'a> {
    /// The binary data being parsed
    data: &'a [u8],
    /// Current position within the data buffer
    position: usize,
    /// Byte order for fixed-width reads
    endian: Endian,
}

impl<'a> Parser<'a> {
    /// Create a new little-endian [`crate::file::parser::Parser`] from a byte slice.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_endian(data, Endian::Little)
    }

    /// Create a new [`crate::file::parser::Parser`] reading fixed-width values in `endian` order.
    #[must_use]
    pub fn with_endian(data: &'a [u8], endian: Endian) -> Self {
        Parser {
            data,
            position: 0,
            endian,
        }
    }

    /// Returns the length of the underlying data buffer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the parser has no data.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the byte order used for fixed-width reads.
    #[must_use]
    pub fn endian(&self) -> Endian {
        self.endian
    }

    /// Returns `true` if there is more data available to parse.
    #[must_use]
    pub fn has_more_data(&self) -> bool {
        self.position < self.data.len()
    }

    /// Move the current position to the specified index.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if position is at or beyond the data length.
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos >= self.data.len() {
            return Err(out_of_bounds_error!());
        }

        self.position = pos;
        Ok(())
    }

    /// Move the position forward by the specified number of bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if advancing by step would exceed the data length.
    pub fn advance_by(&mut self, step: usize) -> Result<()> {
        self.position = self.calc_end_position(step)?;
        Ok(())
    }

    /// Get the current position of the parser within the data buffer.
    #[must_use]
    pub fn pos(&self) -> usize {
        self.position
    }

    /// Get access to the underlying data buffer.
    #[must_use]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Peek at the next byte without advancing the position.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if position is at or beyond the data length.
    pub fn peek_byte(&self) -> Result<u8> {
        self.data
            .get(self.position)
            .copied()
            .ok_or(out_of_bounds_error!())
    }

    /// Read a value of type `T` in the parser's byte order.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if reading `T` would exceed the data length.
    pub fn read<T: DwarfIO>(&mut self) -> Result<T> {
        read_at::<T>(self.data, &mut self.position, self.endian)
    }

    /// Read an offset-sized field, 4 or 8 bytes wide, widened to `u64`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the field does not fit, and
    /// [`crate::Error::Malformed`] for any width other than 4 or 8.
    pub fn read_offset(&mut self, offset_size: u8) -> Result<u64> {
        match offset_size {
            4 => Ok(u64::from(self.read::<u32>()?)),
            8 => self.read::<u64>(),
            other => Err(malformed_error!("Invalid offset size - {}", other)),
        }
    }

    /// Read an unsigned LEB128 value, returning `(value, encoded_length)`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] for a truncated encoding and
    /// [`crate::Error::Malformed`] if the value overflows 64 bits.
    pub fn read_uleb128(&mut self) -> Result<(u64, usize)> {
        let (value, length) = decode_uleb128(self.rest())?;
        self.position += length;
        Ok((value, length))
    }

    /// Read a signed LEB128 value, returning `(value, encoded_length)`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] for a truncated encoding and
    /// [`crate::Error::Malformed`] if the value overflows 64 bits.
    pub fn read_sleb128(&mut self) -> Result<(i64, usize)> {
        let (value, length) = decode_sleb128(self.rest())?;
        self.position += length;
        Ok((value, length))
    }

    /// Borrow a null-terminated string, excluding the terminator, and move past the terminator.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if no terminator is found before the end of data.
    pub fn read_cstr(&mut self) -> Result<&'a [u8]> {
        let rest = self.rest();
        let Some(length) = rest.iter().position(|&byte| byte == 0) else {
            return Err(out_of_bounds_error!());
        };

        self.position += length + 1;
        Ok(&rest[..length])
    }

    /// Returns the number of bytes between the current position and the end of data.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    /// Calculate the position `length` bytes ahead, validating it against the data length.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] on overflow or if the end lies past the data.
    pub fn calc_end_position(&self, length: usize) -> Result<usize> {
        let end = self
            .position
            .checked_add(length)
            .ok_or(out_of_bounds_error!())?;

        if end > self.data.len() {
            return Err(out_of_bounds_error!());
        }

        Ok(end)
    }

    /// Borrow the next `length` bytes and advance past them.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if fewer than `length` bytes remain.
    pub fn read_bytes(&mut self, length: usize) -> Result<&'a [u8]> {
        let end = self.calc_end_position(length)?;
        let bytes = &self.data[self.position..end];
        self.position = end;
        Ok(bytes)
    }

    fn rest(&self) -> &'a [u8] {
        self.data.get(self.position..).unwrap_or_default()
    }
}
