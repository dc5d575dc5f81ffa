use std::collections::TryReserveError;

use thiserror::Error;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

macro_rules! out_of_bounds_error {
    () => {
        crate::Error::OutOfBounds {
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Every failure is reported synchronously to the caller. There is no best-effort mode: a unit
/// that produced any of these errors should be treated as unusable, and decoding must not try to
/// resynchronise in the middle of its operation stream.
///
/// # Error Categories
///
/// ## Section decoding errors
/// - [`Error::OutOfBounds`] - A read would touch or cross the end of the section
/// - [`Error::TruncatedStream`] - The section ended before the unit's terminating opcode
/// - [`Error::UnsupportedForm`] - A form code outside the recognized (or vendor-permitted) set
/// - [`Error::UnsupportedOpcode`] - An opcode that cannot be measured or decoded
/// - [`Error::UnsupportedVersion`] - A unit header with a version other than 4 or 5
/// - [`Error::Malformed`] - Inconsistent structure, e.g. a bad vendor opcode table
/// - [`Error::InvalidIndex`] - An out-of-range table row or operation number
/// - [`Error::Allocation`] - The vendor table could not be allocated
///
/// ## Object file errors
/// - [`Error::FileError`] - Filesystem I/O errors
/// - [`Error::GoblinErr`] - ELF/PE/Mach-O container errors from goblin
/// - [`Error::NotSupported`] - Container layouts this crate does not read
/// - [`Error::Empty`] - Empty input provided
///
/// # Examples
///
/// ```rust
/// use macroscope::{Error, MacroSection};
///
/// // version 5, no flags, and no terminator before the end of the section
/// let data = [0x05, 0x00, 0x00, 0x01, 0x0A];
/// let section = MacroSection::new(&data);
/// let (_, context) = section.context_by_offset(0)?;
///
/// match context.measure_ops() {
///     Ok(summary) => println!("{} operations", summary.op_count),
///     Err(Error::OutOfBounds { .. } | Error::TruncatedStream { .. }) => println!("truncated"),
///     Err(e) => println!("other error: {e}"),
/// }
/// # Ok::<(), macroscope::Error>(())
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// A read would have touched or crossed the end of the section.
    ///
    /// This is the bounds-check failure for any fixed-size field, LEB128 value, string or block.
    /// The error records the source location that detected it.
    #[error("Out of Bound read would have occurred! - {file}:{line}")]
    OutOfBounds {
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// The section ended before the unit's terminating opcode was found.
    #[error("Macro operations run past the end of the section at offset {offset:#x}")]
    TruncatedStream {
        /// Section offset at which the next opcode was expected
        offset: usize,
    },

    /// A form code that this crate does not know how to measure, or that a vendor opcode
    /// table is not permitted to declare.
    #[error("Unsupported form {form:#04x}")]
    UnsupportedForm {
        /// The raw form code
        form: u8,
    },

    /// An opcode that can not be handled here.
    ///
    /// Raised by the operation walker for non-standard opcodes without a vendor table row, and
    /// by the per-operation accessors when the operation is of the wrong kind.
    #[error("Unsupported macro opcode {opcode:#04x}")]
    UnsupportedOpcode {
        /// The raw opcode
        opcode: u8,
    },

    /// The unit header declares a version other than 4 (GNU extension) or 5.
    #[error("Unsupported .debug_macro version {0}")]
    UnsupportedVersion(u16),

    /// The section is damaged and could not be parsed.
    ///
    /// Used for vendor opcode tables that conflict with the standard opcode signatures, reserved
    /// opcodes, and overlong LEB128 values.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// A row or operation index outside `0..count` was passed to an accessor.
    #[error("Index {index} is out of range, only {count} entries are present")]
    InvalidIndex {
        /// The requested index
        index: usize,
        /// Number of valid entries
        count: usize,
    },

    /// Allocating storage for the vendor opcode table failed.
    #[error("{0}")]
    Allocation(#[from] TryReserveError),

    /// This container layout is not supported.
    ///
    /// Returned for compressed debug sections, fat Mach-O binaries and archives.
    #[error("This file type is not supported")]
    NotSupported,

    /// Provided input was empty.
    #[error("Provided input was empty")]
    Empty,

    /// File I/O error.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// Error from the goblin crate while reading the object file container.
    #[error("{0}")]
    GoblinErr(#[from] goblin::error::Error),
}
