// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
//#![deny(unsafe_code)]
// - 'file/physical.rs' uses mmap to map a file into memory

//! # macroscope
//!
//! A bounds-checked, zero-copy decoder for the DWARF `.debug_macro` section.
//!
//! Compilers that emit macro debug information (`gcc -g3`, `clang -fdebug-macro`) record the
//! complete preprocessor history of every compilation unit: each `#define` and `#undef` with its
//! source line, every `#include` boundary, and imports of macro units shared between compilation
//! units. `macroscope` parses unit headers, validates opcode operands tables, measures operation
//! streams and decodes individual operations, all without copying section data.
//!
//! ## Features
//!
//! - **Both formats** - DWARF 5 units and the version 4 GNU extension
//! - **32- and 64-bit DWARF** - Offset sizes and byte order follow the unit and the container
//! - **Vendor opcodes** - Non-standard opcodes are measured through the unit's operands table
//! - **Hardened** - Every read is bounds-checked, malformed input yields an [`Error`], never a panic
//! - **Object files** - ELF, PE/COFF and Mach-O loading via memory-mapped files or buffers
//!
//! ## Quick Start
//!
//! ### Decoding a raw section
//!
//! ```rust
//! use macroscope::prelude::*;
//!
//! // version 5, start_file(line 0, file 1), define "FOO 1" on line 10, end_file, terminator
//! let data = [
//!     0x05, 0x00, 0x00,
//!     0x03, 0x00, 0x01,
//!     0x01, 0x0A, b'F', b'O', b'O', b' ', b'1', 0x00,
//!     0x04,
//!     0x00,
//! ];
//! let section = MacroSection::new(&data);
//! let (version, context) = section.context_by_offset(0)?;
//! assert_eq!(version, 5);
//!
//! for operation in context.operations() {
//!     let operation = operation?;
//!     println!("{:#x}: opcode {:#04x}", operation.offset(), operation.opcode());
//! }
//!
//! let definition = context.define_undef(1)?;
//! assert_eq!(definition.string, MacroString::Inline("FOO 1"));
//! # Ok::<(), macroscope::Error>(())
//! ```
//!
//! ### Loading an object file
//!
//! ```rust,no_run
//! use macroscope::prelude::*;
//! use std::path::Path;
//!
//! let file = File::from_file(Path::new("target/debug/app"))?;
//! let strings = file.debug_str();
//!
//! if let Some(section) = file.macro_section() {
//!     for unit in section.units() {
//!         let unit = unit?;
//!         for op_number in 0..unit.measure_ops()?.op_count {
//!             if let Ok(definition) = unit.define_undef(op_number) {
//!                 let text = match &strings {
//!                     Some(strings) => definition.string.resolve(strings)?,
//!                     None => None,
//!                 };
//!                 println!("{:?} line {}: {:?}", definition.action, definition.line, text);
//!             }
//!         }
//!     }
//! }
//! # Ok::<(), macroscope::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`dwarf`] - The `.debug_macro` decoder: headers, operands tables, operation walking
//! - [`file`] - Object file loading, byte-order primitives and the [`Parser`] cursor
//! - [`prelude`] - Convenient re-exports of commonly used types
//! - [`Error`] and [`Result`] - Error handling
//!
//! ## Configuration
//!
//! [`MacroConfig`] selects between standard-conforming decoding (the default) and reproducing the
//! measurements of legacy consumers, which ignore vendor opcodes and account `DW_FORM_data16` as
//! 8 bytes.
//!
//! ## Logging
//!
//! The crate logs through the [`log`] facade: header parses and completed walks at `debug`, vendor
//! opcode dispatch at `trace`. No logger is installed by the library.

#[macro_use]
pub(crate) mod error;

/// Object file loading and low-level binary access.
pub mod file;

/// Decoding of the DWARF `.debug_macro` section.
pub mod dwarf;

/// Shared functionality which is used in unit-tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use macroscope::prelude::*;
///
/// let data = [0x05, 0x00, 0x00, 0x00];
/// let (_, context) = MacroSection::new(&data).context_by_offset(0)?;
/// assert_eq!(context.measure_ops()?.op_count, 1);
/// # Ok::<(), macroscope::Error>(())
/// ```
pub mod prelude;

/// `macroscope` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `macroscope` Error type
///
/// # Examples
///
/// ```rust
/// use macroscope::{Error, MacroSection};
///
/// let data = [0x03, 0x00, 0x00, 0x00];
/// match MacroSection::new(&data).context_by_offset(0) {
///     Err(Error::UnsupportedVersion(version)) => assert_eq!(version, 3),
///     other => panic!("unexpected: {other:?}"),
/// }
/// ```
pub use error::Error;

/// The section view, unit context and configuration.
pub use dwarf::{MacroConfig, MacroContext, MacroSection};

/// Provides access to the object file loader and the low-level parser.
///
/// # Example
///
/// ```rust
/// use macroscope::Parser;
///
/// let data = [0xE5, 0x8E, 0x26];
/// let mut parser = Parser::new(&data);
/// assert_eq!(parser.read_uleb128()?, (624_485, 3));
/// # Ok::<(), macroscope::Error>(())
/// ```
pub use file::{parser::Parser, File};
