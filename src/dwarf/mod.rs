//! Decoding of the DWARF `.debug_macro` section.
//!
//! The section holds one or more macro units. Each unit starts with a header (see
//! [`crate::dwarf::header`]) followed by a stream of operations that record the preprocessor
//! history of a compilation unit: macro definitions and undefinitions, entering and leaving
//! included files, and imports of shared units.
//!
//! # Key Components
//!
//! - [`crate::dwarf::MacroSection`] - The entry point, a view over the raw section bytes
//! - [`crate::dwarf::MacroContext`] - One parsed unit, with lazy operation measurement
//! - [`crate::dwarf::OperandTable`] - The opcode operands table of a unit header
//! - [`crate::dwarf::FormSkimmer`] - Length measurement and decoding of operand forms
//! - [`crate::dwarf::MacroConfig`] - Strict or legacy-compatible decoding
//!
//! # Examples
//!
//! ```rust
//! use macroscope::{dwarf::MacroString, MacroSection};
//!
//! // version 5, define "FOO 1" on line 10, terminator
//! let data = [0x05, 0x00, 0x00, 0x01, 0x0A, b'F', b'O', b'O', b' ', b'1', 0x00, 0x00];
//! let section = MacroSection::new(&data);
//! let (_, context) = section.context_by_offset(0)?;
//!
//! let summary = context.measure_ops()?;
//! assert_eq!((summary.op_count, summary.ops_length), (2, 9));
//!
//! let definition = context.define_undef(0)?;
//! assert_eq!(definition.line, 10);
//! assert_eq!(definition.string, MacroString::Inline("FOO 1"));
//! # Ok::<(), macroscope::Error>(())
//! ```

pub mod config;
pub mod constants;
pub mod context;
pub mod forms;
pub mod header;
pub mod ops;
pub mod optable;
pub mod section;

pub use config::MacroConfig;
pub use context::{HeaderFields, MacroContext};
pub use forms::{
    standard_signature, FormSignature, FormSkimmer, FormValue, OpcodeFormEntry,
};
pub use header::MacroHeader;
pub use ops::{
    FileBoundary, MacroAction, MacroDefinition, MacroImport, MacroOperation, MacroOps,
    MacroString, OpsSummary,
};
pub use optable::OperandTable;
pub use section::{MacroAttributes, MacroSection, MacroUnits, StringSection};
