//! # macroscope Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the macroscope library. Import this module to get quick access to the essential
//! types for `.debug_macro` decoding.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all macroscope operations
pub use crate::Error;

/// The result type used throughout macroscope
pub use crate::Result;

/// Decoder configuration
pub use crate::MacroConfig;

// ================================================================================================
// Main Entry Points
// ================================================================================================

/// Object file loading
pub use crate::File;

/// Low-level parsing utilities
pub use crate::{file::io::Endian, Parser};

/// Section views and the compilation unit seam
pub use crate::dwarf::{MacroAttributes, MacroSection, StringSection};

// ================================================================================================
// Unit Decoding
// ================================================================================================

/// Per-unit context and header data
pub use crate::dwarf::{HeaderFields, MacroContext, OperandTable, OpcodeFormEntry};

/// Decoded operations
pub use crate::dwarf::{
    FileBoundary, FormValue, MacroAction, MacroDefinition, MacroImport, MacroOperation,
    MacroString, OpsSummary,
};

/// DWARF constants
pub use crate::dwarf::constants::{DwForm, MacroFlags, MacroOpcode};
