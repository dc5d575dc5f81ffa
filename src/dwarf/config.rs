//! Decoder configuration for `.debug_macro` units
//!
//! This module provides the knobs that select between strict DWARF behaviour and byte-for-byte
//! compatibility with older consumers of the section.

/// Configuration applied to every macro unit parsed from a [`crate::MacroSection`].
///
/// # Examples
///
/// ```rust
/// use macroscope::{MacroConfig, MacroSection};
///
/// let data = [0x05, 0x00, 0x00, 0x00];
/// let section = MacroSection::new(&data).with_config(MacroConfig::compatible());
/// assert!(!section.config().vendor_opcode_dispatch);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MacroConfig {
    /// Measure non-standard opcodes through the unit's opcode operands table.
    ///
    /// When disabled, any opcode outside the standard range fails the walk with
    /// [`crate::Error::UnsupportedOpcode`] even if the table describes it.
    pub vendor_opcode_dispatch: bool,

    /// Account `DW_FORM_data16` operands as 8 bytes instead of 16.
    ///
    /// Older consumers measured this form with the wrong width; enable this only to reproduce
    /// their unit lengths.
    pub legacy_data16_length: bool,
}

impl Default for MacroConfig {
    fn default() -> Self {
        Self {
            vendor_opcode_dispatch: true,
            legacy_data16_length: false,
        }
    }
}

impl MacroConfig {
    /// Standard-conforming decoding. Identical to [`MacroConfig::default`].
    #[must_use]
    pub fn strict() -> Self {
        Self::default()
    }

    /// Reproduce the measurements of legacy `.debug_macro` consumers: no vendor opcode dispatch
    /// and 8-byte `DW_FORM_data16` accounting.
    #[must_use]
    pub fn compatible() -> Self {
        Self {
            vendor_opcode_dispatch: false,
            legacy_data16_length: true,
        }
    }

    /// Width accounted for one `DW_FORM_data16` operand.
    #[must_use]
    pub fn data16_length(&self) -> usize {
        if self.legacy_data16_length {
            8
        } else {
            16
        }
    }
}
