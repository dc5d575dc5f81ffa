//! DWARF constants used by the `.debug_macro` decoder.
//!
//! Only the subset of the DWARF 5 constant space that a macro unit can reference lives here:
//! the operand forms the decoder knows how to measure, the standard macro opcodes, the header
//! flag bits and the attributes that point a compilation unit at its macro unit.

use bitflags::bitflags;
use strum::{EnumCount, EnumIter, FromRepr, IntoStaticStr};

/// `DW_AT_macros`, the DWARF 5 attribute holding a unit's `.debug_macro` offset
pub const DW_AT_MACROS: u16 = 0x79;
/// `DW_AT_GNU_macros`, the pre-standard GNU attribute with the same meaning
pub const DW_AT_GNU_MACROS: u16 = 0x2119;

/// First opcode value reserved for vendor extensions (`DW_MACRO_lo_user`)
pub const DW_MACRO_LO_USER: u8 = 0xe0;
/// Last opcode value reserved for vendor extensions (`DW_MACRO_hi_user`)
pub const DW_MACRO_HI_USER: u8 = 0xff;

/// Opcode value that terminates every macro unit
pub const DW_MACRO_END: u8 = 0x00;

/// Operand forms a macro operation may be encoded with.
///
/// This is the complete set of forms the decoder can measure. Any other form code in an operand
/// signature is rejected with [`crate::Error::UnsupportedForm`].
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, EnumCount, FromRepr, IntoStaticStr,
)]
#[repr(u8)]
pub enum DwForm {
    /// Block with a 2-byte length prefix
    #[strum(serialize = "DW_FORM_block2")]
    Block2 = 0x03,
    /// Block with a 4-byte length prefix
    #[strum(serialize = "DW_FORM_block4")]
    Block4 = 0x04,
    /// 2-byte constant
    #[strum(serialize = "DW_FORM_data2")]
    Data2 = 0x05,
    /// 4-byte constant
    #[strum(serialize = "DW_FORM_data4")]
    Data4 = 0x06,
    /// 8-byte constant
    #[strum(serialize = "DW_FORM_data8")]
    Data8 = 0x07,
    /// Inline null-terminated string
    #[strum(serialize = "DW_FORM_string")]
    String = 0x08,
    /// Block with a ULEB128 length prefix
    #[strum(serialize = "DW_FORM_block")]
    Block = 0x09,
    /// Block with a 1-byte length prefix
    #[strum(serialize = "DW_FORM_block1")]
    Block1 = 0x0a,
    /// 1-byte constant
    #[strum(serialize = "DW_FORM_data1")]
    Data1 = 0x0b,
    /// 1-byte flag
    #[strum(serialize = "DW_FORM_flag")]
    Flag = 0x0c,
    /// Signed LEB128 constant
    #[strum(serialize = "DW_FORM_sdata")]
    Sdata = 0x0d,
    /// Offset into `.debug_str`
    #[strum(serialize = "DW_FORM_strp")]
    Strp = 0x0e,
    /// Unsigned LEB128 constant
    #[strum(serialize = "DW_FORM_udata")]
    Udata = 0x0f,
    /// Offset into another debug section
    #[strum(serialize = "DW_FORM_sec_offset")]
    SecOffset = 0x17,
    /// ULEB128 index into the string offsets table
    #[strum(serialize = "DW_FORM_strx")]
    Strx = 0x1a,
    /// Offset into the supplementary file's `.debug_str`
    #[strum(serialize = "DW_FORM_strp_sup")]
    StrpSup = 0x1d,
    /// 16-byte constant
    #[strum(serialize = "DW_FORM_data16")]
    Data16 = 0x1e,
}

impl DwForm {
    /// Map a raw form code onto a known form.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnsupportedForm`] for any code outside [`DwForm`].
    pub fn from_code(code: u8) -> crate::Result<Self> {
        DwForm::from_repr(code).ok_or(crate::Error::UnsupportedForm { form: code })
    }

    /// Returns the DWARF name of this form, e.g. `DW_FORM_udata`.
    #[must_use]
    pub fn name(self) -> &'static str {
        self.into()
    }

    /// Whether a vendor opcode row in an operand table may declare this form.
    ///
    /// Signed LEB128 and string-index forms are excluded, as are supplementary string offsets.
    #[must_use]
    pub fn is_vendor_permitted(self) -> bool {
        !matches!(self, DwForm::Sdata | DwForm::Strx | DwForm::StrpSup)
    }
}

/// The standard macro opcodes defined by DWARF 5.
///
/// GNU version 4 units use the same values; its `DW_MACRO_GNU_*_indirect` and `*_alt` opcodes
/// share the encodings of the `*_strp` and `*_sup` opcodes here.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, EnumCount, FromRepr, IntoStaticStr,
)]
#[repr(u8)]
pub enum MacroOpcode {
    /// Define a macro from an inline string
    #[strum(serialize = "DW_MACRO_define")]
    Define = 0x01,
    /// Undefine a macro named by an inline string
    #[strum(serialize = "DW_MACRO_undef")]
    Undef = 0x02,
    /// Start of an included source file
    #[strum(serialize = "DW_MACRO_start_file")]
    StartFile = 0x03,
    /// End of the current included source file
    #[strum(serialize = "DW_MACRO_end_file")]
    EndFile = 0x04,
    /// Define a macro from a `.debug_str` offset
    #[strum(serialize = "DW_MACRO_define_strp")]
    DefineStrp = 0x05,
    /// Undefine a macro named by a `.debug_str` offset
    #[strum(serialize = "DW_MACRO_undef_strp")]
    UndefStrp = 0x06,
    /// Include another macro unit of this section
    #[strum(serialize = "DW_MACRO_import")]
    Import = 0x07,
    /// Define a macro from a supplementary `.debug_str` offset
    #[strum(serialize = "DW_MACRO_define_sup")]
    DefineSup = 0x08,
    /// Undefine a macro named by a supplementary `.debug_str` offset
    #[strum(serialize = "DW_MACRO_undef_sup")]
    UndefSup = 0x09,
    /// Include a macro unit of the supplementary file
    #[strum(serialize = "DW_MACRO_import_sup")]
    ImportSup = 0x0a,
    /// Define a macro from a string offsets table index
    #[strum(serialize = "DW_MACRO_define_strx")]
    DefineStrx = 0x0b,
    /// Undefine a macro named by a string offsets table index
    #[strum(serialize = "DW_MACRO_undef_strx")]
    UndefStrx = 0x0c,
}

impl MacroOpcode {
    /// Highest standard opcode value
    pub const MAX: u8 = MacroOpcode::UndefStrx as u8;

    /// Returns the DWARF name of this opcode, e.g. `DW_MACRO_define`.
    #[must_use]
    pub fn name(self) -> &'static str {
        self.into()
    }

    /// Returns `true` for opcodes in the standard range `1..=MAX`.
    #[must_use]
    pub fn is_standard(opcode: u8) -> bool {
        opcode != DW_MACRO_END && opcode <= Self::MAX
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    /// Flag bits of a macro unit header
    pub struct MacroFlags: u8 {
        /// Offsets in this unit are 8 bytes wide (64-bit DWARF)
        const OFFSET_SIZE = 0x01;
        /// The header carries a `.debug_line` offset
        const DEBUG_LINE_OFFSET = 0x02;
        /// The header carries an opcode operands table
        const OPCODE_OPERANDS_TABLE = 0x04;
    }
}

impl MacroFlags {
    /// The offset size selected by [`MacroFlags::OFFSET_SIZE`], 8 or 4 bytes.
    #[must_use]
    pub fn offset_size(self) -> u8 {
        if self.contains(MacroFlags::OFFSET_SIZE) {
            8
        } else {
            4
        }
    }
}
