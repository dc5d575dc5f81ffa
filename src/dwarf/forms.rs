//! Operand form signatures and form length skimming.
//!
//! Every macro operation is an opcode byte followed by operands whose encodings are described by
//! a list of `DW_FORM_*` codes. This module holds the static table of signatures for the
//! standard opcodes and the [`crate::dwarf::forms::FormSkimmer`], which measures the encoded
//! length of a list of operands without materialising their values.
//!
//! # Length rules
//!
//! | Form | Encoded length |
//! |------|----------------|
//! | `data1`, `flag` | 1 |
//! | `data2` / `data4` / `data8` | 2 / 4 / 8 |
//! | `data16` | 16 (8 with [`crate::MacroConfig::legacy_data16_length`]) |
//! | `sec_offset`, `strp`, `strp_sup` | offset size (4 or 8) |
//! | `string` | string length + 1 |
//! | `udata`, `sdata`, `strx` | LEB128 encoded length |
//! | `block1` / `block2` / `block4` | 1 / 2 / 4 + prefix value |
//! | `block` | ULEB128 prefix length + prefix value |

use crate::{
    dwarf::{
        config::MacroConfig,
        constants::{DwForm, MacroOpcode},
    },
    file::parser::Parser,
    Result,
};

/// An opcode paired with the ordered form codes of its operands.
///
/// The form codes are raw bytes; for rows of a unit's opcode operands table they borrow directly
/// from the section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormSignature<'a> {
    opcode: u8,
    forms: &'a [u8],
}

/// One row of a macro unit's opcode operands table, borrowing its form codes from the section.
pub type OpcodeFormEntry<'a> = FormSignature<'a>;

impl<'a> FormSignature<'a> {
    /// Create a signature for `opcode` with the given raw form codes.
    #[must_use]
    pub const fn new(opcode: u8, forms: &'a [u8]) -> Self {
        FormSignature { opcode, forms }
    }

    /// The opcode this signature describes.
    #[must_use]
    pub fn opcode(&self) -> u8 {
        self.opcode
    }

    /// The raw form codes, in operand order.
    #[must_use]
    pub fn forms(&self) -> &'a [u8] {
        self.forms
    }

    /// Number of operands.
    #[must_use]
    pub fn form_count(&self) -> usize {
        self.forms.len()
    }

    /// Iterate the operand forms, mapping each raw code onto [`DwForm`].
    pub fn iter_forms(&self) -> impl Iterator<Item = Result<DwForm>> + 'a {
        let forms = self.forms;
        forms.iter().map(|&code| DwForm::from_code(code))
    }
}

const UDATA_STRING: &[u8] = &[DwForm::Udata as u8, DwForm::String as u8];
const UDATA_UDATA: &[u8] = &[DwForm::Udata as u8, DwForm::Udata as u8];
const UDATA_STRP: &[u8] = &[DwForm::Udata as u8, DwForm::Strp as u8];
const UDATA_STRP_SUP: &[u8] = &[DwForm::Udata as u8, DwForm::StrpSup as u8];
const UDATA_STRX: &[u8] = &[DwForm::Udata as u8, DwForm::Strx as u8];
const SEC_OFFSET: &[u8] = &[DwForm::SecOffset as u8];

/// Operand signatures of the standard opcodes, indexed by opcode value. Slot 0 is the
/// terminator, which has no operands.
static STANDARD_OPCODES: [FormSignature<'static>; MacroOpcode::MAX as usize + 1] = [
    FormSignature::new(0x00, &[]),
    FormSignature::new(MacroOpcode::Define as u8, UDATA_STRING),
    FormSignature::new(MacroOpcode::Undef as u8, UDATA_STRING),
    FormSignature::new(MacroOpcode::StartFile as u8, UDATA_UDATA),
    FormSignature::new(MacroOpcode::EndFile as u8, &[]),
    FormSignature::new(MacroOpcode::DefineStrp as u8, UDATA_STRP),
    FormSignature::new(MacroOpcode::UndefStrp as u8, UDATA_STRP),
    FormSignature::new(MacroOpcode::Import as u8, SEC_OFFSET),
    FormSignature::new(MacroOpcode::DefineSup as u8, UDATA_STRP_SUP),
    FormSignature::new(MacroOpcode::UndefSup as u8, UDATA_STRP_SUP),
    FormSignature::new(MacroOpcode::ImportSup as u8, SEC_OFFSET),
    FormSignature::new(MacroOpcode::DefineStrx as u8, UDATA_STRX),
    FormSignature::new(MacroOpcode::UndefStrx as u8, UDATA_STRX),
];

/// Look up the operand signature of a standard opcode.
///
/// Returns `None` for the terminator and for every opcode outside the standard range.
#[must_use]
pub fn standard_signature(opcode: u8) -> Option<&'static FormSignature<'static>> {
    if MacroOpcode::is_standard(opcode) {
        STANDARD_OPCODES.get(usize::from(opcode))
    } else {
        None
    }
}

/// A single decoded operand value.
///
/// Strings and blocks borrow from the section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormValue<'a> {
    /// `data1`, `data2`, `data4` or `data8`, zero-extended
    Data(u64),
    /// `data16`, as raw bytes in section order
    Data16(&'a [u8]),
    /// `flag`
    Flag(bool),
    /// `udata`
    Udata(u64),
    /// `sdata`
    Sdata(i64),
    /// `sec_offset`
    SecOffset(u64),
    /// `strp`, an offset into `.debug_str`
    Strp(u64),
    /// `strp_sup`, an offset into the supplementary `.debug_str`
    StrpSup(u64),
    /// `strx`, an index into the string offsets table
    Strx(u64),
    /// `string`, without its terminator
    String(&'a [u8]),
    /// Any block form, without its length prefix
    Block(&'a [u8]),
}

/// Measures and decodes operand forms for one macro unit.
///
/// The skimmer carries the two unit-level parameters that influence form widths: the offset size
/// selected by the unit header and the `data16` accounting chosen by [`MacroConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormSkimmer {
    offset_size: u8,
    data16_length: usize,
}

impl FormSkimmer {
    /// Create a skimmer for a unit with the given offset size (4 or 8).
    #[must_use]
    pub fn new(offset_size: u8, config: &MacroConfig) -> Self {
        FormSkimmer {
            offset_size,
            data16_length: config.data16_length(),
        }
    }

    /// The unit's offset size.
    #[must_use]
    pub fn offset_size(&self) -> u8 {
        self.offset_size
    }

    /// Skip the operands described by `forms`, returning the number of bytes they occupy.
    ///
    /// On success the parser is positioned directly after the last operand.
    ///
    /// # Errors
    /// - [`crate::Error::OutOfBounds`] if the parser is at the end of data when an operand
    ///   starts, or if an operand extends past the end of data
    /// - [`crate::Error::UnsupportedForm`] for a form code outside [`DwForm`]
    /// - [`crate::Error::Malformed`] for LEB128 values that overflow 64 bits
    pub fn skim(&self, parser: &mut Parser<'_>, forms: &[u8]) -> Result<usize> {
        let start = parser.pos();
        for &code in forms {
            if !parser.has_more_data() {
                return Err(out_of_bounds_error!());
            }
            self.skip_form(parser, DwForm::from_code(code)?)?;
        }

        Ok(parser.pos() - start)
    }

    fn skip_form(&self, parser: &mut Parser<'_>, form: DwForm) -> Result<()> {
        match form {
            DwForm::Data1 | DwForm::Flag => parser.advance_by(1),
            DwForm::Data2 => parser.advance_by(2),
            DwForm::Data4 => parser.advance_by(4),
            DwForm::Data8 => parser.advance_by(8),
            DwForm::Data16 => parser.advance_by(self.data16_length),
            DwForm::SecOffset | DwForm::Strp | DwForm::StrpSup => {
                parser.advance_by(usize::from(self.offset_size))
            }
            DwForm::String => parser.read_cstr().map(drop),
            // Only the encoded length matters, the value is discarded
            DwForm::Udata | DwForm::Strx => parser.read_uleb128().map(drop),
            DwForm::Sdata => parser.read_sleb128().map(drop),
            DwForm::Block1 | DwForm::Block2 | DwForm::Block4 | DwForm::Block => {
                let length = Self::block_length(parser, form)?;
                parser.advance_by(length)
            }
        }
    }

    fn block_length(parser: &mut Parser<'_>, form: DwForm) -> Result<usize> {
        let length = match form {
            DwForm::Block1 => u64::from(parser.read::<u8>()?),
            DwForm::Block2 => u64::from(parser.read::<u16>()?),
            DwForm::Block4 => u64::from(parser.read::<u32>()?),
            _ => parser.read_uleb128()?.0,
        };

        usize::try_from(length).map_err(|_| out_of_bounds_error!())
    }

    /// Decode one operand of the given form, advancing the parser past it.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the operand extends past the end of data.
    pub fn read_value<'a>(&self, parser: &mut Parser<'a>, form: DwForm) -> Result<FormValue<'a>> {
        Ok(match form {
            DwForm::Data1 => FormValue::Data(u64::from(parser.read::<u8>()?)),
            DwForm::Data2 => FormValue::Data(u64::from(parser.read::<u16>()?)),
            DwForm::Data4 => FormValue::Data(u64::from(parser.read::<u32>()?)),
            DwForm::Data8 => FormValue::Data(parser.read::<u64>()?),
            DwForm::Data16 => FormValue::Data16(parser.read_bytes(self.data16_length)?),
            DwForm::Flag => FormValue::Flag(parser.read::<u8>()? != 0),
            DwForm::Udata => FormValue::Udata(parser.read_uleb128()?.0),
            DwForm::Sdata => FormValue::Sdata(parser.read_sleb128()?.0),
            DwForm::Strx => FormValue::Strx(parser.read_uleb128()?.0),
            DwForm::SecOffset => FormValue::SecOffset(parser.read_offset(self.offset_size)?),
            DwForm::Strp => FormValue::Strp(parser.read_offset(self.offset_size)?),
            DwForm::StrpSup => FormValue::StrpSup(parser.read_offset(self.offset_size)?),
            DwForm::String => FormValue::String(parser.read_cstr()?),
            DwForm::Block1 | DwForm::Block2 | DwForm::Block4 | DwForm::Block => {
                let length = Self::block_length(parser, form)?;
                FormValue::Block(parser.read_bytes(length)?)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    fn skim_one(form: DwForm, data: &[u8], offset_size: u8) -> Result<usize> {
        let skimmer = FormSkimmer::new(offset_size, &MacroConfig::default());
        let mut parser = Parser::new(data);
        skimmer.skim(&mut parser, &[form as u8])
    }

    #[test]
    fn fixed_width_lengths() {
        let data = [0u8; 32];
        assert_eq!(skim_one(DwForm::Data1, &data, 4).unwrap(), 1);
        assert_eq!(skim_one(DwForm::Flag, &data, 4).unwrap(), 1);
        assert_eq!(skim_one(DwForm::Data2, &data, 4).unwrap(), 2);
        assert_eq!(skim_one(DwForm::Data4, &data, 4).unwrap(), 4);
        assert_eq!(skim_one(DwForm::Data8, &data, 4).unwrap(), 8);
        assert_eq!(skim_one(DwForm::Data16, &data, 4).unwrap(), 16);
    }

    #[test]
    fn data16_legacy_length() {
        let skimmer = FormSkimmer::new(4, &MacroConfig::compatible());
        let data = [0u8; 16];
        let mut parser = Parser::new(&data);
        assert_eq!(skimmer.skim(&mut parser, &[DwForm::Data16 as u8]).unwrap(), 8);
        assert_eq!(parser.pos(), 8);
    }

    #[test]
    fn offset_sized_lengths() {
        let data = [0u8; 16];
        for form in [DwForm::SecOffset, DwForm::Strp, DwForm::StrpSup] {
            assert_eq!(skim_one(form, &data, 4).unwrap(), 4);
            assert_eq!(skim_one(form, &data, 8).unwrap(), 8);
        }
    }

    #[test]
    fn variable_lengths() {
        assert_eq!(skim_one(DwForm::String, b"FOO 1\0rest", 4).unwrap(), 6);
        assert_eq!(skim_one(DwForm::String, b"\0", 4).unwrap(), 1);
        assert_eq!(skim_one(DwForm::Udata, &[0xE5, 0x8E, 0x26], 4).unwrap(), 3);
        assert_eq!(skim_one(DwForm::Strx, &[0x05], 4).unwrap(), 1);
        assert_eq!(skim_one(DwForm::Sdata, &[0xC0, 0xBB, 0x78], 4).unwrap(), 3);
    }

    #[test]
    fn block_lengths_include_prefix() {
        assert_eq!(skim_one(DwForm::Block1, &[0x03, 1, 2, 3], 4).unwrap(), 4);
        assert_eq!(skim_one(DwForm::Block2, &[0x02, 0x00, 1, 2], 4).unwrap(), 4);
        assert_eq!(
            skim_one(DwForm::Block4, &[0x01, 0x00, 0x00, 0x00, 9], 4).unwrap(),
            5
        );
        let mut block = vec![0x80, 0x01];
        block.extend(std::iter::repeat(0xAA).take(128));
        assert_eq!(skim_one(DwForm::Block, &block, 4).unwrap(), 130);
        assert_eq!(skim_one(DwForm::Block1, &[0x00], 4).unwrap(), 1);
    }

    #[test]
    fn big_endian_block_prefix() {
        let skimmer = FormSkimmer::new(4, &MacroConfig::default());
        let data = [0x00, 0x02, 0xAA, 0xBB];
        let mut parser = Parser::with_endian(&data, crate::file::io::Endian::Big);
        assert_eq!(skimmer.skim(&mut parser, &[DwForm::Block2 as u8]).unwrap(), 4);
    }

    #[test]
    fn multiple_forms_sum() {
        let skimmer = FormSkimmer::new(8, &MacroConfig::default());
        let mut data = vec![0x0A];
        data.extend_from_slice(&[0u8; 8]);
        data.push(0x00);
        let mut parser = Parser::new(&data);

        let length = skimmer
            .skim(&mut parser, &[DwForm::Udata as u8, DwForm::Strp as u8])
            .unwrap();
        assert_eq!(length, 9);
        assert_eq!(parser.pos(), 9);
    }

    #[test]
    fn truncated_operands() {
        assert!(matches!(
            skim_one(DwForm::Data4, &[0, 0, 0], 4),
            Err(Error::OutOfBounds { .. })
        ));
        assert!(matches!(
            skim_one(DwForm::String, b"NO TERMINATOR", 4),
            Err(Error::OutOfBounds { .. })
        ));
        assert!(matches!(
            skim_one(DwForm::Block1, &[0x05, 1, 2], 4),
            Err(Error::OutOfBounds { .. })
        ));
        assert!(matches!(
            skim_one(DwForm::Block4, &[0xFF, 0xFF, 0xFF, 0xFF], 4),
            Err(Error::OutOfBounds { .. })
        ));
    }

    #[test]
    fn operand_must_start_inside_data() {
        let skimmer = FormSkimmer::new(4, &MacroConfig::default());
        let data = [0x01];
        let mut parser = Parser::new(&data);
        assert!(matches!(
            skimmer.skim(&mut parser, &[DwForm::Udata as u8, DwForm::Udata as u8]),
            Err(Error::OutOfBounds { .. })
        ));

        // No operands means nothing is read, even at the end of data
        let mut parser = Parser::new(&[]);
        assert_eq!(skimmer.skim(&mut parser, &[]).unwrap(), 0);
    }

    #[test]
    fn unknown_form_is_rejected() {
        let skimmer = FormSkimmer::new(4, &MacroConfig::default());
        let data = [0u8; 8];
        let mut parser = Parser::new(&data);
        assert!(matches!(
            skimmer.skim(&mut parser, &[0x01]),
            Err(Error::UnsupportedForm { form: 0x01 })
        ));
    }

    #[test]
    fn standard_table_lookup() {
        let define = standard_signature(MacroOpcode::Define as u8).unwrap();
        assert_eq!(define.forms(), &[DwForm::Udata as u8, DwForm::String as u8]);
        assert_eq!(
            standard_signature(MacroOpcode::EndFile as u8)
                .unwrap()
                .form_count(),
            0
        );
        assert_eq!(
            standard_signature(MacroOpcode::ImportSup as u8)
                .unwrap()
                .forms(),
            &[DwForm::SecOffset as u8]
        );
        assert!(standard_signature(0).is_none());
        assert!(standard_signature(0x0d).is_none());

        for opcode in 1..=MacroOpcode::MAX {
            let signature = standard_signature(opcode).unwrap();
            assert_eq!(signature.opcode(), opcode);
            assert!(signature.iter_forms().all(|form| form.is_ok()));
        }
    }

    #[test]
    fn read_values() {
        let skimmer = FormSkimmer::new(4, &MacroConfig::default());
        let data = [0x0A, b'X', 0x00, 0x10, 0x00, 0x00, 0x00, 0x02, 0xAA, 0xBB, 0x7F];
        let mut parser = Parser::new(&data);

        assert_eq!(
            skimmer.read_value(&mut parser, DwForm::Udata).unwrap(),
            FormValue::Udata(10)
        );
        assert_eq!(
            skimmer.read_value(&mut parser, DwForm::String).unwrap(),
            FormValue::String(b"X")
        );
        assert_eq!(
            skimmer.read_value(&mut parser, DwForm::SecOffset).unwrap(),
            FormValue::SecOffset(0x10)
        );
        assert_eq!(
            skimmer.read_value(&mut parser, DwForm::Block1).unwrap(),
            FormValue::Block(&[0xAA, 0xBB])
        );
        assert_eq!(
            skimmer.read_value(&mut parser, DwForm::Sdata).unwrap(),
            FormValue::Sdata(-1)
        );
        assert!(skimmer.read_value(&mut parser, DwForm::Flag).is_err());
    }
}
