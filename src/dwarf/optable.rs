//! Opcode operands table of a macro unit header.
//!
//! A unit whose flags include [`crate::dwarf::constants::MacroFlags::OPCODE_OPERANDS_TABLE`]
//! carries a table that declares the operand forms of opcodes, so that consumers can skip
//! operations they do not understand. The layout is:
//!
//! ```text
//! u8      row count
//! rows:   u8 opcode, ULEB128 form count, form count x u8 form code
//! ```
//!
//! Rows may restate a standard opcode only with exactly its standard signature. Vendor opcodes
//! (`DW_MACRO_lo_user` and above) may declare any signature built from the vendor-permitted
//! forms. Opcode 0 and the reserved range between the standard and vendor opcodes are rejected.

use crate::{
    dwarf::{
        constants::{DwForm, MacroOpcode, DW_MACRO_END, DW_MACRO_LO_USER},
        forms::{standard_signature, OpcodeFormEntry},
    },
    file::parser::Parser,
    Error, Result,
};

/// The parsed opcode operands table of one macro unit.
///
/// Each row's form codes borrow from the section; the table only owns the row array.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperandTable<'a> {
    rows: Vec<OpcodeFormEntry<'a>>,
    byte_length: usize,
}

impl<'a> OperandTable<'a> {
    /// Read and validate an operands table at the parser's position.
    ///
    /// On success the parser is positioned directly after the table. Nothing is returned on
    /// failure; a partially read table is discarded.
    ///
    /// # Errors
    /// - [`crate::Error::OutOfBounds`] if the table extends to or past the end of the section
    /// - [`crate::Error::UnsupportedForm`] if a vendor row uses a form outside the permitted set
    /// - [`crate::Error::Malformed`] for opcode 0, reserved opcodes, duplicate rows, or a standard
    ///   opcode restated with a different signature
    /// - [`crate::Error::Allocation`] if the row array can not be allocated
    pub fn read(parser: &mut Parser<'a>) -> Result<Self> {
        let start = parser.pos();
        let count = parser.read::<u8>()?;

        // Every row needs an opcode and a form count, and the ops stream must follow
        let minimum = usize::from(count) * 2;
        if parser.remaining() <= minimum {
            return Err(out_of_bounds_error!());
        }

        let mut rows = Vec::new();
        rows.try_reserve_exact(usize::from(count))?;

        for _ in 0..count {
            let opcode = parser.read::<u8>()?;
            let (form_count, _) = parser.read_uleb128()?;
            let form_count = usize::try_from(form_count).map_err(|_| out_of_bounds_error!())?;
            let row = OpcodeFormEntry::new(opcode, parser.read_bytes(form_count)?);

            validate_row(&row)?;
            if rows
                .iter()
                .any(|existing: &OpcodeFormEntry<'_>| existing.opcode() == opcode)
            {
                return Err(malformed_error!(
                    "Opcode {:#04x} is declared twice in the operands table",
                    opcode
                ));
            }

            rows.push(row);
        }

        if !parser.has_more_data() {
            return Err(out_of_bounds_error!());
        }

        Ok(OperandTable {
            rows,
            byte_length: parser.pos() - start,
        })
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` if the table has no rows, which is also the case when the unit has no table.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Bytes the table occupied in the unit header, including the row count.
    #[must_use]
    pub fn byte_length(&self) -> usize {
        self.byte_length
    }

    /// All rows in declaration order.
    #[must_use]
    pub fn rows(&self) -> &[OpcodeFormEntry<'a>] {
        &self.rows
    }

    /// Bounds-checked row access.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidIndex`] if `index >= len()`.
    pub fn get(&self, index: usize) -> Result<&OpcodeFormEntry<'a>> {
        self.rows.get(index).ok_or(Error::InvalidIndex {
            index,
            count: self.rows.len(),
        })
    }

    /// Find the row declaring `opcode`.
    #[must_use]
    pub fn find(&self, opcode: u8) -> Option<&OpcodeFormEntry<'a>> {
        self.rows.iter().find(|row| row.opcode() == opcode)
    }
}

fn validate_row(row: &OpcodeFormEntry<'_>) -> Result<()> {
    let opcode = row.opcode();

    if opcode > MacroOpcode::MAX {
        for &code in row.forms() {
            if !DwForm::from_code(code)?.is_vendor_permitted() {
                return Err(Error::UnsupportedForm { form: code });
            }
        }
    }

    if opcode >= DW_MACRO_LO_USER {
        return Ok(());
    }

    if opcode == DW_MACRO_END {
        return Err(malformed_error!("Opcode 0 can not appear in an operands table"));
    }

    let Some(standard) = standard_signature(opcode) else {
        return Err(malformed_error!(
            "Opcode {:#04x} is reserved and can not appear in an operands table",
            opcode
        ));
    };

    if standard.forms() != row.forms() {
        return Err(malformed_error!(
            "Operands table signature for opcode {:#04x} differs from the standard - {:?} vs {:?}",
            opcode,
            row.forms(),
            standard.forms()
        ));
    }

    Ok(())
}
