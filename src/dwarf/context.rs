//! Per-unit decoding context.
//!
//! A [`MacroContext`] is created by [`crate::MacroSection::context_by_offset`] once the unit header
//! has been parsed and validated. It owns everything derived from the header: the flags, the
//! offset size, the optional `.debug_line` offset and the opcode operands table. The operation
//! stream itself is walked lazily, the first time a caller asks for anything that depends on it.
//!
//! # Ownership
//!
//! The context borrows the section data and owns its operands table. Dropping it, or passing it to
//! [`MacroContext::destroy`], releases the table. Once destroyed, the context can not be used again;
//! this is enforced at compile time.

use std::sync::OnceLock;

use crate::{
    dwarf::{
        constants::MacroFlags,
        forms::{FormSkimmer, OpcodeFormEntry},
        header::MacroHeader,
        ops::OpsSummary,
        optable::OperandTable,
        section::MacroSection,
    },
    file::io::Endian,
    MacroConfig, Result,
};

/// Snapshot of the header-derived values of a macro unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderFields {
    /// Format version, 4 or 5
    pub version: u16,
    /// Section offset of the unit
    pub offset: usize,
    /// Raw header flags, including bits this crate does not interpret
    pub flags: MacroFlags,
    /// Offsets are 8 bytes wide
    pub is_64bit: bool,
    /// The header carries a `.debug_line` offset
    pub has_line_offset: bool,
    /// The header carries an opcode operands table
    pub has_operand_table: bool,
    /// Offset width of the unit, 4 or 8
    pub offset_size: u8,
    /// The `.debug_line` offset, if present
    pub line_offset: Option<u64>,
    /// Bytes occupied by the header
    pub header_length: usize,
    /// Rows in the opcode operands table
    pub operand_table_rows: usize,
    /// Header plus operation stream; `None` until the operations have been measured
    pub total_length: Option<usize>,
}

/// Decoding state for a single macro unit.
///
/// Contexts are independent of each other: any number may exist for the same section, and none
/// mutates the section. The lazily computed operation index is thread-safe, so a context can be
/// shared between threads by reference.
///
/// # Examples
///
/// ```rust
/// use macroscope::MacroSection;
///
/// // version 5, line offset present, define "A 1" on line 1, terminator
/// let data = [0x05, 0x00, 0x02, 0x00, 0x00, 0x00, 0x00, 0x01, 0x01, b'A', b' ', b'1', 0x00, 0x00];
/// let section = MacroSection::new(&data);
///
/// let (version, context) = section.context_by_offset(0)?;
/// assert_eq!(version, 5);
/// assert_eq!(context.line_offset(), Some(0));
///
/// let summary = context.measure_ops()?;
/// assert_eq!(summary.op_count, 2);
/// assert_eq!(summary.ops_length, 7);
/// assert_eq!(context.header_fields().total_length, Some(14));
/// # Ok::<(), macroscope::Error>(())
/// ```
#[derive(Debug)]
pub struct MacroContext<'a> {
    section: MacroSection<'a>,
    header: MacroHeader<'a>,
    skimmer: FormSkimmer,
    pub(crate) summary: OnceLock<OpsSummary>,
    pub(crate) op_offsets: OnceLock<Vec<usize>>,
}

impl<'a> MacroContext<'a> {
    pub(crate) fn new(section: MacroSection<'a>, header: MacroHeader<'a>) -> Self {
        let skimmer = FormSkimmer::new(header.offset_size(), &section.config());
        MacroContext {
            section,
            header,
            skimmer,
            summary: OnceLock::new(),
            op_offsets: OnceLock::new(),
        }
    }

    /// Parse the unit header at `offset` and create a context for it.
    ///
    /// # Errors
    /// Any error of [`MacroHeader::parse`].
    pub(crate) fn parse(section: MacroSection<'a>, offset: u64) -> Result<Self> {
        let header = MacroHeader::parse(&section, offset)?;
        log::debug!(
            "{}: unit at {:#x}, version {}, flags {:#04x}, header {} bytes, {} operand table rows",
            section.name(),
            header.offset(),
            header.version(),
            header.flags().bits(),
            header.header_length(),
            header.operand_table().len()
        );

        Ok(MacroContext::new(section, header))
    }

    /// The section this unit belongs to.
    #[must_use]
    pub fn section(&self) -> &MacroSection<'a> {
        &self.section
    }

    /// The parsed unit header.
    #[must_use]
    pub fn header(&self) -> &MacroHeader<'a> {
        &self.header
    }

    /// Format version, 4 or 5.
    #[must_use]
    pub fn version(&self) -> u16 {
        self.header.version()
    }

    /// Section offset of the unit.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.header.offset()
    }

    /// Offset width of the unit, 4 or 8.
    #[must_use]
    pub fn offset_size(&self) -> u8 {
        self.header.offset_size()
    }

    /// The `.debug_line` offset, if the header has one.
    #[must_use]
    pub fn line_offset(&self) -> Option<u64> {
        self.header.line_offset()
    }

    /// Section offset of the first operation.
    #[must_use]
    pub fn ops_offset(&self) -> usize {
        self.header.ops_offset()
    }

    /// The byte order used to decode this unit.
    #[must_use]
    pub fn endian(&self) -> Endian {
        self.section.endian()
    }

    /// The configuration this unit is decoded with.
    #[must_use]
    pub fn config(&self) -> MacroConfig {
        self.section.config()
    }

    /// The skimmer measuring this unit's operand forms.
    #[must_use]
    pub fn skimmer(&self) -> &FormSkimmer {
        &self.skimmer
    }

    /// The opcode operands table.
    #[must_use]
    pub fn operand_table(&self) -> &OperandTable<'a> {
        self.header.operand_table()
    }

    /// Snapshot the header-derived fields.
    ///
    /// [`HeaderFields::total_length`] is only known once the operations were measured, either
    /// explicitly through [`MacroContext::measure_ops`] or by any per-operation accessor.
    #[must_use]
    pub fn header_fields(&self) -> HeaderFields {
        let flags = self.header.flags();
        HeaderFields {
            version: self.header.version(),
            offset: self.header.offset(),
            flags,
            is_64bit: flags.contains(MacroFlags::OFFSET_SIZE),
            has_line_offset: flags.contains(MacroFlags::DEBUG_LINE_OFFSET),
            has_operand_table: flags.contains(MacroFlags::OPCODE_OPERANDS_TABLE),
            offset_size: self.header.offset_size(),
            line_offset: self.header.line_offset(),
            header_length: self.header.header_length(),
            operand_table_rows: self.header.operand_table().len(),
            total_length: self.summary.get().map(|summary| summary.total_length),
        }
    }

    /// Bounds-checked access to a row of the opcode operands table.
    ///
    /// The row's form codes borrow from the section.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidIndex`] if the table has `index` or fewer rows.
    pub fn operand_table_row(&self, index: usize) -> Result<&OpcodeFormEntry<'a>> {
        self.header.operand_table().get(index)
    }

    /// Release the context and everything it owns.
    ///
    /// Equivalent to dropping the context. The context is consumed, so it can not be used again:
    ///
    /// ```rust,compile_fail
    /// use macroscope::MacroSection;
    ///
    /// let data = [0x05, 0x00, 0x00, 0x00];
    /// let section = MacroSection::new(&data);
    /// let (_, context) = section.context_by_offset(0).unwrap();
    /// context.destroy();
    /// let _ = context.header_fields();
    /// ```
    pub fn destroy(self) {
        log::trace!(
            "{}: releasing unit context at {:#x}",
            self.section.name(),
            self.header.offset()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{dwarf::constants::DwForm, test::MacroUnitBuilder, Error};

    #[test]
    fn header_fields_snapshot() {
        let data = MacroUnitBuilder::new(5)
            .line_offset(0x44)
            .define(1, "A 1")
            .end()
            .build();
        let section = MacroSection::new(&data);
        let (_, context) = section.context_by_offset(0).unwrap();

        let fields = context.header_fields();
        assert_eq!(fields.version, 5);
        assert_eq!(fields.offset, 0);
        assert_eq!(fields.offset_size, 4);
        assert_eq!(fields.line_offset, Some(0x44));
        assert!(fields.has_line_offset);
        assert!(!fields.is_64bit);
        assert!(!fields.has_operand_table);
        assert_eq!(fields.header_length, 7);
        assert_eq!(fields.operand_table_rows, 0);
        assert_eq!(fields.total_length, None);

        context.measure_ops().unwrap();
        assert_eq!(context.header_fields().total_length, Some(data.len()));
    }

    #[test]
    fn operand_table_rows() {
        let data = MacroUnitBuilder::new(5)
            .vendor_op(0xE0, &[DwForm::Udata as u8, DwForm::String as u8])
            .vendor_op(0xE1, &[])
            .end()
            .build();
        let section = MacroSection::new(&data);
        let (_, context) = section.context_by_offset(0).unwrap();

        let row = context.operand_table_row(0).unwrap();
        assert_eq!(row.opcode(), 0xE0);
        assert_eq!(row.form_count(), 2);
        assert_eq!(context.operand_table_row(1).unwrap().form_count(), 0);
        assert!(matches!(
            context.operand_table_row(2),
            Err(Error::InvalidIndex { index: 2, count: 2 })
        ));
    }

    #[test]
    fn contexts_are_independent() {
        let data = MacroUnitBuilder::new(4).define(3, "X").end().build();
        let section = MacroSection::new(&data);

        let (_, first) = section.context_by_offset(0).unwrap();
        let (_, second) = section.context_by_offset(0).unwrap();
        first.measure_ops().unwrap();
        first.destroy();

        assert_eq!(second.header_fields().total_length, None);
        assert_eq!(second.measure_ops().unwrap().op_count, 2);
    }
}
