//! Macro unit header parsing.
//!
//! Every macro unit starts with a small header:
//!
//! ```text
//! u16                 version (4 for the GNU extension, 5 for DWARF 5)
//! u8                  flags
//! u32 | u64           debug_line_offset        if flags & 0x02, 8 bytes if flags & 0x01
//! operands table                               if flags & 0x04
//! ```
//!
//! The operation stream begins directly after the header. The header does not record the unit's
//! length; that is only known after walking the operations to the terminating opcode.

use crate::{
    dwarf::{
        constants::MacroFlags, optable::OperandTable, section::MacroSection,
    },
    Error, Result,
};

/// The parsed header of one macro unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroHeader<'a> {
    offset: usize,
    version: u16,
    flags: MacroFlags,
    line_offset: Option<u64>,
    operand_table: OperandTable<'a>,
    header_length: usize,
}

impl<'a> MacroHeader<'a> {
    /// Parse the header of the unit at `offset` within `section`.
    ///
    /// The offset must leave room for the version, the flags and at least one byte of the
    /// operation stream.
    ///
    /// # Errors
    /// - [`crate::Error::OutOfBounds`] if any header field reaches the end of the section
    /// - [`crate::Error::UnsupportedVersion`] for versions other than 4 and 5
    /// - any error of [`OperandTable::read`] when the unit declares an operands table
    pub fn parse(section: &MacroSection<'a>, offset: u64) -> Result<Self> {
        let start = usize::try_from(offset).map_err(|_| out_of_bounds_error!())?;
        if start
            .checked_add(3)
            .map_or(true, |end| end >= section.len())
        {
            return Err(out_of_bounds_error!());
        }

        let mut parser = section.parser();
        parser.seek(start)?;

        let version = parser.read::<u16>()?;
        if version != 4 && version != 5 {
            return Err(Error::UnsupportedVersion(version));
        }

        let flags = MacroFlags::from_bits_retain(parser.read::<u8>()?);
        let offset_size = flags.offset_size();

        let line_offset = if flags.contains(MacroFlags::DEBUG_LINE_OFFSET) {
            if parser.remaining() <= usize::from(offset_size) {
                return Err(out_of_bounds_error!());
            }
            Some(parser.read_offset(offset_size)?)
        } else {
            None
        };

        let operand_table = if flags.contains(MacroFlags::OPCODE_OPERANDS_TABLE) {
            OperandTable::read(&mut parser)?
        } else {
            OperandTable::default()
        };

        Ok(MacroHeader {
            offset: start,
            version,
            flags,
            line_offset,
            operand_table,
            header_length: parser.pos() - start,
        })
    }

    /// Section offset of the unit.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Format version, 4 or 5.
    #[must_use]
    pub fn version(&self) -> u16 {
        self.version
    }

    /// Header flags, including any bits this crate does not interpret.
    #[must_use]
    pub fn flags(&self) -> MacroFlags {
        self.flags
    }

    /// Width of section offsets in this unit, 4 or 8.
    #[must_use]
    pub fn offset_size(&self) -> u8 {
        self.flags.offset_size()
    }

    /// The `.debug_line` offset, if the header has one.
    #[must_use]
    pub fn line_offset(&self) -> Option<u64> {
        self.line_offset
    }

    /// The opcode operands table. Empty if the unit does not declare one.
    #[must_use]
    pub fn operand_table(&self) -> &OperandTable<'a> {
        &self.operand_table
    }

    /// Bytes occupied by the header; the operation stream begins at this distance from
    /// [`MacroHeader::offset`].
    #[must_use]
    pub fn header_length(&self) -> usize {
        self.header_length
    }

    /// Section offset of the first operation.
    #[must_use]
    pub fn ops_offset(&self) -> usize {
        self.offset + self.header_length
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{dwarf::constants::DwForm, file::io::Endian, test::MacroUnitBuilder};

    #[test]
    fn minimal_header() {
        let data = MacroUnitBuilder::new(5).end().build();
        let header = MacroHeader::parse(&MacroSection::new(&data), 0).unwrap();

        assert_eq!(header.version(), 5);
        assert_eq!(header.flags(), MacroFlags::empty());
        assert_eq!(header.offset_size(), 4);
        assert_eq!(header.line_offset(), None);
        assert!(header.operand_table().is_empty());
        assert_eq!(header.header_length(), 3);
        assert_eq!(header.ops_offset(), 3);
    }

    #[test]
    fn line_offset_64() {
        let data = MacroUnitBuilder::new(5)
            .offset_size_64()
            .line_offset(0x1000)
            .end()
            .build();
        let header = MacroHeader::parse(&MacroSection::new(&data), 0).unwrap();

        assert_eq!(header.offset_size(), 8);
        assert_eq!(header.line_offset(), Some(0x1000));
        assert_eq!(header.header_length(), 11);
        assert_eq!(&data[3..11], &0x1000u64.to_le_bytes());
    }

    #[test]
    fn line_offset_32_big_endian() {
        let data = MacroUnitBuilder::new(4)
            .big_endian()
            .line_offset(0x20)
            .end()
            .build();
        let section = MacroSection::new(&data).with_endian(Endian::Big);
        let header = MacroHeader::parse(&section, 0).unwrap();

        assert_eq!(header.version(), 4);
        assert_eq!(header.line_offset(), Some(0x20));
        assert_eq!(header.header_length(), 7);
    }

    #[test]
    fn header_with_operand_table() {
        let data = MacroUnitBuilder::new(5)
            .vendor_op(0xE0, &[DwForm::Udata as u8])
            .end()
            .build();
        let header = MacroHeader::parse(&MacroSection::new(&data), 0).unwrap();

        assert!(header
            .flags()
            .contains(MacroFlags::OPCODE_OPERANDS_TABLE));
        assert_eq!(header.operand_table().len(), 1);
        // version + flags + count + (opcode, form count, form)
        assert_eq!(header.header_length(), 3 + 1 + 3);
    }

    #[test]
    fn unknown_flags_are_retained() {
        let data = MacroUnitBuilder::new(5).extra_flags(0x80).end().build();
        let header = MacroHeader::parse(&MacroSection::new(&data), 0).unwrap();

        assert_eq!(header.flags().bits(), 0x80);
        assert_eq!(header.offset_size(), 4);
        assert_eq!(header.header_length(), 3);
    }

    #[test]
    fn header_at_nonzero_offset() {
        let mut data = vec![0xAA; 7];
        data.extend(MacroUnitBuilder::new(5).end().build());
        let header = MacroHeader::parse(&MacroSection::new(&data), 7).unwrap();
        assert_eq!(header.offset(), 7);
        assert_eq!(header.ops_offset(), 10);
    }

    #[test]
    fn offset_must_leave_room() {
        let data = [0x05, 0x00, 0x00];
        assert!(matches!(
            MacroHeader::parse(&MacroSection::new(&data), 0),
            Err(Error::OutOfBounds { .. })
        ));
        let data = [0x05, 0x00, 0x00, 0x00];
        assert!(MacroHeader::parse(&MacroSection::new(&data), 1).is_err());
        assert!(MacroHeader::parse(&MacroSection::new(&data), u64::MAX).is_err());
    }

    #[test]
    fn truncated_line_offset() {
        // flags announce a 4-byte line offset, nothing follows it
        let data = [0x05, 0x00, 0x02, 0x00, 0x10, 0x00, 0x00];
        assert!(matches!(
            MacroHeader::parse(&MacroSection::new(&data), 0),
            Err(Error::OutOfBounds { .. })
        ));
    }

    #[test]
    fn operand_table_at_section_end() {
        // table row for 0xE0 {udata} fills the section, leaving no ops stream
        let data = [0x05, 0x00, 0x04, 0x01, 0xE0, 0x01, 0x0F];
        assert!(matches!(
            MacroHeader::parse(&MacroSection::new(&data), 0),
            Err(Error::OutOfBounds { .. })
        ));

        let data = [0x05, 0x00, 0x04, 0x01, 0xE0, 0x01, 0x0F, 0x00];
        let header = MacroHeader::parse(&MacroSection::new(&data), 0).unwrap();
        assert_eq!(header.header_length(), 7);
    }

    #[test]
    fn unsupported_version() {
        let data = [0x03, 0x00, 0x00, 0x00];
        assert!(matches!(
            MacroHeader::parse(&MacroSection::new(&data), 0),
            Err(Error::UnsupportedVersion(3))
        ));
    }
}
