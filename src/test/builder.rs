use crate::{
    dwarf::constants::{MacroFlags, MacroOpcode},
    file::io::Endian,
};

/// Encode `value` as unsigned LEB128.
pub fn uleb128(mut value: u64) -> Vec<u8> {
    let mut out = Vec::new();
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return out;
        }
        out.push(byte | 0x80);
    }
}

/// Builds the bytes of a single macro unit.
///
/// Header setters (`big_endian`, `offset_size_64`) must be called before adding operations, as
/// operands are encoded immediately.
pub struct MacroUnitBuilder {
    version: u16,
    endian: Endian,
    offset_size_64: bool,
    line_offset: Option<u64>,
    extra_flags: u8,
    table: Vec<(u8, Vec<u8>)>,
    ops: Vec<u8>,
}

impl MacroUnitBuilder {
    pub fn new(version: u16) -> Self {
        MacroUnitBuilder {
            version,
            endian: Endian::Little,
            offset_size_64: false,
            line_offset: None,
            extra_flags: 0,
            table: Vec::new(),
            ops: Vec::new(),
        }
    }

    pub fn big_endian(mut self) -> Self {
        self.endian = Endian::Big;
        self
    }

    pub fn offset_size_64(mut self) -> Self {
        self.offset_size_64 = true;
        self
    }

    pub fn line_offset(mut self, offset: u64) -> Self {
        self.line_offset = Some(offset);
        self
    }

    /// Set flag bits beyond the ones derived from the other setters.
    pub fn extra_flags(mut self, flags: u8) -> Self {
        self.extra_flags = flags;
        self
    }

    /// Add an operands table row. Standard opcodes may be restated too.
    pub fn vendor_op(mut self, opcode: u8, forms: &[u8]) -> Self {
        self.table.push((opcode, forms.to_vec()));
        self
    }

    pub fn define(self, line: u64, text: &str) -> Self {
        self.line_and_string(MacroOpcode::Define, line, text)
    }

    pub fn undef(self, line: u64, text: &str) -> Self {
        self.line_and_string(MacroOpcode::Undef, line, text)
    }

    pub fn start_file(mut self, line: u64, file_index: u64) -> Self {
        self.ops.push(MacroOpcode::StartFile as u8);
        self.ops.extend(uleb128(line));
        self.ops.extend(uleb128(file_index));
        self
    }

    pub fn end_file(mut self) -> Self {
        self.ops.push(MacroOpcode::EndFile as u8);
        self
    }

    pub fn define_strp(self, line: u64, offset: u64) -> Self {
        self.line_and_offset(MacroOpcode::DefineStrp, line, offset)
    }

    pub fn undef_strp(self, line: u64, offset: u64) -> Self {
        self.line_and_offset(MacroOpcode::UndefStrp, line, offset)
    }

    pub fn define_sup(self, line: u64, offset: u64) -> Self {
        self.line_and_offset(MacroOpcode::DefineSup, line, offset)
    }

    pub fn undef_sup(self, line: u64, offset: u64) -> Self {
        self.line_and_offset(MacroOpcode::UndefSup, line, offset)
    }

    pub fn import(mut self, offset: u64) -> Self {
        self.ops.push(MacroOpcode::Import as u8);
        self.push_offset(offset);
        self
    }

    pub fn import_sup(mut self, offset: u64) -> Self {
        self.ops.push(MacroOpcode::ImportSup as u8);
        self.push_offset(offset);
        self
    }

    pub fn define_strx(self, line: u64, index: u64) -> Self {
        self.line_and_index(MacroOpcode::DefineStrx, line, index)
    }

    pub fn undef_strx(self, line: u64, index: u64) -> Self {
        self.line_and_index(MacroOpcode::UndefStrx, line, index)
    }

    /// Append raw operation bytes.
    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.ops.extend_from_slice(bytes);
        self
    }

    /// Append the terminating opcode.
    pub fn end(mut self) -> Self {
        self.ops.push(0x00);
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut flags = MacroFlags::from_bits_retain(self.extra_flags);
        flags.set(MacroFlags::OFFSET_SIZE, self.offset_size_64);
        flags.set(MacroFlags::DEBUG_LINE_OFFSET, self.line_offset.is_some());
        flags.set(MacroFlags::OPCODE_OPERANDS_TABLE, !self.table.is_empty());

        let mut out = match self.endian {
            Endian::Little => self.version.to_le_bytes().to_vec(),
            Endian::Big => self.version.to_be_bytes().to_vec(),
        };
        out.push(flags.bits());

        if let Some(offset) = self.line_offset {
            out.extend(self.encode_offset(offset));
        }

        if !self.table.is_empty() {
            out.push(self.table.len() as u8);
            for (opcode, forms) in &self.table {
                out.push(*opcode);
                out.extend(uleb128(forms.len() as u64));
                out.extend_from_slice(forms);
            }
        }

        out.extend_from_slice(&self.ops);
        out
    }

    fn line_and_string(mut self, opcode: MacroOpcode, line: u64, text: &str) -> Self {
        self.ops.push(opcode as u8);
        self.ops.extend(uleb128(line));
        self.ops.extend_from_slice(text.as_bytes());
        self.ops.push(0x00);
        self
    }

    fn line_and_offset(mut self, opcode: MacroOpcode, line: u64, offset: u64) -> Self {
        self.ops.push(opcode as u8);
        self.ops.extend(uleb128(line));
        self.push_offset(offset);
        self
    }

    fn line_and_index(mut self, opcode: MacroOpcode, line: u64, index: u64) -> Self {
        self.ops.push(opcode as u8);
        self.ops.extend(uleb128(line));
        self.ops.extend(uleb128(index));
        self
    }

    fn push_offset(&mut self, offset: u64) {
        let encoded = self.encode_offset(offset);
        self.ops.extend(encoded);
    }

    fn encode_offset(&self, offset: u64) -> Vec<u8> {
        match (self.offset_size_64, self.endian) {
            (true, Endian::Little) => offset.to_le_bytes().to_vec(),
            (true, Endian::Big) => offset.to_be_bytes().to_vec(),
            (false, Endian::Little) => (offset as u32).to_le_bytes().to_vec(),
            (false, Endian::Big) => (offset as u32).to_be_bytes().to_vec(),
        }
    }
}
