//! Helpers shared by the integration tests: a minimal ELF64 writer and macro unit encoders.

#![allow(dead_code)]

const SHT_PROGBITS: u32 = 1;
const SHT_STRTAB: u32 = 3;
const SHT_NOBITS: u32 = 8;

/// `SHF_COMPRESSED`
pub const SHF_COMPRESSED: u64 = 0x800;

struct Section {
    name: String,
    kind: u32,
    flags: u64,
    data: Vec<u8>,
    size: u64,
}

/// Writes a relocatable ELF64 file containing only the given sections and `.shstrtab`.
pub struct ElfBuilder {
    big_endian: bool,
    sections: Vec<Section>,
}

impl ElfBuilder {
    pub fn new() -> Self {
        ElfBuilder {
            big_endian: false,
            sections: Vec::new(),
        }
    }

    pub fn big_endian(mut self) -> Self {
        self.big_endian = true;
        self
    }

    pub fn section(self, name: &str, data: &[u8]) -> Self {
        self.section_with_flags(name, 0, data)
    }

    pub fn section_with_flags(mut self, name: &str, flags: u64, data: &[u8]) -> Self {
        self.sections.push(Section {
            name: name.to_string(),
            kind: SHT_PROGBITS,
            flags,
            data: data.to_vec(),
            size: data.len() as u64,
        });
        self
    }

    /// A section that occupies no file space, as in stripped debug files.
    pub fn nobits(mut self, name: &str, size: u64) -> Self {
        self.sections.push(Section {
            name: name.to_string(),
            kind: SHT_NOBITS,
            flags: 0,
            data: Vec::new(),
            size,
        });
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut shstrtab = vec![0u8];
        let mut name_offsets = Vec::new();
        for section in &self.sections {
            name_offsets.push(shstrtab.len() as u32);
            shstrtab.extend_from_slice(section.name.as_bytes());
            shstrtab.push(0);
        }
        let shstrtab_name = shstrtab.len() as u32;
        shstrtab.extend_from_slice(b".shstrtab\0");

        let mut out = vec![0u8; 64];
        let mut offsets = Vec::new();
        for section in &self.sections {
            offsets.push(out.len() as u64);
            out.extend_from_slice(&section.data);
        }
        let shstrtab_offset = out.len() as u64;
        out.extend_from_slice(&shstrtab);
        while out.len() % 8 != 0 {
            out.push(0);
        }

        let shoff = out.len() as u64;
        let shnum = self.sections.len() as u16 + 2;
        let mut w = Writer {
            out: &mut out,
            big_endian: self.big_endian,
        };

        // null section header
        w.bytes(&[0u8; 64]);
        for ((section, name), offset) in self.sections.iter().zip(name_offsets).zip(offsets) {
            w.section_header(name, section.kind, section.flags, offset, section.size);
        }
        w.section_header(
            shstrtab_name,
            SHT_STRTAB,
            0,
            shstrtab_offset,
            shstrtab.len() as u64,
        );

        let mut header = Vec::with_capacity(64);
        header.extend_from_slice(&[0x7F, b'E', b'L', b'F', 2]);
        header.push(if self.big_endian { 2 } else { 1 });
        header.extend_from_slice(&[1, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        let mut w = Writer {
            out: &mut header,
            big_endian: self.big_endian,
        };
        w.u16(1); // ET_REL
        w.u16(if self.big_endian { 21 } else { 62 });
        w.u32(1);
        w.u64(0); // e_entry
        w.u64(0); // e_phoff
        w.u64(shoff);
        w.u32(0); // e_flags
        w.u16(64); // e_ehsize
        w.u16(0); // e_phentsize
        w.u16(0); // e_phnum
        w.u16(64); // e_shentsize
        w.u16(shnum);
        w.u16(shnum - 1); // e_shstrndx

        out[..64].copy_from_slice(&header);
        out
    }
}

struct Writer<'a> {
    out: &'a mut Vec<u8>,
    big_endian: bool,
}

impl Writer<'_> {
    fn bytes(&mut self, bytes: &[u8]) {
        self.out.extend_from_slice(bytes);
    }

    fn u16(&mut self, value: u16) {
        if self.big_endian {
            self.bytes(&value.to_be_bytes());
        } else {
            self.bytes(&value.to_le_bytes());
        }
    }

    fn u32(&mut self, value: u32) {
        if self.big_endian {
            self.bytes(&value.to_be_bytes());
        } else {
            self.bytes(&value.to_le_bytes());
        }
    }

    fn u64(&mut self, value: u64) {
        if self.big_endian {
            self.bytes(&value.to_be_bytes());
        } else {
            self.bytes(&value.to_le_bytes());
        }
    }

    fn section_header(&mut self, name: u32, kind: u32, flags: u64, offset: u64, size: u64) {
        self.u32(name);
        self.u32(kind);
        self.u64(flags);
        self.u64(0); // sh_addr
        self.u64(offset);
        self.u64(size);
        self.u32(0); // sh_link
        self.u32(0); // sh_info
        self.u64(1); // sh_addralign
        self.u64(0); // sh_entsize
    }
}

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

/// A little-endian unit header without line offset or operands table.
pub fn header(version: u16) -> Vec<u8> {
    let mut out = version.to_le_bytes().to_vec();
    out.push(0x00);
    out
}

/// `DW_MACRO_define` with an inline string.
pub fn define(line: u64, text: &str) -> Vec<u8> {
    let mut out = vec![0x01];
    out.extend(uleb128(line));
    out.extend_from_slice(text.as_bytes());
    out.push(0);
    out
}

/// `DW_MACRO_define_strp` with a 4-byte little-endian offset.
pub fn define_strp(line: u64, offset: u32) -> Vec<u8> {
    let mut out = vec![0x05];
    out.extend(uleb128(line));
    out.extend_from_slice(&offset.to_le_bytes());
    out
}

/// `DW_MACRO_import` with a 4-byte little-endian offset.
pub fn import(offset: u32) -> Vec<u8> {
    let mut out = vec![0x07];
    out.extend_from_slice(&offset.to_le_bytes());
    out
}

/// Concatenate a header and operations, appending the terminator.
pub fn unit(header: Vec<u8>, ops: &[Vec<u8>]) -> Vec<u8> {
    let mut out = header;
    for op in ops {
        out.extend_from_slice(op);
    }
    out.push(0x00);
    out
}
