//! Object file loading and low-level binary access.
//!
//! This module loads ELF, PE/COFF and Mach-O object files and locates the debug sections the
//! macro decoder works on. It also hosts the byte-order primitives and the [`crate::Parser`]
//! cursor every other module reads through.
//!
//! # Key Components
//!
//! - [`crate::file::File`] - A loaded object file with its located debug sections
//! - [`crate::file::Backend`] - Source of the file bytes
//! - [`crate::file::parser::Parser`] - Bounds-checked cursor over a byte slice
//! - [`crate::file::io`] - Endian-aware reads and LEB128 decoding
//!
//! # Backends
//!
//! - [`crate::file::physical::Physical`] - A memory-mapped file on disk
//! - [`crate::file::memory::Memory`] - An owned buffer
//!
//! # Section lookup
//!
//! | Container | Macro section | String sections | Byte order |
//! |-----------|---------------|-----------------|------------|
//! | ELF | `.debug_macro` | `.debug_str`, `.debug_line_str` | from `e_ident` |
//! | PE/COFF | `.debug_macro` (long name) | `.debug_str`, `.debug_line_str` | little |
//! | Mach-O | `__debug_macro` | `__debug_str`, `__debug_line_str` | from the header |
//!
//! Compressed ELF sections, fat Mach-O binaries and archives are rejected with
//! [`crate::Error::NotSupported`].

pub mod io;
pub mod memory;
pub mod parser;
pub mod physical;

use std::path::Path;

use goblin::{
    elf::{section_header::SHF_COMPRESSED, Elf},
    mach::{Mach, MachO},
    pe::PE,
    Object,
};
use memory::Memory;
use ouroboros::self_referencing;
use physical::Physical;

use crate::{
    dwarf::{MacroAttributes, MacroContext, MacroSection, StringSection},
    file::io::Endian,
    Error::{Empty, NotSupported},
    MacroConfig, Result,
};

/// Backend trait for file data sources.
///
/// This trait abstracts over the source of the object file bytes, allowing for both in-memory and
/// on-disk representations. All implementations must be thread-safe.
pub trait Backend: Send + Sync {
    /// Returns a slice of the data at the given offset and length.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if the requested range is out of bounds.
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]>;

    /// Returns the entire data buffer.
    fn data(&self) -> &[u8];

    /// Returns the total length of the data buffer.
    fn len(&self) -> usize;
}

/// The container format a [`File`] was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectFormat {
    /// ELF
    Elf,
    /// PE/COFF
    Pe,
    /// Single-architecture Mach-O
    MachO,
}

/// The debug sections located in an object file, borrowing from its bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebugSections<'a> {
    format: ObjectFormat,
    endian: Endian,
    debug_macro: Option<&'a [u8]>,
    debug_str: Option<&'a [u8]>,
    debug_line_str: Option<&'a [u8]>,
}

impl<'a> DebugSections<'a> {
    fn empty(format: ObjectFormat, endian: Endian) -> Self {
        DebugSections {
            format,
            endian,
            debug_macro: None,
            debug_str: None,
            debug_line_str: None,
        }
    }

    /// Parse the container in `data` and locate the debug sections.
    ///
    /// Missing sections are not an error.
    ///
    /// # Errors
    /// - [`crate::Error::GoblinErr`] if the container can not be parsed
    /// - [`crate::Error::NotSupported`] for compressed sections and unsupported containers
    /// - [`crate::Error::OutOfBounds`] if a section lies outside the file
    pub fn locate(data: &'a [u8]) -> Result<Self> {
        let sections = match Object::parse(data)? {
            Object::Elf(elf) => Self::from_elf(&elf, data)?,
            Object::PE(pe) => Self::from_pe(&pe, data)?,
            Object::Mach(Mach::Binary(macho)) => Self::from_macho(&macho)?,
            _ => return Err(NotSupported),
        };

        log::debug!(
            "{:?} object: .debug_macro {:?} bytes, .debug_str {:?} bytes",
            sections.format,
            sections.debug_macro.map(<[u8]>::len),
            sections.debug_str.map(<[u8]>::len)
        );

        Ok(sections)
    }

    fn slot(&mut self, name: &str) -> Option<&mut Option<&'a [u8]>> {
        match name {
            ".debug_macro" | "__debug_macro" => Some(&mut self.debug_macro),
            ".debug_str" | "__debug_str" => Some(&mut self.debug_str),
            ".debug_line_str" | "__debug_line_str" => Some(&mut self.debug_line_str),
            _ => None,
        }
    }

    fn from_elf(elf: &Elf<'_>, data: &'a [u8]) -> Result<Self> {
        let mut sections = Self::empty(ObjectFormat::Elf, Endian::from_little(elf.little_endian));

        for header in &elf.section_headers {
            let Some(name) = elf.shdr_strtab.get_at(header.sh_name) else {
                continue;
            };
            let Some(slot) = sections.slot(name) else {
                continue;
            };

            if header.sh_flags & u64::from(SHF_COMPRESSED) != 0 {
                return Err(NotSupported);
            }

            // SHT_NOBITS sections of stripped files have no file range
            if let Some(range) = header.file_range() {
                *slot = Some(data.get(range).ok_or(out_of_bounds_error!())?);
            }
        }

        Ok(sections)
    }

    fn from_pe(pe: &PE<'_>, data: &'a [u8]) -> Result<Self> {
        let mut sections = Self::empty(ObjectFormat::Pe, Endian::Little);

        for section in &pe.sections {
            let name = match section.real_name.as_deref() {
                Some(name) => name,
                None => section.name().unwrap_or_default(),
            };
            let Some(slot) = sections.slot(name) else {
                continue;
            };

            // Raw data is padded to the file alignment
            let size = match section.virtual_size {
                0 => section.size_of_raw_data,
                size => size.min(section.size_of_raw_data),
            };
            let start = usize::try_from(section.pointer_to_raw_data)
                .map_err(|_| out_of_bounds_error!())?;
            let size = usize::try_from(size).map_err(|_| out_of_bounds_error!())?;
            let end = start.checked_add(size).ok_or(out_of_bounds_error!())?;
            *slot = Some(data.get(start..end).ok_or(out_of_bounds_error!())?);
        }

        Ok(sections)
    }

    fn from_macho(macho: &MachO<'a>) -> Result<Self> {
        let mut sections =
            Self::empty(ObjectFormat::MachO, Endian::from_little(macho.little_endian));

        for segment in macho.segments.iter() {
            for (section, bytes) in segment.sections()? {
                if let Some(slot) = sections.slot(section.name()?) {
                    *slot = Some(bytes);
                }
            }
        }

        Ok(sections)
    }

    /// The container format.
    #[must_use]
    pub fn format(&self) -> ObjectFormat {
        self.format
    }

    /// The container's byte order.
    #[must_use]
    pub fn endian(&self) -> Endian {
        self.endian
    }

    /// The raw `.debug_macro` bytes, if present.
    #[must_use]
    pub fn debug_macro(&self) -> Option<&'a [u8]> {
        self.debug_macro
    }

    /// The raw `.debug_str` bytes, if present.
    #[must_use]
    pub fn debug_str(&self) -> Option<&'a [u8]> {
        self.debug_str
    }

    /// The raw `.debug_line_str` bytes, if present.
    #[must_use]
    pub fn debug_line_str(&self) -> Option<&'a [u8]> {
        self.debug_line_str
    }
}

#[self_referencing]
/// An object file with its debug sections located.
///
/// The file keeps its bytes, either memory-mapped or owned, and every view it hands out borrows
/// from them. Section lookup happens once, when the file is loaded.
///
/// # Examples
///
/// ```rust,no_run
/// use macroscope::File;
/// use std::path::Path;
///
/// let file = File::from_file(Path::new("target/debug/app"))?;
/// if let Some(section) = file.macro_section() {
///     for unit in section.units() {
///         let unit = unit?;
///         println!("unit at {:#x}: {} operations", unit.offset(), unit.measure_ops()?.op_count);
///     }
/// }
/// # Ok::<(), macroscope::Error>(())
/// ```
pub struct File {
    /// The underlying data source (memory or file).
    data: Box<dyn Backend>,
    /// The located debug sections, referencing the data.
    #[borrows(data)]
    #[covariant]
    sections: DebugSections<'this>,
    /// Configuration handed to every macro section view.
    macro_config: MacroConfig,
}

impl File {
    /// Loads an object file from the given path.
    ///
    /// The file is memory-mapped.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read or opened
    /// - The file is empty
    /// - The container can not be parsed or is not supported
    pub fn from_file(file: &Path) -> Result<File> {
        let input = Physical::new(file)?;

        Self::load(input)
    }

    /// Loads an object file from a memory buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer is empty or the container can not be parsed or is not
    /// supported.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use macroscope::File;
    ///
    /// let data = std::fs::read("target/debug/app")?;
    /// let file = File::from_mem(data)?;
    /// println!("has .debug_macro: {}", file.macro_section().is_some());
    /// # Ok::<(), macroscope::Error>(())
    /// ```
    pub fn from_mem(data: Vec<u8>) -> Result<File> {
        let input = Memory::new(data);

        Self::load(input)
    }

    fn load<T: Backend + 'static>(data: T) -> Result<File> {
        if data.len() == 0 {
            return Err(Empty);
        }

        File::try_new(
            Box::new(data),
            |data| DebugSections::locate(data.data()),
            MacroConfig::default(),
        )
    }

    /// Replace the configuration used for this file's macro section.
    #[must_use]
    pub fn with_config(mut self, config: MacroConfig) -> File {
        self.with_macro_config_mut(|current| *current = config);
        self
    }

    /// Returns the total size of the loaded file in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.borrow_data().len()
    }

    /// Returns `true` if the file has a length of zero.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the raw bytes of the file.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        self.borrow_data().data()
    }

    /// Returns a bounds-checked slice of the file.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the range extends past the end of the file.
    pub fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        self.borrow_data().data_slice(offset, len)
    }

    /// The located debug sections.
    #[must_use]
    pub fn sections(&self) -> &DebugSections<'_> {
        self.borrow_sections()
    }

    /// The container format.
    #[must_use]
    pub fn format(&self) -> ObjectFormat {
        self.borrow_sections().format()
    }

    /// The `.debug_macro` section, or `None` if the file has none or it is empty.
    #[must_use]
    pub fn macro_section(&self) -> Option<MacroSection<'_>> {
        let sections = self.borrow_sections();
        let name = match sections.format() {
            ObjectFormat::MachO => "__debug_macro",
            ObjectFormat::Elf | ObjectFormat::Pe => ".debug_macro",
        };

        sections
            .debug_macro()
            .filter(|data| !data.is_empty())
            .map(|data| {
                MacroSection::new(data)
                    .with_endian(sections.endian())
                    .with_config(*self.borrow_macro_config())
                    .with_name(name)
            })
    }

    /// The `.debug_str` section, if present.
    #[must_use]
    pub fn debug_str(&self) -> Option<StringSection<'_>> {
        self.borrow_sections().debug_str().map(StringSection::new)
    }

    /// The `.debug_line_str` section, if present.
    #[must_use]
    pub fn debug_line_str(&self) -> Option<StringSection<'_>> {
        self.borrow_sections().debug_line_str().map(StringSection::new)
    }

    /// Find the macro unit of a compilation unit.
    ///
    /// Returns `None` if the file has no `.debug_macro` section or the unit has neither
    /// `DW_AT_macros` nor `DW_AT_GNU_macros`.
    ///
    /// # Errors
    /// Any error of [`MacroSection::context_for_unit`].
    pub fn macro_context<U>(&self, unit: &U) -> Result<Option<(u16, MacroContext<'_>)>>
    where
        U: MacroAttributes + ?Sized,
    {
        match self.macro_section() {
            Some(section) => section.context_for_unit(unit),
            None => Ok(None),
        }
    }

    /// Parse the macro unit at `offset`.
    ///
    /// Returns `None` if the file has no `.debug_macro` section.
    ///
    /// # Errors
    /// Any error of [`MacroSection::context_by_offset`].
    pub fn macro_context_by_offset(&self, offset: u64) -> Result<Option<(u16, MacroContext<'_>)>> {
        self.macro_section()
            .map(|section| section.context_by_offset(offset))
            .transpose()
    }
}
