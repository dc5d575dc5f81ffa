//! Section views: `.debug_macro` and the string sections its operations reference.

use std::collections::HashMap;

use crate::{
    dwarf::{
        config::MacroConfig,
        constants::{DW_AT_GNU_MACROS, DW_AT_MACROS},
        context::MacroContext,
        ops::MacroImport,
    },
    file::{io::Endian, parser::Parser},
    Error, Result,
};

/// Access to the attributes of a compilation unit's root DIE.
///
/// Implement this for your own DIE model to let [`MacroSection::context_for_unit`] find the unit's
/// macro information.
pub trait MacroAttributes {
    /// Return the value of the section-offset attribute `attr`, or `None` if the DIE lacks it.
    ///
    /// # Errors
    /// Implementations report their own decoding failures through [`crate::Error`].
    fn section_offset(&self, attr: u16) -> Result<Option<u64>>;
}

impl MacroAttributes for HashMap<u16, u64> {
    fn section_offset(&self, attr: u16) -> Result<Option<u64>> {
        Ok(self.get(&attr).copied())
    }
}

/// A read-only view of a `.debug_macro` section.
///
/// The view is cheap to copy. Every [`MacroContext`] created from it inherits its byte order and
/// configuration.
///
/// # Examples
///
/// ```rust
/// use macroscope::{MacroConfig, MacroSection};
///
/// let data = [0x04, 0x00, 0x00, 0x04, 0x00];
/// let section = MacroSection::new(&data).with_config(MacroConfig::strict());
///
/// let (version, context) = section.context_by_offset(0)?;
/// assert_eq!(version, 4);
/// assert_eq!(context.measure_ops()?.op_count, 2);
/// # Ok::<(), macroscope::Error>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MacroSection<'a> {
    data: &'a [u8],
    endian: Endian,
    config: MacroConfig,
    name: &'static str,
}

impl<'a> MacroSection<'a> {
    /// View `data` as a little-endian `.debug_macro` section with the default configuration.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        MacroSection {
            data,
            endian: Endian::Little,
            config: MacroConfig::default(),
            name: ".debug_macro",
        }
    }

    /// Use `endian` for every multi-byte field.
    #[must_use]
    pub fn with_endian(mut self, endian: Endian) -> Self {
        self.endian = endian;
        self
    }

    /// Decode with `config`.
    #[must_use]
    pub fn with_config(mut self, config: MacroConfig) -> Self {
        self.config = config;
        self
    }

    /// Name the section in log output, e.g. `__debug_macro` for Mach-O.
    #[must_use]
    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// The raw section bytes.
    #[must_use]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Section size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` for an empty section.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The section's byte order.
    #[must_use]
    pub fn endian(&self) -> Endian {
        self.endian
    }

    /// The decoder configuration.
    #[must_use]
    pub fn config(&self) -> MacroConfig {
        self.config
    }

    /// The section name used in log output.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// A parser over the whole section, positioned at its start.
    #[must_use]
    pub fn parser(&self) -> Parser<'a> {
        Parser::with_endian(self.data, self.endian)
    }

    /// Parse the header of the unit at `offset`.
    ///
    /// Returns the unit's version together with its context.
    ///
    /// # Errors
    /// - [`crate::Error::OutOfBounds`] if `offset` leaves no room for a header and an operation
    /// - [`crate::Error::UnsupportedVersion`] for versions other than 4 and 5
    /// - [`crate::Error::Malformed`], [`crate::Error::UnsupportedForm`] or
    ///   [`crate::Error::Allocation`] for a bad opcode operands table
    pub fn context_by_offset(&self, offset: u64) -> Result<(u16, MacroContext<'a>)> {
        let context = MacroContext::parse(*self, offset)?;
        Ok((context.version(), context))
    }

    /// Find the macro unit of a compilation unit.
    ///
    /// `DW_AT_macros` is tried first, then `DW_AT_GNU_macros`. Returns `None` if the unit has
    /// neither.
    ///
    /// # Errors
    /// Any error of the attribute lookup or of [`MacroSection::context_by_offset`].
    pub fn context_for_unit<U>(&self, unit: &U) -> Result<Option<(u16, MacroContext<'a>)>>
    where
        U: MacroAttributes + ?Sized,
    {
        for attr in [DW_AT_MACROS, DW_AT_GNU_MACROS] {
            if let Some(offset) = unit.section_offset(attr)? {
                return self.context_by_offset(offset).map(Some);
            }
        }

        Ok(None)
    }

    /// Follow an `import` operation to the unit it includes.
    ///
    /// # Errors
    /// Returns [`crate::Error::NotSupported`] for `import_sup`, whose target lives in a
    /// supplementary file, and any error of [`MacroSection::context_by_offset`].
    pub fn import_context(&self, import: MacroImport) -> Result<(u16, MacroContext<'a>)> {
        if import.supplementary {
            return Err(Error::NotSupported);
        }

        self.context_by_offset(import.offset)
    }

    /// Iterate the units laid out back to back from the start of the section.
    ///
    /// Every unit is measured to find the next one. Iteration ends at the end of the section or
    /// after the first error.
    #[must_use]
    pub fn units(&self) -> MacroUnits<'a> {
        MacroUnits {
            section: *self,
            offset: 0,
            done: false,
        }
    }
}

/// Iterator over consecutive units of a section. See [`MacroSection::units`].
pub struct MacroUnits<'a> {
    section: MacroSection<'a>,
    offset: usize,
    done: bool,
}

impl<'a> MacroUnits<'a> {
    fn next_unit(&mut self) -> Result<MacroContext<'a>> {
        let offset = u64::try_from(self.offset).map_err(|_| out_of_bounds_error!())?;
        let context = MacroContext::parse(self.section, offset)?;
        self.offset += context.measure_ops()?.total_length;
        Ok(context)
    }
}

impl<'a> Iterator for MacroUnits<'a> {
    type Item = Result<MacroContext<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.offset >= self.section.len() {
            return None;
        }

        let result = self.next_unit();
        self.done = result.is_err();
        Some(result)
    }
}

impl std::iter::FusedIterator for MacroUnits<'_> {}

/// A null-terminated string section such as `.debug_str` or `.debug_line_str`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StringSection<'a> {
    data: &'a [u8],
}

impl<'a> StringSection<'a> {
    /// View `data` as a string section.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        StringSection { data }
    }

    /// The raw section bytes.
    #[must_use]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Borrow the string starting at `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `offset` lies outside the section or the string is
    /// not terminated, and [`crate::Error::Malformed`] if it is not valid UTF-8.
    pub fn get(&self, offset: u64) -> Result<&'a str> {
        let start = usize::try_from(offset).map_err(|_| out_of_bounds_error!())?;
        let mut parser = Parser::new(self.data);
        parser.seek(start)?;

        let bytes = parser.read_cstr()?;
        std::str::from_utf8(bytes)
            .map_err(|_| malformed_error!("String at {:#x} is not valid UTF-8", offset))
    }
}
