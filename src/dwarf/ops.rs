//! Operation stream walking and per-operation decoding.
//!
//! The operations of a unit follow its header back to back, each an opcode byte followed by the
//! operands its signature describes, until the terminating opcode `0`. Walking the stream requires
//! a signature for every opcode: standard opcodes use their fixed signatures, everything else is
//! looked up in the unit's opcode operands table.
//!
//! [`MacroContext::operations`] walks lazily and borrows everything from the section.
//! [`MacroContext::measure_ops`] walks once and caches only the count and the length. The
//! per-operation accessors build an index of operation offsets on first use, with fallible
//! allocation.

use std::iter::FusedIterator;

use crate::{
    dwarf::{
        constants::{MacroOpcode, DW_MACRO_END},
        context::MacroContext,
        forms::{standard_signature, FormSignature, FormSkimmer, FormValue},
        section::StringSection,
    },
    file::{io::Endian, parser::Parser},
    Error, Result,
};

/// Result of walking a unit's operation stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpsSummary {
    /// Number of operations, including the terminator
    pub op_count: usize,
    /// Bytes occupied by the operation stream, including the terminator
    pub ops_length: usize,
    /// Header length plus [`OpsSummary::ops_length`]
    pub total_length: usize,
}

/// One operation of a macro unit, with its operands left encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MacroOperation<'a> {
    offset: usize,
    signature: FormSignature<'a>,
    operands: &'a [u8],
    skimmer: FormSkimmer,
    endian: Endian,
}

impl<'a> MacroOperation<'a> {
    /// Section offset of the opcode byte.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// The raw opcode.
    #[must_use]
    pub fn opcode(&self) -> u8 {
        self.signature.opcode()
    }

    /// The standard opcode, or `None` for the terminator and vendor opcodes.
    #[must_use]
    pub fn kind(&self) -> Option<MacroOpcode> {
        MacroOpcode::from_repr(self.signature.opcode())
    }

    /// The operand signature this operation was measured with.
    #[must_use]
    pub fn signature(&self) -> &FormSignature<'a> {
        &self.signature
    }

    /// The encoded operands, borrowed from the section.
    #[must_use]
    pub fn operands(&self) -> &'a [u8] {
        self.operands
    }

    /// Encoded length of the operation, opcode byte included.
    #[must_use]
    pub fn length(&self) -> usize {
        1 + self.operands.len()
    }

    /// Returns `true` for the opcode that ends the unit.
    #[must_use]
    pub fn is_terminator(&self) -> bool {
        self.signature.opcode() == DW_MACRO_END
    }

    /// Decode the operands in signature order.
    pub fn values(&self) -> impl Iterator<Item = Result<FormValue<'a>>> + 'a {
        let mut parser = Parser::with_endian(self.operands, self.endian);
        let skimmer = self.skimmer;
        self.signature
            .iter_forms()
            .map(move |form| skimmer.read_value(&mut parser, form?))
    }
}

/// Whether a `define`/`undef` family operation adds or removes a macro.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacroAction {
    /// `define`, `define_strp`, `define_sup`, `define_strx`
    Define,
    /// `undef`, `undef_strp`, `undef_sup`, `undef_strx`
    Undefine,
}

/// The string operand of a macro definition, in whichever encoding the producer chose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacroString<'a> {
    /// Inline string, borrowed from the section
    Inline(&'a str),
    /// Offset into `.debug_str`
    StrOffset(u64),
    /// Offset into the supplementary file's `.debug_str`
    SupStrOffset(u64),
    /// Index into the string offsets table
    StrIndex(u64),
}

impl<'a> MacroString<'a> {
    /// Resolve the string against `.debug_str`.
    ///
    /// Returns `None` for encodings that need a supplementary file or the string offsets table.
    ///
    /// # Errors
    /// Any error of [`StringSection::get`].
    pub fn resolve(self, strings: &StringSection<'a>) -> Result<Option<&'a str>> {
        match self {
            MacroString::Inline(text) => Ok(Some(text)),
            MacroString::StrOffset(offset) => strings.get(offset).map(Some),
            MacroString::SupStrOffset(_) | MacroString::StrIndex(_) => Ok(None),
        }
    }
}

/// A decoded `define`/`undef` family operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MacroDefinition<'a> {
    /// Define or undefine
    pub action: MacroAction,
    /// Source line of the directive
    pub line: u64,
    /// `NAME VALUE` for definitions, `NAME` for undefinitions
    pub string: MacroString<'a>,
}

/// A decoded `start_file`/`end_file` operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileBoundary {
    /// A `#include`d file begins
    Start {
        /// Line of the include directive
        line: u64,
        /// File entry in the line program
        file_index: u64,
    },
    /// The current file ends
    End,
}

/// A decoded `import`/`import_sup` operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MacroImport {
    /// Offset of the imported unit
    pub offset: u64,
    /// The unit lives in the supplementary file's `.debug_macro`
    pub supplementary: bool,
}

/// Iterator over the operations of a unit.
///
/// Yields the terminator as its last item. After the terminator or the first error it yields
/// nothing more.
pub struct MacroOps<'c, 'a> {
    context: &'c MacroContext<'a>,
    offset: usize,
    done: bool,
}

impl<'c, 'a> MacroOps<'c, 'a> {
    fn at(context: &'c MacroContext<'a>, offset: usize) -> Self {
        MacroOps {
            context,
            offset,
            done: false,
        }
    }

    fn step(&mut self) -> Result<MacroOperation<'a>> {
        let offset = self.offset;
        let mut parser = self.context.section().parser();
        parser.advance_by(offset)?;
        if !parser.has_more_data() {
            return Err(Error::TruncatedStream { offset });
        }

        let opcode = parser.read::<u8>()?;
        let signature = if opcode == DW_MACRO_END {
            FormSignature::new(DW_MACRO_END, &[])
        } else {
            self.context.signature_for(opcode)?
        };

        let operands_start = parser.pos();
        let length = self.context.skimmer().skim(&mut parser, signature.forms())?;
        let operands = parser
            .data()
            .get(operands_start..operands_start + length)
            .ok_or(out_of_bounds_error!())?;

        self.offset = parser.pos();
        Ok(MacroOperation {
            offset,
            signature,
            operands,
            skimmer: *self.context.skimmer(),
            endian: self.context.endian(),
        })
    }
}

impl<'a> Iterator for MacroOps<'_, 'a> {
    type Item = Result<MacroOperation<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let result = self.step();
        match &result {
            Ok(operation) if !operation.is_terminator() => {}
            _ => self.done = true,
        }

        Some(result)
    }
}

impl FusedIterator for MacroOps<'_, '_> {}

impl<'a> MacroContext<'a> {
    /// Walk the operation stream from the first operation to the terminator.
    ///
    /// Nothing is cached; use [`MacroContext::measure_ops`] for repeated access.
    #[must_use]
    pub fn operations(&self) -> MacroOps<'_, 'a> {
        MacroOps::at(self, self.ops_offset())
    }

    /// Count the operations and measure the operation stream.
    ///
    /// The stream is walked on the first call only. Later calls, and calls racing on other
    /// threads, return the same summary.
    ///
    /// # Errors
    /// - [`crate::Error::TruncatedStream`] if the section ends before the terminator
    /// - [`crate::Error::OutOfBounds`] if an operand runs past the end of the section
    /// - [`crate::Error::UnsupportedOpcode`] for a non-standard opcode that can not be dispatched
    ///   through the opcode operands table
    /// - [`crate::Error::UnsupportedForm`] and [`crate::Error::Malformed`] from operand decoding
    pub fn measure_ops(&self) -> Result<OpsSummary> {
        if let Some(summary) = self.summary.get() {
            return Ok(*summary);
        }

        let mut op_count = 0usize;
        let mut end = None;
        for operation in self.operations() {
            let operation = operation?;
            op_count += 1;
            if operation.is_terminator() {
                end = Some(operation.offset() + operation.length());
            }
        }

        let summary = self.summarize(op_count, end)?;
        Ok(*self.summary.get_or_init(|| summary))
    }

    /// Read a single operation by its position in the stream.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidIndex`] if `op_number` is not below the operation count, and
    /// any error of [`MacroContext::measure_ops`].
    pub fn operation(&self, op_number: usize) -> Result<MacroOperation<'a>> {
        let offsets = self.op_offsets()?;
        let offset = offsets
            .get(op_number)
            .copied()
            .ok_or(Error::InvalidIndex {
                index: op_number,
                count: offsets.len(),
            })?;

        MacroOps::at(self, offset).step()
    }

    /// Decode a `define`/`undef` family operation.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnsupportedOpcode`] for any other kind of operation, and any error
    /// of [`MacroContext::operation`].
    pub fn define_undef(&self, op_number: usize) -> Result<MacroDefinition<'a>> {
        let operation = self.operation(op_number)?;
        let action = match operation.kind() {
            Some(
                MacroOpcode::Define
                | MacroOpcode::DefineStrp
                | MacroOpcode::DefineSup
                | MacroOpcode::DefineStrx,
            ) => MacroAction::Define,
            Some(
                MacroOpcode::Undef
                | MacroOpcode::UndefStrp
                | MacroOpcode::UndefSup
                | MacroOpcode::UndefStrx,
            ) => MacroAction::Undefine,
            _ => {
                return Err(Error::UnsupportedOpcode {
                    opcode: operation.opcode(),
                })
            }
        };

        let mut values = operation.values();
        let Some(FormValue::Udata(line)) = values.next().transpose()? else {
            return Err(malformed_error!(
                "Missing line operand at {:#x}",
                operation.offset()
            ));
        };

        let string = match values.next().transpose()? {
            Some(FormValue::String(bytes)) => {
                MacroString::Inline(std::str::from_utf8(bytes).map_err(|_| {
                    malformed_error!(
                        "Macro string at {:#x} is not valid UTF-8",
                        operation.offset()
                    )
                })?)
            }
            Some(FormValue::Strp(offset)) => MacroString::StrOffset(offset),
            Some(FormValue::StrpSup(offset)) => MacroString::SupStrOffset(offset),
            Some(FormValue::Strx(index)) => MacroString::StrIndex(index),
            _ => {
                return Err(malformed_error!(
                    "Missing string operand at {:#x}",
                    operation.offset()
                ))
            }
        };

        Ok(MacroDefinition {
            action,
            line,
            string,
        })
    }

    /// Decode a `start_file` or `end_file` operation.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnsupportedOpcode`] for any other kind of operation, and any error
    /// of [`MacroContext::operation`].
    pub fn start_end_file(&self, op_number: usize) -> Result<FileBoundary> {
        let operation = self.operation(op_number)?;
        match operation.kind() {
            Some(MacroOpcode::StartFile) => {
                let mut values = operation.values();
                match (values.next().transpose()?, values.next().transpose()?) {
                    (Some(FormValue::Udata(line)), Some(FormValue::Udata(file_index))) => {
                        Ok(FileBoundary::Start { line, file_index })
                    }
                    _ => Err(malformed_error!(
                        "Missing start_file operands at {:#x}",
                        operation.offset()
                    )),
                }
            }
            Some(MacroOpcode::EndFile) => Ok(FileBoundary::End),
            _ => Err(Error::UnsupportedOpcode {
                opcode: operation.opcode(),
            }),
        }
    }

    /// Decode an `import` or `import_sup` operation.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnsupportedOpcode`] for any other kind of operation, and any error
    /// of [`MacroContext::operation`].
    pub fn import(&self, op_number: usize) -> Result<MacroImport> {
        let operation = self.operation(op_number)?;
        let supplementary = match operation.kind() {
            Some(MacroOpcode::Import) => false,
            Some(MacroOpcode::ImportSup) => true,
            _ => {
                return Err(Error::UnsupportedOpcode {
                    opcode: operation.opcode(),
                })
            }
        };

        match operation.values().next().transpose()? {
            Some(FormValue::SecOffset(offset)) => Ok(MacroImport {
                offset,
                supplementary,
            }),
            _ => Err(malformed_error!(
                "Missing import offset at {:#x}",
                operation.offset()
            )),
        }
    }

    pub(crate) fn signature_for(&self, opcode: u8) -> Result<FormSignature<'a>> {
        if let Some(signature) = standard_signature(opcode) {
            return Ok(*signature);
        }

        if self.config().vendor_opcode_dispatch {
            if let Some(row) = self.operand_table().find(opcode) {
                log::trace!(
                    "{}: dispatching opcode {:#04x} through the operands table, {} forms",
                    self.section().name(),
                    opcode,
                    row.form_count()
                );
                return Ok(*row);
            }
        }

        Err(Error::UnsupportedOpcode { opcode })
    }

    fn summarize(&self, op_count: usize, end: Option<usize>) -> Result<OpsSummary> {
        let Some(end) = end else {
            return Err(Error::TruncatedStream {
                offset: self.ops_offset(),
            });
        };

        let ops_length = end - self.ops_offset();
        let summary = OpsSummary {
            op_count,
            ops_length,
            total_length: self.header().header_length() + ops_length,
        };

        log::debug!(
            "{}: unit at {:#x} has {} operations in {} bytes",
            self.section().name(),
            self.offset(),
            summary.op_count,
            summary.ops_length
        );

        Ok(summary)
    }

    /// Section offsets of every operation, built on first use by the per-operation accessors.
    fn op_offsets(&self) -> Result<&[usize]> {
        if let Some(offsets) = self.op_offsets.get() {
            return Ok(offsets);
        }

        let mut offsets = Vec::new();
        if let Some(summary) = self.summary.get() {
            offsets.try_reserve_exact(summary.op_count)?;
        }

        let mut end = None;
        for operation in self.operations() {
            let operation = operation?;
            if offsets.len() == offsets.capacity() {
                offsets.try_reserve(1)?;
            }
            offsets.push(operation.offset());
            if operation.is_terminator() {
                end = Some(operation.offset() + operation.length());
            }
        }

        if self.summary.get().is_none() {
            let summary = self.summarize(offsets.len(), end)?;
            self.summary.get_or_init(|| summary);
        }

        Ok(self.op_offsets.get_or_init(|| offsets))
    }
}
