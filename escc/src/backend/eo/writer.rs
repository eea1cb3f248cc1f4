//! `EOWriter`: the raw section/symbol/relocation table the `EO_OBJ` backend
//! writes into (`spec.md §4.8`/§6, "EO object format").
//!
//! Grounded in `ESC/src/tools/eo_writer.h`'s contract (referenced, not
//! present in full, by `eo_codegen.c`): a writer owns the text and rodata
//! byte buffers plus growable symbol/relocation tables, and callers never
//! touch the file layout directly — they call `write_code`/`add_rodata_
//! string`/`add_reloc` and the writer answers with offsets and indices.

use std::io::{self, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Text,
    Rodata,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolType {
    Func,
    Object,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolBind {
    Local,
    Global,
}

#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub sym_type: SymbolType,
    pub bind: SymbolBind,
    pub section: Section,
    pub value_offset: u32,
    /// `true` until a `define_*` call gives this symbol an address — an
    /// external call creates an undefined symbol on first reference
    /// (`spec.md §4.8`).
    pub defined: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelocKind {
    Abs64,
    Pc32,
}

#[derive(Debug, Clone, Copy)]
pub struct Relocation {
    pub section: Section,
    pub offset: u32,
    pub symbol_index: u32,
    pub kind: RelocKind,
    pub addend: i16,
}

const MAGIC: u32 = 0x454F_4246; // "EOBF"
const VERSION: u16 = 1;

/// Accumulates the text/rodata byte buffers and the symbol/relocation
/// tables for one compiled module, then serializes them per `spec.md §6`'s
/// "fixed header + section table + code + rodata + symbol table +
/// relocation table" layout. The exact byte format beyond that sentence is
/// implementation-defined; this one only needs to be self-consistent with
/// its own reader.
#[derive(Debug, Default)]
pub struct EOWriter {
    text: Vec<u8>,
    rodata: Vec<u8>,
    symbols: Vec<Symbol>,
    symbol_index: std::collections::HashMap<String, u32>,
    relocations: Vec<Relocation>,
    entry_offset: u32,
}

impl EOWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn code_offset(&self) -> u32 {
        self.text.len() as u32
    }

    pub fn write_code(&mut self, bytes: &[u8]) {
        self.text.extend_from_slice(bytes);
    }

    pub fn set_entry(&mut self, offset: u32) {
        self.entry_offset = offset;
    }

    /// Define a global function symbol at the current (or given) text
    /// offset, returning its symbol index for use in relocations.
    pub fn define_function_symbol(&mut self, name: &str, offset: u32) -> u32 {
        if let Some(&idx) = self.symbol_index.get(name) {
            let sym = &mut self.symbols[idx as usize];
            sym.value_offset = offset;
            sym.section = Section::Text;
            sym.defined = true;
            return idx;
        }
        let idx = self.symbols.len() as u32;
        self.symbols.push(Symbol {
            name: name.to_string(),
            sym_type: SymbolType::Func,
            bind: SymbolBind::Global,
            section: Section::Text,
            value_offset: offset,
            defined: true,
        });
        self.symbol_index.insert(name.to_string(), idx);
        idx
    }

    /// Resolve `name` to a symbol index, creating an undefined `Func`
    /// symbol on first reference (an external/native call, or a forward
    /// reference to a function not yet emitted).
    pub fn reference_symbol(&mut self, name: &str) -> u32 {
        if let Some(&idx) = self.symbol_index.get(name) {
            return idx;
        }
        let idx = self.symbols.len() as u32;
        self.symbols.push(Symbol {
            name: name.to_string(),
            sym_type: SymbolType::Func,
            bind: SymbolBind::Global,
            section: Section::Text,
            value_offset: 0,
            defined: false,
        });
        self.symbol_index.insert(name.to_string(), idx);
        idx
    }

    /// Append a string constant to `.rodata`, null-terminated, and define a
    /// local `Object` symbol `str_const_<id>` at its offset.
    pub fn add_rodata_string(&mut self, id: u32, value: &str) -> u32 {
        let offset = self.rodata.len() as u32;
        self.rodata.extend_from_slice(value.as_bytes());
        self.rodata.push(0);
        let idx = self.symbols.len() as u32;
        self.symbols.push(Symbol {
            name: format!("str_const_{id}"),
            sym_type: SymbolType::Object,
            bind: SymbolBind::Local,
            section: Section::Rodata,
            value_offset: offset,
            defined: true,
        });
        self.symbol_index.insert(format!("str_const_{id}"), idx);
        offset
    }

    pub fn add_reloc(&mut self, section: Section, offset: u32, symbol_index: u32, kind: RelocKind, addend: i16) {
        self.relocations.push(Relocation { section, offset, symbol_index, kind, addend });
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn relocations(&self) -> &[Relocation] {
        &self.relocations
    }

    pub fn text(&self) -> &[u8] {
        &self.text
    }

    pub fn rodata(&self) -> &[u8] {
        &self.rodata
    }

    /// Serialize the whole object: header, section table (offsets/lengths
    /// of text and rodata), code bytes, rodata bytes, symbol table,
    /// relocation table.
    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        out.write_all(&MAGIC.to_le_bytes())?;
        out.write_all(&VERSION.to_le_bytes())?;
        out.write_all(&self.entry_offset.to_le_bytes())?;

        out.write_all(&(self.text.len() as u32).to_le_bytes())?;
        out.write_all(&(self.rodata.len() as u32).to_le_bytes())?;

        out.write_all(&self.text)?;
        out.write_all(&self.rodata)?;

        out.write_all(&(self.symbols.len() as u32).to_le_bytes())?;
        for sym in &self.symbols {
            let name_bytes = sym.name.as_bytes();
            out.write_all(&(name_bytes.len() as u16).to_le_bytes())?;
            out.write_all(name_bytes)?;
            out.write_all(&[sym.sym_type as u8, sym.bind as u8, sym.section as u8, sym.defined as u8])?;
            out.write_all(&sym.value_offset.to_le_bytes())?;
        }

        out.write_all(&(self.relocations.len() as u32).to_le_bytes())?;
        for reloc in &self.relocations {
            out.write_all(&[reloc.section as u8, reloc.kind as u8])?;
            out.write_all(&reloc.offset.to_le_bytes())?;
            out.write_all(&reloc.symbol_index.to_le_bytes())?;
            out.write_all(&reloc.addend.to_le_bytes())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rodata_string_defines_a_local_object_symbol() {
        let mut w = EOWriter::new();
        let offset = w.add_rodata_string(0, "hi");
        assert_eq!(offset, 0);
        let sym = w.symbols().iter().find(|s| s.name == "str_const_0").unwrap();
        assert_eq!(sym.sym_type, SymbolType::Object);
        assert_eq!(sym.bind, SymbolBind::Local);
    }

    #[test]
    fn reference_symbol_is_idempotent_and_undefined_until_defined() {
        let mut w = EOWriter::new();
        let a = w.reference_symbol("es_malloc");
        let b = w.reference_symbol("es_malloc");
        assert_eq!(a, b);
        assert!(!w.symbols()[a as usize].defined);

        let c = w.define_function_symbol("main", 0);
        let d = w.reference_symbol("main");
        assert_eq!(c, d);
        assert!(w.symbols()[c as usize].defined);
    }

    #[test]
    fn object_round_trips_through_bytes() {
        let mut w = EOWriter::new();
        w.write_code(&[0x90, 0x90]);
        w.add_rodata_string(0, "x");
        let target = w.reference_symbol("es_malloc");
        w.add_reloc(Section::Text, 0, target, RelocKind::Pc32, -4);
        w.set_entry(0);

        let mut bytes = Vec::new();
        w.write_to(&mut bytes).unwrap();
        assert!(bytes.len() > 16);
    }
}
