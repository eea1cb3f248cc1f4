//! `EO_OBJ` backend (`spec.md §4.8`): lowers a [`crate::ir::Module`] straight
//! to a relocatable x86-64 object (`EOWriter`'s text/rodata/symtab/reltab
//! sections) instead of EBC bytecode.

mod emit;
mod writer;

pub use emit::{emit_module, is_runtime_helper};
pub use writer::{EOWriter, RelocKind, Section, Symbol, SymbolBind, SymbolType};
