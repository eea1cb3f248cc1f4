//! `VM_BYTECODE` backend (`spec.md §4.7`): lowers a [`crate::ir::Module`] to
//! an [`EsChunk`] of EBC bytecode, plus the ambient reference interpreter
//! used by end-to-end tests.

mod chunk;
mod emit;
mod interp;

pub use chunk::{EsChunk, EsOpCode, EsValue};
pub use emit::{emit_module, is_native, FunctionMeta, LinkTable};
pub use interp::{interpret, InterpretOutcome};
