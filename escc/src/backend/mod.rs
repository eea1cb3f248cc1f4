//! Code-generation backends (`spec.md §4.7`/§4.8/§6). One [`crate::ir::Module`]
//! in, one of several output shapes out: VM bytecode for the ambient
//! reference interpreter, a relocatable object for `EO_OBJ`, or NASM text
//! for `X86_ASM`. `IR_TEXT` lives in [`crate::ir::text`] since it has no
//! machinery of its own beyond formatting.

pub mod asm;
pub mod eo;
pub mod vm;
