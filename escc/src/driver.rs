//! Pipeline glue (`spec.md §6`): wires typeck → lower → optimize → backend
//! into one call. Not a CLI — front-end (lexer/parser) stays out of scope,
//! so the entry point here takes an already-built [`crate::ast::Program`].

use crate::ast::Program;
use crate::backend::{asm, eo, vm};
use crate::config::{CompileConfig, OutputBackend};
use crate::diagnostics::Diagnostics;
use crate::ir::{self, Module};
use crate::lower;
use crate::optimize::{self, OptimizerStats};
use crate::typeck::TypeChecker;

/// What a successful compile produced, beyond the bytes/text written to
/// `config.resolved_output_path()`.
pub struct CompileOutput {
    pub module: Module,
    pub optimizer_stats: Option<OptimizerStats>,
    pub rendered: RenderedOutput,
}

/// The backend-specific artifact. Callers that only want the IR (e.g. to
/// run it through [`crate::backend::vm::interpret`] directly) can match on
/// this instead of re-deriving the backend from `config`.
pub enum RenderedOutput {
    Text(String),
    VmChunk(vm::EsChunk),
    EoObject(eo::EOWriter),
}

#[derive(Debug)]
pub enum CompileError {
    /// Type checking failed; the collected diagnostics explain why.
    TypeCheck(Diagnostics),
    /// `config.backend` named a backend with no implementation (`Wasm`).
    UnimplementedBackend(OutputBackend),
}

impl std::fmt::Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompileError::TypeCheck(diags) => {
                write!(f, "type checking failed with {} error(s)", diags.error_count())
            }
            CompileError::UnimplementedBackend(b) => write!(f, "backend {b:?} is not implemented"),
        }
    }
}

impl std::error::Error for CompileError {}

/// Run the full pipeline over an already-parsed program: type check, lower
/// to IR, optionally optimize, then emit with the configured backend.
pub fn compile_module(program: &Program, config: &CompileConfig) -> Result<CompileOutput, CompileError> {
    let checked = TypeChecker::new().check_program(program);
    if !checked.success() {
        return Err(CompileError::TypeCheck(checked.diagnostics));
    }

    let mut module = lower::lower_program(&checked);

    let optimizer_stats = if config.optimize {
        Some(optimize::run_fixed_point(&mut module))
    } else {
        None
    };

    let rendered = render(&module, config)?;

    Ok(CompileOutput { module, optimizer_stats, rendered })
}

fn render(module: &Module, config: &CompileConfig) -> Result<RenderedOutput, CompileError> {
    match config.backend {
        OutputBackend::IrText => Ok(RenderedOutput::Text(ir::text::print_module(module))),
        OutputBackend::X86Asm => Ok(RenderedOutput::Text(asm::emit_module(module))),
        OutputBackend::VmBytecode => {
            let (chunk, _link_table) = vm::emit_module(module);
            Ok(RenderedOutput::VmChunk(chunk))
        }
        OutputBackend::EoObj => {
            let (writer, _entry) = eo::emit_module(module);
            Ok(RenderedOutput::EoObject(writer))
        }
        OutputBackend::Wasm => Err(CompileError::UnimplementedBackend(OutputBackend::Wasm)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Program;

    #[test]
    fn ir_text_backend_renders_empty_program() {
        let program = Program::default();
        let config = CompileConfig::new(OutputBackend::IrText, "out.txt");
        let result = compile_module(&program, &config).expect("compile should succeed");
        match result.rendered {
            RenderedOutput::Text(text) => assert!(text.contains("main")),
            _ => panic!("expected text output"),
        }
    }

    #[test]
    fn wasm_backend_is_rejected() {
        let program = Program::default();
        let config = CompileConfig::new(OutputBackend::Wasm, "out.wasm");
        let err = compile_module(&program, &config).unwrap_err();
        assert!(matches!(err, CompileError::UnimplementedBackend(OutputBackend::Wasm)));
    }
}
