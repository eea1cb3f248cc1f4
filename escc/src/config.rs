//! Compiler configuration (`spec.md §5`/§6): backend selection, optimizer
//! on/off, allocation-failure policy, and output path conventions.

use std::path::{Path, PathBuf};

/// `spec.md §6`'s backend selection enum. `Wasm` is reserved and
/// unimplemented — selecting it is a configuration error, not a panic
/// (`compile_module` returns `Err` rather than calling into a missing
/// backend).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputBackend {
    IrText,
    X86Asm,
    /// Reserved for a future WebAssembly backend; not implemented.
    Wasm,
    VmBytecode,
    EoObj,
}

impl OutputBackend {
    /// File extension `spec.md §6` assigns this backend's output, or `None`
    /// when the output path is left unchanged (`IrText`/`X86Asm`, both
    /// human-readable text).
    pub fn extension(self) -> Option<&'static str> {
        match self {
            OutputBackend::VmBytecode => Some("ebc"),
            OutputBackend::EoObj => Some("eo"),
            OutputBackend::IrText | OutputBackend::X86Asm | OutputBackend::Wasm => None,
        }
    }
}

/// `spec.md §5`/§7`'s "configurable" allocation-failure policy. Carried here
/// for config-surface completeness; Rust's own allocator already aborts the
/// process on an OOM condition the way `Abort` would, so `IrBuilder` itself
/// has nothing to branch on — see `DESIGN.md`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AllocFailurePolicy {
    #[default]
    LogAndReturnNull,
    ReturnNull,
    Abort,
}

/// Which optimizer passes run, by name, when `optimize` is enabled.
/// Defaults to every pass (`spec.md §4.6`'s fixed-point pipeline).
#[derive(Debug, Clone)]
pub struct PassAllowlist {
    pub constant_fold: bool,
    pub copy_propagation: bool,
    pub strength_reduction: bool,
    pub common_subexpression: bool,
    pub dead_code: bool,
    pub cfg_simplify: bool,
}

impl Default for PassAllowlist {
    fn default() -> Self {
        Self {
            constant_fold: true,
            copy_propagation: true,
            strength_reduction: true,
            common_subexpression: true,
            dead_code: true,
            cfg_simplify: true,
        }
    }
}

/// Top-level compiler configuration (`spec.md §6`).
#[derive(Debug, Clone)]
pub struct CompileConfig {
    pub backend: OutputBackend,
    pub optimize: bool,
    pub passes: PassAllowlist,
    pub alloc_failure_policy: AllocFailurePolicy,
    pub output_path: PathBuf,
}

impl CompileConfig {
    pub fn new(backend: OutputBackend, output_path: impl Into<PathBuf>) -> Self {
        Self {
            backend,
            optimize: true,
            passes: PassAllowlist::default(),
            alloc_failure_policy: AllocFailurePolicy::default(),
            output_path: output_path.into(),
        }
    }

    /// The path generated output should actually be written to: the
    /// configured `output_path` with its extension swapped for the backend's
    /// (`spec.md §6`: `.ebc`, `.eo`, or unchanged).
    pub fn resolved_output_path(&self) -> PathBuf {
        match self.backend.extension() {
            Some(ext) => self.output_path.with_extension(ext),
            None => self.output_path.clone(),
        }
    }
}

/// Convenience for tests/tools that only care about the extension rule
/// without building a whole `CompileConfig`.
pub fn output_path_for(backend: OutputBackend, base: &Path) -> PathBuf {
    match backend.extension() {
        Some(ext) => base.with_extension(ext),
        None => base.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vm_bytecode_gets_ebc_extension() {
        let cfg = CompileConfig::new(OutputBackend::VmBytecode, "out.bin");
        assert_eq!(cfg.resolved_output_path(), PathBuf::from("out.ebc"));
    }

    #[test]
    fn eo_obj_gets_eo_extension() {
        let cfg = CompileConfig::new(OutputBackend::EoObj, "out.bin");
        assert_eq!(cfg.resolved_output_path(), PathBuf::from("out.eo"));
    }

    #[test]
    fn ir_text_leaves_path_unchanged() {
        let cfg = CompileConfig::new(OutputBackend::IrText, "out.txt");
        assert_eq!(cfg.resolved_output_path(), PathBuf::from("out.txt"));
    }

    #[test]
    fn default_pass_allowlist_enables_everything() {
        let passes = PassAllowlist::default();
        assert!(passes.constant_fold);
        assert!(passes.dead_code);
    }
}
