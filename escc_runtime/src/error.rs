//! Runtime error types for E# generated code.
//!
//! Mirrors the failure modes the ArkLink C runtime reports at the ABI
//! boundary, surfaced here so the reference EBC interpreter can report the
//! same conditions a native `.eo` binary would hit at runtime.

use thiserror::Error;

/// Runtime error produced while executing generated code (or the reference
/// EBC interpreter standing in for it).
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Division or modulo by zero reached at runtime. Lowering only folds
    /// constant divisions; a dynamic zero divisor is a runtime error.
    #[error("DivideError: division by zero")]
    DivisionByZero,

    /// Index out of bounds on an array access.
    #[error("BoundsError: attempt to access index {index} of array with length {length}")]
    BoundsError {
        /// Attempted index.
        index: i64,
        /// Array length.
        length: i64,
    },

    /// Allocation failure under the `Abort` policy, or after `es_malloc`
    /// legitimately returns null and the caller dereferences it.
    #[error("OutOfMemoryError: allocation failed")]
    OutOfMemory,

    /// `call` to a function with no matching slot/definition at runtime.
    #[error("CallError: {0}")]
    CallError(String),

    /// A value produced by `throw` propagated out of the program.
    #[error("Uncaught exception: {0}")]
    Uncaught(String),

    /// Generic error with a custom message, for interpreter bookkeeping.
    #[error("{0}")]
    Custom(String),
}
