//! Runtime ABI surface consumed by E# generated code.
//!
//! This crate does not implement a linkable native runtime (that is out of
//! scope per `spec.md §1`); it models the same contract (`es_malloc`,
//! `es_free`, `Console__*`, `array_size`/`array_get`) as a small in-process
//! heap and console sink, so the reference EBC interpreter in
//! `escc::backend::vm` has something to call.

pub mod console;
pub mod error;
pub mod memory;

pub use console::ConsoleSink;
pub use error::RuntimeError;
pub use memory::{Heap, Ptr};
