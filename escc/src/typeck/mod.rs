//! Type checker: two-pass semantic analysis over [`crate::ast`] producing a
//! [`checker::CheckedProgram`] that [`crate::lower`] consumes (`spec.md §4`).

mod checker;
mod console;
mod scope;
mod types;

pub use checker::{CheckedProgram, FunctionSig, TypeChecker};
pub use console::{console_class, resolve_console_overload};
pub use scope::{Scope, TypeCheckSymbol};
pub use types::{Access, ClassInfo, IntKind, Member, MemberKind, Type};
