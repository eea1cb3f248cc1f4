//! The builtin `Console` class (`spec.md §4.4`).
//!
//! `Console.Write`/`Console.WriteLine` are overloaded for `String` and
//! `Int32` arguments; dispatch at a call site prefers the `*Int` variant
//! when the single argument is integral.

use std::rc::Rc;

use super::scope::Scope;
use super::types::{Access, ClassInfo, Member, MemberKind, Type};

/// Build the pre-registered `Console` class, installed into the global
/// scope before any user declarations are checked.
pub fn console_class() -> Rc<ClassInfo> {
    let member_scope = Scope::root();
    let make = |name: &str, param: Type| Member {
        name: name.to_string(),
        kind: MemberKind::Method,
        access: Access::Public,
        is_static: true,
        ty: Type::Function {
            return_type: Box::new(Type::Void),
            params: vec![param],
        },
    };
    Rc::new(ClassInfo {
        name: "Console".to_string(),
        members: vec![
            make("Write", Type::String),
            make("Write", Type::Int32),
            make("WriteLine", Type::String),
            make("WriteLine", Type::Int32),
        ],
        member_scope: Rc::new(member_scope),
    })
}

/// Resolve which `Console` overload a call with a single argument of
/// `arg_ty` should dispatch to. Returns `None` if no overload matches.
pub fn resolve_console_overload<'a>(
    class: &'a ClassInfo,
    method: &str,
    arg_ty: &Type,
) -> Option<&'a Member> {
    let candidates: Vec<&Member> = class
        .members
        .iter()
        .filter(|m| m.name == method && m.kind == MemberKind::Method)
        .collect();
    if arg_ty.is_integer() {
        if let Some(m) = candidates.iter().find(|m| {
            matches!(&m.ty, Type::Function { params, .. } if params.first() == Some(&Type::Int32))
        }) {
            return Some(m);
        }
    }
    candidates
        .into_iter()
        .find(|m| matches!(&m.ty, Type::Function { params, .. } if params.first().map(|p| p.compatible(arg_ty)).unwrap_or(false)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_argument_prefers_int_overload() {
        let console = console_class();
        let m = resolve_console_overload(&console, "WriteLine", &Type::Int32).unwrap();
        assert_eq!(m.ty, Type::Function {
            return_type: Box::new(Type::Void),
            params: vec![Type::Int32],
        });
    }

    #[test]
    fn string_argument_resolves_string_overload() {
        let console = console_class();
        let m = resolve_console_overload(&console, "WriteLine", &Type::String).unwrap();
        assert_eq!(
            m.ty,
            Type::Function {
                return_type: Box::new(Type::Void),
                params: vec![Type::String],
            }
        );
    }
}
