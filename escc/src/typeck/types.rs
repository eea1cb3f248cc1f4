//! The type checker's `Type` lattice and class member model
//! (`spec.md §3`, "Type (type checker)" / "Class layout").

use std::rc::Rc;

use super::scope::Scope;

/// Integer kinds. E# exposes eleven; the split mirrors the original
/// `EsTokenType` integer tokens in
/// `original_source/ESC/src/compiler/frontend/parser/ast.h`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntKind {
    Int8,
    Int16,
    Int32,
    Int64,
    Int128,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    UInt128,
    USize,
}

impl IntKind {
    /// Bit width, used by assignability's narrowing check.
    pub fn bits(self) -> u32 {
        match self {
            IntKind::Int8 | IntKind::UInt8 => 8,
            IntKind::Int16 | IntKind::UInt16 => 16,
            IntKind::Int32 | IntKind::UInt32 => 32,
            IntKind::Int64 | IntKind::UInt64 | IntKind::USize => 64,
            IntKind::Int128 | IntKind::UInt128 => 128,
        }
    }
}

/// A resolved E# type.
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Void,
    Int(IntKind),
    Float32,
    Float64,
    Bool,
    String,
    Pointer(Box<Type>),
    Array(Box<Type>, usize),
    Function {
        return_type: Box<Type>,
        params: Vec<Type>,
    },
    Class {
        name: String,
        info: Rc<ClassInfo>,
    },
    /// A type the checker could not resolve; propagates as broadly
    /// compatible and is treated as integer during lowering (`spec.md §7`).
    Unknown,
}

// Convenience integer constructors used throughout the checker and tests.
#[allow(non_upper_case_globals)]
impl Type {
    pub const Int8: Type = Type::Int(IntKind::Int8);
    pub const Int16: Type = Type::Int(IntKind::Int16);
    pub const Int32: Type = Type::Int(IntKind::Int32);
    pub const Int64: Type = Type::Int(IntKind::Int64);
    pub const UInt8: Type = Type::Int(IntKind::UInt8);
    pub const UInt16: Type = Type::Int(IntKind::UInt16);
    pub const UInt32: Type = Type::Int(IntKind::UInt32);
    pub const UInt64: Type = Type::Int(IntKind::UInt64);
}

impl Type {
    /// Whether this type is some integer kind.
    pub fn is_integer(&self) -> bool {
        matches!(self, Type::Int(_))
    }

    /// Whether this type is any numeric kind (integer or float).
    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Int(_) | Type::Float32 | Type::Float64)
    }

    /// Type compatibility (`spec.md §4.4`): the looser of the two relations
    /// used for e.g. binary operands. Compatibility is symmetric.
    pub fn compatible(&self, other: &Type) -> bool {
        use Type::*;
        match (self, other) {
            (Unknown, _) | (_, Unknown) => true,
            (a, b) if a.is_numeric() && b.is_numeric() => true,
            (Pointer(a), Pointer(b)) => a.compatible(b),
            (Pointer(a), Void) | (Void, Pointer(a)) => {
                let _ = a;
                true
            }
            (String, Array(elem, _)) | (Array(elem, _), String) => {
                matches!(**elem, Int(IntKind::Int8))
            }
            (Pointer(inner), Class { .. }) | (Class { .. }, Pointer(inner)) => {
                matches!(**inner, Class { .. }) || inner.compatible(other)
            }
            (Class { name: a, .. }, Class { name: b, .. }) => a == b,
            (a, b) => a == b,
        }
    }

    /// Assignability (`spec.md §4.4`): stricter than [`Type::compatible`]
    /// for numerics — narrowing float→int is rejected, widening and
    /// same-width conversions are allowed.
    pub fn assignable_from(&self, value: &Type) -> bool {
        match (self, value) {
            (Type::Unknown, _) | (_, Type::Unknown) => true,
            (Type::Int(to), Type::Int(from)) => to.bits() >= from.bits(),
            (Type::Float64, Type::Float32) | (Type::Float32, Type::Float64) => true,
            (a, b) if a.is_numeric() && b.is_numeric() => {
                // float -> int narrowing rejected; int -> float always widens fine.
                !(a.is_integer() && matches!(b, Type::Float32 | Type::Float64))
            }
            (Type::Pointer(inner), Type::Class { .. }) if matches!(**inner, Type::Class { .. }) => {
                inner.compatible(value)
            }
            _ => self.compatible(value),
        }
    }
}

/// Visibility modifier on a class member (`spec.md §4.4`, "public" default).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    Private,
    Protected,
}

/// What kind of class member a [`Member`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Field,
    Method,
    Ctor,
    Dtor,
    Property,
}

/// A single class member: field, method, constructor, destructor or
/// property. All four share a `(name, access, is_static, type)` header per
/// the tagged-record design in `spec.md §9`.
#[derive(Debug, Clone)]
pub struct Member {
    pub name: String,
    pub kind: MemberKind,
    pub access: Access,
    pub is_static: bool,
    pub ty: Type,
}

/// Per-class member table and lookup scope.
#[derive(Debug)]
pub struct ClassInfo {
    pub name: String,
    pub members: Vec<Member>,
    /// Member name -> member scope, retained independently of the textual
    /// class body so method bodies can resolve sibling members regardless
    /// of declaration order (`spec.md §4.4` declarations-then-bodies pass).
    pub member_scope: Rc<Scope>,
}

impl ClassInfo {
    pub fn find_member(&self, name: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.name == name)
    }

    /// Ordered field members only, used by class-layout registration
    /// (`spec.md §3`, "Class layout").
    pub fn fields(&self) -> impl Iterator<Item = &Member> {
        self.members
            .iter()
            .filter(|m| m.kind == MemberKind::Field && !m.is_static)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_types_are_mutually_compatible() {
        assert!(Type::Int32.compatible(&Type::Float64));
        assert!(Type::Int8.compatible(&Type::Int64));
    }

    #[test]
    fn string_and_int8_array_are_compatible() {
        let arr = Type::Array(Box::new(Type::Int8), 4);
        assert!(Type::String.compatible(&arr));
    }

    #[test]
    fn narrowing_float_to_int_is_not_assignable() {
        assert!(!Type::Int32.assignable_from(&Type::Float64));
        assert!(Type::Float64.assignable_from(&Type::Int32));
    }

    #[test]
    fn widening_int_is_assignable() {
        assert!(Type::Int64.assignable_from(&Type::Int32));
        assert!(!Type::Int32.assignable_from(&Type::Int64));
    }
}
