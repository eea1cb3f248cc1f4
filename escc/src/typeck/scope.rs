//! Symbol scope chain (`spec.md §3`, "Symbol scope (type checker)").
//!
//! A singly-linked chain of name→symbol maps, child to parent. Scopes are
//! reference-counted (`Rc<Scope>`, interior-mutable via `RefCell`) rather
//! than owned by their enclosing block, because a function's parameter
//! scope must outlive its textual body: return-type inference re-checks
//! the body speculatively after the block has otherwise gone out of scope
//! (`spec.md §4.4`, §9 "Symbol scopes with shared lifetime").

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use super::types::Type;

/// A single resolved name in scope.
#[derive(Debug, Clone)]
pub struct TypeCheckSymbol {
    pub name: String,
    pub ty: Type,
    /// Whether this scope node owns `name`'s storage (vs. borrowing it from
    /// an enclosing declaration). Mirrors the original's `owns_name` flag
    /// used to encode ownership-transfer rules on the general heap.
    pub owns_name: bool,
}

#[derive(Debug)]
struct ScopeData {
    symbols: RefCell<HashMap<String, TypeCheckSymbol>>,
    parent: Option<Rc<Scope>>,
}

/// A scope node. Clone is cheap (`Rc` bump); scopes form a child→parent
/// chain via [`Scope::child`].
#[derive(Debug, Clone)]
pub struct Scope(Rc<ScopeData>);

impl Scope {
    /// Create a new root scope (the global scope has no parent).
    pub fn root() -> Scope {
        Scope(Rc::new(ScopeData {
            symbols: RefCell::new(HashMap::new()),
            parent: None,
        }))
    }

    /// Create a child scope whose lookups fall back to `self` on miss.
    /// `Scope` is itself a cheap `Rc` handle, so this only needs `&self`.
    pub fn child(&self) -> Scope {
        Scope(Rc::new(ScopeData {
            symbols: RefCell::new(HashMap::new()),
            parent: Some(Rc::new(self.clone())),
        }))
    }

    /// Declare `name` with `ty` in this scope, shadowing any same-named
    /// binding in an enclosing scope.
    pub fn declare(&self, name: impl Into<String>, ty: Type) {
        let name = name.into();
        self.0.symbols.borrow_mut().insert(
            name.clone(),
            TypeCheckSymbol {
                name,
                ty,
                owns_name: true,
            },
        );
    }

    /// Look up `name`, walking up the parent chain on miss.
    pub fn lookup(&self, name: &str) -> Option<TypeCheckSymbol> {
        if let Some(sym) = self.0.symbols.borrow().get(name) {
            return Some(sym.clone());
        }
        self.0.parent.as_ref().and_then(|p| p.lookup(name))
    }

    /// Look up `name` in this scope only, without consulting parents.
    pub fn lookup_local(&self, name: &str) -> Option<TypeCheckSymbol> {
        self.0.symbols.borrow().get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_scope_falls_back_to_parent() {
        let root = Rc::new(Scope::root());
        root.declare("x", Type::Int32);
        let child = root.child();
        assert_eq!(child.lookup("x").unwrap().ty, Type::Int32);
    }

    #[test]
    fn child_scope_shadows_parent() {
        let root = Rc::new(Scope::root());
        root.declare("x", Type::Int32);
        let child = root.child();
        child.declare("x", Type::Float64);
        assert_eq!(child.lookup("x").unwrap().ty, Type::Float64);
        assert_eq!(root.lookup("x").unwrap().ty, Type::Int32);
    }

    #[test]
    fn scope_survives_after_parent_dropped() {
        let retained;
        {
            let root = Rc::new(Scope::root());
            let child = root.child();
            child.declare("y", Type::Bool);
            retained = child;
        }
        assert_eq!(retained.lookup("y").unwrap().ty, Type::Bool);
    }

    #[test]
    fn lookup_local_does_not_see_parent() {
        let root = Rc::new(Scope::root());
        root.declare("x", Type::Int32);
        let child = root.child();
        assert!(child.lookup_local("x").is_none());
        assert!(child.lookup("x").is_some());
    }
}
