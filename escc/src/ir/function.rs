//! IR function container (`spec.md §4.2`/§4.3, "forward declaration").

use crate::arena::{Handle, ParamTable, Slab};
use crate::typeck::Type;

use super::block::BasicBlock;

/// Sentinel used for `param_count` on a forward-declared function whose
/// signature has been registered but whose body has not yet been lowered
/// (`spec.md §4.3`, "forward declaration via a negative parameter count").
pub const FORWARD_DECLARED: i32 = -1;

/// A lowered function: its blocks, parameter table and bookkeeping flags.
#[derive(Debug)]
pub struct Function {
    pub name: String,
    pub params: ParamTable,
    pub return_type: Type,
    pub blocks: Slab<BasicBlock>,
    pub entry: Option<Handle<BasicBlock>>,
    /// `-1` while only the signature is known; the real count once the body
    /// is lowered.
    pub param_count: i32,
    /// Set when the body contains any `Call` instruction; the VM backend
    /// uses this to decide whether the function needs a call frame at all
    /// (`spec.md §6`).
    pub has_calls: bool,
    /// Local + temp slot count, computed once lowering finishes.
    pub stack_size: i32,
    pub next_temp: i32,
}

impl Function {
    pub fn new(name: impl Into<String>, return_type: Type) -> Self {
        Self {
            name: name.into(),
            params: ParamTable::new(4),
            return_type,
            blocks: Slab::new(),
            entry: None,
            param_count: FORWARD_DECLARED,
            has_calls: false,
            stack_size: 0,
            next_temp: 0,
        }
    }

    pub fn is_forward_declared(&self) -> bool {
        self.param_count == FORWARD_DECLARED
    }

    pub fn fresh_temp(&mut self) -> i32 {
        let t = self.next_temp;
        self.next_temp += 1;
        t
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_function_is_forward_declared_until_lowered() {
        let f = Function::new("add", Type::Int32);
        assert!(f.is_forward_declared());
    }

    #[test]
    fn fresh_temp_counts_up() {
        let mut f = Function::new("add", Type::Int32);
        assert_eq!(f.fresh_temp(), 0);
        assert_eq!(f.fresh_temp(), 1);
    }
}
