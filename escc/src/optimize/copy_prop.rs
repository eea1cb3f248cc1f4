//! Copy propagation (`spec.md §4.6`): when a `Load` reads a name that was
//! `Store`d earlier in the same block, later operands referencing the
//! load's result temp are replaced with the stored value directly.
//!
//! The `Load` instruction itself is never rewritten or removed here — a
//! temp it produces may still be read from a later block (`foreach` and
//! `switch` lowering both carry a temp computed before their block split
//! into the blocks that use it), and per-block tracking has no way to know
//! that from here. Whether the `Load` is still needed after substitution is
//! exactly what whole-function dead-code elimination answers safely.

use std::collections::HashMap;

use crate::ir::{Function, Opcode, Value};

use super::OptPass;

#[derive(Debug, Default)]
pub struct CopyPropagation {
    stored: HashMap<String, Value>,
    substitutions: HashMap<i32, Value>,
}

impl CopyPropagation {
    pub fn new() -> Self {
        Self::default()
    }

    fn resolve(&self, v: &Value) -> Value {
        if let Value::Temp(n) = v {
            if let Some(sub) = self.substitutions.get(n) {
                return sub.clone();
            }
        }
        v.clone()
    }
}

impl OptPass for CopyPropagation {
    fn name(&self) -> &str {
        "copy_propagation"
    }

    fn run(&mut self, function: &mut Function) -> bool {
        let mut changed = false;
        for block in function.blocks.iter_mut() {
            self.stored.clear();
            self.substitutions.clear();

            for inst in block.instructions.iter_mut() {
                let resolved_left = self.resolve(&inst.left);
                if resolved_left != inst.left {
                    inst.left = resolved_left;
                    changed = true;
                }
                let resolved_right = self.resolve(&inst.right);
                if resolved_right != inst.right {
                    inst.right = resolved_right;
                    changed = true;
                }
                for extra in inst.extra.iter_mut() {
                    let resolved = self.resolve(extra);
                    if resolved != *extra {
                        *extra = resolved;
                        changed = true;
                    }
                }

                match inst.opcode {
                    Opcode::Store => {
                        if let Value::Named(name) = &inst.left {
                            self.stored.insert(name.clone(), inst.right.clone());
                        }
                    }
                    Opcode::Load => {
                        if let Value::Named(name) = &inst.left {
                            if let Some(value) = self.stored.get(name).cloned() {
                                if let Value::Temp(n) = inst.result {
                                    self.substitutions.insert(n, value);
                                }
                            }
                        }
                    }
                    _ => {}
                }
            }
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::IrBuilder;
    use crate::typeck::{IntKind, Type};

    #[test]
    fn store_then_load_forwards_the_stored_value() {
        let mut b = IrBuilder::new();
        b.function_create("f", Type::Int(IntKind::Int32));
        let entry = b.block_create();
        b.block_set_current(entry);
        b.store("x", b.imm(7.0), 1);
        let loaded = b.load("x", 2);
        let plus_one = b.add(loaded, b.imm(1.0), 2);
        b.return_(plus_one, 2);
        let mut module = b.module;

        let mut pass = CopyPropagation::new();
        let f = &mut module.functions[0];
        assert!(pass.run(f));
        let block = f.blocks.get(entry);
        let ret = &block.instructions[block.instructions.len() - 1];
        assert_eq!(ret.left, Value::Immediate(7.0));

        // The `Load` itself is left alone: dead-code elimination decides.
        assert!(block.instructions.iter().any(|i| i.opcode == Opcode::Load));
    }
}
