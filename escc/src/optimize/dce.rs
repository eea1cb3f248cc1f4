//! Dead-code elimination (`spec.md §4.6`).
//!
//! Unlike the other passes in this module, used-temp tracking spans the
//! whole function rather than resetting per block: a temp computed before
//! `foreach`/`switch` lowering splits into multiple blocks is read from one
//! of those later blocks, so only a whole-function view can tell a dead
//! pure instruction from one whose only use is further down the CFG.
//!
//! A pure instruction (`Opcode::is_pure`) is dropped when its result temp is
//! never read anywhere in the function. Anything with a side effect
//! (`Store`, `Call`, `Return`, branches, ...) is always kept. `Opcode::Nop`
//! is dropped unconditionally — no current pass emits one, but a block may
//! carry one left behind by a future pass that doesn't want to renumber a
//! block in place.

use std::collections::HashSet;

use crate::ir::{Function, Opcode, Value};

use super::OptPass;

#[derive(Debug, Default)]
pub struct DeadCodeElimination;

impl DeadCodeElimination {
    pub fn new() -> Self {
        Self
    }

    fn collect_used_temps(function: &Function) -> HashSet<i32> {
        let mut used = HashSet::new();
        for block in function.blocks.iter() {
            for inst in &block.instructions {
                for v in [&inst.left, &inst.right] {
                    if let Value::Temp(n) = v {
                        used.insert(*n);
                    }
                }
                for v in &inst.extra {
                    if let Value::Temp(n) = v {
                        used.insert(*n);
                    }
                }
            }
        }
        used
    }
}

impl OptPass for DeadCodeElimination {
    fn name(&self) -> &str {
        "dead_code_elimination"
    }

    fn run(&mut self, function: &mut Function) -> bool {
        let used = Self::collect_used_temps(function);
        let mut changed = false;

        for block in function.blocks.iter_mut() {
            let before = block.instructions.len();
            block.instructions.retain(|inst| {
                if inst.opcode == Opcode::Nop {
                    return false;
                }
                if inst.opcode.is_pure() {
                    if let Value::Temp(n) = inst.result {
                        return used.contains(&n);
                    }
                }
                true
            });
            if block.instructions.len() != before {
                changed = true;
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
    fn unused_pure_instruction_is_removed() {
        let mut b = IrBuilder::new();
        b.function_create("f", Type::Int(IntKind::Int32));
        let entry = b.block_create();
        b.block_set_current(entry);
        let _unused = b.add(b.imm(1.0), b.imm(2.0), 1);
        b.return_(b.imm(0.0), 2);
        let mut module = b.module;

        let mut pass = DeadCodeElimination::new();
        let f = &mut module.functions[0];
        assert!(pass.run(f));
        let block = f.blocks.get(entry);
        assert!(!block.instructions.iter().any(|i| i.opcode == Opcode::Add));
    }

    #[test]
    fn call_and_store_survive_even_if_result_unused() {
        let mut b = IrBuilder::new();
        b.function_create("f", Type::Int(IntKind::Int32));
        let entry = b.block_create();
        b.block_set_current(entry);
        b.store("x", b.imm(1.0), 1);
        b.call("es_print", vec![b.imm(1.0)], 2);
        b.return_(b.imm(0.0), 3);
        let mut module = b.module;

        let mut pass = DeadCodeElimination::new();
        let f = &mut module.functions[0];
        pass.run(f);
        let block = f.blocks.get(entry);
        assert!(block.instructions.iter().any(|i| i.opcode == Opcode::Store));
        assert!(block.instructions.iter().any(|i| i.opcode == Opcode::Call));
    }
}
