//! Common subexpression elimination (`spec.md §4.6`).
//!
//! Grounded in the teacher crate's `AotCSE`: rather than keying a cache by
//! `(Opcode, Value, Value)` — `Value` carries an `f64` and deliberately
//! doesn't derive `Eq`/`Hash` — expressions are canonicalized into a
//! `Debug`-formatted string, the same trick `expr_canonical_form` uses.
//!
//! Only pure instructions are cached (`Opcode::is_pure`), and the cache is
//! scoped to the whole function rather than reset per block (`spec.md
//! §4.6`: "per function (not strictly per block)") — `Value::Temp`/`Named`
//! results stay live across block boundaries in this IR (no SSA phi nodes),
//! so a prior block's result is as valid a substitution as one from the
//! same block. A repeat computation is rewritten to `Opcode::Copy` of
//! `prior_result` instead of deleted, for the same cross-block-temp-liveness
//! reason `strength_reduction` keeps its rewrites result-preserving.
//!
//! Each block's own peephole window (`BasicBlock::recent_indices`, `spec.md
//! §3`) is checked first by direct comparison; the function-wide hashmap
//! above only runs when nothing in that window matches, so the common case
//! of a redundant expression a few instructions back never pays for the
//! `Debug`-formatted key.

use std::collections::HashMap;

use crate::ir::{Function, Opcode, Value};

use super::OptPass;

const CACHE_CAP: usize = 256;

#[derive(Debug, Default)]
pub struct CommonSubexpressionElimination {
    cache: HashMap<String, Value>,
}

impl CommonSubexpressionElimination {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(opcode: Opcode, left: &Value, right: &Value) -> String {
        format!("{:?}|{:?}|{:?}", opcode, left, right)
    }
}

impl OptPass for CommonSubexpressionElimination {
    fn name(&self) -> &str {
        "common_subexpression_elimination"
    }

    fn run(&mut self, function: &mut Function) -> bool {
        let mut changed = false;
        self.cache.clear();
        for block in function.blocks.iter_mut() {
            // Snapshot the block's peephole window (`spec.md §3`'s "small
            // inline cache...for peephole lookup") before mutating in
            // place, so a duplicate among the last few instructions is
            // caught by direct comparison instead of the function-wide
            // hashmap lookup below.
            let window: Vec<(usize, Opcode, Value, Value, Value)> = block
                .recent_indices()
                .iter()
                .map(|&i| {
                    let inst = &block.instructions[i];
                    (i, inst.opcode, inst.left.clone(), inst.right.clone(), inst.result.clone())
                })
                .collect();

            for (idx, inst) in block.instructions.iter_mut().enumerate() {
                if !inst.opcode.is_pure() || inst.result.is_void() {
                    continue;
                }

                let local_hit = window.iter().find_map(|(w_idx, op, l, r, result)| {
                    (*w_idx < idx && *op == inst.opcode && *l == inst.left && *r == inst.right)
                        .then(|| result.clone())
                });

                if let Some(prior) = local_hit {
                    if inst.opcode != Opcode::Copy || inst.left != prior || inst.right != Value::Void {
                        inst.opcode = Opcode::Copy;
                        inst.left = prior;
                        inst.right = Value::Void;
                        changed = true;
                    }
                    continue;
                }

                let key = Self::key(inst.opcode, &inst.left, &inst.right);
                if let Some(prior) = self.cache.get(&key).cloned() {
                    if inst.opcode != Opcode::Copy || inst.left != prior || inst.right != Value::Void {
                        inst.opcode = Opcode::Copy;
                        inst.left = prior;
                        inst.right = Value::Void;
                        changed = true;
                    }
                    continue;
                }

                if self.cache.len() < CACHE_CAP {
                    self.cache.insert(key, inst.result.clone());
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
    fn repeated_pure_binop_reuses_first_result() {
        let mut b = IrBuilder::new();
        b.function_create("f", Type::Int(IntKind::Int32));
        let entry = b.block_create();
        b.block_set_current(entry);
        let x = b.load("x", 1);
        let y = b.load("y", 1);
        let first = b.add(x.clone(), y.clone(), 1);
        let second = b.add(x.clone(), y.clone(), 2);
        let sum = b.add(first.clone(), second, 2);
        b.return_(sum, 2);
        let mut module = b.module;

        let mut pass = CommonSubexpressionElimination::new();
        let f = &mut module.functions[0];
        assert!(pass.run(f));
        let block = f.blocks.get(entry);
        let second_producer_pos = block
            .instructions
            .iter()
            .position(|i| i.left == x && i.right == y && i.result != first)
            .map(|idx| &block.instructions[idx]);
        assert!(second_producer_pos.is_none(), "duplicate add(x, y) should have been rewritten");
    }

    #[test]
    fn repeated_binop_across_a_block_boundary_is_still_reused() {
        let mut b = IrBuilder::new();
        b.function_create("f", Type::Int(IntKind::Int32));
        let first_block = b.block_create();
        let second_block = b.block_create();
        b.block_set_current(first_block);
        let x = b.load("x", 1);
        let y = b.load("y", 1);
        let first = b.add(x.clone(), y.clone(), 1);
        b.jump(second_block, 1);
        b.block_set_current(second_block);
        let second = b.add(x.clone(), y.clone(), 2);
        b.return_(second, 2);
        let mut module = b.module;

        let mut pass = CommonSubexpressionElimination::new();
        let f = &mut module.functions[0];
        assert!(pass.run(f));
        let second_block_insts = &f.blocks.get(second_block).instructions;
        assert!(
            second_block_insts
                .iter()
                .any(|i| i.opcode == Opcode::Copy && i.left == first && i.right == Value::Void),
            "second block's duplicate add(x, y) should reuse the first block's result"
        );
    }

    #[test]
    fn side_effecting_instructions_are_never_cached() {
        let mut b = IrBuilder::new();
        b.function_create("f", Type::Int(IntKind::Int32));
        let entry = b.block_create();
        b.block_set_current(entry);
        b.call("es_print", vec![b.imm(1.0)], 1);
        b.call("es_print", vec![b.imm(1.0)], 2);
        b.return_(Value::Immediate(0.0), 2);
        let mut module = b.module;

        let mut pass = CommonSubexpressionElimination::new();
        let f = &mut module.functions[0];
        assert!(!pass.run(f));
        let block = f.blocks.get(entry);
        assert_eq!(
            block.instructions.iter().filter(|i| i.opcode == Opcode::Call).count(),
            2
        );
    }
}
