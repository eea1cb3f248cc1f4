//! CFG simplification (`spec.md §4.6`): once constant folding has reduced a
//! `Branch`'s condition to a literal, collapse it into an unconditional
//! `Jump` and drop the edge to the branch not taken.
//!
//! `Slab` has no combined `(handle, &mut item)` iterator, so block handles
//! are collected up front and each block is revisited by handle — first
//! read-only to decide whether it simplifies, then mutably to rewrite the
//! instruction and fix up `preds`/`succs` on both sides of the dropped edge.

use crate::ir::{Function, Opcode, Value};

use super::OptPass;

#[derive(Debug, Default)]
pub struct CfgSimplify;

impl CfgSimplify {
    pub fn new() -> Self {
        Self
    }
}

impl OptPass for CfgSimplify {
    fn name(&self) -> &str {
        "cfg_simplify"
    }

    fn run(&mut self, function: &mut Function) -> bool {
        let handles: Vec<_> = function.blocks.handles().collect();
        let mut changed = false;

        for handle in handles {
            let decision = {
                let block = function.blocks.get(handle);
                block.instructions.iter().position(|inst| inst.opcode == Opcode::Branch).and_then(|pos| {
                    let inst = &block.instructions[pos];
                    inst.left.as_immediate().map(|cond| {
                        let keep = if cond != 0.0 { inst.target } else { inst.alt_target };
                        let drop = if cond != 0.0 { inst.alt_target } else { inst.target };
                        (pos, keep, drop)
                    })
                })
            };

            let Some((pos, Some(keep), Some(drop))) = decision else {
                continue;
            };

            {
                let block = function.blocks.get_mut(handle);
                let inst = &mut block.instructions[pos];
                inst.opcode = Opcode::Jump;
                inst.left = Value::Void;
                inst.target = Some(keep);
                inst.alt_target = None;
                block.succs.retain(|&s| s != drop);
            }
            function.blocks.get_mut(drop).preds.retain(|&p| p != handle);
            changed = true;
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
    fn literal_condition_branch_becomes_a_jump() {
        let mut b = IrBuilder::new();
        b.function_create("f", Type::Int(IntKind::Int32));
        let entry = b.block_create();
        let then_block = b.block_create();
        let else_block = b.block_create();
        b.block_set_current(entry);
        b.branch(Value::Immediate(1.0), then_block, else_block, 1);

        b.block_set_current(then_block);
        b.return_(b.imm(1.0), 2);

        b.block_set_current(else_block);
        b.return_(b.imm(0.0), 3);

        let mut module = b.module;
        let mut pass = CfgSimplify::new();
        let f = &mut module.functions[0];
        assert!(pass.run(f));

        let entry_block = f.blocks.get(entry);
        let inst = &entry_block.instructions[0];
        assert_eq!(inst.opcode, Opcode::Jump);
        assert_eq!(inst.target, Some(then_block));
        assert!(!entry_block.succs.contains(&else_block));
        assert!(!f.blocks.get(else_block).preds.contains(&entry));
    }
}
