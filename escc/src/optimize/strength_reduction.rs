//! Strength reduction (`spec.md §4.6`): rewrite arithmetic identities into
//! cheaper equivalents — `x*0 -> 0`, `x*1 -> x`, `x*2 -> x+x`, `x/1 -> x`,
//! `x^0 -> 1`, `x^1 -> x`, `x^2 -> x*x`.
//!
//! `x*2 -> x+x` and `x^2 -> x*x` still compute from two operands, so they
//! rewrite to `Add`/`Mul`. Every other case collapses to a single operand
//! (`x` unchanged, or a bare constant) and rewrites to `Opcode::Copy`, which
//! still produces the original `result` temp — that matters because a later
//! block may read that exact temp (`spec.md §4.6`'s per-block tracking can't
//! see that far ahead; see `copy_prop`).

use crate::ir::{Function, Opcode, Value};

use super::OptPass;

#[derive(Debug, Default)]
pub struct StrengthReduction;

impl StrengthReduction {
    pub fn new() -> Self {
        Self
    }
}

impl OptPass for StrengthReduction {
    fn name(&self) -> &str {
        "strength_reduction"
    }

    fn run(&mut self, function: &mut Function) -> bool {
        let mut changed = false;
        for block in function.blocks.iter_mut() {
            for inst in block.instructions.iter_mut() {
                let rewrite = match inst.opcode {
                    Opcode::Mul => match (inst.left.as_immediate(), inst.right.as_immediate()) {
                        (_, Some(r)) if r == 0.0 => Some((Opcode::Copy, Value::Immediate(0.0), Value::Void)),
                        (_, Some(r)) if r == 1.0 => Some((Opcode::Copy, inst.left.clone(), Value::Void)),
                        (_, Some(r)) if r == 2.0 => Some((Opcode::Add, inst.left.clone(), inst.left.clone())),
                        (Some(l), _) if l == 0.0 => Some((Opcode::Copy, Value::Immediate(0.0), Value::Void)),
                        (Some(l), _) if l == 1.0 => Some((Opcode::Copy, inst.right.clone(), Value::Void)),
                        (Some(l), _) if l == 2.0 => Some((Opcode::Add, inst.right.clone(), inst.right.clone())),
                        _ => None,
                    },
                    Opcode::Div => match inst.right.as_immediate() {
                        Some(r) if r == 1.0 => Some((Opcode::Copy, inst.left.clone(), Value::Void)),
                        _ => None,
                    },
                    Opcode::Pow => match inst.right.as_immediate() {
                        Some(r) if r == 0.0 => Some((Opcode::Copy, Value::Immediate(1.0), Value::Void)),
                        Some(r) if r == 1.0 => Some((Opcode::Copy, inst.left.clone(), Value::Void)),
                        Some(r) if r == 2.0 => Some((Opcode::Mul, inst.left.clone(), inst.left.clone())),
                        _ => None,
                    },
                    _ => None,
                };

                if let Some((op, l, r)) = rewrite {
                    if inst.opcode != op || inst.left != l || inst.right != r {
                        inst.opcode = op;
                        inst.left = l;
                        inst.right = r;
                        changed = true;
                    }
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
    fn multiply_by_two_becomes_self_addition() {
        let mut b = IrBuilder::new();
        b.function_create("f", Type::Int(IntKind::Int32));
        let entry = b.block_create();
        b.block_set_current(entry);
        let x = b.load("x", 1);
        let doubled = b.mul(x.clone(), b.imm(2.0), 1);
        b.return_(doubled, 1);
        let mut module = b.module;

        let mut pass = StrengthReduction::new();
        let f = &mut module.functions[0];
        assert!(pass.run(f));
        let block = f.blocks.get(entry);
        let ret = &block.instructions[block.instructions.len() - 1];
        assert_eq!(ret.left, x);
        // opcode must have become Add, not stayed Mul, to avoid re-squaring x.
        let producer = block
            .instructions
            .iter()
            .find(|i| i.result == doubled)
            .unwrap();
        assert_eq!(producer.opcode, Opcode::Add);
    }

    #[test]
    fn power_of_two_becomes_self_multiplication() {
        let mut b = IrBuilder::new();
        b.function_create("f", Type::Int(IntKind::Int32));
        let entry = b.block_create();
        b.block_set_current(entry);
        let x = b.load("x", 1);
        let squared = b.pow(x.clone(), b.imm(2.0), 1);
        b.return_(squared, 1);
        let mut module = b.module;

        let mut pass = StrengthReduction::new();
        let f = &mut module.functions[0];
        assert!(pass.run(f));
        let block = f.blocks.get(entry);
        let producer = block
            .instructions
            .iter()
            .find(|i| i.result == squared)
            .unwrap();
        assert_eq!(producer.opcode, Opcode::Mul);
        assert_eq!(producer.left, x);
        assert_eq!(producer.right, x);
    }

    #[test]
    fn multiply_by_one_becomes_a_copy() {
        let mut b = IrBuilder::new();
        b.function_create("f", Type::Int(IntKind::Int32));
        let entry = b.block_create();
        b.block_set_current(entry);
        let x = b.load("x", 1);
        let same = b.mul(x.clone(), b.imm(1.0), 1);
        b.return_(same, 1);
        let mut module = b.module;

        let mut pass = StrengthReduction::new();
        let f = &mut module.functions[0];
        assert!(pass.run(f));
        let block = f.blocks.get(entry);
        let producer = block
            .instructions
            .iter()
            .find(|i| i.result == same)
            .unwrap();
        assert_eq!(producer.opcode, Opcode::Copy);
        assert_eq!(producer.left, x);
        assert_eq!(producer.right, Value::Void);
    }
}
