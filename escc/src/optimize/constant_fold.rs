//! Constant folding and intra-block constant propagation (`spec.md §4.6`).
//!
//! Complements [`crate::lower::fold_binary`], which only folds operands that
//! are already literal at lowering time. This pass also tracks which temps
//! a block has proven constant so far and substitutes them into later
//! operands in the *same* block, letting a chain like `let x = (2+3)*4;`
//! fold across two instructions even though lowering only saw one literal
//! pair at a time. Tracking resets at the start of every block — a temp is
//! never assumed constant based on a different block's history.
//!
//! A folded instruction is rewritten to `Opcode::Copy` rather than dropped:
//! some lowered control flow (`foreach`, `switch`) reuses a temp computed in
//! one block from inside a later one, so the instruction that produces a
//! temp's value must keep producing it even after its computation turns
//! out to be constant. Dead-code elimination, which looks at the whole
//! function rather than one block, is what actually removes it once no use
//! remains anywhere.

use std::collections::HashMap;

use crate::ir::{Function, Opcode, Value};

use super::OptPass;

#[derive(Debug, Default)]
pub struct ConstantFold {
    known: HashMap<i32, f64>,
}

impl ConstantFold {
    pub fn new() -> Self {
        Self::default()
    }

    fn resolve(&self, v: &Value) -> Value {
        if let Value::Temp(n) = v {
            if let Some(&c) = self.known.get(n) {
                return Value::Immediate(c);
            }
        }
        v.clone()
    }

    fn fold_binary(op: Opcode, l: f64, r: f64) -> Option<f64> {
        match op {
            Opcode::Add => Some(l + r),
            Opcode::Sub => Some(l - r),
            Opcode::Mul => Some(l * r),
            Opcode::Div if r != 0.0 => Some(l / r),
            Opcode::Mod if r != 0.0 => Some(l % r),
            Opcode::Div | Opcode::Mod => None,
            Opcode::Pow => Some(l.powf(r)),
            Opcode::Lt => Some(((l < r) as i32) as f64),
            Opcode::Gt => Some(((l > r) as i32) as f64),
            Opcode::Le => Some(((l <= r) as i32) as f64),
            Opcode::Ge => Some(((l >= r) as i32) as f64),
            Opcode::Eq => Some(((l == r) as i32) as f64),
            Opcode::Ne => Some(((l != r) as i32) as f64),
            Opcode::And => Some((((l != 0.0) && (r != 0.0)) as i32) as f64),
            Opcode::Or => Some((((l != 0.0) || (r != 0.0)) as i32) as f64),
            Opcode::BitAnd => Some(((l as i64) & (r as i64)) as f64),
            Opcode::BitOr => Some(((l as i64) | (r as i64)) as f64),
            Opcode::BitXor => Some(((l as i64) ^ (r as i64)) as f64),
            Opcode::Shl => Some(((l as i64) << (r as i64)) as f64),
            Opcode::Shr => Some(((l as i64) >> (r as i64)) as f64),
            _ => None,
        }
    }

    fn fold_unary(op: Opcode, v: f64) -> Option<f64> {
        match op {
            Opcode::Neg => Some(-v),
            Opcode::Not => Some(if v == 0.0 { 1.0 } else { 0.0 }),
            Opcode::BitNot => Some(!(v as i64) as f64),
            _ => None,
        }
    }
}

impl OptPass for ConstantFold {
    fn name(&self) -> &str {
        "constant_fold"
    }

    fn run(&mut self, function: &mut Function) -> bool {
        let mut changed = false;
        for block in function.blocks.iter_mut() {
            self.known.clear();
            for inst in block.instructions.iter_mut() {
                let resolved_left = self.resolve(&inst.left);
                let resolved_right = self.resolve(&inst.right);
                if resolved_left != inst.left {
                    inst.left = resolved_left;
                    changed = true;
                }
                if resolved_right != inst.right {
                    inst.right = resolved_right;
                    changed = true;
                }

                let folded = match inst.opcode {
                    Opcode::Neg | Opcode::Not | Opcode::BitNot => inst
                        .left
                        .as_immediate()
                        .and_then(|l| Self::fold_unary(inst.opcode, l)),
                    op if op.is_pure() => {
                        match (inst.left.as_immediate(), inst.right.as_immediate()) {
                            (Some(l), Some(r)) => Self::fold_binary(op, l, r),
                            _ => None,
                        }
                    }
                    _ => None,
                };

                if let Some(value) = folded {
                    if let Value::Temp(n) = inst.result {
                        self.known.insert(n, value);
                    }
                    inst.opcode = Opcode::Copy;
                    inst.left = Value::Immediate(value);
                    inst.right = Value::Void;
                    changed = true;
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
    fn literal_binary_op_folds_to_immediate() {
        let mut b = IrBuilder::new();
        b.function_create("f", Type::Int(IntKind::Int32));
        let entry = b.block_create();
        b.block_set_current(entry);
        let mul = b.mul(b.imm(3.0), b.imm(4.0), 1);
        b.return_(mul, 1);
        let mut module = b.module;

        let mut pass = ConstantFold::new();
        let f = &mut module.functions[0];
        assert!(pass.run(f));
        let block = f.blocks.get(entry);
        let ret = &block.instructions[block.instructions.len() - 1];
        assert_eq!(ret.left, Value::Immediate(12.0));
    }

    #[test]
    fn chained_fold_propagates_within_block() {
        let mut b = IrBuilder::new();
        b.function_create("f", Type::Int(IntKind::Int32));
        let entry = b.block_create();
        b.block_set_current(entry);
        let sum = b.add(b.imm(2.0), b.imm(3.0), 1);
        let product = b.mul(sum, b.imm(4.0), 1);
        b.return_(product, 1);
        let mut module = b.module;

        let mut pass = ConstantFold::new();
        let f = &mut module.functions[0];
        // First run folds `2+3`, second run propagates it into the multiply.
        pass.run(f);
        pass.run(f);
        let block = f.blocks.get(entry);
        let ret = &block.instructions[block.instructions.len() - 1];
        assert_eq!(ret.left, Value::Immediate(20.0));
    }
}
