//! Textual IR printer for the `ir-text` backend target (`spec.md §6`).
//!
//! Produces a readable, parse-stable dump: one line per instruction inside
//! `function NAME(params) -> ret { ... }` blocks, `L<n>:` block labels.

use std::fmt::Write as _;

use super::function::Function;
use super::inst::{Instruction, Opcode};
use super::module::Module;
use super::value::Value;

pub fn print_module(module: &Module) -> String {
    let mut out = String::new();
    for f in &module.functions {
        print_function(&mut out, module, f);
    }
    out
}

fn print_function(out: &mut String, module: &Module, f: &Function) {
    let _ = writeln!(out, "function {}() {{", f.name);
    for handle in f.blocks.handles() {
        let _ = writeln!(out, "L{}:", handle.index());
        let block = f.blocks.get(handle);
        for inst in &block.instructions {
            let _ = writeln!(out, "    {}", format_inst(module, inst));
        }
    }
    let _ = writeln!(out, "}}");
}

fn format_value(module: &Module, v: &Value) -> String {
    match v {
        Value::Void => "void".to_string(),
        Value::Immediate(n) => format!("{n}"),
        Value::Named(name) => name.clone(),
        Value::Temp(t) => format!("%t{t}"),
        Value::Arg(i) => format!("%arg{i}"),
        Value::StringConst(i) => match module.strings.get(*i) {
            Some(s) => format!("{s:?}"),
            None => format!("str#{i}"),
        },
        Value::Function(name) => format!("@{name}"),
    }
}

fn opcode_mnemonic(op: Opcode) -> &'static str {
    match op {
        Opcode::Add => "add",
        Opcode::Sub => "sub",
        Opcode::Mul => "mul",
        Opcode::Div => "div",
        Opcode::Mod => "mod",
        Opcode::Pow => "pow",
        Opcode::Neg => "neg",
        Opcode::BitAnd => "band",
        Opcode::BitOr => "bor",
        Opcode::BitXor => "bxor",
        Opcode::Shl => "shl",
        Opcode::Shr => "shr",
        Opcode::BitNot => "bnot",
        Opcode::And => "and",
        Opcode::Or => "or",
        Opcode::Not => "not",
        Opcode::Lt => "lt",
        Opcode::Gt => "gt",
        Opcode::Le => "le",
        Opcode::Ge => "ge",
        Opcode::Eq => "eq",
        Opcode::Ne => "ne",
        Opcode::StrCat => "strcat",
        Opcode::IntToString => "itoa",
        Opcode::DoubleToString => "dtoa",
        Opcode::Load => "load",
        Opcode::Store => "store",
        Opcode::ArrayLoad => "aload",
        Opcode::ArrayStore => "astore",
        Opcode::LoadPtr => "loadptr",
        Opcode::StorePtr => "storeptr",
        Opcode::Call => "call",
        Opcode::Return => "ret",
        Opcode::Branch => "branch",
        Opcode::Jump => "jump",
        Opcode::Copy => "copy",
        Opcode::Nop => "nop",
    }
}

fn format_inst(module: &Module, inst: &Instruction) -> String {
    let mnemonic = opcode_mnemonic(inst.opcode);
    match inst.opcode {
        Opcode::Jump => format!("{mnemonic} L{}", inst.target.unwrap().index()),
        Opcode::Branch => format!(
            "{mnemonic} {}, L{}, L{}",
            format_value(module, &inst.left),
            inst.target.unwrap().index(),
            inst.alt_target.unwrap().index()
        ),
        Opcode::Return => format!("{mnemonic} {}", format_value(module, &inst.left)),
        Opcode::Call => {
            let args: Vec<String> = inst.extra.iter().map(|a| format_value(module, a)).collect();
            format!(
                "{} = {mnemonic} {}({})",
                format_value(module, &inst.result),
                format_value(module, &inst.left),
                args.join(", ")
            )
        }
        Opcode::Store => format!(
            "{mnemonic} {}, {}",
            format_value(module, &inst.left),
            format_value(module, &inst.right)
        ),
        Opcode::ArrayStore | Opcode::StorePtr => format!(
            "{mnemonic} {}, {}, {}",
            format_value(module, &inst.left),
            format_value(module, &inst.right),
            format_value(module, &inst.extra[0])
        ),
        Opcode::Nop => mnemonic.to_string(),
        Opcode::Neg | Opcode::BitNot | Opcode::Not | Opcode::Load | Opcode::IntToString | Opcode::DoubleToString | Opcode::Copy => {
            format!(
                "{} = {mnemonic} {}",
                format_value(module, &inst.result),
                format_value(module, &inst.left)
            )
        }
        _ => format!(
            "{} = {mnemonic} {}, {}",
            format_value(module, &inst.result),
            format_value(module, &inst.left),
            format_value(module, &inst.right)
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::builder::IrBuilder;
    use crate::typeck::Type;

    #[test]
    fn prints_a_trivial_function() {
        let mut b = IrBuilder::new();
        b.function_create("main", Type::Void);
        let entry = b.block_create();
        b.block_set_current(entry);
        let sum = b.add(b.imm(2.0), b.imm(3.0), 1);
        b.return_(sum, 1);
        let text = print_module(&b.module);
        assert!(text.contains("function main()"));
        assert!(text.contains("add"));
        assert!(text.contains("ret"));
    }
}
