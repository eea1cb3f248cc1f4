//! IR → EBC linearization (`spec.md §4.7`).
//!
//! Every function's blocks are flattened into one shared [`EsChunk`] code
//! array back to back, in the order they appear in the module, with `main`
//! emitted last so its entry offset is easy to find in tests. Jump targets
//! are block-relative at IR level; emission backpatches them into absolute
//! `u32` code offsets once a function's blocks have all been placed (no
//! relative addressing, unlike a typical `JUMP`/`LOOP` split — this emitter
//! uses `LOOP` only as a readability marker for back edges, both opcodes
//! taking the same absolute-offset operand).
//!
//! The class/heap object model, array indexing, string concatenation, and
//! the non-core arithmetic ops (`Mod`/`Pow`/bitwise/logical) have no
//! counterpart in `spec.md §4.7`'s listed opcode set, which is grounded in a
//! bare numeric stack VM. Those `ir::Opcode` variants are lowered directly
//! via `self.builder.{array_load,array_store,strcat,...}` rather than a
//! named runtime call (confirmed by reading `lower::expr`/`lower::stmt`), so
//! this emitter extends `EsOpCode` with matching direct opcodes instead of
//! inventing synthetic runtime call names for them — see `DESIGN.md`.
//!
//! What genuinely does cross the runtime ABI as a named `CALL` are
//! `es_malloc`, `es_free`, `es_panic`, `es_array_size`,
//! `es_console_write_line`, and `es_console_write` — the exact strings
//! `lower::stmt`/`lower::expr` pass to `IrBuilder::call`.

use std::collections::HashMap;

use crate::ir::{Function, Module, Opcode, Value};

use super::chunk::{EsChunk, EsOpCode, EsValue};

/// Linkage metadata produced alongside the [`EsChunk`]: where each function
/// starts, how many argument/local slots it needs, and which names are
/// resolved to `escc_runtime` builtins rather than module-defined code.
/// Not part of the serialized EBC file — the same split the EO backend
/// makes between raw bytes and its symbol table.
#[derive(Debug, Clone)]
pub struct FunctionMeta {
    pub name: String,
    pub offset: u32,
    pub param_count: u16,
    pub frame_size: u16,
}

#[derive(Debug, Clone, Default)]
pub struct LinkTable {
    pub functions: HashMap<String, FunctionMeta>,
    pub entry: Option<u32>,
}

/// The runtime ABI functions actually named by `lower::stmt`/`lower::expr`'s
/// `IrBuilder::call` sites — everything else the IR needs (array access,
/// string concat, pointer loads, non-core arithmetic) is a direct opcode,
/// not a call.
const NATIVE_NAMES: &[&str] = &[
    "es_malloc",
    "es_free",
    "es_panic",
    "es_array_size",
    "es_console_write_line",
    "es_console_write",
];

pub fn is_native(name: &str) -> bool {
    NATIVE_NAMES.contains(&name)
}

/// Assign every distinct `Named` value a stack slot, in first-appearance
/// order (`spec.md §4.7`: "parameters occupy slots `0..param_count`; locals
/// appear in declaration order thereafter"). Parameters are stored into
/// their name by the first instructions `lower_function` emits, so a plain
/// first-appearance scan already yields that layout without needing the
/// original parameter list.
fn assign_local_slots(function: &Function) -> HashMap<String, u16> {
    let mut slots = HashMap::new();
    let mut next = 0u16;
    let mut record = |name: &str, slots: &mut HashMap<String, u16>| {
        if !slots.contains_key(name) {
            slots.insert(name.to_string(), next);
            next += 1;
        }
    };
    for block in function.blocks.iter() {
        for inst in &block.instructions {
            if let Value::Named(n) = &inst.left {
                record(n, &mut slots);
            }
            if let Value::Named(n) = &inst.right {
                record(n, &mut slots);
            }
            for v in &inst.extra {
                if let Value::Named(n) = v {
                    record(n, &mut slots);
                }
            }
        }
    }
    slots
}

/// `spec.md §4.7`: temps live at `1000 + temp_index` within the frame.
const TEMP_BASE: u16 = 1000;

struct FunctionEmitter<'a> {
    function: &'a Function,
    slots: HashMap<String, u16>,
}

impl<'a> FunctionEmitter<'a> {
    fn slot_of(&self, value: &Value) -> Option<u16> {
        match value {
            Value::Named(n) => self.slots.get(n).copied(),
            Value::Temp(t) => Some(TEMP_BASE + *t as u16),
            Value::Arg(i) => Some(*i as u16),
            _ => None,
        }
    }

    /// Push `value` onto the operand stack.
    fn emit_push(&self, chunk: &mut EsChunk, value: &Value, line: i32) {
        match value {
            Value::Immediate(n) => {
                let idx = chunk.add_constant(EsValue::Number(*n));
                chunk.write_op(EsOpCode::Constant, line);
                chunk.write_byte((idx & 0xff) as u8, line);
                chunk.write_byte(((idx >> 8) & 0xff) as u8, line);
            }
            Value::StringConst(idx) => {
                // string pool index is reused directly as a constant-pool
                // index once the constant has been materialized by the
                // module-level emit pass (see `emit_module`).
                chunk.write_op(EsOpCode::Constant, line);
                chunk.write_byte((*idx & 0xff) as u8, line);
                chunk.write_byte(((*idx >> 8) & 0xff) as u8, line);
            }
            Value::Void => {
                chunk.write_op(EsOpCode::Null, line);
            }
            _ => {
                let slot = self.slot_of(value).unwrap_or(0);
                chunk.write_op(EsOpCode::GetLocal, line);
                chunk.write_byte((slot & 0xff) as u8, line);
                chunk.write_byte(((slot >> 8) & 0xff) as u8, line);
            }
        }
    }

    fn emit_store_result(&self, chunk: &mut EsChunk, result: &Value, line: i32) {
        if result.is_void() {
            chunk.write_op(EsOpCode::Pop, line);
            return;
        }
        let slot = self.slot_of(result).unwrap_or(0);
        chunk.write_op(EsOpCode::SetLocal, line);
        chunk.write_byte((slot & 0xff) as u8, line);
        chunk.write_byte(((slot >> 8) & 0xff) as u8, line);
        chunk.write_op(EsOpCode::Pop, line);
    }

    fn binary_opcode(op: Opcode) -> Option<EsOpCode> {
        match op {
            Opcode::Add => Some(EsOpCode::Add),
            Opcode::Sub => Some(EsOpCode::Sub),
            Opcode::Mul => Some(EsOpCode::Mul),
            Opcode::Div => Some(EsOpCode::Div),
            Opcode::Eq => Some(EsOpCode::Equal),
            Opcode::Gt => Some(EsOpCode::Greater),
            Opcode::Lt => Some(EsOpCode::Less),
            Opcode::StrCat => Some(EsOpCode::StrCat),
            Opcode::Mod => Some(EsOpCode::Mod),
            Opcode::Pow => Some(EsOpCode::Pow),
            Opcode::BitAnd => Some(EsOpCode::BitAnd),
            Opcode::BitOr => Some(EsOpCode::BitOr),
            Opcode::BitXor => Some(EsOpCode::BitXor),
            Opcode::Shl => Some(EsOpCode::Shl),
            Opcode::Shr => Some(EsOpCode::Shr),
            Opcode::And => Some(EsOpCode::LogAnd),
            Opcode::Or => Some(EsOpCode::LogOr),
            _ => None,
        }
    }
}

/// Emit every function in `module` into one combined chunk, returning the
/// chunk plus linkage metadata. `HALT` is appended once, after every
/// function's code.
pub fn emit_module(module: &Module) -> (EsChunk, LinkTable) {
    let mut chunk = EsChunk::new();
    let mut link = LinkTable::default();

    // Materialize the module's interned strings as chunk constants 1:1, so
    // a `Value::StringConst(i)` can push `CONSTANT i` directly.
    for s in module.strings.iter() {
        chunk.add_constant(EsValue::StringLiteral(s.to_string()));
    }

    // Emit in declaration order, but place `main` last so tests can find it
    // without scanning past every helper function first.
    let mut order: Vec<usize> = (0..module.functions.len()).collect();
    if let Some(main_idx) = module.main_function {
        order.retain(|&i| i != main_idx);
        order.push(main_idx);
    }

    // Calls are patched once, after every function has a known offset — a
    // function may call one emitted later in `order` (e.g. two helpers
    // calling each other), so this can't resolve inline the way native
    // calls do.
    let mut call_patches: Vec<(usize, String)> = Vec::new();

    for idx in order {
        let function = &module.functions[idx];
        let slots = assign_local_slots(function);
        let local_count = slots.len() as u16;
        let frame_size = local_count.max(TEMP_BASE + function.next_temp as u16);

        let offset = chunk.code.len() as u32;
        link.functions.insert(
            function.name.clone(),
            FunctionMeta {
                name: function.name.clone(),
                offset,
                param_count: function.param_count.max(0) as u16,
                frame_size,
            },
        );
        if Some(idx) == module.main_function {
            link.entry = Some(offset);
        }

        chunk.write_op(EsOpCode::StkAdj, 0);
        chunk.write_byte((frame_size & 0xff) as u8, 0);
        chunk.write_byte(((frame_size >> 8) & 0xff) as u8, 0);

        let emitter = FunctionEmitter { function, slots };
        emit_function_body(&emitter, function, &mut chunk, &mut call_patches);
    }

    chunk.write_op(EsOpCode::Halt, 0);

    for (patch_pos, name) in call_patches {
        let target = if let Some(meta) = link.functions.get(&name) {
            meta.offset
        } else if let Some(slot) = NATIVE_NAMES.iter().position(|n| *n == name) {
            0x8000_0000 | slot as u32
        } else {
            0
        };
        write_u32_at(&mut chunk.code, patch_pos, target);
    }

    (chunk, link)
}

fn write_u32_at(code: &mut [u8], pos: usize, value: u32) {
    code[pos] = (value & 0xff) as u8;
    code[pos + 1] = ((value >> 8) & 0xff) as u8;
    code[pos + 2] = ((value >> 16) & 0xff) as u8;
    code[pos + 3] = ((value >> 24) & 0xff) as u8;
}

fn emit_function_body(
    emitter: &FunctionEmitter<'_>,
    function: &Function,
    chunk: &mut EsChunk,
    call_patches: &mut Vec<(usize, String)>,
) {
    let mut block_offsets = HashMap::new();
    let mut pending_patches = Vec::new(); // (patch_pos, target_block)

    let handles: Vec<_> = function.blocks.handles().collect();
    for handle in &handles {
        block_offsets.insert(*handle, chunk.code.len() as u32);
        let block = function.blocks.get(*handle);
        for inst in &block.instructions {
            let line = inst.line as i32;
            match inst.opcode {
                Opcode::Store => {
                    emitter.emit_push(chunk, &inst.right, line);
                    emitter.emit_store_result(chunk, &inst.left, line);
                }
                Opcode::Load | Opcode::Copy => {
                    emitter.emit_push(chunk, &inst.left, line);
                    emitter.emit_store_result(chunk, &inst.result, line);
                }
                Opcode::Neg => {
                    emitter.emit_push(chunk, &inst.left, line);
                    chunk.write_op(EsOpCode::Negate, line);
                    emitter.emit_store_result(chunk, &inst.result, line);
                }
                Opcode::Not => {
                    emitter.emit_push(chunk, &inst.left, line);
                    chunk.write_op(EsOpCode::Not, line);
                    emitter.emit_store_result(chunk, &inst.result, line);
                }
                Opcode::IntToString => {
                    emitter.emit_push(chunk, &inst.left, line);
                    chunk.write_op(EsOpCode::IntToString, line);
                    emitter.emit_store_result(chunk, &inst.result, line);
                }
                Opcode::DoubleToString => {
                    emitter.emit_push(chunk, &inst.left, line);
                    chunk.write_op(EsOpCode::DoubleToString, line);
                    emitter.emit_store_result(chunk, &inst.result, line);
                }
                Opcode::LoadPtr => {
                    emitter.emit_push(chunk, &inst.left, line);
                    emitter.emit_push(chunk, &inst.right, line);
                    chunk.write_op(EsOpCode::LoadPtr, line);
                    emitter.emit_store_result(chunk, &inst.result, line);
                }
                Opcode::StorePtr => {
                    emitter.emit_push(chunk, &inst.left, line);
                    emitter.emit_push(chunk, &inst.right, line);
                    emitter.emit_push(chunk, &inst.extra[0], line);
                    chunk.write_op(EsOpCode::StorePtr, line);
                }
                Opcode::ArrayLoad => {
                    emitter.emit_push(chunk, &inst.left, line);
                    emitter.emit_push(chunk, &inst.right, line);
                    chunk.write_op(EsOpCode::ArrayLoad, line);
                    emitter.emit_store_result(chunk, &inst.result, line);
                }
                Opcode::ArrayStore => {
                    emitter.emit_push(chunk, &inst.left, line);
                    emitter.emit_push(chunk, &inst.right, line);
                    emitter.emit_push(chunk, &inst.extra[0], line);
                    chunk.write_op(EsOpCode::ArrayStore, line);
                }
                Opcode::BitNot => {
                    emitter.emit_push(chunk, &inst.left, line);
                    chunk.write_op(EsOpCode::BitNot, line);
                    emitter.emit_store_result(chunk, &inst.result, line);
                }
                Opcode::Call => {
                    for arg in inst.extra.iter().rev() {
                        emitter.emit_push(chunk, arg, line);
                    }
                    let name = match &inst.left {
                        Value::Function(n) => n.clone(),
                        _ => String::new(),
                    };
                    chunk.write_op(EsOpCode::Call, line);
                    chunk.write_byte(inst.extra.len() as u8, line);
                    call_patches.push((chunk.code.len(), name));
                    chunk.write_byte(0, line);
                    chunk.write_byte(0, line);
                    chunk.write_byte(0, line);
                    chunk.write_byte(0, line);
                    emitter.emit_store_result(chunk, &inst.result, line);
                }
                Opcode::Return => {
                    emitter.emit_push(chunk, &inst.left, line);
                    chunk.write_op(EsOpCode::Return, line);
                }
                Opcode::Jump => {
                    let is_back_edge = Some(inst.target.unwrap()) == Some(*handle);
                    chunk.write_op(if is_back_edge { EsOpCode::Loop } else { EsOpCode::Jump }, line);
                    pending_patches.push((chunk.code.len(), inst.target.unwrap()));
                    chunk.write_byte(0, line);
                    chunk.write_byte(0, line);
                    chunk.write_byte(0, line);
                    chunk.write_byte(0, line);
                }
                Opcode::Branch => {
                    emitter.emit_push(chunk, &inst.left, line);
                    chunk.write_op(EsOpCode::JumpIfFalse, line);
                    pending_patches.push((chunk.code.len(), inst.alt_target.unwrap()));
                    chunk.write_byte(0, line);
                    chunk.write_byte(0, line);
                    chunk.write_byte(0, line);
                    chunk.write_byte(0, line);
                    chunk.write_op(EsOpCode::Jump, line);
                    pending_patches.push((chunk.code.len(), inst.target.unwrap()));
                    chunk.write_byte(0, line);
                    chunk.write_byte(0, line);
                    chunk.write_byte(0, line);
                    chunk.write_byte(0, line);
                }
                Opcode::Nop => {}
                op => {
                    if let Some(es_op) = FunctionEmitter::binary_opcode(op) {
                        emitter.emit_push(chunk, &inst.left, line);
                        emitter.emit_push(chunk, &inst.right, line);
                        chunk.write_op(es_op, line);
                        emitter.emit_store_result(chunk, &inst.result, line);
                    } else if matches!(op, Opcode::Ge | Opcode::Le | Opcode::Ne) {
                        // `a >= b` as `!(a < b)`, `a <= b` as `!(a > b)`,
                        // `a != b` as `!(a == b)` — no dedicated opcodes.
                        let (first, negate_needed) = match op {
                            Opcode::Ge => (EsOpCode::Less, true),
                            Opcode::Le => (EsOpCode::Greater, true),
                            Opcode::Ne => (EsOpCode::Equal, true),
                            _ => unreachable!(),
                        };
                        emitter.emit_push(chunk, &inst.left, line);
                        emitter.emit_push(chunk, &inst.right, line);
                        chunk.write_op(first, line);
                        if negate_needed {
                            chunk.write_op(EsOpCode::Not, line);
                        }
                        emitter.emit_store_result(chunk, &inst.result, line);
                    } else {
                        unreachable!("unhandled IR opcode in EBC emission: {op:?}");
                    }
                }
            }
        }
    }

    for (patch_pos, target) in pending_patches {
        let target_offset = *block_offsets.get(&target).unwrap_or(&0);
        chunk.code[patch_pos] = (target_offset & 0xff) as u8;
        chunk.code[patch_pos + 1] = ((target_offset >> 8) & 0xff) as u8;
        chunk.code[patch_pos + 2] = ((target_offset >> 16) & 0xff) as u8;
        chunk.code[patch_pos + 3] = ((target_offset >> 24) & 0xff) as u8;
    }
}

/// `native_name_at(slot)` recovers the builtin a `CALL` target tagged with
/// the high bit (`0x8000_0000 | slot`, see `emit_module`) resolves to — the
/// reference interpreter's other half of this table.
pub fn native_name_at(slot: u16) -> Option<&'static str> {
    NATIVE_NAMES.get(slot as usize).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::IrBuilder;
    use crate::typeck::{IntKind, Type};

    #[test]
    fn console_write_line_call_resolves_to_native_slot() {
        let mut b = IrBuilder::new();
        let idx = b.function_create("main", Type::Void);
        b.module.main_function = Some(idx);
        let entry = b.block_create();
        b.block_set_current(entry);
        let s = b.string_const("hi");
        b.call("es_console_write_line", vec![s], 1);
        b.return_(Value::Void, 1);

        let (chunk, link) = emit_module(&b.module);
        assert!(is_native("es_console_write_line"));
        assert_eq!(link.entry, Some(0));
        assert_eq!(chunk.code.last().copied(), Some(EsOpCode::Halt as u8));
        assert!(chunk.code.contains(&(EsOpCode::Call as u8)));
    }

    #[test]
    fn array_load_store_emit_direct_opcodes_not_calls() {
        let mut b = IrBuilder::new();
        let idx = b.function_create("main", Type::Void);
        b.module.main_function = Some(idx);
        let entry = b.block_create();
        b.block_set_current(entry);
        let arr = b.var("arr");
        b.array_store(arr.clone(), b.imm(0.0), b.imm(20.0), 1);
        let _loaded = b.array_load(arr, b.imm(0.0), 2);
        b.return_(Value::Void, 2);

        let (chunk, _link) = emit_module(&b.module);
        assert!(chunk.code.contains(&(EsOpCode::ArrayStore as u8)));
        assert!(chunk.code.contains(&(EsOpCode::ArrayLoad as u8)));
    }

    #[test]
    fn cross_block_temp_survives_as_local_slot() {
        // mirrors `lower_foreach`: a temp produced in one block is consumed
        // by a later one, so its slot assignment must not depend on block
        // order.
        let mut b = IrBuilder::new();
        let idx = b.function_create("f", Type::Int(IntKind::Int32));
        b.module.main_function = Some(idx);
        let entry = b.block_create();
        let later = b.block_create();
        b.block_set_current(entry);
        let t = b.add(b.imm(1.0), b.imm(2.0), 1);
        b.jump(later, 1);
        b.block_set_current(later);
        b.return_(t, 2);

        let (chunk, _link) = emit_module(&b.module);
        assert!(chunk.code.contains(&(EsOpCode::Return as u8)));
    }
}
