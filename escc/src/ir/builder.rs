//! IR builder (`spec.md §4.2`): the mutable cursor [`crate::lower`] drives
//! to emit instructions into the function/block currently "current".
//!
//! Mirrors `ir_builder.h`'s one-method-per-opcode API: callers never touch
//! `Instruction` fields directly, they call `builder.add(left, right)` and
//! get back the `Value::Temp` holding the result.

use crate::arena::Handle;
use crate::typeck::Type;

use super::block::BasicBlock;
use super::function::Function;
use super::inst::{Instruction, Opcode};
use super::module::Module;
use super::value::Value;

/// One entry in the loop-context stack, used to resolve `break`/`continue`
/// targets without threading them through every `lower_stmt` call
/// (`spec.md §4.5`).
#[derive(Debug, Clone, Copy)]
pub struct LoopContext {
    pub break_target: Handle<BasicBlock>,
    pub continue_target: Handle<BasicBlock>,
}

/// Cursor over a [`Module`] under construction.
pub struct IrBuilder {
    pub module: Module,
    current_function: Option<usize>,
    current_block: Option<Handle<BasicBlock>>,
    loop_stack: Vec<LoopContext>,
    /// Name of the class whose method is currently being lowered, if any
    /// (`spec.md §4.5`, member access lowering needs to know "this vs.
    /// class-static vs. general object").
    class_stack: Vec<String>,
}

impl IrBuilder {
    pub fn new() -> Self {
        Self {
            module: Module::new(),
            current_function: None,
            current_block: None,
            loop_stack: Vec::new(),
            class_stack: Vec::new(),
        }
    }

    // ---- operand constructors ----

    pub fn imm(&self, n: f64) -> Value {
        Value::Immediate(n)
    }

    pub fn var(&self, name: impl Into<String>) -> Value {
        Value::Named(name.into())
    }

    pub fn arg(&self, index: i32) -> Value {
        Value::Arg(index)
    }

    pub fn string_const(&mut self, s: &str) -> Value {
        Value::StringConst(self.module.strings.intern(s))
    }

    pub fn temp(&mut self) -> Value {
        let f = self.current_function_mut();
        Value::Temp(f.fresh_temp())
    }

    // ---- function/block management ----

    pub fn function_create(&mut self, name: impl Into<String>, return_type: Type) -> usize {
        let idx = self.module.add_function(Function::new(name, return_type));
        self.current_function = Some(idx);
        idx
    }

    pub fn block_create(&mut self) -> Handle<BasicBlock> {
        let f = self.current_function_mut();
        let handle = f.blocks.push(BasicBlock::new());
        if f.entry.is_none() {
            f.entry = Some(handle);
        }
        handle
    }

    pub fn block_set_current(&mut self, block: Handle<BasicBlock>) {
        self.current_block = Some(block);
    }

    pub fn current_block_handle(&self) -> Handle<BasicBlock> {
        self.current_block.expect("no current block")
    }

    pub fn push_loop(&mut self, ctx: LoopContext) {
        self.loop_stack.push(ctx);
    }

    pub fn pop_loop(&mut self) {
        self.loop_stack.pop();
    }

    pub fn current_loop(&self) -> Option<LoopContext> {
        self.loop_stack.last().copied()
    }

    pub fn push_class(&mut self, name: impl Into<String>) {
        self.class_stack.push(name.into());
    }

    pub fn pop_class(&mut self) {
        self.class_stack.pop();
    }

    pub fn current_class(&self) -> Option<&str> {
        self.class_stack.last().map(|s| s.as_str())
    }

    fn current_function_mut(&mut self) -> &mut Function {
        let idx = self.current_function.expect("no current function");
        &mut self.module.functions[idx]
    }

    fn push(&mut self, inst: Instruction) {
        let block = self.current_block_handle();
        let f = self.current_function_mut();
        f.blocks.get_mut(block).push(inst);
    }

    // ---- one method per opcode group ----

    fn binary(&mut self, opcode: Opcode, left: Value, right: Value, line: u32) -> Value {
        let result = self.temp();
        let mut inst = Instruction::new(opcode, line);
        inst.result = result.clone();
        inst.left = left;
        inst.right = right;
        self.push(inst);
        result
    }

    fn unary(&mut self, opcode: Opcode, operand: Value, line: u32) -> Value {
        let result = self.temp();
        let mut inst = Instruction::new(opcode, line);
        inst.result = result.clone();
        inst.left = operand;
        self.push(inst);
        result
    }

    pub fn add(&mut self, l: Value, r: Value, line: u32) -> Value {
        self.binary(Opcode::Add, l, r, line)
    }
    pub fn sub(&mut self, l: Value, r: Value, line: u32) -> Value {
        self.binary(Opcode::Sub, l, r, line)
    }
    pub fn mul(&mut self, l: Value, r: Value, line: u32) -> Value {
        self.binary(Opcode::Mul, l, r, line)
    }
    pub fn div(&mut self, l: Value, r: Value, line: u32) -> Value {
        self.binary(Opcode::Div, l, r, line)
    }
    pub fn modulo(&mut self, l: Value, r: Value, line: u32) -> Value {
        self.binary(Opcode::Mod, l, r, line)
    }
    pub fn pow(&mut self, l: Value, r: Value, line: u32) -> Value {
        self.binary(Opcode::Pow, l, r, line)
    }
    pub fn neg(&mut self, v: Value, line: u32) -> Value {
        self.unary(Opcode::Neg, v, line)
    }
    pub fn bit_and(&mut self, l: Value, r: Value, line: u32) -> Value {
        self.binary(Opcode::BitAnd, l, r, line)
    }
    pub fn bit_or(&mut self, l: Value, r: Value, line: u32) -> Value {
        self.binary(Opcode::BitOr, l, r, line)
    }
    pub fn bit_xor(&mut self, l: Value, r: Value, line: u32) -> Value {
        self.binary(Opcode::BitXor, l, r, line)
    }
    pub fn shl(&mut self, l: Value, r: Value, line: u32) -> Value {
        self.binary(Opcode::Shl, l, r, line)
    }
    pub fn shr(&mut self, l: Value, r: Value, line: u32) -> Value {
        self.binary(Opcode::Shr, l, r, line)
    }
    pub fn bit_not(&mut self, v: Value, line: u32) -> Value {
        self.unary(Opcode::BitNot, v, line)
    }
    pub fn and(&mut self, l: Value, r: Value, line: u32) -> Value {
        self.binary(Opcode::And, l, r, line)
    }
    pub fn or(&mut self, l: Value, r: Value, line: u32) -> Value {
        self.binary(Opcode::Or, l, r, line)
    }
    pub fn not(&mut self, v: Value, line: u32) -> Value {
        self.unary(Opcode::Not, v, line)
    }
    pub fn lt(&mut self, l: Value, r: Value, line: u32) -> Value {
        self.binary(Opcode::Lt, l, r, line)
    }
    pub fn gt(&mut self, l: Value, r: Value, line: u32) -> Value {
        self.binary(Opcode::Gt, l, r, line)
    }
    pub fn le(&mut self, l: Value, r: Value, line: u32) -> Value {
        self.binary(Opcode::Le, l, r, line)
    }
    pub fn ge(&mut self, l: Value, r: Value, line: u32) -> Value {
        self.binary(Opcode::Ge, l, r, line)
    }
    pub fn eq(&mut self, l: Value, r: Value, line: u32) -> Value {
        self.binary(Opcode::Eq, l, r, line)
    }
    pub fn ne(&mut self, l: Value, r: Value, line: u32) -> Value {
        self.binary(Opcode::Ne, l, r, line)
    }
    pub fn strcat(&mut self, l: Value, r: Value, line: u32) -> Value {
        self.binary(Opcode::StrCat, l, r, line)
    }
    pub fn int_to_string(&mut self, v: Value, line: u32) -> Value {
        self.unary(Opcode::IntToString, v, line)
    }
    pub fn double_to_string(&mut self, v: Value, line: u32) -> Value {
        self.unary(Opcode::DoubleToString, v, line)
    }

    pub fn load(&mut self, name: impl Into<String>, line: u32) -> Value {
        self.unary(Opcode::Load, Value::Named(name.into()), line)
    }

    pub fn store(&mut self, name: impl Into<String>, value: Value, line: u32) {
        let mut inst = Instruction::new(Opcode::Store, line);
        inst.left = Value::Named(name.into());
        inst.right = value;
        self.push(inst);
    }

    pub fn array_load(&mut self, array: Value, index: Value, line: u32) -> Value {
        self.binary(Opcode::ArrayLoad, array, index, line)
    }

    pub fn array_store(&mut self, array: Value, index: Value, value: Value, line: u32) {
        let mut inst = Instruction::new(Opcode::ArrayStore, line);
        inst.left = array;
        inst.right = index;
        inst.extra = vec![value];
        self.push(inst);
    }

    pub fn load_ptr(&mut self, ptr: Value, offset: Value, line: u32) -> Value {
        self.binary(Opcode::LoadPtr, ptr, offset, line)
    }

    pub fn store_ptr(&mut self, ptr: Value, offset: Value, value: Value, line: u32) {
        let mut inst = Instruction::new(Opcode::StorePtr, line);
        inst.left = ptr;
        inst.right = offset;
        inst.extra = vec![value];
        self.push(inst);
    }

    pub fn call(&mut self, callee: impl Into<String>, args: Vec<Value>, line: u32) -> Value {
        self.current_function_mut().has_calls = true;
        let result = self.temp();
        let mut inst = Instruction::new(Opcode::Call, line);
        inst.result = result.clone();
        inst.left = Value::Function(callee.into());
        inst.extra = args;
        self.push(inst);
        result
    }

    pub fn return_(&mut self, value: Value, line: u32) {
        let mut inst = Instruction::new(Opcode::Return, line);
        inst.left = value;
        self.push(inst);
    }

    pub fn jump(&mut self, target: Handle<BasicBlock>, line: u32) {
        let mut inst = Instruction::new(Opcode::Jump, line);
        inst.target = Some(target);
        self.push(inst);
        self.link(target);
    }

    pub fn branch(
        &mut self,
        cond: Value,
        then_target: Handle<BasicBlock>,
        else_target: Handle<BasicBlock>,
        line: u32,
    ) {
        let mut inst = Instruction::new(Opcode::Branch, line);
        inst.left = cond;
        inst.target = Some(then_target);
        inst.alt_target = Some(else_target);
        self.push(inst);
        self.link(then_target);
        self.link(else_target);
    }

    fn link(&mut self, target: Handle<BasicBlock>) {
        let current = self.current_block_handle();
        let f = self.current_function_mut();
        f.blocks.get_mut(current).succs.push(target);
        f.blocks.get_mut(target).preds.push(current);
    }
}

impl Default for IrBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_emits_arithmetic_and_links_blocks() {
        let mut b = IrBuilder::new();
        b.function_create("main", Type::Void);
        let entry = b.block_create();
        b.block_set_current(entry);
        let sum = b.add(b.imm(2.0), b.imm(3.0), 1);
        b.return_(sum, 1);
        let f = &b.module.functions[0];
        let block = f.blocks.get(entry);
        assert_eq!(block.instructions.len(), 2);
    }

    #[test]
    fn jump_links_predecessor_and_successor() {
        let mut b = IrBuilder::new();
        b.function_create("main", Type::Void);
        let entry = b.block_create();
        let target = b.block_create();
        b.block_set_current(entry);
        b.jump(target, 1);
        let f = &b.module.functions[0];
        assert_eq!(f.blocks.get(entry).succs, vec![target]);
        assert_eq!(f.blocks.get(target).preds, vec![entry]);
    }
}
