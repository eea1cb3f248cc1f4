//! Expression lowering (`spec.md §4.5`).

use crate::ast::{BinOp, Expr, UnaryOp};
use crate::ir::{mangle_constructor, mangle_member, Value};
use crate::typeck::Type;

use super::consts::fold_binary;
use super::Lowerer;

impl<'a> Lowerer<'a> {
    pub(crate) fn lower_expr(&mut self, expr: &Expr) -> Value {
        match expr {
            Expr::Number(n, _) => Value::Immediate(*n),
            Expr::StringLit(s, _) => self.builder.string_const(s),
            Expr::Bool(b, _) => Value::Immediate(if *b { 1.0 } else { 0.0 }),
            Expr::Identifier(name, line) => self.builder.load(name.clone(), *line),
            Expr::This(line) => self.builder.load("this", *line),
            Expr::Binary { op, left, right, line } => self.lower_binary(*op, left, right, *line),
            Expr::Unary { op, operand, line } => self.lower_unary(*op, operand, *line),
            Expr::Ternary {
                cond,
                then_expr,
                else_expr,
                line,
            } => self.lower_ternary(cond, then_expr, else_expr, *line),
            Expr::Call { callee, args, line, .. } => {
                let arg_values: Vec<Value> = args.iter().map(|a| self.lower_expr(a)).collect();
                self.builder.call(callee.clone(), arg_values, *line)
            }
            Expr::StaticMethodCall {
                class_name,
                method,
                args,
                receiver,
                line,
            } => {
                let mut arg_values: Vec<Value> = Vec::new();
                if let Some(recv) = receiver {
                    arg_values.push(self.lower_expr(recv));
                }
                arg_values.extend(args.iter().map(|a| self.lower_expr(a)));
                if class_name == "Console" {
                    let builtin = if method == "WriteLine" {
                        "es_console_write_line"
                    } else {
                        "es_console_write"
                    };
                    self.builder.call(builtin, arg_values, *line)
                } else {
                    self.builder
                        .call(mangle_member(class_name, method), arg_values, *line)
                }
            }
            Expr::MemberAccess {
                object,
                member,
                resolved,
                line,
            } => self.lower_member_access(object, member, resolved, *line),
            Expr::ArrayAccess { array, index, line } => {
                let arr = self.lower_expr(array);
                let idx = self.lower_expr(index);
                self.builder.array_load(arr, idx, *line)
            }
            Expr::ArrayLiteral { elements, line } => self.lower_array_literal(elements, *line),
            Expr::New { class_name, args, line } => self.lower_new(class_name, args, *line),
            Expr::Lambda { .. } | Expr::Linq { .. } => {
                // Deferred feature (`spec.md §1` non-goal); the checker
                // already recorded a diagnostic, lowering just needs a
                // placeholder that won't panic the rest of the pipeline.
                Value::Void
            }
        }
    }

    fn lower_binary(&mut self, op: BinOp, left: &Expr, right: &Expr, line: u32) -> Value {
        let l_ty = self.infer_ty(left);
        let r_ty = self.infer_ty(right);
        if matches!(op, BinOp::Add) && (l_ty == Type::String || r_ty == Type::String) {
            return self.lower_string_concat(left, right, &l_ty, &r_ty, line);
        }
        let l_val = self.lower_expr(left);
        let r_val = self.lower_expr(right);
        if let (Some(l), Some(r)) = (l_val.as_immediate(), r_val.as_immediate()) {
            if let Some(folded) = fold_binary(op, Some(l), Some(r)) {
                return Value::Immediate(folded);
            }
        }
        self.emit_binary(op, l_val, r_val, line)
    }

    fn emit_binary(&mut self, op: BinOp, l: Value, r: Value, line: u32) -> Value {
        match op {
            BinOp::Add => self.builder.add(l, r, line),
            BinOp::Sub => self.builder.sub(l, r, line),
            BinOp::Mul => self.builder.mul(l, r, line),
            BinOp::Div => self.builder.div(l, r, line),
            BinOp::Mod => self.builder.modulo(l, r, line),
            BinOp::Pow => self.builder.pow(l, r, line),
            BinOp::Lt => self.builder.lt(l, r, line),
            BinOp::Gt => self.builder.gt(l, r, line),
            BinOp::Le => self.builder.le(l, r, line),
            BinOp::Ge => self.builder.ge(l, r, line),
            BinOp::Eq => self.builder.eq(l, r, line),
            BinOp::Ne => self.builder.ne(l, r, line),
            BinOp::And => self.builder.and(l, r, line),
            BinOp::Or => self.builder.or(l, r, line),
            BinOp::BitAnd => self.builder.bit_and(l, r, line),
            BinOp::BitOr => self.builder.bit_or(l, r, line),
            BinOp::BitXor => self.builder.bit_xor(l, r, line),
            BinOp::Shl => self.builder.shl(l, r, line),
            BinOp::Shr => self.builder.shr(l, r, line),
        }
    }

    /// String concatenation (`spec.md §4.5`): a non-string operand is
    /// converted via `IntToString`/`DoubleToString` based on its inferred
    /// type before the `StrCat`.
    fn lower_string_concat(&mut self, left: &Expr, right: &Expr, l_ty: &Type, r_ty: &Type, line: u32) -> Value {
        let l_val = self.lower_expr(left);
        let l_str = if *l_ty == Type::String {
            l_val
        } else if l_ty.is_integer() {
            self.builder.int_to_string(l_val, line)
        } else {
            self.builder.double_to_string(l_val, line)
        };
        let r_val = self.lower_expr(right);
        let r_str = if *r_ty == Type::String {
            r_val
        } else if r_ty.is_integer() {
            self.builder.int_to_string(r_val, line)
        } else {
            self.builder.double_to_string(r_val, line)
        };
        self.builder.strcat(l_str, r_str, line)
    }

    fn lower_unary(&mut self, op: UnaryOp, operand: &Expr, line: u32) -> Value {
        let v = self.lower_expr(operand);
        if let Some(n) = v.as_immediate() {
            let folded = match op {
                UnaryOp::Neg => Some(-n),
                UnaryOp::Not => Some(if n == 0.0 { 1.0 } else { 0.0 }),
                UnaryOp::BitNot => Some(!(n as i64) as f64),
            };
            if let Some(folded) = folded {
                return Value::Immediate(folded);
            }
        }
        match op {
            UnaryOp::Neg => self.builder.neg(v, line),
            UnaryOp::Not => self.builder.not(v, line),
            UnaryOp::BitNot => self.builder.bit_not(v, line),
        }
    }

    /// Ternary lowering via a synthetic `result_N` local (`spec.md §4.5`):
    /// each arm stores into the slot on its own block, and control rejoins
    /// on a merge block that loads it back out.
    fn lower_ternary(&mut self, cond: &Expr, then_expr: &Expr, else_expr: &Expr, line: u32) -> Value {
        let cond_val = self.lower_expr(cond);
        let slot = format!("result_{}", self.next_ternary_slot());
        let then_block = self.builder.block_create();
        let else_block = self.builder.block_create();
        let merge_block = self.builder.block_create();
        self.builder.branch(cond_val, then_block, else_block, line);

        self.builder.block_set_current(then_block);
        let then_val = self.lower_expr(then_expr);
        self.builder.store(slot.clone(), then_val, line);
        self.builder.jump(merge_block, line);

        self.builder.block_set_current(else_block);
        let else_val = self.lower_expr(else_expr);
        self.builder.store(slot.clone(), else_val, line);
        self.builder.jump(merge_block, line);

        self.builder.block_set_current(merge_block);
        self.builder.load(slot, line)
    }

    fn lower_array_literal(&mut self, elements: &[Expr], line: u32) -> Value {
        let size = self.builder.imm((elements.len() * 8) as f64);
        let ptr = self.builder.call("es_malloc", vec![size], line);
        for (i, elem) in elements.iter().enumerate() {
            let value = self.lower_expr(elem);
            let idx = self.builder.imm(i as f64);
            self.builder.array_store(ptr.clone(), idx, value, line);
        }
        ptr
    }

    /// `new Class(args)` lowers to `es_malloc` sized from the class layout
    /// plus a call into the mangled constructor (`spec.md §4.5`).
    fn lower_new(&mut self, class_name: &str, args: &[Expr], line: u32) -> Value {
        let size = self
            .builder
            .module
            .layouts
            .get(class_name)
            .map(|l| l.total_size as f64)
            .unwrap_or(64.0);
        let size_val = self.builder.imm(size);
        let ptr = self.builder.call("es_malloc", vec![size_val], line);
        let mut ctor_args = vec![ptr.clone()];
        for a in args {
            ctor_args.push(self.lower_expr(a));
        }
        self.builder.call(mangle_constructor(class_name), ctor_args, line);
        ptr
    }

    fn lower_member_access(
        &mut self,
        object: &Expr,
        member: &str,
        resolved: &crate::ast::Resolved,
        line: u32,
    ) -> Value {
        if let Expr::Identifier(name, _) = object {
            if self.checked.classes.contains_key(name) && name != "Console" {
                return self.builder.load(mangle_member(name, member), line);
            }
        }
        let class_name = resolved
            .resolved_class_name
            .borrow()
            .clone()
            .or_else(|| self.class_name_of(object));
        let ptr = self.lower_expr(object);
        let offset = class_name
            .as_deref()
            .and_then(|c| self.builder.module.layouts.get(c))
            .and_then(|l| l.offset_of(member))
            .unwrap_or(0);
        let offset_val = self.builder.imm(offset as f64);
        self.builder.load_ptr(ptr, offset_val, line)
    }

    pub(crate) fn class_name_of(&self, object: &Expr) -> Option<String> {
        match self.infer_ty(object) {
            Type::Class { name, .. } => Some(name),
            Type::Pointer(inner) => match *inner {
                Type::Class { name, .. } => Some(name),
                _ => None,
            },
            _ => None,
        }
    }

    /// A deliberately partial re-inference used only to classify
    /// expressions during lowering (string-concat vs arithmetic,
    /// member-access receiver class); the real, complete inference already
    /// ran in [`crate::typeck`].
    pub(crate) fn infer_ty(&self, expr: &Expr) -> Type {
        match expr {
            Expr::Number(..) => Type::Float64,
            Expr::StringLit(..) => Type::String,
            Expr::Bool(..) => Type::Bool,
            Expr::Identifier(name, _) => self.var_types.get(name).cloned().unwrap_or(Type::Unknown),
            Expr::This(_) => self.var_types.get("this").cloned().unwrap_or(Type::Unknown),
            Expr::Binary { op, left, .. } => match op {
                BinOp::Lt | BinOp::Gt | BinOp::Le | BinOp::Ge | BinOp::Eq | BinOp::Ne | BinOp::And | BinOp::Or => {
                    Type::Bool
                }
                BinOp::Add => {
                    let l = self.infer_ty(left);
                    if l == Type::String {
                        Type::String
                    } else {
                        l
                    }
                }
                _ => self.infer_ty(left),
            },
            Expr::Unary { operand, .. } => self.infer_ty(operand),
            Expr::Ternary { then_expr, .. } => self.infer_ty(then_expr),
            Expr::Call { callee, .. } => self
                .checked
                .functions
                .get(callee)
                .map(|s| s.return_type.clone())
                .unwrap_or(Type::Unknown),
            Expr::StaticMethodCall { class_name, method, .. } => {
                if class_name == "Console" {
                    return Type::Void;
                }
                self.checked
                    .classes
                    .get(class_name)
                    .and_then(|c| c.find_member(method))
                    .map(|m| match &m.ty {
                        Type::Function { return_type, .. } => (**return_type).clone(),
                        other => other.clone(),
                    })
                    .unwrap_or(Type::Unknown)
            }
            Expr::MemberAccess { object, member, .. } => self
                .class_name_of(object)
                .and_then(|c| self.checked.classes.get(&c).cloned())
                .and_then(|info| info.find_member(member).map(|m| m.ty.clone()))
                .unwrap_or(Type::Unknown),
            Expr::ArrayAccess { array, .. } => match self.infer_ty(array) {
                Type::Array(elem, _) => *elem,
                Type::Pointer(elem) => *elem,
                _ => Type::Unknown,
            },
            Expr::ArrayLiteral { .. } => Type::Unknown,
            Expr::New { class_name, .. } => self
                .checked
                .classes
                .get(class_name)
                .map(|info| Type::Pointer(Box::new(Type::Class {
                    name: class_name.clone(),
                    info: info.clone(),
                })))
                .unwrap_or(Type::Unknown),
            Expr::Lambda { .. } | Expr::Linq { .. } => Type::Unknown,
        }
    }
}
