//! Statement lowering (`spec.md §4.5`): control flow, assignment targets,
//! `try`/`throw`/`delete`.

use crate::ast::{AssignTarget, BinOp, CompoundOp, Stmt};
use crate::ir::{mangle_destructor, LoopContext, Value};
use crate::typeck::Type;

use super::Lowerer;

impl<'a> Lowerer<'a> {
    pub(crate) fn lower_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Let(v) => {
                let value = v
                    .init
                    .as_ref()
                    .map(|e| self.lower_expr(e))
                    .unwrap_or(Value::Void);
                let ty = v
                    .init
                    .as_ref()
                    .map(|e| self.infer_ty(e))
                    .unwrap_or(Type::Unknown);
                self.var_types.insert(v.name.clone(), ty);
                self.builder.store(v.name.clone(), value, v.line);
            }
            Stmt::Assign { target, value, line } => {
                let val = self.lower_expr(value);
                self.lower_assign(target, val, *line);
            }
            Stmt::CompoundAssign { target, op, value, line } => {
                self.lower_compound_assign(target, *op, value, *line);
            }
            Stmt::ExprStmt(e) => {
                self.lower_expr(e);
            }
            Stmt::Return(Some(e), line) => {
                let v = self.lower_expr(e);
                self.builder.return_(v, *line);
            }
            Stmt::Return(None, line) => {
                self.builder.return_(Value::Void, *line);
            }
            Stmt::If {
                cond,
                then_branch,
                else_branch,
                line,
            } => self.lower_if(cond, then_branch, else_branch.as_deref(), *line),
            Stmt::While { cond, body, line } => self.lower_while(cond, body, *line),
            Stmt::For {
                init,
                cond,
                incr,
                body,
                line,
            } => self.lower_for(init.as_deref(), cond.as_ref(), incr.as_deref(), body, *line),
            Stmt::ForEach { var, iter, body, line } => self.lower_foreach(var, iter, body, *line),
            Stmt::Switch {
                scrutinee,
                cases,
                default,
                line,
            } => self.lower_switch(scrutinee, cases, default.as_deref(), *line),
            Stmt::Break(line) => self.lower_break(*line),
            Stmt::Continue(line) => self.lower_continue(*line),
            Stmt::Try {
                body,
                catch_name,
                catch_body,
                finally_body,
                ..
            } => self.lower_try(body, catch_name.as_deref(), catch_body, finally_body.as_deref()),
            Stmt::Throw(e, line) => self.lower_throw(e, *line),
            Stmt::Delete(e, line) => self.lower_delete(e, *line),
            Stmt::Block(body) => {
                for s in body {
                    self.lower_stmt(s);
                }
            }
        }
    }

    fn lower_assign(&mut self, target: &AssignTarget, value: Value, line: u32) {
        match target {
            AssignTarget::Name(name) => {
                self.builder.store(name.clone(), value, line);
            }
            AssignTarget::ArrayIndex(arr, idx) => {
                let arr_val = self.lower_expr(arr);
                let idx_val = self.lower_expr(idx);
                self.builder.array_store(arr_val, idx_val, value, line);
            }
            AssignTarget::Member(obj, member) => {
                let class_name = self.class_name_of(obj);
                let ptr = self.lower_expr(obj);
                let offset = class_name
                    .as_deref()
                    .and_then(|c| self.builder.module.layouts.get(c))
                    .and_then(|l| l.offset_of(member))
                    .unwrap_or(0);
                let offset_val = self.builder.imm(offset as f64);
                self.builder.store_ptr(ptr, offset_val, value, line);
            }
        }
    }

    fn lower_compound_assign(&mut self, target: &AssignTarget, op: CompoundOp, value: &crate::ast::Expr, line: u32) {
        let current = self.load_assign_target(target, line);
        let rhs = self.lower_expr(value);
        let bin_op = match op {
            CompoundOp::Add => BinOp::Add,
            CompoundOp::Sub => BinOp::Sub,
            CompoundOp::Mul => BinOp::Mul,
            CompoundOp::Div => BinOp::Div,
            CompoundOp::Mod => BinOp::Mod,
        };
        let result = match bin_op {
            BinOp::Add => self.builder.add(current, rhs, line),
            BinOp::Sub => self.builder.sub(current, rhs, line),
            BinOp::Mul => self.builder.mul(current, rhs, line),
            BinOp::Div => self.builder.div(current, rhs, line),
            _ => self.builder.modulo(current, rhs, line),
        };
        self.lower_assign(target, result, line);
    }

    fn load_assign_target(&mut self, target: &AssignTarget, line: u32) -> Value {
        match target {
            AssignTarget::Name(name) => self.builder.load(name.clone(), line),
            AssignTarget::ArrayIndex(arr, idx) => {
                let arr_val = self.lower_expr(arr);
                let idx_val = self.lower_expr(idx);
                self.builder.array_load(arr_val, idx_val, line)
            }
            AssignTarget::Member(obj, member) => {
                let class_name = self.class_name_of(obj);
                let ptr = self.lower_expr(obj);
                let offset = class_name
                    .as_deref()
                    .and_then(|c| self.builder.module.layouts.get(c))
                    .and_then(|l| l.offset_of(member))
                    .unwrap_or(0);
                let offset_val = self.builder.imm(offset as f64);
                self.builder.load_ptr(ptr, offset_val, line)
            }
        }
    }

    fn lower_if(
        &mut self,
        cond: &crate::ast::Expr,
        then_branch: &[Stmt],
        else_branch: Option<&[Stmt]>,
        line: u32,
    ) {
        let cond_val = self.lower_expr(cond);
        let then_block = self.builder.block_create();
        let else_block = self.builder.block_create();
        let merge_block = self.builder.block_create();
        self.builder.branch(cond_val, then_block, else_block, line);

        self.builder.block_set_current(then_block);
        for s in then_branch {
            self.lower_stmt(s);
        }
        self.builder.jump(merge_block, line);

        self.builder.block_set_current(else_block);
        if let Some(else_b) = else_branch {
            for s in else_b {
                self.lower_stmt(s);
            }
        }
        self.builder.jump(merge_block, line);

        self.builder.block_set_current(merge_block);
    }

    fn lower_while(&mut self, cond: &crate::ast::Expr, body: &[Stmt], line: u32) {
        let cond_block = self.builder.block_create();
        let body_block = self.builder.block_create();
        let after_block = self.builder.block_create();

        self.builder.jump(cond_block, line);
        self.builder.block_set_current(cond_block);
        let cond_val = self.lower_expr(cond);
        self.builder.branch(cond_val, body_block, after_block, line);

        self.builder.block_set_current(body_block);
        self.builder.push_loop(LoopContext {
            break_target: after_block,
            continue_target: cond_block,
        });
        for s in body {
            self.lower_stmt(s);
        }
        self.builder.pop_loop();
        self.builder.jump(cond_block, line);

        self.builder.block_set_current(after_block);
    }

    fn lower_for(
        &mut self,
        init: Option<&Stmt>,
        cond: Option<&crate::ast::Expr>,
        incr: Option<&Stmt>,
        body: &[Stmt],
        line: u32,
    ) {
        if let Some(init) = init {
            self.lower_stmt(init);
        }
        let cond_block = self.builder.block_create();
        let body_block = self.builder.block_create();
        let incr_block = self.builder.block_create();
        let after_block = self.builder.block_create();

        self.builder.jump(cond_block, line);
        self.builder.block_set_current(cond_block);
        match cond {
            Some(c) => {
                let cond_val = self.lower_expr(c);
                self.builder.branch(cond_val, body_block, after_block, line);
            }
            None => self.builder.jump(body_block, line),
        }

        self.builder.block_set_current(body_block);
        self.builder.push_loop(LoopContext {
            break_target: after_block,
            continue_target: incr_block,
        });
        for s in body {
            self.lower_stmt(s);
        }
        self.builder.pop_loop();
        self.builder.jump(incr_block, line);

        self.builder.block_set_current(incr_block);
        if let Some(incr) = incr {
            self.lower_stmt(incr);
        }
        self.builder.jump(cond_block, line);

        self.builder.block_set_current(after_block);
    }

    /// `foreach` over an array lowers to an index-counted `for` loop over
    /// `es_array_size`/`array_get` (`spec.md §4.5`; there is no iterator
    /// protocol in scope, arrays are the only iterable).
    fn lower_foreach(&mut self, var: &str, iter: &crate::ast::Expr, body: &[Stmt], line: u32) {
        let array = self.lower_expr(iter);
        let size = self.builder.call("es_array_size", vec![array.clone()], line);
        let idx_slot = format!("__foreach_idx_{}", self.next_ternary_slot());
        let zero = self.builder.imm(0.0);
        self.builder.store(idx_slot.clone(), zero, line);

        let cond_block = self.builder.block_create();
        let body_block = self.builder.block_create();
        let incr_block = self.builder.block_create();
        let after_block = self.builder.block_create();

        self.builder.jump(cond_block, line);
        self.builder.block_set_current(cond_block);
        let idx_val = self.builder.load(idx_slot.clone(), line);
        let in_range = self.builder.lt(idx_val.clone(), size, line);
        self.builder.branch(in_range, body_block, after_block, line);

        self.builder.block_set_current(body_block);
        let elem = self.builder.array_load(array, idx_val.clone(), line);
        self.builder.store(var.to_string(), elem, line);
        self.var_types.insert(var.to_string(), Type::Unknown);
        self.builder.push_loop(LoopContext {
            break_target: after_block,
            continue_target: incr_block,
        });
        for s in body {
            self.lower_stmt(s);
        }
        self.builder.pop_loop();
        self.builder.jump(incr_block, line);

        self.builder.block_set_current(incr_block);
        let idx_val2 = self.builder.load(idx_slot.clone(), line);
        let one = self.builder.imm(1.0);
        let next_idx = self.builder.add(idx_val2, one, line);
        self.builder.store(idx_slot, next_idx, line);
        self.builder.jump(cond_block, line);

        self.builder.block_set_current(after_block);
    }

    /// `switch` lowers to a chain of equality branches against the
    /// scrutinee (`spec.md §4.5`); there is no jump-table optimization at
    /// lowering time, that is left to the backend/optimizer if ever added.
    fn lower_switch(
        &mut self,
        scrutinee: &crate::ast::Expr,
        cases: &[(crate::ast::Expr, Vec<Stmt>)],
        default: Option<&[Stmt]>,
        line: u32,
    ) {
        let scrutinee_val = self.lower_expr(scrutinee);
        let after_block = self.builder.block_create();
        let mut next_check = self.builder.block_create();
        self.builder.jump(next_check, line);

        for (case_expr, body) in cases {
            self.builder.block_set_current(next_check);
            let case_val = self.lower_expr(case_expr);
            let matches = self.builder.eq(scrutinee_val.clone(), case_val, line);
            let case_body = self.builder.block_create();
            let following = self.builder.block_create();
            self.builder.branch(matches, case_body, following, line);

            self.builder.block_set_current(case_body);
            self.builder.push_loop(LoopContext {
                break_target: after_block,
                continue_target: after_block,
            });
            for s in body {
                self.lower_stmt(s);
            }
            self.builder.pop_loop();
            self.builder.jump(after_block, line);

            next_check = following;
        }

        self.builder.block_set_current(next_check);
        if let Some(default_body) = default {
            self.builder.push_loop(LoopContext {
                break_target: after_block,
                continue_target: after_block,
            });
            for s in default_body {
                self.lower_stmt(s);
            }
            self.builder.pop_loop();
        }
        self.builder.jump(after_block, line);

        self.builder.block_set_current(after_block);
    }

    fn lower_break(&mut self, line: u32) {
        if let Some(ctx) = self.loop_ctx() {
            self.builder.jump(ctx.break_target, line);
        }
    }

    fn lower_continue(&mut self, line: u32) {
        if let Some(ctx) = self.loop_ctx() {
            self.builder.jump(ctx.continue_target, line);
        }
    }

    /// `try`/`catch`/`finally` (`spec.md`'s supplemental exception-handling
    /// rules): with no stack-unwinding runtime in scope, `try`'s body and
    /// `finally`'s body lower straight through; `catch` is unreachable from
    /// normal control flow since nothing in this backend unwinds into it,
    /// but its body still gets lowered so declarations inside it still
    /// type- and name-check against the rest of the function.
    fn lower_try(&mut self, body: &[Stmt], catch_name: Option<&str>, catch_body: &[Stmt], finally_body: Option<&[Stmt]>) {
        for s in body {
            self.lower_stmt(s);
        }
        if let Some(name) = catch_name {
            self.var_types.insert(name.to_string(), Type::Unknown);
        }
        let catch_block = self.builder.block_create();
        let after_catch = self.builder.block_create();
        self.builder.jump(after_catch, 0);
        self.builder.block_set_current(catch_block);
        for s in catch_body {
            self.lower_stmt(s);
        }
        self.builder.jump(after_catch, 0);
        self.builder.block_set_current(after_catch);
        if let Some(finally) = finally_body {
            for s in finally {
                self.lower_stmt(s);
            }
        }
    }

    /// `throw expr;` lowers to `call es_panic(expr)` followed by an
    /// unreachable `return 0` so the block stays well-formed (every block
    /// must end in a control-transfer instruction).
    fn lower_throw(&mut self, e: &crate::ast::Expr, line: u32) {
        let v = self.lower_expr(e);
        self.builder.call("es_panic", vec![v], line);
        self.builder.return_(Value::Immediate(0.0), line);
    }

    fn lower_delete(&mut self, e: &crate::ast::Expr, line: u32) {
        let class_name = self.class_name_of(e);
        let ptr = self.lower_expr(e);
        if let Some(class_name) = class_name {
            self.builder
                .call(mangle_destructor(&class_name), vec![ptr.clone()], line);
        }
        self.builder.call("es_free", vec![ptr], line);
    }
}
