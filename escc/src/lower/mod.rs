//! AST → IR lowering (`spec.md §4.5`).
//!
//! Runs after type checking succeeds. Performs constant folding as it goes
//! (so the optimizer's constant-folding pass only has to clean up what
//! lowering could not fold, e.g. operands behind a variable), lowers
//! control flow into explicit blocks, and gathers bare top-level statements
//! plus the checked program's declared functions into one [`ir::Module`].

use std::rc::Rc;

use crate::ast::{
    AssignTarget, BinOp, ClassMemberKind, CompoundOp, Expr, FunctionDecl, Stmt, UnaryOp,
};
use crate::ir::{self, mangle_constructor, mangle_destructor, mangle_member, IrBuilder, LoopContext, Value};
use crate::typeck::{CheckedProgram, ClassInfo, FunctionSig, Type};

mod consts;
mod expr;
mod stmt;

pub use consts::fold_binary;

/// Entry point: lower an entire checked program into an [`ir::Module`].
pub fn lower_program(checked: &CheckedProgram) -> ir::Module {
    let mut lowerer = Lowerer::new(checked);
    for (name, sig) in &checked.functions {
        lowerer.lower_function(name, sig);
    }
    for (name, info) in &checked.classes {
        if name == "Console" {
            continue;
        }
        lowerer.register_class_layout(name, info);
    }
    for (name, info) in &checked.classes {
        if name == "Console" {
            continue;
        }
        if let Some(decl) = checked.class_decls.get(name) {
            lowerer.lower_class_methods(name, decl, info);
        }
    }
    lowerer.lower_main(&checked.main_statements);
    lowerer.builder.module
}

pub(crate) struct Lowerer<'a> {
    pub(crate) checked: &'a CheckedProgram,
    pub(crate) builder: IrBuilder,
    /// Lightweight type map for locals/params in the function currently
    /// being lowered, rebuilt per function. Used only to classify
    /// expressions (string-concat vs. arithmetic, member-access class)
    /// without re-running the full checker.
    pub(crate) var_types: std::collections::HashMap<String, Type>,
    /// Counter for synthetic `result_N` ternary slots (`spec.md §4.5`),
    /// unique across the whole module so nested ternaries never collide.
    ternary_counter: u32,
}

impl<'a> Lowerer<'a> {
    fn new(checked: &'a CheckedProgram) -> Self {
        Self {
            checked,
            builder: IrBuilder::new(),
            var_types: std::collections::HashMap::new(),
            ternary_counter: 0,
        }
    }

    pub(crate) fn next_ternary_slot(&mut self) -> u32 {
        let n = self.ternary_counter;
        self.ternary_counter += 1;
        n
    }

    fn register_class_layout(&mut self, name: &str, info: &Rc<ClassInfo>) {
        let fields: Vec<String> = info.fields().map(|m| m.name.clone()).collect();
        self.builder.module.layouts.register(name, &fields);
    }

    /// Lower every constructor/destructor/method body declared on a class
    /// into its own mangled IR function (`spec.md §6`, "`Class__member`").
    /// Fields and properties carry no executable body at this stage
    /// (properties already desugar to synthetic get/set methods in
    /// `typeck::checker::declare_class`, which *are* lowered here).
    fn lower_class_methods(&mut self, class_name: &str, decl: &crate::ast::ClassDecl, info: &Rc<ClassInfo>) {
        for m in &decl.members {
            match &m.kind {
                ClassMemberKind::Method(f) => {
                    self.lower_class_function(&mangle_member(class_name, &f.name), &f.name, class_name, f, !m.is_static, info);
                }
                ClassMemberKind::Constructor(f) => {
                    self.lower_class_function(&mangle_constructor(class_name), "constructor", class_name, f, true, info);
                }
                ClassMemberKind::Destructor(f) => {
                    self.lower_class_function(&mangle_destructor(class_name), "destructor", class_name, f, true, info);
                }
                ClassMemberKind::Field { .. } | ClassMemberKind::Property { .. } => {}
            }
        }
    }

    fn lower_class_function(
        &mut self,
        mangled_name: &str,
        member_name: &str,
        class_name: &str,
        f: &FunctionDecl,
        has_this: bool,
        info: &Rc<ClassInfo>,
    ) {
        let member = info.find_member(member_name);
        let return_type = member
            .map(|m| match &m.ty {
                Type::Function { return_type, .. } => (**return_type).clone(),
                _ => Type::Void,
            })
            .unwrap_or(Type::Void);
        let param_types: &[Type] = match member.map(|m| &m.ty) {
            Some(Type::Function { params, .. }) => params,
            _ => &[],
        };
        self.builder.function_create(mangled_name, return_type.clone());
        let f_idx = self.builder.module.functions.len() - 1;
        let entry = self.builder.block_create();
        self.builder.block_set_current(entry);
        self.var_types.clear();
        let mut arg_idx = 0i32;
        if has_this {
            let this_ty = Type::Pointer(Box::new(Type::Class { name: class_name.to_string(), info: Rc::clone(info) }));
            let arg = self.builder.arg(arg_idx);
            self.builder.store("this".to_string(), arg, f.line);
            self.var_types.insert("this".to_string(), this_ty.clone());
            self.builder.module.functions[f_idx].params.add("this", this_ty, arg_idx as usize);
            arg_idx += 1;
        }
        for (i, p) in f.params.iter().enumerate() {
            let ty = param_types.get(i).cloned().unwrap_or(Type::Unknown);
            let arg = self.builder.arg(arg_idx);
            self.builder.store(p.name.clone(), arg, f.line);
            self.var_types.insert(p.name.clone(), ty.clone());
            self.builder.module.functions[f_idx].params.add(&p.name, ty, arg_idx as usize);
            arg_idx += 1;
        }
        self.builder.module.functions[f_idx].param_count = arg_idx;
        for stmt in &f.body {
            self.lower_stmt(stmt);
        }
        self.default_return(return_type != Type::Void);
    }

    fn lower_function(&mut self, name: &str, sig: &FunctionSig) {
        self.builder.function_create(name, sig.return_type.clone());
        let f_idx = self.builder.module.functions.len() - 1;
        let entry = self.builder.block_create();
        self.builder.block_set_current(entry);
        self.var_types.clear();
        for (i, (param_name, ty)) in sig.params.iter().enumerate() {
            let arg = self.builder.arg(i as i32);
            self.builder.store(param_name.clone(), arg, 0);
            self.var_types.insert(param_name.clone(), ty.clone());
            self.builder.module.functions[f_idx].params.add(param_name, ty.clone(), i);
        }
        self.builder.module.functions[f_idx].param_count = sig.params.len() as i32;
        for stmt in &sig.body {
            self.lower_stmt(stmt);
        }
        self.default_return(sig.return_type != Type::Void);
    }

    /// Gather bare top-level statements into the implicit `main`
    /// (`spec.md §4.5`), defaulting its return to `0` when control falls
    /// off the end.
    fn lower_main(&mut self, statements: &[Stmt]) {
        let idx = self.builder.function_create("main", Type::Int32);
        let entry = self.builder.block_create();
        self.builder.block_set_current(entry);
        self.var_types.clear();
        for stmt in statements {
            self.lower_stmt(stmt);
        }
        self.default_return(true);
        self.builder.module.main_function = Some(idx);
        self.builder.module.functions[idx].param_count = 0;
    }

    /// `spec.md §4.5`, "implicit `return 0`": a function whose last
    /// instruction on its current block isn't already a `Return` gets one
    /// synthesized — `0` for a numeric-returning function (including
    /// `main`), void-return otherwise.
    fn default_return(&mut self, numeric_zero: bool) {
        let block = self.builder.current_block_handle();
        let already_returns = {
            let f_idx = self.builder.module.functions.len() - 1;
            let f = &self.builder.module.functions[f_idx];
            f.blocks
                .get(block)
                .instructions
                .last()
                .map(|i| i.opcode == ir::Opcode::Return)
                .unwrap_or(false)
        };
        if already_returns {
            return;
        }
        let value = if numeric_zero {
            self.builder.imm(0.0)
        } else {
            Value::Void
        };
        self.builder.return_(value, 0);
    }

    fn loop_ctx(&self) -> Option<LoopContext> {
        self.builder.current_loop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typeck::TypeChecker;
    use crate::ast::*;

    fn checked_program(items: Vec<Item>) -> CheckedProgram {
        let program = Program { items };
        TypeChecker::new().check_program(&program)
    }

    #[test]
    fn console_writeline_lowers_to_a_call() {
        let checked = checked_program(vec![Item::Statement(Stmt::ExprStmt(Expr::StaticMethodCall {
            class_name: "Console".to_string(),
            method: "WriteLine".to_string(),
            args: vec![Expr::StringLit("hi".to_string(), 1)],
            receiver: None,
            line: 1,
        }))]);
        assert!(checked.success());
        let module = lower_program(&checked);
        let main = module.find_function("main").unwrap();
        let entry = main.entry.unwrap();
        let block = main.blocks.get(entry);
        assert!(block
            .instructions
            .iter()
            .any(|i| i.opcode == ir::Opcode::Call));
    }

    #[test]
    fn constant_addition_folds_at_lowering_time() {
        let checked = checked_program(vec![Item::Statement(Stmt::Let(VariableDecl {
            name: "x".to_string(),
            ty: None,
            init: Some(Expr::Binary {
                op: BinOp::Add,
                left: Box::new(Expr::Number(2.0, 1)),
                right: Box::new(Expr::Number(3.0, 1)),
                line: 1,
            }),
            line: 1,
        }))]);
        assert!(checked.success());
        let module = lower_program(&checked);
        let main = module.find_function("main").unwrap();
        let entry = main.entry.unwrap();
        let block = main.blocks.get(entry);
        let store = block
            .instructions
            .iter()
            .find(|i| i.opcode == ir::Opcode::Store)
            .unwrap();
        assert_eq!(store.right, Value::Immediate(5.0));
    }

    #[test]
    fn function_without_explicit_return_gets_implicit_return_zero() {
        let checked = checked_program(vec![Item::Function(FunctionDecl {
            name: "f".to_string(),
            params: vec![],
            return_type: Some(TypeRef::Named("int32".to_string())),
            body: vec![],
            line: 1,
        })]);
        assert!(checked.success());
        let module = lower_program(&checked);
        let f = module.find_function("f").unwrap();
        let entry = f.entry.unwrap();
        let block = f.blocks.get(entry);
        let ret = block.instructions.last().unwrap();
        assert_eq!(ret.opcode, ir::Opcode::Return);
        assert_eq!(ret.left, Value::Immediate(0.0));
    }

    #[test]
    fn lowered_function_registers_its_parameters_in_the_param_table() {
        let checked = checked_program(vec![Item::Function(FunctionDecl {
            name: "add".to_string(),
            params: vec![
                Param { name: "a".to_string(), ty: TypeRef::Named("int32".to_string()) },
                Param { name: "b".to_string(), ty: TypeRef::Named("int32".to_string()) },
            ],
            return_type: Some(TypeRef::Named("int32".to_string())),
            body: vec![Stmt::Return(
                Some(Expr::Binary {
                    op: BinOp::Add,
                    left: Box::new(Expr::Identifier("a".to_string(), 1)),
                    right: Box::new(Expr::Identifier("b".to_string(), 1)),
                    line: 1,
                }),
                1,
            )],
            line: 1,
        })]);
        assert!(checked.success());
        let module = lower_program(&checked);
        let f = module.find_function("add").unwrap();
        assert_eq!(f.params.count(), 2);
        assert_eq!(f.params.find("a").unwrap().index, 0);
        assert_eq!(f.params.find("b").unwrap().index, 1);
        assert!(f.params.find("c").is_none());
    }
}
