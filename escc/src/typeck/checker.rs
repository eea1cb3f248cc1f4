//! Two-pass type checker (`spec.md §4.4`).
//!
//! Pass 1 (declarations) registers every top-level function and class
//! signature without checking bodies, so out-of-order references resolve.
//! Pass 2 (bodies) recursively checks statements and expressions against
//! those signatures.

use std::collections::HashMap;
use std::rc::Rc;

use crate::ast::*;
use crate::diagnostics::{DiagnosticKind, Diagnostics};

use super::console::{console_class, resolve_console_overload};
use super::scope::Scope;
use super::types::{Access, ClassInfo, Member, MemberKind, Type};

/// A checked function signature, with its parameter scope retained for
/// later return-type re-inference (`spec.md §9`).
#[derive(Debug, Clone)]
pub struct FunctionSig {
    pub name: String,
    pub params: Vec<(String, Type)>,
    pub return_type: Type,
    pub scope: Scope,
    pub body: Block,
}

/// Result of a successful or partially-successful type check.
#[derive(Debug)]
pub struct CheckedProgram {
    pub functions: HashMap<String, FunctionSig>,
    pub classes: HashMap<String, Rc<ClassInfo>>,
    /// Original class declarations, bodies intact — the checker itself
    /// only retains member *signatures* in `classes`, so `crate::lower`
    /// needs these to lower constructor/destructor/method bodies.
    pub class_decls: HashMap<String, ClassDecl>,
    pub main_statements: Vec<Stmt>,
    pub diagnostics: Diagnostics,
}

impl CheckedProgram {
    pub fn success(&self) -> bool {
        self.diagnostics.success()
    }
}

/// Two-pass type checker over a [`Program`].
pub struct TypeChecker {
    global: Rc<Scope>,
    functions: HashMap<String, FunctionSig>,
    classes: HashMap<String, Rc<ClassInfo>>,
    class_decls: HashMap<String, ClassDecl>,
    diagnostics: Diagnostics,
    /// Class-context stack, innermost last; empty outside any method body.
    class_stack: Vec<String>,
    /// Whether the function currently being checked is a (non-static)
    /// instance method — gates `this` (`spec.md §7`, "'this' outside
    /// instance method").
    in_instance_method: bool,
    /// Accumulator for return-type inference (`spec.md §4.4`): the type of
    /// the first `return` encountered while checking the current function
    /// or method body; later `return`s are checked against it instead of
    /// replacing it.
    current_return_acc: Option<Type>,
}

impl Default for TypeChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeChecker {
    pub fn new() -> Self {
        let global = Rc::new(Scope::root());
        let mut classes = HashMap::new();
        classes.insert("Console".to_string(), console_class());
        Self {
            global,
            functions: HashMap::new(),
            classes,
            class_decls: HashMap::new(),
            diagnostics: Diagnostics::new(),
            class_stack: Vec::new(),
            in_instance_method: false,
            current_return_acc: None,
        }
    }

    /// Check an entire program and consume the checker into the result.
    pub fn check_program(mut self, program: &Program) -> CheckedProgram {
        let mut main_statements = Vec::new();

        // Declarations pass: register every function/class signature.
        for item in &program.items {
            self.declare_item(item);
        }

        // Bodies pass: check function bodies, class method bodies, and
        // gather bare top-level statements into the implicit `main`.
        let function_names: Vec<String> = self.functions.keys().cloned().collect();
        for name in function_names {
            self.check_function_body(&name);
        }
        let class_names: Vec<String> = self.classes.keys().cloned().collect();
        for name in class_names {
            if name == "Console" {
                continue;
            }
            self.check_class_methods(&name);
        }
        for item in &program.items {
            if let Item::Statement(stmt) = item {
                self.check_stmt(stmt, &self.global.clone());
                main_statements.push(stmt.clone());
            }
        }

        CheckedProgram {
            functions: self.functions,
            classes: self.classes,
            class_decls: self.class_decls,
            main_statements,
            diagnostics: self.diagnostics,
        }
    }

    // ---- declarations pass ----

    fn declare_item(&mut self, item: &Item) {
        match item {
            Item::Function(f) | Item::StaticFunction(f) => self.declare_function(f),
            Item::Class(c) => self.declare_class(c),
            Item::Namespace(ns) => {
                for item in &ns.items {
                    self.declare_item(item);
                }
            }
            Item::Variable(v) | Item::StaticVariable(v) => {
                let ty = v
                    .ty
                    .as_ref()
                    .map(|t| self.resolve_type_ref(t))
                    .unwrap_or(Type::Unknown);
                self.global.declare(&v.name, ty);
            }
            Item::Statement(_) => {}
        }
    }

    fn declare_function(&mut self, f: &FunctionDecl) {
        let params: Vec<(String, Type)> = f
            .params
            .iter()
            .map(|p| (p.name.clone(), self.resolve_type_ref(&p.ty)))
            .collect();
        let return_type = f
            .return_type
            .as_ref()
            .map(|t| self.resolve_type_ref(t))
            .unwrap_or(Type::Void);
        let scope = self.global.child();
        for (name, ty) in &params {
            scope.declare(name, ty.clone());
        }
        self.functions.insert(
            f.name.clone(),
            FunctionSig {
                name: f.name.clone(),
                params,
                return_type,
                scope,
                body: f.body.clone(),
            },
        );
    }

    fn declare_class(&mut self, c: &ClassDecl) {
        self.class_decls.insert(c.name.clone(), c.clone());
        let member_scope = Scope::root();
        let mut members = Vec::new();
        let mut seen = std::collections::HashSet::new();
        for m in &c.members {
            let member_name = class_member_name(&m.kind);
            if !seen.insert(member_name.clone()) {
                self.diagnostics.error(
                    DiagnosticKind::DuplicateMember(member_name, c.name.clone()),
                    Some(c.line),
                );
                continue;
            }
            match &m.kind {
                ClassMemberKind::Field { name, ty } => {
                    members.push(Member {
                        name: name.clone(),
                        kind: MemberKind::Field,
                        access: access_of(m.access),
                        is_static: m.is_static,
                        ty: self.resolve_type_ref(ty),
                    });
                }
                ClassMemberKind::Method(f) => {
                    members.push(Member {
                        name: f.name.clone(),
                        kind: MemberKind::Method,
                        access: access_of(m.access),
                        is_static: m.is_static,
                        ty: self.function_type(f),
                    });
                }
                ClassMemberKind::Constructor(f) => {
                    members.push(Member {
                        name: "constructor".to_string(),
                        kind: MemberKind::Ctor,
                        access: access_of(m.access),
                        is_static: false,
                        ty: Type::Function {
                            return_type: Box::new(Type::Void),
                            params: f.params.iter().map(|p| self.resolve_type_ref(&p.ty)).collect(),
                        },
                    });
                }
                ClassMemberKind::Destructor(_) => {
                    members.push(Member {
                        name: "destructor".to_string(),
                        kind: MemberKind::Dtor,
                        access: access_of(m.access),
                        is_static: false,
                        ty: Type::Function {
                            return_type: Box::new(Type::Void),
                            params: vec![],
                        },
                    });
                }
                ClassMemberKind::Property { name, ty } => {
                    let ty = self.resolve_type_ref(ty);
                    members.push(Member {
                        name: name.clone(),
                        kind: MemberKind::Property,
                        access: access_of(m.access),
                        is_static: m.is_static,
                        ty: ty.clone(),
                    });
                    // Synthesize getter/setter peers (spec.md §4.4).
                    members.push(Member {
                        name: format!("get_{name}"),
                        kind: MemberKind::Method,
                        access: access_of(m.access),
                        is_static: m.is_static,
                        ty: Type::Function {
                            return_type: Box::new(ty.clone()),
                            params: vec![],
                        },
                    });
                    members.push(Member {
                        name: format!("set_{name}"),
                        kind: MemberKind::Method,
                        access: access_of(m.access),
                        is_static: m.is_static,
                        ty: Type::Function {
                            return_type: Box::new(Type::Void),
                            params: vec![ty],
                        },
                    });
                }
            }
        }
        let info = Rc::new(ClassInfo {
            name: c.name.clone(),
            members,
            member_scope: Rc::new(member_scope),
        });
        self.classes.insert(c.name.clone(), Rc::clone(&info));
        self.global
            .declare(&c.name, Type::Class { name: c.name.clone(), info });
    }

    fn function_type(&mut self, f: &FunctionDecl) -> Type {
        Type::Function {
            return_type: Box::new(
                f.return_type
                    .as_ref()
                    .map(|t| self.resolve_type_ref(t))
                    .unwrap_or(Type::Void),
            ),
            params: f.params.iter().map(|p| self.resolve_type_ref(&p.ty)).collect(),
        }
    }

    fn resolve_type_ref(&mut self, t: &TypeRef) -> Type {
        match t {
            TypeRef::Named(name) => match name.as_str() {
                "void" => Type::Void,
                "int8" => Type::Int8,
                "int16" => Type::Int16,
                "int32" => Type::Int32,
                "int64" => Type::Int64,
                "uint8" => Type::UInt8,
                "uint16" => Type::UInt16,
                "uint32" => Type::UInt32,
                "uint64" => Type::UInt64,
                "float32" => Type::Float32,
                "float64" => Type::Float64,
                "bool" => Type::Bool,
                "string" => Type::String,
                other => {
                    if let Some(Type::Class { .. }) = self.global.lookup(other).map(|s| s.ty) {
                        self.global.lookup(other).unwrap().ty
                    } else if let Some(info) = self.classes.get(other) {
                        Type::Class {
                            name: other.to_string(),
                            info: Rc::clone(info),
                        }
                    } else {
                        self.diagnostics
                            .warn(DiagnosticKind::LateClassInfo(other.to_string()), None);
                        Type::Unknown
                    }
                }
            },
            TypeRef::Pointer(inner) => Type::Pointer(Box::new(self.resolve_type_ref(inner))),
            TypeRef::Array(inner, n) => Type::Array(Box::new(self.resolve_type_ref(inner)), *n),
        }
    }

    // ---- bodies pass ----

    fn check_function_body(&mut self, name: &str) {
        let sig = self.functions.get(name).cloned().expect("declared above");
        let infer = sig.return_type == Type::Void;
        self.current_return_acc = None;
        for stmt in &sig.body {
            self.check_stmt(stmt, &sig.scope);
        }
        if infer {
            if let Some(f) = self.functions.get_mut(name) {
                f.return_type = self.current_return_acc.take().unwrap_or(Type::Void);
            }
        }
        self.current_return_acc = None;
    }

    fn check_class_methods(&mut self, name: &str) {
        let Some(decl) = self.class_decls.get(name).cloned() else {
            return;
        };
        for m in &decl.members {
            match &m.kind {
                ClassMemberKind::Method(f) => self.check_method_body(name, f, m.is_static),
                ClassMemberKind::Constructor(f) => self.check_method_body(name, f, false),
                ClassMemberKind::Destructor(f) => self.check_method_body(name, f, false),
                ClassMemberKind::Field { .. } | ClassMemberKind::Property { .. } => {}
            }
        }
    }

    pub fn check_method_body(
        &mut self,
        class_name: &str,
        method: &FunctionDecl,
        is_static: bool,
    ) {
        let scope = self.global.child();
        if !is_static {
            if let Some(Type::Class { info, .. }) = self.global.lookup(class_name).map(|s| s.ty) {
                scope.declare("this", Type::Pointer(Box::new(Type::Class {
                    name: class_name.to_string(),
                    info,
                })));
            }
        }
        for p in &method.params {
            let ty = self.resolve_type_ref(&p.ty);
            scope.declare(&p.name, ty);
        }
        self.class_stack.push(class_name.to_string());
        self.in_instance_method = !is_static;
        self.current_return_acc = None;
        for stmt in &method.body {
            self.check_stmt(stmt, &scope);
        }
        self.current_return_acc = None;
        self.in_instance_method = false;
        self.class_stack.pop();
    }

    /// Record a `return` statement's type against the running inference
    /// accumulator (`spec.md §4.4`): the first `return` seen wins; later
    /// ones are checked for compatibility rather than replacing it.
    fn record_return(&mut self, ty: Type, line: u32) {
        match self.current_return_acc.clone() {
            None => self.current_return_acc = Some(ty),
            Some(first) => {
                if !first.compatible(&ty) {
                    self.diagnostics.error(
                        DiagnosticKind::IncompatibleTypes(format!("{first:?}"), format!("{ty:?}")),
                        Some(line),
                    );
                }
            }
        }
    }

    fn check_stmt(&mut self, stmt: &Stmt, scope: &Scope) {
        match stmt {
            Stmt::Let(v) => {
                let declared = v.ty.as_ref().map(|t| self.resolve_type_ref(t));
                let init_ty = v.init.as_ref().map(|e| self.check_expr(e, scope));
                let ty = match (declared, init_ty) {
                    (Some(d), Some(i)) => {
                        if !d.assignable_from(&i) {
                            self.diagnostics.error(
                                DiagnosticKind::IncompatibleTypes(format!("{d:?}"), format!("{i:?}")),
                                Some(v.line),
                            );
                        }
                        d
                    }
                    (Some(d), None) => d,
                    (None, Some(i)) => i,
                    (None, None) => Type::Unknown,
                };
                scope.declare(&v.name, ty);
            }
            Stmt::Assign { target, value, line } => {
                let value_ty = self.check_expr(value, scope);
                self.check_assign_target(target, &value_ty, *line, scope);
            }
            Stmt::CompoundAssign { target, value, line, .. } => {
                let value_ty = self.check_expr(value, scope);
                self.check_assign_target(target, &value_ty, *line, scope);
            }
            Stmt::ExprStmt(e) => {
                self.check_expr(e, scope);
            }
            Stmt::Return(Some(e), line) => {
                let ty = self.check_expr(e, scope);
                self.record_return(ty, *line);
            }
            Stmt::Return(None, line) => {
                self.record_return(Type::Void, *line);
            }
            Stmt::If {
                cond,
                then_branch,
                else_branch,
                ..
            } => {
                self.check_expr(cond, scope);
                let then_scope = scope.child();
                for s in then_branch {
                    self.check_stmt(s, &then_scope);
                }
                if let Some(else_b) = else_branch {
                    let else_scope = scope.child();
                    for s in else_b {
                        self.check_stmt(s, &else_scope);
                    }
                }
            }
            Stmt::While { cond, body, .. } => {
                self.check_expr(cond, scope);
                let body_scope = scope.child();
                for s in body {
                    self.check_stmt(s, &body_scope);
                }
            }
            Stmt::For {
                init,
                cond,
                incr,
                body,
                ..
            } => {
                let for_scope = scope.child();
                if let Some(i) = init {
                    self.check_stmt(i, &for_scope);
                }
                if let Some(c) = cond {
                    self.check_expr(c, &for_scope);
                }
                if let Some(i) = incr {
                    self.check_stmt(i, &for_scope);
                }
                for s in body {
                    self.check_stmt(s, &for_scope);
                }
            }
            Stmt::ForEach { var, iter, body, .. } => {
                self.check_expr(iter, scope);
                let body_scope = scope.child();
                body_scope.declare(var, Type::Unknown);
                for s in body {
                    self.check_stmt(s, &body_scope);
                }
            }
            Stmt::Switch {
                scrutinee,
                cases,
                default,
                ..
            } => {
                self.check_expr(scrutinee, scope);
                for (case_expr, body) in cases {
                    self.check_expr(case_expr, scope);
                    let case_scope = scope.child();
                    for s in body {
                        self.check_stmt(s, &case_scope);
                    }
                }
                if let Some(body) = default {
                    let default_scope = scope.child();
                    for s in body {
                        self.check_stmt(s, &default_scope);
                    }
                }
            }
            Stmt::Break(_) | Stmt::Continue(_) => {}
            Stmt::Try {
                body,
                catch_name,
                catch_body,
                finally_body,
                ..
            } => {
                let body_scope = scope.child();
                for s in body {
                    self.check_stmt(s, &body_scope);
                }
                let catch_scope = scope.child();
                if let Some(name) = catch_name {
                    catch_scope.declare(name, Type::Unknown);
                }
                for s in catch_body {
                    self.check_stmt(s, &catch_scope);
                }
                if let Some(f) = finally_body {
                    let finally_scope = scope.child();
                    for s in f {
                        self.check_stmt(s, &finally_scope);
                    }
                }
            }
            Stmt::Throw(e, _) => {
                let ty = self.check_expr(e, scope);
                if !(ty.compatible(&Type::Pointer(Box::new(Type::Void))) || ty == Type::String) {
                    self.diagnostics.warn(
                        DiagnosticKind::IncompatibleTypes("throw operand".into(), format!("{ty:?}")),
                        None,
                    );
                }
            }
            Stmt::Delete(e, _) => {
                self.check_expr(e, scope);
            }
            Stmt::Block(body) => {
                let inner = scope.child();
                for s in body {
                    self.check_stmt(s, &inner);
                }
            }
        }
    }

    fn check_assign_target(&mut self, target: &AssignTarget, value_ty: &Type, line: u32, scope: &Scope) {
        match target {
            AssignTarget::Name(name) => {
                if let Some(sym) = scope.lookup(name) {
                    if !sym.ty.assignable_from(value_ty) {
                        self.diagnostics.error(
                            DiagnosticKind::IncompatibleTypes(format!("{:?}", sym.ty), format!("{value_ty:?}")),
                            Some(line),
                        );
                    }
                } else {
                    self.diagnostics
                        .error(DiagnosticKind::UnknownIdentifier(name.clone()), Some(line));
                }
            }
            AssignTarget::ArrayIndex(arr, idx) => {
                self.check_expr(arr, scope);
                self.check_expr(idx, scope);
            }
            AssignTarget::Member(obj, _member) => {
                self.check_expr(obj, scope);
            }
        }
    }

    fn check_expr(&mut self, expr: &Expr, scope: &Scope) -> Type {
        match expr {
            Expr::Number(_, _) => Type::Float64,
            Expr::StringLit(_, _) => Type::String,
            Expr::Bool(_, _) => Type::Bool,
            Expr::Identifier(name, line) => scope.lookup(name).map(|s| s.ty).unwrap_or_else(|| {
                self.diagnostics
                    .error(DiagnosticKind::UnknownIdentifier(name.clone()), Some(*line));
                Type::Unknown
            }),
            Expr::This(line) => {
                if !self.in_instance_method {
                    self.diagnostics
                        .error(DiagnosticKind::ThisOutsideInstanceMethod, Some(*line));
                    return Type::Unknown;
                }
                scope.lookup("this").map(|s| s.ty).unwrap_or(Type::Unknown)
            }
            Expr::Binary { left, right, line, .. } => {
                let l = self.check_expr(left, scope);
                let r = self.check_expr(right, scope);
                if !l.compatible(&r) {
                    self.diagnostics.error(
                        DiagnosticKind::IncompatibleTypes(format!("{l:?}"), format!("{r:?}")),
                        Some(*line),
                    );
                    Type::Unknown
                } else if l == Type::String || r == Type::String {
                    Type::String
                } else {
                    l
                }
            }
            Expr::Unary { operand, .. } => self.check_expr(operand, scope),
            Expr::Ternary {
                cond,
                then_expr,
                else_expr,
                line,
            } => {
                self.check_expr(cond, scope);
                let t = self.check_expr(then_expr, scope);
                let e = self.check_expr(else_expr, scope);
                if !t.compatible(&e) {
                    self.diagnostics.error(
                        DiagnosticKind::IncompatibleTypes(format!("{t:?}"), format!("{e:?}")),
                        Some(*line),
                    );
                }
                t
            }
            Expr::Call {
                callee,
                args,
                resolved,
                line,
            } => {
                let arg_types: Vec<Type> = args.iter().map(|a| self.check_expr(a, scope)).collect();
                if let Some(sig) = self.functions.get(callee).cloned() {
                    if sig.params.len() != args.len() {
                        self.diagnostics.error(
                            DiagnosticKind::WrongArgumentCount(callee.clone(), sig.params.len(), args.len()),
                            Some(*line),
                        );
                    }
                    sig.return_type
                } else {
                    self.diagnostics.warn(
                        DiagnosticKind::UseBeforeDefinition(callee.clone()),
                        Some(*line),
                    );
                    *resolved.resolved_class_name.borrow_mut() = None;
                    let _ = arg_types;
                    Type::Unknown
                }
            }
            Expr::StaticMethodCall {
                class_name,
                method,
                args,
                receiver,
                line,
            } => {
                if let Some(recv) = receiver {
                    self.check_expr(recv, scope);
                }
                let arg_types: Vec<Type> = args.iter().map(|a| self.check_expr(a, scope)).collect();
                let Some(class) = self.classes.get(class_name).cloned() else {
                    self.diagnostics
                        .error(DiagnosticKind::UnknownClass(class_name.clone()), Some(*line));
                    return Type::Unknown;
                };
                if class_name == "Console" {
                    let arg_ty = arg_types.first().cloned().unwrap_or(Type::Unknown);
                    return resolve_console_overload(&class, method, &arg_ty)
                        .map(|m| match &m.ty {
                            Type::Function { return_type, .. } => (**return_type).clone(),
                            _ => Type::Void,
                        })
                        .unwrap_or(Type::Void);
                }
                match class.find_member(method) {
                    Some(Member { ty: Type::Function { return_type, params }, .. }) => {
                        if params.len() != args.len() {
                            self.diagnostics.error(
                                DiagnosticKind::WrongArgumentCount(method.clone(), params.len(), args.len()),
                                Some(*line),
                            );
                        }
                        (**return_type).clone()
                    }
                    Some(_) | None => {
                        self.diagnostics.error(
                            DiagnosticKind::UnknownMember(method.clone(), class_name.clone()),
                            Some(*line),
                        );
                        Type::Unknown
                    }
                }
            }
            Expr::MemberAccess {
                object,
                member,
                resolved,
                line,
            } => {
                let object_ty = self.check_expr(object, scope);
                let class_info = match &object_ty {
                    Type::Class { name, info } => {
                        *resolved.resolved_class_name.borrow_mut() = Some(name.clone());
                        Some(Rc::clone(info))
                    }
                    Type::Pointer(inner) => match &**inner {
                        Type::Class { name, info } => {
                            *resolved.resolved_class_name.borrow_mut() = Some(name.clone());
                            Some(Rc::clone(info))
                        }
                        _ => None,
                    },
                    Type::Unknown => None,
                    _ => None,
                };
                let Some(info) = class_info else {
                    if object_ty != Type::Unknown {
                        self.diagnostics.error(
                            DiagnosticKind::UnknownMember(member.clone(), format!("{object_ty:?}")),
                            Some(*line),
                        );
                    }
                    return Type::Unknown;
                };
                match info.find_member(member) {
                    Some(m) => {
                        if m.access != Access::Public
                            && self.class_stack.last() != Some(&info.name)
                        {
                            self.diagnostics
                                .error(DiagnosticKind::AccessViolation(member.clone()), Some(*line));
                        }
                        m.ty.clone()
                    }
                    None => {
                        self.diagnostics.error(
                            DiagnosticKind::UnknownMember(member.clone(), info.name.clone()),
                            Some(*line),
                        );
                        Type::Unknown
                    }
                }
            }
            Expr::ArrayAccess { array, index, .. } => {
                let arr_ty = self.check_expr(array, scope);
                self.check_expr(index, scope);
                match arr_ty {
                    Type::Array(elem, _) => *elem,
                    Type::Pointer(elem) => *elem,
                    _ => Type::Unknown,
                }
            }
            Expr::ArrayLiteral { elements, .. } => {
                let mut elem_ty = Type::Unknown;
                for e in elements {
                    elem_ty = self.check_expr(e, scope);
                }
                Type::Array(Box::new(elem_ty), elements.len())
            }
            Expr::New { class_name, args, line } => {
                let arg_types: Vec<Type> = args.iter().map(|a| self.check_expr(a, scope)).collect();
                let _ = arg_types;
                match self.classes.get(class_name).cloned() {
                    Some(info) => Type::Pointer(Box::new(Type::Class {
                        name: class_name.clone(),
                        info,
                    })),
                    None => {
                        self.diagnostics
                            .error(DiagnosticKind::UnknownClass(class_name.clone()), Some(*line));
                        Type::Unknown
                    }
                }
            }
            Expr::Lambda { line, .. } => {
                self.diagnostics.warn(
                    DiagnosticKind::Unsupported("lambda expressions (deferred)".into()),
                    Some(*line),
                );
                Type::Unknown
            }
            Expr::Linq { line, .. } => {
                self.diagnostics
                    .warn(DiagnosticKind::Unsupported("LINQ expressions (deferred)".into()), Some(*line));
                Type::Unknown
            }
        }
    }
}

fn access_of(a: AccessModifier) -> Access {
    match a {
        AccessModifier::Public => Access::Public,
        AccessModifier::Private => Access::Private,
        AccessModifier::Protected => Access::Protected,
    }
}

fn class_member_name(kind: &ClassMemberKind) -> String {
    match kind {
        ClassMemberKind::Field { name, .. } => name.clone(),
        ClassMemberKind::Method(f) => f.name.clone(),
        ClassMemberKind::Constructor(_) => "constructor".to_string(),
        ClassMemberKind::Destructor(_) => "destructor".to_string(),
        ClassMemberKind::Property { name, .. } => name.clone(),
    }
}
