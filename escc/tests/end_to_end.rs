//! Cross-module end-to-end scenarios (`spec.md §8`): source AST all the way
//! through type checking, lowering, optimization, and the `VM_BYTECODE`
//! backend's reference interpreter.

use escc::ast::*;
use escc::backend::vm::{emit_module, interpret, EsOpCode, EsValue};
use escc::lower::lower_program;
use escc::optimize::run_fixed_point;
use escc::typeck::TypeChecker;

fn run(items: Vec<Item>) -> Vec<String> {
    let program = Program { items };
    let checked = TypeChecker::new().check_program(&program);
    assert!(checked.success(), "type check failed: {:?}", checked.diagnostics);
    let mut module = lower_program(&checked);
    run_fixed_point(&mut module);
    let (chunk, link) = emit_module(&module);
    let outcome = interpret(&chunk, &link).expect("interpretation should succeed");
    outcome.console.lines().into_iter().map(str::to_string).collect()
}

#[test]
fn console_write_line_of_a_string_literal() {
    let lines = run(vec![Item::Statement(Stmt::ExprStmt(Expr::StaticMethodCall {
        class_name: "Console".to_string(),
        method: "WriteLine".to_string(),
        args: vec![Expr::StringLit("hi".to_string(), 1)],
        receiver: None,
        line: 1,
    }))]);
    assert_eq!(lines, vec!["hi"]);
}

#[test]
fn console_write_line_chunk_shape_matches_spec() {
    let program = Program {
        items: vec![Item::Statement(Stmt::ExprStmt(Expr::StaticMethodCall {
            class_name: "Console".to_string(),
            method: "WriteLine".to_string(),
            args: vec![Expr::StringLit("hi".to_string(), 1)],
            receiver: None,
            line: 1,
        }))],
    };
    let checked = TypeChecker::new().check_program(&program);
    assert!(checked.success());
    let module = lower_program(&checked);
    let (chunk, _link) = emit_module(&module);
    assert!(chunk.constants.iter().any(|c| matches!(c, EsValue::StringLiteral(s) if s == "hi")));
    assert!(chunk.code.contains(&(EsOpCode::Constant as u8)));
    assert!(chunk.code.contains(&(EsOpCode::Call as u8)));
    assert_eq!(chunk.code.last().copied(), Some(EsOpCode::Halt as u8));
}

#[test]
fn constant_folding_produces_a_single_store() {
    let program = Program {
        items: vec![Item::Statement(Stmt::Let(VariableDecl {
            name: "x".to_string(),
            ty: Some(TypeRef::Named("int32".to_string())),
            init: Some(Expr::Binary {
                op: BinOp::Add,
                left: Box::new(Expr::Number(2.0, 1)),
                right: Box::new(Expr::Binary {
                    op: BinOp::Mul,
                    left: Box::new(Expr::Number(3.0, 1)),
                    right: Box::new(Expr::Number(4.0, 1)),
                    line: 1,
                }),
                line: 1,
            }),
            line: 1,
        }))],
    };
    let checked = TypeChecker::new().check_program(&program);
    assert!(checked.success());
    let mut module = lower_program(&checked);
    run_fixed_point(&mut module);
    let main = module.find_function("main").unwrap();
    let entry = main.entry.unwrap();
    let block = main.blocks.get(entry);
    let stores: Vec<_> = block
        .instructions
        .iter()
        .filter(|i| i.opcode == escc::ir::Opcode::Store)
        .collect();
    assert_eq!(stores.len(), 1);
    assert_eq!(stores[0].right, escc::ir::Value::Immediate(14.0));
}

#[test]
fn function_call_prints_its_result() {
    let add = Item::Function(FunctionDecl {
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
    });
    let call = Item::Statement(Stmt::ExprStmt(Expr::StaticMethodCall {
        class_name: "Console".to_string(),
        method: "WriteLine".to_string(),
        args: vec![Expr::Call {
            callee: "add".to_string(),
            args: vec![Expr::Number(2.0, 2), Expr::Number(3.0, 2)],
            resolved: Resolved::default(),
            line: 2,
        }],
        receiver: None,
        line: 2,
    }));
    let lines = run(vec![add, call]);
    assert_eq!(lines, vec!["5"]);
}

#[test]
fn class_field_set_then_read_through_a_method() {
    let class = Item::Class(ClassDecl {
        name: "C".to_string(),
        members: vec![
            ClassMember {
                access: AccessModifier::Public,
                is_static: false,
                kind: ClassMemberKind::Field { name: "x".to_string(), ty: TypeRef::Named("int32".to_string()) },
            },
            ClassMember {
                access: AccessModifier::Public,
                is_static: false,
                kind: ClassMemberKind::Method(FunctionDecl {
                    name: "get".to_string(),
                    params: vec![],
                    return_type: Some(TypeRef::Named("int32".to_string())),
                    body: vec![Stmt::Return(
                        Some(Expr::MemberAccess {
                            object: Box::new(Expr::This(1)),
                            member: "x".to_string(),
                            resolved: Resolved::default(),
                            line: 1,
                        }),
                        1,
                    )],
                    line: 1,
                }),
            },
        ],
        line: 1,
    });

    let new_c = Item::Statement(Stmt::Let(VariableDecl {
        name: "c".to_string(),
        ty: None,
        init: Some(Expr::New { class_name: "C".to_string(), args: vec![], line: 2 }),
        line: 2,
    }));
    let set_x = Item::Statement(Stmt::Assign {
        target: AssignTarget::Member(Box::new(Expr::Identifier("c".to_string(), 3)), "x".to_string()),
        value: Expr::Number(7.0, 3),
        line: 3,
    });
    let write = Item::Statement(Stmt::ExprStmt(Expr::StaticMethodCall {
        class_name: "Console".to_string(),
        method: "WriteLine".to_string(),
        args: vec![Expr::StaticMethodCall {
            class_name: "C".to_string(),
            method: "get".to_string(),
            args: vec![],
            receiver: Some(Box::new(Expr::Identifier("c".to_string(), 4))),
            line: 4,
        }],
        receiver: None,
        line: 4,
    }));

    let lines = run(vec![class, new_c, set_x, write]);
    assert_eq!(lines, vec!["7"]);
}

#[test]
fn for_loop_prints_each_counter_value() {
    let for_loop = Item::Statement(Stmt::For {
        init: Some(Box::new(Stmt::Let(VariableDecl {
            name: "i".to_string(),
            ty: Some(TypeRef::Named("int32".to_string())),
            init: Some(Expr::Number(0.0, 1)),
            line: 1,
        }))),
        cond: Some(Expr::Binary {
            op: BinOp::Lt,
            left: Box::new(Expr::Identifier("i".to_string(), 1)),
            right: Box::new(Expr::Number(3.0, 1)),
            line: 1,
        }),
        incr: Some(Box::new(Stmt::Assign {
            target: AssignTarget::Name("i".to_string()),
            value: Expr::Binary {
                op: BinOp::Add,
                left: Box::new(Expr::Identifier("i".to_string(), 1)),
                right: Box::new(Expr::Number(1.0, 1)),
                line: 1,
            },
            line: 1,
        })),
        body: vec![Stmt::ExprStmt(Expr::StaticMethodCall {
            class_name: "Console".to_string(),
            method: "WriteLine".to_string(),
            args: vec![Expr::Identifier("i".to_string(), 1)],
            receiver: None,
            line: 1,
        })],
        line: 1,
    });
    let lines = run(vec![Item::Statement(for_loop)]);
    assert_eq!(lines, vec!["0", "1", "2"]);
}

#[test]
fn array_literal_index_prints_the_selected_element() {
    let decl = Item::Statement(Stmt::Let(VariableDecl {
        name: "a".to_string(),
        ty: None,
        init: Some(Expr::ArrayLiteral {
            elements: vec![Expr::Number(10.0, 1), Expr::Number(20.0, 1), Expr::Number(30.0, 1)],
            line: 1,
        }),
        line: 1,
    }));
    let print_it = Item::Statement(Stmt::ExprStmt(Expr::StaticMethodCall {
        class_name: "Console".to_string(),
        method: "WriteLine".to_string(),
        args: vec![Expr::ArrayAccess {
            array: Box::new(Expr::Identifier("a".to_string(), 2)),
            index: Box::new(Expr::Number(1.0, 2)),
            line: 2,
        }],
        receiver: None,
        line: 2,
    }));
    let lines = run(vec![decl, print_it]);
    assert_eq!(lines, vec!["20"]);
}
