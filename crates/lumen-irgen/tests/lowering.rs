//! End-to-end lowering tests: validate a hand-built tree, lower it, and
//! check the shape of the resulting module.

use lumen_ast::{
    ArrowBody, ArrowFunction, AssignmentExpression, AssignmentOperator, BinaryOperator, Block,
    BreakStatement, CatchClause, Expression, ExpressionStatement, ForInStatement, ForInTarget,
    ForStatement, FunctionDeclaration, FunctionLike, Identifier, LabelSlot, LabeledStatement,
    NumberLiteral, Program, ReturnStatement, SemSlot, Span, Statement, StrictnessCell,
    StringLiteral, SwitchCase, SwitchStatement, TryStatement, VariableDecl, VariableDeclarator,
};
use lumen_irgen::{
    generate_error_function, generate_program, lower_lazy_function, BasicBlockId, Function,
    FunctionId, FunctionKind, Instr, Literal, Module, Operand, PrettyPrint, Terminator,
};
use lumen_sema::{validate_function, validate_program, DiagnosticSink, SemContext};

fn ident(name: &str) -> Identifier {
    Identifier::new(name, Span::DUMMY)
}

fn directive(text: &str) -> Statement {
    Statement::Expression(ExpressionStatement {
        expression: Expression::StringLiteral(StringLiteral {
            value: text.to_string(),
            span: Span::DUMMY,
        }),
        span: Span::DUMMY,
    })
}

fn var_decl(names: &[&str]) -> Statement {
    Statement::VariableDecl(VariableDecl {
        declarators: names
            .iter()
            .map(|name| VariableDeclarator {
                id: ident(name),
                init: None,
                span: Span::DUMMY,
            })
            .collect(),
        span: Span::DUMMY,
    })
}

fn func_decl(name: &str, params: &[&str], body: Vec<Statement>) -> FunctionDeclaration {
    FunctionDeclaration {
        id: ident(name),
        params: params.iter().map(|p| ident(p)).collect(),
        body: Block::new(body, Span::DUMMY),
        strictness: StrictnessCell::not_set(),
        sem: SemSlot::new(),
        span: Span::DUMMY,
    }
}

fn ret(value: Option<Expression>) -> Statement {
    Statement::Return(ReturnStatement {
        value,
        span: Span::DUMMY,
    })
}

fn num(value: f64) -> Expression {
    Expression::NumberLiteral(NumberLiteral {
        value,
        span: Span::DUMMY,
    })
}

fn assign_global(name: &str, value: f64) -> Statement {
    Statement::Expression(ExpressionStatement {
        expression: Expression::Assignment(Box::new(AssignmentExpression {
            op: AssignmentOperator::Assign,
            target: Expression::Identifier(ident(name)),
            value: num(value),
            span: Span::DUMMY,
        })),
        span: Span::DUMMY,
    })
}

fn brk() -> Statement {
    Statement::Break(BreakStatement {
        label: None,
        target: LabelSlot::new(),
        span: Span::DUMMY,
    })
}

fn validate(program: &Program) -> SemContext<'_> {
    let mut sem = SemContext::new();
    let mut sink = DiagnosticSink::new();
    let ok = validate_program(&mut sem, &mut sink, program);
    assert!(ok, "unexpected validation errors: {:?}", sink.errors());
    sem
}

fn assert_all_terminated(module: &Module) {
    for func in &module.functions {
        if func.is_stub() {
            assert!(func.blocks.is_empty());
            continue;
        }
        for block in &func.blocks {
            assert!(
                block.is_terminated(),
                "unterminated block {} in {}:\n{}",
                block.id,
                func.name,
                module.pretty_print()
            );
        }
    }
}

fn frame_var_names(module: &Module, func: FunctionId) -> Vec<String> {
    module
        .function(func)
        .variables
        .iter()
        .map(|v| module.variable(*v).name.clone())
        .collect()
}

fn all_instrs(module: &Module, func: FunctionId) -> Vec<&Instr> {
    module
        .function(func)
        .blocks
        .iter()
        .flat_map(|b| b.instrs.iter())
        .collect()
}

fn block_containing(func: &Function, pred: impl Fn(&Instr) -> bool) -> BasicBlockId {
    func.blocks
        .iter()
        .find(|b| b.instrs.iter().any(|i| pred(i)))
        .map(|b| b.id)
        .expect("no block contains a matching instruction")
}

fn variable_named(module: &Module, name: &str) -> lumen_irgen::VariableId {
    let index = module
        .variables
        .iter()
        .position(|v| v.name == name)
        .unwrap_or_else(|| panic!("no variable named {:?}", name));
    lumen_irgen::VariableId(index as u32)
}

#[test]
fn test_duplicate_sloppy_params_share_one_variable() {
    // function f(a, a) { return a; }
    let program = Program::new(
        vec![Statement::FunctionDecl(func_decl(
            "f",
            &["a", "a"],
            vec![ret(Some(Expression::Identifier(ident("a"))))],
        ))],
        Span::DUMMY,
    );
    let sem = validate(&program);
    let module = generate_program(&sem, &program);
    assert_all_terminated(&module);

    let f = FunctionId(1);
    assert_eq!(module.function(f).params.len(), 3); // this, a, a
    let names = frame_var_names(&module, f);
    assert_eq!(names.iter().filter(|n| *n == "a").count(), 1);
}

#[test]
fn test_duplicate_strict_params_rejected_before_lowering() {
    let program = Program::new(
        vec![
            directive("use strict"),
            Statement::FunctionDecl(func_decl("f", &["a", "a"], vec![])),
        ],
        Span::DUMMY,
    );
    let mut sem = SemContext::new();
    let mut sink = DiagnosticSink::new();
    assert!(!validate_program(&mut sem, &mut sink, &program));
    assert_eq!(sink.error_count(), 1);
}

#[test]
fn test_hoisting_initializes_each_name_once() {
    // var a; var a, b; -> one variable per unique name, one undefined store
    let program = Program::new(vec![var_decl(&["a"]), var_decl(&["a", "b"])], Span::DUMMY);
    let sem = validate(&program);
    let module = generate_program(&sem, &program);
    assert_all_terminated(&module);

    let global = FunctionId(0);
    let names = frame_var_names(&module, global);
    assert_eq!(names, ["a", "b"]);

    let undef_stores = all_instrs(&module, global)
        .iter()
        .filter(|i| {
            matches!(
                i,
                Instr::StoreVar {
                    value: Operand::Literal(Literal::Undefined),
                    ..
                }
            )
        })
        .count();
    assert_eq!(undef_stores, 2);
}

#[test]
fn test_labeled_loop_break_resolves_to_exit_block() {
    // outer: for(;;) { break outer; }
    let for_label = LabelSlot::new();
    let program = Program::new(
        vec![Statement::Labeled(LabeledStatement {
            label: ident("outer"),
            body: Box::new(Statement::For(ForStatement {
                init: None,
                test: None,
                update: None,
                body: Box::new(Statement::Break(BreakStatement {
                    label: Some(ident("outer")),
                    target: LabelSlot::new(),
                    span: Span::DUMMY,
                })),
                label: for_label,
                span: Span::DUMMY,
            })),
            slot: LabelSlot::new(),
            span: Span::DUMMY,
        })],
        Span::DUMMY,
    );
    let sem = validate(&program);

    // The label lives on the loop, so break and a future continue share it.
    let loop_slot = match &program.body[0] {
        Statement::Labeled(l) => match l.body.as_ref() {
            Statement::For(f) => f.label.get(),
            _ => unreachable!(),
        },
        _ => unreachable!(),
    };
    assert_eq!(loop_slot, Some(0));

    let module = generate_program(&sem, &program);
    assert_all_terminated(&module);

    // The break's jump target must be a reachable block that falls through
    // to the function epilogue, not the loop header.
    let global = module.function(FunctionId(0));
    let has_return = global.blocks.iter().any(|b| {
        matches!(
            b.terminator,
            Some(Terminator::Return { .. })
        )
    });
    assert!(has_return, "{}", module.pretty_print());
}

#[test]
fn test_captured_this_shared_across_nested_arrows() {
    // function f() { () => () => this; }
    let inner = ArrowFunction {
        params: vec![],
        body: ArrowBody::Expression(Box::new(Expression::This(Span::DUMMY))),
        strictness: StrictnessCell::not_set(),
        sem: SemSlot::new(),
        span: Span::DUMMY,
    };
    let outer = ArrowFunction {
        params: vec![],
        body: ArrowBody::Expression(Box::new(Expression::Arrow(Box::new(inner)))),
        strictness: StrictnessCell::not_set(),
        sem: SemSlot::new(),
        span: Span::DUMMY,
    };
    let program = Program::new(
        vec![Statement::FunctionDecl(func_decl(
            "f",
            &[],
            vec![Statement::Expression(ExpressionStatement {
                expression: Expression::Arrow(Box::new(outer)),
                span: Span::DUMMY,
            })],
        ))],
        Span::DUMMY,
    );
    let sem = validate(&program);
    let module = generate_program(&sem, &program);
    assert_all_terminated(&module);

    // Exactly one captured-this slot, owned by the ordinary function.
    let f = FunctionId(1);
    let captured: Vec<_> = module
        .variables
        .iter()
        .enumerate()
        .filter(|(_, v)| v.name == "?this")
        .collect();
    assert_eq!(captured.len(), 1);
    assert_eq!(captured[0].1.owner, f);
    let captured_id = lumen_irgen::VariableId(captured[0].0 as u32);

    // The innermost arrow reads that exact slot, by reference.
    let innermost = module
        .functions
        .iter()
        .enumerate()
        .rev()
        .find(|(_, func)| func.kind == FunctionKind::Arrow)
        .map(|(i, _)| FunctionId(i as u32))
        .expect("no arrow function lowered");
    let reads_captured = all_instrs(&module, innermost)
        .iter()
        .any(|i| matches!(i, Instr::LoadVar { var, .. } if *var == captured_id));
    assert!(reads_captured, "{}", module.pretty_print());
}

#[test]
fn test_lazy_stub_and_resumption_agree_on_params() {
    let body = vec![ret(Some(Expression::Identifier(ident("x"))))];

    // Deferred: same statements, body marked lazy.
    let mut lazy_decl = func_decl("f", &["x"], body.clone());
    lazy_decl.body.is_lazy_body = true;
    lazy_decl.body.buffer_id = 7;
    let program = Program::new(vec![Statement::FunctionDecl(lazy_decl)], Span::DUMMY);

    let mut sem = SemContext::new();
    let mut sink = DiagnosticSink::new();
    assert!(validate_program(&mut sem, &mut sink, &program));
    let mut module = generate_program(&sem, &program);

    let stub_id = FunctionId(1);
    let stub = module.function(stub_id);
    assert!(stub.is_stub());
    assert!(stub.blocks.is_empty());
    let stub_params = stub.params.clone();
    let param_names: Vec<&str> = stub_params.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(param_names, ["this", "x"]);

    // The descriptor is a self-contained, serializable snapshot.
    let lazy = stub.lazy.clone().unwrap();
    assert_eq!(lazy.buffer_id, 7);
    let json = serde_json::to_string(&lazy).unwrap();
    let restored: lumen_irgen::LazySource = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, lazy);

    // Resumption: the host re-reads the body from the buffer; here that is
    // the same statements without the lazy marker.
    let eager_decl = func_decl("f", &["x"], body);
    assert!(validate_function(
        &mut sem,
        &mut sink,
        FunctionLike::Declaration(&eager_decl),
        false,
    ));
    lower_lazy_function(
        &sem,
        &mut module,
        stub_id,
        FunctionLike::Declaration(&eager_decl),
    );

    let resumed = module.function(stub_id);
    assert!(!resumed.is_stub());
    assert_eq!(resumed.params, stub_params);
    assert!(!resumed.blocks.is_empty());
    assert_all_terminated(&module);
}

#[test]
fn test_error_function_synthesis() {
    let mut module = Module::new();
    let id = generate_error_function(&mut module, "broken", "compilation failed");
    let func = module.function(id);
    assert_eq!(func.blocks.len(), 1);
    assert!(matches!(
        func.blocks[0].terminator,
        Some(Terminator::Throw { .. })
    ));
    assert!(func.blocks[0]
        .instrs
        .iter()
        .any(|i| matches!(i, Instr::NewError { message, .. } if message == "compilation failed")));
}

#[test]
fn test_straight_line_body_merges_into_single_block() {
    // The entry/continuation split is folded back when nothing else
    // targets the continuation.
    let program = Program::new(vec![var_decl(&["a"])], Span::DUMMY);
    let sem = validate(&program);
    let module = generate_program(&sem, &program);
    assert_eq!(module.function(FunctionId(0)).blocks.len(), 1);
    assert_all_terminated(&module);
}

#[test]
fn test_lazy_marked_arrow_body_lowers_eagerly() {
    // function f() { () => { return this; }; } with the arrow body marked
    // lazy: arrows are never stubbed, so the resumed-vs-eager question
    // never arises and the captured receiver stays shared.
    let arrow = ArrowFunction {
        params: vec![],
        body: ArrowBody::Block(Block {
            statements: vec![ret(Some(Expression::This(Span::DUMMY)))],
            is_lazy_body: true,
            buffer_id: 3,
            span: Span::DUMMY,
        }),
        strictness: StrictnessCell::not_set(),
        sem: SemSlot::new(),
        span: Span::DUMMY,
    };
    let program = Program::new(
        vec![Statement::FunctionDecl(func_decl(
            "f",
            &[],
            vec![Statement::Expression(ExpressionStatement {
                expression: Expression::Arrow(Box::new(arrow)),
                span: Span::DUMMY,
            })],
        ))],
        Span::DUMMY,
    );
    let sem = validate(&program);
    let module = generate_program(&sem, &program);
    assert_all_terminated(&module);

    let arrow_id = module
        .functions
        .iter()
        .position(|func| func.kind == FunctionKind::Arrow)
        .map(|i| FunctionId(i as u32))
        .expect("no arrow function lowered");
    let arrow_fn = module.function(arrow_id);
    assert!(!arrow_fn.is_stub());
    assert!(!arrow_fn.blocks.is_empty());

    // `this` inside the arrow reads the enclosing function's captured
    // slot, never a receiver of its own.
    let captured = variable_named(&module, "?this");
    let instrs = all_instrs(&module, arrow_id);
    assert!(
        instrs
            .iter()
            .any(|i| matches!(i, Instr::LoadVar { var, .. } if *var == captured)),
        "{}",
        module.pretty_print()
    );
    assert!(!instrs.iter().any(|i| matches!(i, Instr::LoadThis { .. })));
}

#[test]
fn test_for_in_enumerates_until_undefined_key() {
    // for (var k in o) {}
    let program = Program::new(
        vec![Statement::ForIn(ForInStatement {
            left: ForInTarget::VariableDecl(VariableDecl {
                declarators: vec![VariableDeclarator {
                    id: ident("k"),
                    init: None,
                    span: Span::DUMMY,
                }],
                span: Span::DUMMY,
            }),
            object: Expression::Identifier(ident("o")),
            body: Box::new(Statement::Empty(Span::DUMMY)),
            label: LabelSlot::new(),
            span: Span::DUMMY,
        })],
        Span::DUMMY,
    );
    let sem = validate(&program);
    let module = generate_program(&sem, &program);
    assert_all_terminated(&module);

    let global = FunctionId(0);
    let func = module.function(global);
    let instrs = all_instrs(&module, global);
    assert!(instrs.iter().any(|i| matches!(i, Instr::EnumBegin { .. })));

    // The condition block pulls the next key, compares it against
    // undefined and branches out on exhaustion.
    let cond = block_containing(func, |i| matches!(i, Instr::EnumNext { .. }));
    let cond_block = func.block(cond);
    assert!(cond_block.instrs.iter().any(|i| matches!(
        i,
        Instr::BinaryOp {
            op: BinaryOperator::StrictEqual,
            right: Operand::Literal(Literal::Undefined),
            ..
        }
    )));
    assert!(matches!(
        cond_block.terminator,
        Some(Terminator::Branch { .. })
    ));

    // Each key is bound to the hoisted loop variable.
    let k = variable_named(&module, "k");
    assert!(instrs
        .iter()
        .any(|i| matches!(i, Instr::StoreVar { var, value: Operand::Register(_) } if *var == k)));
}

#[test]
fn test_switch_fallthrough_and_mid_list_default() {
    // switch (x) { case 1: a = 1; default: a = 3; case 2: a = 2; break; }
    let program = Program::new(
        vec![Statement::Switch(SwitchStatement {
            discriminant: Expression::Identifier(ident("x")),
            cases: vec![
                SwitchCase {
                    test: Some(num(1.0)),
                    consequent: vec![assign_global("a", 1.0)],
                    span: Span::DUMMY,
                },
                SwitchCase {
                    test: None,
                    consequent: vec![assign_global("a", 3.0)],
                    span: Span::DUMMY,
                },
                SwitchCase {
                    test: Some(num(2.0)),
                    consequent: vec![assign_global("a", 2.0), brk()],
                    span: Span::DUMMY,
                },
            ],
            label: LabelSlot::new(),
            span: Span::DUMMY,
        })],
        Span::DUMMY,
    );
    let sem = validate(&program);
    let module = generate_program(&sem, &program);
    assert_all_terminated(&module);

    let global = FunctionId(0);
    let func = module.function(global);
    assert!(module.variables.iter().any(|v| v.name == "?switch"));

    // Two tested cases, each compared against the saved discriminant.
    let tests = all_instrs(&module, global)
        .iter()
        .filter(|i| {
            matches!(
                i,
                Instr::BinaryOp {
                    op: BinaryOperator::StrictEqual,
                    ..
                }
            )
        })
        .count();
    assert_eq!(tests, 2);

    let body_of = |value: f64| {
        block_containing(func, move |i| {
            matches!(
                i,
                Instr::StoreGlobal { value: Operand::Literal(Literal::Number(n)), .. }
                    if *n == value
            )
        })
    };
    let case1 = body_of(1.0);
    let default = body_of(3.0);
    let case2 = body_of(2.0);

    // Unterminated bodies fall through in source order, across the default.
    assert!(matches!(
        func.block(case1).terminator,
        Some(Terminator::Jump { target }) if target == default
    ));
    assert!(matches!(
        func.block(default).terminator,
        Some(Terminator::Jump { target }) if target == case2
    ));

    // The default body has two predecessors: the case 1 fallthrough and
    // the end of the test chain.
    let jumps_to_default = func
        .blocks
        .iter()
        .filter(|b| matches!(b.terminator, Some(Terminator::Jump { target }) if target == default))
        .count();
    assert_eq!(jumps_to_default, 2, "{}", module.pretty_print());
}

#[test]
fn test_try_catch_handler_reads_catch_param() {
    // try { a = 1; } catch (e) { b = e; }
    let program = Program::new(
        vec![Statement::Try(TryStatement {
            body: Block::new(vec![assign_global("a", 1.0)], Span::DUMMY),
            catch_clause: Some(CatchClause {
                param: Some(ident("e")),
                body: Block::new(
                    vec![Statement::Expression(ExpressionStatement {
                        expression: Expression::Assignment(Box::new(AssignmentExpression {
                            op: AssignmentOperator::Assign,
                            target: Expression::Identifier(ident("b")),
                            value: Expression::Identifier(ident("e")),
                            span: Span::DUMMY,
                        })),
                        span: Span::DUMMY,
                    })],
                    Span::DUMMY,
                ),
                span: Span::DUMMY,
            }),
            finally_clause: None,
            span: Span::DUMMY,
        })],
        Span::DUMMY,
    );
    let sem = validate(&program);
    let module = generate_program(&sem, &program);
    assert_all_terminated(&module);

    let global = FunctionId(0);
    let func = module.function(global);
    let handler = func
        .blocks
        .iter()
        .find_map(|b| {
            b.instrs.iter().find_map(|i| match i {
                Instr::TryBegin { handler } => Some(*handler),
                _ => None,
            })
        })
        .expect("no protected region");

    // The handler starts by reading the caught value, binds it to the
    // catch param's frame variable, and the body reads it back from there.
    let handler_block = func.block(handler);
    assert!(matches!(
        handler_block.instrs.first(),
        Some(Instr::CatchParam { .. })
    ));
    let e = variable_named(&module, "e");
    assert!(handler_block
        .instrs
        .iter()
        .any(|i| matches!(i, Instr::StoreVar { var, .. } if *var == e)));
    assert!(handler_block
        .instrs
        .iter()
        .any(|i| matches!(i, Instr::LoadVar { var, .. } if *var == e)));

    // The protected path leaves the region before joining the continuation.
    assert!(all_instrs(&module, global)
        .iter()
        .any(|i| matches!(i, Instr::TryEnd)));
}

#[test]
fn test_strictness_reaches_lowered_functions() {
    let program = Program::new(
        vec![
            directive("use strict"),
            Statement::FunctionDecl(func_decl("f", &[], vec![])),
        ],
        Span::DUMMY,
    );
    let sem = validate(&program);
    let module = generate_program(&sem, &program);
    assert!(module.function(FunctionId(0)).strict);
    assert!(module.function(FunctionId(1)).strict);
}
