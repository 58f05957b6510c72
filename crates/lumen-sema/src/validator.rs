//! Semantic validator
//!
//! Single top-down traversal that fills in the `SemContext` and rejects
//! semantically invalid programs. Errors accumulate in the sink; the pass
//! never stops early, so one run surfaces as many independent errors as
//! possible. Success is "the error count did not increase".

use lumen_ast::{
    ArrowBody, Expression, ForInTarget, ForInit, FunctionInfoId, FunctionLike, Identifier,
    LabelSlot, LabeledStatement, Program, Statement, Strictness, TryStatement, UnaryOperator,
    VariableDecl,
};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::context::{FunctionInfo, SemContext};
use crate::error::{DiagnosticSink, SemError};

const IDENT_ARGUMENTS: &str = "arguments";
const IDENT_EVAL: &str = "eval";
const DIRECTIVE_USE_STRICT: &str = "use strict";

/// Validate a whole program tree.
///
/// Returns true on success. Semantic facts are recorded into `sem`; errors
/// into `sink`.
pub fn validate_program<'ast>(
    sem: &mut SemContext<'ast>,
    sink: &mut DiagnosticSink,
    program: &'ast Program,
) -> bool {
    Validator::new(sem, sink).run_program(program)
}

/// Validate an individually-compiled function with the given ambient
/// strictness (used when resuming a deferred function body).
pub fn validate_function<'ast>(
    sem: &mut SemContext<'ast>,
    sink: &mut DiagnosticSink,
    func: FunctionLike<'ast>,
    strict: bool,
) -> bool {
    Validator::new(sem, sink).run_function(func, strict)
}

/// A label currently in scope, name -> declaration + target facts.
struct ActiveLabel {
    /// Index into the function's label table.
    slot: u32,
    /// Whether the labeled target is a loop (legal `continue` target).
    is_loop: bool,
}

/// Per-function state during validation. Lives on an explicit stack; the
/// entry below it is the enclosing function's context.
struct FunctionContext<'ast> {
    info: FunctionInfoId,
    is_arrow: bool,
    /// True only for the program root ("global scope" context).
    is_global: bool,
    strict: bool,
    /// Labels currently in scope in this function.
    label_map: FxHashMap<String, ActiveLabel>,
    /// Per-function id of the innermost active try statement.
    active_try: Option<u32>,
    try_count: u32,
    /// Break/continue target slot of the innermost active loop.
    active_loop: Option<&'ast LabelSlot>,
    /// Break target slot of the innermost active loop or switch.
    active_switch_or_loop: Option<&'ast LabelSlot>,
}

impl<'ast> FunctionContext<'ast> {
    fn new(info: FunctionInfoId, is_arrow: bool, is_global: bool, strict: bool) -> Self {
        FunctionContext {
            info,
            is_arrow,
            is_global,
            strict,
            label_map: FxHashMap::default(),
            active_try: None,
            try_count: 0,
            active_loop: None,
            active_switch_or_loop: None,
        }
    }
}

/// The validation pass.
pub struct Validator<'a, 'ast> {
    sem: &'a mut SemContext<'ast>,
    sink: &'a mut DiagnosticSink,
    /// Error count on entry; success means it did not grow.
    initial_error_count: usize,
    contexts: Vec<FunctionContext<'ast>>,
}

impl<'a, 'ast> Validator<'a, 'ast> {
    /// Create a validator writing into the given context and sink.
    pub fn new(sem: &'a mut SemContext<'ast>, sink: &'a mut DiagnosticSink) -> Self {
        let initial_error_count = sink.error_count();
        Validator {
            sem,
            sink,
            initial_error_count,
            contexts: Vec::new(),
        }
    }

    /// Validate a whole program.
    pub fn run_program(mut self, program: &'ast Program) -> bool {
        let preset_strict = program.strictness.get().is_strict();
        self.visit_function_like(FunctionLike::Program(program), preset_strict);
        self.finish()
    }

    /// Validate an individual function.
    pub fn run_function(mut self, func: FunctionLike<'ast>, strict: bool) -> bool {
        self.visit_function_like(func, strict);
        self.finish()
    }

    fn finish(self) -> bool {
        debug_assert!(self.contexts.is_empty(), "unbalanced function contexts");
        self.sink.error_count() == self.initial_error_count
    }

    // ---- context helpers ----------------------------------------------

    fn cur(&self) -> &FunctionContext<'ast> {
        self.contexts.last().expect("no active function context")
    }

    fn cur_mut(&mut self) -> &mut FunctionContext<'ast> {
        self.contexts.last_mut().expect("no active function context")
    }

    fn cur_info_mut(&mut self) -> &mut FunctionInfo<'ast> {
        let id = self.cur().info;
        self.sem.info_mut(id)
    }

    // ---- function-like nodes ------------------------------------------

    /// Push a fresh context, derive strictness, validate name/params, then
    /// recurse into the body. Pop is unconditional; every early diagnostic
    /// path still falls through to it.
    fn visit_function_like(&mut self, func: FunctionLike<'ast>, inherited_strict: bool) {
        let id = self.sem.alloc();
        func.sem().set(id);

        self.contexts.push(FunctionContext::new(
            id,
            func.is_arrow(),
            matches!(func, FunctionLike::Program(_)),
            inherited_strict,
        ));

        if func.is_arrow() {
            self.mark_contains_arrow();
        }

        // Directive prologue can only upgrade to strict, never downgrade.
        match func {
            FunctionLike::Program(p) => self.scan_directive_prologue(&p.body),
            _ => {
                if let Some(block) = func.body_block() {
                    self.scan_directive_prologue(&block.statements);
                }
            }
        }
        self.update_node_strictness(func);
        let strict = self.cur().strict;
        self.sem.info_mut(id).strict = strict;

        match func {
            FunctionLike::Declaration(f) => self.validate_declaration_name(&f.id),
            FunctionLike::Expression(f) => {
                if let Some(name) = &f.id {
                    self.validate_declaration_name(name);
                }
            }
            _ => {}
        }
        self.validate_params(func.params());

        match func {
            FunctionLike::Program(p) => {
                for stmt in &p.body {
                    self.validate_stmt(stmt);
                }
            }
            FunctionLike::Declaration(f) => {
                for stmt in &f.body.statements {
                    self.validate_stmt(stmt);
                }
            }
            FunctionLike::Expression(f) => {
                for stmt in &f.body.statements {
                    self.validate_stmt(stmt);
                }
            }
            FunctionLike::Arrow(f) => match &f.body {
                ArrowBody::Expression(expr) => self.validate_expr(expr),
                ArrowBody::Block(block) => {
                    for stmt in &block.statements {
                        self.validate_stmt(stmt);
                    }
                }
            },
        }

        self.contexts.pop();
    }

    /// Record that an arrow function is nested inside every enclosing
    /// function up to and including the nearest non-arrow one.
    fn mark_contains_arrow(&mut self) {
        let n = self.contexts.len();
        for i in (0..n.saturating_sub(1)).rev() {
            let info = self.contexts[i].info;
            let is_arrow = self.contexts[i].is_arrow;
            self.sem.info_mut(info).contains_arrow_functions = true;
            if !is_arrow {
                break;
            }
        }
    }

    /// An `arguments` reference inside an arrow: flag the chain up to the
    /// nearest non-arrow function so its arguments object gets captured.
    fn note_arguments_usage(&mut self) {
        if !self.cur().is_arrow {
            return;
        }
        for i in (0..self.contexts.len()).rev() {
            let info = self.contexts[i].info;
            let is_arrow = self.contexts[i].is_arrow;
            self.sem
                .info_mut(info)
                .contains_arrow_functions_using_arguments = true;
            if !is_arrow {
                break;
            }
        }
    }

    /// Scan the maximal leading run of bare string-literal expression
    /// statements. "use strict" among them makes the function strict.
    fn scan_directive_prologue(&mut self, body: &'ast [Statement]) {
        for stmt in body {
            let directive = match stmt {
                Statement::Expression(es) => match es.directive() {
                    Some(d) => d,
                    None => break,
                },
                _ => break,
            };
            if directive == DIRECTIVE_USE_STRICT {
                self.cur_mut().strict = true;
            }
        }
    }

    /// Record the derived strictness on the node. If the tree producer
    /// preset it, the derived value must agree.
    fn update_node_strictness(&mut self, func: FunctionLike<'ast>) {
        let derived = if self.cur().strict {
            Strictness::Strict
        } else {
            Strictness::NonStrict
        };
        let cell = func.strictness();
        debug_assert!(
            cell.get() == Strictness::NotSet || cell.get() == derived,
            "preset strictness disagrees with directive prologue"
        );
        cell.set(derived);
    }

    fn validate_params(&mut self, params: &'ast [Identifier]) {
        let strict = self.cur().strict;
        let mut seen: FxHashSet<&str> = FxHashSet::default();
        for param in params {
            self.validate_declaration_name(param);
            if strict && !seen.insert(param.name.as_str()) {
                self.sink.error(SemError::DuplicateStrictParam {
                    name: param.name.clone(),
                    span: param.span,
                });
            }
        }
    }

    // ---- names and assignment targets ---------------------------------

    /// In strict mode `arguments` and `eval` cannot be declaration targets.
    fn is_valid_declaration_name(&self, id: &Identifier) -> bool {
        !(self.cur().strict && (id.name == IDENT_ARGUMENTS || id.name == IDENT_EVAL))
    }

    fn validate_declaration_name(&mut self, id: &Identifier) {
        if !self.is_valid_declaration_name(id) {
            self.sink.error(SemError::InvalidDeclarationName {
                name: id.name.clone(),
                span: id.span,
            });
        }
    }

    /// Something that can be assigned to: a variable (subject to strict
    /// restrictions) or a property access.
    fn is_lvalue(&self, expr: &Expression) -> bool {
        match expr {
            Expression::Member(_) => true,
            Expression::Identifier(id) => self.is_valid_declaration_name(id),
            _ => false,
        }
    }

    fn check_assignment_target(&mut self, expr: &Expression) {
        if !self.is_lvalue(expr) {
            self.sink.error(SemError::InvalidAssignmentTarget {
                span: expr.span(),
            });
        }
    }

    // ---- statements -----------------------------------------------------

    fn validate_stmt(&mut self, stmt: &'ast Statement) {
        match stmt {
            Statement::VariableDecl(decl) => self.visit_variable_decl(decl),
            Statement::FunctionDecl(func) => {
                // Hoisted: record in the enclosing function's closures.
                self.cur_info_mut().closures.push(func);
                let strict = self.cur().strict;
                self.visit_function_like(FunctionLike::Declaration(func), strict);
            }
            Statement::Expression(es) => self.validate_expr(&es.expression),
            Statement::Block(block) => {
                for stmt in &block.statements {
                    self.validate_stmt(stmt);
                }
            }
            Statement::If(s) => {
                self.validate_expr(&s.condition);
                self.validate_stmt(&s.then_branch);
                if let Some(else_branch) = &s.else_branch {
                    self.validate_stmt(else_branch);
                }
            }
            Statement::While(s) => {
                self.validate_expr(&s.condition);
                self.visit_loop_body(&s.label, &s.body);
            }
            Statement::DoWhile(s) => {
                self.visit_loop_body(&s.label, &s.body);
                self.validate_expr(&s.condition);
            }
            Statement::For(s) => {
                match &s.init {
                    Some(ForInit::VariableDecl(decl)) => self.visit_variable_decl(decl),
                    Some(ForInit::Expression(expr)) => self.validate_expr(expr),
                    None => {}
                }
                if let Some(test) = &s.test {
                    self.validate_expr(test);
                }
                if let Some(update) = &s.update {
                    self.validate_expr(update);
                }
                self.visit_loop_body(&s.label, &s.body);
            }
            Statement::ForIn(s) => {
                match &s.left {
                    ForInTarget::VariableDecl(decl) => self.visit_variable_decl(decl),
                    ForInTarget::Pattern(expr) => {
                        self.check_assignment_target(expr);
                        self.validate_expr(expr);
                    }
                }
                self.validate_expr(&s.object);
                self.visit_loop_body(&s.label, &s.body);
            }
            Statement::Labeled(s) => self.visit_labeled(s),
            Statement::Break(s) => {
                match &s.label {
                    Some(name) => match self.cur().label_map.get(&name.name) {
                        Some(label) => s.target.set(label.slot),
                        None => self.sink.error(SemError::UnresolvedLabel {
                            name: name.name.clone(),
                            span: name.span,
                        }),
                    },
                    None => {
                        let target = self.cur().active_switch_or_loop;
                        match self.resolve_unlabeled_target(target) {
                            Some(index) => s.target.set(index),
                            None => self
                                .sink
                                .error(SemError::BreakOutsideLoopOrSwitch { span: s.span }),
                        }
                    }
                }
            }
            Statement::Continue(s) => {
                match &s.label {
                    Some(name) => match self.cur().label_map.get(&name.name) {
                        Some(label) if label.is_loop => s.target.set(label.slot),
                        Some(_) => self.sink.error(SemError::ContinueTargetNotLoop {
                            name: name.name.clone(),
                            span: s.span,
                        }),
                        None => self.sink.error(SemError::UnresolvedLabel {
                            name: name.name.clone(),
                            span: name.span,
                        }),
                    },
                    None => {
                        let target = self.cur().active_loop;
                        match self.resolve_unlabeled_target(target) {
                            Some(index) => s.target.set(index),
                            None => self
                                .sink
                                .error(SemError::ContinueOutsideLoop { span: s.span }),
                        }
                    }
                }
            }
            Statement::Return(s) => {
                if self.cur().is_global {
                    self.sink
                        .error(SemError::ReturnOutsideFunction { span: s.span });
                }
                if let Some(value) = &s.value {
                    self.validate_expr(value);
                }
            }
            Statement::Switch(s) => {
                self.validate_expr(&s.discriminant);
                let old = self.cur_mut().active_switch_or_loop.replace(&s.label);
                for case in &s.cases {
                    if let Some(test) = &case.test {
                        self.validate_expr(test);
                    }
                    for stmt in &case.consequent {
                        self.validate_stmt(stmt);
                    }
                }
                self.cur_mut().active_switch_or_loop = old;
            }
            Statement::Try(s) => self.visit_try(s),
            Statement::Throw(s) => self.validate_expr(&s.value),
            Statement::Empty(_) => {}
        }
    }

    fn visit_variable_decl(&mut self, decl: &'ast VariableDecl) {
        for declarator in &decl.declarators {
            self.validate_declaration_name(&declarator.id);
            self.cur_info_mut().decls.push(declarator);
            if let Some(init) = &declarator.init {
                self.validate_expr(init);
            }
        }
    }

    fn visit_loop_body(&mut self, slot: &'ast LabelSlot, body: &'ast Statement) {
        let (old_loop, old_sw) = {
            let ctx = self.cur_mut();
            let old = (ctx.active_loop, ctx.active_switch_or_loop);
            ctx.active_loop = Some(slot);
            ctx.active_switch_or_loop = Some(slot);
            old
        };
        self.validate_stmt(body);
        let ctx = self.cur_mut();
        ctx.active_loop = old_loop;
        ctx.active_switch_or_loop = old_sw;
    }

    fn visit_labeled(&mut self, stmt: &'ast LabeledStatement) {
        let name = &stmt.label.name;
        if self.cur().label_map.contains_key(name) {
            self.sink.error(SemError::DuplicateLabel {
                name: name.clone(),
                span: stmt.label.span,
            });
            // Still validate the subtree under the outer label's binding.
            self.validate_stmt(&stmt.body);
            return;
        }

        // `continue name` must reach the loop's own slot, so a label on a
        // (possibly nested-labeled) loop is allocated on the loop itself.
        let target = ultimate_label_target(&stmt.body);
        let is_loop = target.is_loop();
        let slot = if is_loop {
            target
                .label_slot()
                .expect("loop statements always carry a label slot")
        } else {
            &stmt.slot
        };

        let index = match slot.get() {
            Some(index) => index,
            None => {
                let active_try = self.cur().active_try;
                let index = self.cur_info_mut().allocate_label(active_try);
                slot.set(index);
                index
            }
        };

        self.cur_mut()
            .label_map
            .insert(name.clone(), ActiveLabel { slot: index, is_loop });
        self.validate_stmt(&stmt.body);
        self.cur_mut().label_map.remove(name);
    }

    /// Slot index for an unlabeled break/continue, allocating the target's
    /// label lazily on first use. `None` when there is no legal target.
    fn resolve_unlabeled_target(&mut self, target: Option<&'ast LabelSlot>) -> Option<u32> {
        let slot = target?;
        let index = match slot.get() {
            Some(index) => index,
            None => {
                let active_try = self.cur().active_try;
                let index = self.cur_info_mut().allocate_label(active_try);
                slot.set(index);
                index
            }
        };
        Some(index)
    }

    fn visit_try(&mut self, stmt: &'ast TryStatement) {
        let ctx = self.cur_mut();
        let try_id = ctx.try_count;
        ctx.try_count += 1;
        let old_try = ctx.active_try.replace(try_id);

        for s in &stmt.body.statements {
            self.validate_stmt(s);
        }
        self.cur_mut().active_try = old_try;

        // The handler and finalizer run outside the try's protection.
        if let Some(catch) = &stmt.catch_clause {
            if let Some(param) = &catch.param {
                self.validate_declaration_name(param);
            }
            for s in &catch.body.statements {
                self.validate_stmt(s);
            }
        }
        if let Some(finally) = &stmt.finally_clause {
            for s in &finally.statements {
                self.validate_stmt(s);
            }
        }
    }

    // ---- expressions ----------------------------------------------------

    fn validate_expr(&mut self, expr: &'ast Expression) {
        match expr {
            Expression::Identifier(id) => {
                if id.name == IDENT_ARGUMENTS {
                    self.note_arguments_usage();
                }
            }
            Expression::NumberLiteral(_)
            | Expression::StringLiteral(_)
            | Expression::BooleanLiteral(_)
            | Expression::NullLiteral(_)
            | Expression::This(_) => {}
            Expression::Assignment(a) => {
                self.check_assignment_target(&a.target);
                self.validate_expr(&a.target);
                self.validate_expr(&a.value);
            }
            Expression::Update(u) => {
                self.check_assignment_target(&u.argument);
                self.validate_expr(&u.argument);
            }
            Expression::Unary(u) => {
                if u.op == UnaryOperator::Delete
                    && self.cur().strict
                    && matches!(u.argument, Expression::Identifier(_))
                {
                    self.sink
                        .error(SemError::DeleteOfIdentifier { span: u.span });
                }
                self.validate_expr(&u.argument);
            }
            Expression::Binary(b) => {
                self.validate_expr(&b.left);
                self.validate_expr(&b.right);
            }
            Expression::Logical(l) => {
                self.validate_expr(&l.left);
                self.validate_expr(&l.right);
            }
            Expression::Conditional(c) => {
                self.validate_expr(&c.condition);
                self.validate_expr(&c.consequent);
                self.validate_expr(&c.alternate);
            }
            Expression::Call(c) => {
                self.validate_expr(&c.callee);
                for arg in &c.arguments {
                    self.validate_expr(arg);
                }
            }
            Expression::Member(m) => {
                self.validate_expr(&m.object);
                if let lumen_ast::MemberProperty::Computed(key) = &m.property {
                    self.validate_expr(key);
                }
            }
            Expression::Function(f) => {
                let strict = self.cur().strict;
                self.visit_function_like(FunctionLike::Expression(f), strict);
            }
            Expression::Arrow(f) => {
                let strict = self.cur().strict;
                self.visit_function_like(FunctionLike::Arrow(f), strict);
            }
        }
    }
}

/// Skip through nested labeled statements to the statement that actually
/// receives the control transfer.
fn ultimate_label_target(stmt: &Statement) -> &Statement {
    let mut target = stmt;
    while let Statement::Labeled(inner) = target {
        target = &inner.body;
    }
    target
}
