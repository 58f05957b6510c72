//! AST to IR lowering
//!
//! Second pass of the pipeline: walks a validated tree and emits one IR
//! function per function-like node. All semantic facts (hoisting lists,
//! label table, strictness, capture flags) come from the semantic context;
//! lowering never re-derives them, and any missing fact is an internal
//! consistency failure, not a diagnostic.

mod expr;
mod stmt;

use lumen_ast::{ArrowBody, FunctionLike, Program, Span};
use lumen_sema::SemContext;
use lumen_ast::FunctionInfoId;

use crate::ir::{
    BasicBlock, BasicBlockId, Function, FunctionId, FunctionKind, Instr, LazySource, Literal,
    Module, Operand, Param, Register, Terminator, VariableId,
};
use crate::scope::ScopeChain;

/// Lower a validated program to an IR module.
pub fn generate_program<'ast>(sem: &SemContext<'ast>, program: &'ast Program) -> Module {
    let mut module = Module::new();
    IrGen::new(sem, &mut module).gen_function_like(FunctionLike::Program(program), "global");
    module
}

/// Lower a single validated function-like node to an IR module.
///
/// Used for individually-compiled functions; the program entry point is
/// `generate_program`.
pub fn generate_function<'ast>(
    sem: &SemContext<'ast>,
    func: FunctionLike<'ast>,
    name: impl Into<String>,
) -> Module {
    let mut module = Module::new();
    IrGen::new(sem, &mut module).gen_function_like(func, name);
    module
}

/// Resume lowering of a lazy stub in place.
///
/// A fresh, independent pass: the only state carried over from the pass
/// that created the stub is the saved descriptor. The caller re-parses the
/// deferred body from the descriptor's buffer id and re-validates it into
/// `sem` before calling this.
pub fn lower_lazy_function<'ast>(
    sem: &SemContext<'ast>,
    module: &mut Module,
    stub: FunctionId,
    func: FunctionLike<'ast>,
) {
    let lazy = module
        .function(stub)
        .lazy
        .clone()
        .expect("function is not a lazy stub");
    let scope = ScopeChain::from_snapshot(&lazy.scope);

    let target = module.function_mut(stub);
    target.params.clear();
    target.lazy = None;

    let mut gen = IrGen {
        sem,
        module,
        scope,
        contexts: Vec::new(),
    };
    let info_id = func
        .sem()
        .get()
        .expect("function node has no semantic info");
    gen.gen_function_body(stub, info_id, func);
}

/// Synthesize a function that unconditionally throws.
///
/// The escape hatch for nodes that cannot legally be lowered: call sites
/// still receive a callable value instead of a pipeline failure.
pub fn generate_error_function(
    module: &mut Module,
    name: impl Into<String>,
    message: &str,
) -> FunctionId {
    let id = module.add_function(Function::new(
        name,
        FunctionKind::Function,
        false,
        Span::DUMMY,
    ));
    let func = module.function_mut(id);
    func.params.push(Param::new("this"));

    let mut block = BasicBlock::new(BasicBlockId::new(0));
    let dest = Register(0);
    block.add_instr(Instr::NewError {
        dest,
        message: message.to_string(),
    });
    block.set_terminator(Terminator::Throw {
        value: Operand::Register(dest),
    });
    func.blocks.push(block);
    id
}

/// Break/continue blocks registered for one label slot.
#[derive(Debug, Clone, Copy, Default)]
struct LabelTarget {
    break_block: Option<BasicBlockId>,
    continue_block: Option<BasicBlockId>,
}

/// Per-function lowering state. One per function activation, stack
/// discipline mirroring the validator's context chain.
struct FunctionContext {
    function: FunctionId,
    info: FunctionInfoId,
    is_arrow: bool,
    current_block: BasicBlockId,
    next_register: u32,
    /// Target blocks per label slot; the slot count was fixed by validation
    /// and lowering never grows it.
    label_targets: Vec<LabelTarget>,
    /// Frame variable holding the captured receiver, when arrows need it.
    captured_this: Option<VariableId>,
    /// Frame variable holding the captured new.target.
    captured_new_target: Option<VariableId>,
    /// Frame variable holding the captured arguments object.
    captured_arguments: Option<VariableId>,
}

impl FunctionContext {
    fn new(function: FunctionId, info: FunctionInfoId, is_arrow: bool, label_count: usize) -> Self {
        FunctionContext {
            function,
            info,
            is_arrow,
            current_block: BasicBlockId::new(0),
            next_register: 0,
            label_targets: vec![LabelTarget::default(); label_count],
            captured_this: None,
            captured_new_target: None,
            captured_arguments: None,
        }
    }
}

/// The IR generator.
pub struct IrGen<'a, 'ast> {
    sem: &'a SemContext<'ast>,
    module: &'a mut Module,
    scope: ScopeChain,
    contexts: Vec<FunctionContext>,
}

impl<'a, 'ast> IrGen<'a, 'ast> {
    fn new(sem: &'a SemContext<'ast>, module: &'a mut Module) -> Self {
        IrGen {
            sem,
            module,
            scope: ScopeChain::new(),
            contexts: Vec::new(),
        }
    }

    // ---- context helpers ----------------------------------------------

    fn cur(&self) -> &FunctionContext {
        self.contexts.last().expect("no active function context")
    }

    fn cur_mut(&mut self) -> &mut FunctionContext {
        self.contexts.last_mut().expect("no active function context")
    }

    fn func_mut(&mut self) -> &mut Function {
        let id = self.cur().function;
        self.module.function_mut(id)
    }

    fn alloc_register(&mut self) -> Register {
        let ctx = self.cur_mut();
        let r = Register(ctx.next_register);
        ctx.next_register += 1;
        r
    }

    fn alloc_block(&mut self) -> BasicBlockId {
        self.func_mut().add_block()
    }

    fn switch_to(&mut self, block: BasicBlockId) {
        self.cur_mut().current_block = block;
    }

    fn emit(&mut self, instr: Instr) {
        let block = self.cur().current_block;
        self.func_mut().block_mut(block).add_instr(instr);
    }

    fn set_terminator(&mut self, term: Terminator) {
        let block = self.cur().current_block;
        self.func_mut().block_mut(block).set_terminator(term);
    }

    fn current_block_is_terminated(&self) -> bool {
        let ctx = self.cur();
        self.module
            .function(ctx.function)
            .block(ctx.current_block)
            .is_terminated()
    }

    /// Create a frame variable owned by the current function.
    fn create_variable(&mut self, name: &str) -> VariableId {
        let owner = self.cur().function;
        self.module.add_variable(name, owner)
    }

    /// Register break/continue target blocks for a statement's label slot.
    ///
    /// No-op when the statement was never targeted (its slot is unset).
    pub(super) fn register_label_target(
        &mut self,
        slot: &lumen_ast::LabelSlot,
        break_block: BasicBlockId,
        continue_block: Option<BasicBlockId>,
    ) {
        if let Some(index) = slot.get() {
            let target = &mut self.cur_mut().label_targets[index as usize];
            target.break_block = Some(break_block);
            target.continue_block = continue_block;
        }
    }

    // ---- function construction ----------------------------------------

    /// Lower one function-like node, returning its id in the module.
    pub(super) fn gen_function_like(
        &mut self,
        func: FunctionLike<'ast>,
        name: impl Into<String>,
    ) -> FunctionId {
        let info_id = func
            .sem()
            .get()
            .expect("function node has no semantic info");
        let info = self.sem.info(info_id);
        let kind = if func.is_arrow() {
            FunctionKind::Arrow
        } else {
            FunctionKind::Function
        };
        let id = self
            .module
            .add_function(Function::new(name, kind, info.strict, func.span()));

        // Deferred body: stub with parameters only, no blocks. Arity and
        // names stay queryable; the descriptor resumes lowering later.
        // Arrows are never deferred: their captured this/new.target slots
        // live in the enclosing context, which exists only while the
        // enclosing function is being lowered.
        if !func.is_arrow() {
            if let Some(body) = func.body_block() {
                if body.is_lazy_body {
                    let lazy = LazySource {
                        buffer_id: body.buffer_id,
                        node_kind: func.kind(),
                        span: func.span(),
                        scope: self.scope.snapshot(),
                    };
                    let target = self.module.function_mut(id);
                    target.params.push(Param::new("this"));
                    for param in func.params() {
                        target.params.push(Param::new(&param.name));
                    }
                    target.lazy = Some(lazy);
                    return id;
                }
            }
        }

        self.gen_function_body(id, info_id, func);
        id
    }

    /// Prologue, body, epilogue for an eagerly-compiled function.
    pub(super) fn gen_function_body(
        &mut self,
        id: FunctionId,
        info_id: FunctionInfoId,
        func: FunctionLike<'ast>,
    ) {
        let label_count = self.sem.info(info_id).label_count();
        let mut ctx = FunctionContext::new(id, info_id, func.is_arrow(), label_count);
        if func.is_arrow() {
            // Arrows copy the capture slots by reference from the enclosing
            // context at creation time.
            if let Some(parent) = self.contexts.last() {
                ctx.captured_this = parent.captured_this;
                ctx.captured_new_target = parent.captured_new_target;
                ctx.captured_arguments = parent.captured_arguments;
            }
        }
        self.contexts.push(ctx);
        self.scope.push_scope();

        self.emit_prologue(func);

        // Split: hoisting logic stays in the entry block; statements start
        // in a fresh continuation block.
        let cont = self.alloc_block();
        self.set_terminator(Terminator::Jump { target: cont });
        self.switch_to(cont);

        match func {
            FunctionLike::Program(p) => {
                for stmt in &p.body {
                    self.lower_stmt(stmt);
                }
            }
            FunctionLike::Declaration(f) => {
                for stmt in &f.body.statements {
                    self.lower_stmt(stmt);
                }
            }
            FunctionLike::Expression(f) => {
                for stmt in &f.body.statements {
                    self.lower_stmt(stmt);
                }
            }
            FunctionLike::Arrow(f) => match &f.body {
                ArrowBody::Expression(expr) => {
                    // Expression bodies get an implicit return.
                    let value = self.lower_expr(expr);
                    self.set_terminator(Terminator::Return { value });
                }
                ArrowBody::Block(block) => {
                    for stmt in &block.statements {
                        self.lower_stmt(stmt);
                    }
                }
            },
        }

        self.emit_epilogue();
        self.scope.pop_scope();
        self.contexts.pop();
    }

    /// Entry-block setup: hoist declarations, pre-bind closures, bind the
    /// receiver and parameters to frame variables, capture state for
    /// nested arrows, then generate the hoisted function declarations.
    fn emit_prologue(&mut self, func: FunctionLike<'ast>) {
        let entry = self.alloc_block();
        self.switch_to(entry);

        let info_id = self.cur().info;
        let info = self.sem.info(info_id);
        let decls = info.decls.clone();
        let closures = info.closures.clone();
        let contains_arrows = info.contains_arrow_functions;
        let arrows_use_arguments = info.contains_arrow_functions_using_arguments;

        // Hoisting: one frame variable per unique name, initialized to
        // undefined exactly once. Later duplicates are no-ops.
        for decl in &decls {
            if self.scope.lookup_innermost(&decl.id.name).is_some() {
                continue;
            }
            let var = self.create_variable(&decl.id.name);
            self.scope.declare(&decl.id.name, var);
            self.emit(Instr::StoreVar {
                var,
                value: Operand::Literal(Literal::Undefined),
            });
        }

        // Pre-create closure bindings; values are stored once the nested
        // functions are generated below.
        for closure in &closures {
            if self.scope.lookup_innermost(&closure.id.name).is_none() {
                let var = self.create_variable(&closure.id.name);
                self.scope.declare(&closure.id.name, var);
            }
        }

        // Implicit receiver, then declared parameters. Each parameter is
        // copied into a frame variable; body code never reads the raw
        // parameter again, so closures capture parameters uniformly.
        self.func_mut().params.push(Param::new("this"));
        for (index, param) in func.params().iter().enumerate() {
            self.func_mut().params.push(Param::new(&param.name));
            let var = match self.scope.lookup_innermost(&param.name) {
                Some(var) => var,
                None => {
                    let var = self.create_variable(&param.name);
                    self.scope.declare(&param.name, var);
                    var
                }
            };
            let dest = self.alloc_register();
            self.emit(Instr::LoadParam {
                dest,
                index: (index + 1) as u32,
            });
            self.emit(Instr::StoreVar {
                var,
                value: Operand::Register(dest),
            });
        }

        // Capture state: nested arrows read this/new.target (and possibly
        // arguments) out of frame storage shared across the context chain.
        if !func.is_arrow() && contains_arrows {
            let this_var = self.create_variable("?this");
            let dest = self.alloc_register();
            self.emit(Instr::LoadThis { dest });
            self.emit(Instr::StoreVar {
                var: this_var,
                value: Operand::Register(dest),
            });
            self.cur_mut().captured_this = Some(this_var);

            let nt_var = self.create_variable("?new.target");
            let dest = self.alloc_register();
            self.emit(Instr::GetNewTarget { dest });
            self.emit(Instr::StoreVar {
                var: nt_var,
                value: Operand::Register(dest),
            });
            self.cur_mut().captured_new_target = Some(nt_var);

            if arrows_use_arguments {
                let args_var = self.create_variable("?arguments");
                let dest = self.alloc_register();
                self.emit(Instr::CreateArguments { dest });
                self.emit(Instr::StoreVar {
                    var: args_var,
                    value: Operand::Register(dest),
                });
                self.cur_mut().captured_arguments = Some(args_var);
            }
        }

        // Hoisted nested functions, generated in declaration order.
        for &closure in &closures {
            let nested =
                self.gen_function_like(FunctionLike::Declaration(closure), closure.id.name.clone());
            let dest = self.alloc_register();
            self.emit(Instr::CreateClosure {
                dest,
                function: nested,
            });
            let var = self
                .scope
                .lookup(&closure.id.name)
                .expect("closure binding not pre-created");
            self.emit(Instr::StoreVar {
                var,
                value: Operand::Register(dest),
            });
        }
    }

    /// Fall-off return, dead-block termination, trivial-continuation merge.
    fn emit_epilogue(&mut self) {
        if !self.current_block_is_terminated() {
            self.set_terminator(Terminator::Return {
                value: Operand::undefined(),
            });
        }

        // Blocks opened for unreachable code never got a terminator.
        let id = self.cur().function;
        for block in &mut self.module.function_mut(id).blocks {
            if block.terminator.is_none() {
                block.terminator = Some(Terminator::Unreachable);
            }
        }

        self.merge_trivial_continuation();

        let func = self.module.function(id);
        for block in &func.blocks {
            assert!(
                block.is_terminated(),
                "block {} of {} left unterminated",
                block.id,
                func.name
            );
        }
    }

    /// Fold the continuation block back into the entry block when the split
    /// turned out trivial: entry jumps to it and nothing else targets it.
    ///
    /// Only done while the continuation is still the newest block, so block
    /// ids stay dense after the pop.
    fn merge_trivial_continuation(&mut self) {
        let id = self.cur().function;
        let func = self.module.function_mut(id);
        if func.blocks.len() < 2 {
            return;
        }
        let target = match func.blocks[0].terminator {
            Some(Terminator::Jump { target }) => target,
            _ => return,
        };
        if target.as_u32() as usize != func.blocks.len() - 1 {
            return;
        }
        let referenced_elsewhere = func.blocks.iter().skip(1).any(|block| {
            block.id != target
                && block
                    .terminator
                    .as_ref()
                    .is_some_and(|term| term.successors().contains(&target))
        });
        if referenced_elsewhere {
            return;
        }

        let cont = func.blocks.pop().expect("continuation block missing");
        let entry = &mut func.blocks[0];
        entry.terminator = None;
        entry.instrs.extend(cont.instrs);
        entry.terminator = cont.terminator;
    }
}
