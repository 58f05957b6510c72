//! IR data model
//!
//! A `Module` owns the functions produced by one lowering session plus a
//! module-wide variable arena. Frame variables are arena entries owned by
//! one function's frame; nested functions reference captured storage in
//! enclosing frames through the same `VariableId`s, so capture is by
//! reference, never by copy.

pub mod instr;
pub mod pretty;
pub mod value;

use lumen_ast::{FunctionNodeKind, Span};
use serde::{Deserialize, Serialize};

use crate::scope::ScopeSnapshot;

pub use instr::{Instr, Terminator};
pub use pretty::PrettyPrint;
pub use value::{Literal, Operand, Register};

/// Function identifier in the IR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FunctionId(pub u32);

impl FunctionId {
    /// Create a new id.
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw id value.
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for FunctionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "fn{}", self.0)
    }
}

/// Basic block identifier, local to one function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BasicBlockId(pub u32);

impl BasicBlockId {
    /// Create a new id.
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw id value.
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for BasicBlockId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "bb{}", self.0)
    }
}

/// Frame variable identifier in the module-wide arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VariableId(pub u32);

impl VariableId {
    /// Create a new id.
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw id value.
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for VariableId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "var{}", self.0)
    }
}

/// A named storage cell in some function's frame.
#[derive(Debug, Clone)]
pub struct Variable {
    /// The variable name. Synthesized capture slots use `?`-prefixed names
    /// that cannot collide with source identifiers.
    pub name: String,
    /// The function whose frame owns the storage.
    pub owner: FunctionId,
}

/// A declared parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    /// The parameter name.
    pub name: String,
}

impl Param {
    /// Create a parameter.
    pub fn new(name: impl Into<String>) -> Self {
        Param { name: name.into() }
    }
}

/// How a function binds its receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    /// Ordinary function; binds its own `this`/`new.target`/`arguments`.
    Function,
    /// Arrow function; reads all three from the enclosing function.
    Arrow,
}

/// Resumption descriptor saved by a lazy stub.
///
/// An immutable snapshot: it shares no live builder state with the pass
/// that created the stub, and it serializes so the host can persist it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LazySource {
    /// Source buffer the deferred body is re-read from.
    pub buffer_id: u32,
    /// Which function-like node form to re-dispatch on.
    pub node_kind: FunctionNodeKind,
    /// Source range of the deferred function.
    pub span: Span,
    /// Snapshot of the enclosing name lookup chain.
    pub scope: ScopeSnapshot,
}

/// A basic block: instructions followed by exactly one terminator.
#[derive(Debug, Clone)]
pub struct BasicBlock {
    /// The block id; equals its index in the function's block list.
    pub id: BasicBlockId,
    /// The instructions, in execution order.
    pub instrs: Vec<Instr>,
    /// The terminator. `None` only while the block is under construction.
    pub terminator: Option<Terminator>,
}

impl BasicBlock {
    /// Create an empty, unterminated block.
    pub fn new(id: BasicBlockId) -> Self {
        BasicBlock {
            id,
            instrs: Vec::new(),
            terminator: None,
        }
    }

    /// Append an instruction.
    ///
    /// Panics if the block is already terminated; that is an internal
    /// consistency failure in the lowering pipeline.
    pub fn add_instr(&mut self, instr: Instr) {
        assert!(
            self.terminator.is_none(),
            "instruction added to terminated block {}",
            self.id
        );
        self.instrs.push(instr);
    }

    /// Set the terminator.
    ///
    /// Panics if the block already has one; every block is terminated
    /// exactly once.
    pub fn set_terminator(&mut self, term: Terminator) {
        assert!(
            self.terminator.is_none(),
            "block {} terminated twice",
            self.id
        );
        self.terminator = Some(term);
    }

    /// True if the terminator has been set.
    pub fn is_terminated(&self) -> bool {
        self.terminator.is_some()
    }
}

/// One IR function.
#[derive(Debug, Clone)]
pub struct Function {
    /// The function name; empty for anonymous functions.
    pub name: String,
    /// Ordinary function or arrow.
    pub kind: FunctionKind,
    /// Whether the body is strict mode.
    pub strict: bool,
    /// Source range of the function-like node.
    pub span: Span,
    /// Parameters, receiver first.
    pub params: Vec<Param>,
    /// Frame variables owned by this function, in creation order.
    pub variables: Vec<VariableId>,
    /// Basic blocks; index equals `BasicBlockId`. Block 0 is the entry.
    pub blocks: Vec<BasicBlock>,
    /// Resumption descriptor when this function is a lazy stub.
    pub lazy: Option<LazySource>,
}

impl Function {
    /// Create an empty function.
    pub fn new(name: impl Into<String>, kind: FunctionKind, strict: bool, span: Span) -> Self {
        Function {
            name: name.into(),
            kind,
            strict,
            span,
            params: Vec::new(),
            variables: Vec::new(),
            blocks: Vec::new(),
            lazy: None,
        }
    }

    /// Append a fresh block and return its id.
    pub fn add_block(&mut self) -> BasicBlockId {
        let id = BasicBlockId::new(self.blocks.len() as u32);
        self.blocks.push(BasicBlock::new(id));
        id
    }

    /// The block with the given id.
    pub fn block(&self, id: BasicBlockId) -> &BasicBlock {
        &self.blocks[id.as_u32() as usize]
    }

    /// Mutable access to the block with the given id.
    pub fn block_mut(&mut self, id: BasicBlockId) -> &mut BasicBlock {
        &mut self.blocks[id.as_u32() as usize]
    }

    /// True if this function is a lazy stub awaiting resumption.
    pub fn is_stub(&self) -> bool {
        self.lazy.is_some()
    }
}

/// The lowering output: all functions plus the variable arena.
#[derive(Debug, Clone, Default)]
pub struct Module {
    /// Functions, indexed by `FunctionId`.
    pub functions: Vec<Function>,
    /// The frame variable arena, indexed by `VariableId`.
    pub variables: Vec<Variable>,
}

impl Module {
    /// Create an empty module.
    pub fn new() -> Self {
        Module::default()
    }

    /// Append a function and return its id.
    pub fn add_function(&mut self, function: Function) -> FunctionId {
        let id = FunctionId::new(self.functions.len() as u32);
        self.functions.push(function);
        id
    }

    /// The function with the given id.
    pub fn function(&self, id: FunctionId) -> &Function {
        &self.functions[id.as_u32() as usize]
    }

    /// Mutable access to the function with the given id.
    pub fn function_mut(&mut self, id: FunctionId) -> &mut Function {
        &mut self.functions[id.as_u32() as usize]
    }

    /// Create a frame variable owned by `owner` and return its id.
    pub fn add_variable(&mut self, name: impl Into<String>, owner: FunctionId) -> VariableId {
        let id = VariableId::new(self.variables.len() as u32);
        self.variables.push(Variable {
            name: name.into(),
            owner,
        });
        self.function_mut(owner).variables.push(id);
        id
    }

    /// The variable with the given id.
    pub fn variable(&self, id: VariableId) -> &Variable {
        &self.variables[id.as_u32() as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_termination_invariant() {
        let mut block = BasicBlock::new(BasicBlockId(0));
        assert!(!block.is_terminated());
        block.set_terminator(Terminator::Unreachable);
        assert!(block.is_terminated());
    }

    #[test]
    #[should_panic(expected = "terminated twice")]
    fn test_double_termination_panics() {
        let mut block = BasicBlock::new(BasicBlockId(0));
        block.set_terminator(Terminator::Unreachable);
        block.set_terminator(Terminator::Unreachable);
    }

    #[test]
    #[should_panic(expected = "instruction added to terminated block")]
    fn test_instr_after_terminator_panics() {
        let mut block = BasicBlock::new(BasicBlockId(0));
        block.set_terminator(Terminator::Unreachable);
        block.add_instr(Instr::TryEnd);
    }

    #[test]
    fn test_variable_ownership() {
        let mut module = Module::new();
        let f = module.add_function(Function::new(
            "f",
            FunctionKind::Function,
            false,
            Span::DUMMY,
        ));
        let v = module.add_variable("x", f);
        assert_eq!(module.variable(v).name, "x");
        assert_eq!(module.variable(v).owner, f);
        assert_eq!(module.function(f).variables, vec![v]);
    }
}
