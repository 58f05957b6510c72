//! Function-like AST nodes
//!
//! The program root and the three function forms share the same semantic
//! machinery: a strictness annotation, a slot pointing at the function's
//! semantic record, parameters and a body. `FunctionLike` gives the
//! validator and the lowerer a uniform, non-owning view over all four.

use std::cell::Cell;

use serde::{Deserialize, Serialize};

use crate::expression::{Expression, Identifier};
use crate::span::Span;
use crate::statement::{Block, Statement};

/// Identifier of a `FunctionInfo` record in the semantic context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionInfoId(pub u32);

impl FunctionInfoId {
    /// Create a new id.
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw id value.
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for FunctionInfoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sem{}", self.0)
    }
}

/// Strictness of a function-like node.
///
/// `NotSet` means the producer of the tree did not precompute strictness;
/// the validator derives it from the directive prologue and records it.
/// Once set for a function it never changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Strictness {
    /// Not determined yet.
    #[default]
    NotSet,
    /// Sloppy mode.
    NonStrict,
    /// Strict mode.
    Strict,
}

impl Strictness {
    /// True if strict mode.
    pub fn is_strict(self) -> bool {
        matches!(self, Strictness::Strict)
    }
}

/// Annotation cell holding a node's strictness.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StrictnessCell(Cell<Strictness>);

impl StrictnessCell {
    /// A cell with strictness not yet determined.
    pub fn not_set() -> Self {
        StrictnessCell(Cell::new(Strictness::NotSet))
    }

    /// A cell preset by the tree producer.
    pub fn preset(strict: bool) -> Self {
        StrictnessCell(Cell::new(if strict {
            Strictness::Strict
        } else {
            Strictness::NonStrict
        }))
    }

    /// Current value.
    pub fn get(&self) -> Strictness {
        self.0.get()
    }

    /// Record the derived strictness.
    pub fn set(&self, s: Strictness) {
        self.0.set(s);
    }
}

/// Annotation cell pointing at the function's semantic record.
///
/// Empty until validation runs; IR generation treats an empty slot as an
/// internal consistency failure.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SemSlot(Cell<Option<FunctionInfoId>>);

impl SemSlot {
    /// A fresh, unassigned slot.
    pub fn new() -> Self {
        SemSlot(Cell::new(None))
    }

    /// The associated semantic record, if validation has run.
    pub fn get(&self) -> Option<FunctionInfoId> {
        self.0.get()
    }

    /// Associate the node with its semantic record.
    pub fn set(&self, id: FunctionInfoId) {
        self.0.set(Some(id));
    }
}

/// The root of a parsed source buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    /// Top-level statements.
    pub body: Vec<Statement>,
    /// Strictness annotation (directive prologue applies to the whole
    /// program).
    pub strictness: StrictnessCell,
    /// Semantic record slot.
    pub sem: SemSlot,
    /// Source range.
    pub span: Span,
}

impl Program {
    /// A program with strictness left for the validator to derive.
    pub fn new(body: Vec<Statement>, span: Span) -> Self {
        Program {
            body,
            strictness: StrictnessCell::not_set(),
            sem: SemSlot::new(),
            span,
        }
    }
}

/// Hoisted function declaration: `function f(a, b) { ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDeclaration {
    /// The declared name.
    pub id: Identifier,
    /// Parameter names, in order.
    pub params: Vec<Identifier>,
    /// The body block.
    pub body: Block,
    /// Strictness annotation.
    pub strictness: StrictnessCell,
    /// Semantic record slot.
    pub sem: SemSlot,
    /// Source range.
    pub span: Span,
}

/// Function expression: `(function f(a) { ... })`
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionExpression {
    /// Optional name, visible only inside the function.
    pub id: Option<Identifier>,
    /// Parameter names, in order.
    pub params: Vec<Identifier>,
    /// The body block.
    pub body: Block,
    /// Strictness annotation.
    pub strictness: StrictnessCell,
    /// Semantic record slot.
    pub sem: SemSlot,
    /// Source range.
    pub span: Span,
}

/// Arrow function: `(a) => expr` or `(a) => { ... }`
///
/// Arrows do not bind their own `this`/`new.target`/`arguments`; those are
/// captured by reference from the nearest enclosing non-arrow function.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrowFunction {
    /// Parameter names, in order.
    pub params: Vec<Identifier>,
    /// Expression or block body.
    pub body: ArrowBody,
    /// Strictness annotation (always inherited from the enclosing scope).
    pub strictness: StrictnessCell,
    /// Semantic record slot.
    pub sem: SemSlot,
    /// Source range.
    pub span: Span,
}

/// Body of an arrow function
#[derive(Debug, Clone, PartialEq)]
pub enum ArrowBody {
    /// Single expression body, wrapped in an implicit return.
    Expression(Box<Expression>),
    /// Block body.
    Block(Block),
}

/// Node-kind tag for function-like nodes.
///
/// Carried by the lazy resumption descriptor so a deferred body can be
/// re-dispatched without the original node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FunctionNodeKind {
    /// `Program` root.
    Program,
    /// `FunctionDeclaration`.
    FunctionDeclaration,
    /// `FunctionExpression`.
    FunctionExpression,
    /// `ArrowFunction`.
    ArrowFunction,
}

/// Uniform non-owning view over the four function-like node types.
#[derive(Debug, Clone, Copy)]
pub enum FunctionLike<'a> {
    /// The program root (the "global scope" function).
    Program(&'a Program),
    /// A function declaration.
    Declaration(&'a FunctionDeclaration),
    /// A function expression.
    Expression(&'a FunctionExpression),
    /// An arrow function.
    Arrow(&'a ArrowFunction),
}

impl<'a> FunctionLike<'a> {
    /// The node-kind tag.
    pub fn kind(&self) -> FunctionNodeKind {
        match self {
            FunctionLike::Program(_) => FunctionNodeKind::Program,
            FunctionLike::Declaration(_) => FunctionNodeKind::FunctionDeclaration,
            FunctionLike::Expression(_) => FunctionNodeKind::FunctionExpression,
            FunctionLike::Arrow(_) => FunctionNodeKind::ArrowFunction,
        }
    }

    /// True for arrow functions.
    pub fn is_arrow(&self) -> bool {
        matches!(self, FunctionLike::Arrow(_))
    }

    /// Declared parameter names. Empty for the program root.
    pub fn params(&self) -> &'a [Identifier] {
        match self {
            FunctionLike::Program(_) => &[],
            FunctionLike::Declaration(f) => &f.params,
            FunctionLike::Expression(f) => &f.params,
            FunctionLike::Arrow(f) => &f.params,
        }
    }

    /// The declared name, if any.
    pub fn name(&self) -> Option<&'a str> {
        match self {
            FunctionLike::Program(_) => None,
            FunctionLike::Declaration(f) => Some(&f.id.name),
            FunctionLike::Expression(f) => f.id.as_ref().map(|id| id.name.as_str()),
            FunctionLike::Arrow(_) => None,
        }
    }

    /// The body block, if the body is a block.
    pub fn body_block(&self) -> Option<&'a Block> {
        match self {
            FunctionLike::Program(_) => None,
            FunctionLike::Declaration(f) => Some(&f.body),
            FunctionLike::Expression(f) => Some(&f.body),
            FunctionLike::Arrow(f) => match &f.body {
                ArrowBody::Block(b) => Some(b),
                ArrowBody::Expression(_) => None,
            },
        }
    }

    /// The strictness annotation cell.
    pub fn strictness(&self) -> &'a StrictnessCell {
        match self {
            FunctionLike::Program(p) => &p.strictness,
            FunctionLike::Declaration(f) => &f.strictness,
            FunctionLike::Expression(f) => &f.strictness,
            FunctionLike::Arrow(f) => &f.strictness,
        }
    }

    /// The semantic record slot.
    pub fn sem(&self) -> &'a SemSlot {
        match self {
            FunctionLike::Program(p) => &p.sem,
            FunctionLike::Declaration(f) => &f.sem,
            FunctionLike::Expression(f) => &f.sem,
            FunctionLike::Arrow(f) => &f.sem,
        }
    }

    /// Source range of the node.
    pub fn span(&self) -> Span {
        match self {
            FunctionLike::Program(p) => p.span,
            FunctionLike::Declaration(f) => f.span,
            FunctionLike::Expression(f) => f.span,
            FunctionLike::Arrow(f) => f.span,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sem_slot() {
        let slot = SemSlot::new();
        assert_eq!(slot.get(), None);
        slot.set(FunctionInfoId::new(7));
        assert_eq!(slot.get(), Some(FunctionInfoId(7)));
    }

    #[test]
    fn test_strictness_cell() {
        let cell = StrictnessCell::not_set();
        assert_eq!(cell.get(), Strictness::NotSet);
        cell.set(Strictness::Strict);
        assert!(cell.get().is_strict());
        assert!(StrictnessCell::preset(true).get().is_strict());
        assert!(!StrictnessCell::preset(false).get().is_strict());
    }

    #[test]
    fn test_function_like_view() {
        let program = Program::new(vec![], Span::new(0, 10));
        let view = FunctionLike::Program(&program);
        assert_eq!(view.kind(), FunctionNodeKind::Program);
        assert!(view.params().is_empty());
        assert!(!view.is_arrow());
        assert_eq!(view.span(), Span::new(0, 10));
    }
}
