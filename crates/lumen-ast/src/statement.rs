//! Statement AST nodes
//!
//! Statement forms plus the annotation cells the validator fills in:
//! labeled statements, loops and switches carry a `LabelSlot` holding their
//! allocated label index, and break/continue carry the slot of their
//! resolved target. Lowering reads the cells; it never allocates labels.

use std::cell::Cell;

use crate::expression::{Expression, Identifier};
use crate::function::FunctionDeclaration;
use crate::span::Span;

/// An annotation cell holding a label-table index assigned by validation.
///
/// Empty until the validator allocates a slot for the statement (labels are
/// allocated lazily, only when something actually targets the statement).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelSlot(Cell<Option<u32>>);

impl LabelSlot {
    /// A fresh, unassigned slot.
    pub fn new() -> Self {
        LabelSlot(Cell::new(None))
    }

    /// The allocated label index, if any.
    pub fn get(&self) -> Option<u32> {
        self.0.get()
    }

    /// Record the allocated label index.
    pub fn set(&self, index: u32) {
        self.0.set(Some(index));
    }
}

/// Top-level or block-level statement
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// Variable declaration: var
    VariableDecl(VariableDecl),

    /// Function declaration (hoisted)
    FunctionDecl(FunctionDeclaration),

    /// Expression statement
    Expression(ExpressionStatement),

    /// Block statement
    Block(Block),

    /// If statement
    If(IfStatement),

    /// While loop
    While(WhileStatement),

    /// Do-while loop
    DoWhile(DoWhileStatement),

    /// For loop
    For(ForStatement),

    /// For-in loop
    ForIn(ForInStatement),

    /// Labeled statement
    Labeled(LabeledStatement),

    /// Break statement
    Break(BreakStatement),

    /// Continue statement
    Continue(ContinueStatement),

    /// Return statement
    Return(ReturnStatement),

    /// Switch statement
    Switch(SwitchStatement),

    /// Try-catch-finally
    Try(TryStatement),

    /// Throw statement
    Throw(ThrowStatement),

    /// Empty statement (;)
    Empty(Span),
}

impl Statement {
    /// Get the span of this statement
    pub fn span(&self) -> Span {
        match self {
            Statement::VariableDecl(s) => s.span,
            Statement::FunctionDecl(s) => s.span,
            Statement::Expression(s) => s.span,
            Statement::Block(s) => s.span,
            Statement::If(s) => s.span,
            Statement::While(s) => s.span,
            Statement::DoWhile(s) => s.span,
            Statement::For(s) => s.span,
            Statement::ForIn(s) => s.span,
            Statement::Labeled(s) => s.span,
            Statement::Break(s) => s.span,
            Statement::Continue(s) => s.span,
            Statement::Return(s) => s.span,
            Statement::Switch(s) => s.span,
            Statement::Try(s) => s.span,
            Statement::Throw(s) => s.span,
            Statement::Empty(span) => *span,
        }
    }

    /// Check if this statement is a loop (a legal `continue` target)
    pub fn is_loop(&self) -> bool {
        matches!(
            self,
            Statement::While(_)
                | Statement::DoWhile(_)
                | Statement::For(_)
                | Statement::ForIn(_)
        )
    }

    /// The label slot of this statement, if it can be a control target.
    pub fn label_slot(&self) -> Option<&LabelSlot> {
        match self {
            Statement::While(s) => Some(&s.label),
            Statement::DoWhile(s) => Some(&s.label),
            Statement::For(s) => Some(&s.label),
            Statement::ForIn(s) => Some(&s.label),
            Statement::Switch(s) => Some(&s.label),
            Statement::Labeled(s) => Some(&s.slot),
            _ => None,
        }
    }
}

/// Variable declaration: `var a = 1, b;`
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDecl {
    /// The declarators, in source order.
    pub declarators: Vec<VariableDeclarator>,
    /// Source range.
    pub span: Span,
}

/// A single declarator within a variable declaration
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDeclarator {
    /// The declared name.
    pub id: Identifier,
    /// Optional initializer.
    pub init: Option<Expression>,
    /// Source range.
    pub span: Span,
}

/// Expression statement
#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionStatement {
    /// The expression evaluated for its side effects.
    pub expression: Expression,
    /// Source range.
    pub span: Span,
}

impl ExpressionStatement {
    /// If this statement is a bare string literal, its value.
    ///
    /// Used by the directive-prologue scan ("use strict" detection).
    pub fn directive(&self) -> Option<&str> {
        match &self.expression {
            Expression::StringLiteral(lit) => Some(&lit.value),
            _ => None,
        }
    }
}

/// Block statement: `{ ... }`
///
/// A function body block may be marked as a lazy body, in which case IR
/// generation emits only a stub and records a resumption descriptor instead
/// of lowering the statements.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    /// The statements, in source order.
    pub statements: Vec<Statement>,
    /// True if a function body whose lowering is deferred.
    pub is_lazy_body: bool,
    /// Source buffer the lazy body can be re-read from.
    pub buffer_id: u32,
    /// Source range.
    pub span: Span,
}

impl Block {
    /// A plain, eagerly-compiled block.
    pub fn new(statements: Vec<Statement>, span: Span) -> Self {
        Block {
            statements,
            is_lazy_body: false,
            buffer_id: 0,
            span,
        }
    }
}

/// If statement
#[derive(Debug, Clone, PartialEq)]
pub struct IfStatement {
    /// The condition.
    pub condition: Expression,
    /// Taken when the condition is truthy.
    pub then_branch: Box<Statement>,
    /// Taken when the condition is falsy, if present.
    pub else_branch: Option<Box<Statement>>,
    /// Source range.
    pub span: Span,
}

/// While loop
#[derive(Debug, Clone, PartialEq)]
pub struct WhileStatement {
    /// The loop condition.
    pub condition: Expression,
    /// The loop body.
    pub body: Box<Statement>,
    /// Label slot assigned when the loop is a break/continue target.
    pub label: LabelSlot,
    /// Source range.
    pub span: Span,
}

/// Do-while loop
#[derive(Debug, Clone, PartialEq)]
pub struct DoWhileStatement {
    /// The loop body, executed at least once.
    pub body: Box<Statement>,
    /// The loop condition.
    pub condition: Expression,
    /// Label slot assigned when the loop is a break/continue target.
    pub label: LabelSlot,
    /// Source range.
    pub span: Span,
}

/// For loop
#[derive(Debug, Clone, PartialEq)]
pub struct ForStatement {
    /// Optional initializer.
    pub init: Option<ForInit>,
    /// Optional condition; absent means an infinite loop.
    pub test: Option<Expression>,
    /// Optional update expression.
    pub update: Option<Expression>,
    /// The loop body.
    pub body: Box<Statement>,
    /// Label slot assigned when the loop is a break/continue target.
    pub label: LabelSlot,
    /// Source range.
    pub span: Span,
}

/// For loop initializer
#[derive(Debug, Clone, PartialEq)]
pub enum ForInit {
    /// `for (var i = 0; ...)`
    VariableDecl(VariableDecl),
    /// `for (i = 0; ...)`
    Expression(Expression),
}

/// For-in loop: `for (x in obj)`
#[derive(Debug, Clone, PartialEq)]
pub struct ForInStatement {
    /// The iteration target.
    pub left: ForInTarget,
    /// The object whose enumerable keys are iterated.
    pub object: Expression,
    /// The loop body.
    pub body: Box<Statement>,
    /// Label slot assigned when the loop is a break/continue target.
    pub label: LabelSlot,
    /// Source range.
    pub span: Span,
}

/// Left-hand side of a for-in loop
#[derive(Debug, Clone, PartialEq)]
pub enum ForInTarget {
    /// `for (var x in obj)`
    VariableDecl(VariableDecl),
    /// `for (x in obj)`, `for (o.p in obj)`; must be an l-value.
    Pattern(Expression),
}

/// Labeled statement: `name: stmt`
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledStatement {
    /// The label name.
    pub label: Identifier,
    /// The labeled statement.
    pub body: Box<Statement>,
    /// Label slot for `break name` when the body is not a loop.
    ///
    /// When the body is a loop the slot is allocated on the loop itself, so
    /// that `continue name` can reuse it.
    pub slot: LabelSlot,
    /// Source range.
    pub span: Span,
}

/// Break statement
#[derive(Debug, Clone, PartialEq)]
pub struct BreakStatement {
    /// Optional label name.
    pub label: Option<Identifier>,
    /// Resolved target slot, filled in by validation.
    pub target: LabelSlot,
    /// Source range.
    pub span: Span,
}

/// Continue statement
#[derive(Debug, Clone, PartialEq)]
pub struct ContinueStatement {
    /// Optional label name.
    pub label: Option<Identifier>,
    /// Resolved target slot, filled in by validation.
    pub target: LabelSlot,
    /// Source range.
    pub span: Span,
}

/// Return statement
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnStatement {
    /// Optional return value.
    pub value: Option<Expression>,
    /// Source range.
    pub span: Span,
}

/// Switch statement
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchStatement {
    /// The discriminant expression.
    pub discriminant: Expression,
    /// The cases, in source order.
    pub cases: Vec<SwitchCase>,
    /// Label slot assigned when the switch is a break target.
    pub label: LabelSlot,
    /// Source range.
    pub span: Span,
}

/// A single switch case
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCase {
    /// The test expression; `None` for the default case.
    pub test: Option<Expression>,
    /// The case body; falls through to the next case unless terminated.
    pub consequent: Vec<Statement>,
    /// Source range.
    pub span: Span,
}

/// Try-catch-finally
#[derive(Debug, Clone, PartialEq)]
pub struct TryStatement {
    /// The protected block.
    pub body: Block,
    /// Optional catch clause.
    pub catch_clause: Option<CatchClause>,
    /// Optional finally block.
    pub finally_clause: Option<Block>,
    /// Source range.
    pub span: Span,
}

/// Catch clause of a try statement
#[derive(Debug, Clone, PartialEq)]
pub struct CatchClause {
    /// Optional binding for the caught value.
    pub param: Option<Identifier>,
    /// The handler body.
    pub body: Block,
    /// Source range.
    pub span: Span,
}

/// Throw statement
#[derive(Debug, Clone, PartialEq)]
pub struct ThrowStatement {
    /// The thrown value.
    pub value: Expression,
    /// Source range.
    pub span: Span,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_slot() {
        let slot = LabelSlot::new();
        assert_eq!(slot.get(), None);
        slot.set(3);
        assert_eq!(slot.get(), Some(3));
    }

    #[test]
    fn test_is_loop() {
        let body = Box::new(Statement::Empty(Span::DUMMY));
        let w = Statement::While(WhileStatement {
            condition: Expression::BooleanLiteral(crate::expression::BooleanLiteral {
                value: true,
                span: Span::DUMMY,
            }),
            body,
            label: LabelSlot::new(),
            span: Span::DUMMY,
        });
        assert!(w.is_loop());
        assert!(w.label_slot().is_some());
        assert!(!Statement::Empty(Span::DUMMY).is_loop());
    }

    #[test]
    fn test_directive() {
        let stmt = ExpressionStatement {
            expression: Expression::StringLiteral(crate::expression::StringLiteral {
                value: "use strict".to_string(),
                span: Span::DUMMY,
            }),
            span: Span::DUMMY,
        };
        assert_eq!(stmt.directive(), Some("use strict"));
    }
}
