//! Lumen Syntax Tree
//!
//! Data model for the JavaScript syntax tree consumed by semantic
//! validation (`lumen-sema`) and IR generation (`lumen-irgen`). There is no
//! parser here: trees arrive from an external front-end (or are built
//! programmatically in tests) and both passes hold non-owning references
//! into them.
//!
//! Semantic facts discovered by validation are recorded in annotation cells
//! (`SemSlot`, `LabelSlot`, `StrictnessCell`) on the nodes. The cells use
//! interior mutability so that annotating never requires mutable access to
//! the tree structure itself.

#![warn(missing_docs)]

pub mod expression;
pub mod function;
pub mod span;
pub mod statement;

pub use expression::{
    AssignmentExpression, AssignmentOperator, BinaryExpression, BinaryOperator, BooleanLiteral,
    CallExpression, ConditionalExpression, Expression, Identifier, LogicalExpression,
    LogicalOperator, MemberExpression, MemberProperty, NumberLiteral, StringLiteral,
    UnaryExpression, UnaryOperator, UpdateExpression, UpdateOperator,
};
pub use function::{
    ArrowBody, ArrowFunction, FunctionDeclaration, FunctionExpression, FunctionInfoId,
    FunctionLike, FunctionNodeKind, Program, SemSlot, Strictness, StrictnessCell,
};
pub use span::Span;
pub use statement::{
    Block, BreakStatement, CatchClause, ContinueStatement, DoWhileStatement, ExpressionStatement,
    ForInStatement, ForInTarget, ForInit, ForStatement, IfStatement, LabelSlot, LabeledStatement,
    ReturnStatement, Statement, SwitchCase, SwitchStatement, ThrowStatement, TryStatement,
    VariableDecl, VariableDeclarator, WhileStatement,
};
