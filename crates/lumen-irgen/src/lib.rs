//! Lumen IR Generation
//!
//! Lowers a validated syntax tree into a control-flow-graph IR: one
//! function per function-like node, an entry block performing declaration
//! hoisting and parameter binding, and fully terminated basic blocks for
//! the statement/expression tree. Nested functions reference captured
//! storage in enclosing frames through the module-wide variable arena.
//!
//! Lowering is driven entirely by the semantic context built by
//! `lumen-sema`; it never re-derives semantic facts, and a missing fact is
//! a panic (a pipeline bug), never a diagnostic.
//!
//! # Usage
//!
//! ```ignore
//! use lumen_irgen::{generate_program, PrettyPrint};
//! use lumen_sema::{validate_program, DiagnosticSink, SemContext};
//!
//! let mut sem = SemContext::new();
//! let mut sink = DiagnosticSink::new();
//! assert!(validate_program(&mut sem, &mut sink, &program));
//! let module = generate_program(&sem, &program);
//! println!("{}", module.pretty_print());
//! ```

#![warn(missing_docs)]

pub mod ir;
pub mod lower;
pub mod scope;

pub use ir::{
    BasicBlock, BasicBlockId, Function, FunctionId, FunctionKind, Instr, LazySource, Literal,
    Module, Operand, Param, PrettyPrint, Register, Terminator, Variable, VariableId,
};
pub use lower::{
    generate_error_function, generate_function, generate_program, lower_lazy_function, IrGen,
};
pub use scope::{ScopeChain, ScopeSnapshot};
