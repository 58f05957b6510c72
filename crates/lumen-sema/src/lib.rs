//! Lumen Semantic Validation
//!
//! Single top-down traversal over the syntax tree that builds a semantic
//! record per function-like node (hoisted declarations, nested closures,
//! label table, strictness, closure-capture flags) and rejects
//! syntactically legal but semantically invalid programs.
//!
//! This crate provides:
//! - `SemContext` / `FunctionInfo` — the per-function semantic records,
//!   queryable read-only after validation
//! - `validate_program` / `validate_function` — the validation entry points
//! - `SemError` and a diagnostic sink with bulk accumulation (validation
//!   never aborts on the first error)
//! - codespan-reporting based rendering of accumulated diagnostics
//!
//! # Usage
//!
//! ```ignore
//! use lumen_sema::{validate_program, DiagnosticSink, SemContext};
//!
//! let mut sem = SemContext::new();
//! let mut sink = DiagnosticSink::new();
//! if !validate_program(&mut sem, &mut sink, &program) {
//!     for err in sink.errors() {
//!         eprintln!("{}", err);
//!     }
//! }
//! ```

#![warn(missing_docs)]

pub mod context;
pub mod diagnostic;
pub mod error;
pub mod validator;

pub use context::{FunctionInfo, SemContext, SemLabel};
pub use diagnostic::Diagnostic;
pub use error::{DiagnosticSink, SemError};
pub use validator::{validate_function, validate_program, Validator};
