//! Semantic context - per-function records produced by validation
//!
//! The context outlives both passes: validation fills it in, IR generation
//! reads it. Records hold non-owning references into the caller's tree.

use lumen_ast::{FunctionDeclaration, FunctionInfoId, FunctionLike, VariableDeclarator};

/// A label slot in a function's label table.
///
/// Labels are numbered monotonically per function and never reused. Each
/// slot remembers the try region active at allocation time, because
/// non-local control transfer across try boundaries needs distinguishable
/// targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SemLabel {
    /// Per-function id of the try statement active when the label was
    /// allocated, `None` when outside any try.
    pub surrounding_try: Option<u32>,
}

/// Semantic record of one function-like node.
#[derive(Debug, Default)]
pub struct FunctionInfo<'ast> {
    /// Variable declarators to hoist, in first-seen order. Duplicate names
    /// are kept; lowering creates storage only for the first.
    pub decls: Vec<&'ast VariableDeclarator>,

    /// Nested function declarations to hoist and pre-bind, in source order.
    pub closures: Vec<&'ast FunctionDeclaration>,

    /// The label table. Its size is fixed once validation finishes;
    /// lowering indexes it but never allocates.
    pub labels: Vec<SemLabel>,

    /// Whether the function body is in strict mode.
    pub strict: bool,

    /// Conservative: an arrow function is nested somewhere inside, so
    /// `this` and `new.target` must be captured into frame storage.
    pub contains_arrow_functions: bool,

    /// Conservative: a nested arrow function may reference `arguments`,
    /// so the arguments object must be captured as well.
    pub contains_arrow_functions_using_arguments: bool,
}

impl<'ast> FunctionInfo<'ast> {
    /// Allocate a new label slot scoped to the given try region.
    pub fn allocate_label(&mut self, surrounding_try: Option<u32>) -> u32 {
        let index = self.labels.len() as u32;
        self.labels.push(SemLabel { surrounding_try });
        index
    }

    /// Number of allocated labels.
    pub fn label_count(&self) -> usize {
        self.labels.len()
    }
}

/// All semantic records for one validation/lowering session.
///
/// Function-like nodes point back into this table through their `SemSlot`
/// annotation; `info_for` follows that link.
#[derive(Debug, Default)]
pub struct SemContext<'ast> {
    infos: Vec<FunctionInfo<'ast>>,
}

impl<'ast> SemContext<'ast> {
    /// Create an empty context.
    pub fn new() -> Self {
        SemContext { infos: Vec::new() }
    }

    /// Allocate a fresh, empty function record.
    pub fn alloc(&mut self) -> FunctionInfoId {
        let id = FunctionInfoId::new(self.infos.len() as u32);
        self.infos.push(FunctionInfo::default());
        id
    }

    /// The record with the given id.
    ///
    /// Panics if the id was not allocated by this context; that is an
    /// internal consistency failure, not a user error.
    pub fn info(&self, id: FunctionInfoId) -> &FunctionInfo<'ast> {
        &self.infos[id.as_u32() as usize]
    }

    /// Mutable access to the record with the given id.
    pub fn info_mut(&mut self, id: FunctionInfoId) -> &mut FunctionInfo<'ast> {
        &mut self.infos[id.as_u32() as usize]
    }

    /// The record associated with a function-like node, if validation ran.
    pub fn info_for(&self, node: FunctionLike<'ast>) -> Option<&FunctionInfo<'ast>> {
        node.sem().get().map(|id| self.info(id))
    }

    /// Number of function records.
    pub fn len(&self) -> usize {
        self.infos.len()
    }

    /// True if no function has been validated yet.
    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_allocation_is_monotonic() {
        let mut info = FunctionInfo::default();
        assert_eq!(info.allocate_label(None), 0);
        assert_eq!(info.allocate_label(Some(1)), 1);
        assert_eq!(info.allocate_label(None), 2);
        assert_eq!(info.label_count(), 3);
        assert_eq!(info.labels[1].surrounding_try, Some(1));
    }

    #[test]
    fn test_context_alloc() {
        let mut sem = SemContext::new();
        assert!(sem.is_empty());
        let a = sem.alloc();
        let b = sem.alloc();
        assert_ne!(a, b);
        assert_eq!(sem.len(), 2);
        sem.info_mut(a).strict = true;
        assert!(sem.info(a).strict);
        assert!(!sem.info(b).strict);
    }
}
