//! Scoped name table
//!
//! Maps source names to frame variables during lowering. Scopes form a
//! stack: one pushed per function frame plus short-lived inner scopes for
//! catch parameters and named function expressions. Lookup walks innermost
//! to outermost, which is exactly how a nested function resolves a captured
//! name to an enclosing frame's variable.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::ir::VariableId;

/// The active name lookup chain.
#[derive(Debug, Default)]
pub struct ScopeChain {
    scopes: Vec<FxHashMap<String, VariableId>>,
}

impl ScopeChain {
    /// An empty chain with no active scope.
    pub fn new() -> Self {
        ScopeChain::default()
    }

    /// Enter a new innermost scope.
    pub fn push_scope(&mut self) {
        self.scopes.push(FxHashMap::default());
    }

    /// Leave the innermost scope, dropping its bindings.
    pub fn pop_scope(&mut self) {
        self.scopes.pop().expect("scope chain underflow");
    }

    /// Bind a name in the innermost scope, shadowing outer bindings.
    pub fn declare(&mut self, name: impl Into<String>, var: VariableId) {
        self.scopes
            .last_mut()
            .expect("no active scope")
            .insert(name.into(), var);
    }

    /// Resolve a name, innermost scope first.
    pub fn lookup(&self, name: &str) -> Option<VariableId> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name).copied())
    }

    /// Resolve a name in the innermost scope only.
    pub fn lookup_innermost(&self, name: &str) -> Option<VariableId> {
        self.scopes
            .last()
            .and_then(|scope| scope.get(name).copied())
    }

    /// Number of active scopes.
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// An immutable, serializable copy of the whole chain.
    ///
    /// Bindings are sorted per scope so equal chains snapshot identically.
    pub fn snapshot(&self) -> ScopeSnapshot {
        let scopes = self
            .scopes
            .iter()
            .map(|scope| {
                let mut bindings: Vec<(String, VariableId)> = scope
                    .iter()
                    .map(|(name, var)| (name.clone(), *var))
                    .collect();
                bindings.sort_unstable_by(|a, b| a.0.cmp(&b.0));
                bindings
            })
            .collect();
        ScopeSnapshot { scopes }
    }

    /// Rebuild a chain from a snapshot.
    pub fn from_snapshot(snapshot: &ScopeSnapshot) -> Self {
        let scopes = snapshot
            .scopes
            .iter()
            .map(|bindings| {
                bindings
                    .iter()
                    .map(|(name, var)| (name.clone(), *var))
                    .collect()
            })
            .collect();
        ScopeChain { scopes }
    }
}

/// Serializable snapshot of a `ScopeChain`, carried by lazy stubs.
///
/// A read-only lookup handle: resuming a deferred body rebuilds a fresh
/// chain from it instead of aliasing the original builder's state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeSnapshot {
    scopes: Vec<Vec<(String, VariableId)>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_prefers_inner_scope() {
        let mut chain = ScopeChain::new();
        chain.push_scope();
        chain.declare("x", VariableId(0));
        chain.push_scope();
        chain.declare("x", VariableId(1));
        assert_eq!(chain.lookup("x"), Some(VariableId(1)));
        assert_eq!(chain.lookup_innermost("y"), None);
        chain.pop_scope();
        assert_eq!(chain.lookup("x"), Some(VariableId(0)));
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut chain = ScopeChain::new();
        chain.push_scope();
        chain.declare("a", VariableId(3));
        chain.push_scope();
        chain.declare("b", VariableId(4));

        let snapshot = chain.snapshot();
        let rebuilt = ScopeChain::from_snapshot(&snapshot);
        assert_eq!(rebuilt.depth(), 2);
        assert_eq!(rebuilt.lookup("a"), Some(VariableId(3)));
        assert_eq!(rebuilt.lookup("b"), Some(VariableId(4)));
        assert_eq!(rebuilt.snapshot(), snapshot);
    }

    #[test]
    fn test_snapshot_is_deterministic() {
        let mut a = ScopeChain::new();
        a.push_scope();
        a.declare("x", VariableId(0));
        a.declare("y", VariableId(1));

        let mut b = ScopeChain::new();
        b.push_scope();
        b.declare("y", VariableId(1));
        b.declare("x", VariableId(0));

        assert_eq!(a.snapshot(), b.snapshot());
    }
}
