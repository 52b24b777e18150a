//! Lexically nested namespace scopes.
//!
//! Each element start-tag pushes a scope; its end-tag pops it. Lookup walks
//! outward to the document scope, which holds the two reserved globals. The
//! DOM parser binds prefixes to namespace nodes; the event reader only
//! tracks the binding facts it needs.

use xylem_util::{MapInsert, OrderedMap};

pub(crate) struct ScopeChain<V: Clone> {
    scopes: Vec<OrderedMap<String, V>>,
}

impl<V: Clone> ScopeChain<V> {
    pub fn new() -> Self {
        ScopeChain { scopes: Vec::new() }
    }

    pub fn push(&mut self) {
        self.scopes.push(OrderedMap::new());
    }

    pub fn pop(&mut self) {
        self.scopes.pop();
    }

    /// Binds a prefix in the innermost scope. `Updated` signals a duplicate
    /// declaration on the same element.
    pub fn insert(&mut self, prefix: &str, binding: V) -> MapInsert {
        self.scopes
            .last_mut()
            .expect("scope chain is never empty during a parse")
            .insert(prefix.to_string(), binding)
    }

    /// Resolves a prefix against the chain, innermost scope first.
    pub fn lookup(&self, prefix: &str) -> Option<V> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get_str(prefix).cloned())
    }
}
