//! Session symbol table.
//!
//! Global-scope bindings that persist across calls on one [`Engine`](crate::Engine).
//! Per-call variables are resolved before this table, so a local binding
//! always shadows a global one with the same name.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::value::{Scope, VariableBinding};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SymbolTable {
    bindings: BTreeMap<String, VariableBinding>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable::default()
    }

    /// Insert or replace a binding, returning the previous one.
    pub fn define(&mut self, mut binding: VariableBinding) -> Option<VariableBinding> {
        binding.scope = Scope::Global;
        self.bindings.insert(binding.name.clone(), binding)
    }

    pub fn remove(&mut self, name: &str) -> Option<VariableBinding> {
        self.bindings.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&VariableBinding> {
        self.bindings.get(name)
    }

    pub fn clear(&mut self) {
        self.bindings.clear();
    }

    /// Bindings sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = &VariableBinding> {
        self.bindings.values()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Quantity;

    fn binding(name: &str, value: f64) -> VariableBinding {
        VariableBinding {
            name: name.to_string(),
            quantity: Quantity::real(value),
            description: None,
            scope: Scope::Local,
        }
    }

    #[test]
    fn test_define_forces_global_scope() {
        let mut table = SymbolTable::new();
        table.define(binding("g", 9.81));
        assert_eq!(table.get("g").unwrap().scope, Scope::Global);
    }

    #[test]
    fn test_redefine_returns_previous() {
        let mut table = SymbolTable::new();
        assert!(table.define(binding("a", 1.0)).is_none());
        let previous = table.define(binding("a", 2.0)).unwrap();
        assert_eq!(previous.quantity, Quantity::real(1.0));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_remove_and_clear() {
        let mut table = SymbolTable::new();
        table.define(binding("b", 1.0));
        table.define(binding("a", 1.0));
        let names: Vec<&str> = table.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(table.remove("a").is_some());
        assert!(table.remove("a").is_none());
        table.clear();
        assert!(table.is_empty());
    }
}
