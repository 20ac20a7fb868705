//! Named transforms defined during one compile.

use crate::error::CompileError;
use crate::primitives::Registry;
use crate::transform::Transform;

#[derive(Debug)]
struct NamedBinding {
    name: String,
    transform: Transform,
}

/// Definitions in source order. Lookups search newest first, so a later
/// definition shadows an earlier one with the same name, and both shadow
/// the registry's primitives.
#[derive(Debug)]
pub struct SymbolTable<'r> {
    bindings: Vec<NamedBinding>,
    registry: &'r Registry,
}

impl<'r> SymbolTable<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        SymbolTable {
            bindings: Vec::new(),
            registry,
        }
    }

    pub fn registry(&self) -> &'r Registry {
        self.registry
    }

    /// Take ownership of `name` and `transform` as a new binding.
    pub fn define(&mut self, name: String, transform: Transform) -> Result<(), CompileError> {
        self.bindings
            .try_reserve(1)
            .map_err(|_| CompileError::OutOfMemory)?;
        self.bindings.push(NamedBinding { name, transform });
        Ok(())
    }

    /// Resolve a name to a new reference to its transform.
    pub fn resolve(&self, name: &str) -> Option<Transform> {
        self.bindings
            .iter()
            .rev()
            .find(|b| b.name == name)
            .map(|b| b.transform.clone())
            .or_else(|| self.registry.get(name))
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
