use std::collections::{HashMap, HashSet};

use crate::SemanticError;

/// Names known to one parse: function arities and the variables of the function being parsed
pub(crate) struct SymbolTables {
    prototypes: HashMap<String, usize>,
    functions: HashMap<String, usize>,
    variables: HashSet<String>,
}

impl SymbolTables {
    pub fn new() -> Self {
        Self {
            prototypes: HashMap::with_capacity(20),
            functions: HashMap::with_capacity(20),
            variables: HashSet::new(),
        }
    }

    /// Records a prototype. A name can be prototyped once, and a prototype
    /// following a definition must agree with it.
    pub fn declare_prototype(&mut self, name: &str, arity: usize) -> Result<(), SemanticError> {
        if self.prototypes.contains_key(name) {
            return Err(SemanticError::PrototypeRedeclared(name.to_string()));
        }

        if let Some(&defined) = self.functions.get(name) {
            if defined != arity {
                return Err(SemanticError::ArityMismatch {
                    name: name.to_string(),
                    expected: defined,
                    found: arity,
                });
            }
        }

        self.prototypes.insert(name.to_string(), arity);
        Ok(())
    }

    /// Checks that a definition agrees with an earlier prototype and is not a second body
    pub fn check_definition(&self, name: &str, arity: usize) -> Result<(), SemanticError> {
        if let Some(&declared) = self.prototypes.get(name) {
            if declared != arity {
                return Err(SemanticError::ArityMismatch {
                    name: name.to_string(),
                    expected: declared,
                    found: arity,
                });
            }
        }

        if self.functions.contains_key(name) {
            return Err(SemanticError::FunctionRedefined(name.to_string()));
        }

        Ok(())
    }

    pub fn define_function(&mut self, name: &str, arity: usize) {
        self.functions.insert(name.to_string(), arity);
    }

    /// Arity of a callable name, prototypes first
    pub fn resolve_call(&self, name: &str) -> Option<usize> {
        self.prototypes
            .get(name)
            .or_else(|| self.functions.get(name))
            .copied()
    }

    pub fn begin_function(&mut self) {
        self.variables.clear();
    }

    pub fn declare_variable(&mut self, name: &str) -> Result<(), SemanticError> {
        if !self.variables.insert(name.to_string()) {
            return Err(SemanticError::DuplicateVariable(name.to_string()));
        }

        Ok(())
    }

    pub fn is_variable(&self, name: &str) -> bool {
        self.variables.contains(name)
    }
}
