use std::collections::HashMap;

use crate::{ast::Type, token::Span};

/// What a name is bound to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Symbol {
    pub ty: Type,
    pub kind: SymbolKind,
    /// Where the name was declared.
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SymbolKind {
    Variable,
    Function { params: Box<[Type]> },
}

impl Symbol {
    pub fn variable(span: Span) -> Symbol {
        Symbol {
            ty: Type::Int,
            kind: SymbolKind::Variable,
            span,
        }
    }

    pub fn function(ty: Type, params: Box<[Type]>, span: Span) -> Symbol {
        Symbol {
            ty,
            kind: SymbolKind::Function { params },
            span,
        }
    }

    pub fn is_function(&self) -> bool {
        matches!(self.kind, SymbolKind::Function { .. })
    }
}

/// A stack of lexical scopes.
///
/// Lookups walk from the innermost scope outwards, so inner declarations
/// shadow outer ones.
#[derive(Debug, Default)]
pub struct Scopes {
    stack: Vec<HashMap<Box<str>, Symbol>>,
}

impl Scopes {
    pub fn with_capacity(capacity: usize) -> Scopes {
        Scopes {
            stack: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self) {
        self.stack.push(HashMap::new());
    }

    pub fn pop(&mut self) {
        let popped = self.stack.pop();
        debug_assert!(popped.is_some(), "unbalanced scope pop");
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Attempts to declare `name` in the innermost scope.
    ///
    /// Fails, returning the previous symbol, if the innermost scope already
    /// binds that name. Outer bindings never cause a failure.
    pub fn declare(&mut self, name: &str, symbol: Symbol) -> Result<(), &Symbol> {
        let scope = self
            .stack
            .last_mut()
            .expect("declare requires an open scope");
        if scope.contains_key(name) {
            return Err(&scope[name]);
        }
        scope.insert(Box::from(name), symbol);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.stack.iter().rev().find_map(|scope| scope.get(name))
    }
}
