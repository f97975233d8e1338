use crate::{
    ast::{Block, Expr, ExprKind, FuncDef, Ident, Program, Stmt, StmtKind, Type},
    scope::{Scopes, Symbol, SymbolKind},
    token::{Span, Spanned},
};

/// Checks the program, returning it along with the per-function information
/// code generation needs.
///
/// All diagnostics are collected; if there is at least one, the program is
/// rejected.
pub fn analyze(program: Program) -> Result<Analyzed, Vec<Spanned<Error>>> {
    let (analyzed, errors) = Analyzer::new().run(program);
    log::debug!(
        "analyzed {} function(s) with {} diagnostic(s)",
        analyzed.functions.len(),
        errors.len()
    );
    if errors.is_empty() {
        Ok(analyzed)
    } else {
        Err(errors)
    }
}

/// Same as [`analyze`], but always hands back the analyzed program, so that
/// tests can drive the code generator with programs the analyzer rejects.
#[cfg(test)]
pub(crate) fn analyze_all(program: Program) -> (Analyzed, Vec<Spanned<Error>>) {
    Analyzer::new().run(program)
}

/// A program that passed semantic analysis.
#[derive(Debug)]
pub struct Analyzed {
    program: Program,
    /// In the same order as `program.functions`.
    functions: Vec<FunctionInfo>,
}

impl Analyzed {
    /// Iterates over every function definition along with its information.
    pub fn functions(&self) -> impl Iterator<Item = (&FuncDef, &FunctionInfo)> {
        self.program.functions.iter().zip(&self.functions)
    }

    pub fn function(&self, name: &str) -> Option<&FunctionInfo> {
        self.functions()
            .find(|(def, _)| &*def.name.name == name)
            .map(|(_, info)| info)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunctionInfo {
    pub return_ty: Type,
    pub params: Box<[Type]>,
    /// Number of 4-byte stack slots: one per parameter and one per local
    /// declaration in the body.
    pub frame_slots: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("redefinition of function {name} (previously defined at {previous})")]
    DuplicateFunction { name: Box<str>, previous: Span },
    #[error("duplicate parameter {0}")]
    DuplicateParameter(Box<str>),
    #[error("redeclaration of {name} (previously declared at {previous})")]
    Redeclaration { name: Box<str>, previous: Span },
    #[error("undeclared identifier {0}")]
    UndeclaredIdentifier(Box<str>),
    #[error("{0} is not a function")]
    NotAFunction(Box<str>),
    #[error("{0} is a function, not a variable")]
    NotAVariable(Box<str>),
    #[error("function {name} expects {expected} argument(s), but got {actual}")]
    ArityMismatch {
        name: Box<str>,
        expected: usize,
        actual: usize,
    },
    #[error("void function {0} does not produce a value")]
    VoidValue(Box<str>),
    #[error("void function {0} should not return a value")]
    ReturnValueInVoid(Box<str>),
    #[error("non-void function {0} should return a value")]
    MissingReturnValue(Box<str>),
    #[error("non-void function {0} does not return a value on every path")]
    MissingReturn(Box<str>),
    #[error("break statement not within a loop")]
    BreakOutsideLoop,
    #[error("continue statement not within a loop")]
    ContinueOutsideLoop,
}

struct Analyzer {
    scopes: Scopes,
    errors: Vec<Spanned<Error>>,
    // Per-function state.
    function: Box<str>,
    return_ty: Type,
    loop_depth: usize,
    locals: usize,
}

impl Analyzer {
    fn new() -> Analyzer {
        Analyzer {
            scopes: Scopes::with_capacity(16),
            errors: Vec::with_capacity(8),
            function: Box::from(""),
            return_ty: Type::Void,
            loop_depth: 0,
            locals: 0,
        }
    }

    fn run(mut self, program: Program) -> (Analyzed, Vec<Spanned<Error>>) {
        // Unit scope. Every function is declared upfront so that calls may
        // refer to functions defined later in the source.
        self.scopes.push();
        for func in &program.functions {
            let params = func.params.iter().map(|p| p.ty).collect();
            let symbol = Symbol::function(func.return_ty, params, func.name.span);
            if let Err(previous) = self.scopes.declare(&func.name.name, symbol) {
                let error = Error::DuplicateFunction {
                    name: func.name.name.clone(),
                    previous: previous.span,
                };
                self.errors.push(func.name.span.wrap(error));
            }
        }

        let functions = program
            .functions
            .iter()
            .map(|func| self.analyze_function(func))
            .collect();
        self.scopes.pop();
        debug_assert_eq!(self.scopes.depth(), 0);

        let analyzed = Analyzed { program, functions };
        (analyzed, self.errors)
    }

    fn analyze_function(&mut self, func: &FuncDef) -> FunctionInfo {
        self.function = func.name.name.clone();
        self.return_ty = func.return_ty;
        self.loop_depth = 0;
        self.locals = 0;

        // Function scope, holding the parameters. The body block opens a
        // scope of its own.
        self.scopes.push();
        for param in &func.params {
            let symbol = Symbol::variable(param.name.span);
            if self.scopes.declare(&param.name.name, symbol).is_err() {
                let error = Error::DuplicateParameter(param.name.name.clone());
                self.errors.push(param.name.span.wrap(error));
            }
        }
        self.block(&func.body);
        self.scopes.pop();

        if func.return_ty == Type::Int && !block_always_returns(&func.body) {
            let error = Error::MissingReturn(func.name.name.clone());
            self.errors.push(func.name.span.wrap(error));
        }

        FunctionInfo {
            return_ty: func.return_ty,
            params: func.params.iter().map(|p| p.ty).collect(),
            frame_slots: func.params.len() + self.locals,
        }
    }

    fn block(&mut self, block: &Block) {
        self.scopes.push();
        for stmt in &block.stmts {
            self.stmt(stmt);
        }
        self.scopes.pop();
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::VarDecl { name, init } => {
                // The initializer is checked before the name comes into scope.
                self.expr(init, true);
                self.locals += 1;
                let symbol = Symbol::variable(name.span);
                if let Err(previous) = self.scopes.declare(&name.name, symbol) {
                    let error = Error::Redeclaration {
                        name: name.name.clone(),
                        previous: previous.span,
                    };
                    self.errors.push(name.span.wrap(error));
                }
            }
            StmtKind::Assign { target, value } => {
                self.variable(target);
                self.expr(value, true);
            }
            StmtKind::Expr(expr) => self.expr(expr, false),
            StmtKind::Return(value) => match (self.return_ty, value) {
                (Type::Void, Some(value)) => {
                    self.expr(value, false);
                    let error = Error::ReturnValueInVoid(self.function.clone());
                    self.errors.push(stmt.span.wrap(error));
                }
                (Type::Int, None) => {
                    let error = Error::MissingReturnValue(self.function.clone());
                    self.errors.push(stmt.span.wrap(error));
                }
                (Type::Int, Some(value)) => self.expr(value, true),
                (Type::Void, None) => (),
            },
            StmtKind::If {
                cond,
                then_arm,
                else_arm,
            } => {
                self.expr(cond, true);
                self.block(then_arm);
                if let Some(else_arm) = else_arm {
                    self.block(else_arm);
                }
            }
            StmtKind::While { cond, body } => {
                self.expr(cond, true);
                self.loop_depth += 1;
                self.block(body);
                self.loop_depth -= 1;
            }
            StmtKind::Break => {
                if self.loop_depth == 0 {
                    self.errors.push(stmt.span.wrap(Error::BreakOutsideLoop));
                }
            }
            StmtKind::Continue => {
                if self.loop_depth == 0 {
                    self.errors.push(stmt.span.wrap(Error::ContinueOutsideLoop));
                }
            }
            StmtKind::Block(block) => self.block(block),
        }
    }

    /// Checks an expression. `needs_value` is false only for the whole
    /// expression of an expression statement, where `void` calls are allowed.
    fn expr(&mut self, expr: &Expr, needs_value: bool) {
        match &expr.kind {
            ExprKind::Number(_) => (),
            ExprKind::Var(ident) => self.variable(ident),
            ExprKind::Unary { expr, .. } => self.expr(expr, true),
            ExprKind::Binary { lhs, rhs, .. } => {
                self.expr(lhs, true);
                self.expr(rhs, true);
            }
            ExprKind::Call { callee, args } => {
                self.call(callee, args.len(), needs_value, expr.span);
                for arg in args {
                    self.expr(arg, true);
                }
            }
        }
    }

    fn call(&mut self, callee: &Ident, arity: usize, needs_value: bool, span: Span) {
        let error = match self.scopes.lookup(&callee.name) {
            None => callee
                .span
                .wrap(Error::UndeclaredIdentifier(callee.name.clone())),
            Some(Symbol {
                kind: SymbolKind::Variable,
                ..
            }) => callee.span.wrap(Error::NotAFunction(callee.name.clone())),
            Some(Symbol {
                ty,
                kind: SymbolKind::Function { params },
                ..
            }) => {
                if params.len() != arity {
                    span.wrap(Error::ArityMismatch {
                        name: callee.name.clone(),
                        expected: params.len(),
                        actual: arity,
                    })
                } else if needs_value && *ty == Type::Void {
                    span.wrap(Error::VoidValue(callee.name.clone()))
                } else {
                    return;
                }
            }
        };
        self.errors.push(error);
    }

    /// Checks a name used as a variable, either read or assigned.
    fn variable(&mut self, ident: &Ident) {
        let error = match self.scopes.lookup(&ident.name) {
            None => Error::UndeclaredIdentifier(ident.name.clone()),
            Some(symbol) if symbol.is_function() => Error::NotAVariable(ident.name.clone()),
            Some(_) => return,
        };
        self.errors.push(ident.span.wrap(error));
    }
}

/// Whether control can never reach the end of the block.
pub(crate) fn block_always_returns(block: &Block) -> bool {
    block.stmts.iter().any(stmt_always_returns)
}

fn stmt_always_returns(stmt: &Stmt) -> bool {
    match &stmt.kind {
        StmtKind::Return(_) => true,
        StmtKind::Block(block) => block_always_returns(block),
        StmtKind::If {
            then_arm,
            else_arm: Some(else_arm),
            ..
        } => block_always_returns(then_arm) && block_always_returns(else_arm),
        // An infinite loop only completes through a `break`.
        StmtKind::While { cond, body } => {
            matches!(cond.kind, ExprKind::Number(n) if n != 0) && !block_breaks(body)
        }
        _ => false,
    }
}

/// Whether the block contains a `break` targeting the enclosing loop. Nested
/// loops are not searched.
fn block_breaks(block: &Block) -> bool {
    block.stmts.iter().any(|stmt| match &stmt.kind {
        StmtKind::Break => true,
        StmtKind::Block(block) => block_breaks(block),
        StmtKind::If {
            then_arm, else_arm, ..
        } => block_breaks(then_arm) || else_arm.as_ref().is_some_and(block_breaks),
        _ => false,
    })
}
