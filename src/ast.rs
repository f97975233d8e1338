// program   ::= func_def+
// func_def  ::= ('int' | 'void') ID '(' [param (',' param)*] ')' block
// param     ::= 'int' ID
// block     ::= '{' stmt* '}'
// stmt      ::= 'int' ID '=' expr ';'
//             | ID '=' expr ';'
//             | expr ';'
//             | 'return' [expr] ';'
//             | 'if' '(' expr ')' stmt ['else' stmt]
//             | 'while' '(' expr ')' stmt
//             | 'break' ';'
//             | 'continue' ';'
//             | block
// expr      ::= expr binop expr
//             | unop expr
//             | ID '(' [expr (',' expr)*] ')'
//             | '(' expr ')'
//             | ID
//             | integer

// Precedence
//
// + - !     (prefix)
// * / %
// + -
// < > <= >= == !=
// &&
// ||

use std::fmt;

use crate::token::Span;

#[derive(Debug, PartialEq, Default)]
pub struct Program {
    pub functions: Vec<FuncDef>,
}

#[derive(Debug, PartialEq)]
pub struct FuncDef {
    pub return_ty: Type,
    pub name: Ident,
    pub params: Vec<Param>,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, PartialEq)]
pub struct Param {
    pub ty: Type,
    pub name: Ident,
}

#[derive(Debug, PartialEq)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

impl Block {
    /// Wraps a single statement into a block, so that `if`/`while` bodies are
    /// always blocks.
    pub fn synthetic(stmt: Stmt) -> Block {
        let span = stmt.span;
        Block {
            stmts: vec![stmt],
            span,
        }
    }
}

#[derive(Debug, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Debug, PartialEq)]
pub enum StmtKind {
    VarDecl {
        name: Ident,
        init: Expr,
    },
    Assign {
        target: Ident,
        value: Expr,
    },
    Expr(Expr),
    Return(Option<Expr>),
    If {
        cond: Expr,
        then_arm: Block,
        else_arm: Option<Block>,
    },
    While {
        cond: Expr,
        body: Block,
    },
    Break,
    Continue,
    Block(Block),
}

#[derive(Debug, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    /// Whether this expression is a literal or a variable, i.e., whether it
    /// can be loaded into a register without evaluating anything else.
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, ExprKind::Number(_) | ExprKind::Var(_))
    }
}

#[derive(Debug, PartialEq)]
pub enum ExprKind {
    Number(i32),
    Var(Ident),
    Unary {
        op: UnaryOperator,
        expr: Box<Expr>,
    },
    Binary {
        op: BinaryOperator,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Call {
        callee: Ident,
        args: Vec<Expr>,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Type {
    Int,
    Void,
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => f.write_str("int"),
            Type::Void => f.write_str("void"),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UnaryOperator {
    Plus,
    Neg,
    Not,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

impl BinaryOperator {
    pub fn symbol(self) -> &'static str {
        use BinaryOperator::*;
        match self {
            Add => "+",
            Sub => "-",
            Mul => "*",
            Div => "/",
            Rem => "%",
            Lt => "<",
            Gt => ">",
            Le => "<=",
            Ge => ">=",
            Eq => "==",
            Ne => "!=",
            And => "&&",
            Or => "||",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Ident {
    pub name: Box<str>,
    pub span: Span,
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
