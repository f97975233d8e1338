use std::io::Write;

use crate::{
    ast::*,
    semantic::{Analyzed, FunctionInfo},
};

const INDENT_WIDTH: usize = 2;

pub fn print_program_string(program: &Program) -> String {
    let mut buf = Vec::with_capacity(1024);
    print_program(&mut buf, program).unwrap();
    String::from_utf8(buf).unwrap()
}

pub fn print_analyzed_string(analyzed: &Analyzed) -> String {
    let mut buf = Vec::with_capacity(1024);
    print_analyzed(&mut buf, analyzed).unwrap();
    String::from_utf8(buf).unwrap()
}

pub fn print_program(w: &mut impl Write, program: &Program) -> std::io::Result<()> {
    for func in &program.functions {
        print_function(w, 0, func, None)?;
    }
    Ok(())
}

/// Like [`print_program`], also annotating each function with its frame size.
pub fn print_analyzed(w: &mut impl Write, analyzed: &Analyzed) -> std::io::Result<()> {
    for (func, info) in analyzed.functions() {
        print_function(w, 0, func, Some(info))?;
    }
    Ok(())
}

fn print_function(
    w: &mut impl Write,
    i: usize,
    func: &FuncDef,
    info: Option<&FunctionInfo>,
) -> std::io::Result<()> {
    sp(w, i)?;
    write!(w, "function {} {}(", func.return_ty, func.name)?;
    for (idx, param) in func.params.iter().enumerate() {
        if idx > 0 {
            write!(w, ", ")?;
        }
        write!(w, "{} {}", param.ty, param.name)?;
    }
    write!(w, ")")?;
    if let Some(info) = info {
        write!(w, " [slots: {}]", info.frame_slots)?;
    }
    writeln!(w)?;
    print_stmts(w, i + 1, &func.body)
}

fn print_stmts(w: &mut impl Write, i: usize, block: &Block) -> std::io::Result<()> {
    for stmt in &block.stmts {
        print_stmt(w, i, stmt)?;
    }
    Ok(())
}

pub fn print_stmt(w: &mut impl Write, i: usize, stmt: &Stmt) -> std::io::Result<()> {
    sp(w, i)?;
    match &stmt.kind {
        StmtKind::VarDecl { name, init } => {
            writeln!(w, "declare {name}")?;
            print_expr(w, i + 1, init)?;
        }
        StmtKind::Assign { target, value } => {
            writeln!(w, "assign {target}")?;
            print_expr(w, i + 1, value)?;
        }
        StmtKind::Expr(expr) => {
            writeln!(w, "expr")?;
            print_expr(w, i + 1, expr)?;
        }
        StmtKind::Return(value) => {
            writeln!(w, "return")?;
            if let Some(value) = value {
                print_expr(w, i + 1, value)?;
            }
        }
        StmtKind::If {
            cond,
            then_arm,
            else_arm,
        } => {
            writeln!(w, "if")?;
            print_expr(w, i + 1, cond)?;
            sp(w, i + 1)?;
            writeln!(w, "then")?;
            print_stmts(w, i + 2, then_arm)?;
            if let Some(else_arm) = else_arm {
                sp(w, i + 1)?;
                writeln!(w, "else")?;
                print_stmts(w, i + 2, else_arm)?;
            }
        }
        StmtKind::While { cond, body } => {
            writeln!(w, "while")?;
            print_expr(w, i + 1, cond)?;
            sp(w, i + 1)?;
            writeln!(w, "do")?;
            print_stmts(w, i + 2, body)?;
        }
        StmtKind::Break => writeln!(w, "break")?,
        StmtKind::Continue => writeln!(w, "continue")?,
        StmtKind::Block(block) => {
            writeln!(w, "block")?;
            print_stmts(w, i + 1, block)?;
        }
    }
    Ok(())
}

pub fn print_expr(w: &mut impl Write, i: usize, expr: &Expr) -> std::io::Result<()> {
    sp(w, i)?;
    let span = expr.span;
    match &expr.kind {
        ExprKind::Number(value) => writeln!(w, "number {value} ({span})")?,
        ExprKind::Var(ident) => writeln!(w, "var {ident} ({span})")?,
        ExprKind::Unary { op, expr } => {
            writeln!(w, "unary {op:?} ({span})")?;
            print_expr(w, i + 1, expr)?;
        }
        ExprKind::Binary { op, lhs, rhs } => {
            writeln!(w, "binary {op:?} ({span})")?;
            print_expr(w, i + 1, lhs)?;
            print_expr(w, i + 1, rhs)?;
        }
        ExprKind::Call { callee, args } => {
            writeln!(w, "call {callee} ({span})")?;
            for arg in args {
                print_expr(w, i + 1, arg)?;
            }
        }
    }
    Ok(())
}

fn sp(w: &mut impl Write, i: usize) -> std::io::Result<()> {
    write!(w, "{:width$}", "", width = i * INDENT_WIDTH)
}
