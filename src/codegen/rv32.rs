use std::{collections::HashMap, fmt, format_args as f, marker::PhantomData};

use crate::{
    ast::{BinaryOperator, Block, Expr, ExprKind, FuncDef, Ident, Stmt, StmtKind, UnaryOperator},
    codegen::{rv32_env, Error},
    semantic::{self, Analyzed, FunctionInfo},
    token::{Span, Spanned},
};

type Result<T = (), E = Spanned<Error>> = std::result::Result<T, E>;

/// Registers used to pass arguments, in order.
const ARG_REGS: [&str; 8] = ["a0", "a1", "a2", "a3", "a4", "a5", "a6", "a7"];

/// Bytes of every stack slot (one `int`).
const SLOT_SIZE: usize = 4;

/// The stack pointer must stay aligned to this many bytes.
const STACK_ALIGN: usize = 16;

/// Largest aligned frame whose size still fits the 12-bit signed immediate
/// of `addi s0, sp, size`.
const MAX_FRAME_SIZE: usize = 2032;

pub struct Generator<W, E> {
    writer: W,
    indent: bool,
    /// Shared by every function, so labels are unique in the whole output.
    label_count: usize,
    frame: Frame,
    /// Name to slot index, one map per open block.
    scopes: Vec<HashMap<Box<str>, usize>>,
    next_slot: usize,
    /// `(break, continue)` targets of the enclosing loops, innermost last.
    loops: Vec<(Label, Label)>,
    _env: PhantomData<E>,
}

impl<W, E> Generator<W, E>
where
    W: fmt::Write,
    E: rv32_env::Env,
{
    pub fn new(writer: W) -> Generator<W, E> {
        Generator {
            writer,
            indent: false,
            label_count: 0,
            frame: Frame::new(0),
            scopes: Vec::with_capacity(8),
            next_slot: 0,
            loops: Vec::with_capacity(4),
            _env: PhantomData,
        }
    }

    /// Generates the whole program, returning the writer back.
    pub fn generate(mut self, analyzed: &Analyzed) -> Result<W> {
        self.out(f!("# generated by toyc for {}", E::TARGET));
        self.out(".text");
        self.out_line();
        for (func, info) in analyzed.functions() {
            self.g_function(func, info)?;
        }
        Ok(self.writer)
    }
}

/// Statements and control flow.
impl<W, E> Generator<W, E>
where
    W: fmt::Write,
    E: rv32_env::Env,
{
    fn g_function(&mut self, func: &FuncDef, info: &FunctionInfo) -> Result {
        if func.params.len() > ARG_REGS.len() {
            let error = Error::TooManyParameters(func.params.len());
            return Err(func.name.span.wrap(error));
        }

        let frame = Frame::new(info.frame_slots);
        if frame.size > MAX_FRAME_SIZE {
            return Err(func.name.span.wrap(Error::FrameTooLarge(frame.size)));
        }

        self.frame = frame;
        self.next_slot = 0;
        self.scopes.clear();
        self.loops.clear();
        log::debug!(
            "function {}: {} slot(s), {} byte frame",
            func.name,
            info.frame_slots,
            self.frame.size
        );

        self.out(f!(".globl {}", func.name));
        self.out(f!("{}:", func.name));
        self.indented(|this| {
            this.g_prologue();

            // Parameters live in the outermost scope, copied from the
            // argument registers.
            this.scopes.push(HashMap::new());
            for (param, reg) in func.params.iter().zip(ARG_REGS) {
                let offset = this.declare(&param.name.name);
                this.out(f!("sw {reg}, {offset}(s0)"));
            }
            this.g_block(&func.body)?;
            this.scopes.pop();

            if !semantic::block_always_returns(&func.body) {
                this.g_epilogue();
            }
            Ok(())
        })
    }

    fn g_prologue(&mut self) {
        let size = self.frame.size;
        self.out(f!("addi sp, sp, -{size}"));
        self.out(f!("sw ra, {}(sp)", size - 4));
        self.out(f!("sw s0, {}(sp)", size - 8));
        self.out(f!("addi s0, sp, {size}"));
    }

    fn g_epilogue(&mut self) {
        let size = self.frame.size;
        self.out(f!("lw ra, {}(sp)", size - 4));
        self.out(f!("lw s0, {}(sp)", size - 8));
        self.out(f!("addi sp, sp, {size}"));
        self.out("ret");
    }

    fn g_block(&mut self, block: &Block) -> Result {
        self.scopes.push(HashMap::new());
        for stmt in &block.stmts {
            self.g_stmt(stmt)?;
        }
        self.scopes.pop();
        Ok(())
    }

    fn g_stmt(&mut self, stmt: &Stmt) -> Result {
        match &stmt.kind {
            StmtKind::VarDecl { name, init } => {
                self.g_expr(init)?;
                let offset = self.declare(&name.name);
                self.out(f!("sw a0, {offset}(s0)"));
            }
            StmtKind::Assign { target, value } => {
                self.g_expr(value)?;
                let offset = self.resolve(target)?;
                self.out(f!("sw a0, {offset}(s0)"));
            }
            StmtKind::Expr(expr) => self.g_expr(expr)?,
            StmtKind::Return(value) => {
                if let Some(value) = value {
                    self.g_expr(value)?;
                }
                self.g_epilogue();
            }
            StmtKind::If {
                cond,
                then_arm,
                else_arm,
            } => {
                let else_label = else_arm.as_ref().map(|_| self.label("else"));
                let end = self.label("endif");

                self.g_expr(cond)?;
                self.out(f!("beqz a0, {}", else_label.unwrap_or(end)));
                self.g_block(then_arm)?;
                if let (Some(else_arm), Some(else_label)) = (else_arm, else_label) {
                    self.out(f!("j {end}"));
                    self.out_label(else_label);
                    self.g_block(else_arm)?;
                }
                self.out_label(end);
            }
            StmtKind::While { cond, body } => {
                let head = self.label("loop");
                let end = self.label("endloop");

                self.out_label(head);
                self.g_expr(cond)?;
                self.out(f!("beqz a0, {end}"));
                self.loops.push((end, head));
                self.g_block(body)?;
                self.loops.pop();
                self.out(f!("j {head}"));
                self.out_label(end);
            }
            StmtKind::Break => {
                let Some(&(end, _)) = self.loops.last() else {
                    return Err(stmt.span.wrap(Error::BreakOutsideLoop));
                };
                self.out(f!("j {end}"));
            }
            StmtKind::Continue => {
                let Some(&(_, head)) = self.loops.last() else {
                    return Err(stmt.span.wrap(Error::ContinueOutsideLoop));
                };
                self.out(f!("j {head}"));
            }
            StmtKind::Block(block) => self.g_block(block)?,
        }
        Ok(())
    }
}

/// Expressions. Every expression leaves its value in `a0`.
impl<W, E> Generator<W, E>
where
    W: fmt::Write,
    E: rv32_env::Env,
{
    fn g_expr(&mut self, expr: &Expr) -> Result {
        match &expr.kind {
            ExprKind::Number(_) | ExprKind::Var(_) => self.g_leaf(expr, "a0")?,
            ExprKind::Unary { op, expr } => {
                self.g_expr(expr)?;
                match op {
                    UnaryOperator::Plus => (),
                    UnaryOperator::Neg => self.out("neg a0, a0"),
                    UnaryOperator::Not => self.out("seqz a0, a0"),
                }
            }
            ExprKind::Binary {
                op: op @ (BinaryOperator::And | BinaryOperator::Or),
                lhs,
                rhs,
            } => self.g_logical(*op, lhs, rhs)?,
            ExprKind::Binary { op, lhs, rhs } => {
                if !E::HAS_MUL_DIV
                    && matches!(
                        op,
                        BinaryOperator::Mul | BinaryOperator::Div | BinaryOperator::Rem
                    )
                {
                    let error = Error::UnsupportedOperator {
                        op: op.symbol(),
                        target: E::TARGET,
                    };
                    return Err(expr.span.wrap(error));
                }

                self.g_expr(lhs)?;
                if rhs.is_leaf() {
                    self.out("mv t0, a0");
                    self.g_expr(rhs)?;
                } else {
                    // The right operand may clobber `t0`, so the left one
                    // waits on the stack.
                    self.push_a0();
                    self.g_expr(rhs)?;
                    self.pop_t0();
                }
                self.g_binary(*op);
            }
            ExprKind::Call { callee, args } => self.g_call(callee, args, expr.span)?,
        }
        Ok(())
    }

    /// Loads a literal or a variable straight into `reg`.
    fn g_leaf(&mut self, expr: &Expr, reg: &str) -> Result {
        match &expr.kind {
            ExprKind::Number(value) => self.out(f!("li {reg}, {value}")),
            ExprKind::Var(ident) => {
                let offset = self.resolve(ident)?;
                self.out(f!("lw {reg}, {offset}(s0)"));
            }
            _ => unreachable!("not a leaf expression"),
        }
        Ok(())
    }

    /// Combines `t0` (left operand) and `a0` (right operand) into `a0`.
    fn g_binary(&mut self, op: BinaryOperator) {
        use BinaryOperator::*;
        match op {
            Add => self.out("add a0, t0, a0"),
            Sub => self.out("sub a0, t0, a0"),
            Mul => self.out("mul a0, t0, a0"),
            Div => self.out("div a0, t0, a0"),
            Rem => self.out("rem a0, t0, a0"),
            Lt => self.out("slt a0, t0, a0"),
            Gt => self.out("slt a0, a0, t0"),
            Le => {
                self.out("slt a0, a0, t0");
                self.out("xori a0, a0, 1");
            }
            Ge => {
                self.out("slt a0, t0, a0");
                self.out("xori a0, a0, 1");
            }
            Eq => {
                self.out("sub a0, t0, a0");
                self.out("seqz a0, a0");
            }
            Ne => {
                self.out("sub a0, t0, a0");
                self.out("snez a0, a0");
            }
            And | Or => unreachable!("logical operators short-circuit"),
        }
    }

    /// `&&` and `||`: the right operand is only evaluated when the left one
    /// doesn't decide the result. Either way the result is 0 or 1.
    fn g_logical(&mut self, op: BinaryOperator, lhs: &Expr, rhs: &Expr) -> Result {
        let (base, branch) = match op {
            BinaryOperator::And => ("and_end", "beqz"),
            BinaryOperator::Or => ("or_end", "bnez"),
            _ => unreachable!(),
        };
        let end = self.label(base);
        self.g_expr(lhs)?;
        self.out("snez a0, a0");
        self.out(f!("{branch} a0, {end}"));
        self.g_expr(rhs)?;
        self.out("snez a0, a0");
        self.out_label(end);
        Ok(())
    }

    fn g_call(&mut self, callee: &Ident, args: &[Expr], span: Span) -> Result {
        if args.len() > ARG_REGS.len() {
            return Err(span.wrap(Error::TooManyArguments(args.len())));
        }

        if args.iter().all(Expr::is_leaf) {
            for (arg, reg) in args.iter().zip(ARG_REGS) {
                self.g_leaf(arg, reg)?;
            }
        } else {
            // Values are parked in an argument area while the others are
            // evaluated, then moved to the registers all at once.
            let area = align(SLOT_SIZE * args.len(), STACK_ALIGN);
            self.out(f!("addi sp, sp, -{area}"));
            for (i, arg) in args.iter().enumerate() {
                self.g_expr(arg)?;
                self.out(f!("sw a0, {}(sp)", SLOT_SIZE * i));
            }
            for (i, reg) in ARG_REGS.iter().take(args.len()).enumerate() {
                self.out(f!("lw {reg}, {}(sp)", SLOT_SIZE * i));
            }
            self.out(f!("addi sp, sp, {area}"));
        }
        self.out(f!("call {callee}"));
        Ok(())
    }

    fn push_a0(&mut self) {
        self.out(f!("addi sp, sp, -{STACK_ALIGN}"));
        self.out("sw a0, 0(sp)");
    }

    fn pop_t0(&mut self) {
        self.out("lw t0, 0(sp)");
        self.out(f!("addi sp, sp, {STACK_ALIGN}"));
    }
}

/// Utility functions.
impl<W, E> Generator<W, E>
where
    W: fmt::Write,
    E: rv32_env::Env,
{
    /// Prints a line.
    fn out(&mut self, f: impl fmt::Display) {
        let indent = if self.indent { "    " } else { "" };
        writeln!(self.writer, "{indent}{f}").expect("Failed to write to sink");
    }

    /// Prints an empty line.
    fn out_line(&mut self) {
        writeln!(self.writer).expect("Failed to write to sink");
    }

    /// Prints a label definition, never indented.
    fn out_label(&mut self, label: Label) {
        writeln!(self.writer, "{label}:").expect("Failed to write to sink");
    }

    /// Allocates a fresh label.
    fn label(&mut self, base: &'static str) -> Label {
        let label = Label {
            base,
            n: self.label_count,
        };
        self.label_count += 1;
        log::trace!("allocated label {label}");
        label
    }

    /// Binds `name` to the next free slot in the innermost scope, returning
    /// its frame offset.
    fn declare(&mut self, name: &str) -> i64 {
        let slot = self.next_slot;
        self.next_slot += 1;
        debug_assert!(slot < self.frame.slots, "frame slot count mismatch");
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(Box::from(name), slot);
        }
        Frame::offset(slot)
    }

    /// Returns the frame offset of the innermost variable named `ident`.
    fn resolve(&self, ident: &Ident) -> Result<i64> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(&*ident.name))
            .map(|&slot| Frame::offset(slot))
            .ok_or_else(|| ident.span.wrap(Error::UnresolvedVariable(ident.name.clone())))
    }

    /// Writes in an indented block that is finished with an empty line.
    fn indented<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        self.indent = true;
        let res = f(self);
        self.indent = false;
        self.out_line();
        res
    }
}

/// The stack frame of a function.
///
/// ```text
/// s0 - 4        saved ra
/// s0 - 8        saved s0
/// s0 - 12 - 4i  slot i
/// ```
///
/// `s0` holds the value `sp` had on entry.
#[derive(Copy, Clone, Debug)]
struct Frame {
    slots: usize,
    size: usize,
}

impl Frame {
    fn new(slots: usize) -> Frame {
        Frame {
            slots,
            size: align(8 + SLOT_SIZE * slots, STACK_ALIGN),
        }
    }

    fn offset(slot: usize) -> i64 {
        -(12 + (SLOT_SIZE * slot) as i64)
    }
}

fn align(n: usize, to: usize) -> usize {
    n.div_ceil(to) * to
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct Label {
    base: &'static str,
    n: usize,
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ".L{}_{}", self.base, self.n)
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        codegen::{generate, Target},
        lexer, parser,
        util::test_utils::tree_tests,
    };

    tree_tests!(
        use codegen;

        fn test_return_literal() {
            let program = "int main() { return 42; }";
            let asm_ok = "
                # generated by toyc for rv32im
                .text

                .globl main
                main:
                    addi sp, sp, -16
                    sw ra, 12(sp)
                    sw s0, 8(sp)
                    addi s0, sp, 16
                    li a0, 42
                    lw ra, 12(sp)
                    lw s0, 8(sp)
                    addi sp, sp, 16
                    ret
            ";
        }

        fn test_local_initialized_with_product() {
            let program = "int main() { int x = 5 * 3; return x; }";
            let asm_ok = "
                # generated by toyc for rv32im
                .text

                .globl main
                main:
                    addi sp, sp, -16
                    sw ra, 12(sp)
                    sw s0, 8(sp)
                    addi s0, sp, 16
                    li a0, 5
                    mv t0, a0
                    li a0, 3
                    mul a0, t0, a0
                    sw a0, -12(s0)
                    lw a0, -12(s0)
                    lw ra, 12(sp)
                    lw s0, 8(sp)
                    addi sp, sp, 16
                    ret
            ";
        }

        fn test_call_with_leaf_arguments() {
            let program = "int f(int a,int b){return a+b;} int main(){return f(1,2);}";
            let asm_ok = "
                # generated by toyc for rv32im
                .text

                .globl f
                f:
                    addi sp, sp, -16
                    sw ra, 12(sp)
                    sw s0, 8(sp)
                    addi s0, sp, 16
                    sw a0, -12(s0)
                    sw a1, -16(s0)
                    lw a0, -12(s0)
                    mv t0, a0
                    lw a0, -16(s0)
                    add a0, t0, a0
                    lw ra, 12(sp)
                    lw s0, 8(sp)
                    addi sp, sp, 16
                    ret

                .globl main
                main:
                    addi sp, sp, -16
                    sw ra, 12(sp)
                    sw s0, 8(sp)
                    addi s0, sp, 16
                    li a0, 1
                    li a1, 2
                    call f
                    lw ra, 12(sp)
                    lw s0, 8(sp)
                    addi sp, sp, 16
                    ret
            ";
        }

        fn test_break_inside_if_jumps_to_loop_end() {
            let program = "void main() { while (1) { if (1) break; } }";
            let asm_ok = "
                # generated by toyc for rv32im
                .text

                .globl main
                main:
                    addi sp, sp, -16
                    sw ra, 12(sp)
                    sw s0, 8(sp)
                    addi s0, sp, 16
                .Lloop_0:
                    li a0, 1
                    beqz a0, .Lendloop_1
                    li a0, 1
                    beqz a0, .Lendif_2
                    j .Lendloop_1
                .Lendif_2:
                    j .Lloop_0
                .Lendloop_1:
                    lw ra, 12(sp)
                    lw s0, 8(sp)
                    addi sp, sp, 16
                    ret
            ";
        }

        fn test_if_else() {
            let program = "int main(int a) { if (a) return 1; else return 2; }";
            let asm_ok = "
                # generated by toyc for rv32im
                .text

                .globl main
                main:
                    addi sp, sp, -16
                    sw ra, 12(sp)
                    sw s0, 8(sp)
                    addi s0, sp, 16
                    sw a0, -12(s0)
                    lw a0, -12(s0)
                    beqz a0, .Lelse_0
                    li a0, 1
                    lw ra, 12(sp)
                    lw s0, 8(sp)
                    addi sp, sp, 16
                    ret
                    j .Lendif_1
                .Lelse_0:
                    li a0, 2
                    lw ra, 12(sp)
                    lw s0, 8(sp)
                    addi sp, sp, 16
                    ret
                .Lendif_1:
            ";
        }

        fn test_continue_targets_loop_head() {
            let program = "void main(int n) { while (n) { n = n - 1; continue; } }";
            let asm_ok = "
                # generated by toyc for rv32im
                .text

                .globl main
                main:
                    addi sp, sp, -16
                    sw ra, 12(sp)
                    sw s0, 8(sp)
                    addi s0, sp, 16
                    sw a0, -12(s0)
                .Lloop_0:
                    lw a0, -12(s0)
                    beqz a0, .Lendloop_1
                    lw a0, -12(s0)
                    mv t0, a0
                    li a0, 1
                    sub a0, t0, a0
                    sw a0, -12(s0)
                    j .Lloop_0
                    j .Lloop_0
                .Lendloop_1:
                    lw ra, 12(sp)
                    lw s0, 8(sp)
                    addi sp, sp, 16
                    ret
            ";
        }

        fn test_nested_right_operand_is_spilled() {
            let program = "int main() { return 1 - (2 - 3); }";
            let asm_ok = "
                # generated by toyc for rv32im
                .text

                .globl main
                main:
                    addi sp, sp, -16
                    sw ra, 12(sp)
                    sw s0, 8(sp)
                    addi s0, sp, 16
                    li a0, 1
                    addi sp, sp, -16
                    sw a0, 0(sp)
                    li a0, 2
                    mv t0, a0
                    li a0, 3
                    sub a0, t0, a0
                    lw t0, 0(sp)
                    addi sp, sp, 16
                    sub a0, t0, a0
                    lw ra, 12(sp)
                    lw s0, 8(sp)
                    addi sp, sp, 16
                    ret
            ";
        }

        fn test_call_with_computed_arguments() {
            let program = "int g(int a, int b) { return a; } int main() { return g(1 + 2, g(3, 4)); }";
            let asm_ok = "
                # generated by toyc for rv32im
                .text

                .globl g
                g:
                    addi sp, sp, -16
                    sw ra, 12(sp)
                    sw s0, 8(sp)
                    addi s0, sp, 16
                    sw a0, -12(s0)
                    sw a1, -16(s0)
                    lw a0, -12(s0)
                    lw ra, 12(sp)
                    lw s0, 8(sp)
                    addi sp, sp, 16
                    ret

                .globl main
                main:
                    addi sp, sp, -16
                    sw ra, 12(sp)
                    sw s0, 8(sp)
                    addi s0, sp, 16
                    addi sp, sp, -16
                    li a0, 1
                    mv t0, a0
                    li a0, 2
                    add a0, t0, a0
                    sw a0, 0(sp)
                    li a0, 3
                    li a1, 4
                    call g
                    sw a0, 4(sp)
                    lw a0, 0(sp)
                    lw a1, 4(sp)
                    addi sp, sp, 16
                    call g
                    lw ra, 12(sp)
                    lw s0, 8(sp)
                    addi sp, sp, 16
                    ret
            ";
        }

        fn test_unary_and_relational_operators() {
            let program = "int main(int a) { return -a <= !a; }";
            let asm_ok = "
                # generated by toyc for rv32im
                .text

                .globl main
                main:
                    addi sp, sp, -16
                    sw ra, 12(sp)
                    sw s0, 8(sp)
                    addi s0, sp, 16
                    sw a0, -12(s0)
                    lw a0, -12(s0)
                    neg a0, a0
                    addi sp, sp, -16
                    sw a0, 0(sp)
                    lw a0, -12(s0)
                    seqz a0, a0
                    lw t0, 0(sp)
                    addi sp, sp, 16
                    slt a0, a0, t0
                    xori a0, a0, 1
                    lw ra, 12(sp)
                    lw s0, 8(sp)
                    addi sp, sp, 16
                    ret
            ";
        }

        fn test_short_circuit_operators() {
            let program = "int main(int a, int b) { return a && b || a; }";
            let asm_ok = "
                # generated by toyc for rv32im
                .text

                .globl main
                main:
                    addi sp, sp, -16
                    sw ra, 12(sp)
                    sw s0, 8(sp)
                    addi s0, sp, 16
                    sw a0, -12(s0)
                    sw a1, -16(s0)
                    lw a0, -12(s0)
                    snez a0, a0
                    beqz a0, .Land_end_1
                    lw a0, -16(s0)
                    snez a0, a0
                .Land_end_1:
                    snez a0, a0
                    bnez a0, .Lor_end_0
                    lw a0, -12(s0)
                    snez a0, a0
                .Lor_end_0:
                    lw ra, 12(sp)
                    lw s0, 8(sp)
                    addi sp, sp, 16
                    ret
            ";
        }

        fn test_shadowed_variable_gets_its_own_slot() {
            let program = "int main() { int x = 1; { int x = 2; x = 3; } return x; }";
            let asm_ok = "
                # generated by toyc for rv32im
                .text

                .globl main
                main:
                    addi sp, sp, -16
                    sw ra, 12(sp)
                    sw s0, 8(sp)
                    addi s0, sp, 16
                    li a0, 1
                    sw a0, -12(s0)
                    li a0, 2
                    sw a0, -16(s0)
                    li a0, 3
                    sw a0, -16(s0)
                    lw a0, -12(s0)
                    lw ra, 12(sp)
                    lw s0, 8(sp)
                    addi sp, sp, 16
                    ret
            ";
        }

        fn test_void_function_falls_through() {
            let program = "void f() { } void g() { f(); return; }";
            let asm_ok = "
                # generated by toyc for rv32im
                .text

                .globl f
                f:
                    addi sp, sp, -16
                    sw ra, 12(sp)
                    sw s0, 8(sp)
                    addi s0, sp, 16
                    lw ra, 12(sp)
                    lw s0, 8(sp)
                    addi sp, sp, 16
                    ret

                .globl g
                g:
                    addi sp, sp, -16
                    sw ra, 12(sp)
                    sw s0, 8(sp)
                    addi s0, sp, 16
                    call f
                    lw ra, 12(sp)
                    lw s0, 8(sp)
                    addi sp, sp, 16
                    ret
            ";
        }

        fn test_semantic_errors_block_generation() {
            let program = "int main() { return x; }";
            let expected_errors = &["1:21: undeclared identifier x"];
        }
    );

    fn analyze_all(src: &str) -> Analyzed {
        let tokens = lexer::tokenize(src).unwrap();
        let program = parser::parse(src, &tokens).unwrap();
        semantic::analyze_all(program).0
    }

    fn generate_err(src: &str, target: Target) -> String {
        let error = generate(&analyze_all(src), target).unwrap_err();
        format!("{error:#}")
    }

    #[test]
    fn test_frame_size_is_aligned() {
        assert_eq!(Frame::new(0).size, 16);
        assert_eq!(Frame::new(2).size, 16);
        assert_eq!(Frame::new(3).size, 32);
        assert_eq!(Frame::new(6).size, 32);
        assert_eq!(Frame::new(7).size, 48);
        assert_eq!(Frame::offset(0), -12);
        assert_eq!(Frame::offset(5), -32);
    }

    #[test]
    fn test_larger_frame() {
        let src = "int main() { int a = 1; int b = 2; int c = 3; return c; }";
        let asm = generate(&analyze_all(src), Target::Rv32im).unwrap();
        let expected = indoc! {"
            main:
                addi sp, sp, -32
                sw ra, 28(sp)
                sw s0, 24(sp)
                addi s0, sp, 32
        "};
        assert!(asm.contains(expected), "{asm}");
        assert!(asm.contains("    sw a0, -20(s0)\n    lw a0, -20(s0)\n"));
    }

    fn with_locals(count: usize) -> String {
        let decls: String = (0..count).map(|i| format!("int v{i} = {i}; ")).collect();
        format!("int main() {{ {decls}return v0; }}")
    }

    #[test]
    fn test_frame_too_large() {
        assert_eq!(
            generate_err(&with_locals(600), Target::Rv32im),
            "1:5: function needs a 2416 byte frame, but at most 2032 bytes are supported"
        );
        // One slot past the largest frame.
        assert_eq!(
            generate_err(&with_locals(507), Target::Rv32im),
            "1:5: function needs a 2048 byte frame, but at most 2032 bytes are supported"
        );
    }

    #[test]
    fn test_largest_frame_fits_immediates() {
        let asm = generate(&analyze_all(&with_locals(506)), Target::Rv32im).unwrap();
        assert!(asm.contains("    addi sp, sp, -2032
    sw ra, 2028(sp)
"));
        assert!(asm.contains("    addi s0, sp, 2032
"));
        // The last of the 506 slots.
        assert!(asm.contains("    li a0, 505
    sw a0, -2032(s0)
"));
    }

    #[test]
    fn test_rv32i_rejects_mul_div_rem() {
        for op in ["*", "/", "%"] {
            let src = format!("int main() {{ return 7 {op} 2; }}");
            assert_eq!(
                generate_err(&src, Target::Rv32i),
                format!("1:21: operator `{op}` is not supported by the rv32i target")
            );
        }
    }

    #[test]
    fn test_rv32i_accepts_other_operators() {
        let src = "int main(int a) { return a + 1 - 2 < 3 == (a != 0); }";
        let asm = generate(&analyze_all(src), Target::Rv32i).unwrap();
        assert!(asm.starts_with("# generated by toyc for rv32i\n"));
        assert!(!asm.contains("mul"));
    }

    #[test]
    fn test_too_many_arguments() {
        let src = "int main() { return f(1, 2, 3, 4, 5, 6, 7, 8, 9); }";
        assert_eq!(
            generate_err(src, Target::Rv32im),
            "1:21: call passes 9 arguments, but at most 8 are supported"
        );
    }

    #[test]
    fn test_eight_arguments_use_every_register() {
        let src = "
            int f(int a, int b, int c, int d, int e, int g, int h, int i) { return i; }
            int main() { return f(1, 2, 3, 4, 5, 6, 7, 8); }
        ";
        let asm = generate(&analyze_all(src), Target::Rv32im).unwrap();
        assert!(asm.contains("    sw a7, -40(s0)\n"));
        assert!(asm.contains("    li a7, 8\n    call f\n"));
    }

    #[test]
    fn test_too_many_parameters() {
        let src = "int f(int a, int b, int c, int d, int e, int g, int h, int i, int j) { return 0; }";
        assert_eq!(
            generate_err(src, Target::Rv32im),
            "1:5: function takes 9 parameters, but at most 8 are supported"
        );
    }

    #[test]
    fn test_break_outside_loop_is_an_internal_error() {
        assert_eq!(
            generate_err("void main() { break; }", Target::Rv32im),
            "1:15: break statement not within a loop"
        );
        assert_eq!(
            generate_err("void main() { continue; }", Target::Rv32im),
            "1:15: continue statement not within a loop"
        );
    }

    #[test]
    fn test_unresolved_variable_is_an_internal_error() {
        assert_eq!(
            generate_err("int main() { return y; }", Target::Rv32im),
            "1:21: unresolved variable y"
        );
    }

    #[test]
    fn test_labels_are_unique_across_functions() {
        let src = "
            void f(int a) { while (a) { if (a) break; } }
            void g(int a) { while (a) { if (a) continue; else break; } }
        ";
        let asm = generate(&analyze_all(src), Target::Rv32im).unwrap();
        let definitions: Vec<_> = asm
            .lines()
            .filter(|line| line.starts_with(".L"))
            .collect();
        assert_eq!(definitions.len(), 7);
        let mut unique = definitions.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), definitions.len(), "{asm}");
    }

    #[test]
    fn test_nested_loops_target_innermost() {
        let src = "void main(int a) { while (a) { while (a) { break; } continue; } }";
        let asm = generate(&analyze_all(src), Target::Rv32im).unwrap();
        // Outer loop: 0 and 1. Inner loop: 2 and 3.
        let inner = asm.find(".Lloop_2:").unwrap();
        let inner_end = asm.find(".Lendloop_3:").unwrap();
        assert!(asm[inner..inner_end].contains("j .Lendloop_3\n"));
        assert!(asm[inner_end..].contains("j .Lloop_0\n"));
    }
}
