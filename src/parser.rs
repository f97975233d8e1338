use crate::{
    ast::{
        BinaryOperator, Block, Expr, ExprKind, FuncDef, Ident, Param, Program, Stmt, StmtKind,
        Type, UnaryOperator,
    },
    lexer::extract,
    token::{Span, Spanned, Token, TokenKind},
};

type Result<T, E = Spanned<Error>> = std::result::Result<T, E>;

/// Parses a whole translation unit out of the provided tokens, which must be
/// terminated by [`TokenKind::Eof`] (as produced by the lexer).
///
/// The first syntax error aborts the parse.
pub fn parse(src: &str, tokens: &[Token]) -> Result<Program> {
    assert!(
        tokens.last().is_some_and(Token::is_eof),
        "token stream must end with eof"
    );
    let program = Parser::new(src, tokens).parse_program()?;
    log::debug!("parsed {} function(s)", program.functions.len());
    Ok(program)
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("expected {expected}, but got {actual}")]
    Unexpected {
        actual: TokenKind,
        expected: TokenKind,
    },
    #[error("expected {}, but got {actual}", one_of(.expected))]
    UnexpectedAny {
        actual: TokenKind,
        expected: Box<[TokenKind]>,
    },
    #[error("expected expression, but got {0}")]
    ExpectedExpression(TokenKind),
    #[error("invalid assignment target")]
    InvalidAssignmentTarget,
    #[error("empty program, expected at least one function definition")]
    EmptyProgram,
    #[error("integer literal out of range")]
    IntegerOutOfRange,
    #[error("nesting too deep, at most {} levels are supported", MAX_NESTING_DEPTH)]
    NestingTooDeep,
}

fn one_of(kinds: &[TokenKind]) -> String {
    let names: Vec<_> = kinds.iter().map(ToString::to_string).collect();
    names.join(" or ")
}

/// Binding power of prefix operators; higher than every infix operator.
const PREFIX_BP: u8 = 11;

/// Statements and expressions nested deeper than this are rejected.
pub const MAX_NESTING_DEPTH: usize = 256;

struct Parser<'src, 'tok> {
    src: &'src str,
    tokens: &'tok [Token],
    cursor: usize,
    depth: usize,
}

impl Parser<'_, '_> {
    fn parse_program(&mut self) -> Result<Program> {
        let mut functions = Vec::with_capacity(4);
        while !self.is(TokenKind::Eof) {
            functions.push(self.parse_func_def()?);
        }
        self.consume(TokenKind::Eof)?;
        if functions.is_empty() {
            let len = u32::try_from(self.src.len()).unwrap_or(u32::MAX);
            let span = Span::new(0, len, 1, 1);
            return Err(span.wrap(Error::EmptyProgram));
        }
        Ok(Program { functions })
    }

    fn parse_func_def(&mut self) -> Result<FuncDef> {
        let ty_token = self.consume_any(&[TokenKind::Int, TokenKind::Void])?;
        let return_ty = match ty_token.kind {
            TokenKind::Int => Type::Int,
            TokenKind::Void => Type::Void,
            _ => unreachable!(),
        };
        let name = self.parse_ident()?;

        self.consume(TokenKind::LParen)?;
        let params = self.parse_list(TokenKind::RParen, TokenKind::Comma, Parser::parse_param)?;
        self.consume(TokenKind::RParen)?;

        let body = self.parse_block()?;
        let span = ty_token.span.to(body.span);
        Ok(FuncDef {
            return_ty,
            name,
            params,
            body,
            span,
        })
    }

    fn parse_param(&mut self) -> Result<Param> {
        self.consume(TokenKind::Int)?;
        let name = self.parse_ident()?;
        Ok(Param { ty: Type::Int, name })
    }

    fn parse_ident(&mut self) -> Result<Ident> {
        let token = self.consume(TokenKind::Identifier)?;
        Ok(Ident {
            name: extract::ident(token, self.src),
            span: token.span,
        })
    }

    fn parse_block(&mut self) -> Result<Block> {
        let start = self.consume(TokenKind::LBrace)?;
        let mut stmts = Vec::new();
        while self.except([TokenKind::RBrace]) {
            stmts.push(self.parse_stmt()?);
        }
        let end = self.consume(TokenKind::RBrace)?;
        Ok(Block {
            stmts,
            span: start.span.to(end.span),
        })
    }

    /// Parses the body of an `if`, `else` or `while`. A bare statement is
    /// wrapped in a block of its own.
    fn parse_body(&mut self) -> Result<Block> {
        let stmt = self.parse_stmt()?;
        Ok(match stmt.kind {
            StmtKind::Block(block) => block,
            kind => Block::synthetic(Stmt {
                kind,
                span: stmt.span,
            }),
        })
    }

    fn parse_stmt(&mut self) -> Result<Stmt> {
        self.nested(Self::parse_stmt_inner)
    }

    fn parse_stmt_inner(&mut self) -> Result<Stmt> {
        let start = self.peek();
        let (kind, end) = match start.kind {
            // Block: { stmt* }
            TokenKind::LBrace => {
                let block = self.parse_block()?;
                let span = block.span;
                (StmtKind::Block(block), span)
            }

            // Declaration: int ID = expr ;
            TokenKind::Int => {
                self.advance();
                let name = self.parse_ident()?;
                self.consume(TokenKind::Assign)?;
                let init = self.parse_expr()?;
                let end = self.consume(TokenKind::Semicolon)?;
                (StmtKind::VarDecl { name, init }, end.span)
            }

            // Conditional: if ( expr ) stmt [else stmt]
            TokenKind::If => {
                self.advance();
                self.consume(TokenKind::LParen)?;
                let cond = self.parse_expr()?;
                self.consume(TokenKind::RParen)?;
                let then_arm = self.parse_body()?;
                let else_arm = if self.take(TokenKind::Else) {
                    Some(self.parse_body()?)
                } else {
                    None
                };
                let end = else_arm.as_ref().unwrap_or(&then_arm).span;
                let cond = StmtKind::If {
                    cond,
                    then_arm,
                    else_arm,
                };
                (cond, end)
            }

            // Loop: while ( expr ) stmt
            TokenKind::While => {
                self.advance();
                self.consume(TokenKind::LParen)?;
                let cond = self.parse_expr()?;
                self.consume(TokenKind::RParen)?;
                let body = self.parse_body()?;
                let end = body.span;
                (StmtKind::While { cond, body }, end)
            }

            TokenKind::Break => {
                self.advance();
                let end = self.consume(TokenKind::Semicolon)?;
                (StmtKind::Break, end.span)
            }

            TokenKind::Continue => {
                self.advance();
                let end = self.consume(TokenKind::Semicolon)?;
                (StmtKind::Continue, end.span)
            }

            // Return: return [expr] ;
            TokenKind::Return => {
                self.advance();
                let value = if self.is(TokenKind::Semicolon) {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                let end = self.consume(TokenKind::Semicolon)?;
                (StmtKind::Return(value), end.span)
            }

            // Assignment or expression statement: [ID =] expr ;
            _ => {
                let expr = self.parse_expr()?;
                let kind = if self.take(TokenKind::Assign) {
                    // Only a bare name, so `(x) = 1` is rejected too.
                    let bare = start.kind == TokenKind::Identifier && expr.span == start.span;
                    let target = match expr.kind {
                        ExprKind::Var(target) if bare => target,
                        _ => return Err(expr.span.wrap(Error::InvalidAssignmentTarget)),
                    };
                    let value = self.parse_expr()?;
                    StmtKind::Assign { target, value }
                } else {
                    StmtKind::Expr(expr)
                };
                let end = self.consume(TokenKind::Semicolon)?;
                (kind, end.span)
            }
        };
        Ok(Stmt {
            kind,
            span: start.span.to(end),
        })
    }

    fn parse_expr(&mut self) -> Result<Expr> {
        self.parse_expr_bp(0)
    }

    fn parse_expr_bp(&mut self, min_bp: u8) -> Result<Expr> {
        self.nested(|p| p.parse_expr_bp_inner(min_bp))
    }

    fn parse_expr_bp_inner(&mut self, min_bp: u8) -> Result<Expr> {
        let lhs_token = self.advance();
        let mut lhs = self.parse_nud(lhs_token)?;

        loop {
            let op_token = self.peek();

            let Some((op, (lbp, rbp))) = Self::infix_binding_power(op_token.kind) else {
                // Not an infix operator
                break;
            };
            if lbp < min_bp {
                // Operator binds less tightly than the minimum required
                break;
            }

            self.advance(); // Operator
            let rhs = self.parse_expr_bp(rbp)?;
            let span = lhs.span.to(rhs.span);
            lhs = Expr {
                kind: ExprKind::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                span,
            };
        }

        Ok(lhs)
    }

    /// nud: Parses tokens that start an expression
    /// (prefix operators, literals, variables, calls, grouping)
    fn parse_nud(&mut self, token: Token) -> Result<Expr> {
        let (kind, span) = match token.kind {
            TokenKind::Identifier => {
                let ident = Ident {
                    name: extract::ident(token, self.src),
                    span: token.span,
                };
                if !self.take(TokenKind::LParen) {
                    return Ok(Expr {
                        kind: ExprKind::Var(ident),
                        span: token.span,
                    });
                }
                // Call: ID ( [expr [, expr]*] )
                let args = self.parse_list(TokenKind::RParen, TokenKind::Comma, |p| {
                    p.parse_expr()
                })?;
                let end = self.consume(TokenKind::RParen)?;
                let call = ExprKind::Call {
                    callee: ident,
                    args,
                };
                (call, token.span.to(end.span))
            }

            TokenKind::Number => {
                let Ok(value) = extract::int(token, self.src) else {
                    return Err(token.span.wrap(Error::IntegerOutOfRange));
                };
                (ExprKind::Number(value), token.span)
            }

            // Grouping: ( expr )
            TokenKind::LParen => {
                let inner = self.parse_expr()?;
                let end = self.consume(TokenKind::RParen)?;
                (inner.kind, token.span.to(end.span))
            }

            // Prefix operators: +, -, !
            kind @ (TokenKind::Plus | TokenKind::Minus | TokenKind::Not) => {
                let op = match kind {
                    TokenKind::Plus => UnaryOperator::Plus,
                    TokenKind::Minus => UnaryOperator::Neg,
                    TokenKind::Not => UnaryOperator::Not,
                    _ => unreachable!(),
                };
                let expr = self.parse_expr_bp(PREFIX_BP)?;
                let span = token.span.to(expr.span);
                let unary = ExprKind::Unary {
                    op,
                    expr: Box::new(expr),
                };
                (unary, span)
            }

            other => {
                return Err(token.span.wrap(Error::ExpectedExpression(other)));
            }
        };

        Ok(Expr { kind, span })
    }

    /// Parses `item (separator item)*` unless `end_delim` is current. Does
    /// **NOT** consume the end delimiter.
    fn parse_list<T>(
        &mut self,
        end_delim: TokenKind,
        separator: TokenKind,
        mut parse_item: impl FnMut(&mut Self) -> Result<T>,
    ) -> Result<Vec<T>> {
        debug_assert_ne!(end_delim, separator);

        let mut items = Vec::new();
        if self.is(end_delim) {
            return Ok(items);
        }
        loop {
            items.push(parse_item(self)?);
            if !self.take(separator) {
                break;
            }
        }
        Ok(items)
    }

    /// Left-associative binary operators, from the loosest (`||`) to the
    /// tightest (`*`, `/`, `%`).
    fn infix_binding_power(kind: TokenKind) -> Option<(BinaryOperator, (u8, u8))> {
        use BinaryOperator as Op;
        let bp = match kind {
            TokenKind::OrOr => (Op::Or, (1, 2)),

            TokenKind::AndAnd => (Op::And, (3, 4)),

            TokenKind::Less => (Op::Lt, (5, 6)),
            TokenKind::Greater => (Op::Gt, (5, 6)),
            TokenKind::LessEq => (Op::Le, (5, 6)),
            TokenKind::GreaterEq => (Op::Ge, (5, 6)),
            TokenKind::EqEq => (Op::Eq, (5, 6)),
            TokenKind::NotEq => (Op::Ne, (5, 6)),

            TokenKind::Plus => (Op::Add, (7, 8)),
            TokenKind::Minus => (Op::Sub, (7, 8)),

            TokenKind::Star => (Op::Mul, (9, 10)),
            TokenKind::Slash => (Op::Div, (9, 10)),
            TokenKind::Percent => (Op::Rem, (9, 10)),

            _ => return None,
        };
        Some(bp)
    }
}

impl Parser<'_, '_> {
    fn new<'src, 'tok>(src: &'src str, tokens: &'tok [Token]) -> Parser<'src, 'tok> {
        Parser {
            src,
            tokens,
            cursor: 0,
            depth: 0,
        }
    }

    /// Runs `parse` one nesting level deeper, failing at the current token
    /// once [`MAX_NESTING_DEPTH`] is reached.
    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(self.peek().span.wrap(Error::NestingTooDeep));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    /// Returns the current token.
    #[inline]
    fn peek(&self) -> Token {
        // The stream always ends with eof, which is never advanced past.
        self.tokens[self.cursor.min(self.tokens.len() - 1)]
    }

    /// Returns the current token and advances.
    fn advance(&mut self) -> Token {
        let c = self.peek();
        if !c.is_eof() {
            self.cursor += 1;
        }
        c
    }

    /// Checks whether the current token matches the given one.
    fn is(&self, expect: TokenKind) -> bool {
        self.peek().kind == expect
    }

    /// Advances if the current token matches the provided one, returning true.
    /// If not, returns false and doesn't advance.
    fn take(&mut self, expect: TokenKind) -> bool {
        if self.is(expect) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Advances if the current token matches the provided one, returning it.
    /// If not, returns an error.
    fn consume(&mut self, expect: TokenKind) -> Result<Token> {
        let c = self.peek();
        if self.is(expect) {
            self.advance();
            Ok(c)
        } else {
            Err(c.span.wrap(Error::Unexpected {
                actual: c.kind,
                expected: expect,
            }))
        }
    }

    /// Advances if the current token matches any of the provided tokens,
    /// returning it. If not, returns an error.
    fn consume_any(&mut self, expect: &'static [TokenKind]) -> Result<Token> {
        for t in expect {
            if self.is(*t) {
                return Ok(self.advance());
            }
        }
        let c = self.peek();
        Err(c.span.wrap(Error::UnexpectedAny {
            actual: c.kind,
            expected: Box::from(expect),
        }))
    }

    /// Returns true while the current token does *not* match one of the
    /// provided ones. [`TokenKind::Eof`] is implicitly included in the list.
    ///
    /// This won't advance the cursor.
    fn except(&self, except: impl IntoIterator<Item = TokenKind>) -> bool {
        let c = self.peek();
        if c.is_eof() {
            return false;
        }
        except.into_iter().all(|e| c.kind != e)
    }
}
