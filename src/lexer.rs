use std::{iter::Peekable, str::Chars};

use crate::token::{Span, Spanned, Token, TokenKind, KEYWORDS};

pub const SUGGESTED_TOKENS_CAPACITY: usize = 1_024;

type Result<T, E = Spanned<Error>> = std::result::Result<T, E>;

/// Lexes the provided string, producing the tokens into the provided buffer.
///
/// Lexing stops at the first error. On success the buffer always ends with a
/// single [`TokenKind::Eof`] token.
pub fn lex(src: &str, tokens: &mut Vec<Token>) -> Result<()> {
    Lexer::new(src, tokens).lex()
}

/// A convenience function that allocates a new buffer per lexed input and
/// returns it.
pub fn tokenize(src: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::with_capacity(SUGGESTED_TOKENS_CAPACITY);
    lex(src, &mut tokens)?;
    Ok(tokens)
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("unexpected character {0:?}")]
    UnexpectedChar(char),
    #[error("unterminated block comment")]
    UnclosedComment,
    #[error("increment operator `++` is not supported")]
    Increment,
    #[error("decrement operator `--` is not supported")]
    Decrement,
    #[error("unexpected {0:?}, did you mean `{0}{0}`?")]
    IncompleteOperator(char),
}

/// The toy C lexer
struct Lexer<'src, 'tok> {
    src: &'src str,
    iter: Peekable<Chars<'src>>,
    cursor: usize,
    line: u32,
    column: u32,
    current_lo: usize,
    current_line: u32,
    current_column: u32,
    tokens: &'tok mut Vec<Token>,
}

impl Lexer<'_, '_> {
    /// Scans the source string until the input is exhausted.
    fn lex(mut self) -> Result<()> {
        assert_eq!(self.tokens.len(), 0, "must pass clean tokens buffer");
        loop {
            let Some(next) = self.scan_token_kind()? else {
                continue;
            };
            self.produce(next);
            if next == TokenKind::Eof {
                break;
            }
        }
        log::trace!("lexed {} tokens", self.tokens.len());
        Ok(())
    }

    /// Tries to scan the current character. Returns `None` for trivia
    /// (whitespace and comments).
    fn scan_token_kind(&mut self) -> Result<Option<TokenKind>> {
        use TokenKind::*;
        let kind = match self.mark_advance() {
            // A NUL read from the source moves the cursor, the end of input does not.
            '\0' if self.cursor == self.current_lo => Eof,
            // `++` and `--` are rejected instead of being read as two tokens.
            '+' if self.peek() == '+' => {
                self.advance();
                return self.fail(Error::Increment);
            }
            '-' if self.peek() == '-' => {
                self.advance();
                return self.fail(Error::Decrement);
            }
            '+' => Plus,
            '-' => Minus,
            '*' => Star,
            '/' => match self.peek() {
                '/' => return Ok(self.line_comment()),
                '*' => return self.block_comment(),
                _ => Slash,
            },
            '%' => Percent,
            '<' => match self.peek() {
                '=' => self.advance_with(LessEq),
                _ => Less,
            },
            '>' => match self.peek() {
                '=' => self.advance_with(GreaterEq),
                _ => Greater,
            },
            '=' => match self.peek() {
                '=' => self.advance_with(EqEq),
                _ => Assign,
            },
            '!' => match self.peek() {
                '=' => self.advance_with(NotEq),
                _ => Not,
            },
            c @ ('&' | '|') => {
                if self.peek() != c {
                    return self.fail(Error::IncompleteOperator(c));
                }
                self.advance_with(if c == '&' { AndAnd } else { OrOr })
            }
            '(' => LParen,
            ')' => RParen,
            '{' => LBrace,
            '}' => RBrace,
            ',' => Comma,
            ';' => Semicolon,
            c if c.is_ascii_alphabetic() || c == '_' => self.identifier_or_keyword(),
            c if c.is_ascii_digit() => self.number(),
            c if c.is_ascii_whitespace() => return Ok(self.whitespace()),
            c => return self.fail(Error::UnexpectedChar(c)),
        };
        Ok(Some(kind))
    }

    fn identifier_or_keyword(&mut self) -> TokenKind {
        while matches!(self.peek(), c if c.is_ascii_alphanumeric() || c == '_') {
            self.advance();
        }
        KEYWORDS
            .get(self.substr())
            .copied()
            .unwrap_or(TokenKind::Identifier)
    }

    fn number(&mut self) -> TokenKind {
        while self.peek().is_ascii_digit() {
            self.advance();
        }
        TokenKind::Number
    }

    fn whitespace(&mut self) -> Option<TokenKind> {
        while self.peek().is_ascii_whitespace() {
            self.advance();
        }
        None
    }

    fn line_comment(&mut self) -> Option<TokenKind> {
        assert_eq!(self.advance(), '/');
        while !self.is_eof() && self.peek() != '\n' {
            self.advance();
        }
        None
    }

    fn block_comment(&mut self) -> Result<Option<TokenKind>> {
        assert_eq!(self.advance(), '*');
        loop {
            match self.advance() {
                '*' if self.peek() == '/' => {
                    self.advance();
                    return Ok(None);
                }
                // Reported at the comment opening, not at the end of input.
                '\0' if self.is_eof() => return self.fail(Error::UnclosedComment),
                _ => (),
            }
        }
    }
}

impl Lexer<'_, '_> {
    /// Constructs a new lexer with the default state.
    fn new<'src, 'tok>(src: &'src str, tokens: &'tok mut Vec<Token>) -> Lexer<'src, 'tok> {
        Lexer {
            src,
            iter: src.chars().peekable(),
            cursor: 0,
            line: 1,
            column: 1,
            current_lo: 0,
            current_line: 1,
            current_column: 1,
            tokens,
        }
    }

    /// Starts a new token "mark" and advances the iterator.
    fn mark_advance(&mut self) -> char {
        self.current_lo = self.cursor;
        self.current_line = self.line;
        self.current_column = self.column;
        self.advance()
    }

    /// Returns the next character and advances the iterator, keeping track of
    /// the current line and column.
    fn advance(&mut self) -> char {
        let Some(c) = self.iter.next() else {
            return '\0';
        };
        self.cursor += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        c
    }

    /// Advances and returns the provided value.
    fn advance_with<T>(&mut self, value: T) -> T {
        self.advance();
        value
    }

    /// Returns the next character without advancing the iterator.
    fn peek(&mut self) -> char {
        self.iter.peek().copied().unwrap_or('\0')
    }

    /// Whether the whole source has been consumed. [`Lexer::peek`] alone
    /// can't tell, since the source may contain NUL characters.
    fn is_eof(&mut self) -> bool {
        self.iter.peek().is_none()
    }

    /// Returns the current span.
    fn span(&self) -> Span {
        let len = u32::try_from(self.cursor - self.current_lo).unwrap_or(u32::MAX);
        Span::new(self.current_lo, len, self.current_line, self.current_column)
    }

    /// Returns the substring of the current marked bounds.
    fn substr(&self) -> &str {
        &self.src[self.current_lo..self.cursor]
    }

    /// Returns an error spanning the marked bounds.
    fn fail<T>(&self, error: Error) -> Result<T> {
        Err(self.span().wrap(error))
    }

    /// Produces a token using the marked bounds.
    fn produce(&mut self, kind: TokenKind) {
        let token = Token::new(kind, self.span());
        self.tokens.push(token);
    }
}

pub mod extract {
    use std::num::ParseIntError;

    use super::*;

    pub fn int(token: Token, src: &str) -> std::result::Result<i32, ParseIntError> {
        debug_assert_eq!(token.kind, TokenKind::Number);
        token.lexeme(src).parse()
    }

    pub fn ident(token: Token, src: &str) -> Box<str> {
        debug_assert_eq!(token.kind, TokenKind::Identifier);
        Box::from(token.lexeme(src))
    }
}
