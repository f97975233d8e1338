//! A compiler for a tiny C-like language (integers, functions, `if`/`else`,
//! `while`, `break`/`continue`) emitting RV32 assembly.
//!
//! ```
//! let asm = toyc::compile("int main() { return 42; }", toyc::Target::Rv32im).unwrap();
//! assert!(asm.contains("li a0, 42"));
//! ```

use crate::token::Spanned;

pub use crate::codegen::Target;

/// The lexer takes the source input, mapping it into a sequence of tokens.
pub mod lexer;

/// The parser takes a sequence of tokens, mapping it into an AST.
pub mod parser;

/// The semantic analyzer checks name resolution, arities and returns,
/// computing what code generation needs to lay out each function.
pub mod semantic;

/// The code generator lowers an analyzed program to assembly text.
pub mod codegen;

pub mod ast;
pub mod scope;
pub mod token;

pub mod util {
    pub mod fmt;
    #[cfg(test)]
    pub(crate) mod test_utils;
}

/// Runs the whole pipeline over `src`.
pub fn compile(src: &str, target: Target) -> Result<String, Error> {
    let tokens = lexer::tokenize(src)?;
    log::debug!("lexed {} token(s)", tokens.len());
    let program = parser::parse(src, &tokens)?;
    let analyzed = semantic::analyze(program).map_err(Error::Semantic)?;
    let asm = codegen::generate(&analyzed, target)?;
    Ok(asm)
}

/// A failure of one of the pipeline stages.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("lexical error: {0:#}")]
    Lex(#[from] Spanned<lexer::Error>),
    #[error("syntax error: {0:#}")]
    Parse(#[from] Spanned<parser::Error>),
    #[error("{} semantic error(s)", .0.len())]
    Semantic(Vec<Spanned<semantic::Error>>),
    #[error("code generation error: {0:#}")]
    CodeGen(#[from] Spanned<codegen::Error>),
}

impl Error {
    /// Every diagnostic, formatted as `line:col: message`.
    pub fn diagnostics(&self) -> Vec<String> {
        match self {
            Error::Lex(e) => vec![format!("{e:#}")],
            Error::Parse(e) => vec![format!("{e:#}")],
            Error::Semantic(errors) => errors.iter().map(|e| format!("{e:#}")).collect(),
            Error::CodeGen(e) => vec![format!("{e:#}")],
        }
    }
}
