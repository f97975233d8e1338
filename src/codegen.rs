use crate::{
    codegen::rv32::Generator,
    semantic::Analyzed,
    token::Spanned,
};

pub mod rv32;
pub mod rv32_env;

/// Lowers an analyzed program to assembly for the given target.
pub fn generate(analyzed: &Analyzed, target: Target) -> Result<String, Spanned<Error>> {
    type Rv32imGenerator = Generator<String, rv32_env::Rv32im>;
    type Rv32iGenerator = Generator<String, rv32_env::Rv32i>;

    let buf = String::with_capacity(4096);
    let asm = match target {
        Target::Rv32im => Rv32imGenerator::new(buf).generate(analyzed)?,
        Target::Rv32i => Rv32iGenerator::new(buf).generate(analyzed)?,
    };
    log::debug!("generated {} bytes of {target} assembly", asm.len());
    Ok(asm)
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Target {
    /// Base integer ISA plus the multiply/divide extension.
    #[default]
    Rv32im,
    /// Base integer ISA only.
    Rv32i,
}

impl Target {
    pub const ALL: &[Target] = &[Target::Rv32im, Target::Rv32i];

    pub const fn march(&self) -> &'static str {
        match self {
            Target::Rv32im => "rv32im",
            Target::Rv32i => "rv32i",
        }
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.march())
    }
}

/// Code generation failures. Apart from [`Error::UnsupportedOperator`] and
/// the argument and frame limits, these can only happen for programs that
/// did not go through a successful analysis.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("operator `{op}` is not supported by the {target} target")]
    UnsupportedOperator { op: &'static str, target: Target },
    #[error("call passes {0} arguments, but at most 8 are supported")]
    TooManyArguments(usize),
    #[error("function takes {0} parameters, but at most 8 are supported")]
    TooManyParameters(usize),
    #[error("function needs a {0} byte frame, but at most 2032 bytes are supported")]
    FrameTooLarge(usize),
    #[error("break statement not within a loop")]
    BreakOutsideLoop,
    #[error("continue statement not within a loop")]
    ContinueOutsideLoop,
    #[error("unresolved variable {0}")]
    UnresolvedVariable(Box<str>),
}
