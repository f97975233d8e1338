use crate::codegen::Target;

/// Per-target knobs of the RV32 generator.
pub trait Env {
    const TARGET: Target;

    /// Whether the `M` extension (`mul`, `div`, `rem`) is available.
    const HAS_MUL_DIV: bool;
}

impl Env for Rv32im {
    const TARGET: Target = Target::Rv32im;

    const HAS_MUL_DIV: bool = true;
}

impl Env for Rv32i {
    const TARGET: Target = Target::Rv32i;

    const HAS_MUL_DIV: bool = false;
}

pub struct Rv32im;

pub struct Rv32i;
