#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
#[clap(rename_all = "lower")]
pub enum Target {
    #[default]
    Rv32im,
    Rv32i,
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        toyc::Target::from(*self).fmt(f)
    }
}

impl From<Target> for toyc::Target {
    fn from(value: Target) -> Self {
        match value {
            Target::Rv32im => toyc::Target::Rv32im,
            Target::Rv32i => toyc::Target::Rv32i,
        }
    }
}
