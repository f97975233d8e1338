use std::{
    fs,
    io::{self, Read, Write},
    path::PathBuf,
    process::ExitCode,
};

use clap::{ArgAction, Parser as CliParser, ValueEnum};
use log::LevelFilter;
use toyc::{codegen, lexer, parser, semantic, token::Token, util::fmt::tree};

mod target;

use target::Target;

/// ToyC compiler: translates ToyC source into RISC-V assembly.
#[derive(CliParser, Debug)]
#[clap(name = "toyc", version, disable_version_flag = true)]
struct Cli {
    /// Source file; standard input when absent
    #[clap(value_name = "FILE")]
    input: Option<PathBuf>,

    /// Output file; standard output when absent
    #[clap(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Target instruction set
    #[clap(long, value_enum, default_value_t)]
    target: Target,

    /// What to print
    #[clap(long, value_enum, default_value_t)]
    emit: Emit,

    /// Print version
    #[clap(short = 'v', long, action = ArgAction::Version)]
    version: Option<bool>,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
enum Emit {
    Tokens,
    Ast,
    #[default]
    Asm,
}

fn main() -> ExitCode {
    simple_logger::SimpleLogger::new()
        .with_level(LevelFilter::Warn)
        .env()
        .init()
        .unwrap();

    let cli = Cli::parse();
    let file_name = cli
        .input
        .as_ref()
        .map_or_else(|| "<stdin>".to_owned(), |p| p.display().to_string());

    let src = match read_input(cli.input.as_ref()) {
        Ok(src) => src,
        Err(error) => {
            eprintln!("error: {file_name}: {error}");
            return ExitCode::FAILURE;
        }
    };

    let output = match run(&cli, &src) {
        Ok(output) => output,
        Err(diagnostics) => {
            for diagnostic in diagnostics {
                eprintln!("error: {file_name}:{diagnostic}");
            }
            return ExitCode::FAILURE;
        }
    };

    if let Err(error) = write_output(cli.output.as_ref(), &output) {
        eprintln!("error: {error}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

/// Runs the pipeline up to what `--emit` asks for, returning either the text
/// to print or the formatted diagnostics.
fn run(cli: &Cli, src: &str) -> Result<String, Vec<String>> {
    let tokens = lexer::tokenize(src).map_err(|e| vec![format!("{e:#}")])?;
    if cli.emit == Emit::Tokens {
        return Ok(print_tokens(src, &tokens));
    }

    let program = parser::parse(src, &tokens).map_err(|e| vec![format!("{e:#}")])?;
    if cli.emit == Emit::Ast {
        return Ok(tree::print_program_string(&program));
    }

    let analyzed = semantic::analyze(program)
        .map_err(|errors| errors.iter().map(|e| format!("{e:#}")).collect::<Vec<_>>())?;
    codegen::generate(&analyzed, cli.target.into()).map_err(|e| vec![format!("{e:#}")])
}

fn print_tokens(src: &str, tokens: &[Token]) -> String {
    tokens
        .iter()
        .map(|t| format!("{} {:?} {:?}\n", t.span, t.kind, t.lexeme(src)))
        .collect()
}

fn read_input(path: Option<&PathBuf>) -> io::Result<String> {
    match path {
        Some(path) => fs::read_to_string(path),
        None => {
            let mut src = String::new();
            io::stdin().read_to_string(&mut src)?;
            Ok(src)
        }
    }
}

fn write_output(path: Option<&PathBuf>, output: &str) -> io::Result<()> {
    match path {
        Some(path) => fs::write(path, output),
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(output.as_bytes())?;
            stdout.flush()
        }
    }
}
