extern crate clap;
extern crate thiserror;

use std::{
    collections::HashSet,
    io::{self, Write},
    path::PathBuf,
    process::ExitCode,
    time::Instant,
};

use clap::{Parser, ValueEnum};
use colored::Colorize;
use tapeir::{
    compile,
    interpreter::{
        ir_interpreter::{IrInterpreter, Outcome},
        Runtime, RuntimeError,
    },
    lexer::{lexer::Lexer, LexerTokenKind},
    options::DEFAULT_TAPE_LENGTH,
    CompileError, CompileOptions, ConfigError, LoopSemantics, SourceInput, SyscallNumbers,
    Target,
};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Tape language to basic-block IR compiler
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The file to compile
    #[arg()]
    file: Option<PathBuf>,

    /// What to do with the program, comma separated (default: ir)
    #[arg(short, long, value_enum, value_delimiter = ',')]
    mode: Vec<Commands>,

    /// Source code to compile, used instead of `file`
    #[arg(short, long)]
    code: Option<String>,

    /// Number of cells on the tape
    #[arg(short, long, default_value_t = DEFAULT_TAPE_LENGTH)]
    tape_length: usize,

    #[arg(long, value_enum, default_value_t = Target::DarwinArm64)]
    target: Target,

    /// Override the target's `write` system call number
    #[arg(long)]
    write_syscall: Option<i64>,

    /// Override the target's `exit` system call number
    #[arg(long)]
    exit_syscall: Option<i64>,

    /// Test the cell at `[` too, skipping loops that start on a zero cell
    #[arg(long)]
    guarded_loops: bool,

    /// Where to write the IR, stdout when missing
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Report each phase and enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(ValueEnum, Debug, Clone, Hash, PartialEq, Eq)]
enum Commands {
    /// Output the lexer
    Tokens,
    /// Output the IR (default)
    Ir,
    /// Run the IR with the reference interpreter
    Run,
}

#[derive(Error, Debug)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error("Can't write {path:?}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Phase banners, only shown with `--verbose`
struct Phases {
    verbose: bool,
}

impl Phases {
    fn time<T>(&self, name: &str, f: impl FnOnce() -> T) -> T {
        if self.verbose {
            eprintln!("{} {}", "Starting".blue(), name.blue());
        }
        let now = Instant::now();
        let result = f();
        if self.verbose {
            eprintln!(
                "{} {:.2?}",
                format!("Finished {name} in").green(),
                now.elapsed()
            );
        }
        result
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "tapeir=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn options(args: &Args) -> Result<CompileOptions, ConfigError> {
    let mut options = CompileOptions::default()
        .with_tape_length(args.tape_length)
        .with_target(args.target);

    if args.write_syscall.is_some() || args.exit_syscall.is_some() {
        let defaults = args.target.convention().numbers;
        options = options.with_syscalls(SyscallNumbers {
            write: args.write_syscall.unwrap_or(defaults.write),
            exit: args.exit_syscall.unwrap_or(defaults.exit),
        });
    }
    if args.guarded_loops {
        options = options.with_loop_semantics(LoopSemantics::Guarded);
    }

    options.validate()?;
    Ok(options)
}

fn print_tokens(text: &str) {
    for token in Lexer::new(text).collect_tokens() {
        match &token.kind {
            LexerTokenKind::Comment(c) => print!("\t\t{c}"),
            kind => print!("{kind}"),
        }
    }
    println!();
}

fn run(args: Args) -> Result<ExitCode, CliError> {
    let phases = Phases {
        verbose: args.verbose,
    };
    let mut commands: HashSet<Commands> = HashSet::from_iter(args.mode.iter().cloned());
    if commands.is_empty() {
        commands.insert(Commands::Ir);
    }

    let options = options(&args)?;
    let text = SourceInput::resolve(args.code.as_deref(), args.file.as_deref())?;

    if commands.contains(&Commands::Tokens) {
        print_tokens(&text);
    }

    let module = phases.time("compiling", || compile(&text, &options))?;

    if commands.contains(&Commands::Ir) {
        let rendered = module.to_string();
        match &args.output {
            Some(path) => std::fs::write(path, rendered).map_err(|source| CliError::Output {
                path: path.clone(),
                source,
            })?,
            None => print!("{rendered}"),
        }
    }

    if commands.contains(&Commands::Run) {
        let mut runtime = Runtime::new(io::stdout());
        let mut interpreter = IrInterpreter::new();
        let outcome = phases.time("ir-interpreter", || {
            interpreter.interpret(&mut runtime, &module)
        })?;
        tracing::debug!(steps = interpreter.steps(), "interpreter finished");
        runtime
            .into_output()
            .flush()
            .map_err(RuntimeError::from)?;

        let code = match outcome {
            Outcome::Returned(cell) => {
                eprintln!("{} {}", "Returned".green(), cell);
                cell
            }
            Outcome::Exited(status) => {
                eprintln!("{} {}", "Exited with".green(), status);
                status as u8
            }
        };
        return Ok(ExitCode::from(code));
    }

    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{0:}: {1:}", "Error".red(), e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn arguments_are_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn file_is_positional() {
        let args = Args::try_parse_from(["tapeir", "hello.bf", "-m", "tokens,run"]).unwrap();
        assert_eq!(args.file, Some(PathBuf::from("hello.bf")));
        assert_eq!(args.mode, vec![Commands::Tokens, Commands::Run]);
        assert_eq!(args.tape_length, DEFAULT_TAPE_LENGTH);
    }

    #[test]
    fn code_can_replace_the_file() {
        let args = Args::try_parse_from(["tapeir", "-c", "+.", "--guarded-loops"]).unwrap();
        assert_eq!(args.file, None);
        assert_eq!(args.code.as_deref(), Some("+."));
        assert!(args.mode.is_empty());
        assert!(args.guarded_loops);
    }
}
