pub mod context;

use tracing::{debug, instrument};

use crate::{
    error::CompileError,
    ir::{verify::verify, Module},
    lexer::lexer::Lexer,
    options::CompileOptions,
    syscall::Platform,
    tape::Tape,
};

pub use self::context::{EmitterContext, OpenLoop};

pub const MODULE_NAME: &str = "MainModule";

/// Lowers `source` into a module holding a single `i8 main()`.
///
/// Any character outside of `+-<>.[]e` is skipped. Nothing is returned on
/// error, a half built module is simply dropped.
#[instrument(skip_all, fields(chars = source.len(), tape = options.tape_length))]
pub fn compile(source: &str, options: &CompileOptions) -> Result<Module, CompileError> {
    let tape = Tape::new(options.tape_length)?;
    let platform = options.convention();

    let mut context = EmitterContext::new(tape, &platform, options.loop_semantics);
    for token in Lexer::new(source) {
        context.step(&token)?;
    }
    let function = context.finish()?;
    verify(&function)?;

    debug!(blocks = function.block_count(), triple = platform.triple(), "compiled");
    Ok(Module::new(MODULE_NAME, platform.triple(), function))
}
