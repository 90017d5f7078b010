//! Compiles the tape language (`+ - > < . [ ] e`) into a single-function,
//! basic-block IR with raw system calls for output and exit.

pub mod emitter;
pub mod error;
pub mod interpreter;
pub mod ir;
pub mod lexer;
pub mod options;
pub mod syscall;
pub mod tape;

pub use crate::{
    emitter::compile,
    error::{CompileError, ConfigError},
    ir::Module,
    options::{CompileOptions, LoopSemantics, SourceInput},
    syscall::{SyscallNumbers, Target},
};
