use std::path::Path;

use crate::{
    error::ConfigError,
    syscall::{SyscallConvention, SyscallNumbers, Target},
    tape::Tape,
};

pub const DEFAULT_TAPE_LENGTH: usize = 100;

/// Whether `[` tests the current cell before entering the loop body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopSemantics {
    /// Only `]` tests the cell, so a body always runs at least once
    #[default]
    AtLeastOnce,
    /// `[` also tests the cell and skips a zero-trip body entirely
    Guarded,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompileOptions {
    pub tape_length: usize,
    pub target: Target,
    /// Overrides the target's default call numbers
    pub syscalls: Option<SyscallNumbers>,
    pub loop_semantics: LoopSemantics,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            tape_length: DEFAULT_TAPE_LENGTH,
            target: Target::default(),
            syscalls: None,
            loop_semantics: LoopSemantics::default(),
        }
    }
}

impl CompileOptions {
    pub fn with_tape_length(mut self, tape_length: usize) -> Self {
        self.tape_length = tape_length;
        self
    }

    pub fn with_target(mut self, target: Target) -> Self {
        self.target = target;
        self
    }

    pub fn with_loop_semantics(mut self, loop_semantics: LoopSemantics) -> Self {
        self.loop_semantics = loop_semantics;
        self
    }

    pub fn with_syscalls(mut self, syscalls: SyscallNumbers) -> Self {
        self.syscalls = Some(syscalls);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        Tape::new(self.tape_length).map(|_| ())
    }

    pub fn convention(&self) -> SyscallConvention {
        let convention = self.target.convention();
        match self.syscalls {
            Some(numbers) => convention.with_numbers(numbers),
            None => convention,
        }
    }
}

/// Where the program text comes from, literal code wins over a file
pub struct SourceInput;

impl SourceInput {
    pub fn resolve(code: Option<&str>, file: Option<&Path>) -> Result<String, ConfigError> {
        match (code, file) {
            (Some(code), _) => Ok(code.to_string()),
            (None, Some(path)) => std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
            (None, None) => Err(ConfigError::MissingSource),
        }
    }
}
