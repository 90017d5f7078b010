use std::path::PathBuf;

use thiserror::Error;

use crate::{ir::verify::VerifyError, lexer::Position};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Tape length must be a positive number of cells, got {0}")]
    InvalidTapeLength(usize),

    #[error("No input code or file provided")]
    MissingSource,

    #[error("Can't read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum CompileError {
    #[error(transparent)]
    Configuration(#[from] ConfigError),

    #[error("Can't find matching {other} for {bracket} at {position}")]
    UnmatchedBracket {
        bracket: char,
        other: char,
        position: Position,
    },

    #[error("Emitted a malformed block graph: {0}")]
    Malformed(#[from] VerifyError),
}

impl CompileError {
    pub fn unmatched(bracket: char, position: Position) -> Self {
        let other = if bracket == '[' { ']' } else { '[' };
        CompileError::UnmatchedBracket {
            bracket,
            other,
            position,
        }
    }
}
