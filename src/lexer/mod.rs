use std::fmt;

pub mod lexer;

#[derive(Debug, Clone, PartialEq)]
pub enum LexerTokenKind {
    // `>`: Advance the tape pointer by one cell
    Increment,
    // `<`: Retreat the tape pointer by one cell
    Decrement,

    // `+`: Increment the byte at the tape pointer by one
    DerefIncrement,
    // `-`: Decrement the byte at the tape pointer by one
    DerefDecrement,

    // `.`: Write the byte at the tape pointer to standard output
    Write,
    // `e`: Terminate the process with status 0
    Exit,

    // `[`: Open a loop, the following instructions form its body
    JumpStart,
    // `]`: Jump back to the matching `[` while the byte at the tape pointer is non-zero
    JumpEnd,

    // End of file: no more tokens left
    EOF,

    // Comment every other character
    Comment(String),
}

impl fmt::Display for LexerTokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexerTokenKind::Increment => write!(f, ">"),
            LexerTokenKind::Decrement => write!(f, "<"),
            LexerTokenKind::DerefIncrement => write!(f, "+"),
            LexerTokenKind::DerefDecrement => write!(f, "-"),
            LexerTokenKind::Write => write!(f, "."),
            LexerTokenKind::Exit => write!(f, "e"),
            LexerTokenKind::JumpStart => write!(f, "["),
            LexerTokenKind::JumpEnd => write!(f, "]"),
            LexerTokenKind::EOF => Ok(()),
            LexerTokenKind::Comment(c) => write!(f, "{c}"),
        }
    }
}

/// Where a token starts in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    /// Offset in codepoints
    pub offset: usize,
    pub line: usize,
    pub col: usize,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: LexerTokenKind,
    pub position: Position,
}
