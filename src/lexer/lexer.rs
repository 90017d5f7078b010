use super::{LexerTokenKind, Position, Token};

#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    /** Human Readable positions in file */
    pub cur_line: usize,
    pub cur_col: usize,

    /** 'raw' format / offset within the file (in terms of 'codepoints') */
    pub codepoint_offset: usize,

    chars: std::iter::Peekable<std::str::Chars<'a>>,
}

fn is_operator_char(c: char) -> bool {
    matches!(c, '>' | '<' | '+' | '-' | '.' | 'e' | '[' | ']')
}

impl<'a> Lexer<'a> {
    pub fn new(chars: &'a str) -> Lexer<'a> {
        Lexer {
            cur_col: 1,
            cur_line: 1,

            codepoint_offset: 0,

            chars: chars.chars().peekable(),
        }
    }

    fn current_position(&self) -> Position {
        Position {
            offset: self.codepoint_offset,
            line: self.cur_line,
            col: self.cur_col,
        }
    }

    fn transform_to_type(&mut self, c: char) -> LexerTokenKind {
        match c {
            '>' => LexerTokenKind::Increment,
            '<' => LexerTokenKind::Decrement,
            '+' => LexerTokenKind::DerefIncrement,
            '-' => LexerTokenKind::DerefDecrement,
            '.' => LexerTokenKind::Write,
            'e' => LexerTokenKind::Exit,
            '[' => LexerTokenKind::JumpStart,
            ']' => LexerTokenKind::JumpEnd,
            c => {
                // Simplify the comment stream down to strings
                let mut comment = String::from(c);
                while let Some(&next) = self.chars.peek() {
                    if is_operator_char(next) {
                        break;
                    }
                    self.consume_char();
                    comment.push(next);
                }

                LexerTokenKind::Comment(comment)
            }
        }
    }

    fn consume_char(&mut self) -> Option<char> {
        match self.chars.next() {
            Some(c) => {
                self.cur_col += 1;
                if c == '\n' {
                    self.cur_line += 1;
                    self.cur_col = 1;
                }
                self.codepoint_offset += 1;
                Some(c)
            }
            None => None,
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.chars.peek() {
            if !c.is_whitespace() {
                break;
            }
            self.consume_char();
        }
    }

    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        let position = self.current_position();
        let kind = match self.consume_char() {
            Some(c) => self.transform_to_type(c),
            None => LexerTokenKind::EOF,
        };

        Token { kind, position }
    }

    /// Every token up to (but excluding) EOF, comments included
    pub fn collect_tokens(&mut self) -> Vec<Token> {
        let mut v = vec![];
        loop {
            match self.next_token() {
                Token {
                    kind: LexerTokenKind::EOF,
                    ..
                } => break v,
                tok => v.push(tok),
            }
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token;

    /// Yields only the operator tokens, comments are dropped
    fn next(&mut self) -> Option<Token> {
        loop {
            let token = self.next_token();
            match token.kind {
                LexerTokenKind::EOF => return None,
                LexerTokenKind::Comment(_) => continue,
                _ => return Some(token),
            }
        }
    }
}
