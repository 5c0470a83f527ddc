use tracing::trace;

use crate::error::{Error, Result};
use crate::token::{Token, TokenKind};

/// Turns relational algebra text into [Token]s, one call to
/// [Lexer::next_token] at a time.
///
/// Positions reported in errors count characters, not bytes, so they line up
/// with what the user typed even when the input contains operator glyphs.
pub struct Lexer {
    /// The input stored as characters so multi-byte glyphs index cleanly.
    input: Vec<char>,
    position: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
        }
    }

    /// Returns the next token, or a terminal `EOF` token once the input is
    /// exhausted. Further calls keep returning `EOF`.
    ///
    /// # Errors
    /// Fails on a character that cannot start a token (including a leading
    /// `0`, since numbers must start with 1-9) and on an unterminated string.
    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_whitespace();

        let ch = match self.current_char() {
            Some(ch) => ch,
            None => return Ok(Token::bare(TokenKind::Eof)),
        };

        let token = match ch {
            '"' => return self.read_string(),
            '1'..='9' => self.read_number(),
            c if c.is_ascii_alphabetic() || c == '_' => self.read_identifier(),
            _ => {
                let kind = self.read_symbol(ch)?;
                Token::bare(kind)
            }
        };

        trace!(token = %token, "lexed");
        Ok(token)
    }

    /// Lexes the whole input, ending with (and including) the `EOF` token.
    pub fn tokenize(&mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    // --- Navigation Helpers ---

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    /// Consumes `next` if it is the current character.
    fn advance_if(&mut self, next: char) -> bool {
        if self.current_char() == Some(next) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.current_char(), Some(' ' | '\t' | '\r' | '\n')) {
            self.advance();
        }
    }

    // --- Extraction Logic ---

    /// Single and two-character operators. Assumes the cursor is on `ch`.
    fn read_symbol(&mut self, ch: char) -> Result<TokenKind> {
        let start = self.position;
        self.advance();

        let kind = match ch {
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '[' => TokenKind::LBrack,
            ']' => TokenKind::RBrack,
            '.' => TokenKind::Dot,
            ',' => TokenKind::Comma,
            '⨝' => TokenKind::NJoin,
            'σ' => TokenKind::Select,
            'Π' | 'π' => TokenKind::Project,
            'ρ' => TokenKind::Rename,
            '∪' => TokenKind::Union,
            '∩' => TokenKind::ISect,
            '−' => TokenKind::Diff,
            '×' => TokenKind::CProd,
            '∧' => TokenKind::And,
            '∨' => TokenKind::Or,
            '¬' => TokenKind::Not,
            '-' => TokenKind::Minus,
            '!' if self.advance_if('=') => TokenKind::Neq,
            '!' => TokenKind::Not,
            '>' if self.advance_if('=') => TokenKind::Geq,
            '>' => TokenKind::Grtr,
            '≥' => TokenKind::Geq,
            '=' => TokenKind::Eql,
            '≠' => TokenKind::Neq,
            '<' if self.advance_if('=') => TokenKind::Leq,
            '<' => TokenKind::Less,
            '≤' => TokenKind::Leq,
            _ => {
                self.position = start;
                return Err(Error::invalid_character(ch, start));
            }
        };
        Ok(kind)
    }

    /// Reads `[A-Za-z_][A-Za-z0-9_]*`. Keywords do not exist, every word is an `ID`.
    fn read_identifier(&mut self) -> Token {
        let mut ident = String::new();
        while let Some(c) = self.current_char() {
            if !(c.is_ascii_alphanumeric() || c == '_') {
                break;
            }
            ident.push(c);
            self.advance();
        }
        Token::new(TokenKind::Id, ident)
    }

    /// Reads a run of digits. The caller guarantees the first one is 1-9.
    fn read_number(&mut self) -> Token {
        let mut number = String::new();
        while let Some(c) = self.current_char() {
            if !c.is_ascii_digit() {
                break;
            }
            number.push(c);
            self.advance();
        }
        Token::new(TokenKind::Number, number)
    }

    /// Reads a double-quoted string. The contents are taken verbatim, there are
    /// no escape sequences.
    fn read_string(&mut self) -> Result<Token> {
        let start = self.position;
        self.advance(); // Skip the opening quote

        let mut string = String::new();
        loop {
            match self.current_char() {
                Some('"') => {
                    self.advance();
                    return Ok(Token::new(TokenKind::String, string));
                }
                Some(c) => {
                    string.push(c);
                    self.advance();
                }
                None => return Err(Error::unclosed_string(start)),
            }
        }
    }
}
